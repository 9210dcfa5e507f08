//! Input analysis: gating and onset detection
//!
//! Runs on the audio thread ahead of the loop engine. The gate shapes the
//! signal that is both analysed and recorded; the detector publishes onsets
//! through a shared [`TriggerEvent`].

mod detector;
mod gate;
mod trigger_event;

pub use detector::{DetectionMode, TriggerDetector, TriggerSettings, DEFAULT_TRIGGER_THRESHOLD};
pub use gate::GateEnvelope;
pub use trigger_event::{TriggerChannel, TriggerEvent};
