//! Lock-free command queue for loop engine control
//!
//! The control thread sends commands through an `rtrb` ring buffer and the
//! audio thread applies them at block boundaries, so state never changes in
//! the middle of a block and neither side ever waits on a lock.
//!
//! # Usage
//!
//! ```ignore
//! let (mut tx, mut rx) = command_channel();
//!
//! // Control thread
//! tx.push(LooperCommand::StartRecording(TrackId(1)));
//!
//! // Audio thread, once per block
//! engine.process_commands(&mut rx);
//! ```

use basedrop::Owned;

use super::queue::TrackList;
use super::track::Track;
use crate::config::GateConfig;
use crate::input::DetectionMode;
use crate::types::TrackId;

/// Commands sent from the control thread to the audio thread
pub enum LooperCommand {
    // ─────────────────────────────────────────────────────────────
    // Track Management
    // ─────────────────────────────────────────────────────────────
    /// Install a track slot, replacing any slot with the same id
    ///
    /// The buffer is allocated on the control thread; a replaced buffer is
    /// released through the collector, not on the audio thread.
    AddTrack(Owned<Track>),
    /// Stop the track and erase its loop
    ClearTrack(TrackId),

    // ─────────────────────────────────────────────────────────────
    // Transport
    // ─────────────────────────────────────────────────────────────
    StartRecording(TrackId),
    StopRecording(TrackId),
    StartPlaying(TrackId),
    StopPlaying(TrackId),
    /// Arm or disarm a track for recording on the next onset
    ArmTrack { track: TrackId, armed: bool },

    // ─────────────────────────────────────────────────────────────
    // Sequential Recording
    // ─────────────────────────────────────────────────────────────
    StartSequentialRecording(TrackList),
    StopRecordingAndContinue,

    // ─────────────────────────────────────────────────────────────
    // Input
    // ─────────────────────────────────────────────────────────────
    SetGate(GateConfig),
    SetDetectionMode(DetectionMode),
    SetMonitorInput(bool),

    /// Clear every track, the master loop and the input clock
    Reset,
}

/// Capacity of the command queue
pub const COMMAND_QUEUE_CAPACITY: usize = 256;

/// Create a new command channel (producer/consumer pair)
///
/// - Producer: owned by the control thread
/// - Consumer: owned by the audio thread
pub fn command_channel() -> (rtrb::Producer<LooperCommand>, rtrb::Consumer<LooperCommand>) {
    rtrb::RingBuffer::new(COMMAND_QUEUE_CAPACITY)
}
