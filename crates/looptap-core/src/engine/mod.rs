//! Loop engine - track storage, recording/playback and the control surface
//!
//! This module contains the real-time side of the looper:
//! - Track: one fixed-capacity loop buffer with its cursors
//! - LoopEngine: per-block record/mix pipeline and the master loop
//! - Command/event queues between the control and audio threads
//! - LooperHandle: control-thread API over the command queue and atomics

mod atomics;
mod command;
mod event;
mod gc;
mod handle;
mod looper;
mod queue;
mod track;
pub mod wrap;

pub use atomics::{LooperAtomics, TrackAtomics, TrackSnapshot};
pub use command::{command_channel, LooperCommand, COMMAND_QUEUE_CAPACITY};
pub use event::{event_channel, EventReceiver, LooperEvent, EVENT_QUEUE_CAPACITY};
pub use gc::gc_handle;
pub use handle::LooperHandle;
pub use looper::{LoopEngine, MasterLoop, MAX_BLOCK_SIZE};
pub use queue::{RecordingQueue, TrackList};
pub use track::Track;
