//! Control-thread handle to a running loop engine
//!
//! Wraps the lock-free command producer together with the shared atomics, so
//! a UI or command loop can drive the engine and read its state without ever
//! touching the audio thread. All operations are non-blocking.

use std::sync::Arc;

use basedrop::Owned;

use super::atomics::{LooperAtomics, TrackSnapshot};
use super::command::LooperCommand;
use super::gc::gc_handle;
use super::looper::LoopEngine;
use super::queue::TrackList;
use super::track::Track;
use crate::config::GateConfig;
use crate::input::{DetectionMode, TriggerEvent, TriggerSettings};
use crate::types::{TrackId, TrackState};

/// Sends commands to a [`LoopEngine`] and reads its published state
pub struct LooperHandle {
    producer: rtrb::Producer<LooperCommand>,
    atomics: Arc<LooperAtomics>,
    trigger: Arc<TriggerEvent>,
    settings: Arc<TriggerSettings>,
}

impl LooperHandle {
    /// Pair a command producer with the engine that owns the consumer
    pub fn new(producer: rtrb::Producer<LooperCommand>, engine: &LoopEngine) -> Self {
        Self {
            producer,
            atomics: engine.atomics(),
            trigger: engine.trigger_event(),
            settings: engine.trigger_settings(),
        }
    }

    /// Send a command to the engine (non-blocking)
    ///
    /// Returns `Ok(())` if the command was queued successfully,
    /// or `Err(cmd)` if the queue is full (command is returned).
    pub fn send(&mut self, cmd: LooperCommand) -> Result<(), LooperCommand> {
        self.producer.push(cmd).map_err(|e| match e {
            rtrb::PushError::Full(value) => value,
        })
    }

    /// Check if the queue has space for more commands
    pub fn has_space(&self) -> bool {
        self.producer.slots() > 0
    }

    fn send_logged(&mut self, cmd: LooperCommand, what: &str) -> bool {
        match self.send(cmd) {
            Ok(()) => {
                log::debug!("Queued {}", what);
                true
            }
            Err(_) => {
                log::warn!("Command queue full, dropped {}", what);
                false
            }
        }
    }

    // ─────────────────────────────────────────────────────────────
    // Commands
    // ─────────────────────────────────────────────────────────────

    /// Allocate a track buffer here and hand it to the engine
    pub fn add_track(&mut self, id: TrackId) -> bool {
        let track = Owned::new(&gc_handle(), Track::new(id, self.atomics.capacity()));
        self.send_logged(LooperCommand::AddTrack(track), "add track")
    }

    pub fn clear_track(&mut self, id: TrackId) -> bool {
        self.send_logged(LooperCommand::ClearTrack(id), "clear track")
    }

    pub fn start_recording(&mut self, id: TrackId) -> bool {
        self.send_logged(LooperCommand::StartRecording(id), "start recording")
    }

    pub fn stop_recording(&mut self, id: TrackId) -> bool {
        self.send_logged(LooperCommand::StopRecording(id), "stop recording")
    }

    pub fn start_playing(&mut self, id: TrackId) -> bool {
        self.send_logged(LooperCommand::StartPlaying(id), "start playing")
    }

    pub fn stop_playing(&mut self, id: TrackId) -> bool {
        self.send_logged(LooperCommand::StopPlaying(id), "stop playing")
    }

    pub fn arm_track(&mut self, id: TrackId, armed: bool) -> bool {
        self.send_logged(LooperCommand::ArmTrack { track: id, armed }, "arm track")
    }

    /// Queue tracks for recording one after another
    ///
    /// Ids beyond the maximum track count are dropped.
    pub fn start_sequential_recording(&mut self, ids: &[TrackId]) -> bool {
        let list = TrackList::from_slice(ids);
        self.send_logged(
            LooperCommand::StartSequentialRecording(list),
            "sequential recording",
        )
    }

    pub fn stop_recording_and_continue(&mut self) -> bool {
        self.send_logged(LooperCommand::StopRecordingAndContinue, "continue")
    }

    pub fn set_gate(&mut self, gate: GateConfig) -> bool {
        self.send_logged(LooperCommand::SetGate(gate), "gate settings")
    }

    pub fn set_detection_mode(&mut self, mode: DetectionMode) -> bool {
        self.send_logged(LooperCommand::SetDetectionMode(mode), "detection mode")
    }

    pub fn set_monitor_input(&mut self, enabled: bool) -> bool {
        self.send_logged(LooperCommand::SetMonitorInput(enabled), "monitor toggle")
    }

    pub fn reset(&mut self) -> bool {
        self.send_logged(LooperCommand::Reset, "reset")
    }

    /// Change the onset threshold; applies from the next block
    pub fn set_threshold(&self, threshold: f32) {
        self.settings.set_threshold(threshold);
    }

    pub fn threshold(&self) -> f32 {
        self.settings.threshold()
    }

    // ─────────────────────────────────────────────────────────────
    // State (lock-free reads)
    // ─────────────────────────────────────────────────────────────

    pub fn atomics(&self) -> &Arc<LooperAtomics> {
        &self.atomics
    }

    pub fn trigger_event(&self) -> &Arc<TriggerEvent> {
        &self.trigger
    }

    pub fn track_state(&self, id: TrackId) -> Option<TrackState> {
        self.atomics.track(id).map(|t| t.state())
    }

    pub fn tracks(&self) -> Vec<TrackSnapshot> {
        self.atomics.snapshot()
    }

    pub fn master_loop_length(&self) -> Option<usize> {
        self.atomics.master_length()
    }

    pub fn is_recording_active(&self) -> bool {
        self.atomics.is_recording_active()
    }

    pub fn is_last_track_recording(&self) -> bool {
        self.atomics.is_last_track_recording()
    }

    pub fn current_track_id(&self) -> Option<TrackId> {
        self.atomics.current_recording_track()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LooperConfig;
    use crate::engine::command::{command_channel, COMMAND_QUEUE_CAPACITY};
    use crate::types::StereoSample;

    fn setup() -> (LoopEngine, rtrb::Consumer<LooperCommand>, LooperHandle) {
        let mut config = LooperConfig::default();
        config.track_count = 2;
        config.max_loop_seconds = 1.0;
        config.monitor_input = false;

        let mut engine = LoopEngine::new(config);
        engine.prepare(1000, 64);
        let (tx, rx) = command_channel();
        let handle = LooperHandle::new(tx, &engine);
        (engine, rx, handle)
    }

    #[test]
    fn test_commands_reach_engine() {
        let (mut engine, mut rx, mut handle) = setup();

        assert!(handle.add_track(TrackId(1)));
        assert!(handle.add_track(TrackId(2)));
        assert!(handle.start_recording(TrackId(1)));
        engine.process_commands(&mut rx);

        assert_eq!(handle.track_state(TrackId(1)), Some(TrackState::Recording));
        assert_eq!(handle.track_state(TrackId(2)), Some(TrackState::Idle));
        assert_eq!(handle.tracks().len(), 2);

        let mut out = vec![StereoSample::silence(); 64];
        engine.process_block(&mut out, &vec![StereoSample::mono(0.2); 64]);
        handle.stop_recording(TrackId(1));
        engine.process_commands(&mut rx);

        assert_eq!(handle.master_loop_length(), Some(64));
        assert_eq!(handle.track_state(TrackId(1)), Some(TrackState::Stopped));
    }

    #[test]
    fn test_sequential_state_is_published() {
        let (mut engine, mut rx, mut handle) = setup();
        handle.add_track(TrackId(1));
        handle.add_track(TrackId(2));
        handle.start_sequential_recording(&[TrackId(1), TrackId(2)]);
        engine.process_commands(&mut rx);

        assert!(handle.is_recording_active());
        assert_eq!(handle.current_track_id(), Some(TrackId(1)));
        assert!(!handle.is_last_track_recording());

        let mut out = vec![StereoSample::silence(); 64];
        engine.process_block(&mut out, &vec![StereoSample::mono(0.2); 64]);
        handle.stop_recording_and_continue();
        engine.process_commands(&mut rx);

        assert_eq!(handle.current_track_id(), Some(TrackId(2)));
        assert!(handle.is_last_track_recording());
    }

    #[test]
    fn test_threshold_is_shared() {
        let (engine, _rx, handle) = setup();
        handle.set_threshold(0.25);
        assert_eq!(engine.trigger_settings().threshold(), 0.25);
        handle.set_threshold(-1.0);
        assert_eq!(handle.threshold(), 0.0);
    }

    #[test]
    fn test_full_queue_returns_false() {
        let (_engine, _rx, mut handle) = setup();
        for _ in 0..COMMAND_QUEUE_CAPACITY {
            assert!(handle.reset());
        }
        assert!(!handle.has_space());
        assert!(!handle.reset());
        assert!(handle.send(LooperCommand::Reset).is_err());
    }
}
