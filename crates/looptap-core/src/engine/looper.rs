//! Loop engine - owns the tracks and runs the per-block record/mix pipeline
//!
//! The engine lives on the audio thread. Each block it:
//!
//! 1. Copies the input into a preallocated working buffer and gates it
//! 2. Runs onset detection and starts armed tracks on a fresh trigger
//! 3. Records into every track that is recording
//! 4. Mixes every playing track into the (cleared) output
//! 5. Optionally adds the input for monitoring
//! 6. Publishes state to [`LooperAtomics`]
//!
//! # Master loop
//!
//! The first take to stop fixes the master loop length. From then on it is
//! the wrap length for every track: later takes are stopped after exactly one
//! master loop, or truncated/padded to it when stopped early. The master
//! read position advances every block so new recordings and playback starts
//! can phase-lock to the running groove.
//!
//! # Punch-in
//!
//! Where a new take starts, in priority order:
//! 1. Master exists and its track is playing: at the master's phase
//! 2. A trigger is pending: at zero, skipping input before the onset sample
//! 3. Otherwise at zero
//!
//! Armed tracks started by an onset while the master plays take the
//! master's phase at the onset sample.
//!
//! A take that starts at zero while the master track is stopped still plays
//! back at the master's phase once it completes. Its loop start then sounds
//! wherever the master clock is, not at the hand-off sample.
//!
//! # Real-time safety
//!
//! Track buffers are allocated before they reach the audio thread and are
//! never resized here. Replaced buffers are dropped through `basedrop`.
//! Nothing in the per-block path allocates, locks or logs.

use std::sync::Arc;

use basedrop::Owned;

use super::atomics::LooperAtomics;
use super::command::LooperCommand;
use super::event::{event_channel, EventReceiver, LooperEvent};
use super::gc::gc_handle;
use super::queue::{RecordingQueue, TrackList};
use super::track::Track;
use super::wrap;
use crate::config::{GateConfig, LooperConfig};
use crate::input::{DetectionMode, GateEnvelope, TriggerDetector, TriggerEvent, TriggerSettings};
use crate::types::{StereoBuffer, StereoSample, TrackId, TrackState, DEFAULT_SAMPLE_RATE, MAX_TRACKS};

/// Largest block processed in one pass; longer callbacks are split
pub const MAX_BLOCK_SIZE: usize = 8192;

/// The loop established by the first completed take
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MasterLoop {
    pub track: TrackId,
    pub length: usize,
}

/// Multi-track loop recorder/player
pub struct LoopEngine {
    config: LooperConfig,
    sample_rate: u32,
    max_block_size: usize,
    /// Per-track buffer capacity in samples
    capacity: usize,
    tracks: Vec<Owned<Track>>,
    master: Option<MasterLoop>,
    master_read_position: usize,
    queue: RecordingQueue,
    gate: GateEnvelope,
    detector: TriggerDetector,
    trigger: Arc<TriggerEvent>,
    /// Gated copy of the current input block
    input_buffer: StereoBuffer,
    /// Absolute position of the current block's first sample
    block_start: u64,
    atomics: Arc<LooperAtomics>,
    event_tx: rtrb::Producer<LooperEvent>,
    event_rx: Option<EventReceiver>,
}

impl LoopEngine {
    /// Create an engine prepared for the default sample rate and block size
    pub fn new(config: LooperConfig) -> Self {
        let trigger = Arc::new(TriggerEvent::new());
        let settings = Arc::new(TriggerSettings::new(config.trigger.threshold));
        let detector = TriggerDetector::new(Arc::clone(&trigger), settings, config.trigger.mode);
        let (event_tx, event_rx) = event_channel();

        let mut engine = Self {
            gate: GateEnvelope::new(config.gate),
            config,
            sample_rate: DEFAULT_SAMPLE_RATE,
            max_block_size: MAX_BLOCK_SIZE,
            capacity: 0,
            tracks: Vec::with_capacity(MAX_TRACKS),
            master: None,
            master_read_position: 0,
            queue: RecordingQueue::default(),
            detector,
            trigger,
            input_buffer: StereoBuffer::default(),
            block_start: 0,
            atomics: Arc::new(LooperAtomics::new()),
            event_tx,
            event_rx: Some(event_rx),
        };
        engine.prepare(DEFAULT_SAMPLE_RATE, MAX_BLOCK_SIZE);
        engine
    }

    // ─────────────────────────────────────────────────────────────
    // Lifecycle (not real-time safe)
    // ─────────────────────────────────────────────────────────────

    /// Size all buffers for the given stream format and reset state
    ///
    /// Reallocates existing track buffers if the capacity changes. Call
    /// before audio starts, never from the audio callback.
    pub fn prepare(&mut self, sample_rate: u32, max_block_size: usize) {
        self.sample_rate = sample_rate.max(1);
        self.max_block_size = max_block_size.max(1);
        self.input_buffer = StereoBuffer::with_capacity(self.max_block_size);

        let capacity = self.config.capacity_samples(self.sample_rate);
        if capacity != self.capacity {
            self.capacity = capacity;
            for track in self.tracks.iter_mut() {
                let id = track.id();
                *track = Owned::new(&gc_handle(), Track::new(id, capacity));
            }
        }
        self.atomics.store_capacity(capacity);

        self.reset();
    }

    /// Clear every track, the master loop, the queue and the input clock
    pub fn reset(&mut self) {
        for track in self.tracks.iter_mut() {
            track.clear();
        }
        self.master = None;
        self.master_read_position = 0;
        self.queue.clear();
        self.detector.reset();
        self.gate.reset();
        self.block_start = 0;
        self.atomics.store_levels(0, 0.0, 0.0);
        self.publish_state();
    }

    /// Hand out the event receiver (only once)
    pub fn take_events(&mut self) -> Option<EventReceiver> {
        self.event_rx.take()
    }

    pub fn atomics(&self) -> Arc<LooperAtomics> {
        Arc::clone(&self.atomics)
    }

    pub fn trigger_event(&self) -> Arc<TriggerEvent> {
        Arc::clone(&self.trigger)
    }

    pub fn trigger_settings(&self) -> Arc<TriggerSettings> {
        Arc::clone(self.detector.settings())
    }

    // ─────────────────────────────────────────────────────────────
    // Track management
    // ─────────────────────────────────────────────────────────────

    /// Allocate a track slot for `id`, replacing any existing slot
    ///
    /// Allocates; use `LooperCommand::AddTrack` once audio is running.
    pub fn add_track(&mut self, id: TrackId) {
        let track = Owned::new(&gc_handle(), Track::new(id, self.capacity));
        self.install_track(track);
    }

    /// Install a preallocated track (real-time safe)
    ///
    /// Tracks whose capacity doesn't match the engine's are rejected, as are
    /// new ids once every configured slot is taken.
    pub fn install_track(&mut self, track: Owned<Track>) {
        if track.capacity() != self.capacity {
            return;
        }

        match self.slot_of(track.id()) {
            Some(slot) => {
                self.tracks[slot] = track;
                self.release_master_if_empty();
            }
            None if self.tracks.len() < self.config.track_slots() => {
                self.tracks.push(track);
            }
            None => {}
        }
        self.publish_state();
    }

    pub fn start_recording(&mut self, id: TrackId) {
        let Some(slot) = self.slot_of(id) else {
            return;
        };

        let onset = if self.master_is_playing() {
            None
        } else if self.trigger.consume() {
            self.trigger.absolute_index()
        } else {
            None
        };
        self.begin_recording(slot, onset);
    }

    pub fn stop_recording(&mut self, id: TrackId) {
        if let Some(slot) = self.slot_of(id) {
            self.stop_recording_slot(slot);
        }
    }

    pub fn start_playing(&mut self, id: TrackId) {
        if let Some(slot) = self.slot_of(id) {
            self.start_playing_slot(slot);
        }
    }

    pub fn stop_playing(&mut self, id: TrackId) {
        if let Some(slot) = self.slot_of(id) {
            let track = &mut self.tracks[slot];
            track.is_playing = false;
            track.mix_offset = 0;
        }
    }

    /// Stop the track and erase its loop
    ///
    /// Clearing the last track with content also drops the master loop.
    pub fn clear_track(&mut self, id: TrackId) {
        if let Some(slot) = self.slot_of(id) {
            self.tracks[slot].clear();
            self.release_master_if_empty();
        }
    }

    /// Arm a track to start recording on the next detected onset
    pub fn arm_track(&mut self, id: TrackId, armed: bool) {
        if let Some(slot) = self.slot_of(id) {
            let track = &mut self.tracks[slot];
            track.armed = armed && !track.is_recording;
        }
    }

    // ─────────────────────────────────────────────────────────────
    // Sequential recording
    // ─────────────────────────────────────────────────────────────

    /// Queue `ids` and start recording the first one
    pub fn start_sequential_recording(&mut self, ids: &[TrackId]) {
        self.start_sequential_list(TrackList::from_slice(ids));
    }

    fn start_sequential_list(&mut self, list: TrackList) {
        if list.is_empty() {
            return;
        }
        self.queue.load(list);
        if let Some(first) = self.queue.current() {
            self.start_recording(first);
        }
    }

    /// Stop the current queue entry, play it and start recording the next
    pub fn stop_recording_and_continue(&mut self) {
        let Some(current) = self.queue.current() else {
            return;
        };

        self.stop_recording(current);
        // An empty take stays idle
        if self.track(current).is_some_and(Track::has_content) {
            self.start_playing(current);
        }

        if let Some(next) = self.queue.advance() {
            self.start_recording(next);
        }
    }

    #[inline]
    pub fn is_recording_active(&self) -> bool {
        self.queue.is_active()
    }

    #[inline]
    pub fn is_last_track_recording(&self) -> bool {
        self.queue.is_last()
    }

    #[inline]
    pub fn current_track_id(&self) -> Option<TrackId> {
        self.queue.current()
    }

    // ─────────────────────────────────────────────────────────────
    // Input settings
    // ─────────────────────────────────────────────────────────────

    pub fn set_gate(&mut self, gate: GateConfig) {
        self.config.gate = gate;
        self.gate.set_config(gate);
    }

    pub fn set_detection_mode(&mut self, mode: DetectionMode) {
        self.config.trigger.mode = mode;
        self.detector.set_mode(mode);
    }

    pub fn set_monitor_input(&mut self, enabled: bool) {
        self.config.monitor_input = enabled;
    }

    // ─────────────────────────────────────────────────────────────
    // Commands
    // ─────────────────────────────────────────────────────────────

    /// Apply every pending command (call at the start of each block)
    pub fn process_commands(&mut self, rx: &mut rtrb::Consumer<LooperCommand>) {
        let mut applied = false;
        while let Ok(cmd) = rx.pop() {
            applied = true;
            match cmd {
                LooperCommand::AddTrack(track) => self.install_track(track),
                LooperCommand::ClearTrack(id) => self.clear_track(id),
                LooperCommand::StartRecording(id) => self.start_recording(id),
                LooperCommand::StopRecording(id) => self.stop_recording(id),
                LooperCommand::StartPlaying(id) => self.start_playing(id),
                LooperCommand::StopPlaying(id) => self.stop_playing(id),
                LooperCommand::ArmTrack { track, armed } => self.arm_track(track, armed),
                LooperCommand::StartSequentialRecording(list) => self.start_sequential_list(list),
                LooperCommand::StopRecordingAndContinue => self.stop_recording_and_continue(),
                LooperCommand::SetGate(gate) => self.set_gate(gate),
                LooperCommand::SetDetectionMode(mode) => self.set_detection_mode(mode),
                LooperCommand::SetMonitorInput(enabled) => self.set_monitor_input(enabled),
                LooperCommand::Reset => self.reset(),
            }
        }
        if applied {
            self.publish_state();
        }
    }

    // ─────────────────────────────────────────────────────────────
    // Block processing
    // ─────────────────────────────────────────────────────────────

    /// Process one audio callback
    ///
    /// `output` is overwritten. Missing input samples are treated as
    /// silence. Callbacks longer than the prepared block size are processed
    /// in chunks.
    pub fn process_block(&mut self, output: &mut [StereoSample], input: &[StereoSample]) {
        let mut done = 0;
        while done < output.len() {
            let n = (output.len() - done).min(self.max_block_size);
            let input_chunk = input.get(done..).unwrap_or(&[]);
            let input_chunk = &input_chunk[..input_chunk.len().min(n)];
            self.process_chunk(&mut output[done..done + n], input_chunk);
            done += n;
        }
    }

    fn process_chunk(&mut self, output: &mut [StereoSample], input: &[StereoSample]) {
        let mut scratch = std::mem::take(&mut self.input_buffer);
        scratch.set_len_from_capacity(output.len());

        let copied = input.len().min(scratch.len());
        scratch.as_mut_slice()[..copied].copy_from_slice(&input[..copied]);
        scratch.as_mut_slice()[copied..].fill(StereoSample::silence());

        if self.config.gate.enabled {
            self.gate.process(scratch.as_mut_slice());
        }

        let fired = self.detector.analyze(scratch.as_slice());
        self.handle_trigger(fired);

        self.record_into_tracks(scratch.as_slice());

        output.fill(StereoSample::silence());
        self.mix_tracks_to_output(output);

        if self.config.monitor_input {
            for (out, inp) in output.iter_mut().zip(scratch.as_slice()) {
                *out += *inp;
            }
        }

        let peak = scratch.peak();
        self.input_buffer = scratch;

        self.block_start += output.len() as u64;
        self.atomics
            .store_levels(self.block_start, peak, self.gate.level());
        self.publish_state();
    }

    /// Start armed tracks on a fresh onset
    ///
    /// An onset that arrives while a track is recording is dropped. With no
    /// armed track it is left pending, so a manual start can still punch in
    /// on it.
    fn handle_trigger(&mut self, fired: bool) {
        if !fired {
            return;
        }
        let Some(onset) = self.trigger.absolute_index() else {
            return;
        };

        if self.tracks.iter().any(|t| t.is_recording) {
            self.trigger.consume();
            return;
        }

        if !self.tracks.iter().any(|t| t.armed) {
            self.emit(LooperEvent::TriggerIgnored {
                absolute_index: onset,
            });
            return;
        }

        if !self.trigger.consume() {
            return;
        }
        for slot in 0..self.tracks.len() {
            if self.tracks[slot].armed {
                self.begin_recording(slot, Some(onset));
            }
        }
    }

    /// Copy one input block into every recording track
    ///
    /// A take that reaches the loop length stops and starts playing at the
    /// sample right after its last recorded one.
    pub fn record_into_tracks(&mut self, input: &[StereoSample]) {
        let master_length = self.master.map(|m| m.length);

        for slot in 0..self.tracks.len() {
            let handoff = {
                let track = &mut self.tracks[slot];
                if !track.is_recording {
                    continue;
                }

                let loop_len = master_length
                    .unwrap_or(track.capacity())
                    .min(track.capacity());
                let skip = track.input_skip.min(input.len());
                track.input_skip = 0;

                let write = track.write_position;
                let count = (input.len() - skip).min(loop_len.saturating_sub(write));
                track.samples_mut()[write..write + count]
                    .copy_from_slice(&input[skip..skip + count]);

                track.write_position = write + count;
                track.recorded_length += count;
                track.captured += count;

                (track.recorded_length >= loop_len).then_some(skip + count)
            };

            if let Some(offset) = handoff {
                self.complete_take(slot, offset);
            }
        }
    }

    /// Additively mix every playing track into `output`
    ///
    /// Advances each track's read position and the master read position by
    /// the block length, modulo the respective loop length.
    pub fn mix_tracks_to_output(&mut self, output: &mut [StereoSample]) {
        let master_length = self.master.map(|m| m.length);
        let block_len = output.len();

        for track in self.tracks.iter_mut() {
            if !track.is_playing {
                continue;
            }

            let loop_len = track.playback_length(master_length);
            let offset = track.mix_offset.min(block_len);
            track.mix_offset = 0;

            let mut position = (track.read_position + offset) % loop_len;
            let mut out = offset;
            let samples = track.samples();
            while out < block_len {
                let segments = wrap::segments(position, block_len - out, loop_len);
                for range in [segments.head.clone(), segments.tail.clone()] {
                    let len = range.len();
                    for (dst, src) in output[out..out + len].iter_mut().zip(&samples[range]) {
                        *dst += *src;
                    }
                    out += len;
                }
                position = segments.end_position(loop_len);
            }

            track.read_position = (track.read_position + block_len) % loop_len;
        }

        if let Some(master) = self.master {
            self.master_read_position = (self.master_read_position + block_len) % master.length;
        }
    }

    // ─────────────────────────────────────────────────────────────
    // Queries
    // ─────────────────────────────────────────────────────────────

    pub fn track(&self, id: TrackId) -> Option<&Track> {
        self.slot_of(id).map(|slot| &*self.tracks[slot])
    }

    pub fn track_state(&self, id: TrackId) -> Option<TrackState> {
        self.track(id).map(Track::state)
    }

    pub fn tracks(&self) -> impl Iterator<Item = &Track> {
        self.tracks.iter().map(|t| &**t)
    }

    pub fn master(&self) -> Option<MasterLoop> {
        self.master
    }

    pub fn master_loop_length(&self) -> Option<usize> {
        self.master.map(|m| m.length)
    }

    pub fn master_track_id(&self) -> Option<TrackId> {
        self.master.map(|m| m.track)
    }

    pub fn master_read_position(&self) -> usize {
        self.master_read_position
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn max_block_size(&self) -> usize {
        self.max_block_size
    }

    /// Absolute position of the next block on the input clock
    pub fn absolute_position(&self) -> u64 {
        self.block_start
    }

    pub fn config(&self) -> &LooperConfig {
        &self.config
    }

    // ─────────────────────────────────────────────────────────────
    // Internals
    // ─────────────────────────────────────────────────────────────

    fn slot_of(&self, id: TrackId) -> Option<usize> {
        self.tracks.iter().position(|t| t.id() == id)
    }

    fn master_is_playing(&self) -> bool {
        self.master
            .and_then(|m| self.slot_of(m.track))
            .is_some_and(|slot| self.tracks[slot].is_playing)
    }

    /// Start a take; `onset` is the trigger's absolute index if one applies
    fn begin_recording(&mut self, slot: usize, onset: Option<u64>) {
        let skip = onset
            .map_or(0, |abs| abs.saturating_sub(self.block_start) as usize)
            .min(self.max_block_size);

        let start = match self.master {
            Some(master) if self.master_is_playing() => {
                (self.master_read_position + skip) % master.length
            }
            _ => 0,
        };
        let start_offset = onset.unwrap_or(self.block_start);

        let track = &mut self.tracks[slot];
        track.samples_mut().fill(StereoSample::silence());
        track.is_recording = true;
        track.is_playing = false;
        track.armed = false;
        track.write_position = start;
        track.recorded_length = start;
        track.read_position = 0;
        track.final_length = 0;
        track.captured = 0;
        track.record_start_offset = start_offset;
        track.input_skip = skip;
        track.mix_offset = 0;

        let id = track.id();
        self.emit(LooperEvent::RecordingStarted(id));
    }

    /// Idempotent: a track that isn't recording is left alone
    fn stop_recording_slot(&mut self, slot: usize) {
        let track = &mut self.tracks[slot];
        if !track.is_recording {
            return;
        }
        track.is_recording = false;
        track.input_skip = 0;
        let id = track.id();

        if track.captured == 0 {
            // Nothing made it into the buffer
            track.write_position = 0;
            track.recorded_length = 0;
            track.final_length = 0;
            self.emit(LooperEvent::RecordingStopped(id));
            return;
        }

        match self.master {
            None => {
                let length = track.recorded_length.min(track.capacity());
                track.recorded_length = length;
                track.final_length = length;
                track.write_position = 0;

                self.master = Some(MasterLoop { track: id, length });
                self.master_read_position = 0;
                self.emit(LooperEvent::RecordingStopped(id));
                self.emit(LooperEvent::MasterLoopSet { track: id, length });
            }
            Some(master) => {
                let length = master.length.min(track.capacity());
                let keep = track.recorded_length.min(length);
                track.samples_mut()[keep..length].fill(StereoSample::silence());
                track.recorded_length = keep;
                track.final_length = length;
                track.write_position = 0;
                self.emit(LooperEvent::RecordingStopped(id));
            }
        }
    }

    fn start_playing_slot(&mut self, slot: usize) {
        let read_position = match self.master {
            Some(master) => self.master_read_position % master.length,
            None => 0,
        };

        let track = &mut self.tracks[slot];
        if track.is_recording {
            return;
        }
        track.is_playing = true;
        track.read_position = read_position;
        track.mix_offset = 0;
    }

    /// Seamless record-to-play hand-off at block sample `offset`
    fn complete_take(&mut self, slot: usize, offset: usize) {
        let had_master = self.master.is_some();
        self.stop_recording_slot(slot);

        if !had_master {
            // This take fixed the master: place the loop start at `offset`
            if let Some(master) = self.master {
                self.master_read_position = (master.length - offset % master.length) % master.length;
            }
        }

        self.start_playing_slot(slot);
        self.tracks[slot].mix_offset = offset;
    }

    fn release_master_if_empty(&mut self) {
        if self.master.is_some() && !self.tracks.iter().any(|t| t.has_content()) {
            self.master = None;
            self.master_read_position = 0;
        }
    }

    fn emit(&mut self, event: LooperEvent) {
        // Dropped when the control thread falls behind
        let _ = self.event_tx.push(event);
    }

    fn publish_state(&self) {
        for (slot, track) in self.tracks.iter().enumerate() {
            self.atomics.store_track(slot, track);
        }
        self.atomics.store_track_count(self.tracks.len());
        self.atomics.store_master(
            self.master.map(|m| m.track),
            self.master.map(|m| m.length),
            self.master_read_position,
        );
        self.atomics
            .store_queue(self.queue.current(), self.queue.is_last());
    }
}
