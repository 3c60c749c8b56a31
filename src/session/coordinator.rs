//! Session Coordinator
//!
//! Owns the four [`LoopTrack`]s, the shared [`TransportClock`], the
//! single [`Recorder`], the pitch engine's [`WorkerPool`], and the
//! [`OverdubMixer`]. Dispatches [`SessionCommand`]s to the target track,
//! drives the async work a track's intent enums describe (mic capture,
//! bar-boundary timers, overdub mixing, pitch jobs), and reports what
//! happened as a batch of [`SessionEvent`]s.
//!
//! This is the only place that actually touches the `Recorder` and
//! `WorkerPool` — tracks stay synchronous and testable (see
//! `core::track`'s module doc).

use std::collections::HashMap;
use std::time::Duration;

use crossbeam_channel::{Receiver, TryRecvError};

use crate::audio::effects::EffectKind;
use crate::audio::recorder::{ActiveRecording, Recorder};
use crate::core::buffer::AudioBuffer;
use crate::core::track::{LoopTrack, MasterUpdate, PressOutcome, StopOutcome, TrackState};
use crate::error::LoopEngineError;
use crate::mixer::overdub::OverdubMixer;
use crate::pitch::pool::WorkerPool;
use crate::state::config::EngineConfig;
use crate::sync::clock::TransportClock;

const TRACK_COUNT: usize = 4;

/// A command targeting one track.
#[derive(Debug, Clone)]
pub enum TrackCommand {
    /// The track's footswitch/button press.
    Press,
    /// The track's stop button.
    Stop,
    /// Clear the track's buffer, undo history, and effects.
    Clear,
    /// Set the bar divider (only valid while Ready, dependents only).
    SetDivider(u32),
    /// Append an effect to the chain. `Pitch` additionally triggers an
    /// offline pitch-shift job.
    AddEffect(EffectKind),
    /// Reorder an effect (`dir < 0` earlier, `dir > 0` later).
    MoveEffect(u64, i32),
    /// Remove an effect from the chain.
    RemoveEffect(u64),
    /// Toggle an effect's bypass flag.
    ToggleBypass(u64),
    /// Update one parameter of an effect by key name. Setting a `Pitch`
    /// descriptor's `"semitones"` key re-triggers the offline shift.
    SetParam(u64, String, f32),
    /// Undo the track's most recent destructive mutation.
    Undo,
}

/// Top-level commands accepted by [`Session::dispatch`].
#[derive(Debug, Clone)]
pub enum SessionCommand {
    /// A command targeting track `usize` (1-indexed).
    Track(usize, TrackCommand),
    /// Toggle whether the mic monitor is routed to the master bus.
    ToggleMonitor,
    /// Confirm an overdub arm despite a flagged loopback risk.
    ConfirmLoopback,
    /// Begin capturing the master mix to the export sink.
    StartMixRecord,
    /// Stop capturing the master mix; the captured buffer is returned by
    /// [`DispatchResult::exported_mix`].
    StopMixRecord,
}

/// Something the Session Coordinator wants the caller (UI, MIDI handler,
/// logger) to know about.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// Track `usize` (1-indexed) transitioned to a new state.
    TrackStateChanged(usize, TrackState),
    /// Capture progress for a Recording/Overdub track, in `[0.0, 1.0]`.
    TrackProgress(usize, f32),
    /// The master transport duration/bpm changed.
    TransportChanged(Duration, u32),
    /// Pitch-shift job progress for a track, in `[0.0, 1.0]`.
    PitchProgress(usize, f32),
    /// A command failed; `kind` is [`LoopEngineError::kind`].
    Error(&'static str, String),
}

/// Result of a single [`Session::dispatch`] call.
#[derive(Debug, Default)]
pub struct DispatchResult {
    /// Events raised by this command.
    pub events: Vec<SessionEvent>,
    /// Populated only by `StopMixRecord`.
    pub exported_mix: Option<AudioBuffer>,
}

impl From<Vec<SessionEvent>> for DispatchResult {
    fn from(events: Vec<SessionEvent>) -> Self {
        Self {
            events,
            exported_mix: None,
        }
    }
}

struct PendingPitch {
    job_id: u64,
    semitones: i32,
    rx: Receiver<Result<AudioBuffer, LoopEngineError>>,
    /// The pre-shift buffer submitted to the pool, kept so the job can be
    /// re-run inline if the worker pool doesn't reply within
    /// `EngineConfig::pitch_job_timeout_ms` (spec §4.3/§4.7's fallback).
    source: AudioBuffer,
    submitted_at: f64,
}

/// Which role an in-flight [`ActiveRecording`] is serving.
#[derive(Clone, Copy, PartialEq)]
enum CaptureKind {
    Loop,
    Overdub,
}

/// Owns the four tracks and the Transport State, and is the only piece
/// of the engine that drives the `Recorder`, `WorkerPool`, and
/// `OverdubMixer` directly.
pub struct Session {
    tracks: Vec<LoopTrack>,
    clock: TransportClock,
    recorder: Recorder,
    pitch_pool: WorkerPool,
    mixer: OverdubMixer,
    config: EngineConfig,

    sample_rate: u32,
    channels: usize,

    master_set: bool,
    master_duration: Option<Duration>,
    master_bpm: Option<u32>,

    monitor_connected: bool,
    loopback_detected: bool,
    loopback_confirmed: bool,

    master_bus_gain: f32,
    prior_master_gain: Option<f32>,
    prior_monitor: Option<bool>,

    active_capture: Option<(usize, ActiveRecording, CaptureKind)>,
    pending_bar: HashMap<usize, f64>,
    pending_overdub_arm: HashMap<usize, f64>,
    pending_pitch: HashMap<usize, PendingPitch>,

    mix_record_buffer: Option<AudioBuffer>,
}

impl Session {
    /// Build a session with four fresh tracks, Track 1 as master.
    pub fn new(sample_rate: u32, channels: usize, config: EngineConfig) -> Self {
        let undo_limit = config.undo_stack_limit;
        let recorder = Recorder::new(Duration::from_millis(config.recorder_global_timeout_ms));
        let tracks = (1..=TRACK_COUNT)
            .map(|i| LoopTrack::new(i, sample_rate, channels, undo_limit))
            .collect();

        Self {
            tracks,
            clock: TransportClock::new(),
            recorder,
            pitch_pool: WorkerPool::new_default(),
            mixer: OverdubMixer::new(),
            config,
            sample_rate,
            channels,
            master_set: false,
            master_duration: None,
            master_bpm: None,
            monitor_connected: true,
            loopback_detected: false,
            loopback_confirmed: false,
            master_bus_gain: 1.0,
            prior_master_gain: None,
            prior_monitor: None,
            active_capture: None,
            pending_bar: HashMap::new(),
            pending_overdub_arm: HashMap::new(),
            pending_pitch: HashMap::new(),
            mix_record_buffer: None,
        }
    }

    /// Read-only access to one track, 1-indexed.
    pub fn track(&self, index: usize) -> Option<&LoopTrack> {
        self.tracks.get(index.checked_sub(1)?)
    }

    /// Currently known master bpm, if Track 1 has recorded.
    pub fn master_bpm(&self) -> Option<u32> {
        self.master_bpm
    }

    /// Current audio-clock time, for scheduling [`Session::tick`] calls.
    pub fn now(&self) -> f64 {
        self.clock.now()
    }

    /// Current master bus gain (ramped to 0 while an overdub capture is
    /// active, per spec §4.2's anti-feedback policy).
    pub fn master_bus_gain(&self) -> f32 {
        self.master_bus_gain
    }

    /// Whether the mic monitor is currently routed to the master bus.
    pub fn monitor_connected(&self) -> bool {
        self.monitor_connected
    }

    /// Run the loopback probe against a captured response to the burst
    /// from [`crate::audio::analysis::LoopbackProbe::burst`], setting the
    /// advisory flag checked on the next overdub arm.
    pub fn run_loopback_probe(&mut self, captured: &AudioBuffer) -> bool {
        use crate::audio::analysis::LoopbackProbe;
        self.loopback_detected = LoopbackProbe::evaluate(captured, self.config.loopback_rms_threshold);
        self.loopback_detected
    }

    /// Render `frames` samples of the master bus: every track's
    /// `render` summed together, then scaled by the master bus gain
    /// (ramped to 0 during an active overdub capture, spec §4.2) and
    /// hard-clipped. If `StartMixRecord` is active, the result is also
    /// appended to the export sink.
    pub fn mix_down(&mut self, frames: usize) -> AudioBuffer {
        let mut mixed = AudioBuffer::silence(self.sample_rate, self.channels, frames);
        for track in self.tracks.iter_mut() {
            let rendered = track.render(frames);
            let _ = mixed.mix(&rendered, 1.0);
        }
        mixed.apply_gain(self.master_bus_gain);
        mixed.clamp();

        if let Some(buf) = self.mix_record_buffer.as_mut() {
            let channels: Vec<&[f32]> = mixed.samples().iter().map(|c| c.as_slice()).collect();
            let _ = buf.append(&channels);
        }
        mixed
    }

    /// Push one frame of realtime mic input into the in-flight capture,
    /// if any. No-op if nothing is currently recording.
    pub fn push_capture_frame(&mut self, frame: &[&[f32]]) -> Result<(), LoopEngineError> {
        if let Some((_, rec, _)) = self.active_capture.as_mut() {
            rec.push(frame)?;
        }
        Ok(())
    }

    /// Drive time-based work: fires Waiting tracks whose bar boundary has
    /// arrived, starts armed overdub captures whose delay has elapsed,
    /// force-stops a capture past its watchdog, and polls in-flight pitch
    /// jobs for progress/completion. Call once per UI/audio tick.
    pub fn tick(&mut self, now: f64) -> Vec<SessionEvent> {
        let mut events = Vec::new();

        let due_bars: Vec<usize> = self
            .pending_bar
            .iter()
            .filter(|&(_, &t)| now >= t)
            .map(|(&i, _)| i)
            .collect();
        for idx in due_bars {
            self.pending_bar.remove(&idx);
            if let Err(e) = self.tracks[idx - 1].bar_fired() {
                events.push(SessionEvent::Error(e.kind(), e.to_string()));
                continue;
            }
            self.begin_capture(idx, CaptureKind::Loop);
            events.push(SessionEvent::TrackStateChanged(idx, TrackState::Recording));
        }

        let due_arms: Vec<usize> = self
            .pending_overdub_arm
            .iter()
            .filter(|&(_, &t)| now >= t)
            .map(|(&i, _)| i)
            .collect();
        for idx in due_arms {
            self.pending_overdub_arm.remove(&idx);
            self.begin_capture(idx, CaptureKind::Overdub);
        }

        if let Some((idx, rec, _)) = self.active_capture.as_ref() {
            if rec.watchdog_expired() {
                let idx = *idx;
                events.extend(self.finish_capture(idx));
            } else {
                events.push(SessionEvent::TrackProgress(
                    idx,
                    self.expected_progress(idx, rec),
                ));
            }
        }

        for (&idx, pending) in self.pending_pitch.iter() {
            if let Some(pct) = self.tracks[idx - 1].pending_pitch_progress() {
                events.push(SessionEvent::PitchProgress(idx, pct));
            }
            let _ = pending;
        }
        events.extend(self.poll_pitch_jobs());

        events
    }

    fn expected_progress(&self, idx: usize, rec: &ActiveRecording) -> f32 {
        let master = self.master_info();
        let expected = self.tracks[idx - 1].expected_record_duration(master);
        if expected.is_zero() {
            0.0
        } else {
            (rec.elapsed().as_secs_f64() / expected.as_secs_f64()).min(1.0) as f32
        }
    }

    /// Dispatch one command and return what happened.
    pub fn dispatch(&mut self, command: SessionCommand) -> DispatchResult {
        match command {
            SessionCommand::Track(idx, cmd) => self.dispatch_track(idx, cmd).into(),
            SessionCommand::ToggleMonitor => {
                self.monitor_connected = !self.monitor_connected;
                DispatchResult::default()
            }
            SessionCommand::ConfirmLoopback => {
                self.loopback_confirmed = true;
                DispatchResult::default()
            }
            SessionCommand::StartMixRecord => {
                self.mix_record_buffer = Some(AudioBuffer::new(self.sample_rate, self.channels));
                DispatchResult::default()
            }
            SessionCommand::StopMixRecord => DispatchResult {
                events: Vec::new(),
                exported_mix: self.mix_record_buffer.take(),
            },
        }
    }

    fn dispatch_track(&mut self, idx: usize, cmd: TrackCommand) -> Vec<SessionEvent> {
        if idx < 1 || idx > self.tracks.len() {
            return vec![SessionEvent::Error("InvalidState", "unknown track".into())];
        }
        match cmd {
            TrackCommand::Press => self.press(idx),
            TrackCommand::Stop => self.stop(idx),
            TrackCommand::Clear => self.clear(idx),
            TrackCommand::SetDivider(d) => match self.tracks[idx - 1].set_divider(d) {
                Ok(()) => vec![],
                Err(e) => vec![SessionEvent::Error(e.kind(), e.to_string())],
            },
            TrackCommand::AddEffect(kind) => self.add_effect(idx, kind),
            TrackCommand::MoveEffect(id, dir) => {
                self.tracks[idx - 1].effects_mut().move_effect(id, dir);
                vec![]
            }
            TrackCommand::RemoveEffect(id) => {
                self.tracks[idx - 1].effects_mut().remove(id);
                vec![]
            }
            TrackCommand::ToggleBypass(id) => {
                self.tracks[idx - 1].effects_mut().toggle_bypass(id);
                vec![]
            }
            TrackCommand::SetParam(id, key, value) => self.set_param(idx, id, &key, value),
            TrackCommand::Undo => match self.tracks[idx - 1].undo() {
                Ok(()) => vec![SessionEvent::TrackStateChanged(idx, self.tracks[idx - 1].state())],
                Err(e) => vec![SessionEvent::Error(e.kind(), e.to_string())],
            },
        }
    }

    fn press(&mut self, idx: usize) -> Vec<SessionEvent> {
        let track = &self.tracks[idx - 1];
        if track.state() == TrackState::Playing && self.loopback_detected && !self.loopback_confirmed {
            return vec![SessionEvent::Error(
                "LoopbackDetected",
                format!("track {idx} overdub requires confirmation"),
            )];
        }

        let master = self.master_info();
        let outcome = match self.tracks[idx - 1].handle_press(&self.clock, master) {
            Ok(outcome) => outcome,
            Err(e) => return vec![SessionEvent::Error(e.kind(), e.to_string())],
        };

        match outcome {
            PressOutcome::StartRecordingNow => {
                self.begin_capture(idx, CaptureKind::Loop);
                vec![SessionEvent::TrackStateChanged(idx, TrackState::Recording)]
            }
            PressOutcome::WaitForBar { start_at, .. } => {
                self.pending_bar.insert(idx, start_at);
                vec![SessionEvent::TrackStateChanged(idx, TrackState::Waiting)]
            }
            PressOutcome::StopRecording => self.finish_capture(idx),
            PressOutcome::ArmOverdub { delay } => {
                let start_at = self.clock.now() + delay.as_secs_f64();
                self.pending_overdub_arm.insert(idx, start_at);
                vec![SessionEvent::TrackStateChanged(idx, TrackState::Overdub)]
            }
            PressOutcome::FinishOverdub => self.finish_overdub(idx),
            PressOutcome::Resume => vec![SessionEvent::TrackStateChanged(idx, TrackState::Playing)],
        }
    }

    fn stop(&mut self, idx: usize) -> Vec<SessionEvent> {
        match self.tracks[idx - 1].handle_stop() {
            Ok(StopOutcome::AbortRecording) => {
                self.abort_active_capture(idx);
                match self.tracks[idx - 1].abort_recording() {
                    Ok(()) => vec![SessionEvent::TrackStateChanged(idx, TrackState::Ready)],
                    Err(e) => vec![SessionEvent::Error(e.kind(), e.to_string())],
                }
            }
            Ok(StopOutcome::AbortOverdub) => {
                self.abort_active_capture(idx);
                self.restore_overdub_guard();
                match self.tracks[idx - 1].abort_overdub() {
                    Ok(()) => vec![SessionEvent::TrackStateChanged(idx, TrackState::Playing)],
                    Err(e) => vec![SessionEvent::Error(e.kind(), e.to_string())],
                }
            }
            Ok(StopOutcome::Stopped) => vec![SessionEvent::TrackStateChanged(idx, TrackState::Stopped)],
            Ok(StopOutcome::Resumed) => vec![SessionEvent::TrackStateChanged(idx, TrackState::Playing)],
            Err(e) => vec![SessionEvent::Error(e.kind(), e.to_string())],
        }
    }

    fn clear(&mut self, idx: usize) -> Vec<SessionEvent> {
        self.abort_active_capture(idx);
        self.tracks[idx - 1].handle_clear();
        let mut events = vec![SessionEvent::TrackStateChanged(idx, TrackState::Ready)];

        if idx == 1 {
            self.master_set = false;
            self.master_duration = None;
            self.master_bpm = None;
            for dep_idx in 2..=self.tracks.len() {
                self.abort_active_capture(dep_idx);
                self.tracks[dep_idx - 1].handle_clear();
                events.push(SessionEvent::TrackStateChanged(dep_idx, TrackState::Ready));
            }
        }
        events
    }

    fn add_effect(&mut self, idx: usize, kind: EffectKind) -> Vec<SessionEvent> {
        let semitones = if let EffectKind::Pitch { semitones } = kind { Some(semitones) } else { None };
        self.tracks[idx - 1].effects_mut().add(kind);
        match semitones {
            Some(s) => self.set_pitch(idx, s),
            None => vec![],
        }
    }

    fn set_param(&mut self, idx: usize, id: u64, key: &str, value: f32) -> Vec<SessionEvent> {
        self.tracks[idx - 1].effects_mut().set_param(id, key, value);
        if key == "semitones" {
            self.set_pitch(idx, value as i32)
        } else {
            vec![]
        }
    }

    fn set_pitch(&mut self, idx: usize, semitones: i32) -> Vec<SessionEvent> {
        if !(-12..=12).contains(&semitones) {
            return vec![SessionEvent::Error("InvalidState", "semitones out of range [-12, 12]".into())];
        }
        match self.tracks[idx - 1].request_pitch_shift() {
            Ok(buffer) => {
                let (handle, rx) = self.pitch_pool.submit(buffer.clone(), semitones as f32, self.config.clone());
                let job_id = handle.id();
                let submitted_at = self.clock.now();
                self.tracks[idx - 1].set_pending_pitch(handle);
                self.pending_pitch.insert(
                    idx,
                    PendingPitch { job_id, semitones, rx, source: buffer, submitted_at },
                );
                vec![]
            }
            Err(e) => vec![SessionEvent::Error(e.kind(), e.to_string())],
        }
    }

    fn poll_pitch_jobs(&mut self) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        let mut done = Vec::new();
        let now = self.clock.now();
        let timeout_s = self.config.pitch_job_timeout_ms as f64 / 1000.0;

        for (&idx, pending) in self.pending_pitch.iter() {
            match pending.rx.try_recv() {
                Ok(Ok(shifted)) => {
                    if self.tracks[idx - 1].commit_pitch(pending.job_id, shifted, pending.semitones, now) {
                        events.push(SessionEvent::PitchProgress(idx, 1.0));
                        events.push(SessionEvent::TrackStateChanged(idx, self.tracks[idx - 1].state()));
                    }
                    done.push(idx);
                }
                Ok(Err(e)) => {
                    self.tracks[idx - 1].cancel_pitch(pending.job_id);
                    events.push(SessionEvent::Error(e.kind(), e.to_string()));
                    done.push(idx);
                }
                Err(TryRecvError::Empty) => {
                    if now - pending.submitted_at > timeout_s {
                        // Worker pool missed its deadline; cancel it and
                        // finish the job synchronously so it always
                        // completes (spec §4.3/§4.7's inline fallback).
                        self.tracks[idx - 1].cancel_pending_pitch_handle();
                        let shifted =
                            crate::pitch::engine::shift_buffer(&pending.source, pending.semitones as f32, &self.config);
                        match shifted {
                            Ok(buffer) => {
                                if self.tracks[idx - 1].commit_pitch(pending.job_id, buffer, pending.semitones, now) {
                                    events.push(SessionEvent::PitchProgress(idx, 1.0));
                                    events.push(SessionEvent::TrackStateChanged(idx, self.tracks[idx - 1].state()));
                                }
                            }
                            Err(e) => {
                                self.tracks[idx - 1].cancel_pitch(pending.job_id);
                                events.push(SessionEvent::Error(e.kind(), e.to_string()));
                            }
                        }
                        done.push(idx);
                    }
                }
                Err(TryRecvError::Disconnected) => {
                    self.tracks[idx - 1].cancel_pitch(pending.job_id);
                    done.push(idx);
                }
            }
        }

        for idx in done {
            self.pending_pitch.remove(&idx);
        }
        events
    }

    fn begin_capture(&mut self, idx: usize, kind: CaptureKind) {
        let master = self.master_info();
        let expected = self.tracks[idx - 1].expected_record_duration(master);
        let expected_ms = expected.as_millis().min(u128::from(u64::MAX)) as u64;

        match self.recorder.start(expected_ms, self.channels, self.sample_rate) {
            Ok(rec) => {
                if kind == CaptureKind::Overdub && self.config.auto_mute_monitor_on_overdub {
                    self.prior_master_gain = Some(self.master_bus_gain);
                    self.prior_monitor = Some(self.monitor_connected);
                    self.master_bus_gain = 0.0;
                    self.monitor_connected = false;
                }
                self.active_capture = Some((idx, rec, kind));
            }
            Err(_) => {
                // The recording lease is process-wide and every capture
                // path goes through `dispatch`, so a second concurrent
                // start should never actually happen; if it somehow did,
                // drop the request rather than leaving the track state
                // inconsistent.
            }
        }
    }

    fn finish_capture(&mut self, idx: usize) -> Vec<SessionEvent> {
        let Some((active_idx, rec, kind)) = self.active_capture.take() else {
            return vec![SessionEvent::Error("InvalidState", "no active capture to finish".into())];
        };
        if active_idx != idx {
            self.active_capture = Some((active_idx, rec, kind));
            return vec![SessionEvent::Error(
                "InvalidState",
                format!("capture belongs to track {active_idx}, not {idx}"),
            )];
        }

        match rec.stop() {
            Ok(buffer) => match kind {
                CaptureKind::Loop => self.finish_recording_with_buffer(idx, buffer),
                CaptureKind::Overdub => self.finish_overdub_with_buffer(idx, buffer),
            },
            Err(e) => vec![SessionEvent::Error(e.kind(), e.to_string())],
        }
    }

    fn finish_recording_with_buffer(&mut self, idx: usize, buffer: AudioBuffer) -> Vec<SessionEvent> {
        let now = self.clock.now();
        match self.tracks[idx - 1].commit_recording(buffer, now) {
            Ok(MasterUpdate::Updated { duration, bpm }) => {
                self.master_set = true;
                self.master_duration = Some(duration);
                self.master_bpm = Some(bpm);
                self.clock.set_bpm(bpm as f32);

                let mut events = vec![
                    SessionEvent::TrackStateChanged(idx, TrackState::Playing),
                    SessionEvent::TransportChanged(duration, bpm),
                ];
                events.extend(self.realign_dependents(now));
                events
            }
            Ok(MasterUpdate::NotMaster) => vec![SessionEvent::TrackStateChanged(idx, TrackState::Playing)],
            Err(e) => vec![SessionEvent::Error(e.kind(), e.to_string())],
        }
    }

    /// Re-align every Playing/Overdub dependent track to `now` while
    /// preserving its relative phase offset (spec §4.1, triggered when
    /// the master track is re-recorded).
    fn realign_dependents(&mut self, now: f64) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        for track in self.tracks.iter_mut().skip(1) {
            if matches!(track.state(), TrackState::Playing | TrackState::Overdub) {
                track.realign(now);
                events.push(SessionEvent::TrackStateChanged(track.index(), track.state()));
            }
        }
        events
    }

    fn finish_overdub(&mut self, idx: usize) -> Vec<SessionEvent> {
        if let Some((active_idx, rec, CaptureKind::Overdub)) = self.active_capture.take() {
            if active_idx == idx {
                return match rec.stop() {
                    Ok(buffer) => self.finish_overdub_with_buffer(idx, buffer),
                    Err(e) => vec![SessionEvent::Error(e.kind(), e.to_string())],
                };
            }
            self.active_capture = Some((active_idx, rec, CaptureKind::Overdub));
        }

        // Still only armed; nothing captured yet, so finishing is
        // equivalent to abandoning the overdub.
        self.pending_overdub_arm.remove(&idx);
        self.restore_overdub_guard();
        match self.tracks[idx - 1].abort_overdub() {
            Ok(()) => vec![SessionEvent::TrackStateChanged(idx, TrackState::Playing)],
            Err(e) => vec![SessionEvent::Error(e.kind(), e.to_string())],
        }
    }

    fn finish_overdub_with_buffer(&mut self, idx: usize, captured: AudioBuffer) -> Vec<SessionEvent> {
        self.restore_overdub_guard();
        let Some(existing) = self.tracks[idx - 1].buffer().cloned() else {
            return vec![SessionEvent::Error("InvalidState", "overdub with no existing loop buffer".into())];
        };
        match self.mixer.mix(&existing, &captured, self.config.allow_wrap_overdub) {
            Ok(mixed) => match self.tracks[idx - 1].commit_overdub(mixed) {
                Ok(()) => vec![SessionEvent::TrackStateChanged(idx, TrackState::Playing)],
                Err(e) => vec![SessionEvent::Error(e.kind(), e.to_string())],
            },
            Err(e) => vec![SessionEvent::Error(e.kind(), e.to_string())],
        }
    }

    fn abort_active_capture(&mut self, idx: usize) {
        if let Some((active_idx, rec, kind)) = self.active_capture.take() {
            if active_idx == idx {
                rec.abort();
                if kind == CaptureKind::Overdub {
                    self.restore_overdub_guard();
                }
            } else {
                self.active_capture = Some((active_idx, rec, kind));
            }
        }
        self.pending_bar.remove(&idx);
        self.pending_overdub_arm.remove(&idx);
    }

    fn restore_overdub_guard(&mut self) {
        if let Some(gain) = self.prior_master_gain.take() {
            self.master_bus_gain = gain;
        }
        if let Some(monitor) = self.prior_monitor.take() {
            self.monitor_connected = monitor;
        }
    }

    fn master_info(&self) -> Option<(f64, f64)> {
        if !self.master_set {
            return None;
        }
        self.master_duration
            .map(|d| (self.tracks[0].loop_start_time(), d.as_secs_f64()))
    }
}
