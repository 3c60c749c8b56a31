//! Loop Track state machine
//!
//! Owns one track's loop buffer, effect chain, and bounded undo stack,
//! and implements the Ready/Waiting/Recording/Playing/Overdub/Stopped
//! state machine. A [`LoopTrack`] never talks to the Recorder or the
//! Pitch Engine's worker pool directly — it returns an intent
//! ([`PressOutcome`], [`StopOutcome`]) describing what must happen next,
//! and the Session Coordinator drives the actual I/O, calling back into
//! one of the `commit_*`/`abort_*` methods once the async work lands.
//! This keeps the state machine synchronous and trivially testable.

use std::collections::VecDeque;
use std::time::Duration;

use crate::audio::effects::{EffectDescriptor, EffectKind, EffectsChain};
use crate::core::buffer::AudioBuffer;
use crate::error::{LoopEngineError, TrackError};
use crate::pitch::pool::PitchJobHandle;
use crate::sync::clock::TransportClock;

/// Track 1 ignores bar alignment and is hard-capped at this duration.
pub const MASTER_MAX_RECORD: Duration = Duration::from_secs(60);

/// The six states a [`LoopTrack`] can occupy (spec §4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackState {
    /// Nothing recorded; awaiting the first Press.
    Ready,
    /// A dependent track armed, waiting for the next bar boundary.
    Waiting,
    /// Actively capturing into a new loop buffer.
    Recording,
    /// Looping an existing buffer.
    Playing,
    /// Armed or actively capturing an overdub; still audibly looping.
    Overdub,
    /// Looping paused; buffer retained.
    Stopped,
}

/// What the Session Coordinator must do in response to a `Press`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PressOutcome {
    /// Begin a mic capture immediately (master track, or a dependent
    /// whose bar boundary is already `now`).
    StartRecordingNow,
    /// Dependent track armed; fire a timer in `wait` seconds and then
    /// call [`LoopTrack::bar_fired`] followed by starting the capture.
    WaitForBar {
        /// Absolute audio-clock time the capture should begin at.
        start_at: f64,
        /// Seconds to wait from now.
        wait: f64,
    },
    /// Currently recording; stop the capture and call
    /// [`LoopTrack::commit_recording`] with the decoded result.
    StopRecording,
    /// Overdub armed; start a capture after `delay` seconds and call
    /// [`LoopTrack::commit_overdub`] on completion.
    ArmOverdub {
        /// Seconds until the next loop boundary.
        delay: Duration,
    },
    /// Currently overdubbing; stop the capture early and mix it in via
    /// [`LoopTrack::commit_overdub`].
    FinishOverdub,
    /// Resume looping from Stopped.
    Resume,
}

/// What the Session Coordinator must do in response to a `Stop`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StopOutcome {
    /// Abort the in-flight capture; call [`LoopTrack::abort_recording`].
    AbortRecording,
    /// Abort the in-flight overdub capture without mixing; call
    /// [`LoopTrack::abort_overdub`].
    AbortOverdub,
    /// Playback paused.
    Stopped,
    /// Playback resumed.
    Resumed,
}

/// Result of a successful master-track recording commit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MasterUpdate {
    /// This track is not the master; no transport-wide effect.
    NotMaster,
    /// New master duration/bpm now in effect.
    Updated {
        /// New master loop duration.
        duration: Duration,
        /// Derived BPM, `round(60 / duration * 4)` (four-beat bar).
        bpm: u32,
    },
}

struct UndoSnapshot {
    buffer: Option<AudioBuffer>,
    loop_duration: Option<Duration>,
    effects: Vec<EffectDescriptor>,
}

/// One of the four tracks in a session.
pub struct LoopTrack {
    index: usize,
    state: TrackState,
    buffer: Option<AudioBuffer>,
    loop_start_time: f64,
    loop_duration: Option<Duration>,
    divider: u32,
    effects: EffectsChain,
    undo_stack: VecDeque<UndoSnapshot>,
    undo_limit: usize,
    pitch_semitones: i32,
    ui_disabled: bool,
    pending_pitch: Option<PitchJobHandle>,
    sample_rate: u32,
    channels: usize,
    play_pos: usize,
}

impl LoopTrack {
    /// Build a track in `Ready` state. `index` is 1-indexed; `1` is the
    /// master track and is never gated.
    pub fn new(index: usize, sample_rate: u32, channels: usize, undo_limit: usize) -> Self {
        Self {
            index,
            state: TrackState::Ready,
            buffer: None,
            loop_start_time: 0.0,
            loop_duration: None,
            divider: 1,
            effects: EffectsChain::new(sample_rate, channels),
            undo_stack: VecDeque::new(),
            undo_limit: undo_limit.max(1),
            pitch_semitones: 0,
            ui_disabled: false,
            pending_pitch: None,
            sample_rate,
            channels,
            play_pos: 0,
        }
    }

    /// 1-indexed track number.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Whether this is the master (Track 1).
    pub fn is_master(&self) -> bool {
        self.index == 1
    }

    /// Current state.
    pub fn state(&self) -> TrackState {
        self.state
    }

    /// Current loop buffer, if any.
    pub fn buffer(&self) -> Option<&AudioBuffer> {
        self.buffer.as_ref()
    }

    /// Current loop duration, if a buffer is present.
    pub fn loop_duration(&self) -> Option<Duration> {
        self.loop_duration
    }

    /// Audio-clock timestamp of the sample currently at buffer offset 0.
    pub fn loop_start_time(&self) -> f64 {
        self.loop_start_time
    }

    /// Divider relative to the master track.
    pub fn divider(&self) -> u32 {
        self.divider
    }

    /// Set the divider. Only valid from `Ready`, and only for dependent
    /// tracks (the master's divider is always 1).
    pub fn set_divider(&mut self, divider: u32) -> Result<(), LoopEngineError> {
        if self.is_master() {
            return Err(TrackError::InvalidStateTransition {
                track: self.index,
                detail: "master track divider is fixed at 1",
            }
            .into());
        }
        if self.state != TrackState::Ready {
            return Err(TrackError::InvalidStateTransition {
                track: self.index,
                detail: "divider can only change while Ready",
            }
            .into());
        }
        self.divider = divider.max(1);
        Ok(())
    }

    /// Current pitch offset in semitones.
    pub fn pitch_semitones(&self) -> i32 {
        self.pitch_semitones
    }

    /// Whether the track is disabled for user input (offline pitch
    /// processing in flight).
    pub fn ui_disabled(&self) -> bool {
        self.ui_disabled
    }

    /// Mutable access to the effect chain, for `AddEffect`/`MoveEffect`/
    /// `RemoveEffect`/`ToggleBypass`/`SetParam` commands.
    pub fn effects_mut(&mut self) -> &mut EffectsChain {
        &mut self.effects
    }

    /// Read-only access to the effect chain.
    pub fn effects(&self) -> &EffectsChain {
        &self.effects
    }

    /// Expected capture duration for a Press from `Ready`: 60s uncapped
    /// for the master, `master_duration * divider` for a dependent.
    pub fn expected_record_duration(&self, master: Option<(f64, f64)>) -> Duration {
        if self.is_master() {
            MASTER_MAX_RECORD
        } else {
            let master_duration = master.map(|(_, d)| d).unwrap_or(0.0);
            Duration::from_secs_f64(master_duration * self.divider as f64)
        }
    }

    /// Handle a `Press` command. See [`PressOutcome`] for what the caller
    /// must do next.
    pub fn handle_press(
        &mut self,
        clock: &TransportClock,
        master: Option<(f64, f64)>,
    ) -> Result<PressOutcome, LoopEngineError> {
        match self.state {
            TrackState::Ready => {
                if !self.is_master() && master.is_none() {
                    return Err(TrackError::MasterNotSet { track: self.index }.into());
                }
                if self.is_master() {
                    self.state = TrackState::Recording;
                    return Ok(PressOutcome::StartRecordingNow);
                }
                let (start_at, wait) = clock.schedule_next_bar(master, self.divider);
                if wait <= f64::EPSILON {
                    self.state = TrackState::Recording;
                    Ok(PressOutcome::StartRecordingNow)
                } else {
                    self.state = TrackState::Waiting;
                    Ok(PressOutcome::WaitForBar { start_at, wait })
                }
            }
            TrackState::Waiting => Err(TrackError::InvalidStateTransition {
                track: self.index,
                detail: "already waiting for the next bar boundary",
            }
            .into()),
            TrackState::Recording => Ok(PressOutcome::StopRecording),
            TrackState::Playing => {
                let loop_start = self.loop_start_time;
                let loop_dur = self
                    .loop_duration
                    .ok_or(TrackError::InvalidStateTransition {
                        track: self.index,
                        detail: "playing with no loop duration set",
                    })?
                    .as_secs_f64();
                let now = clock.now();
                let elapsed = if loop_dur > 0.0 {
                    (now - loop_start).rem_euclid(loop_dur)
                } else {
                    0.0
                };
                let delay = (loop_dur - elapsed).max(0.0);
                self.state = TrackState::Overdub;
                Ok(PressOutcome::ArmOverdub {
                    delay: Duration::from_secs_f64(delay),
                })
            }
            TrackState::Overdub => Ok(PressOutcome::FinishOverdub),
            TrackState::Stopped => {
                self.state = TrackState::Playing;
                Ok(PressOutcome::Resume)
            }
        }
    }

    /// Handle a `Stop` command.
    pub fn handle_stop(&mut self) -> Result<StopOutcome, LoopEngineError> {
        match self.state {
            TrackState::Recording => Ok(StopOutcome::AbortRecording),
            TrackState::Overdub => Ok(StopOutcome::AbortOverdub),
            TrackState::Playing => {
                self.state = TrackState::Stopped;
                Ok(StopOutcome::Stopped)
            }
            TrackState::Stopped => {
                self.state = TrackState::Playing;
                Ok(StopOutcome::Resumed)
            }
            TrackState::Ready | TrackState::Waiting => Err(TrackError::InvalidStateTransition {
                track: self.index,
                detail: "nothing to stop",
            }
            .into()),
        }
    }

    /// Handle `Clear`: discard buffer, undo history, effects, and cancel
    /// any in-flight pitch job. Valid from any state.
    pub fn handle_clear(&mut self) {
        if let Some(job) = self.pending_pitch.take() {
            job.cancel();
        }
        self.state = TrackState::Ready;
        self.buffer = None;
        self.loop_duration = None;
        self.pitch_semitones = 0;
        self.ui_disabled = false;
        self.undo_stack.clear();
        self.effects.clear();
    }

    /// Called by the Session Coordinator when a `Waiting` track's bar
    /// boundary timer fires.
    pub fn bar_fired(&mut self) -> Result<(), LoopEngineError> {
        if self.state != TrackState::Waiting {
            return Err(TrackError::InvalidStateTransition {
                track: self.index,
                detail: "bar_fired called outside Waiting",
            }
            .into());
        }
        self.state = TrackState::Recording;
        Ok(())
    }

    fn push_undo(&mut self) {
        if self.undo_stack.len() >= self.undo_limit {
            self.undo_stack.pop_front();
        }
        self.undo_stack.push_back(UndoSnapshot {
            buffer: self.buffer.clone(),
            loop_duration: self.loop_duration,
            effects: self.effects.descriptors().to_vec(),
        });
    }

    /// Install a freshly captured buffer as this track's loop, completing
    /// a `Recording -> Playing` transition. Returns the new master
    /// duration/bpm if this is Track 1.
    pub fn commit_recording(&mut self, buffer: AudioBuffer, now: f64) -> Result<MasterUpdate, LoopEngineError> {
        if self.state != TrackState::Recording {
            return Err(TrackError::InvalidStateTransition {
                track: self.index,
                detail: "commit_recording outside Recording",
            }
            .into());
        }
        self.push_undo();
        let duration = buffer.duration();
        self.loop_duration = Some(duration);
        self.loop_start_time = now;
        self.buffer = Some(buffer);
        self.state = TrackState::Playing;

        if self.is_master() {
            let secs = duration.as_secs_f64().max(1e-9);
            let bpm = ((60.0 / secs) * 4.0).round().max(1.0) as u32;
            Ok(MasterUpdate::Updated { duration, bpm })
        } else {
            Ok(MasterUpdate::NotMaster)
        }
    }

    /// Discard an in-flight recording (`Recording -> Ready`, buffer never
    /// existed so nothing to restore).
    pub fn abort_recording(&mut self) -> Result<(), LoopEngineError> {
        if self.state != TrackState::Recording {
            return Err(TrackError::InvalidStateTransition {
                track: self.index,
                detail: "abort_recording outside Recording",
            }
            .into());
        }
        self.state = TrackState::Ready;
        Ok(())
    }

    /// Install a mixed overdub result (`Overdub -> Playing`).
    pub fn commit_overdub(&mut self, mixed: AudioBuffer) -> Result<(), LoopEngineError> {
        if self.state != TrackState::Overdub {
            return Err(TrackError::InvalidStateTransition {
                track: self.index,
                detail: "commit_overdub outside Overdub",
            }
            .into());
        }
        self.push_undo();
        self.buffer = Some(mixed);
        self.state = TrackState::Playing;
        Ok(())
    }

    /// Abandon an armed or in-flight overdub (`Overdub -> Playing`), the
    /// prior loop buffer is untouched since nothing was ever committed.
    pub fn abort_overdub(&mut self) -> Result<(), LoopEngineError> {
        if self.state != TrackState::Overdub {
            return Err(TrackError::InvalidStateTransition {
                track: self.index,
                detail: "abort_overdub outside Overdub",
            }
            .into());
        }
        self.state = TrackState::Playing;
        Ok(())
    }

    /// Re-align this track's phase to `now` while preserving its current
    /// relative offset within the loop (spec §4.1, triggered when the
    /// master is re-recorded). No-op if there is no loop duration yet.
    pub fn realign(&mut self, now: f64) {
        if let Some(duration) = self.loop_duration {
            let dur = duration.as_secs_f64();
            if dur > 0.0 {
                let offset = (now - self.loop_start_time).rem_euclid(dur);
                self.loop_start_time = now - offset;
            }
        }
    }

    /// Validate that a pitch shift can be requested, returning the buffer
    /// to submit to the worker pool. Any previously in-flight job on this
    /// track is cancelled and an undo snapshot is pushed.
    pub fn request_pitch_shift(&mut self) -> Result<AudioBuffer, LoopEngineError> {
        let buffer = self
            .buffer
            .clone()
            .ok_or(TrackError::InvalidStateTransition {
                track: self.index,
                detail: "no loop buffer to pitch-shift",
            })?;
        if let Some(prev) = self.pending_pitch.take() {
            prev.cancel();
        }
        self.push_undo();
        self.ui_disabled = true;
        Ok(buffer)
    }

    /// Record the handle of a just-submitted pitch job.
    pub fn set_pending_pitch(&mut self, handle: PitchJobHandle) {
        self.pending_pitch = Some(handle);
    }

    /// Progress of the in-flight pitch job, if any.
    pub fn pending_pitch_progress(&self) -> Option<f32> {
        self.pending_pitch.as_ref().map(|h| h.progress())
    }

    /// Apply a completed pitch shift, if `job_id` still matches the
    /// pending job (guards against a stale completion racing a newer
    /// cancel-and-resubmit). Returns whether it was applied.
    pub fn commit_pitch(&mut self, job_id: u64, shifted: AudioBuffer, semitones: i32, now: f64) -> bool {
        if self.pending_pitch.as_ref().map(|h| h.id()) != Some(job_id) {
            return false;
        }
        self.pending_pitch = None;
        self.ui_disabled = false;
        self.loop_duration = Some(shifted.duration());
        self.loop_start_time = now;
        self.buffer = Some(shifted);
        self.pitch_semitones = semitones;
        true
    }

    /// Mark a pitch job as cancelled or failed: clear the pending handle
    /// and re-enable UI, leaving the buffer untouched.
    pub fn cancel_pitch(&mut self, job_id: u64) {
        if self.pending_pitch.as_ref().map(|h| h.id()) == Some(job_id) {
            self.pending_pitch = None;
            self.ui_disabled = false;
        }
    }

    /// Signal cancellation to the in-flight pitch job's worker without
    /// clearing the pending-job bookkeeping. Used when the caller is about
    /// to run an inline fallback shift and will settle the job itself via
    /// `commit_pitch`/`cancel_pitch` once that finishes.
    pub fn cancel_pending_pitch_handle(&self) {
        if let Some(handle) = &self.pending_pitch {
            handle.cancel();
        }
    }

    /// Undo the most recent destructive mutation.
    pub fn undo(&mut self) -> Result<(), LoopEngineError> {
        let snapshot = self
            .undo_stack
            .pop_back()
            .ok_or(TrackError::NothingToUndo { track: self.index })?;
        self.buffer = snapshot.buffer;
        self.loop_duration = snapshot.loop_duration;
        self.effects.restore(snapshot.effects);
        Ok(())
    }

    /// Render `frames` samples of this track's contribution to the master
    /// bus: silence outside `Playing`/`Overdub`, otherwise the loop
    /// buffer read from its own cursor (wrapping at the loop boundary)
    /// and run through the effect chain — "owns its playback source"
    /// (spec §2's component table). The cursor advances regardless of
    /// whether an overdub capture happens to be active concurrently, so
    /// the loop keeps playing while it is being overdubbed.
    pub fn render(&mut self, frames: usize) -> AudioBuffer {
        if !matches!(self.state, TrackState::Playing | TrackState::Overdub) {
            return AudioBuffer::silence(self.sample_rate, self.channels, frames);
        }
        let Some(buffer) = self.buffer.as_ref() else {
            return AudioBuffer::silence(self.sample_rate, self.channels, frames);
        };
        let len = buffer.len();
        if len == 0 || buffer.channels() == 0 {
            return AudioBuffer::silence(self.sample_rate, self.channels, frames);
        }

        let mut out = vec![vec![0.0f32; frames]; self.channels];
        for (c, out_channel) in out.iter_mut().enumerate() {
            let src = buffer.channel(c % buffer.channels()).unwrap_or(&[]);
            for (i, sample) in out_channel.iter_mut().enumerate() {
                *sample = src[(self.play_pos + i) % len];
            }
        }
        self.play_pos = (self.play_pos + frames) % len;

        let mut rendered = AudioBuffer::from_data(out, self.sample_rate)
            .unwrap_or_else(|_| AudioBuffer::silence(self.sample_rate, self.channels, frames));
        self.effects.process(&mut rendered);
        rendered
    }

    /// Sample rate this track was constructed with.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Channel count this track was constructed with.
    pub fn channels(&self) -> usize {
        self.channels
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn silence(secs: f32, sample_rate: u32) -> AudioBuffer {
        AudioBuffer::silence(sample_rate, 1, (sample_rate as f32 * secs) as usize)
    }

    #[test]
    fn master_press_starts_recording_immediately() {
        let mut track = LoopTrack::new(1, 44100, 1, 6);
        let clock = TransportClock::new();
        let outcome = track.handle_press(&clock, None).unwrap();
        assert_eq!(outcome, PressOutcome::StartRecordingNow);
        assert_eq!(track.state(), TrackState::Recording);
    }

    #[test]
    fn dependent_press_rejected_without_master() {
        let mut track = LoopTrack::new(2, 44100, 1, 6);
        let clock = TransportClock::new();
        let err = track.handle_press(&clock, None).unwrap_err();
        assert!(matches!(err, LoopEngineError::InvalidState(TrackError::MasterNotSet { .. })));
        assert_eq!(track.state(), TrackState::Ready);
    }

    #[test]
    fn commit_recording_sets_master_bpm() {
        let mut track = LoopTrack::new(1, 44100, 1, 6);
        let clock = TransportClock::new();
        track.handle_press(&clock, None).unwrap();
        let update = track.commit_recording(silence(2.0, 44100), 0.0).unwrap();
        assert_eq!(update, MasterUpdate::Updated { duration: Duration::from_secs(2), bpm: 120 });
        assert_eq!(track.state(), TrackState::Playing);
    }

    #[test]
    fn recording_press_requests_stop_without_state_change() {
        let mut track = LoopTrack::new(1, 44100, 1, 6);
        let clock = TransportClock::new();
        track.handle_press(&clock, None).unwrap();
        let outcome = track.handle_press(&clock, None).unwrap();
        assert_eq!(outcome, PressOutcome::StopRecording);
        assert_eq!(track.state(), TrackState::Recording);
    }

    #[test]
    fn stop_aborts_recording_then_commit_restores_ready() {
        let mut track = LoopTrack::new(1, 44100, 1, 6);
        let clock = TransportClock::new();
        track.handle_press(&clock, None).unwrap();
        let outcome = track.handle_stop().unwrap();
        assert_eq!(outcome, StopOutcome::AbortRecording);
        track.abort_recording().unwrap();
        assert_eq!(track.state(), TrackState::Ready);
    }

    #[test]
    fn playing_press_arms_overdub() {
        let mut track = LoopTrack::new(2, 44100, 1, 6);
        let clock = TransportClock::new();
        track.set_divider(1).unwrap();
        let (start_at, _) = clock.schedule_next_bar(Some((0.0, 1.0)), 1);
        track.handle_press(&clock, Some((0.0, 1.0))).unwrap();
        track.bar_fired().unwrap();
        track.commit_recording(silence(1.0, 44100), start_at).unwrap();
        assert_eq!(track.state(), TrackState::Playing);

        let outcome = track.handle_press(&clock, Some((0.0, 1.0))).unwrap();
        assert!(matches!(outcome, PressOutcome::ArmOverdub { .. }));
        assert_eq!(track.state(), TrackState::Overdub);
    }

    #[test]
    fn undo_restores_previous_buffer() {
        let mut track = LoopTrack::new(1, 44100, 1, 6);
        let clock = TransportClock::new();
        track.handle_press(&clock, None).unwrap();
        track.commit_recording(silence(1.0, 44100), 0.0).unwrap();

        track.handle_press(&clock, None).unwrap();
        track.commit_recording(silence(2.0, 44100), 10.0).unwrap();
        assert_eq!(track.loop_duration(), Some(Duration::from_secs(2)));

        track.undo().unwrap();
        assert_eq!(track.loop_duration(), Some(Duration::from_secs(1)));
    }

    #[test]
    fn undo_with_empty_stack_errors() {
        let mut track = LoopTrack::new(1, 44100, 1, 6);
        let err = track.undo().unwrap_err();
        assert!(matches!(err, LoopEngineError::InvalidState(TrackError::NothingToUndo { .. })));
    }

    #[test]
    fn undo_stack_is_bounded() {
        let mut track = LoopTrack::new(1, 44100, 1, 3);
        let clock = TransportClock::new();
        for i in 0..5 {
            track.handle_press(&clock, None).unwrap();
            if track.state() != TrackState::Recording {
                track.handle_stop().unwrap();
                track.handle_press(&clock, None).unwrap();
            }
            track.commit_recording(silence(1.0 + i as f32, 44100), i as f64).unwrap();
        }
        assert!(track.undo_stack.len() <= 3);
    }

    #[test]
    fn realign_preserves_relative_offset() {
        let mut track = LoopTrack::new(2, 44100, 1, 6);
        track.loop_duration = Some(Duration::from_secs(2));
        track.loop_start_time = 0.0;
        // At now=3.0, offset within a 2s loop is 1.0s.
        track.realign(3.0);
        let dur = track.loop_duration().unwrap().as_secs_f64();
        let new_offset = (3.0 - track.loop_start_time()).rem_euclid(dur);
        assert!((new_offset - 1.0).abs() < 1e-9);
    }

    #[test]
    fn clear_cancels_pending_pitch_and_resets() {
        let mut track = LoopTrack::new(1, 44100, 1, 6);
        let clock = TransportClock::new();
        track.handle_press(&clock, None).unwrap();
        track.commit_recording(silence(1.0, 44100), 0.0).unwrap();
        track.handle_clear();
        assert_eq!(track.state(), TrackState::Ready);
        assert!(track.buffer().is_none());
    }

    #[test]
    fn render_loops_the_buffer_past_its_end() {
        let mut track = LoopTrack::new(1, 44100, 1, 6);
        let clock = TransportClock::new();
        track.handle_press(&clock, None).unwrap();
        track
            .commit_recording(AudioBuffer::from_data(vec![vec![0.1, 0.2, 0.3]], 44100).unwrap(), 0.0)
            .unwrap();

        let first = track.render(2);
        assert_eq!(first.channel(0).unwrap(), &[0.1, 0.2]);
        let second = track.render(2);
        assert_eq!(second.channel(0).unwrap(), &[0.3, 0.1]);
    }

    #[test]
    fn render_is_silent_when_stopped() {
        let mut track = LoopTrack::new(1, 44100, 1, 6);
        let clock = TransportClock::new();
        track.handle_press(&clock, None).unwrap();
        track.commit_recording(silence(1.0, 44100), 0.0).unwrap();
        track.handle_stop().unwrap();
        let out = track.render(10);
        assert!(out.channel(0).unwrap().iter().all(|&s| s == 0.0));
    }

    #[test]
    fn stopped_resumes_on_press_not_stop() {
        let mut track = LoopTrack::new(1, 44100, 1, 6);
        let clock = TransportClock::new();
        track.handle_press(&clock, None).unwrap();
        track.commit_recording(silence(1.0, 44100), 0.0).unwrap();
        track.handle_stop().unwrap();
        assert_eq!(track.state(), TrackState::Stopped);
        let outcome = track.handle_stop().unwrap();
        assert_eq!(outcome, StopOutcome::Resumed);
        assert_eq!(track.state(), TrackState::Playing);
    }
}
