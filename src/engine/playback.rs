//! Playback State Coordinator
//!
//! Tracks transport state for the buffer currently being previewed and
//! keeps the listener's place when a re-render swaps the buffer out.
//!
//! ```text
//! Idle -> Loaded -> { Playing <-> Paused } -> Idle
//! ```

use std::fmt;
use std::time::Duration;

use log::{debug, warn};

use crate::engine::buffer::SampleBuffer;

/// Transport states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackState {
    /// Nothing loaded (default state)
    #[default]
    Idle,
    /// A buffer is loaded and has not been started
    Loaded,
    /// Audio is actively playing
    Playing,
    /// Playback has been paused or ran to the end
    Paused,
}

impl fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlaybackState::Idle => write!(f, "Idle"),
            PlaybackState::Loaded => write!(f, "Loaded"),
            PlaybackState::Playing => write!(f, "Playing"),
            PlaybackState::Paused => write!(f, "Paused"),
        }
    }
}

/// What a buffer swap captured and restored
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SwapOutcome {
    /// Whether playback was running before the swap
    pub was_playing: bool,
    /// Position as a fraction of the old buffer's duration
    pub position_fraction: f64,
    /// Position in the new buffer, if a seek was performed
    pub resumed_at_secs: Option<f64>,
}

/// Frame count and rate of the loaded buffer
#[derive(Debug, Clone, Copy, PartialEq)]
struct Track {
    frames: usize,
    sample_rate: u32,
}

impl Track {
    fn of(buffer: &SampleBuffer) -> Self {
        Self {
            frames: buffer.frames(),
            sample_rate: buffer.sample_rate,
        }
    }

    fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            0.0
        } else {
            self.frames as f64 / self.sample_rate as f64
        }
    }
}

/// Transport for the session's current buffer
#[derive(Debug, Clone)]
pub struct PlaybackCoordinator {
    state: PlaybackState,
    track: Option<Track>,
    /// Playhead position in seconds
    position: f64,
    recovery_delay: Duration,
    recovery_pending: bool,
}

impl Default for PlaybackCoordinator {
    fn default() -> Self {
        Self::new(Duration::from_millis(100))
    }
}

impl PlaybackCoordinator {
    /// Idle coordinator retrying failed playback after `recovery_delay`
    ///
    /// # Example
    /// ```
    /// use std::time::Duration;
    /// use audio_studio::engine::{PlaybackCoordinator, PlaybackState};
    ///
    /// let playback = PlaybackCoordinator::new(Duration::from_millis(100));
    /// assert_eq!(playback.state(), PlaybackState::Idle);
    /// ```
    pub fn new(recovery_delay: Duration) -> Self {
        Self {
            state: PlaybackState::Idle,
            track: None,
            position: 0.0,
            recovery_delay,
            recovery_pending: false,
        }
    }

    /// Load a fresh buffer, stopped at the start
    pub fn load(&mut self, buffer: &SampleBuffer) {
        self.track = Some(Track::of(buffer));
        self.position = 0.0;
        self.recovery_pending = false;
        self.state = PlaybackState::Loaded;
        debug!("[PLAYBACK] Loaded {:.3}s", self.duration_secs());
    }

    /// Start or resume playback from the playhead
    pub fn play(&mut self) {
        match self.state {
            PlaybackState::Loaded | PlaybackState::Paused => {
                self.state = PlaybackState::Playing;
                debug!("[PLAYBACK] Play from {:.3}s", self.position);
            }
            PlaybackState::Playing => debug!("[PLAYBACK] Already playing"),
            PlaybackState::Idle => warn!("[PLAYBACK] Cannot play: nothing loaded"),
        }
    }

    /// Pause playback, keeping the playhead
    pub fn pause(&mut self) {
        if self.state == PlaybackState::Playing {
            self.state = PlaybackState::Paused;
            debug!("[PLAYBACK] Paused at {:.3}s", self.position);
        }
    }

    /// Play when stopped, pause when playing
    pub fn toggle(&mut self) {
        if self.is_playing() {
            self.pause();
        } else {
            self.play();
        }
    }

    /// Move the playhead to `fraction` of the duration
    ///
    /// The fraction is clamped to [0, 1]; NaN and seeks with nothing
    /// loaded are ignored.
    pub fn seek(&mut self, fraction: f64) {
        if fraction.is_nan() || self.track.is_none() {
            return;
        }
        self.position = fraction.clamp(0.0, 1.0) * self.duration_secs();
        debug!("[PLAYBACK] Seek to {:.3}s", self.position);
    }

    /// Advance the playhead by `frames` of elapsed playback
    ///
    /// Reaching the end pauses and rewinds to the start. Returns true
    /// when the end was reached.
    pub fn advance(&mut self, frames: u64) -> bool {
        let Some(track) = self.track else {
            return false;
        };
        if self.state != PlaybackState::Playing || track.sample_rate == 0 {
            return false;
        }

        self.position += frames as f64 / track.sample_rate as f64;
        if self.position >= track.duration_secs() {
            self.position = 0.0;
            self.state = PlaybackState::Paused;
            debug!("[PLAYBACK] Ended");
            return true;
        }
        false
    }

    /// Replace the loaded buffer, keeping relative position and play state
    ///
    /// The position is carried over only when it lies strictly inside the
    /// old buffer; otherwise the new buffer starts from the beginning.
    pub fn swap_buffer(&mut self, buffer: &SampleBuffer) -> SwapOutcome {
        let previous = self.state;
        let was_playing = previous == PlaybackState::Playing;
        let position_fraction = self.position_fraction();

        self.track = Some(Track::of(buffer));
        self.position = 0.0;
        self.recovery_pending = false;

        let resumed_at_secs = if position_fraction > 0.0 && position_fraction < 1.0 {
            self.position = position_fraction * self.duration_secs();
            Some(self.position)
        } else {
            None
        };

        self.state = match previous {
            PlaybackState::Playing => PlaybackState::Playing,
            PlaybackState::Idle | PlaybackState::Loaded => PlaybackState::Loaded,
            PlaybackState::Paused => PlaybackState::Paused,
        };

        debug!(
            "[PLAYBACK] Swapped buffer: {} at {:.3}s (fraction {:.3})",
            self.state, self.position, position_fraction
        );

        SwapOutcome {
            was_playing,
            position_fraction,
            resumed_at_secs,
        }
    }

    /// Unload everything and return to Idle
    pub fn reset(&mut self) {
        self.state = PlaybackState::Idle;
        self.track = None;
        self.position = 0.0;
        self.recovery_pending = false;
        debug!("[PLAYBACK] Reset");
    }

    /// Report a playback error from the output device
    ///
    /// If playback was running, it is paused and one resume attempt is
    /// scheduled: the returned delay is how long to wait before calling
    /// `attempt_recovery`. Errors while an attempt is pending, or while
    /// not playing, are only logged.
    pub fn on_playback_error(&mut self) -> Option<Duration> {
        if self.recovery_pending {
            warn!("[PLAYBACK] Error while recovery pending; not retrying again");
            return None;
        }
        if self.state != PlaybackState::Playing {
            warn!("[PLAYBACK] Error while {}; no recovery", self.state);
            return None;
        }

        self.state = PlaybackState::Paused;
        self.recovery_pending = true;
        warn!(
            "[PLAYBACK] Error at {:.3}s; retrying in {} ms",
            self.position,
            self.recovery_delay.as_millis()
        );
        Some(self.recovery_delay)
    }

    /// Run the scheduled resume attempt
    ///
    /// Returns true if playback was resumed.
    pub fn attempt_recovery(&mut self) -> bool {
        if !self.recovery_pending {
            return false;
        }
        self.recovery_pending = false;

        if self.state == PlaybackState::Paused {
            self.state = PlaybackState::Playing;
            debug!("[PLAYBACK] Recovered at {:.3}s", self.position);
            true
        } else {
            false
        }
    }

    // ========================================================================
    // State Queries
    // ========================================================================

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state == PlaybackState::Playing
    }

    /// True while a resume attempt is scheduled
    pub fn recovery_pending(&self) -> bool {
        self.recovery_pending
    }

    /// Playhead in seconds
    pub fn position_secs(&self) -> f64 {
        self.position
    }

    /// Duration of the loaded buffer in seconds, 0 when Idle
    pub fn duration_secs(&self) -> f64 {
        self.track.map_or(0.0, |track| track.duration_secs())
    }

    /// Playhead as a fraction of the duration, 0 when the duration is 0
    pub fn position_fraction(&self) -> f64 {
        let duration = self.duration_secs();
        if duration > 0.0 {
            self.position / duration
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn seconds(secs: usize) -> SampleBuffer {
        SampleBuffer::silent(1, secs * 1000, 1000)
    }

    #[test]
    fn test_default_state_is_idle() {
        let mut playback = PlaybackCoordinator::default();
        assert_eq!(playback.state(), PlaybackState::Idle);

        playback.play();
        assert_eq!(playback.state(), PlaybackState::Idle);
        assert_eq!(playback.duration_secs(), 0.0);
    }

    #[test]
    fn test_load_play_pause() {
        let mut playback = PlaybackCoordinator::default();
        playback.load(&seconds(4));
        assert_eq!(playback.state(), PlaybackState::Loaded);

        playback.play();
        assert!(playback.is_playing());
        playback.toggle();
        assert_eq!(playback.state(), PlaybackState::Paused);
        playback.toggle();
        assert!(playback.is_playing());
    }

    #[test]
    fn test_seek_clamps_and_ignores_nan() {
        let mut playback = PlaybackCoordinator::default();
        playback.load(&seconds(4));

        playback.seek(0.5);
        assert_relative_eq!(playback.position_secs(), 2.0);
        playback.seek(f64::NAN);
        assert_relative_eq!(playback.position_secs(), 2.0);
        playback.seek(3.0);
        assert_relative_eq!(playback.position_secs(), 4.0);
        playback.seek(-1.0);
        assert_eq!(playback.position_secs(), 0.0);
    }

    #[test]
    fn test_swap_while_playing_keeps_place() {
        let mut playback = PlaybackCoordinator::default();
        playback.load(&seconds(4));
        playback.play();
        playback.seek(0.25);

        let outcome = playback.swap_buffer(&seconds(8));

        assert!(outcome.was_playing);
        assert_relative_eq!(outcome.position_fraction, 0.25);
        assert_relative_eq!(outcome.resumed_at_secs.unwrap(), 2.0);
        assert!(playback.is_playing());
        assert_relative_eq!(playback.duration_secs(), 8.0);
    }

    #[test]
    fn test_swap_while_paused_stays_paused() {
        let mut playback = PlaybackCoordinator::default();
        playback.load(&seconds(4));
        playback.play();
        playback.seek(0.5);
        playback.pause();

        let outcome = playback.swap_buffer(&seconds(2));
        assert!(!outcome.was_playing);
        assert_eq!(playback.state(), PlaybackState::Paused);
        assert_relative_eq!(playback.position_secs(), 1.0);
    }

    #[test]
    fn test_swap_at_start_does_not_seek() {
        let mut playback = PlaybackCoordinator::default();
        playback.load(&seconds(4));

        let outcome = playback.swap_buffer(&seconds(3));
        assert_eq!(outcome.resumed_at_secs, None);
        assert_eq!(playback.state(), PlaybackState::Loaded);
        assert_eq!(playback.position_secs(), 0.0);
    }

    #[test]
    fn test_swap_at_end_restarts() {
        let mut playback = PlaybackCoordinator::default();
        playback.load(&seconds(4));
        playback.play();
        playback.seek(1.0);

        let outcome = playback.swap_buffer(&seconds(4));
        assert_eq!(outcome.resumed_at_secs, None);
        assert_eq!(playback.position_secs(), 0.0);
        assert!(playback.is_playing());
    }

    #[test]
    fn test_advance_to_end_rewinds() {
        let mut playback = PlaybackCoordinator::default();
        playback.load(&seconds(2));

        assert!(!playback.advance(500));
        assert_eq!(playback.position_secs(), 0.0);

        playback.play();
        assert!(!playback.advance(1500));
        assert_relative_eq!(playback.position_secs(), 1.5);
        assert!(playback.advance(500));
        assert_eq!(playback.state(), PlaybackState::Paused);
        assert_eq!(playback.position_secs(), 0.0);
    }

    #[test]
    fn test_single_recovery_attempt() {
        let mut playback = PlaybackCoordinator::new(Duration::from_millis(250));
        playback.load(&seconds(2));
        playback.play();

        assert_eq!(playback.on_playback_error(), Some(Duration::from_millis(250)));
        assert_eq!(playback.state(), PlaybackState::Paused);
        assert_eq!(playback.on_playback_error(), None);

        assert!(playback.attempt_recovery());
        assert!(playback.is_playing());
        assert!(!playback.attempt_recovery());
    }

    #[test]
    fn test_error_while_paused_is_ignored() {
        let mut playback = PlaybackCoordinator::default();
        playback.load(&seconds(2));
        assert_eq!(playback.on_playback_error(), None);
        assert!(!playback.attempt_recovery());
    }

    #[test]
    fn test_reset_returns_to_idle() {
        let mut playback = PlaybackCoordinator::default();
        playback.load(&seconds(2));
        playback.play();
        playback.reset();
        assert_eq!(playback.state(), PlaybackState::Idle);
        assert_eq!(playback.duration_secs(), 0.0);
    }
}
