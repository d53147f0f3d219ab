//! Beat-domain clock that maps wall time to musical time.
//!
//! The transport is the authoritative seconds-to-beats mapping. It is
//! advanced from the control thread with [`Transport::update`], which
//! walks forward in constant-tempo segments: it fires the beat callback
//! on every integer beat it crosses and the update callback once per
//! segment with the traversed beat range.
//!
//! Callbacks are passed into `start`/`update` rather than stored, so the
//! beat callback can receive `&mut Transport` and re-enter the clock
//! (stop playback, change tempo, jump position) mid-update.

/// Seconds-to-beats clock state.
#[derive(Debug)]
pub struct Transport {
    is_playing: bool,
    position: f64,
    last_position: f64,
    timestamp: f64,
    last_timestamp: f64,
    // Beats per second.
    tempo: f64,
    next_beat_position: f64,
    next_beat_timestamp: f64,
}

impl Default for Transport {
    fn default() -> Self {
        Self {
            is_playing: false,
            position: 0.0,
            last_position: 0.0,
            timestamp: 0.0,
            last_timestamp: 0.0,
            tempo: 1.0,
            next_beat_position: 0.0,
            next_beat_timestamp: 0.0,
        }
    }
}

impl Transport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_playing(&self) -> bool {
        self.is_playing
    }

    /// Current position in beats.
    pub fn position(&self) -> f64 {
        self.position
    }

    /// Position at the end of the previous update segment.
    pub fn last_position(&self) -> f64 {
        self.last_position
    }

    /// Current tempo in beats per second.
    pub fn tempo(&self) -> f64 {
        self.tempo
    }

    /// Current wall time in seconds.
    pub fn timestamp(&self) -> f64 {
        self.timestamp
    }

    pub fn last_timestamp(&self) -> f64 {
        self.last_timestamp
    }

    /// Wall time at which the given beat position occurs, extrapolated
    /// at the current tempo. With tempo zero this is `+inf` for any
    /// position ahead of the clock.
    pub fn timestamp_of(&self, position: f64) -> f64 {
        let delta = position - self.position;
        if delta == 0.0 {
            self.timestamp
        } else {
            self.timestamp + delta / self.tempo
        }
    }

    /// Sets the tempo in beats per second, clamped to `[0, inf)`.
    /// Non-finite input leaves the transport unchanged.
    pub fn set_tempo(&mut self, tempo: f64) {
        if !tempo.is_finite() {
            return;
        }
        if tempo != self.tempo {
            self.tempo = tempo.max(0.0);
            self.next_beat_timestamp = self.timestamp_of(self.next_beat_position);
        }
    }

    /// Sets the position in beats, clamped to `[0, inf)`. Non-finite
    /// input leaves the transport unchanged.
    pub fn set_position(&mut self, position: f64) {
        if !position.is_finite() {
            return;
        }
        if position != self.position {
            let is_settled = self.position == self.last_position;
            self.position = position.max(0.0);
            if is_settled {
                self.last_position = self.position;
            }
            self.next_beat_position = self.position.ceil();
            self.next_beat_timestamp = self.timestamp_of(self.next_beat_position);
        }
    }

    /// Starts playback. If the clock sits exactly on an integer beat,
    /// that beat fires immediately.
    pub fn start(&mut self, on_beat: &mut dyn FnMut(&mut Transport, f64)) {
        self.is_playing = true;
        self.next_beat_position = self.position.ceil();
        if self.position == self.next_beat_position {
            let position = self.position;
            on_beat(self, position);
            if !self.is_playing || self.tempo <= 0.0 {
                return;
            }
            if self.position == self.next_beat_position {
                self.next_beat_position += 1.0;
            }
        }
        self.next_beat_timestamp = self.timestamp_of(self.next_beat_position);
    }

    /// Stops playback. Position is kept.
    pub fn stop(&mut self) {
        self.is_playing = false;
    }

    /// Advances wall time to `to_timestamp`.
    ///
    /// While playing at a non-zero tempo, the clock walks beat to beat:
    /// `on_beat` fires for each integer beat crossed (and may mutate the
    /// transport - playing state, tempo and the next-beat bookkeeping
    /// are re-read after every invocation), and `on_update` fires once
    /// per traversed segment with its begin/end beat positions. Paused
    /// or at tempo zero, wall time fast-forwards without advancing the
    /// position. Idempotent for `to_timestamp <= timestamp()`.
    pub fn update(
        &mut self,
        to_timestamp: f64,
        on_beat: &mut dyn FnMut(&mut Transport, f64),
        on_update: &mut dyn FnMut(&Transport, f64, f64),
    ) {
        while self.timestamp < to_timestamp {
            if !self.is_playing || self.tempo <= 0.0 {
                self.timestamp = to_timestamp;
                self.last_timestamp = to_timestamp;
                return;
            }
            if self.position == self.next_beat_position {
                let position = self.position;
                on_beat(self, position);
                if !self.is_playing || self.tempo <= 0.0 {
                    self.timestamp = to_timestamp;
                    self.last_timestamp = to_timestamp;
                    return;
                }
                if self.position == self.next_beat_position {
                    self.next_beat_position += 1.0;
                    self.next_beat_timestamp = self.timestamp_of(self.next_beat_position);
                }
            }
            if self.next_beat_timestamp < to_timestamp {
                // Jump exactly onto the next beat.
                self.position = self.next_beat_position;
                self.timestamp = self.next_beat_timestamp;
            } else {
                self.position += self.tempo * (to_timestamp - self.timestamp);
                self.timestamp = to_timestamp;
            }
            on_update(self, self.last_position, self.position);
            self.last_position = self.position;
            self.last_timestamp = self.timestamp;
        }
    }
}
