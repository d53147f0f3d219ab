//! Time-ranged, loopable containers of notes.
//!
//! A sequence stores notes keyed by `(position, id)` so that iteration
//! is ordered by beat position with the insertion id as a deterministic
//! tiebreaker. [`Sequence::process`] expands a half-open beat range into
//! the notes that sound inside it, handling the active window, the
//! begin-offset reframing and loop unrolling.

use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;

use ordered_float::OrderedFloat;

use crate::{Error, Id, Result, INVALID_ID};

/// What a note sounds like: how long, which pitch, how loud.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoteDefinition {
    /// Duration in beats, non-negative.
    pub duration: f64,
    /// Pitch in octaves from the reference.
    pub pitch: f64,
    /// Loudness multiplier in `[0, 1]`.
    pub intensity: f64,
}

impl NoteDefinition {
    pub fn new(duration: f64, pitch: f64, intensity: f64) -> Self {
        Self {
            duration,
            pitch,
            intensity,
        }
    }

    fn validate(&self) -> Result<()> {
        if !self.duration.is_finite() || self.duration < 0.0 {
            return Err(Error::InvalidArgument(format!(
                "note duration {} must be finite and non-negative",
                self.duration
            )));
        }
        if !self.pitch.is_finite() {
            return Err(Error::InvalidArgument(format!(
                "note pitch {} must be finite",
                self.pitch
            )));
        }
        if !(0.0..=1.0).contains(&self.intensity) {
            return Err(Error::InvalidArgument(format!(
                "note intensity {} must be in [0, 1]",
                self.intensity
            )));
        }
        Ok(())
    }
}

/// One sounding note produced by [`Sequence::process`], in the caller's
/// beat timeline. `end_position` is already clamped to the sequence's
/// end boundary.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SequenceNote {
    pub position: f64,
    pub end_position: f64,
    pub pitch: f64,
    pub intensity: f64,
}

/// An ordered set of notes with window, offset and loop metadata.
#[derive(Debug)]
pub struct Sequence {
    notes: BTreeMap<(OrderedFloat<f64>, Id), NoteDefinition>,
    positions: HashMap<Id, f64>,
    begin_offset: f64,
    begin_position: f64,
    end_position: f64,
    is_looping: bool,
    loop_begin_offset: f64,
    loop_length: f64,
}

impl Default for Sequence {
    fn default() -> Self {
        Self {
            notes: BTreeMap::new(),
            positions: HashMap::new(),
            begin_offset: 0.0,
            begin_position: 0.0,
            end_position: f64::INFINITY,
            is_looping: false,
            loop_begin_offset: 0.0,
            loop_length: 1.0,
        }
    }
}

impl Sequence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a note at `position`. Fails with `AlreadyExists` if `id` is
    /// already present, `InvalidArgument` on id zero, non-finite
    /// position, or an invalid definition.
    pub fn add_note(&mut self, id: Id, position: f64, definition: NoteDefinition) -> Result<()> {
        if id == INVALID_ID {
            return Err(Error::InvalidArgument("note id 0 is reserved".to_string()));
        }
        if !position.is_finite() {
            return Err(Error::InvalidArgument(format!(
                "note position {position} must be finite"
            )));
        }
        definition.validate()?;
        if self.positions.contains_key(&id) {
            return Err(Error::AlreadyExists(format!("note {id}")));
        }
        self.positions.insert(id, position);
        self.notes.insert((OrderedFloat(position), id), definition);
        Ok(())
    }

    pub fn remove_note(&mut self, id: Id) -> Result<()> {
        let position = self
            .positions
            .remove(&id)
            .ok_or_else(|| Error::NotFound(format!("note {id}")))?;
        self.notes.remove(&(OrderedFloat(position), id));
        Ok(())
    }

    pub fn remove_all_notes(&mut self) {
        self.notes.clear();
        self.positions.clear();
    }

    /// Removes every note whose position lies in `[begin, end)`.
    pub fn remove_all_notes_in(&mut self, begin_position: f64, end_position: f64) -> Result<()> {
        if begin_position.is_nan() || end_position.is_nan() || end_position < begin_position {
            return Err(Error::InvalidArgument(format!(
                "invalid removal range [{begin_position}, {end_position})"
            )));
        }
        let keys: Vec<(OrderedFloat<f64>, Id)> = self
            .notes
            .range((
                Bound::Included((OrderedFloat(begin_position), INVALID_ID)),
                Bound::Excluded((OrderedFloat(end_position), INVALID_ID)),
            ))
            .map(|(key, _)| *key)
            .collect();
        for key in keys {
            self.notes.remove(&key);
            self.positions.remove(&key.1);
        }
        Ok(())
    }

    /// Moves a note to a new position, keeping its definition.
    pub fn set_note_position(&mut self, id: Id, position: f64) -> Result<()> {
        if !position.is_finite() {
            return Err(Error::InvalidArgument(format!(
                "note position {position} must be finite"
            )));
        }
        let current = self
            .positions
            .get_mut(&id)
            .ok_or_else(|| Error::NotFound(format!("note {id}")))?;
        if *current != position {
            let definition = self
                .notes
                .remove(&(OrderedFloat(*current), id))
                .expect("note map out of sync with position index");
            self.notes.insert((OrderedFloat(position), id), definition);
            *current = position;
        }
        Ok(())
    }

    pub fn set_note_definition(&mut self, id: Id, definition: NoteDefinition) -> Result<()> {
        definition.validate()?;
        let position = *self
            .positions
            .get(&id)
            .ok_or_else(|| Error::NotFound(format!("note {id}")))?;
        *self
            .notes
            .get_mut(&(OrderedFloat(position), id))
            .expect("note map out of sync with position index") = definition;
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn begin_offset(&self) -> f64 {
        self.begin_offset
    }

    /// Shifts the internal note timeline relative to the external one.
    /// Non-finite values are ignored.
    pub fn set_begin_offset(&mut self, begin_offset: f64) {
        if begin_offset.is_finite() {
            self.begin_offset = begin_offset;
        }
    }

    pub fn begin_position(&self) -> f64 {
        self.begin_position
    }

    /// Start of the half-open window in which the sequence is active.
    /// NaN is ignored.
    pub fn set_begin_position(&mut self, begin_position: f64) {
        if !begin_position.is_nan() {
            self.begin_position = begin_position;
        }
    }

    pub fn end_position(&self) -> f64 {
        self.end_position
    }

    /// End of the active window; note-offs are clamped to it. NaN is
    /// ignored.
    pub fn set_end_position(&mut self, end_position: f64) {
        if !end_position.is_nan() {
            self.end_position = end_position;
        }
    }

    pub fn is_looping(&self) -> bool {
        self.is_looping
    }

    pub fn set_looping(&mut self, is_looping: bool) {
        self.is_looping = is_looping;
    }

    pub fn loop_begin_offset(&self) -> f64 {
        self.loop_begin_offset
    }

    pub fn set_loop_begin_offset(&mut self, loop_begin_offset: f64) {
        if loop_begin_offset.is_finite() {
            self.loop_begin_offset = loop_begin_offset;
        }
    }

    pub fn loop_length(&self) -> f64 {
        self.loop_length
    }

    /// Loop body length in beats, clamped to `[0, inf)`. A zero length
    /// silences a looping sequence.
    pub fn set_loop_length(&mut self, loop_length: f64) {
        if loop_length.is_finite() {
            self.loop_length = loop_length.max(0.0);
        }
    }

    /// Emits every note sounding inside the half-open external range
    /// `[begin_position, end_position)`, in `(position, id)` order per
    /// unrolled segment.
    pub fn process(
        &self,
        begin_position: f64,
        end_position: f64,
        emit: &mut dyn FnMut(SequenceNote),
    ) {
        if self.notes.is_empty() {
            return;
        }
        // Clip against the active window.
        let mut begin_position = begin_position.max(self.begin_position);
        let mut end_position = end_position.min(self.end_position);
        if begin_position >= end_position {
            return;
        }
        // Reframe into the internal timeline.
        let mut position_offset = self.begin_position - self.begin_offset;
        begin_position -= position_offset;
        end_position -= position_offset;

        if self.is_looping {
            if self.loop_length <= 0.0 {
                return;
            }
            // Fast-forward to the first loop iteration in range.
            let loop_begin_position = begin_position - self.loop_begin_offset;
            if loop_begin_position > self.loop_length {
                let loop_offset =
                    self.loop_length * (loop_begin_position / self.loop_length).floor();
                begin_position -= loop_offset;
                end_position -= loop_offset;
                position_offset += loop_offset;
            }
            // The pre-loop head, up to the end of the first iteration.
            let loop_end_position = self.loop_begin_offset + self.loop_length;
            if begin_position < loop_end_position {
                let head_end = loop_end_position.min(end_position);
                self.process_segment(begin_position, head_end, position_offset, emit);
                begin_position = head_end;
            }
            // Remaining loop iterations, the last possibly clipped short.
            position_offset -= self.loop_begin_offset;
            while begin_position < end_position {
                let iteration_end =
                    self.loop_begin_offset + self.loop_length.min(end_position - begin_position);
                self.process_segment(
                    self.loop_begin_offset,
                    iteration_end,
                    position_offset + begin_position,
                    emit,
                );
                begin_position += self.loop_length;
            }
        } else {
            self.process_segment(begin_position, end_position, position_offset, emit);
        }
    }

    // Emits notes with internal positions in `[begin, end)`, shifted
    // into the external timeline by `position_offset`.
    fn process_segment(
        &self,
        begin_position: f64,
        end_position: f64,
        position_offset: f64,
        emit: &mut dyn FnMut(SequenceNote),
    ) {
        let range = (
            Bound::Included((OrderedFloat(begin_position), INVALID_ID)),
            Bound::Excluded((OrderedFloat(end_position), INVALID_ID)),
        );
        for (&(position, _), definition) in self.notes.range(range) {
            let position = position.into_inner() + position_offset;
            let note_end_position =
                (position + definition.duration.max(0.0)).min(self.end_position);
            emit(SequenceNote {
                position,
                end_position: note_end_position,
                pitch: definition.pitch,
                intensity: definition.intensity,
            });
        }
    }
}
