//! Binds one sequence to one instrument.
//!
//! The performer turns the sequence's beat-domain output into
//! timestamped instrument events, carrying notes whose note-off lies
//! beyond the processed range forward as active notes until a later
//! range (or a stop) releases them.

use std::collections::BTreeMap;

use crate::instrument::Instrument;
use crate::sequence::Sequence;
use crate::transport::Transport;
use crate::Id;

#[derive(Debug, Clone, Copy)]
struct ActiveNote {
    begin_position: f64,
    end_position: f64,
    pitch: f64,
}

/// One sequence playing into one instrument, referenced by id.
pub struct Performer {
    instrument_id: Id,
    sequence: Sequence,
    // Sounding notes whose note-off extends past the last processed
    // range end. Every entry has had its note-on emitted and its
    // note-off still pending.
    active_notes: Vec<ActiveNote>,
}

impl Performer {
    pub fn new(sequence: Sequence, instrument_id: Id) -> Self {
        Self {
            instrument_id,
            sequence,
            active_notes: Vec::new(),
        }
    }

    pub fn instrument_id(&self) -> Id {
        self.instrument_id
    }

    pub fn sequence(&self) -> &Sequence {
        &self.sequence
    }

    pub fn sequence_mut(&mut self) -> &mut Sequence {
        &mut self.sequence
    }

    pub fn active_note_count(&self) -> usize {
        self.active_notes.len()
    }

    /// Plays the half-open beat range `[begin_position, end_position)`
    /// into the bound instrument, stamping every event with its wall
    /// time via the transport.
    ///
    /// If the bound instrument no longer exists, output (and any carried
    /// active notes) is silently dropped.
    pub fn perform(
        &mut self,
        begin_position: f64,
        end_position: f64,
        transport: &Transport,
        instruments: &mut BTreeMap<Id, Instrument>,
    ) {
        let Some(instrument) = instruments.get_mut(&self.instrument_id) else {
            if !self.active_notes.is_empty() {
                log::warn!(
                    "instrument {} is gone; dropping {} active notes",
                    self.instrument_id,
                    self.active_notes.len()
                );
                self.active_notes.clear();
            }
            return;
        };

        // Release carried notes that finish inside this range, or that a
        // backward jump orphaned.
        self.active_notes.retain(|note| {
            let stop_position = if note.end_position < end_position {
                note.end_position.max(begin_position)
            } else if begin_position < note.begin_position {
                begin_position
            } else {
                return true;
            };
            stop_note_logged(instrument, note.pitch, transport.timestamp_of(stop_position));
            false
        });

        let Self {
            sequence,
            active_notes,
            ..
        } = self;
        sequence.process(begin_position, end_position, &mut |note| {
            if let Err(error) =
                instrument.start_note(note.pitch, note.intensity, transport.timestamp_of(note.position))
            {
                log::warn!("note-on dropped (pitch {}): {error}", note.pitch);
            }
            if note.end_position >= end_position {
                // The note-off lies at or beyond this range end; it is
                // carried until a later range reaches past it.
                active_notes.push(ActiveNote {
                    begin_position: note.position,
                    end_position: note.end_position,
                    pitch: note.pitch,
                });
            } else {
                stop_note_logged(
                    instrument,
                    note.pitch,
                    transport.timestamp_of(note.end_position),
                );
            }
        });
    }

    /// Releases every carried note at the current transport time.
    pub fn stop(&mut self, transport: &Transport, instruments: &mut BTreeMap<Id, Instrument>) {
        if let Some(instrument) = instruments.get_mut(&self.instrument_id) {
            let timestamp = transport.timestamp();
            for note in self.active_notes.drain(..) {
                stop_note_logged(instrument, note.pitch, timestamp);
            }
        } else {
            self.active_notes.clear();
        }
    }

    /// Rebinds the performer to another instrument. Carried notes are
    /// released to the old instrument first; nothing carries over.
    pub fn set_instrument(
        &mut self,
        instrument_id: Id,
        transport: &Transport,
        instruments: &mut BTreeMap<Id, Instrument>,
    ) {
        if instrument_id != self.instrument_id {
            self.stop(transport, instruments);
            self.instrument_id = instrument_id;
        }
    }

    /// Forgets carried notes without emitting note-offs.
    pub fn clear_active_notes(&mut self) {
        self.active_notes.clear();
    }
}

fn stop_note_logged(instrument: &mut Instrument, pitch: f64, timestamp: f64) {
    if let Err(error) = instrument.stop_note(pitch, timestamp) {
        log::warn!("note-off dropped (pitch {pitch}): {error}");
    }
}
