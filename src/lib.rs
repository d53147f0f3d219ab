//! # Ostinato - real-time music engine
//!
//! A sample-accurate scheduler that drives polyphonic instruments from
//! a transport clock and a set of looping note sequences. A host embeds
//! the library, builds instruments and sequences, advances musical time
//! from its control thread and pulls audio from its audio callback.
//!
//! ## Architecture
//!
//! - **Transport** - the authoritative seconds-to-beats clock.
//! - **Sequence** - loopable, offset-able containers of notes.
//! - **Instrument** - a controller on the control thread and a processor
//!   on the audio thread, joined by a lock-free SPSC event queue.
//! - **Performer** - binds one sequence to one instrument.
//! - **OstinatoEngine** - owns all of the above and drives the per-update
//!   cycle.
//!
//! ## Quick start
//!
//! ```ignore
//! use ostinato::prelude::*;
//!
//! let mut engine = OstinatoEngine::builder()
//!     .sample_rate(48000.0)
//!     .tempo(120.0)
//!     .build()?;
//!
//! let instrument = engine.create_instrument(my_definition)?;
//! let handle = engine.instrument_handle(instrument)?;
//!
//! let mut sequence = Sequence::new();
//! sequence.add_note(1, 0.0, NoteDefinition::new(1.0, 60.0 / 12.0, 1.0))?;
//! sequence.set_looping(true);
//! engine.add_performer(sequence, instrument)?;
//!
//! engine.start_playback();
//! // Control thread, periodically:
//! engine.update(clock_seconds + lookahead);
//! // Audio thread, per render callback:
//! handle.process(&mut buffer, 2, clock_seconds);
//! ```

/// Re-export of ostinato-core for direct access.
pub use ostinato_core as core;

pub use ostinato_core::{
    // Configuration and errors
    EngineConfig,
    Error,
    Result,

    // Identifiers
    Id,
    IdGenerator,
    INVALID_ID,

    // Instrument runtime
    Instrument,
    InstrumentData,
    InstrumentDefinition,
    InstrumentDsp,
    InstrumentEvent,
    InstrumentHandle,

    // Scheduling
    NoteDefinition,
    Parameter,
    ParameterDefinition,
    Performer,
    Sequence,
    SequenceNote,
    Transport,
};

mod builder;
mod engine;

pub use builder::OstinatoEngineBuilder;
pub use engine::OstinatoEngine;

/// Convenience prelude for common imports.
pub mod prelude {
    pub use crate::{
        Error, Id, InstrumentDefinition, InstrumentDsp, InstrumentHandle, NoteDefinition,
        OstinatoEngine, OstinatoEngineBuilder, ParameterDefinition, Result, Sequence,
    };
}
