//! Music engine kernel: the transport clock, note sequences and the
//! instrument runtime that carries control-thread events to the audio
//! thread over a lock-free queue.
//!
//! The facade crate `ostinato` assembles these components into the
//! top-level engine; this crate holds the mechanisms.

pub mod config;
pub mod error;
pub mod instrument;
pub mod parameter;
pub mod performer;
pub mod queue;
pub mod sequence;
pub mod transport;

pub use config::EngineConfig;
pub use error::{Error, Result};
pub use instrument::{Instrument, InstrumentDefinition, InstrumentDsp, InstrumentHandle};
pub use parameter::{Parameter, ParameterDefinition};
pub use performer::Performer;
pub use queue::{event_queue, EventConsumer, EventProducer, InstrumentData, InstrumentEvent};
pub use sequence::{NoteDefinition, Sequence, SequenceNote};
pub use transport::Transport;

/// Engine-allocated identifier for instruments, performers and notes.
pub type Id = u64;

/// Reserved invalid identifier.
pub const INVALID_ID: Id = 0;

/// Monotonic id source. Ids start at 1 and are never reused.
#[derive(Debug, Default)]
pub struct IdGenerator {
    last_id: Id,
}

impl IdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&mut self) -> Id {
        self.last_id += 1;
        self.last_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_start_at_one_and_increase() {
        let mut generator = IdGenerator::new();
        assert_eq!(generator.next_id(), 1);
        assert_eq!(generator.next_id(), 2);
        assert_ne!(generator.next_id(), INVALID_ID);
    }
}
