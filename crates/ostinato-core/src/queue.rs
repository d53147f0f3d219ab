//! Lock-free event ring between the control and audio threads.
//!
//! Each instrument owns exactly one of these rings. The control thread
//! pushes timestamped events; the audio thread pops them back out inside
//! the render callback. Events are delivered in insertion order - the
//! producer is expected to push with non-decreasing timestamps per
//! instrument, and the consumer does no re-sorting.

use std::any::Any;

use ringbuf::{
    traits::{Consumer, Observer, Producer, Split},
    HeapCons, HeapProd, HeapRb,
};

use crate::error::{Error, Result};

/// Opaque data payload handed over to the DSP state.
///
/// Ownership transfers from the control thread to the audio thread with
/// the event; whoever ends up holding the box frees it on drop.
pub type InstrumentData = Box<dyn Any + Send>;

/// Events consumed sample-accurately inside the render callback.
pub enum InstrumentEvent {
    SetData(InstrumentData),
    SetParameter { index: usize, value: f64 },
    StartNote { pitch: f64, intensity: f64 },
    StopNote { pitch: f64 },
}

impl core::fmt::Debug for InstrumentEvent {
    fn fmt(&self, formatter: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::SetData(_) => formatter.write_str("SetData(..)"),
            Self::SetParameter { index, value } => formatter
                .debug_struct("SetParameter")
                .field("index", index)
                .field("value", value)
                .finish(),
            Self::StartNote { pitch, intensity } => formatter
                .debug_struct("StartNote")
                .field("pitch", pitch)
                .field("intensity", intensity)
                .finish(),
            Self::StopNote { pitch } => formatter
                .debug_struct("StopNote")
                .field("pitch", pitch)
                .finish(),
        }
    }
}

/// Creates a bounded SPSC event queue with the given capacity.
pub fn event_queue(capacity: usize) -> (EventProducer, EventConsumer) {
    let rb = HeapRb::<(f64, InstrumentEvent)>::new(capacity.max(2));
    let (prod, cons) = rb.split();
    (
        EventProducer { prod },
        EventConsumer {
            cons,
            pending: None,
        },
    )
}

/// Control-thread half of the event queue.
pub struct EventProducer {
    prod: HeapProd<(f64, InstrumentEvent)>,
}

impl EventProducer {
    /// Pushes an event; wait-free, never allocates.
    ///
    /// Overflow is surfaced, never silent: a full ring returns
    /// [`Error::QueueFull`] and leaves the queue unchanged.
    pub fn push(&mut self, timestamp: f64, event: InstrumentEvent) -> Result<()> {
        self.prod
            .try_push((timestamp, event))
            .map_err(|_| Error::QueueFull)
    }

    pub fn capacity(&self) -> usize {
        self.prod.capacity().get()
    }
}

/// Audio-thread half of the event queue.
pub struct EventConsumer {
    cons: HeapCons<(f64, InstrumentEvent)>,
    // The first not-yet-due event, popped but held back until its
    // timestamp falls below the requested horizon.
    pending: Option<(f64, InstrumentEvent)>,
}

impl EventConsumer {
    /// Returns the next event whose timestamp is before `end_timestamp`,
    /// in insertion order. Wait-free, never allocates.
    pub fn pop_until(&mut self, end_timestamp: f64) -> Option<(f64, InstrumentEvent)> {
        let next = self.pending.take().or_else(|| self.cons.try_pop())?;
        if next.0 < end_timestamp {
            Some(next)
        } else {
            self.pending = Some(next);
            None
        }
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_none() && self.cons.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn start_note(pitch: f64) -> InstrumentEvent {
        InstrumentEvent::StartNote {
            pitch,
            intensity: 1.0,
        }
    }

    fn pitch_of(event: &InstrumentEvent) -> f64 {
        match event {
            InstrumentEvent::StartNote { pitch, .. } => *pitch,
            InstrumentEvent::StopNote { pitch } => *pitch,
            _ => panic!("unexpected event"),
        }
    }

    #[test]
    fn test_fifo_order() {
        let (mut prod, mut cons) = event_queue(8);
        prod.push(0.0, start_note(60.0)).unwrap();
        prod.push(0.0, start_note(62.0)).unwrap();

        let (_, first) = cons.pop_until(f64::INFINITY).unwrap();
        let (_, second) = cons.pop_until(f64::INFINITY).unwrap();
        assert_eq!(pitch_of(&first), 60.0);
        assert_eq!(pitch_of(&second), 62.0);
        assert!(cons.pop_until(f64::INFINITY).is_none());
    }

    #[test]
    fn test_pop_until_respects_horizon() {
        let (mut prod, mut cons) = event_queue(8);
        prod.push(0.5, start_note(60.0)).unwrap();
        prod.push(1.5, start_note(62.0)).unwrap();

        let (timestamp, event) = cons.pop_until(1.0).unwrap();
        assert_eq!(timestamp, 0.5);
        assert_eq!(pitch_of(&event), 60.0);
        assert!(cons.pop_until(1.0).is_none());

        // The held-back event comes out once the horizon advances.
        let (timestamp, event) = cons.pop_until(2.0).unwrap();
        assert_eq!(timestamp, 1.5);
        assert_eq!(pitch_of(&event), 62.0);
    }

    #[test]
    fn test_overflow_is_surfaced() {
        let (mut prod, _cons) = event_queue(2);
        prod.push(0.0, start_note(60.0)).unwrap();
        prod.push(0.0, start_note(61.0)).unwrap();
        assert!(matches!(
            prod.push(0.0, start_note(62.0)),
            Err(Error::QueueFull)
        ));
    }

    #[test]
    fn test_set_data_payload_crosses_intact() {
        let (mut prod, mut cons) = event_queue(4);
        prod.push(0.0, InstrumentEvent::SetData(Box::new(vec![1u8, 2, 3])))
            .unwrap();

        let (_, event) = cons.pop_until(1.0).unwrap();
        match event {
            InstrumentEvent::SetData(data) => {
                let bytes = data.downcast::<Vec<u8>>().unwrap();
                assert_eq!(*bytes, vec![1, 2, 3]);
            }
            _ => panic!("expected SetData"),
        }
    }

    #[test]
    fn test_is_empty_tracks_pending_slot() {
        let (mut prod, mut cons) = event_queue(4);
        assert!(cons.is_empty());
        prod.push(5.0, start_note(60.0)).unwrap();
        assert!(cons.pop_until(1.0).is_none());
        // Held back, but still queued.
        assert!(!cons.is_empty());
    }
}
