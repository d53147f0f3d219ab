//! Polyphonic instrument runtime, split across the two threads.
//!
//! [`Instrument`] is the control-thread half: the parameter vector, the
//! set of currently sounding pitches and the note observation hooks.
//! Every observable state change enqueues exactly one event into the
//! instrument's SPSC queue, where the audio-thread half (reachable via
//! [`InstrumentHandle`]) consumes it sample-accurately during `process`.

mod definition;
mod processor;

pub use definition::{InstrumentDefinition, InstrumentDsp};
pub use processor::InstrumentHandle;

use std::collections::BTreeSet;
use std::sync::Arc;

use ordered_float::OrderedFloat;
use parking_lot::Mutex;

use crate::parameter::Parameter;
use crate::queue::{event_queue, EventProducer, InstrumentData, InstrumentEvent};
use crate::{Error, Result};

use processor::Processor;

type NoteOnCallback = Box<dyn FnMut(f64, f64, f64) + Send>;
type NoteOffCallback = Box<dyn FnMut(f64, f64) + Send>;

/// Control-thread half of an instrument.
pub struct Instrument {
    parameters: Vec<Parameter>,
    pitches: BTreeSet<OrderedFloat<f64>>,
    note_on_callback: Option<NoteOnCallback>,
    note_off_callback: Option<NoteOffCallback>,
    producer: EventProducer,
    processor: Arc<Mutex<Processor>>,
}

impl Instrument {
    /// Builds both halves. The `create` constructor runs here, on the
    /// control thread, and the fresh DSP state is primed with every
    /// parameter's default value directly - no events are queued for
    /// the initial state.
    pub fn new(
        definition: InstrumentDefinition,
        sample_rate: f64,
        queue_capacity: usize,
    ) -> Result<Self> {
        for parameter_definition in definition.parameters() {
            parameter_definition.validate()?;
        }
        let parameters: Vec<Parameter> = definition
            .parameters
            .into_iter()
            .map(Parameter::new)
            .collect();
        let (producer, consumer) = event_queue(queue_capacity);
        let mut dsp = (definition.create)(sample_rate);
        for (index, parameter) in parameters.iter().enumerate() {
            dsp.set_parameter(index, parameter.value(), 0.0);
        }
        let processor = Arc::new(Mutex::new(Processor::new(dsp, consumer, sample_rate)));
        Ok(Self {
            parameters,
            pitches: BTreeSet::new(),
            note_on_callback: None,
            note_off_callback: None,
            producer,
            processor,
        })
    }

    /// Returns a handle for the host's audio callback.
    pub fn handle(&self) -> InstrumentHandle {
        InstrumentHandle::new(&self.processor)
    }

    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    pub fn parameter(&self, index: usize) -> Option<&Parameter> {
        self.parameters.get(index)
    }

    /// Clamps and stores a parameter value, enqueueing a SetParameter
    /// event iff the stored value changed.
    pub fn set_parameter(&mut self, index: usize, value: f64, timestamp: f64) -> Result<()> {
        if value.is_nan() {
            return Err(Error::InvalidArgument("parameter value is NaN".to_string()));
        }
        let parameter = self
            .parameters
            .get(index)
            .ok_or_else(|| Error::NotFound(format!("parameter {index}")))?;
        let definition = *parameter.definition();
        let value = value.clamp(definition.min_value, definition.max_value);
        if value != parameter.value() {
            self.producer
                .push(timestamp, InstrumentEvent::SetParameter { index, value })?;
            self.parameters[index].set(value);
        }
        Ok(())
    }

    /// Restores a parameter default, enqueueing iff the value changed.
    pub fn reset_parameter(&mut self, index: usize, timestamp: f64) -> Result<()> {
        let parameter = self
            .parameters
            .get(index)
            .ok_or_else(|| Error::NotFound(format!("parameter {index}")))?;
        let value = parameter.definition().default_value;
        if value != parameter.value() {
            self.producer
                .push(timestamp, InstrumentEvent::SetParameter { index, value })?;
            self.parameters[index].reset();
        }
        Ok(())
    }

    pub fn reset_all_parameters(&mut self, timestamp: f64) -> Result<()> {
        for index in 0..self.parameters.len() {
            self.reset_parameter(index, timestamp)?;
        }
        Ok(())
    }

    /// Transfers an owned data payload to the DSP state.
    pub fn set_data(&mut self, data: InstrumentData, timestamp: f64) -> Result<()> {
        self.producer.push(timestamp, InstrumentEvent::SetData(data))
    }

    /// Starts a note. A pitch that is already on is a no-op: no event,
    /// no hook. On success the note-on hook runs synchronously here on
    /// the control thread.
    pub fn start_note(&mut self, pitch: f64, intensity: f64, timestamp: f64) -> Result<()> {
        if !pitch.is_finite() {
            return Err(Error::InvalidArgument(format!(
                "note pitch {pitch} must be finite"
            )));
        }
        if !(0.0..=1.0).contains(&intensity) {
            return Err(Error::InvalidArgument(format!(
                "note intensity {intensity} must be in [0, 1]"
            )));
        }
        if self.pitches.contains(&OrderedFloat(pitch)) {
            return Ok(());
        }
        self.producer
            .push(timestamp, InstrumentEvent::StartNote { pitch, intensity })?;
        self.pitches.insert(OrderedFloat(pitch));
        if let Some(callback) = self.note_on_callback.as_mut() {
            callback(pitch, intensity, timestamp);
        }
        Ok(())
    }

    /// Stops a note. A pitch that is not on is a no-op.
    pub fn stop_note(&mut self, pitch: f64, timestamp: f64) -> Result<()> {
        if !pitch.is_finite() {
            return Err(Error::InvalidArgument(format!(
                "note pitch {pitch} must be finite"
            )));
        }
        if !self.pitches.contains(&OrderedFloat(pitch)) {
            return Ok(());
        }
        self.producer
            .push(timestamp, InstrumentEvent::StopNote { pitch })?;
        self.pitches.remove(&OrderedFloat(pitch));
        if let Some(callback) = self.note_off_callback.as_mut() {
            callback(pitch, timestamp);
        }
        Ok(())
    }

    /// Stops every sounding note, in ascending pitch order.
    pub fn stop_all_notes(&mut self, timestamp: f64) -> Result<()> {
        let pitches: Vec<f64> = self.pitches.iter().map(|pitch| pitch.into_inner()).collect();
        for pitch in pitches {
            self.stop_note(pitch, timestamp)?;
        }
        Ok(())
    }

    pub fn is_note_on(&self, pitch: f64) -> bool {
        self.pitches.contains(&OrderedFloat(pitch))
    }

    /// Observation hook, invoked from the control thread for every note
    /// that actually starts.
    pub fn set_note_on_callback<F>(&mut self, callback: F)
    where
        F: FnMut(f64, f64, f64) + Send + 'static,
    {
        self.note_on_callback = Some(Box::new(callback));
    }

    /// Observation hook, invoked from the control thread for every note
    /// that actually stops.
    pub fn set_note_off_callback<F>(&mut self, callback: F)
    where
        F: FnMut(f64, f64) + Send + 'static,
    {
        self.note_off_callback = Some(Box::new(callback));
    }
}
