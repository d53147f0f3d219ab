//! DSP-side definition of an instrument.

use crate::parameter::ParameterDefinition;
use crate::queue::InstrumentData;

/// The audio-thread half of an instrument: renders samples and applies
/// dequeued events to its own state.
///
/// Implementations run exclusively on the audio thread once the
/// instrument is constructed. Event methods default to no-ops, so an
/// implementation only has to provide what it reacts to; `Drop` plays
/// the role of the destroy callback.
pub trait InstrumentDsp: Send {
    /// Renders `output.len() / num_channels` interleaved frames.
    fn process(&mut self, output: &mut [f32], num_channels: usize);

    /// Takes ownership of an opaque data payload. The default drops it.
    fn set_data(&mut self, _data: InstrumentData) {}

    fn set_note_on(&mut self, _pitch: f64, _intensity: f64) {}

    fn set_note_off(&mut self, _pitch: f64) {}

    /// Applies a parameter value. `slope_per_frame` is a reserved ramp
    /// extension point and is currently always zero.
    fn set_parameter(&mut self, _index: usize, _value: f64, _slope_per_frame: f64) {}
}

type CreateFn = Box<dyn FnOnce(f64) -> Box<dyn InstrumentDsp> + Send>;

/// Immutable recipe for building an instrument: parameter metadata plus
/// the constructor that allocates the DSP state for a sample rate.
///
/// # Example
///
/// ```ignore
/// let definition = InstrumentDefinition::new(|sample_rate| {
///     Box::new(MySynth::new(sample_rate)) as Box<dyn InstrumentDsp>
/// })
/// .with_parameters(vec![ParameterDefinition::new(0.5, 0.0, 1.0)]);
/// ```
pub struct InstrumentDefinition {
    pub(crate) parameters: Vec<ParameterDefinition>,
    pub(crate) create: CreateFn,
}

impl InstrumentDefinition {
    pub fn new<F>(create: F) -> Self
    where
        F: FnOnce(f64) -> Box<dyn InstrumentDsp> + Send + 'static,
    {
        Self {
            parameters: Vec::new(),
            create: Box::new(create),
        }
    }

    pub fn with_parameters(mut self, parameters: Vec<ParameterDefinition>) -> Self {
        self.parameters = parameters;
        self
    }

    pub fn parameters(&self) -> &[ParameterDefinition] {
        &self.parameters
    }
}
