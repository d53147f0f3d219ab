//! Audio-thread half of an instrument.

use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use super::definition::InstrumentDsp;
use crate::queue::{EventConsumer, InstrumentEvent};

/// Owns the DSP state and the consumer end of the event queue. Lives
/// behind the handle's shared cell; only [`InstrumentHandle::process`]
/// touches it after construction.
pub(crate) struct Processor {
    dsp: Box<dyn InstrumentDsp>,
    consumer: EventConsumer,
    sample_rate: f64,
}

impl Processor {
    pub(crate) fn new(dsp: Box<dyn InstrumentDsp>, consumer: EventConsumer, sample_rate: f64) -> Self {
        Self {
            dsp,
            consumer,
            sample_rate,
        }
    }

    fn process(&mut self, output: &mut [f32], num_channels: usize, timestamp: f64) {
        if num_channels == 0 || output.is_empty() {
            return;
        }
        debug_assert_eq!(output.len() % num_channels, 0);
        let num_frames = output.len() / num_channels;
        let end_timestamp = timestamp + num_frames as f64 / self.sample_rate;
        let mut frame = 0;
        // Drain every event due before the end of this buffer, rendering
        // the gap in front of each one first.
        while let Some((event_timestamp, event)) = self.consumer.pop_until(end_timestamp) {
            let event_frame = ((event_timestamp - timestamp) * self.sample_rate).round();
            let event_frame = (event_frame.clamp(0.0, num_frames as f64) as usize).max(frame);
            if event_frame > frame {
                self.dsp
                    .process(&mut output[num_channels * frame..num_channels * event_frame], num_channels);
                frame = event_frame;
            }
            match event {
                InstrumentEvent::SetData(data) => self.dsp.set_data(data),
                InstrumentEvent::SetParameter { index, value } => {
                    self.dsp.set_parameter(index, value, 0.0)
                }
                InstrumentEvent::StartNote { pitch, intensity } => {
                    self.dsp.set_note_on(pitch, intensity)
                }
                InstrumentEvent::StopNote { pitch } => self.dsp.set_note_off(pitch),
            }
        }
        if frame < num_frames {
            self.dsp
                .process(&mut output[num_channels * frame..], num_channels);
        }
    }
}

/// Cloneable audio-thread handle to an instrument.
///
/// `process` is the only operation in the library that is safe to call
/// from the audio thread. The handle holds a weak reference: once the
/// engine destroys the instrument, `process` clears the buffer to
/// silence and returns. The host must still serialise destruction with
/// its render callback; the handle only guarantees that stale calls are
/// harmless no-ops.
#[derive(Clone)]
pub struct InstrumentHandle {
    processor: Weak<Mutex<Processor>>,
}

impl InstrumentHandle {
    pub(crate) fn new(processor: &Arc<Mutex<Processor>>) -> Self {
        Self {
            processor: Arc::downgrade(processor),
        }
    }

    /// Renders `output.len() / num_channels` interleaved frames starting
    /// at `timestamp`, applying queued events sample-accurately: each
    /// event lands on the frame nearest its timestamp.
    pub fn process(&self, output: &mut [f32], num_channels: usize, timestamp: f64) {
        let Some(processor) = self.processor.upgrade() else {
            output.fill(0.0);
            return;
        };
        processor.lock().process(output, num_channels, timestamp);
    }
}
