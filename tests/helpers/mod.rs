//! Shared test fixtures: a recording instrument and note hook logs.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use ostinato::{
    Id, InstrumentData, InstrumentDefinition, InstrumentDsp, OstinatoEngine, ParameterDefinition,
};

/// Everything the DSP half of the recording instrument observes, in
/// call order.
#[derive(Debug, Clone, PartialEq)]
pub enum DspCall {
    Process { frames: usize },
    SetParameter { index: usize, value: f64 },
    NoteOn { pitch: f64, intensity: f64 },
    NoteOff { pitch: f64 },
    SetData,
}

pub type CallLog = Arc<Mutex<Vec<DspCall>>>;

struct RecordingDsp {
    calls: CallLog,
}

impl InstrumentDsp for RecordingDsp {
    fn process(&mut self, output: &mut [f32], num_channels: usize) {
        self.calls.lock().unwrap().push(DspCall::Process {
            frames: output.len() / num_channels,
        });
        output.fill(0.0);
    }

    fn set_data(&mut self, _data: InstrumentData) {
        self.calls.lock().unwrap().push(DspCall::SetData);
    }

    fn set_note_on(&mut self, pitch: f64, intensity: f64) {
        self.calls
            .lock()
            .unwrap()
            .push(DspCall::NoteOn { pitch, intensity });
    }

    fn set_note_off(&mut self, pitch: f64) {
        self.calls.lock().unwrap().push(DspCall::NoteOff { pitch });
    }

    fn set_parameter(&mut self, index: usize, value: f64, _slope_per_frame: f64) {
        self.calls
            .lock()
            .unwrap()
            .push(DspCall::SetParameter { index, value });
    }
}

/// Builds an instrument definition whose DSP half records every call.
pub fn recording_definition(parameters: Vec<ParameterDefinition>) -> (InstrumentDefinition, CallLog) {
    let calls: CallLog = Arc::default();
    let dsp_calls = calls.clone();
    let definition = InstrumentDefinition::new(move |_sample_rate| {
        Box::new(RecordingDsp { calls: dsp_calls }) as Box<dyn InstrumentDsp>
    })
    .with_parameters(parameters);
    (definition, calls)
}

pub fn take_calls(calls: &CallLog) -> Vec<DspCall> {
    std::mem::take(&mut *calls.lock().unwrap())
}

/// Control-thread note observations with their event timestamps.
#[derive(Debug, Clone, PartialEq)]
pub enum NoteHook {
    On {
        pitch: f64,
        intensity: f64,
        timestamp: f64,
    },
    Off {
        pitch: f64,
        timestamp: f64,
    },
}

pub type HookLog = Arc<Mutex<Vec<NoteHook>>>;

/// Registers note on/off hooks on an instrument and returns their
/// shared log.
pub fn attach_hook_log(engine: &mut OstinatoEngine, instrument_id: Id) -> HookLog {
    let log: HookLog = Arc::default();
    let on_log = log.clone();
    engine
        .set_note_on_callback(instrument_id, move |pitch, intensity, timestamp| {
            on_log.lock().unwrap().push(NoteHook::On {
                pitch,
                intensity,
                timestamp,
            });
        })
        .unwrap();
    let off_log = log.clone();
    engine
        .set_note_off_callback(instrument_id, move |pitch, timestamp| {
            off_log
                .lock()
                .unwrap()
                .push(NoteHook::Off { pitch, timestamp });
        })
        .unwrap();
    log
}

pub fn take_hooks(log: &HookLog) -> Vec<NoteHook> {
    std::mem::take(&mut *log.lock().unwrap())
}

/// Asserts two hook logs describe the same events, comparing timestamps
/// with a tolerance.
pub fn assert_hooks_match(actual: &[NoteHook], expected: &[NoteHook]) {
    assert_eq!(
        actual.len(),
        expected.len(),
        "event count mismatch:\n  actual: {actual:?}\n  expected: {expected:?}"
    );
    for (index, (actual, expected)) in actual.iter().zip(expected).enumerate() {
        let matches = match (actual, expected) {
            (
                NoteHook::On {
                    pitch: p1,
                    intensity: i1,
                    timestamp: t1,
                },
                NoteHook::On {
                    pitch: p2,
                    intensity: i2,
                    timestamp: t2,
                },
            ) => p1 == p2 && i1 == i2 && (t1 - t2).abs() < 1e-9,
            (
                NoteHook::Off {
                    pitch: p1,
                    timestamp: t1,
                },
                NoteHook::Off {
                    pitch: p2,
                    timestamp: t2,
                },
            ) => p1 == p2 && (t1 - t2).abs() < 1e-9,
            _ => false,
        };
        assert!(
            matches,
            "event {index} mismatch: {actual:?} vs {expected:?}"
        );
    }
}
