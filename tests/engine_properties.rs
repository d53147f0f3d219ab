//! Property checks over the full engine: emission completeness,
//! update-split invariance and transport linearity.

mod helpers;

use approx::assert_abs_diff_eq;
use helpers::{
    assert_hooks_match, attach_hook_log, recording_definition, take_hooks, HookLog, NoteHook,
};
use ostinato::{NoteDefinition, OstinatoEngine, Sequence};
use proptest::prelude::*;

/// A fixed arrangement with straddling, zero-length and looping notes.
/// Tempo 60 BPM so beat positions equal wall-clock seconds.
fn build_engine() -> (OstinatoEngine, HookLog) {
    let mut engine = OstinatoEngine::builder()
        .sample_rate(48000.0)
        .tempo(60.0)
        .build()
        .unwrap();
    let (definition, _calls) = recording_definition(vec![]);
    let instrument = engine.create_instrument(definition).unwrap();

    let mut sequence = Sequence::new();
    sequence
        .add_note(1, 0.2, NoteDefinition::new(0.5, 60.0, 1.0))
        .unwrap();
    sequence
        .add_note(2, 0.9, NoteDefinition::new(0.85, 62.0, 0.8))
        .unwrap();
    sequence
        .add_note(3, 1.5, NoteDefinition::new(2.0, 64.0, 1.0))
        .unwrap();
    sequence
        .add_note(4, 2.0, NoteDefinition::new(0.0, 65.0, 0.5))
        .unwrap();
    sequence
        .add_note(5, 3.1, NoteDefinition::new(5.0, 67.0, 1.0))
        .unwrap();
    engine.add_performer(sequence, instrument).unwrap();

    let mut looped = Sequence::new();
    looped
        .add_note(1, 0.1, NoteDefinition::new(0.3, 70.0, 0.6))
        .unwrap();
    looped.set_looping(true);
    looped.set_loop_length(1.0);
    engine.add_performer(looped, instrument).unwrap();

    let hooks = attach_hook_log(&mut engine, instrument);
    (engine, hooks)
}

#[test]
fn test_every_note_emits_one_on_off_pair() {
    let (mut engine, hooks) = build_engine();
    engine.start_playback();
    engine.update(10.0);

    let events = take_hooks(&hooks);
    // Pitch 60: on at 0.2, off at 0.7; pitch 62: 0.9/1.75; pitch 64:
    // 1.5/3.5; pitch 65: zero-length at 2.0; pitch 67: 3.1/8.1; pitch
    // 70: ten loop iterations.
    for (pitch, on, off) in [
        (60.0, 0.2, 0.7),
        (62.0, 0.9, 1.75),
        (64.0, 1.5, 3.5),
        (65.0, 2.0, 2.0),
        (67.0, 3.1, 8.1),
    ] {
        let ons: Vec<&NoteHook> = events
            .iter()
            .filter(|event| matches!(event, NoteHook::On { pitch: p, .. } if *p == pitch))
            .collect();
        let offs: Vec<&NoteHook> = events
            .iter()
            .filter(|event| matches!(event, NoteHook::Off { pitch: p, .. } if *p == pitch))
            .collect();
        assert_eq!(ons.len(), 1, "pitch {pitch} note-on count");
        assert_eq!(offs.len(), 1, "pitch {pitch} note-off count");
        if let NoteHook::On { timestamp, .. } = ons[0] {
            assert_abs_diff_eq!(*timestamp, on, epsilon = 1e-9);
        }
        if let NoteHook::Off { timestamp, .. } = offs[0] {
            assert_abs_diff_eq!(*timestamp, off, epsilon = 1e-9);
        }
    }

    // The looping note sounded once per beat.
    let loop_ons = events
        .iter()
        .filter(|event| matches!(event, NoteHook::On { pitch, .. } if *pitch == 70.0))
        .count();
    assert_eq!(loop_ons, 10);
}

#[test]
fn test_tempo_zero_freezes_position() {
    let (mut engine, hooks) = build_engine();
    engine.set_tempo(0.0);
    engine.start_playback();
    engine.update(5.0);
    assert_abs_diff_eq!(engine.position(), 0.0);
    assert_abs_diff_eq!(engine.timestamp(), 5.0);
    assert!(engine.timestamp_of(1.0).is_infinite());
    assert!(take_hooks(&hooks).is_empty());
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Splitting one update into two at an arbitrary point produces the
    /// same events: active-note carryover threads the split.
    #[test]
    fn test_split_update_matches_single_update(split in 0.05f64..3.95) {
        let (mut combined, combined_hooks) = build_engine();
        combined.start_playback();
        combined.update(4.0);

        let (mut divided, divided_hooks) = build_engine();
        divided.start_playback();
        divided.update(split);
        divided.update(4.0);

        assert_hooks_match(&take_hooks(&divided_hooks), &take_hooks(&combined_hooks));
    }

    /// With a constant tempo, position advances linearly in wall time.
    #[test]
    fn test_transport_linearity(tempo_bpm in 30.0f64..300.0, duration in 0.1f64..5.0) {
        let mut engine = OstinatoEngine::builder().tempo(tempo_bpm).build().unwrap();
        engine.start_playback();
        engine.update(duration);
        let expected = tempo_bpm / 60.0 * duration;
        prop_assert!((engine.position() - expected).abs() < 1e-6);
    }
}
