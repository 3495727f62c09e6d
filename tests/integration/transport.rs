//! Transport integration tests
//!
//! Pattern: script the engine transport cycle by cycle and count the
//! position events the plugin receives.

use crate::helpers::tolerances::TEMPO_EPSILON;
use crate::helpers::*;
use approx::assert_abs_diff_eq;
use jackwrap::core::atom::object_properties;
use jackwrap::core::{Bbt, TransportPosition, Urids, WrapperConfig};

fn bbt_at(bpm: f64) -> Bbt {
    Bbt {
        bar: 1,
        beat: 1,
        tick: 0,
        ticks_per_beat: 1920.0,
        beat_type: 4.0,
        beats_per_bar: 4.0,
        beats_per_minute: bpm,
    }
}

/// Position event bodies in the inbound sequence of the last cycle.
fn position_events(rig: &Rig) -> Vec<Vec<u8>> {
    let urids = rig.urids;
    rig.processor
        .event_input()
        .sequence(urids.atom_sequence)
        .map(|seq| {
            seq.events()
                .filter(|e| e.event_type == urids.atom_blank)
                .map(|e| e.payload.to_vec())
                .collect()
        })
        .unwrap_or_default()
}

fn float_property(urids: &Urids, body: &[u8], key: u32) -> Option<f32> {
    let (otype, mut props) = object_properties(body)?;
    assert_eq!(otype, urids.time_position);
    props.find(|p| p.key == key).and_then(|p| p.as_f32())
}

/// Stopped for ten cycles, rolling at 120 bpm on the eleventh: exactly one
/// position event, on cycle 11.
#[test]
fn test_start_rolling_fires_once() {
    let mut rig = gain_rig(WrapperConfig::default());
    let mut cycle = TestCycle::new(TEST_BLOCK_SIZE);
    let mut fired = Vec::new();

    for n in 1..=14 {
        if n == 11 {
            cycle.transport.rolling = true;
            cycle.transport.bbt = Some(bbt_at(120.0));
        }
        rig.processor.process(&mut cycle);
        for body in position_events(&rig) {
            fired.push((n, body));
        }
        cycle.advance();
    }

    assert_eq!(fired.len(), 1);
    let (n, body) = &fired[0];
    assert_eq!(*n, 11);
    let urids = rig.urids;
    let speed = float_property(&urids, body, urids.time_speed).unwrap();
    let bpm = float_property(&urids, body, urids.time_beats_per_minute).unwrap();
    assert_abs_diff_eq!(speed, 1.0);
    assert_abs_diff_eq!(bpm, 120.0, epsilon = TEMPO_EPSILON);
}

/// A locate while stopped and a tempo change while rolling both fire.
#[test]
fn test_locate_and_tempo_change_fire() {
    let mut rig = gain_rig(WrapperConfig::default());
    let mut cycle = TestCycle::new(TEST_BLOCK_SIZE);

    rig.processor.process(&mut cycle);
    assert!(position_events(&rig).is_empty());

    cycle.transport = TransportPosition::stopped_at(48_000);
    rig.processor.process(&mut cycle);
    let events = position_events(&rig);
    assert_eq!(events.len(), 1);
    let (_, props) = object_properties(&events[0]).unwrap();
    let frame = props
        .filter(|p| p.key == rig.urids.time_frame)
        .find_map(|p| p.as_i64());
    assert_eq!(frame, Some(48_000));

    cycle.transport.rolling = true;
    cycle.transport.bbt = Some(bbt_at(90.0));
    rig.processor.process(&mut cycle);
    assert_eq!(position_events(&rig).len(), 1);
    cycle.advance();

    rig.processor.process(&mut cycle);
    assert!(position_events(&rig).is_empty());
    cycle.advance();

    cycle.transport.bbt = Some(bbt_at(140.0));
    rig.processor.process(&mut cycle);
    assert_eq!(position_events(&rig).len(), 1);
}

/// With time info disabled the snapshot still tracks, but nothing is sent.
#[test]
fn test_no_time_info_sends_nothing() {
    let mut rig = gain_rig(WrapperConfig {
        send_time_info: false,
        ..Default::default()
    });
    let mut cycle = TestCycle::new(TEST_BLOCK_SIZE);
    cycle.transport.rolling = true;
    for _ in 0..3 {
        rig.processor.process(&mut cycle);
        assert!(position_events(&rig).is_empty());
        cycle.advance();
    }
    assert!(rig.processor.transport_snapshot().rolling);
    assert_eq!(
        rig.processor.transport_snapshot().frame,
        3 * u64::from(TEST_BLOCK_SIZE)
    );
}
