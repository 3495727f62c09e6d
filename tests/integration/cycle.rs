//! Cycle integration tests
//!
//! Pattern: drive the processor with a simulated engine cycle and look at
//! what the plugin saw and what reached the control thread.

use crate::helpers::tolerances::FLOAT_EPSILON;
use crate::helpers::*;
use jackwrap::core::atom::Sequence;
use jackwrap::core::{ControlUpdate, WrapperConfig};

fn no_time() -> WrapperConfig {
    WrapperConfig {
        send_time_info: false,
        ..Default::default()
    }
}

/// UI sets 0.8 before cycle 0; the default 0.5 never comes back.
#[test]
fn test_ui_control_write_reaches_plugin_without_stale_value() {
    let mut rig = gain_rig(no_time());
    let (_, mut writer) = rig.control.into_ui_parts(&rig.ports);

    assert!(writer.write(PORT_GAIN, 0, &0.8f32.to_ne_bytes()));

    let mut cycle = TestCycle::new(TEST_BLOCK_SIZE);
    rig.processor.process(&mut cycle);
    assert_eq!(rig.processor.control(0), Some(0.8));

    cycle.advance();
    rig.processor.process(&mut cycle);
    assert_eq!(rig.processor.plugin().gains, vec![0.8, 0.8]);
    assert!(cycle
        .output
        .iter()
        .all(|s| (s - 0.8).abs() < FLOAT_EPSILON));
}

/// The level output is reported once per change, keyed by plugin port index.
#[test]
fn test_control_output_reported_on_change_only() {
    let mut rig = gain_rig(no_time());
    let mut cycle = TestCycle::new(TEST_BLOCK_SIZE);

    rig.processor.process(&mut cycle);
    rig.processor.process(&mut cycle);
    assert_eq!(
        rig.control.controls_in.try_recv(),
        Some(ControlUpdate::new(PORT_LEVEL, 0.5))
    );
    assert_eq!(rig.control.controls_in.try_recv(), None);

    assert!(rig.control.controls_out.try_send(ControlUpdate::new(0, 0.25)));
    rig.processor.process(&mut cycle);
    assert_eq!(
        rig.control.controls_in.try_recv(),
        Some(ControlUpdate::new(PORT_LEVEL, 0.25))
    );
}

/// Control inputs are never echoed back to the UI.
#[test]
fn test_control_inputs_not_echoed() {
    let mut rig = gain_rig(no_time());
    let mut cycle = TestCycle::new(TEST_BLOCK_SIZE);
    assert!(rig.control.controls_out.try_send(ControlUpdate::new(0, 0.9)));
    rig.processor.process(&mut cycle);

    while let Some(update) = rig.control.controls_in.try_recv() {
        assert_ne!(update.port, PORT_GAIN);
    }
}

/// A UI atom reaches the plugin at time 0 and its echo reaches the UI queue.
#[test]
fn test_ui_atom_round_trip_through_plugin() {
    let mut rig = gain_rig(no_time());
    let blob = atom(rig.urids.atom_int, &7i32.to_ne_bytes());
    assert!(rig.control.events_out.try_send(&blob));

    let mut cycle = TestCycle::new(TEST_BLOCK_SIZE);
    rig.processor.process(&mut cycle);
    assert_eq!(rig.processor.plugin().events[0], vec![rig.urids.atom_int]);

    let size = rig.control.events_in.pending_len().expect("echo queued");
    let mut buf = vec![0u8; size];
    assert_eq!(rig.control.events_in.try_recv(&mut buf), Some(size));
    let seq = Sequence::parse(&buf).expect("sequence");
    assert_eq!(seq.sequence_type(), rig.urids.atom_sequence);
    let events: Vec<_> = seq.events().collect();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].frames, 0);
    assert_eq!(events[0].atom, blob.as_slice());
}

/// Cycles in which the plugin writes nothing forward nothing.
#[test]
fn test_empty_output_not_forwarded() {
    let mut rig = gain_rig(no_time());
    let mut cycle = TestCycle::new(TEST_BLOCK_SIZE);
    for _ in 0..4 {
        rig.processor.process(&mut cycle);
        cycle.advance();
    }
    assert_eq!(rig.control.events_in.pending_len(), None);
    assert_eq!(rig.processor.plugin().events, vec![Vec::<u32>::new(); 4]);
}

#[test]
fn test_activate_and_deactivate_reach_plugin() {
    let mut rig = gain_rig(no_time());
    rig.processor.activate();
    assert!(rig.processor.plugin().active);
    rig.processor.deactivate();
    assert!(!rig.processor.plugin().active);
}
