//! Queue integration tests
//!
//! Pattern: fill the UI/DSP channels to their edges and check that
//! messages are delivered whole, in order, or not at all.

use crate::helpers::*;
use jackwrap::core::channel::{byte_queue, control_channel, event_channel, BLOB_HEADER_SIZE};
use jackwrap::core::{ControlUpdate, WrapperConfig};

/// A message one byte over capacity is refused and leaves no trace.
#[test]
fn test_oversized_write_leaves_queue_empty() {
    const N: usize = 64;
    let (mut tx, rx) = byte_queue(N);
    assert!(!tx.try_write(&[0xAA; N + 1]));
    assert_eq!(rx.read_space(), 0);
    assert_eq!(tx.pending(), 0);

    let (mut tx, mut rx) = event_channel(N);
    assert!(!tx.try_send(&[0xAA; N + 1]));
    assert!(!tx.try_send(&[0xAA; N - BLOB_HEADER_SIZE + 1]));
    assert_eq!(rx.pending_len(), None);
    assert!(tx.try_send(&[0xAA; N - BLOB_HEADER_SIZE]));
    let mut buf = [0u8; N];
    assert_eq!(rx.try_recv(&mut buf), Some(N - BLOB_HEADER_SIZE));
}

#[test]
fn test_control_updates_keep_order() {
    let (mut tx, mut rx) = control_channel(64);
    for i in 0..8 {
        assert!(tx.try_send(ControlUpdate::new(i, i as f32 * 0.1)));
    }
    assert!(!tx.try_send(ControlUpdate::new(99, 1.0)));
    let received: Vec<u32> = std::iter::from_fn(|| rx.try_recv()).map(|u| u.port).collect();
    assert_eq!(received, (0..8).collect::<Vec<_>>());
}

/// Queue sizes follow the configured refresh ratio.
#[test]
fn test_queue_capacity_scales_with_config() {
    let config = WrapperConfig {
        update_freq_ratio: 4,
        ..Default::default()
    };
    let small = config.control_queue_capacity(3);
    let large = config.control_queue_capacity(6);
    assert!(large > small);
    assert!(config.event_queue_capacity() >= config.atom_capacity);
}

/// Without a control thread draining, output stops being queued but the
/// cycle keeps running.
#[test]
fn test_full_queues_do_not_stall_cycles() {
    let mut rig = gain_rig(WrapperConfig {
        send_time_info: false,
        atom_capacity: 64,
        ..Default::default()
    });
    let blob = atom(rig.urids.atom_int, &1i32.to_ne_bytes());
    let mut cycle = TestCycle::new(TEST_BLOCK_SIZE);

    for _ in 0..200 {
        rig.control.events_out.try_send(&blob);
        rig.processor.process(&mut cycle);
    }
    assert_eq!(rig.processor.plugin().gains.len(), 200);
    assert!(rig.control.events_in.pending_len().is_some());
}
