//! Control loop integration tests
//!
//! Pattern: a processor runs cycles on its own thread while the control
//! loop refreshes a recording UI, the way the binary wires them.

use crate::helpers::*;
use jackwrap::core::{ControlLoop, Shutdown, WrapperConfig};
use jackwrap::{RunState, WakeSignal};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

fn shutdown_for(wake: &Arc<WakeSignal>) -> Shutdown {
    Shutdown::new(Arc::new(RunState::new()), Arc::clone(wake))
}

/// UI edits go in, plugin output comes back, and the loop stops on exit.
#[test]
fn test_ui_round_trip_with_running_processor() {
    let config = WrapperConfig::default();
    let rig = gain_rig(config.clone());
    let shutdown = shutdown_for(&rig.wake);
    assert!(shutdown.state().start());

    let (inbox, mut writer) = rig.control.into_ui_parts(&rig.ports);
    let blob = atom(rig.urids.atom_int, &42i32.to_ne_bytes());
    assert!(writer.write(PORT_GAIN, 0, &0.7f32.to_ne_bytes()));
    assert!(writer.write(PORT_EVENTS_IN, rig.urids.atom_event_transfer, &blob));

    let mut processor = rig.processor;
    let audio = {
        let shutdown = shutdown.clone();
        thread::spawn(move || {
            let mut cycle = TestCycle::new(TEST_BLOCK_SIZE);
            while !shutdown.is_triggered() {
                processor.process(&mut cycle);
                cycle.advance();
                thread::sleep(Duration::from_millis(1));
            }
            processor
        })
    };
    let stopper = {
        let shutdown = shutdown.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(150));
            shutdown.trigger();
        })
    };

    let mut control_loop =
        ControlLoop::new(RecordingUi::default(), inbox, &rig.ports, &config, &shutdown);
    control_loop.run();
    stopper.join().unwrap();
    let processor = audio.join().unwrap();

    assert_eq!(processor.control(0), Some(0.7));
    let ui = control_loop.ui();
    assert!(ui.shown && ui.hidden);
    assert!(ui.controls.contains(&(PORT_LEVEL, 0.7)));
    assert!(ui.controls.iter().all(|&(port, _)| port == PORT_LEVEL));
    assert_eq!(ui.atoms, vec![(PORT_EVENTS_OUT, blob)]);
}

/// Exit requested before the loop starts: show, no refresh beyond the
/// first, hide.
#[test]
fn test_exit_before_start() {
    let config = WrapperConfig::default();
    let rig = gain_rig(config.clone());
    let shutdown = shutdown_for(&rig.wake);
    shutdown.trigger();
    assert!(!shutdown.state().start());

    let (inbox, _writer) = rig.control.into_ui_parts(&rig.ports);
    let mut control_loop =
        ControlLoop::new(RecordingUi::default(), inbox, &rig.ports, &config, &shutdown);
    control_loop.run();

    let ui = control_loop.ui();
    assert!(ui.shown && ui.hidden);
    assert_eq!(ui.idles, 0);
}
