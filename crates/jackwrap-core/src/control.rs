//! The control thread: feeds the UI from the audio thread and back.

use crate::atom::{Sequence, SequenceBuffer};
use crate::channel::{
    ControlEndpoint, ControlReceiver, ControlSender, ControlUpdate, EventReceiver, EventSender,
};
use crate::config::WrapperConfig;
use crate::plugin::{PluginUi, UiPortEvent};
use crate::port::PortMap;
use crate::state::{RunState, Shutdown};
use crate::wake::WakeSignal;
use std::sync::Arc;
use std::time::Duration;

/// The single entry point for edits coming from the UI.
///
/// Holds the producer ends towards the audio thread; it is handed to
/// whatever calls back from inside the UI.
pub struct UiWriter {
    /// Control index per plugin port; `None` for non-control ports.
    control_index: Box<[Option<u32>]>,
    controls: ControlSender,
    events: EventSender,
}

impl UiWriter {
    pub fn new(ports: &PortMap, controls: ControlSender, events: EventSender) -> Self {
        let control_index = (0..ports.len() as u32)
            .map(|port| ports.control_index(port).map(|ctrl| ctrl as u32))
            .collect();
        Self {
            control_index,
            controls,
            events,
        }
    }

    /// Queue one UI write. Returns whether anything was queued.
    ///
    /// A non-zero `protocol` marks `buffer` as an opaque atom for the event
    /// input; protocol 0 is a plain `f32` for a control port.
    pub fn write(&mut self, port: u32, protocol: u32, buffer: &[u8]) -> bool {
        if buffer.is_empty() {
            return false;
        }
        if protocol != 0 {
            return self.events.try_send(buffer);
        }
        let Ok(raw) = <[u8; 4]>::try_from(buffer) else {
            tracing::warn!(port, size = buffer.len(), "unsupported UI write buffer");
            return false;
        };
        let Some(ctrl) = self.control_index.get(port as usize).copied().flatten() else {
            tracing::warn!(port, "UI write to unmapped port");
            return false;
        };
        self.controls
            .try_send(ControlUpdate::new(ctrl, f32::from_ne_bytes(raw)))
    }
}

/// Consumer ends read by the control thread.
pub struct UiInbox {
    controls: ControlReceiver,
    events: EventReceiver,
}

impl ControlEndpoint {
    /// Split into the inbox drained by [`ControlLoop`] and the writer used by
    /// the UI.
    pub fn into_ui_parts(self, ports: &PortMap) -> (UiInbox, UiWriter) {
        (
            UiInbox {
                controls: self.controls_in,
                events: self.events_in,
            },
            UiWriter::new(ports, self.controls_out, self.events_out),
        )
    }
}

/// Drives the UI from the control thread until exit is requested.
pub struct ControlLoop<U: PluginUi> {
    ui: U,
    inbox: UiInbox,
    /// Plugin port index event records are reported on.
    event_port: Option<u32>,
    scratch: SequenceBuffer,
    interval: Duration,
    state: Arc<RunState>,
    wake: Arc<WakeSignal>,
}

impl<U: PluginUi> ControlLoop<U> {
    pub fn new(
        ui: U,
        inbox: UiInbox,
        ports: &PortMap,
        config: &WrapperConfig,
        shutdown: &Shutdown,
    ) -> Self {
        Self {
            ui,
            inbox,
            event_port: ports.event_output().map(|port| port.index),
            scratch: SequenceBuffer::new(config.atom_capacity),
            interval: config.ui_refresh_interval(),
            state: Arc::clone(shutdown.state()),
            wake: Arc::clone(shutdown.wake()),
        }
    }

    pub fn ui(&self) -> &U {
        &self.ui
    }

    /// Show the UI, refresh it until exit, hide it.
    pub fn run(&mut self) {
        tracing::debug!(interval = ?self.interval, "control loop started");
        self.ui.show();

        let wake = Arc::clone(&self.wake);
        let mut guard = wake.lock();
        while !self.state.is_exiting() {
            self.run_once();
            if self.state.is_exiting() {
                break;
            }
            wake.wait(&mut guard, self.interval);
        }
        drop(guard);

        self.ui.hide();
        tracing::debug!("control loop finished");
    }

    /// One refresh: forward pending controls, then events, then idle the UI.
    pub fn run_once(&mut self) {
        while let Some(update) = self.inbox.controls.try_recv() {
            self.ui
                .port_event(update.port, UiPortEvent::Control(update.value));
        }
        self.forward_events();
        self.ui.idle();
    }

    fn forward_events(&mut self) {
        while let Some(size) = self.inbox.events.pending_len() {
            if size > self.scratch.capacity() {
                tracing::warn!(size, "dropping oversized event blob");
                self.inbox.events.discard();
                continue;
            }
            let Some(read) = self.inbox.events.try_recv(self.scratch.bytes_mut()) else {
                break;
            };
            let Some(port) = self.event_port else {
                continue;
            };
            let Some(seq) = Sequence::parse(&self.scratch.bytes()[..read]) else {
                tracing::warn!(size = read, "malformed event blob");
                continue;
            };
            for event in seq.events() {
                self.ui.port_event(port, UiPortEvent::Atom(event.atom));
            }
        }
    }
}

/// Block until exit is requested; used when there is no UI to drive.
pub fn wait_for_exit(shutdown: &Shutdown, interval: Duration) {
    let wake = shutdown.wake();
    let mut guard = wake.lock();
    while !shutdown.is_triggered() {
        wake.wait(&mut guard, interval);
    }
}
