//! The real-time audio cycle.
//!
//! Everything here runs on the engine's process thread: no allocation, no
//! blocking locks, no logging. Overflow anywhere drops the affected event or
//! message and the cycle carries on.

use crate::atom::{
    pad_size, SequenceBuffer, ATOM_HEADER_SIZE, EVENT_HEADER_SIZE, SEQUENCE_HEADER_SIZE,
};
use crate::channel::{AudioEndpoint, ControlUpdate, EventReceiver, BLOB_HEADER_SIZE};
use crate::config::WrapperConfig;
use crate::plugin::{CycleScope, PluginInstance};
use crate::port::PortMap;
use crate::transport::{encode_position, TransportSnapshot, POSITION_SCRATCH_SIZE};
use crate::urid::Urids;
use crate::wake::WakeSignal;
use std::cell::Cell;
use std::sync::Arc;

/// Owns the plugin and every buffer bound to it.
pub struct CycleProcessor<P: PluginInstance> {
    // Declared first so the plugin is dropped before the memory it points at.
    plugin: P,
    ports: PortMap,
    urids: Urids,
    send_time_info: bool,
    /// Bound to the plugin's control ports for the life of the processor.
    controls: Box<[Cell<f32>]>,
    previous: Box<[f32]>,
    control_outputs: Box<[usize]>,
    event_in: SequenceBuffer,
    event_out: SequenceBuffer,
    ui_blob: Box<[u8]>,
    transport: TransportSnapshot,
    channels: AudioEndpoint,
    wake: Arc<WakeSignal>,
}

impl<P: PluginInstance> CycleProcessor<P> {
    pub fn new(
        plugin: P,
        ports: PortMap,
        urids: Urids,
        config: &WrapperConfig,
        channels: AudioEndpoint,
        wake: Arc<WakeSignal>,
    ) -> Self {
        let initial = ports.initial_controls();
        let control_outputs = (0..ports.control_count())
            .filter(|&ctrl| ports.is_control_output(ctrl))
            .collect();

        let mut processor = Self {
            plugin,
            urids,
            send_time_info: config.send_time_info,
            controls: initial.iter().copied().map(Cell::new).collect(),
            previous: initial.into_boxed_slice(),
            control_outputs,
            event_in: SequenceBuffer::new(config.atom_capacity),
            event_out: SequenceBuffer::new(config.atom_capacity),
            ui_blob: vec![0u8; config.atom_capacity].into_boxed_slice(),
            transport: TransportSnapshot::default(),
            channels,
            wake,
            ports,
        };

        for (ctrl, &port) in processor.ports.controls().iter().enumerate() {
            let value = processor.controls[ctrl].as_ptr();
            // SAFETY: the boxed slice never reallocates and outlives the
            // plugin (field order), so the pointer stays valid.
            unsafe { processor.plugin.connect_port(port, value.cast()) };
        }
        processor
    }

    pub fn activate(&mut self) {
        self.plugin.activate();
    }

    pub fn deactivate(&mut self) {
        self.plugin.deactivate();
    }

    pub fn plugin(&self) -> &P {
        &self.plugin
    }

    pub fn ports(&self) -> &PortMap {
        &self.ports
    }

    /// Current value of control `ctrl` as the plugin sees it.
    pub fn control(&self, ctrl: usize) -> Option<f32> {
        self.controls.get(ctrl).map(Cell::get)
    }

    /// The inbound sequence as built by the most recent cycle.
    pub fn event_input(&self) -> &SequenceBuffer {
        &self.event_in
    }

    pub fn transport_snapshot(&self) -> TransportSnapshot {
        self.transport
    }

    /// Run one audio cycle.
    pub fn process<S: CycleScope>(&mut self, scope: &mut S) {
        let nframes = scope.nframes();

        // only what was queued when the cycle started
        for _ in 0..self.channels.controls_in.pending() {
            let Some(update) = self.channels.controls_in.try_recv() else {
                break;
            };
            if let Some(slot) = self.controls.get(update.port as usize) {
                slot.set(update.value);
            }
        }

        let now = scope.transport();
        let transport_changed = self.transport.changed(&now);

        if let Some(input) = self.ports.event_input() {
            let seq = &mut self.event_in;
            seq.reset_sequence(self.urids.atom_sequence);

            if transport_changed && self.send_time_info {
                let mut scratch = [0u8; POSITION_SCRATCH_SIZE];
                if let Some(body) = encode_position(&self.urids, &now, &mut scratch) {
                    seq.append_event(0, self.urids.atom_blank, body);
                }
            }

            drain_ui_events(&mut self.channels.events_in, seq, &mut self.ui_blob);

            if input.midi {
                let midi_event = self.urids.midi_event;
                scope.for_each_midi_input(|time, bytes| {
                    seq.append_event(i64::from(time), midi_event, bytes);
                });
            }
        }

        if self.ports.event_output().is_some() {
            self.event_out.reset_output(self.urids.atom_chunk);
        }

        for (i, &port) in self.ports.audio_inputs().iter().enumerate() {
            let buffer = scope.audio_input(i);
            // SAFETY: engine buffers are valid for this cycle and rebound next cycle.
            unsafe { self.plugin.connect_port(port, buffer.cast()) };
        }
        for (i, &port) in self.ports.audio_outputs().iter().enumerate() {
            let buffer = scope.audio_output(i);
            // SAFETY: as above.
            unsafe { self.plugin.connect_port(port, buffer.cast()) };
        }
        if let Some(input) = self.ports.event_input() {
            // SAFETY: owned sequence buffers outlive the plugin.
            unsafe { self.plugin.connect_port(input.index, self.event_in.as_mut_ptr()) };
        }
        if let Some(output) = self.ports.event_output() {
            // SAFETY: as above.
            unsafe { self.plugin.connect_port(output.index, self.event_out.as_mut_ptr()) };
        }

        for (prev, current) in self.previous.iter_mut().zip(self.controls.iter()) {
            *prev = current.get();
        }

        self.transport = self.transport.advance(&now, nframes);

        self.plugin.run(nframes);

        let port_indices = self.ports.controls();
        for &ctrl in self.control_outputs.iter() {
            let value = self.controls[ctrl].get();
            if value.to_bits() != self.previous[ctrl].to_bits() {
                let update = ControlUpdate::new(port_indices[ctrl], value);
                // dropped under backpressure; a later change resends
                self.channels.controls_out.try_send(update);
            }
        }

        if let Some(output) = self.ports.event_output() {
            if output.midi {
                scope.clear_midi_output();
            }
            if let Some(seq) = self.event_out.sequence(self.urids.atom_sequence) {
                if !seq.is_empty() {
                    self.channels.events_out.try_send(seq.as_bytes());
                    if output.midi {
                        for event in seq.events() {
                            if event.event_type != self.urids.midi_event {
                                continue;
                            }
                            if let Ok(time) = u32::try_from(event.frames) {
                                scope.write_midi_output(time, event.payload);
                            }
                        }
                    }
                }
            }
        }

        if self.channels.controls_out.has_unread() || self.channels.events_out.has_unread() {
            self.wake.notify_nonblocking();
        }
    }
}

/// Append queued UI atoms as zero-time events until one does not fit.
///
/// A blob that cannot fit even into an empty sequence is consumed and dropped
/// so it does not block the queue forever. Blobs queued after the drain
/// starts wait for the next cycle.
fn drain_ui_events(events: &mut EventReceiver, seq: &mut SequenceBuffer, scratch: &mut [u8]) {
    let max_record = seq.capacity() - SEQUENCE_HEADER_SIZE;
    let mut budget = events.buffered();
    while let Some(size) = events.pending_len() {
        let Some(left) = budget.checked_sub(BLOB_HEADER_SIZE + size) else {
            break;
        };
        budget = left;
        // time stamp + the atom itself
        let record = pad_size(EVENT_HEADER_SIZE - ATOM_HEADER_SIZE + size);
        if size < ATOM_HEADER_SIZE || record > max_record || size > scratch.len() {
            events.discard();
            continue;
        }
        if record > seq.remaining() {
            break;
        }
        let Some(read) = events.try_recv(scratch) else {
            break;
        };
        seq.append_atom(0, &scratch[..read]);
    }
}
