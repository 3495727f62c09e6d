//! Port classification.
//!
//! A plugin publishes one flat list of ports. The processor needs them split
//! by category, with index maps in both directions: the engine binds buffers by
//! category-local index, the plugin and its UI address everything by plugin
//! port index.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PortKind {
    ControlIn,
    ControlOut,
    AudioIn,
    AudioOut,
    /// Event input fed from an engine MIDI port.
    MidiIn,
    /// Event output translated to an engine MIDI port.
    MidiOut,
    /// Event input fed only from the UI and the transport.
    AtomIn,
    /// Event output forwarded only to the UI.
    AtomOut,
}

impl PortKind {
    pub fn is_event_input(self) -> bool {
        matches!(self, PortKind::MidiIn | PortKind::AtomIn)
    }

    pub fn is_event_output(self) -> bool {
        matches!(self, PortKind::MidiOut | PortKind::AtomOut)
    }
}

/// Static description of one plugin port.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortDescriptor {
    pub name: String,
    pub kind: PortKind,
    /// Initial value; only meaningful for control inputs.
    #[serde(default)]
    pub default: f32,
}

impl PortDescriptor {
    pub fn new(name: impl Into<String>, kind: PortKind) -> Self {
        Self {
            name: name.into(),
            kind,
            default: 0.0,
        }
    }

    pub fn control_in(name: impl Into<String>, default: f32) -> Self {
        Self {
            name: name.into(),
            kind: PortKind::ControlIn,
            default,
        }
    }
}

/// Where a plugin port lives after classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortSlot {
    /// Index into the control value arrays.
    Control(usize),
    AudioIn(usize),
    AudioOut(usize),
    EventIn,
    EventOut,
}

/// The single event-carrying port of one direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventPort {
    /// Plugin port index.
    pub index: u32,
    /// Whether the engine side is a hardware MIDI port.
    pub midi: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PortCounts {
    pub audio_in: usize,
    pub audio_out: usize,
    pub control: usize,
    pub event_in: usize,
    pub event_out: usize,
}

impl PortCounts {
    pub fn total(&self) -> usize {
        self.audio_in + self.audio_out + self.control + self.event_in + self.event_out
    }
}

/// Classified ports with index maps. Immutable once built.
#[derive(Debug, Clone)]
pub struct PortMap {
    descriptors: Vec<PortDescriptor>,
    slots: Vec<PortSlot>,
    audio_in: Vec<u32>,
    audio_out: Vec<u32>,
    controls: Vec<u32>,
    control_is_output: Vec<bool>,
    event_in: Option<EventPort>,
    event_out: Option<EventPort>,
}

impl PortMap {
    /// Partition `descriptors` into categories.
    ///
    /// Fails when the list is empty or declares more than one event port in
    /// either direction.
    pub fn classify(descriptors: &[PortDescriptor]) -> Result<Self> {
        if descriptors.is_empty() {
            return Err(Error::NoPorts);
        }

        let event_inputs = descriptors
            .iter()
            .filter(|d| d.kind.is_event_input())
            .count();
        if event_inputs > 1 {
            return Err(Error::TooManyEventInputs {
                count: event_inputs,
            });
        }
        let event_outputs = descriptors
            .iter()
            .filter(|d| d.kind.is_event_output())
            .count();
        if event_outputs > 1 {
            return Err(Error::TooManyEventOutputs {
                count: event_outputs,
            });
        }

        let mut map = Self {
            descriptors: descriptors.to_vec(),
            slots: Vec::with_capacity(descriptors.len()),
            audio_in: Vec::new(),
            audio_out: Vec::new(),
            controls: Vec::new(),
            control_is_output: Vec::new(),
            event_in: None,
            event_out: None,
        };

        for (index, descriptor) in descriptors.iter().enumerate() {
            let index = index as u32;
            let slot = match descriptor.kind {
                PortKind::ControlIn => map.push_control(index, false),
                PortKind::ControlOut => map.push_control(index, true),
                PortKind::AudioIn => {
                    map.audio_in.push(index);
                    PortSlot::AudioIn(map.audio_in.len() - 1)
                }
                PortKind::AudioOut => {
                    map.audio_out.push(index);
                    PortSlot::AudioOut(map.audio_out.len() - 1)
                }
                PortKind::MidiIn | PortKind::AtomIn => {
                    map.event_in = Some(EventPort {
                        index,
                        midi: descriptor.kind == PortKind::MidiIn,
                    });
                    PortSlot::EventIn
                }
                PortKind::MidiOut | PortKind::AtomOut => {
                    map.event_out = Some(EventPort {
                        index,
                        midi: descriptor.kind == PortKind::MidiOut,
                    });
                    PortSlot::EventOut
                }
            };
            map.slots.push(slot);
        }

        tracing::debug!(
            audio_in = map.audio_in.len(),
            audio_out = map.audio_out.len(),
            controls = map.controls.len(),
            event_in = map.event_in.is_some(),
            event_out = map.event_out.is_some(),
            "classified plugin ports"
        );

        Ok(map)
    }

    fn push_control(&mut self, index: u32, output: bool) -> PortSlot {
        self.controls.push(index);
        self.control_is_output.push(output);
        PortSlot::Control(self.controls.len() - 1)
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    pub fn counts(&self) -> PortCounts {
        PortCounts {
            audio_in: self.audio_in.len(),
            audio_out: self.audio_out.len(),
            control: self.controls.len(),
            event_in: usize::from(self.event_in.is_some()),
            event_out: usize::from(self.event_out.is_some()),
        }
    }

    pub fn descriptors(&self) -> &[PortDescriptor] {
        &self.descriptors
    }

    pub fn descriptor(&self, port_index: u32) -> Option<&PortDescriptor> {
        self.descriptors.get(port_index as usize)
    }

    pub fn slot(&self, port_index: u32) -> Option<PortSlot> {
        self.slots.get(port_index as usize).copied()
    }

    /// Plugin port index of each audio input, by category index.
    pub fn audio_inputs(&self) -> &[u32] {
        &self.audio_in
    }

    /// Plugin port index of each audio output, by category index.
    pub fn audio_outputs(&self) -> &[u32] {
        &self.audio_out
    }

    /// Plugin port index of each control, by control index.
    pub fn controls(&self) -> &[u32] {
        &self.controls
    }

    pub fn control_count(&self) -> usize {
        self.controls.len()
    }

    /// Control index for a plugin port, `None` when the port is not a control.
    pub fn control_index(&self, port_index: u32) -> Option<usize> {
        match self.slot(port_index) {
            Some(PortSlot::Control(index)) => Some(index),
            _ => None,
        }
    }

    pub fn is_control_output(&self, control_index: usize) -> bool {
        self.control_is_output
            .get(control_index)
            .copied()
            .unwrap_or(false)
    }

    pub fn event_input(&self) -> Option<EventPort> {
        self.event_in
    }

    pub fn event_output(&self) -> Option<EventPort> {
        self.event_out
    }

    /// Starting control values: inputs at their defaults, outputs at zero.
    pub fn initial_controls(&self) -> Vec<f32> {
        self.controls
            .iter()
            .zip(&self.control_is_output)
            .map(|(&port, &output)| {
                if output {
                    0.0
                } else {
                    self.descriptors[port as usize].default
                }
            })
            .collect()
    }
}
