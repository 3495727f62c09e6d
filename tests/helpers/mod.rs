//! Test helpers and fixtures for jackwrap integration tests
//!
//! A simulated engine ([`TestCycle`]) stands in for JACK, [`GainPlugin`]
//! stands in for an LV2 binary and [`RecordingUi`] for its UI, so whole
//! cycles run deterministically without a server.
//!
//! ## Tolerance Levels
//!
//! Use the appropriate tolerance from [`tolerances`] module:
//! - `FLOAT_EPSILON` (1e-6): Exact operations (passthrough, unity gain)
//! - `TEMPO_EPSILON` (1e-4): Tempo after the float encoding

#![allow(dead_code)]

pub mod tolerances;

use jackwrap::core::channel::channel_pair;
use jackwrap::core::{
    AudioEndpoint, ControlEndpoint, CycleProcessor, CycleScope, PluginInstance, PluginUi,
    PortDescriptor, PortKind, PortMap, TransportPosition, UiPortEvent, UridMap, Urids, WakeSignal,
    WrapperConfig,
};
use std::ffi::c_void;
use std::sync::Arc;

/// Block size used by the deterministic cycle tests.
pub const TEST_BLOCK_SIZE: u32 = 128;

/// Plugin port indices of [`gain_ports`].
pub const PORT_IN: u32 = 0;
pub const PORT_GAIN: u32 = 1;
pub const PORT_OUT: u32 = 2;
pub const PORT_LEVEL: u32 = 3;
pub const PORT_EVENTS_IN: u32 = 4;
pub const PORT_EVENTS_OUT: u32 = 5;

/// Mono gain plugin with a level meter and an atom port pair.
pub fn gain_ports() -> Vec<PortDescriptor> {
    vec![
        PortDescriptor::new("in", PortKind::AudioIn),
        PortDescriptor::control_in("gain", 0.5),
        PortDescriptor::new("out", PortKind::AudioOut),
        PortDescriptor::new("level", PortKind::ControlOut),
        PortDescriptor::new("control", PortKind::AtomIn),
        PortDescriptor::new("notify", PortKind::AtomOut),
    ]
}

/// Stand-in for a loaded plugin binary.
///
/// Scales audio by the gain control, reports the gain on the level output
/// and echoes every inbound event to the event output.
#[derive(Default)]
pub struct GainPlugin {
    ports: [usize; 6],
    /// Gain seen by each `run`.
    pub gains: Vec<f32>,
    /// Event types seen by each `run`.
    pub events: Vec<Vec<u32>>,
    pub sequence_type: u32,
    pub active: bool,
}

// SAFETY: the stored pointers are owned by the processor that owns the plugin.
unsafe impl Send for GainPlugin {}

impl GainPlugin {
    pub fn new(sequence_type: u32) -> Self {
        Self {
            sequence_type,
            ..Default::default()
        }
    }

    fn port<T>(&self, index: u32) -> *mut T {
        self.ports[index as usize] as *mut T
    }

    unsafe fn read_u32(ptr: *const u8) -> u32 {
        unsafe { std::ptr::read_unaligned(ptr.cast::<u32>()) }
    }

    /// Copy the inbound sequence into the output, as far as it fits.
    unsafe fn echo_events(&mut self) -> Vec<u32> {
        let input = self.port::<u8>(PORT_EVENTS_IN);
        let output = self.port::<u8>(PORT_EVENTS_OUT);
        if input.is_null() || output.is_null() {
            return Vec::new();
        }
        let (in_size, capacity) = unsafe { (Self::read_u32(input), Self::read_u32(output)) };
        let src = unsafe { std::slice::from_raw_parts(input, 8 + in_size as usize) };
        let dst = unsafe { std::slice::from_raw_parts_mut(output, 8 + capacity as usize) };

        let mut types = Vec::new();
        let mut offset = 16;
        let mut written = 16;
        while offset + 16 <= src.len() {
            let size = u32::from_ne_bytes(src[offset + 8..offset + 12].try_into().unwrap());
            let event_type = u32::from_ne_bytes(src[offset + 12..offset + 16].try_into().unwrap());
            let record = (16 + size as usize + 7) & !7;
            if written + record > dst.len() {
                break;
            }
            dst[written..written + 16 + size as usize]
                .copy_from_slice(&src[offset..offset + 16 + size as usize]);
            types.push(event_type);
            written += record;
            offset += record;
        }
        dst[0..4].copy_from_slice(&((written - 8) as u32).to_ne_bytes());
        dst[4..8].copy_from_slice(&self.sequence_type.to_ne_bytes());
        dst[8..16].fill(0);
        types
    }
}

impl PluginInstance for GainPlugin {
    unsafe fn connect_port(&mut self, port: u32, data: *mut c_void) {
        self.ports[port as usize] = data as usize;
    }

    fn run(&mut self, nframes: u32) {
        // SAFETY: the processor binds every port before calling run.
        unsafe {
            let gain = *self.port::<f32>(PORT_GAIN);
            let input = std::slice::from_raw_parts(self.port::<f32>(PORT_IN), nframes as usize);
            let output =
                std::slice::from_raw_parts_mut(self.port::<f32>(PORT_OUT), nframes as usize);
            for (o, i) in output.iter_mut().zip(input) {
                *o = i * gain;
            }
            *self.port::<f32>(PORT_LEVEL) = gain;
            self.gains.push(gain);
            let types = self.echo_events();
            self.events.push(types);
        }
    }

    fn activate(&mut self) {
        self.active = true;
    }

    fn deactivate(&mut self) {
        self.active = false;
    }
}

/// Simulated engine cycle: one audio input, one audio output and an
/// explicit transport.
pub struct TestCycle {
    pub nframes: u32,
    pub transport: TransportPosition,
    pub input: Vec<f32>,
    pub output: Vec<f32>,
    pub midi_in: Vec<(u32, Vec<u8>)>,
    pub midi_out: Vec<(u32, Vec<u8>)>,
}

impl TestCycle {
    pub fn new(nframes: u32) -> Self {
        Self {
            nframes,
            transport: TransportPosition::default(),
            input: vec![1.0; nframes as usize],
            output: vec![0.0; nframes as usize],
            midi_in: Vec::new(),
            midi_out: Vec::new(),
        }
    }

    /// Move the transport the way a server does between cycles.
    pub fn advance(&mut self) {
        if self.transport.rolling {
            self.transport.frame += u64::from(self.nframes);
        }
    }
}

impl CycleScope for TestCycle {
    fn nframes(&self) -> u32 {
        self.nframes
    }

    fn transport(&self) -> TransportPosition {
        self.transport
    }

    fn audio_input(&mut self, _index: usize) -> *mut f32 {
        self.input.as_mut_ptr()
    }

    fn audio_output(&mut self, _index: usize) -> *mut f32 {
        self.output.as_mut_ptr()
    }

    fn for_each_midi_input(&mut self, mut f: impl FnMut(u32, &[u8])) {
        for (time, bytes) in &self.midi_in {
            f(*time, bytes);
        }
    }

    fn clear_midi_output(&mut self) {
        self.midi_out.clear();
    }

    fn write_midi_output(&mut self, time: u32, bytes: &[u8]) -> bool {
        self.midi_out.push((time, bytes.to_vec()));
        true
    }
}

/// UI that records everything it is sent.
#[derive(Default)]
pub struct RecordingUi {
    pub controls: Vec<(u32, f32)>,
    pub atoms: Vec<(u32, Vec<u8>)>,
    pub idles: usize,
    pub shown: bool,
    pub hidden: bool,
}

impl PluginUi for RecordingUi {
    fn port_event(&mut self, port: u32, event: UiPortEvent<'_>) {
        match event {
            UiPortEvent::Control(value) => self.controls.push((port, value)),
            UiPortEvent::Atom(atom) => self.atoms.push((port, atom.to_vec())),
        }
    }

    fn idle(&mut self) {
        self.idles += 1;
    }

    fn show(&mut self) {
        self.shown = true;
    }

    fn hide(&mut self) {
        self.hidden = true;
    }
}

/// A processor around [`GainPlugin`] plus the control thread's queue ends.
pub struct Rig {
    pub processor: CycleProcessor<GainPlugin>,
    pub control: ControlEndpoint,
    pub ports: PortMap,
    pub urids: Urids,
    pub wake: Arc<WakeSignal>,
}

pub fn gain_rig(config: WrapperConfig) -> Rig {
    let map = UridMap::new();
    let urids = Urids::map_all(&map);
    let ports = PortMap::classify(&gain_ports()).expect("valid port table");
    let wake = Arc::new(WakeSignal::new());
    let (audio, control): (AudioEndpoint, ControlEndpoint) =
        channel_pair(&config, ports.control_count());
    let processor = CycleProcessor::new(
        GainPlugin::new(urids.atom_sequence),
        ports.clone(),
        urids,
        &config,
        audio,
        Arc::clone(&wake),
    );
    Rig {
        processor,
        control,
        ports,
        urids,
        wake,
    }
}

/// Build a raw atom (header + body).
pub fn atom(atom_type: u32, body: &[u8]) -> Vec<u8> {
    let mut raw = Vec::with_capacity(8 + body.len());
    raw.extend_from_slice(&(body.len() as u32).to_ne_bytes());
    raw.extend_from_slice(&atom_type.to_ne_bytes());
    raw.extend_from_slice(body);
    raw
}
