//! JACK client adapter.

use crate::error::{HostError, Result};
use jack::{
    AudioIn, AudioOut, Client, ClientOptions, ClientStatus, Control, MidiIn, MidiOut, MidiWriter,
    Port, ProcessScope, RawMidi, TransportState,
};
use jackwrap_core::{
    Bbt, CycleProcessor, CycleScope, PluginInstance, PortMap, Shutdown, TransportPosition,
};

/// Open a client, letting the server start if needed.
pub fn open_client(name: &str) -> Result<Client> {
    let (client, status) = Client::new(name, ClientOptions::empty())?;
    if status.contains(ClientStatus::SERVER_STARTED) {
        tracing::info!("JACK server started");
    }
    if status.contains(ClientStatus::NAME_NOT_UNIQUE) {
        tracing::info!(name = %client.name(), "unique name assigned");
    }
    tracing::debug!(
        sample_rate = client.sample_rate(),
        buffer_size = client.buffer_size(),
        "opened JACK client"
    );
    Ok(client)
}

/// Engine ports, one per plugin audio port plus MIDI for MIDI event ports.
pub struct JackPorts {
    audio_in: Vec<Port<AudioIn>>,
    audio_out: Vec<Port<AudioOut>>,
    midi_in: Option<Port<MidiIn>>,
    midi_out: Option<Port<MidiOut>>,
}

impl JackPorts {
    pub fn register(client: &Client, ports: &PortMap) -> Result<Self> {
        let name_of = |index: u32| {
            ports
                .descriptor(index)
                .map(|d| d.name.clone())
                .unwrap_or_else(|| format!("port_{index}"))
        };
        let failed = |name: String, e: jack::Error| {
            tracing::error!(%name, "cannot register port");
            HostError::PortRegistration {
                name,
                reason: e.to_string(),
            }
        };

        let mut audio_in = Vec::with_capacity(ports.audio_inputs().len());
        for &index in ports.audio_inputs() {
            let name = name_of(index);
            let port = client
                .register_port(&name, AudioIn::default())
                .map_err(|e| failed(name, e))?;
            audio_in.push(port);
        }
        let mut audio_out = Vec::with_capacity(ports.audio_outputs().len());
        for &index in ports.audio_outputs() {
            let name = name_of(index);
            let port = client
                .register_port(&name, AudioOut::default())
                .map_err(|e| failed(name, e))?;
            audio_out.push(port);
        }

        let midi_in = match ports.event_input() {
            Some(event) if event.midi => {
                let name = name_of(event.index);
                Some(
                    client
                        .register_port(&name, MidiIn::default())
                        .map_err(|e| failed(name, e))?,
                )
            }
            _ => None,
        };
        let midi_out = match ports.event_output() {
            Some(event) if event.midi => {
                let name = name_of(event.index);
                Some(
                    client
                        .register_port(&name, MidiOut::default())
                        .map_err(|e| failed(name, e))?,
                )
            }
            _ => None,
        };

        Ok(Self {
            audio_in,
            audio_out,
            midi_in,
            midi_out,
        })
    }

    fn cycle<'a>(&'a mut self, client: &'a Client, ps: &'a ProcessScope) -> JackCycle<'a> {
        let JackPorts {
            audio_in,
            audio_out,
            midi_in,
            midi_out,
        } = self;
        JackCycle {
            client,
            ps,
            audio_in,
            audio_out,
            midi_in: midi_in.as_ref(),
            midi_out: midi_out.as_mut(),
            writer: None,
        }
    }
}

/// One process callback's view of the engine.
pub struct JackCycle<'a> {
    client: &'a Client,
    ps: &'a ProcessScope,
    audio_in: &'a [Port<AudioIn>],
    audio_out: &'a mut [Port<AudioOut>],
    midi_in: Option<&'a Port<MidiIn>>,
    midi_out: Option<&'a mut Port<MidiOut>>,
    writer: Option<MidiWriter<'a>>,
}

impl CycleScope for JackCycle<'_> {
    fn nframes(&self) -> u32 {
        self.ps.n_frames()
    }

    fn transport(&self) -> TransportPosition {
        let Ok(state) = self.client.transport().query() else {
            return TransportPosition::default();
        };
        let bbt = state.pos.bbt().map(|bbt| Bbt {
            bar: bbt.bar as i32,
            beat: bbt.beat as i32,
            tick: bbt.tick as i32,
            ticks_per_beat: bbt.ticks_per_beat,
            beat_type: bbt.sig_denom,
            beats_per_bar: bbt.sig_num,
            beats_per_minute: bbt.bpm,
        });
        TransportPosition {
            frame: u64::from(state.pos.frame()),
            rolling: matches!(state.state, TransportState::Rolling),
            bbt,
        }
    }

    fn audio_input(&mut self, index: usize) -> *mut f32 {
        self.audio_in
            .get(index)
            .map_or(std::ptr::null_mut(), |port| {
                port.as_slice(self.ps).as_ptr().cast_mut()
            })
    }

    fn audio_output(&mut self, index: usize) -> *mut f32 {
        match self.audio_out.get_mut(index) {
            Some(port) => port.as_mut_slice(self.ps).as_mut_ptr(),
            None => std::ptr::null_mut(),
        }
    }

    fn for_each_midi_input(&mut self, mut f: impl FnMut(u32, &[u8])) {
        if let Some(port) = self.midi_in {
            for event in port.iter(self.ps) {
                f(event.time, event.bytes);
            }
        }
    }

    fn clear_midi_output(&mut self) {
        // a fresh writer starts from a cleared buffer
        if let Some(port) = self.midi_out.take() {
            self.writer = Some(port.writer(self.ps));
        }
    }

    fn write_midi_output(&mut self, time: u32, bytes: &[u8]) -> bool {
        match self.writer.as_mut() {
            Some(writer) => writer.write(&RawMidi { time, bytes }).is_ok(),
            None => false,
        }
    }
}

/// Process handler owning the plugin for as long as the client is active.
pub struct JackProcess<P: PluginInstance> {
    processor: CycleProcessor<P>,
    ports: JackPorts,
}

impl<P: PluginInstance> JackProcess<P> {
    pub fn new(processor: CycleProcessor<P>, ports: JackPorts) -> Self {
        Self { processor, ports }
    }

    pub fn into_processor(self) -> CycleProcessor<P> {
        self.processor
    }
}

impl<P: PluginInstance + 'static> jack::ProcessHandler for JackProcess<P> {
    fn process(&mut self, client: &Client, ps: &ProcessScope) -> Control {
        let mut cycle = self.ports.cycle(client, ps);
        self.processor.process(&mut cycle);
        Control::Continue
    }
}

/// Turns a server shutdown into a process exit.
pub struct JackNotifications {
    shutdown: Shutdown,
}

impl JackNotifications {
    pub fn new(shutdown: Shutdown) -> Self {
        Self { shutdown }
    }
}

impl jack::NotificationHandler for JackNotifications {
    unsafe fn shutdown(&mut self, status: ClientStatus, reason: &str) {
        tracing::warn!(?status, reason, "JACK server shut down");
        self.shutdown.trigger_nonblocking();
    }
}
