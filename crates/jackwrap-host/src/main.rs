//! `jackwrap`: run one LV2 plugin, and its external UI, as a JACK client.

use clap::Parser;
use jackwrap_core::{
    channel_pair, wait_for_exit, ControlLoop, CycleProcessor, PortMap, Shutdown, UridMap, Urids,
};
use jackwrap_host::{
    lock_memory, open_client, HostError, HostFeatures, JackNotifications, JackPorts, JackProcess,
    LoadStage, Lv2ExternalUi, Lv2Plugin, Manifest, Result, UiSetup,
};
use signal_hook::consts::{SIGHUP, SIGINT};
use signal_hook::iterator::{Handle, Signals};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread::JoinHandle;

#[derive(Parser)]
#[command(name = "jackwrap", version, about = "Run an LV2 plugin as a JACK client")]
struct Cli {
    /// Plugin manifest (JSON)
    manifest: PathBuf,

    /// JACK client name, defaults to the plugin name
    #[arg(long, short)]
    name: Option<String>,

    /// Do not send transport position events to the plugin
    #[arg(long)]
    no_time: bool,

    /// Fail instead of running headless when no UI can be created
    #[arg(long)]
    require_ui: bool,

    /// Never load the UI
    #[arg(long, conflicts_with = "require_ui")]
    headless: bool,
}

fn main() {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        tracing::error!("{e}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let manifest = Manifest::load(&cli.manifest)?;
    let mut config = manifest.config.clone();
    if cli.no_time {
        config.send_time_info = false;
    }
    let ports = PortMap::classify(&manifest.ports)?;
    let counts = ports.counts();
    tracing::info!(
        plugin = %manifest.name,
        audio_in = counts.audio_in,
        audio_out = counts.audio_out,
        controls = counts.control,
        "loaded manifest"
    );

    let client = open_client(cli.name.as_deref().unwrap_or(&manifest.name))?;
    let sample_rate = client.sample_rate() as f64;

    let urid_map = Arc::new(UridMap::new());
    let features = Arc::new(HostFeatures::new(Arc::clone(&urid_map))?);
    let plugin = Lv2Plugin::load(
        &manifest.dsp.library,
        manifest.dsp_uri(),
        &manifest.bundle_path,
        sample_rate,
        Arc::clone(&features),
    )?;
    let urids = Urids::map_all(&urid_map);
    let jack_ports = JackPorts::register(&client, &ports)?;

    let shutdown = Shutdown::default();
    let (audio, control) = channel_pair(&config, ports.control_count());
    let (inbox, writer) = control.into_ui_parts(&ports);

    let ui = match manifest.ui.as_ref().filter(|_| !cli.headless) {
        Some(binary) => {
            let setup = UiSetup {
                library: &binary.library,
                uri: binary.uri.as_deref(),
                index: binary.index,
                plugin_uri: plugin.uri(),
                bundle: &manifest.bundle_path,
                human_id: client.name(),
                plugin_handle: plugin.handle(),
                event_transfer: urids.atom_event_transfer,
            };
            match Lv2ExternalUi::load(setup, Arc::clone(&features), writer, shutdown.clone()) {
                Ok(ui) => Some(ui),
                Err(e) => {
                    tracing::warn!("{e}");
                    None
                }
            }
        }
        None => None,
    };
    if cli.require_ui && ui.is_none() {
        return Err(HostError::load(
            &cli.manifest,
            LoadStage::Ui,
            "no usable UI and --require-ui was given",
        ));
    }

    let mut processor = CycleProcessor::new(
        plugin,
        ports.clone(),
        urids,
        &config,
        audio,
        Arc::clone(shutdown.wake()),
    );
    if let Err(e) = lock_memory() {
        tracing::warn!(error = %e, "cannot lock memory, audio may glitch under memory pressure");
    }
    processor.activate();

    let active = client.activate_async(
        JackNotifications::new(shutdown.clone()),
        JackProcess::new(processor, jack_ports),
    )?;
    if !shutdown.state().start() {
        tracing::info!("exit requested during startup");
    }
    let signals = spawn_signal_thread(shutdown.clone())?;

    let mut control_loop = ui.map(|ui| ControlLoop::new(ui, inbox, &ports, &config, &shutdown));
    match control_loop.as_mut() {
        Some(control_loop) => control_loop.run(),
        None => {
            tracing::info!("running without UI, press Ctrl+C to stop");
            wait_for_exit(&shutdown, config.ui_refresh_interval());
        }
    }
    tracing::info!("shutting down");

    // Engine first, so nothing runs the plugin while it is torn down.
    shutdown.trigger();
    let deactivated = active.deactivate();
    stop_signal_thread(signals);
    let (_client, _notifications, process) = deactivated?;
    let mut processor = process.into_processor();
    processor.deactivate();
    drop(control_loop);
    drop(processor);
    Ok(())
}

fn spawn_signal_thread(shutdown: Shutdown) -> Result<(Handle, JoinHandle<()>)> {
    let mut signals = Signals::new([SIGINT, SIGHUP])?;
    let handle = signals.handle();
    let thread = std::thread::Builder::new()
        .name("jackwrap-signals".into())
        .spawn(move || {
            for signal in signals.forever() {
                tracing::info!(signal, "caught signal, exiting");
                shutdown.trigger();
            }
        })?;
    Ok((handle, thread))
}

fn stop_signal_thread((handle, thread): (Handle, JoinHandle<()>)) {
    handle.close();
    if thread.join().is_err() {
        tracing::warn!("signal thread panicked");
    }
}
