//! Real-time core of jackwrap
//!
//! Everything needed to run an LV2-style plugin inside an audio engine's
//! process callback and keep its UI in sync, without the engine or plugin
//! binaries themselves. Those sit behind the [`PluginInstance`],
//! [`PluginUi`] and [`CycleScope`] traits and live in `jackwrap-host`.
//!
//! ## Threads
//!
//! - **Audio thread**: owns a [`CycleProcessor`] and calls
//!   [`CycleProcessor::process`] once per engine cycle.
//! - **Control thread**: owns a [`ControlLoop`] that forwards values and
//!   events to the UI; the UI writes back through a [`UiWriter`].
//!
//! The two only meet through the queues built by [`channel_pair`], the
//! [`WakeSignal`] and the [`RunState`].
//!
//! ```ignore
//! let ports = PortMap::classify(&descriptors)?;
//! let (audio, control) = channel_pair(&config, ports.control_count());
//! let (inbox, writer) = control.into_ui_parts(&ports);
//! let processor = CycleProcessor::new(plugin, ports.clone(), urids, &config, audio, wake);
//! ```

pub mod atom;
pub mod channel;
pub mod config;
pub mod error;
pub mod port;
pub mod transport;
pub mod urid;

mod control;
mod plugin;
mod processor;
mod state;
mod wake;

pub use channel::{
    channel_pair, AudioEndpoint, ControlEndpoint, ControlReceiver, ControlSender, ControlUpdate,
    EventReceiver, EventSender,
};
pub use config::WrapperConfig;
pub use control::{wait_for_exit, ControlLoop, UiInbox, UiWriter};
pub use error::{Error, Result};
pub use plugin::{CycleScope, PluginInstance, PluginUi, UiPortEvent};
pub use port::{EventPort, PortCounts, PortDescriptor, PortKind, PortMap, PortSlot};
pub use processor::CycleProcessor;
pub use state::{Phase, RunState, Shutdown};
pub use transport::{Bbt, TransportPosition, TransportSnapshot};
pub use urid::{UridMap, Urids};
pub use wake::WakeSignal;
