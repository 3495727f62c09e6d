//! # jackwrap - LV2 plugins as JACK clients
//!
//! Runs one LV2 plugin, and optionally its external UI, as a standalone
//! JACK client.
//!
//! ## Architecture
//!
//! jackwrap is an umbrella crate over:
//! - **jackwrap-core** - Real-time cycle, port classification, atom
//!   sequences, UI queues, transport encoding, control loop
//! - **jackwrap-host** - JACK client, LV2 DSP and external UI loading,
//!   manifest parsing, the `jackwrap` binary
//!
//! ## Quick Start
//!
//! ```ignore
//! use jackwrap::prelude::*;
//!
//! let ports = PortMap::classify(&descriptors)?;
//! let config = WrapperConfig::default();
//! let (audio, control) = channel_pair(&config, ports.control_count());
//! let (inbox, writer) = control.into_ui_parts(&ports);
//!
//! let mut processor = CycleProcessor::new(plugin, ports.clone(), urids, &config, audio, wake);
//! processor.process(&mut scope);
//! ```
//!
//! ## Feature Flags
//!
//! - `default` - Core plus host
//! - `host` - JACK client and LV2 loading

/// Re-export of jackwrap-core for direct access
pub use jackwrap_core as core;

pub use jackwrap_core::{
    atom, channel_pair, transport, wait_for_exit, Bbt, ControlLoop, ControlUpdate, CycleProcessor,
    CycleScope, Error, Phase, PluginInstance, PluginUi, PortDescriptor, PortKind, PortMap, Result,
    RunState, Shutdown, TransportPosition, TransportSnapshot, UiInbox, UiPortEvent, UiWriter,
    UridMap, Urids, WakeSignal, WrapperConfig,
};

/// JACK and LV2 host layer
#[cfg(feature = "host")]
pub use jackwrap_host as host;

pub mod prelude {
    pub use crate::core::{
        channel_pair, ControlLoop, CycleProcessor, CycleScope, PluginInstance, PluginUi,
        PortDescriptor, PortKind, PortMap, Shutdown, TransportPosition, UiPortEvent, UridMap,
        Urids, WrapperConfig,
    };

    #[cfg(feature = "host")]
    pub use crate::host::{Lv2ExternalUi, Lv2Plugin, Manifest};
}
