//! Plugin manifest: which binaries to load and the plugin's port table.
//!
//! ```json
//! {
//!   "uri": "http://example.org/amp",
//!   "name": "Simple Amp",
//!   "dsp": { "library": "amp.so" },
//!   "ui": { "library": "amp_ui.so", "uri": "http://example.org/amp#ui" },
//!   "ports": [
//!     { "name": "gain", "kind": "control_in", "default": 0.5 },
//!     { "name": "in", "kind": "audio_in" },
//!     { "name": "out", "kind": "audio_out" }
//!   ],
//!   "config": { "atom_capacity": 16384 }
//! }
//! ```
//!
//! Relative library paths are resolved against the manifest's directory,
//! which is also the bundle path handed to the plugin.

use crate::error::{HostError, LoadStage, Result};
use jackwrap_core::{PortDescriptor, WrapperConfig};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// A loadable binary and the descriptor to pick from it.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Binary {
    pub library: PathBuf,
    /// Descriptor URI; the plugin URI is used for the DSP when absent.
    #[serde(default)]
    pub uri: Option<String>,
    /// Descriptor index, used when no URI is given.
    #[serde(default)]
    pub index: u32,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Manifest {
    pub uri: String,
    /// Human readable name; default JACK client name.
    pub name: String,
    pub dsp: Binary,
    #[serde(default)]
    pub ui: Option<Binary>,
    pub ports: Vec<PortDescriptor>,
    #[serde(default)]
    pub config: WrapperConfig,
    #[serde(skip)]
    pub bundle_path: PathBuf,
}

impl Manifest {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| HostError::load(path, LoadStage::Manifest, e.to_string()))?;
        let bundle = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        Self::parse(&text, &bundle)
            .map_err(|e| HostError::load(path, LoadStage::Manifest, e.to_string()))
    }

    /// Parse manifest text, resolving relative paths against `bundle`.
    pub fn parse(text: &str, bundle: &Path) -> Result<Self> {
        let mut manifest: Manifest = serde_json::from_str(text)?;
        manifest.bundle_path = bundle.to_path_buf();
        manifest.dsp.library = resolve(bundle, &manifest.dsp.library);
        if let Some(ui) = manifest.ui.as_mut() {
            ui.library = resolve(bundle, &ui.library);
        }
        manifest.config.validate()?;
        Ok(manifest)
    }

    /// URI the DSP descriptor is looked up by.
    pub fn dsp_uri(&self) -> &str {
        self.dsp.uri.as_deref().unwrap_or(&self.uri)
    }
}

fn resolve(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}
