//! Error types for the host

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStage {
    Manifest,
    Opening,
    Descriptor,
    Instantiation,
    PortSetup,
    Ui,
    Activation,
}

impl std::fmt::Display for LoadStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoadStage::Manifest => write!(f, "reading manifest"),
            LoadStage::Opening => write!(f, "opening library"),
            LoadStage::Descriptor => write!(f, "resolving descriptor"),
            LoadStage::Instantiation => write!(f, "creating instance"),
            LoadStage::PortSetup => write!(f, "registering ports"),
            LoadStage::Ui => write!(f, "creating UI"),
            LoadStage::Activation => write!(f, "activating"),
        }
    }
}

#[derive(Error, Debug)]
pub enum HostError {
    #[error("Plugin load failed at {stage} stage: {path}\n  Reason: {reason}")]
    LoadFailed {
        path: PathBuf,
        stage: LoadStage,
        reason: String,
    },

    #[error("Cannot register JACK port '{name}': {reason}")]
    PortRegistration { name: String, reason: String },

    #[error("JACK error: {0}")]
    Jack(#[from] jack::Error),

    #[error("Invalid plugin configuration: {0}")]
    Config(#[from] jackwrap_core::Error),

    #[error("Invalid C string: {0}")]
    Nul(#[from] std::ffi::NulError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Manifest parse error: {0}")]
    Json(#[from] serde_json::Error),
}

impl HostError {
    pub fn load(path: impl Into<PathBuf>, stage: LoadStage, reason: impl Into<String>) -> Self {
        HostError::LoadFailed {
            path: path.into(),
            stage,
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, HostError>;
