//! Integration test modules for jackwrap
//!
//! - cycle: one processor cycle end to end
//! - transport: transport change detection and position encoding
//! - queues: UI/DSP channel capacity and ordering
//! - control_loop: control thread against a live processor

pub mod control_loop;
pub mod cycle;
pub mod queues;
pub mod transport;
