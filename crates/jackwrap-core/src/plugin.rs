//! Seams to the outside world: the plugin, its UI and the audio engine.

use crate::transport::TransportPosition;
use std::ffi::c_void;

/// A running plugin instance, driven from the audio thread.
pub trait PluginInstance: Send {
    /// Bind `port` to `data`.
    ///
    /// # Safety
    /// `data` must point to memory of the type and size the port expects and
    /// stay valid until the port is rebound or the instance is dropped.
    unsafe fn connect_port(&mut self, port: u32, data: *mut c_void);

    fn run(&mut self, nframes: u32);

    fn activate(&mut self) {}

    fn deactivate(&mut self) {}
}

/// Payload of one UI port update.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UiPortEvent<'a> {
    /// Plain float on a control port.
    Control(f32),
    /// A complete atom (header and body) on an event port.
    Atom(&'a [u8]),
}

/// The plugin's UI, driven from the control thread.
pub trait PluginUi {
    fn port_event(&mut self, port: u32, event: UiPortEvent<'_>);

    /// Let the UI pump its own event loop once.
    fn idle(&mut self);

    fn show(&mut self) {}

    fn hide(&mut self) {}
}

/// Engine side of one audio cycle.
///
/// Buffer pointers are valid only until the cycle ends.
pub trait CycleScope {
    fn nframes(&self) -> u32;

    fn transport(&self) -> TransportPosition;

    /// Buffer of the `index`-th registered audio input.
    fn audio_input(&mut self, index: usize) -> *mut f32;

    /// Buffer of the `index`-th registered audio output.
    fn audio_output(&mut self, index: usize) -> *mut f32;

    /// Visit every engine MIDI input event as `(frame offset, bytes)`.
    fn for_each_midi_input(&mut self, f: impl FnMut(u32, &[u8]));

    fn clear_midi_output(&mut self);

    /// `false` when the engine rejected the event.
    fn write_midi_output(&mut self, time: u32, bytes: &[u8]) -> bool;
}
