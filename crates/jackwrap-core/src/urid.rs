//! URI to integer mapping.
//!
//! Plugins intern every protocol URI they use through the host. Few distinct
//! URIs ever show up, so a linear scan over a growable list is all this needs.
//! Ids are handed out in first-seen order and never reused or removed, so
//! anything cached by the plugin stays valid for the life of the process.

use lv2_raw::{
    LV2Urid, LV2_ATOM__BLANK, LV2_ATOM__CHUNK, LV2_ATOM__EVENTTRANSFER, LV2_ATOM__FLOAT,
    LV2_ATOM__INT, LV2_ATOM__LONG, LV2_ATOM__SEQUENCE, LV2_MIDI__MIDIEVENT, LV2_TIME__BAR,
    LV2_TIME__BARBEAT, LV2_TIME__BEATSPERBAR, LV2_TIME__BEATSPERMINUTE, LV2_TIME__BEATUNIT,
    LV2_TIME__FRAME, LV2_TIME__POSITION, LV2_TIME__SPEED,
};
use parking_lot::Mutex;
use std::ffi::{CStr, CString};

/// Text of an `lv2_raw` URI constant, without the C terminator some of them
/// carry.
pub fn uri_str(raw: &'static (impl AsRef<[u8]> + ?Sized)) -> &'static str {
    let bytes = raw.as_ref();
    let bytes = bytes.strip_suffix(b"\0").unwrap_or(bytes);
    std::str::from_utf8(bytes).unwrap_or_default()
}

/// Process-wide URI map.
///
/// The lock is only contended while the plugin or UI is being set up; the
/// audio thread works from the pre-resolved [`Urids`] and never calls in here.
#[derive(Debug, Default)]
pub struct UridMap {
    uris: Mutex<Vec<CString>>,
}

impl UridMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Id for `uri`, assigning the next one on first sight.
    ///
    /// `None` for a URI with an interior NUL, which no C caller could ever
    /// look up again.
    pub fn map(&self, uri: &str) -> Option<LV2Urid> {
        let uri = CString::new(uri).ok()?;
        Some(self.map_cstr(&uri))
    }

    /// Map a NUL-terminated URI as handed over by C code.
    pub fn map_cstr(&self, uri: &CStr) -> LV2Urid {
        let mut uris = self.uris.lock();
        if let Some(id) = uris.iter().position(|known| known.as_c_str() == uri) {
            return id as u32;
        }
        uris.push(uri.to_owned());
        (uris.len() - 1) as u32
    }

    pub fn unmap(&self, id: LV2Urid) -> Option<String> {
        self.uris
            .lock()
            .get(id as usize)
            .map(|uri| uri.to_string_lossy().into_owned())
    }

    /// Pointer to the stored C string for `id`.
    ///
    /// The pointer stays valid for the lifetime of the map: entries are never
    /// removed and a `CString` keeps its heap allocation when the list grows.
    pub fn unmap_ptr(&self, id: LV2Urid) -> Option<*const std::os::raw::c_char> {
        self.uris.lock().get(id as usize).map(|uri| uri.as_ptr())
    }

    pub fn len(&self) -> usize {
        self.uris.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.uris.lock().is_empty()
    }
}

/// URIDs the processor and control loop need, resolved once at startup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Urids {
    pub atom_sequence: u32,
    pub atom_event_transfer: u32,
    pub midi_event: u32,
    pub time_position: u32,
    pub time_frame: u32,
    pub time_speed: u32,
    pub time_bar: u32,
    pub time_bar_beat: u32,
    pub time_beat_unit: u32,
    pub time_beats_per_bar: u32,
    pub time_beats_per_minute: u32,
    pub atom_blank: u32,
    pub atom_long: u32,
    pub atom_int: u32,
    pub atom_float: u32,
    pub atom_chunk: u32,
}

impl Urids {
    /// Resolve all well-known URIs through `map`, in a fixed order.
    pub fn map_all(map: &UridMap) -> Self {
        let known = |uri: &str| map.map(uri).unwrap_or_default();
        Self {
            atom_sequence: known(uri_str(LV2_ATOM__SEQUENCE)),
            atom_event_transfer: known(uri_str(LV2_ATOM__EVENTTRANSFER)),
            midi_event: known(uri_str(LV2_MIDI__MIDIEVENT)),
            time_position: known(uri_str(LV2_TIME__POSITION)),
            time_frame: known(uri_str(LV2_TIME__FRAME)),
            time_speed: known(uri_str(LV2_TIME__SPEED)),
            time_bar: known(uri_str(LV2_TIME__BAR)),
            time_bar_beat: known(uri_str(LV2_TIME__BARBEAT)),
            time_beat_unit: known(uri_str(LV2_TIME__BEATUNIT)),
            time_beats_per_bar: known(uri_str(LV2_TIME__BEATSPERBAR)),
            time_beats_per_minute: known(uri_str(LV2_TIME__BEATSPERMINUTE)),
            atom_blank: known(uri_str(LV2_ATOM__BLANK)),
            atom_long: known(uri_str(LV2_ATOM__LONG)),
            atom_int: known(uri_str(LV2_ATOM__INT)),
            atom_float: known(uri_str(LV2_ATOM__FLOAT)),
            atom_chunk: known(uri_str(LV2_ATOM__CHUNK)),
        }
    }
}
