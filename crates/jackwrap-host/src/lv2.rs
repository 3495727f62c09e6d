//! LV2 plugin loading over the C ABI.

use crate::error::{HostError, LoadStage, Result};
use jackwrap_core::urid::uri_str;
use jackwrap_core::{PluginInstance, UridMap};
use lv2_raw::{
    LV2Descriptor, LV2Feature, LV2Handle, LV2Urid, LV2UridMap, LV2UridMapHandle, LV2_URID__MAP,
    LV2_URID__UNMAP,
};
use std::ffi::{c_char, c_void, CStr, CString};
use std::path::Path;
use std::sync::Arc;

type DescriptorFn = unsafe extern "C" fn(index: u32) -> *const LV2Descriptor;

/// `LV2_URID_Unmap`, which `lv2_raw` does not declare.
#[repr(C)]
pub(crate) struct LV2UridUnmap {
    pub handle: LV2UridMapHandle,
    pub unmap: extern "C" fn(handle: LV2UridMapHandle, urid: LV2Urid) -> *const c_char,
}

extern "C" fn urid_map(handle: LV2UridMapHandle, uri: *const c_char) -> LV2Urid {
    if handle.is_null() || uri.is_null() {
        return 0;
    }
    // SAFETY: handle is the `UridMap` owned by `HostFeatures`, uri is a C string.
    let map = unsafe { &*(handle as *const UridMap) };
    map.map_cstr(unsafe { CStr::from_ptr(uri) })
}

extern "C" fn urid_unmap(handle: LV2UridMapHandle, urid: LV2Urid) -> *const c_char {
    if handle.is_null() {
        return std::ptr::null();
    }
    // SAFETY: as in `urid_map`.
    let map = unsafe { &*(handle as *const UridMap) };
    map.unmap_ptr(urid).unwrap_or(std::ptr::null())
}

/// Feature pointing at `data`; `uri` must outlive every use of it.
pub(crate) fn feature(uri: &CStr, data: *mut c_void) -> LV2Feature {
    LV2Feature {
        uri: uri.as_ptr(),
        data,
    }
}

/// The `urid:map` and `urid:unmap` features, shared by plugin and UI.
pub struct HostFeatures {
    _map: Arc<UridMap>,
    map_uri: CString,
    unmap_uri: CString,
    map_data: Box<LV2UridMap>,
    unmap_data: Box<LV2UridUnmap>,
}

// SAFETY: the raw pointers only reference boxed data owned by this struct
// and the internally locked `UridMap`; nothing is mutated after construction.
unsafe impl Send for HostFeatures {}
unsafe impl Sync for HostFeatures {}

impl HostFeatures {
    pub fn new(map: Arc<UridMap>) -> Result<Self> {
        let handle = Arc::as_ptr(&map) as LV2UridMapHandle;
        Ok(Self {
            map_uri: CString::new(uri_str(LV2_URID__MAP))?,
            unmap_uri: CString::new(uri_str(LV2_URID__UNMAP))?,
            map_data: Box::new(LV2UridMap {
                handle,
                map: urid_map,
            }),
            unmap_data: Box::new(LV2UridUnmap {
                handle,
                unmap: urid_unmap,
            }),
            _map: map,
        })
    }

    /// Map/unmap followed by `extra`.
    pub fn with(&self, extra: impl IntoIterator<Item = LV2Feature>) -> Vec<LV2Feature> {
        let map_data = (&*self.map_data as *const LV2UridMap).cast_mut().cast();
        let unmap_data = (&*self.unmap_data as *const LV2UridUnmap).cast_mut().cast();
        let mut features = vec![
            feature(&self.map_uri, map_data),
            feature(&self.unmap_uri, unmap_data),
        ];
        features.extend(extra);
        features
    }
}

/// NULL-terminated pointer array over `features`, valid while they are.
pub(crate) fn feature_ptrs(features: &[LV2Feature]) -> Vec<*const LV2Feature> {
    features
        .iter()
        .map(|f| f as *const LV2Feature)
        .chain(std::iter::once(std::ptr::null()))
        .collect()
}

/// Whether a C struct left the function pointer at `slot` NULL.
///
/// Reads the slot as a plain pointer so no null function pointer is ever
/// materialized.
///
/// # Safety
/// `slot` must point at a readable, pointer-sized field.
pub(crate) unsafe fn fn_slot_is_null<T>(slot: *const T) -> bool {
    unsafe { slot.cast::<*const c_void>().read().is_null() }
}

/// An instantiated LV2 plugin.
pub struct Lv2Plugin {
    handle: LV2Handle,
    descriptor: *const LV2Descriptor,
    uri: CString,
    _features: Arc<HostFeatures>,
    // Dropped last: every pointer above lives inside the library.
    _library: libloading::Library,
}

// SAFETY: LV2 instances may move between threads; the audio-class functions
// are only ever called from the thread that currently owns the instance.
unsafe impl Send for Lv2Plugin {}

impl Lv2Plugin {
    pub fn load(
        library: &Path,
        uri: &str,
        bundle: &Path,
        sample_rate: f64,
        features: Arc<HostFeatures>,
    ) -> Result<Self> {
        let fail = |stage, reason: String| HostError::load(library, stage, reason);

        // SAFETY: loading a plugin runs its initializers; that is the point.
        let lib = unsafe { libloading::Library::new(library) }
            .map_err(|e| fail(LoadStage::Opening, format!("Failed to load library: {e}")))?;

        let entry: libloading::Symbol<DescriptorFn> = unsafe { lib.get(b"lv2_descriptor\0") }
            .map_err(|e| fail(LoadStage::Opening, format!("No lv2_descriptor symbol: {e}")))?;

        let descriptor = find_descriptor(*entry, uri)
            .ok_or_else(|| fail(LoadStage::Descriptor, format!("No descriptor for <{uri}>")))?;

        // SAFETY: non-null descriptor returned by the library.
        let incomplete = unsafe {
            fn_slot_is_null(std::ptr::addr_of!((*descriptor).instantiate))
                || fn_slot_is_null(std::ptr::addr_of!((*descriptor).connect_port))
                || fn_slot_is_null(std::ptr::addr_of!((*descriptor).run))
                || fn_slot_is_null(std::ptr::addr_of!((*descriptor).cleanup))
        };
        if incomplete {
            return Err(fail(
                LoadStage::Descriptor,
                "Descriptor lacks instantiate, connect_port, run or cleanup".to_string(),
            ));
        }
        let plugin_uri = CString::new(uri)
            .map_err(|e| fail(LoadStage::Descriptor, format!("Invalid plugin URI: {e}")))?;

        let bundle_c = bundle_path_cstring(bundle)
            .map_err(|reason| fail(LoadStage::Instantiation, reason))?;
        let feature_list = features.with([]);
        let feature_ptrs = feature_ptrs(&feature_list);

        // SAFETY: descriptor, bundle path and feature array are valid for the call.
        let handle = unsafe {
            ((*descriptor).instantiate)(
                descriptor,
                sample_rate,
                bundle_c.as_ptr(),
                feature_ptrs.as_ptr(),
            )
        };
        if handle.is_null() {
            return Err(fail(LoadStage::Instantiation, "instantiation failed".to_string()));
        }

        tracing::info!(uri, sample_rate, "instantiated plugin");

        Ok(Self {
            handle,
            descriptor,
            uri: plugin_uri,
            _features: features,
            _library: lib,
        })
    }

    /// Raw instance handle, for the UI's `instance-access` feature.
    pub fn handle(&self) -> LV2Handle {
        self.handle
    }

    pub fn uri(&self) -> &CStr {
        &self.uri
    }

    fn descriptor(&self) -> &LV2Descriptor {
        // SAFETY: the descriptor lives in the library, which is dropped last.
        unsafe { &*self.descriptor }
    }
}

fn find_descriptor(entry: DescriptorFn, uri: &str) -> Option<*const LV2Descriptor> {
    (0u32..)
        .map(|index| unsafe { entry(index) })
        .take_while(|desc| !desc.is_null())
        .find(|&desc| {
            // SAFETY: non-null descriptors carry a C string URI.
            let desc_uri = unsafe { (*desc).uri };
            !desc_uri.is_null() && unsafe { CStr::from_ptr(desc_uri) }.to_bytes() == uri.as_bytes()
        })
}

/// LV2 bundle paths end in a separator.
pub(crate) fn bundle_path_cstring(bundle: &Path) -> std::result::Result<CString, String> {
    let mut text = bundle.to_string_lossy().into_owned();
    if !text.ends_with(std::path::MAIN_SEPARATOR) {
        text.push(std::path::MAIN_SEPARATOR);
    }
    CString::new(text).map_err(|e| format!("Invalid bundle path: {e}"))
}

impl PluginInstance for Lv2Plugin {
    unsafe fn connect_port(&mut self, port: u32, data: *mut c_void) {
        unsafe { (self.descriptor().connect_port)(self.handle, port, data) }
    }

    fn run(&mut self, nframes: u32) {
        // SAFETY: every port was connected before the first cycle.
        unsafe { (self.descriptor().run)(self.handle, nframes) }
    }

    fn activate(&mut self) {
        if let Some(activate) = self.descriptor().activate {
            unsafe { activate(self.handle) }
        }
    }

    fn deactivate(&mut self) {
        if let Some(deactivate) = self.descriptor().deactivate {
            unsafe { deactivate(self.handle) }
        }
    }
}

impl Drop for Lv2Plugin {
    fn drop(&mut self) {
        unsafe { (self.descriptor().cleanup)(self.handle) }
        tracing::debug!(uri = ?self.uri, "plugin cleaned up");
    }
}
