//! LV2 external UI (`lv2_external_ui`) loading.

use crate::error::{HostError, LoadStage, Result};
use crate::lv2::{bundle_path_cstring, feature, feature_ptrs, HostFeatures};
use jackwrap_core::{PluginUi, Shutdown, UiPortEvent, UiWriter};
use lv2_raw::{LV2Feature, LV2Handle};
use parking_lot::Mutex;
use std::ffi::{c_char, c_void, CStr, CString};
use std::path::Path;
use std::sync::Arc;

// The UI and external-UI extensions are not covered by `lv2_raw`.
const EXTERNAL_UI_URI: &CStr = c"http://lv2plug.in/ns/extensions/ui#external";
const EXTERNAL_UI_KX_URI: &CStr = c"http://kxstudio.sf.net/ns/lv2ext/external-ui#Host";
const INSTANCE_ACCESS_URI: &CStr = c"http://lv2plug.in/ns/ext/instance-access";

type WriteFunction = unsafe extern "C" fn(
    controller: *mut c_void,
    port_index: u32,
    buffer_size: u32,
    port_protocol: u32,
    buffer: *const c_void,
);

#[repr(C)]
struct Lv2UiDescriptor {
    uri: *const c_char,
    instantiate: Option<
        unsafe extern "C" fn(
            descriptor: *const Lv2UiDescriptor,
            plugin_uri: *const c_char,
            bundle_path: *const c_char,
            write_function: WriteFunction,
            controller: *mut c_void,
            widget: *mut *mut c_void,
            features: *const *const LV2Feature,
        ) -> *mut c_void,
    >,
    cleanup: Option<unsafe extern "C" fn(*mut c_void)>,
    port_event: Option<unsafe extern "C" fn(*mut c_void, u32, u32, u32, *const c_void)>,
    extension_data: Option<unsafe extern "C" fn(*const c_char) -> *const c_void>,
}

type UiDescriptorFn = unsafe extern "C" fn(index: u32) -> *const Lv2UiDescriptor;

type WidgetFn = unsafe extern "C" fn(*mut ExternalUiWidget);

#[repr(C)]
struct ExternalUiWidget {
    run: Option<WidgetFn>,
    show: Option<WidgetFn>,
    hide: Option<WidgetFn>,
}

#[repr(C)]
struct ExternalUiHost {
    ui_closed: unsafe extern "C" fn(controller: *mut c_void),
    plugin_human_id: *const c_char,
}

/// What the UI's callbacks reach through the controller pointer.
struct UiController {
    writer: Mutex<UiWriter>,
    shutdown: Shutdown,
}

unsafe extern "C" fn write_function(
    controller: *mut c_void,
    port_index: u32,
    buffer_size: u32,
    port_protocol: u32,
    buffer: *const c_void,
) {
    if controller.is_null() || buffer.is_null() || buffer_size == 0 {
        return;
    }
    // SAFETY: controller is the boxed `UiController` owned by `Lv2ExternalUi`,
    // and the UI guarantees `buffer_size` readable bytes at `buffer`.
    let controller = unsafe { &*(controller as *const UiController) };
    let bytes = unsafe { std::slice::from_raw_parts(buffer.cast::<u8>(), buffer_size as usize) };
    controller.writer.lock().write(port_index, port_protocol, bytes);
}

unsafe extern "C" fn ui_closed(controller: *mut c_void) {
    if controller.is_null() {
        return;
    }
    // SAFETY: as in `write_function`.
    let controller = unsafe { &*(controller as *const UiController) };
    tracing::info!("UI closed");
    // Called from inside the UI's run callback while the control loop holds
    // the wake lock.
    controller.shutdown.trigger_nonblocking();
}

/// Parameters for [`Lv2ExternalUi::load`].
pub struct UiSetup<'a> {
    pub library: &'a Path,
    /// UI descriptor URI; otherwise `index` picks the descriptor.
    pub uri: Option<&'a str>,
    pub index: u32,
    pub plugin_uri: &'a CStr,
    pub bundle: &'a Path,
    pub human_id: &'a str,
    pub plugin_handle: LV2Handle,
    pub event_transfer: u32,
}

/// A running external UI.
pub struct Lv2ExternalUi {
    handle: *mut c_void,
    widget: *mut ExternalUiWidget,
    descriptor: *const Lv2UiDescriptor,
    event_transfer: u32,
    _controller: Box<UiController>,
    _host: Box<ExternalUiHost>,
    _human_id: CString,
    _features: Arc<HostFeatures>,
    _library: libloading::Library,
}

impl Lv2ExternalUi {
    pub fn load(
        setup: UiSetup<'_>,
        features: Arc<HostFeatures>,
        writer: UiWriter,
        shutdown: Shutdown,
    ) -> Result<Self> {
        let fail = |reason: String| HostError::load(setup.library, LoadStage::Ui, reason);

        // SAFETY: loading the UI library runs its initializers.
        let lib = unsafe { libloading::Library::new(setup.library) }
            .map_err(|e| fail(format!("Failed to load library: {e}")))?;
        let entry: libloading::Symbol<UiDescriptorFn> = unsafe { lib.get(b"lv2ui_descriptor\0") }
            .map_err(|e| fail(format!("No lv2ui_descriptor symbol: {e}")))?;

        let descriptor = find_ui_descriptor(*entry, setup.uri, setup.index)
            .ok_or_else(|| fail("No matching UI descriptor".to_string()))?;
        // SAFETY: non-null descriptor returned by the library.
        let Some(instantiate) = (unsafe { (*descriptor).instantiate }) else {
            return Err(fail("UI descriptor lacks instantiate".to_string()));
        };

        let human_id =
            CString::new(setup.human_id).map_err(|e| fail(format!("Invalid client name: {e}")))?;
        let mut controller = Box::new(UiController {
            writer: Mutex::new(writer),
            shutdown,
        });
        let mut host = Box::new(ExternalUiHost {
            ui_closed,
            plugin_human_id: human_id.as_ptr(),
        });
        let host_ptr: *mut c_void = (&mut *host as *mut ExternalUiHost).cast();
        let feature_list = features.with([
            feature(INSTANCE_ACCESS_URI, setup.plugin_handle),
            feature(EXTERNAL_UI_URI, host_ptr),
            feature(EXTERNAL_UI_KX_URI, host_ptr),
        ]);
        let feature_ptrs = feature_ptrs(&feature_list);
        let bundle = bundle_path_cstring(setup.bundle).map_err(fail)?;

        let mut widget: *mut c_void = std::ptr::null_mut();
        // SAFETY: every pointer handed over outlives the UI instance.
        let handle = unsafe {
            instantiate(
                descriptor,
                setup.plugin_uri.as_ptr(),
                bundle.as_ptr(),
                write_function,
                (&mut *controller as *mut UiController).cast(),
                &mut widget,
                feature_ptrs.as_ptr(),
            )
        };
        if handle.is_null() {
            return Err(fail("UI instantiation failed".to_string()));
        }
        if widget.is_null() {
            if let Some(cleanup) = unsafe { (*descriptor).cleanup } {
                unsafe { cleanup(handle) };
            }
            return Err(fail("UI is not an external UI".to_string()));
        }

        tracing::info!(library = %setup.library.display(), "created external UI");

        Ok(Self {
            handle,
            widget: widget.cast(),
            descriptor,
            event_transfer: setup.event_transfer,
            _controller: controller,
            _host: host,
            _human_id: human_id,
            _features: features,
            _library: lib,
        })
    }

    fn widget_call(&mut self, pick: fn(&ExternalUiWidget) -> Option<WidgetFn>) {
        // SAFETY: widget is non-null and owned by the UI until cleanup.
        if let Some(f) = pick(unsafe { &*self.widget }) {
            unsafe { f(self.widget) }
        }
    }
}

fn find_ui_descriptor(
    entry: UiDescriptorFn,
    uri: Option<&str>,
    index: u32,
) -> Option<*const Lv2UiDescriptor> {
    let Some(uri) = uri else {
        let desc = unsafe { entry(index) };
        return (!desc.is_null()).then_some(desc);
    };
    (0u32..)
        .map(|i| unsafe { entry(i) })
        .take_while(|desc| !desc.is_null())
        .find(|&desc| {
            let desc_uri = unsafe { (*desc).uri };
            !desc_uri.is_null() && unsafe { CStr::from_ptr(desc_uri) }.to_bytes() == uri.as_bytes()
        })
}

impl PluginUi for Lv2ExternalUi {
    fn port_event(&mut self, port: u32, event: UiPortEvent<'_>) {
        // SAFETY: descriptor lives in the library, dropped last.
        let Some(port_event) = (unsafe { (*self.descriptor).port_event }) else {
            return;
        };
        match event {
            UiPortEvent::Control(value) => unsafe {
                port_event(
                    self.handle,
                    port,
                    std::mem::size_of::<f32>() as u32,
                    0,
                    (&value as *const f32).cast(),
                )
            },
            UiPortEvent::Atom(atom) => unsafe {
                port_event(
                    self.handle,
                    port,
                    atom.len() as u32,
                    self.event_transfer,
                    atom.as_ptr().cast(),
                )
            },
        }
    }

    fn idle(&mut self) {
        self.widget_call(|w| w.run);
    }

    fn show(&mut self) {
        self.widget_call(|w| w.show);
    }

    fn hide(&mut self) {
        self.widget_call(|w| w.hide);
    }
}

impl Drop for Lv2ExternalUi {
    fn drop(&mut self) {
        if let Some(cleanup) = unsafe { (*self.descriptor).cleanup } {
            unsafe { cleanup(self.handle) }
        }
        tracing::debug!("UI cleaned up");
    }
}
