//! GL access for the adapter, loaded with `glow` through the host's resolver.

use std::{
    ffi::{CStr, CString, c_void},
    ptr,
    sync::Arc,
};

/// Symbols glow queries while it loads. Without them loading would panic.
const BOOTSTRAP: [&CStr; 2] = [c"glGetString", c"glGetIntegerv"];

/// Builds a `glow` context over `resolve`. Must run while the host context is
/// current, which holds for the duration of a context reset notification.
pub fn load(resolve: impl Fn(&CStr) -> *const c_void) -> Option<Arc<glow::Context>> {
    let missing: Vec<&CStr> = BOOTSTRAP
        .into_iter()
        .filter(|name| resolve(name).is_null())
        .collect();
    if !missing.is_empty() {
        tracing::warn!(?missing, "host cannot resolve GL; adapter-side GL disabled");
        return None;
    }

    let context = unsafe {
        glow::Context::from_loader_function(|name| {
            CString::new(name).map_or(ptr::null(), |name| resolve(&name))
        })
    };
    Some(Arc::new(context))
}

/// Stand-in GL entry points for tests that have no real context.
#[cfg(test)]
pub(crate) mod fake {
    use std::{
        ffi::{CStr, c_void},
        ptr,
    };

    pub const VIEWPORT: (i32, i32) = (1280, 960);

    const GL_VERSION: u32 = 0x1F02;
    const GL_VIEWPORT: u32 = 0x0BA2;

    unsafe extern "system" fn get_string(name: u32) -> *const u8 {
        let value: &CStr = if name == GL_VERSION {
            c"3.3.0 Lodestar"
        } else {
            c""
        };
        value.as_ptr().cast()
    }

    unsafe extern "system" fn get_integerv(name: u32, data: *mut i32) {
        unsafe {
            if name == GL_VIEWPORT {
                *data = 0;
                *data.add(1) = 0;
                *data.add(2) = VIEWPORT.0;
                *data.add(3) = VIEWPORT.1;
            } else {
                *data = 0;
            }
        }
    }

    pub fn resolve(name: &CStr) -> *const c_void {
        if name == c"glGetString" {
            get_string as *const c_void
        } else if name == c"glGetIntegerv" {
            get_integerv as *const c_void
        } else {
            ptr::null()
        }
    }
}
