use std::{
    ffi::{CStr, c_int, c_ulong, c_void},
    ptr,
    sync::Arc,
};

use once_cell::sync::OnceCell;

use super::{ContextBackend, GlContext, Surface};
use crate::{
    error::ContextError,
    gate::{GraphicsCapabilities, NativeContextCapture, NativeHandles},
};

type MakeCurrentFn = unsafe extern "C" fn(*mut c_void, c_ulong, *mut c_void) -> c_int;
type CurrentHandleFn = unsafe extern "C" fn() -> *mut c_void;
type CurrentDrawableFn = unsafe extern "C" fn() -> c_ulong;

/// GLX calls loaded from the system libGL the host already has mapped.
struct GlxLibrary {
    make_current: MakeCurrentFn,
    current_display: CurrentHandleFn,
    current_context: CurrentHandleFn,
    current_drawable: CurrentDrawableFn,
}

impl GlxLibrary {
    fn get() -> Option<&'static Self> {
        static LIBRARY: OnceCell<Option<GlxLibrary>> = OnceCell::new();
        LIBRARY.get_or_init(|| unsafe { Self::load() }).as_ref()
    }

    unsafe fn load() -> Option<Self> {
        let handle = [c"libGL.so.1", c"libGL.so"].iter().find_map(|name| {
            let handle = unsafe { libc::dlopen(name.as_ptr(), libc::RTLD_NOW | libc::RTLD_GLOBAL) };
            (!handle.is_null()).then_some(handle)
        });
        let Some(handle) = handle else {
            tracing::warn!("libGL is not available; GLX contexts are disabled");
            return None;
        };

        let symbol = |name: &CStr| {
            let address = unsafe { libc::dlsym(handle, name.as_ptr()) };
            (!address.is_null()).then_some(address)
        };
        // SAFETY: prototypes follow the GLX 1.3 headers.
        unsafe {
            Some(Self {
                make_current: std::mem::transmute::<*mut c_void, MakeCurrentFn>(symbol(
                    c"glXMakeCurrent",
                )?),
                current_display: std::mem::transmute::<*mut c_void, CurrentHandleFn>(symbol(
                    c"glXGetCurrentDisplay",
                )?),
                current_context: std::mem::transmute::<*mut c_void, CurrentHandleFn>(symbol(
                    c"glXGetCurrentContext",
                )?),
                current_drawable: std::mem::transmute::<*mut c_void, CurrentDrawableFn>(symbol(
                    c"glXGetCurrentDrawable",
                )?),
            })
        }
    }
}

pub(super) struct GlxBackend;

impl ContextBackend for GlxBackend {
    fn name(&self) -> &'static str {
        "glx"
    }

    fn create(
        &self,
        capabilities: Arc<GraphicsCapabilities>,
    ) -> Result<Box<dyn GlContext>, ContextError> {
        let native = capabilities.native();
        if native.display == 0 {
            return Err(ContextError::MissingNativeHandle("display"));
        }
        if native.context == 0 {
            return Err(ContextError::MissingNativeHandle("context"));
        }
        Ok(Box::new(GlxContext {
            surface: Surface::new(capabilities),
            display: native.display,
            context: native.context,
            drawable: native.drawable,
        }))
    }
}

/// The host's own GLX context. Never destroyed here.
struct GlxContext {
    surface: Surface,
    display: usize,
    context: usize,
    drawable: usize,
}

impl GlContext for GlxContext {
    fn surface(&self) -> &Surface {
        &self.surface
    }

    fn surface_mut(&mut self) -> &mut Surface {
        &mut self.surface
    }

    fn make_current(&mut self) -> bool {
        let Some(glx) = GlxLibrary::get() else {
            return false;
        };
        unsafe {
            (glx.make_current)(
                self.display as *mut c_void,
                self.drawable as c_ulong,
                self.context as *mut c_void,
            ) != 0
        }
    }

    fn clear_current(&mut self) -> bool {
        let Some(glx) = GlxLibrary::get() else {
            return false;
        };
        unsafe { (glx.make_current)(self.display as *mut c_void, 0, ptr::null_mut()) != 0 }
    }

    fn create_shared(&self) -> Result<Box<dyn GlContext>, ContextError> {
        Err(ContextError::Unsupported)
    }
}

pub(super) struct GlxCapture;

impl NativeContextCapture for GlxCapture {
    fn capture(&self) -> NativeHandles {
        let Some(glx) = GlxLibrary::get() else {
            return NativeHandles::default();
        };
        unsafe {
            NativeHandles {
                display: (glx.current_display)() as usize,
                context: (glx.current_context)() as usize,
                drawable: (glx.current_drawable)() as usize,
            }
        }
    }
}
