use std::{
    ffi::{CStr, c_void},
    ptr,
    sync::Arc,
};

use windows_sys::Win32::Graphics::{
    Gdi::HDC,
    OpenGL::{
        HGLRC, wglCreateContext, wglDeleteContext, wglGetCurrentContext, wglGetCurrentDC,
        wglGetProcAddress, wglMakeCurrent, wglShareLists,
    },
};

use super::{ContextBackend, GlContext, OffscreenContext, PbufferApi};
use crate::{
    error::ContextError,
    gate::{GraphicsCapabilities, NativeContextCapture, NativeHandles},
};

const WGL_DRAW_TO_PBUFFER_ARB: i32 = 0x202D;
const WGL_DEPTH_BITS_ARB: i32 = 0x2022;
const WGL_STENCIL_BITS_ARB: i32 = 0x2023;
const WGL_RED_BITS_ARB: i32 = 0x2015;
const WGL_GREEN_BITS_ARB: i32 = 0x2017;
const WGL_BLUE_BITS_ARB: i32 = 0x2019;
const WGL_CONTEXT_MAJOR_VERSION_ARB: i32 = 0x2091;
const WGL_CONTEXT_MINOR_VERSION_ARB: i32 = 0x2092;
const WGL_CONTEXT_FLAGS_ARB: i32 = 0x2094;
const WGL_CONTEXT_PROFILE_MASK_ARB: i32 = 0x9126;
const WGL_CONTEXT_CORE_PROFILE_BIT_ARB: i32 = 0x0001;
const WGL_CONTEXT_FORWARD_COMPATIBLE_BIT_ARB: i32 = 0x0002;
const WGL_CONTEXT_DEBUG_BIT_ARB: i32 = 0x0001;

type Pbuffer = *mut c_void;
type ChoosePixelFormatArb =
    unsafe extern "system" fn(HDC, *const i32, *const f32, u32, *mut i32, *mut u32) -> i32;
type CreatePbufferArb = unsafe extern "system" fn(HDC, i32, i32, i32, *const i32) -> Pbuffer;
type GetPbufferDcArb = unsafe extern "system" fn(Pbuffer) -> HDC;
type ReleasePbufferDcArb = unsafe extern "system" fn(Pbuffer, HDC) -> i32;
type DestroyPbufferArb = unsafe extern "system" fn(Pbuffer) -> i32;
type CreateContextAttribsArb = unsafe extern "system" fn(HDC, HGLRC, *const i32) -> HGLRC;

/// Resolves `name` and reinterprets it as the function pointer type `F`.
///
/// # Safety
///
/// `F` must be a function pointer type matching the symbol's real prototype.
unsafe fn load<F: Copy>(resolve: &impl Fn(&CStr) -> *const c_void, name: &CStr) -> Option<F> {
    debug_assert_eq!(size_of::<F>(), size_of::<*const c_void>());
    let address = resolve(name);
    if address.is_null() {
        None
    } else {
        Some(unsafe { std::mem::transmute_copy::<*const c_void, F>(&address) })
    }
}

/// WGL pbuffer and context extensions, resolved through the host first and
/// through `wglGetProcAddress` for anything the host does not know.
struct WglApi {
    create_context_attribs: Option<CreateContextAttribsArb>,
    choose_pixel_format: Option<ChoosePixelFormatArb>,
    create_pbuffer: Option<CreatePbufferArb>,
    get_pbuffer_dc: Option<GetPbufferDcArb>,
    release_pbuffer_dc: Option<ReleasePbufferDcArb>,
    destroy_pbuffer: Option<DestroyPbufferArb>,
}

impl WglApi {
    fn resolve(capabilities: &GraphicsCapabilities) -> Self {
        let resolve = |name: &CStr| {
            let address = capabilities.proc_address(name);
            if !address.is_null() {
                return address;
            }
            match unsafe { wglGetProcAddress(name.as_ptr().cast()) } {
                Some(f) => f as *const c_void,
                None => ptr::null(),
            }
        };
        // SAFETY: prototypes follow WGL_ARB_create_context, WGL_ARB_pixel_format
        // and WGL_ARB_pbuffer.
        unsafe {
            Self {
                create_context_attribs: load(&resolve, c"wglCreateContextAttribsARB"),
                choose_pixel_format: load(&resolve, c"wglChoosePixelFormatARB"),
                create_pbuffer: load(&resolve, c"wglCreatePbufferARB"),
                get_pbuffer_dc: load(&resolve, c"wglGetPbufferDCARB"),
                release_pbuffer_dc: load(&resolve, c"wglReleasePbufferDCARB"),
                destroy_pbuffer: load(&resolve, c"wglDestroyPbufferARB"),
            }
        }
    }
}

impl PbufferApi for WglApi {
    fn missing_entry_point(&self) -> Option<&'static str> {
        if self.choose_pixel_format.is_none() {
            Some("wglChoosePixelFormatARB")
        } else if self.create_pbuffer.is_none() {
            Some("wglCreatePbufferARB")
        } else if self.get_pbuffer_dc.is_none() {
            Some("wglGetPbufferDCARB")
        } else if self.release_pbuffer_dc.is_none() {
            Some("wglReleasePbufferDCARB")
        } else if self.destroy_pbuffer.is_none() {
            Some("wglDestroyPbufferARB")
        } else {
            None
        }
    }

    fn choose_pixel_format(&self, dc: usize) -> Option<i32> {
        let choose = self.choose_pixel_format?;
        let attribs = [
            WGL_DRAW_TO_PBUFFER_ARB,
            1,
            WGL_RED_BITS_ARB,
            0,
            WGL_GREEN_BITS_ARB,
            0,
            WGL_BLUE_BITS_ARB,
            0,
            WGL_DEPTH_BITS_ARB,
            0,
            WGL_STENCIL_BITS_ARB,
            0,
            0,
            0,
        ];
        let float_attribs = [0.0f32; 2];
        let mut format = 0;
        let mut count = 0;
        let ok = unsafe {
            choose(
                dc as HDC,
                attribs.as_ptr(),
                float_attribs.as_ptr(),
                1,
                &mut format,
                &mut count,
            )
        };
        (ok != 0 && count > 0).then_some(format)
    }

    fn create_pbuffer(&self, dc: usize, pixel_format: i32, width: i32, height: i32) -> Option<usize> {
        let create = self.create_pbuffer?;
        let attribs = [0i32; 2];
        let pbuffer = unsafe { create(dc as HDC, pixel_format, width, height, attribs.as_ptr()) };
        (!pbuffer.is_null()).then_some(pbuffer as usize)
    }

    fn pbuffer_dc(&self, pbuffer: usize) -> Option<usize> {
        let get = self.get_pbuffer_dc?;
        let dc = unsafe { get(pbuffer as Pbuffer) };
        (!dc.is_null()).then_some(dc as usize)
    }

    fn release_pbuffer_dc(&self, pbuffer: usize, dc: usize) {
        if let Some(release) = self.release_pbuffer_dc {
            unsafe { release(pbuffer as Pbuffer, dc as HDC) };
        }
    }

    fn destroy_pbuffer(&self, pbuffer: usize) {
        if let Some(destroy) = self.destroy_pbuffer {
            unsafe { destroy(pbuffer as Pbuffer) };
        }
    }

    fn supports_core_contexts(&self) -> bool {
        self.create_context_attribs.is_some()
    }

    fn create_core_context(&self, dc: usize, share: usize, version: (u32, u32)) -> Option<usize> {
        let create = self.create_context_attribs?;
        let flags = if cfg!(debug_assertions) {
            WGL_CONTEXT_FORWARD_COMPATIBLE_BIT_ARB | WGL_CONTEXT_DEBUG_BIT_ARB
        } else {
            WGL_CONTEXT_FORWARD_COMPATIBLE_BIT_ARB
        };
        let attribs = [
            WGL_CONTEXT_PROFILE_MASK_ARB,
            WGL_CONTEXT_CORE_PROFILE_BIT_ARB,
            WGL_CONTEXT_FLAGS_ARB,
            flags,
            WGL_CONTEXT_MAJOR_VERSION_ARB,
            version.0 as i32,
            WGL_CONTEXT_MINOR_VERSION_ARB,
            version.1 as i32,
            0,
            0,
        ];
        let context = unsafe { create(dc as HDC, share as HGLRC, attribs.as_ptr()) };
        (!context.is_null()).then_some(context as usize)
    }

    fn create_legacy_context(&self, dc: usize) -> Option<usize> {
        let context = unsafe { wglCreateContext(dc as HDC) };
        (!context.is_null()).then_some(context as usize)
    }

    fn share_lists(&self, share: usize, context: usize) -> bool {
        unsafe { wglShareLists(share as HGLRC, context as HGLRC) != 0 }
    }

    fn delete_context(&self, context: usize) {
        if context != 0 {
            unsafe { wglDeleteContext(context as HGLRC) };
        }
    }

    fn make_current(&self, dc: usize, context: usize) -> bool {
        unsafe { wglMakeCurrent(dc as HDC, context as HGLRC) != 0 }
    }
}

pub(super) struct WglBackend;

impl ContextBackend for WglBackend {
    fn name(&self) -> &'static str {
        "wgl"
    }

    fn create(
        &self,
        capabilities: Arc<GraphicsCapabilities>,
    ) -> Result<Box<dyn GlContext>, ContextError> {
        let api = Arc::new(WglApi::resolve(&capabilities));
        let context = OffscreenContext::create_primary(api, capabilities)?;
        Ok(Box::new(context))
    }
}

pub(super) struct WglCapture;

impl NativeContextCapture for WglCapture {
    fn capture(&self) -> NativeHandles {
        unsafe {
            NativeHandles {
                display: wglGetCurrentDC() as usize,
                context: wglGetCurrentContext() as usize,
                drawable: 0,
            }
        }
    }
}
