//! Rendering contexts that share objects with the host's hardware context.
//!
//! Each platform gets one [`ContextBackend`], chosen at build time:
//!
//! - Windows: pbuffer-backed contexts (`wgl`) driven by the generic
//!   algorithm in [`offscreen`].
//! - Linux: adopts the host's GLX context without owning it (`glx`).
//! - Elsewhere: a passthrough over the host resolver ([`HostedBackend`]).

use std::{
    ffi::{CStr, c_void},
    sync::Arc,
};

use glow::HasContext;

use crate::{
    error::ContextError,
    gate::{GraphicsCapabilities, NativeContextCapture},
};

pub mod gl;
mod hosted;
pub mod offscreen;

#[cfg(target_os = "linux")]
mod glx;
#[cfg(windows)]
mod wgl;

pub use hosted::{HostedBackend, NullCapture};
pub use offscreen::{OffscreenContext, PbufferApi};

pub const DEFAULT_BACKBUFFER: (u32, u32) = (640, 528);

/// Backbuffer bookkeeping every context kind shares.
pub struct Surface {
    capabilities: Arc<GraphicsCapabilities>,
    width: u32,
    height: u32,
}

impl Surface {
    pub fn new(capabilities: Arc<GraphicsCapabilities>) -> Self {
        let (width, height) = match capabilities.base_size() {
            (0, _) | (_, 0) => DEFAULT_BACKBUFFER,
            size => size,
        };
        Self {
            capabilities,
            width,
            height,
        }
    }

    pub fn capabilities(&self) -> &Arc<GraphicsCapabilities> {
        &self.capabilities
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Adopts the current GL viewport as the backbuffer size when it is
    /// non-empty.
    pub fn update_from_viewport(&mut self) {
        let Some(gl) = self.capabilities.gl() else {
            return;
        };
        let mut viewport = [0i32; 4];
        unsafe { gl.get_parameter_i32_slice(glow::VIEWPORT, &mut viewport) };
        if viewport[2] > 0 && viewport[3] > 0 {
            self.width = viewport[2] as u32;
            self.height = viewport[3] as u32;
        }
    }

    pub fn present(&self) -> bool {
        self.capabilities.present(self.width, self.height)
    }
}

pub trait GlContext: Send {
    fn surface(&self) -> &Surface;
    fn surface_mut(&mut self) -> &mut Surface;

    fn make_current(&mut self) -> bool;
    fn clear_current(&mut self) -> bool;

    /// Creates a secondary context sharing objects with this one.
    fn create_shared(&self) -> Result<Box<dyn GlContext>, ContextError>;

    fn is_shared(&self) -> bool {
        false
    }

    fn proc_address(&self, name: &CStr) -> *const c_void {
        self.surface().capabilities().proc_address(name)
    }

    fn backbuffer_size(&self) -> (u32, u32) {
        self.surface().size()
    }

    fn update_backbuffer(&mut self) {
        self.surface_mut().update_from_viewport();
    }

    /// Presents through the host; the tick submits the frame.
    fn swap(&self) -> bool {
        self.surface().present()
    }
}

pub trait ContextBackend: Send + Sync {
    fn name(&self) -> &'static str;

    fn create(
        &self,
        capabilities: Arc<GraphicsCapabilities>,
    ) -> Result<Box<dyn GlContext>, ContextError>;
}

pub fn platform_backend() -> Box<dyn ContextBackend> {
    #[cfg(windows)]
    {
        Box::new(wgl::WglBackend)
    }
    #[cfg(target_os = "linux")]
    {
        Box::new(glx::GlxBackend)
    }
    #[cfg(not(any(windows, target_os = "linux")))]
    {
        Box::new(HostedBackend)
    }
}

pub fn platform_capture() -> Box<dyn NativeContextCapture> {
    #[cfg(windows)]
    {
        Box::new(wgl::WglCapture)
    }
    #[cfg(target_os = "linux")]
    {
        Box::new(glx::GlxCapture)
    }
    #[cfg(not(any(windows, target_os = "linux")))]
    {
        Box::new(NullCapture)
    }
}
