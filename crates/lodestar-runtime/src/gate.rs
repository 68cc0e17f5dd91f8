//! Tracks whether the host's hardware context exists and what it offers.
//!
//! The host calls [`ContextGate::on_context_reset`] and
//! [`ContextGate::on_context_destroy`] at times of its choosing, possibly from
//! a thread other than the one running ticks. Each notification replaces the
//! [`GraphicsCapabilities`] snapshot wholesale and bumps a generation counter.
//! Snapshots handed out earlier compare their own generation against the live
//! one on every use, so a renderer still holding one after a destroy gets
//! harmless no-ops instead of touching dead handles.

use std::{
    ffi::{CStr, c_void},
    ptr,
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicU64, Ordering},
    },
};

use parking_lot::RwLock;

use crate::{
    config::AdapterConfig,
    context::{ContextBackend, GlContext, gl},
    error::ContextError,
    present::{PendingPresent, PresentHandoff},
};

/// What the host exposes once its hardware context is up.
pub trait HostGraphics: Send + Sync {
    /// Resolves a GL entry point. Null when unknown.
    fn proc_address(&self, name: &CStr) -> *const c_void;
    /// Framebuffer object the core renders into this frame.
    fn current_framebuffer(&self) -> usize;
    fn is_gles(&self) -> bool;
}

/// Native handles of the host context, as reported by the platform GL API
/// while that context is current.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NativeHandles {
    pub display: usize,
    pub context: usize,
    pub drawable: usize,
}

/// Reads the native handles of whatever context is current on this thread.
pub trait NativeContextCapture: Send + Sync {
    fn capture(&self) -> NativeHandles;
}

/// Immutable snapshot of the host's graphics capabilities.
pub struct GraphicsCapabilities {
    host: Option<Arc<dyn HostGraphics>>,
    present: Option<Arc<PresentHandoff>>,
    gl: Option<Arc<glow::Context>>,
    native: NativeHandles,
    base_width: u32,
    base_height: u32,
    gles: bool,
    generation: u64,
    live: Arc<AtomicU64>,
}

impl GraphicsCapabilities {
    fn empty(base_width: u32, base_height: u32, live: Arc<AtomicU64>) -> Self {
        Self {
            host: None,
            present: None,
            gl: None,
            native: NativeHandles::default(),
            base_width,
            base_height,
            gles: false,
            generation: live.load(Ordering::Acquire),
            live,
        }
    }

    /// True while this snapshot describes the live host context.
    pub fn is_current(&self) -> bool {
        self.host.is_some() && self.live.load(Ordering::Acquire) == self.generation
    }

    fn host(&self) -> Option<&dyn HostGraphics> {
        if self.is_current() {
            self.host.as_deref()
        } else {
            None
        }
    }

    pub fn proc_address(&self, name: &CStr) -> *const c_void {
        self.host()
            .map_or(ptr::null(), |host| host.proc_address(name))
    }

    pub fn current_framebuffer(&self) -> usize {
        self.host().map_or(0, |host| host.current_framebuffer())
    }

    /// Hands a finished frame to the tick. Returns false, doing nothing, once
    /// the context this snapshot describes has been destroyed. A frame that
    /// slips in while a destroy is running carries this snapshot's
    /// generation, and the tick drops it.
    pub fn present(&self, width: u32, height: u32) -> bool {
        match (&self.present, self.is_current()) {
            (Some(handoff), true) => {
                handoff.present(self.generation, width, height);
                true
            }
            _ => false,
        }
    }

    /// GL loaded through the host at reset; `None` for a stale snapshot or a
    /// host that could not resolve it.
    pub fn gl(&self) -> Option<&glow::Context> {
        if self.is_current() {
            self.gl.as_deref()
        } else {
            None
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn native(&self) -> NativeHandles {
        self.native
    }

    pub fn base_size(&self) -> (u32, u32) {
        (self.base_width, self.base_height)
    }

    pub fn is_gles(&self) -> bool {
        self.gles
    }
}

pub struct ContextGate {
    ready: AtomicBool,
    descriptor: RwLock<Arc<GraphicsCapabilities>>,
    generation: Arc<AtomicU64>,
    capture: Box<dyn NativeContextCapture>,
    present: Arc<PresentHandoff>,
    base_width: u32,
    base_height: u32,
}

impl ContextGate {
    pub fn new(
        config: &AdapterConfig,
        present: Arc<PresentHandoff>,
        capture: Box<dyn NativeContextCapture>,
    ) -> Self {
        let generation = Arc::new(AtomicU64::new(0));
        let empty =
            GraphicsCapabilities::empty(config.base_width, config.base_height, Arc::clone(&generation));
        Self {
            ready: AtomicBool::new(false),
            descriptor: RwLock::new(Arc::new(empty)),
            generation,
            capture,
            present,
            base_width: config.base_width,
            base_height: config.base_height,
        }
    }

    /// Rebuilds the capability snapshot from `host` and marks the gate ready.
    /// Calling it again without a destroy in between just rebuilds.
    pub fn on_context_reset(&self, host: Arc<dyn HostGraphics>) {
        let gl = gl::load(|name| host.proc_address(name));
        let native = self.capture.capture();
        let gles = host.is_gles();

        // Generation, snapshot and readiness change together under the write
        // lock so a racing destroy cannot interleave with them.
        let mut descriptor = self.descriptor.write();
        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        *descriptor = Arc::new(GraphicsCapabilities {
            host: Some(host),
            present: Some(Arc::clone(&self.present)),
            gl,
            native,
            base_width: self.base_width,
            base_height: self.base_height,
            gles,
            generation,
            live: Arc::clone(&self.generation),
        });
        self.ready.store(true, Ordering::Release);
        let has_gl = descriptor.gl.is_some();
        drop(descriptor);
        tracing::info!(generation, gles, has_gl, ?native, "hardware context reset");
    }

    /// Marks the gate not ready and invalidates every snapshot handed out so
    /// far.
    pub fn on_context_destroy(&self) {
        let mut descriptor = self.descriptor.write();
        self.ready.store(false, Ordering::Release);
        self.generation.fetch_add(1, Ordering::AcqRel);
        *descriptor = Arc::new(GraphicsCapabilities::empty(
            self.base_width,
            self.base_height,
            Arc::clone(&self.generation),
        ));
        self.present.clear();
        drop(descriptor);
        tracing::info!("hardware context destroyed");
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    /// True when `frame` was presented under the live context and may be
    /// handed to the host.
    pub fn accepts(&self, frame: &PendingPresent) -> bool {
        self.is_ready() && frame.belongs_to(self.generation.load(Ordering::Acquire))
    }

    /// The current snapshot. Fetch it again on every use; never keep one
    /// across a tick.
    pub fn capabilities(&self) -> Arc<GraphicsCapabilities> {
        Arc::clone(&self.descriptor.read())
    }

    /// Creates a rendering context sharing objects with the host context.
    pub fn create_context(
        &self,
        backend: &dyn ContextBackend,
    ) -> Result<Box<dyn GlContext>, ContextError> {
        let capabilities = self.capabilities();
        if !self.is_ready() || !capabilities.is_current() {
            return Err(ContextError::NotReady);
        }
        backend.create(capabilities)
    }
}
