use crate::{core::c_str_to_string, raw};
use parking_lot::RwLock;
use std::{
    ffi::{CStr, CString, c_char, c_void},
    mem,
    ptr,
    sync::{
        Arc,
        atomic::{AtomicPtr, AtomicUsize, Ordering},
    },
};

/// Callbacks provided by the libretro frontend that are only touched from the
/// frontend's calling thread.
#[derive(Clone, Copy, Default)]
pub(crate) struct CallbackSet {
    pub environment: raw::retro_environment_t,
    pub video: raw::retro_video_refresh_t,
    pub input_poll: raw::retro_input_poll_t,
    pub input_state: raw::retro_input_state_t,
}

impl CallbackSet {
    pub fn set_environment(&mut self, cb: raw::retro_environment_t) {
        self.environment = cb;
    }

    pub fn set_video(&mut self, cb: raw::retro_video_refresh_t) {
        self.video = cb;
    }

    pub fn set_input_poll(&mut self, cb: raw::retro_input_poll_t) {
        self.input_poll = cb;
    }

    pub fn set_input_state(&mut self, cb: raw::retro_input_state_t) {
        self.input_state = cb;
    }
}

type SampleFn = unsafe extern "C" fn(i16, i16);
type BatchFn = unsafe extern "C" fn(*const i16, usize) -> usize;

/// Audio callbacks kept in atomics so a dedicated audio thread can read the
/// current pointers while the frontend swaps them.
#[derive(Default)]
pub(crate) struct AudioCallbacks {
    sample: AtomicPtr<()>,
    batch: AtomicPtr<()>,
}

impl AudioCallbacks {
    pub fn set_sample(&self, cb: raw::retro_audio_sample_t) {
        let ptr = cb.map_or(ptr::null_mut(), |f| f as *mut ());
        self.sample.store(ptr, Ordering::Release);
    }

    pub fn set_batch(&self, cb: raw::retro_audio_sample_batch_t) {
        let ptr = cb.map_or(ptr::null_mut(), |f| f as *mut ());
        self.batch.store(ptr, Ordering::Release);
    }

    fn sample(&self) -> Option<SampleFn> {
        let ptr = self.sample.load(Ordering::Acquire);
        // SAFETY: only ever stored from a `SampleFn` in `set_sample`.
        (!ptr.is_null()).then(|| unsafe { mem::transmute::<*mut (), SampleFn>(ptr) })
    }

    fn batch(&self) -> Option<BatchFn> {
        let ptr = self.batch.load(Ordering::Acquire);
        // SAFETY: only ever stored from a `BatchFn` in `set_batch`.
        (!ptr.is_null()).then(|| unsafe { mem::transmute::<*mut (), BatchFn>(ptr) })
    }
}

/// Trampolines generated by [`export_libretro_core!`](crate::export_libretro_core)
/// that the frontend calls on hardware context reset and destroy.
#[doc(hidden)]
#[derive(Clone, Copy)]
pub struct HwTrampolines {
    pub reset: unsafe extern "C" fn(),
    pub destroy: unsafe extern "C" fn(),
}

/// Receives hardware context notifications.
///
/// Frontends may deliver these from a thread other than the one that calls
/// `retro_run`, and never while holding any bridge lock.
pub trait HwContextListener: Send + Sync {
    fn context_reset(&self, interface: &HwRenderInterface);
    fn context_destroy(&self);
}

type Registration = (Arc<dyn HwContextListener>, HwRenderInterface);

pub(crate) struct HwBinding {
    trampolines: HwTrampolines,
    registration: RwLock<Option<Registration>>,
}

impl HwBinding {
    pub fn new(trampolines: HwTrampolines) -> Self {
        Self {
            trampolines,
            registration: RwLock::new(None),
        }
    }

    pub fn context_reset(&self) {
        let registration = self.registration.read().clone();
        if let Some((listener, interface)) = registration {
            listener.context_reset(&interface);
        }
    }

    pub fn context_destroy(&self) {
        let registration = self.registration.read().clone();
        if let Some((listener, _)) = registration {
            listener.context_destroy();
        }
    }

    pub fn clear(&self) {
        self.registration.write().take();
    }
}

/// Safe wrappers around the callbacks that libretro frontends provide.
pub struct RuntimeHandles {
    callbacks: CallbackSet,
    audio: Arc<AudioCallbacks>,
    hw: Arc<HwBinding>,
    frame_counter: AtomicUsize,
}

impl RuntimeHandles {
    pub(crate) fn new(callbacks: CallbackSet, audio: Arc<AudioCallbacks>, hw: Arc<HwBinding>) -> Self {
        Self {
            callbacks,
            audio,
            hw,
            frame_counter: AtomicUsize::new(0),
        }
    }

    /// Returns the environment callback if the frontend installed one.
    pub fn environment(&self) -> Option<Environment> {
        self.callbacks
            .environment
            .map(|cb| Environment { callback: cb })
    }

    /// Returns the video callback if the frontend installed one.
    pub fn video(&self) -> Option<Video<'_>> {
        self.callbacks.video.map(|cb| Video {
            callback: cb,
            frame_counter: &self.frame_counter,
        })
    }

    /// Number of frames submitted through [`Video::submit`] on these handles.
    pub fn frames_submitted(&self) -> usize {
        self.frame_counter.load(Ordering::Relaxed)
    }

    /// Returns the audio callbacks as they are registered right now.
    pub fn audio(&self) -> Audio {
        Audio {
            sample: self.audio.sample(),
            batch: self.audio.batch(),
        }
    }

    /// Returns a handle that re-reads the audio callbacks on every push and
    /// may be moved to another thread.
    pub fn shared_audio(&self) -> SharedAudio {
        SharedAudio {
            callbacks: Arc::clone(&self.audio),
        }
    }

    /// Returns input callbacks if the frontend installed both `poll` and `state`.
    pub fn input(&self) -> Option<Input> {
        match (self.callbacks.input_poll, self.callbacks.input_state) {
            (Some(poll), Some(state)) => Some(Input { poll, state }),
            _ => None,
        }
    }

    /// Returns the hardware-render registration helper.
    pub fn hw_render(&self) -> Option<HwRender<'_>> {
        self.environment().map(|env| HwRender {
            env,
            binding: &self.hw,
        })
    }
}

type EnvironmentCallback = unsafe extern "C" fn(u32, *mut c_void) -> bool;

/// Handle used to invoke `retro_environment_t`.
#[derive(Clone, Copy)]
pub struct Environment {
    callback: EnvironmentCallback,
}

impl Environment {
    /// Invokes the environment callback with the provided command and payload.
    pub fn request<T>(&self, command: u32, data: &mut T) -> bool {
        unsafe { (self.callback)(command, data as *mut T as *mut c_void) }
    }

    fn request_null(&self, command: u32) -> bool {
        unsafe { (self.callback)(command, ptr::null_mut()) }
    }

    /// Reads a core option value.
    pub fn get_variable(&self, key: &str) -> Option<String> {
        let key = CString::new(key).ok()?;
        let mut var = raw::retro_variable {
            key: key.as_ptr(),
            value: ptr::null(),
        };
        if !self.request(raw::RETRO_ENVIRONMENT_GET_VARIABLE, &mut var) {
            return None;
        }
        unsafe { c_str_to_string(var.value) }
    }

    /// Returns `true` when the user changed any core option since the last
    /// query.
    pub fn variables_updated(&self) -> bool {
        let mut updated = false;
        self.request(raw::RETRO_ENVIRONMENT_GET_VARIABLE_UPDATE, &mut updated) && updated
    }

    /// Publishes core option definitions as `(key, "Description; a|b|c")` pairs.
    pub fn set_variables<K, V>(&self, variables: &[(K, V)]) -> bool
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let owned: Vec<(CString, CString)> = variables
            .iter()
            .filter_map(|(key, value)| {
                Some((
                    CString::new(key.as_ref()).ok()?,
                    CString::new(value.as_ref()).ok()?,
                ))
            })
            .collect();

        let mut table: Vec<raw::retro_variable> = owned
            .iter()
            .map(|(key, value)| raw::retro_variable {
                key: key.as_ptr(),
                value: value.as_ptr(),
            })
            .collect();
        table.push(raw::retro_variable {
            key: ptr::null(),
            value: ptr::null(),
        });

        unsafe {
            (self.callback)(
                raw::RETRO_ENVIRONMENT_SET_VARIABLES,
                table.as_mut_ptr() as *mut c_void,
            )
        }
    }

    pub fn set_pixel_format(&self, format: raw::retro_pixel_format) -> bool {
        let mut format = format;
        self.request(raw::RETRO_ENVIRONMENT_SET_PIXEL_FORMAT, &mut format)
    }

    /// Asks the frontend for a shared context so the core can create its own
    /// contexts that share objects with the frontend's.
    pub fn set_hw_shared_context(&self) -> bool {
        self.request_null(raw::RETRO_ENVIRONMENT_SET_HW_SHARED_CONTEXT)
    }

    /// Returns the frontend's `printf`-style log function.
    pub fn log_interface(&self) -> raw::retro_log_printf_t {
        let mut callback = raw::retro_log_callback::default();
        if !self.request(raw::RETRO_ENVIRONMENT_GET_LOG_INTERFACE, &mut callback) {
            return None;
        }
        callback.log
    }

    pub fn username(&self) -> Option<String> {
        self.string_query(raw::RETRO_ENVIRONMENT_GET_USERNAME)
            .filter(|name| !name.is_empty())
    }

    fn string_query(&self, command: u32) -> Option<String> {
        let mut value: *const c_char = ptr::null();
        if !self.request(command, &mut value) {
            return None;
        }
        unsafe { c_str_to_string(value) }
    }

    /// Returns the raw `retro_environment_t` pointer for FFI calls.
    ///
    /// # Safety
    /// The caller must ensure the returned function pointer is invoked with the
    /// same ABI guarantees that libretro requires.
    pub unsafe fn raw(&self) -> raw::retro_environment_t {
        Some(self.callback)
    }
}

/// Parameters for `RETRO_ENVIRONMENT_SET_HW_RENDER`.
#[derive(Debug, Clone, Copy)]
pub struct HwRenderRequest {
    pub context_type: raw::retro_hw_context_type,
    pub version_major: u32,
    pub version_minor: u32,
    pub depth: bool,
    pub stencil: bool,
    pub bottom_left_origin: bool,
    pub cache_context: bool,
    pub debug_context: bool,
}

impl HwRenderRequest {
    /// An OpenGL core-profile context with depth and stencil, bottom-left origin.
    pub fn opengl_core(version_major: u32, version_minor: u32) -> Self {
        Self {
            context_type: raw::RETRO_HW_CONTEXT_OPENGL_CORE,
            version_major,
            version_minor,
            depth: true,
            stencil: true,
            bottom_left_origin: true,
            cache_context: false,
            debug_context: false,
        }
    }
}

type ProcAddressFn = unsafe extern "C" fn(*const c_char) -> raw::retro_proc_address_t;
type FramebufferFn = unsafe extern "C" fn() -> usize;

/// Entry points the frontend filled in after a successful `SET_HW_RENDER`.
#[derive(Debug, Clone, Copy)]
pub struct HwRenderInterface {
    context_type: raw::retro_hw_context_type,
    get_proc_address: Option<ProcAddressFn>,
    get_current_framebuffer: Option<FramebufferFn>,
}

impl HwRenderInterface {
    pub fn context_type(&self) -> raw::retro_hw_context_type {
        self.context_type
    }

    pub fn is_gles(&self) -> bool {
        matches!(
            self.context_type,
            raw::RETRO_HW_CONTEXT_OPENGLES2
                | raw::RETRO_HW_CONTEXT_OPENGLES3
                | raw::RETRO_HW_CONTEXT_OPENGLES_VERSION
        )
    }

    /// Resolves a graphics API entry point through the frontend. Returns null
    /// when the symbol is unknown.
    pub fn proc_address(&self, symbol: &CStr) -> *const c_void {
        let Some(resolve) = self.get_proc_address else {
            return ptr::null();
        };
        match unsafe { resolve(symbol.as_ptr()) } {
            Some(f) => f as *const c_void,
            None => ptr::null(),
        }
    }

    /// The framebuffer object the core must render into this frame.
    pub fn current_framebuffer(&self) -> usize {
        self.get_current_framebuffer
            .map_or(0, |current| unsafe { current() })
    }
}

/// Registers hardware rendering with the frontend.
pub struct HwRender<'a> {
    env: Environment,
    binding: &'a HwBinding,
}

impl HwRender<'_> {
    /// Issues `SET_HW_RENDER`. On success the listener starts receiving context
    /// reset/destroy notifications and the filled-in interface is returned.
    pub fn enable(
        &self,
        request: HwRenderRequest,
        listener: Arc<dyn HwContextListener>,
    ) -> Option<HwRenderInterface> {
        let mut callback = raw::retro_hw_render_callback {
            context_type: request.context_type,
            context_reset: Some(self.binding.trampolines.reset),
            context_destroy: Some(self.binding.trampolines.destroy),
            depth: request.depth,
            stencil: request.stencil,
            bottom_left_origin: request.bottom_left_origin,
            version_major: request.version_major,
            version_minor: request.version_minor,
            cache_context: request.cache_context,
            debug_context: request.debug_context,
            ..Default::default()
        };

        if !self
            .env
            .request(raw::RETRO_ENVIRONMENT_SET_HW_RENDER, &mut callback)
        {
            self.binding.clear();
            return None;
        }

        let interface = HwRenderInterface {
            context_type: request.context_type,
            get_proc_address: callback.get_proc_address,
            get_current_framebuffer: callback.get_current_framebuffer,
        };
        *self.binding.registration.write() = Some((listener, interface));
        Some(interface)
    }

    /// Stops forwarding context notifications.
    pub fn disable(&self) {
        self.binding.clear();
    }
}

type VideoCallback = unsafe extern "C" fn(*const c_void, u32, u32, usize);

/// Sends frames to the frontend via `retro_video_refresh_t`.
pub struct Video<'a> {
    callback: VideoCallback,
    frame_counter: &'a AtomicUsize,
}

impl Video<'_> {
    /// Submits a frame described by [`Frame`].
    pub fn submit(&self, frame: Frame<'_>) {
        let (ptr, width, height, pitch) = frame.into_raw();
        unsafe {
            (self.callback)(ptr, width, height, pitch);
        }
        self.frame_counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// Frame submission metadata for [`Video::submit`].
pub struct Frame<'a> {
    buffer: FrameBuffer<'a>,
    width: u32,
    height: u32,
    pitch: usize,
}

impl<'a> Frame<'a> {
    /// Describes a software frame backed by CPU-accessible pixels.
    pub fn from_pixels(buffer: &'a [u8], width: u32, height: u32, pitch: usize) -> Self {
        Self {
            buffer: FrameBuffer::Pixels(buffer),
            width,
            height,
            pitch,
        }
    }

    /// Describes a frame that was rendered into the frontend's hardware
    /// framebuffer.
    pub fn hardware(width: u32, height: u32) -> Self {
        Self {
            buffer: FrameBuffer::Hardware,
            width,
            height,
            pitch: 0,
        }
    }

    /// Indicates that the previous frame should be duplicated.
    pub fn duplicate() -> Self {
        Self {
            buffer: FrameBuffer::Duplicate,
            width: 0,
            height: 0,
            pitch: 0,
        }
    }

    fn into_raw(self) -> (*const c_void, u32, u32, usize) {
        (self.buffer.as_ptr(), self.width, self.height, self.pitch)
    }
}

enum FrameBuffer<'a> {
    Pixels(&'a [u8]),
    Hardware,
    Duplicate,
}

impl FrameBuffer<'_> {
    fn as_ptr(&self) -> *const c_void {
        match self {
            FrameBuffer::Pixels(pixels) => pixels.as_ptr() as *const c_void,
            FrameBuffer::Hardware => raw::RETRO_HW_FRAME_BUFFER_VALID,
            FrameBuffer::Duplicate => ptr::null(),
        }
    }
}

/// Wrapper for libretro audio callbacks.
///
/// The wrapper automatically chooses between the single-sample and batch
/// callbacks depending on which one the frontend supports.
pub struct Audio {
    sample: Option<SampleFn>,
    batch: Option<BatchFn>,
}

impl Audio {
    pub fn is_connected(&self) -> bool {
        self.sample.is_some() || self.batch.is_some()
    }

    /// Sends a single stereo sample pair to the frontend.
    pub fn push_sample(&self, left: i16, right: i16) {
        match (self.sample, self.batch) {
            (Some(sample), _) => unsafe { sample(left, right) },
            (None, Some(batch)) => {
                let frame = [left, right];
                unsafe {
                    batch(frame.as_ptr(), 1);
                }
            }
            (None, None) => {}
        }
    }

    /// Sends interleaved stereo samples (`L, R, L, R, ...`) to the frontend and
    /// returns the number of frames it accepted.
    ///
    /// When the frontend only provided the single-sample callback, this method
    /// falls back to iterating through each pair.
    pub fn push_interleaved(&self, samples: &[i16]) -> usize {
        let frames = samples.len() / 2;
        if let Some(batch) = self.batch {
            unsafe { batch(samples.as_ptr(), frames) }
        } else if self.sample.is_some() {
            for pair in samples.chunks_exact(2) {
                self.push_sample(pair[0], pair[1]);
            }
            frames
        } else {
            0
        }
    }
}

/// Thread-safe view of the frontend's audio callbacks.
///
/// Every call re-reads the registered pointers, so a frontend swapping or
/// clearing them is observed immediately.
#[derive(Clone)]
pub struct SharedAudio {
    callbacks: Arc<AudioCallbacks>,
}

impl SharedAudio {
    pub fn current(&self) -> Audio {
        Audio {
            sample: self.callbacks.sample(),
            batch: self.callbacks.batch(),
        }
    }
}

type PollCallback = unsafe extern "C" fn();
type StateCallback = unsafe extern "C" fn(u32, u32, u32, u32) -> i16;

/// Wrapper over input callbacks provided by the frontend.
#[derive(Clone, Copy)]
pub struct Input {
    poll: PollCallback,
    state: StateCallback,
}

impl Input {
    /// Tells the frontend to sample the current input devices.
    pub fn poll(&self) {
        unsafe { (self.poll)() };
    }

    /// Queries the state of an input element such as a joypad button.
    pub fn state(&self, port: u32, device: u32, index: u32, id: u32) -> i16 {
        unsafe { (self.state)(port, device, index, id) }
    }
}
