use crate::{raw, runtime::RuntimeHandles};
use std::{
    error::Error,
    ffi::{CStr, c_char},
    fmt,
    path::PathBuf,
    slice,
};

/// High-level libretro trait implemented by plugin cores.
///
/// Types implementing this trait describe themselves via [`system_info`],
/// drive the frontend through [`run`], and handle the lifecycle hooks the
/// libretro API expects. The [`export_libretro_core`](crate::export_libretro_core)
/// macro wires an implementation into the global C entry points that a frontend
/// like RetroArch calls.
///
/// [`system_info`]: Self::system_info
/// [`run`]: Self::run
pub trait LibretroCore: Send + 'static {
    /// Constructs a new core instance.
    ///
    /// Called from `retro_init` before any other method on the trait is used.
    fn construct() -> Self
    where
        Self: Sized;

    /// Returns static metadata about the core such as its name and version.
    fn system_info() -> SystemInfo;

    /// Reports the libretro API version implemented by the core.
    fn api_version() -> u32 {
        raw::RETRO_API_VERSION
    }

    /// Called every time the frontend installs an environment callback.
    ///
    /// This may happen before `retro_init`, so there is no instance yet. Cores
    /// use it to publish option menus and to pick up the log interface.
    fn environment_installed(_runtime: &mut RuntimeHandles)
    where
        Self: Sized,
    {
    }

    /// Initializes global state.
    ///
    /// Called exactly once after [`construct`](Self::construct).
    fn init(&mut self, _runtime: &mut RuntimeHandles) {}

    /// Releases any resources that outlive `run` calls.
    fn deinit(&mut self) {}

    /// Resets the emulated hardware.
    fn reset(&mut self) {}

    /// Runs a single host tick.
    ///
    /// The [`RuntimeHandles`] argument grants access to the callbacks that
    /// push video, audio, input, and environment data back to the frontend.
    fn run(&mut self, runtime: &mut RuntimeHandles);

    /// Describes current geometry and timing values.
    fn system_av_info(&mut self) -> SystemAvInfo;

    /// Loads regular content into the core.
    ///
    /// Hardware rendering must be requested from here through
    /// [`RuntimeHandles::hw_render`], since frontends only honour
    /// `SET_HW_RENDER` during `retro_load_game`.
    fn load_game(
        &mut self,
        runtime: &mut RuntimeHandles,
        game: &GameInfo<'_>,
    ) -> Result<(), LoadGameError>;

    /// Loads multi-part or special content.
    fn load_game_special(
        &mut self,
        _game_type: u32,
        _games: &[GameInfo<'_>],
    ) -> Result<(), LoadGameError> {
        Err(LoadGameError::Unsupported(
            "special content not implemented".into(),
        ))
    }

    /// Unloads the currently running game and frees associated resources.
    fn unload_game(&mut self);

    /// Reports the amount of memory (in bytes) needed to serialize state.
    ///
    /// Returning zero indicates that serialization is currently unavailable.
    fn serialize_size(&mut self) -> usize {
        0
    }

    /// Serializes the core state into the provided buffer.
    fn serialize(&mut self, _dst: &mut [u8]) -> Result<usize, SerializeError> {
        Err(SerializeError::Unsupported)
    }

    /// Restores previously serialized state.
    fn unserialize(&mut self, _src: &[u8]) -> Result<(), SerializeError> {
        Err(SerializeError::Unsupported)
    }

    /// Clears all active cheats.
    fn cheat_reset(&mut self) {}

    /// Enables or disables a cheat code. Mirrors `retro_cheat_set`.
    fn cheat_set(&mut self, _index: u32, _enabled: bool, _code: &str) {}

    /// Configures the device connected to the specified controller port.
    fn set_controller_port_device(&mut self, _port: u32, _device: u32) {}

    /// Returns the television standard of the current game.
    fn region(&self) -> u32 {
        raw::RETRO_REGION_NTSC
    }
}

/// Metadata returned by [`LibretroCore::system_info`].
#[derive(Debug, Clone)]
pub struct SystemInfo {
    /// Human-readable name of the core.
    pub library_name: String,
    /// Version string presented to frontends.
    pub library_version: String,
    /// Pipe-delimited list of file extensions the core can load.
    pub valid_extensions: Option<String>,
    /// Whether the core requires frontends to supply file paths instead of raw
    /// buffers.
    pub need_fullpath: bool,
    /// When true, frontends must not unzip archives before handing them over.
    pub block_extract: bool,
}

impl SystemInfo {
    /// Creates a new [`SystemInfo`] with the provided name and version.
    pub fn new(library_name: impl Into<String>, library_version: impl Into<String>) -> Self {
        Self {
            library_name: library_name.into(),
            library_version: library_version.into(),
            valid_extensions: None,
            need_fullpath: false,
            block_extract: false,
        }
    }

    /// Sets the file extensions supported by the core.
    pub fn with_extensions(mut self, extensions: impl Into<String>) -> Self {
        self.valid_extensions = Some(extensions.into());
        self
    }

    /// Marks whether content must be provided as a path on disk.
    pub fn need_fullpath(mut self, need: bool) -> Self {
        self.need_fullpath = need;
        self
    }

    /// Indicates whether frontends may extract archives automatically.
    pub fn block_extract(mut self, block: bool) -> Self {
        self.block_extract = block;
        self
    }
}

/// Combined AV geometry/timing data.
#[derive(Debug, Clone, Copy)]
pub struct SystemAvInfo {
    pub geometry: GameGeometry,
    pub timing: SystemTiming,
}

impl SystemAvInfo {
    /// Converts the safe abstraction into the raw `retro_system_av_info`.
    pub fn to_raw(&self) -> raw::retro_system_av_info {
        raw::retro_system_av_info {
            geometry: raw::retro_game_geometry {
                base_width: self.geometry.base_width,
                base_height: self.geometry.base_height,
                max_width: self.geometry.max_width,
                max_height: self.geometry.max_height,
                aspect_ratio: self.geometry.aspect_ratio,
            },
            timing: raw::retro_system_timing {
                fps: self.timing.fps,
                sample_rate: self.timing.sample_rate,
            },
        }
    }
}

/// Matches `retro_game_geometry`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GameGeometry {
    pub base_width: u32,
    pub base_height: u32,
    pub max_width: u32,
    pub max_height: u32,
    pub aspect_ratio: f32,
}

impl GameGeometry {
    /// A fixed-size display whose maximum equals its base size.
    pub fn fixed(width: u32, height: u32, aspect_ratio: f32) -> Self {
        Self {
            base_width: width,
            base_height: height,
            max_width: width,
            max_height: height,
            aspect_ratio,
        }
    }
}

/// Matches `retro_system_timing`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SystemTiming {
    pub fps: f64,
    pub sample_rate: f64,
}

/// Safe representation of `retro_game_info`.
#[derive(Debug, Clone)]
pub struct GameInfo<'a> {
    /// Filesystem path to the content, when available.
    pub path: Option<PathBuf>,
    /// Raw bytes of the content, when the frontend loaded it into memory.
    pub data: Option<&'a [u8]>,
    /// Optional metadata string supplied by the frontend.
    pub meta: Option<String>,
}

impl<'a> GameInfo<'a> {
    pub(crate) unsafe fn from_ptr(ptr: *const raw::retro_game_info) -> Self {
        if ptr.is_null() {
            return Self {
                path: None,
                data: None,
                meta: None,
            };
        }

        unsafe { Self::from_raw(&*ptr) }
    }

    pub(crate) unsafe fn from_slice(raw: &'a [raw::retro_game_info]) -> Vec<Self> {
        raw.iter()
            .map(|info| unsafe { Self::from_raw(info) })
            .collect()
    }

    unsafe fn from_raw(raw: &'a raw::retro_game_info) -> Self {
        Self {
            path: unsafe { c_path_to_pathbuf(raw.path) },
            data: if raw.data.is_null() || raw.size == 0 {
                None
            } else {
                Some(unsafe { slice::from_raw_parts(raw.data as *const u8, raw.size) })
            },
            meta: unsafe { c_str_to_string(raw.meta) },
        }
    }
}

pub(crate) unsafe fn c_str_to_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }

    unsafe { CStr::from_ptr(ptr) }
        .to_str()
        .ok()
        .map(|s| s.to_owned())
}

pub(crate) unsafe fn c_path_to_pathbuf(ptr: *const c_char) -> Option<PathBuf> {
    if ptr.is_null() {
        return None;
    }

    let cstr = unsafe { CStr::from_ptr(ptr) };
    if cstr.is_empty() {
        return None;
    }
    #[cfg(unix)]
    {
        use std::os::unix::ffi::OsStrExt;
        Some(std::ffi::OsStr::from_bytes(cstr.to_bytes()).into())
    }
    #[cfg(not(unix))]
    {
        cstr.to_str().ok().map(PathBuf::from)
    }
}

/// Error returned by [`LibretroCore::load_game`].
#[derive(Debug)]
pub enum LoadGameError {
    /// The frontend failed to provide content data or a path.
    MissingContent,
    /// The frontend refused a capability the core cannot run without.
    HardwareUnavailable(String),
    /// The content format is not supported by the core.
    Unsupported(String),
    /// A catch-all error for situations the other variants do not cover.
    Message(String),
}

impl fmt::Display for LoadGameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadGameError::MissingContent => write!(f, "missing content path"),
            LoadGameError::HardwareUnavailable(what) => {
                write!(f, "frontend does not provide {what}")
            }
            LoadGameError::Unsupported(msg) => write!(f, "unsupported content: {msg}"),
            LoadGameError::Message(msg) => write!(f, "{msg}"),
        }
    }
}

impl Error for LoadGameError {}

/// Error returned by serialization routines.
#[derive(Debug)]
pub enum SerializeError {
    /// Provided buffer was too small to store the serialized state.
    BufferTooSmall { required: usize },
    /// Nothing is running, or the core has save states turned off.
    Unsupported,
    /// A catch-all error for situations the other variants do not cover.
    Message(String),
}

impl fmt::Display for SerializeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SerializeError::BufferTooSmall { required } => {
                write!(f, "buffer too small (requires {required} bytes)")
            }
            SerializeError::Unsupported => write!(f, "serialization is not available"),
            SerializeError::Message(msg) => write!(f, "{msg}"),
        }
    }
}

impl Error for SerializeError {}
