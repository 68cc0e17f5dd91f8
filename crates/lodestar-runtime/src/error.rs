//! Error types.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BootError {
    #[error("no content path was provided")]
    MissingPath,

    #[error("{origin} failed to boot {path}: {reason}")]
    Core {
        origin: &'static str,
        path: PathBuf,
        reason: String,
    },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ContextError {
    #[error("no hardware context is available")]
    NotReady,

    #[error("missing extension entry point {0}")]
    MissingEntryPoint(&'static str),

    #[error("no compatible pixel format")]
    PixelFormat,

    #[error("failed to create offscreen surface")]
    Surface,

    #[error("failed to create a rendering context")]
    ContextCreation,

    #[error("failed to establish a share list with the primary context")]
    ShareLists,

    #[error("the host did not report native {0} handle")]
    MissingNativeHandle(&'static str),

    #[error("operation is not supported by this backend")]
    Unsupported,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SaveStateError {
    #[error("no game is running")]
    NotRunning,

    #[error("save states are disabled")]
    Disabled,

    #[error("state is empty")]
    Empty,

    #[error("state needs {required} bytes but only {available} are available")]
    BufferTooSmall { required: usize, available: usize },

    #[error("core rejected the state: {0}")]
    Core(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NetplayError {
    #[error("netplay is disabled")]
    Disabled,

    #[error("netplay requires a loaded game file")]
    NoGame,

    #[error("no netplay backend is available")]
    Unavailable,

    #[error("host failed to listen on port {0}")]
    Listen(u16),

    #[error("failed to connect: {0}")]
    Connect(String),

    #[error("lobby room not selected")]
    RoomNotSelected,

    #[error("lobby room not found: {0}")]
    RoomNotFound(String),

    #[error("lobby password missing or invalid")]
    Password,

    #[error("lobby request failed: {0}")]
    Lobby(String),

    #[error("selected game does not match the loaded game")]
    GameMismatch,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CheatError {
    #[error("cheat contains no code lines")]
    Empty,

    #[error("unrecognised cheat line: {0}")]
    InvalidLine(String),

    #[error("cheat mixes Action Replay and Gecko lines")]
    MixedFormats,
}
