//! Lifecycle coordination for running an emulation core inside a libretro
//! host that owns the OpenGL context.
//!
//! The host creates, destroys and recreates its context whenever it likes,
//! while the core renders and mixes audio on threads of its own. This crate
//! keeps the two sides consistent.
//!
//! # Architecture
//!
//! - [`ContextGate`] records whether the host context exists and hands out
//!   [`GraphicsCapabilities`] snapshots that go inert once the context dies.
//! - [`PresentHandoff`] carries "frame ready" from the renderer to the tick
//!   as a single atomic word.
//! - [`BootQueue`] keeps one boot request until the context is ready.
//! - The audio pacer thread pulls from the core's [`Mixer`] and pushes to an
//!   [`AudioSink`] at the mixer's sample rate.
//! - [`Adapter::tick`] runs once per host frame and is the only place that
//!   starts or stops the core.
//! - [`NetplayController`] turns session events into stop and start
//!   requests served by the tick.
//! - [`context`] creates additional rendering contexts sharing the host's
//!   objects on platforms that support it.

mod adapter;
pub mod audio;
mod boot;
pub mod cheats;
pub mod config;
pub mod context;
mod emulation;
pub mod error;
mod frontend;
mod gate;
pub mod input;
pub mod netplay;
pub mod options;
mod present;
mod shared;

pub use adapter::{Adapter, BootStatus, Services};
pub use audio::{AudioPacer, AudioSink, AudioSinkSlot, Clock, Mixer, SystemClock};
pub use boot::{BootOrigin, BootQueue, BootRequest, BootSession};
pub use cheats::{Cheat, CheatFormat, CheatLine, CheatRegistry};
pub use config::AdapterConfig;
pub use emulation::{EmulationCore, GameIdentity};
pub use error::{BootError, CheatError, ContextError, NetplayError, SaveStateError};
pub use frontend::Frontend;
pub use gate::{
    ContextGate, GraphicsCapabilities, HostGraphics, NativeContextCapture, NativeHandles,
};
pub use input::{Button, PadState};
pub use netplay::NetplayController;
pub use options::{CoreSettings, NetplaySettings, OptionDefinition, OptionStore};
pub use present::{PendingPresent, PresentHandoff};
pub use shared::StopHandle;
