use std::{path::Path, sync::Arc};

use crate::{
    audio::Mixer,
    boot::BootRequest,
    cheats::Cheat,
    error::{BootError, SaveStateError},
    gate::ContextGate,
    input::{PORTS, PadState},
    options::CoreSettings,
};

/// Identity used to match a loaded file against a netplay session's game.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameIdentity {
    pub game_id: String,
    pub name: String,
}

impl GameIdentity {
    /// Falls back to the file stem for both fields.
    pub fn from_path(path: &Path) -> Self {
        let stem = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            game_id: stem.clone(),
            name: stem,
        }
    }
}

/// The emulation core the adapter drives.
///
/// Every call happens on the host thread except [`Mixer`] pulls, which come
/// from the audio pacer through the handle returned by [`mixer`](Self::mixer).
pub trait EmulationCore: Send {
    /// Starts emulation. `graphics` is where the core reads the host context
    /// from for as long as it runs.
    fn boot(&mut self, request: &BootRequest, graphics: &Arc<ContextGate>)
        -> Result<(), BootError>;

    /// Stops emulation. Must be harmless when nothing is running.
    fn stop(&mut self);

    /// Runs work the core queued for the host thread.
    fn pump_jobs(&mut self);

    fn save_state(&mut self) -> Result<Vec<u8>, SaveStateError>;

    fn load_state(&mut self, state: &[u8]) -> Result<(), SaveStateError>;

    fn apply_settings(&mut self, _settings: &CoreSettings) {}

    fn apply_cheats(&mut self, _cheats: &[Cheat]) {}

    fn update_pads(&mut self, _pads: &[PadState; PORTS]) {}

    fn identify(&self, target: &Path) -> GameIdentity {
        GameIdentity::from_path(target)
    }

    fn mixer(&self) -> Arc<dyn Mixer>;
}
