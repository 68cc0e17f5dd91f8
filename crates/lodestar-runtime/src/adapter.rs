//! The adapter ties the host's entry points to the emulation core.
//!
//! All methods run on the host thread. The pieces other threads touch (the
//! context gate, present handoff, shared flags and audio sink slot) are
//! shared through `Arc` and synchronise on their own.

use std::{
    io,
    path::{Path, PathBuf},
    sync::Arc,
};

use crate::{
    audio::{AudioPacer, AudioSink, AudioSinkSlot, Clock, Pacer, SystemClock},
    boot::{BootQueue, BootRequest},
    cheats::CheatRegistry,
    config::AdapterConfig,
    context::platform_capture,
    emulation::{EmulationCore, GameIdentity},
    error::{BootError, CheatError, NetplayError, SaveStateError},
    frontend::Frontend,
    gate::{ContextGate, HostGraphics, NativeContextCapture},
    input::read_pads,
    netplay::{NetplayBackend, NetplayController, NetplayMode},
    options::OptionStore,
    present::PresentHandoff,
    shared::{SharedState, StopHandle},
};

/// Collaborators an [`Adapter`] is built with besides the core.
pub struct Services {
    pub audio_sink: Option<Arc<dyn AudioSink>>,
    pub netplay: Option<Box<dyn NetplayBackend>>,
    pub capture: Box<dyn NativeContextCapture>,
    pub clock: Arc<dyn Clock>,
}

impl Default for Services {
    fn default() -> Self {
        Self {
            audio_sink: None,
            netplay: None,
            capture: platform_capture(),
            clock: Arc::new(SystemClock),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootStatus {
    Booted,
    /// Stored until the host context is ready and nothing is running.
    Deferred,
}

struct LoadedGame {
    path: PathBuf,
    identity: GameIdentity,
}

pub struct Adapter {
    config: AdapterConfig,
    shared: Arc<SharedState>,
    gate: Arc<ContextGate>,
    present: Arc<PresentHandoff>,
    sink: Arc<AudioSinkSlot>,
    pacer: Option<AudioPacer>,
    boot: BootQueue,
    options: OptionStore,
    cheats: CheatRegistry,
    netplay: NetplayController,
    core: Box<dyn EmulationCore>,
    game: Option<LoadedGame>,
    hw_render: bool,
    torn_down: bool,
}

impl Adapter {
    /// Builds the adapter and starts the audio pacer.
    pub fn new(
        config: AdapterConfig,
        core: Box<dyn EmulationCore>,
        services: Services,
    ) -> io::Result<Self> {
        let shared = Arc::new(SharedState::new());
        let present = Arc::new(PresentHandoff::new());
        let gate = Arc::new(ContextGate::new(&config, Arc::clone(&present), services.capture));
        let sink = Arc::new(AudioSinkSlot::new(services.audio_sink));
        let pacer = AudioPacer::spawn(Pacer::new(
            &config,
            core.mixer(),
            Arc::clone(&sink),
            Arc::clone(&shared),
            services.clock,
        ))?;

        Ok(Self {
            options: OptionStore::new(config.option_prefix),
            config,
            shared,
            gate,
            present,
            sink,
            pacer: Some(pacer),
            boot: BootQueue::new(),
            cheats: CheatRegistry::new(),
            netplay: NetplayController::new(services.netplay),
            core,
            game: None,
            hw_render: false,
            torn_down: false,
        })
    }

    pub fn config(&self) -> &AdapterConfig {
        &self.config
    }

    /// The gate the host's context callbacks feed. Clone it into whatever
    /// listener the host invokes.
    pub fn gate(&self) -> &Arc<ContextGate> {
        &self.gate
    }

    pub fn options(&self) -> &OptionStore {
        &self.options
    }

    pub fn netplay(&self) -> &NetplayController {
        &self.netplay
    }

    /// Path of the game the last successful `load_game` recorded.
    pub fn loaded_game(&self) -> Option<&Path> {
        self.game.as_ref().map(|game| game.path.as_path())
    }

    pub fn set_lobby_password(&mut self, password: impl Into<String>) {
        self.netplay.set_lobby_password(password);
    }

    pub fn set_audio_sink(&self, sink: Option<Arc<dyn AudioSink>>) {
        self.sink.set(sink);
    }

    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            shared: Arc::clone(&self.shared),
        }
    }

    pub fn is_running(&self) -> bool {
        self.shared.is_running()
    }

    pub fn is_audio_alive(&self) -> bool {
        self.pacer.as_ref().is_some_and(AudioPacer::is_alive)
    }

    pub fn context_reset(&self, host: Arc<dyn HostGraphics>) {
        self.gate.on_context_reset(host);
    }

    pub fn context_destroy(&self) {
        self.gate.on_context_destroy();
    }

    /// Publishes the option menu, including the current lobby rooms.
    pub fn publish_options(&self, frontend: &dyn Frontend) -> bool {
        let definitions = self.options.definitions(&self.netplay.room_labels());
        let accepted = frontend.set_variables(&definitions);
        if !accepted {
            tracing::warn!("host rejected the option definitions");
        }
        accepted
    }

    /// Boots `path`, or starts the configured netplay session that will boot
    /// it later. The game is only recorded once that succeeds.
    pub fn load_game(
        &mut self,
        frontend: &dyn Frontend,
        path: Option<&Path>,
        hw_render_enabled: bool,
    ) -> bool {
        let Some(path) = path else {
            tracing::error!(error = %BootError::MissingPath, "cannot load game");
            return false;
        };
        if !hw_render_enabled {
            tracing::error!("host refused hardware rendering");
            return false;
        }

        let lookup = |key: &str| frontend.variable(key);
        if self.options.apply_core(lookup) {
            self.apply_core_settings();
        }
        self.options.apply_netplay(lookup);
        self.options.netplay_edges(lookup);

        let identity = self.core.identify(path);
        let started = if self.options.netplay().mode != NetplayMode::Disabled {
            let nickname = frontend.username();
            match self
                .netplay
                .start_session(self.options.netplay(), &identity, nickname.as_deref())
            {
                Ok(()) => true,
                Err(err) => {
                    tracing::error!(error = %err, "failed to start netplay session");
                    false
                }
            }
        } else {
            self.request_boot(BootRequest::plain(path)).is_ok()
        };
        if !started {
            return false;
        }

        tracing::info!(path = %path.display(), game_id = %identity.game_id, "game loaded");
        self.game = Some(LoadedGame {
            path: path.to_path_buf(),
            identity,
        });
        self.hw_render = true;
        true
    }

    pub fn unload_game(&mut self) {
        self.netplay.shutdown();
        self.shared.clear_start_request();
        self.shared.take_stop_request();
        if self.shared.is_running() {
            self.stop_core();
        }
        self.boot.clear();
        self.present.clear();
        self.game = None;
        self.hw_render = false;
    }

    /// Boots now when possible, otherwise keeps the request for a later tick.
    pub fn request_boot(&mut self, request: BootRequest) -> Result<BootStatus, BootError> {
        if self.gate.is_ready() && !self.shared.is_running() {
            return self.boot_now(request).map(|()| BootStatus::Booted);
        }
        tracing::info!(
            origin = %request.origin,
            ready = self.gate.is_ready(),
            running = self.shared.is_running(),
            "deferring boot"
        );
        self.boot.store(request);
        Ok(BootStatus::Deferred)
    }

    fn boot_now(&mut self, request: BootRequest) -> Result<(), BootError> {
        tracing::info!(origin = %request.origin, target = %request.target.display(), "booting");
        match self.core.boot(&request, &self.gate) {
            Ok(()) => {
                self.shared.set_running(true);
                self.apply_cheats();
                Ok(())
            }
            Err(err) => {
                tracing::error!(error = %err, "{} failed to boot", request.origin);
                self.shared.set_running(false);
                Err(err)
            }
        }
    }

    fn stop_core(&mut self) {
        tracing::info!("stopping core");
        self.core.stop();
        self.shared.set_running(false);
    }

    /// One host frame.
    pub fn tick(&mut self, frontend: &dyn Frontend) {
        if frontend.variables_updated() {
            self.apply_option_changes(frontend);
        }
        self.netplay.drain_events(&self.shared);

        frontend.poll_input();
        if self.shared.is_running() {
            let pads = read_pads(frontend);
            self.core.update_pads(&pads);
        }

        if self.shared.take_stop_request() {
            self.stop_core();
        }

        if !self.shared.is_running()
            && self.options.netplay().mode == NetplayMode::Disabled
            && self.netplay.is_active()
        {
            self.netplay.shutdown();
        }

        if self.shared.take_start_request() {
            self.start_netplay_game();
        }

        if !self.shared.is_running() && self.gate.is_ready() {
            if let Some(request) = self.boot.take() {
                // Failures are logged by the boot itself.
                let _ = self.boot_now(request);
            }
        }

        if self.shared.is_running() {
            self.core.pump_jobs();
        }

        if let Some(frame) = self.present.drain() {
            if self.gate.accepts(&frame) {
                frontend.submit_hw_frame(frame.width, frame.height);
            } else {
                tracing::debug!(?frame, "dropping frame from a destroyed context");
            }
        }

        if !self.shared.is_running() || !self.hw_render {
            frontend.submit_placeholder_frame();
        }
    }

    fn apply_core_settings(&mut self) {
        self.shared.set_volume(self.options.core().audio_volume);
        self.core.apply_settings(self.options.core());
    }

    fn apply_option_changes(&mut self, frontend: &dyn Frontend) {
        let lookup = |key: &str| frontend.variable(key);
        if self.options.apply_core(lookup) {
            self.apply_core_settings();
        }
        self.options.apply_netplay(lookup);

        let edges = self.options.netplay_edges(lookup);
        if edges.refresh_rooms {
            match self.netplay.refresh_rooms(&self.options.netplay().lobby_region) {
                Ok(_) => {
                    self.publish_options(frontend);
                }
                Err(err) => tracing::warn!(error = %err, "lobby refresh failed"),
            }
        }
        if edges.start_game && !self.netplay.request_start() {
            tracing::info!("only the netplay host can start the game");
        }

        if self.options.netplay().mode == NetplayMode::Disabled && self.netplay.is_active() {
            if self.shared.is_running() {
                self.shared.request_stop();
            } else {
                self.netplay.shutdown();
            }
        }
    }

    fn start_netplay_game(&mut self) {
        if !self.netplay.is_active() || self.shared.is_running() {
            return;
        }
        let Some(game) = &self.game else {
            tracing::warn!(error = %NetplayError::NoGame, "cannot start netplay game");
            return;
        };
        let (path, identity) = (game.path.clone(), game.identity.clone());
        match self.netplay.start_game(&path, &identity) {
            Ok(session) => {
                if let Err(err) = self.request_boot(BootRequest::netplay(path, session)) {
                    tracing::debug!(error = %err, "netplay start abandoned");
                }
            }
            Err(err) => tracing::warn!(error = %err, "cannot start netplay game"),
        }
    }

    fn save_state(&mut self) -> Result<Vec<u8>, SaveStateError> {
        if !self.shared.is_running() {
            return Err(SaveStateError::NotRunning);
        }
        if !self.options.core().savestates {
            return Err(SaveStateError::Disabled);
        }
        let state = self.core.save_state()?;
        if state.is_empty() {
            return Err(SaveStateError::Empty);
        }
        Ok(state)
    }

    /// Size of a save state right now, or zero when none can be made.
    pub fn serialize_size(&mut self) -> usize {
        self.save_state().map_or(0, |state| state.len())
    }

    pub fn serialize(&mut self, dst: &mut [u8]) -> Result<usize, SaveStateError> {
        let state = self.save_state()?;
        if state.len() > dst.len() {
            return Err(SaveStateError::BufferTooSmall {
                required: state.len(),
                available: dst.len(),
            });
        }
        dst[..state.len()].copy_from_slice(&state);
        Ok(state.len())
    }

    pub fn unserialize(&mut self, src: &[u8]) -> Result<(), SaveStateError> {
        if !self.shared.is_running() {
            return Err(SaveStateError::NotRunning);
        }
        if !self.options.core().savestates {
            return Err(SaveStateError::Disabled);
        }
        if src.is_empty() {
            return Err(SaveStateError::Empty);
        }
        self.core.load_state(src)
    }

    pub fn cheat_reset(&mut self) {
        self.cheats.reset();
        self.apply_cheats();
    }

    pub fn cheat_set(&mut self, index: usize, enabled: bool, code: &str) -> Result<(), CheatError> {
        let result = self.cheats.set(index, enabled, code);
        self.apply_cheats();
        result
    }

    fn apply_cheats(&mut self) {
        if !self.shared.is_running() {
            return;
        }
        if self.cheats.any_enabled() && self.options.force_cheats() {
            tracing::info!("enabling cheats for an active cheat code");
            self.core.apply_settings(self.options.core());
        }
        self.core.apply_cheats(&self.cheats.valid());
    }

    /// Stops everything in dependency order. Safe to call more than once.
    pub fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        self.torn_down = true;

        if let Some(mut pacer) = self.pacer.take() {
            pacer.stop();
        }
        self.netplay.shutdown();
        if self.shared.is_running() {
            self.stop_core();
        }
        self.gate.on_context_destroy();
        self.boot.clear();
        self.game = None;
        tracing::info!("adapter torn down");
    }
}

impl Drop for Adapter {
    fn drop(&mut self) {
        self.teardown();
    }
}
