use std::path::Path;

use crossbeam_channel::{Receiver, TryRecvError};
use parking_lot::Mutex;

use super::{
    DEFAULT_NICKNAME, HostParams, JoinParams, LOCAL_ADDRESS, NetplayBackend, NetplayConnection,
    NetplayEvent, NetplayMode, NetplayServer, NetplaySession, RoomMethod, SessionOptions,
    TraversalConfig, lobby::Lobby,
};
use crate::{
    boot::BootSession,
    emulation::GameIdentity,
    error::NetplayError,
    options::{MANUAL_ROOM, NetplaySettings},
    shared::SharedState,
};

struct ActiveSession {
    server: Option<Box<dyn NetplayServer>>,
    client: Box<dyn NetplaySession>,
    events: Receiver<NetplayEvent>,
}

/// Owns the netplay session, if any, for the adapter.
///
/// Everything here runs on the host thread; session threads only reach it
/// through the event channel drained once per tick.
pub struct NetplayController {
    backend: Option<Box<dyn NetplayBackend>>,
    active: Option<ActiveSession>,
    lobby: Lobby,
    selected_game: Mutex<Option<GameIdentity>>,
    lobby_password: String,
}

impl NetplayController {
    pub fn new(backend: Option<Box<dyn NetplayBackend>>) -> Self {
        Self {
            backend,
            active: None,
            lobby: Lobby::default(),
            selected_game: Mutex::new(None),
            lobby_password: String::new(),
        }
    }

    /// Password used for protected lobby rooms.
    pub fn set_lobby_password(&mut self, password: impl Into<String>) {
        self.lobby_password = password.into();
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    pub fn is_hosting(&self) -> bool {
        self.active
            .as_ref()
            .is_some_and(|active| active.server.is_some())
    }

    pub fn room_labels(&self) -> Vec<String> {
        self.lobby.labels()
    }

    pub fn selected_game(&self) -> Option<GameIdentity> {
        self.selected_game.lock().clone()
    }

    pub fn start_session(
        &mut self,
        settings: &NetplaySettings,
        game: &GameIdentity,
        nickname: Option<&str>,
    ) -> Result<(), NetplayError> {
        if settings.mode == NetplayMode::Disabled {
            return Err(NetplayError::Disabled);
        }
        self.close_session();
        self.selected_game.lock().take();
        let nickname = nickname
            .filter(|name| !name.is_empty())
            .unwrap_or(DEFAULT_NICKNAME)
            .to_owned();

        let active = match settings.mode {
            NetplayMode::Host => self.host(settings, game, nickname)?,
            _ => {
                let params = self.join_target(settings, nickname)?;
                let backend = self.backend.as_mut().ok_or(NetplayError::Unavailable)?;
                tracing::info!(address = %params.address, port = params.port, "joining netplay session");
                let client = backend.join(&params)?;
                ActiveSession {
                    server: None,
                    events: client.events(),
                    client,
                }
            }
        };
        self.active = Some(active);
        Ok(())
    }

    fn host(
        &mut self,
        settings: &NetplaySettings,
        game: &GameIdentity,
        nickname: String,
    ) -> Result<ActiveSession, NetplayError> {
        let backend = self.backend.as_mut().ok_or(NetplayError::Unavailable)?;
        let traversal = settings.connection == NetplayConnection::Traversal;
        let params = HostParams {
            port: if traversal {
                settings.listen_port
            } else {
                settings.host_port
            },
            traversal: traversal.then(|| traversal_config(settings)),
            use_upnp: settings.use_upnp,
            enable_qos: settings.enable_qos,
            advertise: settings.lobby_advertise.then(|| game.name.clone()),
            region: settings.lobby_region.clone(),
            game: game.clone(),
            options: session_options(settings),
        };
        tracing::info!(port = params.port, traversal, "hosting netplay session");
        let mut server = backend.host(&params)?;
        server.change_game(game);

        let client = backend.join(&JoinParams {
            address: LOCAL_ADDRESS.to_owned(),
            port: server.port(),
            traversal: None,
            nickname,
        })?;
        *self.selected_game.lock() = Some(game.clone());
        Ok(ActiveSession {
            server: Some(server),
            events: client.events(),
            client,
        })
    }

    fn join_target(
        &self,
        settings: &NetplaySettings,
        nickname: String,
    ) -> Result<JoinParams, NetplayError> {
        let direct = |address: String, port| JoinParams {
            address,
            port,
            traversal: None,
            nickname: nickname.clone(),
        };
        let via_traversal = |address: String| JoinParams {
            address,
            port: settings.connect_port,
            traversal: Some(traversal_config(settings)),
            nickname: nickname.clone(),
        };

        match settings.connection {
            NetplayConnection::Direct => Ok(direct(settings.address.clone(), settings.connect_port)),
            NetplayConnection::Traversal => Ok(via_traversal(settings.host_code.clone())),
            NetplayConnection::Lobby => {
                if settings.lobby_room.is_empty() || settings.lobby_room == MANUAL_ROOM {
                    return Err(NetplayError::RoomNotSelected);
                }
                let room = self
                    .lobby
                    .find(&settings.lobby_room)
                    .ok_or_else(|| NetplayError::RoomNotFound(settings.lobby_room.clone()))?;
                let server_id = if room.has_password {
                    let backend = self.backend.as_ref().ok_or(NetplayError::Unavailable)?;
                    if self.lobby_password.is_empty() {
                        return Err(NetplayError::Password);
                    }
                    backend
                        .decrypt_server_id(&room, &self.lobby_password)
                        .ok_or(NetplayError::Password)?
                } else {
                    room.server_id.clone()
                };
                Ok(match room.method {
                    RoomMethod::Traversal => via_traversal(server_id),
                    RoomMethod::Direct => direct(server_id, room.port),
                })
            }
        }
    }

    fn close_session(&mut self) {
        if let Some(mut active) = self.active.take() {
            tracing::info!(hosting = active.server.is_some(), "closing netplay session");
            active.client.stop();
        }
    }

    /// Ends any session and forgets lobby state.
    pub fn shutdown(&mut self) {
        self.close_session();
        self.lobby.clear();
        self.selected_game.lock().take();
    }

    pub fn refresh_rooms(&mut self, region: &str) -> Result<usize, NetplayError> {
        let backend = self.backend.as_mut().ok_or(NetplayError::Unavailable)?;
        let rooms = backend.list_rooms(region)?;
        let count = self.lobby.replace(rooms);
        tracing::info!(region, count, "lobby rooms refreshed");
        Ok(count)
    }

    /// Asks the hosted server to start. False when not hosting.
    pub fn request_start(&mut self) -> bool {
        match self.active.as_mut().and_then(|active| active.server.as_mut()) {
            Some(server) => {
                server.request_start_game();
                true
            }
            None => false,
        }
    }

    /// Turns session events into adapter flags.
    pub(crate) fn drain_events(&self, shared: &SharedState) {
        let Some(active) = &self.active else {
            return;
        };
        loop {
            match active.events.try_recv() {
                Ok(event) => self.handle_event(event, shared),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    tracing::debug!("netplay event channel closed");
                    break;
                }
            }
        }
    }

    fn handle_event(&self, event: NetplayEvent, shared: &SharedState) {
        match event {
            NetplayEvent::StartGame => shared.request_start(),
            NetplayEvent::StopGame => {
                tracing::warn!("netplay host stopped the game");
                shared.request_stop();
            }
            NetplayEvent::Desync { frame, player } => {
                tracing::warn!(frame, %player, "netplay desync, stopping");
                shared.request_stop();
            }
            NetplayEvent::ConnectionLost => {
                tracing::warn!("netplay connection lost");
                shared.request_stop();
            }
            NetplayEvent::GameChanged { name, game_id } => {
                tracing::info!(%name, %game_id, "netplay game selected");
                *self.selected_game.lock() = Some(GameIdentity { game_id, name });
            }
            NetplayEvent::PlayerJoined(name) => tracing::info!(%name, "netplay player joined"),
            NetplayEvent::PlayerLeft(name) => tracing::info!(%name, "netplay player left"),
            NetplayEvent::Message(text) => tracing::info!(%text, "netplay"),
        }
    }

    /// Obtains boot parameters for `target` from the session.
    pub fn start_game(
        &mut self,
        target: &Path,
        loaded: &GameIdentity,
    ) -> Result<BootSession, NetplayError> {
        let active = self.active.as_mut().ok_or(NetplayError::Disabled)?;
        if let Some(selected) = self
            .selected_game
            .lock()
            .as_ref()
            .filter(|selected| !selected.game_id.is_empty())
        {
            if selected.game_id != loaded.game_id {
                tracing::warn!(
                    selected = %selected.game_id,
                    loaded = %loaded.game_id,
                    "netplay game mismatch"
                );
                return Err(NetplayError::GameMismatch);
            }
        }
        active.client.start_game(target)
    }
}

fn traversal_config(settings: &NetplaySettings) -> TraversalConfig {
    TraversalConfig {
        server: settings.traversal_server.clone(),
        port: settings.traversal_port,
        port_alt: settings.traversal_port_alt,
    }
}

fn session_options(settings: &NetplaySettings) -> SessionOptions {
    SessionOptions {
        network_mode: settings.network_mode,
        buffer_size: settings.buffer_size,
        client_buffer_size: settings.client_buffer_size,
        savedata_load: settings.savedata_load,
        savedata_write: settings.savedata_write,
        savedata_sync_all: settings.savedata_sync_all,
        sync_codes: settings.sync_codes,
        strict_settings_sync: settings.strict_settings_sync,
        record_inputs: settings.record_inputs,
        golf_overlay: settings.golf_overlay,
    }
}
