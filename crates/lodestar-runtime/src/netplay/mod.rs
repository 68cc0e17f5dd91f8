//! Netplay session wiring: mode and connection settings, the backend seam,
//! lobby room bookkeeping and the controller that drives sessions from the
//! host's tick.

mod controller;
mod lobby;

use std::path::Path;

use crossbeam_channel::Receiver;

pub use controller::NetplayController;
pub use lobby::{LobbyRoom, MAX_LISTED_ROOMS, RoomMethod};

use crate::{boot::BootSession, emulation::GameIdentity, error::NetplayError};

pub const LOCAL_ADDRESS: &str = "127.0.0.1";
pub const DEFAULT_NICKNAME: &str = "Player";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum NetplayMode {
    #[default]
    Disabled,
    Host,
    Join,
}

impl NetplayMode {
    pub fn as_str(self) -> &'static str {
        match self {
            NetplayMode::Disabled => "disabled",
            NetplayMode::Host => "host",
            NetplayMode::Join => "join",
        }
    }

    pub(crate) fn parse(value: &str) -> Option<Self> {
        match value {
            "disabled" => Some(NetplayMode::Disabled),
            "host" => Some(NetplayMode::Host),
            "join" => Some(NetplayMode::Join),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum NetplayConnection {
    #[default]
    Direct,
    Traversal,
    Lobby,
}

impl NetplayConnection {
    pub fn as_str(self) -> &'static str {
        match self {
            NetplayConnection::Direct => "direct",
            NetplayConnection::Traversal => "traversal",
            NetplayConnection::Lobby => "lobby",
        }
    }

    pub(crate) fn parse(value: &str) -> Option<Self> {
        match value {
            "direct" => Some(NetplayConnection::Direct),
            "traversal" => Some(NetplayConnection::Traversal),
            "lobby" => Some(NetplayConnection::Lobby),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum NetworkMode {
    #[default]
    FixedDelay,
    HostInputAuthority,
    Golf,
}

impl NetworkMode {
    pub fn as_str(self) -> &'static str {
        match self {
            NetworkMode::FixedDelay => "fixeddelay",
            NetworkMode::HostInputAuthority => "hostinputauthority",
            NetworkMode::Golf => "golf",
        }
    }

    pub(crate) fn parse(value: &str) -> Option<Self> {
        match value {
            "fixeddelay" => Some(NetworkMode::FixedDelay),
            "hostinputauthority" => Some(NetworkMode::HostInputAuthority),
            "golf" => Some(NetworkMode::Golf),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraversalConfig {
    pub server: String,
    pub port: u16,
    pub port_alt: u16,
}

/// Options every session shares, whichever side it is on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOptions {
    pub network_mode: NetworkMode,
    pub buffer_size: u32,
    pub client_buffer_size: u32,
    pub savedata_load: bool,
    pub savedata_write: bool,
    pub savedata_sync_all: bool,
    pub sync_codes: bool,
    pub strict_settings_sync: bool,
    pub record_inputs: bool,
    pub golf_overlay: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostParams {
    pub port: u16,
    pub traversal: Option<TraversalConfig>,
    pub use_upnp: bool,
    pub enable_qos: bool,
    /// Room name when advertising on the lobby.
    pub advertise: Option<String>,
    pub region: String,
    pub game: GameIdentity,
    pub options: SessionOptions,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinParams {
    /// IP address, host name or traversal host code.
    pub address: String,
    pub port: u16,
    pub traversal: Option<TraversalConfig>,
    pub nickname: String,
}

/// Notifications a client session raises from its own threads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetplayEvent {
    PlayerJoined(String),
    PlayerLeft(String),
    GameChanged { name: String, game_id: String },
    /// The host started the game; the client should boot it.
    StartGame,
    /// The host stopped the game.
    StopGame,
    Desync { frame: u64, player: String },
    ConnectionLost,
    Message(String),
}

/// A hosted server. Dropping it shuts the server down.
pub trait NetplayServer: Send {
    fn port(&self) -> u16;
    fn change_game(&mut self, game: &GameIdentity);
    fn request_start_game(&mut self);
}

/// A connected client.
pub trait NetplaySession: Send {
    fn stop(&mut self);
    /// Resolves the boot parameters for `target` once the host started.
    fn start_game(&mut self, target: &Path) -> Result<BootSession, NetplayError>;
    fn events(&self) -> Receiver<NetplayEvent>;
}

/// Creates servers and clients, and talks to the lobby.
pub trait NetplayBackend: Send {
    fn host(&mut self, params: &HostParams) -> Result<Box<dyn NetplayServer>, NetplayError>;
    fn join(&mut self, params: &JoinParams) -> Result<Box<dyn NetplaySession>, NetplayError>;
    fn list_rooms(&mut self, region: &str) -> Result<Vec<LobbyRoom>, NetplayError>;

    /// Reveals the server id of a password protected room.
    fn decrypt_server_id(&self, _room: &LobbyRoom, _password: &str) -> Option<String> {
        None
    }
}
