//! Core options published to the host and parsed back into typed settings.
//!
//! The host stores values as strings; every option is declared with its
//! legal values and a default. Reading an option that the host does not know
//! or that holds an unparsable value leaves the current setting unchanged.

use crate::netplay::{NetplayConnection, NetplayMode, NetworkMode};

pub const RESOLUTIONS: [&str; 9] = ["1x", "2x", "3x", "4x", "5x", "6x", "8x", "10x", "12x"];
pub const LOBBY_REGIONS: [&str; 7] = ["EA", "CN", "EU", "NA", "SA", "OC", "AF"];
pub const DEFAULT_NETPLAY_PORT: u16 = 2626;
pub const MANUAL_ROOM: &str = "manual";
pub const MAX_VOLUME: i32 = 200;

/// One host-visible option. `values[0]` is the default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionDefinition {
    pub key: String,
    pub description: &'static str,
    pub values: Vec<String>,
}

impl OptionDefinition {
    /// Builds a definition, moving `default` to the front of `values` (or
    /// inserting it there when it is not one of them).
    pub fn new(
        key: String,
        description: &'static str,
        mut values: Vec<String>,
        default: &str,
    ) -> Self {
        match values.iter().position(|value| value == default) {
            Some(index) => values[..=index].rotate_right(1),
            None if !default.is_empty() => values.insert(0, default.to_owned()),
            None => {}
        }
        Self {
            key,
            description,
            values,
        }
    }

    pub fn default_value(&self) -> Option<&str> {
        self.values.first().map(String::as_str)
    }

    /// The `"Description; default|other|…"` form hosts expect.
    pub fn value_string(&self) -> String {
        format!("{}; {}", self.description, self.values.join("|"))
    }
}

/// Makes a free-form string safe to use as an option value.
pub fn sanitize_value(value: &str) -> String {
    value
        .chars()
        .map(|c| match c {
            '|' | ';' => '/',
            '\n' | '\r' => ' ',
            c => c,
        })
        .collect()
}

fn push_unique(values: &mut Vec<String>, value: String) {
    if !value.is_empty() && !values.contains(&value) {
        values.push(value);
    }
}

/// The configured port first, then the well-known port, then neighbours.
pub fn port_values(configured: u16) -> Vec<String> {
    let mut values = Vec::new();
    let mut add = |port: i32| {
        if (1..=i32::from(u16::MAX)).contains(&port) {
            push_unique(&mut values, port.to_string());
        }
    };
    add(i32::from(configured));
    add(i32::from(DEFAULT_NETPLAY_PORT));
    for delta in -2..=2 {
        add(i32::from(configured) + delta);
    }
    values
}

pub fn address_values(configured: &str) -> Vec<String> {
    let mut values = Vec::new();
    push_unique(&mut values, sanitize_value(configured));
    for fallback in ["127.0.0.1", "localhost", "192.168.0.1", "192.168.1.1", "10.0.0.1"] {
        push_unique(&mut values, fallback.to_owned());
    }
    values
}

fn enabled_disabled(enabled: bool) -> &'static str {
    if enabled { "enabled" } else { "disabled" }
}

fn strings<const N: usize>(values: [&str; N]) -> Vec<String> {
    values.into_iter().map(str::to_owned).collect()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ControllerSource {
    #[default]
    Emulated,
    Real,
    Disconnected,
}

impl ControllerSource {
    pub fn as_str(self) -> &'static str {
        match self {
            ControllerSource::Emulated => "emulated",
            ControllerSource::Real => "real",
            ControllerSource::Disconnected => "none",
        }
    }

    fn parse(value: &str) -> Option<Self> {
        match value {
            "emulated" => Some(ControllerSource::Emulated),
            "real" => Some(ControllerSource::Real),
            "none" => Some(ControllerSource::Disconnected),
            _ => None,
        }
    }
}

/// Settings the emulation core consumes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreSettings {
    pub internal_resolution: u32,
    pub widescreen_hack: bool,
    pub vsync: bool,
    pub dual_core: bool,
    pub dsp_hle: bool,
    pub sync_on_skip_idle: bool,
    pub cheats: bool,
    pub savestates: bool,
    pub audio_volume: i32,
    pub wiimote_speaker: bool,
    pub controllers: [ControllerSource; 4],
}

impl Default for CoreSettings {
    fn default() -> Self {
        Self {
            internal_resolution: 1,
            widescreen_hack: false,
            vsync: false,
            dual_core: false,
            dsp_hle: true,
            sync_on_skip_idle: true,
            cheats: false,
            savestates: true,
            audio_volume: 100,
            wiimote_speaker: false,
            controllers: [ControllerSource::Emulated; 4],
        }
    }
}

/// Settings the netplay controller consumes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetplaySettings {
    pub mode: NetplayMode,
    pub connection: NetplayConnection,
    pub address: String,
    pub connect_port: u16,
    pub host_port: u16,
    pub listen_port: u16,
    pub host_code: String,
    pub traversal_server: String,
    pub traversal_port: u16,
    pub traversal_port_alt: u16,
    pub lobby_room: String,
    pub lobby_advertise: bool,
    pub lobby_region: String,
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
    pub use_upnp: bool,
    pub enable_qos: bool,
}

impl Default for NetplaySettings {
    fn default() -> Self {
        Self {
            mode: NetplayMode::Disabled,
            connection: NetplayConnection::Direct,
            address: "127.0.0.1".into(),
            connect_port: DEFAULT_NETPLAY_PORT,
            host_port: DEFAULT_NETPLAY_PORT,
            listen_port: DEFAULT_NETPLAY_PORT,
            host_code: "00000000".into(),
            traversal_server: "localhost".into(),
            traversal_port: 6262,
            traversal_port_alt: 6226,
            lobby_room: MANUAL_ROOM.into(),
            lobby_advertise: false,
            lobby_region: "NA".into(),
            network_mode: NetworkMode::FixedDelay,
            buffer_size: 5,
            client_buffer_size: 1,
            savedata_load: true,
            savedata_write: true,
            savedata_sync_all: false,
            sync_codes: true,
            strict_settings_sync: false,
            record_inputs: false,
            golf_overlay: true,
            use_upnp: false,
            enable_qos: true,
        }
    }
}

/// Option edges that trigger netplay actions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NetplayEdges {
    /// `lobby_refresh` just became `yes`.
    pub refresh_rooms: bool,
    /// `start` just became `yes`.
    pub start_game: bool,
}

#[derive(Debug, Default)]
struct EdgeCache {
    refresh: String,
    start: String,
}

/// Typed view of the host's option store.
pub struct OptionStore {
    prefix: &'static str,
    core: CoreSettings,
    netplay: NetplaySettings,
    edges: EdgeCache,
}

impl OptionStore {
    pub fn new(prefix: &'static str) -> Self {
        Self {
            prefix,
            core: CoreSettings::default(),
            netplay: NetplaySettings::default(),
            edges: EdgeCache::default(),
        }
    }

    pub fn key(&self, name: &str) -> String {
        format!("{}_{}", self.prefix, name)
    }

    pub fn core(&self) -> &CoreSettings {
        &self.core
    }

    pub fn netplay(&self) -> &NetplaySettings {
        &self.netplay
    }

    pub fn force_cheats(&mut self) -> bool {
        !std::mem::replace(&mut self.core.cheats, true)
    }

    /// The full option menu, defaulting to the current settings.
    pub fn definitions(&self, room_labels: &[String]) -> Vec<OptionDefinition> {
        let core = &self.core;
        let net = &self.netplay;
        let def = |name: &str, description, values, default: &str| {
            OptionDefinition::new(self.key(name), description, values, default)
        };
        let toggle = |name: &str, description, value: bool| {
            def(
                name,
                description,
                strings(["disabled", "enabled"]),
                enabled_disabled(value),
            )
        };
        let sources = || strings(["emulated", "real", "none"]);
        let volumes = (0..=MAX_VOLUME).step_by(10).map(|v| v.to_string()).collect();

        let mut rooms = vec![MANUAL_ROOM.to_owned()];
        rooms.extend(room_labels.iter().cloned());

        vec![
            def(
                "internal_resolution",
                "Internal resolution",
                strings(RESOLUTIONS),
                &format!("{}x", core.internal_resolution),
            ),
            toggle("widescreen_hack", "Widescreen hack", core.widescreen_hack),
            toggle("vsync", "VSync", core.vsync),
            toggle("dual_core", "Dual core", core.dual_core),
            toggle("dsp_hle", "DSP HLE", core.dsp_hle),
            toggle("sync_on_skip_idle", "Sync on skip idle", core.sync_on_skip_idle),
            toggle("cheats", "Enable cheats", core.cheats),
            toggle("savestates", "Enable save states", core.savestates),
            def(
                "audio_volume",
                "Audio volume (%)",
                volumes,
                &core.audio_volume.to_string(),
            ),
            toggle("wiimote_speaker", "Controller speaker", core.wiimote_speaker),
            def("controller_1", "Controller 1 source", sources(), core.controllers[0].as_str()),
            def("controller_2", "Controller 2 source", sources(), core.controllers[1].as_str()),
            def("controller_3", "Controller 3 source", sources(), core.controllers[2].as_str()),
            def("controller_4", "Controller 4 source", sources(), core.controllers[3].as_str()),
            def(
                "netplay_mode",
                "Netplay mode",
                strings(["disabled", "host", "join"]),
                net.mode.as_str(),
            ),
            def(
                "netplay_connection",
                "Netplay connection",
                strings(["direct", "traversal", "lobby"]),
                net.connection.as_str(),
            ),
            def(
                "netplay_address",
                "Netplay address (direct join)",
                address_values(&net.address),
                &sanitize_value(&net.address),
            ),
            def(
                "netplay_connect_port",
                "Netplay connect port",
                port_values(net.connect_port),
                &net.connect_port.to_string(),
            ),
            def(
                "netplay_host_port",
                "Netplay host port",
                port_values(net.host_port),
                &net.host_port.to_string(),
            ),
            def(
                "netplay_listen_port",
                "Netplay traversal listen port",
                port_values(net.listen_port),
                &net.listen_port.to_string(),
            ),
            def(
                "netplay_host_code",
                "Netplay host code (traversal join)",
                {
                    let mut values = Vec::new();
                    push_unique(&mut values, sanitize_value(&net.host_code));
                    push_unique(&mut values, "00000000".into());
                    values
                },
                &sanitize_value(&net.host_code),
            ),
            def(
                "netplay_traversal_server",
                "Netplay traversal server",
                {
                    let mut values = Vec::new();
                    push_unique(&mut values, sanitize_value(&net.traversal_server));
                    push_unique(&mut values, "localhost".into());
                    values
                },
                &sanitize_value(&net.traversal_server),
            ),
            def(
                "netplay_traversal_port",
                "Netplay traversal port",
                port_values(net.traversal_port),
                &net.traversal_port.to_string(),
            ),
            def(
                "netplay_traversal_port_alt",
                "Netplay traversal port (alternate)",
                port_values(net.traversal_port_alt),
                &net.traversal_port_alt.to_string(),
            ),
            def("netplay_lobby_refresh", "Netplay lobby refresh", strings(["no", "yes"]), "no"),
            def("netplay_lobby_room", "Netplay lobby room", rooms, &net.lobby_room),
            toggle("netplay_lobby_advertise", "Netplay lobby advertise", net.lobby_advertise),
            def(
                "netplay_lobby_region",
                "Netplay lobby region",
                strings(LOBBY_REGIONS),
                &net.lobby_region,
            ),
            def("netplay_start", "Netplay start game", strings(["no", "yes"]), "no"),
            def(
                "netplay_network_mode",
                "Netplay network mode",
                strings(["fixeddelay", "hostinputauthority", "golf"]),
                net.network_mode.as_str(),
            ),
            def(
                "netplay_buffer_size",
                "Netplay buffer size",
                strings(["1", "2", "3", "4", "5", "6", "7", "8", "9", "10", "12", "15"]),
                &net.buffer_size.to_string(),
            ),
            def(
                "netplay_client_buffer_size",
                "Netplay client buffer size",
                strings(["1", "2", "3", "4", "5"]),
                &net.client_buffer_size.to_string(),
            ),
            toggle("netplay_savedata_load", "Netplay load save data", net.savedata_load),
            toggle("netplay_savedata_write", "Netplay write save data", net.savedata_write),
            toggle(
                "netplay_savedata_sync_all",
                "Netplay sync all saves",
                net.savedata_sync_all,
            ),
            toggle("netplay_sync_codes", "Netplay sync cheats", net.sync_codes),
            toggle(
                "netplay_strict_settings_sync",
                "Netplay strict settings sync",
                net.strict_settings_sync,
            ),
            toggle("netplay_record_inputs", "Netplay record inputs", net.record_inputs),
            toggle("netplay_golf_overlay", "Netplay golf overlay", net.golf_overlay),
            toggle("netplay_use_upnp", "Netplay use UPnP", net.use_upnp),
            toggle("netplay_enable_qos", "Netplay enable QoS", net.enable_qos),
        ]
    }

    /// Re-reads every core setting. Returns whether anything changed.
    pub fn apply_core(&mut self, lookup: impl Fn(&str) -> Option<String>) -> bool {
        let reader = Reader {
            prefix: self.prefix,
            lookup: &lookup,
        };
        let core = &mut self.core;
        let mut changed = false;

        changed |= reader.update(core_resolution, "internal_resolution", &mut core.internal_resolution);
        changed |= reader.toggle("widescreen_hack", &mut core.widescreen_hack);
        changed |= reader.toggle("vsync", &mut core.vsync);
        changed |= reader.toggle("dual_core", &mut core.dual_core);
        changed |= reader.toggle("dsp_hle", &mut core.dsp_hle);
        changed |= reader.toggle("sync_on_skip_idle", &mut core.sync_on_skip_idle);
        changed |= reader.toggle("cheats", &mut core.cheats);
        changed |= reader.toggle("savestates", &mut core.savestates);
        changed |= reader.update(
            |v| v.parse::<i32>().ok().map(|v| v.clamp(0, MAX_VOLUME)),
            "audio_volume",
            &mut core.audio_volume,
        );
        changed |= reader.toggle("wiimote_speaker", &mut core.wiimote_speaker);
        for (port, source) in core.controllers.iter_mut().enumerate() {
            let name = format!("controller_{}", port + 1);
            changed |= reader.update(ControllerSource::parse, &name, source);
        }

        if changed {
            tracing::debug!(settings = ?self.core, "core options changed");
        }
        changed
    }

    /// Re-reads every netplay setting. Returns whether anything changed.
    pub fn apply_netplay(&mut self, lookup: impl Fn(&str) -> Option<String>) -> bool {
        let reader = Reader {
            prefix: self.prefix,
            lookup: &lookup,
        };
        let net = &mut self.netplay;
        let any_string = |v: &str| Some(v.to_owned());
        let port = |v: &str| clamp_parse(v, 1, u32::from(u16::MAX)).map(|p| p as u16);
        let mut changed = false;

        changed |= reader.update(NetplayMode::parse, "netplay_mode", &mut net.mode);
        changed |= reader.update(NetplayConnection::parse, "netplay_connection", &mut net.connection);
        changed |= reader.update(any_string, "netplay_address", &mut net.address);
        changed |= reader.update(port, "netplay_connect_port", &mut net.connect_port);
        changed |= reader.update(port, "netplay_host_port", &mut net.host_port);
        changed |= reader.update(port, "netplay_listen_port", &mut net.listen_port);
        changed |= reader.update(any_string, "netplay_host_code", &mut net.host_code);
        changed |= reader.update(any_string, "netplay_traversal_server", &mut net.traversal_server);
        changed |= reader.update(port, "netplay_traversal_port", &mut net.traversal_port);
        changed |= reader.update(port, "netplay_traversal_port_alt", &mut net.traversal_port_alt);
        changed |= reader.update(any_string, "netplay_lobby_room", &mut net.lobby_room);
        changed |= reader.toggle("netplay_lobby_advertise", &mut net.lobby_advertise);
        changed |= reader.update(
            |v| LOBBY_REGIONS.contains(&v).then(|| v.to_owned()),
            "netplay_lobby_region",
            &mut net.lobby_region,
        );
        changed |= reader.toggle("netplay_savedata_load", &mut net.savedata_load);
        changed |= reader.toggle("netplay_savedata_write", &mut net.savedata_write);
        changed |= reader.toggle("netplay_savedata_sync_all", &mut net.savedata_sync_all);
        changed |= reader.toggle("netplay_sync_codes", &mut net.sync_codes);
        changed |= reader.toggle("netplay_strict_settings_sync", &mut net.strict_settings_sync);
        changed |= reader.toggle("netplay_record_inputs", &mut net.record_inputs);
        changed |= reader.toggle("netplay_golf_overlay", &mut net.golf_overlay);
        changed |= reader.toggle("netplay_use_upnp", &mut net.use_upnp);
        changed |= reader.toggle("netplay_enable_qos", &mut net.enable_qos);
        changed |= reader.update(NetworkMode::parse, "netplay_network_mode", &mut net.network_mode);
        changed |= reader.update(|v| clamp_parse(v, 1, 20), "netplay_buffer_size", &mut net.buffer_size);
        changed |= reader.update(
            |v| clamp_parse(v, 1, 5),
            "netplay_client_buffer_size",
            &mut net.client_buffer_size,
        );
        changed
    }

    /// Detects the refresh and start edges since the previous call.
    pub fn netplay_edges(&mut self, lookup: impl Fn(&str) -> Option<String>) -> NetplayEdges {
        let prefix = self.prefix;
        let edge = |name: &str, cache: &mut String| {
            let next = lookup(&format!("{prefix}_{name}")).unwrap_or_default();
            let rose = *cache != next && next == "yes";
            *cache = next;
            rose
        };
        let EdgeCache {
            mut refresh,
            mut start,
        } = std::mem::take(&mut self.edges);
        let edges = NetplayEdges {
            refresh_rooms: edge("netplay_lobby_refresh", &mut refresh),
            start_game: edge("netplay_start", &mut start),
        };
        self.edges = EdgeCache { refresh, start };
        edges
    }
}

fn core_resolution(value: &str) -> Option<u32> {
    value
        .strip_suffix('x')
        .unwrap_or(value)
        .parse()
        .ok()
        .filter(|scale| *scale > 0)
}

fn clamp_parse(value: &str, min: u32, max: u32) -> Option<u32> {
    value.trim().parse::<u32>().ok().map(|v| v.clamp(min, max))
}

struct Reader<'a, F: Fn(&str) -> Option<String>> {
    prefix: &'static str,
    lookup: &'a F,
}

impl<F: Fn(&str) -> Option<String>> Reader<'_, F> {
    fn update<T: PartialEq>(
        &self,
        parse: impl Fn(&str) -> Option<T>,
        name: &str,
        slot: &mut T,
    ) -> bool {
        let Some(raw) = (self.lookup)(&format!("{}_{}", self.prefix, name)) else {
            return false;
        };
        match parse(&raw) {
            Some(value) if value != *slot => {
                *slot = value;
                true
            }
            _ => false,
        }
    }

    fn toggle(&self, name: &str, slot: &mut bool) -> bool {
        self.update(|v| Some(v == "enabled"), name, slot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> + use<> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn default_rotates_to_front() {
        let def = OptionDefinition::new(
            "k".into(),
            "Desc",
            strings(["a", "b", "c", "d"]),
            "c",
        );
        assert_eq!(def.values, ["c", "a", "b", "d"]);
        assert_eq!(def.value_string(), "Desc; c|a|b|d");

        let missing = OptionDefinition::new("k".into(), "Desc", strings(["a"]), "z");
        assert_eq!(missing.values, ["z", "a"]);
    }

    #[test]
    fn port_values_are_deduplicated_and_bounded() {
        assert_eq!(port_values(2626), ["2626", "2624", "2625", "2627", "2628"]);
        assert_eq!(port_values(1), ["1", "2626", "2", "3"]);
        assert_eq!(port_values(65535)[..2], ["65535", "2626"]);
        assert!(port_values(65535).iter().all(|p| p.parse::<u32>().unwrap() <= 65535));
    }

    #[test]
    fn address_values_start_with_configured() {
        let values = address_values("host|name");
        assert_eq!(values[0], "host/name");
        assert_eq!(values.len(), 6);
        assert_eq!(address_values("localhost").len(), 5);
    }

    #[test]
    fn menu_is_prefixed_and_complete() {
        let store = OptionStore::new("lodestar");
        let defs = store.definitions(&["1: Room (GALE01) [2]".to_owned()]);
        assert!(defs.iter().all(|d| d.key.starts_with("lodestar_")));
        let volume = defs.iter().find(|d| d.key == "lodestar_audio_volume").unwrap();
        assert_eq!(volume.default_value(), Some("100"));
        assert_eq!(volume.values.len(), 21);
        let rooms = defs.iter().find(|d| d.key == "lodestar_netplay_lobby_room").unwrap();
        assert_eq!(rooms.values, ["manual", "1: Room (GALE01) [2]"]);
        let resolution = defs.iter().find(|d| d.key == "lodestar_internal_resolution").unwrap();
        assert_eq!(resolution.default_value(), Some("1x"));
    }

    #[test]
    fn core_options_parse_and_report_changes() {
        let mut store = OptionStore::new("lodestar");
        assert!(!store.apply_core(lookup(&[])));

        let host = lookup(&[
            ("lodestar_internal_resolution", "3x"),
            ("lodestar_vsync", "enabled"),
            ("lodestar_audio_volume", "250"),
            ("lodestar_controller_2", "none"),
            ("lodestar_controller_3", "bogus"),
        ]);
        assert!(store.apply_core(&host));
        let core = store.core();
        assert_eq!(core.internal_resolution, 3);
        assert!(core.vsync);
        assert_eq!(core.audio_volume, MAX_VOLUME);
        assert_eq!(core.controllers[1], ControllerSource::Disconnected);
        assert_eq!(core.controllers[2], ControllerSource::Emulated);

        assert!(!store.apply_core(&host));
    }

    #[test]
    fn netplay_ports_clamp() {
        let mut store = OptionStore::new("lodestar");
        let host = lookup(&[
            ("lodestar_netplay_mode", "host"),
            ("lodestar_netplay_host_port", "0"),
            ("lodestar_netplay_connect_port", "70000"),
            ("lodestar_netplay_buffer_size", "99"),
            ("lodestar_netplay_lobby_region", "XX"),
        ]);
        assert!(store.apply_netplay(&host));
        let net = store.netplay();
        assert_eq!(net.mode, NetplayMode::Host);
        assert_eq!(net.host_port, 1);
        assert_eq!(net.connect_port, 65535);
        assert_eq!(net.buffer_size, 20);
        assert_eq!(net.lobby_region, "NA");
    }

    #[test]
    fn edges_fire_once_per_transition() {
        let mut store = OptionStore::new("lodestar");
        let yes = lookup(&[("lodestar_netplay_start", "yes")]);
        let no = lookup(&[("lodestar_netplay_start", "no")]);

        assert!(store.netplay_edges(&yes).start_game);
        assert!(!store.netplay_edges(&yes).start_game);
        assert!(!store.netplay_edges(&no).start_game);
        assert!(store.netplay_edges(&yes).start_game);
        assert!(!store.netplay_edges(&yes).refresh_rooms);
    }

    #[test]
    fn forcing_cheats_reports_transition() {
        let mut store = OptionStore::new("lodestar");
        assert!(store.force_cheats());
        assert!(!store.force_cheats());
        assert!(store.core().cheats);
    }

    proptest! {
        #[test]
        fn sanitized_values_never_contain_separators(value in ".*") {
            let clean = sanitize_value(&value);
            prop_assert!(!clean.contains(['|', ';', '\n', '\r']));
            prop_assert_eq!(clean.chars().count(), value.chars().count());
        }
    }
}
