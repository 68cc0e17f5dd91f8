//! Fakes shared by the integration tests.

#![allow(dead_code)]

use std::{
    collections::HashMap,
    ffi::{CStr, c_void},
    path::Path,
    ptr,
    sync::Arc,
};

use lodestar_runtime::{
    Adapter, AdapterConfig, BootError, BootRequest, Cheat, ContextGate, CoreSettings,
    EmulationCore, Frontend, HostGraphics, Mixer, OptionDefinition, PadState, SaveStateError,
    Services, context::NullCapture, input::PORTS, netplay::NetplayBackend,
};
use parking_lot::Mutex;

#[derive(Default)]
pub struct CoreLog {
    pub boots: Vec<BootRequest>,
    pub stops: usize,
    pub pumps: usize,
    pub settings: Vec<CoreSettings>,
    pub cheats: Vec<Vec<Cheat>>,
    pub pads: usize,
    pub loaded_states: Vec<Vec<u8>>,
    pub fail_boot: bool,
    pub state: Vec<u8>,
}

pub struct SilentMixer;

impl Mixer for SilentMixer {
    fn mix(&self, _buffer: &mut [i16], _max_frames: usize) -> usize {
        0
    }

    fn sample_rate(&self) -> u32 {
        0
    }
}

pub struct FakeCore {
    pub log: Arc<Mutex<CoreLog>>,
}

impl EmulationCore for FakeCore {
    fn boot(&mut self, request: &BootRequest, _graphics: &Arc<ContextGate>) -> Result<(), BootError> {
        let mut log = self.log.lock();
        log.boots.push(request.clone());
        if log.fail_boot {
            return Err(BootError::Core {
                origin: request.origin.label(),
                path: request.target.clone(),
                reason: "unreadable disc".into(),
            });
        }
        Ok(())
    }

    fn stop(&mut self) {
        self.log.lock().stops += 1;
    }

    fn pump_jobs(&mut self) {
        self.log.lock().pumps += 1;
    }

    fn save_state(&mut self) -> Result<Vec<u8>, SaveStateError> {
        Ok(self.log.lock().state.clone())
    }

    fn load_state(&mut self, state: &[u8]) -> Result<(), SaveStateError> {
        self.log.lock().loaded_states.push(state.to_vec());
        Ok(())
    }

    fn apply_settings(&mut self, settings: &CoreSettings) {
        self.log.lock().settings.push(settings.clone());
    }

    fn apply_cheats(&mut self, cheats: &[Cheat]) {
        self.log.lock().cheats.push(cheats.to_vec());
    }

    fn update_pads(&mut self, _pads: &[PadState; PORTS]) {
        self.log.lock().pads += 1;
    }

    fn mixer(&self) -> Arc<dyn Mixer> {
        Arc::new(SilentMixer)
    }
}

#[derive(Default)]
pub struct FrontendLog {
    pub hw_frames: Vec<(u32, u32)>,
    pub placeholders: usize,
    pub polls: usize,
    pub published: Vec<Vec<OptionDefinition>>,
}

#[derive(Default)]
pub struct FakeFrontend {
    pub log: Mutex<FrontendLog>,
    pub variables: Mutex<HashMap<String, String>>,
    pub updated: Mutex<bool>,
    pub username: Option<String>,
}

impl FakeFrontend {
    pub fn set(&self, key: &str, value: &str) {
        self.variables.lock().insert(key.to_owned(), value.to_owned());
        *self.updated.lock() = true;
    }
}

impl Frontend for FakeFrontend {
    fn poll_input(&self) {
        self.log.lock().polls += 1;
    }

    fn input_state(&self, _port: u32, _device: u32, _index: u32, _id: u32) -> i16 {
        0
    }

    fn submit_hw_frame(&self, width: u32, height: u32) {
        self.log.lock().hw_frames.push((width, height));
    }

    fn submit_placeholder_frame(&self) {
        self.log.lock().placeholders += 1;
    }

    fn variable(&self, key: &str) -> Option<String> {
        self.variables.lock().get(key).cloned()
    }

    fn variables_updated(&self) -> bool {
        std::mem::take(&mut *self.updated.lock())
    }

    fn set_variables(&self, definitions: &[OptionDefinition]) -> bool {
        self.log.lock().published.push(definitions.to_vec());
        true
    }

    fn username(&self) -> Option<String> {
        self.username.clone()
    }
}

pub struct FakeHost;

impl HostGraphics for FakeHost {
    fn proc_address(&self, _name: &CStr) -> *const c_void {
        ptr::null()
    }

    fn current_framebuffer(&self) -> usize {
        0
    }

    fn is_gles(&self) -> bool {
        false
    }
}

pub fn adapter_with(
    netplay: Option<Box<dyn NetplayBackend>>,
) -> (Adapter, Arc<Mutex<CoreLog>>) {
    let log = Arc::new(Mutex::new(CoreLog {
        state: vec![7; 64],
        ..Default::default()
    }));
    let core = FakeCore { log: log.clone() };
    let services = Services {
        netplay,
        capture: Box::new(NullCapture),
        ..Default::default()
    };
    let adapter =
        Adapter::new(AdapterConfig::default(), Box::new(core), services).expect("spawn adapter");
    (adapter, log)
}

pub fn adapter() -> (Adapter, Arc<Mutex<CoreLog>>) {
    adapter_with(None)
}

pub fn game() -> &'static Path {
    Path::new("/games/melee.iso")
}

pub fn running_adapter(frontend: &FakeFrontend) -> (Adapter, Arc<Mutex<CoreLog>>) {
    let (mut adapter, log) = adapter();
    adapter.context_reset(Arc::new(FakeHost));
    assert!(adapter.load_game(frontend, Some(game()), true));
    assert!(adapter.is_running());
    (adapter, log)
}
