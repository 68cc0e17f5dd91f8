//! Libretro core built on `lodestar-runtime`.
//!
//! The frontend owns the OpenGL context; this crate forwards its entry
//! points to an [`Adapter`] and runs a reference test-pattern machine.

mod host;
mod machine;

use std::sync::Arc;

use libretro_bridge::{
    GameGeometry, GameInfo, HwRenderRequest, LibretroCore, LoadGameError, RuntimeHandles,
    SerializeError, SystemAvInfo, SystemInfo, SystemTiming, export_libretro_core, logging, raw,
};
use lodestar_runtime::{Adapter, AdapterConfig, OptionStore, SaveStateError, Services};

use crate::{
    host::{GateListener, HostAudio, RetroFrontend},
    machine::TestPattern,
};

const LOG_TAG: &str = "lodestar";
const LOG_FILTER_ENV: &str = "LODESTAR_LOG";
const EXTENSIONS: &str = "iso|gcm|gcz|wbfs|ciso|wad|elf|dol|rvz";

struct LodestarCore {
    adapter: Option<Adapter>,
}

impl LodestarCore {
    fn adapter(&mut self) -> Option<&mut Adapter> {
        self.adapter.as_mut()
    }
}

fn to_serialize_error(err: SaveStateError) -> SerializeError {
    match err {
        SaveStateError::BufferTooSmall { required, .. } => {
            SerializeError::BufferTooSmall { required }
        }
        SaveStateError::Core(message) => SerializeError::Message(message),
        SaveStateError::NotRunning | SaveStateError::Disabled | SaveStateError::Empty => {
            SerializeError::Unsupported
        }
    }
}

impl LibretroCore for LodestarCore {
    fn construct() -> Self
    where
        Self: Sized,
    {
        let config = AdapterConfig::default();
        let machine = TestPattern::new(config.sample_rate);
        let adapter = match Adapter::new(config, Box::new(machine), Services::default()) {
            Ok(adapter) => Some(adapter),
            Err(err) => {
                tracing::error!(error = %err, "failed to start the audio thread");
                None
            }
        };
        Self { adapter }
    }

    fn system_info() -> SystemInfo {
        SystemInfo::new("Lodestar", env!("CARGO_PKG_VERSION"))
            .with_extensions(EXTENSIONS)
            .need_fullpath(true)
    }

    fn environment_installed(runtime: &mut RuntimeHandles)
    where
        Self: Sized,
    {
        let Some(env) = runtime.environment() else {
            return;
        };
        logging::install(env.log_interface(), LOG_TAG, LOG_FILTER_ENV);
        let defaults = OptionStore::new(AdapterConfig::default().option_prefix).definitions(&[]);
        host::publish(&env, &defaults);
    }

    fn init(&mut self, runtime: &mut RuntimeHandles) {
        if let Some(adapter) = self.adapter() {
            adapter.set_audio_sink(Some(Arc::new(HostAudio(runtime.shared_audio()))));
        }
    }

    fn deinit(&mut self) {
        if let Some(mut adapter) = self.adapter.take() {
            adapter.teardown();
        }
    }

    fn run(&mut self, runtime: &mut RuntimeHandles) {
        if let Some(adapter) = self.adapter.as_mut() {
            adapter.tick(&RetroFrontend { runtime });
        }
    }

    fn system_av_info(&mut self) -> SystemAvInfo {
        let config = AdapterConfig::default();
        let scale = self
            .adapter()
            .map_or(1, |adapter| adapter.options().core().internal_resolution.max(1));
        SystemAvInfo {
            geometry: GameGeometry {
                base_width: config.base_width,
                base_height: config.base_height,
                max_width: config.base_width * scale,
                max_height: config.base_height * scale,
                aspect_ratio: config.aspect_ratio,
            },
            timing: SystemTiming {
                fps: config.fps,
                sample_rate: f64::from(config.sample_rate),
            },
        }
    }

    fn load_game(
        &mut self,
        runtime: &mut RuntimeHandles,
        game: &GameInfo<'_>,
    ) -> Result<(), LoadGameError> {
        let Some(adapter) = self.adapter.as_mut() else {
            return Err(LoadGameError::Message("runtime unavailable".into()));
        };
        let path = game.path.as_deref().ok_or(LoadGameError::MissingContent)?;
        let env = runtime
            .environment()
            .ok_or_else(|| LoadGameError::HardwareUnavailable("an environment callback".into()))?;
        if !env.set_pixel_format(raw::RETRO_PIXEL_FORMAT_XRGB8888) {
            tracing::warn!("frontend rejected XRGB8888");
        }
        env.set_hw_shared_context();

        let listener = Arc::new(GateListener {
            gate: Arc::clone(adapter.gate()),
        });
        let hw_render = runtime
            .hw_render()
            .and_then(|hw| hw.enable(HwRenderRequest::opengl_core(3, 3), listener))
            .is_some();

        let frontend = RetroFrontend { runtime };
        if adapter.load_game(&frontend, Some(path), hw_render) {
            return Ok(());
        }
        if !hw_render {
            return Err(LoadGameError::HardwareUnavailable(
                "an OpenGL 3.3 core context".into(),
            ));
        }
        Err(LoadGameError::Message(format!(
            "failed to load {}",
            path.display()
        )))
    }

    fn unload_game(&mut self) {
        if let Some(adapter) = self.adapter() {
            adapter.unload_game();
        }
    }

    fn serialize_size(&mut self) -> usize {
        self.adapter().map_or(0, Adapter::serialize_size)
    }

    fn serialize(&mut self, dst: &mut [u8]) -> Result<usize, SerializeError> {
        let adapter = self.adapter().ok_or(SerializeError::Unsupported)?;
        adapter.serialize(dst).map_err(to_serialize_error)
    }

    fn unserialize(&mut self, src: &[u8]) -> Result<(), SerializeError> {
        let adapter = self.adapter().ok_or(SerializeError::Unsupported)?;
        adapter.unserialize(src).map_err(to_serialize_error)
    }

    fn cheat_reset(&mut self) {
        if let Some(adapter) = self.adapter() {
            adapter.cheat_reset();
        }
    }

    fn cheat_set(&mut self, index: u32, enabled: bool, code: &str) {
        if let Some(adapter) = self.adapter() {
            // Invalid cheats are logged and skipped.
            let _ = adapter.cheat_set(index as usize, enabled, code);
        }
    }
}

export_libretro_core!(LodestarCore);
