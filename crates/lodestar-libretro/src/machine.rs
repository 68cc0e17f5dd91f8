//! A reference machine that exercises the runtime without a real emulator:
//! it clears the host framebuffer to a color driven by the pads and plays a
//! sine tone.

use std::{
    f32::consts::TAU,
    num::NonZeroU32,
    sync::Arc,
};

use glow::HasContext;

use lodestar_runtime::{
    BootError, BootRequest, Button, Cheat, ContextGate, CoreSettings, EmulationCore, Mixer,
    PadState, SaveStateError,
    context::{GlContext, HostedBackend, platform_backend},
    input::PORTS,
};
use parking_lot::Mutex;

const TONE_HZ: f32 = 220.0;
const TONE_AMPLITUDE: f32 = 4_000.0;
const STATE_LEN: usize = 8;

pub(crate) struct ToneMixer {
    sample_rate: u32,
    phase: Mutex<f32>,
}

impl ToneMixer {
    pub(crate) fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            phase: Mutex::new(0.0),
        }
    }
}

impl Mixer for ToneMixer {
    fn mix(&self, buffer: &mut [i16], max_frames: usize) -> usize {
        let frames = max_frames.min(buffer.len() / 2);
        let step = TONE_HZ / self.sample_rate.max(1) as f32 * TAU;
        let mut phase = self.phase.lock();
        for frame in buffer[..frames * 2].chunks_exact_mut(2) {
            let value = (phase.sin() * TONE_AMPLITUDE) as i16;
            frame[0] = value;
            frame[1] = value;
            *phase = (*phase + step) % TAU;
        }
        frames
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}

pub(crate) struct TestPattern {
    graphics: Option<Arc<ContextGate>>,
    context: Option<Box<dyn GlContext>>,
    mixer: Arc<ToneMixer>,
    settings: CoreSettings,
    pads: [PadState; PORTS],
    frame: u64,
    cheats: usize,
}

impl TestPattern {
    pub(crate) fn new(sample_rate: u32) -> Self {
        Self {
            graphics: None,
            context: None,
            mixer: Arc::new(ToneMixer::new(sample_rate)),
            settings: CoreSettings::default(),
            pads: [PadState::default(); PORTS],
            frame: 0,
            cheats: 0,
        }
    }

    /// Creates a context for the live host context, replacing one whose
    /// snapshot went stale.
    fn ensure_context(&mut self) -> Option<&mut Box<dyn GlContext>> {
        let graphics = self.graphics.as_ref()?;
        let stale = self
            .context
            .as_ref()
            .is_none_or(|context| !context.surface().capabilities().is_current());
        if stale {
            self.context = match graphics.create_context(platform_backend().as_ref()) {
                Ok(context) => Some(context),
                Err(err) => {
                    tracing::debug!(error = %err, "falling back to the hosted context");
                    graphics.create_context(&HostedBackend).ok()
                }
            };
        }
        self.context.as_mut()
    }

    fn color(&self) -> [f32; 3] {
        let pad = &self.pads[0];
        let pulse = (self.frame % 120) as f32 / 120.0;
        [
            if pad.pressed(Button::A) { 1.0 } else { pulse },
            0.5 + pad.left[0] * 0.5,
            0.5 + pad.left[1] * 0.5,
        ]
    }

    fn render(&mut self) {
        let color = self.color();
        let scale = self.settings.internal_resolution.max(1);
        let Some(context) = self.ensure_context() else {
            return;
        };
        let capabilities = Arc::clone(context.surface().capabilities());
        let (width, height) = capabilities.base_size();
        let (width, height) = (width * scale, height * scale);

        if let Some(gl) = capabilities.gl() {
            let framebuffer = u32::try_from(capabilities.current_framebuffer())
                .ok()
                .and_then(NonZeroU32::new)
                .map(glow::NativeFramebuffer);
            // SAFETY: the host context is current on this thread during the tick.
            unsafe {
                gl.bind_framebuffer(glow::FRAMEBUFFER, framebuffer);
                gl.viewport(0, 0, width as i32, height as i32);
                gl.clear_color(color[0], color[1], color[2], 1.0);
                gl.clear(glow::COLOR_BUFFER_BIT);
            }
        }
        capabilities.present(width, height);
    }
}

impl EmulationCore for TestPattern {
    fn boot(&mut self, request: &BootRequest, graphics: &Arc<ContextGate>) -> Result<(), BootError> {
        std::fs::metadata(request.target()).map_err(|err| BootError::Core {
            origin: request.origin.label(),
            path: request.target.clone(),
            reason: err.to_string(),
        })?;
        self.graphics = Some(Arc::clone(graphics));
        self.frame = 0;
        if let Some(context) = self.ensure_context() {
            tracing::info!(size = ?context.backbuffer_size(), "test pattern context ready");
        }
        Ok(())
    }

    fn stop(&mut self) {
        self.context = None;
        self.graphics = None;
    }

    fn pump_jobs(&mut self) {
        self.render();
        self.frame = self.frame.wrapping_add(1);
    }

    fn save_state(&mut self) -> Result<Vec<u8>, SaveStateError> {
        Ok(self.frame.to_le_bytes().to_vec())
    }

    fn load_state(&mut self, state: &[u8]) -> Result<(), SaveStateError> {
        let bytes: [u8; STATE_LEN] = state
            .get(..STATE_LEN)
            .and_then(|bytes| bytes.try_into().ok())
            .ok_or_else(|| SaveStateError::Core(format!("expected {STATE_LEN} bytes")))?;
        self.frame = u64::from_le_bytes(bytes);
        Ok(())
    }

    fn apply_settings(&mut self, settings: &CoreSettings) {
        self.settings = settings.clone();
    }

    fn apply_cheats(&mut self, cheats: &[Cheat]) {
        self.cheats = cheats.iter().filter(|cheat| cheat.enabled).count();
        tracing::debug!(active = self.cheats, "cheats applied");
    }

    fn update_pads(&mut self, pads: &[PadState; PORTS]) {
        self.pads = *pads;
    }

    fn mixer(&self) -> Arc<dyn Mixer> {
        self.mixer.clone()
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use lodestar_runtime::{AdapterConfig, PresentHandoff, context::NullCapture};

    use super::*;

    fn gate() -> Arc<ContextGate> {
        Arc::new(ContextGate::new(
            &AdapterConfig::default(),
            Arc::new(PresentHandoff::new()),
            Box::new(NullCapture),
        ))
    }

    #[test]
    fn missing_content_fails_boot() {
        let mut machine = TestPattern::new(48_000);
        let err = machine
            .boot(&BootRequest::plain("/definitely/not/here.iso"), &gate())
            .unwrap_err();
        assert!(matches!(err, BootError::Core { origin: "Game", .. }));
    }

    #[test]
    fn boots_without_a_context() {
        let path: PathBuf = std::env::temp_dir().join("lodestar-test-pattern.iso");
        std::fs::write(&path, b"disc").unwrap();
        let mut machine = TestPattern::new(48_000);
        machine.boot(&BootRequest::plain(&path), &gate()).unwrap();
        machine.pump_jobs();
        assert!(machine.context.is_none());
        machine.stop();
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn state_restores_frame_counter() {
        let mut machine = TestPattern::new(48_000);
        machine.frame = 42;
        let state = machine.save_state().unwrap();
        machine.frame = 0;
        machine.load_state(&state).unwrap();
        assert_eq!(machine.frame, 42);
        assert!(machine.load_state(&[1, 2]).is_err());
    }

    #[test]
    fn tone_fills_requested_frames() {
        let mixer = ToneMixer::new(48_000);
        let mut buffer = vec![0i16; 64];
        assert_eq!(mixer.mix(&mut buffer, 16), 16);
        assert!(buffer[2..32].iter().any(|s| *s != 0));
        assert!(buffer[32..].iter().all(|s| *s == 0));
        assert_eq!(mixer.mix(&mut buffer, 100), 32);
    }
}
