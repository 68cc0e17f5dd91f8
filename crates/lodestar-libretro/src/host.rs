//! Glue between libretro-bridge handles and the runtime's host traits.

use std::{
    ffi::{CStr, c_void},
    sync::Arc,
};

use libretro_bridge::{
    Environment, Frame, HwContextListener, HwRenderInterface, RuntimeHandles, SharedAudio,
};
use lodestar_runtime::{AudioSink, ContextGate, Frontend, HostGraphics, OptionDefinition};

/// The interface the frontend filled in for our hardware context.
pub(crate) struct HostContext(HwRenderInterface);

impl HostGraphics for HostContext {
    fn proc_address(&self, name: &CStr) -> *const c_void {
        self.0.proc_address(name)
    }

    fn current_framebuffer(&self) -> usize {
        self.0.current_framebuffer()
    }

    fn is_gles(&self) -> bool {
        self.0.is_gles()
    }
}

/// Forwards the frontend's context notifications to the gate.
pub(crate) struct GateListener {
    pub(crate) gate: Arc<ContextGate>,
}

impl HwContextListener for GateListener {
    fn context_reset(&self, interface: &HwRenderInterface) {
        self.gate.on_context_reset(Arc::new(HostContext(*interface)));
    }

    fn context_destroy(&self) {
        self.gate.on_context_destroy();
    }
}

pub(crate) struct HostAudio(pub(crate) SharedAudio);

impl AudioSink for HostAudio {
    fn is_connected(&self) -> bool {
        self.0.current().is_connected()
    }

    fn deliver(&self, interleaved: &[i16]) -> usize {
        self.0.current().push_interleaved(interleaved)
    }
}

pub(crate) fn publish(env: &Environment, definitions: &[OptionDefinition]) -> bool {
    let pairs: Vec<(&str, String)> = definitions
        .iter()
        .map(|definition| (definition.key.as_str(), definition.value_string()))
        .collect();
    env.set_variables(&pairs)
}

/// The frontend as seen during one libretro call.
pub(crate) struct RetroFrontend<'a> {
    pub(crate) runtime: &'a RuntimeHandles,
}

impl Frontend for RetroFrontend<'_> {
    fn poll_input(&self) {
        if let Some(input) = self.runtime.input() {
            input.poll();
        }
    }

    fn input_state(&self, port: u32, device: u32, index: u32, id: u32) -> i16 {
        self.runtime
            .input()
            .map_or(0, |input| input.state(port, device, index, id))
    }

    fn submit_hw_frame(&self, width: u32, height: u32) {
        if let Some(video) = self.runtime.video() {
            video.submit(Frame::hardware(width, height));
        }
    }

    fn submit_placeholder_frame(&self) {
        if let Some(video) = self.runtime.video() {
            video.submit(Frame::duplicate());
        }
    }

    fn variable(&self, key: &str) -> Option<String> {
        self.runtime.environment()?.get_variable(key)
    }

    fn variables_updated(&self) -> bool {
        self.runtime
            .environment()
            .is_some_and(|env| env.variables_updated())
    }

    fn set_variables(&self, definitions: &[OptionDefinition]) -> bool {
        self.runtime
            .environment()
            .is_some_and(|env| publish(&env, definitions))
    }

    fn username(&self) -> Option<String> {
        self.runtime.environment()?.username()
    }
}
