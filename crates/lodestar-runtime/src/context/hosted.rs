use std::sync::Arc;

use super::{ContextBackend, GlContext, Surface};
use crate::{
    error::ContextError,
    gate::{GraphicsCapabilities, NativeContextCapture, NativeHandles},
};

/// Uses the host context as is: resolution goes through the host and making
/// current always succeeds while the host context is alive.
pub struct HostedBackend;

impl ContextBackend for HostedBackend {
    fn name(&self) -> &'static str {
        "hosted"
    }

    fn create(
        &self,
        capabilities: Arc<GraphicsCapabilities>,
    ) -> Result<Box<dyn GlContext>, ContextError> {
        Ok(Box::new(HostedContext {
            surface: Surface::new(capabilities),
            shared: false,
        }))
    }
}

struct HostedContext {
    surface: Surface,
    shared: bool,
}

impl GlContext for HostedContext {
    fn surface(&self) -> &Surface {
        &self.surface
    }

    fn surface_mut(&mut self) -> &mut Surface {
        &mut self.surface
    }

    fn make_current(&mut self) -> bool {
        self.surface.capabilities().is_current()
    }

    fn clear_current(&mut self) -> bool {
        true
    }

    fn create_shared(&self) -> Result<Box<dyn GlContext>, ContextError> {
        Ok(Box::new(HostedContext {
            surface: Surface::new(Arc::clone(self.surface.capabilities())),
            shared: true,
        }))
    }

    fn is_shared(&self) -> bool {
        self.shared
    }
}

/// Reports no native handles.
pub struct NullCapture;

impl NativeContextCapture for NullCapture {
    fn capture(&self) -> NativeHandles {
        NativeHandles::default()
    }
}
