//! Pbuffer-backed contexts for platforms that need an offscreen drawable.
//!
//! The algorithm is written against [`PbufferApi`] so the failure paths can be
//! exercised without a GPU. Handles are plain integers; zero means none.

use std::sync::Arc;

use super::{GlContext, Surface};
use crate::{config::CORE_PROFILE_VERSIONS, error::ContextError, gate::GraphicsCapabilities};

const PRIMARY_SIZE: i32 = 32;
const SHARED_SIZE: i32 = 1;

/// Platform calls needed to build a pbuffer context.
pub trait PbufferApi: Send + Sync {
    /// First required extension entry point that failed to resolve.
    fn missing_entry_point(&self) -> Option<&'static str>;

    fn choose_pixel_format(&self, dc: usize) -> Option<i32>;
    fn create_pbuffer(&self, dc: usize, pixel_format: i32, width: i32, height: i32)
    -> Option<usize>;
    fn pbuffer_dc(&self, pbuffer: usize) -> Option<usize>;
    fn release_pbuffer_dc(&self, pbuffer: usize, dc: usize);
    fn destroy_pbuffer(&self, pbuffer: usize);

    /// Whether versioned attribute-based creation is available at all.
    fn supports_core_contexts(&self) -> bool;
    /// Core-profile, forward-compatible context of exactly `version`.
    fn create_core_context(&self, dc: usize, share: usize, version: (u32, u32)) -> Option<usize>;
    fn create_legacy_context(&self, dc: usize) -> Option<usize>;
    fn share_lists(&self, share: usize, context: usize) -> bool;
    fn delete_context(&self, context: usize);

    fn make_current(&self, dc: usize, context: usize) -> bool;
}

pub struct OffscreenContext<A: PbufferApi> {
    api: Arc<A>,
    surface: Surface,
    share_dc: usize,
    pixel_format: i32,
    pbuffer: usize,
    dc: usize,
    context: usize,
    version: Option<(u32, u32)>,
    shared: bool,
}

impl<A: PbufferApi + 'static> OffscreenContext<A> {
    /// Creates the primary context, sharing objects with the host context
    /// named by the snapshot's native handles.
    pub fn create_primary(
        api: Arc<A>,
        capabilities: Arc<GraphicsCapabilities>,
    ) -> Result<Self, ContextError> {
        let native = capabilities.native();
        if native.display == 0 {
            return Err(ContextError::MissingNativeHandle("device context"));
        }
        if native.context == 0 {
            return Err(ContextError::MissingNativeHandle("context"));
        }
        Self::create(
            api,
            Surface::new(capabilities),
            native.display,
            native.context,
            None,
            PRIMARY_SIZE,
        )
    }

    fn create(
        api: Arc<A>,
        surface: Surface,
        share_dc: usize,
        share_context: usize,
        pixel_format: Option<i32>,
        size: i32,
    ) -> Result<Self, ContextError> {
        if let Some(name) = api.missing_entry_point() {
            return Err(ContextError::MissingEntryPoint(name));
        }

        let pixel_format = match pixel_format {
            Some(format) => format,
            None => api
                .choose_pixel_format(share_dc)
                .ok_or(ContextError::PixelFormat)?,
        };

        let pbuffer = api
            .create_pbuffer(share_dc, pixel_format, size, size)
            .ok_or(ContextError::Surface)?;
        let Some(dc) = api.pbuffer_dc(pbuffer) else {
            api.destroy_pbuffer(pbuffer);
            return Err(ContextError::Surface);
        };

        let (context, version) = match Self::create_context(&api, dc, share_context) {
            Ok(created) => created,
            Err(err) => {
                api.release_pbuffer_dc(pbuffer, dc);
                api.destroy_pbuffer(pbuffer);
                return Err(err);
            }
        };

        match version {
            Some((major, minor)) => tracing::info!(major, minor, "created GL core context"),
            None => tracing::info!("created legacy GL context"),
        }

        Ok(Self {
            api,
            surface,
            share_dc,
            pixel_format,
            pbuffer,
            dc,
            context,
            version,
            shared: false,
        })
    }

    fn create_context(
        api: &A,
        dc: usize,
        share: usize,
    ) -> Result<(usize, Option<(u32, u32)>), ContextError> {
        if api.supports_core_contexts() {
            for version in CORE_PROFILE_VERSIONS {
                if let Some(context) = api.create_core_context(dc, share, version) {
                    return Ok((context, Some(version)));
                }
            }
            tracing::warn!("no core profile available, falling back to a legacy context");
        }

        let context = api
            .create_legacy_context(dc)
            .ok_or(ContextError::ContextCreation)?;
        if share != 0 && !api.share_lists(share, context) {
            api.delete_context(context);
            return Err(ContextError::ShareLists);
        }
        Ok((context, None))
    }

    pub fn version(&self) -> Option<(u32, u32)> {
        self.version
    }

    pub fn pixel_format(&self) -> i32 {
        self.pixel_format
    }
}

impl<A: PbufferApi + 'static> GlContext for OffscreenContext<A> {
    fn surface(&self) -> &Surface {
        &self.surface
    }

    fn surface_mut(&mut self) -> &mut Surface {
        &mut self.surface
    }

    fn make_current(&mut self) -> bool {
        self.api.make_current(self.dc, self.context)
    }

    fn clear_current(&mut self) -> bool {
        self.api.make_current(0, 0)
    }

    fn create_shared(&self) -> Result<Box<dyn GlContext>, ContextError> {
        let mut shared = Self::create(
            Arc::clone(&self.api),
            Surface::new(Arc::clone(self.surface.capabilities())),
            self.share_dc,
            self.context,
            Some(self.pixel_format),
            SHARED_SIZE,
        )?;
        shared.shared = true;
        Ok(Box::new(shared))
    }

    fn is_shared(&self) -> bool {
        self.shared
    }
}

impl<A: PbufferApi> Drop for OffscreenContext<A> {
    fn drop(&mut self) {
        self.api.delete_context(self.context);
        self.api.release_pbuffer_dc(self.pbuffer, self.dc);
        self.api.destroy_pbuffer(self.pbuffer);
    }
}
