use crate::{
    core::{GameInfo, LibretroCore, SerializeError, SystemInfo, c_str_to_string},
    raw,
    runtime::{AudioCallbacks, CallbackSet, HwBinding, HwTrampolines, RuntimeHandles},
};
use parking_lot::Mutex;
use std::{
    ffi::{CString, c_char, c_void},
    ptr, slice,
    sync::Arc,
};

#[doc(hidden)]
pub struct CoreInstance<T: LibretroCore> {
    callbacks: Mutex<CallbackSet>,
    audio: Arc<AudioCallbacks>,
    hw: Arc<HwBinding>,
    core: Mutex<Option<T>>,
    system_info: SystemInfoCache,
}

impl<T: LibretroCore> CoreInstance<T> {
    pub fn new(trampolines: HwTrampolines) -> Self {
        Self {
            callbacks: Mutex::new(CallbackSet::default()),
            audio: Arc::new(AudioCallbacks::default()),
            hw: Arc::new(HwBinding::new(trampolines)),
            core: Mutex::new(None),
            system_info: SystemInfoCache::from_info(T::system_info()),
        }
    }

    fn runtime(&self) -> RuntimeHandles {
        let callbacks = *self.callbacks.lock();
        RuntimeHandles::new(callbacks, Arc::clone(&self.audio), Arc::clone(&self.hw))
    }

    pub fn set_environment(&self, cb: raw::retro_environment_t) {
        self.callbacks.lock().set_environment(cb);
        if cb.is_some() {
            T::environment_installed(&mut self.runtime());
        }
    }

    pub fn set_video_refresh(&self, cb: raw::retro_video_refresh_t) {
        self.callbacks.lock().set_video(cb);
    }

    pub fn set_audio_sample(&self, cb: raw::retro_audio_sample_t) {
        self.audio.set_sample(cb);
    }

    pub fn set_audio_batch(&self, cb: raw::retro_audio_sample_batch_t) {
        self.audio.set_batch(cb);
    }

    pub fn set_input_poll(&self, cb: raw::retro_input_poll_t) {
        self.callbacks.lock().set_input_poll(cb);
    }

    pub fn set_input_state(&self, cb: raw::retro_input_state_t) {
        self.callbacks.lock().set_input_state(cb);
    }

    pub fn init(&self) {
        let mut guard = self.core.lock();
        if guard.is_some() {
            tracing::warn!("retro_init called while the core is still active");
            return;
        }

        let mut core = T::construct();
        core.init(&mut self.runtime());
        *guard = Some(core);
    }

    pub fn deinit(&self) {
        let core = self.core.lock().take();
        if let Some(mut core) = core {
            core.deinit();
        }
        self.hw.clear();
    }

    pub fn api_version(&self) -> u32 {
        T::api_version()
    }

    /// Frontend notification that a hardware context was (re)created.
    ///
    /// Does not touch the core lock so it is safe from any thread.
    pub fn hw_context_reset(&self) {
        self.hw.context_reset();
    }

    pub fn hw_context_destroy(&self) {
        self.hw.context_destroy();
    }

    /// Writes cached [`SystemInfo`](crate::SystemInfo) into the raw structure.
    ///
    /// # Safety
    /// The `info` pointer must be valid for writes and properly aligned.
    pub unsafe fn system_info(&self, info: *mut raw::retro_system_info) {
        if info.is_null() {
            return;
        }

        unsafe {
            self.system_info.write_into(&mut *info);
        }
    }

    /// Writes [`SystemAvInfo`](crate::SystemAvInfo) into the raw structure.
    ///
    /// # Safety
    /// The `info` pointer must be valid for writes and properly aligned.
    pub unsafe fn system_av_info(&self, info: *mut raw::retro_system_av_info) {
        if info.is_null() {
            return;
        }

        let av_info = self
            .with_core_mut(|core| core.system_av_info().to_raw())
            .unwrap_or_default();
        unsafe {
            *info = av_info;
        }
    }

    pub fn reset(&self) {
        self.with_core_mut(|core| core.reset());
    }

    pub fn run(&self) {
        let mut runtime = self.runtime();
        self.with_core_mut(|core| core.run(&mut runtime));
    }

    /// Loads a single piece of content.
    ///
    /// # Safety
    /// The pointer passed in must be null or reference a valid `retro_game_info`.
    pub unsafe fn load_game(&self, info: *const raw::retro_game_info) -> bool {
        let game = unsafe { GameInfo::from_ptr(info) };
        let mut runtime = self.runtime();
        match self.with_core_mut(|core| core.load_game(&mut runtime, &game)) {
            Some(Ok(())) => true,
            Some(Err(err)) => {
                tracing::error!(error = %err, "load_game failed");
                false
            }
            None => false,
        }
    }

    /// Loads multi-part or special content.
    ///
    /// # Safety
    /// The pointer passed in must reference an array of `retro_game_info`
    /// structures with `count` elements.
    pub unsafe fn load_game_special(
        &self,
        ty: u32,
        info: *const raw::retro_game_info,
        count: usize,
    ) -> bool {
        let games = unsafe {
            if info.is_null() || count == 0 {
                Vec::new()
            } else {
                GameInfo::from_slice(slice::from_raw_parts(info, count))
            }
        };

        matches!(
            self.with_core_mut(|core| core.load_game_special(ty, &games)),
            Some(Ok(()))
        )
    }

    pub fn unload_game(&self) {
        self.with_core_mut(|core| core.unload_game());
    }

    pub fn serialize_size(&self) -> usize {
        self.with_core_mut(|core| core.serialize_size())
            .unwrap_or(0)
    }

    /// Serializes the core into the provided buffer.
    ///
    /// # Safety
    /// The `data` pointer must be valid for `len` mutable bytes.
    pub unsafe fn serialize(&self, data: *mut c_void, len: usize) -> bool {
        if data.is_null() || len == 0 {
            return false;
        }
        let buffer = unsafe { slice::from_raw_parts_mut(data as *mut u8, len) };

        match self.with_core_mut(|core| core.serialize(buffer)) {
            Some(Ok(_)) => true,
            Some(Err(SerializeError::BufferTooSmall { required })) => {
                tracing::warn!(required, len, "serialize buffer too small");
                false
            }
            Some(Err(err)) => {
                tracing::debug!(error = %err, "serialize refused");
                false
            }
            None => false,
        }
    }

    /// Restores the core state from the provided buffer.
    ///
    /// # Safety
    /// The `data` pointer must be valid for `len` readable bytes.
    pub unsafe fn unserialize(&self, data: *const c_void, len: usize) -> bool {
        if data.is_null() || len == 0 {
            return false;
        }

        let slice = unsafe { slice::from_raw_parts(data as *const u8, len) };
        matches!(
            self.with_core_mut(|core| core.unserialize(slice)),
            Some(Ok(()))
        )
    }

    pub fn cheat_reset(&self) {
        self.with_core_mut(|core| core.cheat_reset());
    }

    /// Forwards a cheat code to the active core.
    ///
    /// # Safety
    /// The `code` pointer must either be null or a null-terminated string.
    pub unsafe fn cheat_set(&self, index: u32, enabled: bool, code: *const c_char) {
        let code = unsafe { c_str_to_string(code) }.unwrap_or_default();
        self.with_core_mut(|core| core.cheat_set(index, enabled, &code));
    }

    pub fn set_controller_port_device(&self, port: u32, device: u32) {
        self.with_core_mut(|core| core.set_controller_port_device(port, device));
    }

    pub fn region(&self) -> u32 {
        self.with_core(|core| core.region())
            .unwrap_or(raw::RETRO_REGION_NTSC)
    }

    pub fn memory_data(&self, _id: u32) -> *mut c_void {
        ptr::null_mut()
    }

    pub fn memory_size(&self, _id: u32) -> usize {
        0
    }

    fn with_core<R>(&self, f: impl FnOnce(&T) -> R) -> Option<R> {
        let guard = self.core.lock();
        guard.as_ref().map(f)
    }

    fn with_core_mut<R>(&self, f: impl FnOnce(&mut T) -> R) -> Option<R> {
        let mut guard = self.core.lock();
        guard.as_mut().map(f)
    }
}

struct SystemInfoCache {
    library_name: CString,
    library_version: CString,
    valid_extensions: Option<CString>,
    need_fullpath: bool,
    block_extract: bool,
}

impl SystemInfoCache {
    fn from_info(info: SystemInfo) -> Self {
        Self {
            library_name: c_string_lossy(info.library_name),
            library_version: c_string_lossy(info.library_version),
            valid_extensions: info.valid_extensions.map(c_string_lossy),
            need_fullpath: info.need_fullpath,
            block_extract: info.block_extract,
        }
    }

    unsafe fn write_into(&self, info: &mut raw::retro_system_info) {
        info.library_name = self.library_name.as_ptr();
        info.library_version = self.library_version.as_ptr();
        info.valid_extensions = self
            .valid_extensions
            .as_ref()
            .map(|ext| ext.as_ptr())
            .unwrap_or(ptr::null());
        info.need_fullpath = self.need_fullpath;
        info.block_extract = self.block_extract;
    }
}

fn c_string_lossy(value: String) -> CString {
    CString::new(value.replace('\0', "")).unwrap_or_default()
}
