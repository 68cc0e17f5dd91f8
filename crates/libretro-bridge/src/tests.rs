use super::*;
use once_cell::sync::Lazy;
use std::{
    ffi::{CStr, CString, c_char, c_void},
    mem::MaybeUninit,
    ptr, slice,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
};

static EVENTS: Lazy<Mutex<Vec<String>>> = Lazy::new(|| Mutex::new(Vec::new()));
static VIDEO_FRAMES: Lazy<Mutex<Vec<(u32, u32, usize, usize)>>> =
    Lazy::new(|| Mutex::new(Vec::new()));
static AUDIO_SAMPLES: Lazy<Mutex<Vec<(i16, i16)>>> = Lazy::new(|| Mutex::new(Vec::new()));
static AUDIO_BATCHES: Lazy<Mutex<Vec<Vec<(i16, i16)>>>> = Lazy::new(|| Mutex::new(Vec::new()));
static INPUT_POLLS: AtomicUsize = AtomicUsize::new(0);
static INPUT_REQUESTS: Lazy<Mutex<Vec<(u32, u32, u32, u32)>>> =
    Lazy::new(|| Mutex::new(Vec::new()));
static ENV_CMDS: Lazy<Mutex<Vec<u32>>> = Lazy::new(|| Mutex::new(Vec::new()));
static PUBLISHED_VARIABLES: Lazy<Mutex<Vec<(String, String)>>> =
    Lazy::new(|| Mutex::new(Vec::new()));
static HW_CALLBACK: Lazy<Mutex<Option<raw::retro_hw_render_callback>>> =
    Lazy::new(|| Mutex::new(None));

fn log(event: impl Into<String>) {
    EVENTS.lock().unwrap().push(event.into());
}

struct RecordingListener;

impl HwContextListener for RecordingListener {
    fn context_reset(&self, interface: &HwRenderInterface) {
        let proc = interface.proc_address(c"glClear");
        log(format!(
            "ctx-reset(fb={},proc={})",
            interface.current_framebuffer(),
            !proc.is_null()
        ));
    }

    fn context_destroy(&self) {
        log("ctx-destroy");
    }
}

#[derive(Default)]
struct DummyCore {
    shared_audio: Option<SharedAudio>,
}

impl LibretroCore for DummyCore {
    fn construct() -> Self
    where
        Self: Sized,
    {
        log("construct");
        Self::default()
    }

    fn system_info() -> SystemInfo {
        SystemInfo::new("DummyCore", "1.0.0")
            .with_extensions("iso|bin")
            .need_fullpath(true)
    }

    fn environment_installed(runtime: &mut RuntimeHandles) {
        log("environment");
        if let Some(env) = runtime.environment() {
            env.set_variables(&[("dummy_speed", "Speed; 1x|2x")]);
        }
    }

    fn init(&mut self, runtime: &mut RuntimeHandles) {
        log("init");
        self.shared_audio = Some(runtime.shared_audio());
    }

    fn deinit(&mut self) {
        log("deinit");
    }

    fn reset(&mut self) {
        log("reset");
    }

    fn run(&mut self, runtime: &mut RuntimeHandles) {
        log("run");
        if let Some(env) = runtime.environment() {
            if env.variables_updated() {
                log(format!("speed={:?}", env.get_variable("dummy_speed")));
            }
        }

        if let Some(input) = runtime.input() {
            input.poll();
            let _ = input.state(0, raw::RETRO_DEVICE_JOYPAD, 0, raw::RETRO_DEVICE_ID_JOYPAD_A);
        }

        if let Some(video) = runtime.video() {
            video.submit(Frame::hardware(640, 528));
            static FRAME: [u8; 4] = [1, 2, 3, 4];
            video.submit(Frame::from_pixels(&FRAME, 1, 1, 4));
        }

        let audio = runtime.audio();
        audio.push_sample(7, -7);
        audio.push_interleaved(&[1, -1, 2, -2]);
    }

    fn system_av_info(&mut self) -> SystemAvInfo {
        log("av-info");
        SystemAvInfo {
            geometry: GameGeometry::fixed(640, 528, 4.0 / 3.0),
            timing: SystemTiming {
                fps: 60.0,
                sample_rate: 48_000.0,
            },
        }
    }

    fn load_game(
        &mut self,
        runtime: &mut RuntimeHandles,
        game: &GameInfo<'_>,
    ) -> Result<(), LoadGameError> {
        log(format!("load({:?})", game.path));
        let Some(_) = &game.path else {
            return Err(LoadGameError::MissingContent);
        };
        let hw = runtime
            .hw_render()
            .ok_or_else(|| LoadGameError::HardwareUnavailable("an environment".into()))?;
        hw.enable(HwRenderRequest::opengl_core(3, 3), Arc::new(RecordingListener))
            .ok_or_else(|| LoadGameError::HardwareUnavailable("OpenGL".into()))?;
        Ok(())
    }

    fn unload_game(&mut self) {
        log("unload");
    }

    fn serialize_size(&mut self) -> usize {
        log("serialize-size");
        8
    }

    fn serialize(&mut self, dst: &mut [u8]) -> Result<usize, SerializeError> {
        log(format!("serialize({})", dst.len()));
        if dst.len() < 8 {
            return Err(SerializeError::BufferTooSmall { required: 8 });
        }
        dst[..8].copy_from_slice(&0xDEADBEEFu64.to_le_bytes());
        Ok(8)
    }

    fn unserialize(&mut self, src: &[u8]) -> Result<(), SerializeError> {
        log(format!("unserialize({})", src.len()));
        if src.len() < 8 {
            return Err(SerializeError::Message("state too small".into()));
        }
        Ok(())
    }

    fn cheat_set(&mut self, index: u32, enabled: bool, code: &str) {
        log(format!("cheat({index},{enabled},{code})"));
    }

    fn set_controller_port_device(&mut self, port: u32, device: u32) {
        log(format!("controller({port},{device})"));
    }
}

crate::export_libretro_core!(DummyCore);

// The exported functions live in an anonymous const block, so reach them by
// symbol the way a frontend would.
unsafe extern "C" {
    fn retro_set_environment(cb: raw::retro_environment_t);
    fn retro_set_video_refresh(cb: raw::retro_video_refresh_t);
    fn retro_set_audio_sample(cb: raw::retro_audio_sample_t);
    fn retro_set_audio_sample_batch(cb: raw::retro_audio_sample_batch_t);
    fn retro_set_input_poll(cb: raw::retro_input_poll_t);
    fn retro_set_input_state(cb: raw::retro_input_state_t);
    fn retro_init();
    fn retro_deinit();
    fn retro_get_system_info(info: *mut raw::retro_system_info);
    fn retro_get_system_av_info(info: *mut raw::retro_system_av_info);
    fn retro_set_controller_port_device(port: u32, device: u32);
    fn retro_run();
    fn retro_serialize_size() -> usize;
    fn retro_serialize(data: *mut c_void, len: usize) -> bool;
    fn retro_unserialize(data: *const c_void, len: usize) -> bool;
    fn retro_cheat_set(index: u32, enabled: bool, code: *const c_char);
    fn retro_load_game(game: *const raw::retro_game_info) -> bool;
    fn retro_load_game_special(
        game_type: u32,
        info: *const raw::retro_game_info,
        num_info: usize,
    ) -> bool;
    fn retro_unload_game();
    fn retro_get_region() -> u32;
}

unsafe extern "C" fn video_cb(data: *const c_void, width: u32, height: u32, pitch: usize) {
    VIDEO_FRAMES
        .lock()
        .unwrap()
        .push((width, height, pitch, data as usize));
}

unsafe extern "C" fn audio_sample_cb(left: i16, right: i16) {
    AUDIO_SAMPLES.lock().unwrap().push((left, right));
}

unsafe extern "C" fn audio_batch_cb(data: *const i16, frames: usize) -> usize {
    let slice = unsafe { slice::from_raw_parts(data, frames * 2) };
    let chunk = slice.chunks_exact(2).map(|pair| (pair[0], pair[1])).collect();
    AUDIO_BATCHES.lock().unwrap().push(chunk);
    frames
}

unsafe extern "C" fn input_poll_cb() {
    INPUT_POLLS.fetch_add(1, Ordering::SeqCst);
}

unsafe extern "C" fn input_state_cb(port: u32, device: u32, index: u32, id: u32) -> i16 {
    INPUT_REQUESTS.lock().unwrap().push((port, device, index, id));
    1
}

unsafe extern "C" fn gl_clear_stub() {}

unsafe extern "C" fn get_proc_address_cb(sym: *const c_char) -> raw::retro_proc_address_t {
    let name = unsafe { CStr::from_ptr(sym) };
    (name == c"glClear").then_some(gl_clear_stub as unsafe extern "C" fn())
}

unsafe extern "C" fn current_framebuffer_cb() -> usize {
    7
}

unsafe extern "C" fn environment_cb(cmd: u32, data: *mut c_void) -> bool {
    ENV_CMDS.lock().unwrap().push(cmd);
    match cmd {
        raw::RETRO_ENVIRONMENT_SET_VARIABLES => {
            let mut cursor = data as *const raw::retro_variable;
            loop {
                let var = unsafe { *cursor };
                if var.key.is_null() {
                    break;
                }
                let key = unsafe { CStr::from_ptr(var.key) }.to_string_lossy().into_owned();
                let value = unsafe { CStr::from_ptr(var.value) }
                    .to_string_lossy()
                    .into_owned();
                PUBLISHED_VARIABLES.lock().unwrap().push((key, value));
                cursor = unsafe { cursor.add(1) };
            }
            true
        }
        raw::RETRO_ENVIRONMENT_GET_VARIABLE_UPDATE => {
            unsafe { *(data as *mut bool) = true };
            true
        }
        raw::RETRO_ENVIRONMENT_GET_VARIABLE => {
            static VALUE: &CStr = c"2x";
            let var = unsafe { &mut *(data as *mut raw::retro_variable) };
            var.value = VALUE.as_ptr();
            true
        }
        raw::RETRO_ENVIRONMENT_SET_HW_RENDER => {
            let cb = unsafe { &mut *(data as *mut raw::retro_hw_render_callback) };
            cb.get_proc_address = Some(get_proc_address_cb);
            cb.get_current_framebuffer = Some(current_framebuffer_cb);
            *HW_CALLBACK.lock().unwrap() = Some(*cb);
            true
        }
        _ => false,
    }
}

fn reset_logs() {
    EVENTS.lock().unwrap().clear();
    VIDEO_FRAMES.lock().unwrap().clear();
    AUDIO_SAMPLES.lock().unwrap().clear();
    AUDIO_BATCHES.lock().unwrap().clear();
    INPUT_POLLS.store(0, Ordering::SeqCst);
    INPUT_REQUESTS.lock().unwrap().clear();
    ENV_CMDS.lock().unwrap().clear();
    PUBLISHED_VARIABLES.lock().unwrap().clear();
    HW_CALLBACK.lock().unwrap().take();
}

#[test]
fn exports_delegate_to_trait() {
    reset_logs();

    // Entry points are tolerated before retro_init.
    assert_eq!(unsafe { retro_serialize_size() }, 0);
    assert_eq!(unsafe { retro_get_region() }, raw::RETRO_REGION_NTSC);

    unsafe {
        retro_set_environment(Some(environment_cb));
        retro_set_video_refresh(Some(video_cb));
        retro_set_audio_sample(Some(audio_sample_cb));
        retro_set_audio_sample_batch(Some(audio_batch_cb));
        retro_set_input_poll(Some(input_poll_cb));
        retro_set_input_state(Some(input_state_cb));
    }
    assert_eq!(
        PUBLISHED_VARIABLES.lock().unwrap().as_slice(),
        &[("dummy_speed".to_string(), "Speed; 1x|2x".to_string())]
    );

    let mut info = MaybeUninit::<raw::retro_system_info>::uninit();
    unsafe { retro_get_system_info(info.as_mut_ptr()) };
    let info = unsafe { info.assume_init() };
    let name = unsafe { CStr::from_ptr(info.library_name) }
        .to_str()
        .unwrap()
        .to_string();
    assert_eq!(name, "DummyCore");
    assert!(info.need_fullpath);
    assert!(!info.valid_extensions.is_null());

    unsafe { retro_init() };

    let empty = raw::retro_game_info {
        path: ptr::null(),
        data: ptr::null(),
        size: 0,
        meta: ptr::null(),
    };
    assert!(!unsafe { retro_load_game(&empty) });

    let path = CString::new("/games/disc.iso").unwrap();
    let game = raw::retro_game_info {
        path: path.as_ptr(),
        data: ptr::null(),
        size: 0,
        meta: ptr::null(),
    };
    assert!(unsafe { retro_load_game(&game) });

    let hw = HW_CALLBACK.lock().unwrap().expect("hw render requested");
    assert_eq!(hw.context_type, raw::RETRO_HW_CONTEXT_OPENGL_CORE);
    assert_eq!((hw.version_major, hw.version_minor), (3, 3));
    unsafe { hw.context_reset.unwrap()() };
    unsafe { hw.context_destroy.unwrap()() };

    let mut av = MaybeUninit::<raw::retro_system_av_info>::uninit();
    unsafe { retro_get_system_av_info(av.as_mut_ptr()) };
    let av = unsafe { av.assume_init() };
    assert_eq!(av.geometry.base_width, 640);
    assert_eq!(av.timing.sample_rate, 48_000.0);

    assert!(!unsafe { retro_load_game_special(0, ptr::null(), 0) });

    unsafe { retro_run() };

    assert_eq!(unsafe { retro_serialize_size() }, 8);
    let mut state = [0u8; 8];
    assert!(unsafe { retro_serialize(state.as_mut_ptr() as *mut c_void, state.len()) });
    assert_eq!(state, 0xDEADBEEFu64.to_le_bytes());
    let mut small = [0u8; 4];
    assert!(!unsafe { retro_serialize(small.as_mut_ptr() as *mut c_void, small.len()) });
    assert!(unsafe { retro_unserialize(state.as_ptr() as *const c_void, state.len()) });
    assert!(!unsafe { retro_unserialize(state.as_ptr() as *const c_void, 0) });

    let cheat = CString::new("XYZ").unwrap();
    unsafe { retro_cheat_set(1, true, cheat.as_ptr()) };
    unsafe { retro_set_controller_port_device(0, raw::RETRO_DEVICE_JOYPAD) };

    // The audio pacer thread reads callbacks through SharedAudio.
    unsafe { retro_set_audio_sample_batch(None) };
    unsafe { retro_set_audio_sample(None) };
    unsafe { retro_unload_game() };
    unsafe { retro_deinit() };

    let events = EVENTS.lock().unwrap().clone();
    for expected in ["environment", "construct", "init", "run", "deinit"] {
        assert!(events.iter().any(|e| e == expected), "missing {expected}");
    }
    assert!(events.iter().any(|e| e == "ctx-reset(fb=7,proc=true)"));
    assert!(events.iter().any(|e| e == "ctx-destroy"));
    assert!(events.iter().any(|e| e == "speed=Some(\"2x\")"));
    assert!(events.iter().any(|e| e.starts_with("cheat(1,true,XYZ")));
    assert!(events.iter().any(|e| e.starts_with("controller(")));

    let frames = VIDEO_FRAMES.lock().unwrap().clone();
    assert_eq!(frames.len(), 2);
    assert_eq!(frames[0], (640, 528, 0, usize::MAX));
    assert_eq!(AUDIO_SAMPLES.lock().unwrap().len(), 1);
    assert_eq!(
        AUDIO_BATCHES.lock().unwrap().as_slice(),
        &[vec![(1, -1), (2, -2)]]
    );
    assert_eq!(INPUT_POLLS.load(Ordering::SeqCst), 1);
    assert_eq!(INPUT_REQUESTS.lock().unwrap().len(), 1);

    // Notifications after deinit no longer reach the listener.
    let before = EVENTS.lock().unwrap().len();
    unsafe { hw.context_reset.unwrap()() };
    assert_eq!(EVENTS.lock().unwrap().len(), before);
}

#[test]
fn shared_audio_follows_registered_callbacks() {
    let callbacks = Arc::new(runtime::AudioCallbacks::default());
    let shared = runtime::RuntimeHandles::new(
        runtime::CallbackSet::default(),
        Arc::clone(&callbacks),
        Arc::new(runtime::HwBinding::new(runtime::HwTrampolines {
            reset: gl_clear_stub,
            destroy: gl_clear_stub,
        })),
    )
    .shared_audio();

    assert!(!shared.current().is_connected());
    assert_eq!(shared.current().push_interleaved(&[1, 2]), 0);

    callbacks.set_batch(Some(counting_batch));
    assert_eq!(shared.current().push_interleaved(&[1, 2, 3, 4]), 2);
    callbacks.set_batch(None);
    assert!(!shared.current().is_connected());
}

unsafe extern "C" fn counting_batch(_data: *const i16, frames: usize) -> usize {
    frames
}

#[test]
fn generated_bindings_follow_the_header() {
    assert_eq!(raw::RETRO_API_VERSION, 1);
    assert_eq!(raw::RETRO_ENVIRONMENT_SET_HW_RENDER, 14);
    assert_eq!(
        raw::RETRO_ENVIRONMENT_SET_HW_SHARED_CONTEXT,
        44 | raw::RETRO_ENVIRONMENT_EXPERIMENTAL
    );
    assert_eq!(raw::RETRO_PIXEL_FORMAT_XRGB8888, 1);
    assert_eq!(raw::RETRO_HW_CONTEXT_OPENGL_CORE, 3);
    assert_eq!(raw::RETRO_HW_FRAME_BUFFER_VALID as usize, usize::MAX);

    let callback = raw::retro_hw_render_callback::default();
    assert!(callback.context_reset.is_none());
    assert!(callback.get_proc_address.is_none());
    assert_eq!(std::mem::size_of::<raw::retro_game_geometry>(), 20);
    assert_eq!(std::mem::size_of::<raw::retro_system_av_info>(), 40);
}
