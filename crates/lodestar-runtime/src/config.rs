use std::time::Duration;

/// Core-profile versions requested from the platform, newest first.
pub const CORE_PROFILE_VERSIONS: [(u32, u32); 9] = [
    (4, 6),
    (4, 5),
    (4, 4),
    (4, 3),
    (4, 2),
    (4, 1),
    (4, 0),
    (3, 3),
    (3, 2),
];

/// Static tuning for an [`Adapter`](crate::Adapter).
#[derive(Debug, Clone, PartialEq)]
pub struct AdapterConfig {
    /// Prefix applied to every core option key.
    pub option_prefix: &'static str,
    /// Rate at which the audio pacer delivers samples to the host.
    pub sample_rate: u32,
    /// Stereo frames pulled from the mixer per delivery.
    pub audio_block_frames: usize,
    /// Sleep while not running or while no host audio callback is registered.
    pub audio_idle_sleep: Duration,
    /// Sleep after the mixer returned no frames.
    pub audio_underrun_sleep: Duration,
    pub base_width: u32,
    pub base_height: u32,
    pub fps: f64,
    pub aspect_ratio: f32,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            option_prefix: "lodestar",
            sample_rate: 48_000,
            audio_block_frames: 512,
            audio_idle_sleep: Duration::from_millis(5),
            audio_underrun_sleep: Duration::from_millis(1),
            base_width: 640,
            base_height: 528,
            fps: 60.0,
            aspect_ratio: 4.0 / 3.0,
        }
    }
}

impl AdapterConfig {
    pub fn option_key(&self, name: &str) -> String {
        format!("{}_{}", self.option_prefix, name)
    }
}
