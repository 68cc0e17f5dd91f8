//! Audio pacer: a dedicated thread that pulls mixed samples from the core and
//! hands them to the host at the mixer's sample rate.

use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use parking_lot::RwLock;

use crate::{config::AdapterConfig, shared::SharedState};

pub const CHANNELS: usize = 2;

/// Source of interleaved stereo samples owned by the emulation core.
pub trait Mixer: Send + Sync {
    /// Writes up to `max_frames` stereo frames into `buffer` and returns how
    /// many were written. Zero means nothing is available yet.
    fn mix(&self, buffer: &mut [i16], max_frames: usize) -> usize;

    fn sample_rate(&self) -> u32;
}

/// Host-side audio output.
pub trait AudioSink: Send + Sync {
    /// Whether the host currently has an audio callback registered.
    fn is_connected(&self) -> bool;

    /// Delivers interleaved stereo samples, returning the frames accepted.
    fn deliver(&self, interleaved: &[i16]) -> usize;
}

/// Holds the current [`AudioSink`]. The host may swap or clear it at any time.
#[derive(Default)]
pub struct AudioSinkSlot {
    current: RwLock<Option<Arc<dyn AudioSink>>>,
}

impl AudioSinkSlot {
    pub fn new(sink: Option<Arc<dyn AudioSink>>) -> Self {
        Self {
            current: RwLock::new(sink),
        }
    }

    pub fn set(&self, sink: Option<Arc<dyn AudioSink>>) {
        *self.current.write() = sink;
    }

    /// Clears the slot. Returns once any delivery in flight has finished.
    pub fn clear(&self) {
        self.current.write().take();
    }

    /// Runs `f` with the connected sink while holding the slot, so a
    /// concurrent [`clear`](Self::clear) waits for it.
    fn with_connected<R>(&self, f: impl FnOnce(&dyn AudioSink) -> R) -> Option<R> {
        let guard = self.current.read();
        let sink = guard.as_deref().filter(|sink| sink.is_connected())?;
        Some(f(sink))
    }

    fn is_connected(&self) -> bool {
        self.current
            .read()
            .as_deref()
            .is_some_and(|sink| sink.is_connected())
    }
}

/// Time source for pacing; swapped for a simulated clock in tests.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
    fn sleep(&self, duration: Duration);

    fn sleep_until(&self, deadline: Instant) {
        let now = self.now();
        if deadline > now {
            self.sleep(deadline - now);
        }
    }
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) {
        thread::sleep(duration);
    }
}

/// Scales samples by `volume` percent, truncating toward zero and clamping to
/// the `i16` range. Volume 100 leaves the buffer untouched.
pub fn apply_volume(samples: &mut [i16], volume: i32) {
    if volume == 100 {
        return;
    }
    for sample in samples {
        let scaled = i32::from(*sample) * volume / 100;
        *sample = scaled.clamp(i32::from(i16::MIN), i32::from(i16::MAX)) as i16;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PacerStep {
    Idle,
    Underrun,
    Delivered { frames: usize },
}

pub(crate) struct Pacer {
    mixer: Arc<dyn Mixer>,
    sink: Arc<AudioSinkSlot>,
    shared: Arc<SharedState>,
    clock: Arc<dyn Clock>,
    block_frames: usize,
    idle_sleep: Duration,
    underrun_sleep: Duration,
    buffer: Vec<i16>,
    next_wake: Instant,
}

impl Pacer {
    pub(crate) fn new(
        config: &AdapterConfig,
        mixer: Arc<dyn Mixer>,
        sink: Arc<AudioSinkSlot>,
        shared: Arc<SharedState>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let block_frames = config.audio_block_frames.max(1);
        let next_wake = clock.now();
        Self {
            mixer,
            sink,
            shared,
            clock,
            block_frames,
            idle_sleep: config.audio_idle_sleep,
            underrun_sleep: config.audio_underrun_sleep,
            buffer: vec![0; block_frames * CHANNELS],
            next_wake,
        }
    }

    fn block_duration(&self) -> Option<Duration> {
        let rate = u64::from(self.mixer.sample_rate());
        (rate > 0).then(|| Duration::from_nanos(self.block_frames as u64 * 1_000_000_000 / rate))
    }

    /// One iteration of the pacer loop.
    pub(crate) fn step(&mut self) -> PacerStep {
        if !self.shared.is_running() || !self.sink.is_connected() {
            self.clock.sleep(self.idle_sleep);
            return PacerStep::Idle;
        }

        let frames = self
            .mixer
            .mix(&mut self.buffer, self.block_frames)
            .min(self.block_frames);
        if frames == 0 {
            self.clock.sleep(self.underrun_sleep);
            return PacerStep::Underrun;
        }

        let samples = &mut self.buffer[..frames * CHANNELS];
        apply_volume(samples, self.shared.volume());

        // The host may have cleared its callback since the check above.
        if self
            .sink
            .with_connected(|sink| sink.deliver(samples))
            .is_none()
        {
            return PacerStep::Idle;
        }

        if let Some(block) = self.block_duration() {
            self.next_wake += block;
            let now = self.clock.now();
            if self.next_wake > now {
                self.clock.sleep_until(self.next_wake);
            } else {
                self.next_wake = now;
            }
        }

        PacerStep::Delivered { frames }
    }
}

/// Owns the pacer thread. Dropping it stops and joins the thread.
pub struct AudioPacer {
    run: Arc<AtomicBool>,
    sink: Arc<AudioSinkSlot>,
    join: Option<JoinHandle<()>>,
}

impl AudioPacer {
    pub(crate) fn spawn(mut pacer: Pacer) -> std::io::Result<Self> {
        let run = Arc::new(AtomicBool::new(true));
        let sink = Arc::clone(&pacer.sink);
        let thread_run = Arc::clone(&run);
        let join = thread::Builder::new()
            .name("lodestar-audio".into())
            .spawn(move || {
                tracing::debug!("audio pacer started");
                while thread_run.load(Ordering::Acquire) {
                    pacer.step();
                }
                tracing::debug!("audio pacer stopped");
            })?;

        Ok(Self {
            run,
            sink,
            join: Some(join),
        })
    }

    pub fn is_alive(&self) -> bool {
        self.join.as_ref().is_some_and(|join| !join.is_finished())
    }

    /// Stops the thread and waits for it. No delivery happens after this
    /// returns, and none starts once it has been called.
    pub fn stop(&mut self) {
        self.run.store(false, Ordering::Release);
        self.sink.clear();
        if let Some(join) = self.join.take() {
            if join.join().is_err() {
                tracing::error!("audio pacer thread panicked");
            }
        }
    }
}

impl Drop for AudioPacer {
    fn drop(&mut self) {
        self.stop();
    }
}
