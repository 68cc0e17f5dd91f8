use std::sync::{
    Arc,
    atomic::{AtomicBool, AtomicI32, Ordering},
};

pub(crate) const FULL_VOLUME: i32 = 100;

/// Flags shared between the host thread, the audio pacer and any thread that
/// delivers stop or start notifications.
///
/// Every field is an independent atomic; no invariant spans two of them.
pub(crate) struct SharedState {
    running: AtomicBool,
    stop_requested: AtomicBool,
    start_requested: AtomicBool,
    volume: AtomicI32,
}

impl SharedState {
    pub(crate) fn new() -> Self {
        Self {
            running: AtomicBool::new(false),
            stop_requested: AtomicBool::new(false),
            start_requested: AtomicBool::new(false),
            volume: AtomicI32::new(FULL_VOLUME),
        }
    }

    pub(crate) fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub(crate) fn set_running(&self, running: bool) {
        self.running.store(running, Ordering::Release);
    }

    pub(crate) fn request_stop(&self) {
        self.stop_requested.store(true, Ordering::Release);
    }

    /// Returns whether a stop was requested since the last call.
    pub(crate) fn take_stop_request(&self) -> bool {
        self.stop_requested.swap(false, Ordering::AcqRel)
    }

    pub(crate) fn request_start(&self) {
        self.start_requested.store(true, Ordering::Release);
    }

    pub(crate) fn take_start_request(&self) -> bool {
        self.start_requested.swap(false, Ordering::AcqRel)
    }

    pub(crate) fn clear_start_request(&self) {
        self.start_requested.store(false, Ordering::Release);
    }

    pub(crate) fn volume(&self) -> i32 {
        self.volume.load(Ordering::Relaxed)
    }

    pub(crate) fn set_volume(&self, percent: i32) {
        self.volume.store(percent.max(0), Ordering::Relaxed);
    }
}

/// Cloneable handle any thread may use to ask the adapter to stop the running
/// game. The request is served on the next tick.
#[derive(Clone)]
pub struct StopHandle {
    pub(crate) shared: Arc<SharedState>,
}

impl StopHandle {
    pub fn request_stop(&self) {
        self.shared.request_stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stop_requests_coalesce() {
        let shared = Arc::new(SharedState::new());
        let handle = StopHandle {
            shared: Arc::clone(&shared),
        };
        handle.request_stop();
        handle.request_stop();
        assert!(shared.take_stop_request());
        assert!(!shared.take_stop_request());
    }

    #[test]
    fn volume_never_negative() {
        let shared = SharedState::new();
        assert_eq!(shared.volume(), FULL_VOLUME);
        shared.set_volume(-5);
        assert_eq!(shared.volume(), 0);
    }
}
