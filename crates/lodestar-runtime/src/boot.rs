//! Boot requests and the single-slot queue holding one until the host
//! context exists.

use std::{
    fmt,
    path::{Path, PathBuf},
    sync::atomic::{AtomicBool, Ordering},
};

use parking_lot::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootOrigin {
    Plain,
    Netplay,
}

impl BootOrigin {
    pub fn label(self) -> &'static str {
        match self {
            BootOrigin::Plain => "Game",
            BootOrigin::Netplay => "NetPlay",
        }
    }
}

impl fmt::Display for BootOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Parameters a netplay session agreed on before starting. The payload is
/// owned by the session backend and passed to the core untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BootSession {
    pub game_id: String,
    pub hosting: bool,
    pub payload: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootRequest {
    pub target: PathBuf,
    pub session: Option<BootSession>,
    pub origin: BootOrigin,
}

impl BootRequest {
    pub fn plain(target: impl Into<PathBuf>) -> Self {
        Self {
            target: target.into(),
            session: None,
            origin: BootOrigin::Plain,
        }
    }

    pub fn netplay(target: impl Into<PathBuf>, session: BootSession) -> Self {
        Self {
            target: target.into(),
            session: Some(session),
            origin: BootOrigin::Netplay,
        }
    }

    pub fn target(&self) -> &Path {
        &self.target
    }
}

/// Holds at most one pending boot. A newer request replaces the older one.
///
/// `pending` mirrors whether the slot is occupied so the tick can skip the
/// lock when nothing is queued.
#[derive(Default)]
pub struct BootQueue {
    pending: AtomicBool,
    slot: Mutex<Option<BootRequest>>,
}

impl BootQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn store(&self, request: BootRequest) {
        let mut slot = self.slot.lock();
        if let Some(previous) = slot.replace(request) {
            tracing::debug!(target = %previous.target.display(), "replacing pending boot");
        }
        self.pending.store(true, Ordering::Release);
    }

    pub fn take(&self) -> Option<BootRequest> {
        if !self.pending.load(Ordering::Acquire) {
            return None;
        }
        let mut slot = self.slot.lock();
        self.pending.store(false, Ordering::Release);
        slot.take()
    }

    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::Acquire)
    }

    pub fn clear(&self) {
        let mut slot = self.slot.lock();
        self.pending.store(false, Ordering::Release);
        slot.take();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn last_request_wins() {
        let queue = BootQueue::new();
        assert!(queue.take().is_none());

        queue.store(BootRequest::plain("first.iso"));
        queue.store(BootRequest::netplay(
            "second.iso",
            BootSession {
                game_id: "GALE01".into(),
                ..Default::default()
            },
        ));
        assert!(queue.is_pending());

        let taken = queue.take().unwrap();
        assert_eq!(taken.target(), Path::new("second.iso"));
        assert_eq!(taken.origin, BootOrigin::Netplay);
        assert!(queue.take().is_none());
        assert!(!queue.is_pending());
    }

    #[test]
    fn clear_discards_pending() {
        let queue = BootQueue::new();
        queue.store(BootRequest::plain("game.iso"));
        queue.clear();
        assert!(!queue.is_pending());
        assert!(queue.take().is_none());
    }

    #[test]
    fn origin_labels() {
        assert_eq!(BootOrigin::Plain.to_string(), "Game");
        assert_eq!(BootOrigin::Netplay.to_string(), "NetPlay");
    }
}
