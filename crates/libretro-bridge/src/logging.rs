//! Forwards `tracing` events to the frontend's log interface.

use crate::raw;
use std::{
    ffi::{CStr, CString},
    fmt::{self, Write as _},
};
use tracing::{Event, Level, Subscriber, field::Field, field::Visit};
use tracing_subscriber::{EnvFilter, Layer, layer::Context, prelude::*};

type Sink = Box<dyn Fn(raw::retro_log_level, &CStr) + Send + Sync>;

/// A [`Layer`] that writes every event through `retro_log_printf_t`.
pub struct FrontendLogLayer {
    sink: Sink,
    tag: &'static str,
}

impl FrontendLogLayer {
    /// Returns `None` when the frontend did not hand out a log function.
    pub fn new(log: raw::retro_log_printf_t, tag: &'static str) -> Option<Self> {
        let log = log?;
        Some(Self::with_sink(tag, move |level, line| unsafe {
            log(level, c"%s".as_ptr(), line.as_ptr());
        }))
    }

    fn with_sink(
        tag: &'static str,
        sink: impl Fn(raw::retro_log_level, &CStr) + Send + Sync + 'static,
    ) -> Self {
        Self {
            sink: Box::new(sink),
            tag,
        }
    }
}

impl<S: Subscriber> Layer<S> for FrontendLogLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = LineVisitor::default();
        event.record(&mut visitor);
        let line = format!("[{}] {}{}\n", self.tag, visitor.message, visitor.fields);
        if let Ok(line) = CString::new(line.replace('\0', "")) {
            (self.sink)(retro_level(*event.metadata().level()), &line);
        }
    }
}

fn retro_level(level: Level) -> raw::retro_log_level {
    match level {
        Level::ERROR => raw::RETRO_LOG_ERROR,
        Level::WARN => raw::RETRO_LOG_WARN,
        Level::INFO => raw::RETRO_LOG_INFO,
        _ => raw::RETRO_LOG_DEBUG,
    }
}

#[derive(Default)]
struct LineVisitor {
    message: String,
    fields: String,
}

impl Visit for LineVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message.push_str(value);
        } else {
            let _ = write!(self.fields, " {}={}", field.name(), value);
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            let _ = write!(self.message, "{value:?}");
        } else {
            let _ = write!(self.fields, " {}={:?}", field.name(), value);
        }
    }
}

/// Installs [`FrontendLogLayer`] as the global subscriber.
///
/// The filter is read from `filter_env` and falls back to `info`. Returns
/// `false` when there is no log interface or a subscriber is already set.
pub fn install(log: raw::retro_log_printf_t, tag: &'static str, filter_env: &str) -> bool {
    let Some(layer) = FrontendLogLayer::new(log, tag) else {
        return false;
    };
    let filter = EnvFilter::try_from_env(filter_env).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(layer)
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[test]
    fn events_are_tagged_and_leveled() {
        let lines = Arc::new(Mutex::new(Vec::<(raw::retro_log_level, String)>::new()));
        let captured = Arc::clone(&lines);
        let layer = FrontendLogLayer::with_sink("test", move |level, line| {
            captured
                .lock()
                .push((level, line.to_string_lossy().into_owned()));
        });

        let subscriber = tracing_subscriber::registry().with(layer);
        tracing::subscriber::with_default(subscriber, || {
            tracing::warn!(width = 2, "dropping frame");
            tracing::error!(path = "a.iso", "boot failed");
            tracing::debug!("quiet");
        });

        let lines = lines.lock().clone();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], (raw::RETRO_LOG_WARN, "[test] dropping frame width=2\n".into()));
        assert_eq!(lines[1], (raw::RETRO_LOG_ERROR, "[test] boot failed path=a.iso\n".into()));
        assert_eq!(lines[2].0, raw::RETRO_LOG_DEBUG);
    }

    #[test]
    fn missing_interface_yields_no_layer() {
        assert!(FrontendLogLayer::new(None, "test").is_none());
        assert!(!install(None, "test", "LIBRETRO_BRIDGE_TEST_LOG"));
    }
}
