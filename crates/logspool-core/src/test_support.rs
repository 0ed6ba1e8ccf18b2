//! Tracing capture for unit tests.

use std::sync::{Arc, Mutex, PoisonError};

use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::Layer;
use tracing_subscriber::layer::Context;
use tracing_subscriber::prelude::*;

/// One recorded event.
#[derive(Debug, Clone)]
pub struct Captured {
    pub target: String,
    pub level: Level,
    pub message: String,
    pub tag: Option<String>,
}

#[derive(Clone, Default)]
struct CaptureLayer {
    events: Arc<Mutex<Vec<Captured>>>,
}

#[derive(Default)]
struct FieldVisitor {
    message: String,
    tag: Option<String>,
}

impl Visit for FieldVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        match field.name() {
            "message" => self.message = format!("{value:?}"),
            "tag" => self.tag = Some(format!("{value:?}")),
            _ => {}
        }
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        match field.name() {
            "message" => self.message = value.to_string(),
            "tag" => self.tag = Some(value.to_string()),
            _ => {}
        }
    }
}

impl<S: Subscriber> Layer<S> for CaptureLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Captured {
                target: event.metadata().target().to_string(),
                level: *event.metadata().level(),
                message: visitor.message,
                tag: visitor.tag,
            });
    }
}

/// Run `f` with every event on this thread recorded, and return them with
/// `f`'s result.
pub fn capture<R>(f: impl FnOnce() -> R) -> (R, Vec<Captured>) {
    let layer = CaptureLayer::default();
    let events = Arc::clone(&layer.events);
    let subscriber = tracing_subscriber::registry().with(layer);
    let result = tracing::subscriber::with_default(subscriber, f);
    let events = events.lock().unwrap_or_else(PoisonError::into_inner).clone();
    (result, events)
}

/// Events emitted on the console channel.
pub fn console_events(events: &[Captured]) -> Vec<&Captured> {
    events
        .iter()
        .filter(|event| event.target == "logspool::console")
        .collect()
}
