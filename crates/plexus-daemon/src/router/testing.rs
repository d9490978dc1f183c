//! Test utilities for the router.

use super::EventHandler;
use crate::RouterError;
use async_trait::async_trait;
use parking_lot::Mutex;
use plexus_event::Event;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// A handler that records every event it receives.
///
/// Returns a fixed value (or failure) on each call and tracks the
/// invocation count.
pub struct RecordingHandler {
    name: String,
    response: Value,
    failure: Option<String>,
    delay: Option<Duration>,
    calls: AtomicUsize,
    seen: Mutex<Vec<Event>>,
}

impl RecordingHandler {
    /// A handler answering `{"handled": true}`.
    pub fn new(name: &str) -> Arc<Self> {
        Self::build(name, json!({"handled": true}), None, None)
    }

    /// A handler answering a fixed value.
    pub fn returning(name: &str, response: Value) -> Arc<Self> {
        Self::build(name, response, None, None)
    }

    /// A handler that always fails with the given message.
    pub fn failing(name: &str, message: &str) -> Arc<Self> {
        Self::build(name, Value::Null, Some(message.to_string()), None)
    }

    /// A handler that sleeps before answering, for timeout tests.
    pub fn slow(name: &str, delay: Duration) -> Arc<Self> {
        Self::build(name, json!({"handled": true}), None, Some(delay))
    }

    fn build(
        name: &str,
        response: Value,
        failure: Option<String>,
        delay: Option<Duration>,
    ) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            response,
            failure,
            delay,
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        })
    }

    /// Number of times `handle()` ran.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Copies of every event received, in arrival order.
    pub fn seen(&self) -> Vec<Event> {
        self.seen.lock().clone()
    }
}

#[async_trait]
impl EventHandler for RecordingHandler {
    fn name(&self) -> &str {
        &self.name
    }

    async fn handle(&self, event: Event) -> Result<Value, RouterError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().push(event);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        match &self.failure {
            Some(message) => Err(RouterError::HandlerFailed {
                handler: self.name.clone(),
                message: message.clone(),
            }),
            None => Ok(self.response.clone()),
        }
    }
}
