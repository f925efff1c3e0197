//! Failure classification and reporting.
//!
//! # Responsibilities
//! - Classify per-request pipeline failures (transport vs. parse)
//! - Deliver failures to the registered listener when one exists
//! - Fall back to the diagnostic log sink otherwise
//!
//! # Design Decisions
//! - `report` never returns an error and never panics; a failing reporter
//!   would otherwise take down the request path it serves
//! - Listener presence is checked per event, so registering or clearing a
//!   listener takes effect for the very next failure
//! - Events are fire-and-forget; nothing is retried or persisted

use std::sync::{Arc, RwLock};

use thiserror::Error;

/// Per-request failure raised by the body pipeline.
#[derive(Debug, Error)]
pub enum WebhookError {
    /// The request body could not be read to completion.
    #[error("failed to read update body: {0}")]
    Transport(#[source] axum::Error),

    /// The buffered body was not valid JSON.
    #[error("failed to decode update body: {0}")]
    Parse(#[source] serde_json::Error),
}

/// Coarse failure class, for listeners that only branch on the kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Transport,
    Parse,
}

impl WebhookError {
    /// The class this failure belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            WebhookError::Transport(_) => ErrorKind::Transport,
            WebhookError::Parse(_) => ErrorKind::Parse,
        }
    }
}

/// Subscriber for webhook pipeline failures.
pub trait ErrorListener: Send + Sync {
    /// Observe one failure. Must not panic; the reporter calls this from
    /// the request-handling path.
    fn on_webhook_error(&self, error: &WebhookError);
}

/// Terminal sink for per-request failures.
///
/// Holds at most one listener. While none is registered, failures are
/// logged at error level so they stay visible.
pub struct ErrorReporter {
    listener: RwLock<Option<Arc<dyn ErrorListener>>>,
}

impl ErrorReporter {
    pub fn new() -> Self {
        Self {
            listener: RwLock::new(None),
        }
    }

    /// Register (or replace) the failure listener.
    pub fn set_listener(&self, listener: Arc<dyn ErrorListener>) {
        if let Ok(mut slot) = self.listener.write() {
            *slot = Some(listener);
        }
    }

    /// Remove the registered listener; failures fall back to the log sink.
    pub fn clear_listener(&self) {
        if let Ok(mut slot) = self.listener.write() {
            *slot = None;
        }
    }

    /// Deliver one failure to the listener, or log it when none is
    /// registered.
    pub fn report(&self, error: WebhookError) {
        // A lock poisoned by a panicking listener degrades to the log sink.
        let listener = match self.listener.read() {
            Ok(slot) => slot.clone(),
            Err(_) => None,
        };

        match listener {
            Some(listener) => listener.on_webhook_error(&error),
            None => {
                tracing::error!(kind = ?error.kind(), error = %error, "Webhook error");
            }
        }
    }
}

impl Default for ErrorReporter {
    fn default() -> Self {
        Self::new()
    }
}
