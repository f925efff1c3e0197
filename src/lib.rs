//! Inbound webhook receiver library.
//!
//! An HTTP(S) server that accepts push-style update delivery: requests are
//! authenticated by a secret token carried in the path, health probes are
//! answered inline, update bodies are buffered and decoded as JSON, and
//! each decoded update is handed to an [`UpdateProcessor`]. Pipeline
//! failures flow to an [`ErrorListener`] when one is registered and to the
//! log sink otherwise.

pub mod config;
pub mod dispatch;
pub mod net;
pub mod server;

pub use config::schema::WebhookConfig;
pub use config::{load_config, ConfigError, TlsOptions, TlsSettings};
pub use dispatch::{ErrorKind, ErrorListener, UpdateProcessor, WebhookError};
pub use net::{TransportError, TransportMode};
pub use server::{ServerError, WebhookServer};
