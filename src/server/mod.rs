//! HTTP(S) server subsystem.
//!
//! # Data Flow
//! ```text
//! Inbound request
//!     → lifecycle.rs (listener owned by the open/close state machine)
//!     → router.rs (update path | health probe | unauthorized)
//!     → body pipeline (buffer → decode → dispatch)
//!     → dispatch subsystem (processor hand-off, failure reporting)
//! ```
//!
//! # Design Decisions
//! - The lifecycle owns the listener; handlers never see bind state
//! - Routing policy lives in one classifier so precedence stays in one
//!   place

pub mod lifecycle;
pub(crate) mod router;

pub use lifecycle::ServerError;
pub use lifecycle::WebhookServer;
