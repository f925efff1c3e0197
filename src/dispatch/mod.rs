//! Update dispatch and failure reporting subsystem.
//!
//! # Data Flow
//! ```text
//! buffered request body
//!     → serde_json decode
//!     → UpdateProcessor (decoded update, synchronous hand-off)
//!     or
//!     → ErrorReporter (transport / parse failure)
//!         → registered ErrorListener, when present
//!         → tracing error sink, otherwise
//! ```
//!
//! # Design Decisions
//! - The processor sees only updates that decoded; failures never reach it
//! - Reporting is terminal: nothing is retried, persisted, or re-raised

pub mod processor;
pub mod report;

pub use processor::UpdateProcessor;
pub use report::ErrorKind;
pub use report::ErrorListener;
pub use report::ErrorReporter;
pub use report::WebhookError;
