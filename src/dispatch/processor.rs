//! External update processor seam.

use serde_json::Value;

/// Consumer of successfully decoded updates.
///
/// The receiver hands each decoded payload to exactly one processor and does
/// not interpret the payload's schema beyond requiring valid JSON. What the
/// processor does with an update, and how it handles its own failures, is
/// outside the receiver's contract.
pub trait UpdateProcessor: Send + Sync {
    /// Handle one decoded update.
    ///
    /// Called synchronously on the request-handling path, after the body has
    /// been buffered and decoded. Implementations that need slow or async
    /// work should enqueue the update rather than block here.
    fn process_update(&self, update: Value);
}
