//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! TlsSettings (config)
//!     → transport.rs (fixed-precedence selection)
//!     → TransportMode (key/cert | PKCS#12 | inline | plain)
//!     → materialized RustlsConfig for the accept loop, or None for HTTP
//! ```
//!
//! # Design Decisions
//! - One transport per server, chosen at construction, never re-evaluated
//! - TLS is optional and handled by the accept loop, not the router

pub mod transport;

pub use transport::TransportError;
pub use transport::TransportMode;
