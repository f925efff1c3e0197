//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → WebhookConfig (validated, immutable)
//!     → shared via Arc with the server and router
//! ```
//!
//! # Design Decisions
//! - Config is immutable once the server is constructed
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::load_config;
pub use loader::ConfigError;
pub use schema::TlsOptions;
pub use schema::TlsSettings;
pub use schema::WebhookConfig;
pub use validation::validate_config;
pub use validation::ValidationError;
