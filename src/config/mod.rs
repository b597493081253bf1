//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize)
//!     → loader.rs (VECRO_* environment overrides)
//!     → validation.rs (semantic checks)
//!     → NodeConfig (validated, immutable)
//!     → handed by value to the constructors that need it
//! ```
//!
//! # Design Decisions
//! - Config is resolved once before any service is built and never mutated
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, resolve_config, ConfigError};
pub use schema::{
    CallsConfig, CancellationGranularity, ExecutionConfig, ListenerConfig, LogFormat, NodeConfig,
    NodeIdentity, ObservabilityConfig, StorageConfig, StoreBackend, TracingConfig, WorkloadConfig,
};
