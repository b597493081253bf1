//! Semantic validation of a deserialized configuration.

use std::net::SocketAddr;

use thiserror::Error;
use url::Url;

use crate::config::schema::{NodeConfig, StoreBackend};

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("invalid listener address '{0}'")]
    BindAddress(String),

    #[error("invalid downstream address '{address}': {reason}")]
    CallAddress { address: String, reason: String },

    #[error("node name must not be empty")]
    EmptyName,

    #[error("subsystem '{0}' is not a valid metric name segment")]
    Subsystem(String),

    #[error("invalid tracing endpoint '{0}'")]
    TracingEndpoint(String),

    #[error("storage items_count must be positive")]
    ItemsCount,

    #[error("storage {0} must not be empty")]
    StorageField(&'static str),
}

/// Validate the configuration, collecting every problem found.
pub fn validate_config(config: &NodeConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(config.listener.bind_address.clone()));
    }

    if config.node.name.trim().is_empty() {
        errors.push(ValidationError::EmptyName);
    }

    let subsystem = &config.node.subsystem;
    if subsystem.is_empty()
        || !subsystem.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        errors.push(ValidationError::Subsystem(subsystem.clone()));
    }

    for address in &config.calls.addresses {
        if let Err(reason) = check_http_url(address) {
            errors.push(ValidationError::CallAddress {
                address: address.clone(),
                reason,
            });
        }
    }

    if config.tracing.enabled && check_http_url(&config.tracing.endpoint).is_err() {
        errors.push(ValidationError::TracingEndpoint(config.tracing.endpoint.clone()));
    }

    if config.storage.items_count == 0 {
        errors.push(ValidationError::ItemsCount);
    }
    if config.storage.backend == StoreBackend::Mongodb {
        if config.storage.database.is_empty() {
            errors.push(ValidationError::StorageField("database"));
        }
        if config.storage.collection.is_empty() {
            errors.push(ValidationError::StorageField("collection"));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_http_url(address: &str) -> Result<(), String> {
    let url = Url::parse(address).map_err(|e| e.to_string())?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(format!("unsupported scheme '{}'", other)),
    }
}
