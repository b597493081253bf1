//! Configuration loading from disk and the process environment.

use std::fs;
use std::path::Path;

use crate::config::schema::{CancellationGranularity, NodeConfig, StoreBackend};
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Env { key: &'static str, value: String },
    Validation(Vec<ValidationError>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
            ConfigError::Env { key, value } => {
                write!(f, "Invalid value '{}' for environment variable {}", value, key)
            }
            ConfigError::Validation(errors) => {
                write!(f, "Validation failed: ")?;
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

pub const NAME_ENV: &str = "VECRO_NAME";
pub const SUBSYSTEM_ENV: &str = "VECRO_SUBSYSTEM";
pub const LISTEN_ADDRESS_ENV: &str = "VECRO_LISTEN_ADDRESS";
pub const CALLS_ENV: &str = "VECRO_CALLS";
pub const WORKLOAD_CPU_ENV: &str = "VECRO_WORKLOAD_CPU";
pub const WORKLOAD_IO_ENV: &str = "VECRO_WORKLOAD_IO";
pub const WORKLOAD_DELAY_TIME_ENV: &str = "VECRO_WORKLOAD_DELAY_TIME";
pub const WORKLOAD_DELAY_JITTER_ENV: &str = "VECRO_WORKLOAD_DELAY_JITTER";
pub const WORKLOAD_NET_ENV: &str = "VECRO_WORKLOAD_NET";
pub const WORKLOAD_MEMORY_ENV: &str = "VECRO_WORKLOAD_MEMORY";
pub const WORKLOAD_SEED_ENV: &str = "VECRO_WORKLOAD_SEED";
pub const EXECUTION_TIMEOUT_ENV: &str = "VECRO_EXECUTION_TIMEOUT_MS";
pub const EXECUTION_GRANULARITY_ENV: &str = "VECRO_EXECUTION_GRANULARITY";
pub const TRACING_ENDPOINT_ENV: &str = "VECRO_TRACING_ENDPOINT";
pub const DB_BACKEND_ENV: &str = "VECRO_DB_BACKEND";
pub const DB_URI_ENV: &str = "VECRO_DB_URI";
pub const DB_DATABASE_ENV: &str = "VECRO_DB_DATABASE";
pub const DB_COLLECTION_ENV: &str = "VECRO_DB_COLLECTION";
pub const DB_READ_OPS_ENV: &str = "VECRO_DB_READ_OPS";
pub const DB_WRITE_OPS_ENV: &str = "VECRO_DB_WRITE_OPS";

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<NodeConfig, ConfigError> {
    let config = read_config_file(path)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Resolve the node configuration once at startup.
///
/// Starts from the file (or defaults), applies `VECRO_*` variables from the
/// process environment, then validates.
pub fn resolve_config(path: Option<&Path>) -> Result<NodeConfig, ConfigError> {
    let mut config = match path {
        Some(path) => read_config_file(path)?,
        None => NodeConfig::default(),
    };
    apply_env_overrides(&mut config, |key| std::env::var(key).ok())?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

fn read_config_file(path: &Path) -> Result<NodeConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
    toml::from_str(&content).map_err(ConfigError::Parse)
}

/// Apply environment overrides through `lookup`.
///
/// Unset variables leave the config untouched; malformed numbers are errors.
pub fn apply_env_overrides<F>(config: &mut NodeConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(name) = lookup(NAME_ENV) {
        config.node.name = name;
    }
    if let Some(subsystem) = lookup(SUBSYSTEM_ENV) {
        config.node.subsystem = subsystem;
    }
    if let Some(address) = lookup(LISTEN_ADDRESS_ENV) {
        config.listener.bind_address = normalize_listen_address(&address);
    }
    if let Some(calls) = lookup(CALLS_ENV) {
        config.calls.addresses = calls.split_whitespace().map(str::to_string).collect();
    }

    let workload = &mut config.workload;
    if let Some(v) = parse_u64(&lookup, WORKLOAD_DELAY_TIME_ENV)? {
        workload.delay_time_ms = v;
    }
    if let Some(v) = parse_u64(&lookup, WORKLOAD_DELAY_JITTER_ENV)? {
        workload.delay_jitter_ms = Some(v);
    }
    if let Some(v) = parse_u64(&lookup, WORKLOAD_CPU_ENV)? {
        workload.cpu_load = v;
    }
    if let Some(v) = parse_u64(&lookup, WORKLOAD_IO_ENV)? {
        workload.io_load_ms = v;
    }
    if let Some(v) = parse_u64(&lookup, WORKLOAD_NET_ENV)? {
        workload.net_load = v;
    }
    if let Some(v) = parse_u64(&lookup, WORKLOAD_MEMORY_ENV)? {
        workload.memory_mib = v;
    }
    if let Some(v) = parse_u64(&lookup, WORKLOAD_SEED_ENV)? {
        workload.seed = Some(v);
    }

    if let Some(v) = parse_u64(&lookup, EXECUTION_TIMEOUT_ENV)? {
        config.execution.timeout_ms = v;
    }
    if let Some(value) = lookup(EXECUTION_GRANULARITY_ENV) {
        config.execution.granularity = match value.as_str() {
            "steps" => CancellationGranularity::Steps,
            "mid-flight" => CancellationGranularity::MidFlight,
            _ => {
                return Err(ConfigError::Env {
                    key: EXECUTION_GRANULARITY_ENV,
                    value,
                })
            }
        };
    }

    if let Some(endpoint) = lookup(TRACING_ENDPOINT_ENV) {
        config.tracing.enabled = !endpoint.is_empty();
        if !endpoint.is_empty() {
            config.tracing.endpoint = endpoint;
        }
    }

    let storage = &mut config.storage;
    if let Some(value) = lookup(DB_BACKEND_ENV) {
        storage.backend = match value.as_str() {
            "mongodb" => StoreBackend::Mongodb,
            "memory" => StoreBackend::Memory,
            _ => {
                return Err(ConfigError::Env {
                    key: DB_BACKEND_ENV,
                    value,
                })
            }
        };
    }
    if let Some(uri) = lookup(DB_URI_ENV) {
        storage.uri = uri;
    }
    if let Some(database) = lookup(DB_DATABASE_ENV) {
        storage.database = database;
    }
    if let Some(collection) = lookup(DB_COLLECTION_ENV) {
        storage.collection = collection;
    }
    if let Some(v) = parse_u64(&lookup, DB_READ_OPS_ENV)? {
        storage.read_ops = v;
    }
    if let Some(v) = parse_u64(&lookup, DB_WRITE_OPS_ENV)? {
        storage.write_ops = v;
    }

    Ok(())
}

fn parse_u64<F>(lookup: &F, key: &'static str) -> Result<Option<u64>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Env { key, value }),
    }
}

/// Accept Go-style `:8080` listen addresses.
fn normalize_listen_address(address: &str) -> String {
    if address.starts_with(':') {
        format!("0.0.0.0{}", address)
    } else {
        address.to_string()
    }
}
