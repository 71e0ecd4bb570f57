//! # trellis-config
//!
//! TOML-driven client configuration for TRELLIS.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use std::path::Path;
//! use trellis_config::load_file;
//!
//! let config = load_file(Path::new("trellis.toml"))?;
//! let options = config.log_options();
//! ```

use std::path::Path;

use tracing::debug;

use trellis_contracts::error::{TrellisError, TrellisResult};

pub mod settings;

pub use settings::{AnchorSettings, ClientConfig, LogSettings, SearchSettings};

/// Parse `s` as TOML into a `ClientConfig`.
///
/// Returns `TrellisError::ConfigError` if the TOML is malformed, does not
/// match the schema, or fails validation.
pub fn load_str(s: &str) -> TrellisResult<ClientConfig> {
    let config: ClientConfig = toml::from_str(s).map_err(|e| TrellisError::ConfigError {
        reason: format!("failed to parse client TOML: {}", e),
    })?;
    validate(&config)?;
    debug!(
        tenant_id = ?config.tenant_id,
        verify = config.log.verify,
        verify_consistency = config.search.verify_consistency,
        "client configuration loaded"
    );
    Ok(config)
}

/// Read the file at `path` and parse it as a `ClientConfig`.
pub fn load_file(path: &Path) -> TrellisResult<ClientConfig> {
    let contents = std::fs::read_to_string(path).map_err(|e| TrellisError::ConfigError {
        reason: format!("failed to read config file '{}': {}", path.display(), e),
    })?;
    load_str(&contents)
}

fn validate(config: &ClientConfig) -> TrellisResult<()> {
    if config.search.limit == 0 {
        return Err(TrellisError::ConfigError {
            reason: "search.limit must be greater than zero".to_string(),
        });
    }
    if !matches!(config.search.order.as_str(), "asc" | "desc") {
        return Err(TrellisError::ConfigError {
            reason: format!(
                "search.order must be 'asc' or 'desc', got '{}'",
                config.search.order
            ),
        });
    }
    if matches!(config.tenant_id.as_deref(), Some("")) {
        return Err(TrellisError::ConfigError {
            reason: "tenant_id must not be empty when set".to_string(),
        });
    }
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
