//! Configuration schema.
//!
//! A `ClientConfig` is deserialized from TOML. Every table and key is
//! optional; omitted values fall back to the defaults documented on each
//! field.
//!
//! Example:
//! ```toml
//! tenant_id = "acme"
//!
//! [log]
//! verify = true
//!
//! [search]
//! verify_consistency = true
//! limit = 50
//!
//! [anchor]
//! fallback_to_root_lookup = true
//! ```

use serde::{Deserialize, Serialize};

use trellis_contracts::options::{LogOptions, SearchOptions};

/// Defaults applied to every log submission.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    /// Request verbose responses. Default `false`.
    pub verbose: bool,

    /// Verify membership and consistency of each new entry. Default `false`.
    pub verify: bool,

    /// Skip hash and signature checks. Default `false`.
    pub skip_event_verification: bool,

    /// Sign events with the client's local signer. Default `false`.
    pub sign_local: bool,
}

/// Defaults applied to every search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    /// Reconcile roots and verify every returned record. Default `false`.
    pub verify_consistency: bool,

    /// Skip hash and signature checks. Default `false`.
    pub skip_event_verification: bool,

    /// Page size. Default `20`.
    pub limit: u32,

    /// `"asc"` or `"desc"`. Default `"desc"`.
    pub order: String,

    /// Field to order by. Default `"received_at"`.
    pub order_by: String,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            verify_consistency: false,
            skip_event_verification: false,
            limit: 20,
            order: "desc".to_string(),
            order_by: "received_at".to_string(),
        }
    }
}

/// How published roots are gathered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnchorSettings {
    /// Fetch sizes the anchor cannot supply from the service's root lookup.
    /// Such roots are never treated as published. Default `true`.
    pub fallback_to_root_lookup: bool,
}

impl Default for AnchorSettings {
    fn default() -> Self {
        Self {
            fallback_to_root_lookup: true,
        }
    }
}

/// The top-level structure deserialized from a TOML client config.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Tenant stamped onto every submitted event, overwriting the caller's.
    pub tenant_id: Option<String>,

    pub log: LogSettings,

    pub search: SearchSettings,

    pub anchor: AnchorSettings,
}

impl ClientConfig {
    /// Per-call log options derived from `[log]`.
    pub fn log_options(&self) -> LogOptions {
        LogOptions {
            verbose: self.log.verbose,
            verify: self.log.verify,
            skip_event_verification: self.log.skip_event_verification,
            sign_local: self.log.sign_local,
        }
    }

    /// Per-call search options derived from `[search]`.
    pub fn search_options(&self) -> SearchOptions {
        SearchOptions {
            verify_consistency: self.search.verify_consistency,
            skip_event_verification: self.search.skip_event_verification,
        }
    }
}
