//! Purge runtime configuration.
//!
//! Controls the outbound purge behavior via `autopurge.toml`.

use serde::Deserialize;

// Default values for purge configuration
const DEFAULT_API_BASE: &str = "https://api.cloudflare.com/client/v4";
const DEFAULT_TIMEOUT_SECS: u64 = 15;
const DEFAULT_BATCH_CAP: usize = 30;
const DEFAULT_DEBOUNCE_WINDOW_SECS: u64 = 60;
const DEFAULT_PAGINATION_DEPTH: u32 = 5;

/// Purge configuration from `autopurge.toml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PurgeConfig {
    /// Master switch for the automatic pipeline.
    pub enabled: bool,
    /// Base URL of the purge API.
    pub api_base: String,
    /// Zone (purge scope) identifier. Absent disables outbound calls.
    pub zone_id: Option<String>,
    /// Bearer token for the purge API. Absent disables outbound calls.
    pub api_token: Option<String>,
    /// Per-call timeout in seconds.
    pub timeout_secs: u64,
    /// Maximum items per purge API call.
    pub batch_cap: usize,
    /// Debounce window for coalescing change bursts, in seconds.
    pub debounce_window_secs: u64,
    /// Speculative archive pagination depth (pages 2..=K are purged
    /// alongside each paginated archive).
    pub pagination_depth: u32,
}

impl Default for PurgeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            api_base: DEFAULT_API_BASE.to_string(),
            zone_id: None,
            api_token: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            batch_cap: DEFAULT_BATCH_CAP,
            debounce_window_secs: DEFAULT_DEBOUNCE_WINDOW_SECS,
            pagination_depth: DEFAULT_PAGINATION_DEPTH,
        }
    }
}

impl PurgeConfig {
    /// Both credentials present and non-empty.
    pub fn is_configured(&self) -> bool {
        self.credential(&self.api_token) && self.credential(&self.zone_id)
    }

    fn credential(&self, value: &Option<String>) -> bool {
        value.as_deref().is_some_and(|v| !v.is_empty())
    }
}
