//! Core configuration.

use serde::{Deserialize, Serialize};

/// Thresholds for the anomaly detector.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AnomalyConfig {
    /// Operations allowed inside one window before `high_volume` fires.
    pub max_ops_per_window: usize,

    /// Sliding window length in seconds.
    pub window_secs: u64,

    /// Failed share of data operations at which `high_failure_rate` fires.
    pub failure_ratio_threshold: f64,

    /// Failed uses of a non-active key before `revoked_key_usage` fires.
    pub revoked_key_attempts_threshold: usize,

    /// Start of working hours, local time, inclusive.
    pub working_hours_start: u32,

    /// End of working hours, local time, exclusive.
    pub working_hours_end: u32,
}

impl Default for AnomalyConfig {
    fn default() -> Self {
        Self {
            max_ops_per_window: 20,
            window_secs: 60,
            failure_ratio_threshold: 0.30,
            revoked_key_attempts_threshold: 2,
            working_hours_start: 7,
            working_hours_end: 22,
        }
    }
}

/// Configuration for the cryptographic core.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct CoreConfig {
    /// Master key, 32 bytes hex. When unset an ephemeral key is
    /// generated and ciphertext from prior runs cannot be decrypted.
    pub master_key_hex: Option<String>,

    /// Reserved. Wrapping always draws a fresh per-call IV.
    pub master_iv_hex: Option<String>,

    pub anomaly: AnomalyConfig,
}

impl CoreConfig {
    /// Reads `PRIVGUARD_MASTER_KEY` / `PRIVGUARD_MASTER_IV` from the
    /// environment; anomaly thresholds keep their documented defaults.
    pub fn from_env() -> Self {
        Self {
            master_key_hex: std::env::var("PRIVGUARD_MASTER_KEY").ok(),
            master_iv_hex: std::env::var("PRIVGUARD_MASTER_IV").ok(),
            anomaly: AnomalyConfig::default(),
        }
    }
}
