use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Tuning constants for the topic index
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Posts older than this many seconds are dropped by a counts flush.
    pub message_cutoff_secs: u32,
    /// Topics older than this no longer accumulate posts and score zero or
    /// below in hot ranking.
    pub topic_cutoff_secs: u32,
    /// Minimum global population before any inverse tag is materialised.
    pub inverse_threshold: usize,
    /// Number of results walked one-by-one before the count estimator
    /// switches to exponential time skips.
    pub estimate_skip: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            message_cutoff_secs: 43_200,     // 12 hours
            topic_cutoff_secs: 5 * 86_400,   // 5 days
            inverse_threshold: 10_000,
            estimate_skip: 2_500,
        }
    }
}

impl IndexConfig {
    /// Set the inverse materialisation threshold
    pub fn with_inverse_threshold(mut self, threshold: usize) -> Self {
        self.inverse_threshold = threshold;
        self
    }

    /// Set the estimator warm-up length
    pub fn with_estimate_skip(mut self, skip: usize) -> Self {
        self.estimate_skip = skip;
        self
    }
}

/// Configuration for the socket server
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Path of the unix stream socket to listen on
    pub socket_path: PathBuf,
    /// How often expired posts are flushed out of the active window
    pub flush_interval_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            socket_path: PathBuf::from("./tagdex.sock"),
            flush_interval_secs: 60,
        }
    }
}

impl ServerConfig {
    /// Create a server configuration listening on the given socket path
    pub fn new(socket_path: impl Into<PathBuf>) -> Self {
        Self {
            socket_path: socket_path.into(),
            ..Default::default()
        }
    }

    /// Set the flush interval
    pub fn with_flush_interval_secs(mut self, secs: u64) -> Self {
        self.flush_interval_secs = secs;
        self
    }
}
