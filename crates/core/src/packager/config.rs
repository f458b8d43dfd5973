//! Packager configuration.

use serde::{Deserialize, Serialize};

/// Configuration for the zip packager.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackagerConfig {
    /// Deflate level (0-9) for the JSON entries. JPEG frames are always stored.
    #[serde(default = "default_compression_level")]
    pub compression_level: i64,
}

fn default_compression_level() -> i64 {
    6
}

impl Default for PackagerConfig {
    fn default() -> Self {
        Self {
            compression_level: default_compression_level(),
        }
    }
}
