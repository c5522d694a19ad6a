//! Codec tunables.

use crate::error::Result;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodecConfig {
    pub patterns: PatternConfig,
    pub runs: RunConfig,
    pub header: HeaderConfig,
    pub guardrail: GuardrailConfig,
    pub char_map: CharMapConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatternConfig {
    /// Maximum number of pattern codes per document.
    pub cap: usize,
    pub min_len: usize,
    pub max_len: usize,
    pub min_freq: usize,
    /// Longest candidate length is `stream_len / len_divisor`, clamped to `min_len..=max_len`.
    pub len_divisor: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Identical consecutive lines needed for a `B<n>:` block.
    pub block_min_run: usize,
    /// Identical consecutive chars needed for an `R:` run.
    pub char_min_run: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeaderConfig {
    /// Plain headers at least this many chars long are gzipped and base64-armoured.
    pub compress_threshold: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardrailConfig {
    /// Side-table bytes after which path/referer/user-agent mapping stops.
    pub budget_bytes: usize,
    pub max_paths: usize,
    pub max_referers: usize,
    pub max_user_agents: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CharMapConfig {
    pub enabled: bool,
    pub min_count: usize,
}

impl CodecConfig {
    /// Parse a (possibly partial) JSON document over the defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            patterns: PatternConfig::default(),
            runs: RunConfig::default(),
            header: HeaderConfig::default(),
            guardrail: GuardrailConfig::default(),
            char_map: CharMapConfig::default(),
        }
    }
}

impl Default for PatternConfig {
    fn default() -> Self {
        Self {
            cap: 30,
            min_len: 5,
            max_len: 12,
            min_freq: 5,
            len_divisor: 40,
        }
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            block_min_run: 4,
            char_min_run: 6,
        }
    }
}

impl Default for HeaderConfig {
    fn default() -> Self {
        Self { compress_threshold: 1024 }
    }
}

impl Default for GuardrailConfig {
    fn default() -> Self {
        Self {
            budget_bytes: 8 * 1024,
            max_paths: 5000,
            max_referers: 1000,
            max_user_agents: 1000,
        }
    }
}

impl Default for CharMapConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            min_count: 4,
        }
    }
}
