//! Engine configuration.
//!
//! ```toml
//! codec = "bincode"
//! skip_unchanged = true
//! search = false
//! ```

use std::path::Path;

use mnemo_store::CodecKind;
use serde::{Deserialize, Serialize};

use crate::error::{SdkError, SdkResult};

/// Configuration for an [`Engine`](crate::Engine).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Codec the in-memory backend keeps entries in.
    pub codec: CodecKind,
    /// Do not rewrite entries whose content has not changed since they were
    /// last read or written.
    pub skip_unchanged: bool,
    /// Attach a search index and publish facts from indexed strategies.
    pub search: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            codec: CodecKind::Json,
            skip_unchanged: true,
            search: true,
        }
    }
}

impl EngineConfig {
    /// Parse a TOML document. Missing keys take their defaults.
    pub fn from_toml_str(text: &str) -> SdkResult<Self> {
        toml::from_str(text).map_err(|e| SdkError::Config(format!("invalid TOML: {e}")))
    }

    /// Read and parse a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> SdkResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            SdkError::Config(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&text)
    }
}
