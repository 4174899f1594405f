//! Entry codecs: how an [`Entry`] becomes bytes and back.
//!
//! The core only relies on references, `__CLASS__`, `root` and `id`
//! surviving a write-then-read cycle.

use std::fmt;

use mnemo_types::Entry;
use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};

/// Converts entries to and from a transmissible byte form.
pub trait Codec: Send + Sync {
    /// Short codec name, used in errors and logs.
    fn name(&self) -> &'static str;

    fn encode(&self, entry: &Entry) -> StoreResult<Vec<u8>>;

    fn decode(&self, bytes: &[u8]) -> StoreResult<Entry>;
}

/// JSON codec (`serde_json`).
#[derive(Clone, Copy, Debug, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn name(&self) -> &'static str {
        "json"
    }

    fn encode(&self, entry: &Entry) -> StoreResult<Vec<u8>> {
        // serde_json writes NaN and infinities as `null`, which never reads back.
        if let Some(x) = entry.data.non_finite() {
            return Err(codec_error(self, format_args!("non-finite float {x}")));
        }
        serde_json::to_vec(entry).map_err(|e| codec_error(self, e))
    }

    fn decode(&self, bytes: &[u8]) -> StoreResult<Entry> {
        serde_json::from_slice(bytes).map_err(|e| codec_error(self, e))
    }
}

/// Compact binary codec (`bincode`).
#[derive(Clone, Copy, Debug, Default)]
pub struct BincodeCodec;

impl Codec for BincodeCodec {
    fn name(&self) -> &'static str {
        "bincode"
    }

    fn encode(&self, entry: &Entry) -> StoreResult<Vec<u8>> {
        bincode::serialize(entry).map_err(|e| codec_error(self, e))
    }

    fn decode(&self, bytes: &[u8]) -> StoreResult<Entry> {
        bincode::deserialize(bytes).map_err(|e| codec_error(self, e))
    }
}

fn codec_error(codec: &dyn Codec, err: impl fmt::Display) -> StoreError {
    StoreError::Codec {
        codec: codec.name(),
        reason: err.to_string(),
    }
}

/// Codec selection, as named in configuration.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CodecKind {
    #[default]
    Json,
    Bincode,
}

impl CodecKind {
    /// Instantiate the selected codec.
    pub fn codec(self) -> Box<dyn Codec> {
        match self {
            Self::Json => Box::new(JsonCodec),
            Self::Bincode => Box::new(BincodeCodec),
        }
    }
}

impl fmt::Display for CodecKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json => write!(f, "json"),
            Self::Bincode => write!(f, "bincode"),
        }
    }
}
