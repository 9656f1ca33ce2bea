//! Serialized-configuration fingerprints for cache validation.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::errors::FgResult;
use crate::internal_error;

/// The set of `key = value` strings that fully determine a search setup
/// (excluding output values).
///
/// Two runs are cache-compatible iff their fingerprints are set-equal; the
/// order of keys never matters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheFingerprint {
    entries: BTreeSet<String>,
}

impl CacheFingerprint {
    /// Build a fingerprint from the serde_json rendering of a configuration
    /// struct. Null-valued fields are skipped; nested values are rendered as
    /// compact JSON so the lines stay deterministic.
    pub fn from_config<T: Serialize>(config: &T) -> FgResult<Self> {
        let value = serde_json::to_value(config)?;
        let object = value
            .as_object()
            .ok_or_else(|| internal_error!("Fingerprint source must serialize to an object"))?;
        let entries = object
            .iter()
            .filter(|(_, v)| !v.is_null())
            .map(|(k, v)| format!("{k} = {v}"))
            .collect();
        Ok(Self { entries })
    }

    /// Reconstruct a fingerprint from `key = value` header lines.
    pub fn from_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            entries: lines.into_iter().map(Into::into).collect(),
        }
    }

    /// Set-equality comparison, independent of key order.
    pub fn matches(&self, other: &Self) -> bool {
        self.entries == other.entries
    }

    /// Entries that differ between the two fingerprints (symmetric
    /// difference), for mismatch logging.
    pub fn unmatched(&self, other: &Self) -> Vec<String> {
        self.entries
            .symmetric_difference(&other.entries)
            .cloned()
            .collect()
    }

    pub fn lines(&self) -> impl Iterator<Item = &String> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
