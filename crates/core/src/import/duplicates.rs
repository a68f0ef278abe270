//! In-file duplicate detection for both import paths.
//!
//! - [`RowFingerprints`] (generic path): a row whose full field/value mapping
//!   was already seen is flagged. Flagging is informational only.
//! - [`PhoneKeySet`] (leads path): keyed on canonical phone; the first row
//!   claiming a number wins and later claimants are rejected.

use std::collections::{BTreeMap, HashMap};

use serde_json::Value;

use super::phone::CanonicalPhone;
use super::row::RowRecord;

/// Deterministic serialization of a row's fields, independent of column order.
pub fn row_fingerprint(row: &RowRecord) -> String {
    let sorted: BTreeMap<&str, Value> = row.iter().map(|(k, v)| (k, v.to_json())).collect();
    // A map of strings to JSON values always serializes.
    serde_json::to_string(&sorted).unwrap_or_default()
}

/// Full-row fingerprints seen so far in one file.
#[derive(Debug, Default)]
pub struct RowFingerprints {
    seen: HashMap<String, usize>,
}

impl RowFingerprints {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `row`. Returns the line of the earlier identical row, if any.
    pub fn check(&mut self, row: &RowRecord) -> Option<usize> {
        let fingerprint = row_fingerprint(row);
        match self.seen.get(&fingerprint) {
            Some(first) => Some(*first),
            None => {
                self.seen.insert(fingerprint, row.line);
                None
            }
        }
    }
}

/// Canonical phone numbers claimed so far in one leads file.
#[derive(Debug, Default)]
pub struct PhoneKeySet {
    claimed: HashMap<CanonicalPhone, usize>,
}

impl PhoneKeySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `phone` for `line`. On conflict returns the line that holds it.
    pub fn claim(&mut self, phone: &CanonicalPhone, line: usize) -> Result<(), usize> {
        match self.claimed.get(phone) {
            Some(first) => Err(*first),
            None => {
                self.claimed.insert(phone.clone(), line);
                Ok(())
            }
        }
    }
}
