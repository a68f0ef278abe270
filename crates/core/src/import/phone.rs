//! Phone number canonicalization for the leads import.
//!
//! [`PhonePolicy`] is the seam; [`IndianMobilePolicy`] is the only policy
//! shipped and accepts Indian mobile numbers only.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

/// A phone number that passed a policy's canonicalization and validation.
///
/// Only a [`PhonePolicy`] can construct one, so anything keyed on it (the
/// leads duplicate set) never sees a malformed number.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct CanonicalPhone(String);

impl CanonicalPhone {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl std::fmt::Display for CanonicalPhone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// The raw input could not be turned into a valid number.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid phone number '{raw}' (normalized to '{normalized}')")]
pub struct PhoneError {
    pub raw: String,
    pub normalized: String,
}

pub trait PhonePolicy: Send + Sync {
    fn canonicalize(&self, raw: &str) -> Result<CanonicalPhone, PhoneError>;
}

const INDIA_PREFIX: &str = "+91";

static INDIAN_MOBILE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+91[6-9]\d{9}$").expect("valid regex"));

/// `+91` followed by ten digits, the first of which is 6, 7, 8 or 9.
#[derive(Debug, Clone, Copy, Default)]
pub struct IndianMobilePolicy;

impl IndianMobilePolicy {
    /// Apply the normalization steps without validating the result.
    pub fn normalize(raw: &str) -> String {
        let trimmed = raw.trim();

        // Several numbers in one cell: keep the first.
        let first = trimmed
            .find(|c: char| c == ',' || c == '/')
            .map_or(trimmed, |idx| &trimmed[..idx]);

        let mut cleaned = String::with_capacity(first.len());
        for (idx, c) in first.trim().char_indices() {
            if c.is_ascii_digit() || (c == '+' && idx == 0) {
                cleaned.push(c);
            }
        }

        if cleaned.starts_with(INDIA_PREFIX) {
            return cleaned;
        }
        if cleaned.len() == 11 && cleaned.starts_with('0') && !cleaned.starts_with("00") {
            cleaned.remove(0);
        }
        format!("{INDIA_PREFIX}{cleaned}")
    }
}

impl PhonePolicy for IndianMobilePolicy {
    fn canonicalize(&self, raw: &str) -> Result<CanonicalPhone, PhoneError> {
        let normalized = Self::normalize(raw);
        if INDIAN_MOBILE_RE.is_match(&normalized) {
            Ok(CanonicalPhone(normalized))
        } else {
            Err(PhoneError {
                raw: raw.to_string(),
                normalized,
            })
        }
    }
}
