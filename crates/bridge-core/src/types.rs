//! Shared types used across the bridge crates.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};

/// Outcome of a single poll attempt against the health endpoint.
///
/// A probe either got an availability flag back from the target or failed
/// somewhere along the way; never both, never neither. Decoding enforces the
/// same rule: a record carrying both fields, neither, or anything else is
/// rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ProbeResult {
    /// The endpoint answered with a well-formed availability flag.
    Reported { availability: bool },
    /// Network error, timeout, non-2xx status, or malformed body.
    Failed { error_message: String },
}

impl ProbeResult {
    pub fn available(availability: bool) -> Self {
        ProbeResult::Reported { availability }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        ProbeResult::Failed {
            error_message: message.into(),
        }
    }

    /// The reported availability flag, if the probe succeeded.
    pub fn availability(&self) -> Option<bool> {
        match self {
            ProbeResult::Reported { availability } => Some(*availability),
            ProbeResult::Failed { .. } => None,
        }
    }

    /// The failure description, if the probe failed.
    pub fn error_message(&self) -> Option<&str> {
        match self {
            ProbeResult::Reported { .. } => None,
            ProbeResult::Failed { error_message } => Some(error_message),
        }
    }
}

/// Wire shape of a [`ProbeResult`] before the one-field rule is checked.
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawProbeResult {
    availability: Option<bool>,
    error_message: Option<String>,
}

impl<'de> Deserialize<'de> for ProbeResult {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = RawProbeResult::deserialize(deserializer)?;
        match (raw.availability, raw.error_message) {
            (Some(availability), None) => Ok(ProbeResult::Reported { availability }),
            (None, Some(error_message)) => Ok(ProbeResult::Failed { error_message }),
            (Some(_), Some(_)) => Err(de::Error::custom(
                "probe result has both `availability` and `error_message`",
            )),
            (None, None) => Err(de::Error::custom(
                "probe result needs one of `availability` or `error_message`",
            )),
        }
    }
}

impl fmt::Display for ProbeResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeResult::Reported { availability } => write!(f, "{{availability: {availability}}}"),
            ProbeResult::Failed { error_message } => write!(f, "{{error: {error_message:?}}}"),
        }
    }
}

/// Health judgment for one probe result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Healthy,
    Unhealthy,
    Indeterminate,
}

impl Verdict {
    pub fn label(&self) -> &'static str {
        match self {
            Verdict::Healthy => "healthy",
            Verdict::Unhealthy => "unhealthy",
            Verdict::Indeterminate => "indeterminate",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A single durable journal record. Immutable once written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntry {
    /// Capture time, assigned when the result was classified.
    pub timestamp: DateTime<Utc>,
    pub verdict: Verdict,
    pub raw_result: ProbeResult,
}

impl JournalEntry {
    pub fn new(timestamp: DateTime<Utc>, verdict: Verdict, raw_result: ProbeResult) -> Self {
        Self {
            timestamp,
            verdict,
            raw_result,
        }
    }
}
