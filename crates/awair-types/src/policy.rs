//! Conflict-resolution policy for duplicate timestamps.

use core::fmt;
use std::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// What to do when two observations for the same timestamp disagree.
///
/// Exact duplicates (no field disagreement) are always collapsed to one row
/// regardless of policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum ConflictPolicy {
    /// Abort the insert with an error.
    Error,
    /// Log the mismatched fields and keep the first-seen values.
    #[default]
    Warn,
    /// Keep the last-seen (newly fetched) values.
    Replace,
}

impl ConflictPolicy {
    /// The policy's canonical name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            ConflictPolicy::Error => "error",
            ConflictPolicy::Warn => "warn",
            ConflictPolicy::Replace => "replace",
        }
    }
}

impl fmt::Display for ConflictPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConflictPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "error" => Ok(ConflictPolicy::Error),
            "warn" => Ok(ConflictPolicy::Warn),
            "replace" => Ok(ConflictPolicy::Replace),
            other => Err(format!(
                "unknown conflict policy '{other}' (expected error, warn, or replace)"
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_warn() {
        assert_eq!(ConflictPolicy::default(), ConflictPolicy::Warn);
    }

    #[test]
    fn test_from_str_round_trip() {
        for policy in [
            ConflictPolicy::Error,
            ConflictPolicy::Warn,
            ConflictPolicy::Replace,
        ] {
            assert_eq!(policy.as_str().parse::<ConflictPolicy>().unwrap(), policy);
        }
        assert!("overwrite".parse::<ConflictPolicy>().is_err());
    }
}
