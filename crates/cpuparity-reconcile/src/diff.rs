//! Directional set differences and the exact-match check.

use crate::error::ReconcileError;
use cpuparity_registry::FeatureSet;
use log::debug;
use serde::{Deserialize, Serialize};
use std::fmt;

// ─── FeatureDiff ─────────────────────────────────────────────────────

/// Both directions of an observed-vs-expected comparison.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureDiff {
    /// `expected − observed`: features the guest failed to report.
    pub missing: FeatureSet,
    /// `observed − expected`: features the guest should not report.
    pub unexpected: FeatureSet,
}

impl FeatureDiff {
    pub fn between(observed: &FeatureSet, expected: &FeatureSet) -> Self {
        Self {
            missing: expected.difference(observed),
            unexpected: observed.difference(expected),
        }
    }

    /// `true` when both directions are empty, i.e. the sets are equal.
    pub fn is_empty(&self) -> bool {
        self.missing.is_empty() && self.unexpected.is_empty()
    }
}

impl fmt::Display for FeatureDiff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "  missing:    {}", self.missing)?;
        write!(f, "  unexpected: {}", self.unexpected)
    }
}

// ─── Asymmetry ───────────────────────────────────────────────────────

/// Host-vs-guest differences, expected or observed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asymmetry {
    /// `host − guest`.
    pub host_only: FeatureSet,
    /// `guest − host`.
    pub guest_only: FeatureSet,
}

impl Asymmetry {
    pub fn between(host: &FeatureSet, guest: &FeatureSet) -> Self {
        Self {
            host_only: host.difference(guest),
            guest_only: guest.difference(host),
        }
    }
}

impl fmt::Display for Asymmetry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "host-only [{}] guest-only [{}]",
            self.host_only, self.guest_only
        )
    }
}

// ─── assert_match ────────────────────────────────────────────────────

/// Succeed iff `observed == expected` as sets.
///
/// On failure the error reports both `expected − observed` and
/// `observed − expected`, plus the observed set itself.
///
/// ```
/// use cpuparity_reconcile::{assert_match, ReconcileError};
/// use cpuparity_registry::FeatureSet;
///
/// let expected = FeatureSet::parse("fp asimd aes");
/// assert!(assert_match(&FeatureSet::parse("aes asimd fp"), &expected).is_ok());
///
/// match assert_match(&FeatureSet::parse("fp aes sve"), &expected) {
///     Err(ReconcileError::FeatureMismatch { diff, .. }) => {
///         assert_eq!(diff.missing.to_string(), "asimd");
///         assert_eq!(diff.unexpected.to_string(), "sve");
///     }
///     other => panic!("unexpected result: {other:?}"),
/// }
/// ```
pub fn assert_match(observed: &FeatureSet, expected: &FeatureSet) -> Result<(), ReconcileError> {
    let diff = FeatureDiff::between(observed, expected);
    debug!(
        "assert_match: observed={} expected={} missing={} unexpected={}",
        observed.len(),
        expected.len(),
        diff.missing.len(),
        diff.unexpected.len(),
    );

    if diff.is_empty() {
        debug_assert_eq!(observed, expected);
        Ok(())
    } else {
        Err(ReconcileError::FeatureMismatch {
            diff,
            observed: observed.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(line: &str) -> FeatureSet {
        FeatureSet::parse(line)
    }

    #[test]
    fn equal_sets_match() {
        assert_eq!(assert_match(&set("fp aes"), &set("aes fp")), Ok(()));
        assert_eq!(assert_match(&set(""), &set("")), Ok(()));
    }

    #[test]
    fn missing_only() {
        let (diff, observed) = match assert_match(&set("fp"), &set("fp aes")) {
            Err(ReconcileError::FeatureMismatch { diff, observed }) => (diff, observed),
            other => panic!("expected FeatureMismatch, got {other:?}"),
        };
        assert_eq!(diff.missing, set("aes"));
        assert!(diff.unexpected.is_empty());
        assert_eq!(observed, set("fp"));
    }

    #[test]
    fn unexpected_only() {
        let diff = match assert_match(&set("fp aes sve"), &set("fp aes")) {
            Err(ReconcileError::FeatureMismatch { diff, .. }) => diff,
            other => panic!("expected FeatureMismatch, got {other:?}"),
        };
        assert!(diff.missing.is_empty());
        assert_eq!(diff.unexpected, set("sve"));
    }

    #[test]
    fn mismatch_message_reports_both_directions() {
        let err = assert_match(&set("fp sve"), &set("fp aes")).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("missing:    aes"), "{msg}");
        assert!(msg.contains("unexpected: sve"), "{msg}");
        assert!(msg.contains("observed:   fp sve"), "{msg}");
    }

    #[test]
    fn asymmetry_between() {
        let a = Asymmetry::between(&set("fp aes sve"), &set("fp aes ssbs"));
        assert_eq!(a.host_only, set("sve"));
        assert_eq!(a.guest_only, set("ssbs"));
        assert_eq!(a.to_string(), "host-only [sve] guest-only [ssbs]");
    }

    #[test]
    fn diff_is_empty_only_for_equal_sets() {
        assert!(FeatureDiff::between(&set("a b"), &set("b a")).is_empty());
        assert!(!FeatureDiff::between(&set("a"), &set("b")).is_empty());
    }
}
