//! Capability flags and the set algebra over them.
//!
//! A [`CapabilityFlag`] is an opaque token such as `aes` or `atomics`, exactly
//! as a feature-discovery command prints it.  Flags compare by exact string
//! equality: no case folding, no synonym resolution, no trimming beyond what
//! the line parser does to split tokens.
//!
//! A [`FeatureSet`] is backed by a `BTreeSet` so that iteration and
//! [`Display`](fmt::Display) output are sorted.  That keeps printed sets
//! stable between runs, which matters because failure output is meant to be
//! copied straight into a table entry.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::collections::btree_set;
use std::collections::BTreeSet;
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

// ─── CapabilityFlag ──────────────────────────────────────────────────

/// A single CPU-visible feature token.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CapabilityFlag(String);

impl CapabilityFlag {
    /// Wrap a token verbatim.
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// The token as printed by the discovery command.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for CapabilityFlag {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for CapabilityFlag {
    fn from(token: &str) -> Self {
        Self::new(token)
    }
}

impl From<String> for CapabilityFlag {
    fn from(token: String) -> Self {
        Self::new(token)
    }
}

impl fmt::Display for CapabilityFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ─── FeatureSet ──────────────────────────────────────────────────────

/// An unordered collection of unique [`CapabilityFlag`]s.
///
/// # Examples
///
/// ```
/// use cpuparity_registry::FeatureSet;
///
/// let host = FeatureSet::parse("fp asimd aes sve\n");
/// let guest = FeatureSet::parse("fp asimd aes ssbs");
///
/// assert_eq!(host.difference(&guest).to_string(), "sve");
/// assert_eq!(guest.difference(&host).to_string(), "ssbs");
/// assert_eq!(host.union(&guest).len(), 5);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureSet {
    flags: BTreeSet<CapabilityFlag>,
}

impl FeatureSet {
    /// The empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a raw capability line.
    ///
    /// Leading and trailing whitespace is trimmed and the remainder split on
    /// runs of whitespace.  Every token is kept verbatim; nothing is dropped
    /// or renamed.  An empty or all-whitespace line yields the empty set.
    pub fn parse(line: &str) -> Self {
        line.trim().split_whitespace().collect()
    }

    /// Insert a flag, returning `false` if it was already present.
    pub fn insert(&mut self, flag: impl Into<CapabilityFlag>) -> bool {
        self.flags.insert(flag.into())
    }

    /// Whether `flag` is a member of this set.
    pub fn contains(&self, flag: &str) -> bool {
        self.flags.contains(flag)
    }

    /// Number of flags in the set.
    pub fn len(&self) -> usize {
        self.flags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }

    /// Iterate over the flags in sorted order.
    pub fn iter(&self) -> btree_set::Iter<'_, CapabilityFlag> {
        self.flags.iter()
    }

    /// Every flag present in either `self` or `other`.
    pub fn union(&self, other: &FeatureSet) -> FeatureSet {
        let flags: BTreeSet<CapabilityFlag> = self.flags.union(&other.flags).cloned().collect();

        debug_assert!(flags.len() >= self.len() && flags.len() >= other.len());
        FeatureSet { flags }
    }

    /// Flags present in `self` but not in `other` (`self − other`).
    pub fn difference(&self, other: &FeatureSet) -> FeatureSet {
        let flags: BTreeSet<CapabilityFlag> =
            self.flags.difference(&other.flags).cloned().collect();

        debug_assert!(flags.iter().all(|f| !other.flags.contains(f)));
        FeatureSet { flags }
    }

    /// Whether every flag of `other` is also in `self`.
    pub fn is_superset(&self, other: &FeatureSet) -> bool {
        self.flags.is_superset(&other.flags)
    }

    /// Whether every flag of `self` is also in `other`.
    pub fn is_subset(&self, other: &FeatureSet) -> bool {
        self.flags.is_subset(&other.flags)
    }
}

/// Free-function form of [`FeatureSet::union`].
///
/// Pure, commutative and associative; used to layer add-on sets onto a
/// base generation.
pub fn union(a: &FeatureSet, b: &FeatureSet) -> FeatureSet {
    a.union(b)
}

impl<F: Into<CapabilityFlag>> FromIterator<F> for FeatureSet {
    fn from_iter<I: IntoIterator<Item = F>>(iter: I) -> Self {
        Self {
            flags: iter.into_iter().map(Into::into).collect(),
        }
    }
}

impl<F: Into<CapabilityFlag>> Extend<F> for FeatureSet {
    fn extend<I: IntoIterator<Item = F>>(&mut self, iter: I) {
        self.flags.extend(iter.into_iter().map(Into::into));
    }
}

impl<'a> IntoIterator for &'a FeatureSet {
    type Item = &'a CapabilityFlag;
    type IntoIter = btree_set::Iter<'a, CapabilityFlag>;

    fn into_iter(self) -> Self::IntoIter {
        self.flags.iter()
    }
}

impl IntoIterator for FeatureSet {
    type Item = CapabilityFlag;
    type IntoIter = btree_set::IntoIter<CapabilityFlag>;

    fn into_iter(self) -> Self::IntoIter {
        self.flags.into_iter()
    }
}

impl FromStr for FeatureSet {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

/// Space-separated, sorted; the same shape as an `lscpu` flags line.
impl fmt::Display for FeatureSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for flag in &self.flags {
            if !first {
                f.write_str(" ")?;
            }
            f.write_str(flag.as_str())?;
            first = false;
        }
        Ok(())
    }
}
