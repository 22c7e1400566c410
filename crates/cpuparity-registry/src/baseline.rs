//! Named, composable feature baselines.
//!
//! A [`Baseline`] is `'static` data: a name, the baselines it extends (held
//! by reference, never copied), and the literal flags it adds on top.  The
//! composed surface is computed on demand by [`Baseline::features`].
//!
//! ```text
//! GRAVITON2 ─────────────▶ GRAVITON3            SVE_AND_PAC
//! (17 flags)   extends     (+16 flags)          (orthogonal add-on)
//! ```
//!
//! Composition is monotonic: a derived baseline never drops an inherited
//! flag.  Flags that are visible on one side only (host or guest) are not
//! expressed here by removal; that belongs to the reconciliation engine's
//! asymmetry policy.

use crate::feature_set::FeatureSet;
use std::collections::BTreeSet;
use thiserror::Error;

// ─── Error type ──────────────────────────────────────────────────────

/// Structural problems detected in the baseline definitions.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// The same literal flag is listed twice in one baseline.
    #[error("baseline `{baseline}` lists flag `{flag}` more than once")]
    DuplicateFlag {
        baseline: &'static str,
        flag: &'static str,
    },

    /// A baseline re-declares a flag it already inherits.
    ///
    /// Harmless for the resulting set but it hides which generation
    /// introduced the flag.
    #[error("baseline `{baseline}` re-declares `{flag}`, already inherited from `{inherited_from}`")]
    RedundantFlag {
        baseline: &'static str,
        flag: &'static str,
        inherited_from: &'static str,
    },

    /// Two registry entries share a name, so [`lookup`] is ambiguous.
    #[error("baseline name `{0}` is registered more than once")]
    DuplicateName(&'static str),
}

// ─── Baseline ────────────────────────────────────────────────────────

/// A named, reusable feature surface.
#[derive(Debug)]
pub struct Baseline {
    name: &'static str,
    extends: &'static [&'static Baseline],
    flags: &'static [&'static str],
}

impl Baseline {
    /// Declare a baseline.
    pub const fn new(
        name: &'static str,
        extends: &'static [&'static Baseline],
        flags: &'static [&'static str],
    ) -> Self {
        Self {
            name,
            extends,
            flags,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The baselines this one builds on.
    pub fn extends(&self) -> &'static [&'static Baseline] {
        self.extends
    }

    /// Flags introduced by this baseline itself, excluding inherited ones.
    pub fn own_flags(&self) -> &'static [&'static str] {
        self.flags
    }

    /// Flags inherited from every extended baseline (transitively).
    pub fn inherited(&self) -> FeatureSet {
        self.extends
            .iter()
            .fold(FeatureSet::new(), |acc, parent| acc.union(&parent.features()))
    }

    /// The full composed surface: inherited flags ∪ own flags.
    pub fn features(&self) -> FeatureSet {
        let inherited = self.inherited();
        let own: FeatureSet = self.flags.iter().copied().collect();
        let features = inherited.union(&own);

        debug_assert!(features.is_superset(&inherited));
        debug_assert!(features.is_superset(&own));
        features
    }

    /// Check this baseline's literal definition.
    ///
    /// Rejects a flag listed twice in [`own_flags`](Self::own_flags) and a
    /// flag already provided by an extended baseline.
    pub fn validate(&self) -> Result<(), RegistryError> {
        let mut seen = BTreeSet::new();
        for &flag in self.flags {
            if !seen.insert(flag) {
                return Err(RegistryError::DuplicateFlag {
                    baseline: self.name,
                    flag,
                });
            }
        }

        for parent in self.extends {
            let parent_features = parent.features();
            if let Some(&flag) = self.flags.iter().find(|f| parent_features.contains(f)) {
                return Err(RegistryError::RedundantFlag {
                    baseline: self.name,
                    flag,
                    inherited_from: parent.name,
                });
            }
        }

        Ok(())
    }
}

// ─── Registered baselines ────────────────────────────────────────────

/// Generation 2 (Neoverse N1 class) default surface.
pub static GRAVITON2: Baseline = Baseline {
    name: "graviton2",
    extends: &[],
    flags: &[
        "fp", "asimd", "evtstrm", "aes", "pmull", "sha1", "sha2", "crc32", "atomics", "fphp",
        "asimdhp", "cpuid", "asimdrdm", "lrcpc", "dcpop", "asimddp", "ssbs",
    ],
};

/// Generation 3 (Neoverse V1 class): generation 2 plus the v8.4+ additions.
pub static GRAVITON3: Baseline = Baseline {
    name: "graviton3",
    extends: &[&GRAVITON2],
    flags: &[
        "sha512", "asimdfhm", "dit", "uscat", "ilrcpc", "flagm", "jscvt", "fcma", "sha3", "sm3",
        "sm4", "rng", "dcpodp", "i8mm", "bf16", "dgh",
    ],
};

/// Scalable vector and pointer authentication add-on.
///
/// Only exposed when a template requests it explicitly.
pub static SVE_AND_PAC: Baseline = Baseline {
    name: "sve-and-pac",
    extends: &[],
    flags: &["paca", "pacg", "sve", "svebf16", "svei8mm"],
};

/// Every named baseline, in declaration order.
pub static REGISTRY: &[&Baseline] = &[&GRAVITON2, &GRAVITON3, &SVE_AND_PAC];

/// Find a registered baseline by name.
pub fn lookup(name: &str) -> Option<&'static Baseline> {
    REGISTRY.iter().copied().find(|b| b.name == name)
}

/// Validate every registered baseline and the uniqueness of their names.
pub fn validate_registry() -> Result<(), RegistryError> {
    let mut names = BTreeSet::new();
    for baseline in REGISTRY {
        if !names.insert(baseline.name) {
            return Err(RegistryError::DuplicateName(baseline.name));
        }
        baseline.validate()?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_is_valid() {
        assert_eq!(validate_registry(), Ok(()));
    }

    #[test]
    fn graviton2_has_documented_flags() {
        let g2 = GRAVITON2.features();
        assert_eq!(g2.len(), 17);
        for flag in ["aes", "sha1", "crc32", "atomics", "ssbs"] {
            assert!(g2.contains(flag), "{flag} missing from graviton2");
        }
        assert!(!g2.contains("sha512"));
        assert!(!g2.contains("sve"));
    }

    #[test]
    fn graviton3_extends_graviton2() {
        let g2 = GRAVITON2.features();
        let g3 = GRAVITON3.features();
        assert!(g3.is_superset(&g2));
        assert_eq!(g3.len(), g2.len() + GRAVITON3.own_flags().len());
        assert!(g3.contains("sha512"));
        assert!(g3.contains("dgh"));
        assert!(!g3.contains("sve"), "SVE is an add-on, not part of g3");
    }

    #[test]
    fn graviton3_references_the_shared_graviton2() {
        assert_eq!(GRAVITON3.extends().len(), 1);
        assert!(std::ptr::eq(GRAVITON3.extends()[0], &GRAVITON2));
        assert_eq!(GRAVITON3.inherited(), GRAVITON2.features());
    }

    #[test]
    fn sve_and_pac_is_disjoint_from_generations() {
        let addon = SVE_AND_PAC.features();
        assert_eq!(addon.len(), 5);
        assert!(addon.difference(&GRAVITON3.features()) == addon);
    }

    #[test]
    fn features_is_idempotent() {
        assert_eq!(GRAVITON3.features(), GRAVITON3.features());
    }

    #[test]
    fn lookup_by_name() {
        assert!(std::ptr::eq(lookup("graviton3").unwrap(), &GRAVITON3));
        assert!(lookup("graviton4").is_none());
    }

    // -- validation failures --

    static DUPLICATED: Baseline = Baseline::new("dup", &[], &["fp", "aes", "fp"]);
    static REDUNDANT: Baseline = Baseline {
        name: "redundant",
        extends: &[&GRAVITON2],
        flags: &["sve", "aes"],
    };

    #[test]
    fn validate_rejects_duplicate_literal() {
        assert_eq!(
            DUPLICATED.validate(),
            Err(RegistryError::DuplicateFlag {
                baseline: "dup",
                flag: "fp",
            })
        );
        // The composed set itself still deduplicates.
        assert_eq!(DUPLICATED.features().len(), 2);
    }

    #[test]
    fn validate_rejects_redeclared_inherited_flag() {
        let err = REDUNDANT.validate().unwrap_err();
        assert_eq!(
            err,
            RegistryError::RedundantFlag {
                baseline: "redundant",
                flag: "aes",
                inherited_from: "graviton2",
            }
        );
        assert!(err.to_string().contains("already inherited"));
    }
}
