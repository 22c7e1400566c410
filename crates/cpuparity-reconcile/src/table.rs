//! The expected-features decision table.
//!
//! Resolution is a lookup, not a computation: every supported
//! (model, template, kernel) combination has exactly one row, and a
//! combination without a row is an
//! [`UnmappedConfiguration`](ReconcileError::UnmappedConfiguration) error.
//! An empty expected set is only ever the result of a row that says so.
//!
//! | Model | Template                   | Kernel  | Expected                   |
//! |-------|----------------------------|---------|----------------------------|
//! | N1    | `v1n1`                     | any     | GRAVITON2                  |
//! | N1    | none                       | any     | GRAVITON2                  |
//! | V1    | `v1n1`                     | any     | GRAVITON2                  |
//! | V1    | `aarch64_with_sve_and_pac` | ≥ 5.10  | GRAVITON3 ∪ SVE_AND_PAC    |
//! | V1    | none                       | ≥ 5.10  | GRAVITON3                  |

use crate::error::{ConfigKey, ReconcileError};
use crate::model::{HardwareModel, KernelCapability, SoftwareTemplate};
use cpuparity_registry::{Baseline, FeatureSet, GRAVITON2, GRAVITON3, SVE_AND_PAC};
use log::{debug, warn};
use std::fmt;

// ─── Composition ─────────────────────────────────────────────────────

/// A feature set described by reference to registry baselines, plus any
/// literal flags that belong to no baseline.
///
/// Table rows hold a `Composition` rather than a materialized set so that a
/// change to a baseline reaches every row that names it.
#[derive(Debug)]
pub struct Composition {
    pub(crate) baselines: &'static [&'static Baseline],
    pub(crate) flags: &'static [&'static str],
}

impl Composition {
    /// The explicit empty set.
    pub const EMPTY: Composition = Composition::new(&[], &[]);

    pub const fn new(
        baselines: &'static [&'static Baseline],
        flags: &'static [&'static str],
    ) -> Self {
        Self { baselines, flags }
    }

    pub const fn flags(flags: &'static [&'static str]) -> Self {
        Self::new(&[], flags)
    }

    /// Union of every referenced baseline and literal flag.
    pub fn resolve(&self) -> FeatureSet {
        let literal: FeatureSet = self.flags.iter().copied().collect();
        self.baselines
            .iter()
            .fold(literal, |acc, baseline| acc.union(&baseline.features()))
    }
}

impl fmt::Display for Composition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts: Vec<String> = self.baselines.iter().map(|b| b.name().to_string()).collect();
        if !self.flags.is_empty() {
            parts.push(format!("{{{}}}", self.flags.join(" ")));
        }
        if parts.is_empty() {
            f.write_str("{}")
        } else {
            f.write_str(&parts.join(" + "))
        }
    }
}

// ─── Kernel requirement ──────────────────────────────────────────────

/// Kernel column of a table row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KernelRequirement {
    /// The row applies whatever the guest kernel.
    Any,
    /// The row only applies to guests at or above this level.
    AtLeast(KernelCapability),
}

impl KernelRequirement {
    /// Whether a caller-supplied kernel level selects this row.
    ///
    /// `None` means the caller did not narrow by kernel, which admits every
    /// row.
    pub fn admits(self, kernel: Option<KernelCapability>) -> bool {
        match (self, kernel) {
            (KernelRequirement::Any, _) => true,
            (KernelRequirement::AtLeast(_), None) => true,
            (KernelRequirement::AtLeast(min), Some(kernel)) => kernel >= min,
        }
    }
}

impl fmt::Display for KernelRequirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KernelRequirement::Any => f.write_str("any"),
            KernelRequirement::AtLeast(kernel) => write!(f, ">= {kernel}"),
        }
    }
}

// ─── Table ───────────────────────────────────────────────────────────

/// One row of the decision table.
#[derive(Debug)]
pub struct TableEntry {
    pub hardware_model: HardwareModel,
    pub template: SoftwareTemplate,
    pub kernel: KernelRequirement,
    pub expected: Composition,
}

/// Every onboarded (model, template, kernel) combination.
pub static EXPECTED_FEATURES: &[TableEntry] = &[
    TableEntry {
        hardware_model: HardwareModel::NeoverseN1,
        template: SoftwareTemplate::V1n1,
        kernel: KernelRequirement::Any,
        expected: Composition {
            baselines: &[&GRAVITON2],
            flags: &[],
        },
    },
    TableEntry {
        hardware_model: HardwareModel::NeoverseN1,
        template: SoftwareTemplate::None,
        kernel: KernelRequirement::Any,
        expected: Composition {
            baselines: &[&GRAVITON2],
            flags: &[],
        },
    },
    TableEntry {
        hardware_model: HardwareModel::NeoverseV1,
        template: SoftwareTemplate::V1n1,
        kernel: KernelRequirement::Any,
        expected: Composition {
            baselines: &[&GRAVITON2],
            flags: &[],
        },
    },
    // [cm]7g hosts expose the generation-3 surface from guest kernel 5.10 on.
    TableEntry {
        hardware_model: HardwareModel::NeoverseV1,
        template: SoftwareTemplate::Aarch64WithSveAndPac,
        kernel: KernelRequirement::AtLeast(KernelCapability::Modern),
        expected: Composition {
            baselines: &[&GRAVITON3, &SVE_AND_PAC],
            flags: &[],
        },
    },
    TableEntry {
        hardware_model: HardwareModel::NeoverseV1,
        template: SoftwareTemplate::None,
        kernel: KernelRequirement::AtLeast(KernelCapability::Modern),
        expected: Composition {
            baselines: &[&GRAVITON3],
            flags: &[],
        },
    },
];

/// Find the table row for a configuration, if any.
pub fn lookup(
    hardware_model: HardwareModel,
    template: SoftwareTemplate,
    kernel: Option<KernelCapability>,
) -> Option<&'static TableEntry> {
    EXPECTED_FEATURES.iter().find(|entry| {
        entry.hardware_model == hardware_model
            && entry.template == template
            && entry.kernel.admits(kernel)
    })
}

/// Resolve the exact feature set a guest must report.
///
/// `kernel` narrows the lookup only for rows whose surface depends on the
/// guest kernel; passing `None` leaves it un-narrowed.
///
/// ```
/// use cpuparity_reconcile::{resolve_expected, HardwareModel, SoftwareTemplate};
///
/// let expected = resolve_expected(HardwareModel::NeoverseN1, SoftwareTemplate::V1n1, None)?;
/// assert!(expected.contains("aes"));
/// assert!(!expected.contains("sve"));
///
/// assert!(resolve_expected(HardwareModel::NeoverseV2, SoftwareTemplate::None, None).is_err());
/// # Ok::<(), cpuparity_reconcile::ReconcileError>(())
/// ```
pub fn resolve_expected(
    hardware_model: HardwareModel,
    template: SoftwareTemplate,
    kernel: Option<KernelCapability>,
) -> Result<FeatureSet, ReconcileError> {
    match lookup(hardware_model, template, kernel) {
        Some(entry) => {
            let expected = entry.expected.resolve();
            debug!(
                "resolved model={} template={} kernel={:?} -> {} ({} flags)",
                hardware_model,
                template,
                kernel,
                entry.expected,
                expected.len(),
            );
            Ok(expected)
        }
        None => {
            let key = ConfigKey::Expected {
                hardware_model,
                template,
                kernel,
            };
            warn!("no expected-features entry for {key}");
            Err(ReconcileError::UnmappedConfiguration {
                key,
                observed: None,
            })
        }
    }
}

/// Every row key of the decision table, in table order.
pub fn supported_configurations(
) -> impl Iterator<Item = (HardwareModel, SoftwareTemplate, KernelRequirement)> {
    EXPECTED_FEATURES
        .iter()
        .map(|entry| (entry.hardware_model, entry.template, entry.kernel))
}
