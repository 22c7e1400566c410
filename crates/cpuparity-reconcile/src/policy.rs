//! Host-vs-guest asymmetry policy.
//!
//! Some flags legitimately appear on one side only.  The guest always
//! reports `ssbs` because the hypervisor injects it whatever the host
//! advertises, and V1 hosts hide scalable vectors and pointer authentication
//! unless a template asks for them.  Each onboarded model lists exactly which
//! flags are host-only and which are guest-only; anything else is a
//! regression.
//!
//! A model without a row is never skipped: the check fails with
//! [`UnmappedConfiguration`](ReconcileError::UnmappedConfiguration) and the
//! error carries the differences it observed so they can become the new row.

use crate::diff::Asymmetry;
use crate::error::{ConfigKey, ReconcileError};
use crate::model::HardwareModel;
use crate::table::Composition;
use cpuparity_registry::{FeatureSet, SVE_AND_PAC};
use log::{debug, warn};

/// The documented one-sided differences for one hardware model.
#[derive(Debug)]
pub struct AsymmetryPolicy {
    pub hardware_model: HardwareModel,
    /// Expected `host − guest`.
    pub host_only: Composition,
    /// Expected `guest − host`.
    pub guest_only: Composition,
}

impl AsymmetryPolicy {
    /// Materialize the expected differences.
    pub fn expected(&self) -> Asymmetry {
        Asymmetry {
            host_only: self.host_only.resolve(),
            guest_only: self.guest_only.resolve(),
        }
    }
}

/// Every onboarded hardware model.
///
/// Additional hypervisor-injected flags need an explicit new entry here;
/// there is no wildcard.
pub static ASYMMETRY_POLICIES: &[AsymmetryPolicy] = &[
    AsymmetryPolicy {
        hardware_model: HardwareModel::NeoverseN1,
        host_only: Composition::EMPTY,
        guest_only: Composition::flags(&["ssbs"]),
    },
    AsymmetryPolicy {
        hardware_model: HardwareModel::NeoverseV1,
        host_only: Composition {
            baselines: &[&SVE_AND_PAC],
            flags: &[],
        },
        guest_only: Composition::flags(&["ssbs"]),
    },
];

/// Find the policy row for `hardware_model`, if it is onboarded.
pub fn policy_for(hardware_model: HardwareModel) -> Option<&'static AsymmetryPolicy> {
    ASYMMETRY_POLICIES
        .iter()
        .find(|policy| policy.hardware_model == hardware_model)
}

/// Check that host and guest differ exactly as the model's policy says.
///
/// Computes `host − guest` and `guest − host` and compares each against
/// the registered row.  Pure; the observed sets are not retained.
///
/// ```
/// use cpuparity_reconcile::{assert_expected_diff, HardwareModel, ReconcileError};
/// use cpuparity_registry::FeatureSet;
///
/// let host = FeatureSet::parse("fp asimd aes");
/// let guest = FeatureSet::parse("fp asimd aes ssbs");
/// assert!(assert_expected_diff(&host, &guest, HardwareModel::NeoverseN1).is_ok());
///
/// let err = assert_expected_diff(&host, &guest, HardwareModel::NeoverseV2).unwrap_err();
/// assert!(matches!(err, ReconcileError::UnmappedConfiguration { .. }));
/// ```
pub fn assert_expected_diff(
    host: &FeatureSet,
    guest: &FeatureSet,
    hardware_model: HardwareModel,
) -> Result<(), ReconcileError> {
    let actual = Asymmetry::between(host, guest);
    debug!("host vs guest on {hardware_model}: {actual}");

    let Some(policy) = policy_for(hardware_model) else {
        warn!("no host-vs-guest policy for {hardware_model}; observed {actual}");
        return Err(ReconcileError::UnmappedConfiguration {
            key: ConfigKey::Asymmetry { hardware_model },
            observed: Some(actual),
        });
    };

    let expected = policy.expected();
    if actual == expected {
        Ok(())
    } else {
        Err(ReconcileError::UnexpectedAsymmetry {
            hardware_model,
            expected,
            actual,
        })
    }
}
