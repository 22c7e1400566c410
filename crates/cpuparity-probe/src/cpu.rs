//! CPU feature checks over a command session.
//!
//! Both host and guest report their capability flags through `lscpu`; the
//! flags line is the only output consumed.  Expected sets come from the
//! reconciliation engine, so these functions only glue collaborator output
//! to [`assert_match`] and [`assert_expected_diff`].

use crate::error::CheckError;
use crate::session::GuestSession;
use cpuparity_reconcile::{
    assert_expected_diff, assert_match, resolve_expected, Asymmetry, HardwareModel,
    KernelCapability, SoftwareTemplate,
};
use cpuparity_registry::FeatureSet;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Prints the value of the `Flags:` line of `lscpu`.
pub const CPU_FLAGS_COMMAND: &str = r"lscpu |grep -oP '^Flags:\s+\K.+'";

/// Prints the value of the `Model name:` line of `lscpu`.
pub const CPU_MODEL_COMMAND: &str = r"lscpu |grep -oP '^Model name:\s+\K.+'";

/// The configuration a guest was launched with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuestTarget {
    /// Host CPU model the guest runs on.
    pub hardware_model: HardwareModel,
    /// CPU template applied by the hypervisor.
    pub template: SoftwareTemplate,
    /// Guest kernel level, when known.
    pub kernel: Option<KernelCapability>,
}

impl GuestTarget {
    /// A guest launched without a CPU template.
    pub fn untemplated(hardware_model: HardwareModel) -> Self {
        Self {
            hardware_model,
            template: SoftwareTemplate::None,
            kernel: None,
        }
    }
}

impl fmt::Display for GuestTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.hardware_model, self.template)?;
        if let Some(kernel) = self.kernel {
            write!(f, "/{kernel}")?;
        }
        Ok(())
    }
}

/// Fetch and parse the capability flags visible in a session.
pub fn fetch_flags(session: &mut dyn GuestSession) -> Result<FeatureSet, CheckError> {
    let output = session.check_output(CPU_FLAGS_COMMAND)?;
    let flags = FeatureSet::parse(&output.stdout);
    debug!("fetched {} flags", flags.len());
    Ok(flags)
}

/// Identify the CPU model from `lscpu`'s model name.
///
/// A name outside the known models fails with
/// [`ReconcileError::UnknownHardwareModel`](cpuparity_reconcile::ReconcileError::UnknownHardwareModel).
pub fn detect_hardware_model(session: &mut dyn GuestSession) -> Result<HardwareModel, CheckError> {
    let output = session.check_output(CPU_MODEL_COMMAND)?;
    let model = output.stdout.parse::<HardwareModel>()?;
    debug!("detected hardware model {model}");
    Ok(model)
}

/// Check that the guest reports exactly the flags expected for `target`.
///
/// The expected set is resolved before the guest is queried, so an
/// un-onboarded configuration fails without touching the collaborator.
/// Returns the observed flags on success.
pub fn check_guest_cpu_features(
    guest: &mut dyn GuestSession,
    target: &GuestTarget,
) -> Result<FeatureSet, CheckError> {
    let expected = resolve_expected(target.hardware_model, target.template, target.kernel)?;
    let observed = fetch_flags(guest)?;
    assert_match(&observed, &expected)?;
    info!("guest CPU features match {target} ({} flags)", observed.len());
    Ok(observed)
}

/// Check host-vs-guest flag differences against the model's policy.
///
/// Returns the observed differences on success.
pub fn check_host_vs_guest(
    host: &mut dyn GuestSession,
    guest: &mut dyn GuestSession,
    hardware_model: HardwareModel,
) -> Result<Asymmetry, CheckError> {
    let host_flags = fetch_flags(host)?;
    let guest_flags = fetch_flags(guest)?;
    assert_expected_diff(&host_flags, &guest_flags, hardware_model)?;

    let asymmetry = Asymmetry::between(&host_flags, &guest_flags);
    info!("host vs guest on {hardware_model} matches policy: {asymmetry}");
    Ok(asymmetry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionError;
    use crate::testing::ScriptedSession;
    use cpuparity_reconcile::{ConfigKey, ReconcileError};
    use cpuparity_registry::{GRAVITON2, GRAVITON3, SVE_AND_PAC};

    fn lscpu(flags: &FeatureSet) -> ScriptedSession {
        ScriptedSession::new().respond(CPU_FLAGS_COMMAND, 0, &format!("{flags}\n"))
    }

    // -- guest vs template --

    #[test]
    fn n1_guest_with_v1n1_template_passes() {
        let mut guest = lscpu(&GRAVITON2.features());
        let target = GuestTarget {
            hardware_model: HardwareModel::NeoverseN1,
            template: SoftwareTemplate::V1n1,
            kernel: None,
        };
        let observed = check_guest_cpu_features(&mut guest, &target).unwrap();
        assert_eq!(observed.len(), 17);
    }

    #[test]
    fn v1_guest_with_sve_template_passes() {
        let flags = GRAVITON3.features().union(&SVE_AND_PAC.features());
        let mut guest = lscpu(&flags);
        let target = GuestTarget {
            hardware_model: HardwareModel::NeoverseV1,
            template: SoftwareTemplate::Aarch64WithSveAndPac,
            kernel: Some(KernelCapability::Modern),
        };
        assert!(check_guest_cpu_features(&mut guest, &target).is_ok());
    }

    #[test]
    fn leaked_sve_is_a_feature_mismatch() {
        let flags = GRAVITON3.features().union(&FeatureSet::parse("sve"));
        let mut guest = lscpu(&flags);
        let target = GuestTarget::untemplated(HardwareModel::NeoverseV1);

        match check_guest_cpu_features(&mut guest, &target) {
            Err(CheckError::Reconcile(ReconcileError::FeatureMismatch { diff, .. })) => {
                assert!(diff.missing.is_empty());
                assert_eq!(diff.unexpected, FeatureSet::parse("sve"));
            }
            other => panic!("expected a feature mismatch, got {other:?}"),
        }
    }

    #[test]
    fn unmapped_target_fails_before_querying_guest() {
        let mut guest = lscpu(&GRAVITON2.features());
        let target = GuestTarget::untemplated(HardwareModel::NeoverseV2);

        let err = check_guest_cpu_features(&mut guest, &target).unwrap_err();
        assert!(matches!(
            err,
            CheckError::Reconcile(ReconcileError::UnmappedConfiguration {
                key: ConfigKey::Expected { .. },
                ..
            })
        ));
        assert!(guest.history().is_empty());
    }

    #[test]
    fn collaborator_failure_is_not_a_mismatch() {
        let mut guest = ScriptedSession::new().fail(CPU_FLAGS_COMMAND, "ssh: connection refused");
        let target = GuestTarget::untemplated(HardwareModel::NeoverseN1);

        let err = check_guest_cpu_features(&mut guest, &target).unwrap_err();
        assert!(matches!(
            err,
            CheckError::Collaborator(SessionError::Transport { .. })
        ));
    }

    #[test]
    fn non_zero_lscpu_is_a_collaborator_failure() {
        let mut guest = ScriptedSession::new().respond(CPU_FLAGS_COMMAND, 1, "");
        assert!(matches!(
            fetch_flags(&mut guest),
            Err(CheckError::Collaborator(SessionError::NonZeroExit { exit_code: 1, .. }))
        ));
    }

    // -- host vs guest --

    #[test]
    fn n1_host_vs_guest() {
        let guest_flags = GRAVITON2.features();
        let host_flags = guest_flags.difference(&FeatureSet::parse("ssbs"));
        let mut host = lscpu(&host_flags);
        let mut guest = lscpu(&guest_flags);

        let asymmetry = check_host_vs_guest(&mut host, &mut guest, HardwareModel::NeoverseN1)
            .unwrap();
        assert!(asymmetry.host_only.is_empty());
        assert_eq!(asymmetry.guest_only, FeatureSet::parse("ssbs"));
    }

    #[test]
    fn v1_host_vs_guest() {
        let guest_flags = GRAVITON3.features();
        let host_flags = guest_flags
            .union(&SVE_AND_PAC.features())
            .difference(&FeatureSet::parse("ssbs"));
        let mut host = lscpu(&host_flags);
        let mut guest = lscpu(&guest_flags);

        let asymmetry = check_host_vs_guest(&mut host, &mut guest, HardwareModel::NeoverseV1)
            .unwrap();
        assert_eq!(asymmetry.host_only, SVE_AND_PAC.features());
    }

    #[test]
    fn unknown_model_host_vs_guest_is_unmapped() {
        let mut host = lscpu(&FeatureSet::parse("fp asimd"));
        let mut guest = lscpu(&FeatureSet::parse("fp asimd ssbs"));

        let err =
            check_host_vs_guest(&mut host, &mut guest, HardwareModel::NeoverseV2).unwrap_err();
        match err {
            CheckError::Reconcile(ReconcileError::UnmappedConfiguration { observed, .. }) => {
                let observed = observed.unwrap();
                assert!(observed.host_only.is_empty());
                assert_eq!(observed.guest_only, FeatureSet::parse("ssbs"));
            }
            other => panic!("expected UnmappedConfiguration, got {other:?}"),
        }
    }

    // -- model detection --

    #[test]
    fn detects_model_from_lscpu() {
        let mut host = ScriptedSession::new().respond(CPU_MODEL_COMMAND, 0, "Neoverse-V1\n");
        assert_eq!(detect_hardware_model(&mut host).unwrap(), HardwareModel::NeoverseV1);
    }

    #[test]
    fn unknown_model_name_is_rejected() {
        let mut host = ScriptedSession::new().respond(CPU_MODEL_COMMAND, 0, "Cortex-A72\n");
        assert!(matches!(
            detect_hardware_model(&mut host),
            Err(CheckError::Reconcile(ReconcileError::UnknownHardwareModel(name))) if name == "Cortex-A72"
        ));
    }

    #[test]
    fn target_display() {
        let target = GuestTarget {
            hardware_model: HardwareModel::NeoverseV1,
            template: SoftwareTemplate::None,
            kernel: Some(KernelCapability::Modern),
        };
        assert_eq!(target.to_string(), "neoverse-v1/none/modern");
    }
}
