//! Closed identifiers that key the decision and policy tables.
//!
//! Every enum here is deliberately closed: parsing an unrecognized name is an
//! error, never a fallback to some default variant.  A model can also be
//! *known* (present in [`HardwareModel`]) without being onboarded in the
//! tables; looking it up then fails with
//! [`ReconcileError::UnmappedConfiguration`](crate::ReconcileError::UnmappedConfiguration).

use crate::error::ReconcileError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ─── HardwareModel ───────────────────────────────────────────────────

/// Host CPU microarchitecture family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HardwareModel {
    /// Arm Neoverse N1 (generation 2 hosts).
    NeoverseN1,
    /// Arm Neoverse V1 (generation 3 hosts).
    NeoverseV1,
    /// Arm Neoverse V2.  Known, not onboarded.
    NeoverseV2,
}

impl HardwareModel {
    /// Every known model, onboarded or not.
    pub const ALL: [HardwareModel; 3] = [
        HardwareModel::NeoverseN1,
        HardwareModel::NeoverseV1,
        HardwareModel::NeoverseV2,
    ];

    /// Canonical name, as accepted by [`FromStr`] and printed by `Display`.
    pub fn name(self) -> &'static str {
        match self {
            HardwareModel::NeoverseN1 => "neoverse-n1",
            HardwareModel::NeoverseV1 => "neoverse-v1",
            HardwareModel::NeoverseV2 => "neoverse-v2",
        }
    }
}

impl fmt::Display for HardwareModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Accepts the canonical name, the short core name (`N1`), the `lscpu`
/// "Model name" spelling (`Neoverse-N1`) and the constant-style spelling
/// (`ARM_NEOVERSE_N1`), case-insensitively.
impl FromStr for HardwareModel {
    type Err = ReconcileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('_', "-");
        let core = normalized.strip_prefix("arm-").unwrap_or(&normalized);
        let core = core.strip_prefix("neoverse-").unwrap_or(core);

        match core {
            "n1" => Ok(HardwareModel::NeoverseN1),
            "v1" => Ok(HardwareModel::NeoverseV1),
            "v2" => Ok(HardwareModel::NeoverseV2),
            _ => Err(ReconcileError::UnknownHardwareModel(s.trim().to_string())),
        }
    }
}

// ─── SoftwareTemplate ────────────────────────────────────────────────

/// CPU template the hypervisor applies to the guest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SoftwareTemplate {
    /// No template requested; the guest sees the host-derived default.
    None,
    /// Pins the generation-2 surface on both N1 and V1 hosts.
    V1n1,
    /// Generation-3 surface plus scalable vectors and pointer authentication.
    Aarch64WithSveAndPac,
}

impl SoftwareTemplate {
    pub const ALL: [SoftwareTemplate; 3] = [
        SoftwareTemplate::None,
        SoftwareTemplate::V1n1,
        SoftwareTemplate::Aarch64WithSveAndPac,
    ];

    pub fn name(self) -> &'static str {
        match self {
            SoftwareTemplate::None => "none",
            SoftwareTemplate::V1n1 => "v1n1",
            SoftwareTemplate::Aarch64WithSveAndPac => "aarch64_with_sve_and_pac",
        }
    }

    /// Map an optional template name, as reported by a VM's configuration,
    /// where `None` means no template was requested.
    pub fn from_requested(name: Option<&str>) -> Result<Self, ReconcileError> {
        match name {
            None => Ok(SoftwareTemplate::None),
            Some(name) => name.parse(),
        }
    }
}

impl fmt::Display for SoftwareTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SoftwareTemplate {
    type Err = ReconcileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "none" | "" => Ok(SoftwareTemplate::None),
            "v1n1" => Ok(SoftwareTemplate::V1n1),
            "aarch64_with_sve_and_pac" => Ok(SoftwareTemplate::Aarch64WithSveAndPac),
            other => Err(ReconcileError::UnknownTemplate(other.to_string())),
        }
    }
}

// ─── KernelCapability ────────────────────────────────────────────────

/// First guest kernel release that exposes the extended generation-3
/// surface.
pub const MODERN_KERNEL: (u32, u32) = (5, 10);

/// Guest kernel capability level.
///
/// Ordered: `Legacy < Modern`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KernelCapability {
    /// Older than 5.10.
    Legacy,
    /// 5.10 or newer.
    Modern,
}

impl KernelCapability {
    /// Classify a `major.minor` kernel release.
    pub fn from_release(major: u32, minor: u32) -> Self {
        if (major, minor) >= MODERN_KERNEL {
            KernelCapability::Modern
        } else {
            KernelCapability::Legacy
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            KernelCapability::Legacy => "legacy",
            KernelCapability::Modern => "modern",
        }
    }
}

impl fmt::Display for KernelCapability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Accepts `legacy`, `modern`, or a release such as `5.10`, `6.1.55` or
/// `vmlinux-4.14` (the leading non-digit prefix is skipped).
impl FromStr for KernelCapability {
    type Err = ReconcileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        match trimmed.to_ascii_lowercase().as_str() {
            "legacy" => return Ok(KernelCapability::Legacy),
            "modern" => return Ok(KernelCapability::Modern),
            _ => {}
        }

        let release = trimmed.trim_start_matches(|c: char| !c.is_ascii_digit());
        let mut parts = release.split('.');
        let major = parts.next().and_then(|p| p.parse::<u32>().ok());
        let minor = parts.next().and_then(|p| {
            let digits: String = p.chars().take_while(char::is_ascii_digit).collect();
            digits.parse::<u32>().ok()
        });

        match (major, minor) {
            (Some(major), Some(minor)) => Ok(KernelCapability::from_release(major, minor)),
            _ => Err(ReconcileError::UnknownKernel(trimmed.to_string())),
        }
    }
}
