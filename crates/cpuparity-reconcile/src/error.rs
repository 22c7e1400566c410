//! Error taxonomy of the reconciliation engine.
//!
//! Every variant carries enough structured data to be pasted into an
//! updated table entry: the full configuration key and, where a comparison
//! happened, both directional set differences.  All variants are
//! `Serialize` so a caller can emit them as JSON instead of prose.

use crate::diff::{Asymmetry, FeatureDiff};
use crate::model::{HardwareModel, KernelCapability, SoftwareTemplate};
use cpuparity_registry::FeatureSet;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// The lookup key that missed a table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "table", rename_all = "snake_case")]
pub enum ConfigKey {
    /// Key into the expected-features decision table.
    Expected {
        hardware_model: HardwareModel,
        template: SoftwareTemplate,
        kernel: Option<KernelCapability>,
    },
    /// Key into the host/guest asymmetry policy table.
    Asymmetry { hardware_model: HardwareModel },
}

impl fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigKey::Expected {
                hardware_model,
                template,
                kernel,
            } => {
                write!(f, "model={hardware_model} template={template} kernel=")?;
                match kernel {
                    Some(kernel) => write!(f, "{kernel}"),
                    None => f.write_str("any"),
                }
            }
            ConfigKey::Asymmetry { hardware_model } => {
                write!(f, "host-vs-guest policy for model={hardware_model}")
            }
        }
    }
}

/// Errors produced while resolving or checking feature sets.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum ReconcileError {
    /// The key is absent from its table.  Never defaulted.
    #[error("unmapped configuration ({key}): please onboard this new configuration{}", observed_suffix(.observed))]
    UnmappedConfiguration {
        key: ConfigKey,
        /// The differences that were computed before the lookup failed,
        /// ready to become the new table entry.
        observed: Option<Asymmetry>,
    },

    /// Observed and expected feature sets differ.
    #[error("feature mismatch\n{diff}\n  observed:   {observed}")]
    FeatureMismatch {
        diff: FeatureDiff,
        observed: FeatureSet,
    },

    /// Host-vs-guest differences do not match the registered policy.
    #[error("unexpected host/guest asymmetry on {hardware_model}\n  expected: {expected}\n  actual:   {actual}")]
    UnexpectedAsymmetry {
        hardware_model: HardwareModel,
        expected: Asymmetry,
        actual: Asymmetry,
    },

    /// A hardware model name outside the closed enumeration.
    #[error("unknown hardware model {0:?}: please onboard this new CPU model")]
    UnknownHardwareModel(String),

    /// A CPU template name outside the closed enumeration.
    #[error("unknown CPU template {0:?}")]
    UnknownTemplate(String),

    /// A kernel capability or release string that could not be classified.
    #[error("unrecognized guest kernel {0:?}")]
    UnknownKernel(String),
}

fn observed_suffix(observed: &Option<Asymmetry>) -> String {
    match observed {
        Some(asymmetry) => format!("\n  observed: {asymmetry}"),
        None => String::new(),
    }
}
