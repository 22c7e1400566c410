//! Feature-compatibility reconciliation engine.
//!
//! Given a host CPU model, a guest CPU template and optionally the guest
//! kernel capability, this crate computes the exact capability flags the
//! guest must report, and checks observed host/guest flag sets against the
//! per-model policy of expected one-sided differences.
//!
//! # Architecture
//!
//! - [`model`]: closed [`HardwareModel`], [`SoftwareTemplate`] and
//!   [`KernelCapability`] identifiers
//! - [`table`]: the explicit decision table behind [`resolve_expected`]
//! - [`diff`]: directional differences and [`assert_match`]
//! - [`policy`]: host-vs-guest rows behind [`assert_expected_diff`]
//! - [`error`]: [`ReconcileError`], the structured failure payloads
//!
//! Everything here is stateless: the tables are `static` data and every
//! function is pure, so checks for many configurations can run concurrently
//! without coordination.

pub mod diff;
pub mod error;
pub mod model;
pub mod policy;
pub mod table;

pub use diff::{assert_match, Asymmetry, FeatureDiff};
pub use error::{ConfigKey, ReconcileError};
pub use model::{HardwareModel, KernelCapability, SoftwareTemplate};
pub use policy::{assert_expected_diff, policy_for, AsymmetryPolicy, ASYMMETRY_POLICIES};
pub use table::{
    resolve_expected, supported_configurations, Composition, KernelRequirement, TableEntry,
    EXPECTED_FEATURES,
};
