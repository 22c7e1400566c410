//! Feature baseline registry for cpuparity.
//!
//! This crate owns the vocabulary shared by every other cpuparity crate:
//!
//! - [`feature_set`]: [`CapabilityFlag`] tokens and the [`FeatureSet`]
//!   set algebra (union, difference, subset tests) plus the parser for a
//!   raw `lscpu` flags line.
//! - [`baseline`]: named, composable [`Baseline`]s stored as immutable
//!   `static` data.  A later generation *extends* an earlier one by
//!   reference, so a change to a shared baseline propagates to every
//!   superset built on top of it.
//!
//! The registry has no dependencies on the reconciliation engine and never
//! touches a guest or host; it is pure data plus pure functions.

pub mod baseline;
pub mod feature_set;

pub use baseline::{
    lookup, validate_registry, Baseline, RegistryError, GRAVITON2, GRAVITON3, REGISTRY,
    SVE_AND_PAC,
};
pub use feature_set::{union, CapabilityFlag, FeatureSet};
