//! End-to-end guest checks for cpuparity.
//!
//! This crate connects the reconciliation engine to the outside world
//! through a single seam, the [`GuestSession`] trait ("run a command, get
//! exit code, stdout and stderr back").  It never implements a transport.
//!
//! - [`session`]: the collaborator contract and its errors
//! - [`cpu`]: guest-vs-template and host-vs-guest CPU feature checks
//! - [`net`]: tap offload delivery, ingress liveness and multi-queue tap
//!   rejection
//! - [`security`]: nested virtualization must not be exposed
//! - [`error`]: [`CheckError`], wrapping collaborator and engine failures
//!
//! All checks are blocking and fail fast; nothing is retried here.

pub mod cpu;
pub mod error;
pub mod net;
pub mod security;
pub mod session;

#[cfg(test)]
mod testing;

pub use cpu::{
    check_guest_cpu_features, check_host_vs_guest, detect_hardware_model, fetch_flags,
    GuestTarget, CPU_FLAGS_COMMAND, CPU_MODEL_COMMAND,
};
pub use error::CheckError;
pub use net::{
    check_high_ingress, check_ingress_liveness, check_multi_queue_tap_rejected,
    check_tap_offload, AttachError, IngressConfig, MultiQueueConfig, NetInterface,
    NetworkAttacher, OffloadSender, TapOffloadConfig,
};
pub use security::check_no_nested_virt;
pub use session::{CommandOutput, GuestSession, SessionError};
