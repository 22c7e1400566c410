//! Errors returned by the end-to-end checks.

use crate::session::SessionError;
use cpuparity_reconcile::ReconcileError;
use thiserror::Error;

/// A failed check.  Every variant stops the calling verification.
#[derive(Error, Debug)]
pub enum CheckError {
    /// The command collaborator failed; propagated as-is, never
    /// reinterpreted as a feature mismatch.
    #[error("collaborator failure: {0}")]
    Collaborator(#[from] SessionError),

    /// Resolution or comparison failed in the reconciliation engine.
    #[error(transparent)]
    Reconcile(#[from] ReconcileError),

    /// `/dev/kvm` is present inside a templated guest.
    #[error("/dev/kvm exists in the guest: nested virtualization is exposed")]
    NestedVirtualization,

    /// The host-side sender could not transmit with UDP offload enabled.
    #[error("UDP send with offload failed (exit {exit_code})\n  stdout: {stdout}\n  stderr: {stderr}")]
    OffloadSendFailed {
        exit_code: i32,
        stdout: String,
        stderr: String,
    },

    /// The bytes captured on the peer differ from what was sent.
    #[error("captured payload mismatch: expected {expected:?}, captured {actual:?}")]
    PayloadMismatch { expected: Vec<u8>, actual: Vec<u8> },

    /// A tap created with `multi_queue` was accepted as a network backend.
    #[error("multi-queue tap {tap} was accepted as a network backend")]
    MultiQueueAccepted { tap: String },

    /// The attach was refused, but not with the expected backend error.
    #[error("attach rejected for another reason\n  expected: {expected}\n  message:  {message}")]
    UnexpectedRejection { expected: String, message: String },
}
