//! Nested virtualization must stay hidden from templated guests.
//!
//! The CPU feature checks already cover the absence of virtualization
//! extensions in the flags line; this is the explicit safety net in case
//! the hypervisor starts exposing the feature by mistake.

use crate::error::CheckError;
use crate::session::GuestSession;
use log::info;

/// Succeeds (exit 0) only when `/dev/kvm` does not exist.
pub const NO_KVM_COMMAND: &str = "[ ! -e /dev/kvm ]";

/// Fail if the guest can see `/dev/kvm`.
pub fn check_no_nested_virt(guest: &mut dyn GuestSession) -> Result<(), CheckError> {
    let output = guest.run(NO_KVM_COMMAND)?;
    if !output.success() {
        return Err(CheckError::NestedVirtualization);
    }
    info!("no /dev/kvm in guest");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionError;
    use crate::testing::ScriptedSession;

    #[test]
    fn absent_kvm_passes() {
        let mut guest = ScriptedSession::new().respond(NO_KVM_COMMAND, 0, "");
        assert!(check_no_nested_virt(&mut guest).is_ok());
    }

    #[test]
    fn present_kvm_fails() {
        let mut guest = ScriptedSession::new().respond(NO_KVM_COMMAND, 1, "");
        let err = check_no_nested_virt(&mut guest).unwrap_err();
        assert!(matches!(err, CheckError::NestedVirtualization));
        assert_eq!(err.to_string(), "/dev/kvm exists in the guest: nested virtualization is exposed");
    }

    #[test]
    fn transport_failure_is_not_reported_as_kvm() {
        let mut guest = ScriptedSession::new().fail(NO_KVM_COMMAND, "broken pipe");
        assert!(matches!(
            check_no_nested_virt(&mut guest),
            Err(CheckError::Collaborator(SessionError::Transport { .. }))
        ));
    }
}
