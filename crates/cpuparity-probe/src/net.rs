//! Guest networking checks.
//!
//! Three behaviors of the virtual NIC are verified from the outside:
//!
//! 1. **Tap offload**: a UDP datagram sent by the host with UDP
//!    segmentation offload enabled must arrive intact in the guest.  Without
//!    the tap offload flags configured, the host-side send fails with `EIO`.
//! 2. **Ingress liveness**: after a burst of high-rate UDP traffic into the
//!    guest (with the tap TX queue shrunk to provoke overflow), the guest
//!    must still answer commands.
//! 3. **Multi-queue taps**: attaching a tap created with `multi_queue` must
//!    be refused by the hypervisor with an explicit backend error.
//!
//! Sending with offload, driving traffic and attaching interfaces are
//! collaborator duties; this module only sequences the steps and checks
//! the outcome.

use crate::error::CheckError;
use crate::session::{CommandOutput, GuestSession, SessionError};
use log::{debug, info, warn};
use thiserror::Error;

// ─── Tap offload ─────────────────────────────────────────────────────

/// Host-side capability: send one UDP datagram with UDP offload enabled.
pub trait OffloadSender {
    /// Send `payload` to the guest's `port`, returning the sender's result.
    fn send_with_udp_offload(
        &mut self,
        port: u16,
        payload: &[u8],
    ) -> Result<CommandOutput, SessionError>;
}

/// Knobs for [`check_tap_offload`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TapOffloadConfig {
    /// UDP port the guest listens on.
    pub port: u16,
    /// Guest file the listener writes received bytes to.
    pub out_file: String,
    /// Payload sent by the host and expected verbatim in `out_file`.
    pub message: Vec<u8>,
}

impl Default for TapOffloadConfig {
    fn default() -> Self {
        Self {
            port: 81,
            out_file: "/tmp/out.txt".to_string(),
            message: b"x".to_vec(),
        }
    }
}

impl TapOffloadConfig {
    /// Background UDP listener that writes whatever it receives to
    /// `out_file`.
    pub fn listener_command(&self) -> String {
        format!(
            "nohup socat UDP-LISTEN:{} OPEN:{},creat > /dev/null 2>&1 &",
            self.port, self.out_file
        )
    }

    /// Reads back the captured payload.
    pub fn capture_command(&self) -> String {
        format!("cat {}", self.out_file)
    }
}

/// Verify a UDP datagram sent with offload reaches the guest unchanged.
pub fn check_tap_offload(
    guest: &mut dyn GuestSession,
    sender: &mut dyn OffloadSender,
    config: &TapOffloadConfig,
) -> Result<(), CheckError> {
    guest.check_output(&config.listener_command())?;

    let sent = sender.send_with_udp_offload(config.port, &config.message)?;
    if !sent.success() {
        return Err(CheckError::OffloadSendFailed {
            exit_code: sent.exit_code,
            stdout: sent.stdout,
            stderr: sent.stderr,
        });
    }

    // A missing capture file shows up as empty stdout, i.e. a mismatch.
    let captured = guest.run(&config.capture_command())?;
    debug!(
        "captured {} bytes on port {} (exit {})",
        captured.stdout.len(),
        config.port,
        captured.exit_code
    );

    if captured.stdout.as_bytes() != config.message.as_slice() {
        return Err(CheckError::PayloadMismatch {
            expected: config.message.clone(),
            actual: captured.stdout.into_bytes(),
        });
    }

    info!("tap offload delivered {} bytes", config.message.len());
    Ok(())
}

// ─── Ingress liveness ────────────────────────────────────────────────

/// Command the guest must still answer after an ingress burst.
pub const LIVENESS_COMMAND: &str = "echo success";

/// Knobs for [`check_high_ingress`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngressConfig {
    /// Traffic generator binary, present on host and guest.
    pub iperf_binary: String,
    /// Offered UDP load in bits per second.
    pub bandwidth_bps: u64,
    /// Length of the burst in seconds; also bounds the client with
    /// `timeout`, since a wedged NIC would otherwise hang it.
    pub duration_secs: u32,
    /// TX queue length forced on the guest's tap before the burst.
    pub tx_queue_len: u32,
}

impl Default for IngressConfig {
    fn default() -> Self {
        Self {
            iperf_binary: "iperf3".to_string(),
            bandwidth_bps: 1_000_000_000,
            duration_secs: 30,
            tx_queue_len: 5,
        }
    }
}

impl IngressConfig {
    /// Host-side command shrinking the TX queue of `tap`.
    pub fn tx_queue_command(&self, tap: &str) -> String {
        format!("ip link set {tap} txqueuelen {}", self.tx_queue_len)
    }

    /// Daemonized receiver started inside the guest.
    pub fn server_command(&self) -> String {
        format!("{} -sD", self.iperf_binary)
    }

    /// Host-side sender targeting `guest_ip`.
    pub fn client_command(&self, guest_ip: &str) -> String {
        format!(
            "timeout {secs} {bin} -c {guest_ip} -u -V -b {bps} -t {secs}",
            secs = self.duration_secs,
            bin = self.iperf_binary,
            bps = self.bandwidth_bps,
        )
    }
}

/// The guest must still execute commands.
pub fn check_ingress_liveness(guest: &mut dyn GuestSession) -> Result<(), CheckError> {
    guest.check_output(LIVENESS_COMMAND)?;
    Ok(())
}

/// Flood the guest with UDP from the host, then require it to stay live.
///
/// `tap` is the host side of the guest's interface; its TX queue is shrunk
/// first so the burst fills it.  The client's own exit status is not
/// judged: it is expected to be cut short by `timeout` when the NIC
/// misbehaves.  Transport failures still propagate.
pub fn check_high_ingress(
    guest: &mut dyn GuestSession,
    host: &mut dyn GuestSession,
    tap: &str,
    guest_ip: &str,
    config: &IngressConfig,
) -> Result<(), CheckError> {
    host.check_output(&config.tx_queue_command(tap))?;
    guest.run(&config.server_command())?;

    let client = host.run(&config.client_command(guest_ip))?;
    debug!("ingress client exited with {}", client.exit_code);

    check_ingress_liveness(guest)?;
    info!("guest survived {}s of ingress traffic", config.duration_secs);
    Ok(())
}

// ─── Multi-queue taps ────────────────────────────────────────────────

/// A network interface to hand to the hypervisor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetInterface {
    pub iface_id: String,
    pub host_dev_name: String,
    pub guest_mac: String,
}

/// Failure of a [`NetworkAttacher`] call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AttachError {
    /// The hypervisor answered and refused the interface.
    #[error("attach rejected: {0}")]
    Rejected(String),

    /// The request never got an answer.
    #[error(transparent)]
    Transport(#[from] SessionError),
}

/// Control-plane capability: attach a host tap to the guest.
pub trait NetworkAttacher {
    fn attach_network(&mut self, iface: &NetInterface) -> Result<(), AttachError>;
}

/// Knobs for [`check_multi_queue_tap_rejected`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultiQueueConfig {
    /// Name of the tap created for the check.
    pub tap_name: String,
    /// Network namespace the hypervisor runs in, if any.
    pub netns: Option<String>,
    pub iface_id: String,
    pub guest_mac: String,
}

impl MultiQueueConfig {
    pub fn new(tap_name: impl Into<String>) -> Self {
        Self {
            tap_name: tap_name.into(),
            netns: None,
            iface_id: "eth0".to_string(),
            guest_mac: "AA:FC:00:00:00:01".to_string(),
        }
    }

    pub fn create_command(&self) -> String {
        format!("ip tuntap add name {} mode tap multi_queue", self.tap_name)
    }

    /// Moves the tap into `netns`; `None` when there is no namespace.
    pub fn move_command(&self) -> Option<String> {
        self.netns
            .as_ref()
            .map(|ns| format!("ip link set {} netns {ns}", self.tap_name))
    }

    pub fn delete_command(&self) -> String {
        match &self.netns {
            Some(ns) => format!("ip netns exec {ns} ip link del name {}", self.tap_name),
            None => format!("ip link del name {}", self.tap_name),
        }
    }

    /// Fragment the rejection message must contain.
    pub fn expected_rejection(&self) -> String {
        format!("Invalid TUN/TAP Backend provided by {}", self.tap_name)
    }

    fn interface(&self) -> NetInterface {
        NetInterface {
            iface_id: self.iface_id.clone(),
            host_dev_name: self.tap_name.clone(),
            guest_mac: self.guest_mac.clone(),
        }
    }
}

/// Verify the hypervisor refuses a multi-queue tap as a network backend.
///
/// The tap is deleted afterwards whatever the outcome.  A failed deletion
/// is reported only when the check itself passed.
pub fn check_multi_queue_tap_rejected(
    host: &mut dyn GuestSession,
    attacher: &mut dyn NetworkAttacher,
    config: &MultiQueueConfig,
) -> Result<(), CheckError> {
    host.check_output(&config.create_command())?;

    let outcome = attach_expecting_rejection(host, attacher, config);

    match (host.check_output(&config.delete_command()), outcome) {
        (Ok(_), outcome) => outcome,
        (Err(e), Ok(())) => Err(e.into()),
        (Err(e), outcome) => {
            warn!("could not delete tap {}: {e}", config.tap_name);
            outcome
        }
    }
}

fn attach_expecting_rejection(
    host: &mut dyn GuestSession,
    attacher: &mut dyn NetworkAttacher,
    config: &MultiQueueConfig,
) -> Result<(), CheckError> {
    if let Some(command) = config.move_command() {
        host.check_output(&command)?;
    }

    match attacher.attach_network(&config.interface()) {
        Ok(()) => Err(CheckError::MultiQueueAccepted {
            tap: config.tap_name.clone(),
        }),
        Err(AttachError::Transport(e)) => Err(e.into()),
        Err(AttachError::Rejected(message)) => {
            let expected = config.expected_rejection();
            if !message.contains(&expected) {
                return Err(CheckError::UnexpectedRejection { expected, message });
            }
            info!("multi-queue tap {} rejected as expected", config.tap_name);
            Ok(())
        }
    }
}
