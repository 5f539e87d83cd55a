//! A sketch of the `/dev/sandbox` installation transport (`SPEC_FULL.md`
//! §6), grounded on `sandbox_device.c`'s `SANDBOX_IOC_VERSION` /
//! `SANDBOX_IOC_SETSPEC` / `SANDBOX_IOC_NLISTS` ioctls.
//!
//! There is no real character device here — no kernel adapter is in scope
//! for this crate (`SPEC_FULL.md` §1) — just the request/response shape and
//! error surface a userland installer would see, backed by an in-process
//! mock any test or CLI can drive.

use std::sync::Arc;

use sandbox_core::credential::Credential;
use sandbox_core::PolicyStack;
use thiserror::Error;

/// The protocol version this transport speaks, mirroring
/// `SANDBOX_IOC_VERSION`'s reply.
pub const PROTOCOL_VERSION: u32 = 1;

/// Only bit 0 (`ON_DENY_ABORT`) is defined; every other bit is reserved.
pub const FLAG_ON_DENY_ABORT: u32 = 1 << 0;

#[derive(Debug, Clone)]
pub enum DeviceRequest {
    Version,
    SetSpec { script: String, flags: u32 },
    NListCount,
}

#[derive(Debug, Clone)]
pub enum DeviceResponse {
    Version(u32),
    SetSpec(Result<(), InstallError>),
    NListCount(usize),
}

/// Installation failures, mapped 1:1 to the `EINVAL`/`ENOMEM` taxonomy the
/// original ioctl handler returns.
#[derive(Debug, Error)]
pub enum InstallError {
    #[error("reserved flag bits set: {0:#x}")]
    InvalidFlags(u32),

    #[error("script failed to load: {0}")]
    ScriptLoad(#[from] sandbox_script::ScriptError),
}

impl InstallError {
    #[must_use]
    pub fn is_enomem(&self) -> bool {
        matches!(self, Self::ScriptLoad(e) if matches!(e.installer_errno(), sandbox_script::error::Errno::Enomem))
    }
}

/// Handles ioctl-shaped requests against a credential's attached policy
/// stack.
pub trait SandboxDevice {
    fn ioctl(&self, cred: &Credential, req: DeviceRequest) -> DeviceResponse;
}

/// The in-process mock transport: `SetSpec` loads a script through
/// `sandbox-script` and, on success, pushes the resulting policy onto the
/// credential's stack exactly as `sandbox_device_setspec` does via
/// `sandbox_attach`.
#[derive(Debug, Default)]
pub struct MockDevice {
    installs: std::sync::atomic::AtomicUsize,
}

impl MockDevice {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl SandboxDevice for MockDevice {
    fn ioctl(&self, cred: &Credential, req: DeviceRequest) -> DeviceResponse {
        match req {
            DeviceRequest::Version => DeviceResponse::Version(PROTOCOL_VERSION),
            DeviceRequest::SetSpec { script, flags } => {
                let result = set_spec(cred, &script, flags);
                if result.is_ok() {
                    self.installs.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
                }
                DeviceResponse::SetSpec(result)
            }
            DeviceRequest::NListCount => {
                DeviceResponse::NListCount(self.installs.load(std::sync::atomic::Ordering::Relaxed))
            }
        }
    }
}

fn set_spec(cred: &Credential, script: &str, flags: u32) -> Result<(), InstallError> {
    if flags & !FLAG_ON_DENY_ABORT != 0 {
        return Err(InstallError::InvalidFlags(flags));
    }
    let policy = sandbox_script::load_policy(script)?;
    let stack: PolicyStack = cred.stack().push(policy);
    cred.attach(stack);
    tracing::info!("policy installed via mock device");
    Ok(())
}

/// Convenience constructor matching the CLI's need for a fresh credential
/// with nothing attached yet.
#[must_use]
pub fn new_credential() -> Arc<Credential> {
    Arc::new(Credential::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_reports_the_protocol_version() {
        let device = MockDevice::new();
        let cred = Credential::new();
        let DeviceResponse::Version(v) = device.ioctl(&cred, DeviceRequest::Version) else {
            panic!("expected Version response");
        };
        assert_eq!(v, PROTOCOL_VERSION);
    }

    #[test]
    fn setspec_installs_a_policy_that_takes_effect_immediately() {
        let device = MockDevice::new();
        let cred = Credential::new();
        let resp = device.ioctl(
            &cred,
            DeviceRequest::SetSpec {
                script: r#"sandbox.deny("system.reboot")"#.to_owned(),
                flags: 0,
            },
        );
        assert!(matches!(resp, DeviceResponse::SetSpec(Ok(()))));
        assert_eq!(
            cred.evaluate(&sandbox_core::rule_name::RuleName::parse("system.reboot").unwrap(), &[]),
            sandbox_core::Verdict::Deny
        );
    }

    #[test]
    fn setspec_rejects_reserved_flag_bits() {
        let device = MockDevice::new();
        let cred = Credential::new();
        let resp = device.ioctl(
            &cred,
            DeviceRequest::SetSpec {
                script: "sandbox.default(\"allow\")".to_owned(),
                flags: 0x2,
            },
        );
        assert!(matches!(
            resp,
            DeviceResponse::SetSpec(Err(InstallError::InvalidFlags(0x2)))
        ));
    }

    #[test]
    fn setspec_failure_does_not_touch_the_existing_stack() {
        let device = MockDevice::new();
        let cred = Credential::new();
        device.ioctl(
            &cred,
            DeviceRequest::SetSpec {
                script: r#"sandbox.deny("system.reboot")"#.to_owned(),
                flags: 0,
            },
        );
        let before = cred.evaluate(&sandbox_core::rule_name::RuleName::parse("system.reboot").unwrap(), &[]);

        device.ioctl(
            &cred,
            DeviceRequest::SetSpec {
                script: "this is not valid lua (((".to_owned(),
                flags: 0,
            },
        );
        let after = cred.evaluate(&sandbox_core::rule_name::RuleName::parse("system.reboot").unwrap(), &[]);
        assert_eq!(before, after);
    }

    #[test]
    fn nlistcount_tracks_successful_installs() {
        let device = MockDevice::new();
        let cred = Credential::new();
        device.ioctl(
            &cred,
            DeviceRequest::SetSpec {
                script: "sandbox.default(\"allow\")".to_owned(),
                flags: 0,
            },
        );
        let DeviceResponse::NListCount(n) = device.ioctl(&cred, DeviceRequest::NListCount) else {
            panic!("expected NListCount response");
        };
        assert_eq!(n, 1);
    }
}
