/*!
 * Invocation Arguments
 * Strict validation of raw command-line input into a type-safe form
 */

use super::resolved::{DeviceList, MountList, RuntimeOptions};
use super::validation;
use crate::core::{HookError, HookResult, Pid, MAX_DEVICE_STR_LEN, MAX_SYS_READ_LEN};
use clap::Parser;
use log::debug;
use std::fs::File;
use std::io::Read;

/// Trusted system source for the live maximum-pid value
const PID_MAX_SOURCE: &str = "/proc/sys/kernel/pid_max";

/// Raw invocation as handed over by the container runtime.
///
/// Fields are plain strings on purpose: every one of them crosses a
/// privilege boundary and is validated by its [`ArgKind`] rule before use.
#[derive(Debug, Parser)]
#[command(name = "npu-hook", about = "NPU container prestart setup hook")]
pub struct CmdArgs {
    /// Comma-separated decimal NPU device ids
    #[arg(short = 'd', long = "devices")]
    pub devices: String,

    /// Target container process id
    #[arg(short = 'p', long = "pid", allow_hyphen_values = true)]
    pub pid: String,

    /// Container rootfs path
    #[arg(short = 'r', long = "rootfs")]
    pub rootfs: String,

    /// Runtime options: NODRV, VIRTUAL, or NODRV,VIRTUAL
    #[arg(short = 'o', long = "options")]
    pub options: Option<String>,

    /// Whitelisted file to bind-mount into the container (repeatable)
    #[arg(short = 'f', long = "mount-file")]
    pub mount_file: Vec<String>,

    /// Whitelisted directory to bind-mount into the container (repeatable)
    #[arg(short = 'i', long = "mount-dir")]
    pub mount_dir: Vec<String>,
}

/// Validated, type-safe form of the invocation.
#[derive(Debug, Default)]
pub struct ValidatedArgs {
    pub devices: DeviceList,
    pub pid: Pid,
    pub rootfs: String,
    pub options: RuntimeOptions,
    pub files: MountList,
    pub dirs: MountList,
}

/// Closed set of argument kinds.
///
/// Each kind carries its own validation behavior behind [`ArgRule`]; there
/// is no open-ended dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgKind {
    Devices,
    Pid,
    Rootfs,
    Options,
    MountFile,
    MountDir,
}

impl ArgKind {
    fn rule(self) -> &'static dyn ArgRule {
        match self {
            ArgKind::Devices => &DevicesRule,
            ArgKind::Pid => &PidRule,
            ArgKind::Rootfs => &RootfsRule,
            ArgKind::Options => &OptionsRule,
            ArgKind::MountFile => &MountFileRule,
            ArgKind::MountDir => &MountDirRule,
        }
    }
}

/// Validation behavior for one argument kind.
trait ArgRule {
    fn validate(&self, value: &str, out: &mut ValidatedArgs) -> HookResult<()>;
}

struct DevicesRule;

impl ArgRule for DevicesRule {
    fn validate(&self, value: &str, out: &mut ValidatedArgs) -> HookResult<()> {
        if value.is_empty() {
            return Err(HookError::InputValidation("device list is empty".to_string()));
        }
        if value.len() > MAX_DEVICE_STR_LEN {
            return Err(HookError::InputValidation(format!(
                "device list exceeds {} bytes",
                MAX_DEVICE_STR_LEN
            )));
        }
        if let Some(c) = value.chars().find(|c| !c.is_ascii_digit() && *c != ',') {
            return Err(HookError::InputValidation(format!(
                "device list contains illegal character {:?}",
                c
            )));
        }
        for token in value.split(',') {
            let id: u32 = token.parse().map_err(|_| {
                HookError::InputValidation(format!("invalid device id {:?}", token))
            })?;
            out.devices.push(id)?;
        }
        Ok(())
    }
}

struct PidRule;

impl ArgRule for PidRule {
    fn validate(&self, value: &str, out: &mut ValidatedArgs) -> HookResult<()> {
        let pid: i64 = value.parse().map_err(|_| {
            HookError::InputValidation(format!("invalid pid {:?}", value))
        })?;
        let pid_max = read_pid_max()?;
        if pid <= 0 || pid >= pid_max {
            return Err(HookError::InputValidation(format!(
                "pid {} out of bounds (0, {})",
                pid, pid_max
            )));
        }
        out.pid = Pid::try_from(pid).map_err(|_| {
            HookError::InputValidation(format!("pid {} out of bounds", pid))
        })?;
        Ok(())
    }
}

struct RootfsRule;

impl ArgRule for RootfsRule {
    fn validate(&self, value: &str, out: &mut ValidatedArgs) -> HookResult<()> {
        validation::check_path(value)?;
        out.rootfs = value.to_string();
        Ok(())
    }
}

struct OptionsRule;

impl ArgRule for OptionsRule {
    fn validate(&self, value: &str, out: &mut ValidatedArgs) -> HookResult<()> {
        out.options = RuntimeOptions::parse(Some(value))?;
        Ok(())
    }
}

struct MountFileRule;

impl ArgRule for MountFileRule {
    fn validate(&self, value: &str, out: &mut ValidatedArgs) -> HookResult<()> {
        validation::check_path(value)?;
        validation::check_whitelist(value)?;
        out.files.push(value.to_string())
    }
}

struct MountDirRule;

impl ArgRule for MountDirRule {
    fn validate(&self, value: &str, out: &mut ValidatedArgs) -> HookResult<()> {
        validation::check_path(value)?;
        validation::check_whitelist(value)?;
        out.dirs.push(value.to_string())
    }
}

impl CmdArgs {
    /// Run every field through its kind's rule, producing the validated
    /// form. Fails on the first rejected field; nothing privileged has
    /// happened yet at that point.
    pub fn validate(&self) -> HookResult<ValidatedArgs> {
        let mut out = ValidatedArgs::default();

        ArgKind::Devices.rule().validate(&self.devices, &mut out)?;
        ArgKind::Pid.rule().validate(&self.pid, &mut out)?;
        ArgKind::Rootfs.rule().validate(&self.rootfs, &mut out)?;
        if let Some(options) = &self.options {
            ArgKind::Options.rule().validate(options, &mut out)?;
        }
        for file in &self.mount_file {
            ArgKind::MountFile.rule().validate(file, &mut out)?;
        }
        for dir in &self.mount_dir {
            ArgKind::MountDir.rule().validate(dir, &mut out)?;
        }

        debug!(
            "validated invocation: {} devices, {} files, {} dirs, pid {}",
            out.devices.len(),
            out.files.len(),
            out.dirs.len(),
            out.pid
        );
        Ok(out)
    }
}

/// Bounded read of the live pid_max value.
fn read_pid_max() -> HookResult<i64> {
    let file = File::open(PID_MAX_SOURCE).map_err(|err| {
        HookError::InputValidation(format!("cannot read {}: {}", PID_MAX_SOURCE, err))
    })?;
    let mut buf = String::new();
    file.take(MAX_SYS_READ_LEN)
        .read_to_string(&mut buf)
        .map_err(|err| {
            HookError::InputValidation(format!("cannot read {}: {}", PID_MAX_SOURCE, err))
        })?;
    parse_pid_max(&buf)
}

fn parse_pid_max(content: &str) -> HookResult<i64> {
    let trimmed = content.strip_suffix('\n').unwrap_or(content);
    if trimmed.is_empty() || !trimmed.chars().all(|c| c.is_ascii_digit()) {
        return Err(HookError::InputValidation(format!(
            "malformed pid_max value {:?}",
            content
        )));
    }
    trimmed.parse().map_err(|_| {
        HookError::InputValidation(format!("malformed pid_max value {:?}", content))
    })
}
