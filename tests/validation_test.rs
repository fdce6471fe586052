/*!
 * Integration Tests for Invocation Validation
 * Exercises the full argument pipeline through the library API
 */

use npu_hook::{CmdArgs, HookError};

fn canonical_tempdir() -> (tempfile::TempDir, String) {
    let dir = tempfile::tempdir().unwrap();
    let base = dir.path().canonicalize().unwrap();
    let s = base.to_str().unwrap().to_string();
    (dir, s)
}

fn args_with(devices: &str, rootfs: &str) -> CmdArgs {
    CmdArgs {
        devices: devices.to_string(),
        pid: std::process::id().to_string(),
        rootfs: rootfs.to_string(),
        options: None,
        mount_file: Vec::new(),
        mount_dir: Vec::new(),
    }
}

#[test]
fn test_full_validation_happy_path() {
    let (_dir, rootfs) = canonical_tempdir();
    let mut args = args_with("0,1", &rootfs);
    args.options = Some("NODRV".to_string());

    let validated = args.validate().unwrap();
    let ids: Vec<u32> = validated.devices.iter().collect();
    assert_eq!(ids, vec![0, 1]);
    assert_eq!(validated.rootfs, rootfs);
    assert!(validated.options.no_drv);
    assert!(validated.files.is_empty());
    assert!(validated.dirs.is_empty());
}

#[test]
fn test_device_separator_is_the_only_non_digit() {
    let (_dir, rootfs) = canonical_tempdir();
    for bad in ["1 2", "1;2", "1,2,a", "0x1", "1.5", "-1"] {
        let args = args_with(bad, &rootfs);
        assert!(args.validate().is_err(), "accepted {:?}", bad);
    }
    assert!(args_with("7", &rootfs).validate().is_ok());
}

#[test]
fn test_rootfs_needs_no_whitelist_match() {
    let (_dir, rootfs) = canonical_tempdir();
    // a temp dir is clearly not whitelisted, yet valid as rootfs
    assert!(args_with("0", &rootfs).validate().is_ok());
}

#[test]
fn test_mount_paths_need_both_checks() {
    let (_dir, rootfs) = canonical_tempdir();

    // whitelisted name but path-unsafe spelling
    let mut args = args_with("0", &rootfs);
    args.mount_file = vec!["/usr/local/bin/../bin/npu-smi".to_string()];
    assert!(args.validate().is_err());

    // path-safe but not whitelisted
    let mut args = args_with("0", &rootfs);
    args.mount_dir = vec![rootfs.clone()];
    let err = args.validate().unwrap_err();
    assert!(matches!(err, HookError::SecurityViolation(_)));
}

#[test]
fn test_symlinked_rootfs_rejected() {
    let (_dir, base) = canonical_tempdir();
    let real = format!("{}/real", base);
    let link = format!("{}/link", base);
    std::fs::create_dir(&real).unwrap();
    std::os::unix::fs::symlink(&real, &link).unwrap();

    let err = args_with("0", &link).validate().unwrap_err();
    assert!(matches!(err, HookError::SecurityViolation(_)));
}

#[test]
fn test_rejection_happens_before_any_privileged_step() {
    let before = std::fs::read_link("/proc/self/ns/mnt").unwrap();

    let (_dir, rootfs) = canonical_tempdir();
    let args = args_with("99999999999999", &rootfs);
    assert!(args.validate().is_err());

    assert_eq!(std::fs::read_link("/proc/self/ns/mnt").unwrap(), before);
}
