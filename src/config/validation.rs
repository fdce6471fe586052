/*!
 * Path Security Validation
 * Charset, length, symlink, and whitelist checks for attacker-influenceable paths
 */

use crate::core::{HookError, HookResult, MAX_PATH_LEN};
use log::warn;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Fixed set of exact paths eligible for mounting into a container.
///
/// Membership is exact string equality; no prefix or glob matching.
pub const MOUNT_WHITELIST: [&str; 4] = [
    "/usr/local/Ascend/driver/lib64",
    "/usr/local/Ascend/driver/include",
    "/usr/local/dcmi",
    "/usr/local/bin/npu-smi",
];

/// Conservative allowed set: alphanumerics, `/`, `.`, `_`, `-`.
fn is_allowed_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '/' | '.' | '_' | '-')
}

/// Canonical form of `path`, tolerating a missing final component.
///
/// Mount targets may not pre-exist, so canonicalization failing solely
/// because the last component is absent falls back to canonicalizing the
/// parent and re-appending the file name. A final component that exists as
/// a dangling symlink is not tolerated.
fn canonical_form(path: &Path) -> std::io::Result<PathBuf> {
    match path.canonicalize() {
        Ok(resolved) => Ok(resolved),
        Err(err) if err.kind() == ErrorKind::NotFound => {
            if path.symlink_metadata().is_ok() {
                // exists but does not resolve: dangling symlink
                return Err(std::io::Error::new(
                    ErrorKind::InvalidInput,
                    "final component is a dangling symlink",
                ));
            }
            let parent = path.parent().ok_or_else(|| {
                std::io::Error::new(ErrorKind::InvalidInput, "path has no parent component")
            })?;
            let file_name = path.file_name().ok_or_else(|| {
                std::io::Error::new(ErrorKind::InvalidInput, "path has no file name component")
            })?;
            Ok(parent.canonicalize()?.join(file_name))
        }
        Err(err) => Err(err),
    }
}

/// Validate that a path is safe to use with elevated privilege.
///
/// Rejects empty and over-long paths, any character outside the allowed
/// set, and any path whose canonical form is not byte-identical to the
/// input (traversal components, symlinks anywhere, relative paths).
pub fn check_path(path: &str) -> HookResult<()> {
    if path.is_empty() {
        warn!("rejected empty path");
        return Err(HookError::InputValidation("path is empty".to_string()));
    }
    if path.len() > MAX_PATH_LEN {
        warn!("rejected over-long path ({} bytes)", path.len());
        return Err(HookError::InputValidation(format!(
            "path exceeds {} bytes",
            MAX_PATH_LEN
        )));
    }
    if let Some(c) = path.chars().find(|c| !is_allowed_char(*c)) {
        warn!("rejected path with illegal character {:?}", c);
        return Err(HookError::SecurityViolation(format!(
            "path contains illegal character {:?}",
            c
        )));
    }

    let requested = Path::new(path);
    match canonical_form(requested) {
        Ok(resolved) if resolved == requested => Ok(()),
        Ok(resolved) => {
            warn!(
                "rejected path {}: resolves to {}",
                path,
                resolved.display()
            );
            Err(HookError::SecurityViolation(format!(
                "path {} does not match its canonical form",
                path
            )))
        }
        Err(err) => {
            warn!("rejected path {}: {}", path, err);
            Err(HookError::SecurityViolation(format!(
                "cannot canonicalize path {}: {}",
                path, err
            )))
        }
    }
}

/// Validate that a mount path is one of the compiled-in whitelist entries.
pub fn check_whitelist(path: &str) -> HookResult<()> {
    if MOUNT_WHITELIST.iter().any(|entry| *entry == path) {
        Ok(())
    } else {
        warn!("rejected non-whitelisted mount path {}", path);
        Err(HookError::SecurityViolation(format!(
            "path {} is not in the mount whitelist",
            path
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::fs::symlink;

    /// Canonical scratch directory so constructed inputs match their
    /// canonical forms exactly.
    fn canonical_tempdir() -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().canonicalize().unwrap();
        (dir, base)
    }

    #[test]
    fn test_empty_path_rejected() {
        assert!(check_path("").is_err());
    }

    #[test]
    fn test_overlong_path_rejected() {
        let long = format!("/{}", "a".repeat(MAX_PATH_LEN + 1));
        assert!(check_path(&long).is_err());
    }

    #[test]
    fn test_illegal_characters_rejected() {
        assert!(check_path("/tmp/foo bar").is_err());
        assert!(check_path("/tmp/foo;rm").is_err());
        assert!(check_path("/tmp/foo\nbar").is_err());
        assert!(check_path("/tmp/foo$HOME").is_err());
    }

    #[test]
    fn test_existing_canonical_path_accepted() {
        let (_dir, base) = canonical_tempdir();
        let file = base.join("data");
        std::fs::write(&file, b"x").unwrap();
        assert!(check_path(file.to_str().unwrap()).is_ok());
    }

    #[test]
    fn test_missing_final_component_accepted() {
        let (_dir, base) = canonical_tempdir();
        let missing = base.join("not-created-yet");
        assert!(check_path(missing.to_str().unwrap()).is_ok());
    }

    #[test]
    fn test_missing_intermediate_component_rejected() {
        let (_dir, base) = canonical_tempdir();
        let missing = base.join("no-such-dir").join("leaf");
        assert!(check_path(missing.to_str().unwrap()).is_err());
    }

    #[test]
    fn test_symlink_component_rejected() {
        let (_dir, base) = canonical_tempdir();
        let real = base.join("real");
        std::fs::create_dir(&real).unwrap();
        let link = base.join("link");
        symlink(&real, &link).unwrap();

        // symlink as the final component
        assert!(check_path(link.to_str().unwrap()).is_err());
        // symlink in the middle of the path
        let inner = link.join("leaf");
        std::fs::write(real.join("leaf"), b"x").unwrap();
        assert!(check_path(inner.to_str().unwrap()).is_err());
    }

    #[test]
    fn test_dangling_symlink_rejected() {
        let (_dir, base) = canonical_tempdir();
        let link = base.join("dangling");
        symlink(base.join("missing-target"), &link).unwrap();
        assert!(check_path(link.to_str().unwrap()).is_err());
    }

    #[test]
    fn test_traversal_rejected() {
        let (_dir, base) = canonical_tempdir();
        let sub = base.join("sub");
        std::fs::create_dir(&sub).unwrap();
        let traversal = format!("{}/sub/../sub", base.display());
        assert!(check_path(&traversal).is_err());
    }

    #[test]
    fn test_relative_path_rejected() {
        assert!(check_path("etc/passwd").is_err());
    }

    #[test]
    fn test_whitelist_exact_match_only() {
        assert!(check_whitelist("/usr/local/Ascend/driver/lib64").is_ok());
        assert!(check_whitelist("/usr/local/bin/npu-smi").is_ok());
        // prefix of an entry is not a match
        assert!(check_whitelist("/usr/local/Ascend/driver/lib").is_err());
        // superstring of an entry is not a match
        assert!(check_whitelist("/usr/local/Ascend/driver/lib64/extra").is_err());
        assert!(check_whitelist("/etc/passwd").is_err());
    }
}
