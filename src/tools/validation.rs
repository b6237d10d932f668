//! Path and command checks applied before a tool touches the system.

use std::path::{Component, Path, PathBuf};

use crate::error::{CrewError, CrewResult};
use crate::executor;

/// Longest path accepted.
pub const MAX_PATH_LENGTH: usize = 4096;

const DENIED_PREFIXES: &[&str] = &["/etc/", "/usr/", "/bin/", "/sbin/", "/proc/", "/sys/", "/dev/"];

const SECRET_SUFFIXES: &[&str] = &[".env", ".key", ".pem", ".p12", ".crt"];

/// Version-control and dependency-cache directories; readable, never written.
const WRITE_DENIED_SEGMENTS: &[&str] = &[".git/", ".svn/", "node_modules/"];

/// How a tool intends to use a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathAccess {
    /// Reading contents or listing entries.
    Read,
    /// Creating, overwriting or editing.
    Write,
}

/// Reject empty, oversized and denylisted paths.
pub fn validate_path(path: &str, access: PathAccess) -> CrewResult<()> {
    if path.trim().is_empty() {
        return Err(CrewError::validation("Path cannot be empty"));
    }
    if path.len() > MAX_PATH_LENGTH {
        return Err(CrewError::validation(format!(
            "Path too long ({} characters, maximum {})",
            path.len(),
            MAX_PATH_LENGTH
        )));
    }
    if path.contains('\0') {
        return Err(CrewError::validation("Path contains a null byte"));
    }

    let normalized = path.replace('\\', "/");
    if Path::new(&normalized)
        .components()
        .any(|component| component == Component::ParentDir)
    {
        return Err(CrewError::validation(format!(
            "Path traversal is not allowed: {}",
            path
        )));
    }

    for prefix in DENIED_PREFIXES {
        if normalized.starts_with(prefix) || normalized == prefix.trim_end_matches('/') {
            return Err(CrewError::validation(format!(
                "Access to system path denied: {}",
                path
            )));
        }
    }

    let lower = normalized.to_lowercase();
    if SECRET_SUFFIXES.iter().any(|suffix| lower.ends_with(suffix)) {
        return Err(CrewError::validation(format!(
            "Access to sensitive file denied: {}",
            path
        )));
    }

    if access == PathAccess::Write {
        let probe = format!("/{}", normalized.trim_start_matches("./"));
        if WRITE_DENIED_SEGMENTS
            .iter()
            .any(|segment| probe.contains(&format!("/{}", segment)))
        {
            return Err(CrewError::validation(format!(
                "Writing to protected directory denied: {}",
                path
            )));
        }
    }
    Ok(())
}

/// Reject empty, oversized and destructive shell commands.
pub fn validate_command(command: &str) -> CrewResult<()> {
    executor::check_command(command).map_err(CrewError::validation)
}

/// Resolve `path` against `base` unless it is absolute.
pub fn resolve_path(base: Option<&Path>, path: &str) -> PathBuf {
    let candidate = Path::new(path);
    match base {
        Some(base) if candidate.is_relative() => base.join(candidate),
        _ => candidate.to_path_buf(),
    }
}
