//! Shell command execution with timeout, output caps and forced termination.

use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command as TokioCommand};
use tokio::time::timeout;
use tracing::{debug, warn};

/// Default cap on captured bytes per stream.
pub const DEFAULT_MAX_OUTPUT_BYTES: usize = 1024 * 1024;

/// Execution result containing command output and metadata.
#[derive(Debug, Clone, Default)]
pub struct ExecutionResult {
    pub stdout: String,
    pub stderr: String,
    pub return_code: i32,
    pub success: bool,
    /// Set when either stream exceeded the output cap.
    pub truncated: bool,
}

/// Executes shell commands with a timeout and bounded output capture.
#[derive(Debug, Clone)]
pub struct CommandExecutor {
    timeout_seconds: u64,
    working_dir: PathBuf,
    max_output_bytes: usize,
    kill_grace: Duration,
    enable_validation: bool,
}

impl CommandExecutor {
    /// Initialize command executor.
    ///
    /// # Arguments
    /// * `timeout_seconds` - Default timeout for command execution.
    /// * `working_dir` - Working directory for commands.
    /// * `enable_validation` - Reject destructive commands before running them.
    pub fn new(timeout_seconds: u64, working_dir: Option<&Path>, enable_validation: bool) -> Self {
        Self {
            timeout_seconds,
            working_dir: working_dir.unwrap_or(Path::new(".")).to_path_buf(),
            max_output_bytes: DEFAULT_MAX_OUTPUT_BYTES,
            kill_grace: Duration::from_secs(2),
            enable_validation,
        }
    }

    /// Cap captured stdout and stderr at `bytes` each.
    pub fn with_max_output_bytes(mut self, bytes: usize) -> Self {
        self.max_output_bytes = bytes;
        self
    }

    /// Time a timed-out command gets to exit after SIGTERM before it is killed.
    pub fn with_kill_grace(mut self, grace: Duration) -> Self {
        self.kill_grace = grace;
        self
    }

    /// Execute a command through `sh -c`.
    ///
    /// A non-zero exit is reported through [`ExecutionResult::success`];
    /// spawn failures, validation failures and timeouts are errors.
    pub async fn execute_command(
        &self,
        command: &str,
        timeout_override: Option<u64>,
    ) -> Result<ExecutionResult> {
        let (valid, message) = self.validate_command(command);
        if !valid {
            bail!(message);
        }

        let timeout_secs = timeout_override.unwrap_or(self.timeout_seconds);
        debug!(command, timeout_secs, working_dir = %self.working_dir.display(), "Executing command");

        let mut cmd = TokioCommand::new("sh");
        cmd.arg("-c")
            .arg(command)
            .current_dir(&self.working_dir)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .stdin(Stdio::null())
            .kill_on_drop(true);
        #[cfg(unix)]
        cmd.process_group(0);

        let mut child = cmd
            .spawn()
            .with_context(|| format!("Failed to execute command: {}", command))?;

        let stdout_task = tokio::spawn(read_capped(child.stdout.take(), self.max_output_bytes));
        let stderr_task = tokio::spawn(read_capped(child.stderr.take(), self.max_output_bytes));

        let status = match timeout(Duration::from_secs(timeout_secs), child.wait()).await {
            Ok(status) => status.context("Failed to wait for command")?,
            Err(_) => {
                warn!(command, timeout_secs, "Command timed out, terminating");
                terminate(&mut child, self.kill_grace).await;
                stdout_task.abort();
                stderr_task.abort();
                bail!("Command timed out after {} seconds", timeout_secs);
            }
        };

        // Background processes may keep the pipes open after the shell exits.
        let (stdout, stdout_truncated) = timeout(self.kill_grace, stdout_task)
            .await
            .ok()
            .and_then(|joined| joined.ok())
            .unwrap_or_default();
        let (stderr, stderr_truncated) = timeout(self.kill_grace, stderr_task)
            .await
            .ok()
            .and_then(|joined| joined.ok())
            .unwrap_or_default();

        Ok(ExecutionResult {
            stdout: String::from_utf8_lossy(&stdout).to_string(),
            stderr: String::from_utf8_lossy(&stderr).to_string(),
            return_code: status.code().unwrap_or(-1),
            success: status.success(),
            truncated: stdout_truncated || stderr_truncated,
        })
    }

    /// Validate command safety (basic checks).
    ///
    /// # Returns
    /// Tuple of (is_valid, error_message).
    pub fn validate_command(&self, command: &str) -> (bool, String) {
        if !self.enable_validation {
            return (true, String::new());
        }
        match check_command(command) {
            Ok(()) => (true, String::new()),
            Err(message) => (false, message),
        }
    }

    /// Default timeout in seconds.
    pub fn timeout_seconds(&self) -> u64 {
        self.timeout_seconds
    }

    /// Get the working directory.
    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    /// Set the working directory.
    pub fn set_working_dir(&mut self, working_dir: &Path) -> Result<()> {
        if !working_dir.exists() {
            bail!("Working directory does not exist: {}", working_dir.display());
        }
        if !working_dir.is_dir() {
            bail!("Path is not a directory: {}", working_dir.display());
        }
        self.working_dir = working_dir.to_path_buf();
        Ok(())
    }
}

impl Default for CommandExecutor {
    fn default() -> Self {
        Self::new(30, None, true)
    }
}

/// Longest command accepted.
pub const MAX_COMMAND_LENGTH: usize = 10_000;

const DANGEROUS_PATTERNS: &[&str] = &[
    "rm -rf /",
    "rm -rf /*",
    "rm -rf ~",
    "mkfs",
    "fdisk",
    "shutdown",
    "reboot",
    "chmod 777 /",
    "chmod -r 777 /",
    ":(){ :|:& };:", // Fork bomb
    "> /dev/sda",
    "curl | sh",
    "wget | sh",
];

/// Reject empty, oversized and destructive commands.
pub fn check_command(command: &str) -> std::result::Result<(), String> {
    let command = command.trim();

    if command.is_empty() {
        return Err("Command cannot be empty".to_string());
    }
    if command.len() > MAX_COMMAND_LENGTH {
        return Err(format!(
            "Command too long ({} characters, maximum {})",
            command.len(),
            MAX_COMMAND_LENGTH
        ));
    }

    let lower = command.to_lowercase();
    if lower == "rm -rf /" || lower.starts_with("rm -rf / ") {
        return Err("Potentially dangerous command detected: rm -rf /".to_string());
    }
    for pattern in DANGEROUS_PATTERNS.iter().filter(|p| **p != "rm -rf /") {
        if lower.contains(pattern) {
            return Err(format!("Potentially dangerous command detected: {}", pattern));
        }
    }
    if lower.contains("dd ") && lower.contains("of=/dev/") {
        return Err("Potentially dangerous command detected: dd to a device".to_string());
    }
    Ok(())
}

async fn read_capped<R>(reader: Option<R>, cap: usize) -> (Vec<u8>, bool)
where
    R: AsyncRead + Unpin,
{
    let mut collected = Vec::new();
    let mut truncated = false;
    let Some(mut reader) = reader else {
        return (collected, truncated);
    };

    // Keep draining past the cap so the child never blocks on a full pipe.
    let mut buf = [0u8; 8192];
    loop {
        match reader.read(&mut buf).await {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                let room = cap.saturating_sub(collected.len());
                if n > room {
                    truncated = true;
                }
                collected.extend_from_slice(&buf[..n.min(room)]);
            }
        }
    }
    (collected, truncated)
}

async fn terminate(child: &mut Child, grace: Duration) {
    #[cfg(unix)]
    if let Some(pid) = child.id() {
        signal_group(pid, libc::SIGTERM);
        if timeout(grace, child.wait()).await.is_ok() {
            return;
        }
        signal_group(pid, libc::SIGKILL);
    }
    #[cfg(not(unix))]
    let _ = grace;

    if let Err(e) = child.kill().await {
        debug!(error = %e, "Kill after timeout failed");
    }
}

#[cfg(unix)]
fn signal_group(pid: u32, signal: libc::c_int) {
    // SAFETY: the child was spawned as leader of its own process group.
    unsafe {
        libc::kill(-(pid as libc::pid_t), signal);
    }
}

#[cfg(test)]
mod tests;
