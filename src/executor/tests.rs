use super::*;
use std::time::Instant;

#[tokio::test]
async fn test_simple_command() {
    let executor = CommandExecutor::default();
    let result = executor
        .execute_command("echo 'Hello World'", None)
        .await
        .unwrap();

    assert!(result.success);
    assert_eq!(result.return_code, 0);
    assert!(result.stdout.contains("Hello World"));
    assert!(result.stderr.is_empty());
    assert!(!result.truncated);
}

#[tokio::test]
async fn test_non_zero_exit_keeps_stderr() {
    let executor = CommandExecutor::default();
    let result = executor
        .execute_command("echo oops >&2; exit 3", None)
        .await
        .unwrap();

    assert!(!result.success);
    assert_eq!(result.return_code, 3);
    assert_eq!(result.stderr.trim(), "oops");
}

#[test]
fn test_command_validation() {
    let executor = CommandExecutor::default();

    let (valid, _) = executor.validate_command("ls -la");
    assert!(valid);

    let (valid, msg) = executor.validate_command("");
    assert!(!valid);
    assert!(msg.contains("empty"));

    let (valid, msg) = executor.validate_command("rm -rf /");
    assert!(!valid);
    assert!(msg.contains("dangerous"));

    let (valid, _) = executor.validate_command("dd if=/dev/zero of=/dev/sda");
    assert!(!valid);

    // Relative deletes stay allowed.
    let (valid, _) = executor.validate_command("rm -rf ./build");
    assert!(valid);

    let unchecked = CommandExecutor::new(30, None, false);
    assert!(unchecked.validate_command("").0);
}

#[test]
fn test_overlong_command_rejected() {
    let command = "a".repeat(MAX_COMMAND_LENGTH + 1);
    assert!(check_command(&command).unwrap_err().contains("too long"));
}

#[tokio::test]
async fn test_rejected_command_is_not_run() {
    let executor = CommandExecutor::default();
    let err = executor.execute_command("   ", None).await.unwrap_err();
    assert!(err.to_string().contains("empty"));
}

#[tokio::test]
async fn test_command_timeout_terminates() {
    let executor = CommandExecutor::new(1, None, true);
    let started = Instant::now();
    let err = executor.execute_command("sleep 30", None).await.unwrap_err();

    assert_eq!(err.to_string(), "Command timed out after 1 seconds");
    assert!(started.elapsed() < Duration::from_secs(10));
}

#[tokio::test]
async fn test_output_is_capped() {
    let executor = CommandExecutor::default().with_max_output_bytes(100);
    let result = executor
        .execute_command("yes abc | head -n 5000", None)
        .await
        .unwrap();

    assert!(result.success);
    assert!(result.truncated);
    assert_eq!(result.stdout.len(), 100);
}

#[tokio::test]
async fn test_working_directory() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("marker.txt"), "x").unwrap();

    let executor = CommandExecutor::new(30, Some(dir.path()), true);
    let result = executor.execute_command("ls", None).await.unwrap();

    assert!(result.success);
    assert!(result.stdout.contains("marker.txt"));
}

#[test]
fn test_set_working_dir_rejects_missing() {
    let mut executor = CommandExecutor::default();
    assert!(executor
        .set_working_dir(Path::new("/definitely/not/here"))
        .is_err());
}
