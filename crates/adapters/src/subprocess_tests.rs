// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[tokio::test]
async fn captures_output_and_exit_status() {
    let mut cmd = Command::new("sh");
    cmd.arg("-c").arg("echo out; echo err 1>&2; exit 3");

    let output = run_with_timeout(cmd, Duration::from_secs(5), "test").await.unwrap();
    assert_eq!(output.status.code(), Some(3));
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "out");
    assert_eq!(String::from_utf8_lossy(&output.stderr).trim(), "err");
}

#[tokio::test]
async fn times_out_long_running_commands() {
    let mut cmd = Command::new("sh");
    cmd.arg("-c").arg("sleep 30");

    let err = run_with_timeout(cmd, Duration::from_millis(100), "sleeper").await.unwrap_err();
    assert!(matches!(err, SubprocessError::Timeout { .. }));
    assert!(err.to_string().contains("sleeper"));
}

#[tokio::test]
async fn missing_binary_is_an_io_error() {
    let cmd = Command::new("/nonexistent/definitely-not-a-binary");
    let err = run_with_timeout(cmd, Duration::from_secs(1), "ghost").await.unwrap_err();
    assert!(matches!(err, SubprocessError::Io { .. }));
}
