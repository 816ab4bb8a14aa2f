//! Interrupt handling, end to end
//!
//! Runs the built binary against a stand-in ssh client that records its PID
//! and sleeps, then delivers SIGINT to the validator. Verifies that:
//! 1. The validator exits with status 130
//! 2. The in-flight client is terminated
//! 3. "Interrupted by user" is reported, unless `--quiet` is given

use std::fs;
use std::io::Read;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;

/// Check if a process is alive (not dead or zombie)
fn is_process_alive(pid: u32) -> bool {
    if signal::kill(Pid::from_raw(pid as i32), None).is_err() {
        return false;
    }

    if let Ok(stat) = fs::read_to_string(format!("/proc/{}/stat", pid)) {
        let fields: Vec<&str> = stat.split_whitespace().collect();
        if fields.len() > 2 {
            return !matches!(fields[2], "Z" | "X");
        }
    }

    true
}

fn wait_for_process_death(pid: u32, timeout: Duration) -> bool {
    let start = Instant::now();
    while start.elapsed() < timeout {
        if !is_process_alive(pid) {
            return true;
        }
        thread::sleep(Duration::from_millis(50));
    }
    false
}

/// Poll until the stand-in client has written its PID
fn wait_for_pid_file(path: &Path, timeout: Duration) -> Option<u32> {
    let start = Instant::now();
    while start.elapsed() < timeout {
        if let Ok(content) = fs::read_to_string(path) {
            if let Ok(pid) = content.trim().parse() {
                return Some(pid);
            }
        }
        thread::sleep(Duration::from_millis(50));
    }
    None
}

fn wait_with_timeout(child: &mut Child, timeout: Duration) -> Option<ExitStatus> {
    let start = Instant::now();
    while start.elapsed() < timeout {
        if let Ok(Some(status)) = child.try_wait() {
            return Some(status);
        }
        thread::sleep(Duration::from_millis(50));
    }
    let _ = child.kill();
    None
}

struct InterruptedRun {
    status: ExitStatus,
    stdout: String,
    client_pid: u32,
}

/// Start the validator against a hanging ssh client and interrupt it
/// while the connectivity check is in flight
fn interrupt_during_connectivity_check(dir: &Path, extra_args: &[&str]) -> InterruptedRun {
    let pid_file = dir.join("client.pid");
    let client = dir.join("hanging-ssh");
    fs::write(
        &client,
        format!("#!/bin/sh\necho $$ > '{}'\nexec sleep 60\n", pid_file.display()),
    )
    .expect("Failed to write stand-in ssh client");
    fs::set_permissions(&client, fs::Permissions::from_mode(0o755))
        .expect("Failed to mark client executable");

    let config = dir.join("validator.json");
    fs::write(&config, serde_json::json!({ "ssh": { "program": client } }).to_string())
        .expect("Failed to write config");

    let mut validator = Command::new(env!("CARGO_BIN_EXE_ftk-remote-validator"))
        .arg("--config")
        .arg(&config)
        .arg("build-mac.local")
        .args(extra_args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("Failed to spawn validator");

    let client_pid = match wait_for_pid_file(&pid_file, Duration::from_secs(10)) {
        Some(pid) => pid,
        None => {
            let _ = validator.kill();
            panic!("stand-in ssh client never started");
        }
    };
    assert!(is_process_alive(client_pid), "client should be running before SIGINT");

    signal::kill(Pid::from_raw(validator.id() as i32), Signal::SIGINT)
        .expect("Failed to send SIGINT");

    let status = wait_with_timeout(&mut validator, Duration::from_secs(15))
        .expect("validator did not exit after SIGINT");

    let mut stdout = String::new();
    if let Some(mut out) = validator.stdout.take() {
        let _ = out.read_to_string(&mut stdout);
    }

    InterruptedRun {
        status,
        stdout,
        client_pid,
    }
}

// =============================================================================
// SIGINT during a remote command
// =============================================================================

/// Scenarios run one after the other: exec of a script another test thread
/// still has open for writing fails with ETXTBSY
#[test]
fn test_sigint_abandons_ssh_session_and_exits_130() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");

    let run = interrupt_during_connectivity_check(dir.path(), &[]);
    assert_eq!(run.status.code(), Some(130));
    assert!(
        wait_for_process_death(run.client_pid, Duration::from_secs(5)),
        "in-flight ssh client should be terminated"
    );
    assert!(run.stdout.contains("Interrupted by user"), "stdout was: {}", run.stdout);
    assert!(!run.stdout.contains("Validation completed"));

    let quiet_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let run = interrupt_during_connectivity_check(quiet_dir.path(), &["--quiet"]);
    assert_eq!(run.status.code(), Some(130));
    assert!(wait_for_process_death(run.client_pid, Duration::from_secs(5)));
    assert!(run.stdout.is_empty(), "quiet run printed: {}", run.stdout);
}
