#![deny(clippy::all, warnings)]

use std::io::{self, Read, Write};
use std::path::Path;
use std::process::{Command, ExitStatus, Stdio};
use std::sync::PoisonError;
use std::thread;

use anyhow::{Context, Result};

use crate::progress::{ProgressSuspendGuard, OUTPUT_LOCK};

const PROXY_VARS: [&str; 6] = [
    "http_proxy",
    "https_proxy",
    "HTTP_PROXY",
    "HTTPS_PROXY",
    "no_proxy",
    "NO_PROXY",
];

const DEFAULT_MAX_CAPTURE_BYTES: usize = 1024 * 1024;
const TRUNCATION_MARKER: &str = "\n[...truncated...]\n";

/// Environment for a spawned command.
///
/// `Inherit` layers pairs on top of the parent environment. `Exact` starts
/// from an empty environment and sets exactly the given pairs.
#[derive(Clone, Copy, Debug)]
pub enum ChildEnv<'a> {
    Inherit(&'a [(String, String)]),
    Exact(&'a [(String, String)]),
}

/// What a finished child process left behind.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub code: i32,
    pub stdout: String,
    pub stderr: String,
}

/// Runs a command with captured output and no stdin.
pub fn run_command(
    program: &str,
    args: &[String],
    env: ChildEnv<'_>,
    cwd: Option<&Path>,
) -> Result<RunOutput> {
    let mut command = configured_command(program, args, env, cwd);
    command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    let mut child = command
        .spawn()
        .with_context(|| format!("failed to start {program}"))?;
    let cap = max_capture_bytes();
    let stdout_handle = child
        .stdout
        .take()
        .map(|stream| thread::spawn(move || read_capped(stream, cap)));
    let stderr_handle = child
        .stderr
        .take()
        .map(|stream| thread::spawn(move || read_capped(stream, cap)));
    let status = child
        .wait()
        .with_context(|| format!("failed to wait for {program}"))?;
    let stdout = stdout_handle
        .and_then(|handle| handle.join().ok())
        .unwrap_or_default();
    let stderr = stderr_handle
        .and_then(|handle| handle.join().ok())
        .unwrap_or_default();
    Ok(RunOutput {
        code: exit_code(&status),
        stdout,
        stderr,
    })
}

/// Runs a command, relaying its output live while also capturing it.
pub fn run_command_streaming(
    program: &str,
    args: &[String],
    env: ChildEnv<'_>,
    cwd: Option<&Path>,
) -> Result<RunOutput> {
    let mut command = configured_command(program, args, env, cwd);
    command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    let _suspend = ProgressSuspendGuard::new();
    let mut child = command
        .spawn()
        .with_context(|| format!("failed to start {program}"))?;
    let cap = max_capture_bytes();
    let stdout_handle = child
        .stdout
        .take()
        .map(|stream| thread::spawn(move || tee_capped(stream, StreamTarget::Stdout, cap)));
    let stderr_handle = child
        .stderr
        .take()
        .map(|stream| thread::spawn(move || tee_capped(stream, StreamTarget::Stderr, cap)));
    let status = child
        .wait()
        .with_context(|| format!("failed to wait for {program}"))?;
    let stdout = stdout_handle
        .and_then(|handle| handle.join().ok())
        .unwrap_or_default();
    let stderr = stderr_handle
        .and_then(|handle| handle.join().ok())
        .unwrap_or_default();
    Ok(RunOutput {
        code: exit_code(&status),
        stdout,
        stderr,
    })
}

fn configured_command(
    program: &str,
    args: &[String],
    env: ChildEnv<'_>,
    cwd: Option<&Path>,
) -> Command {
    let mut command = Command::new(program);
    command.args(args);
    if let Some(dir) = cwd {
        command.current_dir(dir);
    }
    match env {
        ChildEnv::Inherit(pairs) => {
            for (key, value) in pairs {
                // An empty proxy value means "unset it for the child".
                if value.is_empty() && PROXY_VARS.contains(&key.as_str()) {
                    command.env_remove(key);
                } else {
                    command.env(key, value);
                }
            }
        }
        ChildEnv::Exact(pairs) => {
            command.env_clear();
            for (key, value) in pairs {
                command.env(key, value);
            }
        }
    }
    command
}

// Shell convention for signal deaths: 128 + signal number.
fn exit_code(status: &ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    -1
}

fn max_capture_bytes() -> usize {
    std::env::var("TX_MAX_CAPTURE_BYTES")
        .ok()
        .and_then(|value| value.trim().parse().ok())
        .unwrap_or(DEFAULT_MAX_CAPTURE_BYTES)
}

#[derive(Clone, Copy)]
enum StreamTarget {
    Stdout,
    Stderr,
}

fn read_capped(mut reader: impl Read, cap: usize) -> String {
    let mut captured = Vec::new();
    let mut truncated = false;
    let mut buf = [0u8; 8192];
    loop {
        match reader.read(&mut buf) {
            Ok(0) | Err(_) => break,
            Ok(n) => append_capped(&mut captured, &mut truncated, &buf[..n], cap),
        }
    }
    finish_capture(&captured, truncated)
}

fn tee_capped(mut reader: impl Read, target: StreamTarget, cap: usize) -> String {
    let mut captured = Vec::new();
    let mut truncated = false;
    let mut buf = [0u8; 8192];
    loop {
        match reader.read(&mut buf) {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                let chunk = &buf[..n];
                {
                    let _guard = OUTPUT_LOCK.lock().unwrap_or_else(PoisonError::into_inner);
                    match target {
                        StreamTarget::Stdout => {
                            let mut out = io::stdout().lock();
                            let _ = out.write_all(chunk);
                            let _ = out.flush();
                        }
                        StreamTarget::Stderr => {
                            let mut err = io::stderr().lock();
                            let _ = err.write_all(chunk);
                            let _ = err.flush();
                        }
                    }
                }
                append_capped(&mut captured, &mut truncated, chunk, cap);
            }
        }
    }
    finish_capture(&captured, truncated)
}

fn append_capped(captured: &mut Vec<u8>, truncated: &mut bool, chunk: &[u8], cap: usize) {
    if *truncated {
        return;
    }
    let remaining = cap.saturating_sub(captured.len());
    if chunk.len() <= remaining {
        captured.extend_from_slice(chunk);
    } else {
        captured.extend_from_slice(&chunk[..remaining]);
        *truncated = true;
    }
}

fn finish_capture(captured: &[u8], truncated: bool) -> String {
    let mut text = String::from_utf8_lossy(captured).into_owned();
    if truncated {
        text.push_str(TRUNCATION_MARKER);
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn sh(script: &str) -> Vec<String> {
        vec!["-c".to_string(), script.to_string()]
    }

    #[cfg(unix)]
    #[test]
    fn captures_stdout_and_stderr() {
        let output = run_command(
            "/bin/sh",
            &sh("echo visible; echo hidden 1>&2"),
            ChildEnv::Inherit(&[]),
            None,
        )
        .unwrap();
        assert_eq!(output.code, 0);
        assert_eq!(output.stdout, "visible\n");
        assert_eq!(output.stderr, "hidden\n");
    }

    #[cfg(unix)]
    #[test]
    fn exit_codes_pass_through() {
        let output = run_command("/bin/sh", &sh("exit 7"), ChildEnv::Inherit(&[]), None).unwrap();
        assert_eq!(output.code, 7);
    }

    #[cfg(unix)]
    #[test]
    fn signal_death_reports_shell_style_code() {
        // SIGKILL is 9; shell-style exit codes are 128 + signal.
        let output =
            run_command("/bin/sh", &sh("kill -9 $$"), ChildEnv::Inherit(&[]), None).unwrap();
        assert_eq!(output.code, 137);
    }

    #[test]
    fn missing_program_is_an_error() {
        let err = run_command(
            "/definitely/not/a/real/binary",
            &[],
            ChildEnv::Inherit(&[]),
            None,
        )
        .unwrap_err();
        assert!(err.to_string().contains("failed to start"));
    }

    #[cfg(unix)]
    #[test]
    #[serial]
    fn empty_proxy_value_unsets_in_child() {
        std::env::set_var("HTTP_PROXY", "upstream:3128");
        let pairs = vec![("HTTP_PROXY".to_string(), String::new())];
        let output = run_command(
            "/bin/sh",
            &sh("echo \"${HTTP_PROXY:-unset}\""),
            ChildEnv::Inherit(&pairs),
            None,
        )
        .unwrap();
        std::env::remove_var("HTTP_PROXY");
        assert_eq!(output.stdout, "unset\n");
    }

    #[cfg(unix)]
    #[test]
    #[serial]
    fn exact_env_scrubs_parent_variables() {
        std::env::set_var("TX_TEST_SECRET", "visible");
        let output = run_command(
            "/bin/sh",
            &sh("echo \"${TX_TEST_SECRET:-scrubbed}\""),
            ChildEnv::Exact(&[]),
            None,
        )
        .unwrap();
        std::env::remove_var("TX_TEST_SECRET");
        assert_eq!(output.stdout, "scrubbed\n");
    }

    #[cfg(unix)]
    #[test]
    fn exact_env_sets_given_pairs() {
        let pairs = vec![("TX_TEST_MARKER".to_string(), "mark".to_string())];
        let output = run_command(
            "/bin/sh",
            &sh("echo \"$TX_TEST_MARKER\""),
            ChildEnv::Exact(&pairs),
            None,
        )
        .unwrap();
        assert_eq!(output.stdout, "mark\n");
    }

    #[cfg(unix)]
    #[test]
    #[serial]
    fn capture_is_capped_with_marker() {
        std::env::set_var("TX_MAX_CAPTURE_BYTES", "64");
        let output = run_command(
            "/bin/sh",
            &sh("i=0; while [ $i -lt 200 ]; do printf A; i=$((i+1)); done"),
            ChildEnv::Inherit(&[]),
            None,
        )
        .unwrap();
        std::env::remove_var("TX_MAX_CAPTURE_BYTES");
        assert!(output.stdout.contains(TRUNCATION_MARKER));
        assert!(output.stdout.len() < 200);
    }

    #[cfg(unix)]
    #[test]
    fn streaming_also_captures() {
        let output = run_command_streaming(
            "/bin/sh",
            &sh("echo relayed"),
            ChildEnv::Inherit(&[]),
            None,
        )
        .unwrap();
        assert_eq!(output.code, 0);
        assert_eq!(output.stdout, "relayed\n");
    }
}
