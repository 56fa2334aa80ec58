//! Bounded execution of the `sqlcmd` client.
//!
//! Runs one invocation with both output streams captured and a wall-clock
//! deadline. On expiry the child is killed and the invocation fails; without
//! a bound, a hung engine would block the run indefinitely.

use crate::domain::errors::{BackupError, Result};
use std::io::Read;
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

/// Captured result of one tool invocation.
#[derive(Debug)]
pub struct ToolOutput {
    pub exit_ok: bool,
    pub stdout: String,
    pub stderr: String,
}

/// Runs `program` with `args`, capturing both streams, enforcing `timeout`.
pub fn run_tool(program: &str, args: &[String], timeout: Duration) -> Result<ToolOutput> {
    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| BackupError::ExternalProcess(format!("failed to launch {}: {}", program, e)))?;

    // The streams are drained on separate threads; reading them after the
    // child exits would deadlock once a pipe buffer fills up.
    let stdout_handle = spawn_reader(child.stdout.take());
    let stderr_handle = spawn_reader(child.stderr.take());

    let deadline = Instant::now() + timeout;
    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) => {
                if Instant::now() >= deadline {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(BackupError::ExternalProcess(format!(
                        "{} timed out after {}s",
                        program,
                        timeout.as_secs()
                    )));
                }
                thread::sleep(Duration::from_millis(100));
            }
            Err(e) => return Err(BackupError::Io(e)),
        }
    };

    let stdout = stdout_handle.join().unwrap_or_default();
    let stderr = stderr_handle.join().unwrap_or_default();

    Ok(ToolOutput {
        exit_ok: status.success(),
        stdout,
        stderr,
    })
}

fn spawn_reader<R: Read + Send + 'static>(stream: Option<R>) -> thread::JoinHandle<String> {
    thread::spawn(move || {
        let mut buf = String::new();
        if let Some(mut stream) = stream {
            let _ = stream.read_to_string(&mut buf);
        }
        buf
    })
}
