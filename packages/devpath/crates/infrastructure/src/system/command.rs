use std::io::{ErrorKind, Read};
use std::process::{Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CommandError {
    #[error("`{0}` is not available on this system")]
    Missing(String),
    #[error("`{command}` timed out after {timeout:?}")]
    TimedOut { command: String, timeout: Duration },
    #[error("Failed to run `{command}`: {source}")]
    Io {
        command: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug)]
pub struct CommandOutput {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.status.success()
    }
}

/// Runs `program` to completion, killing it once `timeout` elapses.
///
/// Output is drained on helper threads so a chatty child cannot block on a
/// full pipe while we poll it.
pub fn run_with_timeout(
    program: &str,
    args: &[&str],
    timeout: Option<Duration>,
) -> Result<CommandOutput, CommandError> {
    let display = format!("{} {}", program, args.join(" "));
    let io_err = |source: std::io::Error| CommandError::Io {
        command: display.clone(),
        source,
    };

    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| match e.kind() {
            ErrorKind::NotFound => CommandError::Missing(program.to_string()),
            _ => io_err(e),
        })?;

    let stdout = drain(child.stdout.take());
    let stderr = drain(child.stderr.take());

    let start = Instant::now();
    let status = loop {
        match child.try_wait().map_err(io_err)? {
            Some(status) => break status,
            None => {
                if let Some(limit) = timeout {
                    if start.elapsed() > limit {
                        let _ = child.kill();
                        let _ = child.wait();
                        return Err(CommandError::TimedOut {
                            command: display.clone(),
                            timeout: limit,
                        });
                    }
                }
                thread::sleep(Duration::from_millis(25));
            }
        }
    };

    Ok(CommandOutput {
        status,
        stdout: stdout.join().unwrap_or_default(),
        stderr: stderr.join().unwrap_or_default(),
    })
}

pub fn run(program: &str, args: &[&str]) -> Result<CommandOutput, CommandError> {
    run_with_timeout(program, args, None)
}

fn drain<R: Read + Send + 'static>(source: Option<R>) -> thread::JoinHandle<String> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut source) = source {
            let _ = source.read_to_end(&mut buf);
        }
        String::from_utf8_lossy(&buf).into_owned()
    })
}
