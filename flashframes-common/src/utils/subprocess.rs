use std::{
    io::{self, Read},
    process::{Child, Command, ExitStatus, Stdio},
    thread,
    time::{Duration, Instant},
};

use crate::bin_common::termination::Cookie;

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Everything a finished child left behind.
#[derive(Debug)]
pub struct Captured {
    pub status: ExitStatus,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl Captured {
    pub fn stdout_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    pub fn stderr_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }
}

#[derive(thiserror::Error, Debug)]
pub enum RunError {
    #[error("failed to start '{program}'")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("'{program}' did not finish within {timeout:?}")]
    TimedOut { program: String, timeout: Duration },
    #[error("'{program}' was cancelled")]
    Cancelled { program: String },
    #[error("failed to wait for '{program}'")]
    Wait {
        program: String,
        #[source]
        source: io::Error,
    },
}

/// Runs the command to completion with captured output. The child is killed if it is
/// still running after `timeout`, or as soon as `cookie` is tripped.
pub fn run_time_boxed(
    mut cmd: Command,
    timeout: Duration,
    cookie: &Cookie,
) -> Result<Captured, RunError> {
    let program = cmd.get_program().to_string_lossy().into_owned();
    log::trace!("Running {cmd:?} with a timeout of {}", humantime::Duration::from(timeout));

    if cookie.is_terminating() {
        return Err(RunError::Cancelled { program });
    }

    let mut child = cmd
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|source| RunError::Spawn {
            program: program.clone(),
            source,
        })?;

    let stdout = child.stdout.take().expect("stdout is piped");
    let stderr = child.stderr.take().expect("stderr is piped");

    // The pipes must be drained while waiting, or a chatty child blocks forever on a
    // full pipe buffer.
    thread::scope(|s| {
        let stdout = s.spawn(move || drain(stdout));
        let stderr = s.spawn(move || drain(stderr));

        let status = wait_time_boxed(&mut child, &program, timeout, cookie);

        let stdout = stdout.join().unwrap_or_default();
        let stderr = stderr.join().unwrap_or_default();

        status.map(|status| Captured {
            status,
            stdout,
            stderr,
        })
    })
}

fn wait_time_boxed(
    child: &mut Child,
    program: &str,
    timeout: Duration,
    cookie: &Cookie,
) -> Result<ExitStatus, RunError> {
    let started = Instant::now();
    loop {
        match child.try_wait() {
            Ok(Some(status)) => return Ok(status),
            Ok(None) => (),
            Err(source) => {
                kill_and_reap(child, program);
                return Err(RunError::Wait {
                    program: program.to_string(),
                    source,
                });
            }
        }

        if cookie.is_terminating() {
            kill_and_reap(child, program);
            return Err(RunError::Cancelled {
                program: program.to_string(),
            });
        }

        if started.elapsed() >= timeout {
            kill_and_reap(child, program);
            return Err(RunError::TimedOut {
                program: program.to_string(),
                timeout,
            });
        }

        thread::sleep(POLL_INTERVAL);
    }
}

fn kill_and_reap(child: &mut Child, program: &str) {
    if let Err(e) = child.kill() {
        log::debug!("Could not kill '{program}' (pid {}): {e}", child.id());
    }
    if let Err(e) = child.wait() {
        log::warn!("Could not reap '{program}' (pid {}): {e}", child.id());
    }
}

fn drain(mut pipe: impl Read) -> Vec<u8> {
    let mut buf = Vec::new();
    if let Err(e) = pipe.read_to_end(&mut buf) {
        log::debug!("Stopped reading a child pipe early: {e}");
    }
    buf
}
