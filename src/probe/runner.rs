use std::{
    io::{self, Read},
    process::{Command, Stdio},
    sync::mpsc::{self, Receiver, RecvTimeoutError},
    thread,
    time::Instant,
};

use log::debug;
use wait_timeout::ChildExt;

use crate::error::ProbeError;

use super::{CommandRequest, CommandRunner};

/// Runs compilers as real child processes.
///
/// The child sees an empty environment apart from `LANG=en` and a `PATH`
/// holding only its own directory, so that localized or wrapped output never
/// reaches the parsers.
#[derive(Copy, Clone, Debug, Default)]
pub struct SystemRunner;

impl SystemRunner {
    pub fn new() -> SystemRunner {
        SystemRunner
    }
}

/// Forwards what `pipe` yields, chunk by chunk, until end of file.
fn drain(mut pipe: impl Read + Send + 'static) -> Receiver<Vec<u8>> {
    let (tx, rx) = mpsc::channel();

    thread::spawn(move || {
        let mut buf = [0; 4096];
        loop {
            match pipe.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => {
                    if tx.send(buf[..n].to_vec()).is_err() {
                        break;
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    debug!("Failed to read child output: {}", e);
                    break;
                }
            }
        }
    });

    rx
}

/// Appends chunks to `output` until the pipe closes. Returns `false` when
/// `deadline` passes first.
fn collect(rx: &Receiver<Vec<u8>>, deadline: Instant, output: &mut Vec<u8>) -> bool {
    loop {
        match rx.recv_timeout(deadline.saturating_duration_since(Instant::now())) {
            Ok(chunk) => output.extend(chunk),
            Err(RecvTimeoutError::Disconnected) => return true,
            Err(RecvTimeoutError::Timeout) => return false,
        }
    }
}

impl CommandRunner for SystemRunner {
    fn run(&self, request: &CommandRequest) -> Result<Vec<u8>, ProbeError> {
        let program = request.program.display().to_string();

        if !request.program.is_file() {
            return Err(ProbeError::MissingExecutable { program });
        }

        let mut command = Command::new(&request.program);
        command
            .args(&request.args)
            .current_dir(&request.dir)
            .env_clear()
            .env("LANG", "en")
            .env("PATH", &request.dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        if cfg!(windows) {
            if let Some(root) = std::env::var_os("SystemRoot") {
                command.env("SystemRoot", root);
            }
        }

        let spawn_error = |source: io::Error| ProbeError::Spawn {
            program: program.clone(),
            source,
        };

        let deadline = Instant::now() + request.timeout;
        let mut child = command.spawn().map_err(spawn_error)?;

        let stdout = child.stdout.take().map(drain);
        let stderr = child.stderr.take().map(drain);

        let status = child
            .wait_timeout(deadline.saturating_duration_since(Instant::now()))
            .map_err(spawn_error)?;
        if status.is_none() {
            debug!("Killing `{}` after {:?}", program, request.timeout);
            if let Err(e) = child.kill() {
                debug!("Failed to kill `{}`: {}", program, e);
            }
            if let Err(e) = child.wait() {
                debug!("Failed to reap `{}`: {}", program, e);
            }

            return Err(ProbeError::Timeout {
                program,
                timeout: request.timeout,
            });
        }

        // A background process spawned by the child may keep the pipes open.
        let mut output = Vec::new();
        for rx in [stdout, stderr].iter().flatten() {
            if !collect(rx, deadline, &mut output) {
                debug!("`{}` exited but its output stayed open past {:?}", program, request.timeout);
                return Err(ProbeError::Timeout {
                    program,
                    timeout: request.timeout,
                });
            }
        }

        Ok(output)
    }
}
