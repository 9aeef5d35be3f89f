//! Subprocess plumbing for the external tools polystatus drives.
//!
//! Everything that shells out goes through [`CommandRunner`], so menus and
//! renderers can be exercised in tests against a scripted runner instead of
//! the real `bluetoothctl`/`nmcli`/`pactl`.

use std::io::{self, Write};
use std::process::{Command, Stdio};
use std::thread;
use std::time::Duration;

use tracing::{debug, trace, warn};

/// Captured result of a finished process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    #[cfg(test)]
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            success: true,
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    #[cfg(test)]
    pub fn failed(stderr: impl Into<String>) -> Self {
        Self {
            success: false,
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    /// Trimmed stderr, or trimmed stdout when stderr is empty.
    pub fn error_text(&self) -> &str {
        let stderr = self.stderr.trim();
        if stderr.is_empty() {
            self.stdout.trim()
        } else {
            stderr
        }
    }
}

/// One step of a scripted interactive session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionStep {
    /// Write a line (newline appended) to the child's stdin.
    Send(String),
    /// Sleep before the next step.
    Wait(Duration),
}

/// Failure of a command whose result the caller depends on.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("{program} exited unsuccessfully: {message}")]
    Failed { program: String, message: String },
}

/// Runs external programs.
pub trait CommandRunner {
    /// Run to completion and capture output.
    fn run(&self, program: &str, args: &[&str]) -> io::Result<CommandOutput>;

    /// Run to completion with `input` written to stdin.
    fn run_with_input(&self, program: &str, args: &[&str], input: &str)
    -> io::Result<CommandOutput>;

    /// Start without waiting for it to finish.
    fn spawn(&self, program: &str, args: &[&str]) -> io::Result<()>;

    /// Feed `steps` to the program's stdin, then wait for it to exit.
    fn run_interactive(&self, program: &str, steps: &[SessionStep]) -> io::Result<()>;
}

/// Trimmed stdout of a successful run, or an empty string on any failure.
pub fn capture<R: CommandRunner + ?Sized>(runner: &R, program: &str, args: &[&str]) -> String {
    match runner.run(program, args) {
        Ok(output) if output.success => output.stdout.trim().to_string(),
        Ok(output) => {
            debug!("{} {:?} failed: {}", program, args, output.error_text());
            String::new()
        }
        Err(e) => {
            debug!("{} {:?} could not run: {}", program, args, e);
            String::new()
        }
    }
}

/// Like [`capture`], but reports why the command failed.
pub fn checked<R: CommandRunner + ?Sized>(
    runner: &R,
    program: &str,
    args: &[&str],
) -> Result<String, CommandError> {
    let output = runner
        .run(program, args)
        .map_err(|source| CommandError::Spawn {
            program: program.to_string(),
            source,
        })?;

    if output.success {
        Ok(output.stdout.trim().to_string())
    } else {
        Err(CommandError::Failed {
            program: program.to_string(),
            message: output.error_text().to_string(),
        })
    }
}

/// [`CommandRunner`] backed by `std::process`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, program: &str, args: &[&str]) -> io::Result<CommandOutput> {
        trace!("run: {} {:?}", program, args);
        let output = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .output()?;

        Ok(CommandOutput {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    fn run_with_input(
        &self,
        program: &str,
        args: &[&str],
        input: &str,
    ) -> io::Result<CommandOutput> {
        trace!("run_with_input: {} {:?}", program, args);
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        if let Some(mut stdin) = child.stdin.take() {
            // A picker that exits early closes its stdin; that is not an error.
            if let Err(e) = stdin.write_all(input.as_bytes())
                && e.kind() != io::ErrorKind::BrokenPipe
            {
                return Err(e);
            }
        }

        let output = child.wait_with_output()?;
        Ok(CommandOutput {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    fn spawn(&self, program: &str, args: &[&str]) -> io::Result<()> {
        trace!("spawn: {} {:?}", program, args);
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .spawn()?;

        // Reap in the background so short-lived helpers don't linger as zombies.
        thread::spawn(move || {
            let _ = child.wait();
        });
        Ok(())
    }

    fn run_interactive(&self, program: &str, steps: &[SessionStep]) -> io::Result<()> {
        trace!("run_interactive: {} ({} steps)", program, steps.len());
        let mut child = Command::new(program)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;

        // stdin is closed at the end of the match so the program sees EOF.
        let fed = match child.stdin.take() {
            Some(mut stdin) => feed_session(&mut stdin, steps),
            None => Ok(()),
        };
        if let Err(e) = fed {
            warn!("{} stopped reading its session: {}", program, e);
            let _ = child.kill();
            let _ = child.wait();
            return Err(e);
        }

        let status = child.wait()?;
        if !status.success() {
            warn!("{} session exited with {}", program, status);
        }
        Ok(())
    }
}

fn feed_session<W: Write>(stdin: &mut W, steps: &[SessionStep]) -> io::Result<()> {
    for step in steps {
        match step {
            SessionStep::Send(line) => {
                writeln!(stdin, "{}", line)?;
                stdin.flush()?;
            }
            SessionStep::Wait(duration) => thread::sleep(*duration),
        }
    }
    Ok(())
}

#[cfg(test)]
pub mod fake {
    //! Scripted runner for tests.

    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::io;

    use super::{CommandOutput, CommandRunner, SessionStep};

    /// Records every invocation and answers from a table keyed by the full
    /// command line (`"program arg1 arg2"`). Unknown commands succeed with
    /// empty output.
    #[derive(Default)]
    pub struct FakeRunner {
        responses: RefCell<HashMap<String, Vec<CommandOutput>>>,
        missing: RefCell<Vec<String>>,
        calls: RefCell<Vec<String>>,
        inputs: RefCell<Vec<String>>,
    }

    impl FakeRunner {
        pub fn new() -> Self {
            Self::default()
        }

        /// Queue a response. Repeated calls to the same command line consume
        /// queued responses in order; the last one sticks.
        pub fn respond(&self, command: &str, output: CommandOutput) -> &Self {
            self.responses
                .borrow_mut()
                .entry(command.to_string())
                .or_default()
                .push(output);
            self
        }

        /// Make every invocation of `program` fail as if it wasn't installed.
        pub fn missing(&self, program: &str) -> &Self {
            self.missing.borrow_mut().push(program.to_string());
            self
        }

        pub fn calls(&self) -> Vec<String> {
            self.calls.borrow().clone()
        }

        pub fn inputs(&self) -> Vec<String> {
            self.inputs.borrow().clone()
        }

        pub fn called(&self, command: &str) -> bool {
            self.calls.borrow().iter().any(|c| c == command)
        }

        pub fn position(&self, command: &str) -> Option<usize> {
            self.calls.borrow().iter().position(|c| c == command)
        }

        fn record(&self, program: &str, args: &[&str]) -> io::Result<CommandOutput> {
            let line = std::iter::once(program)
                .chain(args.iter().copied())
                .collect::<Vec<_>>()
                .join(" ");
            self.calls.borrow_mut().push(line.clone());

            if self.missing.borrow().iter().any(|p| p == program) {
                return Err(io::Error::new(io::ErrorKind::NotFound, "not installed"));
            }

            let mut responses = self.responses.borrow_mut();
            let output = match responses.get_mut(&line) {
                Some(queue) if queue.len() > 1 => queue.remove(0),
                Some(queue) => queue.first().cloned().unwrap_or_default(),
                None => CommandOutput::ok(""),
            };
            Ok(output)
        }
    }

    impl CommandRunner for FakeRunner {
        fn run(&self, program: &str, args: &[&str]) -> io::Result<CommandOutput> {
            self.record(program, args)
        }

        fn run_with_input(
            &self,
            program: &str,
            args: &[&str],
            input: &str,
        ) -> io::Result<CommandOutput> {
            self.inputs.borrow_mut().push(input.to_string());
            self.record(program, args)
        }

        fn spawn(&self, program: &str, args: &[&str]) -> io::Result<()> {
            self.record(program, args).map(|_| ())
        }

        fn run_interactive(&self, program: &str, steps: &[SessionStep]) -> io::Result<()> {
            let sent: Vec<&str> = steps
                .iter()
                .filter_map(|s| match s {
                    SessionStep::Send(line) => Some(line.as_str()),
                    SessionStep::Wait(_) => None,
                })
                .collect();
            self.record(program, &sent).map(|_| ())
        }
    }
}
