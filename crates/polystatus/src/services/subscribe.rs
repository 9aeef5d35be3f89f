//! Long-lived event subscriptions read line by line from a child process
//! (`bspc subscribe report`, `pactl subscribe`).

use std::io::{self, BufRead, BufReader};
use std::process::{Child, ChildStdout, Command, Stdio};

use tracing::{debug, warn};

/// A running subscriber process.
///
/// The child is killed when the subscriber is dropped.
pub struct LineSubscriber {
    program: String,
    child: Child,
    reader: BufReader<ChildStdout>,
}

impl LineSubscriber {
    pub fn spawn(program: &str, args: &[&str]) -> io::Result<Self> {
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .spawn()?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| io::Error::other("subscriber stdout was not captured"))?;

        debug!("Subscribed to {} {:?}", program, args);
        Ok(Self {
            program: program.to_string(),
            child,
            reader: BufReader::new(stdout),
        })
    }

    /// Block on the stream and call `on_line` for every event line.
    ///
    /// Returns when the subscriber closes its stdout, or with the first
    /// error `on_line` reports.
    pub fn for_each_line<F>(mut self, mut on_line: F) -> io::Result<()>
    where
        F: FnMut(&str) -> io::Result<()>,
    {
        drive_lines(&mut self.reader, &mut on_line)?;
        warn!("{} subscription ended", self.program);
        Ok(())
    }
}

impl Drop for LineSubscriber {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

fn drive_lines<B, F>(reader: &mut B, on_line: &mut F) -> io::Result<()>
where
    B: BufRead,
    F: FnMut(&str) -> io::Result<()>,
{
    let mut line = String::new();
    loop {
        line.clear();
        if reader.read_line(&mut line)? == 0 {
            return Ok(());
        }
        on_line(line.trim_end_matches(['\n', '\r']))?;
    }
}

/// Whether a `pactl subscribe` event can change the default sink or its
/// volume.
pub fn is_sink_or_server_event(line: &str) -> bool {
    line.contains("sink") || line.contains("server")
}
