//! Bar modules.
//!
//! Each module turns some piece of system state into one polybar markup
//! line. One-shot modules return the line; long-running ones print a line
//! per relevant event until their event source goes away.

use std::io::{self, Write};

pub mod battery;
pub mod bluetooth_guard;
pub mod bluetooth_status;
pub mod cava;
pub mod sysmon;
pub mod temperature;
pub mod volume;
pub mod workspaces;

/// Write one bar line and flush it. Fails once polybar has closed the pipe.
pub fn emit<W: Write>(out: &mut W, line: &str) -> io::Result<()> {
    writeln!(out, "{}", line)?;
    out.flush()
}

/// [`emit`] to stdout.
pub fn emit_stdout(line: &str) -> io::Result<()> {
    emit(&mut io::stdout().lock(), line)
}
