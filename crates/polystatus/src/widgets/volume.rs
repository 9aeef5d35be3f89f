//! Default sink volume, re-rendered on every sink/server event.

use std::io;

use polystatus_core::markup::{FG_END, colored, fg};
use tracing::debug;

use crate::services::pactl::{self, PACTL};
use crate::services::process::{CommandError, CommandRunner};
use crate::services::subscribe::{LineSubscriber, is_sink_or_server_event};
use crate::widgets::emit_stdout;

const COLOR_MUTED: &str = "#707880";
const COLOR_ICON: &str = "#00BCD4";
const COLOR_WARN: &str = "#FFC07F";
const COLOR_CRIT: &str = "#FF7A7A";
const ICON: &str = "\u{f028}  ";

/// Markup for a volume level. Above 100% is overdrive and gets tinted.
pub fn render_volume(volume: u32) -> String {
    let color = if volume > 150 {
        fg(COLOR_CRIT)
    } else if volume > 100 {
        fg(COLOR_WARN)
    } else {
        String::new()
    };
    format!("{}{}{}%{}", colored(COLOR_ICON, ICON), color, volume, FG_END)
}

fn query<R: CommandRunner + ?Sized>(runner: &R) -> Result<String, CommandError> {
    if pactl::default_sink_muted(runner)? {
        return Ok(colored(COLOR_MUTED, "muted"));
    }
    let volume = pactl::default_sink_volume(runner)?;
    Ok(match pactl::first_percentage(&volume) {
        Some(v) => render_volume(v),
        None => "N/A".to_string(),
    })
}

/// Current line for the bar: the level, "muted", "N/A" when pactl printed
/// no percentage, or "Err" when pactl failed.
pub fn status<R: CommandRunner + ?Sized>(runner: &R) -> String {
    query(runner).unwrap_or_else(|e| {
        debug!("Volume query failed: {}", e);
        "Err".to_string()
    })
}

/// Print the current volume, then once per relevant `pactl subscribe` event.
pub fn run<R: CommandRunner + ?Sized>(runner: &R) -> io::Result<()> {
    emit_stdout(&status(runner))?;

    LineSubscriber::spawn(PACTL, &["subscribe"])?.for_each_line(|line| {
        if is_sink_or_server_event(line) {
            emit_stdout(&status(runner))?;
        }
        Ok(())
    })
}
