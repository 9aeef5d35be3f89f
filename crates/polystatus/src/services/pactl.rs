//! PulseAudio / pipewire-pulse queries through `pactl`.

use super::process::{CommandError, CommandRunner, capture, checked};

pub const PACTL: &str = "pactl";
pub const DEFAULT_SINK: &str = "@DEFAULT_SINK@";

/// Name of the default sink, if the server answered.
pub fn default_sink<R: CommandRunner + ?Sized>(runner: &R) -> Option<String> {
    let sink = capture(runner, PACTL, &["get-default-sink"]);
    (!sink.is_empty()).then_some(sink)
}

/// Monitor source of a sink, by PulseAudio naming convention.
pub fn monitor_of(sink: &str) -> String {
    format!("{}.monitor", sink)
}

/// Whether `pactl list sinks short` lists `sink`.
pub fn sink_listed(sinks_short: &str, sink: &str) -> bool {
    sinks_short
        .lines()
        .any(|line| line.split('\t').nth(1).is_some_and(|name| name.trim() == sink))
}

pub fn list_sinks_short<R: CommandRunner + ?Sized>(runner: &R) -> Result<String, CommandError> {
    checked(runner, PACTL, &["list", "sinks", "short"])
}

pub fn default_sink_muted<R: CommandRunner + ?Sized>(runner: &R) -> Result<bool, CommandError> {
    checked(runner, PACTL, &["get-sink-mute", DEFAULT_SINK]).map(|out| out.contains("yes"))
}

pub fn default_sink_volume<R: CommandRunner + ?Sized>(runner: &R) -> Result<String, CommandError> {
    checked(runner, PACTL, &["get-sink-volume", DEFAULT_SINK])
}

/// First `<digits>%` in `text`, e.g. the front-left channel of
/// `Volume: front-left: 65536 / 100% / 0.00 dB, ...`.
pub fn first_percentage(text: &str) -> Option<u32> {
    let bytes = text.as_bytes();
    bytes.iter().enumerate().find_map(|(i, b)| {
        if *b != b'%' {
            return None;
        }
        let start = bytes[..i]
            .iter()
            .rposition(|c| !c.is_ascii_digit())
            .map_or(0, |p| p + 1);
        if start == i {
            return None;
        }
        text[start..i].parse().ok()
    })
}
