//! Keeps cava's `source =` pointed at the default sink's monitor.

use std::fs;
use std::io;
use std::path::Path;
use std::thread;
use std::time::Duration;

use anyhow::Context;
use polystatus_core::config::CavaConfig;
use tracing::{debug, info, warn};

use crate::services::pactl::{self, PACTL};
use crate::services::process::CommandRunner;
use crate::services::subscribe::{LineSubscriber, is_sink_or_server_event};

fn source_value(line: &str) -> Option<&str> {
    let trimmed = line.trim();
    if !trimmed.starts_with("source =") {
        return None;
    }
    let (_, value) = trimmed.split_once('=')?;
    Some(value.trim().trim_matches(|c| c == '"' || c == '\''))
}

/// `content` with every `source =` line set to `monitor`, or `None` when
/// nothing would change.
pub fn rewrite_source(content: &str, monitor: &str) -> Option<String> {
    let mut changed = false;
    let rewritten: String = content
        .split_inclusive('\n')
        .map(|line| match source_value(line) {
            Some(value) if value != monitor => {
                changed = true;
                format!("source = {}\n", monitor)
            }
            _ => line.to_string(),
        })
        .collect();

    changed.then_some(rewritten)
}

/// Point the cava config at `monitor` and ask cava to reload.
///
/// Returns whether the file was rewritten.
pub fn update_config<R: CommandRunner + ?Sized>(
    runner: &R,
    path: &Path,
    monitor: &str,
) -> io::Result<bool> {
    let content = fs::read_to_string(path)?;
    let Some(updated) = rewrite_source(&content, monitor) else {
        debug!("{} already uses {}", path.display(), monitor);
        return Ok(false);
    };

    fs::write(path, updated)?;
    info!("cava source set to {}", monitor);

    if let Err(e) = runner.run("pkill", &["-USR1", "cava"]) {
        warn!("Failed to signal cava: {}", e);
    }
    Ok(true)
}

/// Tracks the last monitor source written to the cava config.
pub struct InputSwitcher<'a, R: CommandRunner + ?Sized> {
    runner: &'a R,
    config: &'a CavaConfig,
    current: Option<String>,
}

impl<'a, R: CommandRunner + ?Sized> InputSwitcher<'a, R> {
    pub fn new(runner: &'a R, config: &'a CavaConfig) -> Self {
        Self {
            runner,
            config,
            current: None,
        }
    }

    #[cfg(test)]
    pub fn current(&self) -> Option<&str> {
        self.current.as_deref()
    }

    /// Resolve the default sink and apply its monitor if it changed.
    pub fn sync(&mut self) {
        let Some(sink) = pactl::default_sink(self.runner) else {
            debug!("No default sink");
            return;
        };

        match pactl::list_sinks_short(self.runner) {
            Ok(sinks) if !pactl::sink_listed(&sinks, &sink) => {
                warn!("Default sink {} is not in the sink list", sink);
            }
            Ok(_) => {}
            Err(e) => debug!("Could not list sinks: {}", e),
        }

        let monitor = pactl::monitor_of(&sink);
        if self.current.as_deref() == Some(monitor.as_str()) {
            return;
        }

        let path = self.config.resolved_config_path();
        match update_config(self.runner, &path, &monitor) {
            Ok(_) => self.current = Some(monitor),
            Err(e) => warn!("Cannot update {}: {}", path.display(), e),
        }
    }
}

pub fn run<R: CommandRunner + ?Sized>(runner: &R, config: &CavaConfig) -> anyhow::Result<()> {
    let mut switcher = InputSwitcher::new(runner, config);
    switcher.sync();

    let settle = Duration::from_millis(config.settle_ms);
    LineSubscriber::spawn(PACTL, &["subscribe"])
        .context("failed to start pactl subscribe")?
        .for_each_line(|line| {
            if is_sink_or_server_event(line) {
                thread::sleep(settle);
                switcher.sync();
            }
            Ok(())
        })
        .context("pactl subscribe stream failed")
}
