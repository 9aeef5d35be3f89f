//! One-shot CPU / RAM / GPU usage with threshold colouring.

use std::fs;
use std::io;
use std::thread;
use std::time::Duration;

use polystatus_core::config::{SystemConfig, Thresholds};
use polystatus_core::markup::{FG_END, fg};
use tracing::debug;

use crate::services::process::{CommandRunner, capture};

const COLOR_WARN: &str = "#FFC07F";
const COLOR_CRIT: &str = "#FF7A7A";

/// Colour prefix for `value`. Normal load inherits the bar colour.
pub fn level_color(value: f64, thresholds: Thresholds) -> String {
    if value >= thresholds.crit {
        fg(COLOR_CRIT)
    } else if value >= thresholds.warn {
        fg(COLOR_WARN)
    } else {
        String::new()
    }
}

pub fn render(value: f64, thresholds: Thresholds) -> String {
    format!("{}{}%{}", level_color(value, thresholds), value as i64, FG_END)
}

/// `(idle, total)` jiffies from the aggregate `cpu ` line of `/proc/stat`.
/// Idle includes iowait.
pub fn parse_cpu_times(stat: &str) -> Option<(u64, u64)> {
    let line = stat.lines().find(|l| l.starts_with("cpu "))?;
    let fields: Vec<u64> = line
        .split_whitespace()
        .skip(1)
        .map(|f| f.parse().ok())
        .collect::<Option<_>>()?;
    if fields.len() < 5 {
        return None;
    }
    Some((fields[3] + fields[4], fields.iter().sum()))
}

/// Busy percentage between two samples, `None` when no time passed.
pub fn cpu_usage(first: (u64, u64), second: (u64, u64)) -> Option<f64> {
    let total = second.1.saturating_sub(first.1);
    if total == 0 {
        return None;
    }
    let idle = second.0.saturating_sub(first.0);
    Some(100.0 * (1.0 - idle as f64 / total as f64))
}

/// Used memory percentage from `/proc/meminfo`, `None` when MemTotal is 0
/// or missing.
pub fn ram_usage(meminfo: &str) -> Option<f64> {
    let field = |name: &str| -> u64 {
        meminfo
            .lines()
            .find(|l| l.starts_with(name))
            .and_then(|l| l.split_whitespace().nth(1))
            .and_then(|v| v.parse().ok())
            .unwrap_or(0)
    };

    let total = field("MemTotal:");
    if total == 0 {
        return None;
    }
    let available = field("MemAvailable:");
    Some(total.saturating_sub(available) as f64 / total as f64 * 100.0)
}

fn read_cpu_times() -> io::Result<(u64, u64)> {
    let stat = fs::read_to_string("/proc/stat")?;
    Ok(parse_cpu_times(&stat).unwrap_or((0, 0)))
}

pub fn cpu(config: &SystemConfig) -> io::Result<String> {
    let first = read_cpu_times()?;
    thread::sleep(Duration::from_millis(config.cpu_sample_ms));
    let second = read_cpu_times()?;

    Ok(match cpu_usage(first, second) {
        Some(usage) => render(usage, config.cpu),
        None => "0%".to_string(),
    })
}

pub fn ram(config: &SystemConfig) -> io::Result<String> {
    let meminfo = fs::read_to_string("/proc/meminfo")?;
    Ok(match ram_usage(&meminfo) {
        Some(usage) => render(usage, config.ram),
        None => "0%".to_string(),
    })
}

/// GPU utilisation from `nvidia-smi`; empty on any failure.
pub fn gpu<R: CommandRunner + ?Sized>(runner: &R, config: &SystemConfig) -> String {
    let output = capture(
        runner,
        "nvidia-smi",
        &[
            "--query-gpu=utilization.gpu",
            "--format=csv,noheader,nounits",
        ],
    );
    match output.parse::<u32>() {
        Ok(usage) => render(usage as f64, config.gpu),
        Err(e) => {
            debug!("Unusable nvidia-smi output {:?}: {}", output, e);
            String::new()
        }
    }
}
