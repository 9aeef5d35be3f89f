//! bspwm desktop list with an occupancy heatmap.

use std::io;

use polystatus_core::color::Rgb;
use polystatus_core::markup::{action, colored};
use tracing::debug;

use crate::services::bspwm::{self, BSPC, WmDump};
use crate::services::process::CommandRunner;
use crate::services::subscribe::LineSubscriber;
use crate::widgets::emit_stdout;

const COLOR_FOCUSED: &str = "#00BCD4";
const COLOR_URGENT: &str = "#cb0e0eff";
const COLOR_EMPTY: &str = "#333333";

const ICON_FOCUSED: &str = "\u{f111}";
const ICON_OCCUPIED: &str = "\u{f192}";
const ICON_EMPTY: &str = "\u{f10c}";
const ICON_URGENT: &str = "\u{f06a}";

/// Heatmap colour for a desktop holding `count` windows: white for one,
/// red from five up.
pub fn heat_color(count: usize) -> String {
    match count {
        0 | 1 => Rgb::WHITE.to_hex(),
        c if c >= 5 => Rgb::RED.to_hex(),
        c => Rgb::WHITE.lerp(Rgb::RED, (c - 1) as f64 / 4.0).to_hex(),
    }
}

/// Visual state of one desktop. Earlier variants win.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DesktopState {
    Focused,
    Urgent,
    Occupied(usize),
    Empty,
}

impl DesktopState {
    fn icon(&self) -> &'static str {
        match self {
            DesktopState::Focused => ICON_FOCUSED,
            DesktopState::Urgent => ICON_URGENT,
            DesktopState::Occupied(_) => ICON_OCCUPIED,
            DesktopState::Empty => ICON_EMPTY,
        }
    }

    fn color(&self) -> String {
        match self {
            DesktopState::Focused => COLOR_FOCUSED.to_string(),
            DesktopState::Urgent => COLOR_URGENT.to_string(),
            DesktopState::Occupied(count) => heat_color(*count),
            DesktopState::Empty => COLOR_EMPTY.to_string(),
        }
    }
}

/// `(name, state)` for every desktop of every monitor, in dump order.
pub fn desktop_states(dump: &WmDump) -> Vec<(String, DesktopState)> {
    dump.monitors
        .iter()
        .flat_map(|mon| {
            let monitor_focused = mon.id == dump.focused_monitor_id;
            mon.desktops.iter().map(move |desk| {
                let count = desk.window_count();
                let state = if monitor_focused && desk.id == mon.focused_desktop_id {
                    DesktopState::Focused
                } else if desk.is_urgent() {
                    DesktopState::Urgent
                } else if count > 0 {
                    DesktopState::Occupied(count)
                } else {
                    DesktopState::Empty
                };
                (desk.name.clone(), state)
            })
        })
        .collect()
}

pub fn render(dump: &WmDump) -> String {
    desktop_states(dump)
        .into_iter()
        .map(|(name, state)| {
            let command = format!("bspc desktop -f {}", name);
            let item = action(1, &command, &colored(&state.color(), state.icon()));
            format!(" {} ", item)
        })
        .collect()
}

/// Current line for the bar; empty when bspwm can't be queried.
pub fn status<R: CommandRunner + ?Sized>(runner: &R) -> String {
    match bspwm::query_dump(runner) {
        Ok(dump) => render(&dump),
        Err(e) => {
            debug!("bspwm dump failed: {}", e);
            String::new()
        }
    }
}

/// Re-render on every `bspc subscribe report` line.
pub fn run<R: CommandRunner + ?Sized>(runner: &R) -> io::Result<()> {
    let subscriber = LineSubscriber::spawn(BSPC, &["subscribe", "report"])?;
    emit_stdout(&status(runner))?;

    subscriber.for_each_line(|_report| emit_stdout(&status(runner)))
}
