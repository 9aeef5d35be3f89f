//! CPU temperature glyph, with the reading shown while a marker file exists.

use std::fs;
use std::io;
use std::path::Path;

use polystatus_core::color::Rgb;
use polystatus_core::config::TemperatureConfig;
use polystatus_core::markup::colored;
use tracing::debug;

const ICON: &str = "\u{f2c8}";

const COLOR_CYAN: Rgb = Rgb(0, 188, 212);
const COLOR_WHITE: Rgb = Rgb::WHITE;
const COLOR_YELLOW: Rgb = Rgb(255, 235, 59);
const COLOR_RED: Rgb = Rgb(244, 67, 54);

/// Colour for a temperature in °C: cyan up to 40, white up to 52, then a
/// white → yellow → red ramp that tops out at 90.
pub fn temperature_color(celsius: f64) -> Rgb {
    if celsius <= 40.0 {
        COLOR_CYAN
    } else if celsius <= 52.0 {
        COLOR_WHITE
    } else if celsius <= 75.0 {
        COLOR_WHITE.lerp(COLOR_YELLOW, (celsius - 52.0) / 23.0)
    } else if celsius <= 90.0 {
        COLOR_YELLOW.lerp(COLOR_RED, (celsius - 75.0) / 15.0)
    } else {
        COLOR_RED
    }
}

pub fn render(celsius: f64, show_text: bool) -> String {
    let hex = temperature_color(celsius).to_hex();
    let mut out = colored(&hex, ICON);
    if show_text {
        out.push(' ');
        out.push_str(&colored(&hex, &format!("{}°C", celsius as i64)));
    }
    out
}

/// Read a thermal zone file (millidegrees) as °C.
pub fn read_celsius(zone: &Path) -> io::Result<f64> {
    let raw = fs::read_to_string(zone)?;
    let millis: i64 = raw
        .trim()
        .parse()
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    Ok(millis as f64 / 1000.0)
}

/// One-shot render; `None` when the zone can't be read.
pub fn status(config: &TemperatureConfig) -> Option<String> {
    match read_celsius(&config.thermal_zone) {
        Ok(celsius) => Some(render(celsius, config.state_file.exists())),
        Err(e) => {
            debug!("Failed to read {}: {}", config.thermal_zone.display(), e);
            None
        }
    }
}

/// Flip the marker file. Returns whether text is now shown.
pub fn toggle(state_file: &Path) -> io::Result<bool> {
    if state_file.exists() {
        fs::remove_file(state_file)?;
        Ok(false)
    } else {
        fs::File::create(state_file)?;
        Ok(true)
    }
}
