//! Battery readings from sysfs, with a UPower fallback.
//!
//! sysfs `energy_now / energy_full` gives sub-percent precision that the
//! UPower `Percentage` property rounds away, so it is the primary source.
//! UPower is only queried once at startup when sysfs yields nothing.

use std::fs;
use std::io;
use std::path::Path;

use gio::prelude::*;
use tracing::debug;

/// DBus constants for UPower.
const UPOWER_NAME: &str = "org.freedesktop.UPower";
const DEVICE_IFACE: &str = "org.freedesktop.UPower.Device";
const PROPERTIES_IFACE: &str = "org.freedesktop.DBus.Properties";

/// UPower state codes of interest.
/// See: https://upower.freedesktop.org/docs/Device.html#Device:state
pub const STATE_CHARGING: u32 = 1;
pub const STATE_DISCHARGING: u32 = 2;
pub const STATE_FULLY_CHARGED: u32 = 4;

/// Charging state as shown on the bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChargeState {
    #[default]
    Unknown,
    Charging,
    Discharging,
    Full,
}

impl ChargeState {
    /// Map a sysfs `status` string. A plugged-in battery that reports
    /// "Not charging" or "Unknown" is sitting at a charge threshold and is
    /// treated as full.
    pub fn from_sysfs(status: &str, ac_online: bool) -> Self {
        match status {
            "Charging" => ChargeState::Charging,
            "Discharging" => ChargeState::Discharging,
            "Full" => ChargeState::Full,
            "Not charging" | "Unknown" if ac_online => ChargeState::Full,
            _ => ChargeState::Unknown,
        }
    }

    pub fn from_upower(state: u32) -> Self {
        match state {
            STATE_CHARGING => ChargeState::Charging,
            STATE_DISCHARGING => ChargeState::Discharging,
            STATE_FULLY_CHARGED => ChargeState::Full,
            _ => ChargeState::Unknown,
        }
    }
}

/// One battery sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BatteryReading {
    /// Percentage in range 0.0-100.0.
    pub percent: f64,
    pub state: ChargeState,
}

fn read_number(path: &Path) -> io::Result<u64> {
    let raw = fs::read_to_string(path)?;
    raw.trim()
        .parse::<u64>()
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, format!("{}: {e}", path.display())))
}

/// Read `<now>` and `<full>` counters, preferring `energy_*` (µWh) and
/// falling back to `charge_*` (µAh) on batteries that only expose charge.
fn read_level(device_dir: &Path) -> io::Result<(u64, u64)> {
    match (
        read_number(&device_dir.join("energy_now")),
        read_number(&device_dir.join("energy_full")),
    ) {
        (Ok(now), Ok(full)) => Ok((now, full)),
        _ => Ok((
            read_number(&device_dir.join("charge_now"))?,
            read_number(&device_dir.join("charge_full"))?,
        )),
    }
}

/// Read the battery from its sysfs directory. `adapter_dir` is the AC
/// adapter; an unreadable `online` file counts as offline.
pub fn read_sysfs(device_dir: &Path, adapter_dir: &Path) -> io::Result<BatteryReading> {
    let (now, full) = read_level(device_dir)?;
    if full == 0 {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("{}: full capacity is zero", device_dir.display()),
        ));
    }

    let percent = (now as f64 / full as f64 * 100.0).clamp(0.0, 100.0);
    let status = fs::read_to_string(device_dir.join("status"))?;
    let ac_online = read_number(&adapter_dir.join("online")).is_ok_and(|v| v == 1);

    Ok(BatteryReading {
        percent,
        state: ChargeState::from_sysfs(status.trim(), ac_online),
    })
}

fn get_property(
    connection: &gio::DBusConnection,
    object_path: &str,
    name: &str,
) -> Result<glib::Variant, glib::Error> {
    let reply = connection.call_sync(
        Some(UPOWER_NAME),
        object_path,
        PROPERTIES_IFACE,
        "Get",
        Some(&(DEVICE_IFACE, name).to_variant()),
        glib::VariantTy::new("(v)").ok(),
        gio::DBusCallFlags::NONE,
        2000,
        None::<&gio::Cancellable>,
    )?;
    // (v) -> v -> inner value
    Ok(reply.child_value(0).child_value(0))
}

/// One-shot UPower query for the device at `object_path`.
pub fn query_upower(connection: &gio::DBusConnection, object_path: &str) -> Option<BatteryReading> {
    let percent = match get_property(connection, object_path, "Percentage") {
        Ok(v) => v.get::<f64>()?,
        Err(e) => {
            debug!("UPower Percentage query failed: {}", e);
            return None;
        }
    };
    let state = get_property(connection, object_path, "State")
        .ok()
        .and_then(|v| v.get::<u32>())
        .map(ChargeState::from_upower)
        .unwrap_or_default();

    Some(BatteryReading {
        percent: percent.clamp(0.0, 100.0),
        state,
    })
}
