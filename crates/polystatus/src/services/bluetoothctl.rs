//! `bluetoothctl` output parsing and device discovery.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::time::Duration;

use tracing::debug;

use super::process::{CommandRunner, SessionStep, capture};

pub const BLUETOOTHCTL: &str = "bluetoothctl";

/// Device-class glyphs keyed by substrings of the BlueZ `Icon` name.
/// Checked in order; the first match wins.
const DEVICE_ICONS: &[(&str, &str)] = &[
    ("audio-card", "\u{f025}"),
    ("audio-headset", "\u{f025}"),
    ("audio-headphones", "\u{f025}"),
    ("input-keyboard", "\u{2328}"),
    ("input-mouse", "\u{f037d}"),
    ("phone", "\u{f10b}"),
    ("computer", "\u{1f4bb}"),
];
const DEFAULT_DEVICE_ICON: &str = "\u{f293}";

/// Flags parsed from `bluetoothctl info <mac>`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceInfo {
    pub connected: bool,
    pub paired: bool,
    pub trusted: bool,
    pub icon_name: Option<String>,
}

impl DeviceInfo {
    pub fn parse(info: &str) -> Self {
        let icon_name = info.lines().find_map(|line| {
            let (_, rest) = line.split_once("Icon:")?;
            rest.split_whitespace().next().map(str::to_string)
        });

        Self {
            connected: info.contains("Connected: yes"),
            paired: info.contains("Paired: yes"),
            trusted: info.contains("Trusted: yes"),
            icon_name,
        }
    }

    pub fn icon(&self) -> &'static str {
        device_icon(self.icon_name.as_deref())
    }
}

pub fn device_icon(icon_name: Option<&str>) -> &'static str {
    let Some(name) = icon_name else {
        return DEFAULT_DEVICE_ICON;
    };
    DEVICE_ICONS
        .iter()
        .find(|(key, _)| name.contains(key))
        .map(|(_, icon)| *icon)
        .unwrap_or(DEFAULT_DEVICE_ICON)
}

/// A device as listed in the menu.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BtDevice {
    pub mac: String,
    pub name: String,
    pub info: DeviceInfo,
}

/// Parse a `Device <MAC> [Name]` line from `bluetoothctl devices`.
/// A missing name becomes "Unknown".
pub fn parse_devices_line(line: &str) -> Option<(String, String)> {
    let mut parts = line.trim().splitn(3, ' ');
    let _tag = parts.next()?;
    let mac = parts.next().filter(|m| !m.is_empty())?;
    let name = parts.next().unwrap_or("Unknown");
    Some((mac.to_string(), name.to_string()))
}

/// Parse a scan cache line. Only complete `Device <MAC> <Name>` lines count.
pub fn parse_cache_line(line: &str) -> Option<(String, String)> {
    let mut parts = line.trim().splitn(3, ' ');
    if parts.next()? != "Device" {
        return None;
    }
    let mac = parts.next()?;
    let name = parts.next()?;
    Some((mac.to_string(), name.to_string()))
}

/// Find the first `XX:XX:XX:XX:XX:XX` address (uppercase hex) in `text`.
pub fn find_mac(text: &str) -> Option<&str> {
    const LEN: usize = 17;
    let bytes = text.as_bytes();
    if bytes.len() < LEN {
        return None;
    }

    (0..=bytes.len() - LEN).find_map(|start| {
        let window = &bytes[start..start + LEN];
        let valid = window.iter().enumerate().all(|(i, b)| {
            if i % 3 == 2 {
                *b == b':'
            } else {
                b.is_ascii_digit() || (b'A'..=b'F').contains(b)
            }
        });
        // An all-ASCII window always sits on char boundaries.
        valid.then(|| &text[start..start + LEN])
    })
}

pub fn is_powered<R: CommandRunner + ?Sized>(runner: &R) -> bool {
    capture(runner, BLUETOOTHCTL, &["show"]).contains("Powered: yes")
}

pub fn info<R: CommandRunner + ?Sized>(runner: &R, mac: &str) -> DeviceInfo {
    DeviceInfo::parse(&capture(runner, BLUETOOTHCTL, &["info", mac]))
}

/// Known devices merged with the scan cache, filtered and sorted for display.
///
/// A device is kept when it is paired, connected or trusted, or when its
/// address appears anywhere in the scan cache text. Order: connected first,
/// then paired, then by name.
pub fn list_devices<R: CommandRunner + ?Sized>(runner: &R, scan_cache: &Path) -> Vec<BtDevice> {
    let mut names: BTreeMap<String, String> = BTreeMap::new();

    for line in capture(runner, BLUETOOTHCTL, &["devices"]).lines() {
        if let Some((mac, name)) = parse_devices_line(line) {
            names.insert(mac, name);
        }
    }

    let cache = fs::read_to_string(scan_cache).unwrap_or_default();
    for line in cache.lines() {
        if let Some((mac, name)) = parse_cache_line(line) {
            names.entry(mac).or_insert(name);
        }
    }

    let mut devices: Vec<BtDevice> = names
        .into_iter()
        .filter_map(|(mac, name)| {
            let info = info(runner, &mac);
            let keep = info.connected || info.paired || info.trusted || cache.contains(&mac);
            if !keep {
                debug!("Hiding stale device {} ({})", name, mac);
            }
            keep.then_some(BtDevice { mac, name, info })
        })
        .collect();

    devices.sort_by(|a, b| {
        (!a.info.connected, !a.info.paired, &a.name).cmp(&(!b.info.connected, !b.info.paired, &b.name))
    });
    devices
}

/// Run discovery for `duration` inside one interactive session, then dump
/// the device list to `scan_cache`.
pub fn scan<R: CommandRunner + ?Sized>(
    runner: &R,
    duration: Duration,
    scan_cache: &Path,
) -> std::io::Result<()> {
    let steps = [
        SessionStep::Send("scan on".to_string()),
        SessionStep::Wait(duration),
        SessionStep::Send("scan off".to_string()),
        SessionStep::Send("exit".to_string()),
    ];
    runner.run_interactive(BLUETOOTHCTL, &steps)?;

    let devices = capture(runner, BLUETOOTHCTL, &["devices"]);
    fs::write(scan_cache, devices)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::process::CommandOutput;
    use crate::services::process::fake::FakeRunner;
    use std::path::PathBuf;

    const HEADSET_INFO: &str = "Device AA:BB:CC:DD:EE:01 (public)\n\
        \tName: Buds\n\
        \tIcon: audio-headset\n\
        \tPaired: yes\n\
        \tTrusted: yes\n\
        \tConnected: yes\n";

    fn cache_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!(
            "polystatus_bt_{}_cache_{}",
            name,
            std::process::id()
        ))
    }

    #[test]
    fn test_parse_info() {
        let info = DeviceInfo::parse(HEADSET_INFO);
        assert!(info.connected && info.paired && info.trusted);
        assert_eq!(info.icon_name.as_deref(), Some("audio-headset"));
        assert_eq!(info.icon(), "\u{f025}");
    }

    #[test]
    fn test_parse_info_unknown_device() {
        let info = DeviceInfo::parse("Device AA:BB:CC:DD:EE:02 not available\n");
        assert_eq!(info, DeviceInfo::default());
        assert_eq!(info.icon(), DEFAULT_DEVICE_ICON);
    }

    #[test]
    fn test_device_icon_table() {
        assert_eq!(device_icon(Some("input-keyboard")), "\u{2328}");
        assert_eq!(device_icon(Some("input-mouse")), "\u{f037d}");
        assert_eq!(device_icon(Some("phone")), "\u{f10b}");
        assert_eq!(device_icon(Some("computer")), "\u{1f4bb}");
        assert_eq!(device_icon(Some("input-gaming")), DEFAULT_DEVICE_ICON);
        assert_eq!(device_icon(None), DEFAULT_DEVICE_ICON);
    }

    #[test]
    fn test_parse_devices_line() {
        assert_eq!(
            parse_devices_line("Device AA:BB:CC:DD:EE:01 My Buds Pro"),
            Some(("AA:BB:CC:DD:EE:01".to_string(), "My Buds Pro".to_string()))
        );
        assert_eq!(
            parse_devices_line("Device AA:BB:CC:DD:EE:01"),
            Some(("AA:BB:CC:DD:EE:01".to_string(), "Unknown".to_string()))
        );
        assert_eq!(parse_devices_line("Device"), None);
    }

    #[test]
    fn test_parse_cache_line_requires_name() {
        assert!(parse_cache_line("Device AA:BB:CC:DD:EE:01 Speaker").is_some());
        assert!(parse_cache_line("Device AA:BB:CC:DD:EE:01").is_none());
        assert!(parse_cache_line("Controller AA:BB:CC:DD:EE:01 hci0").is_none());
    }

    #[test]
    fn test_find_mac() {
        assert_eq!(
            find_mac("x  <b>Buds</b> <span>AA:BB:CC:DD:EE:0F</span>"),
            Some("AA:BB:CC:DD:EE:0F")
        );
        assert_eq!(find_mac("aa:bb:cc:dd:ee:ff"), None);
        assert_eq!(find_mac("AA:BB:CC:DD:EE"), None);
        assert_eq!(find_mac("\u{f058} é AA:BB:CC:DD:EE:01"), Some("AA:BB:CC:DD:EE:01"));
    }

    #[test]
    fn test_list_devices_filters_and_sorts() {
        let cache = cache_path("list");
        fs::write(&cache, "Device AA:BB:CC:DD:EE:03 Zeta Speaker\n").unwrap();

        let runner = FakeRunner::new();
        runner.respond(
            "bluetoothctl devices",
            CommandOutput::ok(
                "Device AA:BB:CC:DD:EE:01 Buds\n\
                 Device AA:BB:CC:DD:EE:02 Old Ghost\n\
                 Device AA:BB:CC:DD:EE:04 Alpha Mouse\n",
            ),
        );
        runner.respond(
            "bluetoothctl info AA:BB:CC:DD:EE:01",
            CommandOutput::ok(HEADSET_INFO),
        );
        runner.respond(
            "bluetoothctl info AA:BB:CC:DD:EE:04",
            CommandOutput::ok("Icon: input-mouse\nPaired: yes\n"),
        );

        let devices = list_devices(&runner, &cache);
        let macs: Vec<&str> = devices.iter().map(|d| d.mac.as_str()).collect();
        assert_eq!(
            macs,
            vec!["AA:BB:CC:DD:EE:01", "AA:BB:CC:DD:EE:04", "AA:BB:CC:DD:EE:03"]
        );
        assert_eq!(devices[2].name, "Zeta Speaker");

        fs::remove_file(&cache).unwrap();
    }

    #[test]
    fn test_list_devices_without_cache() {
        let cache = cache_path("missing");
        let _ = fs::remove_file(&cache);

        let runner = FakeRunner::new();
        runner.respond(
            "bluetoothctl devices",
            CommandOutput::ok("Device AA:BB:CC:DD:EE:02 Old Ghost\n"),
        );
        assert!(list_devices(&runner, &cache).is_empty());
    }

    #[test]
    fn test_scan_writes_cache() {
        let cache = cache_path("scan");
        let _ = fs::remove_file(&cache);

        let runner = FakeRunner::new();
        runner.respond(
            "bluetoothctl devices",
            CommandOutput::ok("Device AA:BB:CC:DD:EE:05 New Phone\n"),
        );

        scan(&runner, Duration::ZERO, &cache).unwrap();

        assert_eq!(
            runner.calls(),
            vec!["bluetoothctl scan on scan off exit", "bluetoothctl devices"]
        );
        assert_eq!(
            fs::read_to_string(&cache).unwrap(),
            "Device AA:BB:CC:DD:EE:05 New Phone"
        );
        fs::remove_file(&cache).unwrap();
    }
}
