//! NetworkManager access via `nmcli` terse output.

use std::collections::HashSet;

use super::process::{CommandRunner, capture};

pub const NMCLI: &str = "nmcli";

/// Split a `nmcli -t` line on unescaped `:` and decode `\:` / `\\`.
pub fn split_terse(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut chars = line.chars();

    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some(escaped) => current.push(escaped),
                None => current.push('\\'),
            },
            ':' => fields.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    fields.push(current);
    fields
}

/// A Wi-Fi network as shown in the menu.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WifiNetwork {
    pub ssid: String,
    /// Raw nmcli security string ("WPA2", "WPA1 WPA2", ...), or "OPEN".
    pub security: String,
    pub signal: u32,
    pub active: bool,
    pub saved: bool,
}

impl WifiNetwork {
    /// WPA or WEP protected. Anything else is connected to without a
    /// password.
    pub fn is_secured(&self) -> bool {
        self.security.contains("WPA") || self.security.contains("WEP")
    }
}

/// SSID of the `yes:` line of `nmcli -t -f active,ssid dev wifi`.
pub fn parse_active_ssid(output: &str) -> Option<String> {
    output.lines().find_map(|line| {
        let fields = split_terse(line);
        (fields.first().map(String::as_str) == Some("yes"))
            .then(|| fields.get(1).cloned().unwrap_or_default())
    })
}

/// Names of saved `802-11-wireless` profiles from
/// `nmcli -t -f NAME,TYPE connection show`.
pub fn parse_saved(output: &str) -> HashSet<String> {
    output
        .lines()
        .filter_map(|line| {
            let fields = split_terse(line);
            match fields.as_slice() {
                [name, kind, ..] if kind == "802-11-wireless" => Some(name.clone()),
                _ => None,
            }
        })
        .collect()
}

/// Parse `nmcli -t -f SSID,SECURITY,SIGNAL device wifi list`. Hidden SSIDs
/// are skipped and the first occurrence of each SSID wins.
pub fn parse_networks(
    output: &str,
    active_ssid: Option<&str>,
    saved: &HashSet<String>,
) -> Vec<WifiNetwork> {
    let mut seen = HashSet::new();
    let mut networks = Vec::new();

    for line in output.lines() {
        let fields = split_terse(line);
        let [ssid, security, signal, ..] = fields.as_slice() else {
            continue;
        };
        if ssid.is_empty() || !seen.insert(ssid.clone()) {
            continue;
        }

        networks.push(WifiNetwork {
            ssid: ssid.clone(),
            security: if security.is_empty() {
                "OPEN".to_string()
            } else {
                security.clone()
            },
            signal: signal.trim().parse().unwrap_or(0),
            active: active_ssid == Some(ssid.as_str()),
            saved: saved.contains(ssid),
        });
    }

    networks
}

/// Visible networks ordered active first, then saved, then by signal.
pub fn list_networks<R: CommandRunner + ?Sized>(runner: &R) -> Vec<WifiNetwork> {
    let active = parse_active_ssid(&capture(
        runner,
        NMCLI,
        &["-t", "-f", "active,ssid", "dev", "wifi"],
    ));
    let saved = parse_saved(&capture(
        runner,
        NMCLI,
        &["-t", "-f", "NAME,TYPE", "connection", "show"],
    ));
    let list = capture(
        runner,
        NMCLI,
        &["-t", "-f", "SSID,SECURITY,SIGNAL", "device", "wifi", "list"],
    );

    let mut networks = parse_networks(&list, active.as_deref(), &saved);
    networks.sort_by_key(|n| (!n.active, !n.saved, std::cmp::Reverse(n.signal)));
    networks
}

pub fn radio_enabled<R: CommandRunner + ?Sized>(runner: &R) -> bool {
    capture(runner, NMCLI, &["radio", "wifi"]).contains("enabled")
}
