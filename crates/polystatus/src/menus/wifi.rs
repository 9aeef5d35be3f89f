//! Wi-Fi menu: radio toggle plus connect/disconnect/forget per network.

use tracing::debug;

use super::picker::{PickRequest, Picker};
use crate::services::nmcli::{self, NMCLI, WifiNetwork};
use crate::services::notify::Notification;
use crate::services::process::CommandRunner;

const ROW_TOGGLE: &str = "\u{f05a9}  Enable/Disable Wi-Fi";
const ROW_DISCONNECT: &str = "\u{f0156} Desconectar";
const ROW_CONNECT: &str = "\u{f00b1} Conectar";
const ROW_FORGET: &str = "\u{f127} Olvidar (Borrar perfil)";
const ROW_BACK: &str = "\u{f060} Volver";

const ICON_CONNECTED: &str = "\u{f058}";
const ICON_SAVED: &str = "\u{f0c2} ";
const ICON_NEW: &str = "  ";
const ICON_LOCK: &str = "\u{f023}";
const ICON_OPEN: &str = "\u{f09c}";

const SUMMARY: &str = "WiFi";
const ICON_DISCONNECTED: &str = "network-wireless-disconnected";
const ICON_ACQUIRING: &str = "network-wireless-acquiring";
const ICON_WIRELESS_CONNECTED: &str = "network-wireless-connected";

pub fn signal_icon(signal: u32) -> &'static str {
    match signal {
        80.. => "\u{f0928}",
        60..=79 => "\u{f0925}",
        40..=59 => "\u{f0922}",
        20..=39 => "\u{f091f}",
        _ => "\u{f092f}",
    }
}

pub fn network_row(net: &WifiNetwork) -> String {
    let status = if net.active {
        ICON_CONNECTED
    } else if net.saved {
        ICON_SAVED
    } else {
        ICON_NEW
    };
    let lock = if net.is_secured() { ICON_LOCK } else { ICON_OPEN };
    format!(
        "{}  {}   <b>{}</b> <span size='small' alpha='50%'>{} {}%</span>",
        status,
        signal_icon(net.signal),
        net.ssid,
        lock,
        net.signal
    )
}

pub fn network_actions(net: &WifiNetwork) -> Vec<String> {
    let mut rows = if net.active {
        vec![ROW_DISCONNECT, ROW_FORGET]
    } else if net.saved {
        vec![ROW_CONNECT, ROW_FORGET]
    } else {
        vec![ROW_CONNECT]
    };
    rows.push(ROW_BACK);
    rows.into_iter().map(String::from).collect()
}

/// Text between the first `<b>` and the following `</b>`.
pub fn bold_text(row: &str) -> Option<&str> {
    let start = row.find("<b>")? + "<b>".len();
    let len = row[start..].find("</b>")?;
    Some(&row[start..start + len])
}

pub struct WifiMenu<'a, R: CommandRunner + ?Sized, P: Picker> {
    runner: &'a R,
    picker: &'a P,
}

impl<'a, R: CommandRunner + ?Sized, P: Picker> WifiMenu<'a, R, P> {
    pub fn new(runner: &'a R, picker: &'a P) -> Self {
        Self { runner, picker }
    }

    /// Show the network list once and carry out the chosen action.
    pub fn run(&self) {
        let networks = nmcli::list_networks(self.runner);

        let mut rows = vec![ROW_TOGGLE.to_string()];
        rows.extend(networks.iter().map(network_row));

        let Some(choice) = self.picker.pick(&PickRequest::list(SUMMARY, rows).markup()) else {
            return;
        };
        if choice.is_empty() {
            return;
        }

        if choice.contains("Enable/Disable") {
            self.toggle_radio();
            return;
        }

        let Some(ssid) = bold_text(&choice) else {
            debug!("No SSID in choice {:?}", choice);
            return;
        };
        if let Some(net) = networks.iter().find(|n| n.ssid == ssid) {
            self.submenu(net);
        }
    }

    fn toggle_radio(&self) {
        if nmcli::radio_enabled(self.runner) {
            self.nmcli(&["radio", "wifi", "off"]);
            self.notify("Desactivado".to_string(), ICON_DISCONNECTED);
        } else {
            self.nmcli(&["radio", "wifi", "on"]);
            self.notify("Activado".to_string(), ICON_WIRELESS_CONNECTED);
        }
    }

    fn submenu(&self, net: &WifiNetwork) {
        let ssid = net.ssid.as_str();
        let request = PickRequest::list(format!("Action ({})", ssid), network_actions(net));
        let Some(choice) = self.picker.pick(&request) else {
            return;
        };

        if choice.contains("Desconectar") {
            self.nmcli(&["connection", "down", "id", ssid]);
            self.notify(format!("Desconectado de {}", ssid), ICON_DISCONNECTED);
        } else if choice.contains("Conectar") {
            self.connect(net);
        } else if choice.contains("Olvidar") {
            self.nmcli(&["connection", "delete", "id", ssid]);
            self.notify(format!("Olvidada: {}", ssid), ICON_DISCONNECTED);
        }
    }

    fn connect(&self, net: &WifiNetwork) {
        let ssid = net.ssid.as_str();

        let result = if net.saved {
            self.notify(format!("Conectando a {}...", ssid), ICON_ACQUIRING);
            self.nmcli_checked(&["connection", "up", "id", ssid])
        } else if net.is_secured() {
            let password = self
                .picker
                .pick(&PickRequest::password(format!("Password for {}", ssid)))
                .unwrap_or_default();
            if password.is_empty() {
                return;
            }
            self.notify(format!("Conectando a {}...", ssid), ICON_ACQUIRING);
            self.nmcli_checked(&["device", "wifi", "connect", ssid, "password", &password])
        } else {
            self.notify(format!("Conectando a {} (Open)...", ssid), ICON_ACQUIRING);
            self.nmcli_checked(&["device", "wifi", "connect", ssid])
        };

        match result {
            Ok(()) => self.notify(format!("Conectado: {}", ssid), ICON_WIRELESS_CONNECTED),
            Err(err) => self.notify(format!("Error: {}", err), "dialog-error"),
        }
    }

    fn nmcli(&self, args: &[&str]) {
        if let Err(err) = self.nmcli_checked(args) {
            debug!("nmcli {:?}: {}", args, err);
        }
    }

    fn nmcli_checked(&self, args: &[&str]) -> Result<(), String> {
        match self.runner.run(NMCLI, args) {
            Ok(output) if output.success => Ok(()),
            Ok(output) => Err(output.error_text().to_string()),
            Err(e) => Err(e.to_string()),
        }
    }

    fn notify(&self, body: String, icon: &str) {
        Notification::new(SUMMARY, body).icon(icon).send(self.runner);
    }
}
