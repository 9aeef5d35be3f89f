//! Bluetooth manager menu: power, discovery and per-device actions.

use std::fs;
use std::io;
use std::thread;
use std::time::Duration;

use polystatus_core::config::BluetoothConfig;
use tracing::{debug, info, warn};

use super::picker::{PickRequest, Picker};
use crate::services::bluetoothctl::{self, BLUETOOTHCTL, BtDevice, DeviceInfo};
use crate::services::notify::{Notification, Urgency};
use crate::services::process::CommandRunner;

const ICON_CONNECTED: &str = "\u{f058}";
const ICON_TRUSTED: &str = "\u{f132} ";
const ICON_PAIRED: &str = "\u{f0c2} ";
const ICON_NEW: &str = "\u{f29c} ";
const ICON_SCAN: &str = "\u{f0349}";

const ROW_POWER_ON: &str = "\u{f294}  Activar Bluetooth";
const ROW_POWER_OFF: &str = "\u{f00b2}  Desactivar Bluetooth";
const ROW_SCAN: &str = "\u{f0349}  Escanear (Descubrir nuevos)";

const ROW_DISCONNECT: &str = "\u{f0156} Desconectar";
const ROW_CONNECT: &str = "\u{f00b1} Conectar";
const ROW_UNPAIR: &str = "\u{f127} Desvincular (Unpair)";
const ROW_PAIR: &str = "\u{f0c1} Vincular (Pair)";
const ROW_UNTRUST: &str = "\u{f127} Quitar Confianza (Untrust)";
const ROW_TRUST: &str = "\u{f132} Confiar (Trust)";
const ROW_BACK: &str = "\u{f060} Volver";

const SUMMARY: &str = "Bluetooth";

/// Pauses between steps, giving bluetoothd time to settle.
#[derive(Debug, Clone, Copy)]
pub struct Timings {
    pub power: Duration,
    pub pair: Duration,
    pub trust: Duration,
    pub tick: Duration,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            power: Duration::from_millis(200),
            pair: Duration::from_millis(1000),
            trust: Duration::from_millis(500),
            tick: Duration::from_millis(100),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Screen {
    Main,
    Device(String),
}

impl Screen {
    fn prompt(&self) -> String {
        match self {
            Screen::Main => SUMMARY.to_string(),
            Screen::Device(mac) => format!("Action ({})", mac),
        }
    }
}

pub fn device_row(device: &BtDevice) -> String {
    let status = if device.info.connected {
        ICON_CONNECTED
    } else if device.info.trusted {
        ICON_TRUSTED
    } else if device.info.paired {
        ICON_PAIRED
    } else {
        ICON_NEW
    };
    format!(
        "{}   {}  <b>{}</b> <span size='x-small' alpha='50%'>{}</span>",
        status,
        device.info.icon(),
        device.name,
        device.mac
    )
}

pub fn device_actions(info: &DeviceInfo) -> Vec<String> {
    let connect = if info.connected { ROW_DISCONNECT } else { ROW_CONNECT };
    let pair = if info.paired || info.trusted { ROW_UNPAIR } else { ROW_PAIR };
    let trust = if info.trusted { ROW_UNTRUST } else { ROW_TRUST };
    [connect, pair, trust, ROW_BACK].map(String::from).to_vec()
}

pub struct BluetoothMenu<'a, R: CommandRunner + ?Sized, P: Picker> {
    runner: &'a R,
    picker: &'a P,
    config: &'a BluetoothConfig,
    timings: Timings,
}

impl<'a, R: CommandRunner + ?Sized, P: Picker> BluetoothMenu<'a, R, P> {
    pub fn new(runner: &'a R, picker: &'a P, config: &'a BluetoothConfig) -> Self {
        Self {
            runner,
            picker,
            config,
            timings: Timings::default(),
        }
    }

    #[cfg(test)]
    pub fn with_timings(mut self, timings: Timings) -> Self {
        self.timings = timings;
        self
    }

    fn main_rows(&self) -> Vec<String> {
        if !bluetoothctl::is_powered(self.runner) {
            return vec![ROW_POWER_ON.to_string()];
        }

        let mut rows = vec![ROW_POWER_OFF.to_string(), ROW_SCAN.to_string()];
        rows.extend(
            bluetoothctl::list_devices(self.runner, &self.config.scan_cache)
                .iter()
                .map(device_row),
        );
        rows
    }

    fn rows(&self, screen: &Screen) -> Vec<String> {
        match screen {
            Screen::Main => self.main_rows(),
            Screen::Device(mac) => device_actions(&bluetoothctl::info(self.runner, mac)),
        }
    }

    /// Run until the user exits.
    pub fn run(&self) {
        let mut screen = Screen::Main;
        while let Some(next) = self.step(&screen) {
            screen = next;
            thread::sleep(self.timings.tick);
        }
    }

    /// Show one screen and act on the choice. `None` ends the menu.
    pub fn step(&self, screen: &Screen) -> Option<Screen> {
        let request = PickRequest::list(screen.prompt(), self.rows(screen)).markup();

        let Some(choice) = self.picker.pick(&request) else {
            return match screen {
                Screen::Device(_) => Some(Screen::Main),
                Screen::Main => None,
            };
        };
        if choice.is_empty() {
            return None;
        }

        self.handle(screen, &choice)
    }

    fn handle(&self, screen: &Screen, choice: &str) -> Option<Screen> {
        if choice.starts_with(ROW_POWER_ON) {
            self.ctl(&["power", "on"]);
            thread::sleep(self.timings.power);
            return Some(screen.clone());
        }
        if choice.starts_with(ROW_POWER_OFF) {
            self.ctl(&["power", "off"]);
            thread::sleep(self.timings.power);
            return Some(screen.clone());
        }
        if choice.starts_with(ICON_SCAN) {
            self.scan();
            return Some(screen.clone());
        }
        if choice.ends_with(" Volver") {
            return Some(Screen::Main);
        }

        if let Screen::Device(mac) = screen
            && let Some(next) = self.device_action(mac, choice)
        {
            return next;
        }

        match bluetoothctl::find_mac(choice) {
            Some(mac) => Some(Screen::Device(mac.to_string())),
            None => {
                debug!("Ignoring unrecognised choice {:?}", choice);
                Some(screen.clone())
            }
        }
    }

    /// Outer `None` means `choice` is not a device action.
    fn device_action(&self, mac: &str, choice: &str) -> Option<Option<Screen>> {
        let stay = Some(Screen::Device(mac.to_string()));

        let next = if choice.contains(ROW_DISCONNECT) {
            self.ctl(&["disconnect", mac]);
            self.notify(format!("Desconectado: {}", mac));
            None
        } else if choice.contains(ROW_CONNECT) {
            self.connect(mac)
        } else if choice.contains("\u{f127} Desvincular") {
            self.ctl(&["remove", mac]);
            self.notify(format!("Desvinculado: {}", mac));
            Some(Screen::Main)
        } else if choice.contains("\u{f0c1} Vincular") {
            let next = self.pair(mac);
            thread::sleep(self.timings.pair);
            next
        } else if choice.contains("\u{f127} Quitar Confianza") {
            self.ctl(&["untrust", mac]);
            self.notify(format!("Confianza retirada: {}", mac));
            thread::sleep(self.timings.trust);
            stay
        } else if choice.contains("\u{f132} Confiar") {
            self.ctl(&["trust", mac]);
            self.notify(format!("Dispositivo de Confianza: {}", mac));
            thread::sleep(self.timings.trust);
            stay
        } else {
            return None;
        };
        Some(next)
    }

    fn connect(&self, mac: &str) -> Option<Screen> {
        self.notify(format!("Conectando a {}...", mac));
        match self.ctl_checked(&["connect", mac]) {
            Ok(()) => {
                self.notify_normal(format!("Conectado: {}", mac));
                self.ctl(&["trust", mac]);
                None
            }
            Err(err) => {
                self.notify_error(format!("Falló conexión: {}", err));
                Some(Screen::Main)
            }
        }
    }

    fn pair(&self, mac: &str) -> Option<Screen> {
        self.notify(format!("Vinculando {}...", mac));
        match self.ctl_checked(&["pair", mac]) {
            Ok(()) => {
                self.notify_normal(format!("Vinculado: {}", mac));
                self.ctl(&["trust", mac]);
                self.notify("Auto-conectando...".to_string());
                self.ctl(&["connect", mac]);
                Some(Screen::Device(mac.to_string()))
            }
            Err(err) => {
                self.notify_error(format!("Falló vinculación: {}", err));
                Some(Screen::Main)
            }
        }
    }

    fn scan(&self) {
        let secs = self.config.scan_duration_secs;
        self.notify(format!("Escaneando ({}s)...", secs));

        let duration = Duration::from_secs(u64::from(secs));
        if let Err(e) = bluetoothctl::scan(self.runner, duration, &self.config.scan_cache) {
            warn!("Bluetooth scan failed: {}", e);
        }

        self.notify("Escaneo finalizado".to_string());
    }

    /// Fire a bluetoothctl command whose outcome doesn't change the flow.
    fn ctl(&self, args: &[&str]) {
        if let Err(err) = self.ctl_checked(args) {
            debug!("bluetoothctl {:?}: {}", args, err);
        }
    }

    /// Run a bluetoothctl command, returning its error text on failure.
    fn ctl_checked(&self, args: &[&str]) -> Result<(), String> {
        match self.runner.run(BLUETOOTHCTL, args) {
            Ok(output) if output.success => Ok(()),
            Ok(output) => Err(output.error_text().to_string()),
            Err(e) => Err(e.to_string()),
        }
    }

    fn notify(&self, body: String) {
        Notification::new(SUMMARY, body)
            .icon("bluetooth")
            .send(self.runner);
    }

    fn notify_normal(&self, body: String) {
        Notification::new(SUMMARY, body)
            .icon("bluetooth")
            .urgency(Urgency::Normal)
            .send(self.runner);
    }

    fn notify_error(&self, body: String) {
        Notification::new(SUMMARY, body)
            .icon("dialog-error")
            .urgency(Urgency::Critical)
            .send(self.runner);
    }
}

/// Forget the previous session's scan results.
pub fn clear_scan_cache(config: &BluetoothConfig) -> io::Result<()> {
    match fs::remove_file(&config.scan_cache) {
        Ok(()) => {
            info!("Removed scan cache {}", config.scan_cache.display());
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::menus::picker::scripted::{Answer, ScriptedPicker, row};
    use crate::services::process::CommandOutput;
    use crate::services::process::fake::FakeRunner;
    use std::path::PathBuf;

    const MAC: &str = "AA:BB:CC:DD:EE:01";

    const NO_WAIT: Timings = Timings {
        power: Duration::ZERO,
        pair: Duration::ZERO,
        trust: Duration::ZERO,
        tick: Duration::ZERO,
    };

    fn config(name: &str) -> BluetoothConfig {
        BluetoothConfig {
            scan_cache: std::env::temp_dir().join(format!(
                "polystatus_bt_{}_{}",
                name,
                std::process::id()
            )),
            scan_duration_secs: 0,
        }
    }

    fn powered_runner() -> FakeRunner {
        let runner = FakeRunner::new();
        runner.respond("bluetoothctl show", CommandOutput::ok("Controller 00:11\n\tPowered: yes\n"));
        runner.respond("bluetoothctl devices", CommandOutput::ok(format!("Device {} Buds\n", MAC)));
        runner.respond(
            &format!("bluetoothctl info {}", MAC),
            CommandOutput::ok("\tIcon: audio-headset\n\tPaired: yes\n\tTrusted: no\n\tConnected: no\n"),
        );
        runner
    }

    fn notifications(runner: &FakeRunner) -> Vec<String> {
        runner
            .calls()
            .into_iter()
            .filter(|c| c.starts_with("notify-send"))
            .collect()
    }

    #[test]
    fn test_device_row() {
        let device = BtDevice {
            mac: MAC.to_string(),
            name: "Buds".to_string(),
            info: DeviceInfo {
                connected: false,
                paired: true,
                trusted: true,
                icon_name: Some("audio-headset".to_string()),
            },
        };
        assert_eq!(
            device_row(&device),
            format!(
                "\u{f132}    \u{f025}  <b>Buds</b> <span size='x-small' alpha='50%'>{}</span>",
                MAC
            )
        );
    }

    #[test]
    fn test_device_actions() {
        let fresh = device_actions(&DeviceInfo::default());
        assert_eq!(fresh, vec![ROW_CONNECT, ROW_PAIR, ROW_TRUST, ROW_BACK]);

        let trusted = device_actions(&DeviceInfo {
            connected: true,
            paired: false,
            trusted: true,
            icon_name: None,
        });
        assert_eq!(trusted, vec![ROW_DISCONNECT, ROW_UNPAIR, ROW_UNTRUST, ROW_BACK]);
    }

    #[test]
    fn test_powered_off_shows_only_power_on() {
        let runner = FakeRunner::new();
        runner.respond("bluetoothctl show", CommandOutput::ok("\tPowered: no\n"));
        let picker = ScriptedPicker::new(vec![Answer::Cancel]);
        let config = config("off");

        BluetoothMenu::new(&runner, &picker, &config).with_timings(NO_WAIT).run();

        let requests = picker.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].rows, vec![ROW_POWER_ON]);
        assert_eq!(requests[0].prompt, "Bluetooth");
        assert!(requests[0].markup);
    }

    #[test]
    fn test_power_on_stays_in_main() {
        let runner = FakeRunner::new();
        let picker = ScriptedPicker::new(vec![row("Activar"), Answer::Cancel]);
        let config = config("power");
        let menu = BluetoothMenu::new(&runner, &picker, &config).with_timings(NO_WAIT);

        assert_eq!(menu.step(&Screen::Main), Some(Screen::Main));
        assert!(runner.called("bluetoothctl power on"));
    }

    #[test]
    fn test_cancel_and_empty_choice() {
        let runner = powered_runner();
        let config = config("cancel");
        let picker = ScriptedPicker::new(vec![
            Answer::Cancel,
            Answer::Cancel,
            Answer::Text(String::new()),
        ]);
        let menu = BluetoothMenu::new(&runner, &picker, &config).with_timings(NO_WAIT);

        let device = Screen::Device(MAC.to_string());
        assert_eq!(menu.step(&device), Some(Screen::Main));
        assert_eq!(menu.step(&Screen::Main), None);
        assert_eq!(menu.step(&device), None);
    }

    #[test]
    fn test_select_device_opens_submenu() {
        let runner = powered_runner();
        let config = config("select");
        let picker = ScriptedPicker::new(vec![row("Buds")]);
        let menu = BluetoothMenu::new(&runner, &picker, &config).with_timings(NO_WAIT);

        assert_eq!(menu.step(&Screen::Main), Some(Screen::Device(MAC.to_string())));
        assert_eq!(picker.requests()[0].rows.len(), 3);
    }

    #[test]
    fn test_connect_success_trusts_and_exits() {
        let runner = powered_runner();
        let config = config("connect");
        let picker = ScriptedPicker::new(vec![row("Buds"), row("Conectar")]);

        BluetoothMenu::new(&runner, &picker, &config).with_timings(NO_WAIT).run();

        let connect = runner.position(&format!("bluetoothctl connect {}", MAC)).unwrap();
        let trust = runner.position(&format!("bluetoothctl trust {}", MAC)).unwrap();
        assert!(connect < trust);
        assert_eq!(
            notifications(&runner),
            vec![
                format!("notify-send Bluetooth Conectando a {}... -i bluetooth", MAC),
                format!("notify-send Bluetooth Conectado: {} -i bluetooth -u normal", MAC),
            ]
        );
        assert_eq!(picker.requests()[1].prompt, format!("Action ({})", MAC));
        assert_eq!(picker.requests().len(), 2);
    }

    #[test]
    fn test_connect_failure_returns_to_main() {
        let runner = powered_runner();
        runner.respond(
            &format!("bluetoothctl connect {}", MAC),
            CommandOutput {
                success: false,
                stdout: "Failed to connect: org.bluez.Error.Failed\n".to_string(),
                stderr: String::new(),
            },
        );
        let config = config("connect_fail");
        let picker = ScriptedPicker::new(vec![row("Conectar")]);
        let menu = BluetoothMenu::new(&runner, &picker, &config).with_timings(NO_WAIT);

        assert_eq!(menu.step(&Screen::Device(MAC.to_string())), Some(Screen::Main));
        assert!(!runner.called(&format!("bluetoothctl trust {}", MAC)));
        assert_eq!(
            notifications(&runner).last().unwrap(),
            "notify-send Bluetooth Falló conexión: Failed to connect: org.bluez.Error.Failed -i dialog-error -u critical"
        );
    }

    #[test]
    fn test_disconnect_exits() {
        let runner = FakeRunner::new();
        runner.respond(
            &format!("bluetoothctl info {}", MAC),
            CommandOutput::ok("\tPaired: yes\n\tConnected: yes\n"),
        );
        let config = config("disconnect");
        let picker = ScriptedPicker::new(vec![row("Desconectar")]);
        let menu = BluetoothMenu::new(&runner, &picker, &config).with_timings(NO_WAIT);

        assert_eq!(menu.step(&Screen::Device(MAC.to_string())), None);
        assert!(runner.called(&format!("bluetoothctl disconnect {}", MAC)));
    }

    #[test]
    fn test_pair_success_stays_in_submenu() {
        let runner = FakeRunner::new();
        let config = config("pair");
        let picker = ScriptedPicker::new(vec![row("Vincular")]);
        let menu = BluetoothMenu::new(&runner, &picker, &config).with_timings(NO_WAIT);

        let device = Screen::Device(MAC.to_string());
        assert_eq!(menu.step(&device), Some(device.clone()));

        let pair = runner.position(&format!("bluetoothctl pair {}", MAC)).unwrap();
        let trust = runner.position(&format!("bluetoothctl trust {}", MAC)).unwrap();
        let connect = runner.position(&format!("bluetoothctl connect {}", MAC)).unwrap();
        assert!(pair < trust && trust < connect);
        assert!(notifications(&runner).iter().any(|n| n.contains("Auto-conectando...")));
    }

    #[test]
    fn test_pair_failure_returns_to_main() {
        let runner = FakeRunner::new();
        runner.respond(
            &format!("bluetoothctl pair {}", MAC),
            CommandOutput::failed("Failed to pair: org.bluez.Error.AuthenticationFailed"),
        );
        let config = config("pair_fail");
        let picker = ScriptedPicker::new(vec![row("Vincular")]);
        let menu = BluetoothMenu::new(&runner, &picker, &config).with_timings(NO_WAIT);

        assert_eq!(menu.step(&Screen::Device(MAC.to_string())), Some(Screen::Main));
        assert!(!runner.called(&format!("bluetoothctl connect {}", MAC)));
    }

    #[test]
    fn test_unpair_and_trust_toggles() {
        let runner = powered_runner();
        let config = config("toggles");
        let picker = ScriptedPicker::new(vec![row("Desvincular"), row("Confiar"), row("Volver")]);
        let menu = BluetoothMenu::new(&runner, &picker, &config).with_timings(NO_WAIT);
        let device = Screen::Device(MAC.to_string());

        assert_eq!(menu.step(&device), Some(Screen::Main));
        assert!(runner.called(&format!("bluetoothctl remove {}", MAC)));

        assert_eq!(menu.step(&device), Some(device.clone()));
        assert!(runner.called(&format!("bluetoothctl trust {}", MAC)));

        assert_eq!(menu.step(&device), Some(Screen::Main));
    }

    #[test]
    fn test_scan_writes_cache() {
        let runner = powered_runner();
        let config = config("scan");
        let picker = ScriptedPicker::new(vec![row("Escanear")]);
        let menu = BluetoothMenu::new(&runner, &picker, &config).with_timings(NO_WAIT);

        assert_eq!(menu.step(&Screen::Main), Some(Screen::Main));
        assert!(runner.called("bluetoothctl scan on scan off exit"));
        assert!(fs::read_to_string(&config.scan_cache).unwrap().contains(MAC));
        assert_eq!(
            notifications(&runner),
            vec![
                "notify-send Bluetooth Escaneando (0s)... -i bluetooth",
                "notify-send Bluetooth Escaneo finalizado -i bluetooth",
            ]
        );

        fs::remove_file(&config.scan_cache).ok();
    }

    #[test]
    fn test_clear_scan_cache() {
        let config = config("clear");
        fs::write(&config.scan_cache, "Device AA:BB:CC:DD:EE:01 Buds").unwrap();
        clear_scan_cache(&config).unwrap();
        assert!(!PathBuf::from(&config.scan_cache).exists());
        clear_scan_cache(&config).unwrap();
    }
}
