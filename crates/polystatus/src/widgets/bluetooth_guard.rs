//! Pauses every media player when a Bluetooth device disconnects, so audio
//! doesn't fall back to the laptop speakers.

use anyhow::Context;
use gio::prelude::*;
use tracing::{info, warn};

use crate::services::bluez::{self, BLUEZ_SERVICE, PROPERTIES_IFACE};
use crate::services::notify::Notification;
use crate::services::process::{CommandRunner, SystemRunner};

/// React to one disconnect.
pub fn on_disconnect<R: CommandRunner + ?Sized>(runner: &R, object_path: &str) {
    info!("Bluetooth device disconnected: {}, pausing media", object_path);

    match runner.run("playerctl", &["pause", "-a"]) {
        Ok(output) if !output.success => {
            warn!("playerctl pause failed: {}", output.error_text());
        }
        Ok(_) => {}
        Err(e) => warn!("playerctl not available: {}", e),
    }

    Notification::new(
        "Bluetooth Privacy",
        "Dispositivo desconectado. Audio pausado.",
    )
    .icon("audio-speakers")
    .send(runner);
}

/// Watch BlueZ until SIGINT/SIGTERM.
pub fn run() -> anyhow::Result<()> {
    let connection = gio::bus_get_sync(gio::BusType::System, None::<&gio::Cancellable>)
        .context("failed to connect to the system bus")?;

    let _subscription = connection.subscribe_to_signal(
        Some(BLUEZ_SERVICE),
        Some(PROPERTIES_IFACE),
        Some("PropertiesChanged"),
        None, // any object path
        None,
        gio::DBusSignalFlags::NONE,
        |signal| {
            if bluez::is_device_disconnect(signal.parameters) {
                on_disconnect(&SystemRunner, signal.object_path);
            }
        },
    );

    let main_loop = glib::MainLoop::new(None, false);
    for signum in [libc::SIGINT, libc::SIGTERM] {
        let main_loop = main_loop.clone();
        glib::unix_signal_add_local(signum, move || {
            main_loop.quit();
            glib::ControlFlow::Break
        });
    }

    info!("Bluetooth privacy guard running");
    main_loop.run();
    info!("Bluetooth privacy guard stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::process::fake::FakeRunner;

    #[test]
    fn test_disconnect_pauses_then_notifies() {
        let runner = FakeRunner::new();
        on_disconnect(&runner, "/org/bluez/hci0/dev_AA_BB_CC_DD_EE_FF");
        assert_eq!(
            runner.calls(),
            vec![
                "playerctl pause -a",
                "notify-send Bluetooth Privacy Dispositivo desconectado. Audio pausado. -i audio-speakers",
            ]
        );
    }

    #[test]
    fn test_missing_playerctl_still_notifies() {
        let runner = FakeRunner::new();
        runner.missing("playerctl");
        on_disconnect(&runner, "/org/bluez/hci0/dev_AA_BB_CC_DD_EE_FF");
        assert_eq!(runner.calls().len(), 2);
    }
}
