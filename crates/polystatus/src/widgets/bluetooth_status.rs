//! Bluetooth glyph coloured by adapter power and connection state.

use polystatus_core::markup::colored;
use tracing::debug;

use crate::services::bluez::{self, BluezSummary};

const ICON: &str = "\u{f294}";
const COLOR_OFF: &str = "#707880";
const COLOR_CONNECTED: &str = "#00FFB3";

/// Markup for a BlueZ query result. A failed query means BlueZ is not
/// running, which reads as "off".
pub fn render(summary: Result<BluezSummary, glib::Error>) -> String {
    match summary {
        Err(e) => {
            debug!("GetManagedObjects failed: {}", e);
            colored(COLOR_OFF, ICON)
        }
        Ok(s) if !s.powered => colored(COLOR_OFF, ICON),
        Ok(s) if s.any_connected => colored(COLOR_CONNECTED, ICON),
        Ok(_) => ICON.to_string(),
    }
}

/// One-shot status line. Without a system bus the glyph is left uncoloured.
pub fn status() -> String {
    match gio::bus_get_sync(gio::BusType::System, None::<&gio::Cancellable>) {
        Ok(connection) => render(bluez::managed_objects_summary(&connection)),
        Err(e) => {
            debug!("System bus unavailable: {}", e);
            ICON.to_string()
        }
    }
}
