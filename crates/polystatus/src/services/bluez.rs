//! BlueZ over the system D-Bus.
//!
//! Only two questions are ever asked of BlueZ directly: "is an adapter
//! powered / is any device connected" (status glyph) and "did a device just
//! disconnect" (privacy guard). Everything interactive goes through
//! `bluetoothctl`.

use gio::prelude::*;
use glib::Variant;

pub const BLUEZ_SERVICE: &str = "org.bluez";
pub const ADAPTER_IFACE: &str = "org.bluez.Adapter1";
pub const DEVICE_IFACE: &str = "org.bluez.Device1";
pub const OBJECT_MANAGER_IFACE: &str = "org.freedesktop.DBus.ObjectManager";
pub const PROPERTIES_IFACE: &str = "org.freedesktop.DBus.Properties";

/// Aggregate adapter/device state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BluezSummary {
    /// Any adapter has `Powered = true`.
    pub powered: bool,
    /// Any device has `Connected = true`.
    pub any_connected: bool,
}

/// Look up a boolean in an `a{sv}` dict.
pub fn vardict_bool(props: &Variant, key: &str) -> Option<bool> {
    (0..props.n_children()).find_map(|i| {
        let prop = props.child_value(i);
        if prop.child_value(0).str() != Some(key) {
            return None;
        }
        // value is a variant containing the actual value
        prop.child_value(1).child_value(0).get::<bool>()
    })
}

/// Fold a `GetManagedObjects` reply `(a{oa{sa{sv}}})` into a summary.
pub fn summarize_managed_objects(result: &Variant) -> BluezSummary {
    let mut summary = BluezSummary::default();

    let objects = result.child_value(0);
    for i in 0..objects.n_children() {
        // Entry is {o, a{sa{sv}}} - object path and dict of interfaces
        let ifaces = objects.child_value(i).child_value(1);

        for j in 0..ifaces.n_children() {
            let iface_entry = ifaces.child_value(j);
            let props = iface_entry.child_value(1);

            match iface_entry.child_value(0).str() {
                Some(ADAPTER_IFACE) => {
                    summary.powered |= vardict_bool(&props, "Powered").unwrap_or(false);
                }
                Some(DEVICE_IFACE) => {
                    summary.any_connected |= vardict_bool(&props, "Connected").unwrap_or(false);
                }
                _ => {}
            }
        }
    }

    summary
}

/// Blocking `GetManagedObjects` on `org.bluez /`.
pub fn managed_objects_summary(
    connection: &gio::DBusConnection,
) -> Result<BluezSummary, glib::Error> {
    let reply = connection.call_sync(
        Some(BLUEZ_SERVICE),
        "/",
        OBJECT_MANAGER_IFACE,
        "GetManagedObjects",
        None,
        glib::VariantTy::new("(a{oa{sa{sv}}})").ok(),
        gio::DBusCallFlags::NONE,
        5000,
        None::<&gio::Cancellable>,
    )?;
    Ok(summarize_managed_objects(&reply))
}

/// Whether a `PropertiesChanged (s a{sv} as)` payload reports a
/// `Device1` going to `Connected = false`.
pub fn is_device_disconnect(parameters: &Variant) -> bool {
    if parameters.n_children() < 2 || parameters.child_value(0).str() != Some(DEVICE_IFACE) {
        return false;
    }
    vardict_bool(&parameters.child_value(1), "Connected") == Some(false)
}
