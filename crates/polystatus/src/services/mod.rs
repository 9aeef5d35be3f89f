//! System integration: subprocesses, sysfs and D-Bus.

pub mod battery;
pub mod bluetoothctl;
pub mod bluez;
pub mod bspwm;
pub mod nmcli;
pub mod notify;
pub mod pactl;
pub mod process;
pub mod subscribe;
