//! Interactive rofi menus.

pub mod bluetooth;
pub mod picker;
pub mod wifi;
