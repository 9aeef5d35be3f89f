//! Colour helpers shared by the gradient renderers.
//!
//! All gradients in polystatus are straight linear interpolations between
//! fixed RGB points. Channels are truncated, not rounded, when converting
//! back to integers so hex output stays stable across renderers.

/// An sRGB colour with 8-bit channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub const WHITE: Rgb = Rgb(255, 255, 255);
    pub const RED: Rgb = Rgb(255, 0, 0);
    pub const GREEN: Rgb = Rgb(0, 255, 0);

    /// Lowercase `#rrggbb` form.
    pub fn to_hex(self) -> String {
        rgb_to_hex(self.0, self.1, self.2)
    }

    /// Linear interpolation towards `to`.
    ///
    /// `t` is clamped to `0.0..=1.0`; `t = 0` yields `self` exactly and
    /// `t = 1` yields `to` exactly.
    pub fn lerp(self, to: Rgb, t: f64) -> Rgb {
        let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };

        fn channel(from: u8, to: u8, t: f64) -> u8 {
            let from = from as f64;
            let to = to as f64;
            (from + (to - from) * t) as u8
        }

        Rgb(
            channel(self.0, to.0, t),
            channel(self.1, to.1, t),
            channel(self.2, to.2, t),
        )
    }
}

/// Convert RGB channels to a lowercase hex colour string.
pub fn rgb_to_hex(r: u8, g: u8, b: u8) -> String {
    format!("#{:02x}{:02x}{:02x}", r, g, b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rgb_to_hex_is_lowercase() {
        assert_eq!(rgb_to_hex(0, 188, 212), "#00bcd4");
        assert_eq!(Rgb(255, 165, 0).to_hex(), "#ffa500");
    }

    #[test]
    fn test_lerp_endpoints_are_exact() {
        let from = Rgb(0, 188, 212);
        let to = Rgb(255, 165, 0);
        assert_eq!(from.lerp(to, 0.0), from);
        assert_eq!(from.lerp(to, 1.0), to);
    }

    #[test]
    fn test_lerp_truncates_channels() {
        // 255 - 255 * 0.25 = 191.25 -> 191
        assert_eq!(Rgb::WHITE.lerp(Rgb::RED, 0.25), Rgb(255, 191, 191));
        // 255 - 255 * 0.5 = 127.5 -> 127
        assert_eq!(Rgb::WHITE.lerp(Rgb::RED, 0.5), Rgb(255, 127, 127));
    }

    #[test]
    fn test_lerp_clamps_parameter() {
        assert_eq!(Rgb::WHITE.lerp(Rgb::GREEN, -1.0), Rgb::WHITE);
        assert_eq!(Rgb::WHITE.lerp(Rgb::GREEN, 4.0), Rgb::GREEN);
        assert_eq!(Rgb::WHITE.lerp(Rgb::GREEN, f64::NAN), Rgb::WHITE);
    }
}
