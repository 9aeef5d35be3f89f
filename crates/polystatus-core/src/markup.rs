//! Polybar formatting tokens.
//!
//! Polybar parses `%{F#rrggbb}` / `%{F-}` for foreground colour and
//! `%{A<button>:<command>:}` / `%{A}` for click actions. The exact token
//! text matters: bar configs and other scripts match on it.

/// Resets the foreground colour to the bar default.
pub const FG_END: &str = "%{F-}";

/// Closes the innermost action block.
pub const ACTION_END: &str = "%{A}";

/// Opening foreground token for `color` (any polybar colour literal,
/// e.g. `#00BCD4` or `#cb0e0eff`).
pub fn fg(color: &str) -> String {
    format!("%{{F{}}}", color)
}

/// `text` wrapped in a foreground colour block.
pub fn colored(color: &str, text: &str) -> String {
    format!("{}{}{}", fg(color), text, FG_END)
}

/// `content` wrapped in a click action for mouse `button`.
pub fn action(button: u8, command: &str, content: &str) -> String {
    format!("%{{A{}:{}:}}{}{}", button, command, content, ACTION_END)
}
