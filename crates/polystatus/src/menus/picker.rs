//! Launcher front-end for the interactive menus.
//!
//! Rows go to the launcher's stdin, one per line; the chosen row comes back
//! on stdout. A non-zero exit status means the user dismissed the menu.

use polystatus_core::config::MenuConfig;
use tracing::{debug, warn};

use crate::services::process::CommandRunner;

/// One prompt shown to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PickRequest {
    pub prompt: String,
    pub rows: Vec<String>,
    /// Rows contain Pango markup.
    pub markup: bool,
    /// Free-text entry with the input hidden.
    pub password: bool,
}

impl PickRequest {
    pub fn list(prompt: impl Into<String>, rows: Vec<String>) -> Self {
        Self {
            prompt: prompt.into(),
            rows,
            markup: false,
            password: false,
        }
    }

    pub fn password(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            rows: Vec::new(),
            markup: false,
            password: true,
        }
    }

    pub fn markup(mut self) -> Self {
        self.markup = true;
        self
    }
}

/// Presents a [`PickRequest`]. `None` means cancelled.
pub trait Picker {
    fn pick(&self, request: &PickRequest) -> Option<String>;
}

/// rofi (or any dmenu-compatible launcher accepting rofi's flags).
pub struct RofiPicker<'a, R: CommandRunner + ?Sized> {
    runner: &'a R,
    config: &'a MenuConfig,
}

impl<'a, R: CommandRunner + ?Sized> RofiPicker<'a, R> {
    pub fn new(runner: &'a R, config: &'a MenuConfig) -> Self {
        Self { runner, config }
    }

    pub fn args<'r>(&'r self, request: &'r PickRequest) -> Vec<&'r str> {
        let mut args = vec![
            "-dmenu",
            "-theme-str",
            self.config.theme.as_str(),
            "-p",
            request.prompt.as_str(),
            "-format",
            "s",
        ];
        if request.markup {
            args.push("-markup-rows");
        }
        if request.password {
            args.push("-password");
        }
        args
    }
}

impl<R: CommandRunner + ?Sized> Picker for RofiPicker<'_, R> {
    fn pick(&self, request: &PickRequest) -> Option<String> {
        let input = request.rows.join("\n");
        let output = match self
            .runner
            .run_with_input(&self.config.program, &self.args(request), &input)
        {
            Ok(output) => output,
            Err(e) => {
                warn!("Failed to run {}: {}", self.config.program, e);
                return None;
            }
        };

        if !output.success {
            debug!("{} dismissed ({})", request.prompt, output.error_text());
            return None;
        }
        Some(output.stdout.trim().to_string())
    }
}

#[cfg(test)]
pub mod scripted {
    //! Picker that answers from a script.

    use std::cell::RefCell;
    use std::collections::VecDeque;

    use super::{PickRequest, Picker};

    #[derive(Debug, Clone)]
    pub enum Answer {
        /// First row containing this text.
        Row(String),
        /// Exactly this text, as typed.
        Text(String),
        Cancel,
    }

    /// Answers in order, then cancels once the script runs out.
    #[derive(Default)]
    pub struct ScriptedPicker {
        answers: RefCell<VecDeque<Answer>>,
        requests: RefCell<Vec<PickRequest>>,
    }

    impl ScriptedPicker {
        pub fn new(answers: Vec<Answer>) -> Self {
            Self {
                answers: RefCell::new(answers.into()),
                requests: RefCell::default(),
            }
        }

        pub fn requests(&self) -> Vec<PickRequest> {
            self.requests.borrow().clone()
        }
    }

    pub fn row(text: &str) -> Answer {
        Answer::Row(text.to_string())
    }

    impl Picker for ScriptedPicker {
        fn pick(&self, request: &PickRequest) -> Option<String> {
            self.requests.borrow_mut().push(request.clone());
            match self.answers.borrow_mut().pop_front()? {
                Answer::Row(needle) => request.rows.iter().find(|r| r.contains(&needle)).cloned(),
                Answer::Text(text) => Some(text),
                Answer::Cancel => None,
            }
        }
    }
}
