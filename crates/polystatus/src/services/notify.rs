//! Desktop notifications through `notify-send`.

use tracing::warn;

use super::process::CommandRunner;

/// Urgency passed through `-u`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Urgency {
    Normal,
    Critical,
}

impl Urgency {
    fn as_arg(self) -> &'static str {
        match self {
            Urgency::Normal => "normal",
            Urgency::Critical => "critical",
        }
    }
}

/// A single notification. Arguments are emitted as
/// `<summary> <body> [-i <icon>] [-u <urgency>]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub summary: String,
    pub body: String,
    pub icon: Option<String>,
    pub urgency: Option<Urgency>,
}

impl Notification {
    pub fn new(summary: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            summary: summary.into(),
            body: body.into(),
            icon: None,
            urgency: None,
        }
    }

    pub fn icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    pub fn urgency(mut self, urgency: Urgency) -> Self {
        self.urgency = Some(urgency);
        self
    }

    pub fn args(&self) -> Vec<&str> {
        let mut args = vec![self.summary.as_str(), self.body.as_str()];
        if let Some(ref icon) = self.icon {
            args.extend(["-i", icon.as_str()]);
        }
        if let Some(urgency) = self.urgency {
            args.extend(["-u", urgency.as_arg()]);
        }
        args
    }

    /// Fire and forget. A missing `notify-send` is logged, never fatal.
    pub fn send<R: CommandRunner + ?Sized>(&self, runner: &R) {
        if let Err(e) = runner.spawn("notify-send", &self.args()) {
            warn!("notify-send failed: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::process::fake::FakeRunner;

    #[test]
    fn test_args_order() {
        let n = Notification::new("Bluetooth", "Conectado: AA")
            .icon("bluetooth")
            .urgency(Urgency::Normal);
        assert_eq!(
            n.args(),
            vec!["Bluetooth", "Conectado: AA", "-i", "bluetooth", "-u", "normal"]
        );
    }

    #[test]
    fn test_args_without_icon() {
        let n = Notification::new("Batería Baja", "5% restante").urgency(Urgency::Critical);
        assert_eq!(
            n.args(),
            vec!["Batería Baja", "5% restante", "-u", "critical"]
        );
    }

    #[test]
    fn test_send_tolerates_missing_binary() {
        let runner = FakeRunner::new();
        runner.missing("notify-send");
        Notification::new("WiFi", "Activado").send(&runner);
        assert_eq!(runner.calls(), vec!["notify-send WiFi Activado"]);
    }
}
