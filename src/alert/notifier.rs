use std::process::Command;

use crate::debounce::ALERT_SUBTITLE;

/// Host notification mechanism.
pub trait Notifier: Send {
    fn name(&self) -> &'static str;

    /// Capability check performed once when the alert channel starts.
    fn is_supported(&self) -> bool;

    /// Show a notification. Returns false when delivery failed.
    ///
    /// Must be safe to call repeatedly.
    fn notify(&mut self, title: &str, body: &str) -> bool;
}

/// Host window hook used when a notification could not be shown.
pub trait WindowHandle: Send {
    /// Restore, show and focus the host window.
    fn raise(&mut self);
}

/// Writes the alert to the log. Always supported.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn name(&self) -> &'static str {
        "log"
    }

    fn is_supported(&self) -> bool {
        true
    }

    fn notify(&mut self, title: &str, body: &str) -> bool {
        log::warn!("{} ({}): {}", title, ALERT_SUBTITLE, body);
        true
    }
}

/// Runs an external program (e.g. `notify-send`) per alert.
///
/// The program receives `--urgency=critical --app-name=pullwatch <title> <body>`.
#[derive(Clone, Debug)]
pub struct CommandNotifier {
    program: String,
}

impl CommandNotifier {
    pub fn new(program: &str) -> Self {
        Self {
            program: program.trim().to_string(),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }
}

impl Notifier for CommandNotifier {
    fn name(&self) -> &'static str {
        "command"
    }

    fn is_supported(&self) -> bool {
        !self.program.is_empty()
    }

    fn notify(&mut self, title: &str, body: &str) -> bool {
        let status = Command::new(&self.program)
            .arg("--urgency=critical")
            .arg("--app-name=pullwatch")
            .arg(title)
            .arg(body)
            .status();
        match status {
            Ok(status) if status.success() => {
                log::info!("system notification shown via {}", self.program);
                true
            }
            Ok(status) => {
                log::error!("{} exited with {}", self.program, status);
                false
            }
            Err(e) => {
                log::error!("failed to run {}: {}", self.program, e);
                false
            }
        }
    }
}

/// Window hook for runs without a host window; logs the request.
#[derive(Clone, Copy, Debug, Default)]
pub struct HeadlessWindow;

impl WindowHandle for HeadlessWindow {
    fn raise(&mut self) {
        log::warn!("notification failed; no host window to bring forward");
    }
}
