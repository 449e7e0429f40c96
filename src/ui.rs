//! Terminal feedback: the loading indicator and user-facing notices.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::{Duration, Instant};

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UiMode {
    Auto,
    Plain,
    Pretty,
    /// No indicator output at all (tests, piped sessions).
    Quiet,
}

#[derive(Clone, Debug)]
pub struct Ui {
    mode: UiMode,
    is_tty: bool,
}

impl Ui {
    pub fn new(mode: UiMode, is_tty: bool) -> Self {
        Self { mode, is_tty }
    }

    pub fn quiet() -> Self {
        Self::new(UiMode::Quiet, false)
    }

    pub fn from_args(ui_flag: Option<&str>, is_tty: bool) -> Self {
        let mode = match ui_flag {
            Some("plain") => UiMode::Plain,
            Some("pretty") => UiMode::Pretty,
            Some("quiet") => UiMode::Quiet,
            _ => UiMode::Auto,
        };
        Self::new(mode, is_tty)
    }

    pub fn mode(&self) -> UiMode {
        self.mode
    }

    /// Show a loading indicator until the returned guard is dropped.
    pub fn stage(&self, name: &str) -> StageGuard {
        let use_pretty = self.is_tty && matches!(self.mode, UiMode::Pretty | UiMode::Auto);

        if self.mode == UiMode::Quiet {
            StageGuard::new(name.to_string(), None, false)
        } else if use_pretty {
            let spinner = ProgressBar::new_spinner();
            spinner.set_draw_target(ProgressDrawTarget::stderr());
            spinner.enable_steady_tick(Duration::from_millis(120));
            let style = ProgressStyle::with_template("{spinner} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner());
            spinner.set_style(style);
            spinner.set_message(format!("{name}…"));
            StageGuard::new(name.to_string(), Some(spinner), true)
        } else {
            eprintln!("==> {}", name);
            StageGuard::new(name.to_string(), None, true)
        }
    }
}

pub struct StageGuard {
    name: String,
    start: Instant,
    spinner: Option<ProgressBar>,
    visible: bool,
    failed: bool,
}

impl StageGuard {
    fn new(name: String, spinner: Option<ProgressBar>, visible: bool) -> Self {
        Self {
            name,
            start: Instant::now(),
            spinner,
            visible,
            failed: false,
        }
    }

    /// Mark the stage as failed; the indicator is cleared instead of ticked.
    pub fn fail(&mut self) {
        self.failed = true;
    }
}

impl Drop for StageGuard {
    fn drop(&mut self) {
        if !self.visible {
            return;
        }
        let elapsed = format_duration(self.start.elapsed());
        let message = if self.failed {
            format!("✘ {} ({})", self.name, elapsed)
        } else {
            format!("✔ {} ({})", self.name, elapsed)
        };
        match &self.spinner {
            Some(spinner) if self.failed => spinner.abandon_with_message(message),
            Some(spinner) => spinner.finish_with_message(message),
            None => eprintln!("{message}"),
        }
    }
}

fn format_duration(duration: Duration) -> String {
    if duration.as_secs() >= 1 {
        format!("{:.2}s", duration.as_secs_f64())
    } else {
        format!("{}ms", duration.as_millis())
    }
}

/// Blocking, user-visible notices (the alert box of a windowed host).
pub trait Notifier {
    fn notify(&mut self, message: &str);
}

/// Prints notices to stderr.
#[derive(Clone, Copy, Debug, Default)]
pub struct StderrNotifier;

impl Notifier for StderrNotifier {
    fn notify(&mut self, message: &str) {
        eprintln!("!! {}", message);
    }
}

/// Keeps every notice; clones share the same list.
#[derive(Clone, Debug, Default)]
pub struct RecordingNotifier {
    messages: Rc<RefCell<Vec<String>>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages.borrow().clone()
    }

    pub fn last(&self) -> Option<String> {
        self.messages.borrow().last().cloned()
    }

    pub fn clear(&self) {
        self.messages.borrow_mut().clear();
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&mut self, message: &str) {
        self.messages.borrow_mut().push(message.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ui_flag_parsing() {
        assert_eq!(Ui::from_args(Some("plain"), true).mode(), UiMode::Plain);
        assert_eq!(Ui::from_args(Some("quiet"), true).mode(), UiMode::Quiet);
        assert_eq!(Ui::from_args(None, false).mode(), UiMode::Auto);
    }

    #[test]
    fn recording_notifier_shares_messages() {
        let recorder = RecordingNotifier::new();
        let mut handle = recorder.clone();
        handle.notify("Please select a valid file.");
        assert_eq!(recorder.last().as_deref(), Some("Please select a valid file."));
        recorder.clear();
        assert!(recorder.messages().is_empty());
    }

    #[test]
    fn durations_are_human_sized() {
        assert_eq!(format_duration(Duration::from_millis(42)), "42ms");
        assert_eq!(format_duration(Duration::from_millis(1500)), "1.50s");
    }

    #[test]
    fn quiet_stage_is_silent() {
        let mut guard = Ui::quiet().stage("Loading model");
        guard.fail();
        drop(guard);
    }
}
