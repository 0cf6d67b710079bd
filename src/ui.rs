use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::time::{Duration, Instant};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UiMode {
    Auto,
    Plain,
    Pretty,
}

/// Stderr progress for interactive runs: spinners on a TTY, `==>` lines otherwise.
#[derive(Clone, Debug)]
pub struct Ui {
    mode: UiMode,
    is_tty: bool,
    disable_pretty: bool,
}

impl Ui {
    pub fn new(mode: UiMode, is_tty: bool, disable_pretty: bool) -> Self {
        Self {
            mode,
            is_tty,
            disable_pretty,
        }
    }

    pub fn from_args(ui_flag: Option<&str>, is_tty: bool, disable_pretty: bool) -> Self {
        let mode = match ui_flag {
            Some("plain") => UiMode::Plain,
            Some("pretty") => UiMode::Pretty,
            _ => UiMode::Auto,
        };
        Self::new(mode, is_tty, disable_pretty)
    }

    fn use_pretty(&self) -> bool {
        self.is_tty
            && match self.mode {
                UiMode::Pretty => true,
                UiMode::Auto => !self.disable_pretty,
                UiMode::Plain => false,
            }
    }

    fn spinner(&self, message: String) -> ProgressBar {
        let spinner = ProgressBar::new_spinner();
        spinner.set_draw_target(ProgressDrawTarget::stderr());
        spinner.enable_steady_tick(Duration::from_millis(120));
        let style = ProgressStyle::with_template("{spinner} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        spinner.set_style(style);
        spinner.set_message(message);
        spinner
    }

    /// A named, timed stage. Finishes when the guard drops.
    pub fn stage(&self, name: &str) -> StageGuard {
        if self.use_pretty() {
            let spinner = self.spinner(format!("{name}…"));
            StageGuard::new(name.to_string(), Some(spinner))
        } else {
            eprintln!("==> {}", name);
            StageGuard::new(name.to_string(), None)
        }
    }

    /// Live status line for the scan loop.
    pub fn scan_status(&self, initial: &str) -> ScanStatus {
        if self.use_pretty() {
            ScanStatus {
                spinner: Some(self.spinner(initial.to_string())),
            }
        } else {
            eprintln!("==> {}", initial);
            ScanStatus { spinner: None }
        }
    }
}

pub struct StageGuard {
    name: String,
    start: Instant,
    spinner: Option<ProgressBar>,
}

impl StageGuard {
    fn new(name: String, spinner: Option<ProgressBar>) -> Self {
        Self {
            name,
            start: Instant::now(),
            spinner,
        }
    }
}

impl Drop for StageGuard {
    fn drop(&mut self) {
        let elapsed = self.start.elapsed();
        let message = format!("✔ {} ({})", self.name, format_duration(elapsed));
        if let Some(spinner) = &self.spinner {
            spinner.finish_with_message(message);
        } else {
            eprintln!("{message}");
        }
    }
}

/// Transient progress (`update`) plus permanent lines (`line`).
pub struct ScanStatus {
    spinner: Option<ProgressBar>,
}

impl ScanStatus {
    /// Replace the spinner message. Plain mode prints nothing.
    pub fn update(&self, message: &str) {
        if let Some(spinner) = &self.spinner {
            spinner.set_message(message.to_string());
        }
    }

    /// Print a line that stays on screen.
    pub fn line(&self, message: &str) {
        match &self.spinner {
            Some(spinner) => spinner.println(message),
            None => eprintln!("{message}"),
        }
    }

    pub fn finish(self, message: &str) {
        match &self.spinner {
            Some(spinner) => spinner.finish_with_message(message.to_string()),
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
