//! Terminal feedback for provisioning.
//!
//! Provisioning is a fixed sequence of stages, and a failure in any of them
//! aborts the rest. [`Progress`] gives each stage its own spinner that is
//! finished in place as ✔ or ✘ with the stage's outcome, so the last line
//! on screen names the stage that failed. [`Progress::hidden`] keeps the
//! same code path silent for tests and library callers.

use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Yellow braille spinner shown while a stage runs.
pub fn spinner_style() -> ProgressStyle {
    ProgressStyle::with_template("\x1b[33m{spinner}\x1b[0m {wide_msg}")
        .unwrap()
        .tick_strings(&["⣾", "⣽", "⣻", "⢿", "⡿", "⣟", "⣯", "⣷"])
}

/// Finished stage.
pub fn ok_style() -> ProgressStyle {
    ProgressStyle::with_template("\x1b[32m✔\x1b[0m {wide_msg}").unwrap()
}

/// Failed stage; the message carries the error.
pub fn err_style() -> ProgressStyle {
    ProgressStyle::with_template("\x1b[31m✘\x1b[0m {wide_msg}").unwrap()
}

/// Stage-by-stage reporter drawing on stderr.
pub struct Progress {
    visible: bool,
}

impl Progress {
    pub fn stderr() -> Self {
        Self { visible: true }
    }

    pub fn hidden() -> Self {
        Self { visible: false }
    }

    pub fn step(&self, msg: impl Into<String>) -> Step {
        let pb = if self.visible {
            let pb = ProgressBar::new_spinner();
            pb.set_style(spinner_style());
            pb.enable_steady_tick(Duration::from_millis(80));
            pb
        } else {
            ProgressBar::hidden()
        };
        let msg = msg.into();
        pb.set_message(msg.clone());
        Step { pb, msg }
    }
}

pub struct Step {
    pb: ProgressBar,
    msg: String,
}

impl Step {
    pub fn done(self, detail: impl AsRef<str>) {
        self.pb.set_style(ok_style());
        let detail = detail.as_ref();
        if detail.is_empty() {
            self.pb.finish_with_message(self.msg);
        } else {
            self.pb.finish_with_message(format!("{} ({})", self.msg, detail));
        }
    }

    pub fn fail(self, err: &dyn std::fmt::Display) {
        self.pb.set_style(err_style());
        self.pb
            .finish_with_message(format!("{} (error: {})", self.msg, err));
    }
}
