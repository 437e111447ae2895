// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Progress reporting.
//!
//! Long running operations emit progress events to a [`Reporter`]. Nothing
//! in the package lifecycle depends on how, or whether, those events are
//! shown to the user.
//!
//! Spinners are only drawn to a terminal. Without one, e.g., in CI or when
//! stderr is piped, [`SpinnerReporter`] forwards every line to the log
//! instead, so warnings are never lost.

use colored::Colorize;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::{cell::RefCell, time::Duration};
use tracing::{debug, info, warn};

const SPINNER_FRAMES: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "✓"];
const TICK: Duration = Duration::from_millis(80);

/// Sink for progress events.
pub trait Reporter {
    /// Start new task.
    fn begin(&self, message: &str);

    /// Replace message of current task.
    fn update(&self, message: &str);

    /// Report non-fatal problem.
    fn warn(&self, message: &str);

    /// Finish current task.
    fn finish(&self, success: bool, message: &str);
}

/// Draw a terminal spinner for the current task.
#[derive(Debug)]
pub struct SpinnerReporter {
    progress: MultiProgress,
    current: RefCell<Option<ProgressBar>>,
}

impl SpinnerReporter {
    /// Construct new spinner reporter drawing through `progress`.
    pub fn new(progress: MultiProgress) -> Self {
        Self {
            progress,
            current: RefCell::new(None),
        }
    }

    fn spinner(&self, message: &str) -> ProgressBar {
        let bar = self.progress.add(ProgressBar::new_spinner());
        if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
            bar.set_style(style.tick_strings(SPINNER_FRAMES));
        }
        bar.set_message(message.to_string());
        bar.enable_steady_tick(TICK);
        bar
    }

    fn println(&self, line: String) {
        if self.progress.println(&line).is_err() {
            eprintln!("{line}");
        }
    }

    // INVARIANT: Hidden draw targets swallow println, so log instead.
    fn is_hidden(&self) -> bool {
        self.progress.is_hidden()
    }
}

impl Reporter for SpinnerReporter {
    fn begin(&self, message: &str) {
        debug!("begin: {message}");
        let mut current = self.current.borrow_mut();
        if let Some(bar) = current.take() {
            bar.finish_and_clear();
        }
        *current = Some(self.spinner(message));
    }

    fn update(&self, message: &str) {
        debug!("{message}");
        match self.current.borrow().as_ref() {
            Some(bar) => bar.set_message(message.to_string()),
            None if self.is_hidden() => {}
            None => self.println(format!("  {message}")),
        }
    }

    fn warn(&self, message: &str) {
        if self.is_hidden() {
            warn!("{message}");
            return;
        }

        self.println(format!("{} {}", "!".yellow().bold(), message.yellow()));
    }

    fn finish(&self, success: bool, message: &str) {
        if let Some(bar) = self.current.borrow_mut().take() {
            bar.finish_and_clear();
        }

        if self.is_hidden() {
            if success {
                info!("{message}");
            } else {
                warn!("{message}");
            }
            return;
        }

        let mark = if success { "✓".green() } else { "✘".red() };
        self.println(format!("{mark} {message}"));
    }
}

/// Forward progress events to the log only.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentReporter;

impl Reporter for SilentReporter {
    fn begin(&self, message: &str) {
        debug!("begin: {message}");
    }

    fn update(&self, message: &str) {
        debug!("{message}");
    }

    fn warn(&self, message: &str) {
        warn!("{message}");
    }

    fn finish(&self, success: bool, message: &str) {
        if success {
            info!("{message}");
        } else {
            warn!("{message}");
        }
    }
}
