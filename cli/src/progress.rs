use indicatif::{ProgressBar, ProgressStyle};
use std::ops::Deref;

use crate::utils::LOG_PREFIX_INFO;

/// Receives the completion percentage (0 to 100) of a long running command.
pub trait ProgressReporter {
    fn report(&self, percent: u64);
}

/// Progress bar on stderr, cleared when dropped.
pub struct Progress {
    progress_bar: ProgressBar,
}

impl Progress {
    pub fn new(prefix: &str) -> Self {
        let template = format!(
            "{} {{spinner:.green}} [{{elapsed_precise}}] {{prefix}} {{bar:32.cyan/blue}} {{pos}}% ({{eta}})",
            LOG_PREFIX_INFO.deref()
        );

        let progress_bar = ProgressBar::new(100);
        if let Ok(style) = ProgressStyle::default_bar().template(&template) {
            progress_bar.set_style(style.progress_chars("#>-"));
        }
        progress_bar.set_prefix(prefix.to_owned());

        Progress { progress_bar }
    }

    pub fn done(&self) {
        self.progress_bar.finish_and_clear();
    }
}

impl ProgressReporter for Progress {
    fn report(&self, percent: u64) {
        self.progress_bar.set_position(percent.min(100));
    }
}

impl Drop for Progress {
    fn drop(&mut self) {
        self.done();
    }
}
