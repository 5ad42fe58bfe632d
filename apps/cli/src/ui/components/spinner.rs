use crate::ui::Theme;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

pub struct Spinner {
    pb: ProgressBar,
}

impl Spinner {
    pub fn new(task: impl Into<String>) -> Self {
        let pb = crate::ui::multi_progress().add(ProgressBar::new_spinner());
        let style = ProgressStyle::default_spinner()
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"])
            .template("{spinner:.cyan} {prefix:.bold} {msg:.dim}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        pb.set_style(style);
        pb.set_prefix(task.into());
        pb.enable_steady_tick(Duration::from_millis(80));
        Self { pb }
    }

    /// Sets the secondary (sub-task) message
    pub fn set_message(&self, msg: impl Into<String>) {
        self.pb.set_message(msg.into());
    }

    pub fn success(&self, msg: impl Into<String>) {
        self.pb
            .finish_with_message(format!("{} {}", Theme::success("✔"), msg.into()));
    }

    pub fn fail(&self, msg: impl Into<String>) {
        self.pb
            .finish_with_message(format!("{} {}", Theme::error("✖"), msg.into()));
    }
}

impl Drop for Spinner {
    fn drop(&mut self) {
        if !self.pb.is_finished() {
            self.pb.finish_and_clear();
        }
    }
}
