use indicatif::{ProgressBar, ProgressStyle};

/// Spinner shown while waiting on remote state
pub struct WaitProgress {
    progress_bar: ProgressBar,
}

impl WaitProgress {
    pub fn new(what: &str) -> Self {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} [{elapsed_precise}] {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message(format!("Waiting for {}...", what));
        pb.enable_steady_tick(std::time::Duration::from_millis(120));

        Self { progress_bar: pb }
    }

    pub fn set_attempt(&self, what: &str, attempt: u32) {
        self.progress_bar
            .set_message(format!("Waiting for {} (attempt {})...", what, attempt));
    }

    pub fn finish_success(&self, what: &str) {
        self.progress_bar
            .finish_with_message(format!("{} ✓", what));
    }

    pub fn finish_error(&self, error: &str) {
        self.progress_bar
            .finish_with_message(format!("Wait failed: {}", error));
    }
}
