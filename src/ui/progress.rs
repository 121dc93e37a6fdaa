use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Progress bar for quota-spaced batches; a no-op when disabled.
pub struct ProgressReporter {
    bar: Option<ProgressBar>,
    enabled: bool,
}

impl ProgressReporter {
    pub fn new(enabled: bool) -> Self {
        Self { bar: None, enabled }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn start_inspections(&mut self, total_urls: usize) {
        if !self.enabled {
            return;
        }

        let pb = ProgressBar::new(total_urls as u64);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} URLs inspected ({eta})")
        {
            pb.set_style(style.progress_chars("#>-"));
        }
        pb.set_message("Inspecting URLs");
        pb.enable_steady_tick(Duration::from_millis(120));
        self.bar = Some(pb);
    }

    /// `total` counts distinct URLs, which can be fewer than were passed in.
    pub fn update(&self, done: usize, total: usize) {
        if let Some(ref pb) = self.bar {
            pb.set_length(total as u64);
            pb.set_position(done as u64);
        }
    }

    pub fn finish_inspections(&self, success_count: usize, total_count: usize) {
        if let Some(ref pb) = self.bar {
            let message = if success_count == total_count {
                "✓ All URLs inspected".to_string()
            } else {
                format!("✓ Inspection complete ({success_count}/{total_count} successful)")
            };
            pb.finish_with_message(message);
        }
    }

    /// Create a simple spinner for indeterminate progress
    pub fn spinner(&self, message: &str) -> Option<ProgressBar> {
        if !self.enabled {
            return None;
        }

        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
            pb.set_style(style);
        }
        pb.set_message(message.to_string());
        pb.enable_steady_tick(Duration::from_millis(120));
        Some(pb)
    }
}
