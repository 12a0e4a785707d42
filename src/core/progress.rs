// Copyright @yucwang 2026

use indicatif::{ProgressBar, ProgressStyle};

use std::sync::{Mutex, PoisonError};

const PROGRESS_STEPS: u64 = 1000;

/// Host-side progress sink. Updates may arrive from the stream worker as
/// deferred callbacks.
pub trait ProgressReporter: Send + Sync {
    fn update(&self, progress: f64);
    fn done(&self);
}

#[derive(Default)]
pub struct ConsoleProgress {
    bar: Mutex<Option<ProgressBar>>,
}

impl ConsoleProgress {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProgressReporter for ConsoleProgress {
    fn update(&self, progress: f64) {
        let mut bar = self.bar.lock().unwrap_or_else(PoisonError::into_inner);
        let bar = bar.get_or_insert_with(|| {
            let bar = ProgressBar::new(PROGRESS_STEPS);
            bar.set_style(
                ProgressStyle::with_template("[{elapsed_precise}] {bar:40.cyan/blue} {percent:>3}% (eta {eta})")
                    .unwrap_or_else(|_| ProgressStyle::default_bar()),
            );
            bar
        });
        bar.set_position((progress.max(0.0).min(1.0) * PROGRESS_STEPS as f64).round() as u64);
    }

    fn done(&self) {
        let bar = self.bar.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(bar) = bar {
            bar.finish_and_clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bar_lives_until_done() {
        let progress = ConsoleProgress::new();
        progress.update(0.0);
        progress.update(0.5);
        assert_eq!(progress.bar.lock().unwrap().as_ref().map(|bar| bar.position()), Some(500));
        progress.done();
        assert!(progress.bar.lock().unwrap().is_none());
        progress.done();
    }
}
