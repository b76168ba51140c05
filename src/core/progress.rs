use std::time::{Duration, Instant};
use indicatif::{ProgressBar, ProgressStyle};
use tokio::task::JoinHandle;
use tokio::time::interval;

/// Progress bar for one measurement window, ticking on elapsed time.
pub struct PhaseProgress {
    bar: ProgressBar,
    ticker: Option<JoinHandle<()>>,
}

impl PhaseProgress {
    pub fn start(label: &str, window: Duration, enabled: bool) -> Self {
        if !enabled {
            return PhaseProgress { bar: ProgressBar::hidden(), ticker: None };
        }
        let bar = ProgressBar::new(100);
        if let Ok(style) = ProgressStyle::with_template("{prefix:>28} [{bar:40}] {pos:>3}%") {
            bar.set_style(style.progress_chars("=> "));
        }
        bar.set_prefix(label.to_string());
        let ticking = bar.clone();
        let started = Instant::now();
        let window_secs = window.as_secs_f64().max(0.001);
        let ticker = tokio::spawn(async move {
            let mut every = interval(Duration::from_millis(300));
            loop {
                every.tick().await;
                let progress = started.elapsed().as_secs_f64() / window_secs * 100.0;
                ticking.set_position(progress.min(100.0) as u64);
                if progress >= 100.0 {
                    break;
                }
            }
        });
        PhaseProgress { bar, ticker: Some(ticker) }
    }

    /// Swap the bar for a spinner while in-flight work drains.
    pub fn draining(&mut self, message: &'static str) {
        if let Some(ticker) = self.ticker.take() {
            ticker.abort();
        }
        if self.bar.is_hidden() {
            return;
        }
        self.bar.finish_and_clear();
        let spinner = ProgressBar::new_spinner();
        spinner.enable_steady_tick(Duration::from_millis(100));
        spinner.set_message(message);
        self.bar = spinner;
    }

    pub fn finish(mut self) {
        if let Some(ticker) = self.ticker.take() {
            ticker.abort();
        }
        self.bar.finish_and_clear();
    }
}
