//! Terminal progress for annealing runs (feature `progress`).
//!
//! One bar per constellation, advanced once per iteration. The message shows the current
//! temperature, the best cost so far, the elapsed run time and a smoothed per-iteration time:
//!
//! `ema ← α·dt + (1–α)·ema`, with `α = 0.2`; the first tick initializes the average.
use std::time::{Duration, Instant};

use indicatif::{ProgressBar, ProgressStyle};

use super::annealing::StopReason;

const EMA_ALPHA: f64 = 0.2;

/// Progress bar plus iteration timing for one annealing run.
pub struct AnnealingProgress {
    bar: ProgressBar,
    started: Instant,
    last: Instant,
    ema_ns: f64,
    ticks: u64,
}

impl AnnealingProgress {
    pub fn new(label: &str, max_iterations: usize) -> Self {
        let bar = ProgressBar::new((max_iterations as u64).max(1));
        if let Ok(style) = ProgressStyle::with_template(
            "{prefix:>10} {bar:40.cyan/blue} {pos}/{len} | {per_sec} | {msg}",
        ) {
            bar.set_style(style);
        }
        bar.set_prefix(label.to_string());
        bar.enable_steady_tick(Duration::from_millis(200));
        let now = Instant::now();
        AnnealingProgress {
            bar,
            started: now,
            last: now,
            ema_ns: 0.0,
            ticks: 0,
        }
    }

    /// Record the end of one iteration.
    pub fn tick(&mut self, temperature: f64, best_cost: f64) {
        let now = Instant::now();
        let dt_ns = now.duration_since(self.last).as_nanos() as f64;
        self.last = now;
        self.ticks += 1;
        self.ema_ns = if self.ticks == 1 {
            dt_ns
        } else {
            EMA_ALPHA * dt_ns + (1.0 - EMA_ALPHA) * self.ema_ns
        };

        self.bar.inc(1);
        if self.ticks % 50 == 1 {
            self.bar.set_message(format!(
                "T={temperature:.3} best={best_cost:.2} run={} iter={:.1}µs",
                fmt_run_time(now.duration_since(self.started)),
                self.avg().as_nanos() as f64 / 1_000.0
            ));
        }
    }

    pub fn avg(&self) -> Duration {
        Duration::from_nanos(self.ema_ns as u64)
    }

    pub fn finish(&self, reason: StopReason) {
        self.bar.disable_steady_tick();
        self.bar.finish_with_message(format!(
            "stopped: {reason:?} after {}",
            fmt_run_time(self.started.elapsed())
        ));
    }
}

/// Wall-clock run time: `"4.2s"` under a minute, `"2m05s"` beyond.
pub fn fmt_run_time(d: Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else {
        format!("{}m{:02}s", secs / 60, secs % 60)
    }
}
