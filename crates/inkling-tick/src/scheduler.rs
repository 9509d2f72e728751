//! Fixed-period tick scheduler.

use std::time::{Duration, Instant};

use rand::Rng;
use tokio::time::{self, Instant as TokioInstant};
use tracing::{debug, trace, warn};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// What to do when a tick fires late.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TickPolicy {
    /// Forget the missed ticks and schedule the next one a full period
    /// from now.
    #[default]
    Skip,
    /// Keep the original cadence; the next tick is due one period after
    /// the missed deadline.
    Drop,
}

#[derive(Debug, Clone)]
pub struct TickConfig {
    /// Time between ticks. `Duration::ZERO` disables the scheduler.
    pub period: Duration,
    pub policy: TickPolicy,
    /// Fraction of the period (0.0–1.0) a pass may use before a warning.
    pub budget_warn_threshold: f64,
    /// Random delay (0–max) added to the first tick only, so several
    /// schedulers started together don't fire in lockstep.
    pub initial_jitter: Duration,
}

impl Default for TickConfig {
    fn default() -> Self {
        Self {
            period: Duration::ZERO,
            policy: TickPolicy::default(),
            budget_warn_threshold: 0.80,
            initial_jitter: Duration::from_millis(250),
        }
    }
}

impl TickConfig {
    pub fn with_period(period: Duration) -> Self {
        Self {
            period,
            ..Default::default()
        }
    }

    /// Clamps out-of-range values. Called by [`TickScheduler::new`].
    pub fn validated(mut self) -> Self {
        self.budget_warn_threshold = self.budget_warn_threshold.clamp(0.0, 1.0);
        if !self.period.is_zero() && self.initial_jitter > self.period {
            self.initial_jitter = self.period;
        }
        self
    }

    pub fn is_disabled(&self) -> bool {
        self.period.is_zero()
    }
}

// ---------------------------------------------------------------------------
// Tick info and metrics
// ---------------------------------------------------------------------------

/// Returned by [`TickScheduler::wait_for_tick`].
#[derive(Debug, Clone)]
pub struct TickInfo {
    /// Starts at 1.
    pub tick: u64,
    /// `true` if the tick woke up more than a tenth of a period late.
    pub overrun: bool,
    /// Whole periods missed (always 0 under [`TickPolicy::Drop`]).
    pub ticks_skipped: u64,
}

#[derive(Debug, Clone, Default)]
pub struct TickMetrics {
    pub total_ticks: u64,
    pub total_overruns: u64,
    pub total_skipped: u64,
    /// Duration of the most recent pass, as reported by
    /// [`TickScheduler::record_tick_end`].
    pub last_pass_time: Duration,
    pub max_pass_time: Duration,
}

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

pub struct TickScheduler {
    config: TickConfig,
    tick_count: u64,
    next_tick: Option<TokioInstant>,
    /// Set by `wait_for_tick`, consumed by `record_tick_end`.
    pass_start: Option<Instant>,
    paused: bool,
    metrics: TickMetrics,
}

impl TickScheduler {
    pub fn new(config: TickConfig) -> Self {
        let config = config.validated();

        let next_tick = (!config.is_disabled()).then(|| {
            let jitter = if config.initial_jitter.is_zero() {
                Duration::ZERO
            } else {
                let max_ms = config.initial_jitter.as_millis().max(1) as u64;
                Duration::from_millis(rand::rng().random_range(0..max_ms))
            };
            TokioInstant::now() + config.period + jitter
        });

        if config.is_disabled() {
            debug!("tick scheduler disabled (zero period)");
        } else {
            debug!(period_ms = config.period.as_millis() as u64, policy = ?config.policy, "tick scheduler created");
        }

        Self {
            config,
            tick_count: 0,
            next_tick,
            pass_start: None,
            paused: false,
            metrics: TickMetrics::default(),
        }
    }

    pub fn with_period(period: Duration) -> Self {
        Self::new(TickConfig::with_period(period))
    }

    /// Waits until the next tick is due.
    ///
    /// Pends forever while disabled or paused, so it is safe inside
    /// `tokio::select!`.
    pub async fn wait_for_tick(&mut self) -> TickInfo {
        let period = self.config.period;
        let next = match self.next_tick {
            Some(next) if !self.paused => next,
            _ => std::future::pending().await,
        };

        time::sleep_until(next).await;

        let now = TokioInstant::now();
        self.tick_count += 1;
        self.pass_start = Some(Instant::now());

        let late_by = now.saturating_duration_since(next);
        let overrun = late_by > period / 10;
        let mut ticks_skipped = 0;

        self.next_tick = Some(match self.config.policy {
            TickPolicy::Skip => {
                if overrun {
                    ticks_skipped = (late_by.as_nanos() / period.as_nanos()) as u64;
                    if ticks_skipped > 0 {
                        warn!(
                            tick = self.tick_count,
                            skipped = ticks_skipped,
                            late_ms = late_by.as_millis() as u64,
                            "tick overrun, skipping ahead"
                        );
                    }
                }
                now + period
            }
            TickPolicy::Drop => {
                if overrun {
                    warn!(tick = self.tick_count, late_ms = late_by.as_millis() as u64, "tick overrun, keeping cadence");
                }
                next + period
            }
        });

        if overrun {
            self.metrics.total_overruns += 1;
        }
        self.metrics.total_skipped += ticks_skipped;
        self.metrics.total_ticks += 1;
        trace!(tick = self.tick_count, overrun, "tick fired");

        TickInfo {
            tick: self.tick_count,
            overrun,
            ticks_skipped,
        }
    }

    /// Marks the end of the work done for the current tick. Warns when the
    /// pass used more than the configured share of the period.
    pub fn record_tick_end(&mut self) {
        let Some(start) = self.pass_start.take() else {
            return;
        };
        let elapsed = start.elapsed();
        self.metrics.last_pass_time = elapsed;
        self.metrics.max_pass_time = self.metrics.max_pass_time.max(elapsed);

        if self.config.is_disabled() {
            return;
        }
        let utilization = elapsed.as_secs_f64() / self.config.period.as_secs_f64();
        if utilization >= 1.0 {
            warn!(
                tick = self.tick_count,
                elapsed_ms = elapsed.as_millis() as u64,
                period_ms = self.config.period.as_millis() as u64,
                "pass took longer than the tick period"
            );
        } else if utilization >= self.config.budget_warn_threshold {
            warn!(
                tick = self.tick_count,
                elapsed_ms = elapsed.as_millis() as u64,
                utilization_pct = format!("{:.1}", utilization * 100.0),
                "pass approaching tick period"
            );
        }
    }

    /// Idempotent.
    pub fn pause(&mut self) {
        if !self.paused {
            self.paused = true;
            debug!(tick = self.tick_count, "tick scheduler paused");
        }
    }

    /// Restarts the cadence from now, so time spent paused does not turn
    /// into a burst of ticks.
    pub fn resume(&mut self) {
        if self.paused {
            self.paused = false;
            if !self.config.is_disabled() {
                self.next_tick = Some(TokioInstant::now() + self.config.period);
            }
            debug!(tick = self.tick_count, "tick scheduler resumed");
        }
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn is_disabled(&self) -> bool {
        self.config.is_disabled()
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn metrics(&self) -> &TickMetrics {
        &self.metrics
    }

    pub fn period(&self) -> Duration {
        self.config.period
    }
}
