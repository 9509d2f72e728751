//! Time for Inkling: a periodic scheduler and wall clocks.
//!
//! - [`TickScheduler`] fires at a fixed period with jitter on the first
//!   tick, skip-ahead on overrun and budget warnings. The expiry sweeper
//!   runs one pass per tick.
//! - [`Clock`] is where round timestamps come from. [`SystemClock`] in
//!   production, [`ManualClock`] when a test needs a round to age on
//!   command.
//!
//! # Integration
//!
//! The scheduler sits in a `tokio::select!` loop next to a shutdown
//! signal:
//!
//! ```ignore
//! loop {
//!     tokio::select! {
//!         _ = shutdown.changed() => break,
//!         _ = scheduler.wait_for_tick() => {
//!             sweeper.sweep_once().await;
//!             scheduler.record_tick_end();
//!         }
//!     }
//! }
//! ```

mod clock;
mod scheduler;

pub use clock::{Clock, ManualClock, SystemClock};
pub use scheduler::{TickConfig, TickInfo, TickMetrics, TickPolicy, TickScheduler};
