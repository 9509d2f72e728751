//! Periodic expiry of rounds that have run too long.

use std::sync::Arc;

use inkling_tick::{TickConfig, TickScheduler};
use tokio::sync::{watch, Mutex};
use tracing::{debug, info, warn};

use crate::{RoomError, RoomManager, SweeperConfig};

/// Outcome of one sweep pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Stale rounds found.
    pub examined: usize,
    /// Live rounds sent back to the lobby.
    pub expired: usize,
    /// Rounds that could not be ended this pass.
    pub failed: usize,
}

/// Ends rounds older than [`SweeperConfig::max_game_age`].
///
/// The sweeper never writes rows itself: each stale round is handed to
/// its room's actor, which re-checks it in order with the room's other
/// commands.
pub struct Sweeper {
    manager: Arc<Mutex<RoomManager>>,
    config: SweeperConfig,
}

impl Sweeper {
    pub fn new(manager: Arc<Mutex<RoomManager>>, config: SweeperConfig) -> Self {
        Self { manager, config }
    }

    /// One pass. A failure on one round is logged and the pass moves on.
    ///
    /// # Errors
    /// Only if the stale-round query itself fails.
    pub async fn sweep_once(&self) -> Result<SweepReport, RoomError> {
        let (stale, cutoff) = {
            let manager = self.manager.lock().await;
            let deps = manager.deps();
            let max_age = self.config.max_game_age.as_millis() as u64;
            let cutoff = deps.clock.now_ms().saturating_sub(max_age);
            (deps.store.stale_games(cutoff)?, cutoff)
        };

        let mut report = SweepReport {
            examined: stale.len(),
            ..SweepReport::default()
        };
        for game in stale {
            let handle = self.manager.lock().await.room_by_id(game.room_id);
            let outcome = match handle {
                Ok(Some(handle)) => handle.expire(game.id, cutoff).await,
                Ok(None) => {
                    debug!(game_id = %game.id, room_id = %game.room_id, "stale round has no room");
                    continue;
                }
                Err(e) => Err(e),
            };
            match outcome {
                Ok(true) => report.expired += 1,
                Ok(false) => {}
                Err(e) => {
                    warn!(game_id = %game.id, error = %e, "failed to expire round");
                    report.failed += 1;
                }
            }
        }

        if report.examined > 0 {
            info!(
                examined = report.examined,
                expired = report.expired,
                failed = report.failed,
                "sweep finished"
            );
        }
        Ok(report)
    }

    /// Sweeps once per period until `shutdown` flips to `true` or its
    /// sender is dropped.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut scheduler = TickScheduler::new(TickConfig::with_period(self.config.period));
        info!(period = ?self.config.period, "sweeper started");
        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                _ = scheduler.wait_for_tick() => {
                    if let Err(e) = self.sweep_once().await {
                        warn!(error = %e, "sweep pass failed");
                    }
                    scheduler.record_tick_end();
                }
            }
        }
        info!("sweeper stopped");
    }
}
