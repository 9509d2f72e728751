//! `InklingServer` builder and run loop.
//!
//! Ties the layers together: store and blobs, the topic hub every room
//! publishes to, the room manager, the expiry sweeper and the WebSocket
//! fan-out clients subscribe through.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use inkling_broadcast::{FanoutServer, TopicHub};
use inkling_room::{RoomDeps, RoomManager, Sweeper};
use inkling_store::{default_prompts, BlobStore, EntityStore, FsBlobStore, MemoryStore};
use inkling_tick::{Clock, SystemClock};
use tokio::sync::{watch, Mutex};

use crate::{GameApi, InklingError, ServerConfig};

/// Builder for configuring and starting an Inkling server.
///
/// # Example
///
/// ```rust,no_run
/// use inkling::{InklingServer, ServerConfig};
///
/// # async fn demo() -> Result<(), inkling::InklingError> {
/// let server = InklingServer::builder()
///     .config(ServerConfig::from_env()?)
///     .bind("0.0.0.0:8080")
///     .build()
///     .await?;
/// server.run(async { tokio::signal::ctrl_c().await.ok(); }).await
/// # }
/// ```
pub struct InklingServerBuilder {
    config: ServerConfig,
    store: Option<Arc<dyn EntityStore>>,
    blobs: Option<Arc<dyn BlobStore>>,
    clock: Option<Arc<dyn Clock>>,
    seed: Option<u64>,
}

impl InklingServerBuilder {
    pub fn new() -> Self {
        Self {
            config: ServerConfig::default(),
            store: None,
            blobs: None,
            clock: None,
            seed: None,
        }
    }

    /// Replaces the whole configuration. Call before [`bind`](Self::bind).
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the address the fan-out listens on.
    pub fn bind(mut self, addr: &str) -> Self {
        self.config.bind = addr.to_string();
        self
    }

    /// Defaults to a [`MemoryStore`] seeded with the default prompts.
    pub fn store(mut self, store: Arc<dyn EntityStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Defaults to an [`FsBlobStore`] under the configured uploads dir.
    pub fn blobs(mut self, blobs: Arc<dyn BlobStore>) -> Self {
        self.blobs = Some(blobs);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Makes room codes and imposter picks reproducible.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Binds the fan-out listener and wires everything up.
    pub async fn build(self) -> Result<InklingServer, InklingError> {
        let config = self.config;
        let store = self
            .store
            .unwrap_or_else(|| -> Arc<dyn EntityStore> {
                Arc::new(MemoryStore::with_prompts(default_prompts()))
            });
        let blobs = self.blobs.unwrap_or_else(|| -> Arc<dyn BlobStore> {
            Arc::new(FsBlobStore::new(
                config.uploads_dir.clone(),
                config.asset_prefix.clone(),
            ))
        });
        let clock = self
            .clock
            .unwrap_or_else(|| -> Arc<dyn Clock> { Arc::new(SystemClock) });

        let hub = Arc::new(TopicHub::new());
        let deps = RoomDeps::new(store, blobs, hub.clone(), clock);
        let manager = match self.seed {
            Some(seed) => RoomManager::with_seed(deps, config.room.clone(), seed),
            None => RoomManager::new(deps, config.room.clone()),
        };
        let rooms = Arc::new(Mutex::new(manager));

        let fanout = FanoutServer::bind(&config.bind, hub.clone()).await?;
        let sweeper = Sweeper::new(rooms.clone(), config.sweeper.clone());

        Ok(InklingServer {
            api: GameApi::new(rooms),
            hub,
            fanout,
            sweeper,
        })
    }
}

impl Default for InklingServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A built server. Call [`run`](Self::run) to start serving.
pub struct InklingServer {
    api: GameApi,
    hub: Arc<TopicHub>,
    fanout: FanoutServer,
    sweeper: Sweeper,
}

impl InklingServer {
    pub fn builder() -> InklingServerBuilder {
        InklingServerBuilder::new()
    }

    /// The action API. Clone it into whatever binds requests to it.
    pub fn api(&self) -> GameApi {
        self.api.clone()
    }

    pub fn hub(&self) -> Arc<TopicHub> {
        self.hub.clone()
    }

    /// Where the fan-out is listening.
    pub fn local_addr(&self) -> Result<SocketAddr, InklingError> {
        Ok(self.fanout.local_addr()?)
    }

    /// Runs the fan-out and the sweeper until `shutdown` completes.
    pub async fn run(self, shutdown: impl Future<Output = ()>) -> Result<(), InklingError> {
        let (stop_tx, stop_rx) = watch::channel(false);
        let fanout = tokio::spawn(self.fanout.run(stop_rx.clone()));
        let sweeper = tokio::spawn(self.sweeper.run(stop_rx));
        tracing::info!("Inkling server running");

        shutdown.await;
        tracing::info!("shutting down");
        let _ = stop_tx.send(true);
        for (name, task) in [("fan-out", fanout), ("sweeper", sweeper)] {
            if let Err(e) = task.await {
                tracing::error!(task = name, error = %e, "task panicked");
            }
        }
        Ok(())
    }
}
