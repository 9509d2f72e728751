//! The collaborators a room actor works against.

use std::sync::Arc;

use inkling_protocol::Publisher;
use inkling_session::{Authenticator, StoreAuthenticator};
use inkling_store::{BlobStore, EntityStore};
use inkling_tick::Clock;

/// Shared by every room actor a manager spawns. Cloning is cheap.
#[derive(Clone)]
pub struct RoomDeps {
    pub store: Arc<dyn EntityStore>,
    pub blobs: Arc<dyn BlobStore>,
    pub publisher: Arc<dyn Publisher>,
    pub clock: Arc<dyn Clock>,
    pub auth: Arc<dyn Authenticator>,
}

impl RoomDeps {
    /// Tokens are resolved against `store`.
    pub fn new(
        store: Arc<dyn EntityStore>,
        blobs: Arc<dyn BlobStore>,
        publisher: Arc<dyn Publisher>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let auth = Arc::new(StoreAuthenticator::new(store.clone()));
        Self {
            store,
            blobs,
            publisher,
            clock,
            auth,
        }
    }

    pub fn with_authenticator(mut self, auth: Arc<dyn Authenticator>) -> Self {
        self.auth = auth;
        self
    }
}
