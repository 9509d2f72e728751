//! Runs an Inkling server configured from `INKLING_*` variables.
//!
//! ```text
//! RUST_LOG=debug INKLING_BIND=0.0.0.0:8080 cargo run -p party-server
//! ```
//!
//! A lobby is opened at startup and its code logged, so a WebSocket client
//! can subscribe to `rooms/{code}` straight away.

use inkling::prelude::*;

#[tokio::main]
async fn main() -> Result<(), InklingError> {
    inkling::telemetry::init();

    let config = ServerConfig::from_env()?;
    let server = InklingServer::builder().config(config).build().await?;
    let addr = server.local_addr()?;

    let lobby = server.api().create_room().await?;
    tracing::info!(%addr, room = %lobby.code, "party server ready, subscribe to rooms/{}", lobby.code);

    server
        .run(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for ctrl-c");
            }
        })
        .await
}
