//! Interactive console for exercising a Caro game server.
//!
//! Connects once (no retry), joins the configured room, keeps the
//! session alive with periodic pings, and turns operator commands into
//! game events until end-of-input or Ctrl+C.
//!
//! ## Running
//!
//! ```sh
//! CARO_AUTH_TOKEN=eyJ… CARO_ROOM_ID=692bee… cargo run
//!
//! # Optional overrides:
//! CARO_SERVER_URL=ws://my-server:5000 \
//! CARO_ROOM_PASSWORD=123 \
//! CARO_HEARTBEAT_SECS=5 cargo run
//! ```

use std::time::Duration;

use tokio::io::BufReader;

use caro_client::{
    command, CaroClient, CaroConfig, CaroError, CaroEvent, Keepalive, WebSocketTransport,
};

/// Default server URL when `CARO_SERVER_URL` is not set.
const DEFAULT_URL: &str = "ws://localhost:5000";

/// Build the configuration from `CARO_*` environment variables.
fn config_from_env() -> Result<CaroConfig, CaroError> {
    let server_url = std::env::var("CARO_SERVER_URL").unwrap_or_else(|_| DEFAULT_URL.to_string());
    let auth_token = std::env::var("CARO_AUTH_TOKEN")
        .map_err(|_| CaroError::Config("CARO_AUTH_TOKEN must be set".into()))?;
    let room_id = std::env::var("CARO_ROOM_ID")
        .map_err(|_| CaroError::Config("CARO_ROOM_ID must be set".into()))?;
    let room_password = std::env::var("CARO_ROOM_PASSWORD").unwrap_or_default();

    let mut config = CaroConfig::new(server_url, auth_token, room_id)
        .with_room_password(room_password);

    if let Ok(secs) = std::env::var("CARO_HEARTBEAT_SECS") {
        let secs: u64 = secs
            .parse()
            .map_err(|_| CaroError::Config(format!("invalid CARO_HEARTBEAT_SECS: {secs:?}")))?;
        config = config.with_heartbeat_interval(Duration::from_secs(secs));
    }

    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Set `RUST_LOG=debug` for verbose output.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = config_from_env()?;

    // Single connection attempt; a failure here is fatal.
    tracing::info!("connecting to {}", config.server_url);
    let transport =
        WebSocketTransport::connect(&config.server_url, &config.auth_token).await?;

    let heartbeat_interval = config.heartbeat_interval;
    let (mut client, mut events) = CaroClient::start(transport, config);

    let keepalive = Keepalive::spawn(client.sender(), heartbeat_interval);

    // Inbound events print from their own task while the prompt loop
    // owns the main one.
    let printer = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            match event {
                CaroEvent::Connected => {
                    tracing::info!("connected, join request sent");
                }
                CaroEvent::Disconnected { reason } => {
                    tracing::warn!(
                        "disconnected: {}",
                        reason.as_deref().unwrap_or("connection closed")
                    );
                }
                CaroEvent::Pong { payload } => {
                    println!("pong received: {payload}");
                }
            }
        }
    });

    let sender = client.sender();
    tokio::select! {
        result = command::run(BufReader::new(tokio::io::stdin()), &sender) => {
            result?;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Ctrl+C received, shutting down");
        }
    }

    keepalive.stop().await;
    client.shutdown().await;
    let _ = printer.await;

    tracing::info!("goodbye");
    Ok(())
}
