// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! minikvd: network front-end for the minikv store
//!
//! Loads configuration from the environment, replays the journal into the
//! store, serves the wire protocol over TCP, and runs the periodic
//! snapshot task.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod protocol;
mod server;

use minikv_core::{Aof, Config, Store};
use server::AppState;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env();
    setup_logging(&config);

    info!(port = config.port, "starting minikvd");

    // An unopenable journal is not fatal: the store runs without
    // durability and the operator decides policy.
    let aof = match Aof::open_with_threshold(&config.aof_path, config.snapshot_threshold) {
        Ok(aof) => Some(Arc::new(aof)),
        Err(e) => {
            error!(
                error = %e,
                path = %config.aof_path.display(),
                "failed to open journal, running without durability"
            );
            None
        }
    };

    let mut store = Store::new();
    if let Some(aof) = &aof {
        store.enable_aof(Arc::clone(aof));
    }
    let store = Arc::new(store);

    if let Err(e) = store.load_from_aof(&config.aof_path) {
        error!(error = %e, "journal replay failed");
    }

    if let Some(aof) = &aof {
        spawn_snapshot_task(
            Arc::clone(aof),
            Arc::clone(&store),
            config.snapshot_interval,
        );
    }

    let listener = TcpListener::bind(("0.0.0.0", config.port)).await?;
    info!(addr = %listener.local_addr()?, "listening");

    let state = AppState {
        store: Arc::clone(&store),
        aof: aof.clone(),
    };

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    loop {
        tokio::select! {
            result = listener.accept() => {
                match result {
                    Ok((stream, peer)) => {
                        let state = state.clone();
                        tokio::spawn(async move {
                            if let Err(e) = server::handle_connection(&state, stream).await {
                                error!(error = %e, peer = %peer, "connection error");
                            }
                        });
                    }
                    Err(e) => error!(error = %e, "accept failed"),
                }
            }

            _ = sigterm.recv() => {
                info!("received SIGTERM, shutting down");
                break;
            }

            _ = sigint.recv() => {
                info!("received SIGINT, shutting down");
                break;
            }
        }
    }

    if let Some(aof) = &aof {
        if let Err(e) = aof.close() {
            warn!(error = %e, "failed to close journal cleanly");
        }
    }

    info!("minikvd stopped");
    Ok(())
}

/// Run a snapshot once at startup and then on every interval tick. The
/// snapshot does blocking file I/O, so it runs off the async runtime.
fn spawn_snapshot_task(aof: Arc<Aof>, store: Arc<Store>, interval: std::time::Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;

            let aof = Arc::clone(&aof);
            let store = Arc::clone(&store);
            let result = tokio::task::spawn_blocking(move || aof.snapshot(store.as_ref())).await;

            match result {
                Ok(Ok(())) => info!("snapshot completed"),
                Ok(Err(e)) => error!(error = %e, "snapshot failed"),
                Err(e) => error!(error = %e, "snapshot task panicked"),
            }
        }
    });
}

fn setup_logging(config: &Config) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .init();
}
