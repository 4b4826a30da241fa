//! # Pontic Entry Point
//!
//! The gateway executable. This file drives the process lifecycle:
//!
//! 1. **Initialization**: Parses flags and environment using [`cli::Cli`] and
//!    installs the tracing subscriber.
//! 2. **Discovery**: Builds the resolver: a static registry loaded from the
//!    mapping file when one is given, otherwise an empty registry awaiting an
//!    external discovery backend.
//! 3. **Serving**: Binds the HTTP listener and hands requests to the router.
mod cli;
mod server;

use clap::Parser;
use cli::Cli;
use pontic_core::registry::{Resolve, static_source::StaticResolver};
use server::AppState;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&args.log_level)?)
        .init();

    let resolver: Arc<dyn Resolve + Send + Sync> = match &args.mapping_file {
        Some(path) => Arc::new(StaticResolver::from_mapping_file(path)),
        None => {
            warn!("no mapping file given, starting with an empty registry");
            Arc::new(StaticResolver::empty())
        }
    };

    let state = AppState {
        resolver,
        access_token: args.access_token,
    };

    let addr = format!("0.0.0.0:{}", args.port);
    let listener = TcpListener::bind(&addr).await?;
    info!(%addr, log_level = %args.log_level, "starting pontic");
    axum::serve(listener, server::router(state)).await?;
    Ok(())
}
