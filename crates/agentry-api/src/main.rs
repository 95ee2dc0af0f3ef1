//! Agentry runtime entry point.
//!
//! Binary name: `agentry`
//!
//! Starts the REST API plus the background entrypoints (channel pollers and
//! the autonomous scheduler) and shuts everything down together on Ctrl+C
//! or SIGTERM.

mod http;
mod state;

use std::time::Duration;

use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::info;

use agentry_core::autonomous::AutonomousScheduler;
use agentry_core::channel::ChannelPoller;
use agentry_infra::channel::{TelegramAdapter, TwitterAdapter};
use agentry_infra::config;

use state::AppState;

#[derive(Parser)]
#[command(name = "agentry", version, about = "Multi-agent LLM runtime")]
struct Cli {
    /// Increase log verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the API server and background entrypoints.
    Serve {
        /// Bind address, overriding config and AGENTRY_BIND.
        #[arg(long)]
        bind: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "warn,agentry=info",
        1 => "info,agentry=debug",
        _ => "trace",
    };
    agentry_observe::tracing_setup::init_tracing(filter)
        .map_err(|e| anyhow::anyhow!("tracing init failed: {e}"))?;

    match cli.command {
        Commands::Serve { bind } => serve(bind).await,
    }
}

async fn serve(bind: Option<String>) -> anyhow::Result<()> {
    let mut settings = config::load_settings(&config::data_dir()).await;
    if let Some(bind) = bind {
        settings.bind_addr = bind;
    }

    let state = AppState::init(settings.clone()).await?;
    let cancel = CancellationToken::new();
    let mut background = Vec::new();

    {
        let poller = ChannelPoller::new(
            TwitterAdapter::new()?,
            state.agents.clone(),
            state.chat_service.clone(),
            state.store.clone(),
            Duration::from_secs(settings.poll.twitter_secs),
        );
        let cancel = cancel.clone();
        background.push(tokio::spawn(async move { poller.run(cancel).await }));
    }
    {
        let poller = ChannelPoller::new(
            TelegramAdapter::new()?,
            state.agents.clone(),
            state.chat_service.clone(),
            state.store.clone(),
            Duration::from_secs(settings.poll.telegram_secs),
        );
        let cancel = cancel.clone();
        background.push(tokio::spawn(async move { poller.run(cancel).await }));
    }
    {
        let scheduler = AutonomousScheduler::new(
            state.agents.clone(),
            state.chat_service.clone(),
            Duration::from_secs(settings.poll.autonomous_rescan_secs),
        );
        let cancel = cancel.clone();
        background.push(tokio::spawn(async move { scheduler.run(cancel).await }));
    }

    let listener = tokio::net::TcpListener::bind(&settings.bind_addr).await?;
    info!(addr = %settings.bind_addr, "agentry API listening");

    let router = http::router::build_router(state);
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("shutting down background entrypoints");
    cancel.cancel();
    for handle in background {
        let _ = handle.await;
    }

    Ok(())
}

/// Wait for Ctrl+C or SIGTERM for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        if tokio::signal::ctrl_c().await.is_err() {
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
