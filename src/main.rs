mod api;
mod config;
mod error;
mod health;
mod models;
mod services;

use crate::config::Config;
use crate::services::{
    AuthorizationOptions, BrowserSource, CredentialManager, CredentialStore, MarkupSource,
    Orchestrator, PlaylistLedger, SourceWatcher, SpotifyClient, TrackResolver,
};
use clap::{Parser, Subcommand};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(version, about = "Adds songs playing on radio stations to a Spotify playlist")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Check configuration and saved credentials, exit 0 when healthy
    Healthcheck,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if let Some(Command::Healthcheck) = cli.command {
        dotenvy::dotenv().ok();
        let problems = health::problems(|key| std::env::var(key).ok());
        for problem in &problems {
            eprintln!("{}", problem);
        }
        if !problems.is_empty() {
            std::process::exit(1);
        }
        println!("Health check passed!");
        return Ok(());
    }

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,radio_playlist_sync=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;
    tracing::info!("Configuration loaded");

    // Initialize services
    let spotify = Arc::new(SpotifyClient::new(&config));

    let credentials = Arc::new(CredentialManager::new(
        spotify.clone(),
        CredentialStore::new(config.token_path.clone()),
        AuthorizationOptions::from(&config),
    ));
    credentials.initialize().await?;
    tracing::debug!("Credential state: {:?}", credentials.state().await);

    let ledger = Arc::new(PlaylistLedger::new(
        spotify.clone(),
        credentials.clone(),
        config.playlist_id.clone(),
    ));
    ledger.load().await;

    let resolver = Arc::new(TrackResolver::new(spotify.clone(), credentials.clone()));

    let mut watchers = Vec::with_capacity(config.stations.len());
    for profile in &config.stations {
        watchers.push(SourceWatcher::new(
            profile.clone(),
            Box::new(BrowserSource::new(profile.clone(), &config)),
            Box::new(MarkupSource::new(profile.clone(), config.fetch_timeout)?),
            config.max_primary_failures,
            config.fetch_timeout,
        ));
        tracing::info!("Watching {} ({})", profile.name, profile.url);
    }

    Orchestrator::new(watchers, resolver, ledger, config.check_interval)
        .run()
        .await;

    Ok(())
}
