mod backend;
mod config;
mod error;
mod job;
mod logging;
mod mail;
mod service;
mod store;
mod worker;
mod youtube;

use std::sync::Arc;
use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::sync::watch;
use tracing::{error, info};
use crate::config::{AppConfig, LogConfig, YoutubeConfig};
use crate::mail::SmtpMailer;
use crate::service::SubmissionService;
use crate::store::JobStore;
use crate::worker::Worker;
use crate::youtube::YoutubeSource;

#[derive(Parser)]
#[command(name = "comment-scout")]
#[command(about = "Search YouTube comments for phrases and email the matches")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API and the background worker (default)
    Serve,
    /// Run one search in the foreground and print the matches
    Search {
        #[arg(long, default_value = "https://www.youtube.com/watch?v=2ZcedEdh_RI")]
        video_url: String,

        /// Comma-separated phrases; a comment must contain all of them
        #[arg(long, value_delimiter = ',', default_value = "expensive")]
        phrases: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    dotenvy::dotenv().ok();
    let _guard = logging::init(&LogConfig::from_env())?;

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve().await,
        Commands::Search { video_url, phrases } => search(&video_url, &phrases).await,
    }
}

async fn serve() -> anyhow::Result<()> {
    let config = AppConfig::from_env().context("Failed to load configuration")?;

    let store = Arc::new(JobStore::rehydrate(config.store.queue_file.clone()).await);
    let pending = store.pending_count().await;
    info!(queue_file = %store.path().display(), pending, "Job store ready");
    let source = YoutubeSource::new(config.youtube.clone()).context("Failed to build HTTP client")?;
    let mailer = SmtpMailer::new(&config.mail).context("Failed to configure SMTP transport")?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let shutdown_tx = Arc::new(shutdown_tx);

    let worker = Worker::new(
        Arc::clone(&store),
        Arc::new(source),
        Arc::new(mailer),
        config.worker.clone(),
    );
    let worker_handle = tokio::spawn(worker.run(shutdown_rx.clone()));

    let signal_tx = Arc::clone(&shutdown_tx);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Shutdown requested"),
            Err(e) => {
                error!("Failed to listen for Ctrl-C: {}", e);
                return;
            }
        }
        let _ = signal_tx.send(true);
    });

    let served = backend::serve(&config.server, SubmissionService::new(store), shutdown_rx).await;

    // The server may also stop on its own error; the worker follows either way.
    let _ = shutdown_tx.send(true);

    if let Err(e) = worker_handle.await {
        error!("Worker task ended abnormally: {}", e);
    }
    served
}

async fn search(video_url: &str, phrases: &[String]) -> anyhow::Result<()> {
    let config = YoutubeConfig::from_env().context("Failed to load comment source configuration")?;
    let source = YoutubeSource::new(config).context("Failed to build HTTP client")?;

    info!(video_url, ?phrases, "Running search");
    let comments = cs_core::filter_comments(&source, video_url, phrases).await;

    if comments.is_empty() {
        println!("No comments matched all of the phrases.");
        return Ok(());
    }

    println!("Found {} matching comments\n", comments.len());
    for comment in &comments {
        println!("{} ({}, {} likes)", comment.author, comment.time, comment.likes);
        println!("  {}", comment.text);
        println!("  {}", comment.link);
        for ts in &comment.timestamps {
            println!("  [{}] {}", ts.text, ts.link);
        }
        println!();
    }
    Ok(())
}
