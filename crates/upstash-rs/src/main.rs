//! Talk to an Upstash Redis database over its REST API.
//!
//! Reads the URL and token from `UPSTASH_REDIS_REST_URL` /
//! `UPSTASH_REDIS_REST_TOKEN` unless given on the command line.
//!
//! # Examples
//!
//! ```sh
//! # Any command
//! upstash send SET greeting hello
//! upstash send GET greeting
//!
//! # Pub/sub
//! upstash subscribe news &
//! upstash publish news "hello subscribers"
//!
//! # Watch every command the server processes
//! upstash --verbose monitor
//! ```

use std::process;

use clap::{Parser, Subcommand};
use tokio::sync::mpsc;
use tracing::Level;
use upstash_rs::prelude::*;

/// Talk to an Upstash Redis database over its REST API.
#[derive(Parser)]
#[command(name = "upstash")]
struct Cli {
    // ── Connection ─────────────────────────────────────────────
    /// REST URL (default: $UPSTASH_REDIS_REST_URL)
    #[arg(long)]
    url: Option<String>,

    /// Bearer token (default: $UPSTASH_REDIS_REST_TOKEN)
    #[arg(long)]
    token: Option<String>,

    /// Edge URL for reads (default: $UPSTASH_REDIS_EDGE_URL)
    #[arg(long)]
    edge_url: Option<String>,

    // ── Behaviour ──────────────────────────────────────────────
    /// Ask for base64-encoded results and decode them locally
    #[arg(long)]
    base64: bool,

    /// Attempts per request before giving up on network errors
    #[arg(long, default_value_t = upstash_rs::rest::retry::DEFAULT_MAX_ATTEMPTS)]
    retries: u32,

    /// Don't send the SDK/runtime telemetry headers
    #[arg(long)]
    no_telemetry: bool,

    /// Log requests and responses to stderr
    #[arg(long, short)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Send a raw command, e.g. `send SET key value`
    Send {
        /// Command name
        name: String,
        /// Command arguments
        args: Vec<String>,
    },
    /// Publish a message to a channel
    Publish { channel: String, message: String },
    /// Print messages published to a channel until interrupted
    Subscribe { channel: String },
    /// Print every command the server processes until interrupted
    Monitor,
}

fn build_options(cli: &Cli) -> Options {
    Options {
        url: cli.url.clone().unwrap_or_default(),
        token: cli.token.clone().unwrap_or_default(),
        edge_url: cli.edge_url.clone(),
        enable_base64: cli.base64,
        retry: RetryConfig::with_attempts(cli.retries),
        disable_telemetry: cli.no_telemetry,
        ..Default::default()
    }
    .fill_from_env()
}

/// Print streamed messages until the stream ends or ctrl-c is pressed.
async fn print_stream(redis: &Upstash, mut rx: mpsc::Receiver<String>) {
    let cancel = redis.cancellation().clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel.cancel();
        }
    });
    while let Some(message) = rx.recv().await {
        println!("{message}");
    }
}

async fn run(cli: Cli) -> Result<()> {
    let redis = Upstash::new(build_options(&cli))?;

    match &cli.command {
        Command::Send { name, args } => {
            let value = redis.send(name, args.iter().map(String::as_str)).await?;
            println!("{value}");
        }
        Command::Publish { channel, message } => {
            let receivers = redis.publish(channel, message).await?;
            println!("{receivers}");
        }
        Command::Subscribe { channel } => {
            let rx = redis.subscribe(channel).await?;
            print_stream(&redis, rx).await;
        }
        Command::Monitor => {
            let rx = redis.monitor().await?;
            print_stream(&redis, rx).await;
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::WARN };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}
