//! fly-send - Background daemon for scheduled posting
//!
//! Polls the post queue and publishes content when its scheduled time
//! arrives.

use clap::Parser;
use libsocialfly::logging::{self, LogFormat, LoggingConfig};
use libsocialfly::scheduler::SchedulerPoller;
use libsocialfly::service::SocialFlyService;
use libsocialfly::{Result, SocialFlyError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::time::{sleep, Duration};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "fly-send")]
#[command(version)]
#[command(about = "Background daemon for scheduled posting")]
#[command(long_about = "\
fly-send - Background daemon for scheduled posting

DESCRIPTION:
    fly-send is a long-running daemon that monitors the SocialFly queue
    and publishes scheduled posts when they come due.

    Each poll atomically claims due posts, dispatches them to the right
    platform adapter, and records the outcome. A post claimed by one
    fly-send process is invisible to any other, so running several
    daemons against the same database is safe.

USAGE:
    # Run in foreground (logs to stderr)
    fly-send

    # Run with custom poll interval
    fly-send --poll-interval 30

    # Enable verbose logging
    fly-send --verbose

SIGNALS:
    SIGTERM, SIGINT - Graceful shutdown (finishes the current poll)

CONFIGURATION:
    Configuration file: ~/.config/socialfly/config.toml
    Database location: ~/.local/share/socialfly/socialfly.db

    [scheduler]
    poll_interval = 60  # seconds between polls

EXIT CODES:
    0 - Clean shutdown
    1 - Runtime error
    2 - Configuration error
")]
struct Cli {
    /// Poll interval in seconds (overrides config)
    #[arg(long, value_name = "SECONDS")]
    #[arg(help = "How often to check for scheduled posts (default: from config)")]
    poll_interval: Option<u64>,

    /// Enable verbose logging to stderr
    #[arg(short, long)]
    #[arg(help = "Enable verbose logging (useful for debugging)")]
    verbose: bool,

    /// Run one poll and exit (for testing)
    #[arg(long, hide = true)]
    once: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.verbose {
        LoggingConfig::new(LogFormat::Text, "debug".to_string(), true).init();
    } else {
        logging::init_default();
    }

    let service = SocialFlyService::new().await?;
    let poller = service.scheduler();

    info!("fly-send daemon starting");

    let shutdown = Arc::new(AtomicBool::new(false));
    setup_signal_handlers(shutdown.clone())?;

    let poll_interval = cli
        .poll_interval
        .unwrap_or(service.config().scheduler.poll_interval);
    info!("Poll interval: {}s", poll_interval);

    if cli.once {
        let summary = poller.tick().await;
        info!(
            claimed = summary.claimed,
            published = summary.published,
            failed = summary.failed,
            "fly-send: polled once, exiting"
        );
    } else {
        run_daemon_loop(&poller, poll_interval, shutdown).await;
    }

    info!("fly-send daemon stopped");
    Ok(())
}

/// Set up signal handlers for graceful shutdown
fn setup_signal_handlers(shutdown: Arc<AtomicBool>) -> Result<()> {
    use signal_hook::consts::{SIGINT, SIGTERM};
    use signal_hook::iterator::Signals;

    let mut signals = Signals::new([SIGINT, SIGTERM])
        .map_err(|e| SocialFlyError::InvalidInput(format!("Signal setup failed: {}", e)))?;

    let shutdown_clone = shutdown.clone();
    std::thread::spawn(move || {
        for sig in signals.forever() {
            match sig {
                SIGTERM | SIGINT => {
                    info!("Received shutdown signal, stopping gracefully...");
                    shutdown_clone.store(true, Ordering::Relaxed);
                    break;
                }
                _ => {}
            }
        }
    });

    Ok(())
}

/// Main daemon loop
async fn run_daemon_loop(poller: &SchedulerPoller, poll_interval: u64, shutdown: Arc<AtomicBool>) {
    loop {
        if shutdown.load(Ordering::Relaxed) {
            info!("Shutdown requested, stopping daemon loop");
            break;
        }

        let summary = poller.tick().await;
        if summary.claimed > 0 {
            info!(
                claimed = summary.claimed,
                published = summary.published,
                failed = summary.failed,
                "poll complete"
            );
        }

        // Sleep until next poll (check shutdown every second)
        for _ in 0..poll_interval {
            if shutdown.load(Ordering::Relaxed) {
                break;
            }
            sleep(Duration::from_secs(1)).await;
        }
    }
}
