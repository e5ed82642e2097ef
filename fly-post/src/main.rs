//! fly-post - Publish or schedule a post to a connected platform account

use clap::Parser;
use libsocialfly::logging::{self, LogFormat, LoggingConfig};
use libsocialfly::scheduling::parse_schedule;
use libsocialfly::service::posts::CreatePostRequest;
use libsocialfly::service::SocialFlyService;
use libsocialfly::types::PostStatus;
use libsocialfly::Result;
use std::io::Read;

#[derive(Parser, Debug)]
#[command(name = "fly-post")]
#[command(version)]
#[command(about = "Publish or schedule a post")]
#[command(long_about = "\
fly-post - Publish or schedule a post to a connected platform account

DESCRIPTION:
    fly-post publishes content through one of your connected accounts,
    immediately or at a scheduled time. Scheduled posts are picked up by the
    fly-send daemon.

USAGE EXAMPLES:
    # Post immediately
    fly-post --account <ACCOUNT_ID> \"Hello world\"

    # Post from stdin
    echo \"Hello world\" | fly-post --account <ACCOUNT_ID>

    # Attach media (paths under the media root, or remote URLs)
    fly-post --account <ACCOUNT_ID> --media /uploads/pic.png \"Look at this\"

    # Schedule for later
    fly-post --account <ACCOUNT_ID> --schedule \"tomorrow 9am\" \"Good morning\"
    fly-post --account <ACCOUNT_ID> --schedule 2h \"See you soon\"

CONFIGURATION:
    Configuration file: ~/.config/socialfly/config.toml
    Database location: ~/.local/share/socialfly/socialfly.db

    Override with environment variables:
        SOCIALFLY_CONFIG      - Path to config file
        SOCIALFLY_USER        - User id for multi-user stores
        SOCIALFLY_LOG_FORMAT  - text, json, or pretty
        SOCIALFLY_LOG_LEVEL   - error, warn, info, debug, trace

EXIT CODES:
    0 - Post published or queued
    1 - Publish failed
    2 - Platform configuration error
    3 - Invalid input
")]
struct Cli {
    /// Content to post (reads from stdin if not provided)
    content: Option<String>,

    /// Account to post through (see fly-accounts list)
    #[arg(short, long)]
    account: String,

    /// User id owning the account
    #[arg(short, long, env = "SOCIALFLY_USER", default_value = "default-user")]
    user: String,

    /// Media to attach (repeatable)
    #[arg(short, long)]
    media: Vec<String>,

    /// Schedule time (e.g. "2h", "tomorrow 9am", "2026-09-01 15:00")
    #[arg(short, long)]
    schedule: Option<String>,

    /// Output format (text or json)
    #[arg(short, long, default_value = "text")]
    format: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if cli.verbose {
        LoggingConfig::new(LogFormat::Text, "debug".to_string(), true).init();
    } else {
        logging::init_default();
    }

    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e);
        std::process::exit(e.exit_code());
    }
}

async fn run(cli: Cli) -> Result<()> {
    let content = match cli.content {
        Some(content) => content,
        None => {
            let mut buffer = String::new();
            std::io::stdin().read_to_string(&mut buffer).map_err(|e| {
                libsocialfly::SocialFlyError::InvalidInput(format!(
                    "Could not read stdin: {}",
                    e
                ))
            })?;
            buffer.trim_end().to_string()
        }
    };

    if cli.format != "text" && cli.format != "json" {
        return Err(libsocialfly::SocialFlyError::InvalidInput(format!(
            "Invalid format '{}'. Must be 'text' or 'json'",
            cli.format
        )));
    }

    let scheduled_for = cli.schedule.as_deref().map(parse_schedule).transpose()?;

    let service = SocialFlyService::new().await?;
    let post = service
        .posts()
        .create(CreatePostRequest {
            user_id: cli.user,
            account_id: cli.account,
            content,
            media_urls: cli.media,
            scheduled_for,
        })
        .await?;

    if cli.format == "json" {
        println!(
            "{}",
            serde_json::to_string_pretty(&post).unwrap_or_default()
        );
    } else {
        match post.status {
            PostStatus::Published => {
                println!(
                    "Published: {} ({})",
                    post.id,
                    post.platform_post_id.as_deref().unwrap_or("-")
                );
            }
            PostStatus::Scheduled => {
                let when = post
                    .scheduled_for
                    .and_then(|ts| chrono::DateTime::from_timestamp(ts, 0))
                    .map(|dt| dt.to_rfc3339())
                    .unwrap_or_else(|| "unknown".to_string());
                println!("Queued: {} for {}", post.id, when);
            }
            _ => {}
        }
    }

    if post.status == PostStatus::Failed {
        eprintln!(
            "Publish failed: {}",
            post.error_message.as_deref().unwrap_or("unknown error")
        );
        std::process::exit(1);
    }

    Ok(())
}
