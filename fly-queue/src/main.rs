//! fly-queue - Manage the scheduled post queue

use clap::{Parser, Subcommand};
use libsocialfly::logging::{self, LogFormat, LoggingConfig};
use libsocialfly::scheduling::parse_schedule;
use libsocialfly::service::SocialFlyService;
use libsocialfly::types::{Post, PostStatus};
use libsocialfly::{Result, SocialFlyError};

#[derive(Parser, Debug)]
#[command(name = "fly-queue")]
#[command(version)]
#[command(about = "Manage scheduled posts")]
#[command(long_about = "\
fly-queue - Manage the scheduled post queue

DESCRIPTION:
    fly-queue lists, cancels, reschedules, and inspects posts waiting in the
    SocialFly queue. The fly-send daemon publishes them when due.

COMMANDS:
    list        List posts (scheduled by default)
    cancel      Cancel a scheduled post
    reschedule  Move a scheduled post to a different time; also requeues
                failed, draft, and stuck publishing posts
    now         Publish a queued post immediately
    stats       Show queue statistics

USAGE EXAMPLES:
    # List scheduled posts
    fly-queue list

    # List failed posts as JSON
    fly-queue list --status failed --format json

    # Cancel a post
    fly-queue cancel <POST_ID>

    # Reschedule (or requeue a failed post)
    fly-queue reschedule <POST_ID> \"tomorrow 3pm\"

    # Publish right now
    fly-queue now <POST_ID>

CONFIGURATION:
    Configuration file: ~/.config/socialfly/config.toml
    Database location: ~/.local/share/socialfly/socialfly.db

    Override with environment variables:
        SOCIALFLY_CONFIG      - Path to config file
        SOCIALFLY_USER        - User id for multi-user stores

EXIT CODES:
    0 - Success
    1 - Operation failed
    2 - Configuration error
    3 - Invalid input (bad post id, time format, etc.)
")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// User id owning the posts
    #[arg(short, long, global = true, env = "SOCIALFLY_USER", default_value = "default-user")]
    user: String,

    /// Enable verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List queued posts
    List {
        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: String,

        /// Filter by status (draft, scheduled, publishing, published, failed)
        #[arg(short, long, default_value = "scheduled")]
        status: String,

        /// Maximum number of posts to show
        #[arg(short, long, default_value_t = 50)]
        limit: usize,
    },

    /// Cancel a scheduled post
    Cancel {
        /// Post id to cancel
        post_id: String,
    },

    /// Reschedule a post
    Reschedule {
        /// Post id to reschedule
        post_id: String,

        /// New schedule time (e.g. "tomorrow 3pm", "2h")
        time: String,
    },

    /// Publish a queued post immediately
    Now {
        /// Post id to publish
        post_id: String,
    },

    /// Show queue statistics
    Stats {
        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: String,
    },
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
    let service = SocialFlyService::new().await?;
    let user = cli.user;

    match cli.command {
        Commands::List {
            format,
            status,
            limit,
        } => cmd_list(&service, &user, &format, &status, limit).await,
        Commands::Cancel { post_id } => {
            service.posts().cancel(&post_id).await?;
            println!("Cancelled {}", post_id);
            Ok(())
        }
        Commands::Reschedule { post_id, time } => {
            let when = parse_schedule(&time)?;
            service.posts().reschedule(&post_id, when).await?;
            println!("Rescheduled {} for {}", post_id, when.to_rfc3339());
            Ok(())
        }
        Commands::Now { post_id } => cmd_now(&service, &post_id).await,
        Commands::Stats { format } => cmd_stats(&service, &user, &format).await,
    }
}

async fn cmd_list(
    service: &SocialFlyService,
    user: &str,
    format: &str,
    status: &str,
    limit: usize,
) -> Result<()> {
    let status = if status == "all" {
        None
    } else {
        Some(PostStatus::parse(status).ok_or_else(|| {
            SocialFlyError::InvalidInput(format!("Invalid status '{}'", status))
        })?)
    };

    let posts = service.posts().list(user, status, limit, 0).await?;

    match format {
        "json" => println!(
            "{}",
            serde_json::to_string_pretty(&posts).unwrap_or_default()
        ),
        "text" => output_list_text(&posts),
        other => {
            return Err(SocialFlyError::InvalidInput(format!(
                "Invalid format '{}'. Must be 'text' or 'json'",
                other
            )))
        }
    }

    Ok(())
}

fn output_list_text(posts: &[Post]) {
    let now = chrono::Utc::now().timestamp();

    for post in posts {
        let preview = truncate_content(&post.content, 50);
        let when = match post.status {
            PostStatus::Scheduled => post
                .scheduled_for
                .map(|ts| format_time_until(now, ts))
                .unwrap_or_else(|| "unknown".to_string()),
            PostStatus::Failed => post
                .error_message
                .clone()
                .unwrap_or_else(|| "failed".to_string()),
            _ => post.status.to_string(),
        };

        println!("{} | {} | {}", post.id, preview, when);
    }
}

/// Truncate content to max length with ellipsis
fn truncate_content(content: &str, max_len: usize) -> String {
    if content.chars().count() <= max_len {
        content.to_string()
    } else {
        let truncated: String = content.chars().take(max_len).collect();
        format!("{}...", truncated)
    }
}

/// Format time until scheduled time in human-readable form
fn format_time_until(now: i64, scheduled_for: i64) -> String {
    let diff = scheduled_for - now;

    if diff < 0 {
        return "overdue".to_string();
    }

    let minutes = diff / 60;
    let hours = minutes / 60;
    let days = hours / 24;

    if days > 0 {
        format!("in {} day{}", days, if days == 1 { "" } else { "s" })
    } else if hours > 0 {
        format!("in {} hour{}", hours, if hours == 1 { "" } else { "s" })
    } else if minutes > 0 {
        format!("in {} minute{}", minutes, if minutes == 1 { "" } else { "s" })
    } else {
        "in <1 minute".to_string()
    }
}

/// Publish a queued post immediately, bypassing its schedule.
async fn cmd_now(service: &SocialFlyService, post_id: &str) -> Result<()> {
    let post = service
        .posts()
        .get(post_id)
        .await?
        .ok_or_else(|| SocialFlyError::InvalidInput(format!("Post {} not found", post_id)))?;

    match post.status {
        PostStatus::Scheduled | PostStatus::Draft => {}
        status => {
            return Err(SocialFlyError::InvalidInput(format!(
                "Post {} is {} and cannot be published now",
                post_id, status
            )))
        }
    }

    let account = service
        .accounts()
        .get(&post.social_account_id)
        .await?
        .ok_or_else(|| {
            SocialFlyError::InvalidInput(format!(
                "Account {} not found",
                post.social_account_id
            ))
        })?;

    let updated = service.dispatcher().dispatch(&post, &account).await?;
    match updated.status {
        PostStatus::Published => {
            println!(
                "Published: {} ({})",
                updated.id,
                updated.platform_post_id.as_deref().unwrap_or("-")
            );
            Ok(())
        }
        _ => {
            eprintln!(
                "Publish failed: {}",
                updated.error_message.as_deref().unwrap_or("unknown error")
            );
            std::process::exit(1);
        }
    }
}

async fn cmd_stats(service: &SocialFlyService, user: &str, format: &str) -> Result<()> {
    let stats = service.posts().stats(user).await?;

    match format {
        "json" => println!(
            "{}",
            serde_json::json!({
                "draft": stats.draft,
                "scheduled": stats.scheduled,
                "publishing": stats.publishing,
                "published": stats.published,
                "failed": stats.failed,
            })
        ),
        "text" => {
            println!("draft:      {}", stats.draft);
            println!("scheduled:  {}", stats.scheduled);
            println!("publishing: {}", stats.publishing);
            println!("published:  {}", stats.published);
            println!("failed:     {}", stats.failed);
        }
        other => {
            return Err(SocialFlyError::InvalidInput(format!(
                "Invalid format '{}'. Must be 'text' or 'json'",
                other
            )))
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_content() {
        assert_eq!(truncate_content("short", 50), "short");
        let long = "x".repeat(60);
        let truncated = truncate_content(&long, 50);
        assert_eq!(truncated.chars().count(), 53);
        assert!(truncated.ends_with("..."));
    }

    #[test]
    fn test_format_time_until() {
        assert_eq!(format_time_until(100, 50), "overdue");
        assert_eq!(format_time_until(0, 30), "in <1 minute");
        assert_eq!(format_time_until(0, 120), "in 2 minutes");
        assert_eq!(format_time_until(0, 3700), "in 1 hour");
        assert_eq!(format_time_until(0, 90_000), "in 1 day");
    }
}
