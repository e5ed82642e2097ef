//! fly-accounts - Manage connected social accounts

use clap::{Parser, Subcommand};
use libsocialfly::logging::{self, LogFormat, LoggingConfig};
use libsocialfly::service::accounts::ConnectAccountRequest;
use libsocialfly::service::SocialFlyService;
use libsocialfly::types::Account;
use libsocialfly::{Result, SocialFlyError};

#[derive(Parser, Debug)]
#[command(name = "fly-accounts")]
#[command(version)]
#[command(about = "Manage connected social accounts")]
#[command(long_about = "\
fly-accounts - Manage connected social accounts

DESCRIPTION:
    fly-accounts connects, lists, and disconnects the platform accounts that
    fly-post and fly-send publish through. Tokens are stored in the local
    SocialFly database; obtain them from each platform's developer console or
    OAuth flow.

COMMANDS:
    connect     Store credentials for a platform account
    list        List connected accounts
    disconnect  Deactivate an account (its history is kept)
    platforms   Show the platforms this build can publish to

USAGE EXAMPLES:
    # Connect a Discord channel
    fly-accounts connect --platform discord --platform-id 123456 \\
        --name \"My Server\" --token \"$DISCORD_TOKEN\" \\
        --metadata '{\"channelId\":\"987654\"}'

    # Connect a YouTube channel with a refresh token
    fly-accounts connect --platform youtube --platform-id UCabc \\
        --name \"My Channel\" --token \"$YT_TOKEN\" \\
        --refresh-token \"$YT_REFRESH\" --expiry 1900000000

    # List accounts as JSON
    fly-accounts list --format json

    # Disconnect an account
    fly-accounts disconnect <ACCOUNT_ID>

CONFIGURATION:
    Configuration file: ~/.config/socialfly/config.toml

    Override with environment variables:
        SOCIALFLY_CONFIG      - Path to config file
        SOCIALFLY_USER        - User id owning the accounts

EXIT CODES:
    0 - Success
    1 - Operation failed
    2 - Configuration error
    3 - Invalid input
")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// User id owning the accounts
    #[arg(short, long, global = true, env = "SOCIALFLY_USER", default_value = "default-user")]
    user: String,

    /// Enable verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Store credentials for a platform account
    Connect {
        /// Platform name (discord, facebook, linkedin, twitter, youtube)
        #[arg(short, long)]
        platform: String,

        /// Platform-side account id (channel id, page id, user id, ...)
        #[arg(long)]
        platform_id: String,

        /// Display name for the account
        #[arg(short, long)]
        name: String,

        /// Access token
        #[arg(short, long)]
        token: String,

        /// Refresh token, for platforms that rotate access tokens
        #[arg(long)]
        refresh_token: Option<String>,

        /// Access token expiry as a unix timestamp
        #[arg(long)]
        expiry: Option<i64>,

        /// Platform-specific metadata as a JSON object
        #[arg(short, long)]
        metadata: Option<String>,
    },

    /// List connected accounts
    List {
        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Deactivate a connected account
    Disconnect {
        /// Account id to disconnect
        account_id: String,
    },

    /// Show the platforms this build can publish to
    Platforms,
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
        Commands::Connect {
            platform,
            platform_id,
            name,
            token,
            refresh_token,
            expiry,
            metadata,
        } => {
            let metadata = metadata
                .map(|raw| {
                    serde_json::from_str(&raw).map_err(|e| {
                        SocialFlyError::InvalidInput(format!("Invalid metadata JSON: {}", e))
                    })
                })
                .transpose()?;

            let account = service
                .accounts()
                .connect(ConnectAccountRequest {
                    user_id: user,
                    platform,
                    platform_id,
                    account_name: name,
                    access_token: token,
                    refresh_token,
                    token_expiry: expiry,
                    metadata,
                })
                .await?;

            println!("Connected: {} ({} {})", account.id, account.platform, account.account_name);
            Ok(())
        }
        Commands::List { format } => {
            let accounts = service.accounts().list(&user).await?;
            match format.as_str() {
                "json" => println!(
                    "{}",
                    serde_json::to_string_pretty(&accounts).unwrap_or_default()
                ),
                "text" => output_list_text(&accounts),
                other => {
                    return Err(SocialFlyError::InvalidInput(format!(
                        "Invalid format '{}'. Must be 'text' or 'json'",
                        other
                    )))
                }
            }
            Ok(())
        }
        Commands::Disconnect { account_id } => {
            service.accounts().disconnect(&account_id).await?;
            println!("Disconnected {}", account_id);
            Ok(())
        }
        Commands::Platforms => {
            for name in service.dispatcher().registry().platforms() {
                println!("{}", name);
            }
            Ok(())
        }
    }
}

fn output_list_text(accounts: &[Account]) {
    for account in accounts {
        let state = if account.is_active { "active" } else { "disconnected" };
        println!(
            "{} | {} | {} | {}",
            account.id, account.platform, account.account_name, state
        );
    }
}
