use anyhow::Result;
use clap::{Parser, Subcommand};
use clubhub_api::{ApiError, Config, ValidationErrors};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod output;
mod tui;

use commands::events::ListFilter;
use commands::CommandContext;

#[derive(Parser)]
#[command(name = "clubhub")]
#[command(about = "Terminal client for the CampusClubHub campus events API")]
#[command(version)]
struct Cli {
    /// API base URL (overrides config)
    #[arg(long)]
    server: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Open the full-screen browser (default when no command is given)
    Browse,
    /// Log in and store the session token
    Login {
        username: String,
        /// Password (prompted when omitted)
        #[arg(long)]
        password: Option<String>,
    },
    /// Clear the stored session
    Logout,
    /// Show the logged-in account
    Whoami,
    /// Create a student account
    Register {
        username: String,
        email: String,
        /// Password (prompted twice when omitted)
        #[arg(long)]
        password: Option<String>,
        #[arg(long)]
        faculty: Option<String>,
        #[arg(long)]
        speciality: Option<String>,
    },
    /// Confirm an email address with the token from the verification mail
    VerifyEmail { username: String, token: String },
    /// Browse and join clubs
    Clubs {
        #[command(subcommand)]
        action: ClubsAction,
    },
    /// Browse events and leave reviews
    Events {
        #[command(subcommand)]
        action: EventsAction,
    },
    /// Manage your event tickets
    Tickets {
        #[command(subcommand)]
        action: TicketsAction,
    },
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ClubsAction {
    /// List all clubs
    List {
        /// Filter by name or description
        #[arg(long)]
        search: Option<String>,
    },
    /// Show one club
    Show { id: i64 },
    /// List a club's events
    Events { id: i64 },
    /// List a club's members
    Members { id: i64 },
    /// Join a club as a member
    Join { id: i64 },
    /// Subscribe to a club's announcements
    Subscribe { id: i64 },
}

#[derive(Subcommand)]
enum EventsAction {
    /// List events
    List {
        /// Only events that have not started yet
        #[arg(long)]
        upcoming: bool,
        /// Filter by title, description, or club name
        #[arg(long)]
        search: Option<String>,
        /// Only free events
        #[arg(long, conflicts_with = "paid")]
        free: bool,
        /// Only paid events
        #[arg(long, conflicts_with = "free")]
        paid: bool,
    },
    /// Show one event
    Show { id: i64 },
    /// List an event's reviews
    Reviews { id: i64 },
    /// Rate an event from 1 to 5 stars
    Review {
        id: i64,
        #[arg(long)]
        rating: u8,
        #[arg(long)]
        comment: String,
    },
}

#[derive(Subcommand)]
enum TicketsAction {
    /// List your tickets
    List,
    /// Buy a ticket for an event
    Buy { event: i64 },
    /// Cancel a ticket
    Cancel { id: i64 },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Set a configuration value
    Set {
        /// Configuration key (url)
        key: String,
        /// Configuration value
        value: String,
    },
    /// Get a configuration value
    Get {
        /// Configuration key
        key: String,
    },
    /// Show all configuration
    Show,
    /// Get the config file path
    Path,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let interactive = matches!(cli.command, None | Some(Commands::Browse));
    init_logging(interactive);

    if let Err(err) = run(cli).await {
        report_error(&err);
        std::process::exit(1);
    }
}

/// While the browser owns the terminal, logs go to a file next to the
/// config; one-shot commands log to stderr as usual.
fn init_logging(interactive: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "clubhub=info".into());

    let log_path = if interactive {
        clubhub_api::config::config_dir()
            .ok()
            .map(|dir| dir.join("clubhub.log"))
    } else {
        None
    };

    match log_path {
        Some(path) => {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    tracing_subscriber::fmt::layer().with_ansi(false).with_writer(
                        move || {
                            std::fs::OpenOptions::new()
                                .create(true)
                                .append(true)
                                .open(&path)
                                .expect("failed to open log file")
                        },
                    ),
                )
                .init();
        }
        None => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::load().unwrap_or_default();
    let api_url = cli.server.unwrap_or(config.api.url);
    let ctx = CommandContext::new(api_url)?;

    match cli.command {
        None | Some(Commands::Browse) => {
            tracing::info!("starting interactive browser");
            tui::run(ctx.client, ctx.session).await
        }
        Some(Commands::Login { username, password }) => {
            commands::auth::login(&ctx, &username, password).await
        }
        Some(Commands::Logout) => {
            commands::auth::logout(&ctx);
            Ok(())
        }
        Some(Commands::Whoami) => commands::auth::whoami(&ctx).await,
        Some(Commands::Register {
            username,
            email,
            password,
            faculty,
            speciality,
        }) => commands::auth::register(&ctx, username, email, password, faculty, speciality).await,
        Some(Commands::VerifyEmail { username, token }) => {
            commands::auth::verify_email(&ctx, &username, &token).await
        }
        Some(Commands::Clubs { action }) => run_clubs(&ctx, action).await,
        Some(Commands::Events { action }) => run_events(&ctx, action).await,
        Some(Commands::Tickets { action }) => run_tickets(&ctx, action).await,
        Some(Commands::Config { action }) => handle_config(action),
    }
}

async fn run_clubs(ctx: &CommandContext, action: ClubsAction) -> Result<()> {
    match action {
        ClubsAction::List { search } => commands::clubs::list(ctx, search).await,
        ClubsAction::Show { id } => commands::clubs::show(ctx, id).await,
        ClubsAction::Events { id } => commands::clubs::events(ctx, id).await,
        ClubsAction::Members { id } => commands::clubs::members(ctx, id).await,
        ClubsAction::Join { id } => commands::clubs::join(ctx, id).await,
        ClubsAction::Subscribe { id } => commands::clubs::subscribe(ctx, id).await,
    }
}

async fn run_events(ctx: &CommandContext, action: EventsAction) -> Result<()> {
    match action {
        EventsAction::List {
            upcoming,
            search,
            free,
            paid,
        } => {
            let filter = ListFilter {
                upcoming,
                search,
                free,
                paid,
            };
            commands::events::list(ctx, filter).await
        }
        EventsAction::Show { id } => commands::events::show(ctx, id).await,
        EventsAction::Reviews { id } => commands::events::reviews(ctx, id).await,
        EventsAction::Review {
            id,
            rating,
            comment,
        } => commands::events::review(ctx, id, rating, comment).await,
    }
}

async fn run_tickets(ctx: &CommandContext, action: TicketsAction) -> Result<()> {
    match action {
        TicketsAction::List => commands::tickets::list(ctx).await,
        TicketsAction::Buy { event } => commands::tickets::buy(ctx, event).await,
        TicketsAction::Cancel { id } => commands::tickets::cancel(ctx, id).await,
    }
}

fn handle_config(action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Set { key, value } => {
            let mut config = Config::load().unwrap_or_default();
            match key.as_str() {
                "url" => config.api.url = value,
                _ => anyhow::bail!("Unknown config key: {}. Valid keys: url", key),
            }
            config.save()?;
            println!("Configuration saved");
        }
        ConfigAction::Get { key } => {
            let config = Config::load()?;
            match key.as_str() {
                "url" => println!("{}", config.api.url),
                _ => anyhow::bail!("Unknown config key: {}", key),
            }
        }
        ConfigAction::Show => {
            let config = Config::load()?;
            println!("url: {}", config.api.url);
        }
        ConfigAction::Path => {
            let path = Config::config_path()?;
            println!("{}", path.display());
        }
    }
    Ok(())
}

/// Render one failure notice. Validation problems list every offending
/// field; auth failures add the login hint.
fn report_error(err: &anyhow::Error) {
    if let Some(validation) = err.downcast_ref::<ValidationErrors>() {
        output::error("Please fix the following and retry:");
        for field in validation.iter() {
            eprintln!("  {}: {}", field.field, field.message);
        }
        return;
    }

    if let Some(api) = err.downcast_ref::<ApiError>() {
        output::error(&api.to_string());
        if api.is_auth_failure() {
            output::hint("Run 'clubhub login <username>' to authenticate");
        }
        return;
    }

    output::error(&format!("{err:#}"));
}
