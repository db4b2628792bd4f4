//! CLI entry and dispatch.

use almaport_client::api::{Status, contact};
use almaport_client::config;
use anyhow::{Context, Result};
use clap::Parser;
use tracing::Level;
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

mod commands;

#[derive(Parser)]
#[command(name = "almaport")]
#[command(version = "0.1")]
#[command(about = "Alumni portal command-line client")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging
    #[arg(long, global = true)]
    verbose: bool,

    /// Only log errors
    #[arg(long, global = true, conflicts_with = "verbose")]
    quiet: bool,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Sign in and store the issued session tokens
    Login {
        /// Account email
        #[arg(long)]
        email: String,

        /// Account password (prompted when omitted)
        #[arg(long, env = "ALMAPORT_PASSWORD", hide_env_values = true)]
        password: Option<String>,

        /// Keep the session for 30 days instead of one
        #[arg(long)]
        remember: bool,
    },

    /// Clear the stored session
    Logout,

    /// Show the stored session tokens and their expiry
    Status,

    /// Browse events and register for them
    Events {
        #[command(subcommand)]
        command: EventsCommands,
    },

    /// Browse project activities
    Activities {
        #[command(subcommand)]
        command: ActivitiesCommands,
    },

    /// Browse association projects
    Projects {
        #[command(subcommand)]
        command: ProjectsCommands,
    },

    /// Browse the project photo gallery
    Gallery {
        #[command(subcommand)]
        command: GalleryCommands,
    },

    /// Show the executive team
    Staff {
        #[command(subcommand)]
        command: StaffCommands,
    },

    /// Send a message to the association
    Contact {
        /// Your name
        #[arg(long)]
        name: String,

        /// Reply-to email address
        #[arg(long)]
        email: String,

        /// Message subject
        #[arg(long)]
        subject: String,

        /// Message body
        #[arg(long)]
        message: String,

        /// One of: general, alumni, events, donations, careers
        #[arg(long, default_value = contact::DEFAULT_CATEGORY)]
        category: String,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(clap::Subcommand)]
enum EventsCommands {
    /// List events
    List {
        /// Keep only these statuses (comma-separated)
        #[arg(long, value_delimiter = ',', value_name = "STATUS")]
        status: Vec<Status>,
    },
    /// Register for an event
    Register {
        /// The event to register for
        #[arg(value_name = "EVENT_ID")]
        id: i64,
    },
}

#[derive(clap::Subcommand)]
enum ActivitiesCommands {
    /// List activities
    List {
        /// Keep only these statuses (comma-separated)
        #[arg(long, value_delimiter = ',', value_name = "STATUS")]
        status: Vec<Status>,
    },
}

#[derive(clap::Subcommand)]
enum ProjectsCommands {
    /// List projects
    List {
        /// Keep only these statuses (comma-separated)
        #[arg(long, value_delimiter = ',', value_name = "STATUS")]
        status: Vec<Status>,
    },
}

#[derive(clap::Subcommand)]
enum GalleryCommands {
    /// List gallery images
    List,
}

#[derive(clap::Subcommand)]
enum StaffCommands {
    /// List the executive team roster
    List,
}

#[derive(clap::Subcommand)]
enum ConfigCommands {
    /// Show the path to the config file
    Path,
    /// Initialize a default config file (if not present)
    Init,
    /// Set the portal base address
    SetUrl {
        /// Base address, e.g. https://portal.example.com
        #[arg(value_name = "URL")]
        url: String,
    },
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose, cli.quiet);

    // one tokio runtime for everything
    let rt = tokio::runtime::Runtime::new().context("create tokio runtime")?;

    rt.block_on(async move { dispatch(cli).await })
}

fn init_logging(verbose: bool, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env().add_directive(Level::INFO.into())
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_level(verbose),
        )
        .init();
}

async fn dispatch(cli: Cli) -> Result<()> {
    let config = config::Config::load().context("load config")?;

    match cli.command {
        Commands::Login {
            email,
            password,
            remember,
        } => commands::auth::login(&config, &email, password, remember).await,
        Commands::Logout => commands::auth::logout(&config),
        Commands::Status => commands::auth::status(),

        Commands::Events { command } => match command {
            EventsCommands::List { status } => commands::events::list(&config, &status).await,
            EventsCommands::Register { id } => commands::events::register(&config, id).await,
        },

        Commands::Activities { command } => match command {
            ActivitiesCommands::List { status } => {
                commands::activities::list(&config, &status).await
            }
        },

        Commands::Projects { command } => match command {
            ProjectsCommands::List { status } => commands::projects::list(&config, &status).await,
        },

        Commands::Gallery { command } => match command {
            GalleryCommands::List => commands::gallery::list(&config).await,
        },

        Commands::Staff { command } => match command {
            StaffCommands::List => commands::staff::list(&config).await,
        },

        Commands::Contact {
            name,
            email,
            subject,
            message,
            category,
        } => {
            let message = contact::ContactMessage::new(name, email, subject, message)
                .with_category(category);
            commands::contact::send(&config, &message).await
        }

        Commands::Config { command } => match command {
            ConfigCommands::Path => {
                commands::config::path();
                Ok(())
            }
            ConfigCommands::Init => commands::config::init(),
            ConfigCommands::SetUrl { url } => commands::config::set_url(&url),
        },
    }
}
