#![cfg_attr(not(test), forbid(unsafe_code))]

//! Command-line front end for the activity signup portal.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use clap_complete::Shell;
use dotenv::dotenv;
use shared::config::{ClientConfig, LogFormat};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{EnvFilter, fmt};

mod commands;

use commands::{roster::ActionArgs, session::LoginArgs};

/// Portal CLI
#[derive(Parser, Debug)]
#[command(name = "portal")]
#[command(about = "Browse activities and manage student registrations", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to the configuration file (YAML, JSON or TOML)
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    /// Portal base URL, overriding the configuration (e.g., `http://localhost:8000`)
    #[arg(long, short, global = true)]
    server: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show the session and the activity roster
    Status,

    /// Log in as a teacher
    Login(LoginArgs),

    /// End the teacher session and remove stored cookies
    Logout,

    /// List activities with availability and participants
    Activities,

    /// Register a student for an activity
    Signup(ActionArgs),

    /// Remove a student from an activity
    Unregister(ActionArgs),

    /// Start an interactive session
    Shell,

    /// Generate shell completion scripts for the CLI
    Completion {
        /// The shell to generate the completion script for
        #[arg(long, value_enum)]
        shell: Shell,
    },

    /// Generate a configuration file with default values
    Config {
        /// Format of the configuration file (yaml, json or toml). Defaults to yaml.
        #[arg(long, short)]
        format: Option<String>,

        /// Where to write the file. Defaults to `portal.<format>` in the current directory.
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    let cli = Cli::parse();

    let command = match cli.command {
        Commands::Completion { shell } => {
            commands::completion::generate_completion(shell);
            return Ok(());
        }
        Commands::Config { format, output } => {
            let format = format.unwrap_or_else(|| "yaml".to_string());
            return commands::config::generate_config(&format, output);
        }
        command => command,
    };

    let config = ClientConfig::load_config(cli.config, cli.server.as_deref())?;
    initialize_tracing(&config);

    match command {
        Commands::Status => commands::session::status(&config).await,
        Commands::Login(args) => commands::session::login(&config, args).await,
        Commands::Logout => commands::session::logout(&config).await,
        Commands::Activities => commands::roster::list(&config).await,
        Commands::Signup(args) => commands::roster::signup(&config, args).await,
        Commands::Unregister(args) => commands::roster::unregister(&config, args).await,
        Commands::Shell => commands::shell::run(&config).await,
        Commands::Completion { .. } | Commands::Config { .. } => Ok(()),
    }
}

/// Installs the global tracing subscriber. Logs go to stderr so command
/// output on stdout stays machine-readable.
fn initialize_tracing(config: &ClientConfig) {
    let env_filter = build_env_filter(config);

    let fmt_builder = fmt::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_level(true);

    if matches!(config.log_format, LogFormat::Json) {
        fmt_builder.json().with_ansi(false).init();
    } else {
        fmt_builder.with_ansi(true).init();
    }
}

fn build_env_filter(config: &ClientConfig) -> EnvFilter {
    let default_level = config
        .log_level
        .parse::<LevelFilter>()
        .unwrap_or(LevelFilter::INFO);

    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::builder()
            .with_default_directive(default_level.into())
            .from_env_lossy()
    })
}
