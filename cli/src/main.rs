mod commands;
mod config;
mod server;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process;
use tracing_subscriber::EnvFilter;

use crate::commands::{
    cmd_favorite, cmd_favorites, cmd_prayers, cmd_read, cmd_reset, cmd_restart, cmd_set_day,
    cmd_set_start, cmd_start, cmd_status, cmd_week,
};
use crate::config::Config;

#[derive(Parser)]
#[command(
    name = "vigil",
    version,
    about = "Follow a 63-day reflection program, one day at a time",
    long_about = "Follow a 63-day, 9-week reflection program.\n\n\
        The program starts on a Sunday. Your progress and favorites are kept\n\
        in a local database on this device."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show where you are in the program
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Start the program (today must be a Sunday unless --date is given)
    Start {
        /// Sunday to count as day 1 (YYYY-MM-DD or today/yesterday/tomorrow)
        #[arg(long)]
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Jump to a program day (1-63); today becomes that day
    SetDay {
        /// Program day
        #[arg(allow_negative_numbers = true)]
        day: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Change the program start date (must be a Sunday)
    SetStart {
        /// New start date (YYYY-MM-DD or today/yesterday/tomorrow)
        date: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Mark or unmark a day as favorite
    Favorite {
        /// Program day (1-63)
        #[arg(allow_negative_numbers = true)]
        day: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List favorite days
    Favorites {
        /// Path to the reflections JSON file
        #[arg(long, value_name = "PATH")]
        content: Option<PathBuf>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete all progress and favorites
    Reset {
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Start over on the next Sunday with no favorites
    Restart {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Read a day's reflection (defaults to today's program day)
    Read {
        /// Program day (1-63)
        #[arg(allow_negative_numbers = true)]
        day: Option<i64>,
        /// Path to the reflections JSON file
        #[arg(long, value_name = "PATH")]
        content: Option<PathBuf>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List the reflections of a week (1-9), or all of them
    Week {
        /// Week number
        #[arg(allow_negative_numbers = true)]
        week: Option<i64>,
        /// Path to the reflections JSON file
        #[arg(long, value_name = "PATH")]
        content: Option<PathBuf>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the prayers that accompany the program
    Prayers {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Start the local REST API server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "8080")]
        port: u16,
        /// Address to bind to (default: 127.0.0.1, use 0.0.0.0 to expose to network)
        #[arg(short, long, default_value = "127.0.0.1")]
        bind: String,
        /// Path to the reflections JSON file
        #[arg(long, value_name = "PATH")]
        content: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let default_level = if matches!(cli.command, Commands::Serve { .. }) {
        "info"
    } else {
        "warn"
    };
    init_tracing(default_level);

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

fn init_tracing(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::load()?;
    let tracker = config.open_tracker()?;

    match cli.command {
        Commands::Status { json } => cmd_status(&tracker, json),
        Commands::Start { date, json } => cmd_start(&tracker, date, json),
        Commands::SetDay { day, json } => cmd_set_day(&tracker, day, json),
        Commands::SetStart { date, json } => cmd_set_start(&tracker, date, json),
        Commands::Favorite { day, json } => cmd_favorite(&tracker, day, json),
        Commands::Favorites { content, json } => {
            let content = config.load_content(content.as_deref())?;
            cmd_favorites(&tracker, &content, json)
        }
        Commands::Reset { yes, json } => cmd_reset(&tracker, yes, json),
        Commands::Restart { json } => cmd_restart(&tracker, json),
        Commands::Read { day, content, json } => {
            let content = config.load_content(content.as_deref())?;
            cmd_read(&tracker, &content, day, json)
        }
        Commands::Week {
            week,
            content,
            json,
        } => {
            let content = config.load_content(content.as_deref())?;
            cmd_week(&tracker, &content, week, json)
        }
        Commands::Prayers { json } => {
            let content = config.load_content(None)?;
            cmd_prayers(&content, json)
        }
        Commands::Serve {
            port,
            bind,
            content,
        } => {
            let content = config.load_content(content.as_deref())?;
            tracing::info!(
                data_dir = %config.data_dir.display(),
                reflections = content.len(),
                "opened program data"
            );
            server::start_server(tracker, content, port, &bind).await
        }
    }
}
