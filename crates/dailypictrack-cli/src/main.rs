//! DailyPicTrack CLI - upload, tag and browse a personal photo log.
//!
//! A thin front end over `dailypictrack-core`: each subcommand maps to one
//! page or action of the app (login, signup, dashboard, gallery, upload).

mod app;

use std::io;
use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use dailypictrack_core::config::Config;

use app::App;

/// Set to any value to also log to a daily file in the cache directory
const ENV_LOG_FILE: &str = "DAILYPICTRACK_LOG_FILE";

#[derive(Parser)]
#[command(name = "dailypictrack", version, about = "Upload, tag and browse your daily photo log")]
struct Cli {
    /// API base URL (overrides config and DAILYPICTRACK_API_URL)
    #[arg(long, global = true)]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Sign in and store the session token
    Login {
        #[arg(long)]
        email: Option<String>,
    },
    /// Create an account
    Signup {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
    },
    /// Forget the stored session token
    Logout,
    /// Show the signed-in identity
    Whoami,
    /// Show whether the stored session is still live
    Status,
    /// Summary statistics and recent uploads
    Dashboard,
    /// Browse uploads, 12 per page
    Gallery {
        #[arg(long, default_value_t = 1)]
        page: usize,
    },
    /// Show one image in detail
    Show { id: String },
    /// Upload an image file
    Upload {
        path: PathBuf,
        /// Notes stored with the image
        #[arg(long)]
        doc: Option<String>,
        /// Tag to attach; repeat for several
        #[arg(long = "tag")]
        tags: Vec<String>,
    },
    /// Upload a captured frame stored as a data: URL in a file
    Capture {
        file: PathBuf,
        #[arg(long)]
        doc: Option<String>,
        #[arg(long = "tag")]
        tags: Vec<String>,
    },
    /// Delete one or more images
    Delete {
        #[arg(required = true)]
        ids: Vec<String>,
    },
}

/// Initialize the tracing subscriber for logging.
/// Use RUST_LOG to control the level (e.g., RUST_LOG=debug).
fn init_tracing(log_dir: Option<PathBuf>) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "dailypictrack.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_ansi(false).with_writer(writer)),
                Some(guard),
            )
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();

    guard
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let log_dir = std::env::var_os(ENV_LOG_FILE).and_then(|_| Config::default_cache_dir().ok());
    let _guard = init_tracing(log_dir);

    let mut app = App::new(cli.api_url)?;
    info!(base_url = %app.client.base_url(), "DailyPicTrack starting");

    let result = match cli.command {
        Command::Login { email } => app.login(email).await,
        Command::Signup { name, email } => app.signup(&name, &email).await,
        Command::Logout => app.logout(),
        Command::Whoami => app.whoami(),
        Command::Status => app.status(),
        Command::Dashboard => app.dashboard().await,
        Command::Gallery { page } => app.gallery(page).await,
        Command::Show { id } => app.show(&id).await,
        Command::Upload { path, doc, tags } => app.upload(&path, doc, tags).await,
        Command::Capture { file, doc, tags } => app.capture(&file, doc, tags).await,
        Command::Delete { ids } => app.delete(&ids).await,
    };

    app.follow_session_events();
    result
}
