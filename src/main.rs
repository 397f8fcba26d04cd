//! screego server
//!
//! Screen-sharing signaling server: serves the web UI, handles logins and
//! hands WebSocket connections to the room manager.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client ──▶ net::listener ──▶ http::server router
//!                                    │  access log → origin guard → CORS
//!                                    ├─ /stream  ──▶ ws::Rooms ──▶ turn credentials
//!                                    ├─ /login, /logout ──▶ auth::Users
//!                                    ├─ /config
//!                                    ├─ /metrics (optional, basic auth)
//!                                    └─ *  ──▶ ui assets / 404
//!
//!     lifecycle: config diagnostics → users → relay → rooms task → listener
//! ```

use std::io::BufRead;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use screego::auth::hash_password;
use screego::config;
use screego::lifecycle::startup;
use screego::observability::logging;

const VERSION: &str = env!("CARGO_PKG_VERSION");
const COMMIT: &str = match option_env!("SCREEGO_COMMIT") {
    Some(commit) => commit,
    None => "unknown",
};

#[derive(Parser)]
#[command(name = "screego")]
#[command(about = "Screen sharing for developers", long_about = None, version = VERSION)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the server
    Serve {
        /// Optional TOML config file, SCREEGO_* variables override it
        #[arg(short, long, env = "SCREEGO_CONFIG")]
        config: Option<PathBuf>,
    },
    /// Print a users file line for the given credentials
    Hash {
        #[arg(long)]
        name: String,
        /// Read from stdin when omitted
        #[arg(long)]
        pass: Option<String>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { config } => serve(config).await,
        Commands::Hash { name, pass } => hash(&name, pass),
    }
}

async fn serve(path: Option<PathBuf>) -> ExitCode {
    let loaded = config::load(path.as_deref());
    logging::init(loaded.config.log_level);

    tracing::info!(version = VERSION, commit = COMMIT, "screego starting");

    match startup::serve(loaded, VERSION).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Startup failed");
            ExitCode::FAILURE
        }
    }
}

fn hash(name: &str, pass: Option<String>) -> ExitCode {
    let pass = match pass {
        Some(pass) => pass,
        None => {
            let mut line = String::new();
            if let Err(e) = std::io::stdin().lock().read_line(&mut line) {
                eprintln!("Error: cannot read password: {}", e);
                return ExitCode::FAILURE;
            }
            line.trim_end_matches(['\r', '\n']).to_string()
        }
    };
    if name.is_empty() || name.contains(':') || pass.is_empty() {
        eprintln!("Error: name must be non-empty without ':' and password must be non-empty");
        return ExitCode::FAILURE;
    }
    println!("{}:{}", name, hash_password(&pass));
    ExitCode::SUCCESS
}
