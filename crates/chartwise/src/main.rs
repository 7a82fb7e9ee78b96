//! Chartwise: ask Superset questions in plain language

use clap::{Parser, Subcommand};
use tracing::error;
use tracing_subscriber::EnvFilter;

mod commands;

use commands::{
    ask_command, call_command, init_command, register_db_command, status_command, tools_command,
};

/// Chartwise: turn questions into Superset charts
#[derive(Parser)]
#[command(name = "chartwise")]
#[command(about = "Turn data questions into Superset charts with a tool-calling agent")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the config file
    Init,
    /// Ask the agent a question
    Ask {
        /// Question to ask; starts an interactive session when omitted
        #[arg(short, long)]
        message: Option<String>,
    },
    /// List the tools offered to the model
    Tools,
    /// Run a single tool and print its result
    Call {
        /// Tool name, e.g. superset_database_list
        tool: String,
        /// Tool arguments as a JSON object
        #[arg(short, long, default_value = "{}")]
        args: String,
    },
    /// Register a database connection in Superset
    RegisterDb {
        /// Display name of the connection
        #[arg(long)]
        name: String,
        /// SQLAlchemy URI, e.g. trino://admin@trino:8080/iceberg
        #[arg(long)]
        uri: String,
        /// Engine name, e.g. trino
        #[arg(long)]
        engine: Option<String>,
    },
    /// Show configuration status
    Status,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Logs go to stderr, answers to stdout
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Init => {
            if let Err(e) = init_command().await {
                error!("Init failed: {:#}", e);
                std::process::exit(1);
            }
        }
        Commands::Ask { message } => {
            if let Err(e) = ask_command(message).await {
                error!("Error: {:#}", e);
                std::process::exit(1);
            }
        }
        Commands::Tools => tools_command(),
        Commands::Call { tool, args } => {
            if let Err(e) = call_command(tool, args).await {
                error!("Call failed: {:#}", e);
                std::process::exit(1);
            }
        }
        Commands::RegisterDb { name, uri, engine } => {
            if let Err(e) = register_db_command(name, uri, engine).await {
                error!("Register failed: {:#}", e);
                std::process::exit(1);
            }
        }
        Commands::Status => {
            if let Err(e) = status_command().await {
                error!("Status failed: {:#}", e);
                std::process::exit(1);
            }
        }
    }
}
