//! moca CLI — scores MoCA administrations from session scripts.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "moca", version, about = "Montreal Cognitive Assessment scoring engine")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the task catalog
    Tasks,

    /// Validate session scripts without scoring
    Validate {
        /// Path to a .toml session script or a directory of scripts
        #[arg(long)]
        session: PathBuf,
    },

    /// Score a session script
    Run {
        /// Path to the .toml session script
        #[arg(long)]
        session: PathBuf,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output directory (default from config)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Output format: json, html, markdown, all
        #[arg(long, default_value = "json")]
        format: String,

        /// Date used for orientation scoring (YYYY-MM-DD)
        #[arg(long)]
        today: Option<String>,

        /// Max concurrent drawing evaluations (default from config)
        #[arg(long)]
        parallelism: Option<usize>,
    },

    /// Recompute a report from a saved session
    Report {
        /// Session JSON written by `moca run`
        #[arg(long)]
        input: PathBuf,

        /// Output format: text, json, markdown, html
        #[arg(long, default_value = "text")]
        format: String,
    },

    /// Create starter config and example session script
    Init,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("moca=info")),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Tasks => commands::tasks::execute(),
        Commands::Validate { session } => commands::validate::execute(session),
        Commands::Run {
            session,
            config,
            output,
            format,
            today,
            parallelism,
        } => commands::run::execute(session, config, output, format, today, parallelism).await,
        Commands::Report { input, format } => commands::report::execute(input, format),
        Commands::Init => commands::init::execute(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
