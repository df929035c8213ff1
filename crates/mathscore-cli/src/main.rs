//! mathscore CLI — serve the prediction pipeline or drive it from a terminal.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

mod commands;

use commands::FormArgs;

#[derive(Parser)]
#[command(name = "mathscore", version, about = "Student math score prediction service")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP service
    Serve {
        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,

        /// Address to bind (overrides config)
        #[arg(long)]
        host: Option<String>,

        /// Port to bind (overrides config and PORT)
        #[arg(long)]
        port: Option<u16>,
    },

    /// Scale and predict a single form locally
    Predict {
        #[command(flatten)]
        form: FormArgs,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,

        /// Print the merged result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Submit a form to a running server
    Submit {
        #[command(flatten)]
        form: FormArgs,

        /// Server base URL
        #[arg(long, default_value = "http://127.0.0.1:5000")]
        server: String,

        /// Print the response as JSON
        #[arg(long)]
        json: bool,
    },

    /// Create a starter config
    Init,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("mathscore=info".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Serve { config, host, port } => commands::serve::execute(config, host, port).await,
        Commands::Predict { form, config, json } => {
            commands::predict::execute(form, config, json).await
        }
        Commands::Submit { form, server, json } => {
            commands::submit::execute(form, server, json).await
        }
        Commands::Init => commands::init::execute(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
