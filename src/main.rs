mod cli;
mod server;
mod tools;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use ekphrasis::config::EkphrasisConfig;

#[derive(Parser)]
#[command(name = "ekphrasis", version, about = "Image-to-poem retrieval and latent-space MCP server")]
struct Cli {
    /// Config file (defaults to ~/.ekphrasis/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the MCP server (transport from config: stdio or sse)
    Serve,
    /// Print the reference poems nearest to a narrative
    Retrieve {
        narrative: String,
        #[arg(long)]
        top_k: Option<usize>,
    },
    /// Project a narrative into the 3-D latent map
    Visualize {
        narrative: String,
        /// Print the full result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Describe an image as a scene narrative
    Caption { image: PathBuf },
    /// Write a poem for an image
    Compose {
        image: PathBuf,
        /// Creativity, 0.1-1.0
        #[arg(long)]
        temperature: Option<f32>,
        /// Also read the poem aloud into this MP3 file
        #[arg(long)]
        audio: Option<PathBuf>,
    },
    /// Load pre-embedded records (JSON array) into the local index
    Import { file: PathBuf },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => EkphrasisConfig::load_from(path)?,
        None => EkphrasisConfig::load()?,
    };

    // Log to stderr so stdout stays clean for MCP JSON-RPC.
    let filter = EnvFilter::try_new(&config.server.log_level)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Serve => match config.server.transport.as_str() {
            "stdio" => server::serve_stdio(config).await?,
            "sse" | "http" => server::serve_sse(config).await?,
            other => anyhow::bail!("unknown transport: {other}. Supported: stdio, sse"),
        },
        Command::Retrieve { narrative, top_k } => {
            cli::retrieve(&config, &narrative, top_k).await?;
        }
        Command::Visualize { narrative, json } => {
            cli::visualize(&config, &narrative, json).await?;
        }
        Command::Caption { image } => {
            cli::caption(&config, &image).await?;
        }
        Command::Compose {
            image,
            temperature,
            audio,
        } => {
            cli::compose(&config, &image, temperature, audio.as_deref()).await?;
        }
        Command::Import { file } => {
            cli::import(&config, &file).await?;
        }
    }

    Ok(())
}
