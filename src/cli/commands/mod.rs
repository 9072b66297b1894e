#[cfg(test)]
mod tests;

use crate::config::{Config, get_config_path, load_config, save_config};
use crate::utils::invisible::{decode_hidden_id, encode_hidden_id};
use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "reelay", version)]
#[command(about = "Relay Instagram DM reels, posts and captions into Discord")]
pub struct Cli {
    /// Config file (default: $REELAY_HOME/config.json or ~/.reelay/config.json)
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the webhook server
    Serve {
        #[arg(long)]
        host: Option<String>,
        #[arg(long)]
        port: Option<u16>,
    },
    /// Write a template config file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Load and validate the config, print a redacted summary
    Check,
    /// Encode a numeric id as an invisible tag
    Encode {
        id: String,
        /// Print code points as escapes instead of raw zero-width text
        #[arg(long)]
        escaped: bool,
    },
    /// Recover a hidden id from relayed message text
    Decode { text: String },
}

pub async fn run() -> Result<()> {
    execute(Cli::parse()).await
}

async fn execute(cli: Cli) -> Result<()> {
    let path = match cli.config {
        Some(path) => path,
        None => get_config_path()?,
    };

    match cli.command {
        Commands::Serve { host, port } => {
            let config = serve_config(&path, host, port)?;
            crate::gateway::start(&config).await
        }
        Commands::Init { force } => {
            init_config(&path, force)?;
            println!("Wrote template config to {}", path.display());
            println!("Fill in the discord and instagram sections, then run `reelay check`.");
            Ok(())
        }
        Commands::Check => super::doctor::check_command(&path),
        Commands::Encode { id, escaped } => {
            let encoded = encode_id(&id)?;
            if escaped {
                println!("{}", escape(&encoded));
            } else {
                println!("{}", encoded);
            }
            Ok(())
        }
        Commands::Decode { text } => {
            let id = decode_hidden_id(&text).context("no hidden id found in text")?;
            println!("{}", id);
            Ok(())
        }
    }
}

/// Load the config, apply command-line overrides and check it is complete.
fn serve_config(path: &Path, host: Option<String>, port: Option<u16>) -> Result<Config> {
    let mut config = load_config(Some(path))?;
    if let Some(host) = host {
        config.gateway.host = host;
    }
    if let Some(port) = port {
        config.gateway.port = port;
    }
    config
        .validate_for_serve()
        .context("config is not ready to serve")?;
    Ok(config)
}

fn init_config(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!(
            "{} already exists (use --force to overwrite)",
            path.display()
        );
    }
    if path.exists() {
        warn!("overwriting existing config at {}", path.display());
    }
    save_config(&Config::default(), Some(path))?;
    info!("created config at {}", path.display());
    Ok(())
}

fn encode_id(id: &str) -> Result<String> {
    if id.is_empty() || !id.bytes().all(|b| b.is_ascii_digit()) {
        bail!("id must be numeric, got {:?}", id);
    }
    Ok(encode_hidden_id(id))
}

fn escape(text: &str) -> String {
    text.chars().map(|c| c.escape_unicode().to_string()).collect()
}
