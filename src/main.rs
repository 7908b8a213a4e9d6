use std::io::Write;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use config::{Cli, Command};
use datamodel::Store;

#[cfg(test)]
mod client;
mod config;
mod datamodel;
mod error;
mod logging;
mod server;

#[cfg(test)]
mod tests;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose, cli.log_json);

    match cli.command {
        Some(Command::Schema { output }) => export_schema(output),
        None => {
            let store = if cli.serve.empty {
                Store::default()
            } else {
                Store::seeded()
            };
            server::serve(cli.serve.socket_addr(), store).await?;
            Ok(())
        }
    }
}

fn export_schema(output: Option<std::path::PathBuf>) -> Result<()> {
    let sdl = server::build_schema(Store::default()).sdl();

    match output {
        Some(path) => {
            std::fs::write(&path, sdl)
                .with_context(|| format!("failed to write schema to {}", path.display()))?;
            info!(path = %path.display(), "schema written");
        }
        None => std::io::stdout().write_all(sdl.as_bytes())?,
    }
    Ok(())
}
