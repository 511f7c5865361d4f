use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tokio::sync::mpsc;

use labhub::api::ApiClient;
use labhub::app::{App, AppEvent};
use labhub::config::Config;
use labhub::session::SessionStore;
use labhub::ui;

/// Get the config directory path (~/.config/labhub/)
fn get_config_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    Ok(PathBuf::from(home).join(".config").join("labhub"))
}

#[derive(Parser, Debug)]
#[command(name = "labhub", about = "Terminal client for the LabHub study-materials catalog")]
struct Args {
    /// Override the API base URL from the config file
    #[arg(long, value_name = "URL")]
    base_url: Option<String>,

    /// Clear the stored session and exit
    #[arg(long)]
    logout: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing for debug logging
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    // Set up config directory
    let config_dir = get_config_dir()?;
    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir).context("Failed to create config directory")?;
        println!("Created config directory: {}", config_dir.display());
    }

    // The directory holds the auth token, keep it user-only on Unix
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        match std::fs::metadata(&config_dir) {
            Ok(metadata) => {
                let mut perms = metadata.permissions();
                perms.set_mode(0o700);
                if let Err(e) = std::fs::set_permissions(&config_dir, perms) {
                    tracing::warn!(
                        path = %config_dir.display(),
                        error = %e,
                        "Failed to set config directory permissions to 0700"
                    );
                }
            }
            Err(e) => {
                tracing::warn!(
                    path = %config_dir.display(),
                    error = %e,
                    "Failed to read config directory metadata"
                );
            }
        }
    }

    let session = SessionStore::open(&config_dir);

    // Handle --logout flag
    if args.logout {
        session.clear().context("Failed to clear session")?;
        println!("Signed out.");
        return Ok(());
    }

    let mut config =
        Config::load(&config_dir.join("config.toml")).context("Failed to load configuration")?;
    if let Some(base_url) = args.base_url {
        config.api_base_url = base_url;
    }

    let api = ApiClient::new(&config.api_base_url, session.clone())
        .context("Failed to build HTTP client")?;

    // Create event channel for background tasks
    let (event_tx, event_rx) = mpsc::unbounded_channel::<AppEvent>();

    let mut app = App::new(config, api, session, event_tx);
    app.spawn_refresh();

    // Run the TUI
    ui::run(&mut app, event_rx).await?;

    println!("Goodbye!");
    Ok(())
}
