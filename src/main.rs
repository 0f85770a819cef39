//! Command-line client for the CRM API.
//!
//! Issues one request through the shared request layer and prints the
//! decoded response as JSON.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use serde_json::Value;

use crm_client::config::read_config;
use crm_client::observability::logging::init_logging;
use crm_client::ApiClient;

#[derive(Parser)]
#[command(name = "crm-client")]
#[command(about = "Command-line client for the CRM API", long_about = None)]
struct Cli {
    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the API base URL.
    #[arg(short, long)]
    base_url: Option<String>,

    /// Print the decoded body without envelope validation.
    #[arg(long, global = true)]
    raw: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// GET a path
    Get { path: String },
    /// POST a JSON body to a path
    Post { path: String, body: String },
    /// PUT a JSON body to a path
    Put { path: String, body: String },
    /// PATCH a JSON body to a path
    Patch { path: String, body: String },
    /// DELETE a path
    Delete { path: String },
    /// Store a bearer token for later requests
    Login { token: String },
    /// Forget the stored session
    Logout,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = read_config(cli.config.as_deref())?;
    if let Some(base_url) = cli.base_url {
        config.api.base_url = Some(base_url);
    }
    if config.auth.store_path.is_none() {
        config.auth.store_path = Some(".crm-session.json".to_string());
    }
    init_logging(&config.observability.log_level);

    let client = ApiClient::builder(config).build()?;

    let output: Value = match cli.command {
        Commands::Get { path } if cli.raw => client.raw_get(&path).await?,
        Commands::Get { path } => serde_json::to_value(client.get::<Value>(&path).await?)?,
        Commands::Post { path, body } if cli.raw => {
            let body: Value = serde_json::from_str(&body)?;
            client.raw_post(&path, &body).await?
        }
        Commands::Post { path, body } => {
            let body: Value = serde_json::from_str(&body)?;
            serde_json::to_value(client.post::<_, Value>(&path, &body).await?)?
        }
        Commands::Put { path, body } => {
            let body: Value = serde_json::from_str(&body)?;
            serde_json::to_value(client.put::<_, Value>(&path, &body).await?)?
        }
        Commands::Patch { path, body } => {
            let body: Value = serde_json::from_str(&body)?;
            serde_json::to_value(client.patch::<_, Value>(&path, &body).await?)?
        }
        Commands::Delete { path } => serde_json::to_value(client.delete::<Value>(&path).await?)?,
        Commands::Login { token } => {
            client.auth().store_token(&token);
            tracing::info!("Token stored");
            Value::Null
        }
        Commands::Logout => {
            client.auth().clear_session();
            tracing::info!("Session cleared");
            Value::Null
        }
    };

    if !output.is_null() {
        println!("{}", serde_json::to_string_pretty(&output)?);
    }

    client.telemetry().flush().await;
    Ok(())
}
