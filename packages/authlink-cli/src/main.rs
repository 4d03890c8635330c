//! authlink CLI - sign in from the terminal through your browser
//!
//! This binary can:
//! - Authenticate through a browser login, or with a pasted API token
//! - Show whether a credential is stored
//! - Remove the stored credential
//! - Show configuration paths and settings

use anyhow::Result;
use authlink_core::api::{self, ApiClient};
use authlink_core::auth::{self, Authenticator, LoginPrompt};
use authlink_core::store::{self, API_KEY};
use clap::{Parser, Subcommand, ValueEnum};
use tokio_util::sync::CancellationToken;

#[derive(Parser)]
#[command(name = "authlink")]
#[command(version)]
#[command(about = "Sign in to authlink from the terminal through your browser")]
#[command(long_about = "
authlink signs this machine in without ever asking for your password.
It opens a login page in your browser and waits until you have signed in
there, then stores the API token it receives.

Quick start:
  1. Sign in:        authlink auth
  2. Check status:   authlink status

In CI, pass a token directly: authlink auth <API_TOKEN>
")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format
    #[arg(short, long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output
    Text,
    /// JSON output for scripting
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Authenticate through the browser, or with an existing API token
    #[command(alias = "login")]
    Auth {
        /// API token to store instead of signing in through the browser
        token: Option<String>,
    },

    /// Show whether a credential is stored
    Status,

    /// Remove the stored credential
    #[command(alias = "unauth")]
    Logout,

    /// Show configuration paths and settings
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("authlink={},authlink_core={}", log_level, log_level).into()
            }),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Auth { ref token } => cmd_auth(&cli, token.as_deref()).await,
        Commands::Status => cmd_status(&cli),
        Commands::Logout => cmd_logout(&cli),
        Commands::Config => cmd_config(&cli),
    }
}

async fn cmd_auth(cli: &Cli, token: Option<&str>) -> Result<()> {
    let client = ApiClient::new(api::load_endpoint_config())?;
    let authenticator = Authenticator::with_client(client, store::default_store()?);

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Received Ctrl+C, cancelling authentication");
            ctrl_c.cancel();
        }
    });

    let format = cli.format;
    let on_prompt = move |prompt: &LoginPrompt| match format {
        OutputFormat::Text => println!("{}", prompt.message()),
        OutputFormat::Json => println!(
            "{}",
            serde_json::json!({
                "status": "awaiting_authorization",
                "login_url": prompt.login_url.as_str(),
                "environment": prompt.environment,
            })
        ),
    };

    match authenticator.authenticate(token, on_prompt, &cancel).await {
        Ok(message) => {
            match cli.format {
                OutputFormat::Text => println!("{}", message),
                OutputFormat::Json => {
                    println!("{}", serde_json::json!({ "status": "authenticated" }));
                }
            }
            Ok(())
        }
        Err(e) => {
            match cli.format {
                OutputFormat::Text => eprintln!("{}", e.user_message()),
                OutputFormat::Json => {
                    println!(
                        "{}",
                        serde_json::json!({
                            "status": "failed",
                            "error": e.user_message(),
                            "code": e.status(),
                        })
                    );
                }
            }
            std::process::exit(if matches!(e, auth::AuthError::Cancelled) { 130 } else { 2 });
        }
    }
}

fn cmd_status(cli: &Cli) -> Result<()> {
    let store = store::default_store()?;
    let authenticated = store.get(API_KEY)?.is_some();

    match cli.format {
        OutputFormat::Text => {
            if authenticated {
                println!("Status: Authenticated");
            } else {
                println!("Status: Not authenticated");
                println!();
                println!("Run 'authlink auth' to sign in.");
            }
            println!();
            println!("Storage: {}", store.describe());
        }
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "authenticated": authenticated,
                    "storage_info": store.describe(),
                })
            );
        }
    }

    Ok(())
}

fn cmd_logout(cli: &Cli) -> Result<()> {
    let store = store::default_store()?;

    if store.get(API_KEY)?.is_none() {
        match cli.format {
            OutputFormat::Text => println!("Not authenticated."),
            OutputFormat::Json => {
                println!("{}", serde_json::json!({ "status": "not_authenticated" }));
            }
        }
        return Ok(());
    }

    store.delete(API_KEY)?;

    match cli.format {
        OutputFormat::Text => println!("Signed out. The stored API token was removed."),
        OutputFormat::Json => {
            println!("{}", serde_json::json!({ "status": "signed_out" }));
        }
    }

    Ok(())
}

fn cmd_config(cli: &Cli) -> Result<()> {
    let endpoint = api::load_endpoint_config();
    let config_path = api::config::get_config_file_path_string();
    let storage = store::default_store()?.describe();
    let environment = auth::detect_environment();

    match cli.format {
        OutputFormat::Text => {
            println!("Configuration");
            println!("=============");
            println!();
            println!("Config file:      {}", config_path);
            println!("API endpoint:     {} (from {})", endpoint.api_url, endpoint.source);
            println!("Analytics:        {}", if endpoint.disable_analytics { "disabled" } else { "enabled" });
            println!("Credential store: {}", storage);
            println!("Environment:      {}", environment);
            println!();
            println!("Environment variables:");
            println!("  {} - Override API endpoint", api::config::ENV_API_URL);
            println!("  {} - Disable login URL analytics", api::config::ENV_DISABLE_ANALYTICS);
            println!("  {} - Integration reported on the login URL", api::config::ENV_INTEGRATION_NAME);
            println!();
            println!("Example config.toml:");
            println!();
            println!("{}", api::config::generate_example_config());
        }
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "config_file": config_path,
                    "api_url": endpoint.api_url,
                    "api_source": endpoint.source.to_string(),
                    "disable_analytics": endpoint.disable_analytics,
                    "credential_storage": storage,
                    "environment": environment,
                })
            );
        }
    }

    Ok(())
}
