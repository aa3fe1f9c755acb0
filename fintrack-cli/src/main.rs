//! FinTrack command-line client.

#![allow(clippy::print_stdout, reason = "CLI tool outputs to stdout")]
#![allow(clippy::print_stderr, reason = "failures are reported on stderr")]

use anyhow::{Context, Result};
use clap::Parser;
use fintrack_client::{
    AuthenticatedClient, ClientConfig, FileTokenStorage, SessionStore, Telemetry,
    TelemetryConfig, TokenStore,
};
use std::process::ExitCode;
use std::sync::Arc;

mod cli;
mod commands;
mod report;

use cli::{Cli, Commands};

fn load_config(cli: &Cli) -> Result<ClientConfig> {
    let mut config = match &cli.config {
        Some(path) => ClientConfig::load(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => ClientConfig::from_env().context("reading config from environment")?,
    };
    if let Some(url) = &cli.api_url {
        config.base_url = url.clone();
    }
    if let Some(path) = &cli.token_path {
        config.token_path = Some(path.clone());
    }
    config.validate()?;
    Ok(config)
}

async fn run(command: Commands, session: &SessionStore) -> Result<()> {
    match command {
        Commands::Login { email, password } => commands::login(session, &email, &password).await,
        Commands::Register { email, username, password } => {
            commands::register(session, &email, &username, &password).await
        }
        Commands::Me { json } => commands::show_user(session, json).await,
        Commands::Sessions { json } => commands::list_sessions(session, json).await,
        Commands::Logout => commands::logout(session).await,
        Commands::LogoutAll => commands::logout_all(session).await,
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    if cli.json_logs {
        fintrack_client::logger::init_tracing_json(&cli.log_level);
    } else {
        fintrack_client::logger::init_tracing(&cli.log_level);
    }

    let config = load_config(&cli)?;
    let token_path = config
        .token_path
        .clone()
        .or_else(ClientConfig::default_token_path)
        .context("no token path configured and no data directory available")?;
    tracing::debug!("Token file: {}", token_path.display());

    let tokens = Arc::new(TokenStore::new(Arc::new(FileTokenStorage::new(token_path))));
    let telemetry = Telemetry::builder(TelemetryConfig::for_environment(config.environment))
        .base_url(config.base_url.clone())
        .token_store(tokens.clone())
        .build()?;
    telemetry.install_panic_hook();

    let client = AuthenticatedClient::new(&config, tokens)?
        .with_request_id_observer(telemetry.request_id_observer());
    let session = SessionStore::new(Arc::new(client));

    let json_errors = cli.json_errors;
    let result = tokio::select! {
        result = run(cli.command, &session) => result,
        interrupted = telemetry.flush_on_ctrl_c() => match interrupted {
            Ok(()) => Err(anyhow::anyhow!("Interrupted")),
            Err(e) => Err(e).context("listening for Ctrl-C"),
        },
    };

    let status = match &result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            telemetry.error(format!("Command failed: {e:#}"), None);
            report::report_failure(e, json_errors)
        }
    };
    telemetry.shutdown().await;
    Ok(status)
}
