use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "fintrack",
    about = "FinTrack session client",
    version = env!("CARGO_PKG_VERSION"),
    author,
    propagate_version = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(long, env = "FINTRACK_API_URL", help = "API base URL")]
    pub api_url: Option<String>,

    #[arg(long, env = "FINTRACK_CONFIG", help = "Path to a JSON client config")]
    pub config: Option<PathBuf>,

    #[arg(long, env = "FINTRACK_TOKEN_PATH", help = "Where the access token is stored")]
    pub token_path: Option<PathBuf>,

    #[arg(short, long, env = "RUST_LOG", default_value = "info")]
    pub log_level: String,

    #[arg(long, help = "Emit tracing output as JSON lines")]
    pub json_logs: bool,

    #[arg(long, help = "Print failures as a typed JSON error on stdout")]
    pub json_errors: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Log in and store the access token")]
    Login {
        #[arg(help = "Account email")]
        email: String,

        #[arg(long, env = "FINTRACK_PASSWORD", hide_env_values = true)]
        password: String,
    },

    #[command(about = "Create an account")]
    Register {
        email: String,
        username: String,

        #[arg(long, env = "FINTRACK_PASSWORD", hide_env_values = true)]
        password: String,
    },

    #[command(about = "Show the logged-in user")]
    Me {
        #[arg(short, long, help = "Output as JSON")]
        json: bool,
    },

    #[command(about = "List active sessions")]
    Sessions {
        #[arg(short, long, help = "Output as JSON")]
        json: bool,
    },

    #[command(about = "Log out of this device")]
    Logout,

    #[command(about = "Revoke every session of this account")]
    LogoutAll,
}
