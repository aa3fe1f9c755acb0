//! Failure output: colored text on stderr, or a typed JSON error on stdout.

use colored::Colorize;
use fintrack_client::ClientError;
use fintrack_types::TypedError;
use std::process::ExitCode;

/// Exit status when the session ended and the user has to log in again.
const EXIT_SESSION_ENDED: u8 = 2;

/// The API error behind a command failure, if there is one.
pub fn typed_failure(err: &anyhow::Error) -> Option<TypedError> {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<ClientError>())
        .map(|e| TypedError::Auth(e.to_typed()))
}

fn ends_session(typed: Option<&TypedError>) -> bool {
    matches!(typed, Some(TypedError::Auth(auth)) if auth.ends_session())
}

fn exit_status(typed: Option<&TypedError>) -> u8 {
    if ends_session(typed) {
        EXIT_SESSION_ENDED
    } else {
        1
    }
}

fn json_payload(err: &anyhow::Error, typed: Option<&TypedError>) -> serde_json::Value {
    typed.and_then(|t| serde_json::to_value(t).ok()).unwrap_or_else(|| {
        serde_json::json!({ "domain": "Cli", "error": { "message": format!("{err:#}") } })
    })
}

pub fn report_failure(err: &anyhow::Error, json: bool) -> ExitCode {
    let typed = typed_failure(err);
    if json {
        println!("{}", json_payload(err, typed.as_ref()));
    } else {
        match &typed {
            Some(TypedError::Auth(auth)) if auth.is_user_facing() => {
                eprintln!("{} {auth}", "Error:".red().bold());
            }
            _ => eprintln!("{} {err:#}", "Error:".red().bold()),
        }
        if ends_session(typed.as_ref()) {
            eprintln!("{}", "Session ended. Run `fintrack login <email>` again.".yellow());
        }
    }
    ExitCode::from(exit_status(typed.as_ref()))
}
