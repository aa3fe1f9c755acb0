use anyhow::{Context, Result};
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, Cell, Color, Table};
use fintrack_client::{ErrorCategory, SessionStore};

fn require_login(session: &SessionStore) -> Result<()> {
    if !session.is_authenticated() {
        anyhow::bail!("Not logged in. Run `fintrack login <email>` first.");
    }
    Ok(())
}

pub async fn login(session: &SessionStore, email: &str, password: &str) -> Result<()> {
    match session.login(email, password).await {
        Ok(_) => {
            let name = session.current_user().map(|u| u.username).unwrap_or_default();
            println!("{} {}", "Logged in".green(), name.bold());
            Ok(())
        }
        Err(e) if e.category() == ErrorCategory::Credential => Err(e).context("login rejected"),
        Err(e) => Err(e).context("login failed"),
    }
}

pub async fn register(
    session: &SessionStore,
    email: &str,
    username: &str,
    password: &str,
) -> Result<()> {
    let user = session.register(email, username, password).await.context("registration failed")?;
    println!("{} {} <{}>", "Registered".green(), user.username.bold(), user.email);
    Ok(())
}

pub async fn show_user(session: &SessionStore, json: bool) -> Result<()> {
    require_login(session)?;
    let user = session.ensure_user().await.context("could not load the current user")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&user)?);
        return Ok(());
    }
    println!("{}  {}", "Email:".cyan(), user.email);
    println!("{}  {}", "Username:".cyan(), user.username);
    if user.is_superuser {
        println!("{}", "Administrator".yellow());
    }
    Ok(())
}

pub async fn list_sessions(session: &SessionStore, json: bool) -> Result<()> {
    require_login(session)?;
    let sessions = session.fetch_sessions().await.context("listing sessions failed")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&sessions)?);
        return Ok(());
    }
    if sessions.is_empty() {
        println!("{}", "No active sessions.".yellow());
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Device", "IP", "Created", "Expires", ""]);
    for s in &sessions {
        let current = if s.is_current {
            Cell::new("current").fg(Color::Green)
        } else {
            Cell::new("")
        };
        table.add_row(vec![
            Cell::new(s.user_agent.as_deref().unwrap_or("-")),
            Cell::new(s.ip_address.as_deref().unwrap_or("-")),
            Cell::new(s.created_at.as_deref().unwrap_or("-")),
            Cell::new(s.expires_at.as_deref().unwrap_or("-")),
            current,
        ]);
    }
    println!("{table}");
    println!("\n{} sessions total", sessions.len());
    Ok(())
}

pub async fn logout(session: &SessionStore) -> Result<()> {
    session.logout().await;
    println!("{}", "Logged out".green());
    Ok(())
}

pub async fn logout_all(session: &SessionStore) -> Result<()> {
    require_login(session)?;
    session.logout_all_devices().await.context("revoking sessions failed")?;
    println!("{}", "All sessions revoked".green());
    Ok(())
}
