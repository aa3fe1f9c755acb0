//! Global error capture: panics, failed background tasks, process exit.

use super::{Context, Telemetry};
use serde_json::json;
use std::future::Future;
use tokio::task::JoinHandle;

impl Telemetry {
    /// Report every panic as an error entry, then defer to the previous hook.
    pub fn install_panic_hook(&self) {
        let telemetry = self.clone();
        let previous = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            let message = if let Some(s) = info.payload().downcast_ref::<&str>() {
                (*s).to_string()
            } else if let Some(s) = info.payload().downcast_ref::<String>() {
                s.clone()
            } else {
                "panic".to_string()
            };
            let mut context = Context::new();
            if let Some(location) = info.location() {
                context.insert("filename".to_string(), json!(location.file()));
                context.insert("lineno".to_string(), json!(location.line()));
                context.insert("colno".to_string(), json!(location.column()));
            }
            context.insert("type".to_string(), json!("panic"));
            telemetry.error(message, Some(context));
            previous(info);
        }));
    }

    /// Spawn a fallible task; an `Err` or a panic is logged instead of vanishing.
    pub fn spawn_monitored<F, E>(&self, name: &str, task: F) -> JoinHandle<()>
    where
        F: Future<Output = Result<(), E>> + Send + 'static,
        E: std::fmt::Display + Send + 'static,
    {
        let telemetry = self.clone();
        let name = name.to_string();
        let inner = tokio::spawn(task);
        tokio::spawn(async move {
            let reason = match inner.await {
                Ok(Ok(())) => return,
                Ok(Err(e)) => e.to_string(),
                Err(e) if e.is_panic() => format!("task panicked: {e}"),
                Err(e) => format!("task cancelled: {e}"),
            };
            let mut context = Context::new();
            context.insert("type".to_string(), json!("unhandledrejection"));
            context.insert("task".to_string(), json!(name));
            telemetry.error(format!("Unhandled task failure: {reason}"), Some(context));
        })
    }

    /// Wait for Ctrl-C, then drain the buffer.
    pub async fn flush_on_ctrl_c(&self) -> std::io::Result<()> {
        tokio::signal::ctrl_c().await?;
        tracing::info!("Interrupt received, flushing telemetry");
        self.shutdown().await;
        Ok(())
    }
}
