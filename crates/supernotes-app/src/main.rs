//! Startup check: load configuration, build the context, and report the
//! restored session.

use std::time::Duration;

use anyhow::Context;
use supernotes_app::{init_tracing, App, AppConfig, LogConfig};
use tracing::{info, warn};

const RESTORE_TIMEOUT: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env().context("Failed to load configuration")?;
    let _file_guard = init_tracing(&LogConfig::from_env())?;

    let app = App::build(config).context("Failed to build application context")?;
    let _listeners = app.start();

    let restored = tokio::time::timeout(RESTORE_TIMEOUT, async {
        loop {
            let state = app.session.state().await;
            if !state.loading {
                return state;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    })
    .await;

    match restored {
        Ok(state) => info!(
            subsystem = "app",
            backend = %app.backend,
            status = ?state.status,
            user_id = state.user.as_ref().map(|u| u.id.as_str()).unwrap_or_default(),
            "Session restored"
        ),
        Err(_) => warn!(
            subsystem = "app",
            timeout_secs = RESTORE_TIMEOUT.as_secs(),
            "Session did not settle before timeout"
        ),
    }

    Ok(())
}
