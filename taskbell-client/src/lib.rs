use std::sync::Arc;
use std::time::Duration;

use taskbell_shared::api::SessionCookie;
use tracing::{info, warn};

pub mod alert;
pub mod cli;
pub mod config;
pub mod login;
pub mod notifier;
pub mod page;
pub mod poller;
pub mod store;

pub use cli::{Cli, Command};
pub use config::{ClientConfig, load_config, resolve_config_path};
pub use notifier::{Notifier, NotifierHandle, NotifierSettings, PollOutcome, Seed};

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("config error: {0}")]
    Config(String),
    #[error("http error: {0}")]
    Http(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("keyring error: {0}")]
    Keyring(String),
}

fn init_tracing() {
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}

pub(crate) fn keyring_entry(server_url: &str) -> Result<keyring::Entry, AppError> {
    let service = "taskbell-client";
    keyring::Entry::new(service, &crate::config::normalize_server_url(server_url))
        .map_err(|e| AppError::Keyring(e.to_string()))
}

fn read_session_from_keyring(server_url: &str) -> Result<SessionCookie, AppError> {
    let entry = keyring_entry(server_url)?;
    entry
        .get_password()
        .map(SessionCookie)
        .map_err(|e| AppError::Keyring(e.to_string()))
}

/// Durable store at the configured path, or a process-local one when no data
/// dir can be determined.
pub fn open_store(cfg: &ClientConfig) -> store::NotificationStore {
    let backend: Box<dyn store::KeyValueStore> = match cfg.resolved_state_path() {
        Some(path) => {
            info!(path=?path, "last-seen state file");
            Box::new(store::FileStore::new(path))
        }
        None => {
            warn!("could not determine data dir; last-seen counts will not persist");
            Box::new(store::MemoryStore::new())
        }
    };
    store::NotificationStore::new(backend)
}

pub async fn run(cli: Cli) -> Result<(), AppError> {
    init_tracing();

    if let Some(cmd) = &cli.command {
        match cmd {
            Command::Login { server, username } => {
                return login::login(server.clone(), username.clone(), cli.config.clone()).await;
            }
            Command::Status => {
                let (_, cfg) = ClientConfig::find_and_load(cli.config.clone())?;
                let (messages, approvals) = open_store(&cfg).read();
                println!("last seen: {messages} messages, {approvals} approvals");
                return Ok(());
            }
        }
    }

    let (cfg_path, cfg) = ClientConfig::find_and_load(cli.config)?;
    info!(path=?cfg_path, "loaded config");

    let session = match read_session_from_keyring(&cfg.server_url) {
        Ok(s) => Some(s),
        Err(e) => {
            warn!(error=%e, "no stored session; polls will be unauthenticated");
            None
        }
    };

    let source = Arc::new(poller::HttpCountsSource::new(
        &cfg.server_url,
        cfg.poll_path.clone(),
        session,
    ));
    let settings = cfg.notifier_settings();
    let alert_wait = settings.alert_delay + Duration::from_secs(1);
    let notifier = Notifier::new(
        open_store(&cfg),
        page::Page::from_layout(&cfg.page),
        source,
        alert::Alerter::new(alert::backend_for(cfg.sound)),
        settings,
        cfg.seed,
    );

    if cli.once {
        let outcome = notifier.poll_once().await;
        if outcome == (PollOutcome::Updated { alerted: true }) {
            // Let the chime finish before the runtime goes away.
            tokio::time::sleep(alert_wait).await;
        }
        println!("{}", notifier.page().await);
        return match outcome {
            PollOutcome::Skipped => Err(AppError::Http("poll failed".into())),
            PollOutcome::Updated { .. } => Ok(()),
        };
    }

    let handle = notifier.spawn();
    shutdown_signal().await;
    info!("shutdown signal received; stopping poller");
    handle.shutdown().await;
    Ok(())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        let (mut sigint, mut sigterm) = match (
            signal(SignalKind::interrupt()),
            signal(SignalKind::terminate()),
        ) {
            (Ok(i), Ok(t)) => (i, t),
            (Err(e), _) | (_, Err(e)) => {
                warn!(error=%e, "signal handlers unavailable; falling back to Ctrl+C");
                let _ = tokio::signal::ctrl_c().await;
                return;
            }
        };
        tokio::select! {
            _ = sigint.recv() => {
                info!("shutdown: received SIGINT");
            }
            _ = sigterm.recv() => {
                info!("shutdown: received SIGTERM");
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
        info!("shutdown: received Ctrl+C");
    }
}
