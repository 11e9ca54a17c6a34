use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::AppError;
use crate::alert::{DEFAULT_CHIME, SoundMode, Tone};
use crate::notifier::{NotifierSettings, Seed};
use crate::page::PageLayout;

pub const ENV_CONFIG: &str = "TASKBELL_CONFIG";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    pub server_url: String,
    /// Override for the poll route, e.g. when the app is mounted under a prefix.
    #[serde(default)]
    pub poll_path: Option<String>,
    #[serde(default = "default_initial_delay")]
    pub initial_delay_ms: u64,
    #[serde(default = "default_interval")]
    pub interval_ms: u64,
    #[serde(default = "default_alert_delay")]
    pub alert_delay_ms: u64,
    /// Last-seen counts file. Defaults to `state.json` in the data dir.
    #[serde(default)]
    pub state_path: Option<PathBuf>,
    #[serde(default)]
    pub seed: Seed,
    #[serde(default)]
    pub page: PageLayout,
    #[serde(default)]
    pub sound: SoundMode,
    #[serde(default = "default_chime")]
    pub chime: Vec<Tone>,
}

fn default_initial_delay() -> u64 {
    500
}

fn default_interval() -> u64 {
    7000
}

fn default_alert_delay() -> u64 {
    200
}

fn default_chime() -> Vec<Tone> {
    DEFAULT_CHIME.to_vec()
}

impl ClientConfig {
    pub fn new(server_url: &str) -> Self {
        Self {
            server_url: normalize_server_url(server_url),
            poll_path: None,
            initial_delay_ms: default_initial_delay(),
            interval_ms: default_interval(),
            alert_delay_ms: default_alert_delay(),
            state_path: None,
            seed: Seed::default(),
            page: PageLayout::default(),
            sound: SoundMode::default(),
            chime: default_chime(),
        }
    }

    pub fn find_and_load(cli_value: Option<PathBuf>) -> Result<(PathBuf, Self), AppError> {
        let path = resolve_config_path(cli_value)?;
        let cfg = load_config(&path)?;
        Ok((path, cfg))
    }

    pub fn notifier_settings(&self) -> NotifierSettings {
        NotifierSettings {
            initial_delay: Duration::from_millis(self.initial_delay_ms),
            interval: Duration::from_millis(self.interval_ms),
            alert_delay: Duration::from_millis(self.alert_delay_ms),
            chime: self.chime.clone(),
        }
    }

    /// Configured state file, else the per-user data dir.
    pub fn resolved_state_path(&self) -> Option<PathBuf> {
        self.state_path.clone().or_else(default_state_path)
    }
}

pub fn resolve_config_path(cli_value: Option<PathBuf>) -> Result<PathBuf, AppError> {
    if let Some(p) = cli_value {
        return Ok(p);
    }
    if let Ok(p) = std::env::var(ENV_CONFIG) {
        return Ok(PathBuf::from(p));
    }
    default_config_path().ok_or_else(|| AppError::Config("could not determine config dir".into()))
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("dev", "taskbell", "taskbell")
}

pub fn default_config_path() -> Option<PathBuf> {
    Some(project_dirs()?.config_dir().join("client.yaml"))
}

pub fn default_state_path() -> Option<PathBuf> {
    Some(project_dirs()?.data_dir().join("state.json"))
}

pub fn load_config(path: &Path) -> Result<ClientConfig, AppError> {
    let data = std::fs::read_to_string(path)
        .map_err(|e| AppError::Config(format!("read {} failed: {e}", path.display())))?;
    let cfg = parse_config(&data)
        .map_err(|e| AppError::Config(format!("parse {} failed: {e}", path.display())))?;
    url::Url::parse(&cfg.server_url)
        .map_err(|e| AppError::Config(format!("invalid server_url {}: {e}", cfg.server_url)))?;
    Ok(cfg)
}

pub fn parse_config(data: &str) -> Result<ClientConfig, serde_yaml::Error> {
    let mut cfg: ClientConfig = serde_yaml::from_str(data)?;
    cfg.server_url = normalize_server_url(&cfg.server_url);
    Ok(cfg)
}

pub fn save_config(path: &Path, cfg: &ClientConfig) -> Result<(), AppError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).ok();
    }
    let data = serde_yaml::to_string(cfg)
        .map_err(|e| AppError::Config(format!("serialize config failed: {e}")))?;
    std::fs::write(path, data)
        .map_err(|e| AppError::Config(format!("write {} failed: {e}", path.display())))
}

pub fn normalize_server_url(input: &str) -> String {
    let trimmed = input.trim();
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.trim_end_matches('/').to_string()
    } else {
        format!("http://{}", trimmed.trim_end_matches('/'))
    }
}
