use std::io::{self, Write};
use std::path::PathBuf;

use taskbell_shared::api::{self, LoginForm};
use tracing::info;

use crate::AppError;
use crate::config::{ClientConfig, load_config, resolve_config_path, save_config};

pub async fn login(
    server_arg: Option<String>,
    username_arg: Option<String>,
    cfg_path_opt: Option<PathBuf>,
) -> Result<(), AppError> {
    // Resolve server url: CLI arg > config if present > prompt
    let existing = resolve_config_path(cfg_path_opt.clone())
        .ok()
        .and_then(|p| load_config(&p).ok());
    let server_url = match (server_arg, &existing) {
        (Some(s), _) => crate::config::normalize_server_url(&s),
        (None, Some(cfg)) => cfg.server_url.clone(),
        (None, None) => {
            crate::config::normalize_server_url(&prompt("Server URL (e.g., 127.0.0.1:5000): ")?)
        }
    };

    let username = match username_arg {
        Some(u) => u,
        None => prompt("Username: ")?,
    };
    let password = rpassword::prompt_password("Password: ")
        .map_err(|e| AppError::Io(std::io::Error::other(e.to_string())))?;

    let session = api::rest::login(&server_url, &LoginForm { username, password })
        .await
        .map_err(|e| AppError::Http(format!("login failed: {e}")))?;

    let entry = crate::keyring_entry(&server_url)?;
    entry
        .set_password(session.as_header())
        .map_err(|e| AppError::Keyring(e.to_string()))?;
    info!(server=%server_url, "session stored in keyring");

    if existing.is_none() {
        let path = resolve_config_path(cfg_path_opt)?;
        save_config(&path, &ClientConfig::new(&server_url))?;
        println!(
            "Saved session in keyring for {} and wrote config to {}",
            server_url,
            path.display()
        );
    } else {
        println!("Saved session in keyring for {}", server_url);
    }
    Ok(())
}

fn prompt(msg: &str) -> Result<String, AppError> {
    print!("{}", msg);
    io::stdout().flush().ok();
    let mut buf = String::new();
    io::stdin().read_line(&mut buf).map_err(AppError::Io)?;
    Ok(buf.trim().to_string())
}
