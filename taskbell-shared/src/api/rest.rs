//! Minimal REST client helpers for the notifications endpoint.

use super::endpoints as ep;
use super::*;
use once_cell::sync::Lazy;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum RestError {
    #[error("http: {0}")]
    Http(String),
    #[error("status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("serde: {0}")]
    Serde(String),
    #[error("login accepted but no session cookie was set")]
    NoSession,
}

static HTTP_CLIENT: Lazy<Result<reqwest::Client, String>> = Lazy::new(|| {
    reqwest::Client::builder()
        .tcp_keepalive(Some(Duration::from_secs(60)))
        .pool_max_idle_per_host(2)
        .pool_idle_timeout(Duration::from_secs(60))
        // A poll must finish well within one tick.
        .timeout(Duration::from_secs(30))
        // An expired session answers with a redirect to the login page; it
        // must surface as a non-success status, not as the login HTML.
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .map_err(|e| e.to_string())
});

fn mk_client() -> Result<reqwest::Client, RestError> {
    (*HTTP_CLIENT).clone().map_err(RestError::Http)
}

async fn handle_json<T: for<'de> serde::Deserialize<'de>>(
    res: reqwest::Response,
) -> Result<T, RestError> {
    let status = res.status();
    if !status.is_success() {
        let body = res.text().await.unwrap_or_default();
        return Err(RestError::Status {
            status: status.as_u16(),
            body,
        });
    }
    res.json::<T>()
        .await
        .map_err(|e| RestError::Serde(e.to_string()))
}

pub async fn notifications_poll(
    base: &str,
    path: Option<&str>,
    session: Option<&SessionCookie>,
) -> Result<PollResp, RestError> {
    let client = mk_client()?;
    let url = ep::notifications_poll(base, path);
    let mut req = client.get(url);
    if let Some(cookie) = session {
        req = req.header(reqwest::header::COOKIE, cookie.as_header());
    }
    let res = req
        .send()
        .await
        .map_err(|e| RestError::Http(e.to_string()))?;
    handle_json(res).await
}

/// Submit the login form. The server answers a successful login with a
/// redirect carrying the session cookie; a re-rendered form (200) means the
/// credentials were rejected.
pub async fn login(base: &str, form: &LoginForm) -> Result<SessionCookie, RestError> {
    let client = mk_client()?;
    let url = ep::login(base);
    let res = client
        .post(url)
        .form(form)
        .send()
        .await
        .map_err(|e| RestError::Http(e.to_string()))?;
    let status = res.status();
    if !status.is_redirection() {
        let body = res.text().await.unwrap_or_default();
        return Err(RestError::Status {
            status: status.as_u16(),
            body,
        });
    }
    let values: Vec<&str> = res
        .headers()
        .get_all(reqwest::header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .collect();
    SessionCookie::from_set_cookie(values).ok_or(RestError::NoSession)
}
