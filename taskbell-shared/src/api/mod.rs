use serde::{Deserialize, Serialize};

pub mod endpoints;
#[cfg(feature = "rest-client")]
pub mod rest;

pub const NOTIFICATIONS_POLL_PATH: &str = "/notifications/poll";
pub const LOGIN_PATH: &str = "/login";

// Notifications poll. Missing fields read as zero / empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollResp {
    #[serde(default)]
    pub messages: u64,
    #[serde(default)]
    pub approvals: u64,
    #[serde(default)]
    pub pending_task_ids: Vec<i64>,
}

// Login form body
#[derive(Debug, Serialize, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

/// Session cookie captured from a successful login, in `Cookie` header form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionCookie(pub String);

impl SessionCookie {
    pub fn as_header(&self) -> &str {
        &self.0
    }

    /// Build a `Cookie` header value from raw `Set-Cookie` values, keeping
    /// only the `name=value` part of each.
    pub fn from_set_cookie<'a, I>(values: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let pairs: Vec<&str> = values
            .into_iter()
            .filter_map(|v| v.split(';').next())
            .map(str::trim)
            .filter(|p| p.contains('=') && !p.starts_with('='))
            .collect();
        if pairs.is_empty() {
            None
        } else {
            Some(Self(pairs.join("; ")))
        }
    }
}
