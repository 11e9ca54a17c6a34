use std::collections::HashSet;

use async_trait::async_trait;
use taskbell_shared::api::{self, PollResp, SessionCookie, rest::RestError};

#[derive(Debug, thiserror::Error)]
pub enum PollError {
    #[error("poll request failed: {0}")]
    Rest(#[from] RestError),
}

/// Counts reported by one successful poll.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PollResult {
    pub messages: u64,
    pub approvals: u64,
    pub pending_task_ids: HashSet<i64>,
}

impl From<PollResp> for PollResult {
    fn from(resp: PollResp) -> Self {
        Self {
            messages: resp.messages,
            approvals: resp.approvals,
            pending_task_ids: resp.pending_task_ids.into_iter().collect(),
        }
    }
}

/// Where fresh counts come from.
#[async_trait]
pub trait CountsSource: Send + Sync {
    async fn fetch(&self) -> Result<PollResult, PollError>;
}

/// Polls the server's notifications endpoint within the logged in session.
#[derive(Debug, Clone)]
pub struct HttpCountsSource {
    base: String,
    path: Option<String>,
    session: Option<SessionCookie>,
}

impl HttpCountsSource {
    pub fn new(base: &str, path: Option<String>, session: Option<SessionCookie>) -> Self {
        Self {
            base: crate::config::normalize_server_url(base),
            path,
            session,
        }
    }
}

#[async_trait]
impl CountsSource for HttpCountsSource {
    async fn fetch(&self) -> Result<PollResult, PollError> {
        let resp =
            api::rest::notifications_poll(&self.base, self.path.as_deref(), self.session.as_ref())
                .await?;
        Ok(resp.into())
    }
}
