//! Reconciliation loop tying the store, the page and the alerter together.
//!
//! One [`Notifier`] exists per agent. Its last-seen mirrors, page and store
//! sit behind a single async mutex; the request for each tick runs outside
//! that lock and ticks are never serialized against each other, so two
//! overlapping polls resolve as last-write-wins.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use taskbell_shared::api::rest::RestError;
use tokio::sync::Mutex;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::alert::{Alerter, DEFAULT_CHIME, Tone};
use crate::page::Page;
use crate::poller::{CountsSource, PollError, PollResult};
use crate::store::NotificationStore;

pub const INITIAL_POLL_DELAY: Duration = Duration::from_millis(500);
pub const POLL_INTERVAL: Duration = Duration::from_millis(7000);
pub const ALERT_DELAY: Duration = Duration::from_millis(200);
/// Floor for configured intervals so a zero value cannot spin.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Counts embedded in the page at load time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Seed {
    #[serde(default)]
    pub messages: u64,
    #[serde(default)]
    pub approvals: u64,
}

#[derive(Debug, Clone)]
pub struct NotifierSettings {
    pub initial_delay: Duration,
    pub interval: Duration,
    pub alert_delay: Duration,
    pub chime: Vec<Tone>,
}

impl Default for NotifierSettings {
    fn default() -> Self {
        Self {
            initial_delay: INITIAL_POLL_DELAY,
            interval: POLL_INTERVAL,
            alert_delay: ALERT_DELAY,
            chime: DEFAULT_CHIME.to_vec(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// The request failed; nothing changed.
    Skipped,
    Updated { alerted: bool },
}

struct State {
    store: NotificationStore,
    last_messages: u64,
    last_approvals: u64,
    page: Page,
    last_logged: String,
}

impl State {
    /// Compare, persist, mirror, render. Returns whether the chime is due.
    fn reconcile(&mut self, fresh: &PollResult) -> bool {
        let (seen_messages, seen_approvals) = self.store.read();
        // Approval increases only count on pages that show approvals.
        let alert = fresh.messages > seen_messages
            || (self.page.has_approvals_link() && fresh.approvals > seen_approvals);

        self.store.write(fresh.messages, fresh.approvals);
        self.last_messages = fresh.messages;
        self.last_approvals = fresh.approvals;

        self.page.render_header(fresh.messages, fresh.approvals);
        self.page.render_cards(&fresh.pending_task_ids, self.last_messages);
        self.log_page();
        alert
    }

    fn log_page(&mut self) {
        let now = self.page.to_string();
        if now != self.last_logged {
            info!(page=%now, "indicators updated");
            self.last_logged = now;
        }
    }
}

#[derive(Clone)]
pub struct Notifier {
    state: Arc<Mutex<State>>,
    alerter: Arc<Mutex<Alerter>>,
    source: Arc<dyn CountsSource>,
    settings: Arc<NotifierSettings>,
    cancel: CancellationToken,
}

impl Notifier {
    /// Seed the store, prime the mirrors and paint the initial card badges.
    pub fn new(
        mut store: NotificationStore,
        mut page: Page,
        source: Arc<dyn CountsSource>,
        alerter: Alerter,
        settings: NotifierSettings,
        seed: Seed,
    ) -> Self {
        // Mirrors start from the page's own counts; an unreachable store
        // leaves them at zero.
        let reachable = store.seed_if_absent(seed.messages, seed.approvals);
        let (last_messages, last_approvals) = if reachable {
            (seed.messages, seed.approvals)
        } else {
            (0, 0)
        };
        page.render_initial_card_badges(last_messages);
        let last_logged = page.to_string();
        debug!(page=%last_logged, last_messages, last_approvals, "notifier initialized");
        Self {
            state: Arc::new(Mutex::new(State {
                store,
                last_messages,
                last_approvals,
                page,
                last_logged,
            })),
            alerter: Arc::new(Mutex::new(alerter)),
            source,
            settings: Arc::new(settings),
            cancel: CancellationToken::new(),
        }
    }

    /// One tick: fetch, reconcile, render and, if counts grew, queue the chime.
    ///
    /// A failed fetch is the network collapse point: it is logged and the
    /// tick is dropped without touching any state.
    pub async fn poll_once(&self) -> PollOutcome {
        let fresh = match self.source.fetch().await {
            Ok(r) => r,
            Err(e) => {
                log_poll_failure(&e);
                return PollOutcome::Skipped;
            }
        };
        let alerted = self.state.lock().await.reconcile(&fresh);
        if alerted {
            self.schedule_alert();
        }
        PollOutcome::Updated { alerted }
    }

    fn schedule_alert(&self) {
        let alerter = self.alerter.clone();
        let settings = self.settings.clone();
        let cancel = self.cancel.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => {}
                _ = tokio::time::sleep(settings.alert_delay) => {
                    alerter.lock().await.play_alert(&settings.chime).await;
                }
            }
        });
    }

    /// In-memory last-seen `(messages, approvals)`.
    pub async fn last_seen(&self) -> (u64, u64) {
        let st = self.state.lock().await;
        (st.last_messages, st.last_approvals)
    }

    /// Persisted last-seen `(messages, approvals)`.
    pub async fn stored(&self) -> (u64, u64) {
        self.state.lock().await.store.read()
    }

    pub async fn page(&self) -> Page {
        self.state.lock().await.page.clone()
    }

    /// Start the schedule: one poll after the initial delay, then one every
    /// interval until [`NotifierHandle::stop`].
    pub fn spawn(&self) -> NotifierHandle {
        let me = self.clone();
        let task = tokio::spawn(async move { me.run_schedule().await });
        NotifierHandle {
            cancel: self.cancel.clone(),
            task,
        }
    }

    async fn run_schedule(self) {
        let start = Instant::now();
        let initial_delay = self.settings.initial_delay;
        let interval = self.settings.interval.max(MIN_POLL_INTERVAL);
        let first = tokio::time::sleep_until(start + initial_delay);
        tokio::pin!(first);
        let mut first_done = false;
        let mut ticker = tokio::time::interval_at(start + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(
            initial_ms = initial_delay.as_millis() as u64,
            interval_ms = interval.as_millis() as u64,
            "polling started"
        );
        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => break,
                _ = &mut first, if !first_done => {
                    first_done = true;
                    self.spawn_tick();
                }
                _ = ticker.tick() => self.spawn_tick(),
            }
        }
        info!("polling stopped");
    }

    fn spawn_tick(&self) {
        let me = self.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = me.cancel.cancelled() => {}
                _ = me.poll_once() => {}
            }
        });
    }
}

fn log_poll_failure(e: &PollError) {
    match e {
        PollError::Rest(RestError::Status { status, .. })
            if matches!(*status, 301 | 302 | 303 | 307 | 401 | 403) =>
        {
            warn!(status = *status, "poll rejected; session may have expired, run `login` again");
        }
        _ => debug!(error=%e, "poll failed; skipping tick"),
    }
}

/// Running schedule; dropping it leaves the schedule running.
pub struct NotifierHandle {
    cancel: CancellationToken,
    task: tokio::task::JoinHandle<()>,
}

impl NotifierHandle {
    /// Stop scheduling polls and cancel in-flight ticks and pending chimes.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    pub fn is_stopped(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Stop and wait for the scheduler task to exit.
    pub async fn shutdown(self) {
        self.stop();
        if let Err(e) = self.task.await {
            warn!(error=%e, "poll scheduler task ended abnormally");
        }
    }
}
