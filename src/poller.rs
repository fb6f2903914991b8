//! Preview readiness polling.
//!
//! A session asks the status source about one resource right away, then again
//! on every interval tick, until the resource is previewable, definitively not
//! previewable, failed to convert, the deadline passes while it is still
//! converting, or the caller cancels. Checks are serialized: a new check is
//! only issued after the previous reply has been applied.

use crate::{
    config::Config,
    notice::Notices,
    status::{ApiResult, CheckError, PreviewInfo, PreviewStatus, StatusSource},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(3);
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Error)]
pub enum PollError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("poll task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// How a session ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PollOutcome {
    Ready { url: String },
    NotPreviewable,
    ConversionFailed { detail: String },
    TimedOut { last_progress: Option<u8> },
    Rejected { message: String },
    TransportFailed { error: String },
    Cancelled,
}

impl PollOutcome {
    pub fn is_ready(&self) -> bool {
        matches!(self, PollOutcome::Ready { .. })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollSummary {
    pub resource_id: String,
    pub outcome: PollOutcome,
    pub checks: u32,
    pub elapsed_ms: u64,
}

type ReadyFn = Box<dyn FnOnce(&str) + Send>;
type ProgressFn = Box<dyn FnMut(u8) + Send>;
type TimeoutFn = Box<dyn FnOnce(Option<u8>) + Send>;
type CompleteFn = Box<dyn FnOnce() + Send>;

#[derive(Default)]
struct Callbacks {
    ready: Option<ReadyFn>,
    progress: Option<ProgressFn>,
    timeout: Option<TimeoutFn>,
    complete: Option<CompleteFn>,
}

pub struct PollRequest {
    resource_id: String,
    timeout: Option<Duration>,
    callbacks: Callbacks,
}

impl PollRequest {
    pub fn new(resource_id: impl Into<String>) -> Self {
        Self {
            resource_id: resource_id.into(),
            timeout: None,
            callbacks: Callbacks::default(),
        }
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Called with the preview url once the resource is previewable.
    pub fn on_ready(mut self, f: impl FnOnce(&str) + Send + 'static) -> Self {
        self.callbacks.ready = Some(Box::new(f));
        self
    }

    /// Called with the conversion percentage for every "converting" reply.
    pub fn on_progress(mut self, f: impl FnMut(u8) + Send + 'static) -> Self {
        self.callbacks.progress = Some(Box::new(f));
        self
    }

    /// Called when the deadline passes while the resource is still converting.
    pub fn on_timeout(mut self, f: impl FnOnce(Option<u8>) + Send + 'static) -> Self {
        self.callbacks.timeout = Some(Box::new(f));
        self
    }

    /// Called exactly once when the session ends, whatever the outcome.
    pub fn on_complete(mut self, f: impl FnOnce() + Send + 'static) -> Self {
        self.callbacks.complete = Some(Box::new(f));
        self
    }
}

#[derive(Clone)]
pub struct PreviewPoller {
    source: Arc<dyn StatusSource>,
    notices: Notices,
    interval: Duration,
    default_timeout: Duration,
}

impl PreviewPoller {
    pub fn new(source: Arc<dyn StatusSource>, notices: Notices) -> Self {
        Self {
            source,
            notices,
            interval: DEFAULT_INTERVAL,
            default_timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn from_config(cfg: &Config, source: Arc<dyn StatusSource>, notices: Notices) -> Self {
        Self::new(source, notices)
            .with_interval(cfg.poll.interval())
            .with_default_timeout(cfg.poll.timeout())
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    /// Starts a session on the current tokio runtime.
    pub fn start(&self, request: PollRequest) -> Result<PollHandle, PollError> {
        let PollRequest {
            resource_id,
            timeout,
            callbacks,
        } = request;

        if resource_id.trim().is_empty() {
            return Err(PollError::InvalidArgument("resource id is empty".into()));
        }
        let timeout = timeout.unwrap_or(self.default_timeout);
        if timeout.is_zero() {
            return Err(PollError::InvalidArgument("timeout must be positive".into()));
        }
        if self.interval.is_zero() {
            return Err(PollError::InvalidArgument("poll interval must be positive".into()));
        }

        info!(
            resource_id = %resource_id,
            timeout_secs = timeout.as_secs_f64(),
            interval_secs = self.interval.as_secs_f64(),
            "preview poll started"
        );

        let started = Instant::now();
        let session = Session {
            resource_id: resource_id.clone(),
            callbacks,
            started,
            deadline: started + timeout,
            stopped: false,
            checks: 0,
        };
        let (cancel_tx, cancel_rx) = watch::channel(false);
        let driver = Driver {
            source: Arc::clone(&self.source),
            notices: self.notices.clone(),
            interval: self.interval,
        };
        let task = tokio::spawn(driver.run(session, cancel_rx));

        Ok(PollHandle {
            resource_id,
            cancel: cancel_tx,
            task,
        })
    }
}

/// Caller's side of a running session. Dropping it detaches the session.
pub struct PollHandle {
    resource_id: String,
    cancel: watch::Sender<bool>,
    task: JoinHandle<PollSummary>,
}

impl PollHandle {
    pub fn resource_id(&self) -> &str {
        &self.resource_id
    }

    /// Stops the session. Idempotent; a no-op once the session has ended.
    pub fn cancel(&self) {
        if !self.cancel.send_replace(true) {
            debug!(resource_id = %self.resource_id, "preview poll cancel requested");
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Waits for the session to end. Must not be called again once it returned.
    pub async fn wait(&mut self) -> Result<PollSummary, PollError> {
        Ok((&mut self.task).await?)
    }

    pub async fn join(mut self) -> Result<PollSummary, PollError> {
        self.wait().await
    }
}

struct Driver {
    source: Arc<dyn StatusSource>,
    notices: Notices,
    interval: Duration,
}

impl Driver {
    async fn run(self, mut session: Session, mut cancel: watch::Receiver<bool>) -> PollSummary {
        let mut ticker = time::interval_at(session.started + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let deadline = time::sleep_until(session.deadline);
        tokio::pin!(deadline);
        let mut deadline_seen = false;

        loop {
            let reply = tokio::select! {
                biased;
                _ = cancelled(&mut cancel) => None,
                reply = self.source.check(&session.resource_id) => Some(reply),
            };
            let Some(reply) = reply else {
                return session.finish(PollOutcome::Cancelled, &self.notices);
            };

            session.checks += 1;
            if let Some(outcome) = session.apply(reply) {
                return session.finish(outcome, &self.notices);
            }

            // Wake on the next tick, or once at the deadline if it comes first.
            let woke = tokio::select! {
                biased;
                _ = cancelled(&mut cancel) => false,
                _ = &mut deadline, if !deadline_seen => {
                    deadline_seen = true;
                    true
                }
                _ = ticker.tick() => true,
            };
            if !woke {
                return session.finish(PollOutcome::Cancelled, &self.notices);
            }
        }
    }
}

async fn cancelled(rx: &mut watch::Receiver<bool>) {
    loop {
        if *rx.borrow_and_update() {
            return;
        }
        if rx.changed().await.is_err() {
            // Handle dropped without cancelling: the session runs to its own end.
            std::future::pending::<()>().await;
        }
    }
}

struct Session {
    resource_id: String,
    callbacks: Callbacks,
    started: Instant,
    deadline: Instant,
    stopped: bool,
    checks: u32,
}

impl Session {
    /// Returns the terminal outcome, or `None` to keep polling.
    fn apply(
        &mut self,
        reply: Result<ApiResult<PreviewInfo>, CheckError>,
    ) -> Option<PollOutcome> {
        let result = match reply {
            Ok(result) => result,
            Err(err) => {
                warn!(resource_id = %self.resource_id, "status check failed: {err}");
                return Some(PollOutcome::TransportFailed {
                    error: err.to_string(),
                });
            }
        };

        if !result.success {
            return Some(PollOutcome::Rejected {
                message: result.message.unwrap_or_default(),
            });
        }

        let decoded = result
            .data
            .ok_or_else(|| "status payload has no data".to_string())
            .and_then(PreviewStatus::try_from);
        let status = match decoded {
            Ok(status) => status,
            Err(msg) => {
                let err = CheckError::Decode(msg);
                warn!(resource_id = %self.resource_id, "status check failed: {err}");
                return Some(PollOutcome::TransportFailed {
                    error: err.to_string(),
                });
            }
        };

        match status {
            PreviewStatus::NotPreviewable => Some(PollOutcome::NotPreviewable),
            PreviewStatus::Previewable(url) => Some(PollOutcome::Ready { url }),
            PreviewStatus::ConversionError(detail) => {
                Some(PollOutcome::ConversionFailed { detail })
            }
            PreviewStatus::Converting(progress) => {
                debug!(resource_id = %self.resource_id, progress, "converting");
                if let Some(cb) = self.callbacks.progress.as_mut() {
                    cb(progress);
                }
                if Instant::now() >= self.deadline {
                    Some(PollOutcome::TimedOut {
                        last_progress: Some(progress),
                    })
                } else {
                    None
                }
            }
        }
    }

    fn finish(&mut self, outcome: PollOutcome, notices: &Notices) -> PollSummary {
        if !self.stopped {
            self.stopped = true;
            self.callbacks.progress = None;

            match &outcome {
                PollOutcome::Ready { url } => {
                    if let Some(cb) = self.callbacks.ready.take() {
                        cb(url);
                    }
                }
                PollOutcome::NotPreviewable => {
                    notices.warning(&format!("File cannot be previewed: {}", self.resource_id), "");
                }
                PollOutcome::ConversionFailed { detail } => {
                    notices.warning("File conversion failed", "See the log output for details");
                    error!(resource_id = %self.resource_id, "conversion error: {detail}");
                }
                PollOutcome::TimedOut { last_progress } => {
                    warn!(
                        resource_id = %self.resource_id,
                        ?last_progress,
                        "preview poll timed out while converting"
                    );
                    if let Some(cb) = self.callbacks.timeout.take() {
                        cb(*last_progress);
                    }
                }
                PollOutcome::Rejected { message } => {
                    let title = if message.is_empty() {
                        "Preview status request rejected"
                    } else {
                        message.as_str()
                    };
                    notices.warning(title, "");
                }
                PollOutcome::TransportFailed { .. } | PollOutcome::Cancelled => {}
            }

            if let Some(cb) = self.callbacks.complete.take() {
                cb();
            }

            info!(
                resource_id = %self.resource_id,
                checks = self.checks,
                ?outcome,
                "preview poll finished"
            );
        }

        PollSummary {
            resource_id: self.resource_id.clone(),
            outcome,
            checks: self.checks,
            elapsed_ms: self.started.elapsed().as_millis() as u64,
        }
    }
}
