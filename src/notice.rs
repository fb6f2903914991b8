use crate::config;
use anyhow::{Result, bail};
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    pub title: String,
    pub desc: String,
    pub duration: Duration,
}

/// A user-facing notification surface with four severity channels.
pub trait Notifier: Send + Sync {
    fn warning(&self, notice: &Notice);
    fn success(&self, notice: &Notice);
    fn info(&self, notice: &Notice);

    fn notice(&self, notice: &Notice) {
        self.info(notice)
    }
}

/// Sends notices through `tracing` instead of interrupting the user.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn warning(&self, notice: &Notice) {
        warn!(title = %notice.title, desc = %notice.desc, "notice");
    }

    fn success(&self, notice: &Notice) {
        info!(title = %notice.title, desc = %notice.desc, kind = "success", "notice");
    }

    fn info(&self, notice: &Notice) {
        info!(title = %notice.title, desc = %notice.desc, "notice");
    }
}

/// Injected notification facade. Without a sink every notice becomes a
/// blocking alert on stderr.
#[derive(Clone)]
pub struct Notices {
    sink: Option<Arc<dyn Notifier>>,
    warning_duration: Duration,
    default_duration: Duration,
}

impl Notices {
    pub fn new(sink: Option<Arc<dyn Notifier>>) -> Self {
        Self {
            sink,
            warning_duration: Duration::from_secs(10),
            default_duration: Duration::from_millis(4500),
        }
    }

    pub fn from_config(cfg: &config::Notice) -> Result<Self> {
        let sink: Option<Arc<dyn Notifier>> = match cfg.sink.as_str() {
            "log" => Some(Arc::new(TracingNotifier)),
            "alert" => None,
            other => bail!("unknown notice sink: {other:?}"),
        };
        Ok(Self {
            sink,
            warning_duration: cfg.warning_duration()?,
            default_duration: cfg.default_duration()?,
        })
    }

    pub fn warning(&self, title: &str, desc: &str) {
        self.warning_for(title, desc, self.warning_duration);
    }

    pub fn warning_for(&self, title: &str, desc: &str, duration: Duration) {
        let n = self.build(title, desc, duration);
        match &self.sink {
            Some(sink) => sink.warning(&n),
            None => alert(&n),
        }
    }

    pub fn success(&self, title: &str, desc: &str) {
        self.success_for(title, desc, self.default_duration);
    }

    pub fn success_for(&self, title: &str, desc: &str, duration: Duration) {
        let n = self.build(title, desc, duration);
        match &self.sink {
            Some(sink) => sink.success(&n),
            None => alert(&n),
        }
    }

    pub fn info(&self, title: &str, desc: &str) {
        self.info_for(title, desc, self.default_duration);
    }

    pub fn info_for(&self, title: &str, desc: &str, duration: Duration) {
        let n = self.build(title, desc, duration);
        match &self.sink {
            Some(sink) => sink.info(&n),
            None => alert(&n),
        }
    }

    pub fn notice(&self, title: &str, desc: &str) {
        self.notice_for(title, desc, self.default_duration);
    }

    pub fn notice_for(&self, title: &str, desc: &str, duration: Duration) {
        let n = self.build(title, desc, duration);
        match &self.sink {
            Some(sink) => sink.notice(&n),
            None => alert(&n),
        }
    }

    fn build(&self, title: &str, desc: &str, duration: Duration) -> Notice {
        Notice {
            title: title.to_string(),
            desc: desc.to_string(),
            duration,
        }
    }
}

impl Default for Notices {
    fn default() -> Self {
        Self::new(None)
    }
}

fn alert(notice: &Notice) {
    let mut err = std::io::stderr().lock();
    let _ = writeln!(err, "{}\n{}", notice.title, notice.desc);
    let _ = err.flush();
}
