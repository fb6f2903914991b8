use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub service: Service,
    #[serde(default)]
    pub http: Http,
    #[serde(default)]
    pub poll: Poll,
    #[serde(default)]
    pub notice: Notice,
    #[serde(default)]
    pub output: Output,
    #[serde(default)]
    pub logging: Logging,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config: {}", path.display()))?;
        let cfg: Config = toml::from_str(&raw).with_context(|| "parsing TOML")?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.poll.interval_seconds == 0 {
            bail!("poll.interval_seconds must be greater than zero");
        }
        if self.poll.timeout_seconds == 0 {
            bail!("poll.timeout_seconds must be greater than zero");
        }
        if self.service.base_url.trim().is_empty() {
            bail!("service.base_url is empty");
        }
        if !matches!(self.notice.sink.as_str(), "alert" | "log") {
            bail!("notice.sink must be \"alert\" or \"log\", got {:?}", self.notice.sink);
        }
        self.notice.warning_duration()?;
        self.notice.default_duration()?;
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Service {
    /// May carry a path; the status prefix is appended to it.
    pub base_url: String,
    /// Prepended verbatim to the resource id, then joined onto `base_url`.
    pub status_prefix: String,
    pub download_from: String,
    pub download_to: String,
}
impl Default for Service {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8080".into(),
            status_prefix: "/api/preview/file?uri=".into(),
            download_from: "/file/repo".into(),
            download_to: "/file/download".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Http {
    pub request_timeout_seconds: u64,
    pub user_agent: String,
}
impl Default for Http {
    fn default() -> Self {
        Self {
            request_timeout_seconds: 15,
            user_agent: concat!("preview-check/", env!("CARGO_PKG_VERSION")).into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Poll {
    pub interval_seconds: u64,
    pub timeout_seconds: u64,
}
impl Poll {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_seconds)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}
impl Default for Poll {
    fn default() -> Self {
        Self {
            interval_seconds: 3,
            timeout_seconds: 120,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notice {
    /// "alert" writes blocking notices to stderr, "log" routes them through tracing.
    pub sink: String,
    pub warning_seconds: f32,
    pub default_seconds: f32,
}
impl Notice {
    pub fn warning_duration(&self) -> Result<Duration> {
        seconds("notice.warning_seconds", self.warning_seconds)
    }

    pub fn default_duration(&self) -> Result<Duration> {
        seconds("notice.default_seconds", self.default_seconds)
    }
}
impl Default for Notice {
    fn default() -> Self {
        Self {
            sink: "alert".into(),
            warning_seconds: 10.0,
            default_seconds: 4.5,
        }
    }
}

fn seconds(key: &str, value: f32) -> Result<Duration> {
    Duration::try_from_secs_f32(value)
        .with_context(|| format!("{key} must be a finite, non-negative number of seconds, got {value}"))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Output {
    pub print_summary: bool,
    pub write_report_json: bool,
    pub report_dir: String,
    pub download_dir: String,
}
impl Default for Output {
    fn default() -> Self {
        Self {
            print_summary: true,
            write_report_json: false,
            report_dir: "out/reports".into(),
            download_dir: "out/downloads".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Logging {
    pub level: String,
    pub json: bool,
    pub write_to_file: bool,
    pub file_path: String,
}
impl Default for Logging {
    fn default() -> Self {
        Self {
            level: "info".into(),
            json: false,
            write_to_file: false,
            file_path: "".into(),
        }
    }
}
