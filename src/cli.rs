use crate::{
    config::Config,
    download,
    notice::Notices,
    poller::{PollRequest, PreviewPoller},
    report::{FileReport, PollReport},
    status::{HttpStatusSource, http::build_client},
    util::{ensure_dir, now_rfc3339, sha256_hex},
};
use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "preview-check")]
#[command(about = "Document preview readiness poller and file helpers")]
pub struct Args {
    #[command(subcommand)]
    pub cmd: Command,

    /// Path to config TOML. If omitted, uses ./preview-check.toml if present.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Override log level (trace/debug/info/warn/error).
    #[arg(long)]
    pub log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Poll the preview service until the resource can be previewed.
    Watch {
        #[arg(long)]
        resource: String,
        /// Give up after this many seconds of conversion.
        #[arg(long)]
        timeout: Option<u64>,
    },
    /// Print the type classification of a file name or URL.
    Classify {
        #[arg(long)]
        name: String,
    },
    /// Download a file-repository URL through the download endpoint.
    Download {
        #[arg(long)]
        url: String,
        #[arg(long)]
        out_dir: Option<PathBuf>,
    },
}

pub async fn dispatch(args: Args) -> Result<()> {
    let cfg_path = resolve_config_path(args.config.as_deref())?;
    let cfg = if cfg_path.exists() {
        Config::load(&cfg_path)?
    } else {
        Config::default()
    };
    let log_path = resolve_log_path(&cfg);
    let _guard = init_logging(&args, &cfg, log_path.as_deref())?;

    match &args.cmd {
        Command::Watch { resource, timeout } => watch(&cfg, resource, *timeout).await,
        Command::Classify { name } => classify(name),
        Command::Download { url, out_dir } => fetch(&cfg, url, out_dir.as_deref()).await,
    }
}

fn resolve_config_path(user: Option<&Path>) -> Result<PathBuf> {
    if let Some(p) = user {
        if !p.exists() {
            return Err(anyhow!("config file does not exist: {}", p.display()));
        }
        return Ok(p.to_path_buf());
    }
    let default = PathBuf::from("preview-check.toml");
    if default.exists() {
        Ok(default)
    } else {
        Ok(PathBuf::from("preview-check.example.toml"))
    }
}

fn init_logging(args: &Args, cfg: &Config, file_path: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let level = args
        .log_level
        .as_deref()
        .unwrap_or(cfg.logging.level.as_str());

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let stdout_layer = if cfg.logging.json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_target(true)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .boxed()
    };

    let (file_layer, guard) = if let Some(path) = file_path {
        let parent = path.parent().unwrap_or_else(|| Path::new("."));
        ensure_dir(parent)?;
        let file = std::fs::File::create(path)
            .with_context(|| format!("create log file: {}", path.display()))?;
        let (non_blocking, guard) = tracing_appender::non_blocking(file);
        let layer = tracing_subscriber::fmt::layer()
            .with_writer(non_blocking)
            .with_ansi(false)
            .with_target(true)
            .boxed();
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stdout_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow!("failed to init logging: {e}"))?;

    Ok(guard)
}

fn resolve_log_path(cfg: &Config) -> Option<PathBuf> {
    if !cfg.logging.write_to_file {
        return None;
    }
    if !cfg.logging.file_path.is_empty() {
        return Some(PathBuf::from(&cfg.logging.file_path));
    }
    Some(PathBuf::from(&cfg.output.report_dir).join("preview-check.log"))
}

async fn watch(cfg: &Config, resource: &str, timeout: Option<u64>) -> Result<()> {
    let source = HttpStatusSource::new(cfg)?;
    let notices = Notices::from_config(&cfg.notice)?;
    let poller = PreviewPoller::from_config(cfg, Arc::new(source), notices);

    let progress = Arc::new(Mutex::new(Vec::new()));
    let seen = Arc::clone(&progress);

    let mut request = PollRequest::new(resource)
        .on_progress(move |p| {
            info!("converting: {p}%");
            if let Ok(mut seen) = seen.lock() {
                seen.push(p);
            }
        })
        .on_ready(|url| info!("preview ready: {url}"))
        .on_timeout(|last| warn!(?last, "gave up waiting for conversion"));
    if let Some(secs) = timeout {
        request = request.timeout(Duration::from_secs(secs));
    }

    let started = now_rfc3339();
    let mut handle = poller.start(request)?;

    let summary = tokio::select! {
        joined = handle.wait() => joined?,
        _ = tokio::signal::ctrl_c() => {
            warn!("interrupted; cancelling preview poll");
            handle.cancel();
            handle.wait().await?
        }
    };
    let progress = progress.lock().map(|p| p.clone()).unwrap_or_default();
    let ready = summary.outcome.is_ready();
    let report = PollReport::new(summary, progress, started, now_rfc3339());

    if cfg.output.write_report_json {
        let dir = PathBuf::from(&cfg.output.report_dir);
        ensure_dir(&dir)?;
        let path = dir.join(format!("{}.json", sha256_hex(resource.as_bytes())));
        std::fs::write(&path, serde_json::to_string_pretty(&report)?)
            .with_context(|| format!("writing report: {}", path.display()))?;
        info!("report written to {}", path.display());
    }

    if cfg.output.print_summary {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }

    if ready {
        Ok(())
    } else {
        Err(anyhow!("{resource} is not previewable: {:?}", report.outcome))
    }
}

fn classify(name: &str) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(&FileReport::classify(name))?);
    Ok(())
}

async fn fetch(cfg: &Config, url: &str, out_override: Option<&Path>) -> Result<()> {
    let target = download::download_url(url, &cfg.service.download_from, &cfg.service.download_to)
        .ok_or_else(|| anyhow!("download url is empty"))?;
    let out_dir = out_override
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(&cfg.output.download_dir));

    let client = build_client(cfg)?;
    let file = download::download_to_dir(&client, &target, &out_dir).await?;

    if cfg.output.print_summary {
        println!("{}", serde_json::to_string_pretty(&file)?);
    }
    Ok(())
}
