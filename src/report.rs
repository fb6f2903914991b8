use crate::poller::{PollOutcome, PollSummary};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollReport {
    pub resource_id: String,
    pub outcome: PollOutcome,
    pub checks: u32,
    pub elapsed_ms: u64,
    pub progress: Vec<u8>,
    pub started: String,
    pub finished: String,
}

impl PollReport {
    pub fn new(summary: PollSummary, progress: Vec<u8>, started: String, finished: String) -> Self {
        Self {
            resource_id: summary.resource_id,
            outcome: summary.outcome,
            checks: summary.checks,
            elapsed_ms: summary.elapsed_ms,
            progress,
            started,
            finished,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileReport {
    pub name: String,
    pub extension: String,
    pub class: String,
    pub is_image: bool,
    pub is_audio: bool,
    pub is_video: bool,
}

impl FileReport {
    pub fn classify(name: &str) -> Self {
        Self {
            name: name.to_string(),
            extension: crate::files::extension(name),
            class: crate::files::file_class(name).to_string(),
            is_image: crate::files::is_image(name),
            is_audio: crate::files::is_audio(name),
            is_video: crate::files::is_video(name),
        }
    }
}
