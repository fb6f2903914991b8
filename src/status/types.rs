use serde::{Deserialize, Serialize};

pub const NOT_PREVIEWABLE: u8 = 0;
pub const PREVIEWABLE: u8 = 1;
pub const CONVERTING: u8 = 2;
pub const CONVERSION_ERROR: u8 = 3;

/// Response envelope used by every endpoint of the preview service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResult<T> {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    pub data: Option<T>,
    #[serde(default)]
    pub code: i32,
}

impl<T> ApiResult<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            message: Some("success".into()),
            data: Some(data),
            code: 0,
        }
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            data: None,
            code: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreviewInfo {
    #[serde(rename = "type")]
    pub kind: u8,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub progress: Option<f64>,
    #[serde(default)]
    pub error: Option<serde_json::Value>,
}

impl PreviewInfo {
    pub fn not_previewable() -> Self {
        Self::bare(NOT_PREVIEWABLE)
    }

    pub fn previewable(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            ..Self::bare(PREVIEWABLE)
        }
    }

    pub fn converting(progress: f64) -> Self {
        Self {
            progress: Some(progress),
            ..Self::bare(CONVERTING)
        }
    }

    pub fn conversion_error(error: impl Into<serde_json::Value>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::bare(CONVERSION_ERROR)
        }
    }

    fn bare(kind: u8) -> Self {
        Self {
            kind,
            url: None,
            progress: None,
            error: None,
        }
    }
}

/// Conversion state of one resource, decoded from [`PreviewInfo`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreviewStatus {
    NotPreviewable,
    Previewable(String),
    Converting(u8),
    ConversionError(String),
}

impl TryFrom<PreviewInfo> for PreviewStatus {
    type Error = String;

    fn try_from(info: PreviewInfo) -> Result<Self, Self::Error> {
        match info.kind {
            NOT_PREVIEWABLE => Ok(PreviewStatus::NotPreviewable),
            PREVIEWABLE => info
                .url
                .filter(|u| !u.is_empty())
                .map(PreviewStatus::Previewable)
                .ok_or_else(|| "previewable status without url".to_string()),
            CONVERTING => Ok(PreviewStatus::Converting(clamp_progress(
                info.progress.unwrap_or(0.0),
            ))),
            CONVERSION_ERROR => Ok(PreviewStatus::ConversionError(match info.error {
                Some(serde_json::Value::String(s)) => s,
                Some(serde_json::Value::Null) | None => "unknown conversion error".into(),
                Some(other) => other.to_string(),
            })),
            other => Err(format!("unknown preview type: {other}")),
        }
    }
}

fn clamp_progress(raw: f64) -> u8 {
    if raw.is_nan() {
        return 0;
    }
    raw.round().clamp(0.0, 100.0) as u8
}
