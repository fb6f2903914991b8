pub mod http;
pub mod types;

use async_trait::async_trait;
use thiserror::Error;

pub use http::HttpStatusSource;
pub use types::{ApiResult, PreviewInfo, PreviewStatus};

#[derive(Debug, Error)]
pub enum CheckError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("status endpoint returned HTTP {0}")]
    Status(u16),

    #[error("invalid status url: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("malformed status payload: {0}")]
    Decode(String),
}

/// Answers "what is the conversion state of this resource right now".
#[async_trait]
pub trait StatusSource: Send + Sync {
    async fn check(&self, resource_id: &str) -> Result<ApiResult<PreviewInfo>, CheckError>;
}
