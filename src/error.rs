use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("configuration error: {0}")]
    Config(String),
    #[error("network request error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{service} returned {status}: {body}")]
    Upstream {
        service: &'static str,
        status: u16,
        body: String,
    },
    #[error("could not decode {service} response: {reason}")]
    Decode {
        service: &'static str,
        reason: String,
    },
    #[error("spreadsheet error: {0}")]
    Sheet(String),
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("encoder exited with {code:?} while producing {output}")]
    Encoder { code: Option<i32>, output: PathBuf },
    #[error("no text to narrate into {0}")]
    EmptyNarration(PathBuf),
    #[error("nothing to combine for {0}")]
    NoClips(String),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl PipelineError {
    pub fn decode(service: &'static str, reason: impl ToString) -> Self {
        Self::Decode {
            service,
            reason: reason.to_string(),
        }
    }
}

pub type PipelineResult<T> = Result<T, PipelineError>;

/// Turns a non-2xx response into [`PipelineError::Upstream`], keeping the body for the log.
pub async fn check_status(
    service: &'static str,
    response: reqwest::Response,
) -> PipelineResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(PipelineError::Upstream {
        service,
        status: status.as_u16(),
        body: body.chars().take(300).collect(),
    })
}
