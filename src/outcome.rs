//! Result type for the stages whose failures are contained.
//!
//! Trend discovery, context fetching, script generation and scene extraction
//! never abort the run. Instead of signalling trouble with an empty string or
//! an empty `Vec`, they return an [`Outcome`] and the orchestrator decides
//! whether to continue, degrade or skip.

use tracing::{error, warn};

use crate::error::PipelineError;

#[derive(Debug)]
pub enum Outcome<T> {
    Ready(T),
    Empty,
    Failed(PipelineError),
}

impl<T> Outcome<T> {
    /// `Ready` for values that carry something, `Empty` otherwise.
    pub fn non_empty(value: T, is_empty: impl FnOnce(&T) -> bool) -> Self {
        if is_empty(&value) {
            Outcome::Empty
        } else {
            Outcome::Ready(value)
        }
    }

    pub fn ready(self) -> Option<T> {
        match self {
            Outcome::Ready(value) => Some(value),
            _ => None,
        }
    }

    /// Collapses the outcome to a value, logging failures under `stage`.
    pub fn or_degraded(self, stage: &str, fallback: T) -> T {
        match self {
            Outcome::Ready(value) => value,
            Outcome::Empty => {
                warn!(stage, "stage produced nothing, continuing degraded");
                fallback
            }
            Outcome::Failed(e) => {
                error!(stage, error = %e, "stage failed, continuing degraded");
                fallback
            }
        }
    }
}

impl<T: Default> Outcome<T> {
    pub fn or_default_logged(self, stage: &str) -> T {
        self.or_degraded(stage, T::default())
    }
}

impl<T> From<Result<T, PipelineError>> for Outcome<T> {
    fn from(value: Result<T, PipelineError>) -> Self {
        match value {
            Ok(v) => Outcome::Ready(v),
            Err(e) => Outcome::Failed(e),
        }
    }
}
