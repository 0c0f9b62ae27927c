//! Trending topic to short narrated video pipeline.
//!
//! Each stage talks to one external service through a small trait so the
//! orchestration in [`pipeline`] can be driven with fakes.

pub mod args;
pub mod config;
pub mod error;
pub mod news;
pub mod outcome;
pub mod pipeline;
pub mod publish;
pub mod render;
pub mod scenes;
pub mod script;
pub mod sheet;
pub mod topic;
pub mod trends;
pub mod tts;
pub mod utils;

pub use error::{PipelineError, PipelineResult};
pub use pipeline::{Pipeline, RunReport, Settings};
