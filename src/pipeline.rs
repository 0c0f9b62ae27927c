//! Topic-by-topic orchestration.
//!
//! Trend discovery, context, script generation and scene extraction are
//! contained: their failures are logged and the affected topic or variation
//! is skipped or degraded. Narration, rendering and combining are not: the
//! first error there ends the run.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{info, warn};

use crate::error::PipelineResult;
use crate::news::ContextSource;
use crate::outcome::Outcome;
use crate::publish::{PublishedVideo, publish};
use crate::render::{ArtifactLayout, MediaEncoder, combine_clips, render_clips};
use crate::scenes::{ScriptParse, parse_script, record_scenes};
use crate::script::{ScriptWriter, generate_scripts};
use crate::sheet::SceneSink;
use crate::topic::Topic;
use crate::trends::TrendSource;
use crate::tts::Narrator;

#[derive(Debug, Clone)]
pub struct Settings {
    pub max_topics: usize,
    pub variations: usize,
    pub out_dir: PathBuf,
    pub render_jobs: usize,
    pub strict_scenes: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            max_topics: 3,
            variations: 2,
            out_dir: PathBuf::from("."),
            render_jobs: 1,
            strict_scenes: false,
        }
    }
}

/// What a run produced.
#[derive(Debug, Default)]
pub struct RunReport {
    pub topics: Vec<Topic>,
    pub rows_recorded: usize,
    pub skipped_variations: usize,
    pub published: Vec<PublishedVideo>,
}

pub struct Pipeline {
    pub trends: Box<dyn TrendSource + Send + Sync>,
    pub context: Box<dyn ContextSource + Send + Sync>,
    pub writer: Box<dyn ScriptWriter + Send + Sync>,
    pub sink: Option<Box<dyn SceneSink + Send + Sync>>,
    pub narrator: Arc<dyn Narrator + Send + Sync>,
    pub encoder: Arc<dyn MediaEncoder + Send + Sync>,
    pub settings: Settings,
}

impl Pipeline {
    pub async fn run(&self) -> PipelineResult<RunReport> {
        let mut report = RunReport::default();

        let topics = match self.trends.trending(self.settings.max_topics).await {
            Outcome::Ready(topics) => topics,
            Outcome::Empty | Outcome::Failed(_) => {
                warn!("No trending topics found, nothing to do");
                return Ok(report);
            }
        };

        for topic in &topics {
            self.process_topic(topic, &mut report).await?;
        }
        report.topics = topics;
        Ok(report)
    }

    async fn process_topic(&self, topic: &Topic, report: &mut RunReport) -> PipelineResult<()> {
        let context = self
            .context
            .context_for(topic)
            .await
            .or_default_logged("context");

        let scripts = match generate_scripts(
            self.writer.as_ref(),
            topic,
            &context,
            self.settings.variations,
        )
        .await
        {
            Outcome::Ready(scripts) => scripts,
            Outcome::Empty | Outcome::Failed(_) => {
                warn!(topic = %topic, "No scripts generated, skipping topic");
                report.skipped_variations += self.settings.variations;
                return Ok(());
            }
        };
        report.skipped_variations += self.settings.variations - scripts.len();

        for (idx, script) in scripts.iter().enumerate() {
            let variation = idx + 1;
            info!(topic = %topic, variation, "Processing variation");

            let scenes = match parse_script(script, self.settings.strict_scenes) {
                ScriptParse::Scenes(scenes) => scenes,
                ScriptParse::Malformed(reason) => {
                    warn!(topic = %topic, variation, %reason, "Skipping malformed script");
                    report.skipped_variations += 1;
                    continue;
                }
            };
            report.rows_recorded += record_scenes(self.sink.as_deref(), topic, &scenes).await;

            let layout = ArtifactLayout::new(&self.settings.out_dir, topic.variation_slug(variation));
            let clips = render_clips(
                Arc::clone(&self.narrator),
                Arc::clone(&self.encoder),
                &layout,
                &scenes,
                self.settings.render_jobs,
            )
            .await?;
            let final_video = combine_clips(self.encoder.as_ref(), &layout, &clips).await?;
            report
                .published
                .push(publish(&final_video, &topic.publish_title()));
        }
        Ok(())
    }
}
