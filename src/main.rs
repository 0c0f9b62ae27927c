use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use trendclips::args::Args;
use trendclips::config::Config;
use trendclips::news::NewsApi;
use trendclips::render::Ffmpeg;
use trendclips::script::Gemini;
use trendclips::sheet::{SceneSink, SheetOpener};
use trendclips::trends::GoogleTrends;
use trendclips::tts::GoogleTts;
use trendclips::{Pipeline, Settings};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let config = Config::from_env().context("loading configuration")?;
    info!("Starting trend video pipeline");

    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(args.request_timeout_secs))
        .build()
        .context("building HTTP client")?;

    let sink = open_sheet(&http, &config).await;

    let pipeline = Pipeline {
        trends: Box::new(GoogleTrends::new(http.clone(), &args.geo, &args.hl)),
        context: Box::new(NewsApi::new(http.clone(), config.newsapi_key.clone())),
        writer: Box::new(Gemini::new(http.clone(), &config.gemini_api_key, &args.model)),
        sink,
        narrator: Arc::new(GoogleTts::new(http, "es")),
        encoder: Arc::new(Ffmpeg::new(&args.ffmpeg)),
        settings: Settings {
            max_topics: args.max_topics,
            variations: args.variations as usize,
            out_dir: args.out_dir.clone(),
            render_jobs: args.render_jobs,
            strict_scenes: args.strict_scenes,
        },
    };

    let report = pipeline.run().await?;
    info!(
        topics = report.topics.len(),
        rows = report.rows_recorded,
        skipped = report.skipped_variations,
        videos = report.published.len(),
        "Pipeline complete"
    );
    Ok(())
}

async fn open_sheet(
    http: &reqwest::Client,
    config: &Config,
) -> Option<Box<dyn SceneSink + Send + Sync>> {
    let Some(name) = config.sheet_name.as_deref() else {
        warn!("GOOGLE_SHEET_NAME not set, scenes will not be recorded");
        return None;
    };
    let opened = match SheetOpener::service_account(http.clone(), &config.google_credentials) {
        Ok(opener) => opener.open(name).await,
        Err(e) => Err(e),
    };
    match opened {
        Ok(sheet) => Some(Box::new(sheet)),
        Err(e) => {
            error!(error = %e, "Error connecting to Google Sheets, scenes will not be recorded");
            None
        }
    }
}
