use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, error, info, warn};

use crate::error::{PipelineError, PipelineResult, check_status};
use crate::outcome::Outcome;
use crate::topic::Topic;
use crate::utils::truncate_chars;

pub const MAX_CONTEXT_CHARS: usize = 2000;
const MAX_ARTICLES: usize = 3;
const DEFAULT_NEWSAPI_URL: &str = "https://newsapi.org";

#[async_trait::async_trait]
pub trait ContextSource {
    /// News context for `topic`, at most [`MAX_CONTEXT_CHARS`] characters.
    async fn context_for(&self, topic: &Topic) -> Outcome<String>;
}

#[derive(Debug, Deserialize)]
struct Everything {
    #[serde(default)]
    articles: Vec<Article>,
}

#[derive(Debug, Deserialize)]
struct Article {
    description: Option<String>,
}

/// NewsAPI `everything` search.
pub struct NewsApi {
    http: Client,
    base_url: String,
    api_key: Option<String>,
    language: String,
}

impl NewsApi {
    pub fn new(http: Client, api_key: Option<String>) -> Self {
        Self {
            http,
            base_url: DEFAULT_NEWSAPI_URL.to_string(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            language: "es".to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn search(&self, key: &str, query: &[(&str, &str)]) -> PipelineResult<Vec<Article>> {
        let url = format!("{}/v2/everything", self.base_url);
        let response = self
            .http
            .get(&url)
            .header("X-Api-Key", key)
            .query(query)
            .send()
            .await?;
        let body = check_status("newsapi", response).await?.text().await?;
        let parsed: Everything =
            serde_json::from_str(&body).map_err(|e| PipelineError::decode("newsapi", e))?;
        Ok(parsed.articles)
    }

    async fn recent(&self, topic: &Topic, key: &str) -> PipelineResult<String> {
        let articles = self
            .search(
                key,
                &[
                    ("q", topic.name()),
                    ("language", self.language.as_str()),
                    ("sortBy", "publishedAt"),
                    ("pageSize", "3"),
                ],
            )
            .await?;
        Ok(join_descriptions(articles))
    }

    async fn any_language(&self, topic: &Topic, key: &str) -> PipelineResult<String> {
        let articles = self.search(key, &[("q", topic.name())]).await?;
        Ok(join_descriptions(articles))
    }
}

#[async_trait::async_trait]
impl ContextSource for NewsApi {
    async fn context_for(&self, topic: &Topic) -> Outcome<String> {
        let Some(key) = self.api_key.as_deref() else {
            warn!(topic = %topic, "NEWSAPI_KEY not set, skipping context");
            return Outcome::Empty;
        };

        info!(topic = %topic, "Fetching context");
        let mut last_error = None;
        match self.recent(topic, key).await {
            Ok(context) if !context.is_empty() => return Outcome::Ready(context),
            Ok(_) => debug!(topic = %topic, "Primary news query found nothing"),
            Err(e) => {
                error!(topic = %topic, error = %e, "Error in news query");
                last_error = Some(e);
            }
        }

        // one fallback query without language and ordering filters
        match self.any_language(topic, key).await {
            Ok(context) => Outcome::non_empty(context, String::is_empty),
            Err(e) => {
                error!(topic = %topic, error = %e, "Error in fallback news query");
                Outcome::Failed(last_error.unwrap_or(e))
            }
        }
    }
}

/// Joins the non-empty descriptions of the first articles and caps the length.
fn join_descriptions(articles: Vec<Article>) -> String {
    let joined = articles
        .into_iter()
        .take(MAX_ARTICLES)
        .filter_map(|a| a.description)
        .filter(|d| !d.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    truncate_chars(&joined, MAX_CONTEXT_CHARS).to_string()
}
