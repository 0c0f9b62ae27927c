use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::error::{PipelineError, PipelineResult, check_status};
use crate::outcome::Outcome;
use crate::topic::Topic;

pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";
const DEFAULT_GEMINI_URL: &str = "https://generativelanguage.googleapis.com";

/// A generative model that turns a prompt into text.
#[async_trait::async_trait]
pub trait ScriptWriter {
    async fn write(&self, prompt: &str) -> PipelineResult<String>;
}

/// Fixed prompt for one topic. Every variation receives the same prompt; the
/// model's sampling provides the variety.
pub fn build_prompt(topic: &Topic, context: &str) -> String {
    format!(
        r#"
Eres un guionista de videos virales para TikTok/Instagram/YouTube Shorts.
Tema: {topic}
Contexto: {context}
Instrucciones:
- Hazlo divertido y sarcástico.
- 2 personajes con personalidades opuestas.
- EXACTAMENTE 6 escenas numeradas.
- Cada escena inicia con "Escena X:" y describe acción + diálogo breve.
- Genera también un título viral y 5 hashtags.
"#,
        topic = topic.name(),
    )
}

/// Requests `variations` independent scripts. A failed variation is logged
/// and left out, so the result may be shorter than requested.
pub async fn generate_scripts(
    writer: &(dyn ScriptWriter + Send + Sync),
    topic: &Topic,
    context: &str,
    variations: usize,
) -> Outcome<Vec<String>> {
    let prompt = build_prompt(topic, context);
    let mut scripts = Vec::with_capacity(variations);
    let mut last_error = None;

    for i in 1..=variations {
        info!(topic = %topic, variation = i, "Generating script");
        match writer.write(&prompt).await {
            Ok(text) => scripts.push(text),
            Err(e) => {
                error!(topic = %topic, variation = i, error = %e, "Error generating script");
                last_error = Some(e);
            }
        }
    }

    match (scripts.is_empty(), last_error) {
        (false, _) => Outcome::Ready(scripts),
        (true, Some(e)) => Outcome::Failed(e),
        (true, None) => Outcome::Empty,
    }
}

#[derive(Debug, Serialize)]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

/// Gemini `generateContent` over REST.
pub struct Gemini {
    http: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl Gemini {
    pub fn new(http: Client, api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            http,
            base_url: DEFAULT_GEMINI_URL.to_string(),
            api_key: api_key.into(),
            model: model.into(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait::async_trait]
impl ScriptWriter for Gemini {
    async fn write(&self, prompt: &str) -> PipelineResult<String> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        );
        let request = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![RequestPart { text: prompt }],
            }],
        };
        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", self.api_key.as_str())
            .json(&request)
            .send()
            .await?;
        let body = check_status("gemini", response).await?.text().await?;
        let parsed: GenerateContentResponse =
            serde_json::from_str(&body).map_err(|e| PipelineError::decode("gemini", e))?;
        candidate_text(parsed)
    }
}

fn candidate_text(response: GenerateContentResponse) -> PipelineResult<String> {
    if let Some(reason) = response.prompt_feedback.and_then(|f| f.block_reason) {
        return Err(PipelineError::decode("gemini", format!("prompt blocked: {reason}")));
    }
    let candidate = response
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| PipelineError::decode("gemini", "no candidates"))?;

    let text: String = candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();
    if text.trim().is_empty() {
        let reason = candidate.finish_reason.unwrap_or_else(|| "unknown".into());
        return Err(PipelineError::decode(
            "gemini",
            format!("empty candidate (finish reason {reason})"),
        ));
    }
    if candidate.finish_reason.as_deref().is_some_and(|r| r != "STOP") {
        warn!(finish_reason = ?candidate.finish_reason, "Script may be truncated");
    }
    Ok(text)
}
