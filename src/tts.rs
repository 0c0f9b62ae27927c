use std::path::Path;

use reqwest::Client;
use reqwest::header::USER_AGENT;
use tracing::{debug, error, info};

use crate::error::{PipelineError, PipelineResult, check_status};
use crate::utils::chunk_text;

const DEFAULT_TTS_URL: &str = "https://translate.google.com";
const MAX_CHUNK_CHARS: usize = 100;

/// Speech synthesis into an audio file.
#[async_trait::async_trait]
pub trait Narrator {
    async fn narrate(&self, text: &str, out_path: &Path) -> PipelineResult<()>;
}

/// Google Translate speech endpoint. Produces MP3.
pub struct GoogleTts {
    http: Client,
    base_url: String,
    lang: String,
}

impl GoogleTts {
    pub fn new(http: Client, lang: impl Into<String>) -> Self {
        Self {
            http,
            base_url: DEFAULT_TTS_URL.to_string(),
            lang: lang.into(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn speak_chunk(&self, chunk: &str, idx: usize, total: usize) -> PipelineResult<Vec<u8>> {
        let url = format!("{}/translate_tts", self.base_url);
        let textlen = chunk.chars().count().to_string();
        let (idx, total) = (idx.to_string(), total.to_string());
        let response = self
            .http
            .get(&url)
            .header(USER_AGENT, "Mozilla/5.0 (trendclips)")
            .query(&[
                ("ie", "UTF-8"),
                ("client", "tw-ob"),
                ("tl", self.lang.as_str()),
                ("q", chunk),
                ("idx", idx.as_str()),
                ("total", total.as_str()),
                ("textlen", textlen.as_str()),
            ])
            .send()
            .await?;
        let bytes = check_status("tts", response).await?.bytes().await?;
        Ok(bytes.to_vec())
    }
}

#[async_trait::async_trait]
impl Narrator for GoogleTts {
    async fn narrate(&self, text: &str, out_path: &Path) -> PipelineResult<()> {
        let chunks = chunk_text(text, MAX_CHUNK_CHARS);
        if chunks.is_empty() {
            return Err(PipelineError::EmptyNarration(out_path.to_path_buf()));
        }
        info!(path = %out_path.display(), chunks = chunks.len(), "Synthesizing narration");

        // MP3 frames concatenate cleanly, so the chunks are stitched byte-wise.
        let mut audio = Vec::new();
        for (i, chunk) in chunks.iter().enumerate() {
            debug!(chunk = i, text = %chunk, "TTS chunk");
            match self.speak_chunk(chunk, i, chunks.len()).await {
                Ok(bytes) => audio.extend_from_slice(&bytes),
                Err(e) => {
                    error!(path = %out_path.display(), chunk = i, error = %e, "TTS request failed");
                    return Err(e);
                }
            }
        }
        tokio::fs::write(out_path, audio).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    #[tokio::test]
    async fn writes_concatenated_chunks() {
        let mut server = mockito::Server::new_async().await;
        let first = server
            .mock("GET", "/translate_tts")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("tl".into(), "es".into()),
                Matcher::UrlEncoded("idx".into(), "0".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "audio/mpeg")
            .with_body(b"ID3a")
            .create_async()
            .await;
        let second = server
            .mock("GET", "/translate_tts")
            .match_query(Matcher::UrlEncoded("idx".into(), "1".into()))
            .with_status(200)
            .with_header("content-type", "audio/mpeg")
            .with_body(b"b")
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("scene_1.mp3");
        let text = format!("{}. {}.", "a".repeat(80), "b".repeat(80));
        GoogleTts::new(Client::new(), "es")
            .with_base_url(server.url())
            .narrate(&text, &out)
            .await
            .unwrap();

        assert_eq!(std::fs::read(&out).unwrap(), b"ID3ab");
        first.assert_async().await;
        second.assert_async().await;
    }

    #[tokio::test]
    async fn failure_propagates_and_writes_nothing() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/translate_tts")
            .match_query(Matcher::Any)
            .with_status(500)
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("scene_1.mp3");
        let result = GoogleTts::new(Client::new(), "es")
            .with_base_url(server.url())
            .narrate("Escena 1: hola", &out)
            .await;

        assert!(matches!(result, Err(PipelineError::Upstream { status: 500, .. })));
        assert!(!out.exists());
    }

    #[tokio::test]
    async fn blank_text_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let result = GoogleTts::new(Client::new(), "es")
            .narrate("  ", &dir.path().join("x.mp3"))
            .await;
        assert!(matches!(result, Err(PipelineError::EmptyNarration(_))));
    }
}
