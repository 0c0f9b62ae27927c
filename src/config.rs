use std::path::PathBuf;

use crate::error::{PipelineError, PipelineResult};

const DEFAULT_CREDENTIALS: &str = "credentials.json";

/// Credentials and document names taken from the environment.
#[derive(Debug, Clone)]
pub struct Config {
    pub gemini_api_key: String,
    pub sheet_name: Option<String>,
    pub newsapi_key: Option<String>,
    pub google_credentials: PathBuf,
}

impl Config {
    pub fn from_env() -> PipelineResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> PipelineResult<Self> {
        let present = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let gemini_api_key = present("GEMINI_API_KEY")
            .ok_or_else(|| PipelineError::Config("GEMINI_API_KEY is missing".to_string()))?;

        Ok(Self {
            gemini_api_key,
            sheet_name: present("GOOGLE_SHEET_NAME"),
            newsapi_key: present("NEWSAPI_KEY"),
            google_credentials: present("GOOGLE_CREDENTIALS")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_CREDENTIALS)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn model_key_is_required() {
        let err = Config::from_lookup(lookup(&[("NEWSAPI_KEY", "n")])).unwrap_err();
        assert!(matches!(err, PipelineError::Config(_)));

        let err = Config::from_lookup(lookup(&[("GEMINI_API_KEY", "  ")])).unwrap_err();
        assert!(matches!(err, PipelineError::Config(_)));
    }

    #[test]
    fn optional_values_default() {
        let config = Config::from_lookup(lookup(&[("GEMINI_API_KEY", "g")])).unwrap();
        assert_eq!(config.gemini_api_key, "g");
        assert_eq!(config.sheet_name, None);
        assert_eq!(config.newsapi_key, None);
        assert_eq!(config.google_credentials, PathBuf::from("credentials.json"));
    }

    #[test]
    fn reads_everything() {
        let config = Config::from_lookup(lookup(&[
            ("GEMINI_API_KEY", "g"),
            ("GOOGLE_SHEET_NAME", "Guiones"),
            ("NEWSAPI_KEY", "n"),
            ("GOOGLE_CREDENTIALS", "/etc/sa.json"),
        ]))
        .unwrap();
        assert_eq!(config.sheet_name.as_deref(), Some("Guiones"));
        assert_eq!(config.newsapi_key.as_deref(), Some("n"));
        assert_eq!(config.google_credentials, PathBuf::from("/etc/sa.json"));
    }
}
