use reqwest::Client;
use reqwest::header::USER_AGENT;
use serde::Deserialize;
use tracing::{debug, error, info, warn};

use crate::error::{PipelineError, PipelineResult, check_status};
use crate::outcome::Outcome;
use crate::topic::Topic;

const DEFAULT_TRENDS_URL: &str = "https://trends.google.com";
const XSSI_PREFIX: &str = ")]}',";

#[async_trait::async_trait]
pub trait TrendSource {
    /// Up to `limit` trending topics, most relevant first.
    async fn trending(&self, limit: usize) -> Outcome<Vec<Topic>>;
}

#[derive(Debug, Deserialize)]
struct DailyTrends {
    default: DailyTrendsBody,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DailyTrendsBody {
    trending_searches_days: Vec<TrendingDay>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TrendingDay {
    trending_searches: Vec<TrendingSearch>,
}

#[derive(Debug, Deserialize)]
struct TrendingSearch {
    title: TrendTitle,
}

#[derive(Debug, Deserialize)]
struct TrendTitle {
    query: String,
}

/// Google Trends daily trending searches for one region.
pub struct GoogleTrends {
    http: Client,
    base_url: String,
    geo: String,
    hl: String,
}

impl GoogleTrends {
    pub fn new(http: Client, geo: impl Into<String>, hl: impl Into<String>) -> Self {
        Self {
            http,
            base_url: DEFAULT_TRENDS_URL.to_string(),
            geo: geo.into(),
            hl: hl.into(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn fetch(&self, limit: usize) -> PipelineResult<Vec<Topic>> {
        let url = format!("{}/trends/api/dailytrends", self.base_url);
        let response = self
            .http
            .get(&url)
            .query(&[("hl", self.hl.as_str()), ("geo", self.geo.as_str()), ("ns", "15")])
            .header(USER_AGENT, "trendclips/0.1")
            .send()
            .await?;
        let body = check_status("google trends", response).await?.text().await?;
        parse_daily_trends(&body, limit)
    }
}

#[async_trait::async_trait]
impl TrendSource for GoogleTrends {
    async fn trending(&self, limit: usize) -> Outcome<Vec<Topic>> {
        info!(geo = %self.geo, "Looking up trending topics");
        match self.fetch(limit).await {
            Ok(topics) if topics.is_empty() => {
                warn!(geo = %self.geo, "Trend source returned no topics");
                Outcome::Empty
            }
            Ok(topics) => {
                info!(count = topics.len(), "Found trending topics");
                Outcome::Ready(topics)
            }
            Err(e) => {
                error!(error = %e, "Error fetching trending topics");
                Outcome::Failed(e)
            }
        }
    }
}

fn parse_daily_trends(body: &str, limit: usize) -> PipelineResult<Vec<Topic>> {
    let json = body.trim_start().trim_start_matches(XSSI_PREFIX);
    let parsed: DailyTrends =
        serde_json::from_str(json).map_err(|e| PipelineError::decode("google trends", e))?;

    let topics: Vec<Topic> = parsed
        .default
        .trending_searches_days
        .into_iter()
        .flat_map(|day| day.trending_searches)
        .map(|search| search.title.query.trim().to_string())
        .filter(|query| !query.is_empty())
        .take(limit)
        .map(Topic::new)
        .collect();
    debug!(?topics, "Parsed trending topics");
    Ok(topics)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    const BODY: &str = r#")]}',
{"default":{"trendingSearchesDays":[
  {"date":"20261018","trendingSearches":[
    {"title":{"query":"Tema A"}},{"title":{"query":"  "}},{"title":{"query":"Tema B"}}
  ]},
  {"date":"20261017","trendingSearches":[
    {"title":{"query":"Tema C"}},{"title":{"query":"Tema D"}}
  ]}
]}}"#;

    #[test]
    fn strips_prefix_and_keeps_order() {
        let topics = parse_daily_trends(BODY, 3).unwrap();
        let names: Vec<&str> = topics.iter().map(Topic::name).collect();
        assert_eq!(names, ["Tema A", "Tema B", "Tema C"]);
    }

    #[test]
    fn malformed_body_is_a_decode_error() {
        let err = parse_daily_trends("<html>", 3).unwrap_err();
        assert!(matches!(err, PipelineError::Decode { .. }));
    }

    #[tokio::test]
    async fn fetches_region_trends() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/trends/api/dailytrends")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("geo".into(), "MX".into()),
                Matcher::UrlEncoded("hl".into(), "es-MX".into()),
            ]))
            .with_status(200)
            .with_body(BODY)
            .create_async()
            .await;

        let source = GoogleTrends::new(Client::new(), "MX", "es-MX").with_base_url(server.url());
        let topics = source.trending(2).await.ready().unwrap();
        assert_eq!(topics.len(), 2);
        assert_eq!(topics[1].slug(), "tema_b");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn upstream_error_is_contained() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/trends/api/dailytrends")
            .match_query(Matcher::Any)
            .with_status(429)
            .create_async()
            .await;

        let source = GoogleTrends::new(Client::new(), "MX", "es-MX").with_base_url(server.url());
        assert!(matches!(
            source.trending(3).await,
            Outcome::Failed(PipelineError::Upstream { status: 429, .. })
        ));
    }

    #[tokio::test]
    async fn empty_list_is_empty_outcome() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/trends/api/dailytrends")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"default":{"trendingSearchesDays":[]}}"#)
            .create_async()
            .await;

        let source = GoogleTrends::new(Client::new(), "MX", "es-MX").with_base_url(server.url());
        assert!(matches!(source.trending(3).await, Outcome::Empty));
    }
}
