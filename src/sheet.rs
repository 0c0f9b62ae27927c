use std::path::Path;

use gcp_auth::{CustomServiceAccount, TokenProvider};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

use crate::error::{PipelineError, PipelineResult, check_status};

const SCOPES: &[&str] = &[
    "https://www.googleapis.com/auth/spreadsheets",
    "https://www.googleapis.com/auth/drive.readonly",
];
const DEFAULT_SHEETS_URL: &str = "https://sheets.googleapis.com";
const DEFAULT_DRIVE_URL: &str = "https://www.googleapis.com";
const SPREADSHEET_MIME: &str = "application/vnd.google-apps.spreadsheet";

/// Append-only destination for extracted scenes.
#[async_trait::async_trait]
pub trait SceneSink {
    async fn append_row(&self, topic: &str, scene: &str) -> PipelineResult<()>;
}

enum SheetAuth {
    ServiceAccount(CustomServiceAccount),
    #[cfg(test)]
    Bearer(String),
}

impl SheetAuth {
    async fn token(&self) -> PipelineResult<String> {
        match self {
            SheetAuth::ServiceAccount(account) => account
                .token(SCOPES)
                .await
                .map(|t| t.as_str().to_string())
                .map_err(|e| PipelineError::Sheet(format!("token request failed: {e}"))),
            #[cfg(test)]
            SheetAuth::Bearer(token) => Ok(token.clone()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct FileList {
    #[serde(default)]
    files: Vec<DriveFile>,
}

#[derive(Debug, Deserialize)]
struct DriveFile {
    id: String,
}

/// Builder resolving a spreadsheet by its document name.
pub struct SheetOpener {
    http: Client,
    auth: SheetAuth,
    sheets_url: String,
    drive_url: String,
}

impl SheetOpener {
    pub fn service_account(http: Client, credentials: impl AsRef<Path>) -> PipelineResult<Self> {
        let credentials = credentials.as_ref();
        let account = CustomServiceAccount::from_file(credentials).map_err(|e| {
            PipelineError::Sheet(format!(
                "could not load service account {}: {e}",
                credentials.display()
            ))
        })?;
        Ok(Self::with_auth(http, SheetAuth::ServiceAccount(account)))
    }

    #[cfg(test)]
    fn bearer(http: Client, token: impl Into<String>) -> Self {
        Self::with_auth(http, SheetAuth::Bearer(token.into()))
    }

    fn with_auth(http: Client, auth: SheetAuth) -> Self {
        Self {
            http,
            auth,
            sheets_url: DEFAULT_SHEETS_URL.to_string(),
            drive_url: DEFAULT_DRIVE_URL.to_string(),
        }
    }

    pub fn with_base_urls(mut self, sheets_url: impl Into<String>, drive_url: impl Into<String>) -> Self {
        self.sheets_url = sheets_url.into();
        self.drive_url = drive_url.into();
        self
    }

    /// Finds the spreadsheet called `name`; rows go to its first worksheet.
    pub async fn open(self, name: &str) -> PipelineResult<GoogleSheet> {
        let token = self.auth.token().await?;
        let query = format!(
            "name = '{}' and mimeType = '{SPREADSHEET_MIME}' and trashed = false",
            name.replace('\\', "\\\\").replace('\'', "\\'")
        );
        let response = self
            .http
            .get(format!("{}/drive/v3/files", self.drive_url))
            .bearer_auth(&token)
            .query(&[
                ("q", query.as_str()),
                ("fields", "files(id,name)"),
                ("supportsAllDrives", "true"),
                ("includeItemsFromAllDrives", "true"),
            ])
            .send()
            .await?;
        let body = check_status("google drive", response).await?.text().await?;
        let list: FileList =
            serde_json::from_str(&body).map_err(|e| PipelineError::decode("google drive", e))?;
        let file = list
            .files
            .into_iter()
            .next()
            .ok_or_else(|| PipelineError::Sheet(format!("spreadsheet {name:?} not found")))?;

        info!(name, id = %file.id, "Opened spreadsheet");
        Ok(GoogleSheet {
            http: self.http,
            auth: self.auth,
            sheets_url: self.sheets_url,
            spreadsheet_id: file.id,
        })
    }
}

/// First worksheet of a Google spreadsheet, written with `values:append`.
pub struct GoogleSheet {
    http: Client,
    auth: SheetAuth,
    sheets_url: String,
    spreadsheet_id: String,
}

#[async_trait::async_trait]
impl SceneSink for GoogleSheet {
    async fn append_row(&self, topic: &str, scene: &str) -> PipelineResult<()> {
        let token = self.auth.token().await?;
        let url = format!(
            "{}/v4/spreadsheets/{}/values/A1:append",
            self.sheets_url, self.spreadsheet_id
        );
        let response = self
            .http
            .post(&url)
            .bearer_auth(&token)
            .query(&[("valueInputOption", "RAW"), ("insertDataOption", "INSERT_ROWS")])
            .json(&json!({ "values": [[topic, scene]] }))
            .send()
            .await?;
        check_status("google sheets", response).await?;
        debug!(topic, scene, "Appended row");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    #[tokio::test]
    async fn opens_by_name_and_appends_rows() {
        let mut server = mockito::Server::new_async().await;
        let lookup = server
            .mock("GET", "/drive/v3/files")
            .match_header("authorization", "Bearer t0k")
            .match_query(Matcher::UrlEncoded(
                "q".into(),
                format!("name = 'Guiones d\\'hoy' and mimeType = '{SPREADSHEET_MIME}' and trashed = false"),
            ))
            .with_status(200)
            .with_body(r#"{"files":[{"id":"sheet-1","name":"Guiones d'hoy"}]}"#)
            .create_async()
            .await;
        let append = server
            .mock("POST", "/v4/spreadsheets/sheet-1/values/A1:append")
            .match_header("authorization", "Bearer t0k")
            .match_query(Matcher::UrlEncoded("valueInputOption".into(), "RAW".into()))
            .match_body(Matcher::Json(json!({ "values": [["Tema A", "Escena 1: A"]] })))
            .with_status(200)
            .with_body("{}")
            .expect(1)
            .create_async()
            .await;

        let sheet = SheetOpener::bearer(Client::new(), "t0k")
            .with_base_urls(server.url(), server.url())
            .open("Guiones d'hoy")
            .await
            .unwrap();
        sheet.append_row("Tema A", "Escena 1: A").await.unwrap();

        lookup.assert_async().await;
        append.assert_async().await;
    }

    #[tokio::test]
    async fn missing_document_is_an_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/drive/v3/files")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"files":[]}"#)
            .create_async()
            .await;

        let result = SheetOpener::bearer(Client::new(), "t0k")
            .with_base_urls(server.url(), server.url())
            .open("nope")
            .await;
        assert!(matches!(result, Err(PipelineError::Sheet(_))));
    }

    #[test]
    fn unreadable_credentials_are_reported() {
        let result = SheetOpener::service_account(Client::new(), "/nonexistent/credentials.json");
        assert!(matches!(result, Err(PipelineError::Sheet(msg)) if msg.contains("credentials.json")));
    }
}
