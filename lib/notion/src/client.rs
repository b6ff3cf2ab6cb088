//! HTTP client for the Notion data-source API.

use crate::filter::{DueWindow, select_due};
use crate::parse::parse_pages;
use async_trait::async_trait;
use chrono::Local;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use serde_json::{Value, json};
use std::time::Duration;
use telepost_core::{MessageId, PageId, Post, PostStatus, StoreError, TaskStore};
use tracing::{debug, error, info, warn};

const DEFAULT_BASE_URL: &str = "https://api.notion.com/v1";
const NOTION_VERSION: &str = "2025-09-03";
const QUERY_PAGE_SIZE: u32 = 100;
const UPDATE_TIMEOUT: Duration = Duration::from_secs(10);

/// Client for the Notion data-source holding the editorial calendar.
///
/// Reads are paginated and filtered locally; the store is not assumed to
/// support the due predicate. Writes touch exactly the Status property.
pub struct NotionClient {
    http: reqwest::Client,
    token: String,
    data_source_id: String,
    type_field: String,
    base_url: String,
}

impl NotionClient {
    /// Creates a client for one data source.
    ///
    /// `type_field` names the type property of the editorial schema
    /// (`Tipo` in the reference database).
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed from the
    /// given token.
    pub fn new(
        token: impl Into<String>,
        data_source_id: impl Into<String>,
        type_field: impl Into<String>,
    ) -> telepost_core::Result<Self, StoreError> {
        let token = token.into();
        let http = build_http(&token)?;
        Ok(Self {
            http,
            token,
            data_source_id: data_source_id.into(),
            type_field: type_field.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    /// Fetches every due post, in retrieval order.
    ///
    /// One malformed record is logged and skipped; a total request failure
    /// yields an empty sequence.
    pub async fn fetch_due(&self) -> Vec<Post> {
        let pages = match self.query_all_pages().await {
            Ok(pages) => pages,
            Err(err) => {
                error!(error = %err, "failed to fetch posts from the task store");
                return Vec::new();
            }
        };
        let fetched = pages.len();

        let raws = parse_pages(&pages, &self.type_field);
        let window = DueWindow::starting(Local::now());
        let due = select_due(raws, &window);
        info!(
            due = due.len(),
            fetched, "selected posts ready for publication"
        );
        due
    }

    /// Writes the Status property of one record.
    ///
    /// On failure the write is retried exactly once over a freshly built
    /// fallback client before the error is reported.
    ///
    /// # Errors
    ///
    /// Returns the fallback attempt's error when both writes fail.
    pub async fn update_status(
        &self,
        id: &PageId,
        status: PostStatus,
        message_id: Option<MessageId>,
    ) -> Result<(), StoreError> {
        let url = format!("{}/pages/{}", self.base_url, id);
        let payload = status_payload(&status);

        match patch_status(&self.http, &url, &payload).await {
            Ok(()) => {
                info!(%id, %status, message_id = ?message_id, "updated post status");
                Ok(())
            }
            Err(primary) => {
                warn!(%id, error = %primary, "status update failed, retrying over fallback client");
                let fallback = build_http(&self.token)?;
                patch_status(&fallback, &url, &payload).await?;
                info!(%id, %status, message_id = ?message_id, "updated post status via fallback");
                Ok(())
            }
        }
    }

    /// Verifies the data source answers a minimal query.
    ///
    /// # Errors
    ///
    /// Returns the underlying store error when the probe fails.
    pub async fn check_connection(&self) -> Result<(), StoreError> {
        self.query_page(&json!({ "page_size": 1 })).await?;
        info!("task store connection ok");
        Ok(())
    }

    /// Follows continuation cursors until the store is exhausted.
    async fn query_all_pages(&self) -> Result<Vec<Value>, StoreError> {
        let mut pages = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let mut body = json!({ "page_size": QUERY_PAGE_SIZE });
            if let Some(cursor) = &cursor {
                body["start_cursor"] = json!(cursor);
                debug!(cursor, "fetching continuation page");
            }

            let data = self.query_page(&body).await?;
            if let Some(batch) = data.get("results").and_then(Value::as_array) {
                pages.extend(batch.iter().cloned());
            }
            debug!(total = pages.len(), "fetched store page");

            match data.get("next_cursor").and_then(Value::as_str) {
                Some(next) => cursor = Some(next.to_string()),
                None => break,
            }
        }

        Ok(pages)
    }

    async fn query_page(&self, body: &Value) -> Result<Value, StoreError> {
        let url = format!(
            "{}/data_sources/{}/query",
            self.base_url, self.data_source_id
        );
        let response = self
            .http
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| StoreError::Transport {
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(StoreError::Api {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        response.json().await.map_err(|e| StoreError::Transport {
            reason: e.to_string(),
        })
    }
}

#[async_trait]
impl TaskStore for NotionClient {
    async fn fetch_due(&self) -> Vec<Post> {
        NotionClient::fetch_due(self).await
    }

    async fn update_status(
        &self,
        id: &PageId,
        status: PostStatus,
        message_id: Option<MessageId>,
    ) -> Result<(), StoreError> {
        NotionClient::update_status(self, id, status, message_id).await
    }
}

fn build_http(token: &str) -> Result<reqwest::Client, StoreError> {
    let mut headers = HeaderMap::new();
    let mut auth =
        HeaderValue::from_str(&format!("Bearer {token}")).map_err(|e| StoreError::Transport {
            reason: format!("invalid store token: {e}"),
        })?;
    auth.set_sensitive(true);
    headers.insert(AUTHORIZATION, auth);
    headers.insert("Notion-Version", HeaderValue::from_static(NOTION_VERSION));

    reqwest::Client::builder()
        .default_headers(headers)
        .build()
        .map_err(|e| StoreError::Transport {
            reason: e.to_string(),
        })
}

async fn patch_status(
    http: &reqwest::Client,
    url: &str,
    payload: &Value,
) -> Result<(), StoreError> {
    let response = http
        .patch(url)
        .timeout(UPDATE_TIMEOUT)
        .json(payload)
        .send()
        .await
        .map_err(|e| StoreError::Transport {
            reason: e.to_string(),
        })?;

    let status = response.status();
    if !status.is_success() {
        return Err(StoreError::Api {
            status: status.as_u16(),
            body: response.text().await.unwrap_or_default(),
        });
    }
    Ok(())
}

fn status_payload(status: &PostStatus) -> Value {
    json!({
        "properties": {
            "Status": {
                "status": { "name": status.as_store_str() }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rootcause::prelude::Report;

    #[test]
    fn status_payload_touches_only_the_status_property() {
        let payload = status_payload(&PostStatus::Published);
        let properties = payload["properties"]
            .as_object()
            .expect("properties object");

        assert_eq!(properties.len(), 1);
        assert_eq!(
            payload["properties"]["Status"]["status"]["name"],
            "Pubblicato"
        );
    }

    #[test]
    fn client_builds_with_plain_token() {
        let client = NotionClient::new("secret-token", "ds-1", "Tipo");
        assert!(client.is_ok());
    }

    #[test]
    fn client_rejects_non_ascii_token() {
        let client = NotionClient::new("bad\ntoken", "ds-1", "Tipo");
        assert!(client.is_err());
    }

    #[test]
    fn constructor_failures_surface_as_store_error_reports() {
        let Err(report) = NotionClient::new("bad\ntoken", "ds-1", "Tipo") else {
            panic!("a non-ascii token must fail");
        };
        let _: Report<StoreError> = report;
    }
}
