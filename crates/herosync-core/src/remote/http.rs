//! Remote document store over a plain JSON HTTP API.
//!
//! Documents live at `{base}/{collection}/{id}` and are exchanged as
//! `{ "data": ..., "updated_at": ... }`.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use super::{RemoteDocument, RemoteDocumentStore};
use crate::error::{Error, Result};
use crate::models::{Collection, DocumentData};
use crate::util::{compact_text, normalize_base_url};

#[derive(Clone, Debug)]
pub struct HttpRemoteStore {
    base_url: String,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct PutDocument<'a> {
    data: &'a DocumentData,
    updated_at: DateTime<Utc>,
}

impl HttpRemoteStore {
    /// Build a client for `base_url`; every request is bounded by `timeout`.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let base_url = normalize_base_url(base_url)?;
        Ok(Self {
            base_url,
            client: reqwest::Client::builder().timeout(timeout).build()?,
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn document_url(&self, collection: Collection, id: &str) -> String {
        format!(
            "{}/{}/{}",
            self.base_url,
            collection,
            urlencoding::encode(id)
        )
    }
}

#[async_trait]
impl RemoteDocumentStore for HttpRemoteStore {
    async fn get(&self, collection: Collection, id: &str) -> Result<Option<RemoteDocument>> {
        let response = self
            .client
            .get(self.document_url(collection, id))
            .header("Accept", "application/json")
            .send()
            .await?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => Ok(Some(response.json::<RemoteDocument>().await?)),
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(Error::Remote(parse_api_error(status, &body)))
            }
        }
    }

    async fn set(
        &self,
        collection: Collection,
        id: &str,
        data: &DocumentData,
        updated_at: DateTime<Utc>,
    ) -> Result<()> {
        let response = self
            .client
            .put(self.document_url(collection, id))
            .json(&PutDocument { data, updated_at })
            .send()
            .await?;

        if response.status().is_success() {
            Ok(())
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(Error::Remote(parse_api_error(status, &body)))
        }
    }

    async fn delete(&self, collection: Collection, id: &str) -> Result<()> {
        let response = self
            .client
            .delete(self.document_url(collection, id))
            .send()
            .await?;

        let status = response.status();
        if status.is_success() || status == StatusCode::NOT_FOUND {
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(Error::Remote(parse_api_error(status, &body)))
        }
    }
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: Option<String>,
    message: Option<String>,
}

fn parse_api_error(status: StatusCode, body: &str) -> String {
    if let Ok(payload) = serde_json::from_str::<ApiErrorBody>(body) {
        if let Some(message) = payload.message.or(payload.error) {
            return format!("{} ({})", message.trim(), status.as_u16());
        }
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        format!("HTTP {}", status.as_u16())
    } else {
        format!("{} ({})", compact_text(trimmed), status.as_u16())
    }
}
