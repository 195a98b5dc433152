//! HTTP client for the Lifetrack API
//!
//! Every request carries the configured tenant in `X-Tenant-Id`; the client
//! has no way to act on behalf of any other tenant.

use std::collections::HashMap;

use anyhow::{Context, Result};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE, ETAG, IF_MATCH};
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

/// Collections exposed by the API
pub const COLLECTIONS: &[&str] = &["goals", "trips"];

const TENANT_HEADER: &str = "x-tenant-id";

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Unknown collection '{0}'. Expected one of: goals, trips")]
    UnknownCollection(String),

    #[error("API error ({status}): {body}")]
    Api {
        status: reqwest::StatusCode,
        body: String,
    },
}

/// Reject collection names the API does not serve
pub fn validate_collection(collection: &str) -> Result<&str, ClientError> {
    let collection = collection.trim();
    COLLECTIONS
        .iter()
        .find(|known| known.eq_ignore_ascii_case(collection))
        .copied()
        .ok_or_else(|| ClientError::UnknownCollection(collection.to_string()))
}

/// HTTP client for communicating with the Lifetrack API
#[derive(Clone)]
pub struct LifetrackClient {
    client: reqwest::Client,
    base_url: String,
}

impl LifetrackClient {
    /// Create a new client from environment variables
    ///
    /// Env vars:
    /// - LIFETRACK_TENANT_ID: UUID of the tenant to act as (required)
    /// - LIFETRACK_API_URL: Base URL of the API (default http://localhost:8080)
    pub fn from_env() -> Result<Self> {
        let tenant = std::env::var("LIFETRACK_TENANT_ID").context("LIFETRACK_TENANT_ID not set")?;
        let tenant_id = Uuid::parse_str(tenant.trim())
            .with_context(|| format!("LIFETRACK_TENANT_ID is not a UUID: {}", tenant))?;
        let base_url = std::env::var("LIFETRACK_API_URL")
            .unwrap_or_else(|_| "http://localhost:8080".to_string());

        Self::new(&base_url, tenant_id)
    }

    /// Create a new client with explicit configuration
    pub fn new(base_url: &str, tenant_id: Uuid) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            HeaderName::from_static(TENANT_HEADER),
            HeaderValue::from_str(&tenant_id.to_string()).context("Invalid tenant id")?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    #[cfg(test)]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// List records of a collection, optionally filtered
    pub async fn list_records(
        &self,
        collection: &str,
        filters: &HashMap<String, String>,
    ) -> Result<String> {
        let collection = validate_collection(collection)?;
        let response = self
            .client
            .get(self.url(&format!("/{}", collection)))
            .query(filters)
            .send()
            .await
            .with_context(|| format!("Failed to list {}", collection))?;

        render_response(response).await
    }

    pub async fn get_record(&self, collection: &str, id: Uuid) -> Result<String> {
        let collection = validate_collection(collection)?;
        let response = self
            .client
            .get(self.url(&format!("/{}/{}", collection, id)))
            .send()
            .await
            .with_context(|| format!("Failed to get {} {}", collection, id))?;

        render_response(response).await
    }

    pub async fn create_record(&self, collection: &str, fields: &Value) -> Result<String> {
        let collection = validate_collection(collection)?;
        let response = self
            .client
            .post(self.url(&format!("/{}", collection)))
            .json(fields)
            .send()
            .await
            .with_context(|| format!("Failed to create {}", collection))?;

        render_response(response).await
    }

    /// Replace a record's fields; with `version` the update fails if the
    /// record changed since that version was read
    pub async fn update_record(
        &self,
        collection: &str,
        id: Uuid,
        fields: &Value,
        version: Option<i64>,
    ) -> Result<String> {
        let collection = validate_collection(collection)?;
        let mut request = self
            .client
            .put(self.url(&format!("/{}/{}", collection, id)))
            .json(fields);
        if let Some(version) = version {
            request = request.header(IF_MATCH, format!("\"{}\"", version));
        }

        let response = request
            .send()
            .await
            .with_context(|| format!("Failed to update {} {}", collection, id))?;

        render_response(response).await
    }

    pub async fn delete_record(&self, collection: &str, id: Uuid) -> Result<String> {
        let collection = validate_collection(collection)?;
        let response = self
            .client
            .delete(self.url(&format!("/{}/{}", collection, id)))
            .send()
            .await
            .with_context(|| format!("Failed to delete {} {}", collection, id))?;

        render_response(response).await?;
        Ok(format!("Deleted {} {}", collection, id))
    }

    pub async fn goal_summary(&self) -> Result<String> {
        let response = self
            .client
            .get(self.url("/goals/summary"))
            .send()
            .await
            .context("Failed to get goal summary")?;

        render_response(response).await
    }
}

/// Turn a response into tool output: the version (when the API sent one)
/// followed by the pretty-printed body
async fn render_response(response: reqwest::Response) -> Result<String> {
    let status = response.status();
    let version = response
        .headers()
        .get(ETAG)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim_matches('"').to_string());
    let body = response
        .text()
        .await
        .context("Failed to read response body")?;

    if !status.is_success() {
        return Err(ClientError::Api { status, body }.into());
    }

    let pretty = serde_json::from_str::<Value>(&body)
        .ok()
        .and_then(|json| serde_json::to_string_pretty(&json).ok())
        .unwrap_or(body);

    Ok(match version {
        Some(version) => format!("version: {}\n{}", version, pretty),
        None => pretty,
    })
}
