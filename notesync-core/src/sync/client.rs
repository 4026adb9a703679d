//! HTTP client for a Kinto-style remote record collection.

use crate::sync::models::{EncryptedEnvelope, RemoteRecord};
use crate::sync::remote::{RemoteError, RemotePage, RemoteStore, WriteGuard};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;

/// Upper bound on `Next-Page` hops in one listing.
const MAX_PAGES: usize = 1000;

#[derive(Deserialize)]
struct ListResponse {
    data: Vec<RemoteRecord>,
}

#[derive(Deserialize)]
struct RecordResponse {
    data: RemoteRecord,
}

#[derive(Serialize)]
struct RecordBody<'a> {
    data: &'a EncryptedEnvelope,
}

/// Remote collection client speaking the Kinto records API.
pub struct KintoClient {
    client: reqwest::Client,
    remote_url: String,
    bucket: String,
    collection: String,
}

impl KintoClient {
    /// Create a new client for `{remote_url}/buckets/{bucket}/collections/{collection}`.
    pub fn new(
        remote_url: &str,
        bucket: &str,
        collection: &str,
        timeout: Duration,
    ) -> Result<Self, RemoteError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RemoteError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            remote_url: remote_url.trim_end_matches('/').to_string(),
            bucket: bucket.to_string(),
            collection: collection.to_string(),
        })
    }

    fn records_url(&self) -> String {
        format!(
            "{}/buckets/{}/collections/{}/records",
            self.remote_url, self.bucket, self.collection
        )
    }

    async fn check(
        response: reqwest::Response,
        record_id: Option<&str>,
    ) -> Result<reqwest::Response, RemoteError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "unknown".to_string());
        Err(RemoteError::from_status(status.as_u16(), record_id, body))
    }
}

/// Parse a quoted ETag such as `"1500"` into a timestamp.
fn parse_etag(value: &str) -> Option<i64> {
    value.trim().trim_matches('"').parse().ok()
}

#[async_trait]
impl RemoteStore for KintoClient {
    async fn list_records(
        &self,
        access_token: &str,
        since: Option<i64>,
    ) -> Result<RemotePage, RemoteError> {
        let mut query = vec![("_sort", "-last_modified".to_string())];
        if let Some(since) = since {
            query.push(("_since", format!("\"{}\"", since)));
        }

        let mut request = self
            .client
            .get(self.records_url())
            .bearer_auth(access_token)
            .query(&query);
        let mut page = RemotePage::default();
        let mut visited = HashSet::new();

        loop {
            let response = request
                .send()
                .await
                .map_err(|e| RemoteError::Transport(e.to_string()))?;
            let response = Self::check(response, None).await?;

            if page.timestamp.is_none() {
                page.timestamp = response
                    .headers()
                    .get("ETag")
                    .and_then(|v| v.to_str().ok())
                    .and_then(parse_etag);
            }
            let next_page = response
                .headers()
                .get("Next-Page")
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);

            let body: ListResponse = response
                .json()
                .await
                .map_err(|e| RemoteError::InvalidResponse(e.to_string()))?;
            page.records.extend(body.data);

            match next_page {
                Some(url) => {
                    if visited.len() >= MAX_PAGES || !visited.insert(url.clone()) {
                        return Err(RemoteError::InvalidResponse(format!(
                            "Next-Page did not terminate after {} pages",
                            visited.len() + 1
                        )));
                    }
                    request = self.client.get(url).bearer_auth(access_token);
                }
                None => break,
            }
        }

        Ok(page)
    }

    async fn put_record(
        &self,
        access_token: &str,
        record: &RemoteRecord,
        guard: WriteGuard,
    ) -> Result<RemoteRecord, RemoteError> {
        let url = format!("{}/{}", self.records_url(), record.id);
        let request = self
            .client
            .put(&url)
            .bearer_auth(access_token)
            .json(&RecordBody {
                data: &record.envelope,
            });
        let request = match guard {
            WriteGuard::Create => request.header("If-None-Match", "*"),
            WriteGuard::IfMatch(ts) => request.header("If-Match", format!("\"{}\"", ts)),
        };

        let response = request
            .send()
            .await
            .map_err(|e| RemoteError::Transport(e.to_string()))?;
        let response = Self::check(response, Some(&record.id)).await?;

        let body: RecordResponse = response
            .json()
            .await
            .map_err(|e| RemoteError::InvalidResponse(e.to_string()))?;
        Ok(body.data)
    }
}
