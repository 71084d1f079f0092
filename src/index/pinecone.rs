//! Pinecone `query` client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{RecordMetadata, VectorIndexClient, UNKNOWN_TITLE};
use crate::config::IndexConfig;
use crate::error::IndexError;
use crate::retrieval::types::ReferenceDocument;

pub struct PineconeIndex {
    client: Client,
    query_url: String,
    api_key: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    vector: &'a [f32],
    top_k: usize,
    include_metadata: bool,
    include_values: bool,
}

#[derive(Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<QueryMatch>,
}

#[derive(Deserialize)]
struct QueryMatch {
    id: String,
    #[serde(default)]
    score: f32,
    #[serde(default)]
    values: Vec<f32>,
    #[serde(default)]
    metadata: Option<RecordMetadata>,
}

impl PineconeIndex {
    pub fn new(config: &IndexConfig) -> anyhow::Result<Self> {
        anyhow::ensure!(
            !config.host.is_empty(),
            "index host is not set (index.host or PINECONE_INDEX_HOST)"
        );
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| anyhow::anyhow!("PINECONE_API_KEY is not set"))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        let base = if config.host.starts_with("http://") || config.host.starts_with("https://") {
            config.host.trim_end_matches('/').to_string()
        } else {
            format!("https://{}", config.host.trim_end_matches('/'))
        };

        tracing::info!(host = %base, "pinecone index client ready");

        Ok(Self {
            client,
            query_url: format!("{base}/query"),
            api_key,
        })
    }
}

#[async_trait]
impl VectorIndexClient for PineconeIndex {
    async fn search(
        &self,
        vector: &[f32],
        top_k: usize,
    ) -> Result<Vec<ReferenceDocument>, IndexError> {
        let body = QueryRequest {
            vector,
            top_k,
            include_metadata: true,
            include_values: true,
        };

        let response = self
            .client
            .post(&self.query_url)
            .header("Api-Key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(IndexError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: QueryResponse = response.json().await?;
        Ok(into_documents(parsed.matches))
    }
}

/// Convert raw matches to documents, keeping the index's order. Matches that
/// came back without values cannot be projected and are dropped.
fn into_documents(matches: Vec<QueryMatch>) -> Vec<ReferenceDocument> {
    let mut docs = Vec::with_capacity(matches.len());
    for m in matches {
        if m.values.is_empty() {
            tracing::warn!(id = %m.id, "match returned without values, skipping");
            continue;
        }
        let metadata = m.metadata.unwrap_or_default();
        docs.push(ReferenceDocument {
            id: m.id,
            vector: m.values,
            text: metadata.text.unwrap_or_default(),
            title: metadata.title.unwrap_or_else(|| UNKNOWN_TITLE.to_string()),
            score: m.score,
        });
    }
    docs
}
