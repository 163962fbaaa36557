//! Qdrant-backed manual index over the REST API.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use tokio::sync::OnceCell;
use uuid::Uuid;

use super::store::{ManualIndex, ManualSearch, SearchError};
use crate::core::config::VectorStoreSettings;
use crate::llm::EmbeddingProvider;
use crate::schema::ManualChunk;

const SCROLL_PAGE_SIZE: usize = 256;

pub struct QdrantManualStore {
    base_url: String,
    api_key: Option<String>,
    collection: String,
    dimension: usize,
    client: Client,
    embedder: Arc<dyn EmbeddingProvider>,
    collection_ready: OnceCell<()>,
}

impl QdrantManualStore {
    pub fn new(
        settings: &VectorStoreSettings,
        embedder: Arc<dyn EmbeddingProvider>,
    ) -> Result<Self, SearchError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|err| SearchError::Transport(err.to_string()))?;

        Ok(Self {
            base_url: settings.url.trim_end_matches('/').to_string(),
            api_key: settings
                .api_key
                .clone()
                .filter(|key| !key.trim().is_empty()),
            collection: settings.collection.clone(),
            dimension: settings.dimension,
            client,
            embedder,
            collection_ready: OnceCell::new(),
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}/collections/{}{}", self.base_url, self.collection, path);
        let builder = self.client.request(method, url);
        match &self.api_key {
            Some(key) => builder.header("api-key", key),
            None => builder,
        }
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Value, SearchError> {
        let res = builder
            .send()
            .await
            .map_err(|err| SearchError::Transport(err.to_string()))?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(SearchError::Backend {
                status: status.as_u16(),
                body,
            });
        }

        res.json::<Value>()
            .await
            .map_err(|err| SearchError::InvalidPayload(err.to_string()))
    }

    /// Creates the collection on first use. Cosine distance, fixed dimension.
    pub async fn ensure_collection(&self) -> Result<(), SearchError> {
        self.collection_ready
            .get_or_try_init(|| self.create_collection_if_missing())
            .await
            .map(|_| ())
    }

    async fn create_collection_if_missing(&self) -> Result<(), SearchError> {
        let lookup = self
            .request(Method::GET, "")
            .send()
            .await
            .map_err(|err| SearchError::Transport(err.to_string()))?;

        let status = lookup.status();
        let body = if status.is_success() {
            String::new()
        } else {
            lookup.text().await.unwrap_or_default()
        };
        if classify_lookup(status, body)? == CollectionStatus::Exists {
            tracing::debug!("Collection {} already exists", self.collection);
            return Ok(());
        }

        tracing::info!(
            "Creating collection {} (dimension {})",
            self.collection,
            self.dimension
        );
        let body = json!({
            "vectors": { "size": self.dimension, "distance": "Cosine" }
        });
        self.send(self.request(Method::PUT, "").json(&body)).await?;
        Ok(())
    }
}

#[derive(Debug, PartialEq, Eq)]
enum CollectionStatus {
    Exists,
    Missing,
}

/// Only a 404 means the collection is absent; auth and server failures surface as-is.
fn classify_lookup(status: StatusCode, body: String) -> Result<CollectionStatus, SearchError> {
    if status.is_success() {
        Ok(CollectionStatus::Exists)
    } else if status == StatusCode::NOT_FOUND {
        Ok(CollectionStatus::Missing)
    } else {
        Err(SearchError::Backend {
            status: status.as_u16(),
            body,
        })
    }
}

/// Qdrant point ids must be UUIDs or integers; chunk ids are neither.
pub fn point_id(chunk_id: &str) -> Uuid {
    let digest = Sha256::digest(chunk_id.as_bytes());
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&digest[..16]);
    Uuid::from_bytes(bytes)
}

fn chunk_payload(chunk: &ManualChunk) -> Value {
    json!({
        "chunk_id": chunk.chunk_id,
        "content": chunk.content,
        "source_doc": chunk.source_doc,
        "page_number": chunk.page_number,
        "related_error_codes": chunk.related_error_codes,
    })
}

fn chunk_from_payload(point_id: &Value, payload: &Value) -> Result<ManualChunk, SearchError> {
    let field = |name: &str| {
        payload[name]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| SearchError::InvalidPayload(format!("point is missing '{}'", name)))
    };

    let chunk_id = match payload["chunk_id"].as_str() {
        Some(id) => id.to_string(),
        None => match point_id {
            Value::String(id) => id.clone(),
            other => other.to_string(),
        },
    };

    let page_number = payload["page_number"]
        .as_u64()
        .and_then(|page| u32::try_from(page).ok())
        .ok_or_else(|| SearchError::InvalidPayload("point is missing 'page_number'".into()))?;

    let related_error_codes = payload["related_error_codes"]
        .as_array()
        .map(|codes| {
            codes
                .iter()
                .filter_map(|code| code.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default();

    Ok(ManualChunk {
        chunk_id,
        content: field("content")?,
        source_doc: field("source_doc")?,
        page_number,
        related_error_codes,
    })
}

fn parse_search_hits(response: &Value) -> Result<Vec<ManualChunk>, SearchError> {
    let hits = response["result"]
        .as_array()
        .ok_or_else(|| SearchError::InvalidPayload("search response has no result".into()))?;

    hits.iter()
        .map(|hit| chunk_from_payload(&hit["id"], &hit["payload"]))
        .collect()
}

#[async_trait]
impl ManualSearch for QdrantManualStore {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<ManualChunk>, SearchError> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        self.ensure_collection().await?;

        let mut vectors = self.embedder.embed(&[query.to_string()]).await?;
        let vector = vectors
            .pop()
            .ok_or_else(|| SearchError::InvalidPayload("embedder returned no vector".into()))?;

        let body = json!({
            "vector": vector,
            "limit": limit,
            "with_payload": true,
        });
        let response = self
            .send(self.request(Method::POST, "/points/search").json(&body))
            .await?;
        parse_search_hits(&response)
    }
}

#[async_trait]
impl ManualIndex for QdrantManualStore {
    fn as_search(&self) -> &dyn ManualSearch {
        self
    }

    async fn upsert(&self, chunks: Vec<ManualChunk>) -> Result<usize, SearchError> {
        if chunks.is_empty() {
            return Ok(0);
        }
        self.ensure_collection().await?;

        let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
        let vectors = self.embedder.embed(&texts).await?;

        let points: Vec<Value> = chunks
            .iter()
            .zip(vectors)
            .map(|(chunk, vector)| {
                json!({
                    "id": point_id(&chunk.chunk_id).to_string(),
                    "vector": vector,
                    "payload": chunk_payload(chunk),
                })
            })
            .collect();

        let count = points.len();
        self.send(
            self.request(Method::PUT, "/points?wait=true")
                .json(&json!({ "points": points })),
        )
        .await?;

        tracing::info!("Upserted {} manual chunks into {}", count, self.collection);
        Ok(count)
    }

    async fn count(&self) -> Result<usize, SearchError> {
        self.ensure_collection().await?;
        let response = self
            .send(
                self.request(Method::POST, "/points/count")
                    .json(&json!({ "exact": true })),
            )
            .await?;

        response["result"]["count"]
            .as_u64()
            .map(|count| count as usize)
            .ok_or_else(|| SearchError::InvalidPayload("count response has no count".into()))
    }

    async fn list_sources(&self) -> Result<Vec<String>, SearchError> {
        self.ensure_collection().await?;

        let mut sources = BTreeSet::new();
        let mut offset: Option<Value> = None;
        loop {
            let mut body = json!({
                "limit": SCROLL_PAGE_SIZE,
                "with_payload": ["source_doc"],
                "with_vector": false,
            });
            if let Some(next) = offset.take() {
                body["offset"] = next;
            }

            let response = self
                .send(self.request(Method::POST, "/points/scroll").json(&body))
                .await?;

            if let Some(points) = response["result"]["points"].as_array() {
                sources.extend(
                    points
                        .iter()
                        .filter_map(|p| p["payload"]["source_doc"].as_str().map(str::to_string)),
                );
            }

            match &response["result"]["next_page_offset"] {
                Value::Null => break,
                next => offset = Some(next.clone()),
            }
        }

        Ok(sources.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn point_id_is_stable_per_chunk() {
        let a = point_id("abc");
        assert_eq!(a, point_id("abc"));
        assert_ne!(a, point_id("abd"));
    }

    #[test]
    fn collection_is_created_only_when_lookup_is_not_found() {
        assert_eq!(
            classify_lookup(StatusCode::OK, String::new()).unwrap(),
            CollectionStatus::Exists
        );
        assert_eq!(
            classify_lookup(StatusCode::NOT_FOUND, "Not found".into()).unwrap(),
            CollectionStatus::Missing
        );

        for status in [
            StatusCode::UNAUTHORIZED,
            StatusCode::FORBIDDEN,
            StatusCode::INTERNAL_SERVER_ERROR,
        ] {
            match classify_lookup(status, "denied".into()) {
                Err(SearchError::Backend { status: code, body }) => {
                    assert_eq!(code, status.as_u16());
                    assert_eq!(body, "denied");
                }
                other => panic!("unexpected lookup result: {:?}", other),
            }
        }
    }

    #[test]
    fn payload_round_trips_chunk_fields() {
        let chunk = ManualChunk::new(
            "Inspect the sill groove",
            "KONE_Door_Systems_Maintenance_2024.pdf",
            42,
            vec!["E-302".to_string()],
        );
        let id = json!(point_id(&chunk.chunk_id).to_string());

        let restored = chunk_from_payload(&id, &chunk_payload(&chunk)).unwrap();
        assert_eq!(restored, chunk);
    }

    #[test]
    fn search_hits_tolerate_missing_codes() {
        let response = json!({
            "result": [
                {
                    "id": "0f8fad5b-d9cb-469f-a165-70867728950e",
                    "score": 0.91,
                    "payload": {
                        "content": "Engage the pit stop switch",
                        "source_doc": "KONE_Global_Safety_Manual.pdf",
                        "page_number": 5
                    }
                }
            ]
        });

        let hits = parse_search_hits(&response).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].chunk_id, "0f8fad5b-d9cb-469f-a165-70867728950e");
        assert!(hits[0].related_error_codes.is_empty());
    }

    #[test]
    fn search_hits_reject_incomplete_payload() {
        let response = json!({
            "result": [ { "id": 1, "payload": { "content": "x" } } ]
        });
        assert!(matches!(
            parse_search_hits(&response),
            Err(SearchError::InvalidPayload(_))
        ));
    }
}
