use std::collections::{BTreeSet, HashSet};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::store::{ManualIndex, ManualSearch, SearchError};
use crate::schema::ManualChunk;

const TAG_MATCH_WEIGHT: f32 = 2.0;
/// Untagged passages are general guidance and stay eligible for any query.
const UNTAGGED_BASELINE: f32 = 0.05;

/// Process-local manual index.
///
/// Scores chunks by exact error-code tag match plus word overlap with the
/// query, so it needs no embedding model. Untagged chunks never score zero,
/// which keeps general guidance reachable from the fallback query.
#[derive(Default)]
pub struct InMemoryManualStore {
    chunks: RwLock<Vec<ManualChunk>>,
}

impl InMemoryManualStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_chunks(chunks: Vec<ManualChunk>) -> Self {
        let mut merged: Vec<ManualChunk> = Vec::with_capacity(chunks.len());
        for chunk in chunks {
            upsert_into(&mut merged, chunk);
        }
        Self {
            chunks: RwLock::new(merged),
        }
    }
}

fn upsert_into(chunks: &mut Vec<ManualChunk>, chunk: ManualChunk) {
    match chunks.iter_mut().find(|c| c.chunk_id == chunk.chunk_id) {
        Some(existing) => *existing = chunk,
        None => chunks.push(chunk),
    }
}

fn tokenize(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric() && c != '-')
        .map(|token| token.trim_matches('-').to_lowercase())
        .filter(|token| token.len() > 1)
        .collect()
}

fn score(chunk: &ManualChunk, query: &str, query_terms: &HashSet<String>) -> f32 {
    let tag_hit = chunk
        .related_error_codes
        .iter()
        .any(|code| code.eq_ignore_ascii_case(query.trim()));

    let content_terms = tokenize(&chunk.content);
    let overlap = query_terms.intersection(&content_terms).count();
    let coverage = if query_terms.is_empty() {
        0.0
    } else {
        overlap as f32 / query_terms.len() as f32
    };

    if tag_hit {
        TAG_MATCH_WEIGHT + coverage
    } else if chunk.related_error_codes.is_empty() {
        UNTAGGED_BASELINE + coverage
    } else {
        coverage
    }
}

#[async_trait]
impl ManualSearch for InMemoryManualStore {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<ManualChunk>, SearchError> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let query_terms = tokenize(query);
        let chunks = self.chunks.read().await;
        let mut scored: Vec<(f32, &ManualChunk)> = chunks
            .iter()
            .map(|chunk| (score(chunk, query, &query_terms), chunk))
            .filter(|(s, _)| *s > 0.0)
            .collect();

        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

        Ok(scored
            .into_iter()
            .take(limit)
            .map(|(_, chunk)| chunk.clone())
            .collect())
    }
}

#[async_trait]
impl ManualIndex for InMemoryManualStore {
    fn as_search(&self) -> &dyn ManualSearch {
        self
    }

    async fn upsert(&self, chunks: Vec<ManualChunk>) -> Result<usize, SearchError> {
        let count = chunks.len();
        let mut stored = self.chunks.write().await;
        for chunk in chunks {
            upsert_into(&mut stored, chunk);
        }
        Ok(count)
    }

    async fn count(&self) -> Result<usize, SearchError> {
        Ok(self.chunks.read().await.len())
    }

    async fn list_sources(&self) -> Result<Vec<String>, SearchError> {
        let chunks = self.chunks.read().await;
        let sources: BTreeSet<String> = chunks.iter().map(|c| c.source_doc.clone()).collect();
        Ok(sources.into_iter().collect())
    }
}
