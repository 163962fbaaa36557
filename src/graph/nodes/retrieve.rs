// Retrieve Node
// Fetches manual passages for each active error code

use std::collections::HashSet;

use async_trait::async_trait;
use futures_util::future::try_join_all;

use crate::graph::node::{GraphError, Node, NodeContext};
use crate::graph::state::{RunState, StateUpdate};
use crate::schema::ManualChunk;

pub const DEFAULT_PER_QUERY_LIMIT: usize = 2;

pub struct RetrieveNode {
    per_query_limit: usize,
}

impl RetrieveNode {
    pub fn new(per_query_limit: usize) -> Self {
        Self { per_query_limit }
    }
}

impl Default for RetrieveNode {
    fn default() -> Self {
        Self::new(DEFAULT_PER_QUERY_LIMIT)
    }
}

/// Concatenates per-query results in query order, keeping the first
/// occurrence of each chunk id.
pub fn merge_unique(batches: Vec<Vec<ManualChunk>>) -> Vec<ManualChunk> {
    let mut seen = HashSet::new();
    batches
        .into_iter()
        .flatten()
        .filter(|chunk| seen.insert(chunk.chunk_id.clone()))
        .collect()
}

#[async_trait]
impl Node for RetrieveNode {
    fn id(&self) -> &'static str {
        "retrieve"
    }

    fn name(&self) -> &'static str {
        "Context Retrieval"
    }

    async fn execute(
        &self,
        state: &RunState,
        ctx: &NodeContext<'_>,
    ) -> Result<StateUpdate, GraphError> {
        let queries = state.telemetry.search_queries();
        tracing::info!("Retrieving manuals for {} queries", queries.len());

        let lookups = queries
            .iter()
            .map(|query| ctx.search.search(query, self.per_query_limit));
        let batches = try_join_all(lookups)
            .await
            .map_err(|e| GraphError::new(self.id(), e.to_string()))?;

        let docs = merge_unique(batches);
        tracing::info!("Retrieved {} unique passages", docs.len());
        Ok(StateUpdate::Retrieved(docs))
    }
}
