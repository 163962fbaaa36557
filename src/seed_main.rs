//! One-shot ingestion of the reference manuals into the configured index.

use std::sync::Arc;

use anyhow::Context;

use flowguard_engine::core::config::AppPaths;
use flowguard_engine::core::logging;
use flowguard_engine::rag::seed::reference_manuals;
use flowguard_engine::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let paths = Arc::new(AppPaths::new());
    logging::init(&paths);

    let state = AppState::initialize(paths)
        .await
        .context("Failed to initialize application state")?;

    let manuals = reference_manuals();
    tracing::info!("Starting knowledge base seeding ({} chunks)", manuals.len());

    let upserted = state
        .index
        .upsert(manuals)
        .await
        .context("Seeding failed")?;
    let total = state.index.count().await.context("Failed to count indexed chunks")?;

    tracing::info!("Seeding complete: {} upserted, {} chunks indexed", upserted, total);
    Ok(())
}
