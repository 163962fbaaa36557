use std::sync::Arc;

use crate::core::config::{AppPaths, ConfigService, Settings, VectorBackend};
use crate::core::security::AdminToken;
use crate::graph::{build_diagnostic_graph, DiagnosticGraph};
use crate::llm::{DiagnosticGenerator, OpenAiClient, StructuredGenerator};
use crate::rag::seed::reference_manuals;
use crate::rag::{InMemoryManualStore, ManualIndex, QdrantManualStore};

pub mod error;

pub use error::InitializationError;

/// Application state shared across all routes and background tasks.
#[derive(Clone)]
pub struct AppState {
    pub config: ConfigService,
    pub settings: Arc<Settings>,
    pub admin_token: Option<AdminToken>,
    pub index: Arc<dyn ManualIndex>,
    pub generator: Arc<dyn DiagnosticGenerator>,
    pub graph: Arc<DiagnosticGraph>,
}

impl AppState {
    /// Loads settings and wires the generator, manual index and loop.
    pub async fn initialize(paths: Arc<AppPaths>) -> Result<Arc<Self>, InitializationError> {
        let config = ConfigService::new(paths);
        let settings = config.load_settings()?;

        let client = Arc::new(OpenAiClient::new(&settings.llm)?);
        let generator: Arc<dyn DiagnosticGenerator> =
            Arc::new(StructuredGenerator::new(client.clone()));

        let index: Arc<dyn ManualIndex> = match settings.vector_store.backend {
            VectorBackend::Qdrant => {
                tracing::info!(
                    "Using Qdrant at {} (collection {})",
                    settings.vector_store.url,
                    settings.vector_store.collection
                );
                Arc::new(QdrantManualStore::new(&settings.vector_store, client)?)
            }
            VectorBackend::Memory => {
                tracing::info!("Using in-memory manual index preloaded with reference manuals");
                Arc::new(InMemoryManualStore::with_chunks(reference_manuals()))
            }
        };

        Ok(Self::from_parts(config, settings, index, generator))
    }

    /// Assembles state from already-built collaborators.
    pub fn from_parts(
        config: ConfigService,
        settings: Settings,
        index: Arc<dyn ManualIndex>,
        generator: Arc<dyn DiagnosticGenerator>,
    ) -> Arc<Self> {
        let admin_token = AdminToken::from_setting(settings.admin.api_key.as_deref());
        if admin_token.is_none() {
            tracing::warn!("No admin API key configured; admin routes are unauthenticated");
        }
        let graph = Arc::new(build_diagnostic_graph(&settings.agent));

        Arc::new(AppState {
            config,
            settings: Arc::new(settings),
            admin_token,
            index,
            generator,
            graph,
        })
    }
}
