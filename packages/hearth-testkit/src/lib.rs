//! Fakes and fixtures for exercising the recall pipeline without real stores or models.

mod providers;
mod stores;

pub use providers::{FailingEmbedding, FixedEmbedding, ScriptedRerank};
pub use stores::StaticStore;

use std::sync::Arc;

use serde_json::Map;

use hearth_config::{Config, EmbeddingProviderConfig, ProviderConfig, Providers, Retrieval, Service};
use hearth_service::{
	EmbeddingProvider, Providers as ServiceProviders, RecallService, RerankProvider, StoreAdapter,
};

/// A valid config with default retrieval settings and unreachable provider endpoints.
pub fn test_config() -> Config {
	Config {
		service: Service::default(),
		providers: Providers {
			embedding: EmbeddingProviderConfig {
				provider_id: "test".to_string(),
				api_base: "http://127.0.0.1:9".to_string(),
				api_key: "test-key".to_string(),
				path: "/embeddings".to_string(),
				model: "test-embed".to_string(),
				dimensions: 3,
				timeout_ms: 1_000,
				default_headers: Map::new(),
			},
			rerank: ProviderConfig {
				provider_id: "test".to_string(),
				api_base: "http://127.0.0.1:9".to_string(),
				api_key: "test-key".to_string(),
				path: "/rerank".to_string(),
				model: "test-rerank".to_string(),
				timeout_ms: 1_000,
				default_headers: Map::new(),
			},
		},
		retrieval: Retrieval::default(),
	}
}

pub fn service(
	retrieval: Retrieval,
	stores: Vec<Arc<dyn StoreAdapter>>,
	embedding: Arc<dyn EmbeddingProvider>,
	rerank: Arc<dyn RerankProvider>,
) -> RecallService {
	let mut cfg = test_config();

	cfg.retrieval = retrieval;

	RecallService::with_providers(cfg, stores, ServiceProviders::new(embedding, rerank))
}
