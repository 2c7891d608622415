use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::{Map, Value};

/// Partition names accepted as keys in per-partition tables.
pub const PARTITION_KEYS: [&str; 4] = ["long_term", "healthcare", "short_term", "other"];

#[derive(Clone, Debug, Deserialize)]
pub struct Config {
	#[serde(default)]
	pub service: Service,
	pub providers: Providers,
	#[serde(default)]
	pub retrieval: Retrieval,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Service {
	pub log_level: String,
}
impl Default for Service {
	fn default() -> Self {
		Self { log_level: default_log_level() }
	}
}

#[derive(Clone, Debug, Deserialize)]
pub struct Providers {
	pub embedding: EmbeddingProviderConfig,
	pub rerank: ProviderConfig,
}

#[derive(Clone, Debug, Deserialize)]
pub struct EmbeddingProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub dimensions: u32,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Retrieval {
	/// Post-fusion cutoff. The reranker never sees more than this many candidates.
	pub top_k: u32,
	/// Post-MMR size. Must not exceed `top_k`.
	pub result_limit: u32,
	pub per_call_deadline_ms: u64,
	/// Upper bound for a single store adapter. The remaining call deadline still applies.
	pub adapter_timeout_ms: u64,
	/// Default lookback window handed to store adapters. Zero means unbounded.
	pub time_window_days: u32,
	pub fusion_weights: FusionWeights,
	pub fusion: Fusion,
	pub bm25_params: Bm25Params,
	pub vector: Vector,
	pub recency: Recency,
	pub recency_half_life_by_partition: BTreeMap<String, f32>,
	pub recency_ttl_by_partition: BTreeMap<String, f32>,
	pub reranker: Reranker,
	pub mmr: Mmr,
}
impl Default for Retrieval {
	fn default() -> Self {
		Self {
			top_k: 20,
			result_limit: 8,
			per_call_deadline_ms: 8_000,
			adapter_timeout_ms: 3_000,
			time_window_days: 0,
			fusion_weights: FusionWeights::default(),
			fusion: Fusion::default(),
			bm25_params: Bm25Params::default(),
			vector: Vector::default(),
			recency: Recency::default(),
			recency_half_life_by_partition: default_half_life_by_partition(),
			recency_ttl_by_partition: default_ttl_by_partition(),
			reranker: Reranker::default(),
			mmr: Mmr::default(),
		}
	}
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct FusionWeights {
	pub vector: f32,
	pub bm25: f32,
	pub recency: f32,
}
impl Default for FusionWeights {
	fn default() -> Self {
		Self { vector: 0.5, bm25: 0.4, recency: 0.1 }
	}
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Fusion {
	/// One of "min_max" or "saturation".
	pub bm25_normalization: String,
	/// Half-saturation point for the "saturation" mode.
	pub bm25_saturation: f32,
}
impl Default for Fusion {
	fn default() -> Self {
		Self { bm25_normalization: "min_max".to_string(), bm25_saturation: 5.0 }
	}
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Bm25Params {
	pub k1: f32,
	pub b: f32,
}
impl Default for Bm25Params {
	fn default() -> Self {
		Self { k1: 1.2, b: 0.75 }
	}
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Vector {
	/// Similarities below this floor score zero.
	pub min_similarity: f32,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Recency {
	pub default_half_life_days: f32,
}
impl Default for Recency {
	fn default() -> Self {
		Self { default_half_life_days: 30.0 }
	}
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Reranker {
	pub enabled: bool,
	pub batch_size: u32,
	pub concurrency_cap: u32,
	/// One of "clamp", "sigmoid", or "min_max".
	pub normalization: String,
}
impl Default for Reranker {
	fn default() -> Self {
		Self { enabled: true, batch_size: 8, concurrency_cap: 2, normalization: "clamp".to_string() }
	}
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Mmr {
	pub lambda: f32,
	pub recency_weight: f32,
}
impl Default for Mmr {
	fn default() -> Self {
		Self { lambda: 0.7, recency_weight: 0.0 }
	}
}

fn default_log_level() -> String {
	"info".to_string()
}

fn default_half_life_by_partition() -> BTreeMap<String, f32> {
	BTreeMap::from([
		("long_term".to_string(), 180.0),
		("healthcare".to_string(), 14.0),
		("short_term".to_string(), 6.0),
		("other".to_string(), 30.0),
	])
}

fn default_ttl_by_partition() -> BTreeMap<String, f32> {
	BTreeMap::from([("short_term".to_string(), 14.0)])
}
