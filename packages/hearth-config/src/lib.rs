mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	Bm25Params, Config, EmbeddingProviderConfig, Fusion, FusionWeights, Mmr, PARTITION_KEYS,
	ProviderConfig, Providers, Recency, Reranker, Retrieval, Service, Vector,
};

use std::{collections::BTreeMap, fs, path::Path};

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;

	let mut cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	validate_providers(cfg)?;

	let retrieval = &cfg.retrieval;

	if retrieval.top_k == 0 {
		return Err(Error::Validation {
			message: "retrieval.top_k must be greater than zero.".to_string(),
		});
	}
	if retrieval.result_limit == 0 {
		return Err(Error::Validation {
			message: "retrieval.result_limit must be greater than zero.".to_string(),
		});
	}
	if retrieval.result_limit > retrieval.top_k {
		return Err(Error::Validation {
			message: "retrieval.result_limit must be less than or equal to retrieval.top_k."
				.to_string(),
		});
	}
	if retrieval.per_call_deadline_ms == 0 {
		return Err(Error::Validation {
			message: "retrieval.per_call_deadline_ms must be greater than zero.".to_string(),
		});
	}
	if retrieval.adapter_timeout_ms == 0 {
		return Err(Error::Validation {
			message: "retrieval.adapter_timeout_ms must be greater than zero.".to_string(),
		});
	}

	let weights = &retrieval.fusion_weights;

	for (label, weight) in [
		("retrieval.fusion_weights.vector", weights.vector),
		("retrieval.fusion_weights.bm25", weights.bm25),
		("retrieval.fusion_weights.recency", weights.recency),
	] {
		require_non_negative(label, weight)?;
	}

	if weights.vector + weights.bm25 + weights.recency <= 0.0 {
		return Err(Error::Validation {
			message: "retrieval.fusion_weights must have a total greater than zero.".to_string(),
		});
	}
	if !matches!(retrieval.fusion.bm25_normalization.as_str(), "min_max" | "saturation") {
		return Err(Error::Validation {
			message: "retrieval.fusion.bm25_normalization must be one of min_max or saturation."
				.to_string(),
		});
	}

	require_positive("retrieval.fusion.bm25_saturation", retrieval.fusion.bm25_saturation)?;
	require_positive("retrieval.bm25_params.k1", retrieval.bm25_params.k1)?;
	require_unit_range("retrieval.bm25_params.b", retrieval.bm25_params.b)?;
	require_unit_range("retrieval.vector.min_similarity", retrieval.vector.min_similarity)?;
	require_positive(
		"retrieval.recency.default_half_life_days",
		retrieval.recency.default_half_life_days,
	)?;
	validate_partition_table(
		"retrieval.recency_half_life_by_partition",
		&retrieval.recency_half_life_by_partition,
	)?;
	validate_partition_table("retrieval.recency_ttl_by_partition", &retrieval.recency_ttl_by_partition)?;

	if retrieval.reranker.batch_size == 0 {
		return Err(Error::Validation {
			message: "retrieval.reranker.batch_size must be greater than zero.".to_string(),
		});
	}
	if retrieval.reranker.concurrency_cap == 0 {
		return Err(Error::Validation {
			message: "retrieval.reranker.concurrency_cap must be greater than zero.".to_string(),
		});
	}
	if !matches!(retrieval.reranker.normalization.as_str(), "clamp" | "sigmoid" | "min_max") {
		return Err(Error::Validation {
			message:
				"retrieval.reranker.normalization must be one of clamp, sigmoid, or min_max."
					.to_string(),
		});
	}

	require_unit_range("retrieval.mmr.lambda", retrieval.mmr.lambda)?;
	require_unit_range("retrieval.mmr.recency_weight", retrieval.mmr.recency_weight)?;

	Ok(())
}

fn validate_providers(cfg: &Config) -> Result<()> {
	let embedding = &cfg.providers.embedding;
	let rerank = &cfg.providers.rerank;

	for (label, value) in [
		("providers.embedding.api_base", &embedding.api_base),
		("providers.embedding.path", &embedding.path),
		("providers.embedding.model", &embedding.model),
		("providers.rerank.api_base", &rerank.api_base),
		("providers.rerank.path", &rerank.path),
		("providers.rerank.model", &rerank.model),
	] {
		if value.trim().is_empty() {
			return Err(Error::Validation { message: format!("{label} must be non-empty.") });
		}
	}
	for (label, key) in [("embedding", &embedding.api_key), ("rerank", &rerank.api_key)] {
		if key.trim().is_empty() {
			return Err(Error::Validation {
				message: format!("Provider {label} api_key must be non-empty."),
			});
		}
	}

	if embedding.dimensions == 0 {
		return Err(Error::Validation {
			message: "providers.embedding.dimensions must be greater than zero.".to_string(),
		});
	}
	if embedding.timeout_ms == 0 || rerank.timeout_ms == 0 {
		return Err(Error::Validation {
			message: "Provider timeout_ms must be greater than zero.".to_string(),
		});
	}

	Ok(())
}

fn validate_partition_table(label: &str, table: &BTreeMap<String, f32>) -> Result<()> {
	for (partition, days) in table {
		if !PARTITION_KEYS.contains(&partition.as_str()) {
			return Err(Error::Validation {
				message: format!(
					"{label} has unknown partition {partition:?}; expected one of long_term, healthcare, short_term, or other."
				),
			});
		}

		require_positive(&format!("{label}.{partition}"), *days)?;
	}

	Ok(())
}

fn require_non_negative(label: &str, value: f32) -> Result<()> {
	if !value.is_finite() {
		return Err(Error::Validation { message: format!("{label} must be a finite number.") });
	}
	if value < 0.0 {
		return Err(Error::Validation { message: format!("{label} must be zero or greater.") });
	}

	Ok(())
}

fn require_positive(label: &str, value: f32) -> Result<()> {
	if !value.is_finite() {
		return Err(Error::Validation { message: format!("{label} must be a finite number.") });
	}
	if value <= 0.0 {
		return Err(Error::Validation {
			message: format!("{label} must be greater than zero."),
		});
	}

	Ok(())
}

fn require_unit_range(label: &str, value: f32) -> Result<()> {
	if !value.is_finite() {
		return Err(Error::Validation { message: format!("{label} must be a finite number.") });
	}
	if !(0.0..=1.0).contains(&value) {
		return Err(Error::Validation {
			message: format!("{label} must be in the range 0.0-1.0."),
		});
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	if cfg.service.log_level.trim().is_empty() {
		cfg.service.log_level = "info".to_string();
	}

	let retrieval = &mut cfg.retrieval;

	retrieval.recency_half_life_by_partition =
		normalize_partition_keys(std::mem::take(&mut retrieval.recency_half_life_by_partition));
	retrieval.recency_ttl_by_partition =
		normalize_partition_keys(std::mem::take(&mut retrieval.recency_ttl_by_partition));
	retrieval.fusion.bm25_normalization =
		retrieval.fusion.bm25_normalization.trim().to_ascii_lowercase();
	retrieval.reranker.normalization = retrieval.reranker.normalization.trim().to_ascii_lowercase();
}

fn normalize_partition_keys(table: BTreeMap<String, f32>) -> BTreeMap<String, f32> {
	table.into_iter().map(|(key, value)| (key.trim().to_ascii_lowercase(), value)).collect()
}
