use std::{collections::BTreeMap, time::Duration};

use serde_json::Value;

use crate::{
	Error, Result,
	recall::ranking::{
		diversity::MmrSettings,
		fusion::FusionWeights,
		lexical::{Bm25Normalization, Bm25Params},
		recency::RecencyPolicy,
		rerank::{RerankSettings, ScoreNormalization},
	},
};
use hearth_config::Retrieval;
use hearth_domain::Partition;

/// Typed ranking policy for one call, resolved from `[retrieval]`.
#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedPolicy {
	pub top_k: usize,
	pub result_limit: usize,
	pub per_call_deadline: Duration,
	pub adapter_timeout: Duration,
	pub time_window_days: u32,
	pub weights: FusionWeights,
	pub bm25: Bm25Params,
	pub bm25_normalization: Bm25Normalization,
	pub min_similarity: f32,
	pub recency: RecencyPolicy,
	pub rerank: RerankSettings,
	pub mmr: MmrSettings,
}
impl ResolvedPolicy {
	pub fn resolve(cfg: &Retrieval) -> Result<Self> {
		if cfg.top_k == 0 || cfg.result_limit == 0 || cfg.result_limit > cfg.top_k {
			return Err(Error::InvalidRequest {
				message: "retrieval.result_limit must be between 1 and retrieval.top_k.".to_string(),
			});
		}

		let bm25_normalization = match cfg.fusion.bm25_normalization.as_str() {
			"min_max" => Bm25Normalization::MinMax,
			"saturation" => Bm25Normalization::Saturation { half_point: cfg.fusion.bm25_saturation },
			other => {
				return Err(Error::InvalidRequest {
					message: format!("Unknown BM25 normalization {other:?}."),
				});
			},
		};
		let normalization = match cfg.reranker.normalization.as_str() {
			"clamp" => ScoreNormalization::Clamp,
			"sigmoid" => ScoreNormalization::Sigmoid,
			"min_max" => ScoreNormalization::MinMax,
			other => {
				return Err(Error::InvalidRequest {
					message: format!("Unknown reranker normalization {other:?}."),
				});
			},
		};

		let recency = RecencyPolicy {
			default_half_life_days: cfg.recency.default_half_life_days,
			half_life_days: partition_table(&cfg.recency_half_life_by_partition)?,
			ttl_days: partition_table(&cfg.recency_ttl_by_partition)?,
		};

		// A zero half-life turns the decay of a fresh record into 0/0.
		for half_life in std::iter::once(recency.default_half_life_days)
			.chain(recency.half_life_days.values().copied())
		{
			if !half_life.is_finite() || half_life <= 0.0 {
				return Err(Error::InvalidRequest {
					message: "Recency half-lives must be finite and greater than zero.".to_string(),
				});
			}
		}

		Ok(Self {
			top_k: cfg.top_k as usize,
			result_limit: cfg.result_limit as usize,
			per_call_deadline: Duration::from_millis(cfg.per_call_deadline_ms),
			adapter_timeout: Duration::from_millis(cfg.adapter_timeout_ms),
			time_window_days: cfg.time_window_days,
			weights: FusionWeights {
				vector: cfg.fusion_weights.vector,
				bm25: cfg.fusion_weights.bm25,
				recency: cfg.fusion_weights.recency,
			},
			bm25: Bm25Params { k1: cfg.bm25_params.k1, b: cfg.bm25_params.b },
			bm25_normalization,
			min_similarity: cfg.vector.min_similarity,
			recency,
			rerank: RerankSettings {
				enabled: cfg.reranker.enabled,
				batch_size: cfg.reranker.batch_size as usize,
				concurrency_cap: cfg.reranker.concurrency_cap as usize,
				normalization,
			},
			mmr: MmrSettings {
				lambda: cfg.mmr.lambda,
				recency_weight: cfg.mmr.recency_weight,
				limit: cfg.result_limit as usize,
			},
		})
	}

	/// Everything that influences scores or ordering. Timeouts are left out.
	pub fn snapshot(&self) -> Value {
		let table = |map: &BTreeMap<Partition, f32>| {
			map.iter().map(|(partition, days)| (partition.as_str(), *days)).collect::<BTreeMap<_, _>>()
		};
		let bm25_normalization = match self.bm25_normalization {
			Bm25Normalization::MinMax => serde_json::json!({ "mode": "min_max" }),
			Bm25Normalization::Saturation { half_point } => {
				serde_json::json!({ "mode": "saturation", "half_point": half_point })
			},
		};

		serde_json::json!({
			"top_k": self.top_k,
			"result_limit": self.result_limit,
			"fusion_weights": {
				"vector": self.weights.vector,
				"bm25": self.weights.bm25,
				"recency": self.weights.recency,
			},
			"bm25_params": { "k1": self.bm25.k1, "b": self.bm25.b },
			"bm25_normalization": bm25_normalization,
			"min_similarity": self.min_similarity,
			"recency": {
				"default_half_life_days": self.recency.default_half_life_days,
				"half_life_by_partition": table(&self.recency.half_life_days),
				"ttl_by_partition": table(&self.recency.ttl_days),
			},
			"reranker": {
				"enabled": self.rerank.enabled,
				"batch_size": self.rerank.batch_size,
				"normalization": self.rerank.normalization.as_str(),
			},
			"mmr": { "lambda": self.mmr.lambda, "recency_weight": self.mmr.recency_weight },
		})
	}

	pub fn policy_id(&self) -> Result<String> {
		hash_policy_snapshot(&self.snapshot())
	}
}

pub fn hash_policy_snapshot(payload: &Value) -> Result<String> {
	let raw = serde_json::to_vec(payload).map_err(|err| Error::InvalidRequest {
		message: format!("Failed to encode policy snapshot: {err}"),
	})?;

	Ok(blake3::hash(&raw).to_hex().to_string())
}

fn partition_table(raw: &BTreeMap<String, f32>) -> Result<BTreeMap<Partition, f32>> {
	raw.iter()
		.map(|(name, days)| {
			let partition = name
				.parse::<Partition>()
				.map_err(|err| Error::InvalidRequest { message: err.to_string() })?;

			Ok((partition, *days))
		})
		.collect()
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn resolves_defaults() {
		let policy = ResolvedPolicy::resolve(&Retrieval::default()).expect("resolve failed");

		assert_eq!(policy.top_k, 20);
		assert_eq!(policy.mmr.limit, 8);
		assert_eq!(policy.bm25_normalization, Bm25Normalization::MinMax);
		assert_eq!(policy.rerank.normalization, ScoreNormalization::Clamp);
		assert_eq!(policy.recency.half_life(Partition::ShortTerm), 6.0);
		assert_eq!(policy.recency.ttl_days.get(&Partition::ShortTerm), Some(&14.0));
	}

	#[test]
	fn policy_id_tracks_scoring_knobs_only() {
		let base = Retrieval::default();
		let mut slower = Retrieval::default();
		let mut lambda = Retrieval::default();

		slower.per_call_deadline_ms = 60_000;
		lambda.mmr.lambda = 0.3;

		let id = |cfg: &Retrieval| {
			ResolvedPolicy::resolve(cfg).and_then(|p| p.policy_id()).expect("hash failed")
		};

		assert_eq!(id(&base), id(&slower));
		assert_ne!(id(&base), id(&lambda));
	}

	#[test]
	fn rejects_zero_half_lives() {
		let mut per_partition = Retrieval::default();
		let mut fallback = Retrieval::default();

		per_partition.recency_half_life_by_partition.insert("short_term".to_string(), 0.0);
		fallback.recency.default_half_life_days = 0.0;

		assert!(ResolvedPolicy::resolve(&per_partition).is_err());
		assert!(ResolvedPolicy::resolve(&fallback).is_err());
	}

	#[test]
	fn rejects_unknown_partition_keys() {
		let mut cfg = Retrieval::default();

		cfg.recency_half_life_by_partition.insert("episodic".to_string(), 2.0);

		assert!(ResolvedPolicy::resolve(&cfg).is_err());
	}
}
