use std::collections::HashSet;

use crate::recall::ranking::{self, ScoredCandidate};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FusionWeights {
	pub vector: f32,
	pub bm25: f32,
	pub recency: f32,
}
impl FusionWeights {
	pub fn total(&self) -> f32 {
		self.vector + self.bm25 + self.recency
	}
}

/// `w_v * vector + w_b * normalized_bm25 + w_r * recency`.
pub fn fuse(weights: FusionWeights, vector: f32, bm25_normalized: f32, recency: f32) -> f32 {
	weights.vector * vector + weights.bm25 * bm25_normalized + weights.recency * recency
}

/// Fills `hybrid_score` on every candidate from its base scores.
pub fn apply(weights: FusionWeights, candidates: &mut [ScoredCandidate]) {
	for item in candidates {
		let scores = &mut item.scores;

		scores.hybrid_score =
			fuse(weights, scores.emb_score, scores.bm25_normalized, scores.recency_score);
	}
}

/// Keeps the best-ranked occurrence of each id, ordered by `hybrid_score` descending with the
/// shared tie-break.
pub fn dedup_by_id(mut candidates: Vec<ScoredCandidate>) -> Vec<ScoredCandidate> {
	ranking::sort_by_score(&mut candidates, |item| item.scores.hybrid_score);

	let mut seen = HashSet::new();

	candidates.retain(|item| seen.insert(item.id().to_string()));

	candidates
}

/// Deduplicates, sorts, and truncates to the `top_k` shortlist handed to the reranker.
pub fn select_top_k(candidates: Vec<ScoredCandidate>, top_k: usize) -> Vec<ScoredCandidate> {
	let mut ranked = dedup_by_id(candidates);

	ranked.truncate(top_k);

	ranked
}

#[cfg(test)]
mod tests {
	use hearth_domain::Candidate;
	use time::macros::datetime;

	use super::*;

	const WEIGHTS: FusionWeights = FusionWeights { vector: 0.5, bm25: 0.4, recency: 0.1 };

	fn base(candidate: Candidate, emb: f32, bm25: f32, recency: f32) -> ScoredCandidate {
		let mut item = ScoredCandidate::new(candidate);

		item.scores.emb_score = emb;
		item.scores.bm25_normalized = bm25;
		item.scores.recency_score = recency;

		item
	}

	#[test]
	fn fuse_is_a_weighted_sum() {
		assert!((fuse(WEIGHTS, 1.0, 0.5, 0.0) - 0.7).abs() < 1e-6);
		assert_eq!(fuse(WEIGHTS, 0.0, 0.0, 0.0), 0.0);
	}

	#[test]
	fn duplicate_ids_keep_highest_hybrid_occurrence() {
		let mut items = vec![
			base(Candidate::long_term("dup", "family", "son", "Tom"), 0.1, 0.1, 0.0),
			base(Candidate::short_term("dup", "Tom called today"), 0.9, 0.5, 1.0),
			base(Candidate::short_term("solo", "tea"), 0.2, 0.0, 0.0),
		];

		apply(WEIGHTS, &mut items);

		let ranked = dedup_by_id(items);

		assert_eq!(ranked.len(), 2);
		assert_eq!(ranked[0].id(), "dup");
		assert_eq!(ranked[0].candidate.text(), "Tom called today");
	}

	#[test]
	fn top_k_bounds_and_orders_with_tie_break() {
		let ts = datetime!(2024-02-01 00:00 UTC);
		let mut items = vec![
			base(Candidate::short_term("b", "x").with_last_updated(ts), 0.5, 0.0, 0.0),
			base(Candidate::short_term("a", "x").with_last_updated(ts), 0.5, 0.0, 0.0),
			base(Candidate::short_term("c", "x"), 0.5, 0.0, 0.0),
			base(Candidate::short_term("z", "x"), 0.9, 0.0, 0.0),
		];

		apply(WEIGHTS, &mut items);

		let ids: Vec<_> =
			select_top_k(items, 3).iter().map(|item| item.id().to_string()).collect();

		assert_eq!(ids, vec!["z", "a", "b"]);
	}
}
