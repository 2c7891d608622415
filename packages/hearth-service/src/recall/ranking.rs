pub mod diversity;
pub mod fusion;
pub mod lexical;
pub mod policy;
pub mod recency;
pub mod rerank;
pub mod vector;

use std::cmp::Ordering;

use serde::Serialize;

use hearth_domain::Candidate;

/// Per-call score annotations for one candidate.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct Scores {
	pub emb_score: f32,
	/// Raw BM25, unbounded.
	pub bm25_score: f32,
	/// BM25 rescaled into [0, 1] for fusion.
	#[serde(skip)]
	pub bm25_normalized: f32,
	pub hybrid_score: f32,
	pub recency_score: f32,
	/// Set for top-K survivors only. Holds `hybrid_score` when the reranker could not score it.
	pub cross_encoder_score: Option<f32>,
	/// Set for the final selection only.
	pub mmr_score: Option<f32>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ScoredCandidate {
	#[serde(flatten)]
	pub candidate: Candidate,
	#[serde(flatten)]
	pub scores: Scores,
}
impl ScoredCandidate {
	pub fn new(candidate: Candidate) -> Self {
		Self { candidate, scores: Scores::default() }
	}

	pub fn id(&self) -> &str {
		self.candidate.id()
	}

	/// Relevance used by diversification: the cross-encoder score, or the hybrid score when
	/// the candidate never reached reranking.
	pub fn relevance(&self) -> f32 {
		self.scores.cross_encoder_score.unwrap_or(self.scores.hybrid_score)
	}

	/// Drops every score, leaving the fetched record.
	pub fn clean(&self) -> Candidate {
		self.candidate.clone()
	}
}

/// NaN-safe descending order. NaN sorts last.
pub fn cmp_f32_desc(a: f32, b: f32) -> Ordering {
	match (a.is_nan(), b.is_nan()) {
		(true, true) => Ordering::Equal,
		(true, false) => Ordering::Greater,
		(false, true) => Ordering::Less,
		(false, false) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
	}
}

/// Tie-break shared by every sorting stage: newer `last_updated` first (missing is oldest), then
/// `id` ascending, then partition order so duplicate ids still sort totally.
pub fn cmp_tie_break(lhs: &ScoredCandidate, rhs: &ScoredCandidate) -> Ordering {
	rhs.candidate
		.last_updated()
		.cmp(&lhs.candidate.last_updated())
		.then_with(|| lhs.id().cmp(rhs.id()))
		.then_with(|| lhs.candidate.partition().cmp(&rhs.candidate.partition()))
}

/// Sorts by `score` descending, then by [`cmp_tie_break`].
pub fn sort_by_score<F>(candidates: &mut [ScoredCandidate], score: F)
where
	F: Fn(&ScoredCandidate) -> f32,
{
	candidates.sort_by(|lhs, rhs| {
		cmp_f32_desc(score(lhs), score(rhs)).then_with(|| cmp_tie_break(lhs, rhs))
	});
}
