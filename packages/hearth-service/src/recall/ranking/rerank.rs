use std::sync::Arc;

use tokio::{sync::Semaphore, time::Instant};

use crate::{Error, RerankProvider, recall::ranking::ScoredCandidate};
use hearth_config::ProviderConfig;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScoreNormalization {
	/// Clamp raw scores into [0, 1]. Suits endpoints that already return probabilities.
	Clamp,
	/// Logistic squash of raw logits.
	Sigmoid,
	/// Rescale by the min and max of the call's scored candidates. A flat set maps to 1.0.
	MinMax,
}
impl ScoreNormalization {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Clamp => "clamp",
			Self::Sigmoid => "sigmoid",
			Self::MinMax => "min_max",
		}
	}
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RerankSettings {
	pub enabled: bool,
	pub batch_size: usize,
	pub concurrency_cap: usize,
	pub normalization: ScoreNormalization,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RerankReport {
	/// Candidates that received a cross-encoder score.
	pub scored: usize,
	/// Candidates whose cross-encoder score is the hybrid fallback.
	pub fallback: usize,
	pub batches: usize,
	pub failed_batches: usize,
	pub deadline_hit: bool,
}
impl RerankReport {
	pub fn fallback_used(&self) -> bool {
		self.fallback > 0
	}

	/// A configured, attempted reranker that lost at least one batch.
	pub fn degraded(&self) -> bool {
		self.failed_batches > 0
	}
}

enum BatchOutcome {
	Finished(crate::Result<Vec<f32>>),
	DeadlineHit,
}

/// Batches cross-encoder calls under a concurrency cap and falls back to `hybrid_score` for
/// anything the reranker could not score.
#[derive(Clone)]
pub struct RerankClient {
	provider: Arc<dyn RerankProvider>,
	cfg: Arc<ProviderConfig>,
	settings: RerankSettings,
}
impl RerankClient {
	pub fn new(
		provider: Arc<dyn RerankProvider>,
		cfg: ProviderConfig,
		settings: RerankSettings,
	) -> Self {
		Self { provider, cfg: Arc::new(cfg), settings }
	}

	/// Sets `cross_encoder_score` on every candidate. Never fails: lost batches, a passed
	/// deadline, and a disabled reranker all fall back to `hybrid_score`.
	pub async fn rerank(
		&self,
		query: &str,
		candidates: &mut [ScoredCandidate],
		deadline: Instant,
	) -> RerankReport {
		let mut report = RerankReport::default();

		if candidates.is_empty() {
			return report;
		}
		if !self.settings.enabled || query.trim().is_empty() {
			report.fallback = apply_scores(candidates, &[], self.settings.normalization);

			return report;
		}

		let batch_size = self.settings.batch_size.max(1);
		let semaphore = Arc::new(Semaphore::new(self.settings.concurrency_cap.max(1)));
		let query: Arc<str> = Arc::from(query);
		let mut handles = Vec::new();

		for chunk in candidates.chunks(batch_size) {
			let docs: Vec<String> =
				chunk.iter().map(|item| item.candidate.text().to_string()).collect();
			let provider = Arc::clone(&self.provider);
			let cfg = Arc::clone(&self.cfg);
			let semaphore = Arc::clone(&semaphore);
			let query = Arc::clone(&query);

			handles.push(tokio::spawn(async move {
				let call = async {
					let _permit = semaphore.acquire_owned().await.map_err(|err| {
						Error::RerankerUnavailable { message: err.to_string() }
					})?;

					provider.score_pairs(&cfg, &query, &docs).await
				};

				match tokio::time::timeout_at(deadline, call).await {
					Ok(result) => BatchOutcome::Finished(result),
					Err(_) => BatchOutcome::DeadlineHit,
				}
			}));
		}

		report.batches = handles.len();

		let mut raw = vec![None; candidates.len()];

		for (batch, handle) in handles.into_iter().enumerate() {
			let offset = batch * batch_size;
			let len = batch_size.min(candidates.len() - offset);

			match handle.await {
				Ok(BatchOutcome::Finished(Ok(scores))) if scores.len() == len => {
					for (slot, score) in raw[offset..offset + len].iter_mut().zip(scores) {
						*slot = score.is_finite().then_some(score);
					}
				},
				Ok(BatchOutcome::Finished(Ok(scores))) => {
					report.failed_batches += 1;

					tracing::warn!(
						batch,
						expected = len,
						received = scores.len(),
						"Reranker returned a misaligned batch; falling back to hybrid scores."
					);
				},
				Ok(BatchOutcome::Finished(Err(err))) => {
					report.failed_batches += 1;

					tracing::warn!(
						batch,
						error = %err,
						"Reranker batch failed; falling back to hybrid scores."
					);
				},
				Ok(BatchOutcome::DeadlineHit) => {
					report.failed_batches += 1;
					report.deadline_hit = true;

					tracing::warn!(batch, "Reranker batch abandoned at the call deadline.");
				},
				Err(err) => {
					report.failed_batches += 1;

					tracing::warn!(batch, error = %err, "Reranker batch task aborted.");
				},
			}
		}

		report.fallback = apply_scores(candidates, &raw, self.settings.normalization);
		report.scored = candidates.len() - report.fallback;

		report
	}
}

/// Writes normalized scores, or the hybrid fallback where `raw` has no score. Returns the
/// number of fallbacks.
fn apply_scores(
	candidates: &mut [ScoredCandidate],
	raw: &[Option<f32>],
	normalization: ScoreNormalization,
) -> usize {
	let normalized = normalize_scores(raw, normalization);
	let mut fallback = 0;

	for (index, item) in candidates.iter_mut().enumerate() {
		let score = normalized.get(index).copied().flatten();

		if score.is_none() {
			fallback += 1;
		}

		item.scores.cross_encoder_score = Some(score.unwrap_or(item.scores.hybrid_score));
	}

	fallback
}

pub fn normalize_scores(raw: &[Option<f32>], normalization: ScoreNormalization) -> Vec<Option<f32>> {
	match normalization {
		ScoreNormalization::Clamp => {
			raw.iter().map(|score| score.map(|value| value.clamp(0.0, 1.0))).collect()
		},
		ScoreNormalization::Sigmoid => {
			raw.iter().map(|score| score.map(|value| 1.0 / (1.0 + (-value).exp()))).collect()
		},
		ScoreNormalization::MinMax => {
			let (min, max) = raw
				.iter()
				.flatten()
				.fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
			let range = max - min;

			raw.iter()
				.map(|score| {
					score.map(|value| {
						if range <= f32::EPSILON { 1.0 } else { ((value - min) / range).clamp(0.0, 1.0) }
					})
				})
				.collect()
		},
	}
}
