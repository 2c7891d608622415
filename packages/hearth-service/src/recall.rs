mod fanout;

pub mod ranking;

use std::{collections::BTreeMap, sync::Arc};

use serde::Serialize;
use time::{Duration, OffsetDateTime};
use tokio::time::Instant;
use uuid::Uuid;

use crate::{
	Error, FetchRequest, RecallService, Result, TimeWindow,
	recall::ranking::{
		ScoredCandidate, diversity, fusion, lexical,
		policy::ResolvedPolicy,
		rerank::{RerankClient, RerankReport},
		vector,
	},
};
use hearth_domain::Partition;

/// Orchestrator states. A call ends in `Done` or `Failed`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Stage {
	Fanout,
	Score,
	Fuse,
	Rerank,
	Diversify,
	Done,
	Failed,
}

#[derive(Clone, Debug)]
pub struct RecallRequest {
	pub elderly_id: String,
	pub query: String,
	/// Overrides `retrieval.time_window_days`. Zero means unbounded.
	pub time_window_days: Option<u32>,
	/// Evaluates recency as of this instant instead of now, for replaying a past call.
	pub as_of: Option<OffsetDateTime>,
}
impl RecallRequest {
	pub fn new(elderly_id: impl Into<String>, query: impl Into<String>) -> Self {
		Self { elderly_id: elderly_id.into(), query: query.into(), time_window_days: None, as_of: None }
	}
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Diagnostics {
	pub degraded: bool,
	pub failed_partitions: Vec<String>,
	pub reranker_fallback_used: bool,
	pub embedding_fallback_used: bool,
	pub deadline_exceeded: bool,
	pub empty_candidate_pool: bool,
	/// Candidates fetched per partition, before deduplication.
	pub candidate_counts: BTreeMap<String, usize>,
	/// Malformed records skipped per partition.
	pub skipped_records: BTreeMap<String, usize>,
	pub partition_errors: BTreeMap<String, String>,
	pub reranked: usize,
	pub stages: Vec<Stage>,
}

#[derive(Clone, Debug, Serialize)]
pub struct RecallResponse {
	pub call_id: Uuid,
	#[serde(with = "time::serde::rfc3339")]
	pub issued_at: OffsetDateTime,
	pub policy_id: String,
	pub items: Vec<ScoredCandidate>,
	pub diagnostics: Diagnostics,
}

struct RecallRun {
	call_id: Uuid,
	diagnostics: Diagnostics,
}
impl RecallRun {
	fn new(call_id: Uuid) -> Self {
		Self { call_id, diagnostics: Diagnostics::default() }
	}

	fn enter(&mut self, stage: Stage) {
		tracing::debug!(call_id = %self.call_id, stage = ?stage, "Recall stage entered.");

		self.diagnostics.stages.push(stage);
	}

	fn degrade(&mut self) {
		self.diagnostics.degraded = true;
	}
}

impl RecallService {
	/// Runs one retrieval call through fan-out, scoring, fusion, reranking, and diversification.
	///
	/// Every per-stage failure is absorbed into [`Diagnostics`]. The only hard failure is
	/// [`Error::AllPartitionsFailed`], returned when every configured store adapter errored.
	pub async fn recall(&self, req: RecallRequest) -> Result<RecallResponse> {
		let elderly_id = req.elderly_id.trim();

		if elderly_id.is_empty() {
			return Err(Error::InvalidRequest { message: "elderly_id must be non-empty.".to_string() });
		}

		let policy = ResolvedPolicy::resolve(&self.cfg.retrieval)?;
		let policy_id = policy.policy_id()?;
		let issued_at = req.as_of.unwrap_or_else(OffsetDateTime::now_utc);
		let deadline = Instant::now() + policy.per_call_deadline;
		let mut run = RecallRun::new(Uuid::new_v4());
		let window_days = req.time_window_days.unwrap_or(policy.time_window_days);
		let request = Arc::new(FetchRequest {
			elderly_id: elderly_id.to_string(),
			query_text: req.query.clone(),
			time_window: TimeWindow {
				since: (window_days > 0).then(|| issued_at - Duration::days(i64::from(window_days))),
				until: None,
			},
		});

		run.enter(Stage::Fanout);

		let (fanout, query_vector) = tokio::join!(
			fanout::fan_out(&self.stores, request, policy.adapter_timeout, deadline),
			self.embed_query(&req.query, deadline),
		);

		run.diagnostics.candidate_counts = fanout.counts;
		run.diagnostics.skipped_records = fanout.skipped;
		run.diagnostics.deadline_exceeded |= fanout.deadline_hit;

		let mut failed: Vec<Partition> = fanout.failures.iter().map(|f| f.partition).collect();

		failed.sort();
		failed.dedup();

		run.diagnostics.failed_partitions = failed.iter().map(|p| p.to_string()).collect();

		for failure in &fanout.failures {
			run.diagnostics
				.partition_errors
				.insert(failure.partition.to_string(), failure.error.to_string());
		}

		if !fanout.failures.is_empty() {
			run.degrade();
		}
		if !self.stores.is_empty() && fanout.failures.len() == self.stores.len() {
			run.enter(Stage::Failed);

			tracing::error!(
				call_id = %run.call_id,
				failed_partitions = ?run.diagnostics.failed_partitions,
				"Every store adapter failed."
			);

			return Err(Error::AllPartitionsFailed {
				failed_partitions: run.diagnostics.failed_partitions,
			});
		}

		let query_vector = match query_vector {
			Ok(vector) => vector,
			Err(err) => {
				tracing::warn!(
					call_id = %run.call_id,
					error = %err,
					"Query embedding failed; vector scores fall back to zero."
				);

				run.diagnostics.embedding_fallback_used = true;
				run.diagnostics.deadline_exceeded |= Instant::now() >= deadline;
				run.degrade();

				None
			},
		};
		let pool = fanout.candidates;

		if pool.is_empty() {
			run.diagnostics.empty_candidate_pool = true;

			return Ok(self.finish(run, issued_at, policy_id, Vec::new()));
		}

		run.enter(Stage::Score);

		let mut scored = score_pool(&policy, &req.query, query_vector.as_deref(), pool, issued_at);

		run.enter(Stage::Fuse);
		fusion::apply(policy.weights, &mut scored);

		let mut shortlist = fusion::select_top_k(scored, policy.top_k);

		run.enter(Stage::Rerank);

		let client = RerankClient::new(
			Arc::clone(&self.providers.rerank),
			self.cfg.providers.rerank.clone(),
			policy.rerank,
		);
		let report = client.rerank(&req.query, &mut shortlist, deadline).await;

		self.absorb_rerank(&mut run, report);
		ranking::sort_by_score(&mut shortlist, ScoredCandidate::relevance);

		run.enter(Stage::Diversify);

		let items = diversity::select_mmr(shortlist, policy.mmr);

		Ok(self.finish(run, issued_at, policy_id, items))
	}

	async fn embed_query(&self, query: &str, deadline: Instant) -> Result<Option<Vec<f32>>> {
		if query.trim().is_empty() {
			return Ok(None);
		}

		let texts = [query.to_string()];
		let call = self.providers.embedding.embed(&self.cfg.providers.embedding, &texts);
		let vectors = tokio::time::timeout_at(deadline, call).await.map_err(|_| {
			Error::EmbeddingServiceUnavailable {
				message: "Abandoned at the call deadline.".to_string(),
			}
		})??;

		vectors.into_iter().next().filter(|vector| !vector.is_empty()).map(Some).ok_or_else(|| {
			Error::EmbeddingServiceUnavailable {
				message: "Embedding service returned no vector for the query.".to_string(),
			}
		})
	}

	fn absorb_rerank(&self, run: &mut RecallRun, report: RerankReport) {
		run.diagnostics.reranked = report.scored;
		run.diagnostics.reranker_fallback_used = report.fallback_used();
		run.diagnostics.deadline_exceeded |= report.deadline_hit;

		if report.degraded() {
			tracing::warn!(
				call_id = %run.call_id,
				failed_batches = report.failed_batches,
				batches = report.batches,
				fallback = report.fallback,
				"Reranker degraded; hybrid scores substituted."
			);

			run.degrade();
		}
	}

	fn finish(
		&self,
		mut run: RecallRun,
		issued_at: OffsetDateTime,
		policy_id: String,
		items: Vec<ScoredCandidate>,
	) -> RecallResponse {
		run.enter(Stage::Done);

		tracing::info!(
			call_id = %run.call_id,
			items = items.len(),
			degraded = run.diagnostics.degraded,
			failed_partitions = run.diagnostics.failed_partitions.len(),
			reranker_fallback_used = run.diagnostics.reranker_fallback_used,
			"Recall finished."
		);

		RecallResponse {
			call_id: run.call_id,
			issued_at,
			policy_id,
			items,
			diagnostics: run.diagnostics,
		}
	}
}

/// Annotates every candidate with its lexical, vector, and recency scores.
fn score_pool(
	policy: &ResolvedPolicy,
	query: &str,
	query_vector: Option<&[f32]>,
	pool: Vec<hearth_domain::Candidate>,
	now: OffsetDateTime,
) -> Vec<ScoredCandidate> {
	let terms = hearth_domain::query_terms(query);
	let documents: Vec<Vec<String>> =
		pool.iter().map(|candidate| hearth_domain::tokenize(candidate.text())).collect();
	let bm25 = lexical::score_bm25(&terms, &documents, policy.bm25);
	let bm25_normalized = lexical::normalize_bm25(&bm25, policy.bm25_normalization);
	let vectors = vector::score_vectors(query_vector, &pool, policy.min_similarity);

	pool.into_iter()
		.enumerate()
		.map(|(index, candidate)| {
			let recency =
				policy.recency.score(candidate.partition(), candidate.last_updated(), now);
			let mut item = ScoredCandidate::new(candidate);

			item.scores.bm25_score = bm25[index];
			item.scores.bm25_normalized = bm25_normalized[index];
			item.scores.emb_score = vectors[index];
			item.scores.recency_score = recency;

			item
		})
		.collect()
}
