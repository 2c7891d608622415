pub mod context;
pub mod error;
pub mod recall;

pub use context::render_context;
pub use error::{Error, Result};
pub use recall::{
	Diagnostics, RecallRequest, RecallResponse, Stage,
	ranking::{ScoredCandidate, Scores},
};

use std::{future::Future, pin::Pin, sync::Arc};

use time::OffsetDateTime;

use hearth_config::{Config, EmbeddingProviderConfig, ProviderConfig};
use hearth_domain::{Candidate, Partition};
use hearth_providers::{embedding, rerank};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Read access to one memory partition.
///
/// Implementations must not mutate shared state. A malformed record is skipped and counted in
/// [`PartitionBatch::skipped`] instead of failing the whole fetch.
pub trait StoreAdapter
where
	Self: Send + Sync,
{
	fn partition(&self) -> Partition;

	fn fetch<'a>(&'a self, request: &'a FetchRequest) -> BoxFuture<'a, Result<PartitionBatch>>;
}

pub trait EmbeddingProvider
where
	Self: Send + Sync,
{
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, Result<Vec<Vec<f32>>>>;
}

pub trait RerankProvider
where
	Self: Send + Sync,
{
	/// Returns one raw relevance score per document, aligned with `docs`.
	fn score_pairs<'a>(
		&'a self,
		cfg: &'a ProviderConfig,
		query: &'a str,
		docs: &'a [String],
	) -> BoxFuture<'a, Result<Vec<f32>>>;
}

#[derive(Clone, Debug)]
pub struct FetchRequest {
	pub elderly_id: String,
	pub query_text: String,
	pub time_window: TimeWindow,
}

/// Inclusive `[since, until]` bounds on `last_updated`. A `None` bound is open.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TimeWindow {
	pub since: Option<OffsetDateTime>,
	pub until: Option<OffsetDateTime>,
}
impl TimeWindow {
	/// Records without a timestamp are always inside the window.
	pub fn contains(&self, ts: Option<OffsetDateTime>) -> bool {
		let Some(ts) = ts else {
			return true;
		};

		self.since.is_none_or(|since| ts >= since) && self.until.is_none_or(|until| ts <= until)
	}
}

#[derive(Clone, Debug, Default)]
pub struct PartitionBatch {
	pub candidates: Vec<Candidate>,
	pub skipped: usize,
}

#[derive(Clone)]
pub struct Providers {
	pub embedding: Arc<dyn EmbeddingProvider>,
	pub rerank: Arc<dyn RerankProvider>,
}
impl Providers {
	pub fn new(embedding: Arc<dyn EmbeddingProvider>, rerank: Arc<dyn RerankProvider>) -> Self {
		Self { embedding, rerank }
	}
}
impl Default for Providers {
	fn default() -> Self {
		Self { embedding: Arc::new(DefaultProviders), rerank: Arc::new(DefaultProviders) }
	}
}

pub struct RecallService {
	pub cfg: Config,
	pub stores: Vec<Arc<dyn StoreAdapter>>,
	pub providers: Providers,
}
impl RecallService {
	pub fn new(cfg: Config, stores: Vec<Arc<dyn StoreAdapter>>) -> Self {
		Self::with_providers(cfg, stores, Providers::default())
	}

	pub fn with_providers(
		cfg: Config,
		stores: Vec<Arc<dyn StoreAdapter>>,
		providers: Providers,
	) -> Self {
		Self { cfg, stores, providers }
	}
}

struct DefaultProviders;

impl EmbeddingProvider for DefaultProviders {
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, Result<Vec<Vec<f32>>>> {
		Box::pin(async move {
			embedding::embed(cfg, texts)
				.await
				.map_err(|err| Error::EmbeddingServiceUnavailable { message: err.to_string() })
		})
	}
}

impl RerankProvider for DefaultProviders {
	fn score_pairs<'a>(
		&'a self,
		cfg: &'a ProviderConfig,
		query: &'a str,
		docs: &'a [String],
	) -> BoxFuture<'a, Result<Vec<f32>>> {
		Box::pin(async move {
			rerank::rerank(cfg, query, docs)
				.await
				.map_err(|err| Error::RerankerUnavailable { message: err.to_string() })
		})
	}
}

#[cfg(test)]
mod tests {
	use time::macros::datetime;

	use super::*;

	#[test]
	fn time_window_bounds_are_inclusive() {
		let window = TimeWindow {
			since: Some(datetime!(2024-01-01 00:00 UTC)),
			until: Some(datetime!(2024-01-31 00:00 UTC)),
		};

		assert!(window.contains(Some(datetime!(2024-01-01 00:00 UTC))));
		assert!(window.contains(Some(datetime!(2024-01-31 00:00 UTC))));
		assert!(!window.contains(Some(datetime!(2023-12-31 23:59 UTC))));
		assert!(!window.contains(Some(datetime!(2024-02-01 00:00 UTC))));
		assert!(window.contains(None));
	}

	#[test]
	fn open_window_accepts_old_and_future_records() {
		let window = TimeWindow::default();

		assert!(window.contains(Some(datetime!(1990-06-01 00:00 UTC))));
		assert!(window.contains(Some(datetime!(2090-06-01 00:00 UTC))));
	}
}
