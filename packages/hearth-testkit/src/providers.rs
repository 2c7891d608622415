use std::{
	collections::HashMap,
	sync::atomic::{AtomicUsize, Ordering},
	time::Duration,
};

use hearth_config::{EmbeddingProviderConfig, ProviderConfig};
use hearth_service::{BoxFuture, EmbeddingProvider, Error, RerankProvider, Result};

/// Embeds every text to the same vector.
pub struct FixedEmbedding {
	vector: Vec<f32>,
	calls: AtomicUsize,
}
impl FixedEmbedding {
	pub fn new(vector: Vec<f32>) -> Self {
		Self { vector, calls: AtomicUsize::new(0) }
	}

	pub fn calls(&self) -> usize {
		self.calls.load(Ordering::SeqCst)
	}
}
impl EmbeddingProvider for FixedEmbedding {
	fn embed<'a>(
		&'a self,
		_cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, Result<Vec<Vec<f32>>>> {
		self.calls.fetch_add(1, Ordering::SeqCst);

		let vectors = vec![self.vector.clone(); texts.len()];

		Box::pin(async move { Ok(vectors) })
	}
}

pub struct FailingEmbedding;
impl EmbeddingProvider for FailingEmbedding {
	fn embed<'a>(
		&'a self,
		_cfg: &'a EmbeddingProviderConfig,
		_texts: &'a [String],
	) -> BoxFuture<'a, Result<Vec<Vec<f32>>>> {
		Box::pin(async move {
			Err(Error::EmbeddingServiceUnavailable { message: "embedding offline".to_string() })
		})
	}
}

/// Cross-encoder fake scoring documents from a text lookup table.
///
/// Records call count, the largest batch seen, and the peak number of concurrent calls.
pub struct ScriptedRerank {
	scores: HashMap<String, f32>,
	default_score: f32,
	fail_all: bool,
	fail_when_batch_contains: Option<String>,
	delay: Option<Duration>,
	calls: AtomicUsize,
	docs_seen: AtomicUsize,
	max_batch: AtomicUsize,
	in_flight: AtomicUsize,
	peak_in_flight: AtomicUsize,
}
impl ScriptedRerank {
	pub fn new<I, S>(scores: I) -> Self
	where
		I: IntoIterator<Item = (S, f32)>,
		S: Into<String>,
	{
		Self {
			scores: scores.into_iter().map(|(text, score)| (text.into(), score)).collect(),
			default_score: 0.0,
			fail_all: false,
			fail_when_batch_contains: None,
			delay: None,
			calls: AtomicUsize::new(0),
			docs_seen: AtomicUsize::new(0),
			max_batch: AtomicUsize::new(0),
			in_flight: AtomicUsize::new(0),
			peak_in_flight: AtomicUsize::new(0),
		}
	}

	pub fn failing() -> Self {
		let mut rerank = Self::new(Vec::<(String, f32)>::new());

		rerank.fail_all = true;

		rerank
	}

	pub fn with_default_score(mut self, score: f32) -> Self {
		self.default_score = score;

		self
	}

	/// Fails any batch that contains a document with exactly this text.
	pub fn failing_batches_with(mut self, text: impl Into<String>) -> Self {
		self.fail_when_batch_contains = Some(text.into());

		self
	}

	pub fn with_delay(mut self, delay: Duration) -> Self {
		self.delay = Some(delay);

		self
	}

	pub fn calls(&self) -> usize {
		self.calls.load(Ordering::SeqCst)
	}

	pub fn docs_seen(&self) -> usize {
		self.docs_seen.load(Ordering::SeqCst)
	}

	pub fn max_batch(&self) -> usize {
		self.max_batch.load(Ordering::SeqCst)
	}

	pub fn peak_in_flight(&self) -> usize {
		self.peak_in_flight.load(Ordering::SeqCst)
	}
}
impl RerankProvider for ScriptedRerank {
	fn score_pairs<'a>(
		&'a self,
		_cfg: &'a ProviderConfig,
		_query: &'a str,
		docs: &'a [String],
	) -> BoxFuture<'a, Result<Vec<f32>>> {
		Box::pin(async move {
			self.calls.fetch_add(1, Ordering::SeqCst);
			self.docs_seen.fetch_add(docs.len(), Ordering::SeqCst);
			self.max_batch.fetch_max(docs.len(), Ordering::SeqCst);

			let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;

			self.peak_in_flight.fetch_max(current, Ordering::SeqCst);

			if let Some(delay) = self.delay {
				tokio::time::sleep(delay).await;
			}

			self.in_flight.fetch_sub(1, Ordering::SeqCst);

			let poisoned = self
				.fail_when_batch_contains
				.as_ref()
				.is_some_and(|needle| docs.iter().any(|doc| doc == needle));

			if self.fail_all || poisoned {
				return Err(Error::RerankerUnavailable { message: "reranker offline".to_string() });
			}

			Ok(docs
				.iter()
				.map(|doc| self.scores.get(doc).copied().unwrap_or(self.default_score))
				.collect())
		})
	}
}
