use std::{
	sync::atomic::{AtomicUsize, Ordering},
	time::Duration,
};

use hearth_domain::{Candidate, Partition};
use hearth_service::{BoxFuture, Error, FetchRequest, PartitionBatch, Result, StoreAdapter};

/// Store adapter that returns a fixed batch, an error, or nothing, optionally after a delay.
pub struct StaticStore {
	partition: Partition,
	outcome: std::result::Result<Vec<Candidate>, String>,
	skipped: usize,
	delay: Option<Duration>,
	calls: AtomicUsize,
}
impl StaticStore {
	pub fn returning(partition: Partition, candidates: Vec<Candidate>) -> Self {
		Self { partition, outcome: Ok(candidates), skipped: 0, delay: None, calls: AtomicUsize::new(0) }
	}

	pub fn empty(partition: Partition) -> Self {
		Self::returning(partition, Vec::new())
	}

	pub fn failing(partition: Partition, message: impl Into<String>) -> Self {
		Self {
			partition,
			outcome: Err(message.into()),
			skipped: 0,
			delay: None,
			calls: AtomicUsize::new(0),
		}
	}

	pub fn with_delay(mut self, delay: Duration) -> Self {
		self.delay = Some(delay);

		self
	}

	pub fn with_skipped(mut self, skipped: usize) -> Self {
		self.skipped = skipped;

		self
	}

	pub fn calls(&self) -> usize {
		self.calls.load(Ordering::SeqCst)
	}
}
impl StoreAdapter for StaticStore {
	fn partition(&self) -> Partition {
		self.partition
	}

	fn fetch<'a>(&'a self, _request: &'a FetchRequest) -> BoxFuture<'a, Result<PartitionBatch>> {
		self.calls.fetch_add(1, Ordering::SeqCst);

		Box::pin(async move {
			if let Some(delay) = self.delay {
				tokio::time::sleep(delay).await;
			}

			match &self.outcome {
				Ok(candidates) => {
					Ok(PartitionBatch { candidates: candidates.clone(), skipped: self.skipped })
				},
				Err(message) => Err(Error::PartitionUnavailable {
					partition: self.partition.to_string(),
					message: message.clone(),
				}),
			}
		})
	}
}
