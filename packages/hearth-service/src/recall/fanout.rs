use std::{collections::BTreeMap, sync::Arc, time::Duration};

use tokio::time::Instant;

use crate::{Error, FetchRequest, PartitionBatch, StoreAdapter};
use hearth_domain::{Candidate, Partition};

pub(crate) struct PartitionFailure {
	pub(crate) partition: Partition,
	pub(crate) error: Error,
}

#[derive(Default)]
pub(crate) struct FanoutOutcome {
	/// Merged in canonical `(partition, id)` order, never completion order.
	pub(crate) candidates: Vec<Candidate>,
	pub(crate) failures: Vec<PartitionFailure>,
	pub(crate) counts: BTreeMap<String, usize>,
	pub(crate) skipped: BTreeMap<String, usize>,
	pub(crate) deadline_hit: bool,
}

enum AdapterOutcome {
	Fetched(crate::Result<PartitionBatch>),
	TimedOut { at_deadline: bool },
}

/// Runs every adapter concurrently, each bounded by `min(adapter_timeout, deadline)`.
///
/// Adapters still running at their bound are abandoned and reported as failures.
pub(crate) async fn fan_out(
	stores: &[Arc<dyn StoreAdapter>],
	request: Arc<FetchRequest>,
	adapter_timeout: Duration,
	deadline: Instant,
) -> FanoutOutcome {
	let bound = (Instant::now() + adapter_timeout).min(deadline);
	let handles: Vec<_> = stores
		.iter()
		.map(|store| {
			let store = Arc::clone(store);
			let request = Arc::clone(&request);

			tokio::spawn(async move {
				match tokio::time::timeout_at(bound, store.fetch(&request)).await {
					Ok(result) => AdapterOutcome::Fetched(result),
					Err(_) => AdapterOutcome::TimedOut { at_deadline: bound >= deadline },
				}
			})
		})
		.collect();
	let mut outcome = FanoutOutcome::default();

	for (store, handle) in stores.iter().zip(handles) {
		let partition = store.partition();
		let error = match handle.await {
			Ok(AdapterOutcome::Fetched(Ok(batch))) => {
				tracing::debug!(
					partition = %partition,
					candidates = batch.candidates.len(),
					skipped = batch.skipped,
					"Store adapter returned."
				);

				*outcome.counts.entry(partition.to_string()).or_default() += batch.candidates.len();

				if batch.skipped > 0 {
					*outcome.skipped.entry(partition.to_string()).or_default() += batch.skipped;
				}

				outcome.candidates.extend(batch.candidates);

				continue;
			},
			Ok(AdapterOutcome::Fetched(Err(err))) => err,
			Ok(AdapterOutcome::TimedOut { at_deadline }) => {
				outcome.deadline_hit |= at_deadline;

				let message = if at_deadline {
					"Abandoned at the call deadline.".to_string()
				} else {
					format!("Timed out after {} ms.", adapter_timeout.as_millis())
				};

				Error::PartitionUnavailable { partition: partition.to_string(), message }
			},
			Err(err) => Error::PartitionUnavailable {
				partition: partition.to_string(),
				message: format!("Adapter task aborted: {err}"),
			},
		};

		tracing::warn!(partition = %partition, error = %error, "Store adapter failed.");

		outcome.failures.push(PartitionFailure { partition, error });
	}

	outcome.candidates.sort_by(|lhs, rhs| {
		lhs.partition().cmp(&rhs.partition()).then_with(|| lhs.id().cmp(rhs.id()))
	});

	outcome
}
