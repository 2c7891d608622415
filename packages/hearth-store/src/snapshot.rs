//! JSON snapshot of the memory tables, served through one [`StoreAdapter`] per partition.
//!
//! A snapshot is an object keyed by partition name, each holding an array of rows:
//! `{"long_term": [...], "healthcare": [...], "short_term": [...], "other": [...]}`. Rows are
//! decoded lazily on fetch so one malformed row only costs that row.

use std::{collections::BTreeMap, fs, path::Path, sync::Arc};

use serde_json::Value;

use crate::{
	Error, Result,
	models::{HealthRecord, LongTermRecord, MemoryRecord, OtherRecord, ShortTermRecord},
};
use hearth_domain::Partition;
use hearth_service::{BoxFuture, FetchRequest, PartitionBatch, StoreAdapter};

const CORE_PARTITIONS: [Partition; 3] =
	[Partition::LongTerm, Partition::Healthcare, Partition::ShortTerm];

#[derive(Clone, Debug, Default)]
pub struct SnapshotStore {
	tables: BTreeMap<Partition, Arc<[Value]>>,
}
impl SnapshotStore {
	pub fn load(path: &Path) -> Result<Self> {
		let raw = fs::read_to_string(path)?;

		Self::from_json(&raw)
	}

	pub fn from_json(raw: &str) -> Result<Self> {
		let Value::Object(object) = serde_json::from_str::<Value>(raw)? else {
			return Err(Error::InvalidSnapshot {
				message: "Snapshot root must be a JSON object.".to_string(),
			});
		};
		let mut tables = BTreeMap::new();

		for (name, rows) in object {
			let partition: Partition = name
				.parse()
				.map_err(|err: hearth_domain::UnknownPartition| Error::InvalidSnapshot {
					message: err.to_string(),
				})?;
			let Value::Array(rows) = rows else {
				return Err(Error::InvalidSnapshot {
					message: format!("Table {name} must be an array of rows."),
				});
			};

			tables.insert(partition, Arc::from(rows));
		}

		Ok(Self { tables })
	}

	pub fn row_count(&self, partition: Partition) -> usize {
		self.tables.get(&partition).map_or(0, |rows| rows.len())
	}

	/// Adapters for the long-term, healthcare, and short-term tables, plus `other` when the
	/// snapshot carries it. Absent core tables still get an adapter that returns nothing.
	pub fn adapters(&self) -> Vec<Arc<dyn StoreAdapter>> {
		let mut partitions = CORE_PARTITIONS.to_vec();

		if self.tables.contains_key(&Partition::Other) {
			partitions.push(Partition::Other);
		}

		partitions
			.into_iter()
			.map(|partition| {
				let rows =
					self.tables.get(&partition).cloned().unwrap_or_else(|| Arc::from(Vec::new()));

				Arc::new(PartitionAdapter::new(partition, rows)) as Arc<dyn StoreAdapter>
			})
			.collect()
	}
}

pub struct PartitionAdapter {
	partition: Partition,
	rows: Arc<[Value]>,
}
impl PartitionAdapter {
	pub fn new(partition: Partition, rows: impl Into<Arc<[Value]>>) -> Self {
		Self { partition, rows: rows.into() }
	}

	fn collect(&self, request: &FetchRequest) -> PartitionBatch {
		match self.partition {
			Partition::LongTerm => collect_rows::<LongTermRecord>(&self.rows, request),
			Partition::Healthcare => collect_rows::<HealthRecord>(&self.rows, request),
			Partition::ShortTerm => collect_rows::<ShortTermRecord>(&self.rows, request),
			Partition::Other => collect_rows::<OtherRecord>(&self.rows, request),
		}
	}
}
impl StoreAdapter for PartitionAdapter {
	fn partition(&self) -> Partition {
		self.partition
	}

	fn fetch<'a>(
		&'a self,
		request: &'a FetchRequest,
	) -> BoxFuture<'a, hearth_service::Result<PartitionBatch>> {
		Box::pin(async move { Ok(self.collect(request)) })
	}
}

fn collect_rows<R>(rows: &[Value], request: &FetchRequest) -> PartitionBatch
where
	R: MemoryRecord,
{
	let mut batch = PartitionBatch::default();

	for (row, value) in rows.iter().enumerate() {
		// Rows owned by another person are not this call's concern, even when malformed.
		if value
			.get("elderly_id")
			.and_then(Value::as_str)
			.is_some_and(|owner| owner != request.elderly_id)
		{
			continue;
		}

		let record = match R::deserialize(value) {
			Ok(record) => record,
			Err(err) => {
				batch.skipped += 1;

				tracing::warn!(
					partition = %R::PARTITION,
					row,
					error = %err,
					"Skipping malformed memory record."
				);

				continue;
			},
		};

		if record.elderly_id() != request.elderly_id
			|| !request.time_window.contains(record.last_updated())
		{
			continue;
		}
		if let Some(vocabulary) = record.unknown_vocabulary() {
			tracing::debug!(
				partition = %R::PARTITION,
				row,
				vocabulary,
				"Memory record uses a value outside the known vocabulary."
			);
		}

		match record.into_candidate() {
			Ok(candidate) => batch.candidates.push(candidate),
			Err(err) => {
				batch.skipped += 1;

				tracing::warn!(
					partition = %R::PARTITION,
					row,
					error = %err,
					"Skipping memory record with a malformed embedding."
				);
			},
		}
	}

	batch
}
