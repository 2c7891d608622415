pub mod error;
pub mod models;
pub mod snapshot;

pub use error::{Error, Result};
pub use models::{
	HealthRecord, LongTermRecord, MemoryRecord, OtherRecord, RecordId, ShortTermRecord,
	StoredEmbedding,
};
pub use snapshot::{PartitionAdapter, SnapshotStore};
