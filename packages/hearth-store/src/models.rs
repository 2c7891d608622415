use std::fmt::{Display, Formatter, Result as FmtResult};

use serde::{Deserialize, de::DeserializeOwned};
use serde_json::{Map, Value};
use time::OffsetDateTime;

use hearth_domain::{
	Candidate, HEALTH_RECORD_TYPES, LONG_TERM_CATEGORIES, Partition, VectorTextError,
	parse_vector_text,
};

/// Row identifier. Tables keyed by serial integers and by text ids are both accepted.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum RecordId {
	Int(i64),
	Text(String),
}
impl RecordId {
	/// Candidate id for a row of `partition`.
	///
	/// Serial keys restart in every table, so integer ids are prefixed with the partition name.
	/// Text ids are used as stored.
	pub fn scoped(&self, partition: Partition) -> String {
		match self {
			Self::Int(id) => format!("{partition}:{id}"),
			Self::Text(id) => id.clone(),
		}
	}
}
impl Display for RecordId {
	fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
		match self {
			Self::Int(id) => write!(f, "{id}"),
			Self::Text(id) => f.write_str(id),
		}
	}
}

/// A stored embedding, either a JSON number array or pgvector text such as `[0.1,0.2]`.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum StoredEmbedding {
	Values(Vec<f32>),
	Text(String),
}
impl StoredEmbedding {
	pub fn into_vector(self) -> Result<Vec<f32>, VectorTextError> {
		match self {
			Self::Values(values) => Ok(values),
			Self::Text(raw) => parse_vector_text(&raw),
		}
	}
}

/// A row of one memory table that can become a scoring candidate.
pub trait MemoryRecord
where
	Self: DeserializeOwned,
{
	const PARTITION: Partition;

	fn elderly_id(&self) -> &str;

	fn last_updated(&self) -> Option<OffsetDateTime>;

	/// A structured vocabulary value outside the known set, if the record carries one.
	fn unknown_vocabulary(&self) -> Option<&str> {
		None
	}

	fn into_candidate(self) -> Result<Candidate, VectorTextError>;
}

#[derive(Clone, Debug, Deserialize)]
pub struct LongTermRecord {
	pub id: RecordId,
	pub elderly_id: String,
	pub category: String,
	pub key: String,
	pub value: String,
	#[serde(default, with = "time::serde::rfc3339::option")]
	pub last_updated: Option<OffsetDateTime>,
	#[serde(default)]
	pub embedding: Option<StoredEmbedding>,
}
impl MemoryRecord for LongTermRecord {
	const PARTITION: Partition = Partition::LongTerm;

	fn elderly_id(&self) -> &str {
		&self.elderly_id
	}

	fn last_updated(&self) -> Option<OffsetDateTime> {
		self.last_updated
	}

	fn unknown_vocabulary(&self) -> Option<&str> {
		(!LONG_TERM_CATEGORIES.contains(&self.category.as_str())).then_some(self.category.as_str())
	}

	fn into_candidate(self) -> Result<Candidate, VectorTextError> {
		let id = self.id.scoped(Self::PARTITION);
		let candidate = Candidate::long_term(id, self.category, self.key, self.value);

		finish(candidate, self.last_updated, self.embedding)
	}
}

#[derive(Clone, Debug, Deserialize)]
pub struct HealthRecord {
	pub id: RecordId,
	pub elderly_id: String,
	pub record_type: String,
	pub description: String,
	/// Kept as stored; the source tables mix dates and free text here.
	#[serde(default)]
	pub diagnosis_date: Option<String>,
	#[serde(default, with = "time::serde::rfc3339::option")]
	pub last_updated: Option<OffsetDateTime>,
	#[serde(default)]
	pub embedding: Option<StoredEmbedding>,
}
impl MemoryRecord for HealthRecord {
	const PARTITION: Partition = Partition::Healthcare;

	fn elderly_id(&self) -> &str {
		&self.elderly_id
	}

	fn last_updated(&self) -> Option<OffsetDateTime> {
		self.last_updated
	}

	fn unknown_vocabulary(&self) -> Option<&str> {
		(!HEALTH_RECORD_TYPES.contains(&self.record_type.as_str()))
			.then_some(self.record_type.as_str())
	}

	fn into_candidate(self) -> Result<Candidate, VectorTextError> {
		let diagnosis_date = self.diagnosis_date.filter(|date| !date.trim().is_empty());
		let candidate = Candidate::healthcare(
			self.id.scoped(Self::PARTITION),
			self.record_type,
			self.description,
			diagnosis_date,
		);

		finish(candidate, self.last_updated, self.embedding)
	}
}

#[derive(Clone, Debug, Deserialize)]
pub struct ShortTermRecord {
	pub id: RecordId,
	pub elderly_id: String,
	pub content: String,
	#[serde(default, alias = "last_updated", with = "time::serde::rfc3339::option")]
	pub created_at: Option<OffsetDateTime>,
	#[serde(default)]
	pub embedding: Option<StoredEmbedding>,
}
impl MemoryRecord for ShortTermRecord {
	const PARTITION: Partition = Partition::ShortTerm;

	fn elderly_id(&self) -> &str {
		&self.elderly_id
	}

	fn last_updated(&self) -> Option<OffsetDateTime> {
		self.created_at
	}

	fn into_candidate(self) -> Result<Candidate, VectorTextError> {
		let candidate = Candidate::short_term(self.id.scoped(Self::PARTITION), self.content);

		finish(candidate, self.created_at, self.embedding)
	}
}

/// Free-form memory whose text is supplied by the writer.
#[derive(Clone, Debug, Deserialize)]
pub struct OtherRecord {
	pub id: RecordId,
	pub elderly_id: String,
	pub text: String,
	#[serde(default)]
	pub fields: Map<String, Value>,
	#[serde(default, with = "time::serde::rfc3339::option")]
	pub last_updated: Option<OffsetDateTime>,
	#[serde(default)]
	pub embedding: Option<StoredEmbedding>,
}
impl MemoryRecord for OtherRecord {
	const PARTITION: Partition = Partition::Other;

	fn elderly_id(&self) -> &str {
		&self.elderly_id
	}

	fn last_updated(&self) -> Option<OffsetDateTime> {
		self.last_updated
	}

	fn into_candidate(self) -> Result<Candidate, VectorTextError> {
		let candidate = Candidate::other(self.id.scoped(Self::PARTITION), self.text, self.fields);

		finish(candidate, self.last_updated, self.embedding)
	}
}

fn finish(
	mut candidate: Candidate,
	last_updated: Option<OffsetDateTime>,
	embedding: Option<StoredEmbedding>,
) -> Result<Candidate, VectorTextError> {
	if let Some(ts) = last_updated {
		candidate = candidate.with_last_updated(ts);
	}
	if let Some(embedding) = embedding {
		candidate = candidate.with_embedding(embedding.into_vector()?);
	}

	Ok(candidate)
}
