use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use time::OffsetDateTime;

use crate::partition::Partition;

pub const LONG_TERM_CATEGORIES: [&str; 7] =
	["personal", "family", "education", "career", "lifestyle", "finance", "legal"];
pub const HEALTH_RECORD_TYPES: [&str; 4] = ["condition", "procedure", "appointment", "medication"];

/// Partition-specific structured fields, tagged by the partition that produced them.
///
/// These fields travel to the caller untouched. Only the assembled candidate text is scored.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source_partition", rename_all = "snake_case")]
pub enum PartitionPayload {
	LongTerm {
		category: String,
		key: String,
		value: String,
	},
	Healthcare {
		record_type: String,
		description: String,
		#[serde(default, skip_serializing_if = "Option::is_none")]
		diagnosis_date: Option<String>,
	},
	ShortTerm {
		content: String,
	},
	Other {
		#[serde(default, skip_serializing_if = "Map::is_empty")]
		fields: Map<String, Value>,
	},
}
impl PartitionPayload {
	pub fn partition(&self) -> Partition {
		match self {
			Self::LongTerm { .. } => Partition::LongTerm,
			Self::Healthcare { .. } => Partition::Healthcare,
			Self::ShortTerm { .. } => Partition::ShortTerm,
			Self::Other { .. } => Partition::Other,
		}
	}
}

/// One retrievable memory fragment.
///
/// Identity, payload, and text are fixed at construction. Scores live elsewhere and are attached
/// per call.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
	id: String,
	#[serde(flatten)]
	payload: PartitionPayload,
	text: String,
	#[serde(default, with = "time::serde::rfc3339::option")]
	last_updated: Option<OffsetDateTime>,
	#[serde(default, skip_serializing)]
	embedding: Option<Vec<f32>>,
}
impl Candidate {
	/// Builds a long-term memory candidate with text `"{category}: {key} = {value}"`.
	pub fn long_term(
		id: impl Into<String>,
		category: impl Into<String>,
		key: impl Into<String>,
		value: impl Into<String>,
	) -> Self {
		let (category, key, value) = (category.into(), key.into(), value.into());
		let text = format!("{category}: {key} = {value}");

		Self::from_parts(id.into(), PartitionPayload::LongTerm { category, key, value }, text)
	}

	/// Builds a healthcare candidate with text `"{description} ({record_type})"`, followed by the
	/// diagnosis date when one is recorded.
	pub fn healthcare(
		id: impl Into<String>,
		record_type: impl Into<String>,
		description: impl Into<String>,
		diagnosis_date: Option<String>,
	) -> Self {
		let (record_type, description) = (record_type.into(), description.into());
		let mut text = format!("{description} ({record_type})");

		if let Some(date) = diagnosis_date.as_deref() {
			text.push_str(" diagnosed ");
			text.push_str(date);
		}

		Self::from_parts(
			id.into(),
			PartitionPayload::Healthcare { record_type, description, diagnosis_date },
			text,
		)
	}

	pub fn short_term(id: impl Into<String>, content: impl Into<String>) -> Self {
		let content = content.into();

		Self::from_parts(id.into(), PartitionPayload::ShortTerm { content: content.clone() }, content)
	}

	pub fn other(id: impl Into<String>, text: impl Into<String>, fields: Map<String, Value>) -> Self {
		Self::from_parts(id.into(), PartitionPayload::Other { fields }, text.into())
	}

	pub fn with_last_updated(mut self, last_updated: OffsetDateTime) -> Self {
		self.last_updated = Some(last_updated);

		self
	}

	/// Attaches a stored embedding. Empty vectors are dropped so they read as missing.
	pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
		self.embedding = (!embedding.is_empty()).then_some(embedding);

		self
	}

	pub fn id(&self) -> &str {
		&self.id
	}

	pub fn partition(&self) -> Partition {
		self.payload.partition()
	}

	pub fn payload(&self) -> &PartitionPayload {
		&self.payload
	}

	pub fn text(&self) -> &str {
		&self.text
	}

	pub fn last_updated(&self) -> Option<OffsetDateTime> {
		self.last_updated
	}

	pub fn embedding(&self) -> Option<&[f32]> {
		self.embedding.as_deref()
	}

	fn from_parts(id: String, payload: PartitionPayload, text: String) -> Self {
		Self { id, payload, text, last_updated: None, embedding: None }
	}
}
