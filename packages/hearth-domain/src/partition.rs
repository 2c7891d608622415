use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// Memory partition a candidate was fetched from.
///
/// The declaration order is the canonical partition order used when merging fan-out results.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Partition {
	LongTerm,
	Healthcare,
	ShortTerm,
	Other,
}
impl Partition {
	pub const ALL: [Self; 4] = [Self::LongTerm, Self::Healthcare, Self::ShortTerm, Self::Other];

	pub fn as_str(self) -> &'static str {
		match self {
			Self::LongTerm => "long_term",
			Self::Healthcare => "healthcare",
			Self::ShortTerm => "short_term",
			Self::Other => "other",
		}
	}
}

impl fmt::Display for Partition {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for Partition {
	type Err = UnknownPartition;

	fn from_str(raw: &str) -> Result<Self, Self::Err> {
		let normalized = raw.trim().to_ascii_lowercase();

		Self::ALL
			.into_iter()
			.find(|partition| partition.as_str() == normalized)
			.ok_or_else(|| UnknownPartition { name: raw.to_string() })
	}
}

#[derive(Debug, thiserror::Error)]
#[error("Unknown memory partition {name:?}.")]
pub struct UnknownPartition {
	pub name: String,
}
