use std::collections::BTreeMap;

use time::OffsetDateTime;

use hearth_domain::Partition;

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Half-life decay of record age, configured per partition.
#[derive(Clone, Debug, PartialEq)]
pub struct RecencyPolicy {
	pub default_half_life_days: f32,
	pub half_life_days: BTreeMap<Partition, f32>,
	/// Records older than their partition's TTL score 0.
	pub ttl_days: BTreeMap<Partition, f32>,
}
impl RecencyPolicy {
	pub fn half_life(&self, partition: Partition) -> f32 {
		self.half_life_days.get(&partition).copied().unwrap_or(self.default_half_life_days)
	}

	/// Scores `last_updated` against `now`, the time the call was issued.
	///
	/// Missing timestamps score 0. Timestamps in the future count as age 0.
	pub fn score(
		&self,
		partition: Partition,
		last_updated: Option<OffsetDateTime>,
		now: OffsetDateTime,
	) -> f32 {
		let Some(ts) = last_updated else {
			return 0.0;
		};
		let age_days = ((now - ts).as_seconds_f64() / SECONDS_PER_DAY).max(0.0);

		if let Some(ttl) = self.ttl_days.get(&partition)
			&& age_days > f64::from(*ttl)
		{
			return 0.0;
		}

		let half_life = f64::from(self.half_life(partition));

		(-std::f64::consts::LN_2 * age_days / half_life).exp() as f32
	}
}

#[cfg(test)]
mod tests {
	use time::{Duration, macros::datetime};

	use super::*;

	fn policy() -> RecencyPolicy {
		RecencyPolicy {
			default_half_life_days: 30.0,
			half_life_days: BTreeMap::from([
				(Partition::LongTerm, 180.0),
				(Partition::Healthcare, 14.0),
				(Partition::ShortTerm, 6.0),
			]),
			ttl_days: BTreeMap::from([(Partition::ShortTerm, 14.0)]),
		}
	}

	#[test]
	fn one_half_life_scores_one_half() {
		let now = datetime!(2024-06-01 00:00 UTC);
		let score = policy().score(Partition::Healthcare, Some(now - Duration::days(14)), now);

		assert!((score - 0.5).abs() < 1e-6);
	}

	#[test]
	fn healthcare_decays_faster_than_long_term() {
		let now = datetime!(2024-06-01 00:00 UTC);
		let ts = Some(now - Duration::days(30));
		let policy = policy();

		assert!(
			policy.score(Partition::Healthcare, ts, now) < policy.score(Partition::LongTerm, ts, now)
		);
	}

	#[test]
	fn missing_timestamp_and_expired_records_score_zero() {
		let now = datetime!(2024-06-01 00:00 UTC);
		let policy = policy();

		assert_eq!(policy.score(Partition::LongTerm, None, now), 0.0);
		assert_eq!(policy.score(Partition::ShortTerm, Some(now - Duration::days(15)), now), 0.0);
		assert!(policy.score(Partition::ShortTerm, Some(now - Duration::days(13)), now) > 0.0);
	}

	#[test]
	fn future_timestamps_score_one_and_unknown_partitions_use_default() {
		let now = datetime!(2024-06-01 00:00 UTC);
		let policy = policy();

		assert_eq!(policy.score(Partition::LongTerm, Some(now + Duration::hours(3)), now), 1.0);
		assert!(
			(policy.score(Partition::Other, Some(now - Duration::days(30)), now) - 0.5).abs() < 1e-6
		);
	}
}
