//! Prompt context rendering for the generation stage.

use time::{OffsetDateTime, format_description::well_known::Rfc3339};

use crate::{RecallResponse, ScoredCandidate};
use hearth_domain::Partition;

/// Renders a deterministic context block with one section per partition.
///
/// Items keep their final order within a section. Empty sections read `none`.
pub fn render_context(response: &RecallResponse) -> String {
	let mut out = String::new();

	for partition in Partition::ALL {
		out.push('[');
		out.push_str(&partition.as_str().to_ascii_uppercase());
		out.push_str("]\n");

		let mut any = false;

		for item in response.items.iter().filter(|item| item.candidate.partition() == partition) {
			render_item(&mut out, item);

			any = true;
		}

		if !any {
			out.push_str("none\n");
		}
	}

	out
}

fn render_item(out: &mut String, item: &ScoredCandidate) {
	out.push_str("- ");
	out.push_str(item.candidate.text());

	if let Some(ts) = item.candidate.last_updated().and_then(format_timestamp) {
		out.push_str(" [updated: ");
		out.push_str(&ts);
		out.push(']');
	}

	out.push('\n');
}

fn format_timestamp(ts: OffsetDateTime) -> Option<String> {
	ts.format(&Rfc3339).ok()
}

#[cfg(test)]
mod tests {
	use time::macros::datetime;
	use uuid::Uuid;

	use super::*;
	use crate::Diagnostics;
	use hearth_domain::Candidate;

	#[test]
	fn renders_sections_in_partition_order_with_none_for_empty() {
		let items = vec![
			ScoredCandidate::new(
				Candidate::short_term("s1", "Asked about the bus schedule")
					.with_last_updated(datetime!(2024-05-02 09:00 UTC)),
			),
			ScoredCandidate::new(Candidate::long_term("l1", "family", "son", "Tom lives in Leeds")),
		];
		let response = RecallResponse {
			call_id: Uuid::nil(),
			issued_at: datetime!(2024-05-03 00:00 UTC),
			policy_id: String::new(),
			items,
			diagnostics: Diagnostics::default(),
		};

		assert_eq!(
			render_context(&response),
			"[LONG_TERM]\n- family: son = Tom lives in Leeds\n\
			 [HEALTHCARE]\nnone\n\
			 [SHORT_TERM]\n- Asked about the bus schedule [updated: 2024-05-02T09:00:00Z]\n\
			 [OTHER]\nnone\n"
		);
	}
}
