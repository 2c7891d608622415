use crate::recall::ranking::{self, ScoredCandidate};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MmrSettings {
	pub lambda: f32,
	/// Weight of an additive `recency_score` bonus. Zero disables it.
	pub recency_weight: f32,
	pub limit: usize,
}

#[derive(Clone, Copy)]
struct MmrPick {
	remaining_pos: usize,
	mmr_score: f32,
}

/// Maximum cosine similarity between `item` and the already selected candidates.
///
/// Negative similarities are kept. Pairs with a missing or incomparable embedding are ignored,
/// and the result is 0 when no selected candidate is comparable.
pub fn max_selected_similarity(item: &ScoredCandidate, selected: &[ScoredCandidate]) -> f32 {
	let Some(embedding) = item.candidate.embedding() else {
		return 0.0;
	};

	selected
		.iter()
		.filter_map(|chosen| {
			chosen
				.candidate
				.embedding()
				.and_then(|other| hearth_domain::cosine_similarity(embedding, other))
		})
		.fold(None, |max: Option<f32>, similarity| {
			Some(max.map_or(similarity, |current| current.max(similarity)))
		})
		.unwrap_or(0.0)
}

/// Greedy Maximal Marginal Relevance selection.
///
/// Each round picks the remaining candidate maximizing
/// `lambda * relevance - (1 - lambda) * max_similarity (+ recency_weight * recency)` and records
/// that value as its `mmr_score`.
///
/// Equal objectives prefer higher relevance before falling back to the shared tie-break (newer,
/// then id). This refinement only matters when objectives tie, as in the first round at
/// `lambda = 0`, where it makes the first pick the most relevant candidate instead of the newest.
pub fn select_mmr(candidates: Vec<ScoredCandidate>, settings: MmrSettings) -> Vec<ScoredCandidate> {
	let mut remaining = candidates;
	let mut selected: Vec<ScoredCandidate> = Vec::with_capacity(settings.limit.min(remaining.len()));

	while selected.len() < settings.limit && !remaining.is_empty() {
		let mut best: Option<MmrPick> = None;

		for (remaining_pos, item) in remaining.iter().enumerate() {
			let similarity = max_selected_similarity(item, &selected);
			let mmr_score = settings.lambda * item.relevance()
				- (1.0 - settings.lambda) * similarity
				+ settings.recency_weight * item.scores.recency_score;
			let pick = MmrPick { remaining_pos, mmr_score };
			let better = match best {
				None => true,
				Some(current) => {
					let incumbent = &remaining[current.remaining_pos];

					ranking::cmp_f32_desc(pick.mmr_score, current.mmr_score)
						.then_with(|| ranking::cmp_f32_desc(item.relevance(), incumbent.relevance()))
						.then_with(|| ranking::cmp_tie_break(item, incumbent))
						.is_lt()
				},
			};

			if better {
				best = Some(pick);
			}
		}

		let Some(pick) = best else {
			break;
		};
		let mut chosen = remaining.remove(pick.remaining_pos);

		chosen.scores.mmr_score = Some(pick.mmr_score);

		tracing::debug!(
			id = chosen.id(),
			mmr_score = pick.mmr_score,
			rank = selected.len(),
			"MMR selected candidate."
		);

		selected.push(chosen);
	}

	selected
}
