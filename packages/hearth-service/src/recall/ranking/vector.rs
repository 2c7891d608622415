use hearth_domain::Candidate;

/// Cosine similarity between the query embedding and each candidate embedding.
///
/// Negative similarity, similarity under `min_similarity`, a missing query vector, a missing
/// candidate vector, and a dimension mismatch all score 0.
pub fn score_vectors(
	query: Option<&[f32]>,
	candidates: &[Candidate],
	min_similarity: f32,
) -> Vec<f32> {
	let Some(query) = query else {
		return vec![0.0; candidates.len()];
	};

	candidates
		.iter()
		.map(|candidate| {
			candidate
				.embedding()
				.and_then(|embedding| hearth_domain::cosine_similarity(query, embedding))
				.map(|similarity| similarity.max(0.0))
				.filter(|similarity| *similarity >= min_similarity)
				.unwrap_or(0.0)
		})
		.collect()
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn clamps_negative_similarity_and_ignores_missing_embeddings() {
		let candidates = vec![
			Candidate::short_term("same", "x").with_embedding(vec![1.0, 0.0]),
			Candidate::short_term("opposite", "x").with_embedding(vec![-1.0, 0.0]),
			Candidate::short_term("missing", "x"),
			Candidate::short_term("wrong-dim", "x").with_embedding(vec![1.0, 0.0, 0.0]),
		];
		let scores = score_vectors(Some(&[1.0, 0.0]), &candidates, 0.0);

		assert_eq!(scores, vec![1.0, 0.0, 0.0, 0.0]);
	}

	#[test]
	fn similarity_floor_zeroes_weak_matches() {
		let candidates = vec![
			Candidate::short_term("weak", "x").with_embedding(vec![0.2, 1.0]),
			Candidate::short_term("strong", "x").with_embedding(vec![1.0, 0.1]),
		];
		let scores = score_vectors(Some(&[1.0, 0.0]), &candidates, 0.3);

		assert_eq!(scores[0], 0.0);
		assert!(scores[1] > 0.9);
	}

	#[test]
	fn missing_query_vector_scores_zero() {
		let candidates = vec![Candidate::short_term("a", "x").with_embedding(vec![1.0])];

		assert_eq!(score_vectors(None, &candidates, 0.0), vec![0.0]);
	}
}
