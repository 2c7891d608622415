use std::collections::HashMap;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bm25Params {
	pub k1: f32,
	pub b: f32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Bm25Normalization {
	/// Rescale the call's scores to [0, 1] by their min and max.
	MinMax,
	/// `x / (x + s)`, independent of the other candidates.
	Saturation { half_point: f32 },
}

/// Scores every document against the query with BM25.
///
/// The corpus is exactly `documents`: document frequencies and average length are recomputed
/// on every call. `query_terms` is expected to be deduplicated. An empty query or corpus scores
/// zero everywhere.
pub fn score_bm25(
	query_terms: &[String],
	documents: &[Vec<String>],
	params: Bm25Params,
) -> Vec<f32> {
	let mut scores = vec![0.0; documents.len()];
	let total_len: usize = documents.iter().map(Vec::len).sum();

	if query_terms.is_empty() || documents.is_empty() || total_len == 0 {
		return scores;
	}

	let n_docs = documents.len() as f32;
	let avgdl = total_len as f32 / n_docs;
	let idf: Vec<f32> = query_terms
		.iter()
		.map(|term| {
			let df = documents.iter().filter(|doc| doc.iter().any(|token| token == term)).count()
				as f32;

			(1.0 + (n_docs - df + 0.5) / (df + 0.5)).ln()
		})
		.collect();

	for (doc, score) in documents.iter().zip(scores.iter_mut()) {
		if doc.is_empty() {
			continue;
		}

		let mut tf: HashMap<&str, f32> = HashMap::new();

		for token in doc {
			*tf.entry(token.as_str()).or_insert(0.0) += 1.0;
		}

		let length_norm = params.k1 * (1.0 - params.b + params.b * doc.len() as f32 / avgdl);

		for (term, idf) in query_terms.iter().zip(&idf) {
			let Some(&freq) = tf.get(term.as_str()) else {
				continue;
			};

			*score += idf * freq * (params.k1 + 1.0) / (freq + length_norm);
		}
	}

	scores
}

/// Maps raw BM25 scores into [0, 1].
///
/// Under min-max, a flat set of scores maps to 1.0 when positive and 0.0 otherwise, so a lone
/// match is not erased.
pub fn normalize_bm25(raw: &[f32], mode: Bm25Normalization) -> Vec<f32> {
	match mode {
		Bm25Normalization::MinMax => {
			let (min, max) = raw
				.iter()
				.fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
			let range = max - min;

			raw.iter()
				.map(|&value| {
					if range <= f32::EPSILON {
						if value > 0.0 { 1.0 } else { 0.0 }
					} else {
						((value - min) / range).clamp(0.0, 1.0)
					}
				})
				.collect()
		},
		Bm25Normalization::Saturation { half_point } => raw
			.iter()
			.map(|&value| if value > 0.0 { value / (value + half_point) } else { 0.0 })
			.collect(),
	}
}

#[cfg(test)]
mod tests {
	use hearth_domain::{query_terms, tokenize};

	use super::*;

	const PARAMS: Bm25Params = Bm25Params { k1: 1.2, b: 0.75 };

	fn corpus(texts: &[&str]) -> Vec<Vec<String>> {
		texts.iter().map(|text| tokenize(text)).collect()
	}

	#[test]
	fn matching_documents_outscore_non_matching() {
		let docs = corpus(&[
			"medication: takes metformin every morning",
			"family: daughter visits on sunday",
			"metformin metformin dosage increased",
		]);
		let scores = score_bm25(&query_terms("metformin dosage"), &docs, PARAMS);

		assert_eq!(scores[1], 0.0);
		assert!(scores[2] > scores[0]);
		assert!(scores[0] > 0.0);
	}

	#[test]
	fn rare_terms_weigh_more_than_common_terms() {
		let docs = corpus(&["garden walk", "garden tea", "garden insulin"]);
		let common = score_bm25(&query_terms("garden"), &docs, PARAMS);
		let rare = score_bm25(&query_terms("insulin"), &docs, PARAMS);

		assert!(rare[2] > common[2]);
	}

	#[test]
	fn empty_query_or_corpus_scores_zero() {
		let docs = corpus(&["garden walk"]);

		assert_eq!(score_bm25(&[], &docs, PARAMS), vec![0.0]);
		assert!(score_bm25(&query_terms("garden"), &[], PARAMS).is_empty());
		assert_eq!(score_bm25(&query_terms("garden"), &corpus(&[""]), PARAMS), vec![0.0]);
	}

	#[test]
	fn min_max_spans_unit_interval() {
		let normalized = normalize_bm25(&[2.0, 4.0, 3.0], Bm25Normalization::MinMax);

		assert_eq!(normalized, vec![0.0, 1.0, 0.5]);
	}

	#[test]
	fn min_max_keeps_a_lone_match() {
		assert_eq!(normalize_bm25(&[1.7], Bm25Normalization::MinMax), vec![1.0]);
		assert_eq!(normalize_bm25(&[0.0, 0.0], Bm25Normalization::MinMax), vec![0.0, 0.0]);
	}

	#[test]
	fn saturation_is_bounded() {
		let normalized =
			normalize_bm25(&[0.0, 5.0, 500.0], Bm25Normalization::Saturation { half_point: 5.0 });

		assert_eq!(normalized[0], 0.0);
		assert_eq!(normalized[1], 0.5);
		assert!(normalized[2] < 1.0 && normalized[2] > 0.98);
	}
}
