use serde_json::Value;

use crate::{Error, Result};
use hearth_config::ProviderConfig;

/// Scores `(query, doc)` pairs with a cross-encoder rerank endpoint.
///
/// Scores are returned raw, aligned with `docs`. The endpoint must score every document.
pub async fn rerank(cfg: &ProviderConfig, query: &str, docs: &[String]) -> Result<Vec<f32>> {
	let body = serde_json::json!({
		"model": cfg.model,
		"query": query,
		"documents": docs,
		"top_n": docs.len(),
	});
	let headers = crate::auth_headers(&cfg.api_key, &cfg.default_headers)?;
	let url = crate::endpoint(&cfg.api_base, &cfg.path);
	let json = crate::post_json(cfg.timeout_ms, url, headers, &body).await?;

	parse_rerank_response(json, docs.len())
}

pub fn parse_rerank_response(json: Value, doc_count: usize) -> Result<Vec<f32>> {
	let results = json
		.get("results")
		.or_else(|| json.get("data"))
		.and_then(Value::as_array)
		.ok_or_else(|| Error::InvalidResponse {
			message: "Rerank response is missing results array.".to_string(),
		})?;
	let mut scores = vec![None; doc_count];

	for item in results {
		let index = item.get("index").and_then(Value::as_u64).ok_or_else(|| {
			Error::InvalidResponse { message: "Rerank result missing index.".to_string() }
		})? as usize;
		let score = item
			.get("relevance_score")
			.or_else(|| item.get("score"))
			.and_then(Value::as_f64)
			.ok_or_else(|| Error::InvalidResponse {
				message: "Rerank result missing score.".to_string(),
			})? as f32;
		let slot = scores.get_mut(index).ok_or_else(|| Error::InvalidResponse {
			message: format!("Rerank result index {index} is out of range for {doc_count} documents."),
		})?;

		if !score.is_finite() {
			return Err(Error::InvalidResponse {
				message: format!("Rerank score at index {index} is not finite."),
			});
		}

		*slot = Some(score);
	}

	scores
		.into_iter()
		.enumerate()
		.map(|(index, score)| {
			score.ok_or_else(|| Error::InvalidResponse {
				message: format!("Rerank response did not score document {index}."),
			})
		})
		.collect()
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn aligns_scores_by_index() {
		let json = serde_json::json!({
			"results": [
				{ "index": 1, "relevance_score": 0.2 },
				{ "index": 0, "relevance_score": 0.9 }
			]
		});

		assert_eq!(parse_rerank_response(json, 2).expect("parse failed"), vec![0.9, 0.2]);
	}

	#[test]
	fn accepts_data_and_score_aliases() {
		let json = serde_json::json!({ "data": [{ "index": 0, "score": -1.5 }] });

		assert_eq!(parse_rerank_response(json, 1).expect("parse failed"), vec![-1.5]);
	}

	#[test]
	fn missing_document_score_is_an_error() {
		let json = serde_json::json!({ "results": [{ "index": 0, "relevance_score": 0.4 }] });
		let err = parse_rerank_response(json, 2).expect_err("Expected missing score error.");

		assert!(err.to_string().contains("document 1"));
	}

	#[test]
	fn out_of_range_index_is_an_error() {
		let json = serde_json::json!({ "results": [{ "index": 3, "relevance_score": 0.4 }] });

		assert!(parse_rerank_response(json, 1).is_err());
	}
}
