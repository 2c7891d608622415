use serde_json::Value;

use crate::{Error, Result};
use hearth_config::EmbeddingProviderConfig;

/// Embeds a batch of texts with an OpenAI-compatible embeddings endpoint.
pub async fn embed(cfg: &EmbeddingProviderConfig, texts: &[String]) -> Result<Vec<Vec<f32>>> {
	let body = serde_json::json!({
		"model": cfg.model,
		"input": texts,
		"dimensions": cfg.dimensions,
	});
	let headers = crate::auth_headers(&cfg.api_key, &cfg.default_headers)?;
	let url = crate::endpoint(&cfg.api_base, &cfg.path);
	let json = crate::post_json(cfg.timeout_ms, url, headers, &body).await?;
	let vectors = parse_embedding_response(json)?;

	if vectors.len() != texts.len() {
		return Err(Error::InvalidResponse {
			message: format!(
				"Embedding response returned {} vectors for {} inputs.",
				vectors.len(),
				texts.len()
			),
		});
	}
	if let Some(bad) = vectors.iter().find(|vec| vec.len() != cfg.dimensions as usize) {
		return Err(Error::InvalidResponse {
			message: format!(
				"Embedding dimension mismatch; expected {}, got {}.",
				cfg.dimensions,
				bad.len()
			),
		});
	}

	Ok(vectors)
}

pub fn parse_embedding_response(json: Value) -> Result<Vec<Vec<f32>>> {
	let data = json.get("data").and_then(Value::as_array).ok_or_else(|| Error::InvalidResponse {
		message: "Embedding response is missing data array.".to_string(),
	})?;
	let mut indexed = Vec::with_capacity(data.len());

	for (position, item) in data.iter().enumerate() {
		let index = item.get("index").and_then(Value::as_u64).map_or(position, |v| v as usize);
		let values = item.get("embedding").and_then(Value::as_array).ok_or_else(|| {
			Error::InvalidResponse { message: "Embedding item missing embedding array.".to_string() }
		})?;
		let vec = values
			.iter()
			.map(|value| {
				value.as_f64().map(|number| number as f32).ok_or_else(|| Error::InvalidResponse {
					message: "Embedding value must be numeric.".to_string(),
				})
			})
			.collect::<Result<Vec<_>>>()?;

		indexed.push((index, vec));
	}

	indexed.sort_by_key(|(index, _)| *index);

	Ok(indexed.into_iter().map(|(_, vec)| vec).collect())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn orders_vectors_by_index() {
		let json = serde_json::json!({
			"data": [
				{ "index": 1, "embedding": [2.0, 3.0] },
				{ "index": 0, "embedding": [0.5, 1.5] }
			]
		});
		let parsed = parse_embedding_response(json).expect("parse failed");

		assert_eq!(parsed, vec![vec![0.5, 1.5], vec![2.0, 3.0]]);
	}

	#[test]
	fn rejects_non_numeric_values() {
		let json = serde_json::json!({ "data": [{ "embedding": [0.1, "x"] }] });

		assert!(matches!(parse_embedding_response(json), Err(Error::InvalidResponse { .. })));
	}
}
