#[derive(Debug, PartialEq, thiserror::Error)]
pub enum VectorTextError {
	#[error("Vector text is not bracketed.")]
	NotBracketed,
	#[error("Vector text contains a non-numeric value at position {position}.")]
	NonNumeric { position: usize },
	#[error("Vector text contains a non-finite value at position {position}.")]
	NonFinite { position: usize },
}

/// Parses a stored vector in pgvector text form, for example `"[0.1, -0.2, 0.3]"`.
pub fn parse_vector_text(raw: &str) -> Result<Vec<f32>, VectorTextError> {
	let inner = raw
		.trim()
		.strip_prefix('[')
		.and_then(|rest| rest.strip_suffix(']'))
		.ok_or(VectorTextError::NotBracketed)?;

	if inner.trim().is_empty() {
		return Ok(Vec::new());
	}

	inner
		.split(',')
		.enumerate()
		.map(|(position, part)| {
			let value: f32 =
				part.trim().parse().map_err(|_| VectorTextError::NonNumeric { position })?;

			if value.is_finite() { Ok(value) } else { Err(VectorTextError::NonFinite { position }) }
		})
		.collect()
}

/// Cosine similarity in [-1, 1].
///
/// Returns `None` when the vectors are empty, differ in length, or either has zero norm.
pub fn cosine_similarity(lhs: &[f32], rhs: &[f32]) -> Option<f32> {
	if lhs.is_empty() || lhs.len() != rhs.len() {
		return None;
	}

	let (dot, lhs_sq, rhs_sq) = lhs
		.iter()
		.zip(rhs)
		.fold((0.0_f32, 0.0_f32, 0.0_f32), |(dot, l2, r2), (l, r)| {
			(dot + l * r, l2 + l * l, r2 + r * r)
		});

	if lhs_sq <= f32::EPSILON || rhs_sq <= f32::EPSILON {
		return None;
	}

	Some((dot / (lhs_sq.sqrt() * rhs_sq.sqrt())).clamp(-1.0, 1.0))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_bracketed_vector_text() {
		assert_eq!(parse_vector_text(" [0.5, -1,2e-1] ").expect("parse failed"), vec![0.5, -1.0, 0.2]);
		assert_eq!(parse_vector_text("[]").expect("parse failed"), Vec::<f32>::new());
	}

	#[test]
	fn rejects_malformed_vector_text() {
		assert_eq!(parse_vector_text("0.1, 0.2"), Err(VectorTextError::NotBracketed));
		assert_eq!(parse_vector_text("[0.1, x]"), Err(VectorTextError::NonNumeric { position: 1 }));
		assert_eq!(parse_vector_text("[NaN]"), Err(VectorTextError::NonFinite { position: 0 }));
	}

	#[test]
	fn cosine_handles_degenerate_inputs() {
		assert_eq!(cosine_similarity(&[], &[]), None);
		assert_eq!(cosine_similarity(&[1.0, 0.0], &[1.0]), None);
		assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), None);
	}

	#[test]
	fn cosine_of_opposite_vectors_is_negative_one() {
		let sim = cosine_similarity(&[1.0, 2.0], &[-1.0, -2.0]).expect("similarity missing");

		assert!((sim + 1.0).abs() < 1e-6);
	}
}
