use std::collections::HashSet;

use unicode_normalization::UnicodeNormalization;
use unicode_segmentation::UnicodeSegmentation;

/// Splits text into lowercase word tokens for lexical scoring.
///
/// Input is NFKC-normalized first. Single-character tokens are dropped unless they are numeric.
/// Repeated tokens are kept because term frequency matters.
pub fn tokenize(text: &str) -> Vec<String> {
	let normalized: String = text.nfkc().collect();

	normalized
		.unicode_words()
		.map(str::to_lowercase)
		.filter(|word| word.chars().count() >= 2 || word.chars().all(char::is_numeric))
		.collect()
}

/// Tokenizes a query and keeps the first occurrence of each term.
pub fn query_terms(query: &str) -> Vec<String> {
	let mut seen = HashSet::new();

	tokenize(query).into_iter().filter(|term| seen.insert(term.clone())).collect()
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn tokenize_lowercases_and_keeps_repeats() {
		assert_eq!(
			tokenize("Blood pressure, blood SUGAR."),
			vec!["blood", "pressure", "blood", "sugar"]
		);
	}

	#[test]
	fn tokenize_drops_single_letters_but_keeps_digits() {
		assert_eq!(tokenize("a dose of 5 mg"), vec!["dose", "of", "5", "mg"]);
	}

	#[test]
	fn tokenize_applies_compatibility_normalization() {
		assert_eq!(tokenize("ｉｎｓｕｌｉｎ"), vec!["insulin"]);
	}

	#[test]
	fn query_terms_are_unique_in_first_seen_order() {
		assert_eq!(query_terms("walk walk daily Walk"), vec!["walk", "daily"]);
	}
}
