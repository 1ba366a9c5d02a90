use std::collections::BTreeSet;
use std::fmt;

use serde::Serialize;

/// Precision, recall and F-score of one measure.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct Prf {
	pub precision: f64,
	pub recall: f64,
	pub fscore: f64,
}

impl Prf {
	fn new(correct: usize, found: usize, gold: usize) -> Self {
		let precision = ratio(correct, found);
		let recall = ratio(correct, gold);
		let fscore = if precision + recall > 0.0 { 2.0 * precision * recall / (precision + recall) } else { 0.0 };
		Self { precision, recall, fscore }
	}
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
	if denominator == 0 { 0.0 } else { numerator as f64 / denominator as f64 }
}

/// Scores of a whole segmentation, ready for display or JSON.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct ScoreSummary {
	pub tokens: Prf,
	pub boundaries: Prf,
	pub lexicon: Prf,
}

impl fmt::Display for ScoreSummary {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(
			f,
			"token P/R/F {:.4} {:.4} {:.4} | boundary P/R/F {:.4} {:.4} {:.4} | lexicon P/R/F {:.4} {:.4} {:.4}",
			self.tokens.precision,
			self.tokens.recall,
			self.tokens.fscore,
			self.boundaries.precision,
			self.boundaries.recall,
			self.boundaries.fscore,
			self.lexicon.precision,
			self.lexicon.recall,
			self.lexicon.fscore,
		)
	}
}

/// Accumulates segmentation scores over sentences.
///
/// Tokens count as correct when both their edges match the gold words,
/// boundaries exclude the sentence edges, and the lexicon compares the sets
/// of word types found and in the gold standard.
#[derive(Clone, Debug, Default)]
pub struct Scoring {
	token_correct: usize,
	token_found: usize,
	token_gold: usize,
	boundary_correct: usize,
	boundary_found: usize,
	boundary_gold: usize,
	lexicon_found: BTreeSet<String>,
	lexicon_gold: BTreeSet<String>,
}

impl Scoring {
	pub fn new() -> Self {
		Self::default()
	}

	/// Adds one sentence.
	///
	/// `found` and `gold` hold the word spans as `(start, end)` offsets,
	/// `text` the characters the spans index into.
	pub fn add_sentence(&mut self, text: &[char], found: &[(usize, usize)], gold: &[(usize, usize)]) {
		let found_edges: BTreeSet<(usize, usize)> = found.iter().copied().collect();
		self.token_found += found.len();
		self.token_gold += gold.len();
		self.token_correct += gold.iter().filter(|span| found_edges.contains(*span)).count();

		let found_boundaries = inner_boundaries(found);
		let gold_boundaries = inner_boundaries(gold);
		self.boundary_found += found_boundaries.len();
		self.boundary_gold += gold_boundaries.len();
		self.boundary_correct += found_boundaries.intersection(&gold_boundaries).count();

		let spell = |&(start, end): &(usize, usize)| text[start..end].iter().collect::<String>();
		self.lexicon_found.extend(found.iter().map(spell));
		self.lexicon_gold.extend(gold.iter().map(spell));
	}

	pub fn is_empty(&self) -> bool {
		self.token_gold == 0
	}

	pub fn summary(&self) -> ScoreSummary {
		let lexicon_correct = self.lexicon_found.intersection(&self.lexicon_gold).count();
		ScoreSummary {
			tokens: Prf::new(self.token_correct, self.token_found, self.token_gold),
			boundaries: Prf::new(self.boundary_correct, self.boundary_found, self.boundary_gold),
			lexicon: Prf::new(lexicon_correct, self.lexicon_found.len(), self.lexicon_gold.len()),
		}
	}
}

/// Word edges strictly inside the sentence.
fn inner_boundaries(words: &[(usize, usize)]) -> BTreeSet<usize> {
	words.iter().skip(1).map(|&(start, _)| start).collect()
}

impl fmt::Display for Scoring {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		fmt::Display::fmt(&self.summary(), f)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_scores_partial_segmentation() {
		// gold: ab|ab|c, found: ab|abc
		let text: Vec<char> = "ababc".chars().collect();
		let mut scoring = Scoring::new();
		scoring.add_sentence(&text, &[(0, 2), (2, 5)], &[(0, 2), (2, 4), (4, 5)]);
		let summary = scoring.summary();

		assert_eq!(summary.tokens.precision, 0.5);
		assert!((summary.tokens.recall - 1.0 / 3.0).abs() < 1e-12);
		assert_eq!(summary.boundaries.precision, 1.0);
		assert_eq!(summary.boundaries.recall, 0.5);
		// found {ab, abc}, gold {ab, c}
		assert_eq!(summary.lexicon.precision, 0.5);
		assert_eq!(summary.lexicon.recall, 0.5);
		assert_eq!(summary.lexicon.fscore, 0.5);
	}

	#[test]
	fn test_empty_scoring_is_zero() {
		let scoring = Scoring::new();
		assert!(scoring.is_empty());
		assert_eq!(scoring.summary(), ScoreSummary::default());
		assert!(scoring.to_string().starts_with("token P/R/F 0.0000"));
	}
}
