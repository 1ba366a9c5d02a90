use std::f64::consts::PI;

use crate::corpus::Word;

use super::adaptor::{Base, PitmanYorAdaptor};
use super::char_model::CharModel;

/// Unigram word model: a Pitman-Yor adaptor over the character model.
pub type UnigramModel = PitmanYorAdaptor<Word, CharModel>;

impl UnigramModel {
	/// Number of word tokens seated.
	pub fn ntokens(&self) -> u32 {
		self.crp().n()
	}

	/// Number of distinct words seated.
	pub fn ntypes(&self) -> usize {
		self.crp().ntypes()
	}

	/// Brent's MBDP-1 word probability.
	///
	/// With `N` tokens, `K` types and `f` occurrences of `word`:
	/// - familiar word: `(f+1)/(N+1) · (f/(f+1))²`
	/// - novel word: `6/π² · (K+1)/(N+1) · P0(word) · ((K+1)/(K+2))²`
	///
	/// The novel-word type ratio is shifted by one so that the first word of
	/// an empty lexicon still has positive probability.
	pub fn mbdp_probability(&self, word: &Word) -> f64 {
		let n = self.ntokens() as f64;
		let f = self.crp().count(word) as f64;
		if f > 0.0 {
			let ratio = f / (f + 1.0);
			(f + 1.0) / (n + 1.0) * ratio * ratio
		} else {
			let k = self.ntypes() as f64;
			let ratio = (k + 1.0) / (k + 2.0);
			6.0 / (PI * PI) * (k + 1.0) / (n + 1.0) * self.base().probability(word) * ratio * ratio
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::corpus::Corpus;
	use crate::random::Context;

	fn model() -> UnigramModel {
		UnigramModel::new(0.0, 1.0, CharModel::new(0.5, 3).unwrap())
	}

	#[test]
	fn test_total_logprob_includes_base_draws() {
		let corpus = Corpus::from_lines(&["ab ab a"]).unwrap();
		let mut ctx = Context::seeded(2);
		let mut unigram = model();
		let ab = corpus.word(1, 3);
		let a = corpus.word(5, 6);
		unigram.insert(&ab, &mut ctx);
		unigram.insert(&ab, &mut ctx);
		unigram.insert(&a, &mut ctx);
		let tables_logprob = unigram.crp().tables(&ab) as f64 * unigram.base().probability(&ab).ln()
			+ unigram.crp().tables(&a) as f64 * unigram.base().probability(&a).ln();
		assert!((unigram.total_logprob() - unigram.logprob() - tables_logprob).abs() < 1e-9);
		assert_eq!(unigram.ntokens(), 3);
		assert_eq!(unigram.ntypes(), 2);
	}

	#[test]
	fn test_mbdp_probability() {
		let corpus = Corpus::from_lines(&["ab ab b"]).unwrap();
		let mut ctx = Context::seeded(2);
		let mut unigram = model();
		let ab = corpus.word(1, 3);
		let b = corpus.word(5, 6);

		let novel = 6.0 / (PI * PI) * 1.0 * unigram.base().probability(&ab) * 0.25;
		assert!((unigram.mbdp_probability(&ab) - novel).abs() < 1e-15);

		unigram.insert(&ab, &mut ctx);
		unigram.insert(&ab, &mut ctx);
		// f = 2, N = 2
		assert!((unigram.mbdp_probability(&ab) - 3.0 / 3.0 * (2.0f64 / 3.0).powi(2)).abs() < 1e-12);
		assert!(unigram.mbdp_probability(&b) > 0.0);
	}
}
