use crate::corpus::Word;
use crate::random::Context;

use super::adaptor::Base;

/// Base distribution over words as character sequences.
///
/// A word of `L` characters is generated by drawing `L` characters uniformly
/// among `nchartypes` and stopping after each one with probability `pstop`:
///
/// `P0(w) = pstop · (1 - pstop)^(L-1) · (1 / nchartypes)^L`
///
/// The model has no parameters to learn; it only keeps track of how many
/// words were drawn from it so that it can report their log probability.
#[derive(Clone, Debug)]
pub struct CharModel {
	pstop: f64,
	nchartypes: usize,
	ndraws: u64,
	draws_logprob: f64,
}

impl CharModel {
	/// # Errors
	/// Returns an error if `pstop` is not in `(0, 1]` or `nchartypes` is zero.
	pub fn new(pstop: f64, nchartypes: usize) -> Result<Self, String> {
		if !(pstop > 0.0 && pstop <= 1.0) {
			return Err(format!("pstop must be in (0, 1], got {pstop}"));
		}
		if nchartypes == 0 {
			return Err("nchartypes must be positive".to_owned());
		}
		Ok(Self { pstop, nchartypes, ndraws: 0, draws_logprob: 0.0 })
	}

	pub fn pstop(&self) -> f64 {
		self.pstop
	}

	pub fn nchartypes(&self) -> usize {
		self.nchartypes
	}

	/// Number of words currently drawn from this model.
	pub fn ndraws(&self) -> u64 {
		self.ndraws
	}

	fn ln_probability(&self, word: &Word) -> f64 {
		let len = word.len() as f64;
		let mut lp = self.pstop.ln() - len * (self.nchartypes as f64).ln();
		if word.len() > 1 {
			lp += (len - 1.0) * (1.0 - self.pstop).ln();
		}
		lp
	}
}

impl Base<Word> for CharModel {
	fn probability(&self, word: &Word) -> f64 {
		self.ln_probability(word).exp()
	}

	fn insert(&mut self, word: &Word, _ctx: &mut Context) -> f64 {
		self.ndraws += 1;
		self.draws_logprob += self.ln_probability(word);
		self.probability(word)
	}

	fn erase(&mut self, word: &Word, _ctx: &mut Context) {
		assert!(self.ndraws > 0, "erasing from a character model with no draws");
		self.ndraws -= 1;
		if self.ndraws == 0 {
			self.draws_logprob = 0.0;
		} else {
			self.draws_logprob -= self.ln_probability(word);
		}
	}

	fn logprob(&self) -> f64 {
		self.draws_logprob
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::corpus::Corpus;

	#[test]
	fn test_probability_formula() {
		let corpus = Corpus::from_lines(&["abc"]).unwrap();
		let model = CharModel::new(0.5, 4).unwrap();
		let word = corpus.word(1, 4);
		let expected = 0.5 * 0.5 * 0.5 * (0.25f64).powi(3);
		assert!((model.probability(&word) - expected).abs() < 1e-15);
	}

	#[test]
	fn test_tracks_draws() {
		let corpus = Corpus::from_lines(&["ab"]).unwrap();
		let mut model = CharModel::new(0.5, 3).unwrap();
		let mut ctx = Context::seeded(0);
		let a = corpus.word(1, 2);
		let ab = corpus.word(1, 3);
		model.insert(&a, &mut ctx);
		model.insert(&ab, &mut ctx);
		let expected = model.probability(&a).ln() + model.probability(&ab).ln();
		assert!((model.logprob() - expected).abs() < 1e-12);
		model.erase(&a, &mut ctx);
		model.erase(&ab, &mut ctx);
		assert_eq!(model.ndraws(), 0);
		assert_eq!(model.logprob(), 0.0);
	}

	#[test]
	fn test_rejects_bad_parameters() {
		assert!(CharModel::new(0.0, 3).is_err());
		assert!(CharModel::new(1.5, 3).is_err());
		assert!(CharModel::new(0.5, 0).is_err());
	}
}
