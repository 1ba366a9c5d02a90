use serde::{Deserialize, Serialize};

use crate::numeric::slice_sample;
use crate::random::Context;

use super::adaptor::PyCrp;
use super::bigram::BigramModel;
use super::unigram::UnigramModel;

/// Priors and switches for resampling Pitman-Yor hyperparameters.
///
/// - `a ~ Beta(beta_a, beta_b)`
/// - `b ~ Gamma(shape = gamma_shape, scale = gamma_scale)`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HyperPriors {
	pub resample_a: bool,
	pub resample_b: bool,
	pub beta_a: f64,
	pub beta_b: f64,
	pub gamma_shape: f64,
	pub gamma_scale: f64,
	/// Slice-sampling sweeps per resampling call.
	pub iterations: usize,
}

impl Default for HyperPriors {
	fn default() -> Self {
		Self {
			resample_a: false,
			resample_b: false,
			beta_a: 1.0,
			beta_b: 1.0,
			gamma_shape: 10.0,
			gamma_scale: 0.1,
			iterations: 5,
		}
	}
}

impl HyperPriors {
	pub fn is_enabled(&self) -> bool {
		self.resample_a || self.resample_b
	}

	fn log_prior_a(&self, a: f64) -> f64 {
		if a <= 0.0 || a >= 1.0 {
			return f64::NEG_INFINITY;
		}
		(self.beta_a - 1.0) * a.ln() + (self.beta_b - 1.0) * (1.0 - a).ln()
	}

	fn log_prior_b(&self, b: f64) -> f64 {
		if b <= 0.0 {
			return f64::NEG_INFINITY;
		}
		(self.gamma_shape - 1.0) * b.ln() - b / self.gamma_scale
	}

	/// Slice-samples `(a, b)` against `loglik(a, b)` plus the priors.
	///
	/// Parameters whose switch is off are returned unchanged.
	pub fn resample<F>(&self, a: f64, b: f64, loglik: F, ctx: &mut Context) -> (f64, f64)
	where
		F: Fn(f64, f64) -> f64,
	{
		let (mut a, mut b) = (a, b);
		for _ in 0..self.iterations {
			if self.resample_a {
				let start = a.clamp(1e-6, 1.0 - 1e-6);
				a = slice_sample(start, |x| self.log_prior_a(x) + loglik(x, b), 0.0, 1.0, 0.1, ctx);
			}
			if self.resample_b {
				let start = b.max(1e-6);
				b = slice_sample(start, |x| self.log_prior_b(x) + loglik(a, x), 0.0, f64::INFINITY, 1.0, ctx);
			}
		}
		(a, b)
	}
}

/// Resamples the hyperparameters of a unigram model.
pub fn resample_unigram(model: &mut UnigramModel, priors: &HyperPriors, ctx: &mut Context) {
	if !priors.is_enabled() {
		return;
	}
	let crp = model.crp();
	let (a, b) = priors.resample(crp.a(), crp.b(), |a, b| crp.logprob_with(a, b), ctx);
	let crp = model.crp_mut();
	crp.set_a(a);
	crp.set_b(b);
}

/// Resamples the hyperparameters shared by every bigram context.
///
/// The unigram's own hyperparameters are resampled separately with the same priors.
pub fn resample_bigram(model: &mut BigramModel, priors: &HyperPriors, ctx: &mut Context) {
	if !priors.is_enabled() {
		return;
	}
	let contexts: Vec<&PyCrp<_>> = model.contexts().map(|(_, crp)| crp).collect();
	let loglik = |a: f64, b: f64| contexts.iter().map(|crp| crp.logprob_with(a, b)).sum::<f64>();
	let (a, b) = priors.resample(model.a(), model.b(), loglik, ctx);
	model.set_hyperparameters(a, b);
	resample_unigram(model.unigram_mut(), priors, ctx);
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::corpus::Corpus;
	use crate::model::char_model::CharModel;

	#[test]
	fn test_disabled_priors_leave_hyperparameters() {
		let mut ctx = Context::seeded(4);
		let mut model = UnigramModel::new(0.2, 3.0, CharModel::new(0.5, 3).unwrap());
		resample_unigram(&mut model, &HyperPriors::default(), &mut ctx);
		assert_eq!((model.crp().a(), model.crp().b()), (0.2, 3.0));
	}

	#[test]
	fn test_resampled_hyperparameters_stay_valid() {
		let corpus = Corpus::from_lines(&["ab ab c ab d c ab"]).unwrap();
		let mut ctx = Context::seeded(4);
		let mut model = UnigramModel::new(0.2, 3.0, CharModel::new(0.5, 5).unwrap());
		for (start, end) in [(1, 3), (3, 5), (5, 6), (6, 8), (8, 9), (9, 10), (10, 12)] {
			model.insert(&corpus.word(start, end), &mut ctx);
		}
		let priors = HyperPriors { resample_a: true, resample_b: true, ..HyperPriors::default() };
		for _ in 0..10 {
			resample_unigram(&mut model, &priors, &mut ctx);
			let (a, b) = (model.crp().a(), model.crp().b());
			assert!(a > 0.0 && a < 1.0);
			assert!(b > 0.0);
			assert!(model.sanity_check());
		}
	}

	#[test]
	fn test_resample_bigram_updates_all_contexts() {
		let corpus = Corpus::from_lines(&["ab c ab"]).unwrap();
		let mut ctx = Context::seeded(8);
		let unigram = UnigramModel::new(0.0, 1.0, CharModel::new(0.5, 4).unwrap());
		let mut model = BigramModel::new(0.0, 1.0, unigram);
		let words = [corpus.word(0, 1), corpus.word(1, 3), corpus.word(3, 4), corpus.word(4, 6), corpus.word(6, 7)];
		for pair in words.windows(2) {
			model.insert(&pair[0], &pair[1], &mut ctx);
		}
		let priors = HyperPriors { resample_b: true, ..HyperPriors::default() };
		resample_bigram(&mut model, &priors, &mut ctx);
		let b = model.b();
		assert!(b > 0.0);
		assert!(model.contexts().all(|(_, crp)| crp.b() == b));
		assert!(model.sanity_check());
	}
}
