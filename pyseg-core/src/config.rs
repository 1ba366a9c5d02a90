use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::annealing::Annealing;
use crate::model::HyperPriors;
use crate::sentence::InitBoundaries;

/// Order of the word model.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
	Unigram,
	Bigram,
}

/// How boundaries are resampled.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdateRule {
	/// Single-site Gibbs sweep.
	Flip,
	/// Forward filtering, backward sampling of whole sentences.
	Tree,
	/// Most probable segmentation of whole sentences.
	Viterbi,
	/// Flips at decay-weighted sites.
	DecayedMcmc,
}

/// Whether the sampler sees the whole corpus or one sentence at a time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
	Batch,
	Online,
}

/// Online memory-bounding policy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Forgetting {
	None,
	/// Remove one uniformly chosen token.
	TokenUniform,
	/// Remove every token of one uniformly chosen type.
	TypeUniform,
	/// Remove every token of one type chosen inversely to its frequency.
	TypeProportional,
}

macro_rules! string_enum {
	($name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
		impl FromStr for $name {
			type Err = String;

			fn from_str(s: &str) -> Result<Self, Self::Err> {
				match s.to_ascii_lowercase().as_str() {
					$($text => Ok(Self::$variant),)+
					other => Err(format!(
						concat!("Unknown ", stringify!($name), " '{}', expected one of: {}"),
						other,
						[$($text),+].join(", ")
					)),
				}
			}
		}

		impl fmt::Display for $name {
			fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
				f.write_str(match self {
					$(Self::$variant => $text,)+
				})
			}
		}
	};
}

string_enum!(Granularity { Unigram => "unigram", Bigram => "bigram" });
string_enum!(UpdateRule { Flip => "flip", Tree => "tree", Viterbi => "viterbi", DecayedMcmc => "decayedmcmc" });
string_enum!(Mode { Batch => "batch", Online => "online" });
string_enum!(Forgetting {
	None => "none",
	TokenUniform => "tokenuniform",
	TypeUniform => "typeuniform",
	TypeProportional => "typeproportional",
});

/// Full configuration of a segmentation run.
///
/// # Responsibilities
/// - Select the strategy (`granularity`, `rule`, `mode`, `mbdp`, `forgetting`)
/// - Hold model hyperparameters and their priors
/// - Hold the sampling schedule (iterations, annealing, decayed MCMC)
///
/// Fields without a validity constraint are public; the others go through
/// setters that reject invalid values. The strategy combination itself is
/// checked when the segmenter is built.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SegmenterConfig {
	pub granularity: Granularity,
	pub rule: UpdateRule,
	pub mode: Mode,
	/// Score unigram words with Brent's MBDP-1 probability.
	pub mbdp: bool,
	pub forgetting: Forgetting,
	/// Online forgetting keeps at most this many tokens.
	pub token_memory: u32,

	/// Batch sweeps run by `Segmenter::train`.
	pub iterations: usize,
	pub seed: u64,
	/// Levels above zero check the model invariants after every update.
	pub debug_level: u32,
	/// Decode evaluation sentences with Viterbi instead of sampling them.
	pub eval_maximize: bool,
	pub hyper: HyperPriors,

	unigram_a: f64,
	unigram_b: f64,
	bigram_a: f64,
	bigram_b: f64,
	pstop: f64,
	aeos: f64,
	init: InitBoundaries,
	annealing: Annealing,
	decay_rate: f64,
	samples_per_utt: usize,
}

impl Default for SegmenterConfig {
	fn default() -> Self {
		Self {
			granularity: Granularity::Unigram,
			rule: UpdateRule::Flip,
			mode: Mode::Batch,
			mbdp: false,
			forgetting: Forgetting::None,
			token_memory: u32::MAX,
			iterations: 100,
			seed: 0,
			debug_level: 0,
			eval_maximize: true,
			hyper: HyperPriors::default(),
			unigram_a: 0.0,
			unigram_b: 1.0,
			bigram_a: 0.0,
			bigram_b: 1.0,
			pstop: 0.5,
			aeos: 2.0,
			init: InitBoundaries::Empty,
			annealing: Annealing::default(),
			decay_rate: 1.0,
			samples_per_utt: 1000,
		}
	}
}

fn check_hyperparameters(a: f64, b: f64) -> Result<(), String> {
	if !(0.0..1.0).contains(&a) {
		return Err(format!("Invalid discount {a}: must be in [0, 1)"));
	}
	if !b.is_finite() || b < 0.0 || (a == 0.0 && b == 0.0) {
		return Err(format!("Invalid strength {b}: must be positive, or non-negative with a positive discount"));
	}
	Ok(())
}

impl SegmenterConfig {
	/// Default parameters for one strategy.
	///
	/// The combination is only checked when the segmenter is built.
	pub fn new(granularity: Granularity, rule: UpdateRule, mode: Mode) -> Self {
		Self { granularity, rule, mode, ..Self::default() }
	}

	/// Unigram discount and strength.
	pub fn unigram_hyperparameters(&self) -> (f64, f64) {
		(self.unigram_a, self.unigram_b)
	}

	/// Sets the unigram discount and strength.
	///
	/// # Errors
	/// Returns an error unless `0 <= a < 1`, `b >= 0`, and `a + b > 0`.
	pub fn set_unigram_hyperparameters(&mut self, a: f64, b: f64) -> Result<(), String> {
		check_hyperparameters(a, b)?;
		self.unigram_a = a;
		self.unigram_b = b;
		Ok(())
	}

	/// Discount and strength shared by the bigram contexts.
	pub fn bigram_hyperparameters(&self) -> (f64, f64) {
		(self.bigram_a, self.bigram_b)
	}

	/// # Errors
	/// Same constraints as `set_unigram_hyperparameters`.
	pub fn set_bigram_hyperparameters(&mut self, a: f64, b: f64) -> Result<(), String> {
		check_hyperparameters(a, b)?;
		self.bigram_a = a;
		self.bigram_b = b;
		Ok(())
	}

	/// Word-end probability of the character model.
	pub fn pstop(&self) -> f64 {
		self.pstop
	}

	/// # Errors
	/// Returns an error if `pstop` is outside `(0, 1]`.
	pub fn set_pstop(&mut self, pstop: f64) -> Result<(), String> {
		if !(pstop > 0.0 && pstop <= 1.0) {
			return Err(format!("Invalid pstop {pstop}: must be in (0, 1]"));
		}
		self.pstop = pstop;
		Ok(())
	}

	/// Pseudo-count of the unigram sentence-end term.
	pub fn aeos(&self) -> f64 {
		self.aeos
	}

	/// # Errors
	/// Returns an error if `aeos` is not strictly positive.
	pub fn set_aeos(&mut self, aeos: f64) -> Result<(), String> {
		if !(aeos.is_finite() && aeos > 0.0) {
			return Err(format!("Invalid aeos {aeos}: must be positive"));
		}
		self.aeos = aeos;
		Ok(())
	}

	pub fn init(&self) -> InitBoundaries {
		self.init
	}

	/// # Errors
	/// Returns an error if a random initialisation probability is outside `[0, 1]`.
	pub fn set_init(&mut self, init: InitBoundaries) -> Result<(), String> {
		if let InitBoundaries::Random(p) = init {
			if !(0.0..=1.0).contains(&p) {
				return Err(format!("Invalid initial boundary probability {p}: must be in [0, 1]"));
			}
		}
		self.init = init;
		Ok(())
	}

	pub fn annealing(&self) -> Annealing {
		self.annealing
	}

	/// Anneals from `start` to `stop` over the first `iterations` iterations.
	///
	/// # Errors
	/// Returns an error if a temperature is not strictly positive.
	pub fn set_annealing(&mut self, start: f64, stop: f64, iterations: usize) -> Result<(), String> {
		self.annealing = Annealing::new(start, stop, iterations)?;
		Ok(())
	}

	pub fn decay_rate(&self) -> f64 {
		self.decay_rate
	}

	/// # Errors
	/// Returns an error if `decay_rate` is not strictly positive.
	pub fn set_decay_rate(&mut self, decay_rate: f64) -> Result<(), String> {
		if !(decay_rate.is_finite() && decay_rate > 0.0) {
			return Err(format!("Invalid decay rate {decay_rate}: must be positive"));
		}
		self.decay_rate = decay_rate;
		Ok(())
	}

	/// Decayed-MCMC flips per sentence.
	pub fn samples_per_utt(&self) -> usize {
		self.samples_per_utt
	}

	/// # Errors
	/// Returns an error if `samples_per_utt` is zero.
	pub fn set_samples_per_utt(&mut self, samples_per_utt: usize) -> Result<(), String> {
		if samples_per_utt == 0 {
			return Err("Invalid samples per utterance: must be at least 1".to_owned());
		}
		self.samples_per_utt = samples_per_utt;
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_enums_parse_and_display() {
		assert_eq!("Bigram".parse::<Granularity>(), Ok(Granularity::Bigram));
		assert_eq!("decayedmcmc".parse::<UpdateRule>(), Ok(UpdateRule::DecayedMcmc));
		assert_eq!("online".parse::<Mode>(), Ok(Mode::Online));
		assert_eq!("typeproportional".parse::<Forgetting>(), Ok(Forgetting::TypeProportional));
		assert_eq!(UpdateRule::Viterbi.to_string(), "viterbi");

		let error = "trigram".parse::<Granularity>().unwrap_err();
		assert!(error.contains("unigram, bigram"), "{error}");
	}

	#[test]
	fn test_setters_reject_invalid_values() {
		let mut config = SegmenterConfig::default();
		assert!(config.set_unigram_hyperparameters(1.0, 1.0).is_err());
		assert!(config.set_unigram_hyperparameters(0.0, 0.0).is_err());
		assert!(config.set_unigram_hyperparameters(0.5, 0.0).is_ok());
		assert!(config.set_bigram_hyperparameters(0.1, -1.0).is_err());
		assert!(config.set_pstop(0.0).is_err());
		assert!(config.set_aeos(0.0).is_err());
		assert!(config.set_init(InitBoundaries::Random(1.5)).is_err());
		assert!(config.set_decay_rate(-2.0).is_err());
		assert!(config.set_samples_per_utt(0).is_err());
		assert!(config.set_annealing(10.0, 1.0, 50).is_ok());

		assert_eq!(config.unigram_hyperparameters(), (0.5, 0.0));
		assert_eq!(config.bigram_hyperparameters(), (0.0, 1.0));
		assert_eq!(config.annealing().start(), 10.0);
	}

	#[test]
	fn test_new_sets_strategy_over_defaults() {
		let config = SegmenterConfig::new(Granularity::Bigram, UpdateRule::Tree, Mode::Online);
		assert_eq!((config.granularity, config.rule, config.mode), (Granularity::Bigram, UpdateRule::Tree, Mode::Online));
		let defaults = SegmenterConfig::default();
		assert_eq!(config.unigram_hyperparameters(), defaults.unigram_hyperparameters());
		assert_eq!(config.samples_per_utt(), defaults.samples_per_utt());
		assert_eq!(config.iterations, defaults.iterations);
	}
}
