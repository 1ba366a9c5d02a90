//! Sampling strategies.
//!
//! A strategy is the combination of a `Granularity`, an `UpdateRule` and a
//! `Mode` (plus the MBDP and forgetting options). `Estimator::new` is the
//! single place deciding which combinations exist; `Sampler` then drives the
//! sentences with the chosen strategy.

use crate::config::{Forgetting, Granularity, Mode, SegmenterConfig, UpdateRule};
use crate::model::hyper::{resample_bigram, resample_unigram};
use crate::model::{BigramModel, CharModel, HyperPriors, UnigramModel};
use crate::random::Context;
use crate::sentence::{SamplingParams, SegmentModel, Sentence};

/// Decay-weighted site selection for decayed MCMC.
pub mod decayed;

pub use decayed::DecayedMcmc;

/// A validated strategy.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Estimator {
	granularity: Granularity,
	rule: UpdateRule,
	mode: Mode,
	mbdp: bool,
	forgetting: Forgetting,
}

impl Estimator {
	/// Looks the combination up in the strategy table.
	///
	/// # Errors
	/// - flip sampling in online mode
	/// - MBDP with the bigram model, or with flip / decayed-MCMC updates
	/// - forgetting in batch mode, with the bigram model, or with decayed MCMC
	pub fn new(
		granularity: Granularity,
		rule: UpdateRule,
		mode: Mode,
		mbdp: bool,
		forgetting: Forgetting,
	) -> Result<Self, String> {
		use Granularity::*;
		use Mode::*;
		use UpdateRule::*;

		let forgets = forgetting != Forgetting::None;
		let error = match (granularity, rule, mode) {
			(_, Flip, Online) => Some("flip sampling is not defined in online mode"),
			(Bigram, _, _) if mbdp => Some("MBDP is only defined for the unigram model"),
			(_, Flip | DecayedMcmc, _) if mbdp => Some("MBDP only applies to tree and viterbi updates"),
			(_, _, Batch) if forgets => Some("forgetting requires online mode"),
			(Bigram, _, _) if forgets => Some("forgetting is only defined for the unigram model"),
			(_, DecayedMcmc, _) if forgets => Some("forgetting is not defined with decayed MCMC"),
			_ => None,
		};
		match error {
			Some(reason) => Err(format!("Invalid strategy {granularity}/{rule}/{mode}: {reason}")),
			None => Ok(Self { granularity, rule, mode, mbdp, forgetting }),
		}
	}

	pub fn from_config(config: &SegmenterConfig) -> Result<Self, String> {
		Self::new(config.granularity, config.rule, config.mode, config.mbdp, config.forgetting)
	}

	pub fn granularity(&self) -> Granularity {
		self.granularity
	}

	pub fn rule(&self) -> UpdateRule {
		self.rule
	}

	pub fn mode(&self) -> Mode {
		self.mode
	}

	pub fn mbdp(&self) -> bool {
		self.mbdp
	}

	pub fn forgetting(&self) -> Forgetting {
		self.forgetting
	}
}

/// The word model, by granularity.
#[derive(Clone, Debug)]
pub enum Model {
	Unigram(UnigramModel),
	Bigram(BigramModel),
}

impl Model {
	/// Builds an empty model of the configured granularity.
	///
	/// # Errors
	/// Returns an error if the character model cannot be built.
	pub fn new(config: &SegmenterConfig, nchartypes: usize) -> Result<Self, String> {
		let (a, b) = config.unigram_hyperparameters();
		let unigram = UnigramModel::new(a, b, CharModel::new(config.pstop(), nchartypes)?);
		Ok(match config.granularity {
			Granularity::Unigram => Model::Unigram(unigram),
			Granularity::Bigram => {
				let (a, b) = config.bigram_hyperparameters();
				Model::Bigram(BigramModel::new(a, b, unigram))
			}
		})
	}

	pub fn as_segment_model(&self) -> &dyn SegmentModel {
		match self {
			Model::Unigram(model) => model,
			Model::Bigram(model) => model,
		}
	}

	pub fn as_segment_model_mut(&mut self) -> &mut dyn SegmentModel {
		match self {
			Model::Unigram(model) => model,
			Model::Bigram(model) => model,
		}
	}

	/// The unigram model, standalone or under the bigram contexts.
	pub fn unigram(&self) -> &UnigramModel {
		match self {
			Model::Unigram(model) => model,
			Model::Bigram(model) => model.unigram(),
		}
	}

	pub fn ntokens(&self) -> u32 {
		self.as_segment_model().ntokens()
	}

	pub fn logprob(&self) -> f64 {
		self.as_segment_model().logprob()
	}

	pub fn sanity_check(&self) -> bool {
		self.as_segment_model().sanity_check()
	}

	/// Slice-samples the hyperparameters.
	pub fn resample_hyperparameters(&mut self, priors: &HyperPriors, ctx: &mut Context) {
		match self {
			Model::Unigram(model) => resample_unigram(model, priors, ctx),
			Model::Bigram(model) => resample_bigram(model, priors, ctx),
		}
	}

	/// Applies `policy` until at most `token_memory` tokens remain.
	///
	/// Returns the number of tokens removed.
	fn forget(&mut self, policy: Forgetting, token_memory: u32, ctx: &mut Context) -> u32 {
		// The strategy table only allows forgetting with the unigram model.
		let Model::Unigram(model) = self else {
			return 0;
		};
		let mut removed = 0;
		while model.ntokens() > token_memory {
			removed += match policy {
				Forgetting::None => break,
				Forgetting::TokenUniform => model.erase_token_uniform(ctx),
				Forgetting::TypeUniform => model.erase_type_uniform(ctx),
				Forgetting::TypeProportional => model.erase_type_proportional(ctx),
			};
		}
		removed
	}
}

/// Drives a set of sentences with one strategy.
///
/// # Responsibilities
/// - Own the word model and the decayed-MCMC schedule
/// - Keep the model counts equal to the seated sentences' words (until forgetting)
/// - Run batch sweeps and online steps in a fixed, reproducible order
#[derive(Clone, Debug)]
pub struct Sampler {
	estimator: Estimator,
	model: Model,
	decayed: DecayedMcmc,
	aeos: f64,
	samples_per_utt: usize,
	token_memory: u32,
}

impl Sampler {
	/// # Errors
	/// Returns an error on an invalid strategy or model parameters.
	pub fn new(config: &SegmenterConfig, nchartypes: usize) -> Result<Self, String> {
		let estimator = Estimator::from_config(config)?;
		Ok(Self {
			estimator,
			model: Model::new(config, nchartypes)?,
			decayed: DecayedMcmc::new(config.decay_rate())?,
			aeos: config.aeos(),
			samples_per_utt: config.samples_per_utt(),
			token_memory: config.token_memory,
		})
	}

	pub fn estimator(&self) -> &Estimator {
		&self.estimator
	}

	pub fn model(&self) -> &Model {
		&self.model
	}

	pub fn model_mut(&mut self) -> &mut Model {
		&mut self.model
	}

	/// Sampling parameters for a model holding `nsentences` sentences.
	pub fn params(&self, nsentences: usize, temperature: f64) -> SamplingParams {
		SamplingParams { nsentences, temperature, aeos: self.aeos, mbdp: self.estimator.mbdp }
	}

	/// Seats every sentence's initial words (batch mode).
	pub fn initialize(&mut self, sentences: &[Sentence], ctx: &mut Context) {
		for (index, sentence) in sentences.iter().enumerate() {
			sentence.insert_words(self.model.as_segment_model_mut(), ctx);
			if self.estimator.rule == UpdateRule::DecayedMcmc {
				self.decayed.register(index, sentence);
			}
		}
		self.check(ctx);
	}

	/// One batch iteration over every sentence.
	///
	/// Returns the number of boundaries that changed.
	pub fn batch_sweep(&mut self, sentences: &mut [Sentence], temperature: f64, ctx: &mut Context) -> usize {
		let params = self.params(sentences.len(), temperature);
		let model = self.model.as_segment_model_mut();
		let mut nchanged = 0;
		match self.estimator.rule {
			UpdateRule::Flip => {
				for sentence in sentences.iter_mut() {
					nchanged += sentence.sample_by_flips(model, &params, ctx);
				}
			}
			UpdateRule::Tree | UpdateRule::Viterbi => {
				for sentence in sentences.iter_mut() {
					nchanged += resegment(sentence, model, self.estimator.rule, true, &params, ctx);
					sentence.insert_words(model, ctx);
				}
			}
			UpdateRule::DecayedMcmc => {
				for _ in 0..self.samples_per_utt * sentences.len() {
					let Some((index, slot)) = self.decayed.select(ctx) else {
						break;
					};
					if sentences[index].flip(model, slot, &params, ctx) {
						nchanged += 1;
					}
				}
			}
		}
		self.check(ctx);
		nchanged
	}

	/// Processes the sentence at `index` as the newest arrival.
	///
	/// `sentences[..index]` have already been seen. Returns the number of
	/// boundaries that changed.
	pub fn online_step(&mut self, sentences: &mut [Sentence], index: usize, temperature: f64, ctx: &mut Context) -> usize {
		let params = self.params(index + 1, temperature);
		let model = self.model.as_segment_model_mut();
		let mut nchanged = 0;
		match self.estimator.rule {
			UpdateRule::Tree | UpdateRule::Viterbi => {
				nchanged += resegment(&mut sentences[index], model, self.estimator.rule, false, &params, ctx);
				sentences[index].insert_words(model, ctx);
			}
			UpdateRule::DecayedMcmc => {
				sentences[index].insert_words(model, ctx);
				self.decayed.register(index, &sentences[index]);
				for _ in 0..self.samples_per_utt {
					let Some((sentence, slot)) = self.decayed.select(ctx) else {
						break;
					};
					if sentences[sentence].flip(model, slot, &params, ctx) {
						nchanged += 1;
					}
				}
			}
			UpdateRule::Flip => unreachable!("flip sampling has no online strategy"),
		}

		let removed = self.model.forget(self.estimator.forgetting, self.token_memory, ctx);
		if removed > 0 {
			log::debug!("forgot {removed} tokens, {} left", self.model.ntokens());
		}
		self.check(ctx);
		nchanged
	}

	/// Segments `sentence` against the frozen model without seating it.
	///
	/// `nsentences` counts the sentences in the model plus this one.
	pub fn decode(&self, sentence: &mut Sentence, nsentences: usize, maximize: bool, ctx: &mut Context) {
		let params = self.params(nsentences, 1.0);
		let model = self.model.as_segment_model();
		if maximize {
			sentence.maximize(model, &params);
		} else {
			sentence.sample_tree(model, &params, ctx);
		}
	}

	fn check(&self, ctx: &Context) {
		if ctx.debug_level() > 0 {
			assert!(self.model.sanity_check(), "model invariants violated");
		}
	}
}

/// Erases the sentence if `seated`, then redraws or decodes it whole.
///
/// Returns the number of boundaries that changed. The sentence is left
/// unseated.
fn resegment(
	sentence: &mut Sentence,
	model: &mut dyn SegmentModel,
	rule: UpdateRule,
	seated: bool,
	params: &SamplingParams,
	ctx: &mut Context,
) -> usize {
	let before = sentence.boundaries().to_vec();
	if seated {
		sentence.erase_words(model, ctx);
	}
	if rule == UpdateRule::Viterbi {
		sentence.maximize(&*model, params);
	} else {
		sentence.sample_tree(&*model, params, ctx);
	}
	before.iter().zip(sentence.boundaries()).filter(|(a, b)| a != b).count()
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::corpus::Corpus;
	use crate::sentence::InitBoundaries;

	const LINES: [&str; 4] = ["yu want D6 bUk", "D6 bUk", "yu want it", "look at D6 bUk"];

	fn setup(config: &SegmenterConfig) -> (Sampler, Vec<Sentence>, Context) {
		let corpus = Corpus::from_lines(&LINES).unwrap();
		let mut ctx = Context::seeded(config.seed);
		ctx.set_debug_level(1);
		let sentences = corpus
			.spans()
			.iter()
			.map(|&span| Sentence::new(&corpus, span, InitBoundaries::Random(0.3), &mut ctx))
			.collect();
		(Sampler::new(config, corpus.nchartypes()).unwrap(), sentences, ctx)
	}

	fn config(granularity: Granularity, rule: UpdateRule, mode: Mode) -> SegmenterConfig {
		let mut config = SegmenterConfig::new(granularity, rule, mode);
		config.seed = 5;
		config.set_samples_per_utt(20).unwrap();
		config
	}

	#[test]
	fn test_strategy_table() {
		use Forgetting::TokenUniform;
		use Granularity::{Bigram, Unigram};
		use Mode::{Batch, Online};
		use UpdateRule::{DecayedMcmc, Flip, Tree, Viterbi};

		let rejected = [
			(Unigram, Flip, Online, false, Forgetting::None),
			(Bigram, Tree, Batch, true, Forgetting::None),
			(Unigram, Flip, Batch, true, Forgetting::None),
			(Unigram, DecayedMcmc, Batch, true, Forgetting::None),
			(Unigram, Tree, Batch, false, TokenUniform),
			(Bigram, Tree, Online, false, TokenUniform),
			(Unigram, DecayedMcmc, Online, false, TokenUniform),
		];
		for (granularity, rule, mode, mbdp, forgetting) in rejected {
			assert!(Estimator::new(granularity, rule, mode, mbdp, forgetting).is_err(), "{granularity}/{rule}/{mode}");
		}

		let accepted = [
			(Unigram, Flip, Batch, false, Forgetting::None),
			(Bigram, DecayedMcmc, Online, false, Forgetting::None),
			(Unigram, Viterbi, Batch, true, Forgetting::None),
			(Unigram, Tree, Online, true, TokenUniform),
			(Bigram, Viterbi, Online, false, Forgetting::None),
		];
		for (granularity, rule, mode, mbdp, forgetting) in accepted {
			assert!(Estimator::new(granularity, rule, mode, mbdp, forgetting).is_ok(), "{granularity}/{rule}/{mode}");
		}
	}

	#[test]
	fn test_batch_sweeps_keep_counts_in_sync() {
		for granularity in [Granularity::Unigram, Granularity::Bigram] {
			for rule in [UpdateRule::Flip, UpdateRule::Tree, UpdateRule::Viterbi, UpdateRule::DecayedMcmc] {
				let (mut sampler, mut sentences, mut ctx) = setup(&config(granularity, rule, Mode::Batch));
				sampler.initialize(&sentences, &mut ctx);
				for _ in 0..3 {
					sampler.batch_sweep(&mut sentences, 1.0, &mut ctx);
				}
				let words: u32 = sentences.iter().map(|s| s.words().len() as u32).sum();
				let expected = match granularity {
					Granularity::Unigram => words,
					// one extra token per sentence for the end marker
					Granularity::Bigram => words + sentences.len() as u32,
				};
				assert_eq!(sampler.model().ntokens(), expected, "{granularity}/{rule}");
				for sentence in &sentences {
					sentence.erase_words(sampler.model_mut().as_segment_model_mut(), &mut ctx);
				}
				assert_eq!(sampler.model().ntokens(), 0, "{granularity}/{rule}");
			}
		}
	}

	#[test]
	fn test_online_steps_seat_each_sentence_once() {
		for rule in [UpdateRule::Tree, UpdateRule::Viterbi, UpdateRule::DecayedMcmc] {
			let (mut sampler, mut sentences, mut ctx) = setup(&config(Granularity::Unigram, rule, Mode::Online));
			for index in 0..sentences.len() {
				sampler.online_step(&mut sentences, index, 1.0, &mut ctx);
			}
			let words: u32 = sentences.iter().map(|s| s.words().len() as u32).sum();
			assert_eq!(sampler.model().ntokens(), words, "{rule}");
		}
	}

	#[test]
	fn test_online_forgetting_bounds_memory() {
		for forgetting in [Forgetting::TokenUniform, Forgetting::TypeUniform, Forgetting::TypeProportional] {
			let mut config = config(Granularity::Unigram, UpdateRule::Tree, Mode::Online);
			config.forgetting = forgetting;
			config.token_memory = 4;
			let (mut sampler, mut sentences, mut ctx) = setup(&config);
			for index in 0..sentences.len() {
				sampler.online_step(&mut sentences, index, 1.0, &mut ctx);
				assert!(sampler.model().ntokens() <= 4, "{forgetting}");
				assert!(sampler.model().sanity_check());
			}
		}
	}

	#[test]
	fn test_decode_leaves_model_untouched() {
		let (mut sampler, mut sentences, mut ctx) = setup(&config(Granularity::Bigram, UpdateRule::Tree, Mode::Batch));
		sampler.initialize(&sentences[..3], &mut ctx);
		let before = sampler.model().logprob();
		sampler.decode(&mut sentences[3], 4, true, &mut ctx);
		sampler.decode(&mut sentences[3], 4, false, &mut ctx);
		assert_eq!(sampler.model().logprob(), before);
	}
}
