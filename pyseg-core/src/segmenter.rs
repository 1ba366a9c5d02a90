use crate::config::{Mode, SegmenterConfig};
use crate::corpus::Corpus;
use crate::random::Context;
use crate::sampler::{Model, Sampler};
use crate::score::{ScoreSummary, Scoring};
use crate::sentence::{InitBoundaries, Sentence};

/// High-level training and segmentation driver.
///
/// # Responsibilities
/// - Own the training corpus, its sentences, the sampler and the context
/// - Run batch iterations (every sentence per iteration) or online steps
///   (one new sentence per step) under the annealing schedule
/// - Resample hyperparameters between iterations when enabled
/// - Score the training segmentation and decode unseen text
///
/// # Example
/// ```
/// use pyseg_core::config::{Granularity, Mode, SegmenterConfig, UpdateRule};
/// use pyseg_core::corpus::Corpus;
/// use pyseg_core::segmenter::Segmenter;
///
/// let corpus = Corpus::from_lines(&["yu want D6 bUk", "D6 bUk"]).unwrap();
/// let mut config = SegmenterConfig::new(Granularity::Unigram, UpdateRule::Tree, Mode::Batch);
/// config.iterations = 5;
/// config.set_unigram_hyperparameters(0.5, 0.0).unwrap();
/// let mut segmenter = Segmenter::new(corpus, config).unwrap();
/// segmenter.train();
/// assert_eq!(segmenter.segmentations().len(), 2);
/// ```
pub struct Segmenter {
	config: SegmenterConfig,
	corpus: Corpus,
	sentences: Vec<Sentence>,
	sampler: Sampler,
	ctx: Context,
	iteration: usize,
}

impl Segmenter {
	/// Builds a segmenter with a context seeded from `config.seed`.
	///
	/// # Errors
	/// Returns an error if the strategy or a parameter is invalid.
	pub fn new(corpus: Corpus, config: SegmenterConfig) -> Result<Self, String> {
		let ctx = Context::seeded(config.seed);
		Self::with_context(corpus, config, ctx)
	}

	/// Builds a segmenter drawing from an existing context.
	///
	/// In batch mode every sentence's initial words are seated immediately.
	pub fn with_context(corpus: Corpus, config: SegmenterConfig, mut ctx: Context) -> Result<Self, String> {
		let mut sampler = Sampler::new(&config, corpus.nchartypes())?;
		ctx.set_debug_level(config.debug_level);

		let sentences: Vec<Sentence> =
			corpus.spans().iter().map(|&span| Sentence::new(&corpus, span, config.init(), &mut ctx)).collect();
		if config.mode == Mode::Batch {
			sampler.initialize(&sentences, &mut ctx);
		}
		log::info!(
			"segmenter ready: {} sentences, {} character types, {}/{}/{}",
			sentences.len(),
			corpus.nchartypes(),
			config.granularity,
			config.rule,
			config.mode
		);

		Ok(Self { config, corpus, sentences, sampler, ctx, iteration: 0 })
	}

	pub fn config(&self) -> &SegmenterConfig {
		&self.config
	}

	pub fn corpus(&self) -> &Corpus {
		&self.corpus
	}

	pub fn sentences(&self) -> &[Sentence] {
		&self.sentences
	}

	pub fn model(&self) -> &Model {
		self.sampler.model()
	}

	/// Batch iterations run, or sentences processed online.
	pub fn iteration(&self) -> usize {
		self.iteration
	}

	/// Number of sentences seated in the model.
	fn nseated(&self) -> usize {
		match self.config.mode {
			Mode::Batch => self.sentences.len(),
			Mode::Online => self.iteration.min(self.sentences.len()),
		}
	}

	/// True once `train` has nothing left to do.
	pub fn is_done(&self) -> bool {
		match self.config.mode {
			Mode::Batch => self.iteration >= self.config.iterations,
			Mode::Online => self.iteration >= self.sentences.len(),
		}
	}

	/// Runs one batch iteration, or processes the next sentence online.
	///
	/// Returns the number of boundaries that changed.
	pub fn iterate(&mut self) -> usize {
		let temperature = self.config.annealing().temperature(self.iteration);
		let nchanged = match self.config.mode {
			Mode::Batch => self.sampler.batch_sweep(&mut self.sentences, temperature, &mut self.ctx),
			Mode::Online => {
				if self.iteration >= self.sentences.len() {
					return 0;
				}
				self.sampler.online_step(&mut self.sentences, self.iteration, temperature, &mut self.ctx)
			}
		};
		if self.config.hyper.is_enabled() {
			self.sampler.model_mut().resample_hyperparameters(&self.config.hyper, &mut self.ctx);
		}
		self.iteration += 1;

		match self.config.mode {
			Mode::Batch => log::info!(
				"iteration {} (T = {temperature:.3}): {nchanged} changes, log P = {:.3}, {}",
				self.iteration,
				self.logprob(),
				self.score()
			),
			Mode::Online => log::debug!(
				"sentence {} (T = {temperature:.3}): '{}'",
				self.iteration,
				self.sentences[self.iteration - 1].segmented_text()
			),
		}
		nchanged
	}

	/// Iterates until `is_done`.
	pub fn train(&mut self) {
		while !self.is_done() {
			self.iterate();
		}
		log::info!("training done after {} steps: log P = {:.3}, {}", self.iteration, self.logprob(), self.score());
	}

	/// Joint log probability of the model's seating.
	pub fn logprob(&self) -> f64 {
		self.sampler.model().logprob()
	}

	/// Scores of the seated sentences' segmentation.
	pub fn score(&self) -> ScoreSummary {
		let mut scoring = Scoring::new();
		for sentence in &self.sentences[..self.nseated()] {
			sentence.score(&mut scoring);
		}
		scoring.summary()
	}

	/// Current segmentation of every training sentence.
	pub fn segmentations(&self) -> Vec<String> {
		self.sentences.iter().map(Sentence::segmented_text).collect()
	}

	/// Segments every sentence of `corpus` with the frozen model.
	///
	/// Returns the segmentations and their scores against the gold words of
	/// `corpus`. The model is left unchanged.
	pub fn evaluate(&mut self, corpus: &Corpus) -> (Vec<String>, ScoreSummary) {
		let nsentences = self.nseated() + 1;
		let mut scoring = Scoring::new();
		let mut segmentations = Vec::with_capacity(corpus.len());
		for &span in corpus.spans() {
			let mut sentence = Sentence::new(corpus, span, InitBoundaries::Empty, &mut self.ctx);
			self.sampler.decode(&mut sentence, nsentences, self.config.eval_maximize, &mut self.ctx);
			sentence.score(&mut scoring);
			segmentations.push(sentence.segmented_text());
		}
		let summary = scoring.summary();
		log::info!("evaluated {} sentences: {summary}", corpus.len());
		(segmentations, summary)
	}

	/// Segments raw lines with the frozen model.
	///
	/// # Errors
	/// Returns an error if no line holds any character.
	pub fn segment<S: AsRef<str>>(&mut self, lines: &[S]) -> Result<Vec<String>, String> {
		let corpus = Corpus::from_lines(lines)?;
		Ok(self.evaluate(&corpus).0)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::config::{Granularity, UpdateRule};
	use crate::random::tests::ScriptedSource;

	const LINES: [&str; 5] = ["yu want D6 bUk", "D6 bUk", "yu want it", "look at D6 bUk", "yu want it"];

	/// One flip sweep over "abab" with a = 0, b = 1 and every draw equal to `draw`.
	///
	/// With a = 0 the seating draws only pick tables, so the boundaries depend
	/// on `draw` alone.
	fn abab_sweep(draw: f64) -> Vec<bool> {
		let corpus = Corpus::from_lines(&["abab"]).unwrap();
		let mut config = SegmenterConfig::default();
		config.iterations = 1;
		config.set_unigram_hyperparameters(0.0, 1.0).unwrap();
		let ctx = Context::new(ScriptedSource::new(vec![draw]));
		let mut segmenter = Segmenter::with_context(corpus, config, ctx).unwrap();
		assert_eq!(segmenter.sentences()[0].boundaries(), &[true, true, false, false, false, true, true]);
		segmenter.train();
		assert_eq!(segmenter.model().ntokens() as usize, segmenter.sentences()[0].words().len());
		segmenter.sentences()[0].boundaries().to_vec()
	}

	#[test]
	fn test_single_flip_sweep_on_abab() {
		// P0(w) = (1/2 · 1/3)^|w|, one sentence so p_cont(T) = (T+1)/(T+2), p_end(T) = 1/(T+2).
		// Slot 2, model empty: P(b) ∝ 1/6 · 1/2 · (1/216)/2 · 1/3, P(¬b) ∝ 1/1296 · 1/2, so 1/7.
		// Draw 0.5 keeps "abab"; slot 3: P(b) ∝ 1/36 · 1/2 · (37/36)/2 · 1/3 against 1/1296 · 1/2, so 37/43.
		// Slot 4 with "ab" seated once: P(b) ∝ 1/12 · 2/3 · 1/18 · 1/4 against 37/216, so 1/223.
		assert_eq!(abab_sweep(0.5), vec![true, true, false, true, false, true, true]);

		// Below 1/7 every slot splits: slot 3 is 1/7 again, slot 4 is 147/167.
		assert_eq!(abab_sweep(0.1), vec![true; 7]);

		// Above 37/43 nothing splits.
		assert_eq!(abab_sweep(0.9), vec![true, true, false, false, false, true, true]);
	}

	#[test]
	fn test_seeded_runs_are_reproducible() {
		let run = |seed: u64| {
			let corpus = Corpus::from_lines(&LINES).unwrap();
			let mut config = SegmenterConfig::default();
			config.iterations = 3;
			config.seed = seed;
			let mut segmenter = Segmenter::new(corpus, config).unwrap();
			segmenter.train();
			segmenter.segmentations()
		};
		assert_eq!(run(1234), run(1234));
	}

	#[test]
	fn test_zero_strength_trains_both_granularities() {
		for granularity in [Granularity::Unigram, Granularity::Bigram] {
			let corpus = Corpus::from_lines(&LINES).unwrap();
			let mut config = SegmenterConfig::new(granularity, UpdateRule::Tree, Mode::Batch);
			config.iterations = 3;
			config.debug_level = 1;
			config.set_unigram_hyperparameters(0.5, 0.0).unwrap();
			config.set_bigram_hyperparameters(0.5, 0.0).unwrap();
			let mut segmenter = Segmenter::new(corpus, config).unwrap();
			segmenter.train();
			assert!(segmenter.logprob().is_finite());
			assert!(segmenter.model().sanity_check());
		}
	}

	#[test]
	fn test_gold_initialisation_scores_perfectly() {
		let corpus = Corpus::from_lines(&LINES).unwrap();
		let mut config = SegmenterConfig::default();
		config.set_init(InitBoundaries::Gold).unwrap();
		let segmenter = Segmenter::new(corpus, config).unwrap();
		let score = segmenter.score();
		assert_eq!(score.tokens.fscore, 1.0);
		assert_eq!(score.boundaries.fscore, 1.0);
		assert_eq!(segmenter.segmentations()[0], "yu want D6 bUk");
	}

	#[test]
	fn test_invalid_strategy_is_rejected() {
		let corpus = Corpus::from_lines(&LINES).unwrap();
		let config = SegmenterConfig::new(Granularity::Unigram, UpdateRule::Flip, Mode::Online);
		assert!(Segmenter::new(corpus, config).is_err());
	}

	#[test]
	fn test_batch_training_with_hyperparameter_resampling() {
		let corpus = Corpus::from_lines(&LINES).unwrap();
		let mut config = SegmenterConfig::new(Granularity::Bigram, UpdateRule::Tree, Mode::Batch);
		config.iterations = 10;
		config.debug_level = 1;
		config.hyper.resample_a = true;
		config.hyper.resample_b = true;
		config.set_annealing(3.0, 1.0, 5).unwrap();
		let mut segmenter = Segmenter::new(corpus, config).unwrap();
		segmenter.train();
		assert_eq!(segmenter.iteration(), 10);
		assert!(segmenter.is_done());
		assert!(segmenter.logprob().is_finite());
		assert!(segmenter.model().sanity_check());
	}

	#[test]
	fn test_online_training_visits_each_sentence() {
		let corpus = Corpus::from_lines(&LINES).unwrap();
		let config = SegmenterConfig::new(Granularity::Unigram, UpdateRule::Viterbi, Mode::Online);
		let mut segmenter = Segmenter::new(corpus, config).unwrap();
		assert_eq!(segmenter.model().ntokens(), 0);
		segmenter.train();
		assert_eq!(segmenter.iteration(), LINES.len());
		assert_eq!(segmenter.iterate(), 0);
		let words: usize = segmenter.sentences().iter().map(|s| s.words().len()).sum();
		assert_eq!(segmenter.model().ntokens() as usize, words);
	}

	#[test]
	fn test_evaluate_leaves_model_untouched() {
		let corpus = Corpus::from_lines(&LINES).unwrap();
		let mut config = SegmenterConfig::new(Granularity::Unigram, UpdateRule::Tree, Mode::Batch);
		config.iterations = 5;
		config.set_init(InitBoundaries::Random(0.5)).unwrap();
		let mut segmenter = Segmenter::new(corpus, config).unwrap();
		segmenter.train();

		let before = segmenter.logprob();
		let held_out = Corpus::from_lines(&["D6 bUk", "yu want"]).unwrap();
		let (segmentations, score) = segmenter.evaluate(&held_out);
		assert_eq!(segmentations.len(), 2);
		assert!(score.tokens.fscore >= 0.0 && score.tokens.fscore <= 1.0);
		assert_eq!(segmenter.logprob(), before);

		let lines = segmenter.segment(&["D6bUk"]).unwrap();
		assert_eq!(lines.len(), 1);
		assert_eq!(lines[0].replace(' ', ""), "D6bUk");
		assert!(segmenter.segment(&[" "]).is_err());
	}
}
