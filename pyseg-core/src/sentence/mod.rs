use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::corpus::{Corpus, SentenceSpan, Word};
use crate::random::Context;
use crate::score::Scoring;

pub use chart::{Chart, Semiring};

/// Log-space dynamic-programming chart shared by block sampling and decoding.
pub mod chart;

mod bigram;
mod unigram;

/// Initial state of the interior boundaries.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum InitBoundaries {
	/// No interior boundary: each sentence starts as one word.
	Empty,
	/// Each candidate is a boundary with the given probability.
	Random(f64),
	/// Copy the gold segmentation.
	Gold,
}

/// Everything a sentence update needs besides the model.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SamplingParams {
	/// Number of sentences in the model, the current one included.
	pub nsentences: usize,
	/// Annealing temperature; probabilities are raised to `1 / temperature`.
	pub temperature: f64,
	/// Dirichlet pseudo-count of the unigram sentence-end term.
	pub aeos: f64,
	/// Score unigram words with Brent's MBDP-1 probability.
	pub mbdp: bool,
}

impl SamplingParams {
	pub fn new(nsentences: usize, temperature: f64) -> Self {
		Self { nsentences, temperature, aeos: 2.0, mbdp: false }
	}

	pub(crate) fn beta(&self) -> f64 {
		1.0 / self.temperature
	}

	pub(crate) fn other_sentences(&self) -> usize {
		self.nsentences.saturating_sub(1)
	}
}

/// A word model a sentence can be segmented against.
///
/// Implemented by `UnigramModel` and `BigramModel`. Flip updates mutate the
/// model counts; charts and log probabilities read a frozen model, so the
/// caller erases the sentence first.
pub trait SegmentModel {
	/// Adds the counts of every word of `sentence`.
	fn insert_words(&mut self, sentence: &Sentence, ctx: &mut Context);

	/// Removes the counts added by `insert_words`.
	fn erase_words(&mut self, sentence: &Sentence, ctx: &mut Context);

	/// Resamples the boundary at `slot` from its exact conditional.
	///
	/// The sentence's words must be seated in the model; they are seated
	/// again on return. Returns true if the boundary changed.
	fn flip(&mut self, sentence: &mut Sentence, slot: usize, params: &SamplingParams, ctx: &mut Context) -> bool;

	/// Forward chart over the sentence's lattice; returns it with its final cell.
	fn chart(&self, sentence: &Sentence, params: &SamplingParams, semiring: Semiring) -> (Chart, usize);

	/// Unnormalised log probability of the current segmentation, as scored by `chart`.
	fn segmentation_logprob(&self, sentence: &Sentence, params: &SamplingParams) -> f64;

	/// Number of word tokens the model holds.
	fn ntokens(&self) -> u32;

	/// Joint log probability of the seating arrangement.
	fn logprob(&self) -> f64;

	fn sanity_check(&self) -> bool;
}

/// Boundary state over one sentence of the corpus.
///
/// The span includes the marker before and after the sentence. Slot `k` is
/// the boundary before padded character `k`, so there are `len + 1` slots;
/// slots `0`, `1`, `len - 1` and `len` are sentinels and always set.
#[derive(Clone, Debug)]
pub struct Sentence {
	text: Arc<[char]>,
	span: SentenceSpan,
	boundaries: Vec<bool>,
	candidates: Vec<usize>,
	gold: Vec<bool>,
}

impl Sentence {
	/// Builds the sentence at `span` and initialises its boundaries.
	///
	/// `Random` consumes one draw per candidate, left to right.
	pub fn new(corpus: &Corpus, span: SentenceSpan, init: InitBoundaries, ctx: &mut Context) -> Self {
		let len = span.len();
		assert!(len >= 3, "sentence span {span:?} holds no character");
		let sentinel = |k: usize| k <= 1 || k + 1 >= len;

		let candidates: Vec<usize> =
			(2..len - 1).filter(|&k| corpus.is_possible_boundary(span.start + k)).collect();
		let gold: Vec<bool> = (0..=len).map(|k| sentinel(k) || corpus.is_gold_boundary(span.start + k)).collect();

		let mut boundaries: Vec<bool> = (0..=len).map(sentinel).collect();
		match init {
			InitBoundaries::Empty => {}
			InitBoundaries::Random(p) => {
				for &k in &candidates {
					boundaries[k] = ctx.uniform() < p;
				}
			}
			InitBoundaries::Gold => {
				for &k in &candidates {
					boundaries[k] = gold[k];
				}
			}
		}

		Self { text: corpus.text().clone(), span, boundaries, candidates, gold }
	}

	pub fn span(&self) -> SentenceSpan {
		self.span
	}

	/// Number of characters, padding included.
	pub fn len(&self) -> usize {
		self.span.len()
	}

	/// Always false; a sentence holds at least one character.
	pub fn is_empty(&self) -> bool {
		false
	}

	pub fn boundaries(&self) -> &[bool] {
		&self.boundaries
	}

	/// Slots that may host a boundary, ascending.
	pub fn candidates(&self) -> &[usize] {
		&self.candidates
	}

	pub fn gold(&self) -> &[bool] {
		&self.gold
	}

	/// Sets a candidate boundary.
	///
	/// # Panics
	/// Panics if `slot` is not a candidate.
	pub fn set_boundary(&mut self, slot: usize, value: bool) {
		assert!(self.candidates.binary_search(&slot).is_ok(), "slot {slot} is not a candidate");
		self.boundaries[slot] = value;
	}

	/// The word between slots `from` and `to`.
	fn word(&self, from: usize, to: usize) -> Word {
		Word::new(self.text.clone(), self.span.start + from, self.span.start + to)
	}

	/// The marker word before the sentence.
	fn start_marker(&self) -> Word {
		self.word(0, 1)
	}

	/// The marker word after the sentence.
	fn end_marker(&self) -> Word {
		self.word(self.len() - 1, self.len())
	}

	/// Slot closing the last word.
	fn last_slot(&self) -> usize {
		self.len() - 1
	}

	/// Nearest boundary strictly before `slot`.
	fn previous_boundary(&self, slot: usize) -> usize {
		(1..slot).rev().find(|&k| self.boundaries[k]).unwrap_or(1)
	}

	/// Nearest boundary strictly after `slot`.
	fn next_boundary(&self, slot: usize) -> usize {
		(slot + 1..self.len()).find(|&k| self.boundaries[k]).unwrap_or(self.last_slot())
	}

	/// Lattice nodes: the first slot, every candidate, the last slot.
	fn nodes(&self) -> Vec<usize> {
		let mut nodes = Vec::with_capacity(self.candidates.len() + 2);
		nodes.push(1);
		nodes.extend_from_slice(&self.candidates);
		nodes.push(self.last_slot());
		nodes
	}

	/// Clears every candidate, then sets the ones listed in `slots`.
	fn set_path(&mut self, slots: &[usize]) {
		for &k in &self.candidates {
			self.boundaries[k] = false;
		}
		for &k in slots {
			self.boundaries[k] = true;
		}
	}

	fn spans_of(&self, boundaries: &[bool]) -> Vec<(usize, usize)> {
		let mut spans = Vec::new();
		let mut from = 1;
		for to in 2..self.len() {
			if boundaries[to] {
				spans.push((from, to));
				from = to;
			}
		}
		spans
	}

	/// Word slots `(from, to)` of the current segmentation.
	fn word_spans(&self) -> Vec<(usize, usize)> {
		self.spans_of(&self.boundaries)
	}

	/// Words of the current segmentation, markers excluded.
	pub fn words(&self) -> Vec<Word> {
		self.word_spans().into_iter().map(|(from, to)| self.word(from, to)).collect()
	}

	/// The sentence with one space between words.
	pub fn segmented_text(&self) -> String {
		self.words().iter().map(Word::to_string).collect::<Vec<_>>().join(" ")
	}

	pub fn insert_words<M: SegmentModel + ?Sized>(&self, model: &mut M, ctx: &mut Context) {
		model.insert_words(self, ctx);
	}

	pub fn erase_words<M: SegmentModel + ?Sized>(&self, model: &mut M, ctx: &mut Context) {
		model.erase_words(self, ctx);
	}

	/// One Gibbs sweep over the candidates, left to right.
	///
	/// The sentence's words must be seated in the model. Returns the number of
	/// boundaries that changed.
	pub fn sample_by_flips<M: SegmentModel + ?Sized>(
		&mut self,
		model: &mut M,
		params: &SamplingParams,
		ctx: &mut Context,
	) -> usize {
		let mut nchanged = 0;
		for index in 0..self.candidates.len() {
			let slot = self.candidates[index];
			if model.flip(self, slot, params, ctx) {
				nchanged += 1;
			}
		}
		log::trace!("flipped {nchanged} boundaries of '{}'", self.segmented_text());
		nchanged
	}

	/// Resamples the single boundary at `slot`; returns true if it changed.
	pub fn flip<M: SegmentModel + ?Sized>(
		&mut self,
		model: &mut M,
		slot: usize,
		params: &SamplingParams,
		ctx: &mut Context,
	) -> bool {
		model.flip(self, slot, params, ctx)
	}

	/// Draws a whole segmentation from its posterior under the frozen model.
	///
	/// The sentence's own words must not be seated in the model.
	pub fn sample_tree<M: SegmentModel + ?Sized>(&mut self, model: &M, params: &SamplingParams, ctx: &mut Context) {
		let (chart, last) = model.chart(self, params, Semiring::Sum);
		let slots = chart.sample_slots(last, ctx);
		self.set_path(&slots);
	}

	/// Sets the most probable segmentation under the frozen model and returns
	/// its unnormalised log probability.
	pub fn maximize<M: SegmentModel + ?Sized>(&mut self, model: &M, params: &SamplingParams) -> f64 {
		let (chart, last) = model.chart(self, params, Semiring::Max);
		let slots = chart.best_slots(last);
		self.set_path(&slots);
		chart.log_mass(last)
	}

	/// Log of the summed unnormalised probability of every segmentation.
	pub fn log_marginal<M: SegmentModel + ?Sized>(&self, model: &M, params: &SamplingParams) -> f64 {
		let (chart, last) = model.chart(self, params, Semiring::Sum);
		chart.log_mass(last)
	}

	pub fn segmentation_logprob<M: SegmentModel + ?Sized>(&self, model: &M, params: &SamplingParams) -> f64 {
		model.segmentation_logprob(self, params)
	}

	/// Adds this sentence's segmentation against its gold standard.
	pub fn score(&self, scoring: &mut Scoring) {
		let offset = self.span.start;
		let shift = |spans: Vec<(usize, usize)>| -> Vec<(usize, usize)> {
			spans.into_iter().map(|(from, to)| (offset + from, offset + to)).collect()
		};
		let found = shift(self.word_spans());
		let gold = shift(self.spans_of(&self.gold));
		scoring.add_sentence(&self.text, &found, &gold);
	}
}

#[cfg(test)]
pub(crate) mod tests {
	use super::*;
	use crate::model::{BigramModel, CharModel, UnigramModel};
	use crate::random::tests::ScriptedSource;

	pub(crate) fn unigram(corpus: &Corpus, a: f64, b: f64) -> UnigramModel {
		UnigramModel::new(a, b, CharModel::new(0.5, corpus.nchartypes()).unwrap())
	}

	pub(crate) fn bigram(corpus: &Corpus) -> BigramModel {
		BigramModel::new(0.1, 1.5, unigram(corpus, 0.2, 1.0))
	}

	/// One copy of the sentence per assignment of its candidate boundaries.
	pub(crate) fn all_segmentations(sentence: &Sentence) -> Vec<Sentence> {
		let candidates = sentence.candidates().to_vec();
		(0..1u32 << candidates.len())
			.map(|bits| {
				let mut copy = sentence.clone();
				for (index, &slot) in candidates.iter().enumerate() {
					copy.set_boundary(slot, bits & (1 << index) != 0);
				}
				copy
			})
			.collect()
	}

	#[test]
	fn test_layout_and_sentinels() {
		let corpus = Corpus::from_lines(&["ab ab", "c"]).unwrap();
		let mut ctx = Context::seeded(1);
		let sentence = Sentence::new(&corpus, corpus.spans()[0], InitBoundaries::Empty, &mut ctx);
		assert_eq!(sentence.len(), 6);
		assert_eq!(sentence.boundaries(), &[true, true, false, false, false, true, true]);
		assert_eq!(sentence.candidates(), &[2, 3, 4]);
		assert_eq!(sentence.gold(), &[true, true, false, true, false, true, true]);
		assert_eq!(sentence.segmented_text(), "abab");

		let short = Sentence::new(&corpus, corpus.spans()[1], InitBoundaries::Empty, &mut ctx);
		assert!(short.candidates().is_empty());
		assert_eq!(short.segmented_text(), "c");
	}

	#[test]
	fn test_init_boundaries() {
		let corpus = Corpus::from_lines(&["ab ab"]).unwrap();
		let span = corpus.spans()[0];
		let mut ctx = Context::new(ScriptedSource::new(vec![0.1, 0.9, 0.4]));
		let random = Sentence::new(&corpus, span, InitBoundaries::Random(0.5), &mut ctx);
		assert_eq!(random.segmented_text(), "a ba b");

		let gold = Sentence::new(&corpus, span, InitBoundaries::Gold, &mut ctx);
		assert_eq!(gold.segmented_text(), "ab ab");
		assert_eq!(gold.words()[0], gold.words()[1]);
	}

	#[test]
	#[should_panic]
	fn test_sentinel_cannot_be_set() {
		let corpus = Corpus::from_lines(&["ab"]).unwrap();
		let mut ctx = Context::seeded(1);
		let mut sentence = Sentence::new(&corpus, corpus.spans()[0], InitBoundaries::Empty, &mut ctx);
		sentence.set_boundary(1, false);
	}

	#[test]
	fn test_gold_scoring_is_perfect() {
		let corpus = Corpus::from_lines(&["yu want D6 bUk", "D6 bUk"]).unwrap();
		let mut ctx = Context::seeded(1);
		let mut scoring = Scoring::new();
		for &span in corpus.spans() {
			Sentence::new(&corpus, span, InitBoundaries::Gold, &mut ctx).score(&mut scoring);
		}
		let summary = scoring.summary();
		assert_eq!(summary.tokens.fscore, 1.0);
		assert_eq!(summary.boundaries.fscore, 1.0);
		assert_eq!(summary.lexicon.fscore, 1.0);
	}

	#[test]
	fn test_insert_erase_round_trip() {
		let corpus = Corpus::from_lines(&["ab ab c", "c ab"]).unwrap();
		let mut ctx = Context::seeded(5);
		let sentences: Vec<Sentence> =
			corpus.spans().iter().map(|&span| Sentence::new(&corpus, span, InitBoundaries::Gold, &mut ctx)).collect();

		let mut uni = unigram(&corpus, 0.3, 1.0);
		let mut bi = bigram(&corpus);
		for sentence in &sentences {
			sentence.insert_words(&mut uni, &mut ctx);
			sentence.insert_words(&mut bi, &mut ctx);
		}
		assert_eq!(SegmentModel::ntokens(&uni), 5);
		// three words plus the end marker, two words plus the end marker
		assert_eq!(SegmentModel::ntokens(&bi), 7);
		assert!(uni.sanity_check() && bi.sanity_check());

		for sentence in &sentences {
			sentence.erase_words(&mut uni, &mut ctx);
			sentence.erase_words(&mut bi, &mut ctx);
		}
		assert!(uni.crp().is_empty());
		assert_eq!(bi.ncontexts(), 0);
		assert!(bi.unigram().crp().is_empty());
	}
}
