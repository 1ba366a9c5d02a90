use crate::corpus::Word;
use crate::model::UnigramModel;
use crate::numeric::check_positive;
use crate::random::Context;

use super::{Chart, SamplingParams, SegmentModel, Semiring, Sentence};

/// Log of the sentence-continuation factor following a word.
///
/// With `T` tokens in the model and `S` other sentences, a word followed by
/// another contributes `(T - S + aeos/2) / (T + aeos)`, the last word of a
/// sentence `(S + aeos/2) / (T + aeos)`.
fn ln_after(ntokens: u32, params: &SamplingParams, is_last: bool) -> f64 {
	let t = ntokens as f64;
	// Forgetting can leave fewer tokens than sentences.
	let s = (params.other_sentences() as f64).min(t);
	let half = params.aeos / 2.0;
	let p = if is_last { (s + half) / (t + params.aeos) } else { (t - s + half) / (t + params.aeos) };
	check_positive(p, "sentence continuation probability").ln()
}

impl UnigramModel {
	fn ln_word(&self, word: &Word, mbdp: bool) -> f64 {
		let p = if mbdp { self.mbdp_probability(word) } else { self.predictive_probability(word) };
		check_positive(p, "word probability").ln()
	}
}

impl SegmentModel for UnigramModel {
	fn insert_words(&mut self, sentence: &Sentence, ctx: &mut Context) {
		for word in sentence.words() {
			self.insert(&word, ctx);
		}
	}

	fn erase_words(&mut self, sentence: &Sentence, ctx: &mut Context) {
		for word in sentence.words() {
			self.erase(&word, ctx);
		}
	}

	fn flip(&mut self, sentence: &mut Sentence, slot: usize, params: &SamplingParams, ctx: &mut Context) -> bool {
		let i0 = sentence.previous_boundary(slot);
		let i2 = sentence.next_boundary(slot);
		let w1 = sentence.word(i0, slot);
		let w2 = sentence.word(slot, i2);
		let w12 = sentence.word(i0, i2);
		let is_last = i2 == sentence.last_slot();
		let was_boundary = sentence.boundaries[slot];

		if was_boundary {
			self.erase(&w1, ctx);
			self.erase(&w2, ctx);
		} else {
			self.erase(&w12, ctx);
		}

		let beta = params.beta();
		let ntokens = self.ntokens();
		let ln_no_boundary = beta * (self.ln_word(&w12, false) + ln_after(ntokens, params, is_last));

		let mut ln_boundary = self.ln_word(&w1, false) + ln_after(ntokens, params, false);
		self.insert(&w1, ctx);
		ln_boundary += self.ln_word(&w2, false) + ln_after(ntokens + 1, params, is_last);
		self.erase(&w1, ctx);
		ln_boundary *= beta;

		let p_boundary = 1.0 / (1.0 + (ln_no_boundary - ln_boundary).exp());
		let boundary = ctx.uniform() < p_boundary;
		sentence.boundaries[slot] = boundary;

		if boundary {
			self.insert(&w1, ctx);
			self.insert(&w2, ctx);
		} else {
			self.insert(&w12, ctx);
		}
		log::trace!("slot {slot}: P(boundary) = {p_boundary:.4}, boundary = {boundary}");
		boundary != was_boundary
	}

	fn chart(&self, sentence: &Sentence, params: &SamplingParams, semiring: Semiring) -> (Chart, usize) {
		let nodes = sentence.nodes();
		let last = nodes.len() - 1;
		let beta = params.beta();
		let ntokens = self.ntokens();

		// Cell index equals node index.
		let mut chart = Chart::new(semiring);
		chart.add_start(nodes[0]);
		let mut transitions = Vec::with_capacity(nodes.len());
		for j in 1..=last {
			let after = ln_after(ntokens, params, j == last);
			transitions.clear();
			for i in 0..j {
				let word = sentence.word(nodes[i], nodes[j]);
				transitions.push((i, beta * (self.ln_word(&word, params.mbdp) + after)));
			}
			chart.add_cell(nodes[j], &transitions);
		}
		(chart, last)
	}

	fn segmentation_logprob(&self, sentence: &Sentence, params: &SamplingParams) -> f64 {
		let spans = sentence.word_spans();
		let ntokens = self.ntokens();
		let last = sentence.last_slot();
		spans
			.iter()
			.map(|&(from, to)| {
				let word = sentence.word(from, to);
				params.beta() * (self.ln_word(&word, params.mbdp) + ln_after(ntokens, params, to == last))
			})
			.sum()
	}

	fn ntokens(&self) -> u32 {
		UnigramModel::ntokens(self)
	}

	fn logprob(&self) -> f64 {
		self.total_logprob()
	}

	fn sanity_check(&self) -> bool {
		UnigramModel::sanity_check(self)
	}
}
