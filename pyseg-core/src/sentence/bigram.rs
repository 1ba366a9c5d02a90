use crate::corpus::Word;
use crate::model::BigramModel;
use crate::numeric::check_positive;
use crate::random::Context;

use super::{Chart, SamplingParams, SegmentModel, Semiring, Sentence};

impl BigramModel {
	fn ln_transition(&self, w1: &Word, w2: &Word) -> f64 {
		check_positive(self.probability(w1, w2), "bigram probability").ln()
	}
}

/// Word before the one starting at `from`, the start marker for the first word.
fn word_before(sentence: &Sentence, from: usize) -> Word {
	if from == 1 {
		sentence.start_marker()
	} else {
		sentence.word(sentence.previous_boundary(from), from)
	}
}

/// Word after the one ending at `to`, the end marker for the last word.
fn word_after(sentence: &Sentence, to: usize) -> Word {
	if to == sentence.last_slot() {
		sentence.end_marker()
	} else {
		sentence.word(to, sentence.next_boundary(to))
	}
}

impl SegmentModel for BigramModel {
	fn insert_words(&mut self, sentence: &Sentence, ctx: &mut Context) {
		let mut previous = sentence.start_marker();
		for word in sentence.words() {
			self.insert(&previous, &word, ctx);
			previous = word;
		}
		self.insert(&previous, &sentence.end_marker(), ctx);
	}

	fn erase_words(&mut self, sentence: &Sentence, ctx: &mut Context) {
		let mut previous = sentence.start_marker();
		for word in sentence.words() {
			self.erase(&previous, &word, ctx);
			previous = word;
		}
		self.erase(&previous, &sentence.end_marker(), ctx);
	}

	fn flip(&mut self, sentence: &mut Sentence, slot: usize, params: &SamplingParams, ctx: &mut Context) -> bool {
		let i0 = sentence.previous_boundary(slot);
		let i2 = sentence.next_boundary(slot);
		let w0 = word_before(sentence, i0);
		let w1 = sentence.word(i0, slot);
		let w2 = sentence.word(slot, i2);
		let w12 = sentence.word(i0, i2);
		let w3 = word_after(sentence, i2);
		let was_boundary = sentence.boundaries[slot];

		if was_boundary {
			self.erase(&w0, &w1, ctx);
			self.erase(&w1, &w2, ctx);
			self.erase(&w2, &w3, ctx);
		} else {
			self.erase(&w0, &w12, ctx);
			self.erase(&w12, &w3, ctx);
		}

		let mut ln_no_boundary = self.ln_transition(&w0, &w12);
		self.insert(&w0, &w12, ctx);
		ln_no_boundary += self.ln_transition(&w12, &w3);
		self.erase(&w0, &w12, ctx);

		let mut ln_boundary = self.ln_transition(&w0, &w1);
		self.insert(&w0, &w1, ctx);
		ln_boundary += self.ln_transition(&w1, &w2);
		self.insert(&w1, &w2, ctx);
		ln_boundary += self.ln_transition(&w2, &w3);
		self.erase(&w1, &w2, ctx);
		self.erase(&w0, &w1, ctx);

		let beta = params.beta();
		let p_boundary = 1.0 / (1.0 + (beta * (ln_no_boundary - ln_boundary)).exp());
		let boundary = ctx.uniform() < p_boundary;
		sentence.boundaries[slot] = boundary;

		if boundary {
			self.insert(&w0, &w1, ctx);
			self.insert(&w1, &w2, ctx);
			self.insert(&w2, &w3, ctx);
		} else {
			self.insert(&w0, &w12, ctx);
			self.insert(&w12, &w3, ctx);
		}
		log::trace!("slot {slot}: P(boundary) = {p_boundary:.4}, boundary = {boundary}");
		boundary != was_boundary
	}

	/// One cell per word `(node i, node j)`, reached from every word ending at
	/// node `i`; a final cell closes the sentence with the end marker.
	fn chart(&self, sentence: &Sentence, params: &SamplingParams, semiring: Semiring) -> (Chart, usize) {
		let nodes = sentence.nodes();
		let last = nodes.len() - 1;
		let width = nodes.len();
		let beta = params.beta();
		let start_marker = sentence.start_marker();

		let mut chart = Chart::new(semiring);
		let start = chart.add_start(nodes[0]);
		let mut cells = vec![start; width * width];
		let mut transitions = Vec::with_capacity(width);
		for j in 1..=last {
			for i in 0..j {
				let word = sentence.word(nodes[i], nodes[j]);
				transitions.clear();
				if i == 0 {
					transitions.push((start, beta * self.ln_transition(&start_marker, &word)));
				} else {
					for h in 0..i {
						let previous = sentence.word(nodes[h], nodes[i]);
						transitions.push((cells[h * width + i], beta * self.ln_transition(&previous, &word)));
					}
				}
				cells[i * width + j] = chart.add_cell(nodes[j], &transitions);
			}
		}

		let end_marker = sentence.end_marker();
		transitions.clear();
		for i in 0..last {
			let word = sentence.word(nodes[i], nodes[last]);
			transitions.push((cells[i * width + last], beta * self.ln_transition(&word, &end_marker)));
		}
		let end = chart.add_cell(nodes[last], &transitions);
		(chart, end)
	}

	fn segmentation_logprob(&self, sentence: &Sentence, params: &SamplingParams) -> f64 {
		let mut previous = sentence.start_marker();
		let mut logprob = 0.0;
		for word in sentence.words() {
			logprob += self.ln_transition(&previous, &word);
			previous = word;
		}
		logprob += self.ln_transition(&previous, &sentence.end_marker());
		params.beta() * logprob
	}

	fn ntokens(&self) -> u32 {
		BigramModel::ntokens(self)
	}

	fn logprob(&self) -> f64 {
		BigramModel::logprob(self)
	}

	fn sanity_check(&self) -> bool {
		BigramModel::sanity_check(self)
	}
}
