use std::collections::BTreeMap;

use crate::corpus::Word;
use crate::random::Context;

use super::adaptor::PyCrp;
use super::unigram::UnigramModel;

/// Hierarchical bigram model.
///
/// Every left-context word owns a Pitman-Yor process whose base is the
/// shared unigram model. Contexts are created lazily from an empty template
/// and dropped as soon as they become empty; an unseen context backs off to
/// the unigram model.
///
/// The bigram model is the single owner of the unigram: contexts receive it
/// as `&mut` on every insert/erase.
#[derive(Clone, Debug)]
pub struct BigramModel {
	unigram: UnigramModel,
	template: PyCrp<Word>,
	contexts: BTreeMap<Word, PyCrp<Word>>,
}

impl BigramModel {
	/// Creates a bigram model with hyperparameters `(a, b)` for every context.
	pub fn new(a: f64, b: f64, unigram: UnigramModel) -> Self {
		Self { unigram, template: PyCrp::new(a, b), contexts: BTreeMap::new() }
	}

	pub fn unigram(&self) -> &UnigramModel {
		&self.unigram
	}

	pub fn unigram_mut(&mut self) -> &mut UnigramModel {
		&mut self.unigram
	}

	/// Discount shared by all contexts.
	pub fn a(&self) -> f64 {
		self.template.a()
	}

	/// Strength shared by all contexts.
	pub fn b(&self) -> f64 {
		self.template.b()
	}

	/// Sets the hyperparameters of the template and every live context.
	pub fn set_hyperparameters(&mut self, a: f64, b: f64) {
		self.template.set_a(a);
		self.template.set_b(b);
		for crp in self.contexts.values_mut() {
			crp.set_a(a);
			crp.set_b(b);
		}
	}

	/// Number of live contexts.
	pub fn ncontexts(&self) -> usize {
		self.contexts.len()
	}

	/// Total number of bigram tokens.
	pub fn ntokens(&self) -> u32 {
		self.contexts.values().map(PyCrp::n).sum()
	}

	pub fn contexts(&self) -> impl Iterator<Item = (&Word, &PyCrp<Word>)> {
		self.contexts.iter()
	}

	/// `P(w2 | w1)`.
	pub fn probability(&self, w1: &Word, w2: &Word) -> f64 {
		let base_p = self.unigram.predictive_probability(w2);
		match self.contexts.get(w1) {
			Some(crp) => crp.predictive_probability(w2, base_p),
			None => base_p,
		}
	}

	/// Seats `w2` in context `w1`; returns `P(w2 | w1)` before insertion.
	pub fn insert(&mut self, w1: &Word, w2: &Word, ctx: &mut Context) -> f64 {
		let template = &self.template;
		let crp = self.contexts.entry(w1.clone()).or_insert_with(|| template.clone());
		crp.insert(w2, &mut self.unigram, ctx)
	}

	/// Removes one `w2` from context `w1`; returns the count of `w2` left there.
	///
	/// # Panics
	/// Panics if the context is unknown.
	pub fn erase(&mut self, w1: &Word, w2: &Word, ctx: &mut Context) -> u32 {
		let crp = self
			.contexts
			.get_mut(w1)
			.unwrap_or_else(|| panic!("erasing from unknown context {w1}"));
		let remaining = crp.erase(w2, &mut self.unigram, ctx);
		if crp.is_empty() {
			self.contexts.remove(w1);
		}
		remaining
	}

	/// Seating log probability of every context plus the unigram's total.
	pub fn logprob(&self) -> f64 {
		self.contexts.values().map(PyCrp::logprob).sum::<f64>() + self.unigram.total_logprob()
	}

	/// Checks every context, the unigram, and that unigram customers are
	/// exactly the bigram tables.
	pub fn sanity_check(&self) -> bool {
		let tables: u32 = self.contexts.values().map(PyCrp::m).sum();
		self.template.is_empty()
			&& self.contexts.values().all(|crp| crp.sanity_check() && !crp.is_empty())
			&& self.unigram.sanity_check()
			&& tables == self.unigram.ntokens()
	}
}
