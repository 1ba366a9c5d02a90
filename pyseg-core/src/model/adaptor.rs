use std::collections::BTreeMap;

use crate::numeric::{check_positive, ln_gamma};
use crate::random::Context;

use super::restaurant::Restaurant;

/// A distribution new tables draw their label from.
///
/// Implemented by leaf distributions (the character model) and by the
/// adaptor itself, which is how adaptors stack into hierarchies: a new table
/// in an upper adaptor becomes a customer in the one below.
pub trait Base<L> {
	/// Probability of `label` under the current state.
	fn probability(&self, label: &L) -> f64;

	/// Records one draw of `label`; returns its probability before the draw.
	fn insert(&mut self, label: &L, ctx: &mut Context) -> f64;

	/// Forgets one draw of `label`.
	fn erase(&mut self, label: &L, ctx: &mut Context);

	/// Log probability of all draws currently recorded.
	fn logprob(&self) -> f64;
}

/// Seating state of a Pitman-Yor Chinese restaurant process.
///
/// Holds the hyperparameters, the aggregate counts and one `Restaurant` per
/// label, but not the base distribution: every operation that may reach
/// the base receives it as an argument. This lets many processes share one
/// base (the bigram contexts all share the unigram model) with a single
/// owner.
///
/// # Invariants
/// - `0 <= a <= 1`, `b >= 0`
/// - `m <= n`
/// - `n` and `m` are the sums over restaurants
/// - every stored restaurant is non-empty
#[derive(Clone, Debug)]
pub struct PyCrp<L: Ord + Clone> {
	a: f64,
	b: f64,
	n: u32,
	m: u32,
	restaurants: BTreeMap<L, Restaurant>,
}

impl<L: Ord + Clone> PyCrp<L> {
	/// Creates an empty process.
	///
	/// # Panics
	/// Panics if the hyperparameters are out of range.
	pub fn new(a: f64, b: f64) -> Self {
		assert!((0.0..=1.0).contains(&a), "discount a={a} outside [0, 1]");
		assert!(b >= 0.0, "strength b={b} is negative");
		Self { a, b, n: 0, m: 0, restaurants: BTreeMap::new() }
	}

	/// Discount.
	pub fn a(&self) -> f64 {
		self.a
	}

	/// Strength.
	pub fn b(&self) -> f64 {
		self.b
	}

	pub fn set_a(&mut self, a: f64) {
		assert!((0.0..=1.0).contains(&a), "discount a={a} outside [0, 1]");
		self.a = a;
	}

	pub fn set_b(&mut self, b: f64) {
		assert!(b >= 0.0, "strength b={b} is negative");
		self.b = b;
	}

	/// Total number of customers.
	pub fn n(&self) -> u32 {
		self.n
	}

	/// Total number of occupied tables.
	pub fn m(&self) -> u32 {
		self.m
	}

	/// Number of distinct labels seated.
	pub fn ntypes(&self) -> usize {
		self.restaurants.len()
	}

	pub fn is_empty(&self) -> bool {
		self.n == 0
	}

	/// Customers seated under `label`.
	pub fn count(&self, label: &L) -> u32 {
		self.restaurants.get(label).map_or(0, Restaurant::customers)
	}

	/// Tables serving `label`.
	pub fn tables(&self, label: &L) -> u32 {
		self.restaurants.get(label).map_or(0, Restaurant::tables)
	}

	/// Iterates the labels with their restaurants in label order.
	pub fn restaurants(&self) -> impl Iterator<Item = (&L, &Restaurant)> {
		self.restaurants.iter()
	}

	/// Existing-table mass of `label`: `n_v - m_v · a`.
	fn old_mass(&self, label: &L) -> f64 {
		self.restaurants
			.get(label)
			.map_or(0.0, |r| r.customers() as f64 - r.tables() as f64 * self.a)
	}

	/// New-table mass of a label with base probability `base_p`.
	fn new_mass(&self, base_p: f64) -> f64 {
		base_p * (self.m as f64 * self.a + self.b)
	}

	fn normalizer(&self) -> f64 {
		let z = self.n as f64 + self.b;
		assert!(z > 0.0, "n + b must be positive (n={}, b={})", self.n, self.b);
		z
	}

	/// Predictive probability of `label` given its base probability.
	///
	/// An empty process predicts the base, which also covers `b = 0`.
	pub fn predictive_probability(&self, label: &L, base_p: f64) -> f64 {
		if self.n == 0 {
			return base_p;
		}
		(self.old_mass(label) + self.new_mass(base_p)) / self.normalizer()
	}

	/// Seats one customer for `label`.
	///
	/// A new table sends the label down to `base`; the first customer always
	/// opens one. Returns the predictive probability of `label` before the
	/// insertion.
	pub fn insert<B: Base<L> + ?Sized>(&mut self, label: &L, base: &mut B, ctx: &mut Context) -> f64 {
		let base_p = base.probability(label);
		let before = self.predictive_probability(label, base_p);
		let p_old = self.old_mass(label);
		let draw = ctx.uniform();

		if p_old > 0.0 {
			let total = check_positive(p_old + self.new_mass(base_p), "CRP seating mass");
			let r = total * draw;
			if r <= p_old {
				self.restaurants
					.get_mut(label)
					.expect("label with old mass has a restaurant")
					.insert_old(r, self.a);
				self.n += 1;
				return before;
			}
		}
		self.restaurants.entry(label.clone()).or_default().insert_new();
		self.m += 1;
		self.n += 1;
		base.insert(label, ctx);
		before
	}

	/// Removes one uniformly chosen customer of `label`.
	///
	/// A closed table is removed from `base` too. Returns the number of
	/// customers of `label` left.
	///
	/// # Panics
	/// Panics if `label` has no customer.
	pub fn erase<B: Base<L> + ?Sized>(&mut self, label: &L, base: &mut B, ctx: &mut Context) -> u32 {
		let restaurant = self
			.restaurants
			.get_mut(label)
			.unwrap_or_else(|| panic!("erasing a label with no customer"));
		let index = ctx.uniform_index(restaurant.customers() as usize) as u32;
		let occupancy = restaurant.erase(index);
		let remaining = restaurant.customers();
		let now_empty = restaurant.is_empty();
		self.n -= 1;
		if occupancy == 0 {
			self.m -= 1;
			base.erase(label, ctx);
		}
		if now_empty {
			self.restaurants.remove(label);
		}
		remaining
	}

	/// Removes every customer of `label`; returns how many were removed.
	fn erase_all<B: Base<L> + ?Sized>(&mut self, label: &L, base: &mut B, ctx: &mut Context) -> u32 {
		let mut removed = 0;
		while self.erase(label, base, ctx) > 0 {
			removed += 1;
		}
		removed + 1
	}

	/// Removes one customer chosen uniformly among all customers.
	///
	/// Returns the number of customers removed (0 if the process is empty).
	pub fn erase_token_uniform<B: Base<L> + ?Sized>(&mut self, base: &mut B, ctx: &mut Context) -> u32 {
		if self.n == 0 {
			return 0;
		}
		let mut index = ctx.uniform_index(self.n as usize) as u32;
		let mut chosen = None;
		for (label, restaurant) in &self.restaurants {
			if index < restaurant.customers() {
				chosen = Some(label.clone());
				break;
			}
			index -= restaurant.customers();
		}
		let label = chosen.expect("customer index within the aggregate count");
		self.erase(&label, base, ctx);
		1
	}

	/// Removes all customers of one label chosen uniformly among labels.
	pub fn erase_type_uniform<B: Base<L> + ?Sized>(&mut self, base: &mut B, ctx: &mut Context) -> u32 {
		if self.restaurants.is_empty() {
			return 0;
		}
		let index = ctx.uniform_index(self.restaurants.len());
		let label = self.restaurants.keys().nth(index).cloned().expect("index within label count");
		self.erase_all(&label, base, ctx)
	}

	/// Removes all customers of one label chosen with probability inversely
	/// proportional to its customer count.
	pub fn erase_type_proportional<B: Base<L> + ?Sized>(&mut self, base: &mut B, ctx: &mut Context) -> u32 {
		if self.restaurants.is_empty() {
			return 0;
		}
		let total: f64 = self.restaurants.values().map(|r| 1.0 / r.customers() as f64).sum();
		let draw = total * ctx.uniform();
		let mut mass = 0.0;
		let mut chosen = None;
		for (label, restaurant) in &self.restaurants {
			mass += 1.0 / restaurant.customers() as f64;
			chosen = Some(label);
			if mass > draw {
				break;
			}
		}
		let label = chosen.cloned().expect("non-empty restaurants");
		self.erase_all(&label, base, ctx)
	}

	/// Log probability of the seating arrangement under the Pitman-Yor
	/// prior, base contributions excluded.
	pub fn logprob(&self) -> f64 {
		self.logprob_with(self.a, self.b)
	}

	/// `logprob` evaluated as if the hyperparameters were `(a, b)`.
	pub fn logprob_with(&self, a: f64, b: f64) -> f64 {
		if self.n == 0 {
			return 0.0;
		}
		let (n, m) = (self.n as f64, self.m as f64);
		let tables: f64 = self.restaurants.values().map(|r| r.logprob(a)).sum();

		let seating = if a > 0.0 && b > 0.0 {
			m * a.ln() + ln_gamma(m + b / a) - ln_gamma(b / a) - (ln_gamma(n + b) - ln_gamma(b))
		} else if a > 0.0 {
			// b = 0: the first table is free, Π_{k=1}^{m-1} k·a / (1)_{n-1}.
			(m - 1.0) * a.ln() + ln_gamma(m) - ln_gamma(n)
		} else {
			m * b.ln() - (ln_gamma(n + b) - ln_gamma(b))
		};
		tables + seating
	}

	/// Checks hyperparameter ranges and that the aggregates match the restaurants.
	pub fn sanity_check(&self) -> bool {
		let mut n = 0;
		let mut m = 0;
		let mut restaurants_ok = true;
		for restaurant in self.restaurants.values() {
			n += restaurant.customers();
			m += restaurant.tables();
			restaurants_ok &= restaurant.sanity_check() && !restaurant.is_empty();
		}
		(0.0..=1.0).contains(&self.a)
			&& self.b >= 0.0
			&& self.m <= self.n
			&& n == self.n
			&& m == self.m
			&& restaurants_ok
	}
}

/// A Pitman-Yor adaptor: a CRP bundled with the base distribution it owns.
///
/// The adaptor is itself a `Base`, so `PitmanYorAdaptor<L, PitmanYorAdaptor<L, B>>`
/// builds a two-level hierarchy.
#[derive(Clone, Debug)]
pub struct PitmanYorAdaptor<L: Ord + Clone, B> {
	crp: PyCrp<L>,
	base: B,
}

impl<L: Ord + Clone, B: Base<L>> PitmanYorAdaptor<L, B> {
	pub fn new(a: f64, b: f64, base: B) -> Self {
		Self { crp: PyCrp::new(a, b), base }
	}

	pub fn crp(&self) -> &PyCrp<L> {
		&self.crp
	}

	pub fn crp_mut(&mut self) -> &mut PyCrp<L> {
		&mut self.crp
	}

	pub fn base(&self) -> &B {
		&self.base
	}

	pub fn base_mut(&mut self) -> &mut B {
		&mut self.base
	}

	/// Predictive probability of `label`.
	pub fn predictive_probability(&self, label: &L) -> f64 {
		self.crp.predictive_probability(label, self.base.probability(label))
	}

	/// Seats `label`; returns its probability before insertion.
	pub fn insert(&mut self, label: &L, ctx: &mut Context) -> f64 {
		self.crp.insert(label, &mut self.base, ctx)
	}

	/// Removes one customer of `label`; returns the customers of `label` left.
	pub fn erase(&mut self, label: &L, ctx: &mut Context) -> u32 {
		self.crp.erase(label, &mut self.base, ctx)
	}

	pub fn erase_token_uniform(&mut self, ctx: &mut Context) -> u32 {
		self.crp.erase_token_uniform(&mut self.base, ctx)
	}

	pub fn erase_type_uniform(&mut self, ctx: &mut Context) -> u32 {
		self.crp.erase_type_uniform(&mut self.base, ctx)
	}

	pub fn erase_type_proportional(&mut self, ctx: &mut Context) -> u32 {
		self.crp.erase_type_proportional(&mut self.base, ctx)
	}

	/// Seating log probability, base excluded.
	pub fn logprob(&self) -> f64 {
		self.crp.logprob()
	}

	/// Seating log probability plus the base's own log probability.
	pub fn total_logprob(&self) -> f64 {
		self.crp.logprob() + self.base.logprob()
	}

	pub fn sanity_check(&self) -> bool {
		self.crp.sanity_check()
	}
}

impl<L: Ord + Clone, B: Base<L>> Base<L> for PitmanYorAdaptor<L, B> {
	fn probability(&self, label: &L) -> f64 {
		self.predictive_probability(label)
	}

	fn insert(&mut self, label: &L, ctx: &mut Context) -> f64 {
		PitmanYorAdaptor::insert(self, label, ctx)
	}

	fn erase(&mut self, label: &L, ctx: &mut Context) {
		PitmanYorAdaptor::erase(self, label, ctx);
	}

	fn logprob(&self) -> f64 {
		self.total_logprob()
	}
}
