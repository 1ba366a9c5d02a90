use std::collections::BTreeMap;

use crate::numeric::ln_gamma;

/// Table-occupancy tracker for a single label of a Chinese restaurant process.
///
/// Tables are not stored individually: tables with the same number of
/// customers are indistinguishable, so only a histogram
/// `occupancy -> number of tables` is kept. Buckets are walked in ascending
/// occupancy.
///
/// # Invariants
/// - `tables <= customers`
/// - `Σ occupancy · count == customers`
/// - `Σ count == tables`
/// - no bucket has a zero count or a zero occupancy
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Restaurant {
	customers: u32,
	tables: u32,
	histogram: BTreeMap<u32, u32>,
}

impl Restaurant {
	pub fn new() -> Self {
		Self::default()
	}

	/// Number of seated customers (`n_v`).
	pub fn customers(&self) -> u32 {
		self.customers
	}

	/// Number of occupied tables (`m_v`).
	pub fn tables(&self) -> u32 {
		self.tables
	}

	pub fn is_empty(&self) -> bool {
		self.customers == 0
	}

	/// Iterates `(occupancy, number of tables)` in ascending occupancy.
	pub fn occupancies(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
		self.histogram.iter().map(|(&occupancy, &count)| (occupancy, count))
	}

	/// Seats a customer at a brand-new table.
	pub fn insert_new(&mut self) {
		self.customers += 1;
		self.tables += 1;
		*self.histogram.entry(1).or_insert(0) += 1;
	}

	/// Seats a customer at an existing table.
	///
	/// A table is chosen with probability proportional to
	/// `occupancy - discount`; `draw` must lie in
	/// `[0, customers - tables · discount)`.
	///
	/// # Panics
	/// Panics if the restaurant has no table.
	pub fn insert_old(&mut self, draw: f64, discount: f64) {
		assert!(self.tables > 0, "insert_old on a restaurant without tables");
		let mut chosen = None;
		let mut mass = 0.0;
		for (&occupancy, &count) in &self.histogram {
			mass += count as f64 * (occupancy as f64 - discount);
			chosen = Some(occupancy);
			if mass > draw {
				break;
			}
		}
		// Rounding can leave `draw` at the very top of the range; the last bucket takes it.
		let occupancy = chosen.expect("non-empty histogram");
		self.move_table(occupancy, occupancy + 1);
		self.customers += 1;
	}

	/// Removes one customer; `draw` is a customer index in `[0, customers)`.
	///
	/// Returns the occupancy left at the customer's table (0 when the table closed).
	///
	/// # Panics
	/// Panics if `draw` is out of range.
	pub fn erase(&mut self, draw: u32) -> u32 {
		assert!(draw < self.customers, "erase index {draw} out of {} customers", self.customers);
		let mut seen = 0;
		let mut chosen = None;
		for (&occupancy, &count) in &self.histogram {
			seen += occupancy * count;
			if draw < seen {
				chosen = Some(occupancy);
				break;
			}
		}
		let occupancy = chosen.expect("customer index within the histogram");
		self.move_table(occupancy, occupancy - 1);
		self.customers -= 1;
		if occupancy == 1 {
			self.tables -= 1;
		}
		occupancy - 1
	}

	/// Per-table part of the Pitman-Yor likelihood:
	/// `Σ_tables [ln Γ(occupancy - a) - ln Γ(1 - a)]`.
	pub fn logprob(&self, discount: f64) -> f64 {
		let base = ln_gamma(1.0 - discount);
		self.histogram
			.iter()
			.map(|(&occupancy, &count)| count as f64 * (ln_gamma(occupancy as f64 - discount) - base))
			.sum()
	}

	/// Recomputes the aggregates from the histogram.
	pub fn sanity_check(&self) -> bool {
		let customers: u32 = self.histogram.iter().map(|(occupancy, count)| occupancy * count).sum();
		let tables: u32 = self.histogram.values().sum();
		let buckets_ok = self.histogram.iter().all(|(&occupancy, &count)| occupancy > 0 && count > 0);
		customers == self.customers && tables == self.tables && self.tables <= self.customers && buckets_ok
	}

	/// Moves one table from bucket `from` to bucket `to` (bucket 0 is dropped).
	fn move_table(&mut self, from: u32, to: u32) {
		let count = self.histogram.get_mut(&from).expect("table in source bucket");
		*count -= 1;
		if *count == 0 {
			self.histogram.remove(&from);
		}
		if to > 0 {
			*self.histogram.entry(to).or_insert(0) += 1;
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;

	fn histogram(restaurant: &Restaurant) -> Vec<(u32, u32)> {
		restaurant.occupancies().collect()
	}

	#[test]
	fn test_insert_new_and_old() {
		let mut r = Restaurant::new();
		r.insert_new();
		r.insert_new();
		assert_eq!(histogram(&r), vec![(1, 2)]);

		r.insert_old(0.0, 0.5);
		assert_eq!(histogram(&r), vec![(1, 1), (2, 1)]);
		assert_eq!((r.customers(), r.tables()), (3, 2));

		// Mass 0.5 for the singleton, 1.5 for the pair: a draw of 1.0 lands on the pair.
		r.insert_old(1.0, 0.5);
		assert_eq!(histogram(&r), vec![(1, 1), (3, 1)]);
		assert!(r.sanity_check());
	}

	#[test]
	fn test_erase_reports_closed_table() {
		let mut r = Restaurant::new();
		r.insert_new();
		r.insert_new();
		r.insert_old(1.5, 0.0);
		assert_eq!(histogram(&r), vec![(1, 1), (2, 1)]);

		// Index 0 is the singleton's only customer.
		assert_eq!(r.erase(0), 0);
		assert_eq!((r.customers(), r.tables()), (2, 1));
		assert_eq!(r.erase(1), 1);
		assert_eq!(r.erase(0), 0);
		assert!(r.is_empty());
		assert_eq!(r.tables(), 0);
		assert!(r.sanity_check());
	}

	#[test]
	#[should_panic]
	fn test_erase_out_of_range_panics() {
		let mut r = Restaurant::new();
		r.insert_new();
		r.erase(1);
	}

	#[test]
	fn test_logprob_of_single_table_is_zero() {
		let mut r = Restaurant::new();
		r.insert_new();
		assert!(r.logprob(0.3).abs() < 1e-12);
	}

	#[derive(Clone, Debug)]
	enum Op {
		New,
		Old(f64),
		Erase(f64),
	}

	fn op() -> impl Strategy<Value = Op> {
		prop_oneof![
			Just(Op::New),
			(0.0..1.0f64).prop_map(Op::Old),
			(0.0..1.0f64).prop_map(Op::Erase),
		]
	}

	proptest! {
		#[test]
		fn prop_invariants_hold_after_every_call(ops in prop::collection::vec(op(), 1..200), discount in 0.0..0.99f64) {
			let mut r = Restaurant::new();
			for op in ops {
				match op {
					Op::New => r.insert_new(),
					Op::Old(u) if r.tables() > 0 => {
						let mass = r.customers() as f64 - r.tables() as f64 * discount;
						r.insert_old(u * mass, discount);
					}
					Op::Erase(u) if r.customers() > 0 => {
						let index = ((u * r.customers() as f64) as u32).min(r.customers() - 1);
						r.erase(index);
					}
					_ => r.insert_new(),
				}
				prop_assert!(r.sanity_check());
			}
		}
	}
}
