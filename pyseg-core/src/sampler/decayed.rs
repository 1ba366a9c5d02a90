use crate::random::Context;
use crate::sentence::Sentence;

/// Sites registered since the last compaction may leave this many vacated
/// log entries before the log is rebuilt.
const LOG_SLACK: usize = 64;

#[derive(Clone, Copy, Debug)]
struct Site {
	sentence: usize,
	slot: usize,
	/// Position of the site's latest visit in the log.
	position: usize,
}

/// One visit: the step it happened at and the site, until it visits again.
#[derive(Clone, Copy, Debug)]
struct Visit {
	step: u64,
	site: Option<usize>,
}

/// Fenwick tree over 0/1 occupancy of the visit log.
#[derive(Clone, Debug, Default)]
struct Occupancy {
	tree: Vec<u32>,
}

impl Occupancy {
	/// Number of occupied positions among the first `len`.
	fn prefix(&self, mut len: usize) -> u32 {
		let mut sum = 0;
		while len > 0 {
			sum += self.tree[len - 1];
			len &= len - 1;
		}
		sum
	}

	/// Appends an occupied position.
	fn push(&mut self) {
		let index = self.tree.len() + 1;
		let low = index & index.wrapping_neg();
		let covered = self.prefix(index - 1) - self.prefix(index - low);
		self.tree.push(covered + 1);
	}

	/// Marks `position` vacated.
	fn vacate(&mut self, position: usize) {
		let mut index = position + 1;
		while index <= self.tree.len() {
			self.tree[index - 1] -= 1;
			index += index & index.wrapping_neg();
		}
	}

	/// Position of the occupied entry with `rank` occupied entries before it.
	fn find(&self, mut rank: u32) -> usize {
		let mut position = 0;
		let mut width = 1;
		while width * 2 <= self.tree.len() {
			width *= 2;
		}
		while width > 0 {
			let next = position + width;
			if next <= self.tree.len() && self.tree[next - 1] <= rank {
				position = next;
				rank -= self.tree[next - 1];
			}
			width /= 2;
		}
		position
	}
}

/// Sites whose age + 1 lies in `[2^k, 2^(k+1))`, as a run of occupied ranks.
struct AgeBucket {
	first_rank: u32,
	count: u32,
	/// Upper bound of the weights in the bucket.
	bound: f64,
}

/// Decay-weighted schedule over `(sentence, candidate slot)` sites.
///
/// A site last resampled `age` selections ago has weight
/// `(age + 1)^(decay_rate - 1)`: uniform at `decay_rate = 1`, biased toward
/// stale sites above it and toward recent ones below it. Every site keeps a
/// positive weight, so each is selected infinitely often.
///
/// Visits are kept in step order, so sites of similar age form a contiguous
/// run of the log. A draw picks a power-of-two age bucket by its bounding
/// mass, a uniform site inside it, and accepts it with probability
/// `weight / bound`. The draw is exact and costs `O(log² sites)`; a uniform
/// schedule draws the site directly.
#[derive(Clone, Debug)]
pub struct DecayedMcmc {
	decay_rate: f64,
	sites: Vec<Site>,
	step: u64,
	log: Vec<Visit>,
	occupied: Occupancy,
}

impl DecayedMcmc {
	/// # Errors
	/// Returns an error if `decay_rate` is not strictly positive.
	pub fn new(decay_rate: f64) -> Result<Self, String> {
		if !(decay_rate.is_finite() && decay_rate > 0.0) {
			return Err(format!("Invalid decay rate {decay_rate}: must be positive"));
		}
		Ok(Self { decay_rate, sites: Vec::new(), step: 0, log: Vec::new(), occupied: Occupancy::default() })
	}

	pub fn decay_rate(&self) -> f64 {
		self.decay_rate
	}

	/// Number of registered sites.
	pub fn len(&self) -> usize {
		self.sites.len()
	}

	pub fn is_empty(&self) -> bool {
		self.sites.is_empty()
	}

	/// Registers every candidate of `sentence`, as fresh sites.
	pub fn register(&mut self, index: usize, sentence: &Sentence) {
		for &slot in sentence.candidates() {
			let site = self.sites.len();
			self.sites.push(Site { sentence: index, slot, position: self.log.len() });
			self.log.push(Visit { step: self.step, site: Some(site) });
			self.occupied.push();
		}
	}

	/// Draws one site and marks it visited.
	///
	/// Returns `(sentence index, slot)`, or `None` if no site is registered.
	pub fn select(&mut self, ctx: &mut Context) -> Option<(usize, usize)> {
		if self.sites.is_empty() {
			return None;
		}
		let chosen = if self.decay_rate == 1.0 { ctx.uniform_index(self.sites.len()) } else { self.draw(ctx) };
		self.visit(chosen);
		let site = self.sites[chosen];
		Some((site.sentence, site.slot))
	}

	fn weight(&self, age: u64) -> f64 {
		(age as f64 + 1.0).powf(self.decay_rate - 1.0)
	}

	fn age_buckets(&self) -> Vec<AgeBucket> {
		let increasing = self.decay_rate > 1.0;
		let mut buckets = Vec::new();
		let mut k = 0;
		while k < 63 && (1u64 << k) <= self.step + 1 {
			let low = 1u64 << k;
			// Steps of the sites with age in [low - 1, 2·low - 2].
			let newest = self.step + 1 - low;
			let oldest = (self.step + 2).saturating_sub(2 * low);
			let from = self.log.partition_point(|visit| visit.step < oldest);
			let to = self.log.partition_point(|visit| visit.step <= newest);
			let first_rank = self.occupied.prefix(from);
			let count = self.occupied.prefix(to) - first_rank;
			if count > 0 {
				let bound = self.weight(if increasing { 2 * low - 1 } else { low - 1 });
				buckets.push(AgeBucket { first_rank, count, bound });
			}
			k += 1;
		}
		buckets
	}

	fn draw(&self, ctx: &mut Context) -> usize {
		let buckets = self.age_buckets();
		let total: f64 = buckets.iter().map(|bucket| bucket.count as f64 * bucket.bound).sum();
		loop {
			let mut draw = total * ctx.uniform();
			let bucket = buckets
				.iter()
				.find(|bucket| {
					let mass = bucket.count as f64 * bucket.bound;
					draw -= mass;
					draw < 0.0
				})
				.or(buckets.last())
				.expect("registered sites fall in an age bucket");
			let rank = bucket.first_rank + ctx.uniform_index(bucket.count as usize) as u32;
			let visit = self.log[self.occupied.find(rank)];
			let weight = self.weight(self.step - visit.step);
			if ctx.uniform() * bucket.bound < weight {
				return visit.site.expect("occupied log entry holds a site");
			}
		}
	}

	fn visit(&mut self, site: usize) {
		let previous = self.sites[site].position;
		self.log[previous].site = None;
		self.occupied.vacate(previous);

		self.sites[site].position = self.log.len();
		self.log.push(Visit { step: self.step, site: Some(site) });
		self.occupied.push();
		self.step += 1;

		if self.log.len() > 2 * self.sites.len() + LOG_SLACK {
			self.compact();
		}
	}

	/// Drops vacated log entries.
	fn compact(&mut self) {
		let log = std::mem::take(&mut self.log);
		self.occupied = Occupancy::default();
		for visit in log {
			if let Some(site) = visit.site {
				self.sites[site].position = self.log.len();
				self.log.push(visit);
				self.occupied.push();
			}
		}
	}
}
