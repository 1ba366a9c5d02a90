use crate::numeric::log_sum_exp;
use crate::random::Context;

/// How a chart cell combines its incoming transitions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Semiring {
	/// Log-sum-exp: forward filtering for block sampling.
	Sum,
	/// Max with backpointer: Viterbi decoding.
	Max,
}

#[derive(Clone, Debug)]
struct Cell {
	slot: usize,
	log_mass: f64,
	/// `(predecessor cell, predecessor mass + transition weight)`, in log space.
	incoming: Vec<(usize, f64)>,
	best: Option<usize>,
}

/// Dynamic-programming chart over a boundary lattice.
///
/// Each cell ends at a boundary slot of the sentence and records every
/// transition that reaches it with its unnormalised log mass. Cells must be
/// added in topological order (predecessors first).
#[derive(Clone, Debug)]
pub struct Chart {
	semiring: Semiring,
	cells: Vec<Cell>,
}

impl Chart {
	pub fn new(semiring: Semiring) -> Self {
		Self { semiring, cells: Vec::new() }
	}

	pub fn semiring(&self) -> Semiring {
		self.semiring
	}

	/// Adds a source cell of log mass 0 ending at `slot`.
	pub fn add_start(&mut self, slot: usize) -> usize {
		self.cells.push(Cell { slot, log_mass: 0.0, incoming: Vec::new(), best: None });
		self.cells.len() - 1
	}

	/// Adds a cell reached by `(predecessor, transition log weight)` pairs.
	///
	/// # Panics
	/// Panics if `transitions` is empty or names a cell not yet added.
	pub fn add_cell(&mut self, slot: usize, transitions: &[(usize, f64)]) -> usize {
		assert!(!transitions.is_empty(), "chart cell without incoming transition");
		let incoming: Vec<(usize, f64)> = transitions
			.iter()
			.map(|&(from, weight)| (from, self.cells[from].log_mass + weight))
			.collect();

		let (log_mass, best) = match self.semiring {
			Semiring::Sum => {
				let masses: Vec<f64> = incoming.iter().map(|&(_, w)| w).collect();
				(log_sum_exp(&masses), None)
			}
			Semiring::Max => {
				// First maximum wins ties.
				let mut best = incoming[0];
				for &candidate in &incoming[1..] {
					if candidate.1 > best.1 {
						best = candidate;
					}
				}
				(best.1, Some(best.0))
			}
		};
		self.cells.push(Cell { slot, log_mass, incoming, best });
		self.cells.len() - 1
	}

	pub fn log_mass(&self, cell: usize) -> f64 {
		self.cells[cell].log_mass
	}

	/// Samples a path backwards from `cell` and returns the boundary slots it
	/// visits, `cell`'s own slot first.
	pub fn sample_slots(&self, cell: usize, ctx: &mut Context) -> Vec<usize> {
		let mut slots = vec![self.cells[cell].slot];
		let mut current = cell;
		while !self.cells[current].incoming.is_empty() {
			let c = &self.cells[current];
			assert!(c.log_mass.is_finite(), "chart cell with no finite mass");
			let draw = ctx.uniform();
			let mut cumulative = 0.0;
			let mut chosen = c.incoming[c.incoming.len() - 1].0;
			for &(from, weight) in &c.incoming {
				cumulative += (weight - c.log_mass).exp();
				if cumulative > draw {
					chosen = from;
					break;
				}
			}
			current = chosen;
			slots.push(self.cells[current].slot);
		}
		slots
	}

	/// Follows the stored argmax pointers back from `cell`.
	///
	/// # Panics
	/// Panics on a sum chart.
	pub fn best_slots(&self, cell: usize) -> Vec<usize> {
		assert_eq!(self.semiring, Semiring::Max, "best path requested from a sum chart");
		let mut slots = vec![self.cells[cell].slot];
		let mut current = cell;
		while let Some(previous) = self.cells[current].best {
			current = previous;
			slots.push(self.cells[current].slot);
		}
		slots
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::random::tests::ScriptedSource;

	/// Diamond: start -> {left (w=ln 1), right (w=ln 3)} -> end (w=0 each).
	fn diamond(semiring: Semiring) -> (Chart, usize) {
		let mut chart = Chart::new(semiring);
		let start = chart.add_start(0);
		let left = chart.add_cell(1, &[(start, 0.0)]);
		let right = chart.add_cell(2, &[(start, 3f64.ln())]);
		let end = chart.add_cell(3, &[(left, 0.0), (right, 0.0)]);
		(chart, end)
	}

	#[test]
	fn test_sum_chart_mass() {
		let (chart, end) = diamond(Semiring::Sum);
		assert!((chart.log_mass(end) - 4f64.ln()).abs() < 1e-12);
	}

	#[test]
	fn test_sampling_follows_cumulative_weights() {
		let (chart, end) = diamond(Semiring::Sum);
		// Left carries 1/4 of the mass.
		let mut ctx = Context::new(ScriptedSource::new(vec![0.2]));
		assert_eq!(chart.sample_slots(end, &mut ctx), vec![3, 1, 0]);
		let mut ctx = Context::new(ScriptedSource::new(vec![0.3]));
		assert_eq!(chart.sample_slots(end, &mut ctx), vec![3, 2, 0]);
	}

	#[test]
	fn test_max_chart_backtrace() {
		let (chart, end) = diamond(Semiring::Max);
		assert!((chart.log_mass(end) - 3f64.ln()).abs() < 1e-12);
		assert_eq!(chart.best_slots(end), vec![3, 2, 0]);
	}
}
