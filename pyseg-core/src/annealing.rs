use serde::{Deserialize, Serialize};

/// Number of constant-temperature plateaus of the schedule.
const STEPS: usize = 10;

/// Geometric annealing schedule.
///
/// The first `iterations` iterations are split into `STEPS` plateaus whose
/// temperatures go geometrically from `start` to `stop`; later iterations run
/// at `stop`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Annealing {
	start: f64,
	stop: f64,
	iterations: usize,
}

impl Default for Annealing {
	/// No annealing: temperature 1 throughout.
	fn default() -> Self {
		Self { start: 1.0, stop: 1.0, iterations: 0 }
	}
}

impl Annealing {
	/// # Errors
	/// Returns an error if a temperature is not finite and strictly positive.
	pub fn new(start: f64, stop: f64, iterations: usize) -> Result<Self, String> {
		for (name, temperature) in [("start", start), ("stop", stop)] {
			if !(temperature.is_finite() && temperature > 0.0) {
				return Err(format!("Invalid {name} temperature {temperature}: must be positive"));
			}
		}
		Ok(Self { start, stop, iterations })
	}

	pub fn start(&self) -> f64 {
		self.start
	}

	pub fn stop(&self) -> f64 {
		self.stop
	}

	pub fn iterations(&self) -> usize {
		self.iterations
	}

	/// Temperature of the 0-based `iteration`.
	pub fn temperature(&self, iteration: usize) -> f64 {
		if iteration >= self.iterations {
			return self.stop;
		}
		let step = iteration * STEPS / self.iterations;
		let fraction = step as f64 / (STEPS - 1) as f64;
		self.start * (self.stop / self.start).powf(fraction)
	}
}
