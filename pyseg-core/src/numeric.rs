use std::f64::consts::PI;

use crate::random::Context;

const LANCZOS_G: f64 = 7.0;
const LANCZOS_COEFFICIENTS: [f64; 9] = [
	0.999_999_999_999_809_9,
	676.520_368_121_885_1,
	-1_259.139_216_722_402_8,
	771.323_428_777_653_1,
	-176.615_029_162_140_6,
	12.507_343_278_686_905,
	-0.138_571_095_265_720_12,
	9.984_369_578_019_572e-6,
	1.505_632_735_149_311_6e-7,
];

/// Natural log of `|Γ(x)|` (Lanczos approximation, reflection below 0.5).
///
/// Returns `+inf` at the poles (zero and negative integers).
pub fn ln_gamma(x: f64) -> f64 {
	if x < 0.5 {
		return PI.ln() - (PI * x).sin().abs().ln() - ln_gamma(1.0 - x);
	}
	let x = x - 1.0;
	let t = x + LANCZOS_G + 0.5;
	let mut sum = LANCZOS_COEFFICIENTS[0];
	for (i, c) in LANCZOS_COEFFICIENTS.iter().enumerate().skip(1) {
		sum += c / (x + i as f64);
	}
	0.5 * (2.0 * PI).ln() + (x + 0.5) * t.ln() - t + sum.ln()
}

/// `ln(Σ exp(x))` without overflow. Empty input gives `-inf`.
pub fn log_sum_exp(values: &[f64]) -> f64 {
	let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
	if max == f64::NEG_INFINITY {
		return max;
	}
	max + values.iter().map(|v| (v - max).exp()).sum::<f64>().ln()
}

/// Fails fast on a degenerate probability or unnormalised mass.
///
/// # Panics
/// Panics if `p` is not finite or not strictly positive.
#[inline]
pub fn check_positive(p: f64, what: &str) -> f64 {
	assert!(p.is_finite() && p > 0.0, "{what} must be finite and positive, got {p}");
	p
}

/// One univariate slice-sampling update (stepping out, then shrinkage).
///
/// `log_f` is the unnormalised log density; it must return `-inf` outside
/// `(lower, upper)` and be finite at `x0`.
pub fn slice_sample<F>(x0: f64, log_f: F, lower: f64, upper: f64, width: f64, ctx: &mut Context) -> f64
where
	F: Fn(f64) -> f64,
{
	const MAX_STEPS: usize = 32;
	const MAX_SHRINKS: usize = 200;

	let log_y = log_f(x0) + (1.0 - ctx.uniform()).ln();

	let mut left = x0 - width * ctx.uniform();
	let mut right = left + width;
	for _ in 0..MAX_STEPS {
		if left <= lower || log_f(left) <= log_y {
			break;
		}
		left -= width;
	}
	for _ in 0..MAX_STEPS {
		if right >= upper || log_f(right) <= log_y {
			break;
		}
		right += width;
	}
	left = left.max(lower);
	right = right.min(upper);

	for _ in 0..MAX_SHRINKS {
		let x1 = left + ctx.uniform() * (right - left);
		if log_f(x1) >= log_y {
			return x1;
		}
		if x1 < x0 {
			left = x1;
		} else {
			right = x1;
		}
	}
	x0
}
