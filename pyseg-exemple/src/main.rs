use clap::Parser;

use pyseg_core::config::{Forgetting, Granularity, Mode, SegmenterConfig, UpdateRule};
use pyseg_core::corpus::Corpus;
use pyseg_core::io::write_lines;
use pyseg_core::segmenter::Segmenter;
use pyseg_core::sentence::InitBoundaries;

/// Segments a corpus without supervision and reports the scores.
///
/// The corpus holds one sentence per line with the gold words separated by
/// spaces; the spaces are only used for scoring.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
	/// Training corpus.
	corpus: String,

	/// Held-out corpus segmented with the trained model.
	#[arg(long)]
	eval: Option<String>,

	/// Writes the training segmentation to this file.
	#[arg(long)]
	output: Option<String>,

	/// unigram or bigram.
	#[arg(long, default_value = "unigram")]
	granularity: Granularity,

	/// flip, tree, viterbi or decayedmcmc.
	#[arg(long, default_value = "flip")]
	rule: UpdateRule,

	/// batch or online.
	#[arg(long, default_value = "batch")]
	mode: Mode,

	/// Score words with Brent's MBDP-1 probability (unigram tree/viterbi).
	#[arg(long, default_value = "false")]
	mbdp: bool,

	/// none, tokenuniform, typeuniform or typeproportional (online only).
	#[arg(long, default_value = "none")]
	forgetting: Forgetting,

	/// Tokens kept by online forgetting.
	#[arg(long, default_value_t = u32::MAX)]
	token_memory: u32,

	/// Batch iterations.
	#[arg(short, long, default_value = "100")]
	iterations: usize,

	#[arg(short, long, default_value = "0")]
	seed: u64,

	/// Unigram discount.
	#[arg(long, default_value = "0.0")]
	a1: f64,

	/// Unigram strength.
	#[arg(long, default_value = "20.0")]
	b1: f64,

	/// Bigram discount.
	#[arg(long, default_value = "0.0")]
	a2: f64,

	/// Bigram strength.
	#[arg(long, default_value = "100.0")]
	b2: f64,

	/// Word-end probability of the character model.
	#[arg(long, default_value = "0.5")]
	pstop: f64,

	/// Initial boundary probability.
	#[arg(long, default_value = "0.0")]
	init_pboundary: f64,

	/// Start from the gold segmentation.
	#[arg(long, default_value = "false")]
	init_gold: bool,

	/// Initial annealing temperature.
	#[arg(long, default_value = "1.0")]
	start_temperature: f64,

	/// Final annealing temperature.
	#[arg(long, default_value = "1.0")]
	stop_temperature: f64,

	/// Iterations over which the temperature decreases.
	#[arg(long, default_value = "0")]
	anneal_iterations: usize,

	/// Decayed-MCMC decay rate.
	#[arg(long, default_value = "1.0")]
	decay_rate: f64,

	/// Decayed-MCMC flips per sentence.
	#[arg(long, default_value = "1000")]
	samples_per_utt: usize,

	/// Resample the Pitman-Yor hyperparameters after each iteration.
	#[arg(long, default_value = "false")]
	resample_hyperparameters: bool,

	/// Check the model invariants after every update.
	#[arg(long, default_value = "false")]
	debug: bool,
}

impl Args {
	fn config(&self) -> Result<SegmenterConfig, String> {
		let mut config = SegmenterConfig::new(self.granularity, self.rule, self.mode);
		config.mbdp = self.mbdp;
		config.forgetting = self.forgetting;
		config.token_memory = self.token_memory;
		config.iterations = self.iterations;
		config.seed = self.seed;
		config.debug_level = u32::from(self.debug);
		config.set_unigram_hyperparameters(self.a1, self.b1)?;
		config.set_bigram_hyperparameters(self.a2, self.b2)?;
		config.set_pstop(self.pstop)?;
		config.set_annealing(self.start_temperature, self.stop_temperature, self.anneal_iterations)?;
		config.set_decay_rate(self.decay_rate)?;
		config.set_samples_per_utt(self.samples_per_utt)?;
		config.set_init(if self.init_gold {
			InitBoundaries::Gold
		} else if self.init_pboundary > 0.0 {
			InitBoundaries::Random(self.init_pboundary)
		} else {
			InitBoundaries::Empty
		})?;
		config.hyper.resample_a = self.resample_hyperparameters;
		config.hyper.resample_b = self.resample_hyperparameters;
		Ok(config)
	}
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
	env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
	let args = Args::parse();
	log::debug!("{args:#?}");

	let corpus = Corpus::read(&args.corpus)?;
	let mut segmenter = Segmenter::new(corpus, args.config()?)?;
	segmenter.train();

	match &args.output {
		Some(path) => write_lines(path, segmenter.segmentations())?,
		None => {
			for line in segmenter.segmentations() {
				println!("{line}");
			}
		}
	}
	println!("train: {}", segmenter.score());

	if let Some(path) = &args.eval {
		let held_out = Corpus::read(path)?;
		let (segmentations, score) = segmenter.evaluate(&held_out);
		for line in segmentations {
			println!("{line}");
		}
		println!("eval: {score}");
	}

	Ok(())
}
