//! Unsupervised word segmentation library.
//!
//! This crate segments unsegmented character streams into words with
//! hierarchical Pitman-Yor language models, including:
//! - A Pitman-Yor Chinese restaurant process usable as a base of another one
//! - Unigram and bigram word models over a character-sequence base
//! - Sentence-level inference: Gibbs flips, block sampling, Viterbi decoding
//! - Batch and online training, decayed MCMC, forgetting, annealing
//! - Token, boundary and lexicon scoring
//!
//! Every random decision goes through an explicit `Context`, in a fixed
//! order, so a run is reproducible for a given seed.

/// Geometric temperature schedule.
pub mod annealing;

/// Run configuration and strategy enums.
pub mod config;

/// Corpus buffer, word handles and boundary masks.
pub mod corpus;

/// I/O utilities (file loading, path helpers).
pub mod io;

/// Pitman-Yor processes and the word models built on them.
pub mod model;

/// Log-space numeric helpers and slice sampling.
pub mod numeric;

/// Random sources and the context threaded through every call.
pub mod random;

/// Strategy table and the sampler driving sentences.
pub mod sampler;

/// Segmentation scoring.
pub mod score;

/// Training driver.
pub mod segmenter;

/// Boundary state of one sentence and its inference algorithms.
pub mod sentence;
