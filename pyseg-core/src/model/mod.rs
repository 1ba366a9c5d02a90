//! Hierarchical Pitman-Yor language models.
//!
//! - `Restaurant`: table occupancy of a single label
//! - `PyCrp` / `PitmanYorAdaptor`: the Pitman-Yor Chinese restaurant process
//! - `CharModel`: character-sequence base distribution for new words
//! - `UnigramModel` / `BigramModel`: the word models used for segmentation
//! - `HyperPriors`: slice sampling of the discount and strength

/// Generic Pitman-Yor process and the `Base` trait hierarchies are built on.
pub mod adaptor;

/// Bigram model: one process per left context over a shared unigram.
pub mod bigram;

/// Uniform character-sequence distribution.
pub mod char_model;

/// Hyperparameter priors and resampling.
pub mod hyper;

/// Occupancy histogram of one label.
pub mod restaurant;

/// Unigram model and Brent's MBDP word probability.
pub mod unigram;

pub use adaptor::{Base, PitmanYorAdaptor, PyCrp};
pub use bigram::BigramModel;
pub use char_model::CharModel;
pub use hyper::HyperPriors;
pub use restaurant::Restaurant;
pub use unigram::UnigramModel;
