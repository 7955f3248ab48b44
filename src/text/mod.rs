//! Text canonicalization and approximate matching
//!
//! Every lookup in the cache and in the command dataset goes through these two
//! primitives: [`normalize`] turns raw input into a canonical key, and
//! [`similarity`] scores two canonical keys for the fuzzy fallbacks.

pub mod normalize;
pub mod similarity;

pub use normalize::normalize;
pub use similarity::{best_match, levenshtein, similarity, DEFAULT_SIMILARITY_THRESHOLD};
