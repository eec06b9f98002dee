//! Character-level sliding-window language model.
//!
//! This crate provides a small statistical text generation system:
//! - Per-character frequency records with derived probabilities
//! - Ordered context rows keyed by fixed-length windows
//! - A trainable model with weighted random sampling
//!
//! The model slides a window of fixed length across a training corpus,
//! counting which characters follow which contexts, then generates new
//! text by walking the learned table with a seeded random source.

/// Core model types and the train/generate logic.
pub mod model;

/// Error type shared by the model operations.
pub mod error;

pub use error::ModelError;
pub use model::frequency::CharFrequency;
pub use model::row::FrequencyRow;
pub use model::window_model::WindowModel;
