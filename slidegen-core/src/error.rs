use thiserror::Error;

/// Errors raised by the model and its rows.
///
/// Only programming defects and contract violations surface here.
/// Corpus-content conditions (short corpus, unseen window, sampling
/// boundary rounding) are handled locally and never become errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ModelError {
	/// Row access with an index outside the current record list.
	#[error("index {index} out of range for row of {len} records")]
	IndexOutOfRange { index: usize, len: usize },

	/// A model cannot be built with an empty context window.
	#[error("window length must be at least 1")]
	ZeroWindowLength,

	/// `train` was called on a model that already completed training.
	#[error("model is already trained")]
	AlreadyTrained,

	/// Two models with different window lengths cannot be merged.
	#[error("window length mismatch: {0} vs {1}")]
	WindowLengthMismatch(usize, usize),

	/// Merging is only valid before probabilities are finalized.
	#[error("cannot merge a trained model")]
	MergeAfterTraining,
}
