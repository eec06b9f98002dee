//! Top-level module for the sliding-window model.
//!
//! This module provides a character-level statistical text generator:
//! - Per-character statistics (`CharFrequency`)
//! - Ordered frequency rows per context window (`FrequencyRow`)
//! - The trainable model itself (`WindowModel`)

/// A single character observation: count plus derived probabilities.
///
/// Records compare equal by character alone; counts and probabilities
/// never participate in lookup.
pub mod frequency;

/// Ordered association list of frequency records for one window.
///
/// Preserves insertion order exactly (new characters are prepended),
/// because that order drives cumulative-probability sampling.
pub mod row;

/// The sliding-window model.
///
/// Maps fixed-length windows to their frequency rows, owns the random
/// source, and exposes training, merging and generation.
pub mod window_model;
