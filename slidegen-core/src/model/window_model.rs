use std::collections::HashMap;
use std::sync::mpsc;
use std::thread;

use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::error::ModelError;
use super::row::FrequencyRow;

/// A character-level sliding-window language model.
///
/// The model maps every context window of length `window_length`
/// observed during training to a [`FrequencyRow`] of successor
/// statistics, then generates text by repeatedly sampling a successor
/// for the trailing window of the output.
///
/// # Responsibilities
/// - Build the window table from a character stream (`train`)
/// - Optionally build it from corpus shards in parallel (`train_parallel`)
/// - Generate text by weighted random sampling (`generate`)
/// - Merge partial models built from corpus shards (`merge`)
///
/// # Invariants
/// - `window_length` >= 1 and immutable after construction
/// - Every table key has exactly `window_length` characters
/// - The table is populated entirely by training and read-only afterwards
/// - The random source is owned by this model alone; models built with
///   the same seed replay the same draw sequence
#[derive(Debug)]
pub struct WindowModel {
	/// Length of the context window, fixed at construction.
	window_length: usize,

	/// Mapping from each observed window to its successor statistics.
	table: HashMap<String, FrequencyRow>,

	/// The random source used by `generate`.
	rng: StdRng,

	/// Set once `train` (or `train_parallel`) completes.
	trained: bool,
}

impl WindowModel {
	/// Creates a model whose random source is seeded from OS entropy.
	///
	/// Each run produces different generated texts. Good for production.
	///
	/// # Errors
	/// Returns an error if `window_length` is zero.
	pub fn new(window_length: usize) -> Result<Self, ModelError> {
		Self::with_rng(window_length, StdRng::from_os_rng())
	}

	/// Creates a model with an explicitly seeded random source.
	///
	/// Generating texts from this model multiple times with the same
	/// seed value will produce the same random texts. Good for debugging
	/// and regression fixtures.
	///
	/// # Errors
	/// Returns an error if `window_length` is zero.
	pub fn with_seed(window_length: usize, seed: u64) -> Result<Self, ModelError> {
		Self::with_rng(window_length, StdRng::seed_from_u64(seed))
	}

	fn with_rng(window_length: usize, rng: StdRng) -> Result<Self, ModelError> {
		if window_length == 0 {
			return Err(ModelError::ZeroWindowLength);
		}
		Ok(Self {
			window_length,
			table: HashMap::new(),
			rng,
			trained: false,
		})
	}

	/// Returns the window length this model was built with.
	pub fn window_length(&self) -> usize {
		self.window_length
	}

	/// Returns `true` once training has completed.
	pub fn is_trained(&self) -> bool {
		self.trained
	}

	/// Number of distinct windows observed during training.
	pub fn window_count(&self) -> usize {
		self.table.len()
	}

	/// Iterates over the distinct windows observed during training, in
	/// no particular order.
	pub fn windows(&self) -> impl Iterator<Item = &str> {
		self.table.keys().map(String::as_str)
	}

	/// Returns the frequency row for `window`, if that context was
	/// ever observed as a training context.
	pub fn row(&self, window: &str) -> Option<&FrequencyRow> {
		self.table.get(window)
	}

	/// Trains the model on a character stream in a single linear pass.
	///
	/// # Behavior
	/// - Builds the initial window from the first `window_length`
	///   characters. A stream shorter than that leaves the table empty;
	///   the model still counts as trained and `generate` will simply
	///   return its seed text unchanged.
	/// - For every subsequent character, updates the row for the current
	///   window (created lazily on first observation), then slides the
	///   window forward by one character.
	/// - Finalizes probabilities on every row exactly once afterwards.
	///
	/// # Errors
	/// Returns `ModelError::AlreadyTrained` if called twice; retraining
	/// is neither an accumulation nor a reset.
	///
	/// # Notes
	/// - One pass over the corpus; memory is proportional to the number
	///   of distinct windows times average row size.
	/// - UTF-8 safe: operates on characters, not bytes.
	pub fn train<I>(&mut self, source: I) -> Result<(), ModelError>
	where
		I: IntoIterator<Item = char>,
	{
		self.observe(source)?;
		self.finish_training()
	}

	/// Counts transitions from a character stream without finalizing.
	///
	/// Building block for shard-and-merge training: several partial
	/// models can each observe their own shard, be merged with
	/// [`WindowModel::merge`], and finalized once via
	/// [`WindowModel::finish_training`]. [`WindowModel::train`] composes
	/// the two for the common single-stream case.
	///
	/// # Errors
	/// Returns `ModelError::AlreadyTrained` once probabilities have been
	/// finalized; the table is read-only from that point on.
	pub fn observe<I>(&mut self, source: I) -> Result<(), ModelError>
	where
		I: IntoIterator<Item = char>,
	{
		if self.trained {
			return Err(ModelError::AlreadyTrained);
		}
		count_transitions(&mut self.table, self.window_length, source.into_iter());
		Ok(())
	}

	/// Finalizes probabilities on every row and marks the model trained.
	///
	/// # Errors
	/// Returns `ModelError::AlreadyTrained` if training already finished;
	/// finalization runs exactly once per model.
	pub fn finish_training(&mut self) -> Result<(), ModelError> {
		if self.trained {
			return Err(ModelError::AlreadyTrained);
		}
		self.finalize();
		Ok(())
	}

	/// Trains the model from corpus shards counted in parallel.
	///
	/// # Behavior
	/// - Splits the corpus into one shard per chunk of transitions, each
	///   shard overlapping the next by `window_length` characters so
	///   every window/successor pair is counted exactly once.
	/// - Worker threads build independent partial tables and send them
	///   back over an mpsc channel.
	/// - Partial tables are merged in shard order (counts for matching
	///   characters are summed), and probabilities are finalized only
	///   after the full merge.
	///
	/// # Errors
	/// Returns `ModelError::AlreadyTrained` if called twice.
	///
	/// # Notes
	/// - Counts and marginal probabilities match `train` exactly.
	///   Record order inside a row follows shard merge order, so `cp`
	///   bucket assignment (and therefore sampled output for a given
	///   seed) may differ from a single-pass build of the same corpus.
	/// - Deterministic for a fixed corpus and CPU count.
	pub fn train_parallel(&mut self, corpus: &str) -> Result<(), ModelError> {
		if self.trained {
			return Err(ModelError::AlreadyTrained);
		}

		let chars: Vec<char> = corpus.chars().collect();
		if chars.len() <= self.window_length {
			// Nothing follows any full window; the table stays empty.
			self.finalize();
			return Ok(());
		}

		let transitions = chars.len() - self.window_length;
		let chunks = num_cpus::get() * 8;
		let chunk_size = transitions.div_ceil(chunks).max(1);

		let (tx, rx) = mpsc::channel();
		let mut shard_index = 0;
		let mut start = 0;
		while start < transitions {
			let end = (start + chunk_size).min(transitions);
			// The shard needs the trailing window of its last transition.
			let shard: Vec<char> = chars[start..end + self.window_length].to_vec();
			let window_length = self.window_length;
			let tx = tx.clone();
			let index = shard_index;

			thread::spawn(move || {
				let mut partial = HashMap::new();
				count_transitions(&mut partial, window_length, shard.into_iter());
				tx.send((index, partial)).expect("Failed to send from thread");
			});

			shard_index += 1;
			start = end;
		}
		drop(tx);

		let mut partials: Vec<(usize, HashMap<String, FrequencyRow>)> = rx.iter().collect();
		partials.sort_by_key(|(index, _)| *index);

		for (_, partial) in partials {
			for (window, row) in partial {
				self.table.entry(window).or_default().merge(&row);
			}
		}

		self.finalize();
		Ok(())
	}

	/// Finalizes every row and marks the model trained.
	fn finalize(&mut self) {
		for row in self.table.values_mut() {
			row.finalize_probabilities();
		}
		self.trained = true;
		log::debug!("training complete: {} distinct windows", self.table.len());
	}

	/// Merges another partial model into this one.
	///
	/// Intended for combining models counted on separate corpus shards:
	/// rows for matching windows are merged by summing counts per
	/// character. Both models must still be untrained, since
	/// finalization must never run on a partially merged row.
	///
	/// # Errors
	/// - `ModelError::WindowLengthMismatch` if the window lengths differ.
	/// - `ModelError::MergeAfterTraining` if either model already
	///   finalized its probabilities.
	pub fn merge(&mut self, other: &Self) -> Result<(), ModelError> {
		if self.window_length != other.window_length {
			return Err(ModelError::WindowLengthMismatch(
				self.window_length,
				other.window_length,
			));
		}
		if self.trained || other.trained {
			return Err(ModelError::MergeAfterTraining);
		}

		for (window, row) in &other.table {
			self.table.entry(window.clone()).or_default().merge(row);
		}

		Ok(())
	}

	/// Generates text from the trained table.
	///
	/// # Parameters
	/// - `seed_text`: text to start with. If it is shorter than the
	///   window length, it is returned unchanged (no valid window can
	///   be formed). If its trailing window never appears as a key in
	///   the table, no text is generated.
	/// - `length`: number of characters to generate.
	///
	/// # Behavior
	/// Takes the trailing `window_length` characters of `seed_text` as
	/// the initial window, then up to `length` times: looks up the
	/// window's row, draws a uniform value, samples a successor, appends
	/// it and slides the window. An unknown window terminates the walk
	/// early; the output is whatever was accumulated by then.
	///
	/// Read-only on the table; only the random source advances.
	pub fn generate(&mut self, seed_text: &str, length: usize) -> String {
		if seed_text.chars().count() < self.window_length {
			return seed_text.to_owned();
		}

		let mut window = last_n_chars(seed_text, self.window_length);
		let mut output = seed_text.to_owned();
		for _ in 0..length {
			let row = match self.table.get(&window) {
				Some(row) => row,
				None => {
					log::debug!("no continuation for window {:?}, stopping", window);
					break;
				}
			};
			let draw: f64 = self.rng.random();
			let next = row.sample(draw);
			output.push(next);
			window.remove(0);
			window.push(next);
		}
		output
	}
}

/// Textual dump of the table, one `window : (records…)` line per entry.
/// Diagnostic output only; keys are sorted so dumps are stable.
impl std::fmt::Display for WindowModel {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let mut windows: Vec<&String> = self.table.keys().collect();
		windows.sort();
		for window in windows {
			writeln!(f, "{} : {}", window, self.table[window])?;
		}
		Ok(())
	}
}

/// Slides a window across `source`, counting each successor character
/// in the row for the window preceding it.
///
/// Rows are created lazily in `table`; probabilities are not touched.
/// A source shorter than `window_length` contributes nothing.
fn count_transitions<I>(table: &mut HashMap<String, FrequencyRow>, window_length: usize, mut source: I)
where
	I: Iterator<Item = char>,
{
	let mut window = String::new();
	for _ in 0..window_length {
		match source.next() {
			Some(c) => window.push(c),
			None => return,
		}
	}

	for c in source {
		table.entry(window.clone()).or_default().update(c);
		// Index 0 is always a character boundary.
		window.remove(0);
		window.push(c);
	}
}

/// Returns the last `n` characters of `s`, or all of `s` if it is
/// shorter. UTF-8 safe.
fn last_n_chars(s: &str, n: usize) -> String {
	let count = s.chars().count();
	if n >= count {
		return s.to_owned();
	}
	s.chars().skip(count - n).collect()
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn zero_window_length_is_rejected() {
		assert_eq!(WindowModel::new(0).unwrap_err(), ModelError::ZeroWindowLength);
		assert_eq!(
			WindowModel::with_seed(0, 7).unwrap_err(),
			ModelError::ZeroWindowLength
		);
	}

	#[test]
	fn training_twice_is_an_error() {
		let mut model = WindowModel::with_seed(1, 1).unwrap();
		model.train("hello".chars()).unwrap();
		assert_eq!(
			model.train("world".chars()).unwrap_err(),
			ModelError::AlreadyTrained
		);
	}

	#[test]
	fn corpus_shorter_than_window_leaves_an_empty_table() {
		let mut model = WindowModel::with_seed(5, 1).unwrap();
		model.train("abc".chars()).unwrap();
		assert!(model.is_trained());
		assert_eq!(model.window_count(), 0);
	}

	#[test]
	fn every_window_key_has_the_configured_length() {
		let mut model = WindowModel::with_seed(3, 1).unwrap();
		model.train("the quick brown fox".chars()).unwrap();
		assert!(model.window_count() > 0);
		for window in model.windows() {
			assert_eq!(window.chars().count(), 3);
		}
	}

	#[test]
	fn counts_reflect_observed_successors() {
		// "banana", W=2: "ba"->n, "an"->a, "na"->n, "an"->a
		let mut model = WindowModel::with_seed(2, 1).unwrap();
		model.train("banana".chars()).unwrap();

		let an = model.row("an").unwrap();
		assert_eq!(an.get(an.index_of('a').unwrap()).unwrap().count, 2);
		let na = model.row("na").unwrap();
		assert_eq!(na.get(na.index_of('n').unwrap()).unwrap().count, 1);
		assert!(model.row("nx").is_none());
	}

	#[test]
	fn merge_requires_matching_window_lengths() {
		let mut a = WindowModel::with_seed(2, 1).unwrap();
		let b = WindowModel::with_seed(3, 1).unwrap();
		assert_eq!(
			a.merge(&b).unwrap_err(),
			ModelError::WindowLengthMismatch(2, 3)
		);
	}

	#[test]
	fn merge_after_training_is_rejected() {
		let mut a = WindowModel::with_seed(1, 1).unwrap();
		let b = {
			let mut m = WindowModel::with_seed(1, 1).unwrap();
			m.train("ab".chars()).unwrap();
			m
		};
		assert_eq!(a.merge(&b).unwrap_err(), ModelError::MergeAfterTraining);
	}

	#[test]
	fn dump_lists_windows_with_their_rows() {
		let mut model = WindowModel::with_seed(1, 1).unwrap();
		model.train("aab".chars()).unwrap();
		let dump = model.to_string();
		assert!(dump.starts_with("a : ("));
		assert!(dump.contains("(a 1 0.5000 1.0000)"));
	}

	#[test]
	fn last_n_chars_is_utf8_safe() {
		assert_eq!(last_n_chars("héllo", 3), "llo");
		assert_eq!(last_n_chars("héllo", 4), "éllo");
		assert_eq!(last_n_chars("ab", 5), "ab");
	}
}
