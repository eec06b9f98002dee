use std::fmt;

use crate::error::ModelError;
use super::frequency::CharFrequency;

/// Character returned by `sample` when no record's cumulative
/// probability covers the draw. Only reachable through floating-point
/// rounding at the upper boundary, since the last `cp` of a finalized
/// row is 1.0.
pub const SAMPLE_FALLBACK: char = ' ';

/// Ordered list of frequency records for one context window.
///
/// This is a plain association list with linear-scan lookup rather than
/// a map: insertion order is part of the contract. New characters are
/// prepended, so the most-recently-introduced character sits first.
/// That order determines the cumulative probability sequence and hence
/// which character a given uniform draw selects.
///
/// # Responsibilities
/// - Accumulate successor counts during training (`update`)
/// - Convert counts to probabilities in one pass (`finalize_probabilities`)
/// - Map a uniform draw to a character (`sample`)
/// - Merge with another row by summing counts per character
///
/// # Invariants
/// - At most one record per distinct character
/// - After finalization, `cp` is non-decreasing in row order and the
///   last record's `cp` equals 1.0 (within floating-point tolerance)
#[derive(Clone, Debug, Default)]
pub struct FrequencyRow {
	records: Vec<CharFrequency>,
}

impl FrequencyRow {
	/// Creates an empty row.
	pub fn new() -> Self {
		Self { records: Vec::new() }
	}

	/// Returns the number of records in this row.
	pub fn len(&self) -> usize {
		self.records.len()
	}

	/// Returns `true` if no character has been observed yet.
	pub fn is_empty(&self) -> bool {
		self.records.is_empty()
	}

	/// Returns the records in row order.
	pub fn records(&self) -> &[CharFrequency] {
		&self.records
	}

	/// Sum of all counts in this row.
	pub fn total_count(&self) -> usize {
		self.records.iter().map(|r| r.count).sum()
	}

	/// Returns the position of the record for `chr` in current order,
	/// or `None` if the character was never observed. O(row length).
	pub fn index_of(&self, chr: char) -> Option<usize> {
		self.records.iter().position(|r| r.chr == chr)
	}

	/// Returns the record at `index`.
	///
	/// # Errors
	/// Returns `ModelError::IndexOutOfRange` if `index` is past the end
	/// of the row. Out-of-range access is a programming defect, so it
	/// fails loudly instead of truncating.
	pub fn get(&self, index: usize) -> Result<&CharFrequency, ModelError> {
		self.records.get(index).ok_or(ModelError::IndexOutOfRange {
			index,
			len: self.records.len(),
		})
	}

	/// Records an occurrence of `chr` as a successor of this row's window.
	///
	/// - If a record for `chr` exists, its count is incremented.
	/// - Otherwise a new record with count 1 is inserted at the FRONT,
	///   so later-introduced characters appear earlier in row order.
	pub fn update(&mut self, chr: char) {
		match self.index_of(chr) {
			Some(index) => self.records[index].count += 1,
			None => self.records.insert(0, CharFrequency::new(chr)),
		}
	}

	/// Removes the record for `chr` if present.
	///
	/// Returns `true` if a removal occurred. Supports correcting
	/// malformed training data; the main pipeline never calls this.
	pub fn remove(&mut self, chr: char) -> bool {
		match self.index_of(chr) {
			Some(index) => {
				self.records.remove(index);
				true
			}
			None => false,
		}
	}

	/// Converts counts to probabilities in a single pass.
	///
	/// Computes `letters` as the total count, then walks the records in
	/// row order setting `p = count / letters` and `cp` to the running
	/// count divided by `letters`. Because the walk follows insertion
	/// order, two rows with identical counts but different insertion
	/// histories assign different characters to the same `cp` bucket;
	/// marginal probabilities are unaffected.
	///
	/// An empty row is left untouched.
	pub fn finalize_probabilities(&mut self) {
		let letters = self.total_count();
		if letters == 0 {
			return;
		}

		let mut running = 0;
		for record in &mut self.records {
			running += record.count;
			record.p = record.count as f64 / letters as f64;
			record.cp = running as f64 / letters as f64;
		}
	}

	/// Maps a uniform draw in [0,1) to a character.
	///
	/// Scans records in row order and returns the first whose `cp` is
	/// >= `draw`. Falls back to [`SAMPLE_FALLBACK`] if no record
	/// qualifies, which can only happen when rounding leaves the final
	/// cumulative probability fractionally below 1.0.
	pub fn sample(&self, draw: f64) -> char {
		for record in &self.records {
			if record.cp >= draw {
				return record.chr;
			}
		}
		SAMPLE_FALLBACK
	}

	/// Merges another row into this one.
	///
	/// Counts for matching characters are summed; characters unknown to
	/// this row are inserted with the same front-insertion rule as
	/// `update`. Callers must merge before finalizing probabilities;
	/// `p` and `cp` of merged records are not recomputed here.
	pub fn merge(&mut self, other: &Self) {
		for record in &other.records {
			match self.index_of(record.chr) {
				Some(index) => self.records[index].count += record.count,
				None => {
					let mut fresh = CharFrequency::new(record.chr);
					fresh.count = record.count;
					self.records.insert(0, fresh);
				}
			}
		}
	}
}

impl fmt::Display for FrequencyRow {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		if self.records.is_empty() {
			return write!(f, "()");
		}
		write!(f, "(")?;
		for (i, record) in self.records.iter().enumerate() {
			if i > 0 {
				write!(f, " ")?;
			}
			write!(f, "{}", record)?;
		}
		write!(f, ")")
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	const TOL: f64 = 1e-9;

	fn row_from(chars: &str) -> FrequencyRow {
		let mut row = FrequencyRow::new();
		for c in chars.chars() {
			row.update(c);
		}
		row
	}

	#[test]
	fn update_counts_and_prepends() {
		let row = row_from("aaba");
		// 'b' introduced last, so it sits first
		assert_eq!(row.records()[0].chr, 'b');
		assert_eq!(row.records()[0].count, 1);
		assert_eq!(row.records()[1].chr, 'a');
		assert_eq!(row.records()[1].count, 3);
		assert_eq!(row.len(), 2);
		assert_eq!(row.total_count(), 4);
	}

	#[test]
	fn index_of_then_get_round_trips() {
		let row = row_from("xyzzy");
		for c in ['x', 'y', 'z'] {
			let index = row.index_of(c).unwrap();
			assert_eq!(row.get(index).unwrap().chr, c);
		}
		assert_eq!(row.index_of('q'), None);
	}

	#[test]
	fn get_out_of_range_is_an_error() {
		let row = row_from("ab");
		assert_eq!(
			row.get(2),
			Err(ModelError::IndexOutOfRange { index: 2, len: 2 })
		);
		assert!(FrequencyRow::new().get(0).is_err());
	}

	#[test]
	fn remove_reports_whether_anything_happened() {
		let mut row = row_from("abc");
		assert!(row.remove('b'));
		assert_eq!(row.len(), 2);
		assert_eq!(row.index_of('b'), None);
		assert!(!row.remove('b'));
	}

	#[test]
	fn finalize_satisfies_probability_invariants() {
		let mut row = row_from("aababcb");
		row.finalize_probabilities();

		let sum_p: f64 = row.records().iter().map(|r| r.p).sum();
		assert!((sum_p - 1.0).abs() < TOL);

		let mut prev = 0.0;
		for record in row.records() {
			assert!(record.cp >= prev);
			prev = record.cp;
		}
		assert!((prev - 1.0).abs() < TOL);
	}

	#[test]
	fn finalize_uses_insertion_order_for_cp() {
		// 'b' seen second so it is prepended: order [b, a]
		let mut row = row_from("ab");
		row.finalize_probabilities();
		assert_eq!(row.records()[0].chr, 'b');
		assert!((row.records()[0].cp - 0.5).abs() < TOL);
		assert_eq!(row.records()[1].chr, 'a');
		assert!((row.records()[1].cp - 1.0).abs() < TOL);
	}

	#[test]
	fn sample_picks_first_cp_bucket_covering_the_draw() {
		let mut row = row_from("ab");
		row.finalize_probabilities();
		// order [b (cp 0.5), a (cp 1.0)]
		assert_eq!(row.sample(0.0), 'b');
		assert_eq!(row.sample(0.5), 'b');
		assert_eq!(row.sample(0.51), 'a');
		assert_eq!(row.sample(0.999_999), 'a');
	}

	#[test]
	fn sample_falls_back_to_blank_when_nothing_qualifies() {
		// Before finalization every cp is 0.0, so any positive draw
		// exercises the fallback path.
		let row = row_from("ab");
		assert_eq!(row.sample(0.5), SAMPLE_FALLBACK);
		assert_eq!(FrequencyRow::new().sample(0.0), SAMPLE_FALLBACK);
	}

	#[test]
	fn merge_sums_matching_counts_and_inserts_new_chars() {
		let mut left = row_from("aab");
		let right = row_from("bcc");
		left.merge(&right);

		assert_eq!(left.get(left.index_of('a').unwrap()).unwrap().count, 2);
		assert_eq!(left.get(left.index_of('b').unwrap()).unwrap().count, 2);
		assert_eq!(left.get(left.index_of('c').unwrap()).unwrap().count, 2);
		assert_eq!(left.total_count(), 6);
		// 'c' was unknown to the left row, so it was prepended
		assert_eq!(left.records()[0].chr, 'c');
	}

	#[test]
	fn display_lists_records_in_order() {
		let mut row = row_from("ab");
		row.finalize_probabilities();
		assert_eq!(row.to_string(), "((b 1 0.5000 0.5000) (a 1 0.5000 1.0000))");
		assert_eq!(FrequencyRow::new().to_string(), "()");
	}
}
