use std::fmt;

/// Statistics for a single character observed after some window.
///
/// `count` accumulates during training; `p` (marginal probability) and
/// `cp` (cumulative probability in row order) are filled in by the
/// owning row's finalization pass and are meaningless before it runs.
///
/// # Invariants
/// - `count` >= 1 once the record exists
/// - After finalization, `cp` of the last record in a row is 1.0
///   (within floating-point tolerance)
#[derive(Clone, Debug)]
pub struct CharFrequency {
	/// The observed character.
	pub chr: char,
	/// Number of times this character followed the row's window.
	pub count: usize,
	/// Marginal probability: `count / total row count`.
	pub p: f64,
	/// Cumulative probability up to and including this record.
	pub cp: f64,
}

impl CharFrequency {
	/// Creates a record for a character seen for the first time.
	pub fn new(chr: char) -> Self {
		Self { chr, count: 1, p: 0.0, cp: 0.0 }
	}
}

/// Identity is the character alone; two records for the same character
/// are "the same" regardless of their counts.
impl PartialEq for CharFrequency {
	fn eq(&self, other: &Self) -> bool {
		self.chr == other.chr
	}
}

impl fmt::Display for CharFrequency {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "({} {} {:.4} {:.4})", self.chr, self.count, self.p, self.cp)
	}
}
