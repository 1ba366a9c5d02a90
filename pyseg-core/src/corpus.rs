use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::Path;
use std::sync::Arc;

use crate::io::read_lines;

/// Character separating sentences in the corpus buffer.
///
/// Every sentence is padded by one on each side; the padding characters
/// double as the sentence-start / sentence-end words of the bigram model.
pub const SENTENCE_MARKER: char = '\n';

/// A word: a range handle into the corpus buffer.
///
/// Cloning a `Word` clones the `Arc`, never the characters. Equality,
/// ordering and hashing compare the characters, so two occurrences of the
/// same string at different offsets (or in different buffers) are the same
/// label.
#[derive(Clone)]
pub struct Word {
	text: Arc<[char]>,
	start: usize,
	end: usize,
}

impl Word {
	/// # Panics
	/// Panics if the range is empty or out of bounds.
	pub fn new(text: Arc<[char]>, start: usize, end: usize) -> Self {
		assert!(start < end && end <= text.len(), "invalid word range {start}..{end}");
		Self { text, start, end }
	}

	pub fn chars(&self) -> &[char] {
		&self.text[self.start..self.end]
	}

	pub fn len(&self) -> usize {
		self.end - self.start
	}

	/// Always false; words are non-empty by construction.
	pub fn is_empty(&self) -> bool {
		false
	}

	pub fn start(&self) -> usize {
		self.start
	}

	pub fn end(&self) -> usize {
		self.end
	}

	/// True for the padding word standing for a sentence edge.
	pub fn is_sentence_marker(&self) -> bool {
		self.chars() == [SENTENCE_MARKER]
	}
}

impl PartialEq for Word {
	fn eq(&self, other: &Self) -> bool {
		self.chars() == other.chars()
	}
}

impl Eq for Word {}

impl Hash for Word {
	fn hash<H: Hasher>(&self, state: &mut H) {
		self.chars().hash(state);
	}
}

impl PartialOrd for Word {
	fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
		Some(self.cmp(other))
	}
}

impl Ord for Word {
	fn cmp(&self, other: &Self) -> Ordering {
		self.chars().cmp(other.chars())
	}
}

impl fmt::Display for Word {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		for c in self.chars() {
			if *c == SENTENCE_MARKER {
				f.write_str("\\n")?;
			} else {
				write!(f, "{c}")?;
			}
		}
		Ok(())
	}
}

impl fmt::Debug for Word {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "Word(\"{self}\" @{}..{})", self.start, self.end)
	}
}

/// Location of a sentence in the corpus buffer, padding included.
///
/// `text[start]` and `text[end - 1]` are both `SENTENCE_MARKER`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SentenceSpan {
	pub start: usize,
	pub end: usize,
}

impl SentenceSpan {
	/// Number of characters, padding included.
	pub fn len(&self) -> usize {
		self.end - self.start
	}

	pub fn is_empty(&self) -> bool {
		self.end <= self.start
	}
}

/// Single owner of the corpus character buffer.
///
/// The buffer reads `"\n" s1 "\n" s2 "\n" ... "\n"`, adjacent sentences
/// sharing the marker between them. Masks are indexed by buffer position:
/// slot `k` is the boundary just before character `k`.
///
/// # Invariants
/// - `possible` and `gold` have `text.len() + 1` slots
/// - no slot adjacent to a marker is possible
/// - every span starts and ends on a marker
#[derive(Debug)]
pub struct Corpus {
	text: Arc<[char]>,
	possible: Vec<bool>,
	gold: Vec<bool>,
	spans: Vec<SentenceSpan>,
	nchartypes: usize,
}

impl Corpus {
	/// Builds a corpus from gold-segmented lines.
	///
	/// Each non-blank line is one sentence; whitespace separates the gold
	/// words. Every slot strictly inside a sentence is a possible boundary.
	///
	/// # Errors
	/// Returns an error if no line holds any word.
	pub fn from_lines<S: AsRef<str>>(lines: &[S]) -> Result<Self, String> {
		let mut text: Vec<char> = vec![SENTENCE_MARKER];
		let mut gold_positions: Vec<usize> = Vec::new();
		let mut spans = Vec::new();

		for line in lines {
			let mut words = line.as_ref().split_whitespace().peekable();
			if words.peek().is_none() {
				continue;
			}
			let start = text.len() - 1;
			for (index, word) in words.enumerate() {
				if index > 0 {
					gold_positions.push(text.len());
				}
				text.extend(word.chars());
			}
			text.push(SENTENCE_MARKER);
			spans.push(SentenceSpan { start, end: text.len() });
		}

		if spans.is_empty() {
			return Err("Corpus contains no sentences".to_owned());
		}

		let mut gold = vec![false; text.len() + 1];
		for position in gold_positions {
			gold[position] = true;
		}
		let possible = (0..=text.len())
			.map(|k| k > 0 && k < text.len() && text[k - 1] != SENTENCE_MARKER && text[k] != SENTENCE_MARKER)
			.collect();
		let nchartypes = text.iter().collect::<BTreeSet<_>>().len();

		Ok(Self { text: text.into(), possible, gold, spans, nchartypes })
	}

	/// Reads a gold-segmented corpus file (one sentence per line).
	pub fn read<P: AsRef<Path>>(filepath: P) -> Result<Self, Box<dyn std::error::Error>> {
		let lines = read_lines(filepath)?;
		Ok(Self::from_lines(&lines)?)
	}

	pub fn text(&self) -> &Arc<[char]> {
		&self.text
	}

	pub fn spans(&self) -> &[SentenceSpan] {
		&self.spans
	}

	/// Number of sentences.
	pub fn len(&self) -> usize {
		self.spans.len()
	}

	pub fn is_empty(&self) -> bool {
		self.spans.is_empty()
	}

	/// Number of distinct characters, the sentence marker included.
	pub fn nchartypes(&self) -> usize {
		self.nchartypes
	}

	pub fn is_possible_boundary(&self, position: usize) -> bool {
		self.possible[position]
	}

	pub fn is_gold_boundary(&self, position: usize) -> bool {
		self.gold[position]
	}

	/// Word handle over `start..end` of the buffer.
	pub fn word(&self, start: usize, end: usize) -> Word {
		Word::new(self.text.clone(), start, end)
	}
}
