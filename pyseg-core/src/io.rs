use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// File extension of corpus files.
pub const CORPUS_EXTENSION: &str = "txt";

/// Reads the lines of a corpus file.
///
/// A leading byte-order mark is dropped; `\r\n` line ends are accepted.
pub fn read_lines<P: AsRef<Path>>(filename: P) -> io::Result<Vec<String>> {
	let contents = fs::read_to_string(filename)?;
	let contents = contents.strip_prefix('\u{feff}').unwrap_or(&contents);
	Ok(contents.lines().map(str::to_owned).collect())
}

/// Writes one line per item, each terminated by `\n`.
pub fn write_lines<P, I, S>(filename: P, lines: I) -> io::Result<()>
where
	P: AsRef<Path>,
	I: IntoIterator<Item = S>,
	S: AsRef<str>,
{
	let mut contents = String::new();
	for line in lines {
		contents.push_str(line.as_ref());
		contents.push('\n');
	}
	fs::write(filename, contents)
}

/// Names of the corpora in `dir`: the stems of its `.txt` files, sorted.
pub fn corpus_names<P: AsRef<Path>>(dir: P) -> io::Result<Vec<String>> {
	let mut names = Vec::new();
	for entry in fs::read_dir(dir)? {
		let path = entry?.path();
		if !path.is_file() || path.extension().is_none_or(|extension| extension != CORPUS_EXTENSION) {
			continue;
		}
		if let Some(stem) = path.file_stem() {
			names.push(stem.to_string_lossy().into_owned());
		}
	}
	names.sort();
	Ok(names)
}

/// Path of the corpus called `name` in `dir`.
pub fn corpus_path<P: AsRef<Path>>(dir: P, name: &str) -> PathBuf {
	dir.as_ref().join(format!("{name}.{CORPUS_EXTENSION}"))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_write_then_read_lines() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("corpus.txt");
		write_lines(&path, ["yu want tu", "si D6 bUk"]).unwrap();
		assert_eq!(read_lines(&path).unwrap(), vec!["yu want tu", "si D6 bUk"]);
	}

	#[test]
	fn test_read_lines_drops_bom_and_carriage_returns() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("corpus.txt");
		fs::write(&path, "\u{feff}yu want\r\nD6 bUk\r\n").unwrap();
		assert_eq!(read_lines(&path).unwrap(), vec!["yu want", "D6 bUk"]);
	}

	#[test]
	fn test_corpus_names_are_sorted_stems() {
		let dir = tempfile::tempdir().unwrap();
		fs::write(dir.path().join("brent.txt"), "").unwrap();
		fs::write(dir.path().join("adam.txt"), "").unwrap();
		fs::write(dir.path().join("model.dat"), "").unwrap();
		fs::create_dir(dir.path().join("nested.txt")).unwrap();
		assert_eq!(corpus_names(dir.path()).unwrap(), vec!["adam", "brent"]);
		assert_eq!(corpus_path(dir.path(), "brent.v2"), dir.path().join("brent.v2.txt"));
	}
}
