//! Static command catalog
//!
//! Known `(command, description)` pairs loaded once at startup from CSV files.
//! The index is never mutated after loading, so it is shared as a plain
//! `Arc<DatasetIndex>` without any lock.
//!
//! Header rows are not recognized: a catalog that starts with
//! `command,description` contributes a literal `command` entry.

use std::collections::HashMap;
use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

use crate::text::{normalize, similarity};

/// Catalog loading errors
#[derive(Error, Debug)]
pub enum DatasetError {
    #[error("Failed to open dataset {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse dataset {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

/// A known command and what it does
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandEntry {
    pub command: String,
    pub description: String,
}

impl fmt::Display for CommandEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Command: {}\nDescription: {}", self.command, self.description)
    }
}

#[derive(Debug, Clone)]
struct IndexedCommand {
    entry: CommandEntry,
    /// `normalize(entry.command)`, computed once at load time
    canonical: String,
}

#[derive(Debug, Default)]
pub struct DatasetIndex {
    commands: HashMap<String, IndexedCommand>,
}

impl DatasetIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every catalog in order. Files that cannot be read or parsed are
    /// logged and skipped; later rows override earlier ones with the same
    /// command text.
    pub fn load<P: AsRef<Path>>(paths: &[P]) -> Self {
        let mut index = Self::new();
        for path in paths {
            match index.load_file(path.as_ref()) {
                Ok(count) => info!("Loaded {} commands from {:?}", count, path.as_ref()),
                Err(e) => warn!("Skipping dataset: {}", e),
            }
        }
        index
    }

    /// Load a single catalog file
    pub fn load_file(&mut self, path: &Path) -> Result<usize, DatasetError> {
        let file = File::open(path).map_err(|source| DatasetError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        self.load_reader(file, path)
    }

    /// Load CSV rows from any reader. A parse error discards the whole
    /// source; rows with fewer than two columns are skipped individually.
    pub fn load_reader<R: Read>(&mut self, reader: R, origin: &Path) -> Result<usize, DatasetError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(reader);

        let mut rows = Vec::new();
        for record in csv_reader.records() {
            let record = record.map_err(|source| DatasetError::Parse {
                path: origin.to_path_buf(),
                source,
            })?;
            if let (Some(command), Some(description)) = (record.get(0), record.get(1)) {
                rows.push((command.to_string(), description.to_string()));
            }
        }

        let count = rows.len();
        for (command, description) in rows {
            self.insert(command, description);
        }
        Ok(count)
    }

    pub fn insert(&mut self, command: impl Into<String>, description: impl Into<String>) {
        let command = command.into();
        let canonical = normalize(&command);
        self.commands.insert(
            command.clone(),
            IndexedCommand {
                entry: CommandEntry {
                    command,
                    description: description.into(),
                },
                canonical,
            },
        );
    }

    pub fn get(&self, command: &str) -> Option<&CommandEntry> {
        self.commands.get(command).map(|indexed| &indexed.entry)
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Best catalog entry whose normalized command text scores strictly above
    /// `threshold` against `key`. Scans the whole catalog; ties go to the
    /// lexicographically smallest command.
    pub fn fuzzy_find(&self, key: &str, threshold: f64) -> Option<&CommandEntry> {
        let mut best: Option<(&CommandEntry, f64)> = None;

        for indexed in self.commands.values() {
            let score = similarity(key, &indexed.canonical);
            let better = match best {
                None => true,
                Some((current, best_score)) => {
                    score > best_score
                        || (score == best_score && indexed.entry.command < current.command)
                }
            };
            if better {
                best = Some((&indexed.entry, score));
            }
        }

        best.filter(|(_, score)| *score > threshold)
            .map(|(entry, _)| entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn index_from(csv: &str) -> DatasetIndex {
        let mut index = DatasetIndex::new();
        index
            .load_reader(csv.as_bytes(), Path::new("inline.csv"))
            .unwrap();
        index
    }

    #[test]
    fn test_load_skips_short_rows() {
        let index = index_from("ls -la,lists all files including hidden\nbogus\ndu -sh,disk usage,extra\n");
        assert_eq!(index.len(), 2);
        assert_eq!(
            index.get("du -sh").map(|e| e.description.as_str()),
            Some("disk usage")
        );
        assert!(index.get("bogus").is_none());
    }

    #[test]
    fn test_header_row_is_not_special() {
        let index = index_from("command,description\npwd,print working directory\n");
        assert_eq!(index.len(), 2);
        assert!(index.get("command").is_some());
    }

    #[test]
    fn test_quoted_fields() {
        let index = index_from("\"grep -r \"\"todo\"\" .\",\"search, recursively\"\n");
        let entry = index.get("grep -r \"todo\" .").unwrap();
        assert_eq!(entry.description, "search, recursively");
    }

    #[test]
    fn test_missing_file_is_skipped() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "pwd,print working directory").unwrap();

        let index = DatasetIndex::load(&[
            PathBuf::from("/nonexistent/commands.csv"),
            file.path().to_path_buf(),
        ]);
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_load_file_reports_io_error() {
        let mut index = DatasetIndex::new();
        let err = index
            .load_file(Path::new("/nonexistent/commands.csv"))
            .unwrap_err();
        assert!(matches!(err, DatasetError::Io { .. }));
    }

    #[test]
    fn test_fuzzy_find() {
        let index = index_from("docker ps,list running containers\ngit status,show working tree status\n");

        // normalize("git status") == "git status"
        let entry = index.fuzzy_find(&normalize("git statuss"), 0.8).unwrap();
        assert_eq!(entry.command, "git status");

        assert!(index.fuzzy_find(&normalize("compress the logs folder"), 0.8).is_none());
    }

    #[test]
    fn test_fuzzy_find_tie_break() {
        let mut index = DatasetIndex::new();
        index.insert("abe", "second");
        index.insert("abd", "first");
        let entry = index.fuzzy_find("abc", 0.5).unwrap();
        assert_eq!(entry.command, "abd");
    }

    #[test]
    fn test_display_format() {
        let entry = CommandEntry {
            command: "ls -la".to_string(),
            description: "lists all files including hidden".to_string(),
        };
        assert_eq!(
            entry.to_string(),
            "Command: ls -la\nDescription: lists all files including hidden"
        );
    }
}
