//! Transition store reader.
//!
//! The ingestion endpoint appends one numbered JSON file per rollout to the
//! log directory (`transitions_001.json`, `transitions_002.json`, ...). The
//! reader enumerates those files in lexicographic order and loads one
//! [`Episode`] per file.

use std::{
    fs::File,
    io::{self, BufReader},
    path::{Path, PathBuf},
};

use serde::Deserialize;

use crate::{episode::Episode, transition::Transition};

/// Prefix of transition log file names.
pub const FILE_PREFIX: &str = "transitions_";
/// Suffix of transition log file names.
pub const FILE_SUFFIX: &str = ".json";

/// Errors raised while loading episodes from a log directory.
#[derive(Debug, derive_more::Display, derive_more::Error)]
pub enum LoadError {
    /// No `transitions_*.json` files matched in the directory.
    #[display("no transition files found matching {}/transitions_*.json", dir.display())]
    NoFilesFound {
        /// The directory that was searched.
        dir: PathBuf,
    },
    /// Files matched but every one of them held zero transitions.
    #[display("loaded transition files but found no transitions")]
    NoTransitions,
    /// A file or the directory itself could not be read.
    #[display("failed to read {}: {source}", path.display())]
    Io {
        /// The path that failed.
        path: PathBuf,
        /// The underlying I/O error.
        source: io::Error,
    },
    /// A file's contents were not valid transition JSON.
    #[display("failed to parse {}: {source}", path.display())]
    Parse {
        /// The path that failed.
        path: PathBuf,
        /// The underlying JSON error.
        source: serde_json::Error,
    },
}

/// The three on-disk shapes a transition file can take.
///
/// The logging agent writes an object with a `transitions` array; earlier
/// variants wrote a bare array, and a single bare transition object is
/// treated as a one-element episode.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TransitionFile {
    Wrapped { transitions: Vec<Transition> },
    Bare(Vec<Transition>),
    Single(Transition),
}

impl TransitionFile {
    fn into_transitions(self) -> Vec<Transition> {
        match self {
            TransitionFile::Wrapped { transitions } => transitions,
            TransitionFile::Bare(transitions) => transitions,
            TransitionFile::Single(transition) => vec![transition],
        }
    }
}

/// Loads all episodes from a log directory, one episode per matching file.
///
/// Files are processed in lexicographic name order so that repeated runs see
/// the same episode sequence. Files holding zero transitions are skipped.
///
/// # Errors
///
/// * [`LoadError::NoFilesFound`] if no file matches the naming pattern
/// * [`LoadError::NoTransitions`] if every matching file was empty
/// * [`LoadError::Io`] / [`LoadError::Parse`] on read or decode failures
pub fn load_episodes<P>(log_dir: P) -> Result<Vec<Episode>, LoadError>
where
    P: AsRef<Path>,
{
    let log_dir = log_dir.as_ref();
    let files = list_transition_files(log_dir)?;
    if files.is_empty() {
        return Err(LoadError::NoFilesFound {
            dir: log_dir.to_path_buf(),
        });
    }

    let mut episodes = vec![];
    for path in files {
        let transitions = read_transition_file(&path)?;
        if transitions.is_empty() {
            continue;
        }
        episodes.push(Episode::new(transitions));
    }

    if episodes.is_empty() {
        return Err(LoadError::NoTransitions);
    }
    Ok(episodes)
}

/// Lists matching transition files in lexicographic name order.
fn list_transition_files(log_dir: &Path) -> Result<Vec<PathBuf>, LoadError> {
    let entries = std::fs::read_dir(log_dir).map_err(|source| LoadError::Io {
        path: log_dir.to_path_buf(),
        source,
    })?;

    let mut files = vec![];
    for entry in entries {
        let entry = entry.map_err(|source| LoadError::Io {
            path: log_dir.to_path_buf(),
            source,
        })?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if name.starts_with(FILE_PREFIX) && name.ends_with(FILE_SUFFIX) {
            files.push(entry.path());
        }
    }
    files.sort();
    Ok(files)
}

fn read_transition_file(path: &Path) -> Result<Vec<Transition>, LoadError> {
    let file = File::open(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let reader = BufReader::new(file);
    let parsed: TransitionFile =
        serde_json::from_reader(reader).map_err(|source| LoadError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(parsed.into_transitions())
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    struct TempLogDir {
        dir: PathBuf,
    }

    impl TempLogDir {
        fn new(test_name: &str) -> Self {
            let dir = std::env::temp_dir().join(format!(
                "helmsman-store-{}-{}",
                std::process::id(),
                test_name
            ));
            let _ = fs::remove_dir_all(&dir);
            fs::create_dir_all(&dir).unwrap();
            Self { dir }
        }

        fn write(&self, name: &str, contents: &str) {
            fs::write(self.dir.join(name), contents).unwrap();
        }
    }

    impl Drop for TempLogDir {
        fn drop(&mut self) {
            let _ = fs::remove_dir_all(&self.dir);
        }
    }

    #[test]
    fn test_no_files_found() {
        let tmp = TempLogDir::new("no-files");
        tmp.write("notes.txt", "not a log file");
        let err = load_episodes(&tmp.dir).unwrap_err();
        assert!(matches!(err, LoadError::NoFilesFound { .. }));
    }

    #[test]
    fn test_all_files_empty() {
        let tmp = TempLogDir::new("all-empty");
        tmp.write("transitions_001.json", "[]");
        tmp.write("transitions_002.json", r#"{"transitions": []}"#);
        let err = load_episodes(&tmp.dir).unwrap_err();
        assert!(matches!(err, LoadError::NoTransitions));
    }

    #[test]
    fn test_loads_wrapped_bare_and_single() {
        let tmp = TempLogDir::new("shapes");
        tmp.write(
            "transitions_001.json",
            r#"{"episodeId": "abc", "transitions": [
                {"s": [0.1], "a": 1, "r": 1.0, "ns": [0.2], "d": false},
                {"s": [0.2], "a": 2, "r": 0.5, "ns": [0.3], "d": true}
            ]}"#,
        );
        tmp.write(
            "transitions_002.json",
            r#"[{"s": [0.5], "a": 1, "r": -1.0, "ns": [0.4], "d": false}]"#,
        );
        tmp.write(
            "transitions_003.json",
            r#"{"s": [0.9], "a": 3, "r": 2.0, "ns": [0.95], "d": true}"#,
        );

        let episodes = load_episodes(&tmp.dir).unwrap();
        assert_eq!(episodes.len(), 3);
        assert_eq!(episodes[0].summary().length, 2);
        assert_eq!(episodes[1].summary().length, 1);
        assert_eq!(episodes[2].summary().length, 1);
        assert_eq!(episodes[2].transitions()[0].action, 3);
    }

    #[test]
    fn test_lexicographic_order() {
        let tmp = TempLogDir::new("order");
        tmp.write(
            "transitions_002.json",
            r#"[{"s": [0.2], "a": 1, "r": 2.0, "ns": [0.2], "d": false}]"#,
        );
        tmp.write(
            "transitions_001.json",
            r#"[{"s": [0.1], "a": 1, "r": 1.0, "ns": [0.1], "d": false}]"#,
        );

        let episodes = load_episodes(&tmp.dir).unwrap();
        assert_eq!(episodes[0].transitions()[0].reward, 1.0);
        assert_eq!(episodes[1].transitions()[0].reward, 2.0);
    }

    #[test]
    fn test_parse_error_names_the_file() {
        let tmp = TempLogDir::new("parse-error");
        tmp.write("transitions_001.json", "{not json");
        let err = load_episodes(&tmp.dir).unwrap_err();
        match err {
            LoadError::Parse { path, .. } => {
                assert!(path.ends_with("transitions_001.json"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
