//! Input discovery
//!
//! Each input is either a literal file path or a glob. Globs are walked from
//! their literal directory prefix. The result is deduplicated and sorted so
//! processing order never depends on filesystem enumeration order.

use globset::{GlobBuilder, GlobMatcher};
use std::collections::BTreeSet;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::config::ConfigError;

const GLOB_META: &[char] = &['*', '?', '[', '{'];

/// Files found for a set of inputs
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Discovery {
    /// Matched files, deduplicated, in lexicographic path order
    pub files: Vec<PathBuf>,
    /// Inputs that matched nothing
    pub unmatched: Vec<String>,
}

impl Discovery {
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// Expand inputs into a sorted, deduplicated file list.
pub fn discover<S: AsRef<str>>(inputs: &[S]) -> Result<Discovery, ConfigError> {
    let mut files = BTreeSet::new();
    let mut unmatched = Vec::new();

    for input in inputs {
        let input = input.as_ref();
        let before = files.len();
        let mut found = 0usize;

        if is_glob(input) {
            for path in expand_glob(input)? {
                found += 1;
                files.insert(path);
            }
        } else {
            let path = Path::new(input);
            if path.is_file() {
                found += 1;
                files.insert(path.to_path_buf());
            }
        }

        debug!(input, found, new = files.len() - before, "expanded input");
        if found == 0 {
            unmatched.push(input.to_string());
        }
    }

    Ok(Discovery {
        files: files.into_iter().collect(),
        unmatched,
    })
}

fn is_glob(input: &str) -> bool {
    input.contains(GLOB_META)
}

/// Literal directory prefix of a glob, and how deep below it a match can be
/// (None when `**` allows any depth).
fn split_glob(pattern: &str) -> (PathBuf, Option<usize>) {
    let mut prefix = PathBuf::new();
    let mut remaining = Vec::new();
    for component in Path::new(pattern).components() {
        let text = component.as_os_str().to_string_lossy();
        if remaining.is_empty() && !text.contains(GLOB_META) {
            prefix.push(component.as_os_str());
        } else {
            remaining.push(text.into_owned());
        }
    }

    let depth = if remaining.iter().any(|c| c.contains("**")) {
        None
    } else {
        Some(remaining.len())
    };
    (prefix, depth)
}

fn expand_glob(pattern: &str) -> Result<Vec<PathBuf>, ConfigError> {
    let matcher: GlobMatcher = GlobBuilder::new(pattern)
        .literal_separator(true)
        .build()
        .map_err(|e| ConfigError::InvalidOption(format!("bad glob '{}': {}", pattern, e)))?
        .compile_matcher();

    let (prefix, depth) = split_glob(pattern);
    let relative = prefix.as_os_str().is_empty();
    let root = if relative { PathBuf::from(".") } else { prefix };

    let mut walker = WalkDir::new(&root)
        .follow_links(false)
        .sort_by(|a, b| a.file_name().cmp(b.file_name()));
    if let Some(depth) = depth {
        walker = walker.max_depth(depth);
    }

    let mut matches = Vec::new();
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(pattern, error = %e, "skipping unreadable path");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let path = if relative {
            strip_current_dir(entry.path())
        } else {
            entry.path().to_path_buf()
        };
        if matcher.is_match(&path) {
            matches.push(path);
        }
    }
    Ok(matches)
}

fn strip_current_dir(path: &Path) -> PathBuf {
    path.components()
        .skip_while(|c| matches!(c, Component::CurDir))
        .collect()
}
