//! Merging ignore patterns into a repository's exclude list.
//!
//! The exclude list only ever grows. Each target stamps a header line the
//! first time it is provisioned; patterns are appended when no identical
//! line exists yet, so re-provisioning never duplicates anything.

use std::collections::HashSet;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use crate::error::{IoContext, Result};

pub fn header_line(name: &str) -> String {
    format!("# autosnap: {name}")
}

/// Split a `;`-separated ignore spec into trimmed, non-empty patterns,
/// preserving order.
pub fn parse_ignore_spec(spec: &str) -> Vec<String> {
    spec.split(';')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}

/// Result of merging into existing exclude-list content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Merge {
    pub content: String,
    pub header_added: bool,
    pub added: Vec<String>,
}

impl Merge {
    pub fn changed(&self) -> bool {
        self.header_added || !self.added.is_empty()
    }
}

/// Compute the new exclude-list content for `existing`.
pub fn merge(existing: &str, name: &str, patterns: &[String]) -> Merge {
    let mut seen: HashSet<&str> = existing.lines().collect();
    let header = header_line(name);

    let mut content = existing.to_string();
    let mut push = |line: &str| {
        if !content.is_empty() && !content.ends_with('\n') {
            content.push('\n');
        }
        content.push_str(line);
        content.push('\n');
    };

    let header_added = !seen.contains(header.as_str());
    if header_added {
        push(&header);
    }

    let mut added = Vec::new();
    for p in patterns {
        if seen.insert(p.as_str()) {
            push(p);
            added.push(p.clone());
        }
    }

    Merge {
        content,
        header_added,
        added,
    }
}

/// Merge `patterns` into the exclude file at `path`, creating it (and its
/// parent directory) if needed. The file is only rewritten when something
/// was added.
pub fn merge_into_file(path: &Path, name: &str, patterns: &[String]) -> Result<Merge> {
    let existing = match fs::read_to_string(path) {
        Ok(t) => t,
        Err(e) if e.kind() == ErrorKind::NotFound => String::new(),
        Err(e) => return Err(e).at(path),
    };
    let m = merge(&existing, name, patterns);
    if m.changed() {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).at(parent)?;
        }
        fs::write(path, &m.content).at(path)?;
    }
    Ok(m)
}
