//! Locating archives by name fragments.
//!
//! A lookup like `*{variable}*{date}*` is expressed as the ordered fragment
//! list `[variable, date]`: a name matches when every fragment occurs in it,
//! each after the previous one.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::Result;

/// Entries directly inside `dir` whose names contain `fragments` in order,
/// sorted by name. A missing directory yields no matches.
pub fn find_archives(dir: &Path, fragments: &[&str]) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut found = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.map_err(std::io::Error::from)?;
        if let Some(name) = entry.file_name().to_str() {
            if matches_fragments(name, fragments) {
                found.push(entry.into_path());
            }
        }
    }
    Ok(found)
}

/// First match of [`find_archives`].
pub fn find_archive(dir: &Path, fragments: &[&str]) -> Result<Option<PathBuf>> {
    Ok(find_archives(dir, fragments)?.into_iter().next())
}

/// True when `name` contains each fragment, in order, without overlap.
pub fn matches_fragments(name: &str, fragments: &[&str]) -> bool {
    let mut rest = name;
    for fragment in fragments {
        match rest.find(fragment) {
            Some(pos) => rest = &rest[pos + fragment.len()..],
            None => return false,
        }
    }
    true
}
