//! Resolution of directive arguments to discovered files

use crate::core::constants::{HIDDEN_PREFIX, SOURCE_EXTENSION};
use crate::core::file::FileId;
use std::collections::BTreeMap;

/// Resolve `argument` as written in a file located in `from_directory`.
///
/// Arguments without an extension get the source extension appended. A leading
/// `/` anchors the path at the input root. Besides the literal path, one
/// variant per segment with that segment prefixed by `_` is tried, so `foo/bar`
/// finds `foo/_bar.js` or `_foo/bar.js`. The first candidate present in
/// `files` wins.
pub fn resolve_reference(
    files: &BTreeMap<String, FileId>,
    from_directory: &str,
    argument: &str,
) -> Option<FileId> {
    candidates(from_directory, argument)
        .into_iter()
        .find_map(|candidate| files.get(&candidate).copied())
}

/// Candidate relative paths for `argument`, in lookup order.
pub fn candidates(from_directory: &str, argument: &str) -> Vec<String> {
    let argument = argument.trim();
    if argument.is_empty() {
        return Vec::new();
    }

    let mut filepath = argument.replace('\\', "/");
    if !has_extension(&filepath) {
        filepath.push('.');
        filepath.push_str(SOURCE_EXTENSION);
    }

    let base = if filepath.starts_with('/') { "" } else { from_directory };
    let filepath = filepath.trim_start_matches('/');

    let segments: Vec<&str> = filepath.split('/').collect();
    let mut tries = vec![filepath.to_string()];
    for (i, segment) in segments.iter().enumerate() {
        if segment.is_empty()
            || *segment == "."
            || *segment == ".."
            || segment.starts_with(HIDDEN_PREFIX)
        {
            continue;
        }
        let mut variant: Vec<String> = segments.iter().map(|s| s.to_string()).collect();
        variant[i] = format!("{}{}", HIDDEN_PREFIX, segment);
        tries.push(variant.join("/"));
    }

    tries
        .iter()
        .filter_map(|attempt| normalize(base, attempt))
        .collect()
}

fn has_extension(path: &str) -> bool {
    let name = path.rsplit('/').next().unwrap_or(path);
    matches!(name.rsplit_once('.'), Some((_, ext)) if !ext.is_empty())
}

/// Join `relative` onto `base` and collapse `.`/`..` segments. Paths that climb
/// above the input root yield `None`.
fn normalize(base: &str, relative: &str) -> Option<String> {
    let mut parts: Vec<&str> = Vec::new();
    for segment in base.split('/').chain(relative.split('/')) {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop()?;
            }
            other => parts.push(other),
        }
    }
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("/"))
    }
}
