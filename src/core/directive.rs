//! Directive recognition for single source lines

use crate::core::constants::{DIRECTIVE_MARKER, LIST_KEYWORDS};
use crate::core::file::FileId;
use crate::error::{CompilerError, Result};
use regex::Regex;
use std::sync::OnceLock;

/// Argument text following a directive keyword.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Arguments {
    /// Free-form text interpreted by the owning handler (e.g. a condition).
    Raw(String),
    /// Comma-separated list, each entry trimmed, empty entries dropped.
    List(Vec<String>),
}

impl Arguments {
    pub fn raw(&self) -> String {
        match self {
            Arguments::Raw(text) => text.clone(),
            Arguments::List(items) => items.join(", "),
        }
    }

    pub fn items(&self) -> Vec<&str> {
        match self {
            Arguments::Raw(text) if text.is_empty() => Vec::new(),
            Arguments::Raw(text) => vec![text.as_str()],
            Arguments::List(items) => items.iter().map(String::as_str).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Arguments::Raw(text) => text.is_empty(),
            Arguments::List(items) => items.is_empty(),
        }
    }
}

/// A directive found on one line of a source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directive {
    pub keyword: String,
    pub args: Arguments,
    /// 1-based line number within the owning file.
    pub line: usize,
    pub owner: FileId,
}

fn directive_regex() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        let pattern = format!(
            r"^{}([A-Za-z_][A-Za-z0-9_-]*)(?:\s+(.*))?$",
            regex::escape(DIRECTIVE_MARKER)
        );
        Regex::new(&pattern).expect("directive pattern is a valid regex")
    })
}

/// Whether the line carries the directive marker at all.
pub fn is_directive_line(line: &str) -> bool {
    line.trim().starts_with(DIRECTIVE_MARKER)
}

impl Directive {
    /// Parse `text` as a directive.
    ///
    /// Returns `Ok(None)` for ordinary lines and a `MalformedDirective` error for
    /// marker lines that do not match the directive pattern. Callers treat that
    /// error as "not a directive".
    pub fn parse(text: &str, line: usize, owner: FileId, file_path: &str) -> Result<Option<Directive>> {
        let trimmed = text.trim();
        if !trimmed.starts_with(DIRECTIVE_MARKER) {
            return Ok(None);
        }

        let captures = directive_regex().captures(trimmed).ok_or_else(|| {
            CompilerError::malformed(file_path, line, format!("Invalid directive: '{}'", trimmed))
        })?;

        let keyword = captures[1].to_string();
        let raw = captures
            .get(2)
            .map(|m| m.as_str().trim().to_string())
            .unwrap_or_default();

        let args = if LIST_KEYWORDS.contains(&keyword.as_str()) {
            Arguments::List(
                raw.split(',')
                    .map(str::trim)
                    .filter(|item| !item.is_empty())
                    .map(str::to_string)
                    .collect(),
            )
        } else {
            Arguments::Raw(raw)
        };

        Ok(Some(Directive {
            keyword,
            args,
            line,
            owner,
        }))
    }
}
