//! Source file model
//!
//! A `SourceFile` is one discovered input unit. Files live in the project's
//! arena and are addressed by `FileId`; dependency edges between files are
//! stored as id lists, never as references.

use crate::core::constants::{BYTE_ORDER_MARK, HIDDEN_PREFIX};
use crate::core::directive::Directive;
use crate::error::{CompilerError, Result};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

/// Stable identity of a file for the duration of one compilation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FileId(pub usize);

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Per-file scratch state written by handlers during a pass.
#[derive(Debug, Default, Clone)]
pub struct FileData {
    /// Ordered, deduplicated transitive requires (memoized).
    pub requires: Option<Vec<FileId>>,
    /// `@master` bubbling already applied to this file.
    pub masters_bubbled: bool,
    /// Files that declared this file as their `@parent`, in discovery order.
    pub children: Vec<FileId>,
    /// `@parent` bubbling already applied to this file.
    pub parent_bubbled: bool,
}

#[derive(Debug)]
pub struct SourceFile {
    pub id: FileId,
    /// Path relative to the input root, `/`-separated. Unique within a project.
    pub path: String,
    pub abs_input: PathBuf,
    pub abs_output: PathBuf,
    /// The file's own lines as they will be written.
    pub lines: Vec<String>,
    /// Lines spliced in ahead of `lines` at write time (required files).
    pub preamble: Vec<String>,
    pub data: FileData,
    directives: Vec<Directive>,
    by_keyword: HashMap<String, Vec<usize>>,
    by_line: HashMap<usize, usize>,
    hidden: Option<bool>,
    output: Option<BufWriter<fs::File>>,
}

impl SourceFile {
    /// Read a file from disk and index its directives.
    pub fn load(id: FileId, path: &str, abs_input: PathBuf, abs_output: PathBuf) -> Result<Self> {
        let content = fs::read_to_string(&abs_input).map_err(|e| CompilerError::FileNotFound {
            path: format!("{}: {}", abs_input.display(), e),
        })?;
        Ok(Self::from_source(id, path, abs_input, abs_output, &content))
    }

    pub fn from_source(
        id: FileId,
        path: &str,
        abs_input: PathBuf,
        abs_output: PathBuf,
        content: &str,
    ) -> Self {
        let content = content.strip_prefix(BYTE_ORDER_MARK).unwrap_or(content);
        let mut file = Self {
            id,
            path: path.trim_start_matches('/').to_string(),
            abs_input,
            abs_output,
            lines: content.lines().map(str::to_string).collect(),
            preamble: Vec::new(),
            data: FileData::default(),
            directives: Vec::new(),
            by_keyword: HashMap::new(),
            by_line: HashMap::new(),
            hidden: None,
            output: None,
        };
        file.index_directives();
        file
    }

    fn index_directives(&mut self) {
        for (index, text) in self.lines.iter().enumerate() {
            match Directive::parse(text, index + 1, self.id, &self.path) {
                Ok(Some(directive)) => self.directives.push(directive),
                Ok(None) => {}
                Err(e) => log::trace!("Ignoring line: {}", e),
            }
        }
        self.rebuild_index();
    }

    fn rebuild_index(&mut self) {
        self.by_keyword.clear();
        self.by_line.clear();
        for (position, directive) in self.directives.iter().enumerate() {
            self.by_keyword
                .entry(directive.keyword.clone())
                .or_default()
                .push(position);
            self.by_line.insert(directive.line, position);
        }
    }

    /// Directives with the given keyword, in order of appearance.
    pub fn directives<'a>(&'a self, keyword: &str) -> impl Iterator<Item = &'a Directive> + 'a {
        self.by_keyword
            .get(keyword)
            .into_iter()
            .flatten()
            .map(move |&position| &self.directives[position])
    }

    pub fn directive_at(&self, line: usize) -> Option<&Directive> {
        self.by_line.get(&line).map(|&position| &self.directives[position])
    }

    pub fn has_directive(&self, keyword: &str) -> bool {
        self.by_keyword.contains_key(keyword)
    }

    pub fn all_directives(&self) -> &[Directive] {
        &self.directives
    }

    /// Delete lines by their original 1-based numbers, dropping any directive
    /// that lived on a deleted line. Must run before anything inserts lines.
    pub fn remove_lines(&mut self, doomed: &BTreeSet<usize>) {
        if doomed.is_empty() {
            return;
        }
        let mut number = 0;
        self.lines.retain(|_| {
            number += 1;
            !doomed.contains(&number)
        });
        self.directives.retain(|d| !doomed.contains(&d.line));
        self.rebuild_index();
    }

    /// Hidden files produce no output but remain resolvable.
    pub fn is_hidden(&self) -> bool {
        self.hidden.unwrap_or_else(|| {
            self.path
                .split('/')
                .any(|segment| segment.starts_with(HIDDEN_PREFIX))
        })
    }

    pub fn set_hidden(&mut self, hidden: bool) {
        self.hidden = Some(hidden);
    }

    pub fn hidden_override(&self) -> Option<bool> {
        self.hidden
    }

    /// Directory of this file relative to the input root (empty at the root).
    pub fn directory(&self) -> &str {
        self.path.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("")
    }

    /// Write raw text to the output file, opening it on first use.
    pub fn write_output(&mut self, text: &str) -> Result<()> {
        if self.output.is_none() {
            if let Some(parent) = self.abs_output.parent() {
                fs::create_dir_all(parent)?;
            }
            let handle = fs::File::create(&self.abs_output).map_err(|e| {
                CompilerError::output_directory(
                    self.abs_output.display().to_string(),
                    format!("Output file could not be created: {}", e),
                )
            })?;
            self.output = Some(BufWriter::new(handle));
        }
        if let Some(output) = self.output.as_mut() {
            output.write_all(text.as_bytes())?;
        }
        Ok(())
    }

    pub fn has_open_output(&self) -> bool {
        self.output.is_some()
    }

    /// Flush and close the output handle if one is open.
    pub fn close_output(&mut self) -> Result<()> {
        if let Some(mut output) = self.output.take() {
            output.flush()?;
        }
        Ok(())
    }
}
