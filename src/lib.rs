//! Transcend
//!
//! A directive-driven source preprocessor and bundler. Transcend scans a
//! directory tree of JavaScript sources carrying `//@` directives, resolves
//! the dependencies between files, applies conditional compilation against a
//! configuration namespace and writes one bundled output file per visible
//! input file.
//!
//! # Directives
//!
//! - `//@require a, b` - splice the transitive dependencies ahead of the file
//! - `//@master a, b` - supply the dependencies shared by every listed file
//! - `//@parent path` - let a parent supply dependencies shared by its children
//! - `//@if expr` / `//@elseif expr` / `//@else` / `//@endif` - conditional lines
//! - `//@module` - wrap the file in a `declare('<path>', function() { ... })` call
//! - `//@hidden` / `//@visible` - override the underscore visibility rule
//!
//! # Basic Usage
//!
//! ```no_run
//! use transcend::{compile_directory, Result};
//!
//! fn main() -> Result<()> {
//!     let stats = compile_directory("src", "build")?;
//!     println!("{} files written", stats.files_written);
//!     Ok(())
//! }
//! ```
//!
//! # Compilation Pipeline
//!
//! Each pass drives the registered directive handlers through the phases
//! `initialize`, `prepare`, `allPrepared`, `process`, `allProcessed`, write,
//! `complete` and `allCompleted`; `reset` tears the pass down so the same
//! project can compile again.

pub mod cli;
pub mod compiler;
pub mod core;
pub mod error;

use serde::Serialize;
use std::path::PathBuf;

// Re-export commonly used types and functions
pub use compiler::directives::{CommandMinifier, Minifier, UglifyHandler};
pub use compiler::{DirectiveHandler, Phase, Project};
pub use crate::core::{Arguments, Directive, FileId, SourceFile};
pub use error::{CompilerError, Result};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

/// Flat configuration namespace. Every key is readable by name in `@if`
/// expressions.
pub type ConfigMap = serde_json::Map<String, serde_json::Value>;

/// Where to read sources, where to write output, and the configuration
/// namespace for one project.
#[derive(Debug, Clone)]
pub struct ProjectOptions {
    /// Input root; relative paths resolve against the working directory.
    pub input: PathBuf,

    /// Output root. May live inside the input root; it is skipped during
    /// discovery.
    pub output: PathBuf,

    pub config: ConfigMap,
}

impl ProjectOptions {
    pub fn new(input: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
            config: ConfigMap::new(),
        }
    }

    pub fn with_config(mut self, config: ConfigMap) -> Self {
        self.config = config;
        self
    }
}

/// Compilation statistics for one pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CompilationStats {
    /// Source files found under the input root
    pub files_discovered: usize,

    /// Output files written
    pub files_written: usize,

    /// Files skipped at write time because they are hidden
    pub files_hidden: usize,

    /// Directives recognised across all files
    pub directive_count: usize,

    /// Required files spliced into outputs
    pub dependency_edges: usize,

    /// Bytes written before minification
    pub output_size: u64,

    /// Compilation time in milliseconds
    pub compile_time_ms: u64,
}

/// Compile `input` into `output` with an empty configuration.
pub fn compile_directory(input: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Result<CompilationStats> {
    compile_with_options(ProjectOptions::new(input, output))
}

/// Run a single pass with the built-in handlers.
pub fn compile_with_options(options: ProjectOptions) -> Result<CompilationStats> {
    let mut project = Project::new(options)?;
    project.compile()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;
    use std::path::Path;
    use std::rc::Rc;
    use tempfile::TempDir;

    fn write_tree(root: &Path, files: &[(&str, &str)]) {
        for (path, content) in files {
            let full = root.join(path);
            fs::create_dir_all(full.parent().unwrap()).unwrap();
            fs::write(full, content).unwrap();
        }
    }

    fn config(value: serde_json::Value) -> ConfigMap {
        match value {
            serde_json::Value::Object(map) => map,
            _ => ConfigMap::new(),
        }
    }

    fn read(root: &Path, path: &str) -> String {
        fs::read_to_string(root.join(path)).unwrap()
    }

    #[test]
    fn test_conditional_output() {
        let temp_dir = TempDir::new().unwrap();
        let src = temp_dir.path().join("src");
        let out = temp_dir.path().join("out");
        write_tree(
            &src,
            &[("main.js", "//@if debug\n\"kept\"\n//@else\n\"dropped\"\n//@endif\n")],
        );

        let options = ProjectOptions::new(&src, &out).with_config(config(json!({"debug": true})));
        compile_with_options(options).unwrap();

        let output = read(&out, "main.js");
        assert!(output.contains("\"kept\""));
        assert!(!output.contains("\"dropped\""));
        assert!(!output.contains("//@"));
    }

    #[test]
    fn test_required_files_are_spliced_with_banners() {
        let temp_dir = TempDir::new().unwrap();
        let src = temp_dir.path().join("src");
        let out = temp_dir.path().join("out");
        write_tree(
            &src,
            &[
                ("app.js", "//@require lib/a\napp();"),
                ("lib/a.js", "//@require b\na();"),
                ("lib/b.js", "b();"),
            ],
        );

        let stats = compile_directory(&src, &out).unwrap();

        assert_eq!(
            read(&out, "app.js"),
            "/***** Required lib/b.js *****/\nb();\n/***** Ending lib/b.js *****/\n\n\
             /***** Required lib/a.js *****/\na();\n/***** Ending lib/a.js *****/\n\n\
             app();\n"
        );
        assert_eq!(stats.files_written, 3);
        // app.js splices two files, lib/a.js splices one
        assert_eq!(stats.dependency_edges, 3);
    }

    #[test]
    fn test_hidden_file_satisfies_reference_without_output() {
        let temp_dir = TempDir::new().unwrap();
        let src = temp_dir.path().join("src");
        let out = temp_dir.path().join("out");
        write_tree(
            &src,
            &[
                ("page.js", "//@require widgets/button\npage();"),
                ("widgets/_button.js", "button();"),
            ],
        );

        let stats = compile_directory(&src, &out).unwrap();

        assert!(read(&out, "page.js").contains("button();"));
        assert!(!out.join("widgets/_button.js").exists());
        assert!(!out.join("widgets/button.js").exists());
        assert_eq!(stats.files_hidden, 1);
    }

    #[test]
    fn test_unresolved_reference_names_file_and_line() {
        let temp_dir = TempDir::new().unwrap();
        let src = temp_dir.path().join("src");
        let out = temp_dir.path().join("out");
        write_tree(&src, &[("lib/main.js", "var a;\n//@require missing-file\n")]);

        let err = compile_directory(&src, &out).unwrap_err();
        match err.root_cause() {
            CompilerError::UnresolvedReference { file, line, argument, .. } => {
                assert_eq!(file, "lib/main.js");
                assert_eq!(*line, 2);
                assert_eq!(argument, "missing-file");
            }
            other => panic!("Expected unresolved reference, got {:?}", other),
        }
        assert!(!out.join("lib/main.js").exists());
    }

    #[test]
    fn test_round_trip_across_reset_is_byte_identical() {
        let temp_dir = TempDir::new().unwrap();
        let src = temp_dir.path().join("src");
        let out = temp_dir.path().join("out");
        write_tree(
            &src,
            &[
                ("a.js", "//@require shared\n//@master b\na();"),
                ("b.js", "//@require shared\nb();"),
                ("_shared.js", "shared();"),
                ("mod.js", "//@module\n//@if debug\nlog();\n//@endif\nmod();"),
            ],
        );

        let options = ProjectOptions::new(&src, &out).with_config(config(json!({"debug": false})));
        let mut project = Project::new(options).unwrap();

        let first_stats = project.compile().unwrap();
        let first: Vec<String> = ["a.js", "b.js", "mod.js"].iter().map(|p| read(&out, p)).collect();
        project.reset().unwrap();
        let second_stats = project.compile().unwrap();
        let second: Vec<String> = ["a.js", "b.js", "mod.js"].iter().map(|p| read(&out, p)).collect();

        assert_eq!(first, second);
        assert_eq!(first_stats.output_size, second_stats.output_size);
    }

    #[test]
    fn test_module_wrapping() {
        let temp_dir = TempDir::new().unwrap();
        let src = temp_dir.path().join("src");
        let out = temp_dir.path().join("out");
        write_tree(&src, &[("ui/it's.js", "//@module\nreturn 1;")]);

        compile_directory(&src, &out).unwrap();

        assert_eq!(
            read(&out, "ui/it's.js"),
            ";declare('ui/it\\'s.js', function() {\nreturn 1;\n});\n"
        );
    }

    #[test]
    fn test_byte_order_marks_are_stripped() {
        let temp_dir = TempDir::new().unwrap();
        let src = temp_dir.path().join("src");
        let out = temp_dir.path().join("out");
        write_tree(
            &src,
            &[("a.js", "//@require b\n\u{feff}a();"), ("b.js", "\u{feff}b();\r\n")],
        );

        compile_directory(&src, &out).unwrap();

        let output = read(&out, "a.js");
        assert!(!output.contains('\u{feff}'));
        assert!(!output.contains('\r'));
        assert!(output.ends_with("a();\n"));
    }

    #[test]
    fn test_visibility_overrides() {
        let temp_dir = TempDir::new().unwrap();
        let src = temp_dir.path().join("src");
        let out = temp_dir.path().join("out");
        write_tree(
            &src,
            &[("_shown.js", "//@visible\nshown();"), ("secret.js", "//@hidden\nsecret();")],
        );

        let stats = compile_directory(&src, &out).unwrap();

        assert!(out.join("_shown.js").exists());
        assert!(!out.join("secret.js").exists());
        assert_eq!(stats.files_written, 1);
        assert_eq!(stats.files_hidden, 1);
    }

    #[test]
    fn test_minifier_runs_only_when_enabled() {
        #[derive(Debug)]
        struct Shout;

        impl Minifier for Shout {
            fn minify(&self, path: &Path) -> std::result::Result<String, String> {
                let text = fs::read_to_string(path).map_err(|e| e.to_string())?;
                Ok(text.to_uppercase())
            }
        }

        let temp_dir = TempDir::new().unwrap();
        let src = temp_dir.path().join("src");
        let out = temp_dir.path().join("out");
        write_tree(&src, &[("a.js", "quiet();")]);

        let mut project = Project::new(ProjectOptions::new(&src, &out)).unwrap();
        project.register_handler(Rc::new(UglifyHandler::with_minifier(Box::new(Shout))));
        project.compile().unwrap();
        assert_eq!(read(&out, "a.js"), "quiet();\n");

        let options = ProjectOptions::new(&src, &out).with_config(config(json!({"uglify": true})));
        let mut project = Project::new(options).unwrap();
        project.register_handler(Rc::new(UglifyHandler::with_minifier(Box::new(Shout))));
        project.compile().unwrap();
        assert_eq!(read(&out, "a.js"), "QUIET();\n");
    }

    #[test]
    fn test_failing_minifier_leaves_output_untouched() {
        #[derive(Debug)]
        struct Broken;

        impl Minifier for Broken {
            fn minify(&self, _path: &Path) -> std::result::Result<String, String> {
                Err("parse error".to_string())
            }
        }

        let temp_dir = TempDir::new().unwrap();
        let src = temp_dir.path().join("src");
        let out = temp_dir.path().join("out");
        write_tree(&src, &[("a.js", "keep();")]);

        let options = ProjectOptions::new(&src, &out).with_config(config(json!({"uglify": true})));
        let mut project = Project::new(options).unwrap();
        project.register_handler(Rc::new(UglifyHandler::with_minifier(Box::new(Broken))));
        project.compile().unwrap();

        assert_eq!(read(&out, "a.js"), "keep();\n");
    }

    #[test]
    fn test_condition_error_aborts_pass() {
        let temp_dir = TempDir::new().unwrap();
        let src = temp_dir.path().join("src");
        let out = temp_dir.path().join("out");
        write_tree(&src, &[("a.js", "//@if nope\nx();\n//@endif")]);

        let err = compile_directory(&src, &out).unwrap_err();
        assert!(matches!(
            err.root_cause(),
            CompilerError::ConditionEvaluation { line: 1, .. }
        ));
        assert!(err.to_string().contains("prepare"));
    }
}
