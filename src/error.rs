//! Error types for the Transcend preprocessor

use crate::compiler::Phase;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CompilerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed directive in {file} at line {line}: {message}")]
    MalformedDirective { file: String, line: usize, message: String },

    #[error("@{keyword} argument \"{argument}\" could not be resolved in {file} at line {line}")]
    UnresolvedReference {
        file: String,
        line: usize,
        keyword: String,
        argument: String,
    },

    #[error("Circular dependency detected in {file}: {chain}")]
    CircularDependency { file: String, chain: String },

    #[error("Error evaluating expression in {file} at line {line}: {message}")]
    ConditionEvaluation { file: String, line: usize, message: String },

    #[error("Unable to use output directory {path}: {message}")]
    OutputDirectory { path: String, message: String },

    #[error("Input directory {path} does not exist or is not a directory")]
    InputDirectoryMissing { path: String },

    #[error("Phase '{phase}' of @{keyword} was requested while already running")]
    PhaseReentrancy { keyword: String, phase: Phase },

    #[error("{source} (during '{phase}' of {file})")]
    Phase {
        phase: Phase,
        file: String,
        source: Box<CompilerError>,
    },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("File not found: {path}")]
    FileNotFound { path: String },

    #[error("Watch error: {message}")]
    Watch { message: String },
}

pub type Result<T> = std::result::Result<T, CompilerError>;

impl CompilerError {
    pub fn malformed(file: impl Into<String>, line: usize, message: impl Into<String>) -> Self {
        Self::MalformedDirective {
            file: file.into(),
            line,
            message: message.into(),
        }
    }

    pub fn unresolved(
        file: impl Into<String>,
        line: usize,
        keyword: impl Into<String>,
        argument: impl Into<String>,
    ) -> Self {
        Self::UnresolvedReference {
            file: file.into(),
            line,
            keyword: keyword.into(),
            argument: argument.into(),
        }
    }

    pub fn condition(file: impl Into<String>, line: usize, message: impl Into<String>) -> Self {
        Self::ConditionEvaluation {
            file: file.into(),
            line,
            message: message.into(),
        }
    }

    pub fn output_directory(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::OutputDirectory {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Attach the phase and file a handler was working on. Errors that already
    /// carry that context are returned unchanged.
    pub fn during(self, phase: Phase, file: impl Into<String>) -> Self {
        match self {
            Self::Phase { .. } => self,
            other => Self::Phase {
                phase,
                file: file.into(),
                source: Box::new(other),
            },
        }
    }

    /// The underlying error with any phase context removed.
    pub fn root_cause(&self) -> &CompilerError {
        match self {
            Self::Phase { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_context_is_not_nested() {
        let err = CompilerError::unresolved("a.js", 3, "require", "missing")
            .during(Phase::Prepare, "a.js")
            .during(Phase::Process, "b.js");

        match &err {
            CompilerError::Phase { phase, file, .. } => {
                assert_eq!(*phase, Phase::Prepare);
                assert_eq!(file, "a.js");
            }
            other => panic!("Expected phase context, got {:?}", other),
        }
        assert!(matches!(
            err.root_cause(),
            CompilerError::UnresolvedReference { line: 3, .. }
        ));
    }

    #[test]
    fn test_messages_name_file_and_line() {
        let err = CompilerError::condition("lib/util.js", 12, "Unknown name 'debug'");
        let message = err.to_string();
        assert!(message.contains("lib/util.js"));
        assert!(message.contains("12"));
    }
}
