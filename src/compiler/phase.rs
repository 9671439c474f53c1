//! Lifecycle phases of a compilation pass

use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// One named stage of a pass. Writing output happens between
/// `AllProcessed` and `Complete` and is not a handler phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Phase {
    Initialize,
    Prepare,
    AllPrepared,
    Process,
    AllProcessed,
    Complete,
    AllCompleted,
    Reset,
}

impl Phase {
    /// The phases a compilation pass runs, in order. `Reset` is driven
    /// separately by `Project::reset`.
    pub const PASS: [Phase; 7] = [
        Phase::Initialize,
        Phase::Prepare,
        Phase::AllPrepared,
        Phase::Process,
        Phase::AllProcessed,
        Phase::Complete,
        Phase::AllCompleted,
    ];

    /// Per-file phases invoke the callback once for every eligible file.
    pub fn is_per_file(self) -> bool {
        matches!(self, Phase::Prepare | Phase::Process | Phase::Complete)
    }

    /// Only `prepare` sees hidden files.
    pub fn includes_hidden(self) -> bool {
        matches!(self, Phase::Prepare)
    }

    pub fn name(self) -> &'static str {
        match self {
            Phase::Initialize => "initialize",
            Phase::Prepare => "prepare",
            Phase::AllPrepared => "allPrepared",
            Phase::Process => "process",
            Phase::AllProcessed => "allProcessed",
            Phase::Complete => "complete",
            Phase::AllCompleted => "allCompleted",
            Phase::Reset => "reset",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Phase {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "initialize" => Ok(Phase::Initialize),
            "prepare" => Ok(Phase::Prepare),
            "allPrepared" | "all-prepared" => Ok(Phase::AllPrepared),
            "process" => Ok(Phase::Process),
            "allProcessed" | "all-processed" => Ok(Phase::AllProcessed),
            "complete" | "finalize" => Ok(Phase::Complete),
            "allCompleted" | "all-completed" => Ok(Phase::AllCompleted),
            "reset" => Ok(Phase::Reset),
            other => Err(format!("Invalid phase requested: {}", other)),
        }
    }
}
