//! Directive handler capability set

use crate::compiler::{Phase, Project};
use crate::core::FileId;
use crate::error::Result;
use std::fmt;

/// Callbacks a directive keyword contributes to the pass lifecycle.
///
/// Only the phases listed by [`DirectiveHandler::phases`] are invoked; the
/// remaining callbacks keep their no-op defaults. Handlers hold no per-pass
/// state of their own: anything computed during a pass goes into the
/// project or into `SourceFile::data`, which `Project::reset` clears.
///
/// A callback may call [`Project::ensure`] to run another handler's phase
/// ahead of the main loop.
pub trait DirectiveHandler: fmt::Debug {
    /// Keyword this handler is registered under.
    fn keyword(&self) -> &'static str;

    /// Phases this handler implements.
    fn phases(&self) -> &'static [Phase];

    fn initialize(&self, _project: &mut Project) -> Result<()> {
        Ok(())
    }

    /// Returns `Some(true)` to hide the file, `Some(false)` to force it
    /// visible, `None` to leave its hidden flag alone.
    fn prepare(&self, _project: &mut Project, _file: FileId) -> Result<Option<bool>> {
        Ok(None)
    }

    fn all_prepared(&self, _project: &mut Project) -> Result<()> {
        Ok(())
    }

    fn process(&self, _project: &mut Project, _file: FileId) -> Result<()> {
        Ok(())
    }

    fn all_processed(&self, _project: &mut Project) -> Result<()> {
        Ok(())
    }

    fn complete(&self, _project: &mut Project, _file: FileId) -> Result<()> {
        Ok(())
    }

    fn all_completed(&self, _project: &mut Project) -> Result<()> {
        Ok(())
    }

    fn reset(&self, _project: &mut Project) -> Result<()> {
        Ok(())
    }
}
