use crate::compiler::graph::bubble_master;
use crate::compiler::{DirectiveHandler, Phase, Project};
use crate::core::FileId;
use crate::error::Result;

/// `@master a, b`: this file supplies the requires common to every source.
#[derive(Debug, Default)]
pub struct MasterHandler;

impl DirectiveHandler for MasterHandler {
    fn keyword(&self) -> &'static str {
        "master"
    }

    fn phases(&self) -> &'static [Phase] {
        &[Phase::Prepare]
    }

    fn prepare(&self, project: &mut Project, file: FileId) -> Result<Option<bool>> {
        project.ensure(Phase::Prepare, "require")?;
        if project.file(file).has_directive("master") {
            bubble_master(project, file)?;
        }
        Ok(None)
    }
}
