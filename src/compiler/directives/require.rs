use crate::compiler::graph::get_requires;
use crate::compiler::{DirectiveHandler, Phase, Project};
use crate::core::constants::{REQUIRED_BANNER_END, REQUIRED_BANNER_ENDING, REQUIRED_BANNER_START};
use crate::core::FileId;
use crate::error::Result;

/// `@require a, b`: splices the transitive dependencies of a file ahead of
/// its own lines.
#[derive(Debug, Default)]
pub struct RequireHandler;

impl DirectiveHandler for RequireHandler {
    fn keyword(&self) -> &'static str {
        "require"
    }

    fn phases(&self) -> &'static [Phase] {
        &[Phase::Prepare, Phase::Process]
    }

    fn prepare(&self, project: &mut Project, file: FileId) -> Result<Option<bool>> {
        // Requires inside false branches must be gone before resolution.
        project.ensure(Phase::Prepare, "if")?;
        get_requires(project, file)?;
        Ok(None)
    }

    fn process(&self, project: &mut Project, file: FileId) -> Result<()> {
        let requires = project.file(file).data.requires.clone().unwrap_or_default();
        if requires.is_empty() {
            return Ok(());
        }

        let mut preamble = Vec::new();
        for id in &requires {
            let required = project.file(*id);
            preamble.push(format!("{}{}{}", REQUIRED_BANNER_START, required.path, REQUIRED_BANNER_END));
            preamble.extend(required.lines.iter().cloned());
            preamble.push(format!("{}{}{}", REQUIRED_BANNER_ENDING, required.path, REQUIRED_BANNER_END));
            preamble.push(String::new());
        }

        log::debug!("{}: including {} required files", project.file(file).path, requires.len());
        project.stats.dependency_edges += requires.len();
        project.file_mut(file).preamble = preamble;
        Ok(())
    }
}
