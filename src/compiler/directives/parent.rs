use crate::compiler::graph::bubble_parents;
use crate::compiler::{DirectiveHandler, Phase, Project};
use crate::core::FileId;
use crate::error::Result;

/// `@parent path`: registers this file as a child of `path`. Once every file
/// is prepared, requires shared by several descendants move to the parent.
#[derive(Debug, Default)]
pub struct ParentHandler;

impl DirectiveHandler for ParentHandler {
    fn keyword(&self) -> &'static str {
        "parent"
    }

    fn phases(&self) -> &'static [Phase] {
        &[Phase::Prepare, Phase::AllPrepared]
    }

    fn prepare(&self, project: &mut Project, file: FileId) -> Result<Option<bool>> {
        project.ensure(Phase::Prepare, "require")?;

        // Only the first @parent counts.
        let target = project
            .file(file)
            .directives("parent")
            .next()
            .map(|d| (d.line, d.args.raw().trim().to_string()));
        let Some((line, argument)) = target else {
            return Ok(None);
        };

        let parent = project.resolve_argument(file, "parent", line, &argument)?;
        let children = &mut project.file_mut(parent).data.children;
        if !children.contains(&file) {
            children.push(file);
        }
        Ok(None)
    }

    fn all_prepared(&self, project: &mut Project) -> Result<()> {
        bubble_parents(project)
    }
}
