use crate::compiler::conditional::apply_conditionals;
use crate::compiler::{DirectiveHandler, Phase, Project};
use crate::core::FileId;
use crate::error::Result;

/// `@if` / `@elseif` / `@else` / `@endif`.
#[derive(Debug, Default)]
pub struct IfHandler;

impl DirectiveHandler for IfHandler {
    fn keyword(&self) -> &'static str {
        "if"
    }

    fn phases(&self) -> &'static [Phase] {
        &[Phase::Prepare]
    }

    fn prepare(&self, project: &mut Project, file: FileId) -> Result<Option<bool>> {
        let Project { files, config, .. } = project;
        apply_conditionals(&mut files[file.0], config)?;
        Ok(None)
    }
}
