use crate::compiler::{DirectiveHandler, Phase, Project};
use crate::core::FileId;
use crate::error::Result;

/// `@hidden` / `@visible`: overrides the visibility derived from the path.
/// The last of the two in a file wins.
#[derive(Debug, Default)]
pub struct VisibilityHandler;

impl DirectiveHandler for VisibilityHandler {
    fn keyword(&self) -> &'static str {
        "hidden"
    }

    fn phases(&self) -> &'static [Phase] {
        &[Phase::Prepare]
    }

    fn prepare(&self, project: &mut Project, file: FileId) -> Result<Option<bool>> {
        project.ensure(Phase::Prepare, "if")?;

        let source = project.file(file);
        let hidden = source
            .all_directives()
            .iter()
            .filter_map(|d| match d.keyword.as_str() {
                "hidden" => Some(true),
                "visible" => Some(false),
                _ => None,
            })
            .last();
        if let Some(hidden) = hidden {
            log::debug!("{} marked {}", source.path, if hidden { "hidden" } else { "visible" });
        }
        Ok(hidden)
    }
}
