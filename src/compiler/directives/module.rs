use crate::compiler::{DirectiveHandler, Phase, Project};
use crate::core::FileId;
use crate::error::Result;

/// `@module`: wraps the file's own lines in a `declare` call keyed by its
/// relative path.
#[derive(Debug, Default)]
pub struct ModuleHandler;

impl DirectiveHandler for ModuleHandler {
    fn keyword(&self) -> &'static str {
        "module"
    }

    fn phases(&self) -> &'static [Phase] {
        &[Phase::Prepare]
    }

    fn prepare(&self, project: &mut Project, file: FileId) -> Result<Option<bool>> {
        // Wrap what survives conditional compilation, not the raw source.
        project.ensure(Phase::Prepare, "if")?;

        let source = project.file_mut(file);
        if source.has_directive("module") {
            let name = source.path.replace('\\', "\\\\").replace('\'', "\\'");
            source.lines.insert(0, format!(";declare('{}', function() {{", name));
            source.lines.push("});".to_string());
        }
        Ok(None)
    }
}
