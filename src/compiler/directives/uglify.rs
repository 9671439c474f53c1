use crate::compiler::{DirectiveHandler, Phase, Project};
use crate::core::constants::{CONFIG_MINIFIER_KEY, CONFIG_UGLIFY_KEY, DEFAULT_MINIFIER};
use crate::core::FileId;
use crate::error::Result;
use crate::ConfigMap;
use std::fmt;
use std::fs;
use std::path::Path;
use std::process::Command;

/// Produces minified text for a written output file.
pub trait Minifier: fmt::Debug {
    fn minify(&self, path: &Path) -> std::result::Result<String, String>;
}

/// Runs an external command with the output path as its last argument and
/// takes its standard output as the minified text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandMinifier {
    program: String,
    args: Vec<String>,
}

impl CommandMinifier {
    pub fn new(command_line: &str) -> Self {
        let mut words = command_line.split_whitespace().map(str::to_string);
        let program = words.next().unwrap_or_else(|| DEFAULT_MINIFIER.to_string());
        Self {
            program,
            args: words.collect(),
        }
    }

    /// Command line from the `minifier` key, falling back to `uglifyjs`.
    pub fn from_config(config: &ConfigMap) -> Self {
        let command_line = config
            .get(CONFIG_MINIFIER_KEY)
            .and_then(|v| v.as_str())
            .unwrap_or(DEFAULT_MINIFIER);
        Self::new(command_line)
    }
}

impl Minifier for CommandMinifier {
    fn minify(&self, path: &Path) -> std::result::Result<String, String> {
        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(path)
            .output()
            .map_err(|e| format!("Failed to run '{}': {}", self.program, e))?;
        if !output.status.success() {
            return Err(format!(
                "'{}' exited with {}: {}",
                self.program,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            ));
        }
        String::from_utf8(output.stdout).map_err(|e| format!("Minifier output is not UTF-8: {}", e))
    }
}

/// Minifies every written file when the `uglify` flag is set.
#[derive(Debug, Default)]
pub struct UglifyHandler {
    minifier: Option<Box<dyn Minifier>>,
}

impl UglifyHandler {
    pub fn with_minifier(minifier: Box<dyn Minifier>) -> Self {
        Self {
            minifier: Some(minifier),
        }
    }
}

impl DirectiveHandler for UglifyHandler {
    fn keyword(&self) -> &'static str {
        "uglify"
    }

    fn phases(&self) -> &'static [Phase] {
        &[Phase::Complete]
    }

    fn complete(&self, project: &mut Project, file: FileId) -> Result<()> {
        if !project.config_flag(CONFIG_UGLIFY_KEY) {
            return Ok(());
        }

        let path = project.file(file).abs_output.clone();
        let result = match &self.minifier {
            Some(minifier) => minifier.minify(&path),
            None => CommandMinifier::from_config(project.config()).minify(&path),
        };

        match result {
            Ok(text) => {
                fs::write(&path, text)?;
                log::debug!("Minified {}", path.display());
            }
            Err(message) => log::warn!("Leaving {} unminified: {}", path.display(), message),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_command_line_from_config() {
        let mut config = ConfigMap::new();
        assert_eq!(CommandMinifier::from_config(&config), CommandMinifier::new("uglifyjs"));

        config.insert("minifier".to_string(), json!("terser --compress"));
        let minifier = CommandMinifier::from_config(&config);
        assert_eq!(minifier.program, "terser");
        assert_eq!(minifier.args, vec!["--compress"]);
    }

    #[test]
    fn test_missing_program_is_an_error() {
        let minifier = CommandMinifier::new("transcend-no-such-minifier-binary");
        assert!(minifier.minify(Path::new("a.js")).is_err());
    }
}
