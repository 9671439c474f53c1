// FILE: src/compiler/writer.rs

use crate::core::constants::{BYTE_ORDER_MARK, OUTPUT_LINE_ENDING, OUTPUT_PROBE_FILE};
use crate::core::directive::is_directive_line;
use crate::core::SourceFile;
use crate::error::{CompilerError, Result};
use std::fs;
use std::path::Path;

/// Create the output root if needed and check that it accepts writes.
pub fn prepare_output_root(output: &Path) -> Result<()> {
    let path = output.display().to_string();
    fs::create_dir_all(output).map_err(|e| {
        CompilerError::output_directory(&path, format!("Could not be created: {}", e))
    })?;

    let probe = output.join(OUTPUT_PROBE_FILE);
    fs::write(&probe, b"").map_err(|e| {
        CompilerError::output_directory(&path, format!("Not writable: {}", e))
    })?;
    fs::remove_file(&probe).map_err(|e| {
        CompilerError::output_directory(&path, format!("Probe file could not be removed: {}", e))
    })?;
    Ok(())
}

/// Final text of a file: spliced preamble, then its own lines. Directive
/// lines are dropped and every line ends with a newline.
pub fn render(file: &SourceFile) -> String {
    let mut text = String::new();
    for line in file.preamble.iter().chain(file.lines.iter()) {
        if is_directive_line(line) {
            continue;
        }
        text.push_str(line.strip_prefix(BYTE_ORDER_MARK).unwrap_or(line));
        text.push_str(OUTPUT_LINE_ENDING);
    }
    text
}

/// Write the rendered file to its output path and close the handle.
/// Returns the number of bytes written.
pub fn write_file(file: &mut SourceFile) -> Result<u64> {
    let text = render(file);
    log::debug!("Writing {} ({} bytes)", file.abs_output.display(), text.len());
    file.write_output(&text)?;
    file.close_output()?;
    Ok(text.len() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::FileId;
    use tempfile::TempDir;

    fn file(root: &Path, path: &str, content: &str) -> SourceFile {
        SourceFile::from_source(
            FileId(0),
            path,
            root.join("src").join(path),
            root.join("out").join(path),
            content,
        )
    }

    #[test]
    fn test_render_skips_directives_and_strips_bom() {
        let f = file(Path::new("/tmp"), "a.js", "\u{feff}var a;\n//@require b\r\nvar c;");
        assert_eq!(render(&f), "var a;\nvar c;\n");
    }

    #[test]
    fn test_render_puts_preamble_first() {
        let mut f = file(Path::new("/tmp"), "a.js", "own");
        f.preamble = vec!["dep".to_string(), String::new()];
        assert_eq!(render(&f), "dep\n\nown\n");
    }

    #[test]
    fn test_write_file_creates_nested_directories() {
        let temp_dir = TempDir::new().unwrap();
        let mut f = file(temp_dir.path(), "lib/deep/a.js", "x\ny");
        let written = write_file(&mut f).unwrap();

        let output = fs::read_to_string(temp_dir.path().join("out/lib/deep/a.js")).unwrap();
        assert_eq!(output, "x\ny\n");
        assert_eq!(written, 4);
        assert!(!f.has_open_output());
    }

    #[test]
    fn test_prepare_output_root_creates_and_cleans_up() {
        let temp_dir = TempDir::new().unwrap();
        let output = temp_dir.path().join("build/nested");
        prepare_output_root(&output).unwrap();
        assert!(output.is_dir());
        assert!(!output.join(OUTPUT_PROBE_FILE).exists());
    }

    #[test]
    fn test_prepare_output_root_rejects_a_file() {
        let temp_dir = TempDir::new().unwrap();
        let output = temp_dir.path().join("taken");
        fs::write(&output, "not a directory").unwrap();
        assert!(matches!(
            prepare_output_root(&output),
            Err(CompilerError::OutputDirectory { .. })
        ));
    }
}
