//! Result file writing.

use anyhow::{Context, Result};
use std::path::Path;

/// Write recognized lines to `path` as UTF-8, joined with `"\n"` and no
/// trailing separator. Parent directories are created if missing; an
/// existing file is overwritten.
pub fn write_lines(path: &Path, lines: &[String]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory {:?}", parent))?;
        }
    }

    std::fs::write(path, lines.join("\n"))
        .with_context(|| format!("failed to write {:?}", path))?;

    Ok(())
}
