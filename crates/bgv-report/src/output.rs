use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use crate::ValidationReport;

/// Full, uncapped report as pretty JSON.
pub fn render_json(report: &ValidationReport) -> Result<String> {
    let json = serde_json::to_string_pretty(report).context("serialize report failed")?;
    Ok(format!("{json}\n"))
}

/// Write `content` to `path`, creating parent directories as needed.
/// An existing file is overwritten.
pub fn write_report(content: &str, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("create report dir failed: {}", parent.display()))?;
    }
    fs::write(path, content)
        .with_context(|| format!("write report failed: {}", path.display()))?;
    Ok(())
}
