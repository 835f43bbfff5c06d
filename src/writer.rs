//! Output document assembly and atomic file writing.

use std::io::Write;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use tempfile::NamedTempFile;

use crate::error::{Error, Result};

/// First line of every AutoProxy list.
pub const AUTOPROXY_MARKER: &str = "[AutoProxy 0.2.9]";

/// Tool name used in the header.
pub const TOOL_NAME: &str = "geosite2abp";

/// Tool version used in the header.
pub const TOOL_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Header comments plus pattern lines, ready to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputDocument {
    /// Header lines, starting with the AutoProxy marker
    pub header: Vec<String>,
    /// Pattern lines in output order
    pub lines: Vec<String>,
}

impl OutputDocument {
    /// Build a document with the standard header.
    ///
    /// `rule_count` counts source rules; an exact-match rule spans two
    /// pattern lines but counts once.
    pub fn new(
        identifiers: &[String],
        lines: Vec<String>,
        rule_count: usize,
        generated: SystemTime,
    ) -> Self {
        let contains = identifiers
            .iter()
            .map(|it| format!("geosite:{}", it))
            .collect::<Vec<_>>()
            .join(", ");

        let header = vec![
            AUTOPROXY_MARKER.to_string(),
            format!("! Title: {}", TOOL_NAME),
            format!("! The ruleset contains: {}", contains),
            format!("! Last Modified: {}", format_timestamp(generated)),
            format!("! This list is generated by {} v{}", TOOL_NAME, TOOL_VERSION),
            "! It is based on data from:".to_string(),
            "! 1. v2fly/domain-list-community (MIT License)".to_string(),
            "! 2. Loyalsoldier/v2ray-rules-dat (GPL-3.0-or-later License)".to_string(),
            format!("! Total rules: {}", rule_count),
        ];

        Self { header, lines }
    }

    /// Render the document as file content.
    pub fn render(&self) -> String {
        let size = self
            .header
            .iter()
            .chain(&self.lines)
            .map(|l| l.len() + 1)
            .sum::<usize>()
            + 1;
        let mut out = String::with_capacity(size);

        for line in &self.header {
            out.push_str(line);
            out.push('\n');
        }
        out.push('\n');
        for line in &self.lines {
            out.push_str(line);
            out.push('\n');
        }

        out
    }
}

fn write_error(path: &Path, source: std::io::Error) -> Error {
    Error::Write {
        path: path.to_path_buf(),
        source,
    }
}

/// Write the document to `destination`, replacing any existing file.
///
/// Content is written to a temporary file beside the destination and
/// renamed into place, so readers never see a partial list. Parent
/// directories are not created.
pub fn write(document: &OutputDocument, destination: &Path) -> Result<()> {
    let parent = match destination.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let mut temp = NamedTempFile::new_in(parent).map_err(|e| write_error(destination, e))?;
    temp.write_all(document.render().as_bytes())
        .map_err(|e| write_error(destination, e))?;
    temp.as_file()
        .sync_all()
        .map_err(|e| write_error(destination, e))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(temp.path(), std::fs::Permissions::from_mode(0o644))
            .map_err(|e| write_error(destination, e))?;
    }

    temp.persist(destination)
        .map_err(|e| write_error(destination, e.error))?;

    log::info!(
        "Wrote {} lines to {}",
        document.lines.len(),
        destination.display()
    );
    Ok(())
}

/// Format a time as `YYYY-MM-DD HH:MM:SS +0000`.
pub fn format_timestamp(time: SystemTime) -> String {
    let secs = time.duration_since(UNIX_EPOCH).unwrap_or_default().as_secs();
    let days = (secs / 86_400) as i64;
    let rem = secs % 86_400;
    let (year, month, day) = civil_from_days(days);

    format!(
        "{:04}-{:02}-{:02} {:02}:{:02}:{:02} +0000",
        year,
        month,
        day,
        rem / 3600,
        (rem % 3600) / 60,
        rem % 60
    )
}

/// Days since 1970-01-01 to a proleptic Gregorian (year, month, day).
fn civil_from_days(days: i64) -> (i64, u32, u32) {
    let z = days + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z.rem_euclid(146_097);
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = (doy - (153 * mp + 2) / 5 + 1) as u32;
    let month = (if mp < 10 { mp + 3 } else { mp - 9 }) as u32;
    let year = yoe + era * 400 + i64::from(month <= 2);
    (year, month, day)
}
