//! Artifact filename derivation and temp-path resolution.

use std::path::{Path, PathBuf};

use url::Url;

use super::constants::{DEFAULT_EXTENSION, TEMP_SUFFIX};
use crate::reports::ReportId;

/// Builds `report_<id>.<ext>` for a report's artifact.
///
/// The extension comes from the last path segment of `url` (lowercased,
/// alphanumeric only) and falls back to `pdf`. The id is escaped with
/// [`escape_id`], so distinct ids never share a file name.
#[must_use]
pub fn artifact_filename(id: &ReportId, url: &str) -> String {
    let extension = extension_from_url(url).unwrap_or_else(|| DEFAULT_EXTENSION.to_string());
    format!("report_{}.{extension}", escape_id(id.as_str()))
}

/// Returns the in-flight path for `final_path` (`<final>.part`).
#[must_use]
pub fn temp_path_for(final_path: &Path) -> PathBuf {
    let mut name = final_path.as_os_str().to_owned();
    name.push(TEMP_SUFFIX);
    PathBuf::from(name)
}

fn extension_from_url(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let last_segment = parsed.path_segments()?.next_back()?;
    let dot_index = last_segment.rfind('.')?;
    let ext = &last_segment[dot_index + 1..];
    if ext.is_empty() || ext.len() > 11 || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Escapes an id into a file-name-safe component.
///
/// ASCII letters, digits and `-` pass through; every other byte, `_`
/// included, becomes `_XX` (uppercase hex). The mapping is injective.
fn escape_id(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for byte in value.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' {
            out.push(char::from(byte));
        } else {
            out.push_str(&format!("_{byte:02X}"));
        }
    }
    out
}
