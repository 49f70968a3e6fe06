use std::path::{Path, PathBuf};

use anyhow::Context as _;
use url::Url;

use crate::records::CandidateRecord;

/// Characters that must never appear in a produced path segment.
const ILLEGAL: [char; 9] = ['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Replaces filesystem-hostile characters with `_`. Applied to every
/// path segment this crate produces.
pub fn sanitize_component(raw: &str) -> String {
    raw.chars()
        .map(|ch| if ILLEGAL.contains(&ch) { '_' } else { ch })
        .collect()
}

/// Title-cases a name the way Python's `str.title()` does: the first
/// alphabetic character after any non-alphabetic one is uppercased, the rest
/// lowercased ("o'brien" becomes "O'Brien").
pub fn title_case(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut prev_alpha = false;
    for ch in raw.chars() {
        if ch.is_alphabetic() {
            if prev_alpha {
                out.extend(ch.to_lowercase());
            } else {
                out.extend(ch.to_uppercase());
            }
            prev_alpha = true;
        } else {
            out.push(ch);
            prev_alpha = false;
        }
    }
    out
}

/// Display form of a student name used in progress output and the failure
/// report: `Firstname Lastname`, sanitized like the filename pieces.
pub fn student_display(first_name: &str, last_name: &str) -> String {
    format!(
        "{} {}",
        sanitize_component(&title_case(first_name)),
        sanitize_component(&title_case(last_name))
    )
}

/// Where one record's file goes:
/// `<root>/<sanitized period>/<sanitized course>/<Firstname>_<Lastname><ext>`.
///
/// The prefix is deterministic per identity, which is what makes downloads
/// resumable across runs. Known limitation: two students with the same first
/// and last name in one course and period share a prefix, so the
/// existing-file check cannot tell them apart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadTarget {
    pub dir: PathBuf,
    pub file_prefix: String,
}

impl DownloadTarget {
    pub fn for_record(root: &Path, record: &CandidateRecord) -> Self {
        let dir = root
            .join(sanitize_component(&record.period))
            .join(sanitize_component(&record.course));
        let file_prefix = format!(
            "{}_{}",
            sanitize_component(&title_case(&record.first_name)),
            sanitize_component(&title_case(&record.last_name)),
        );
        Self { dir, file_prefix }
    }
}

/// The sole cross-run resumability check: any file in `dir` whose name
/// starts with `prefix` counts as an earlier completed download.
pub fn has_existing_download(dir: &Path, prefix: &str) -> anyhow::Result<bool> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(false),
        Err(err) => {
            return Err(err).with_context(|| format!("read download dir: {}", dir.display()));
        }
    };

    for entry in entries {
        let entry = entry.with_context(|| format!("read download dir: {}", dir.display()))?;
        if entry.file_name().to_string_lossy().starts_with(prefix) {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Extension for the stored file, taken from the URL's trailing path segment
/// when it carries one (query and fragment excluded), `.pdf` otherwise.
pub fn extension_from_url(raw_url: &str) -> String {
    let segment = match Url::parse(raw_url) {
        Ok(url) => url
            .path_segments()
            .and_then(|mut segments| segments.next_back().map(str::to_owned))
            .unwrap_or_default(),
        // Relative or otherwise unparseable: fall back to the raw tail.
        Err(_) => raw_url.rsplit('/').next().unwrap_or_default().to_owned(),
    };

    match segment.rsplit_once('.') {
        Some((_, ext)) if !ext.is_empty() => format!(".{ext}"),
        _ => ".pdf".to_owned(),
    }
}
