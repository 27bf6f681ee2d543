//! Download staging
//!
//! Turns the live resource into a file in the user's download directory.
//! Filenames come from the host and are untrusted: they get sanitized for
//! cross-platform use, given the extension their category calls for, and
//! suffixed when the destination already exists.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use anyhow::{Context, Result};
use log::info;
use regex::Regex;

use crate::decode::ContentCategory;

/// Longest base name kept after sanitizing, leaving room for extension
/// and uniqueness suffixes
const MAX_BASE_LEN: usize = 120;

/// Characters invalid on at least one supported platform, plus controls
static INVALID_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"[<>:"/\\|?*\x00-\x1F]"#).unwrap());

/// Windows device names that cannot be used as file names
static RESERVED_NAMES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(CON|PRN|AUX|NUL|COM[1-9]|LPT[1-9])$").unwrap());

/// What the host needs to save the live document
#[derive(Clone, Debug, PartialEq)]
pub struct DownloadRequest {
    /// Name the document is known by, as supplied by the host
    pub filename: String,
    /// URI of the staged resource; a filesystem path for the file host
    pub uri: String,
    pub category: ContentCategory,
}

/// Make an untrusted name safe to use as a filename on any platform
pub fn sanitize_filename(name: &str) -> String {
    let replaced = INVALID_CHARS.replace_all(name, "_");
    let trimmed = replaced.trim_matches(|c| c == ' ' || c == '.');
    if trimmed.is_empty() {
        return "document".to_string();
    }
    let capped: String = trimmed.chars().take(MAX_BASE_LEN).collect();
    if RESERVED_NAMES.is_match(&capped) {
        return format!("_{capped}");
    }
    capped
}

/// Append the category's extension unless the name already carries it
pub fn ensure_extension(name: &str, category: ContentCategory) -> String {
    let current = Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    let fits = match (&current, category) {
        // Both spellings are fine for JPEG.
        (Some(ext), ContentCategory::Jpeg) => ext == "jpg" || ext == "jpeg",
        (Some(ext), _) => ext == category.extension(),
        (None, _) => false,
    };
    if fits {
        name.to_string()
    } else {
        format!("{name}.{}", category.extension())
    }
}

/// First free path for the filename in the directory, adding " (n)"
/// before the extension when needed
pub fn unique_destination(dir: &Path, filename: &str) -> PathBuf {
    let candidate = dir.join(filename);
    if !candidate.exists() {
        return candidate;
    }
    let stem = Path::new(filename)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("document");
    let extension = Path::new(filename).extension().and_then(|e| e.to_str());
    let mut n: u32 = 1;
    loop {
        let name = match extension {
            Some(ext) => format!("{stem} ({n}).{ext}"),
            None => format!("{stem} ({n})"),
        };
        let candidate = dir.join(name);
        if !candidate.exists() {
            return candidate;
        }
        n += 1;
    }
}

/// Copy the staged document into the download directory.
///
/// The directory is created when missing. Returns the path written.
pub fn save(request: &DownloadRequest, dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(dir)
        .with_context(|| format!("creating download directory {}", dir.display()))?;
    let name = ensure_extension(&sanitize_filename(&request.filename), request.category);
    let destination = unique_destination(dir, &name);
    fs::copy(Path::new(&request.uri), &destination).with_context(|| {
        format!(
            "copying staged document {} to {}",
            request.uri,
            destination.display()
        )
    })?;
    info!(
        "saved download {} to {}",
        request.filename,
        destination.display()
    );
    Ok(destination)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_replaces_invalid_characters() {
        assert_eq!(sanitize_filename("q3: results/final"), "q3_ results_final");
        assert_eq!(sanitize_filename("a<b>c|d"), "a_b_c_d");
        assert_eq!(sanitize_filename("tab\there"), "tab_here");
    }

    #[test]
    fn sanitize_trims_dots_and_spaces() {
        assert_eq!(sanitize_filename("  draft. "), "draft");
        assert_eq!(sanitize_filename("..."), "document");
        assert_eq!(sanitize_filename(""), "document");
    }

    #[test]
    fn sanitize_escapes_reserved_device_names() {
        assert_eq!(sanitize_filename("CON"), "_CON");
        assert_eq!(sanitize_filename("lpt3"), "_lpt3");
        assert_eq!(sanitize_filename("console"), "console");
    }

    #[test]
    fn sanitize_caps_length_on_char_boundaries() {
        let long: String = "ü".repeat(300);
        let capped = sanitize_filename(&long);
        assert_eq!(capped.chars().count(), MAX_BASE_LEN);
    }

    #[test]
    fn extension_added_only_when_missing() {
        assert_eq!(
            ensure_extension("report", ContentCategory::Pdf),
            "report.pdf"
        );
        assert_eq!(
            ensure_extension("report.pdf", ContentCategory::Pdf),
            "report.pdf"
        );
        assert_eq!(
            ensure_extension("report.PDF", ContentCategory::Pdf),
            "report.PDF"
        );
        assert_eq!(
            ensure_extension("photo.jpeg", ContentCategory::Jpeg),
            "photo.jpeg"
        );
        assert_eq!(
            ensure_extension("photo.png", ContentCategory::Jpeg),
            "photo.png.jpg"
        );
    }

    #[test]
    fn unique_destination_counts_up() {
        let dir = tempfile::tempdir().unwrap();
        let first = unique_destination(dir.path(), "doc.pdf");
        assert_eq!(first, dir.path().join("doc.pdf"));
        fs::write(&first, b"x").unwrap();

        let second = unique_destination(dir.path(), "doc.pdf");
        assert_eq!(second, dir.path().join("doc (1).pdf"));
        fs::write(&second, b"x").unwrap();

        let third = unique_destination(dir.path(), "doc.pdf");
        assert_eq!(third, dir.path().join("doc (2).pdf"));
    }

    #[test]
    fn save_copies_the_staged_file() {
        let staging = tempfile::tempdir().unwrap();
        let downloads = tempfile::tempdir().unwrap();
        let staged = staging.path().join("doc-1.pdf");
        fs::write(&staged, b"%PDF-1.4 body").unwrap();

        let request = DownloadRequest {
            filename: "quarterly: report".to_string(),
            uri: staged.display().to_string(),
            category: ContentCategory::Pdf,
        };
        let written = save(&request, downloads.path()).unwrap();
        assert_eq!(written, downloads.path().join("quarterly_ report.pdf"));
        assert_eq!(fs::read(&written).unwrap(), b"%PDF-1.4 body");

        let again = save(&request, downloads.path()).unwrap();
        assert_eq!(again, downloads.path().join("quarterly_ report (1).pdf"));
    }

    #[test]
    fn save_fails_cleanly_when_the_resource_is_gone() {
        let downloads = tempfile::tempdir().unwrap();
        let request = DownloadRequest {
            filename: "ghost.pdf".to_string(),
            uri: "/nonexistent/staged/doc".to_string(),
            category: ContentCategory::Pdf,
        };
        assert!(save(&request, downloads.path()).is_err());
    }
}
