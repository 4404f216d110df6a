//! PDF selection pipeline: directory walk, include/exclude filename globs,
//! and deterministic ordering.
//!
//! The pipeline keeps files with a case-insensitive `.pdf` extension, then
//! applies include patterns (a file stays when it matches at least one),
//! then exclude patterns (any match drops the file). Both stages test the
//! file name only, never the directory path. The result follows the sorted
//! walk order and can be reversed as a whole.

use std::path::{Path, PathBuf};

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use thiserror::Error;
use walkdir::WalkDir;

/// Errors raised while building filters or walking the folder.
#[derive(Debug, Error)]
pub enum SelectError {
    #[error("invalid glob pattern `{pattern}`: {detail}")]
    Pattern { pattern: String, detail: String },
    #[error("failed to read `{path}`: {detail}")]
    Walk { path: PathBuf, detail: String },
}

/// Options controlling the selection pipeline.
#[derive(Debug, Clone, Default)]
pub struct SelectOptions {
    pub recursive: bool,
    pub include: Vec<String>,
    pub exclude: Vec<String>,
    pub reverse: bool,
}

/// Walks `root` and returns the ordered list of PDFs to process. An empty
/// result is not an error; the caller decides whether that is fatal.
pub fn select_pdfs(root: &Path, options: &SelectOptions) -> Result<Vec<PathBuf>, SelectError> {
    let include = build_globs(&options.include)?;
    let exclude = build_globs(&options.exclude)?;

    let mut walker = WalkDir::new(root).sort_by_file_name();
    if !options.recursive {
        walker = walker.max_depth(1);
    }

    let mut files = Vec::new();
    for entry in walker {
        let entry = entry.map_err(|err| SelectError::Walk {
            path: err
                .path()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| root.to_path_buf()),
            detail: err.to_string(),
        })?;
        if !entry.file_type().is_file() || !has_pdf_extension(entry.path()) {
            continue;
        }
        let name = entry.file_name();
        if let Some(include) = &include {
            if !include.is_match(name) {
                continue;
            }
        }
        if let Some(exclude) = &exclude {
            if exclude.is_match(name) {
                continue;
            }
        }
        files.push(entry.into_path());
    }

    if options.reverse {
        files.reverse();
    }
    Ok(files)
}

fn has_pdf_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
}

// Case-insensitive to match Windows filename semantics.
fn build_globs(patterns: &[String]) -> Result<Option<GlobSet>, SelectError> {
    if patterns.is_empty() {
        return Ok(None);
    }
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = GlobBuilder::new(pattern)
            .case_insensitive(true)
            .build()
            .map_err(|err| SelectError::Pattern {
                pattern: pattern.clone(),
                detail: err.to_string(),
            })?;
        builder.add(glob);
    }
    let set = builder.build().map_err(|err| SelectError::Pattern {
        pattern: patterns.join(", "),
        detail: err.to_string(),
    })?;
    Ok(Some(set))
}
