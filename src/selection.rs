//! File selections for upload, add-document, and new-session actions.
//!
//! A [`FileSelection`] plays the role of a file input: the user picks zero or
//! more paths, an action validates the pick, and the selection is reset once
//! the action is done with it.

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Largest document the service accepts (its `MAX_CONTENT_LENGTH`).
pub const MAX_UPLOAD_BYTES: u64 = 16 * 1024 * 1024;

/// Alert shown when more than one file is selected.
pub const MULTIPLE_FILES_MESSAGE: &str = "Please select only one file at a time.";

/// Alert shown when the selected file is not a PDF.
pub const NOT_PDF_MESSAGE: &str = "Please select a PDF file.";

/// Alert shown when the selected file exceeds [`MAX_UPLOAD_BYTES`].
pub const TOO_LARGE_MESSAGE: &str = "File is too large (maximum 16 MB).";

/// MIME type sent with uploads.
pub const PDF_MIME: &str = "application/pdf";

/// The files currently picked for an action.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileSelection {
    paths: Vec<PathBuf>,
}

impl FileSelection {
    /// Creates an empty selection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a selection holding a single file.
    pub fn single(path: impl Into<PathBuf>) -> Self {
        Self {
            paths: vec![path.into()],
        }
    }

    /// Returns the selected paths.
    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    /// Returns true if nothing is selected.
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Returns the number of selected files.
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    /// Resets the selection.
    pub fn clear(&mut self) {
        self.paths.clear();
    }

    /// Returns the single selected file, or a validation error for 2+ files.
    ///
    /// An empty selection yields `Ok(None)`: nothing was picked, nothing to do.
    pub fn single_file(&self) -> Result<Option<&Path>> {
        match self.paths.as_slice() {
            [] => Ok(None),
            [path] => Ok(Some(path.as_path())),
            _ => Err(Error::validation(
                MULTIPLE_FILES_MESSAGE,
                Some(format!("{} files selected", self.paths.len())),
            )),
        }
    }
}

impl<P: Into<PathBuf>> FromIterator<P> for FileSelection {
    fn from_iter<I: IntoIterator<Item = P>>(iter: I) -> Self {
        Self {
            paths: iter.into_iter().map(Into::into).collect(),
        }
    }
}

/// Returns true if the path names a PDF by extension (case-insensitive).
pub fn is_pdf(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("pdf"))
        .unwrap_or(false)
}

/// Display name used for a path in the multipart body.
pub fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Checks type and size of a single chosen file.
pub async fn check_file(path: &Path, validate_type: bool) -> Result<()> {
    if validate_type && !is_pdf(path) {
        return Err(Error::validation(
            NOT_PDF_MESSAGE,
            Some(path.display().to_string()),
        ));
    }
    let metadata = tokio::fs::metadata(path)
        .await
        .map_err(|err| Error::io(format!("cannot read {}", path.display()), err))?;
    if metadata.len() > MAX_UPLOAD_BYTES {
        return Err(Error::validation(
            TOO_LARGE_MESSAGE,
            Some(path.display().to_string()),
        ));
    }
    Ok(())
}
