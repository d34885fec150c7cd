//! Turning extracted files into previews and save actions.
//!
//! A [`Preview`] is an ephemeral local copy of a file's bytes, addressable by
//! a `file://` URI. It is revocable: [`Preview::release`] deletes it and
//! reports failures, and dropping it deletes it as well. Whoever displays the
//! previews owns them and should release them once they are off screen.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::TempPath;
use tracing::{debug, error, info};

use crate::contract::FileSaver;
use crate::error::{MaterialiseError, SaveError};
use crate::extract::ExtractedFile;

/// Revocable local handle to a file's content.
#[derive(Debug)]
pub struct Preview {
    name: String,
    path: TempPath,
}

impl Preview {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn uri(&self) -> String {
        format!("file://{}", self.path.display())
    }

    /// Delete the backing file now.
    pub fn release(self) -> Result<(), MaterialiseError> {
        let name = self.name;
        self.path.close().map_err(|source| {
            error!(name = %name, error = ?source, "Failed to release preview");
            MaterialiseError::Release { name, source }
        })
    }
}

/// An extracted file ready for display and download.
#[derive(Debug)]
pub struct MaterialisedFile {
    pub file: ExtractedFile,
    pub preview: Preview,
}

impl MaterialisedFile {
    /// User-triggered save under the file's synthetic name.
    pub fn save(&self, saver: &dyn FileSaver) -> Result<PathBuf, SaveError> {
        saver.save(&self.file.name, &self.file.content)
    }

    /// Release the preview, keeping the extracted bytes.
    pub fn into_file(self) -> Result<ExtractedFile, MaterialiseError> {
        self.preview.release()?;
        Ok(self.file)
    }
}

/// Create a preview for every file.
///
/// On failure, previews created so far are dropped and therefore deleted.
pub fn materialise(files: Vec<ExtractedFile>) -> Result<Vec<MaterialisedFile>, MaterialiseError> {
    let mut out = Vec::with_capacity(files.len());
    for file in files {
        let preview = write_preview(&file)?;
        debug!(name = %file.name, path = %preview.path().display(), "Preview created");
        out.push(MaterialisedFile { file, preview });
    }
    info!(count = out.len(), "Materialised extracted files");
    Ok(out)
}

fn write_preview(file: &ExtractedFile) -> Result<Preview, MaterialiseError> {
    let to_err = |source| MaterialiseError::Preview {
        name: file.name.clone(),
        source,
    };
    let suffix = Path::new(&file.name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{e}"))
        .unwrap_or_default();
    let mut tmp = tempfile::Builder::new()
        .prefix("listing-deck-preview-")
        .suffix(&suffix)
        .tempfile()
        .map_err(to_err)?;
    tmp.write_all(&file.content).map_err(to_err)?;
    tmp.flush().map_err(to_err)?;
    Ok(Preview {
        name: file.name.clone(),
        path: tmp.into_temp_path(),
    })
}

/// Saves files into a fixed local directory.
pub struct LocalFileSaver {
    dir: PathBuf,
}

impl LocalFileSaver {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl FileSaver for LocalFileSaver {
    fn save(&self, name: &str, bytes: &[u8]) -> Result<PathBuf, SaveError> {
        let to_err = |source| SaveError {
            name: name.to_string(),
            source,
        };
        // Only the final component is kept so a name cannot escape the directory.
        let file_name = Path::new(name).file_name().ok_or_else(|| {
            to_err(io::Error::new(io::ErrorKind::InvalidInput, "name has no file component"))
        })?;
        fs::create_dir_all(&self.dir).map_err(to_err)?;
        let target = self.dir.join(file_name);
        fs::write(&target, bytes).map_err(|source| {
            error!(path = %target.display(), error = ?source, "Failed to save file");
            to_err(source)
        })?;
        info!(path = %target.display(), size = bytes.len(), "Saved file");
        Ok(target)
    }
}
