use crate::error::{Error, Result};
use crate::hocr::document::Document;
use std::fs;
use std::io::Write;
use std::ops::{Deref, DerefMut};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info};

/// One hOCR document loaded from disk.
///
/// Mutations stay in memory until [`HocrContext::commit`]; dropping the
/// context without committing discards them.
#[derive(Debug)]
pub struct HocrContext {
    path: PathBuf,
    document: Document,
}

impl HocrContext {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let content = fs::read_to_string(&path)?;
        let document = Document::parse(&content)
            .map_err(|e| Error::parse(format!("{}: {}", path.display(), e)))?;
        debug!(path = %path.display(), nodes = document.len(), "opened document");
        Ok(Self { path, document })
    }

    /// Open `path`, run `f`, and write the document back only if `f` succeeds.
    pub fn session<T, E, F>(path: impl AsRef<Path>, f: F) -> std::result::Result<T, E>
    where
        F: FnOnce(&mut HocrContext) -> std::result::Result<T, E>,
        E: From<Error>,
    {
        let mut context = Self::open(path)?;
        let value = f(&mut context)?;
        context.commit()?;
        Ok(value)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.document
    }

    /// Write the document back to where it was read from.
    ///
    /// The new content goes to a temporary file in the same directory which
    /// then replaces the original, so a failed write leaves the original intact.
    pub fn commit(self) -> Result<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let mut tmp = NamedTempFile::new_in(&dir)?;
        tmp.write_all(self.document.to_xml().as_bytes())?;
        tmp.flush()?;
        if let Ok(metadata) = fs::metadata(&self.path) {
            fs::set_permissions(tmp.path(), metadata.permissions())?;
        }
        tmp.persist(&self.path).map_err(|e| Error::Io(e.error))?;

        info!(path = %self.path.display(), "wrote document");
        Ok(())
    }
}

impl Deref for HocrContext {
    type Target = Document;

    fn deref(&self) -> &Document {
        &self.document
    }
}

impl DerefMut for HocrContext {
    fn deref_mut(&mut self) -> &mut Document {
        &mut self.document
    }
}
