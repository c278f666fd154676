//! Writing report bytes to disk.

use std::path::{Path, PathBuf};

use testify_core::error::ExamError;

/// Persists report bytes under a suggested file name.
pub trait Persister {
    /// Write `bytes` and return where they ended up.
    fn persist(&self, suggested_name: &str, bytes: &[u8]) -> Result<PathBuf, ExamError>;
}

/// Writes into a primary directory, retrying in a fallback directory when
/// the primary write fails.
#[derive(Debug, Clone)]
pub struct DirectoryPersister {
    primary: PathBuf,
    fallback: Option<PathBuf>,
}

impl DirectoryPersister {
    pub fn new(primary: impl Into<PathBuf>) -> Self {
        Self {
            primary: primary.into(),
            fallback: None,
        }
    }

    pub fn with_fallback(mut self, dir: impl Into<PathBuf>) -> Self {
        self.fallback = Some(dir.into());
        self
    }
}

impl Persister for DirectoryPersister {
    fn persist(&self, suggested_name: &str, bytes: &[u8]) -> Result<PathBuf, ExamError> {
        match write_into(&self.primary, suggested_name, bytes) {
            Ok(path) => Ok(path),
            Err(err) => {
                let Some(fallback) = &self.fallback else {
                    return Err(err);
                };
                tracing::warn!("{err}; falling back to {}", fallback.display());
                write_into(fallback, suggested_name, bytes)
            }
        }
    }
}

fn write_into(dir: &Path, name: &str, bytes: &[u8]) -> Result<PathBuf, ExamError> {
    let path = dir.join(name);
    let persistence = |source: std::io::Error| ExamError::Persistence {
        path: path.clone(),
        source,
    };
    std::fs::create_dir_all(dir).map_err(persistence)?;
    std::fs::write(&path, bytes).map_err(persistence)?;
    Ok(path)
}
