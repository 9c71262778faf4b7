//! JSON artifact files: model, encoder, feature columns and stage documents.
//!
//! Each stage overwrites its own file wholesale. Writes go to a sibling
//! temp file first and are renamed into place so a reader never sees a
//! half-written document.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    #[error("artifact not found: {}", .0.display())]
    Missing(PathBuf),
    #[error("artifact I/O error ({}): {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("artifact JSON error ({}): {source}", .path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl ArtifactError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Serialize `value` as pretty JSON to `path`, creating parent directories.
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), ArtifactError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| ArtifactError::io(parent, e))?;
    }

    let json = serde_json::to_vec_pretty(value).map_err(|source| ArtifactError::Json {
        path: path.to_path_buf(),
        source,
    })?;

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    std::fs::write(&tmp, &json).map_err(|e| ArtifactError::io(&tmp, e))?;
    std::fs::rename(&tmp, path).map_err(|e| ArtifactError::io(path, e))?;

    debug!(path = %path.display(), bytes = json.len(), "Artifact written");
    Ok(())
}

/// Read and deserialize a JSON artifact. A missing file is `Missing`.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, ArtifactError> {
    let bytes = match std::fs::read(path) {
        Ok(b) => b,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ArtifactError::Missing(path.to_path_buf()))
        }
        Err(e) => return Err(ArtifactError::io(path, e)),
    };
    serde_json::from_slice(&bytes).map_err(|source| ArtifactError::Json {
        path: path.to_path_buf(),
        source,
    })
}

/// Like [`read_json`] but maps a missing file to `None`.
pub fn read_json_opt<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, ArtifactError> {
    match read_json(path) {
        Ok(v) => Ok(Some(v)),
        Err(ArtifactError::Missing(_)) => Ok(None),
        Err(e) => Err(e),
    }
}
