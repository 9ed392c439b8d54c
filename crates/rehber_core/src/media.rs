//! Object store for uploaded meeting images.
//!
//! # Invariants
//! - Keys are relative, `/`-separated and never contain `..`.
//! - `put` returns the public url the stored object is served under.
//! - Meeting image keys are unique per upload, even for equal file names.

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Component, Path, PathBuf};
use uuid::Uuid;

pub const MEETING_IMAGE_PREFIX: &str = "meeting-images";
const MAX_FILE_NAME_CHARS: usize = 100;

#[derive(Debug)]
pub enum MediaError {
    InvalidKey(String),
    Io(std::io::Error),
}

impl Display for MediaError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidKey(key) => write!(f, "invalid media key `{key}`"),
            Self::Io(err) => write!(f, "media store io failure: {err}"),
        }
    }
}

impl Error for MediaError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::InvalidKey(_) => None,
        }
    }
}

impl From<std::io::Error> for MediaError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

pub trait MediaStore: Send + Sync {
    /// Stores `bytes` under `key` and returns its public url.
    fn put(&self, key: &str, bytes: &[u8]) -> Result<String, MediaError>;
    /// Removes the object under `key`. Missing objects are not an error.
    fn delete(&self, key: &str) -> Result<(), MediaError>;
}

/// Directory-backed store. Objects are served from `public_base`.
#[derive(Debug, Clone)]
pub struct FsMediaStore {
    root: PathBuf,
    public_base: String,
}

impl FsMediaStore {
    pub fn new(root: impl Into<PathBuf>, public_base: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_base: public_base.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl FsMediaStore {
    fn object_path(&self, key: &str) -> Result<PathBuf, MediaError> {
        let relative = Path::new(key);
        let valid = !key.is_empty()
            && relative
                .components()
                .all(|component| matches!(component, Component::Normal(_)));
        if !valid {
            return Err(MediaError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(relative))
    }
}

impl MediaStore for FsMediaStore {
    fn put(&self, key: &str, bytes: &[u8]) -> Result<String, MediaError> {
        let path = self.object_path(key)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, bytes)?;
        Ok(format!("{}/{}", self.public_base, key))
    }

    fn delete(&self, key: &str) -> Result<(), MediaError> {
        let path = self.object_path(key)?;
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

/// `meeting-images/<epoch_ms>-<random>-<sanitized name>`.
pub fn meeting_image_key(epoch_ms: i64, file_name: &str) -> String {
    format!(
        "{MEETING_IMAGE_PREFIX}/{epoch_ms}-{}-{}",
        Uuid::new_v4().simple(),
        sanitize_file_name(file_name)
    )
}

fn sanitize_file_name(file_name: &str) -> String {
    let base = file_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();
    let cleaned: String = base
        .chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || matches!(ch, '.' | '-' | '_') {
                ch
            } else {
                '_'
            }
        })
        .take(MAX_FILE_NAME_CHARS)
        .collect();
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "image".to_string()
    } else {
        cleaned.to_string()
    }
}
