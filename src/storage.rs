use chrono::Utc;
use serde::Serialize;
use std::io;
use std::path::{Component, Path, PathBuf};
use tokio::fs;

#[derive(Clone, Debug)]
pub struct Storage {
    root: PathBuf,
}

impl Storage {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub async fn ensure_root(&self) -> io::Result<()> {
        fs::create_dir_all(&self.root).await
    }

    pub fn root_path(&self) -> &Path {
        &self.root
    }

    /// Builds the stored name for an incoming file: millisecond timestamp,
    /// a dash, then the final path component of the client-supplied name.
    pub fn generate_name(&self, original_name: &str) -> Result<String, StorageError> {
        let base = Path::new(original_name.trim())
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .ok_or(StorageError::InvalidName)?;
        if base.is_empty() || base == "." || base == ".." {
            return Err(StorageError::InvalidName);
        }
        Ok(format!("{}-{}", Utc::now().timestamp_millis(), base))
    }

    /// Resolves a stored name under the upload root. Names are flat: anything
    /// with separators or parent components is rejected.
    pub fn resolve_stored(&self, name: &str) -> Result<PathBuf, StorageError> {
        let mut components = Path::new(name).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(_)), None) => Ok(self.root.join(name)),
            _ => Err(StorageError::InvalidName),
        }
    }

    pub async fn list(&self) -> Result<Vec<StoredFile>, StorageError> {
        let mut dir = fs::read_dir(&self.root).await?;
        let mut files = Vec::new();

        while let Some(entry) = dir.next_entry().await? {
            let metadata = entry.metadata().await?;
            if !metadata.is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().to_string();
            if name.starts_with('.') {
                continue;
            }
            files.push(StoredFile::new(name));
        }

        // Timestamp prefixes make name order equal creation order.
        files.sort_by(|a, b| a.name.cmp(&b.name));

        Ok(files)
    }
}

#[derive(Debug)]
pub enum StorageError {
    InvalidName,
    Io(io::Error),
}

impl From<io::Error> for StorageError {
    fn from(err: io::Error) -> Self {
        StorageError::Io(err)
    }
}

#[derive(Serialize, Debug, Clone)]
pub struct StoredFile {
    pub name: String,
    pub url: String,
}

impl StoredFile {
    pub fn new(name: String) -> Self {
        let url = format!("/uploads/{name}");
        Self { name, url }
    }
}
