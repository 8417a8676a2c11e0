//! Directory-backed resource store.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use tokio::fs::File;

use crate::store::{is_plain_name, Resource, ResourceStore, StoreError};

/// Serves regular files from a single content root.
#[derive(Debug, Clone)]
pub struct DirectoryStore {
    root: PathBuf,
}

impl DirectoryStore {
    /// Resolve the content root once, at startup.
    pub fn new(root: impl AsRef<Path>) -> std::io::Result<Self> {
        let root = root.as_ref().canonicalize()?;
        if !root.is_dir() {
            return Err(std::io::Error::new(
                ErrorKind::InvalidInput,
                format!("{} is not a directory", root.display()),
            ));
        }
        tracing::info!(root = %root.display(), "Content root resolved");
        Ok(Self { root })
    }

    fn display_path(&self, name: &str) -> String {
        let dir = self
            .root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        format!("{dir}/{name}")
    }

    async fn open_file(&self, name: &str) -> Result<Resource, StoreError> {
        let not_found = || StoreError::NotFound {
            path: self.display_path(name),
        };
        if !is_plain_name(name) {
            return Err(not_found());
        }

        let path = self.root.join(name);
        let file = match File::open(&path).await {
            Ok(file) => file,
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "Open failed");
                return Err(not_found());
            }
        };

        let metadata = file.metadata().await.map_err(|source| StoreError::Stat {
            name: name.to_string(),
            source,
        })?;
        if !metadata.is_file() {
            return Err(not_found());
        }

        Ok(Resource::new(name, metadata.len(), file))
    }
}

impl ResourceStore for DirectoryStore {
    fn open<'a>(&'a self, name: &'a str) -> BoxFuture<'a, Result<Resource, StoreError>> {
        self.open_file(name).boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;

    fn fixture() -> (tempfile::TempDir, DirectoryStore) {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.bin"), b"0123456789").unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        let store = DirectoryStore::new(dir.path()).unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn opens_file_with_size() {
        let (_dir, store) = fixture();
        let mut resource = store.open("a.bin").await.unwrap();
        assert_eq!(resource.name, "a.bin");
        assert_eq!(resource.size, 10);

        let mut body = Vec::new();
        resource.reader.read_to_end(&mut body).await.unwrap();
        assert_eq!(body, b"0123456789");
    }

    #[tokio::test]
    async fn missing_file_names_path() {
        let (dir, store) = fixture();
        let err = store.open("missing.bin").await.unwrap_err();
        let dir_name = dir.path().file_name().unwrap().to_string_lossy().into_owned();
        match err {
            StoreError::NotFound { path } => assert_eq!(path, format!("{dir_name}/missing.bin")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn rejects_traversal_and_directories() {
        let (_dir, store) = fixture();
        for name in ["../a.bin", "..", "nested", "nested/a.bin", ""] {
            assert!(
                matches!(store.open(name).await, Err(StoreError::NotFound { .. })),
                "{name} should not resolve"
            );
        }
    }

    #[test]
    fn root_must_exist() {
        assert!(DirectoryStore::new("/definitely/not/here").is_err());
    }
}
