use std::path::PathBuf;

use super::{ChunkStore, StoreFuture};

/// Store backed by the native filesystem.
///
/// The root is joined with each store path to form the on-disk path. All
/// operations use `tokio::fs`, so the returned futures must be driven by a
/// tokio runtime (the serializer's [`JobRunner`](crate::job::JobRunner)).
///
/// Traversal out of the root is prevented by path normalization upstream.
pub struct FileSystemStore {
    root: PathBuf,
}

impl FileSystemStore {
    /// Create a store rooted at `root`. The directory need not exist yet.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &std::path::Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> PathBuf {
        self.root.join(path)
    }
}

impl ChunkStore for FileSystemStore {
    fn read(&self, path: &str) -> StoreFuture<Vec<u8>> {
        let full_path = self.resolve(path);
        Box::pin(async move { Ok(tokio::fs::read(full_path).await?) })
    }

    fn list_dir(&self, path: &str) -> StoreFuture<Vec<String>> {
        let full_path = self.resolve(path);
        Box::pin(async move {
            let mut dir = match tokio::fs::read_dir(&full_path).await {
                Ok(dir) => dir,
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
                Err(err) => return Err(err.into()),
            };
            let mut entries = Vec::new();
            while let Some(entry) = dir.next_entry().await? {
                if let Some(name) = entry.file_name().to_str() {
                    entries.push(name.to_owned());
                }
            }
            entries.sort();
            Ok(entries)
        })
    }

    fn write(&self, path: &str, data: Vec<u8>) -> StoreFuture<()> {
        let full_path = self.resolve(path);
        Box::pin(async move {
            tokio::fs::write(full_path, data).await?;
            Ok(())
        })
    }

    fn create_dir(&self, path: &str) -> StoreFuture<()> {
        let full_path = self.resolve(path);
        Box::pin(async move {
            tokio::fs::create_dir_all(full_path).await?;
            Ok(())
        })
    }

    fn remove_dir_all(&self, path: &str) -> StoreFuture<()> {
        let full_path = self.resolve(path);
        Box::pin(async move {
            match tokio::fs::remove_dir_all(full_path).await {
                Ok(()) => Ok(()),
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
                Err(err) => Err(err.into()),
            }
        })
    }
}
