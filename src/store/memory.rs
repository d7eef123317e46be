use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::Arc;

use parking_lot::RwLock;

use super::{ChunkStore, StoreError, StoreFuture};

/// In-memory store for tests and tools.
///
/// Cheap to clone; clones share the same contents, so a test can keep one
/// handle for inspection while the serializer owns another. Directories are
/// tracked explicitly so "directory exists but is empty" is observable.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<MemoryInner>>,
}

#[derive(Default)]
struct MemoryInner {
    files: BTreeMap<String, Vec<u8>>,
    dirs: BTreeSet<String>,
    failing_writes: HashSet<String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a file directly, creating its parent directories.
    pub fn insert(&self, path: impl Into<String>, data: Vec<u8>) {
        let path = path.into();
        let mut inner = self.inner.write();
        inner.add_parents(&path);
        inner.files.insert(path, data);
    }

    /// Contents of a file, if present.
    pub fn get(&self, path: &str) -> Option<Vec<u8>> {
        self.inner.read().files.get(path).cloned()
    }

    /// All file paths, sorted.
    pub fn files(&self) -> Vec<String> {
        self.inner.read().files.keys().cloned().collect()
    }

    /// Make every future write to `path` fail with an IO error.
    pub fn fail_writes_to(&self, path: impl Into<String>) {
        self.inner.write().failing_writes.insert(path.into());
    }
}

impl MemoryInner {
    fn add_parents(&mut self, path: &str) {
        let mut end = 0;
        while let Some(pos) = path[end..].find('/') {
            end += pos;
            self.dirs.insert(path[..end].to_owned());
            end += 1;
        }
    }

    fn is_dir(&self, path: &str) -> bool {
        path.is_empty() || self.dirs.contains(path)
    }
}

fn child_prefix(path: &str) -> String {
    if path.is_empty() {
        String::new()
    } else {
        format!("{path}/")
    }
}

impl ChunkStore for MemoryStore {
    fn read(&self, path: &str) -> StoreFuture<Vec<u8>> {
        let inner = self.inner.clone();
        let path = path.to_owned();
        Box::pin(async move {
            let inner = inner.read();
            inner
                .files
                .get(&path)
                .cloned()
                .ok_or(StoreError::NotFound(path))
        })
    }

    fn list_dir(&self, path: &str) -> StoreFuture<Vec<String>> {
        let inner = self.inner.clone();
        let path = path.to_owned();
        Box::pin(async move {
            let inner = inner.read();
            let prefix = child_prefix(&path);
            let mut children = BTreeSet::new();
            let keys = inner.files.keys().chain(inner.dirs.iter());
            for key in keys {
                if let Some(rest) = key.strip_prefix(&prefix) {
                    let child = match rest.find('/') {
                        Some(pos) => &rest[..pos],
                        None => rest,
                    };
                    if !child.is_empty() {
                        children.insert(child.to_owned());
                    }
                }
            }
            Ok(children.into_iter().collect())
        })
    }

    fn write(&self, path: &str, data: Vec<u8>) -> StoreFuture<()> {
        let inner = self.inner.clone();
        let path = path.to_owned();
        Box::pin(async move {
            let mut inner = inner.write();
            if inner.failing_writes.contains(&path) {
                return Err(StoreError::Io(std::io::Error::other(format!(
                    "injected write failure for {path}"
                ))));
            }
            let parent = path.rsplit_once('/').map_or("", |(parent, _)| parent);
            if !inner.is_dir(parent) {
                return Err(StoreError::NotFound(parent.to_owned()));
            }
            inner.files.insert(path, data);
            Ok(())
        })
    }

    fn create_dir(&self, path: &str) -> StoreFuture<()> {
        let inner = self.inner.clone();
        let path = path.to_owned();
        Box::pin(async move {
            let mut inner = inner.write();
            inner.add_parents(&path);
            inner.dirs.insert(path);
            Ok(())
        })
    }

    fn remove_dir_all(&self, path: &str) -> StoreFuture<()> {
        let inner = self.inner.clone();
        let path = path.to_owned();
        Box::pin(async move {
            let mut inner = inner.write();
            let prefix = child_prefix(&path);
            inner.files.retain(|key, _| !key.starts_with(&prefix));
            inner
                .dirs
                .retain(|dir| dir != &path && !dir.starts_with(&prefix));
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block_on<T>(fut: StoreFuture<T>) -> Result<T, StoreError> {
        tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap()
            .block_on(fut)
    }

    #[test]
    fn write_requires_parent_dir() {
        let store = MemoryStore::new();
        assert!(block_on(store.write("meshes/a/chunk-0.bin", vec![1])).is_err());

        block_on(store.create_dir("meshes/a")).unwrap();
        block_on(store.write("meshes/a/chunk-0.bin", vec![1])).unwrap();
        assert_eq!(store.get("meshes/a/chunk-0.bin"), Some(vec![1]));
    }

    #[test]
    fn list_dir_shows_files_and_subdirs() {
        let store = MemoryStore::new();
        store.insert("meshes/a/chunk-0.bin", vec![]);
        block_on(store.create_dir("meshes/empty")).unwrap();

        assert_eq!(
            block_on(store.list_dir("meshes")).unwrap(),
            vec!["a".to_owned(), "empty".to_owned()]
        );
        assert_eq!(
            block_on(store.list_dir("meshes/a")).unwrap(),
            vec!["chunk-0.bin".to_owned()]
        );
        assert!(block_on(store.list_dir("missing")).unwrap().is_empty());
    }

    #[test]
    fn remove_dir_all_drops_subtree_only() {
        let store = MemoryStore::new();
        store.insert("meshes/a/chunk-0.bin", vec![]);
        store.insert("meshes/ab/chunk-0.bin", vec![]);

        block_on(store.remove_dir_all("meshes/a")).unwrap();

        assert_eq!(store.files(), vec!["meshes/ab/chunk-0.bin".to_owned()]);
        assert_eq!(
            block_on(store.list_dir("meshes")).unwrap(),
            vec!["ab".to_owned()]
        );
    }

    #[test]
    fn injected_write_failure() {
        let store = MemoryStore::new();
        block_on(store.create_dir("d")).unwrap();
        store.fail_writes_to("d/x.bin");
        assert!(matches!(
            block_on(store.write("d/x.bin", vec![])),
            Err(StoreError::Io(_))
        ));
        block_on(store.write("d/y.bin", vec![])).unwrap();
    }

    #[test]
    fn clones_share_contents() {
        let store = MemoryStore::new();
        let other = store.clone();
        other.insert("f.bin", vec![9]);
        assert_eq!(store.get("f.bin"), Some(vec![9]));
    }
}
