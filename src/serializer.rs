//! Save and load orchestration.
//!
//! Each batch runs in two stages separated by a single fan-in:
//!
//! - save: encode all meshes, then write all chunk files;
//! - load: read all chunk files, then decode all buffers.
//!
//! Within a stage every item is independent and runs concurrently. Per-item
//! failures are collected into the returned report and logged; they never
//! abort sibling items.

use std::sync::Arc;

use crate::buffer::{ChunkBuffer, SourceMesh};
use crate::cancellation::CancellationToken;
use crate::codec_jobs::{DecodeJob, EncodeJob};
use crate::config::SerializerConfig;
use crate::error::{SerializerError, SerializerResult};
use crate::job::{JobHandle, JobRunner, join_all, join_jobs};
use crate::localization::Localizer;
use crate::mesh::MeshHandle;
use crate::pose::Pose;
use crate::store::{ChunkStore, FileSystemStore, StoreFuture, path};

const CHUNK_PREFIX: &str = "chunk-";
const CHUNK_EXTENSION: &str = ".bin";

/// File name of the `index`-th chunk in a space directory.
pub fn chunk_file_name(index: usize) -> String {
    format!("{CHUNK_PREFIX}{index}{CHUNK_EXTENSION}")
}

fn chunk_ordinal(chunk_id: &str) -> Option<u64> {
    chunk_id.strip_prefix(CHUNK_PREFIX)?.parse().ok()
}

/// One item of a batch that did not make it.
#[derive(Debug)]
pub struct ChunkFailure {
    /// Chunk identifier (file stem, e.g. `chunk-2`).
    pub chunk: String,
    pub error: SerializerError,
}

/// Outcome of a save batch.
#[derive(Debug)]
pub struct SaveReport {
    pub space_id: String,
    /// Chunk identifiers that were written, in index order.
    pub written: Vec<String>,
    pub failures: Vec<ChunkFailure>,
}

impl SaveReport {
    /// Whether every chunk in the batch was written.
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Outcome of a load batch.
#[derive(Debug, Default)]
pub struct LoadReport {
    /// Decoded meshes, ordered by chunk ordinal.
    pub meshes: Vec<MeshHandle>,
    pub failures: Vec<ChunkFailure>,
}

impl LoadReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// Drop the diagnostics and keep whatever decoded.
    pub fn into_meshes(self) -> Vec<MeshHandle> {
        self.meshes
    }
}

/// Serializes mesh batches to per-space chunk directories and back.
///
/// Chunk files live at `<meshes_dir>/<space_id>/chunk-<n>.bin` inside the
/// store. Space identifiers must be plain directory names.
pub struct MeshSerializer {
    runner: JobRunner,
    store: Arc<dyn ChunkStore>,
    meshes_dir: String,
}

impl MeshSerializer {
    /// Serializer over an arbitrary store.
    ///
    /// `meshes_dir` may be empty to keep space directories at the store root.
    pub fn new(
        runner: JobRunner,
        store: Arc<dyn ChunkStore>,
        meshes_dir: &str,
    ) -> SerializerResult<Self> {
        let meshes_dir = if meshes_dir.trim_matches('/').is_empty() {
            String::new()
        } else {
            path::normalize(meshes_dir)
                .map_err(|e| SerializerError::Config(format!("meshes_dir: {e}")))?
        };
        Ok(Self {
            runner,
            store,
            meshes_dir,
        })
    }

    /// Filesystem-backed serializer with its own runtime, built from config.
    pub fn from_config(config: &SerializerConfig) -> SerializerResult<Self> {
        let runner = JobRunner::new(config.worker_threads, config.blocking_threads)?;
        log::info!(
            "Mesh store at {}/{}",
            config.root.display(),
            config.meshes_dir
        );
        Self::new(
            runner,
            Arc::new(FileSystemStore::new(&config.root)),
            &config.meshes_dir,
        )
    }

    pub fn runner(&self) -> &JobRunner {
        &self.runner
    }

    /// Store path of a space directory.
    pub fn space_dir(&self, space_id: &str) -> SerializerResult<String> {
        if !path::is_valid_space_id(space_id) {
            return Err(SerializerError::InvalidSpaceId(space_id.to_owned()));
        }
        path::normalize(&path::join(&self.meshes_dir, space_id))
            .map_err(|_| SerializerError::InvalidSpaceId(space_id.to_owned()))
    }

    /// Spawn a store future on the runner and await it.
    async fn run_store<T: Send + 'static>(
        &self,
        path: &str,
        future: StoreFuture<T>,
    ) -> SerializerResult<T> {
        self.runner
            .run_io(future)
            .await?
            .map_err(|e| SerializerError::io(path, e))
    }

    /// Encode every mesh with a non-zero vertex count into a chunk.
    ///
    /// The same `pose` is written into every chunk of the batch. Output order
    /// follows input order with empty meshes skipped.
    pub async fn serialize_meshes(
        &self,
        meshes: &[SourceMesh],
        pose: Pose,
    ) -> SerializerResult<Vec<ChunkBuffer>> {
        let handles: Vec<_> = meshes
            .iter()
            .filter(|mesh| mesh.vertex_count() > 0)
            .map(|mesh| self.runner.schedule(EncodeJob::new(mesh.clone(), pose)))
            .collect();
        let skipped = meshes.len() - handles.len();
        if skipped > 0 {
            log::debug!("Skipped {skipped} mesh(es) without vertices");
        }

        join_jobs(handles).await.into_iter().collect()
    }

    /// Replace the contents of a space directory with `chunks`.
    pub async fn save(
        &self,
        space_id: &str,
        chunks: Vec<ChunkBuffer>,
    ) -> SerializerResult<SaveReport> {
        self.save_cancellable(space_id, chunks, &CancellationToken::new())
            .await
    }

    /// [`save`](Self::save) with a cancellation token checked before each
    /// file write is issued.
    ///
    /// The old directory is always removed and recreated before any chunk is
    /// written. Chunks whose write was never issued are reported as
    /// [`SerializerError::Cancelled`].
    pub async fn save_cancellable(
        &self,
        space_id: &str,
        chunks: Vec<ChunkBuffer>,
        token: &CancellationToken,
    ) -> SerializerResult<SaveReport> {
        let dir = self.space_dir(space_id)?;

        self.run_store(&dir, self.store.remove_dir_all(&dir)).await?;
        self.run_store(&dir, self.store.create_dir(&dir)).await?;

        let mut failures = Vec::new();
        let mut pending = Vec::with_capacity(chunks.len());
        for (index, chunk) in chunks.into_iter().enumerate() {
            let chunk_id = format!("{CHUNK_PREFIX}{index}");
            if let Err(error) = token.check() {
                failures.push(ChunkFailure {
                    chunk: chunk_id,
                    error,
                });
                continue;
            }
            let file = path::join(&dir, &chunk_file_name(index));
            let task = self
                .runner
                .run_io(self.store.write(&file, chunk.into_bytes()));
            pending.push(((chunk_id, file), task));
        }

        let (ids, tasks): (Vec<_>, Vec<_>) = pending.into_iter().unzip();
        let mut written = Vec::with_capacity(ids.len());
        for ((chunk_id, file), result) in ids.into_iter().zip(join_all(tasks).await) {
            match result.and_then(|r| r.map_err(|e| SerializerError::io(&file, e))) {
                Ok(()) => written.push(chunk_id),
                Err(error) => {
                    log::error!("Failed to write {file}: {error}");
                    failures.push(ChunkFailure {
                        chunk: chunk_id,
                        error,
                    });
                }
            }
        }
        failures.sort_by_key(|f| chunk_ordinal(&f.chunk));

        if failures.is_empty() {
            log::info!("Saved {} chunk(s) to {dir}", written.len());
        } else {
            log::error!(
                "Saved {} chunk(s) to {dir}, {} failed",
                written.len(),
                failures.len()
            );
        }

        Ok(SaveReport {
            space_id: space_id.to_owned(),
            written,
            failures,
        })
    }

    /// Load every chunk saved for `space_id`.
    ///
    /// Returns `Ok(None)` when the space has no chunk files (including when
    /// its directory does not exist).
    pub async fn load(&self, space_id: &str) -> SerializerResult<Option<LoadReport>> {
        self.load_cancellable(space_id, &CancellationToken::new())
            .await
    }

    /// [`load`](Self::load) with a cancellation token checked before each
    /// file read is issued.
    pub async fn load_cancellable(
        &self,
        space_id: &str,
        token: &CancellationToken,
    ) -> SerializerResult<Option<LoadReport>> {
        let dir = self.space_dir(space_id)?;
        let entries = self.run_store(&dir, self.store.list_dir(&dir)).await?;

        let mut chunk_ids = Vec::new();
        for entry in entries {
            match entry.strip_suffix(CHUNK_EXTENSION) {
                Some(stem) if !stem.is_empty() => chunk_ids.push(stem.to_owned()),
                _ => log::debug!("Ignoring non-chunk entry {entry} in {dir}"),
            }
        }
        if chunk_ids.is_empty() {
            log::info!("No saved meshes for space {space_id}");
            return Ok(None);
        }

        let mut failures = Vec::new();
        let mut reads = Vec::with_capacity(chunk_ids.len());
        for chunk_id in chunk_ids {
            if let Err(error) = token.check() {
                failures.push(ChunkFailure {
                    chunk: chunk_id,
                    error,
                });
                continue;
            }
            let file = path::join(&dir, &format!("{chunk_id}{CHUNK_EXTENSION}"));
            let task = self.runner.run_io(self.store.read(&file));
            reads.push(((chunk_id, file), task));
        }

        let (ids, tasks): (Vec<_>, Vec<_>) = reads.into_iter().unzip();
        let mut decodes = Vec::with_capacity(ids.len());
        for ((chunk_id, file), result) in ids.into_iter().zip(join_all(tasks).await) {
            match result.and_then(|r| r.map_err(|e| SerializerError::io(&file, e))) {
                Ok(bytes) => {
                    log::debug!("Read {file} ({} bytes)", bytes.len());
                    let job = DecodeJob::new(chunk_id.clone(), ChunkBuffer::from_bytes(bytes));
                    decodes.push((chunk_id, self.runner.schedule(job)));
                }
                Err(error) => failures.push(ChunkFailure {
                    chunk: chunk_id,
                    error,
                }),
            }
        }

        let mut report = collect_decoded(decodes).await;
        failures.append(&mut report.failures);
        report.failures = failures;
        sort_report(&mut report);
        log_load(&dir, &report);
        Ok(Some(report))
    }

    /// Decode already-loaded chunk buffers without touching the store.
    ///
    /// Chunk identifiers are assigned by position (`chunk-0`, `chunk-1`, ...).
    pub async fn load_chunks(&self, buffers: Vec<ChunkBuffer>) -> LoadReport {
        let decodes = buffers
            .into_iter()
            .enumerate()
            .map(|(index, buffer)| {
                let chunk_id = format!("{CHUNK_PREFIX}{index}");
                let handle = self.runner.schedule(DecodeJob::new(chunk_id.clone(), buffer));
                (chunk_id, handle)
            })
            .collect();
        let mut report = collect_decoded(decodes).await;
        sort_report(&mut report);
        report
    }

    /// Remove a space directory and all of its chunks.
    ///
    /// Deleting a space that was never saved is not an error.
    pub async fn delete(&self, space_id: &str) -> SerializerResult<()> {
        let dir = self.space_dir(space_id)?;
        self.run_store(&dir, self.store.remove_dir_all(&dir)).await?;
        log::info!("Deleted saved meshes for space {space_id}");
        Ok(())
    }

    /// Identifiers of the spaces that have a directory under the meshes dir.
    pub async fn list_spaces(&self) -> SerializerResult<Vec<String>> {
        let entries = self
            .run_store(&self.meshes_dir, self.store.list_dir(&self.meshes_dir))
            .await?;
        Ok(entries
            .into_iter()
            .filter(|name| path::is_valid_space_id(name))
            .collect())
    }

    /// Encode `meshes` with their pose expressed relative to the current
    /// space origin.
    ///
    /// `mesh_pose` is the world pose of the meshes' parent frame.
    pub async fn serialize_current(
        &self,
        meshes: &[SourceMesh],
        mesh_pose: &Pose,
        localizer: &dyn Localizer,
    ) -> SerializerResult<Vec<ChunkBuffer>> {
        let offset = localizer
            .offset_pose(mesh_pose)
            .ok_or(SerializerError::NotLocalized)?;
        self.serialize_meshes(meshes, offset).await
    }

    /// Encode and save `meshes` into the current space.
    pub async fn save_current(
        &self,
        meshes: &[SourceMesh],
        mesh_pose: &Pose,
        localizer: &dyn Localizer,
    ) -> SerializerResult<SaveReport> {
        let space_id = localizer
            .current_space_id()
            .ok_or(SerializerError::NotLocalized)?;
        let chunks = self.serialize_current(meshes, mesh_pose, localizer).await?;
        self.save(&space_id, chunks).await
    }

    /// Load the chunks saved for the current space.
    pub async fn load_current(
        &self,
        localizer: &dyn Localizer,
    ) -> SerializerResult<Option<LoadReport>> {
        let space_id = localizer
            .current_space_id()
            .ok_or(SerializerError::NotLocalized)?;
        self.load(&space_id).await
    }
}

async fn collect_decoded(decodes: Vec<(String, JobHandle<DecodeJob>)>) -> LoadReport {
    let (ids, handles): (Vec<_>, Vec<_>) = decodes.into_iter().unzip();
    let mut report = LoadReport::default();
    for (chunk_id, result) in ids.into_iter().zip(join_jobs(handles).await) {
        match result {
            Ok(mesh) => report.meshes.push(mesh),
            Err(error) => report.failures.push(ChunkFailure {
                chunk: chunk_id,
                error,
            }),
        }
    }
    report
}

fn sort_report(report: &mut LoadReport) {
    report
        .meshes
        .sort_by(|a, b| chunk_order(a.chunk_id()).cmp(&chunk_order(b.chunk_id())));
    report
        .failures
        .sort_by(|a, b| chunk_order(&a.chunk).cmp(&chunk_order(&b.chunk)));
}

/// Numbered chunks first by ordinal, anything else after by name.
fn chunk_order(chunk_id: &str) -> (bool, u64, &str) {
    match chunk_ordinal(chunk_id) {
        Some(n) => (false, n, ""),
        None => (true, 0, chunk_id),
    }
}

fn log_load(dir: &str, report: &LoadReport) {
    for failure in &report.failures {
        log::error!(
            "Failed to load {} from {dir}: {}",
            failure.chunk,
            failure.error
        );
    }
    log::info!(
        "Loaded {} mesh(es) from {dir}{}",
        report.meshes.len(),
        if report.failures.is_empty() {
            String::new()
        } else {
            format!(", {} failed", report.failures.len())
        }
    );
}
