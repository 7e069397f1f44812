//! Chunk persistence under a run workspace.
//!
//! # Key Components
//!
//! - [`CheckpointStore`]: writes and reads chunks of consecutive frames
//! - [`StorageMode`]: raw (bit-exact) or compressed (tolerance-bounded)
//! - [`BinaryStorage`] / [`FileStorage`]: byte persistence seam
//! - [`RunWorkspace`]: run-scoped directory with cleanup on drop
//!
//! Raw chunks are the resident bytes in native byte order, written as one
//! file per chunk. Compressed chunks are one blob per frame, keyed by global
//! frame ordinal.

mod storage;
mod workspace;

pub use storage::{BinaryStorage, FileStorage};
pub use workspace::RunWorkspace;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use rtm_core::types::WindowSize;
use tracing::{debug, warn};

use crate::codec::{CodecContext, CompressionParameters};
use crate::error::{CollectorError, CollectorResult};

/// Chunk encoding, selected once per store.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum StorageMode {
    /// Resident bytes written unmodified.
    Raw,
    /// Per-frame lossy compression.
    Compressed(CompressionParameters),
}

/// I/O volume counters for the current run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StoreStats {
    /// Chunks persisted
    pub chunks_written: usize,
    /// Chunks reloaded
    pub chunks_read: usize,
    /// Frames passed through the encoder
    pub frames_encoded: usize,
    /// Frames passed through the decoder
    pub frames_decoded: usize,
    /// Bytes handed to storage
    pub bytes_written: u64,
    /// Bytes read back from storage
    pub bytes_read: u64,
}

impl StoreStats {
    /// Returns `true` when no chunk was written or read.
    pub fn is_idle(&self) -> bool {
        self.chunks_written == 0 && self.chunks_read == 0
    }
}

#[derive(Clone, Copy, Debug)]
struct ChunkRecord {
    first_frame: usize,
    frames: usize,
}

/// Persists chunks of frames for one collector.
///
/// # Example
///
/// ```rust
/// use rtm_checkpoint::store::{CheckpointStore, RunWorkspace, StorageMode};
/// use rtm_core::types::WindowSize;
///
/// let root = tempfile::tempdir().unwrap();
/// let workspace = RunWorkspace::create(root.path(), false).unwrap();
/// let mut store = CheckpointStore::open(workspace, StorageMode::Raw).unwrap();
///
/// let dims = WindowSize::new(4, 1, 2);
/// store.begin_run(dims).unwrap();
///
/// let frames: Vec<f32> = (0..16).map(|i| i as f32).collect();
/// store.write_chunk(0, 0, &frames).unwrap();
///
/// let mut out = vec![0.0; 16];
/// store.read_chunk(0, &mut out).unwrap();
/// assert_eq!(out, frames);
/// ```
pub struct CheckpointStore {
    workspace: RunWorkspace,
    storage: Box<dyn BinaryStorage>,
    codec: Option<CodecContext>,
    dims: Option<WindowSize>,
    records: BTreeMap<usize, ChunkRecord>,
    stats: StoreStats,
}

impl CheckpointStore {
    /// Opens a store with file storage and the default codec for `mode`.
    pub fn open(workspace: RunWorkspace, mode: StorageMode) -> CollectorResult<Self> {
        let codec = match mode {
            StorageMode::Raw => None,
            StorageMode::Compressed(params) => Some(CodecContext::quantizing(params)?),
        };
        Ok(Self::with_backends(workspace, Box::new(FileStorage), codec))
    }

    /// Opens a store over explicit backends; `codec = None` selects raw mode.
    pub fn with_backends(
        workspace: RunWorkspace,
        storage: Box<dyn BinaryStorage>,
        codec: Option<CodecContext>,
    ) -> Self {
        Self {
            workspace,
            storage,
            codec,
            dims: None,
            records: BTreeMap::new(),
            stats: StoreStats::default(),
        }
    }

    /// Encoding in use.
    pub fn mode(&self) -> StorageMode {
        match &self.codec {
            Some(ctx) => StorageMode::Compressed(ctx.params()),
            None => StorageMode::Raw,
        }
    }

    /// Run workspace directory.
    pub fn workspace_path(&self) -> &Path {
        self.workspace.path()
    }

    /// Counters of the current run.
    pub fn stats(&self) -> StoreStats {
        self.stats
    }

    /// Number of chunks written in the current run.
    pub fn chunk_count(&self) -> usize {
        self.records.len()
    }

    /// Starts a new run: removes the previous run's files and records.
    pub fn begin_run(&mut self, dims: WindowSize) -> CollectorResult<()> {
        let records = std::mem::take(&mut self.records);
        for (&chunk, record) in &records {
            if self.codec.is_some() {
                for frame in record.first_frame..record.first_frame + record.frames {
                    self.storage.remove(&self.workspace.frame_blob_path(frame))?;
                }
            } else {
                self.storage.remove(&self.workspace.chunk_path(chunk))?;
            }
        }
        if !records.is_empty() {
            debug!(chunks = records.len(), "previous run purged");
        }

        self.dims = Some(dims);
        self.stats = StoreStats::default();
        Ok(())
    }

    fn frame_len(&self) -> CollectorResult<(WindowSize, usize)> {
        let dims = self
            .dims
            .ok_or_else(|| CollectorError::contract("chunk access before begin_run"))?;
        Ok((dims, dims.sample_count()))
    }

    /// Persists `frames`, consecutive frames starting at `first_frame`, as
    /// chunk `chunk_index`.
    ///
    /// # Errors
    ///
    /// - `ContractViolation` if no run is active or `frames` is not a
    ///   non-empty whole number of frames
    /// - `StorageIoFailure` / `CompressionFailure` from the backends
    pub fn write_chunk(
        &mut self,
        chunk_index: usize,
        first_frame: usize,
        frames: &[f32],
    ) -> CollectorResult<()> {
        let (dims, frame_len) = self.frame_len()?;
        if frames.is_empty() || frames.len() % frame_len != 0 {
            return Err(CollectorError::contract(format!(
                "chunk {} holds {} samples, not a whole number of {}-sample frames",
                chunk_index,
                frames.len(),
                frame_len
            )));
        }
        let count = frames.len() / frame_len;

        match &self.codec {
            None => {
                let bytes: &[u8] = bytemuck::cast_slice(frames);
                let path = self.workspace.chunk_path(chunk_index);
                if let Err(err) = self.storage.save(&path, bytes) {
                    self.discard(&[path]);
                    return Err(err);
                }
                self.stats.bytes_written += bytes.len() as u64;
            }
            Some(ctx) => {
                let blobs = ctx.encode_frames(frames, dims, first_frame)?;
                for (i, blob) in blobs.iter().enumerate() {
                    let path = self.workspace.frame_blob_path(first_frame + i);
                    if let Err(err) = self.storage.save(&path, blob) {
                        // Blobs of an unrecorded chunk would escape the next purge
                        let written: Vec<PathBuf> = (first_frame..=first_frame + i)
                            .map(|frame| self.workspace.frame_blob_path(frame))
                            .collect();
                        self.discard(&written);
                        return Err(err);
                    }
                    self.stats.bytes_written += blob.len() as u64;
                }
                self.stats.frames_encoded += count;
            }
        }

        self.records.insert(
            chunk_index,
            ChunkRecord {
                first_frame,
                frames: count,
            },
        );
        self.stats.chunks_written += 1;
        debug!(chunk = chunk_index, first_frame, frames = count, "chunk written");
        Ok(())
    }

    /// Removes files of a chunk whose write failed.
    fn discard(&self, paths: &[PathBuf]) {
        for path in paths {
            if let Err(err) = self.storage.remove(path) {
                warn!(path = %path.display(), error = %err, "cannot remove partial chunk file");
            }
        }
    }

    /// Restores chunk `chunk_index` into `out`, which must hold exactly its
    /// frames. Returns the frame count.
    ///
    /// # Errors
    ///
    /// - `ContractViolation` if the chunk was not written in the current run
    ///   or `out` has the wrong size
    /// - `StorageIoFailure` / `CompressionFailure` from the backends
    pub fn read_chunk(&mut self, chunk_index: usize, out: &mut [f32]) -> CollectorResult<usize> {
        let (dims, frame_len) = self.frame_len()?;
        let record = *self.records.get(&chunk_index).ok_or_else(|| {
            CollectorError::contract(format!("chunk {} was not written in this run", chunk_index))
        })?;
        if out.len() != record.frames * frame_len {
            return Err(CollectorError::contract(format!(
                "chunk {} holds {} frames, output has room for {} samples",
                chunk_index,
                record.frames,
                out.len()
            )));
        }

        match &self.codec {
            None => {
                let bytes: &mut [u8] = bytemuck::cast_slice_mut(out);
                self.storage
                    .load(&self.workspace.chunk_path(chunk_index), bytes)?;
                self.stats.bytes_read += bytes.len() as u64;
            }
            Some(ctx) => {
                let blobs = (record.first_frame..record.first_frame + record.frames)
                    .map(|frame| self.storage.load_to_end(&self.workspace.frame_blob_path(frame)))
                    .collect::<CollectorResult<Vec<_>>>()?;
                self.stats.bytes_read += blobs.iter().map(|b| b.len() as u64).sum::<u64>();
                ctx.decode_frames(&blobs, out, dims, record.first_frame)?;
                self.stats.frames_decoded += record.frames;
            }
        }

        self.stats.chunks_read += 1;
        debug!(chunk = chunk_index, frames = record.frames, "chunk reloaded");
        Ok(record.frames)
    }
}

impl std::fmt::Debug for CheckpointStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CheckpointStore")
            .field("workspace", &self.workspace.path())
            .field("mode", &self.mode())
            .field("chunks", &self.records.len())
            .field("stats", &self.stats)
            .finish()
    }
}
