//! Lossy, tolerance-bounded frame compression.
//!
//! # Key Components
//!
//! - [`CompressionParameters`]: tolerance, parallelism and relativity of one run
//! - [`FrameCodec`]: per-frame encode/decode seam
//! - [`QuantizingCodec`]: default error-bounded codec
//! - [`CodecContext`]: codec plus the bounded worker pool that runs it
//!
//! Frames of one chunk have no cross-frame dependency, so a chunk is encoded
//! and decoded frame-parallel inside the context's pool.

mod quantize;

pub use quantize::QuantizingCodec;

use std::fmt;

use rayon::prelude::*;
use rayon::ThreadPool;
use rtm_core::types::WindowSize;
use tracing::trace;

use crate::config::ConfigError;
use crate::error::{CollectorError, CollectorResult};

/// Codec parameters, fixed for the lifetime of one collector.
///
/// # Examples
///
/// ```
/// use rtm_checkpoint::codec::CompressionParameters;
///
/// let params = CompressionParameters::new(1e-4, 4, false).unwrap();
/// assert_eq!(params.tolerance(), 1e-4);
/// assert_eq!(params.parallelism(), 4);
///
/// // Relative mode scales the bound by the frame's peak amplitude
/// let relative = CompressionParameters::new(1e-3, 1, true).unwrap();
/// approx::assert_relative_eq!(relative.error_bound(200.0), 0.2, max_relative = 1e-6);
/// ```
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CompressionParameters {
    tolerance: f32,
    parallelism: usize,
    relative: bool,
}

impl CompressionParameters {
    /// Creates validated parameters.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if `tolerance` is not positive and finite or
    /// `parallelism` is zero.
    pub fn new(tolerance: f32, parallelism: usize, relative: bool) -> Result<Self, ConfigError> {
        if !(tolerance.is_finite() && tolerance > 0.0) {
            return Err(ConfigError::InvalidTolerance(tolerance));
        }
        if parallelism == 0 {
            return Err(ConfigError::InvalidParallelism(parallelism));
        }
        Ok(Self {
            tolerance,
            parallelism,
            relative,
        })
    }

    /// Maximum permitted per-sample reconstruction error (absolute mode) or
    /// fraction of the frame's peak amplitude (relative mode).
    #[inline]
    pub fn tolerance(&self) -> f32 {
        self.tolerance
    }

    /// Number of codec worker threads.
    #[inline]
    pub fn parallelism(&self) -> usize {
        self.parallelism
    }

    /// Returns `true` for relative tolerance.
    #[inline]
    pub fn is_relative(&self) -> bool {
        self.relative
    }

    /// Absolute error bound for a frame whose peak amplitude is `max_abs`.
    #[inline]
    pub fn error_bound(&self, max_abs: f32) -> f64 {
        if self.relative {
            self.tolerance as f64 * max_abs as f64
        } else {
            self.tolerance as f64
        }
    }
}

/// Per-frame compression seam.
///
/// Implementations must be stable: the same parameters yield the same
/// reconstruction error bound on every call.
pub trait FrameCodec: Send + Sync {
    /// Encodes one frame into a self-describing blob.
    fn compress(&self, frame: &[f32], dims: WindowSize, frame_id: usize)
        -> CollectorResult<Vec<u8>>;

    /// Decodes `blob` into `out`, which holds exactly one frame.
    fn decompress(
        &self,
        blob: &[u8],
        dims: WindowSize,
        frame_id: usize,
        out: &mut [f32],
    ) -> CollectorResult<()>;
}

/// Codec and worker pool passed explicitly into the checkpoint store.
pub struct CodecContext {
    codec: Box<dyn FrameCodec>,
    params: CompressionParameters,
    pool: ThreadPool,
}

impl CodecContext {
    /// Wraps `codec` with a pool of `params.parallelism()` workers.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ThreadPool` if the pool cannot be built.
    pub fn new(codec: Box<dyn FrameCodec>, params: CompressionParameters) -> CollectorResult<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(params.parallelism())
            .thread_name(|i| format!("rtm-codec-{i}"))
            .build()
            .map_err(|e| ConfigError::ThreadPool(e.to_string()))?;
        Ok(Self {
            codec,
            params,
            pool,
        })
    }

    /// Context running the default [`QuantizingCodec`].
    pub fn quantizing(params: CompressionParameters) -> CollectorResult<Self> {
        Self::new(Box::new(QuantizingCodec::new(params)), params)
    }

    /// Returns the codec parameters.
    pub fn params(&self) -> CompressionParameters {
        self.params
    }

    /// Encodes consecutive frames starting at global ordinal `first_frame`.
    pub fn encode_frames(
        &self,
        frames: &[f32],
        dims: WindowSize,
        first_frame: usize,
    ) -> CollectorResult<Vec<Vec<u8>>> {
        let frame_len = dims.sample_count();
        let codec = self.codec.as_ref();
        self.pool.install(|| {
            frames
                .par_chunks(frame_len)
                .enumerate()
                .map(|(i, frame)| {
                    let blob = codec.compress(frame, dims, first_frame + i)?;
                    trace!(
                        frame = first_frame + i,
                        bytes = blob.len(),
                        "frame encoded"
                    );
                    Ok(blob)
                })
                .collect()
        })
    }

    /// Decodes `blobs` into consecutive frames of `out`.
    pub fn decode_frames(
        &self,
        blobs: &[Vec<u8>],
        out: &mut [f32],
        dims: WindowSize,
        first_frame: usize,
    ) -> CollectorResult<()> {
        let frame_len = dims.sample_count();
        if blobs.len() * frame_len != out.len() {
            return Err(CollectorError::contract(format!(
                "{} blobs cannot fill {} samples of {}-sample frames",
                blobs.len(),
                out.len(),
                frame_len
            )));
        }
        let codec = self.codec.as_ref();
        self.pool.install(|| {
            out.par_chunks_mut(frame_len)
                .zip(blobs.par_iter())
                .enumerate()
                .try_for_each(|(i, (frame, blob))| {
                    codec.decompress(blob, dims, first_frame + i, frame)
                })
        })
    }
}

impl fmt::Debug for CodecContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CodecContext")
            .field("params", &self.params)
            .field("threads", &self.pool.current_num_threads())
            .finish()
    }
}
