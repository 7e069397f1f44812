//! Error-bounded quantising codec.
//!
//! Samples are rounded to multiples of a quantisation step equal to the
//! effective error bound, delta coded against their predecessor, zigzag and
//! varint packed, then entropy coded with zstd.
//!
//! Blob layout (little-endian):
//!
//! | offset | size | field                         |
//! |--------|------|-------------------------------|
//! | 0      | 4    | magic `RTMQ`                  |
//! | 4      | 1    | format version                |
//! | 5      | 1    | flags (bit 0: relative)       |
//! | 6      | 2    | reserved                      |
//! | 8      | 8    | global frame ordinal          |
//! | 16     | 24   | window nx, ny, nz             |
//! | 40     | 8    | sample count                  |
//! | 48     | 8    | quantisation step (`f64`)     |
//! | 56     | 8    | packed length before zstd     |
//! | 64     | ..   | zstd payload                  |

use rtm_core::types::WindowSize;

use super::{CompressionParameters, FrameCodec};
use crate::error::{CollectorError, CollectorResult};

const MAGIC: &[u8; 4] = b"RTMQ";
const VERSION: u8 = 1;
const FLAG_RELATIVE: u8 = 0b0000_0001;
const HEADER_LEN: usize = 64;
const ZSTD_LEVEL: i32 = 3;

/// Largest quantised magnitude; keeps deltas and `f64` products exact.
const MAX_QUANTIZED: f64 = (1u64 << 52) as f64;

/// Default [`FrameCodec`]: `|decoded - original| <= bound` for every sample.
#[derive(Clone, Copy, Debug)]
pub struct QuantizingCodec {
    params: CompressionParameters,
}

impl QuantizingCodec {
    /// Creates a codec with the given parameters.
    pub fn new(params: CompressionParameters) -> Self {
        Self { params }
    }

    /// Returns the codec parameters.
    pub fn params(&self) -> CompressionParameters {
        self.params
    }
}

impl FrameCodec for QuantizingCodec {
    fn compress(
        &self,
        frame: &[f32],
        dims: WindowSize,
        frame_id: usize,
    ) -> CollectorResult<Vec<u8>> {
        let samples = dims.sample_count();
        if frame.len() != samples {
            return Err(CollectorError::compression(
                frame_id,
                format!("frame holds {} samples, window needs {}", frame.len(), samples),
            ));
        }

        let mut max_abs = 0.0f32;
        for (i, &x) in frame.iter().enumerate() {
            if !x.is_finite() {
                return Err(CollectorError::compression(
                    frame_id,
                    format!("non-finite sample {} at index {}", x, i),
                ));
            }
            max_abs = max_abs.max(x.abs());
        }

        let bound = self.params.error_bound(max_abs);
        let step = if max_abs == 0.0 {
            1.0
        } else {
            // Reconstruction rounds back to f32, which costs up to half an ulp
            if bound < 2.0 * f32::EPSILON as f64 * max_abs as f64 {
                return Err(CollectorError::compression(
                    frame_id,
                    format!(
                        "tolerance {} unsatisfiable at f32 resolution for peak amplitude {}",
                        self.params.tolerance(),
                        max_abs
                    ),
                ));
            }
            bound
        };

        let mut packed = Vec::with_capacity(samples);
        let mut previous = 0i64;
        for &x in frame {
            let q = (x as f64 / step).round();
            if q.abs() > MAX_QUANTIZED {
                return Err(CollectorError::compression(
                    frame_id,
                    format!("sample {} overflows quantisation step {}", x, step),
                ));
            }
            let q = q as i64;
            write_varint(&mut packed, zigzag_encode(q - previous));
            previous = q;
        }

        let payload = zstd::encode_all(packed.as_slice(), ZSTD_LEVEL)
            .map_err(|e| CollectorError::compression(frame_id, format!("zstd encode: {}", e)))?;

        let flags = if self.params.is_relative() {
            FLAG_RELATIVE
        } else {
            0
        };
        let mut blob = Vec::with_capacity(HEADER_LEN + payload.len());
        blob.extend_from_slice(MAGIC);
        blob.push(VERSION);
        blob.push(flags);
        blob.extend_from_slice(&[0u8; 2]);
        for value in [
            frame_id as u64,
            dims.nx as u64,
            dims.ny as u64,
            dims.nz as u64,
            samples as u64,
        ] {
            blob.extend_from_slice(&value.to_le_bytes());
        }
        blob.extend_from_slice(&step.to_le_bytes());
        blob.extend_from_slice(&(packed.len() as u64).to_le_bytes());
        blob.extend_from_slice(&payload);
        Ok(blob)
    }

    fn decompress(
        &self,
        blob: &[u8],
        dims: WindowSize,
        frame_id: usize,
        out: &mut [f32],
    ) -> CollectorResult<()> {
        let corrupt = |msg: String| CollectorError::compression(frame_id, msg);

        if blob.len() < HEADER_LEN {
            return Err(corrupt(format!("blob of {} bytes has no header", blob.len())));
        }
        if &blob[0..4] != MAGIC {
            return Err(corrupt("bad magic".to_string()));
        }
        if blob[4] != VERSION {
            return Err(corrupt(format!("unsupported format version {}", blob[4])));
        }

        let stored_frame = read_u64(blob, 8);
        if stored_frame != frame_id as u64 {
            return Err(corrupt(format!("blob belongs to frame {}", stored_frame)));
        }
        let stored_dims = (read_u64(blob, 16), read_u64(blob, 24), read_u64(blob, 32));
        if stored_dims != (dims.nx as u64, dims.ny as u64, dims.nz as u64) {
            return Err(corrupt(format!(
                "blob window {:?} does not match {}x{}x{}",
                stored_dims, dims.nx, dims.ny, dims.nz
            )));
        }
        let samples = read_u64(blob, 40);
        if samples != out.len() as u64 || samples != dims.sample_count() as u64 {
            return Err(corrupt(format!(
                "blob holds {} samples, output has {}",
                samples,
                out.len()
            )));
        }
        let step = f64::from_le_bytes(read_array(blob, 48));
        if !(step.is_finite() && step > 0.0) {
            return Err(corrupt(format!("invalid quantisation step {}", step)));
        }
        let packed_len = read_u64(blob, 56);

        let packed = zstd::decode_all(&blob[HEADER_LEN..])
            .map_err(|e| corrupt(format!("zstd decode: {}", e)))?;
        if packed.len() as u64 != packed_len {
            return Err(corrupt(format!(
                "packed stream is {} bytes, header says {}",
                packed.len(),
                packed_len
            )));
        }

        let mut cursor = 0usize;
        let mut previous = 0i64;
        for slot in out.iter_mut() {
            let raw = read_varint(&packed, &mut cursor)
                .ok_or_else(|| corrupt("truncated sample stream".to_string()))?;
            let q = previous
                .checked_add(zigzag_decode(raw))
                .ok_or_else(|| corrupt("quantised value overflow".to_string()))?;
            *slot = (q as f64 * step) as f32;
            previous = q;
        }
        if cursor != packed.len() {
            return Err(corrupt(format!(
                "{} trailing bytes after last sample",
                packed.len() - cursor
            )));
        }
        Ok(())
    }
}

#[inline]
fn zigzag_encode(value: i64) -> u64 {
    ((value << 1) ^ (value >> 63)) as u64
}

#[inline]
fn zigzag_decode(value: u64) -> i64 {
    ((value >> 1) as i64) ^ -((value & 1) as i64)
}

fn write_varint(out: &mut Vec<u8>, mut value: u64) {
    while value >= 0x80 {
        out.push((value as u8) | 0x80);
        value >>= 7;
    }
    out.push(value as u8);
}

fn read_varint(buf: &[u8], cursor: &mut usize) -> Option<u64> {
    let mut value = 0u64;
    let mut shift = 0u32;
    loop {
        let byte = *buf.get(*cursor)?;
        *cursor += 1;
        if shift > 63 {
            return None;
        }
        value |= ((byte & 0x7f) as u64) << shift;
        if byte & 0x80 == 0 {
            return Some(value);
        }
        shift += 7;
    }
}

fn read_array(buf: &[u8], offset: usize) -> [u8; 8] {
    let mut raw = [0u8; 8];
    raw.copy_from_slice(&buf[offset..offset + 8]);
    raw
}

fn read_u64(buf: &[u8], offset: usize) -> u64 {
    u64::from_le_bytes(read_array(buf, offset))
}
