//! RIFF/WAVE container codec.
//!
//! Every function here is pure: buffers go in, values or new buffers come out.
//! Segments returned by the TTS backend are complete WAV files, so merging them
//! means pulling out each `data` chunk and writing the samples back-to-back
//! under a freshly built 44-byte header.

use super::error::AudioError;
use serde::Serialize;
use std::fmt;
use std::time::Duration;

/// Size of the canonical header written by [`build_header`].
pub const HEADER_LEN: usize = 44;

/// `RIFF` + size + `WAVE`
const PREAMBLE_LEN: usize = 12;
const CHUNK_HEADER_LEN: usize = 8;
const FMT_CHUNK_LEN: u32 = 16;
const PCM_FORMAT_CODE: u16 = 1;

/// Streaming producers write this when the final length is unknown.
const UNKNOWN_SIZE: u32 = u32::MAX;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AudioFormat {
    pub sample_rate: u32,
    pub channels: u16,
    pub bits_per_sample: u16,
}

impl AudioFormat {
    /// Saturates on nonsense channel counts; [`extract_format`] rejects those up front.
    pub fn block_align(&self) -> u16 {
        self.channels.saturating_mul(self.bits_per_sample / 8)
    }

    pub fn byte_rate(&self) -> u32 {
        self.sample_rate.saturating_mul(self.block_align() as u32)
    }

    /// `None` when block align or byte rate do not fit their header fields
    fn checked_rates(&self) -> Option<(u16, u32)> {
        let block_align = self.channels.checked_mul(self.bits_per_sample / 8)?;
        let byte_rate = self.sample_rate.checked_mul(block_align as u32)?;
        Some((block_align, byte_rate))
    }

    /// Playback time of `payload_len` bytes of samples in this format
    pub fn duration_of(&self, payload_len: usize) -> Duration {
        let byte_rate = self.byte_rate();
        if byte_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(payload_len as f64 / byte_rate as f64)
    }
}

impl fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} Hz/{} ch/{} bit",
            self.sample_rate, self.channels, self.bits_per_sample
        )
    }
}

/// Location of the raw samples inside a container
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PayloadRegion {
    pub offset: usize,
    pub size: usize,
}

impl PayloadRegion {
    pub fn slice<'a>(&self, buf: &'a [u8]) -> &'a [u8] {
        &buf[self.offset..self.offset + self.size]
    }
}

/// Cheap structural check: long enough for a header and carrying the RIFF/WAVE markers.
pub fn validate_container(buf: &[u8]) -> bool {
    buf.len() >= HEADER_LEN && &buf[0..4] == b"RIFF" && &buf[8..12] == b"WAVE"
}

pub fn extract_format(buf: &[u8]) -> Result<AudioFormat, AudioError> {
    let (offset, size) = find_chunk(buf, b"fmt ")
        .ok_or_else(|| AudioError::MalformedContainer("no fmt chunk found".to_string()))?;

    if (size as usize) < FMT_CHUNK_LEN as usize || offset + FMT_CHUNK_LEN as usize > buf.len() {
        return Err(AudioError::MalformedContainer(format!(
            "fmt chunk truncated ({} bytes declared)",
            size
        )));
    }

    let format = AudioFormat {
        channels: read_u16(buf, offset + 2),
        sample_rate: read_u32(buf, offset + 4),
        bits_per_sample: read_u16(buf, offset + 14),
    };

    if format.checked_rates().is_none() {
        return Err(AudioError::MalformedContainer(format!(
            "fmt chunk declares an impossible format ({})",
            format
        )));
    }

    Ok(format)
}

pub fn extract_payload(buf: &[u8]) -> Result<PayloadRegion, AudioError> {
    let (offset, size) = find_chunk(buf, b"data")
        .ok_or_else(|| AudioError::MalformedContainer("no data chunk found".to_string()))?;

    let available = buf.len() - offset;
    let size = if size == UNKNOWN_SIZE {
        available
    } else if size as usize > available {
        return Err(AudioError::MalformedContainer(format!(
            "data chunk declares {} bytes but only {} remain",
            size, available
        )));
    } else {
        size as usize
    };

    Ok(PayloadRegion { offset, size })
}

pub fn build_header(format: &AudioFormat, total_payload_size: u32) -> [u8; HEADER_LEN] {
    let mut header = [0u8; HEADER_LEN];

    header[0..4].copy_from_slice(b"RIFF");
    header[4..8].copy_from_slice(&(36 + total_payload_size).to_le_bytes());
    header[8..12].copy_from_slice(b"WAVE");

    header[12..16].copy_from_slice(b"fmt ");
    header[16..20].copy_from_slice(&FMT_CHUNK_LEN.to_le_bytes());
    header[20..22].copy_from_slice(&PCM_FORMAT_CODE.to_le_bytes());
    header[22..24].copy_from_slice(&format.channels.to_le_bytes());
    header[24..28].copy_from_slice(&format.sample_rate.to_le_bytes());
    header[28..32].copy_from_slice(&format.byte_rate().to_le_bytes());
    header[32..34].copy_from_slice(&format.block_align().to_le_bytes());
    header[34..36].copy_from_slice(&format.bits_per_sample.to_le_bytes());

    header[36..40].copy_from_slice(b"data");
    header[40..44].copy_from_slice(&total_payload_size.to_le_bytes());

    header
}

/// Concatenate the sample payloads of same-format containers under one header.
///
/// A single container is returned untouched. The format of the first container is
/// authoritative; any other container that disagrees on sample rate, channel count or
/// bit depth fails the whole merge.
pub fn merge<B: AsRef<[u8]>>(buffers: &[B]) -> Result<Vec<u8>, AudioError> {
    match buffers {
        [] => return Err(AudioError::EmptyInput),
        [single] => return Ok(single.as_ref().to_vec()),
        _ => {}
    }

    let expected = extract_format(buffers[0].as_ref())?;
    let mut regions = Vec::with_capacity(buffers.len());

    for (index, buffer) in buffers.iter().enumerate() {
        let buffer = buffer.as_ref();
        let found = extract_format(buffer)?;
        if found != expected {
            return Err(AudioError::FormatMismatch {
                index,
                expected,
                found,
            });
        }
        regions.push(extract_payload(buffer)?);
    }

    let total: usize = regions.iter().map(|region| region.size).sum();
    let total_u32 = u32::try_from(total)
        .ok()
        .filter(|size| *size <= u32::MAX - 36)
        .ok_or_else(|| {
            AudioError::MalformedContainer(format!("merged payload of {} bytes is too large", total))
        })?;

    let mut merged = Vec::with_capacity(HEADER_LEN + total);
    merged.extend_from_slice(&build_header(&expected, total_u32));
    for (buffer, region) in buffers.iter().zip(&regions) {
        merged.extend_from_slice(region.slice(buffer.as_ref()));
    }

    tracing::debug!(
        containers = buffers.len(),
        payload_bytes = total,
        format = %expected,
        "Merged audio containers"
    );

    Ok(merged)
}

/// Walk the chunk list after the preamble; returns (body offset, declared size).
fn find_chunk(buf: &[u8], tag: &[u8; 4]) -> Option<(usize, u32)> {
    let mut offset = PREAMBLE_LEN;

    while offset.checked_add(CHUNK_HEADER_LEN)? <= buf.len() {
        let size = read_u32(buf, offset + 4);
        let body = offset + CHUNK_HEADER_LEN;

        if &buf[offset..offset + 4] == tag {
            return Some((body, size));
        }

        // odd-sized chunks carry one pad byte
        let padded = (size as usize).checked_add(size as usize & 1)?;
        offset = body.checked_add(padded)?;
    }

    None
}

fn read_u16(buf: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([buf[offset], buf[offset + 1]])
}

fn read_u32(buf: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        buf[offset],
        buf[offset + 1],
        buf[offset + 2],
        buf[offset + 3],
    ])
}
