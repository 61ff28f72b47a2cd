use std::fs::{self, File};
use std::io::{Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::models::error::CaptureError;
use crate::models::frame::Frame;
use crate::traits::sink::AudioSink;

/// Size of the standard RIFF WAV header in bytes.
pub const WAV_HEADER_SIZE: usize = 44;

/// Build the 44-byte RIFF header for 16-bit little-endian PCM.
///
/// `data_size` is zero at open time and backfilled on finalize.
///
/// Layout:
/// ```text
/// [0-3]    "RIFF"      [4-7]    file size - 8
/// [8-11]   "WAVE"      [12-15]  "fmt "
/// [16-19]  16          [20-21]  1 (PCM)
/// [22-23]  channels    [24-27]  sample_rate
/// [28-31]  byte_rate   [32-33]  block_align
/// [34-35]  bit depth   [36-39]  "data"
/// [40-43]  data_size
/// ```
pub fn wav_header(sample_rate: u32, channels: u16, data_size: u32) -> [u8; WAV_HEADER_SIZE] {
    const BIT_DEPTH: u16 = 16;
    let byte_rate = sample_rate * channels as u32 * BIT_DEPTH as u32 / 8;
    let block_align = channels * BIT_DEPTH / 8;

    let mut header = [0u8; WAV_HEADER_SIZE];
    header[0..4].copy_from_slice(b"RIFF");
    header[4..8].copy_from_slice(&(36 + data_size).to_le_bytes());
    header[8..12].copy_from_slice(b"WAVE");
    header[12..16].copy_from_slice(b"fmt ");
    header[16..20].copy_from_slice(&16u32.to_le_bytes());
    header[20..22].copy_from_slice(&1u16.to_le_bytes());
    header[22..24].copy_from_slice(&channels.to_le_bytes());
    header[24..28].copy_from_slice(&sample_rate.to_le_bytes());
    header[28..32].copy_from_slice(&byte_rate.to_le_bytes());
    header[32..34].copy_from_slice(&block_align.to_le_bytes());
    header[34..36].copy_from_slice(&BIT_DEPTH.to_le_bytes());
    header[36..40].copy_from_slice(b"data");
    header[40..44].copy_from_slice(&data_size.to_le_bytes());
    header
}

/// Streaming WAV file sink.
///
/// Writes the header up front with placeholder sizes, streams PCM frames
/// behind it, and backfills the RIFF and data size fields on `finalize`.
/// Finalizing twice is a no-op, so the pipeline's abort path and its
/// normal stop path can share one shutdown sequence.
pub struct WavWriter {
    path: PathBuf,
    file: Option<File>,
    sample_rate: u32,
    channels: u16,
    data_bytes: u64,
    finalized: bool,
}

impl WavWriter {
    /// Create the file and write the placeholder header.
    pub fn create(path: &Path, sample_rate: u32, channels: u16) -> Result<Self, CaptureError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| {
                    CaptureError::Storage(format!("failed to create output directory: {e}"))
                })?;
            }
        }
        let mut file = File::create(path)
            .map_err(|e| CaptureError::Storage(format!("failed to create {}: {e}", path.display())))?;
        file.write_all(&wav_header(sample_rate, channels, 0))
            .map_err(|e| CaptureError::Storage(format!("failed to write header: {e}")))?;

        Ok(Self {
            path: path.to_path_buf(),
            file: Some(file),
            sample_rate,
            channels,
            data_bytes: 0,
            finalized: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl AudioSink for WavWriter {
    fn write(&mut self, frame: &Frame) -> Result<(), CaptureError> {
        if self.finalized {
            return Err(CaptureError::Storage("writer already finalized".into()));
        }
        if frame.sample_rate != self.sample_rate || frame.channels != self.channels {
            return Err(CaptureError::FormatMismatch(format!(
                "sink expects {} Hz x{}, got {} Hz x{}",
                self.sample_rate, self.channels, frame.sample_rate, frame.channels
            )));
        }
        let file = self
            .file
            .as_mut()
            .ok_or_else(|| CaptureError::Storage("file not open".into()))?;

        let mut bytes = Vec::with_capacity(frame.samples.len() * 2);
        for &s in &frame.samples {
            bytes.extend_from_slice(&s.to_le_bytes());
        }
        file.write_all(&bytes)
            .map_err(|e| CaptureError::Storage(format!("write failed: {e}")))?;
        self.data_bytes += bytes.len() as u64;
        Ok(())
    }

    fn finalize(&mut self) -> Result<(), CaptureError> {
        if self.finalized {
            return Ok(());
        }
        let Some(mut file) = self.file.take() else {
            return Ok(());
        };

        let data_size = u32::try_from(self.data_bytes).unwrap_or(u32::MAX);
        file.seek(SeekFrom::Start(4))
            .map_err(|e| CaptureError::Storage(format!("seek failed: {e}")))?;
        file.write_all(&(36 + data_size).to_le_bytes())
            .map_err(|e| CaptureError::Storage(format!("header backfill failed: {e}")))?;
        file.seek(SeekFrom::Start(40))
            .map_err(|e| CaptureError::Storage(format!("seek failed: {e}")))?;
        file.write_all(&data_size.to_le_bytes())
            .map_err(|e| CaptureError::Storage(format!("header backfill failed: {e}")))?;
        file.flush()
            .map_err(|e| CaptureError::Storage(format!("flush failed: {e}")))?;

        self.finalized = true;
        log::debug!(
            "finalized {} ({} data bytes)",
            self.path.display(),
            self.data_bytes
        );
        Ok(())
    }

    fn bytes_written(&self) -> u64 {
        self.data_bytes
    }
}

impl Drop for WavWriter {
    fn drop(&mut self) {
        if !self.finalized {
            // Last-resort backfill so a dropped writer still leaves a
            // readable file.
            let _ = self.finalize();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::frame::SourceId;

    fn test_frame(samples: Vec<i16>, channels: u16) -> Frame {
        Frame::new(SourceId::Mix, 48000, channels, 0, 0, samples)
    }

    #[test]
    fn header_fields() {
        let h = wav_header(48000, 2, 1000);
        assert_eq!(&h[0..4], b"RIFF");
        assert_eq!(&h[8..12], b"WAVE");
        assert_eq!(u32::from_le_bytes(h[4..8].try_into().unwrap()), 1036);
        assert_eq!(u16::from_le_bytes(h[22..24].try_into().unwrap()), 2);
        assert_eq!(u32::from_le_bytes(h[24..28].try_into().unwrap()), 48000);
        // byte rate = 48000 * 2 * 2
        assert_eq!(u32::from_le_bytes(h[28..32].try_into().unwrap()), 192_000);
        assert_eq!(u32::from_le_bytes(h[40..44].try_into().unwrap()), 1000);
    }

    #[test]
    fn writes_and_backfills_sizes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.wav");
        let mut w = WavWriter::create(&path, 48000, 2).unwrap();

        w.write(&test_frame(vec![1, -1, 2, -2], 2)).unwrap();
        w.finalize().unwrap();

        let bytes = fs::read(&path).unwrap();
        assert_eq!(bytes.len(), WAV_HEADER_SIZE + 8);
        // RIFF size = 36 + data
        assert_eq!(u32::from_le_bytes(bytes[4..8].try_into().unwrap()), 44);
        assert_eq!(u32::from_le_bytes(bytes[40..44].try_into().unwrap()), 8);
        // First sample round-trips
        assert_eq!(i16::from_le_bytes(bytes[44..46].try_into().unwrap()), 1);
    }

    #[test]
    fn finalize_twice_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.wav");
        let mut w = WavWriter::create(&path, 48000, 1).unwrap();
        w.write(&test_frame(vec![5; 10], 1)).unwrap();
        w.finalize().unwrap();
        assert!(w.finalize().is_ok());
        assert_eq!(w.bytes_written(), 20);
    }

    #[test]
    fn write_after_finalize_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.wav");
        let mut w = WavWriter::create(&path, 48000, 1).unwrap();
        w.finalize().unwrap();
        assert!(w.write(&test_frame(vec![1], 1)).is_err());
    }

    #[test]
    fn rejects_format_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.wav");
        let mut w = WavWriter::create(&path, 48000, 2).unwrap();
        let frame = Frame::new(SourceId::Mix, 44100, 2, 0, 0, vec![1, 2]);
        assert!(matches!(
            w.write(&frame),
            Err(CaptureError::FormatMismatch(_))
        ));
    }
}
