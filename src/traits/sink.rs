use crate::models::error::CaptureError;
use crate::models::frame::Frame;

/// Downstream encoder/container writer the pipeline drains into.
///
/// Frames are pushed synchronously in emission order. `finalize` must be
/// called exactly once at shutdown to produce a valid container (e.g. WAV
/// header backfill); a second call is a safe no-op so the abort path and
/// the normal stop path can share the same shutdown sequence.
pub trait AudioSink: Send {
    fn write(&mut self, frame: &Frame) -> Result<(), CaptureError>;

    fn finalize(&mut self) -> Result<(), CaptureError>;

    /// Total payload bytes written so far.
    fn bytes_written(&self) -> u64;
}
