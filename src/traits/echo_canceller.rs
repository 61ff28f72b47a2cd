use crate::models::error::CaptureError;

/// Opaque adaptive-filter echo canceller, consumed as a black-box frame
/// processor. The adaptation algorithm itself lives behind this trait.
///
/// Implementations are stateful across calls and must be fed mic and
/// reference frames in strict chronological order, always exactly
/// `frame_size()` samples per call.
pub trait EchoCanceller: Send {
    /// Samples per channel the canceller expects on every call.
    fn frame_size(&self) -> usize;

    /// Analysis rate the canceller was constructed for.
    fn sample_rate(&self) -> u32;

    /// Remove the reference signal's echo from the mic frame.
    ///
    /// Both slices are exactly `frame_size()` long; the returned frame has
    /// the same length.
    fn process(&mut self, mic: &[i16], reference: &[i16]) -> Result<Vec<i16>, CaptureError>;
}

/// Construction contract for cancellers: the filter length defaults to
/// ten analysis frames and the rate to 16 kHz when unspecified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EchoCancellerSpec {
    pub frame_size: usize,
    pub filter_length: usize,
    pub sample_rate: u32,
}

impl EchoCancellerSpec {
    pub fn new(frame_size: usize) -> Self {
        Self {
            frame_size,
            filter_length: frame_size * 10,
            sample_rate: 16_000,
        }
    }

    pub fn with_sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    pub fn with_filter_length(mut self, filter_length: usize) -> Self {
        self.filter_length = filter_length;
        self
    }

    /// Analysis frame size used when cancelling at `sample_rate`:
    /// 10 ms of samples, never below 160.
    pub fn frame_size_for_rate(sample_rate: u32) -> usize {
        (sample_rate as usize / 100).max(160)
    }
}
