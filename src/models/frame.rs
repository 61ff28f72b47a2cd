use serde::{Deserialize, Serialize};

/// Which physical stream a frame came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceId {
    Mic,
    System,
    /// Composed output of the mixer; never produced by a capture source.
    Mix,
}

impl SourceId {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Mic => "mic",
            Self::System => "system",
            Self::Mix => "mix",
        }
    }
}

/// One block of interleaved signed 16-bit PCM with timing metadata.
///
/// Created by a capture source on each native callback, then moved through
/// the pipeline stage by stage. Nothing holds a frame after handing it on.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub source: SourceId,
    /// Native rate at capture time, or the target rate once resampled.
    pub sample_rate: u32,
    pub channels: u16,
    /// Strictly increasing per source, no wraparound within a session.
    pub sequence: u64,
    /// Monotonic clock, non-decreasing per source.
    pub timestamp_ns: u64,
    pub samples: Vec<i16>,
}

impl Frame {
    pub fn new(
        source: SourceId,
        sample_rate: u32,
        channels: u16,
        sequence: u64,
        timestamp_ns: u64,
        samples: Vec<i16>,
    ) -> Self {
        debug_assert!(sample_rate > 0);
        debug_assert!(channels > 0);
        debug_assert!(!samples.is_empty());
        Self {
            source,
            sample_rate,
            channels,
            sequence,
            timestamp_ns,
            samples,
        }
    }

    /// A mono frame of zeros, used to substitute for a stalled source.
    pub fn silence(
        source: SourceId,
        sample_rate: u32,
        sequence: u64,
        timestamp_ns: u64,
        frame_count: usize,
    ) -> Self {
        Self {
            source,
            sample_rate,
            channels: 1,
            sequence,
            timestamp_ns,
            samples: vec![0; frame_count],
        }
    }

    /// Samples per channel.
    pub fn frame_count(&self) -> usize {
        self.samples.len() / self.channels as usize
    }

    /// Duration of this frame in nanoseconds at its current rate.
    pub fn duration_ns(&self) -> u64 {
        self.frame_count() as u64 * 1_000_000_000 / self.sample_rate as u64
    }
}

/// One mic frame and one system frame covering the same nominal time
/// window, both mono at the target rate with identical frame counts.
/// This is the unit the mixer consumes.
#[derive(Debug, Clone)]
pub struct SynchronizedPair {
    pub mic: Frame,
    pub system: Frame,
    pub mic_stalled: bool,
    pub system_stalled: bool,
    /// Nominal window start, for downstream diagnostics.
    pub window_ns: u64,
}

impl SynchronizedPair {
    pub fn frame_count(&self) -> usize {
        self.mic.frame_count()
    }

    pub fn sample_rate(&self) -> u32 {
        self.mic.sample_rate
    }
}
