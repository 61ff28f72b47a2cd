use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::error::CaptureError;

/// How the two synchronized streams are composed into output frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MixMode {
    /// Weighted sum of both sources, duplicated across output channels.
    Mixed,
    /// Mic on the left channel, system on the right. Always two-channel.
    StereoSplit,
}

/// Selects a capture device through the `DeviceManager`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceSelector {
    Default,
    Index(usize),
}

/// Configuration for a capture pipeline.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Common rate both streams are resampled to (default: 48000).
    pub target_sample_rate: u32,

    /// Samples per channel the synchronizer aligns and emits per cycle
    /// (default: 1024, the original backend's chunk size).
    pub chunk_size: usize,

    /// Output channel count for `Mixed` mode; `StereoSplit` is always 2.
    pub output_channels: u16,

    pub mix_mode: MixMode,

    /// Automatic gain control on/off.
    pub agc_enabled: bool,

    /// Acoustic echo cancellation on/off (requires a canceller to be
    /// installed on the pipeline).
    pub aec_enabled: bool,

    /// User gain multipliers, composed on top of the automatic gain.
    pub mic_gain: f32,
    pub system_gain: f32,

    /// Mic share of the sum in `Mixed` mode, 0.0..=1.0.
    pub mix_ratio: f32,

    /// How long the synchronizer waits for a short queue before
    /// substituting silence and flagging the source stalled.
    pub stall_timeout: Duration,

    /// Per-source frame queue capacity, in frames. Overflow drops the
    /// incoming frame and counts it.
    pub queue_capacity: usize,

    pub mic_device: DeviceSelector,
    pub system_device: DeviceSelector,

    /// Output file path; a timestamped name under the current directory
    /// is generated when `None`.
    pub output_path: Option<PathBuf>,
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<(), CaptureError> {
        if self.target_sample_rate < 8000 || self.target_sample_rate > 192_000 {
            return Err(CaptureError::InvalidConfig(format!(
                "target sample rate out of range: {}",
                self.target_sample_rate
            )));
        }
        if self.chunk_size < 256 || self.chunk_size > 8192 {
            return Err(CaptureError::InvalidConfig(format!(
                "chunk size out of range: {}",
                self.chunk_size
            )));
        }
        if ![1, 2].contains(&self.output_channels) {
            return Err(CaptureError::InvalidConfig(format!(
                "unsupported output channel count: {}",
                self.output_channels
            )));
        }
        if !(0.0..=1.0).contains(&self.mix_ratio) {
            return Err(CaptureError::InvalidConfig(format!(
                "mix ratio out of range: {}",
                self.mix_ratio
            )));
        }
        if self.mic_gain <= 0.0 || self.system_gain <= 0.0 {
            return Err(CaptureError::InvalidConfig(
                "user gain multipliers must be positive".into(),
            ));
        }
        if self.queue_capacity == 0 {
            return Err(CaptureError::InvalidConfig(
                "queue capacity must be nonzero".into(),
            ));
        }
        if self.stall_timeout.is_zero() {
            return Err(CaptureError::InvalidConfig(
                "stall timeout must be nonzero".into(),
            ));
        }
        Ok(())
    }

    /// Output channel count implied by the mix mode.
    pub fn effective_channels(&self) -> u16 {
        match self.mix_mode {
            MixMode::StereoSplit => 2,
            MixMode::Mixed => self.output_channels,
        }
    }

    /// Duration of one synchronizer chunk at the target rate.
    pub fn chunk_duration(&self) -> Duration {
        Duration::from_nanos(
            self.chunk_size as u64 * 1_000_000_000 / self.target_sample_rate as u64,
        )
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            target_sample_rate: 48000,
            chunk_size: 1024,
            output_channels: 2,
            mix_mode: MixMode::StereoSplit,
            agc_enabled: true,
            aec_enabled: false,
            mic_gain: 1.0,
            system_gain: 1.0,
            mix_ratio: 0.5,
            stall_timeout: Duration::from_millis(100),
            queue_capacity: 100,
            mic_device: DeviceSelector::Default,
            system_device: DeviceSelector::Default,
            output_path: None,
        }
    }
}
