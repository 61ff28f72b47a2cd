use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::config::MixMode;
use super::state::Diagnostics;

/// Result returned when a pipeline session completes.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordingResult {
    pub file_path: PathBuf,
    pub duration_secs: f64,
    pub metadata: RecordingMetadata,
    pub diagnostics: Diagnostics,
}

/// Metadata written as a JSON sidecar next to the recording.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordingMetadata {
    pub id: String,
    pub created_at: String,
    pub duration_secs: f64,
    pub file_path: String,
    pub sample_rate: u32,
    pub channels: u16,
    pub mix_mode: MixMode,
    pub mic_stalls: u64,
    pub system_stalls: u64,
    pub dropped_frames: u64,
}

impl RecordingMetadata {
    pub fn new(
        file_path: &str,
        duration_secs: f64,
        sample_rate: u32,
        channels: u16,
        mix_mode: MixMode,
        diagnostics: &Diagnostics,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            created_at: chrono::Utc::now().to_rfc3339(),
            duration_secs,
            file_path: file_path.to_string(),
            sample_rate,
            channels,
            mix_mode,
            mic_stalls: diagnostics.mic_stalls,
            system_stalls: diagnostics.system_stalls,
            dropped_frames: diagnostics.mic_dropped + diagnostics.system_dropped,
        }
    }
}

/// Default output file name: `recording_YYYYMMDD_HHMMSS.wav`.
pub fn default_file_name() -> String {
    format!(
        "recording_{}.wav",
        chrono::Local::now().format("%Y%m%d_%H%M%S")
    )
}
