use std::fs;
use std::path::{Path, PathBuf};

use crate::models::error::CaptureError;
use crate::models::recording_result::RecordingMetadata;

/// Sidecar location for a recording: the recording's extension is
/// replaced with `metadata.json`, so `session.wav` gets
/// `session.metadata.json` next to it.
pub fn sidecar_path(recording_path: &Path) -> PathBuf {
    recording_path.with_extension("metadata.json")
}

/// Write recording metadata as a JSON sidecar next to the recording.
///
/// The write is atomic: the JSON lands in a temp file first and is
/// renamed into place, so an interrupted write never leaves a truncated
/// sidecar beside a good recording.
pub fn write_metadata(
    metadata: &RecordingMetadata,
    recording_path: &Path,
) -> Result<(), CaptureError> {
    let final_path = sidecar_path(recording_path);
    let tmp_path = final_path.with_extension("json.tmp");

    let json = serde_json::to_string_pretty(metadata)
        .map_err(|e| CaptureError::Storage(format!("failed to serialize metadata: {e}")))?;
    fs::write(&tmp_path, json)
        .map_err(|e| CaptureError::Storage(format!("failed to write metadata: {e}")))?;
    fs::rename(&tmp_path, &final_path).map_err(|e| {
        let _ = fs::remove_file(&tmp_path);
        CaptureError::Storage(format!("failed to commit metadata: {e}"))
    })?;
    Ok(())
}

/// Read recording metadata back from its JSON sidecar file.
pub fn read_metadata(recording_path: &Path) -> Result<RecordingMetadata, CaptureError> {
    let json = fs::read_to_string(sidecar_path(recording_path))
        .map_err(|e| CaptureError::Storage(format!("failed to read metadata: {e}")))?;
    serde_json::from_str(&json)
        .map_err(|e| CaptureError::Storage(format!("failed to parse metadata: {e}")))
}
