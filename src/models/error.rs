use thiserror::Error;

use super::frame::SourceId;

/// Errors that can occur in the capture and mix pipeline.
///
/// Recoverable conditions (`Overrun`, `StallTimeout`, `EchoCancelFailed`)
/// are surfaced as counters and warnings, never as aborted recordings.
/// `FormatMismatch` indicates a programming error and is fatal.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CaptureError {
    #[error("device not found: {0}")]
    DeviceNotFound(String),

    #[error("device disconnected: {0}")]
    DeviceDisconnected(String),

    #[error("format not supported: {0}")]
    FormatNotSupported(String),

    // Field deliberately not named `source`: thiserror would treat it
    // as the error-source field and demand `SourceId: std::error::Error`.
    #[error("{dropped} frame(s) dropped at {source_id:?} producer")]
    Overrun { source_id: SourceId, dropped: u64 },

    #[error("{0:?} source produced no data within the stall timeout")]
    StallTimeout(SourceId),

    #[error("echo cancellation failed: {0}")]
    EchoCancelFailed(String),

    #[error("frame format violates pipeline invariant: {0}")]
    FormatMismatch(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("storage error: {0}")]
    Storage(String),
}

impl CaptureError {
    /// Whether the pipeline must abort (via the drain/finalize path)
    /// when this error is raised.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::DeviceNotFound(_)
                | Self::DeviceDisconnected(_)
                | Self::FormatNotSupported(_)
                | Self::FormatMismatch(_)
                | Self::InvalidConfig(_)
                | Self::Storage(_)
        )
    }
}

/// Events queued from capture threads to the processing thread.
///
/// Capture callbacks never propagate errors across the thread boundary
/// directly; they post an event and carry on (or go quiet, for `Failed`).
#[derive(Debug, Clone)]
pub enum SourceEvent {
    /// The source hit an unrecoverable error and stopped producing.
    Failed {
        source: SourceId,
        error: CaptureError,
    },
    /// Frames were dropped because the producer-side queue was full.
    Overrun { source: SourceId, dropped: u64 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fatality_split() {
        assert!(CaptureError::DeviceDisconnected("mic".into()).is_fatal());
        assert!(CaptureError::FormatMismatch("rate".into()).is_fatal());
        assert!(!CaptureError::StallTimeout(SourceId::Mic).is_fatal());
        assert!(!CaptureError::Overrun {
            source_id: SourceId::System,
            dropped: 3
        }
        .is_fatal());
    }

    #[test]
    fn overrun_display_names_source_and_count() {
        let err = CaptureError::Overrun {
            source_id: SourceId::Mic,
            dropped: 4,
        };
        assert_eq!(err.to_string(), "4 frame(s) dropped at Mic producer");
    }
}
