//! # duocap
//!
//! Dual-stream audio capture core: synchronizes a microphone and a
//! system-loopback stream into one time-aligned output, with adaptive
//! gain control, optional echo cancellation, and mixed or stereo-split
//! composition.
//!
//! Platform capture drivers, echo-cancellation algorithms, and encoders
//! plug in behind the `CaptureSource`, `EchoCanceller`, and `AudioSink`
//! traits; the synchronization and mixing core has no platform
//! dependency.
//!
//! ## Architecture
//!
//! ```text
//! duocap
//! ├── traits/       ← CaptureSource, DeviceManager, EchoCanceller, AudioSink
//! ├── models/       ← Frame, SynchronizedPair, PipelineConfig, CaptureError, ...
//! ├── processing/   ← FrameQueue, Resampler, GainController, AecAdapter,
//! │                   Mixer, StreamSynchronizer
//! ├── session/      ← Pipeline (orchestrator)
//! └── storage/      ← WavWriter, metadata sidecar
//! ```

pub mod models;
pub mod processing;
pub mod session;
pub mod storage;
pub mod traits;

// Re-export key types at crate root for convenience.
pub use models::config::{DeviceSelector, MixMode, PipelineConfig};
pub use models::error::{CaptureError, SourceEvent};
pub use models::frame::{Frame, SourceId, SynchronizedPair};
pub use models::recording_result::{RecordingMetadata, RecordingResult};
pub use models::state::{Diagnostics, SyncState};
pub use processing::aec::AecAdapter;
pub use processing::frame_queue::FrameQueue;
pub use processing::gain::GainController;
pub use processing::mixer::Mixer;
pub use processing::resampler::Resampler;
pub use processing::synchronizer::StreamSynchronizer;
pub use session::pipeline::Pipeline;
pub use storage::wav_writer::WavWriter;
pub use traits::capture_source::{CaptureSource, DeviceInfo, DeviceManager, FrameCallback};
pub use traits::echo_canceller::{EchoCanceller, EchoCancellerSpec};
pub use traits::sink::AudioSink;
