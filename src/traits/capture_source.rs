use std::sync::Arc;

use crossbeam_channel::Sender;

use crate::models::config::DeviceSelector;
use crate::models::error::{CaptureError, SourceEvent};
use crate::models::frame::{Frame, SourceId};

/// Callback invoked for each captured frame.
///
/// Fires on the source's dedicated capture thread. It must never block:
/// backpressure is absorbed downstream by the bounded frame queue, and a
/// stalled native callback causes dropouts in the device itself.
pub type FrameCallback = Arc<dyn Fn(Frame) + Send + Sync + 'static>;

/// Static description of the device backing a capture source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    pub id: String,
    pub name: String,
    pub source_type: SourceId,
    pub native_sample_rate: u32,
    pub channels: u16,
    pub is_default: bool,
}

/// A continuous timestamped frame producer over one physical device.
///
/// Implementations own their capture thread and native handle; neither is
/// ever shared. Frames arrive in strict sequence order with non-decreasing
/// timestamps. An unrecoverable device error posts
/// `SourceEvent::Failed` on `events` and the source goes quiet.
pub trait CaptureSource: Send {
    /// Begin delivering frames asynchronously.
    fn start(
        &mut self,
        frames: FrameCallback,
        events: Sender<SourceEvent>,
    ) -> Result<(), CaptureError>;

    /// Request graceful termination and block until the capture thread
    /// has flushed its last frame and released the native handle.
    fn stop(&mut self) -> Result<(), CaptureError>;

    fn device_info(&self) -> DeviceInfo;
}

/// Explicit device-opening collaborator handed to the pipeline at startup.
///
/// Replaces any process-wide device registry: the pipeline only ever sees
/// the manager it was constructed with.
pub trait DeviceManager {
    /// Open a started-but-idle capture source for the selected device.
    fn open(
        &self,
        source_type: SourceId,
        selector: &DeviceSelector,
    ) -> Result<Box<dyn CaptureSource>, CaptureError>;
}
