use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;

use crate::models::config::PipelineConfig;
use crate::models::error::{CaptureError, SourceEvent};
use crate::models::frame::{Frame, SourceId, SynchronizedPair};
use crate::models::recording_result::{default_file_name, RecordingMetadata, RecordingResult};
use crate::models::state::Diagnostics;
use crate::processing::aec::AecAdapter;
use crate::processing::frame_queue::FrameQueue;
use crate::processing::gain::GainController;
use crate::processing::mixer::Mixer;
use crate::processing::synchronizer::StreamSynchronizer;
use crate::storage::metadata::write_metadata;
use crate::storage::wav_writer::WavWriter;
use crate::traits::capture_source::{CaptureSource, DeviceManager, FrameCallback};
use crate::traits::echo_canceller::EchoCanceller;
use crate::traits::sink::AudioSink;

/// Owns the whole capture session: two sources, the synchronizer, gain
/// control, optional echo cancellation, the mixer, and the output sink.
///
/// Data flow:
/// ```text
/// [Mic Source] ──→ [Mic FrameQueue] ──┐
///                                     ├→ [Synchronizer] → AEC → AGC → [Mixer] → [Sink]
/// [Sys Source] ──→ [Sys FrameQueue] ──┘
/// ```
///
/// Capture threads only ever touch their frame queue and the event
/// channel; everything else is owned by the processing thread.
pub struct Pipeline {
    config: PipelineConfig,
    mic: Box<dyn CaptureSource>,
    system: Box<dyn CaptureSource>,
    canceller: Option<Box<dyn EchoCanceller>>,

    stop_flag: Arc<AtomicBool>,
    diagnostics: Arc<Mutex<Diagnostics>>,
    processing_handle: Option<thread::JoinHandle<Result<u64, CaptureError>>>,
    output_path: Option<PathBuf>,
    running: bool,
    result: Option<RecordingResult>,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("config", &self.config)
            .field("running", &self.running)
            .field("output_path", &self.output_path)
            .finish_non_exhaustive()
    }
}

impl Pipeline {
    /// Open both capture devices through the supplied device manager.
    pub fn open(config: PipelineConfig, devices: &dyn DeviceManager) -> Result<Self, CaptureError> {
        config.validate()?;
        let mic = devices.open(SourceId::Mic, &config.mic_device)?;
        let system = devices.open(SourceId::System, &config.system_device)?;
        Ok(Self::with_sources(config, mic, system))
    }

    /// Build a pipeline over already-opened sources.
    pub fn with_sources(
        config: PipelineConfig,
        mic: Box<dyn CaptureSource>,
        system: Box<dyn CaptureSource>,
    ) -> Self {
        Self {
            config,
            mic,
            system,
            canceller: None,
            stop_flag: Arc::new(AtomicBool::new(false)),
            diagnostics: Arc::new(Mutex::new(Diagnostics::default())),
            processing_handle: None,
            output_path: None,
            running: false,
            result: None,
        }
    }

    /// Install the echo canceller consumed when `aec_enabled` is set.
    /// Must be constructed at the pipeline's target sample rate.
    pub fn set_echo_canceller(&mut self, canceller: Box<dyn EchoCanceller>) {
        self.canceller = Some(canceller);
    }

    pub fn diagnostics(&self) -> Diagnostics {
        *self.diagnostics.lock()
    }

    /// Start capturing to a WAV file at the configured path (or a
    /// timestamped default name).
    pub fn start(&mut self) -> Result<(), CaptureError> {
        let path = self
            .config
            .output_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(default_file_name()));
        let sink = WavWriter::create(
            &path,
            self.config.target_sample_rate,
            self.config.effective_channels(),
        )?;
        self.output_path = Some(path);
        self.start_with_sink(Box::new(sink))
    }

    /// Start capturing into an arbitrary downstream sink.
    pub fn start_with_sink(&mut self, sink: Box<dyn AudioSink>) -> Result<(), CaptureError> {
        if self.running {
            return Err(CaptureError::InvalidConfig(
                "pipeline is already running".into(),
            ));
        }
        if self.config.aec_enabled {
            match &self.canceller {
                None => {
                    return Err(CaptureError::InvalidConfig(
                        "aec enabled but no echo canceller installed".into(),
                    ))
                }
                Some(c) if c.sample_rate() != self.config.target_sample_rate => {
                    return Err(CaptureError::InvalidConfig(format!(
                        "echo canceller rate {} does not match target rate {}",
                        c.sample_rate(),
                        self.config.target_sample_rate
                    )))
                }
                Some(_) => {}
            }
        }

        self.stop_flag.store(false, Ordering::SeqCst);
        let (event_tx, event_rx) = unbounded::<SourceEvent>();

        let mic_queue = Arc::new(FrameQueue::new(self.config.queue_capacity));
        let system_queue = Arc::new(FrameQueue::new(self.config.queue_capacity));

        self.mic.start(
            Self::capture_callback(
                SourceId::Mic,
                Arc::clone(&mic_queue),
                Arc::clone(&self.diagnostics),
                event_tx.clone(),
            ),
            event_tx.clone(),
        )?;
        if let Err(e) = self.system.start(
            Self::capture_callback(
                SourceId::System,
                Arc::clone(&system_queue),
                Arc::clone(&self.diagnostics),
                event_tx.clone(),
            ),
            event_tx,
        ) {
            let _ = self.mic.stop();
            return Err(e);
        }

        let synchronizer = StreamSynchronizer::new(
            mic_queue,
            system_queue,
            self.config.target_sample_rate,
            self.config.chunk_size,
            self.config.stall_timeout,
        );
        let mixer = Mixer::new(
            self.config.mix_mode,
            self.config.output_channels,
            self.config.mix_ratio,
        );
        let aec = if self.config.aec_enabled {
            self.canceller.take().map(AecAdapter::new)
        } else {
            None
        };

        let worker = ProcessingWorker {
            config: self.config.clone(),
            synchronizer,
            mixer,
            aec,
            aec_pending: VecDeque::new(),
            mic_agc: GainController::new(),
            system_agc: GainController::new(),
            sink,
            events: event_rx,
            stop_flag: Arc::clone(&self.stop_flag),
            diagnostics: Arc::clone(&self.diagnostics),
        };

        let handle = thread::Builder::new()
            .name("duocap-processing".into())
            .spawn(move || worker.run())
            .map_err(|e| CaptureError::Storage(format!("failed to spawn processing thread: {e}")))?;

        self.processing_handle = Some(handle);
        self.running = true;
        Ok(())
    }

    /// Stop the session: drain buffered audio, stop both sources, and
    /// finalize the sink. Stopping an already-stopped pipeline is a
    /// no-op returning `None`.
    pub fn stop(&mut self) -> Result<Option<RecordingResult>, CaptureError> {
        if !self.running {
            return Ok(None);
        }
        self.running = false;
        self.stop_flag.store(true, Ordering::SeqCst);

        let joined = match self.processing_handle.take() {
            Some(handle) => handle
                .join()
                .map_err(|_| CaptureError::Storage("processing thread panicked".into()))
                .and_then(|r| r),
            None => Ok(0),
        };

        // Sources only stop after the join, so frames still in flight at
        // stop time were eligible for the drained output. They stop
        // unconditionally: a processing error must not leak the capture
        // threads or their native handles.
        if let Err(e) = self.mic.stop() {
            log::warn!("mic source stop failed: {e}");
        }
        if let Err(e) = self.system.stop() {
            log::warn!("system source stop failed: {e}");
        }

        let bytes = joined?;

        let diagnostics = *self.diagnostics.lock();
        let channels = self.config.effective_channels();
        let duration_secs = bytes as f64
            / (self.config.target_sample_rate as f64 * channels as f64 * 2.0);

        let result = self.output_path.as_ref().map(|path| {
            let metadata = RecordingMetadata::new(
                &path.to_string_lossy(),
                duration_secs,
                self.config.target_sample_rate,
                channels,
                self.config.mix_mode,
                &diagnostics,
            );
            if let Err(e) = write_metadata(&metadata, path) {
                log::warn!("failed to write metadata sidecar: {e}");
            }
            RecordingResult {
                file_path: path.clone(),
                duration_secs,
                metadata,
                diagnostics,
            }
        });

        self.result.clone_from(&result);
        Ok(result)
    }

    /// The last completed recording, if any.
    pub fn last_result(&self) -> Option<&RecordingResult> {
        self.result.as_ref()
    }

    fn capture_callback(
        source: SourceId,
        queue: Arc<FrameQueue<Frame>>,
        diagnostics: Arc<Mutex<Diagnostics>>,
        events: Sender<SourceEvent>,
    ) -> FrameCallback {
        Arc::new(move |frame: Frame| {
            {
                let mut d = diagnostics.lock();
                match source {
                    SourceId::Mic => d.mic_frames += 1,
                    SourceId::System => d.system_frames += 1,
                    SourceId::Mix => {}
                }
            }
            if !queue.push(frame) {
                {
                    let mut d = diagnostics.lock();
                    match source {
                        SourceId::Mic => d.mic_dropped += 1,
                        SourceId::System => d.system_dropped += 1,
                        SourceId::Mix => {}
                    }
                }
                let _ = events.send(SourceEvent::Overrun { source, dropped: 1 });
            }
        })
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        if self.running {
            let _ = self.stop();
        }
    }
}

/// Everything the processing thread owns. Gain state, resampler phase
/// (inside the synchronizer lanes), and the AEC adapter never leave this
/// thread.
struct ProcessingWorker {
    config: PipelineConfig,
    synchronizer: StreamSynchronizer,
    mixer: Mixer,
    aec: Option<AecAdapter>,
    /// Echo-cancelled mic samples waiting to be re-chunked: the adapter
    /// emits at the canceller's frame cadence, not the chunk cadence.
    aec_pending: VecDeque<i16>,
    mic_agc: GainController,
    system_agc: GainController,
    sink: Box<dyn AudioSink>,
    events: Receiver<SourceEvent>,
    stop_flag: Arc<AtomicBool>,
    diagnostics: Arc<Mutex<Diagnostics>>,
}

impl ProcessingWorker {
    fn run(mut self) -> Result<u64, CaptureError> {
        let outcome = self.pump();
        // Sub-chunk echo-cancel residue at session end is shorter than
        // one analysis frame of audio; it is accounted for and dropped.
        if let Some(adapter) = self.aec.as_mut() {
            let residue = adapter.flush().len() + self.aec_pending.len();
            if residue > 0 {
                log::debug!("discarding {residue} echo-cancelled sample(s) at session end");
            }
        }
        // The sink is finalized on every exit path so the container is
        // never left with placeholder sizes.
        let finalize = self.sink.finalize();
        match outcome {
            Err(e) => {
                log::error!("processing aborted: {e}");
                finalize?;
                Err(e)
            }
            Ok(()) => {
                finalize?;
                Ok(self.sink.bytes_written())
            }
        }
    }

    fn pump(&mut self) -> Result<(), CaptureError> {
        loop {
            self.handle_events();

            if self.stop_flag.load(Ordering::SeqCst) || self.synchronizer.all_sources_failed() {
                self.synchronizer.begin_drain();
            }

            match self.synchronizer.next_pair() {
                Some(pair) => self.process_pair(pair)?,
                None => {
                    if self.synchronizer.state().is_terminal() {
                        return Ok(());
                    }
                    // Still starting, or a cycle produced nothing; loop
                    // around to re-check cancellation and events.
                }
            }
        }
    }

    fn handle_events(&mut self) {
        for event in self.events.try_iter() {
            match event {
                SourceEvent::Failed { source, error } => {
                    log::error!("{} capture failed: {error}", source.label());
                    self.synchronizer.mark_source_failed(source);
                }
                SourceEvent::Overrun { source, dropped } => {
                    log::warn!("{}: {dropped} frame(s) dropped at producer", source.label());
                }
            }
        }
    }

    fn process_pair(&mut self, mut pair: SynchronizedPair) -> Result<(), CaptureError> {
        let chunk = pair.mic.frame_count();

        // Echo cancellation first, on the raw rate-matched signals. The
        // cancelled stream is re-chunked through `aec_pending`, which
        // delays the mic by less than one analysis frame relative to the
        // reference; well inside the one-chunk alignment tolerance.
        if let Some(adapter) = self.aec.as_mut() {
            let cancelled = adapter.process_chunk(&pair.mic.samples, &pair.system.samples);
            self.aec_pending.extend(cancelled);
            let mut mic = Vec::with_capacity(chunk);
            while mic.len() < chunk {
                match self.aec_pending.pop_front() {
                    Some(s) => mic.push(s),
                    None => mic.push(0),
                }
            }
            pair.mic.samples = mic;
            let bypassed = adapter.bypassed_frames();
            self.diagnostics.lock().aec_bypasses = bypassed;
        }

        // Gain: smoothed automatic gain composed with the per-source
        // user multiplier, saturating at i16 range.
        let mic_gain = if self.config.agc_enabled {
            self.mic_agc.observe(&pair.mic.samples)
        } else {
            1.0
        } * self.config.mic_gain;
        let system_gain = if self.config.agc_enabled {
            self.system_agc.observe(&pair.system.samples)
        } else {
            1.0
        } * self.config.system_gain;
        GainController::apply(&mut pair.mic.samples, mic_gain);
        GainController::apply(&mut pair.system.samples, system_gain);

        let (mic_stalls, system_stalls) = self.synchronizer.stall_periods();
        let output = self.mixer.combine(pair)?;
        self.sink.write(&output)?;

        let mut d = self.diagnostics.lock();
        d.pairs_emitted += 1;
        d.mic_stalls = mic_stalls;
        d.system_stalls = system_stalls;
        d.bytes_written = self.sink.bytes_written();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::config::MixMode;

    #[test]
    fn mixed_mode_channel_plumbing() {
        // Mixer construction honors the configured channel count only in
        // mixed mode; guard the wiring here, behavior is covered in the
        // mixer's own tests.
        let mixer = Mixer::new(MixMode::Mixed, 1, 0.5);
        assert_eq!(mixer.output_channels(), 1);
        let mixer = Mixer::new(MixMode::StereoSplit, 1, 0.5);
        assert_eq!(mixer.output_channels(), 2);
    }
}
