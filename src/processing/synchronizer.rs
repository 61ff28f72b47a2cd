use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::models::frame::{Frame, SourceId, SynchronizedPair};
use crate::models::state::SyncState;
use crate::processing::frame_queue::FrameQueue;
use crate::processing::mixer::{downmix_average, left_channel};
use crate::processing::resampler::Resampler;

/// Per-source ingest lane: raw frames in, target-rate mono samples out.
///
/// Owned exclusively by the processing thread; the shared `FrameQueue` is
/// the only thing a capture thread ever touches.
struct Lane {
    source: SourceId,
    queue: Arc<FrameQueue<Frame>>,
    resampler: Resampler,
    buffer: VecDeque<i16>,
    last_sequence: Option<u64>,
    stalled: bool,
    failed: bool,
    stall_periods: u64,
    frames_ingested: u64,
}

impl Lane {
    fn new(source: SourceId, queue: Arc<FrameQueue<Frame>>, target_rate: u32) -> Self {
        Self {
            source,
            queue,
            resampler: Resampler::new(target_rate),
            buffer: VecDeque::new(),
            last_sequence: None,
            stalled: false,
            failed: false,
            stall_periods: 0,
            frames_ingested: 0,
        }
    }

    /// Drain the shared queue into the lane buffer: downmix to mono,
    /// reconstruct dropped-frame gaps as silence, resample to target.
    fn ingest(&mut self) {
        while let Some(frame) = self.queue.pop() {
            if let Some(last) = self.last_sequence {
                let gap = frame.sequence.saturating_sub(last + 1);
                if gap > 0 {
                    // Producer-side drops: fill the implied hole with
                    // silence so downstream timing stays continuous.
                    let missing = gap as usize * frame.frame_count();
                    log::debug!(
                        "{}: reconstructing {} dropped frame(s) as {} silent samples",
                        self.source.label(),
                        gap,
                        missing
                    );
                    let silence = vec![0i16; missing];
                    self.buffer
                        .extend(self.resampler.convert(&silence, frame.sample_rate));
                }
            }
            self.last_sequence = Some(frame.sequence);
            self.frames_ingested += 1;

            // Loopback audio keeps only its left channel: averaging an
            // already-rendered stereo pair can cancel out-of-phase
            // content and feed the echo canceller a broken reference.
            let mono = match self.source {
                SourceId::System => left_channel(&frame.samples, frame.channels),
                _ => downmix_average(&frame.samples, frame.channels),
            };
            self.buffer
                .extend(self.resampler.convert(&mono, frame.sample_rate));
        }
    }

    fn buffered(&self) -> usize {
        self.buffer.len()
    }

    fn has_seen_data(&self) -> bool {
        self.frames_ingested > 0
    }

    /// Take exactly `count` samples, padding any shortfall with silence.
    /// Returns the samples and whether padding was needed.
    fn take_chunk(&mut self, count: usize) -> (Vec<i16>, bool) {
        let available = self.buffer.len().min(count);
        let mut out: Vec<i16> = self.buffer.drain(..available).collect();
        let padded = out.len() < count;
        out.resize(count, 0);
        (out, padded)
    }

    fn note_stall(&mut self) {
        if !self.stalled {
            self.stalled = true;
            self.stall_periods += 1;
            log::warn!(
                "{}: no data within stall timeout, substituting silence",
                self.source.label()
            );
        }
    }

    fn note_recovered(&mut self) {
        if self.stalled {
            self.stalled = false;
            log::info!("{}: data resumed after stall", self.source.label());
        }
    }
}

/// Aligns the two independently clocked capture streams into a shared
/// time base.
///
/// Each cycle dequeues exactly one chunk from each lane. A lane that
/// cannot supply a full chunk is waited on up to the stall timeout, then
/// silence-substituted and flagged stalled (recoverable). Both lanes
/// always advance together, so neither queue can grow unbounded relative
/// to the other.
pub struct StreamSynchronizer {
    mic: Lane,
    system: Lane,
    chunk_size: usize,
    target_rate: u32,
    stall_timeout: Duration,
    state: SyncState,
    pairs_emitted: u64,
}

impl StreamSynchronizer {
    pub fn new(
        mic_queue: Arc<FrameQueue<Frame>>,
        system_queue: Arc<FrameQueue<Frame>>,
        target_rate: u32,
        chunk_size: usize,
        stall_timeout: Duration,
    ) -> Self {
        Self {
            mic: Lane::new(SourceId::Mic, mic_queue, target_rate),
            system: Lane::new(SourceId::System, system_queue, target_rate),
            chunk_size,
            target_rate,
            stall_timeout,
            state: SyncState::Starting,
            pairs_emitted: 0,
        }
    }

    pub fn state(&self) -> SyncState {
        self.state
    }

    pub fn stall_periods(&self) -> (u64, u64) {
        (self.mic.stall_periods, self.system.stall_periods)
    }

    /// Mark a source terminally failed. The synchronizer stops waiting
    /// on its queue and substitutes silence for it from now on, keeping
    /// the surviving source's timing intact.
    pub fn mark_source_failed(&mut self, source: SourceId) {
        let lane = match source {
            SourceId::Mic => &mut self.mic,
            SourceId::System => &mut self.system,
            SourceId::Mix => return,
        };
        lane.failed = true;
        log::error!("{}: source failed, substituting silence", source.label());
    }

    /// Whether both capture sources have terminally failed.
    pub fn all_sources_failed(&self) -> bool {
        self.mic.failed && self.system.failed
    }

    /// Stop accepting waits; emit only already-buffered data from here on.
    pub fn begin_drain(&mut self) {
        if !matches!(self.state, SyncState::Stopped) {
            self.state = SyncState::Draining;
        }
    }

    /// Produce the next synchronized pair, or `None` when no pair is
    /// available this cycle (still starting, drain complete, stopped).
    /// The caller re-invokes between cancellation checks.
    pub fn next_pair(&mut self) -> Option<SynchronizedPair> {
        match self.state {
            SyncState::Starting => {
                self.await_first_frames();
                if self.state == SyncState::Running {
                    self.running_cycle()
                } else {
                    None
                }
            }
            SyncState::Running => self.running_cycle(),
            SyncState::Draining => self.draining_cycle(),
            SyncState::Stopped => None,
        }
    }

    /// Starting: both sources armed, no output until each has delivered
    /// its first frame.
    fn await_first_frames(&mut self) {
        let deadline = Instant::now() + self.stall_timeout;
        loop {
            self.mic.ingest();
            self.system.ingest();
            let mic_ready = self.mic.has_seen_data() || self.mic.failed;
            let system_ready = self.system.has_seen_data() || self.system.failed;
            if mic_ready && system_ready {
                self.state = SyncState::Running;
                return;
            }
            let remaining = match deadline.checked_duration_since(Instant::now()) {
                Some(d) if !d.is_zero() => d,
                _ => return,
            };
            let waiting_on = if !mic_ready { &self.mic } else { &self.system };
            waiting_on.queue.wait_nonempty(remaining);
        }
    }

    fn running_cycle(&mut self) -> Option<SynchronizedPair> {
        let deadline = Instant::now() + self.stall_timeout;
        loop {
            self.mic.ingest();
            self.system.ingest();
            // A failed lane never gets waited on; it is silence-padded.
            let mic_short = self.mic.buffered() < self.chunk_size && !self.mic.failed;
            let system_short = self.system.buffered() < self.chunk_size && !self.system.failed;
            if !mic_short && !system_short {
                break;
            }
            let remaining = match deadline.checked_duration_since(Instant::now()) {
                Some(d) if !d.is_zero() => d,
                // Timeout: emit anyway, short lanes get silence below.
                _ => break,
            };
            let short = if mic_short { &self.mic } else { &self.system };
            short.queue.wait_nonempty(remaining);
        }

        let (mic_samples, mic_padded) = self.mic.take_chunk(self.chunk_size);
        let (system_samples, system_padded) = self.system.take_chunk(self.chunk_size);

        if mic_padded {
            self.mic.note_stall();
        } else {
            self.mic.note_recovered();
        }
        if system_padded {
            self.system.note_stall();
        } else {
            self.system.note_recovered();
        }

        Some(self.emit(mic_samples, system_samples, mic_padded, system_padded))
    }

    /// Draining: flush queues without waiting, emit buffered data until
    /// both lanes are exhausted, synthesize no further silence.
    fn draining_cycle(&mut self) -> Option<SynchronizedPair> {
        self.mic.ingest();
        self.system.ingest();

        if self.mic.buffered() == 0 && self.system.buffered() == 0 {
            self.state = SyncState::Stopped;
            return None;
        }

        // The final pair may be shorter than a chunk; both sides are
        // padded to a common length so the pair invariant holds.
        let len = self
            .mic
            .buffered()
            .max(self.system.buffered())
            .min(self.chunk_size);
        let (mic_samples, mic_padded) = self.mic.take_chunk(len);
        let (system_samples, system_padded) = self.system.take_chunk(len);

        Some(self.emit(mic_samples, system_samples, mic_padded, system_padded))
    }

    fn emit(
        &mut self,
        mic_samples: Vec<i16>,
        system_samples: Vec<i16>,
        mic_stalled: bool,
        system_stalled: bool,
    ) -> SynchronizedPair {
        let window_ns = self.pairs_emitted * self.chunk_size as u64 * 1_000_000_000
            / self.target_rate as u64;
        let sequence = self.pairs_emitted;
        self.pairs_emitted += 1;

        SynchronizedPair {
            mic: Frame::new(
                SourceId::Mic,
                self.target_rate,
                1,
                sequence,
                window_ns,
                mic_samples,
            ),
            system: Frame::new(
                SourceId::System,
                self.target_rate,
                1,
                sequence,
                window_ns,
                system_samples,
            ),
            mic_stalled,
            system_stalled,
            window_ns,
        }
    }
}
