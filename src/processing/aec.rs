use crate::traits::echo_canceller::EchoCanceller;

/// Adapts the pipeline's chunk size to the echo canceller's fixed
/// analysis frame size.
///
/// The canceller only accepts exact `frame_size()`-sample frames at its
/// configured rate, while the synchronizer emits chunks of an unrelated
/// size. The adapter accumulates mic and reference samples, feeds the
/// canceller whole frames in strict chronological order, and hands back
/// as many processed samples as are ready. Residue shorter than one
/// analysis frame waits for the next chunk (or `flush`).
///
/// Canceller failures are non-fatal: the raw mic frame is passed through
/// in place of the cancelled one and the bypass is counted.
pub struct AecAdapter {
    canceller: Box<dyn EchoCanceller>,
    mic_pending: Vec<i16>,
    ref_pending: Vec<i16>,
    output_pending: Vec<i16>,
    bypassed_frames: u64,
}

impl AecAdapter {
    pub fn new(canceller: Box<dyn EchoCanceller>) -> Self {
        Self {
            canceller,
            mic_pending: Vec::new(),
            ref_pending: Vec::new(),
            output_pending: Vec::new(),
            bypassed_frames: 0,
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.canceller.sample_rate()
    }

    /// Analysis frames passed through raw because the canceller errored.
    pub fn bypassed_frames(&self) -> u64 {
        self.bypassed_frames
    }

    /// Feed one chunk of rate-matched mic and reference samples; returns
    /// the echo-cancelled samples ready so far (possibly fewer or more
    /// than the input while the internal buffers settle).
    pub fn process_chunk(&mut self, mic: &[i16], reference: &[i16]) -> Vec<i16> {
        self.mic_pending.extend_from_slice(mic);
        self.ref_pending.extend_from_slice(reference);

        let frame = self.canceller.frame_size();
        while self.mic_pending.len() >= frame && self.ref_pending.len() >= frame {
            match self
                .canceller
                .process(&self.mic_pending[..frame], &self.ref_pending[..frame])
            {
                Ok(cancelled) => {
                    self.mic_pending.drain(..frame);
                    self.output_pending.extend(cancelled);
                }
                Err(e) => {
                    log::warn!("echo canceller failed, using raw mic frame: {e}");
                    self.bypassed_frames += 1;
                    let raw: Vec<i16> = self.mic_pending.drain(..frame).collect();
                    self.output_pending.extend(raw);
                }
            }
            self.ref_pending.drain(..frame);
        }

        std::mem::take(&mut self.output_pending)
    }

    /// Return any buffered samples at end of session: processed output
    /// first, then unprocessed mic residue shorter than one frame.
    pub fn flush(&mut self) -> Vec<i16> {
        let mut out = std::mem::take(&mut self.output_pending);
        out.append(&mut self.mic_pending);
        self.ref_pending.clear();
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::error::CaptureError;

    /// Test canceller: halves every mic sample, ignores the reference.
    struct HalvingCanceller {
        frame_size: usize,
        fail: bool,
    }

    impl EchoCanceller for HalvingCanceller {
        fn frame_size(&self) -> usize {
            self.frame_size
        }

        fn sample_rate(&self) -> u32 {
            48000
        }

        fn process(&mut self, mic: &[i16], reference: &[i16]) -> Result<Vec<i16>, CaptureError> {
            assert_eq!(mic.len(), self.frame_size);
            assert_eq!(reference.len(), self.frame_size);
            if self.fail {
                return Err(CaptureError::EchoCancelFailed("adaptation diverged".into()));
            }
            Ok(mic.iter().map(|&s| s / 2).collect())
        }
    }

    #[test]
    fn accumulates_to_frame_size() {
        let mut adapter = AecAdapter::new(Box::new(HalvingCanceller {
            frame_size: 160,
            fail: false,
        }));

        // 100 samples: not enough for a frame yet.
        let out = adapter.process_chunk(&[100; 100], &[1; 100]);
        assert!(out.is_empty());

        // 100 more: one full frame processed, 40 pending.
        let out = adapter.process_chunk(&[100; 100], &[1; 100]);
        assert_eq!(out.len(), 160);
        assert!(out.iter().all(|&s| s == 50));
    }

    #[test]
    fn conserves_samples_across_flush() {
        let mut adapter = AecAdapter::new(Box::new(HalvingCanceller {
            frame_size: 160,
            fail: false,
        }));
        let mut total = 0usize;
        for _ in 0..7 {
            total += adapter.process_chunk(&[8; 100], &[0; 100]).len();
        }
        total += adapter.flush().len();
        assert_eq!(total, 700);
    }

    #[test]
    fn failure_passes_raw_mic_through() {
        let mut adapter = AecAdapter::new(Box::new(HalvingCanceller {
            frame_size: 160,
            fail: true,
        }));
        let out = adapter.process_chunk(&[100; 320], &[1; 320]);
        // Both frames bypassed: raw mic samples, stream still continuous.
        assert_eq!(out.len(), 320);
        assert!(out.iter().all(|&s| s == 100));
        assert_eq!(adapter.bypassed_frames(), 2);
    }
}
