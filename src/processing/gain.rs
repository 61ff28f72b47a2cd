/// Automatic gain control for one source.
///
/// Tracks a rolling RMS estimate over recent chunks and steers a smoothed
/// multiplicative gain toward `target / mean_rms`, clamped to
/// [`GAIN_FLOOR`, `GAIN_CEILING`]. The applied gain moves by exponential
/// smoothing only — it never jumps, which would be audible as pumping or
/// zipper noise.
#[derive(Debug)]
pub struct GainController {
    /// Rolling window of recent chunk RMS values, oldest first.
    rms_history: Vec<f32>,
    applied_gain: f32,
}

/// Target loudness: ~25% of i16 full scale.
pub const TARGET_RMS: f32 = 8192.0;
pub const GAIN_FLOOR: f32 = 0.5;
pub const GAIN_CEILING: f32 = 6.0;

/// Chunks of RMS history averaged for a stable gain estimate.
const HISTORY_WINDOW: usize = 50;
/// Below this many history entries the controller stays at unity gain
/// rather than inventing gain from insufficient evidence.
const COLD_START_CHUNKS: usize = 5;
/// Guard against division by near-zero mean RMS.
const RMS_EPSILON: f32 = 1.0;
/// Smoothing factor per chunk for the applied gain.
const SMOOTHING: f32 = 0.2;

impl GainController {
    pub fn new() -> Self {
        Self {
            rms_history: Vec::with_capacity(HISTORY_WINDOW),
            applied_gain: 1.0,
        }
    }

    /// Observe one chunk and return the gain to apply to it.
    pub fn observe(&mut self, samples: &[i16]) -> f32 {
        let rms = rms(samples);
        if self.rms_history.len() == HISTORY_WINDOW {
            self.rms_history.remove(0);
        }
        self.rms_history.push(rms);

        if self.rms_history.len() < COLD_START_CHUNKS {
            // Cold start: hold neutral gain until the window has evidence.
            return self.applied_gain;
        }

        let mean = self.rms_history.iter().sum::<f32>() / self.rms_history.len() as f32;
        // An all-silence window pins the raw gain at the ceiling, not inf.
        let raw = (TARGET_RMS / mean.max(RMS_EPSILON)).clamp(GAIN_FLOOR, GAIN_CEILING);

        self.applied_gain += SMOOTHING * (raw - self.applied_gain);
        self.applied_gain = self.applied_gain.clamp(GAIN_FLOOR, GAIN_CEILING);
        self.applied_gain
    }

    pub fn current_gain(&self) -> f32 {
        self.applied_gain
    }

    /// Multiply every sample by `gain`, saturating at the i16 range.
    pub fn apply(samples: &mut [i16], gain: f32) {
        if (gain - 1.0).abs() < f32::EPSILON {
            return;
        }
        for s in samples.iter_mut() {
            let v = *s as f32 * gain;
            *s = v.clamp(i16::MIN as f32, i16::MAX as f32) as i16;
        }
    }
}

impl Default for GainController {
    fn default() -> Self {
        Self::new()
    }
}

/// Root-mean-square magnitude of a chunk.
pub fn rms(samples: &[i16]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_sq: f64 = samples.iter().map(|&s| (s as f64) * (s as f64)).sum();
    (sum_sq / samples.len() as f64).sqrt() as f32
}
