/// Stateful linear-interpolation resampler for one mono stream.
///
/// Keeps a fractional phase carry and the last input sample across calls
/// so that cumulative output duration tracks cumulative input duration
/// within one sample over arbitrarily long runs — per-call rounding never
/// accumulates into drift.
#[derive(Debug)]
pub struct Resampler {
    target_rate: u32,
    /// Position of the next output sample, in input-sample units,
    /// relative to the previous call's tail. In [0, 1) between calls
    /// once primed.
    phase: f64,
    /// Last sample of the previous input block, for interpolation
    /// continuity across block boundaries.
    tail: Option<i16>,
}

impl Resampler {
    pub fn new(target_rate: u32) -> Self {
        assert!(target_rate > 0);
        Self {
            target_rate,
            phase: 0.0,
            tail: None,
        }
    }

    pub fn target_rate(&self) -> u32 {
        self.target_rate
    }

    /// Convert a block of mono samples from `source_rate` to the target
    /// rate. Identity fast path when the rates already match.
    pub fn convert(&mut self, input: &[i16], source_rate: u32) -> Vec<i16> {
        assert!(source_rate > 0);
        if source_rate == self.target_rate || input.is_empty() {
            if let Some(&last) = input.last() {
                self.tail = Some(last);
            }
            return input.to_vec();
        }

        // Step between output samples, in input-sample units.
        let step = source_rate as f64 / self.target_rate as f64;

        // The virtual input timeline for this call is [tail, input...]:
        // index 0 is the previous block's last sample (or the first input
        // sample on the very first call), so interpolation spans block
        // boundaries without repeating or skipping samples.
        let tail = self.tail.unwrap_or(input[0]);
        let total = input.len();

        let mut output = Vec::with_capacity((total as f64 / step).ceil() as usize + 1);
        let mut pos = self.phase;
        while pos < total as f64 {
            let idx = pos as usize;
            let frac = pos - idx as f64;
            let a = if idx == 0 { tail } else { input[idx - 1] } as f64;
            let b = input[idx] as f64;
            let v = a * (1.0 - frac) + b * frac;
            output.push(v.round() as i16);
            pos += step;
        }

        self.phase = pos - total as f64;
        self.tail = Some(input[total - 1]);
        output
    }

    /// Clear interpolation state, e.g. after a reconstructed gap.
    pub fn reset(&mut self) {
        self.phase = 0.0;
        self.tail = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_fast_path() {
        let mut r = Resampler::new(48000);
        let input = vec![1, 2, 3, 4];
        assert_eq!(r.convert(&input, 48000), input);
    }

    #[test]
    fn upsample_doubles_count() {
        let mut r = Resampler::new(48000);
        let out = r.convert(&vec![0i16; 240], 24000);
        assert_eq!(out.len(), 480);
    }

    #[test]
    fn interpolates_between_neighbors() {
        let mut r = Resampler::new(2000);
        let out = r.convert(&[0, 100], 1000);
        // First output is the (repeated) tail=first sample, then the
        // half-way point between 0 and 100 appears.
        assert!(out.contains(&50));
    }

    #[test]
    fn drift_bounded_over_ten_thousand_calls() {
        // 44100 → 48000 with 20ms blocks: 882 in, 960 nominal out.
        let mut r = Resampler::new(48000);
        let block = vec![0i16; 882];
        let mut total_out: u64 = 0;
        let calls = 10_000u64;
        for _ in 0..calls {
            total_out += r.convert(&block, 44100).len() as u64;
        }
        let total_in = 882 * calls;
        let expected = total_in as f64 * 48000.0 / 44100.0;
        let drift = (total_out as f64 - expected).abs();
        assert!(drift <= 1.0, "cumulative drift {} samples", drift);
    }

    #[test]
    fn drift_bounded_downsampling() {
        let mut r = Resampler::new(16000);
        let block = vec![0i16; 960];
        let mut total_out: u64 = 0;
        for _ in 0..10_000u64 {
            total_out += r.convert(&block, 48000).len() as u64;
        }
        let expected = 960.0 * 10_000.0 / 3.0;
        assert!((total_out as f64 - expected).abs() <= 1.0);
    }

    #[test]
    fn continuity_across_blocks() {
        // A ramp split across two calls must resample without a seam:
        // output stays monotonic through the block boundary.
        let mut r = Resampler::new(48000);
        let first: Vec<i16> = (0..441).map(|i| i as i16).collect();
        let second: Vec<i16> = (441..882).map(|i| i as i16).collect();
        let mut out = r.convert(&first, 44100);
        out.extend(r.convert(&second, 44100));
        for w in out.windows(2) {
            assert!(w[1] >= w[0], "non-monotonic at seam: {} -> {}", w[0], w[1]);
        }
    }

    #[test]
    fn empty_input_yields_empty_output() {
        let mut r = Resampler::new(48000);
        assert!(r.convert(&[], 44100).is_empty());
    }
}
