//! Output level guard.

/// Result of checking one cycle's output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Output level is acceptable.
    Clean,
    /// Output exceeded the threshold; the cycle must be silenced.
    Overloaded,
    /// Too many consecutive overloads; the engine must reset.
    Tripped,
}

/// Silences runaway output and trips after sustained overload.
#[derive(Debug, Clone)]
pub struct OverloadBreaker {
    threshold: f32,
    limit: usize,
    channels: usize,
    skips: usize,
}

impl OverloadBreaker {
    /// Breaker tripping after more than `limit` consecutive overloaded cycles.
    ///
    /// A cycle is overloaded when the absolute sum of its interleaved output
    /// over its frame count exceeds `threshold`.
    pub fn new(threshold: f32, limit: usize, channels: usize) -> Self {
        Self {
            threshold,
            limit,
            channels: channels.max(1),
            skips: 0,
        }
    }

    /// Breaker for half a second of overloaded blocks.
    pub fn for_stream(
        threshold: f32,
        sample_rate: u32,
        block_size: usize,
        channels: usize,
    ) -> Self {
        Self::new(threshold, sample_rate as usize / (2 * block_size), channels)
    }

    /// Consecutive-skip limit.
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Overloaded cycles since the last clean one.
    pub fn consecutive_skips(&self) -> usize {
        self.skips
    }

    /// Judge a cycle's interleaved output.
    pub fn check(&mut self, output: &[f32]) -> Verdict {
        let frames = output.len() / self.channels;
        if frames == 0 {
            return Verdict::Clean;
        }
        let level = output.iter().map(|x| x.abs()).sum::<f32>() / frames as f32;
        // NaN fails this comparison and counts as overloaded.
        if level <= self.threshold {
            self.skips = 0;
            return Verdict::Clean;
        }
        self.skips += 1;
        if self.skips > self.limit {
            self.skips = 0;
            Verdict::Tripped
        } else {
            Verdict::Overloaded
        }
    }

    /// Forget any run of overloads.
    pub fn reset(&mut self) {
        self.skips = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_cycle_resets_skips() {
        let mut breaker = OverloadBreaker::new(0.5, 3, 1);
        assert_eq!(breaker.check(&[1.0; 4]), Verdict::Overloaded);
        assert_eq!(breaker.check(&[1.0; 4]), Verdict::Overloaded);
        assert_eq!(breaker.consecutive_skips(), 2);
        assert_eq!(breaker.check(&[0.1; 4]), Verdict::Clean);
        assert_eq!(breaker.consecutive_skips(), 0);
    }

    #[test]
    fn trips_after_limit() {
        let mut breaker = OverloadBreaker::new(0.5, 2, 1);
        assert_eq!(breaker.check(&[1.0]), Verdict::Overloaded);
        assert_eq!(breaker.check(&[1.0]), Verdict::Overloaded);
        assert_eq!(breaker.check(&[1.0]), Verdict::Tripped);
        assert_eq!(breaker.consecutive_skips(), 0);
    }

    #[test]
    fn level_is_sum_over_frames() {
        let mut breaker = OverloadBreaker::new(0.5, 10, 1);
        assert_eq!(breaker.check(&[1.0, -1.0, 0.0, 0.0]), Verdict::Clean);
        assert_eq!(breaker.check(&[1.0, -1.0, 0.5, 0.0]), Verdict::Overloaded);
    }

    #[test]
    fn stereo_level_counts_frames_not_samples() {
        let mut breaker = OverloadBreaker::new(0.5, 10, 2);
        // Two frames summing to 1.2: 0.6 per frame.
        assert_eq!(breaker.check(&[0.3, 0.3, 0.3, 0.3]), Verdict::Overloaded);
        assert_eq!(breaker.check(&[0.25, 0.25, 0.25, 0.25]), Verdict::Clean);
    }

    #[test]
    fn nan_output_is_overloaded() {
        let mut breaker = OverloadBreaker::new(0.5, 10, 1);
        assert_eq!(breaker.check(&[f32::NAN]), Verdict::Overloaded);
    }

    #[test]
    fn limit_from_stream() {
        let breaker = OverloadBreaker::for_stream(0.5, 44100, 512, 2);
        assert_eq!(breaker.limit(), 43);
    }
}
