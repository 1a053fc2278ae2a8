//! Splice the recorded onset onto a synthesized tail.

use std::f32::consts::PI;

/// Replace the first `point` samples of `synth` with `original`, then blend
/// over the next `length` samples with complementary Hann halves.
///
/// Samples of `original` past its end count as silence.
pub fn crossfade_onset(synth: &mut [f32], original: &[f32], point: usize, length: usize) {
    let orig = |n: usize| original.get(n).copied().unwrap_or(0.0);
    let point = point.min(synth.len());

    for (n, sample) in synth[..point].iter_mut().enumerate() {
        *sample = orig(n);
    }

    let end = (point + length).min(synth.len());
    for n in point..end {
        let t = (n - point) as f32 / length as f32;
        let fall = 0.5 * (1.0 + (PI * t).cos());
        let rise = 1.0 - fall;
        synth[n] = orig(n) * fall + synth[n] * rise;
    }
}
