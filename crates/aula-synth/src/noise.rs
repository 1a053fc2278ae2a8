//! White noise shaped block by block by a decay envelope.

use aula_core::{Fft, hann};
use rand::Rng;

use crate::decay::DecayEnvelope;

/// Generate `frames` samples of noise whose spectrum follows `envelope`.
///
/// For each block of `block_size` samples: fresh uniform noise, zero-padded
/// to `2 · block_size`, has bin `k` and its mirror scaled by the envelope at
/// that block, is transformed back, windowed with a periodic Hann window and
/// overlap-added at `block · block_size`.
pub fn shaped_noise<R: Rng>(
    envelope: &DecayEnvelope,
    frames: usize,
    block_size: usize,
    fft: &Fft,
    rng: &mut R,
) -> Vec<f32> {
    let size = 2 * block_size;
    debug_assert_eq!(fft.size(), size);
    let window = hann(size);
    let blocks = frames.div_ceil(block_size);
    let mut output = vec![0.0f32; blocks * block_size + size];
    let mut noise = vec![0.0f32; block_size];

    for block in 0..blocks {
        for sample in &mut noise {
            *sample = rng.gen_range(-1.0..1.0);
        }
        let mut spectrum = fft.forward_real(&noise);
        for bin in 0..=block_size {
            let gain = envelope.magnitude(bin, block);
            spectrum[bin] *= gain;
            if bin != 0 && bin != block_size {
                spectrum[size - bin] *= gain;
            }
        }
        fft.inverse_complex(&mut spectrum);

        let start = block * block_size;
        for ((out, c), w) in output[start..start + size]
            .iter_mut()
            .zip(&spectrum)
            .zip(&window)
        {
            *out += c.re * w;
        }
    }

    output.truncate(frames);
    output
}
