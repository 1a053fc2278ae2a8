//! WAV impulse reading and writing.

use std::path::Path;

use aula_core::AudioBuffer;
use hound::{SampleFormat, WavReader, WavWriter};

use crate::{Error, Result};

/// WAV audio encoding format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WavFormat {
    /// Linear PCM (integer samples).
    Pcm,
    /// IEEE 754 floating-point samples.
    IeeeFloat,
}

/// WAV file metadata extracted without loading sample data.
#[derive(Debug, Clone)]
pub struct WavInfo {
    /// Number of audio channels.
    pub channels: u16,
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Bit depth per sample.
    pub bits_per_sample: u16,
    /// Total number of sample frames (samples per channel).
    pub num_frames: u64,
    /// Duration in seconds.
    pub duration_secs: f64,
    /// Audio encoding format.
    pub format: WavFormat,
}

/// Read WAV metadata without loading sample data.
pub fn read_wav_info<P: AsRef<Path>>(path: P) -> Result<WavInfo> {
    let reader = WavReader::open(path)?;
    let spec = reader.spec();
    let total_samples = u64::from(reader.len());
    let num_frames = total_samples / u64::from(spec.channels.max(1));
    let duration_secs = num_frames as f64 / f64::from(spec.sample_rate);

    let format = match spec.sample_format {
        SampleFormat::Float => WavFormat::IeeeFloat,
        SampleFormat::Int => WavFormat::Pcm,
    };

    Ok(WavInfo {
        channels: spec.channels,
        sample_rate: spec.sample_rate,
        bits_per_sample: spec.bits_per_sample,
        num_frames,
        duration_secs,
        format,
    })
}

/// Read a mono or stereo WAV file as-is.
///
/// Integer samples are scaled to `[-1, 1)`. Files with no frames or more than
/// two channels are rejected.
pub fn read_audio<P: AsRef<Path>>(path: P) -> Result<AudioBuffer> {
    let path = path.as_ref();
    let reader = WavReader::open(path)?;
    let spec = reader.spec();
    if !(1..=2).contains(&spec.channels) {
        return Err(Error::UnsupportedChannels(spec.channels));
    }
    let channels = usize::from(spec.channels);

    let interleaved: Vec<f32> = match spec.sample_format {
        SampleFormat::Float => reader
            .into_samples::<f32>()
            .collect::<std::result::Result<Vec<_>, _>>()?,
        SampleFormat::Int => {
            let max_val = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 / max_val))
                .collect::<std::result::Result<Vec<_>, _>>()?
        }
    };

    let frames = interleaved.len() / channels;
    if frames == 0 {
        return Err(Error::Empty);
    }

    let mut samples = vec![Vec::with_capacity(frames); channels];
    for frame in interleaved.chunks_exact(channels) {
        for (channel, &sample) in samples.iter_mut().zip(frame) {
            channel.push(sample);
        }
    }

    tracing::debug!(
        path = %path.display(),
        channels,
        frames,
        sample_rate = spec.sample_rate,
        "audio file read"
    );
    Ok(AudioBuffer::new(spec.sample_rate, samples)?)
}

/// Read an impulse and zero-pad it to a power of two of at least
/// `min_frames` frames.
pub fn read_impulse<P: AsRef<Path>>(path: P, min_frames: usize) -> Result<AudioBuffer> {
    let audio = read_audio(path)?;
    let original = audio.frame_count();
    let impulse = audio.zero_padded_to_power_of_two(min_frames);
    if impulse.frame_count() != original {
        tracing::debug!(
            original,
            padded = impulse.frame_count(),
            "impulse zero-padded"
        );
    }
    Ok(impulse)
}

/// Write an impulse as 32-bit float WAV.
pub fn write_impulse<P: AsRef<Path>>(path: P, impulse: &AudioBuffer) -> Result<()> {
    let spec = hound::WavSpec {
        channels: impulse.channels() as u16,
        sample_rate: impulse.sample_rate(),
        bits_per_sample: 32,
        sample_format: SampleFormat::Float,
    };
    let mut writer = WavWriter::create(path, spec)?;

    for frame in 0..impulse.frame_count() {
        for channel in impulse.iter_channels() {
            writer.write_sample(channel[frame])?;
        }
    }

    writer.finalize()?;
    Ok(())
}
