//! Real-time duplex streaming via cpal.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{BufferSize, Device, FrameCount, Host, SupportedBufferSize};
use crossbeam_channel::Sender;

use crate::reblock::Reblocker;
use crate::{Error, Result};

/// Fallback rate when a device reports no default configuration.
const FALLBACK_SAMPLE_RATE: u32 = 48000;

/// Extract device name via `description()` (cpal 0.17+).
fn device_name(device: &Device) -> std::result::Result<String, cpal::DeviceNameError> {
    device.description().map(|d| d.name().to_string())
}

/// Audio device information.
#[derive(Debug, Clone)]
pub struct AudioDevice {
    /// Human-readable device name.
    pub name: String,
    /// Whether the device supports audio input.
    pub is_input: bool,
    /// Whether the device supports audio output.
    pub is_output: bool,
    /// Default sample rate in Hz.
    pub default_sample_rate: u32,
}

/// List all available audio devices.
pub fn list_devices() -> Result<Vec<AudioDevice>> {
    let host = cpal::default_host();
    let mut devices = Vec::new();

    if let Ok(inputs) = host.input_devices() {
        for device in inputs {
            if let Ok(name) = device_name(&device) {
                let sample_rate = device
                    .default_input_config()
                    .map(|c| c.sample_rate())
                    .unwrap_or(FALLBACK_SAMPLE_RATE);
                let is_output = device.default_output_config().is_ok();

                devices.push(AudioDevice {
                    name,
                    is_input: true,
                    is_output,
                    default_sample_rate: sample_rate,
                });
            }
        }
    }

    if let Ok(outputs) = host.output_devices() {
        for device in outputs {
            if let Ok(name) = device_name(&device) {
                if devices.iter().any(|d| d.name == name) {
                    continue;
                }
                let sample_rate = device
                    .default_output_config()
                    .map(|c| c.sample_rate())
                    .unwrap_or(FALLBACK_SAMPLE_RATE);

                devices.push(AudioDevice {
                    name,
                    is_input: false,
                    is_output: true,
                    default_sample_rate: sample_rate,
                });
            }
        }
    }

    Ok(devices)
}

/// Default input and output device names, when the host has them.
pub fn default_device() -> Result<(Option<String>, Option<String>)> {
    let host = cpal::default_host();
    let input = host
        .default_input_device()
        .and_then(|d| device_name(&d).ok());
    let output = host
        .default_output_device()
        .and_then(|d| device_name(&d).ok());
    Ok((input, output))
}

/// Buffer size that makes every device callback carry exactly one cycle.
///
/// Falls back to the host default when the device's supported range
/// excludes `block_size`; callbacks are then re-blocked.
fn cycle_buffer_size(supported: &SupportedBufferSize, block_size: usize) -> BufferSize {
    let frames = block_size as FrameCount;
    match *supported {
        SupportedBufferSize::Range { min, max } if !(min..=max).contains(&frames) => {
            BufferSize::Default
        }
        _ => BufferSize::Fixed(frames),
    }
}

/// Stream configuration for `supported` with one cycle per callback.
fn cycle_config(
    supported: &cpal::SupportedStreamConfig,
    block_size: usize,
    kind: &str,
) -> cpal::StreamConfig {
    let buffer_size = cycle_buffer_size(supported.buffer_size(), block_size);
    if buffer_size == BufferSize::Default {
        tracing::warn!(
            kind,
            block_size,
            supported = ?supported.buffer_size(),
            "device rejects a fixed buffer of one block; re-blocking host buffers, \
             late convolution results are likely"
        );
    }
    cpal::StreamConfig {
        channels: supported.channels(),
        sample_rate: supported.sample_rate(),
        buffer_size,
    }
}

/// Hands captured buffers from the input callback to the output callback.
#[derive(Debug, Clone)]
struct InputForwarder {
    tx: Sender<Vec<f32>>,
    dropped: Arc<AtomicU64>,
}

impl InputForwarder {
    fn forward(&self, data: &[f32]) {
        if self.tx.try_send(data.to_vec()).is_err() {
            let dropped = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
            tracing::trace!(dropped, "input queue full; captured buffer dropped");
        }
    }
}

/// Duplex stream configuration.
#[derive(Debug, Clone)]
pub struct DuplexConfig {
    /// Frames per engine cycle.
    pub block_size: usize,
    /// Interleaved channels the cycle closure writes (1 or 2).
    pub engine_channels: usize,
    /// Input device name or index (uses default if `None`).
    pub input_device: Option<String>,
    /// Output device name or index (uses default if `None`).
    pub output_device: Option<String>,
}

impl Default for DuplexConfig {
    fn default() -> Self {
        Self {
            block_size: aula_core::DEFAULT_BLOCK_SIZE,
            engine_channels: 2,
            input_device: None,
            output_device: None,
        }
    }
}

/// Capture from one device, run fixed-size cycles, play on another.
///
/// Both streams ask the host for callbacks of exactly
/// [`DuplexConfig::block_size`] frames, so each output callback runs one
/// cycle. Input is reduced to its first channel and passed through a
/// [`Reblocker`], which also covers hosts that refuse the fixed size.
pub struct DuplexStream {
    input_device: Device,
    output_device: Device,
    config: DuplexConfig,
    running: Arc<AtomicBool>,
    dropped_input: Arc<AtomicU64>,
}

impl std::fmt::Debug for DuplexStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DuplexStream")
            .field("config", &self.config)
            .field("running", &self.is_running())
            .field("dropped_input", &self.dropped_input())
            .finish_non_exhaustive()
    }
}

impl DuplexStream {
    /// Open the configured (or default) devices.
    pub fn new(config: DuplexConfig) -> Result<Self> {
        let host = cpal::default_host();

        let input_device = match &config.input_device {
            Some(name) => find_input_device(&host, name)?,
            None => host.default_input_device().ok_or(Error::NoDevice)?,
        };
        let output_device = match &config.output_device {
            Some(name) => find_output_device(&host, name)?,
            None => host.default_output_device().ok_or(Error::NoDevice)?,
        };

        Ok(Self {
            input_device,
            output_device,
            config,
            running: Arc::new(AtomicBool::new(false)),
            dropped_input: Arc::new(AtomicU64::new(0)),
        })
    }

    /// Sample rate of the output device; the engine must run at this rate.
    pub fn sample_rate(&self) -> u32 {
        self.output_device
            .default_output_config()
            .map(|c| c.sample_rate())
            .unwrap_or(FALLBACK_SAMPLE_RATE)
    }

    /// Output device channel count.
    pub fn output_channels(&self) -> u16 {
        self.output_device
            .default_output_config()
            .map(|c| c.channels())
            .unwrap_or(2)
    }

    /// Flag that keeps [`run`](Self::run) alive. Clear it (or call
    /// [`stop`](Self::stop)) from another thread to return.
    pub fn running_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    /// Run until stopped, calling `cycle` with `B` mono input frames and a
    /// `B · engine_channels` interleaved output block.
    pub fn run<F>(&mut self, mut cycle: F) -> Result<()>
    where
        F: FnMut(&[f32], &mut [f32]) + Send + 'static,
    {
        let input_config = self
            .input_device
            .default_input_config()
            .map_err(|e| Error::Stream(e.to_string()))?;
        let output_config = self
            .output_device
            .default_output_config()
            .map_err(|e| Error::Stream(e.to_string()))?;

        if input_config.sample_rate() != output_config.sample_rate() {
            tracing::warn!(
                input = input_config.sample_rate(),
                output = output_config.sample_rate(),
                "input and output devices disagree on sample rate"
            );
        }

        let block_size = self.config.block_size;
        let input_stream_config = cycle_config(&input_config, block_size, "input");
        let output_stream_config = cycle_config(&output_config, block_size, "output");
        let input_channels = usize::from(input_config.channels());
        let output_channels = usize::from(output_config.channels());
        let (tx, rx) = crossbeam_channel::bounded::<Vec<f32>>(16);
        let forwarder = InputForwarder {
            tx,
            dropped: Arc::clone(&self.dropped_input),
        };

        self.running.store(true, Ordering::SeqCst);

        let input_running = Arc::clone(&self.running);
        let input_stream = self
            .input_device
            .build_input_stream(
                &input_stream_config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    if input_running.load(Ordering::SeqCst) {
                        forwarder.forward(data);
                    }
                },
                |err| tracing::error!(%err, "input stream error"),
                None,
            )
            .map_err(|e| Error::Stream(e.to_string()))?;

        let output_running = Arc::clone(&self.running);
        let mut reblocker =
            Reblocker::new(block_size, self.config.engine_channels, output_channels);
        let output_stream = self
            .output_device
            .build_output_stream(
                &output_stream_config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    if !output_running.load(Ordering::SeqCst) {
                        data.fill(0.0);
                        return;
                    }
                    while let Ok(samples) = rx.try_recv() {
                        reblocker.push_input(&samples, input_channels);
                    }
                    reblocker.render(data, &mut cycle);
                },
                |err| tracing::error!(%err, "output stream error"),
                None,
            )
            .map_err(|e| Error::Stream(e.to_string()))?;

        input_stream
            .play()
            .map_err(|e| Error::Stream(e.to_string()))?;
        output_stream
            .play()
            .map_err(|e| Error::Stream(e.to_string()))?;

        tracing::info!(
            block_size,
            input_channels,
            output_channels,
            input_buffer = ?input_stream_config.buffer_size,
            output_buffer = ?output_stream_config.buffer_size,
            sample_rate = self.sample_rate(),
            "duplex stream started"
        );

        while self.running.load(Ordering::SeqCst) {
            std::thread::sleep(Duration::from_millis(100));
        }

        tracing::info!(dropped_input = self.dropped_input(), "duplex stream stopped");
        Ok(())
    }

    /// Captured buffers discarded because the output side fell behind.
    pub fn dropped_input(&self) -> u64 {
        self.dropped_input.load(Ordering::Relaxed)
    }

    /// Stop the stream.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// Check if the stream is running.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

fn find_input_device(host: &Host, name_or_index: &str) -> Result<Device> {
    let devices: Vec<_> = host
        .input_devices()
        .map_err(|e| Error::Stream(e.to_string()))?
        .collect();
    find_device_from_list(&devices, name_or_index, "input")
}

fn find_output_device(host: &Host, name_or_index: &str) -> Result<Device> {
    let devices: Vec<_> = host
        .output_devices()
        .map_err(|e| Error::Stream(e.to_string()))?
        .collect();
    find_device_from_list(&devices, name_or_index, "output")
}

/// Find a device by index, exact name, or case-insensitive partial name.
fn find_device_from_list(devices: &[Device], name_or_index: &str, kind: &str) -> Result<Device> {
    if let Ok(index) = name_or_index.parse::<usize>() {
        return devices.get(index).cloned().ok_or_else(|| {
            Error::DeviceNotFound(format!(
                "{} device index {} (only {} devices available)",
                kind,
                index,
                devices.len()
            ))
        });
    }

    if let Some(device) = devices
        .iter()
        .find(|d| device_name(d).is_ok_and(|n| n == name_or_index))
    {
        return Ok(device.clone());
    }

    let search_lower = name_or_index.to_lowercase();
    let mut matches: Vec<_> = devices
        .iter()
        .filter_map(|d| {
            device_name(d)
                .ok()
                .filter(|name| name.to_lowercase().contains(&search_lower))
                .map(|name| (d.clone(), name))
        })
        .collect();

    if matches.len() > 1 {
        let names: Vec<_> = matches.iter().map(|(_, n)| n.as_str()).collect();
        tracing::warn!(
            search = name_or_index,
            kind,
            ?names,
            "multiple devices match, using the first"
        );
    }
    if matches.is_empty() {
        return Err(Error::DeviceNotFound(format!(
            "no {} device matching '{}'",
            kind, name_or_index
        )));
    }
    Ok(matches.swap_remove(0).0)
}
