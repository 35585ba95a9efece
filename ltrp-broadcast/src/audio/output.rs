//! Audio output using cpal
//!
//! [`DeviceSink`] plays one clip per call: decode, resample to the device
//! rate, open a stream on the output device, block until the callback has
//! rendered the last frame, then close the stream. The stream lives entirely on
//! the calling (playback worker) thread.

use crate::audio::{AudioSink, Resampler, SimpleDecoder};
use crate::error::{Error, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, FromSample, Sample, SampleFormat, SizedSample, Stream, StreamConfig};
use std::path::Path;
use std::sync::mpsc::{self, Receiver, SyncSender};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Preferred output rate
const PREFERRED_SAMPLE_RATE: u32 = 44100;

/// Extra wait past the clip length before declaring the device stalled
const STALL_MARGIN: Duration = Duration::from_secs(5);

/// Time for the device buffer to drain after the last frame was handed over
const DRAIN_GRACE: Duration = Duration::from_millis(150);

/// Message from the audio callback thread to the waiting worker
enum StreamSignal {
    Finished,
    Failed(String),
}

/// Output device sink
///
/// Holds only the device selection and volume; device and stream are opened
/// per clip on the worker thread.
#[derive(Debug, Clone)]
pub struct DeviceSink {
    device_name: Option<String>,
    volume: f32,
}

impl DeviceSink {
    /// # Arguments
    /// - `device_name`: Optional device name (None = default device)
    /// - `volume`: Output gain, clamped to 0.0-1.0
    pub fn new(device_name: Option<String>, volume: f32) -> Self {
        Self {
            device_name,
            volume: volume.clamp(0.0, 1.0),
        }
    }

    /// List available audio output devices.
    pub fn list_devices() -> Result<Vec<String>> {
        let host = cpal::default_host();

        let devices: Vec<String> = host
            .output_devices()
            .map_err(|e| Error::AudioOutput(format!("Failed to enumerate devices: {}", e)))?
            .filter_map(|device| device.name().ok())
            .collect();

        debug!("Found {} output devices", devices.len());
        Ok(devices)
    }

    /// Open the requested device, falling back to the default device
    fn open_device(&self) -> Result<Device> {
        let host = cpal::default_host();

        if let Some(name) = self.device_name.as_ref() {
            let mut devices = host
                .output_devices()
                .map_err(|e| Error::AudioOutput(format!("Failed to enumerate devices: {}", e)))?;

            if let Some(device) = devices.find(|d| d.name().ok().as_ref() == Some(name)) {
                return Ok(device);
            }
            warn!("Requested device '{}' not found, falling back to default device", name);
        }

        host.default_output_device()
            .ok_or_else(|| Error::AudioOutput("No default output device found".to_string()))
    }

    /// Get the best supported configuration for playback.
    ///
    /// Prefers 44.1kHz stereo f32, otherwise the device default.
    fn best_config(device: &Device) -> Result<(StreamConfig, SampleFormat)> {
        let mut supported_configs = device
            .supported_output_configs()
            .map_err(|e| Error::AudioOutput(format!("Failed to get device configs: {}", e)))?;

        let preferred = supported_configs.find(|config| {
            config.channels() == 2
                && config.min_sample_rate().0 <= PREFERRED_SAMPLE_RATE
                && config.max_sample_rate().0 >= PREFERRED_SAMPLE_RATE
                && config.sample_format() == SampleFormat::F32
        });

        if let Some(supported_config) = preferred {
            let sample_format = supported_config.sample_format();
            let config = supported_config
                .with_sample_rate(cpal::SampleRate(PREFERRED_SAMPLE_RATE))
                .config();
            return Ok((config, sample_format));
        }

        let supported_config = device
            .default_output_config()
            .map_err(|e| Error::AudioOutput(format!("Failed to get default config: {}", e)))?;

        Ok((supported_config.config(), supported_config.sample_format()))
    }

    /// Build a stream that plays `samples` (interleaved stereo) once
    fn build_stream<T>(
        &self,
        device: &Device,
        config: &StreamConfig,
        samples: Arc<Vec<f32>>,
        signal: SyncSender<StreamSignal>,
    ) -> Result<Stream>
    where
        T: SizedSample + FromSample<f32>,
    {
        let channels = config.channels as usize;
        let volume = self.volume;
        let mut position = 0usize;
        let done_signal = signal.clone();

        device
            .build_output_stream(
                config,
                move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                    for frame in data.chunks_mut(channels) {
                        let (left, right) = if position + 1 < samples.len() {
                            let pair = (samples[position], samples[position + 1]);
                            position += 2;
                            pair
                        } else {
                            (0.0, 0.0)
                        };

                        for (ch, out) in frame.iter_mut().enumerate() {
                            let sample = match ch {
                                0 => left,
                                1 => right,
                                _ => 0.0,
                            };
                            *out = T::from_sample((sample * volume).clamp(-1.0, 1.0));
                        }
                    }

                    if position + 1 >= samples.len() {
                        // Capacity 1: repeated sends after the first are dropped
                        let _ = done_signal.try_send(StreamSignal::Finished);
                    }
                },
                move |err| {
                    error!("Audio stream error: {}", err);
                    let _ = signal.try_send(StreamSignal::Failed(err.to_string()));
                },
                None,
            )
            .map_err(|e| Error::AudioOutput(format!("Failed to build stream: {}", e)))
    }

    fn wait_for_completion(
        stream: Stream,
        signal: Receiver<StreamSignal>,
        expected: Duration,
    ) -> Result<()> {
        stream
            .play()
            .map_err(|e| Error::AudioOutput(format!("Failed to start stream: {}", e)))?;

        let outcome = match signal.recv_timeout(expected + STALL_MARGIN) {
            Ok(StreamSignal::Finished) => {
                std::thread::sleep(DRAIN_GRACE);
                Ok(())
            }
            Ok(StreamSignal::Failed(reason)) => Err(Error::AudioOutput(reason)),
            Err(_) => Err(Error::AudioOutput(format!(
                "Playback did not finish within {:?}",
                expected + STALL_MARGIN
            ))),
        };

        if let Err(e) = stream.pause() {
            debug!("Failed to pause stream: {}", e);
        }
        drop(stream);
        outcome
    }
}

impl AudioSink for DeviceSink {
    fn play(&self, path: &Path) -> Result<()> {
        let clip = SimpleDecoder::decode_file(path)?;

        let device = self.open_device()?;
        let (config, sample_format) = Self::best_config(&device)?;
        let device_rate = config.sample_rate.0;

        let samples = Arc::new(Resampler::resample(
            &clip.samples,
            clip.sample_rate,
            device_rate,
            2,
        )?);
        let expected = Duration::from_millis(clip.duration_ms());

        info!(
            "Playing {} on {} ({}Hz, {} ch, {:?}, {}ms)",
            path.display(),
            device.name().unwrap_or_else(|_| "Unknown".to_string()),
            device_rate,
            config.channels,
            sample_format,
            expected.as_millis()
        );

        let (tx, rx) = mpsc::sync_channel(1);
        let stream = match sample_format {
            SampleFormat::F32 => self.build_stream::<f32>(&device, &config, samples, tx)?,
            SampleFormat::I16 => self.build_stream::<i16>(&device, &config, samples, tx)?,
            SampleFormat::U16 => self.build_stream::<u16>(&device, &config, samples, tx)?,
            other => {
                return Err(Error::AudioOutput(format!(
                    "Unsupported sample format: {:?}",
                    other
                )));
            }
        };

        Self::wait_for_completion(stream, rx, expected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_volume_clamped() {
        assert_eq!(DeviceSink::new(None, 1.5).volume, 1.0);
        assert_eq!(DeviceSink::new(None, -0.5).volume, 0.0);
        assert_eq!(DeviceSink::new(Some("hw:0".to_string()), 0.3).volume, 0.3);
    }

    #[test]
    fn test_missing_file_fails_before_touching_device() {
        let sink = DeviceSink::new(None, 1.0);
        let result = sink.play(Path::new("/nonexistent/ltrp/alarm.mp3"));
        assert!(matches!(result, Err(Error::Decode(_))));
    }
}
