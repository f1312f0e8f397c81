// Audio output device - CPAL stream pulling fixed segments from the output bridge

use super::format_conversion::{write_samples, write_silence};
use super::output::AudioOutputBridge;
use super::{AudioError, AudioResult};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, FromSample, SampleFormat, SizedSample, Stream, StreamConfig};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{error, info, warn};

/// Names of the available output devices
pub fn list_output_devices() -> Vec<String> {
    let host = cpal::default_host();
    host.output_devices()
        .map(|devices| devices.filter_map(|device| device.name().ok()).collect())
        .unwrap_or_default()
}

pub struct AudioOutputDevice {
    _stream: Stream,
    name: String,
    sample_rate: u32,
    stream_failed: Arc<AtomicBool>,
}

impl AudioOutputDevice {
    /// Open the default output device and start pulling from `bridge`
    ///
    /// The hardware block is fixed to the bridge's segment length so that every
    /// callback consumes exactly one segment.
    pub fn open(bridge: Arc<AudioOutputBridge>) -> AudioResult<Self> {
        let host = cpal::default_host();
        let device = host.default_output_device().ok_or(AudioError::NoDevice)?;
        let name = device.name().unwrap_or_else(|_| "Unknown".to_string());

        let supported_config = device.default_output_config()?;
        let sample_format = supported_config.sample_format();
        let sample_rate = supported_config.sample_rate().0;

        let layout = bridge.layout();
        let mut config: StreamConfig = supported_config.into();
        config.channels = layout.channels() as u16;
        config.buffer_size = cpal::BufferSize::Fixed(layout.block_frames() as u32);

        info!(device = %name, sample_rate, format = ?sample_format, "Opening audio output");

        let stream_failed = Arc::new(AtomicBool::new(false));
        let stream = match sample_format {
            SampleFormat::F32 => build_stream::<f32>(&device, &config, bridge, stream_failed.clone()),
            SampleFormat::I16 => build_stream::<i16>(&device, &config, bridge, stream_failed.clone()),
            SampleFormat::U16 => build_stream::<u16>(&device, &config, bridge, stream_failed.clone()),
            other => {
                return Err(AudioError::UnsupportedFormat(format!(
                    "{:?}, supported formats: F32, I16, U16",
                    other
                )));
            }
        }?;
        stream.play()?;

        Ok(Self {
            _stream: stream,
            name,
            sample_rate,
            stream_failed,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// True once the stream reported an error
    pub fn has_failed(&self) -> bool {
        self.stream_failed.load(Ordering::Relaxed)
    }
}

fn build_stream<T>(
    device: &Device,
    config: &StreamConfig,
    bridge: Arc<AudioOutputBridge>,
    stream_failed: Arc<AtomicBool>,
) -> AudioResult<Stream>
where
    T: SizedSample + FromSample<f32> + Send + 'static,
{
    let layout = bridge.layout();
    let segment_len = layout.segment_len();
    let channels = layout.channels();
    // Allocated once, reused by every callback
    let mut segment = vec![0.0f32; segment_len];
    let mut short_block_reported = false;

    let stream = device.build_output_stream(
        config,
        move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
            let complete = fill_output(data, &mut segment, &bridge, channels);
            if !complete && !short_block_reported {
                short_block_reported = true;
                warn!(
                    samples = data.len(),
                    segment_len = segment.len(),
                    "Hardware block shorter than a segment, the remainder plays silence"
                );
            }
        },
        move |err| {
            error!(%err, "Audio stream error");
            stream_failed.store(true, Ordering::Relaxed);
        },
        None,
    )?;

    Ok(stream)
}

/// Fill a hardware buffer one bridge segment at a time
///
/// A trailing chunk shorter than a segment cannot be served and is written as
/// silence. Returns false when that happened.
fn fill_output<T>(
    data: &mut [T],
    segment: &mut [f32],
    bridge: &AudioOutputBridge,
    channels: usize,
) -> bool
where
    T: SizedSample + FromSample<f32>,
{
    let segment_len = segment.len();
    let mut complete = true;
    for chunk in data.chunks_mut(segment_len) {
        if chunk.len() != segment_len {
            write_silence(chunk);
            complete = false;
            continue;
        }
        segment.fill(0.0);
        bridge.consume(segment, channels);
        write_samples(segment, chunk);
    }
    complete
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::OutputLayout;

    fn bridge() -> AudioOutputBridge {
        let bridge = AudioOutputBridge::new(OutputLayout::new(8, 2, 2).unwrap());
        bridge.start();
        bridge.produce(&[0.5; 8]);
        bridge
    }

    #[test]
    fn test_whole_segments_are_served() {
        let bridge = bridge();
        let mut segment = [0.0f32; 4];
        let mut data = [0i16; 8];
        assert!(fill_output(&mut data, &mut segment, &bridge, 2));
        assert!(data.iter().all(|&sample| sample > 0));
        assert_eq!(bridge.remaining_segments(), 0);
    }

    #[test]
    fn test_short_block_plays_silence() {
        let bridge = bridge();
        let mut segment = [0.0f32; 4];
        let mut data = [1.0f32; 3];
        assert!(!fill_output(&mut data, &mut segment, &bridge, 2));
        assert_eq!(data, [0.0; 3]);
        // Nothing was consumed, the transport cannot advance
        assert_eq!(bridge.remaining_segments(), 2);

        let mut data = [1.0f32; 6];
        assert!(!fill_output(&mut data, &mut segment, &bridge, 2));
        assert_eq!(data, [0.5, 0.5, 0.5, 0.5, 0.0, 0.0]);
        assert_eq!(bridge.remaining_segments(), 1);
    }
}
