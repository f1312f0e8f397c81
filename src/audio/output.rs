// Audio output bridge - Hands rendered blocks to the hardware in fixed segments
//
// The render engine produces blocks of `capacity` interleaved samples, the
// hardware callback consumes them `segment_len` samples at a time. Consuming
// the last segment asks the render engine for more. Signals are emitted after
// the buffer lock is released.

use super::{AudioError, AudioResult};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};
use tracing::info;

/// Interleaved samples per rendered block
pub const SYNTH_BUFFER_SIZE: usize = 4096;
/// Stereo
pub const CHANNEL_COUNT: usize = 2;

/// Receiver of the bridge's outward signals
///
/// `on_samples_played` and `on_sample_request` run on the audio hardware
/// thread, implementations must not block.
pub trait OutputListener: Send + Sync {
    /// The output was opened
    fn on_ready(&self) {}
    /// One segment of `frames` frames was handed to the hardware
    fn on_samples_played(&self, _frames: usize) {}
    /// The buffer is exhausted or was cleared, the next block is needed
    fn on_sample_request(&self) {}
}

/// Validated buffer geometry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputLayout {
    capacity: usize,
    segment_len: usize,
    channels: usize,
}

impl OutputLayout {
    /// `block_frames` is the hardware block size in frames
    pub fn new(capacity: usize, block_frames: usize, channels: usize) -> AudioResult<Self> {
        if channels != CHANNEL_COUNT {
            return Err(AudioError::Layout(format!(
                "{} channels requested, only stereo is supported",
                channels
            )));
        }
        let segment_len = block_frames * channels;
        if segment_len == 0 || capacity == 0 {
            return Err(AudioError::Layout("empty buffer or block".to_string()));
        }
        if capacity % segment_len != 0 {
            return Err(AudioError::Layout(format!(
                "buffer of {} samples is not a whole number of {} sample segments",
                capacity, segment_len
            )));
        }
        Ok(Self {
            capacity,
            segment_len,
            channels,
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Samples consumed per hardware callback
    pub fn segment_len(&self) -> usize {
        self.segment_len
    }

    pub fn segment_count(&self) -> usize {
        self.capacity / self.segment_len
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn block_frames(&self) -> usize {
        self.segment_len / self.channels
    }
}

struct OutputBuffer {
    samples: Vec<f32>,
    /// Next segment to hand out, `segment_count` when exhausted
    cursor: usize,
    active: bool,
}

pub struct AudioOutputBridge {
    layout: OutputLayout,
    buffer: Mutex<OutputBuffer>,
    listener: OnceLock<Arc<dyn OutputListener>>,
}

impl AudioOutputBridge {
    pub fn new(layout: OutputLayout) -> Self {
        Self {
            layout,
            buffer: Mutex::new(OutputBuffer {
                samples: vec![0.0; layout.capacity()],
                cursor: layout.segment_count(),
                active: false,
            }),
            listener: OnceLock::new(),
        }
    }

    pub fn layout(&self) -> OutputLayout {
        self.layout
    }

    /// Attach the render engine, only one listener can be connected
    pub fn connect(&self, listener: Arc<dyn OutputListener>) -> AudioResult<()> {
        self.listener
            .set(listener)
            .map_err(|_| AudioError::AlreadyConnected)
    }

    pub fn open(&self) {
        info!(
            capacity = self.layout.capacity(),
            segment = self.layout.segment_len(),
            "Audio output open"
        );
        if let Some(listener) = self.listener.get() {
            listener.on_ready();
        }
    }

    /// Store a freshly rendered block, replacing whatever is buffered
    pub fn produce(&self, block: &[f32]) {
        assert_eq!(
            block.len(),
            self.layout.capacity(),
            "Rendered block must fill the whole buffer"
        );
        let mut buffer = self.lock();
        buffer.samples.copy_from_slice(block);
        buffer.cursor = 0;
    }

    /// Copy the next segment into `destination`
    ///
    /// Returns false, leaving `destination` untouched, while inactive or
    /// exhausted. Called from the hardware callback.
    pub fn consume(&self, destination: &mut [f32], channels: usize) -> bool {
        assert_eq!(channels, self.layout.channels(), "Unsupported channel count");
        assert_eq!(
            destination.len(),
            self.layout.segment_len(),
            "Hardware block does not match the segment length"
        );

        let exhausted = {
            let mut buffer = self.lock();
            if !buffer.active || buffer.cursor >= self.layout.segment_count() {
                return false;
            }
            let start = buffer.cursor * self.layout.segment_len();
            destination.copy_from_slice(&buffer.samples[start..start + self.layout.segment_len()]);
            buffer.cursor += 1;
            buffer.cursor == self.layout.segment_count()
        };

        if let Some(listener) = self.listener.get() {
            listener.on_samples_played(self.layout.block_frames());
            if exhausted {
                listener.on_sample_request();
            }
        }
        true
    }

    /// Drop buffered audio, a new block is requested while active
    pub fn reset(&self) {
        let active = {
            let mut buffer = self.lock();
            buffer.samples.fill(0.0);
            buffer.cursor = self.layout.segment_count();
            buffer.active
        };
        if active {
            self.request_samples();
        }
    }

    pub fn start(&self) {
        self.lock().active = true;
        self.request_samples();
    }

    pub fn stop(&self) {
        self.lock().active = false;
    }

    pub fn is_active(&self) -> bool {
        self.lock().active
    }

    /// Segments left before the buffer is exhausted
    pub fn remaining_segments(&self) -> usize {
        self.layout.segment_count() - self.lock().cursor
    }

    fn request_samples(&self) {
        if let Some(listener) = self.listener.get() {
            listener.on_sample_request();
        }
    }

    fn lock(&self) -> MutexGuard<'_, OutputBuffer> {
        // Every update leaves the buffer consistent, a poisoned lock is still usable
        self.buffer.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
