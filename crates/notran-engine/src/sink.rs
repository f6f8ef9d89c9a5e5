//! Sample sinks: where the rendered PCM goes.
//!
//! The interpreter writes unsigned 8-bit mono samples in strict time order.
//! A failed or short write is fatal to playback, so sinks report errors
//! rather than dropping data.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;

use crate::streaming::{AudioDevice, RingBuffer};
use crate::{EngineError, Result};

/// Destination for rendered samples.
pub trait SampleSink {
    /// Deliver a block of samples. Blocking on device backpressure is the
    /// sink's business; returning means every sample was accepted.
    fn write(&mut self, samples: &[u8]) -> Result<()>;

    /// Flush and close. Live sinks drain what is queued; file sinks patch
    /// up their headers.
    fn finalize(&mut self) -> Result<()>;
}

/// Sink that keeps everything in memory. Used by tests and by callers that
/// post-process the PCM themselves.
#[derive(Debug, Default)]
pub struct CaptureSink {
    samples: Vec<u8>,
}

impl CaptureSink {
    /// Empty sink.
    pub fn new() -> Self {
        CaptureSink::default()
    }

    /// Samples captured so far.
    pub fn samples(&self) -> &[u8] {
        &self.samples
    }

    /// Consume the sink, returning the captured samples.
    pub fn into_samples(self) -> Vec<u8> {
        self.samples
    }
}

impl SampleSink for CaptureSink {
    fn write(&mut self, samples: &[u8]) -> Result<()> {
        self.samples.extend_from_slice(samples);
        Ok(())
    }

    fn finalize(&mut self) -> Result<()> {
        Ok(())
    }
}

/// WAV file sink: RIFF, PCM, one channel, 8 bits.
pub struct WavSink {
    writer: Option<hound::WavWriter<BufWriter<File>>>,
    sample_rate: u32,
    samples_written: u64,
}

impl WavSink {
    /// Create the output file and write the header.
    pub fn create<P: AsRef<Path>>(path: P, sample_rate: u32) -> Result<Self> {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample: 8,
            sample_format: hound::SampleFormat::Int,
        };
        let writer = hound::WavWriter::create(path, spec)?;
        Ok(WavSink {
            writer: Some(writer),
            sample_rate,
            samples_written: 0,
        })
    }
}

impl SampleSink for WavSink {
    fn write(&mut self, samples: &[u8]) -> Result<()> {
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| EngineError::Stream("WAV sink already finalized".into()))?;
        for &sample in samples {
            // hound exposes 8-bit PCM as i8 and applies the unsigned bias
            // on disk, so shift our raw bytes down by 128.
            writer.write_sample((i16::from(sample) - 128) as i8)?;
        }
        self.samples_written += samples.len() as u64;
        Ok(())
    }

    fn finalize(&mut self) -> Result<()> {
        if let Some(writer) = self.writer.take() {
            writer.finalize()?;
            log::info!(
                "WAV file closed: {} samples ({:.2} seconds)",
                self.samples_written,
                self.samples_written as f64 / f64::from(self.sample_rate)
            );
        }
        Ok(())
    }
}

/// Live audio sink: a ring buffer drained by a rodio output stream.
///
/// `write` blocks while the buffer is full, which is the engine's only
/// suspension point; playback timing comes from the device pulling samples
/// at the configured rate.
pub struct StreamSink {
    device: AudioDevice,
    ring: Arc<Mutex<RingBuffer>>,
    staging: Vec<f32>,
}

impl StreamSink {
    /// Capacity of the shared ring buffer, in samples. About 1.5 seconds
    /// at the native rate.
    const BUFFER_SAMPLES: usize = 16384;

    /// Open the default audio device at the given sample rate.
    pub fn open(sample_rate: u32) -> Result<Self> {
        let ring = Arc::new(Mutex::new(RingBuffer::new(Self::BUFFER_SAMPLES)));
        let device = AudioDevice::start(sample_rate, Arc::clone(&ring))?;
        Ok(StreamSink {
            device,
            ring,
            staging: Vec::new(),
        })
    }
}

impl SampleSink for StreamSink {
    fn write(&mut self, samples: &[u8]) -> Result<()> {
        self.staging.clear();
        self.staging
            .extend(samples.iter().map(|&s| (f32::from(s) - 128.0) / 128.0));

        let mut offset = 0;
        while offset < self.staging.len() {
            let pushed = self.ring.lock().write(&self.staging[offset..]);
            if pushed == 0 {
                // Device buffer full: wait for the consumer.
                thread::sleep(Duration::from_micros(500));
            } else {
                offset += pushed;
            }
        }
        Ok(())
    }

    fn finalize(&mut self) -> Result<()> {
        self.device.finish();
        self.device.wait_until_drained();
        Ok(())
    }
}
