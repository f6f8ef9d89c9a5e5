//! rodio output stream fed from the shared ring buffer.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use rodio::{OutputStream, Sink, Source};

use super::RingBuffer;
use crate::{EngineError, Result};

/// Samples pulled from the ring per lock acquisition.
const BATCH: usize = 256;

/// rodio source that drains the ring buffer.
///
/// Underruns play silence so the stream stays open; once the `finished`
/// flag is set the source ends as soon as the ring is empty, which lets
/// [`AudioDevice::wait_until_drained`] play out the queued tail.
struct RingSource {
    ring: Arc<Mutex<RingBuffer>>,
    finished: Arc<AtomicBool>,
    sample_rate: u32,
    batch: Vec<f32>,
    batch_len: usize,
    batch_pos: usize,
}

impl Iterator for RingSource {
    type Item = f32;

    fn next(&mut self) -> Option<f32> {
        if self.batch_pos >= self.batch_len {
            let mut ring = self.ring.lock();
            self.batch_len = ring.read(&mut self.batch);
            let empty = ring.is_empty();
            drop(ring);
            self.batch_pos = 0;

            if self.batch_len == 0 {
                if self.finished.load(Ordering::Relaxed) && empty {
                    return None;
                }
                // Underrun: keep the stream alive with silence.
                return Some(0.0);
            }
        }

        let sample = self.batch[self.batch_pos];
        self.batch_pos += 1;
        Some(sample)
    }
}

impl Source for RingSource {
    fn current_frame_len(&self) -> Option<usize> {
        None
    }

    fn channels(&self) -> u16 {
        1
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn total_duration(&self) -> Option<Duration> {
        None
    }
}

/// Handle on the default audio output device.
pub struct AudioDevice {
    _stream: OutputStream,
    sink: Sink,
    finished: Arc<AtomicBool>,
}

impl AudioDevice {
    /// Open the default device and start pulling from `ring`.
    pub fn start(sample_rate: u32, ring: Arc<Mutex<RingBuffer>>) -> Result<Self> {
        let (stream, handle) = OutputStream::try_default()
            .map_err(|e| EngineError::Stream(format!("cannot open audio device: {e}")))?;
        let sink = Sink::try_new(&handle)
            .map_err(|e| EngineError::Stream(format!("cannot create audio sink: {e}")))?;

        let finished = Arc::new(AtomicBool::new(false));
        sink.append(RingSource {
            ring,
            finished: Arc::clone(&finished),
            sample_rate,
            batch: vec![0.0; BATCH],
            batch_len: 0,
            batch_pos: 0,
        });

        log::info!("audio device open at {sample_rate} Hz");
        Ok(AudioDevice {
            _stream: stream,
            sink,
            finished,
        })
    }

    /// Signal that no more samples will arrive.
    pub fn finish(&self) {
        self.finished.store(true, Ordering::Relaxed);
    }

    /// Block until the queued tail has played out.
    pub fn wait_until_drained(&self) {
        self.sink.sleep_until_end();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(ring: Arc<Mutex<RingBuffer>>, finished: Arc<AtomicBool>) -> RingSource {
        RingSource {
            ring,
            finished,
            sample_rate: 8772,
            batch: vec![0.0; BATCH],
            batch_len: 0,
            batch_pos: 0,
        }
    }

    #[test]
    fn underrun_yields_silence() {
        let ring = Arc::new(Mutex::new(RingBuffer::new(64)));
        let finished = Arc::new(AtomicBool::new(false));
        let mut src = source(ring, finished);
        assert_eq!(src.next(), Some(0.0));
    }

    #[test]
    fn finished_source_drains_the_queue_first() {
        let ring = Arc::new(Mutex::new(RingBuffer::new(64)));
        let finished = Arc::new(AtomicBool::new(true));
        ring.lock().write(&[0.5, 0.25]);
        let mut src = source(Arc::clone(&ring), finished);
        assert_eq!(src.next(), Some(0.5));
        assert_eq!(src.next(), Some(0.25));
        assert_eq!(src.next(), None);
    }

    #[test]
    fn source_reports_mono_at_the_requested_rate() {
        let ring = Arc::new(Mutex::new(RingBuffer::new(64)));
        let finished = Arc::new(AtomicBool::new(false));
        let src = source(ring, finished);
        assert_eq!(src.channels(), 1);
        assert_eq!(src.sample_rate(), 8772);
    }
}
