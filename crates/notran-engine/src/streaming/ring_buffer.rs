//! Bounded sample queue between the render thread and the audio device.

/// Fixed-capacity ring of `f32` samples. Callers share it behind a
/// `parking_lot::Mutex`; the struct itself holds no synchronization.
#[derive(Debug)]
pub struct RingBuffer {
    buffer: Vec<f32>,
    mask: usize,
    read_pos: usize,
    write_pos: usize,
}

impl RingBuffer {
    /// Create a ring with at least `capacity` slots (rounded up to a power
    /// of two so positions wrap with a mask).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(2).next_power_of_two();
        RingBuffer {
            buffer: vec![0.0; capacity],
            mask: capacity - 1,
            read_pos: 0,
            write_pos: 0,
        }
    }

    /// Samples queued for the consumer.
    pub fn available(&self) -> usize {
        self.write_pos - self.read_pos
    }

    /// Free space for the producer. One slot stays open so full and empty
    /// are distinguishable.
    pub fn free(&self) -> usize {
        self.buffer.len() - self.available() - 1
    }

    /// Append as many samples as fit; returns how many were taken.
    pub fn write(&mut self, samples: &[f32]) -> usize {
        let count = samples.len().min(self.free());
        for &sample in &samples[..count] {
            self.buffer[self.write_pos & self.mask] = sample;
            self.write_pos += 1;
        }
        count
    }

    /// Pop up to `dest.len()` samples; returns how many were produced.
    pub fn read(&mut self, dest: &mut [f32]) -> usize {
        let count = dest.len().min(self.available());
        for slot in &mut dest[..count] {
            *slot = self.buffer[self.read_pos & self.mask];
            self.read_pos += 1;
        }
        count
    }

    /// True when nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.available() == 0
    }
}
