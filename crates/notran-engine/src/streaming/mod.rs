//! Live audio output.
//!
//! The render thread pushes samples into a shared [`RingBuffer`]; a rodio
//! output stream pulls them at the device rate. The two sides only meet at
//! the buffer, so the synthesis loop never runs on the audio callback.

mod audio_device;
mod ring_buffer;

pub use audio_device::AudioDevice;
pub use ring_buffer::RingBuffer;
