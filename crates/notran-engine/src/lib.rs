//! Bytecode interpreter and synthesis engine for NOTRAN programs.
//!
//! The engine owns a compiled byte-stream program, four wavetable
//! oscillators and a call stack, and alternates between three phases:
//! draining control commands, scheduling the next note for every expired
//! voice, and rendering `tempo × duration` samples of 8-bit unsigned PCM
//! through a [`SampleSink`].
//!
//! Synthesis is fixed point throughout: each voice advances a 16-bit phase
//! accumulator by a per-note increment and the high byte indexes a
//! 256-sample wavetable, so the table wraps for free. Voice outputs are
//! summed and saturated to a byte.
//!
//! # Quick start
//! ```
//! use notran_core::WavetableBank;
//! use notran_engine::{CaptureSink, Interpreter};
//!
//! // Activate voice 0, play one C, end.
//! let code = vec![0x90, 0x00, 0x60, 0x4A, 0x06, 0x00];
//! let bank = WavetableBank::from_bytes(vec![0x80; 256]).unwrap();
//! let mut sink = CaptureSink::new();
//! Interpreter::new(code, bank)
//!     .unwrap()
//!     .run(&mut sink)
//!     .unwrap();
//! assert!(!sink.samples().is_empty());
//! ```

#![warn(missing_docs)]

mod interpreter;
mod sink;
pub mod streaming;
mod voice;

pub use interpreter::{Interpreter, Termination};
pub use sink::{CaptureSink, SampleSink, StreamSink, WavSink};

use notran_core::WavetableError;

/// Native sample rate the frequency table is tuned for.
pub const DEFAULT_SAMPLE_RATE: u32 = 8772;

/// Errors raised by the interpreter or its sinks. Interpreter errors carry
/// the byte offset of the offending opcode.
#[derive(thiserror::Error, Debug)]
pub enum EngineError {
    /// IO error from the filesystem or audio device.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Wavetable bank could not be loaded.
    #[error("wavetable error: {0}")]
    Wavetable(#[from] WavetableError),

    /// The program image is empty.
    #[error("empty program image")]
    EmptyProgram,

    /// A TEMPO command carried a zero operand.
    #[error("tempo cannot be zero at position {offset}")]
    ZeroTempo {
        /// Byte offset of the opcode.
        offset: usize,
    },

    /// More than 256 nested calls.
    #[error("call stack overflow at position {offset}")]
    CallStackOverflow {
        /// Byte offset of the opcode.
        offset: usize,
    },

    /// RETURN with an empty call stack.
    #[error("return with empty call stack at position {offset}")]
    CallStackUnderflow {
        /// Byte offset of the opcode.
        offset: usize,
    },

    /// Jump or call target outside the program image.
    #[error("transfer to invalid address 0x{target:04X} at position {offset}")]
    TargetOutOfRange {
        /// Byte offset of the opcode.
        offset: usize,
        /// The relative target address.
        target: u16,
    },

    /// Control byte with no assigned operation.
    #[error("undefined control opcode 0x{opcode:02X} at position {offset}")]
    UndefinedOpcode {
        /// Byte offset of the opcode.
        offset: usize,
        /// The offending byte.
        opcode: u8,
    },

    /// A note opcode was reached while no voice expects a note.
    #[error("note opcode 0x{opcode:02X} with no voice expecting it at position {offset}")]
    UnexpectedNote {
        /// Byte offset of the opcode.
        offset: usize,
        /// The offending byte.
        opcode: u8,
    },

    /// WAV writing failed.
    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),

    /// The audio stream could not be opened or fed.
    #[error("audio stream error: {0}")]
    Stream(String),
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;
