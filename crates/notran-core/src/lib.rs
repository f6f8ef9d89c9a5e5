//! Shared data model for the NOTRAN music toolchain.
//!
//! NOTRAN is a small music-notation language compiled into a compact
//! byte-stream program and played back by a fixed-point additive-synthesis
//! engine. This crate holds everything both halves of the toolchain agree
//! on:
//!
//! - the byte-stream opcode layout ([`opcode`])
//! - the note-length table indexed by 4-bit duration codes ([`duration`])
//! - the equal-tempered phase-increment table ([`frequency`])
//! - wavetable banks of 256-sample periods ([`wavetable`])
//!
//! The `notran-compiler` crate produces the byte stream, the
//! `notran-engine` crate consumes it. Neither touches the bit layout
//! directly; both go through the constants and helpers defined here.

#![warn(missing_docs)]

pub mod duration;
pub mod frequency;
pub mod opcode;
pub mod wavetable;

/// Number of polyphonic voices in both the compiler's event scheduler and
/// the synthesis engine.
pub const NUM_VOICES: usize = 4;

/// Lowest valid absolute pitch (slot 1 of the frequency table).
pub const MIN_PITCH: u8 = 1;

/// Highest valid absolute pitch. The frequency table has 62 entries; slot 0
/// is the silence sentinel, leaving 61 playable notes across six octaves.
pub const MAX_PITCH: u8 = 61;

/// Maximum size of a compiled program image in bytes.
pub const MAX_CODE_SIZE: usize = 8192;

/// Voice `duration` sentinel meaning "inactive".
pub const VOICE_INACTIVE: u8 = 0xFF;

pub use wavetable::{WavetableBank, WavetableError, WAVETABLE_SIZE};
