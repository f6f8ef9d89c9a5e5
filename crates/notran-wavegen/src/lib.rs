//! Wavetable generator for the NOTRAN synthesis engine.
//!
//! Waveforms are described as Fourier harmonic lists in YAML and rendered
//! into 256-sample unsigned-8-bit tables. The evaluation deliberately keeps
//! the original driver's 8-bit angle arithmetic: harmonic angles live on a
//! 256-step circle and the per-harmonic index accumulator wraps, so the
//! generated tables match what the synthesis engine's phase accumulator
//! expects.
//!
//! Output is either CA65 assembler text (one `.byte` block per table) or a
//! raw bank of concatenated 256-byte blocks ready for the interpreter.

#![warn(missing_docs)]

mod emit;
mod fourier;
mod waveform;

pub use emit::{write_assembly, write_bank_entry, write_file_header};
pub use fourier::generate;
pub use waveform::{parse_specs, WaveformSpec, MAX_HARMONICS};

/// Errors raised while parsing specifications or generating tables.
#[derive(thiserror::Error, Debug)]
pub enum WavegenError {
    /// IO error from the filesystem.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed YAML input.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A specification carries too few or too many harmonics.
    #[error("'{name}' has {count} harmonics (valid: 1-{MAX_HARMONICS})")]
    HarmonicCount {
        /// Name of the offending waveform.
        name: String,
        /// Number of harmonics after the DC term.
        count: usize,
    },

    /// The input contained no usable specifications.
    #[error("no valid waveform specifications found")]
    NoSpecs,
}

/// Result type for generator operations.
pub type Result<T> = std::result::Result<T, WavegenError>;
