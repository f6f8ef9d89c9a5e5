//! Compiler for the NOTRAN music-notation language.
//!
//! NOTRAN scores are flat, line-oriented text: identifier declarations at
//! column zero, three-letter keyword directives, and note/rest literals.
//! The compiler is single-pass; it keeps a small per-voice state machine so
//! polyphonic music written as one list of notes packs into a stream of
//! "events" — one note per active voice, replayed by advancing musical time
//! by the shortest duration in the set.
//!
//! # Quick start
//! ```
//! use notran_compiler::Compiler;
//!
//! let source = " TPO 60 NVC 1 ACT 1 C4Q END";
//! let music = Compiler::new(0).compile(source.as_bytes()).unwrap();
//! assert!(music.is_clean());
//! assert_eq!(music.code[0], 0x10); // TEMPO
//! ```
//!
//! Errors are latched: each one produces a numbered [`Diagnostic`] and
//! compilation continues so the listing stays faithful to the source. Only
//! a note event with no active voice aborts outright. The driver decides
//! the process exit code and must not write an object file when
//! [`Compilation::is_clean`] is false.

#![warn(missing_docs)]

mod compiler;
mod cursor;
mod diagnostics;
mod keyword;
mod listing;
mod note;
pub mod objfile;
mod symbol;

pub use compiler::{Compilation, Compiler};
pub use diagnostics::{Diagnostic, ErrorCode};
pub use objfile::ObjectFormat;
pub use symbol::{Symbol, SymbolTable, MAX_SYMBOLS};

/// Fatal compiler conditions. Everything else is reported as a
/// [`Diagnostic`] and compilation carries on.
#[derive(thiserror::Error, Debug)]
pub enum CompileError {
    /// IO error while reading source or writing the listing.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A note event was opened with all four voices inactive.
    #[error("line {line}: note event with no active voices")]
    NoVoicesActive {
        /// Source line of the offending note.
        line: u32,
    },
}

/// Result type for compiler operations.
pub type Result<T> = std::result::Result<T, CompileError>;
