//! Numbered compiler diagnostics.
//!
//! The codes and their order are part of the tool's surface: drivers and
//! editors key on the number, so new codes append, never reorder.

use std::fmt;

/// Compiler error codes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum ErrorCode {
    /// Numeric operand outside its permitted domain.
    ArgOutOfRange = 1,
    /// JMP/JSR target identifier never declared.
    UndefinedIdentifier = 2,
    /// Identifier declared twice.
    DuplicateIdentifier = 3,
    /// More identifiers than the symbol table holds.
    SymbolTableOverflow = 4,
    /// Emission would exceed the program image cap.
    CodeOverflow = 5,
    /// Token matches no production.
    IncomprehensibleSpec = 6,
    /// Note's voice digit does not match the scheduled voice.
    VoiceMismatch = 7,
    /// Absolute pitch outside range, or no octave context.
    PitchOutOfRange = 8,
    /// Invalid duration-modifier combination.
    IllegalDuration = 9,
    /// Control keyword in the middle of a note event.
    ExecCtrlInEvent = 10,
    /// Identifier declaration in the middle of a note event.
    IdentifierInEvent = 11,
    /// SUB while another SUB is open.
    NestedSubEsb = 12,
    /// ESB with no open SUB.
    EsbWithoutSub = 13,
    /// END with a SUB still open.
    HangingSub = 14,
    /// Note with no active voice.
    NoVoicesActive = 15,
}

impl ErrorCode {
    /// Human-readable message for the code.
    pub fn message(self) -> &'static str {
        match self {
            ErrorCode::ArgOutOfRange => "argument out of range",
            ErrorCode::UndefinedIdentifier => "undefined identifier",
            ErrorCode::DuplicateIdentifier => "identifier already used",
            ErrorCode::SymbolTableOverflow => "symbol table overflow",
            ErrorCode::CodeOverflow => "object code overflow",
            ErrorCode::IncomprehensibleSpec => "incomprehensible specification",
            ErrorCode::VoiceMismatch => "voice number mismatch",
            ErrorCode::PitchOutOfRange => "note pitch out of range",
            ErrorCode::IllegalDuration => "illegal duration",
            ErrorCode::ExecCtrlInEvent => "executable control in event",
            ErrorCode::IdentifierInEvent => "identifier in event",
            ErrorCode::NestedSubEsb => "nested SUB-ESB",
            ErrorCode::EsbWithoutSub => "ESB without SUB",
            ErrorCode::HangingSub => "hanging SUB",
            ErrorCode::NoVoicesActive => "no voices active",
        }
    }
}

/// One latched error, tied to the source line that raised it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Diagnostic {
    /// 1-based source line number.
    pub line: u32,
    /// The error code.
    pub code: ErrorCode,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "error {} on line {}: {}",
            self.code as u8,
            self.line,
            self.code.message()
        )
    }
}
