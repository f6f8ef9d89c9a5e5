//! The three-letter directive set.

/// Every keyword the line dispatcher recognises. Dispatch is a single
/// `match` in the compiler so adding a keyword without handling it is a
/// compile error, not a silent fall-through.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Keyword {
    /// Set the number of mixed voices.
    Nvc,
    /// Activate voices.
    Act,
    /// Deactivate voices.
    Dct,
    /// Select a waveform for a voice.
    Wav,
    /// Set the tempo.
    Tpo,
    /// Force every voice's next note into long absolute form.
    Abs,
    /// Jump to an identifier.
    Jmp,
    /// Call an identifier.
    Jsr,
    /// Return from a call.
    Rts,
    /// Open an inline subroutine body.
    Sub,
    /// Close an inline subroutine body.
    Esb,
    /// End of the program.
    End,
}

impl Keyword {
    /// Match the first three bytes of a token. Keywords are checked before
    /// note literals, so `ABS` never parses as a note on A.
    pub fn parse(bytes: &[u8]) -> Option<Keyword> {
        let word = bytes.get(..3)?;
        match word {
            b"NVC" => Some(Keyword::Nvc),
            b"ACT" => Some(Keyword::Act),
            b"DCT" => Some(Keyword::Dct),
            b"WAV" => Some(Keyword::Wav),
            b"TPO" => Some(Keyword::Tpo),
            b"ABS" => Some(Keyword::Abs),
            b"JMP" => Some(Keyword::Jmp),
            b"JSR" => Some(Keyword::Jsr),
            b"RTS" => Some(Keyword::Rts),
            b"SUB" => Some(Keyword::Sub),
            b"ESB" => Some(Keyword::Esb),
            b"END" => Some(Keyword::End),
            _ => None,
        }
    }
}
