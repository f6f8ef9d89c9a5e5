//! Note-literal tables: pitch letters and duration codes.

/// Chromatic slot (1..=12, C=1 .. B=12) for each accidental-adjusted letter.
/// Indexed by `(letter − 'A' + 1) * 3 + accidental − 2` where the
/// accidental term is −1 for `@`, 0 for natural, +1 for `#`.
const PITCH_TABLE: [u8; 21] = [
    9, 10, 11, 11, 12, 1, 12, 1, 2, 2, 3, 4, 4, 5, 6, 5, 6, 7, 7, 8, 9,
];

/// Accidental on a note letter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Accidental {
    Flat,
    Natural,
    Sharp,
}

/// Chromatic slot in 1..=12 for a letter A..=G with an accidental.
pub(crate) fn chromatic_slot(letter: u8, accidental: Accidental) -> u8 {
    debug_assert!((b'A'..=b'G').contains(&letter));
    let adjust = match accidental {
        Accidental::Flat => -1i32,
        Accidental::Natural => 0,
        Accidental::Sharp => 1,
    };
    let index = (letter - b'A' + 1) as i32 * 3 + adjust - 2;
    PITCH_TABLE[index as usize]
}

/// Length modifier following a duration letter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum LengthModifier {
    Dotted,
    Plain,
    Triplet,
}

/// Duration code (1..=15) for a (letter, modifier) pair, or `None` for the
/// combinations that do not exist: a dotted or triplet whole would overflow
/// the time-unit byte, and a triplet thirty-second falls below one unit's
/// resolution.
pub(crate) fn duration_code(letter: u8, modifier: LengthModifier) -> Option<u8> {
    use LengthModifier::{Dotted, Plain, Triplet};
    match (letter, modifier) {
        (b'W', Plain) => Some(1),
        (b'H', Dotted) => Some(2),
        (b'H', Plain) => Some(3),
        (b'H', Triplet) => Some(5),
        (b'Q', Dotted) => Some(4),
        (b'Q', Plain) => Some(6),
        (b'Q', Triplet) => Some(8),
        (b'E', Dotted) => Some(7),
        (b'E', Plain) => Some(9),
        (b'E', Triplet) => Some(11),
        (b'S', Dotted) => Some(10),
        (b'S', Plain) => Some(12),
        (b'S', Triplet) => Some(14),
        (b'T', Dotted) => Some(13),
        (b'T', Plain) => Some(15),
        _ => None,
    }
}

/// True for the six duration letters.
pub(crate) fn is_duration_letter(c: u8) -> bool {
    matches!(c, b'W' | b'H' | b'Q' | b'E' | b'S' | b'T')
}

/// One parsed note or rest literal.
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct NoteSpec {
    /// Voice digit 1..=4, or 0 when unspecified.
    pub voice: u8,
    /// Chromatic slot 1..=12, or 0 for a rest.
    pub pitch: u8,
    /// Octave digit 1..=6, or 0 when the voice's last octave applies.
    pub octave: u8,
    /// Duration code 1..=15.
    pub duration_code: u8,
    /// Time units for the code.
    pub duration_time: u8,
}
