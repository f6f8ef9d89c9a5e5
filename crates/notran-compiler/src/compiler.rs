//! The single-pass compiler.
//!
//! One [`Compiler`] value owns all mutable state: the growing code image,
//! the symbol table, four voice trackers, the event-in-progress flag and
//! the pending SUB backpatch slot. Lines are consumed in order; there is no
//! second pass, so jump targets must be declared before use.

use std::io::{BufRead, Write};

use notran_core::opcode::{
    OP_ACTIVATE, OP_CALL, OP_DEACTIVATE, OP_END, OP_JUMP, OP_LONG_NOTE_ABS, OP_RETURN,
    OP_SET_VOICES, OP_TEMPO,
};
use notran_core::{MAX_CODE_SIZE, MAX_PITCH, NUM_VOICES, VOICE_INACTIVE};

use crate::cursor::{Cursor, Scanned};
use crate::diagnostics::{Diagnostic, ErrorCode};
use crate::keyword::Keyword;
use crate::listing::ListingWriter;
use crate::note::{
    chromatic_slot, duration_code, is_duration_letter, Accidental, LengthModifier, NoteSpec,
};
use crate::symbol::SymbolTable;
use crate::{CompileError, Result};

/// Pitch nibble of a short-note rest (`1000` two's complement, −8).
const REST_MASK: u8 = 0x80;

/// Per-voice compile-time state.
#[derive(Clone, Copy, Debug)]
struct VoiceTrack {
    /// Stored waveform number, 0..=15 (WAV argument minus one).
    waveform: u8,
    /// Remaining time units; 0xFF inactive, 0 needs the next note.
    duration: u8,
    /// Last absolute pitch emitted, 0 when none.
    pitch: u8,
    /// Last octave specified, 0 when none.
    octave: u8,
    /// The next note must carry its full long form.
    use_absolute: bool,
}

impl Default for VoiceTrack {
    fn default() -> Self {
        VoiceTrack {
            waveform: 0,
            duration: VOICE_INACTIVE,
            pitch: 0,
            octave: 0,
            use_absolute: true,
        }
    }
}

/// The result of a compilation run.
#[derive(Debug)]
pub struct Compilation {
    /// The program image.
    pub code: Vec<u8>,
    /// Base address the image was assembled for.
    pub base_address: u16,
    /// Declared identifiers.
    pub symbols: SymbolTable,
    /// Latched errors, in the order raised.
    pub diagnostics: Vec<Diagnostic>,
    /// Number of source lines consumed.
    pub lines: u32,
}

impl Compilation {
    /// True when no diagnostic was raised. The object file must only be
    /// written for clean compilations.
    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty()
    }
}

/// The NOTRAN compiler.
pub struct Compiler {
    base_address: u16,
    code: Vec<u8>,
    symbols: SymbolTable,
    voices: [VoiceTrack; NUM_VOICES],
    voice_ptr: usize,
    event_building: bool,
    sub_operand: Option<usize>,
    end_seen: bool,
    line_number: u32,
    line_start: usize,
    diagnostics: Vec<Diagnostic>,
    listing: Option<ListingWriter>,
}

impl Compiler {
    /// Create a compiler assembling for the given base address.
    pub fn new(base_address: u16) -> Self {
        Compiler {
            base_address,
            code: Vec::new(),
            symbols: SymbolTable::new(),
            voices: [VoiceTrack::default(); NUM_VOICES],
            voice_ptr: 0,
            event_building: false,
            sub_operand: None,
            end_seen: false,
            line_number: 0,
            line_start: 0,
            diagnostics: Vec::new(),
            listing: None,
        }
    }

    /// Attach a listing writer. Every source line is echoed to it together
    /// with the bytes it produced.
    pub fn with_listing(mut self, out: Box<dyn Write>) -> Self {
        self.listing = Some(ListingWriter::new(out));
        self
    }

    /// Compile a source stream to completion (END keyword or end of input).
    pub fn compile<R: BufRead>(mut self, input: R) -> Result<Compilation> {
        for line in input.lines() {
            let line = line?.to_ascii_uppercase();
            self.line_number += 1;
            self.process_line(&line)?;
            if self.end_seen {
                break;
            }
        }
        if let Some(listing) = &mut self.listing {
            listing.flush()?;
        }
        Ok(Compilation {
            code: self.code,
            base_address: self.base_address,
            symbols: self.symbols,
            diagnostics: self.diagnostics,
            lines: self.line_number,
        })
    }

    // ------------------------------------------------------------------
    // Line dispatch
    // ------------------------------------------------------------------

    fn process_line(&mut self, line: &str) -> Result<()> {
        self.line_start = self.code.len();
        let bytes = line.as_bytes();

        if line.starts_with('*') {
            return self.write_listing(line);
        }

        let mut cur = Cursor::new(bytes);

        if bytes.first().is_some_and(u8::is_ascii_digit) {
            self.parse_identifier(&mut cur);
        } else if !bytes.is_empty() && bytes[0] != b' ' && bytes[0] != b'\t' {
            self.report(ErrorCode::IncomprehensibleSpec);
            return self.write_listing(line);
        }

        while !cur.at_end() && !self.end_seen {
            cur.skip_whitespace();
            if cur.at_end() {
                break;
            }
            if let Some(keyword) = Keyword::parse(cur.rest()) {
                cur.advance(3);
                self.handle_keyword(keyword, &mut cur);
            } else {
                self.parse_note_token(&mut cur)?;
            }
            cur.skip_whitespace();
            if cur.peek() == Some(b';') {
                cur.bump();
            }
        }

        self.write_listing(line)
    }

    fn write_listing(&mut self, line: &str) -> Result<()> {
        if let Some(listing) = &mut self.listing {
            let address = self.base_address.wrapping_add(self.line_start as u16);
            listing.record(line, address, &self.code[self.line_start..])?;
        }
        Ok(())
    }

    fn parse_identifier(&mut self, cur: &mut Cursor) {
        if self.event_building {
            self.report(ErrorCode::IdentifierInEvent);
            cur.scan_number();
            return;
        }
        let Some(id) = self.parse_numeric_arg(cur) else {
            return;
        };
        if id == 0 {
            self.report(ErrorCode::IncomprehensibleSpec);
            return;
        }
        if self.symbols.lookup(id as u8).is_some() {
            self.report(ErrorCode::DuplicateIdentifier);
            return;
        }
        let address = self.base_address.wrapping_add(self.code.len() as u16);
        if !self.symbols.insert(id as u8, address) {
            self.report(ErrorCode::SymbolTableOverflow);
        }
    }

    // ------------------------------------------------------------------
    // Keyword handlers
    // ------------------------------------------------------------------

    fn handle_keyword(&mut self, keyword: Keyword, cur: &mut Cursor) {
        match keyword {
            Keyword::Nvc => self.handle_nvc(cur),
            Keyword::Act => self.handle_voice_control(cur, true),
            Keyword::Dct => self.handle_voice_control(cur, false),
            Keyword::Wav => self.handle_wav(cur),
            Keyword::Tpo => self.handle_tpo(cur),
            Keyword::Abs => self.handle_abs(),
            Keyword::Jmp => self.handle_jump(cur, OP_JUMP),
            Keyword::Jsr => self.handle_jump(cur, OP_CALL),
            Keyword::Rts => self.handle_rts(),
            Keyword::Sub => self.handle_sub(),
            Keyword::Esb => self.handle_esb(),
            Keyword::End => self.handle_end(),
        }
    }

    fn handle_nvc(&mut self, cur: &mut Cursor) {
        let Some(count) = self.parse_numeric_arg(cur) else {
            return;
        };
        if !(1..=NUM_VOICES as u16).contains(&count) {
            self.report(ErrorCode::ArgOutOfRange);
            return;
        }
        self.check_event_conflict();
        self.emit_byte(OP_SET_VOICES);
        self.emit_byte(count as u8);
    }

    fn handle_voice_control(&mut self, cur: &mut Cursor, activate: bool) {
        let opcode = if activate { OP_ACTIVATE } else { OP_DEACTIVATE };
        loop {
            cur.skip_whitespace();
            if let Some(voice) = self.parse_numeric_arg(cur) {
                if (1..=NUM_VOICES as u16).contains(&voice) {
                    let index = (voice - 1) as usize;
                    self.check_event_conflict();
                    self.emit_byte(opcode);
                    self.emit_byte(index as u8);
                    self.voices[index].duration = if activate { 0 } else { VOICE_INACTIVE };
                } else {
                    self.report(ErrorCode::ArgOutOfRange);
                }
            }
            cur.skip_whitespace();
            if cur.peek() == Some(b',') {
                cur.bump();
            } else {
                break;
            }
        }
    }

    fn handle_wav(&mut self, cur: &mut Cursor) {
        let Some(waveform) = self.parse_numeric_arg(cur) else {
            return;
        };
        if !(1..=16).contains(&waveform) {
            self.report(ErrorCode::ArgOutOfRange);
            return;
        }
        cur.skip_whitespace();
        if cur.peek() != Some(b',') {
            self.report(ErrorCode::IncomprehensibleSpec);
            return;
        }
        cur.bump();
        cur.skip_whitespace();
        let Some(voice) = self.parse_numeric_arg(cur) else {
            return;
        };
        if !(1..=NUM_VOICES as u16).contains(&voice) {
            self.report(ErrorCode::ArgOutOfRange);
            return;
        }
        cur.skip_whitespace();
        if !matches!(cur.peek(), None | Some(b' ') | Some(b';')) {
            self.report(ErrorCode::IncomprehensibleSpec);
            cur.recover_token();
            return;
        }
        // No opcode here: the new waveform rides in the next long note,
        // which only the long form can carry.
        let index = (voice - 1) as usize;
        self.voices[index].use_absolute = true;
        self.voices[index].waveform = (waveform - 1) as u8;
    }

    fn handle_tpo(&mut self, cur: &mut Cursor) {
        let Some(tempo) = self.parse_numeric_arg(cur) else {
            return;
        };
        if tempo == 0 {
            self.report(ErrorCode::ArgOutOfRange);
            return;
        }
        self.check_event_conflict();
        self.emit_byte(OP_TEMPO);
        self.emit_byte(tempo as u8);
    }

    fn handle_abs(&mut self) {
        for voice in &mut self.voices {
            voice.use_absolute = true;
        }
    }

    fn handle_jump(&mut self, cur: &mut Cursor, opcode: u8) {
        let Some(id) = self.parse_numeric_arg(cur) else {
            return;
        };
        if id == 0 {
            self.report(ErrorCode::ArgOutOfRange);
            return;
        }
        let Some(target) = self.symbols.lookup(id as u8) else {
            self.report(ErrorCode::UndefinedIdentifier);
            self.check_event_conflict();
            return;
        };
        self.check_event_conflict();
        self.emit_byte(opcode);
        self.emit_word(target.wrapping_sub(self.base_address));
    }

    fn handle_rts(&mut self) {
        self.check_event_conflict();
        self.emit_byte(OP_RETURN);
    }

    fn handle_sub(&mut self) {
        if self.sub_operand.is_some() {
            self.report(ErrorCode::NestedSubEsb);
            self.check_event_conflict();
            return;
        }
        self.check_event_conflict();
        self.emit_byte(OP_JUMP);
        self.sub_operand = Some(self.code.len());
        self.emit_word(0x0000);
    }

    fn handle_esb(&mut self) {
        let Some(operand) = self.sub_operand.take() else {
            self.report(ErrorCode::EsbWithoutSub);
            self.check_event_conflict();
            return;
        };
        self.check_event_conflict();
        let target = self.code.len() as u16;
        self.code[operand] = (target & 0xFF) as u8;
        self.code[operand + 1] = (target >> 8) as u8;
    }

    fn handle_end(&mut self) {
        self.emit_byte(OP_END);
        self.end_seen = true;
        if self.sub_operand.is_some() {
            self.report(ErrorCode::HangingSub);
        }
    }

    fn check_event_conflict(&mut self) {
        if self.event_building {
            self.report(ErrorCode::ExecCtrlInEvent);
            self.event_building = false;
        }
    }

    // ------------------------------------------------------------------
    // Note parsing and event assembly
    // ------------------------------------------------------------------

    fn parse_note_token(&mut self, cur: &mut Cursor) -> Result<()> {
        match self.parse_note_spec(cur) {
            Some(note) => self.process_note_event(&note),
            None => {
                cur.recover_token();
                Ok(())
            }
        }
    }

    fn parse_note_spec(&mut self, cur: &mut Cursor) -> Option<NoteSpec> {
        let mut note = NoteSpec::default();

        if let Some(digit @ b'1'..=b'4') = cur.peek() {
            note.voice = digit - b'0';
            cur.bump();
        }

        if cur.peek() == Some(b'R') {
            cur.bump();
        } else {
            let letter = match cur.peek() {
                Some(c @ b'A'..=b'G') => c,
                _ => {
                    self.report(ErrorCode::IncomprehensibleSpec);
                    return None;
                }
            };
            cur.bump();
            let accidental = match cur.peek() {
                Some(b'#') => {
                    cur.bump();
                    Accidental::Sharp
                }
                Some(b'@') => {
                    cur.bump();
                    Accidental::Flat
                }
                _ => Accidental::Natural,
            };
            note.pitch = chromatic_slot(letter, accidental);
            if let Some(digit @ b'1'..=b'6') = cur.peek() {
                note.octave = digit - b'0';
                cur.bump();
            }
        }

        let letter = match cur.peek() {
            Some(c) if is_duration_letter(c) => c,
            _ => {
                self.report(ErrorCode::IllegalDuration);
                return None;
            }
        };
        cur.bump();
        let modifier = match cur.peek() {
            Some(b'.') => {
                cur.bump();
                LengthModifier::Dotted
            }
            Some(b'3') => {
                cur.bump();
                LengthModifier::Triplet
            }
            _ => LengthModifier::Plain,
        };
        let Some(code) = duration_code(letter, modifier) else {
            self.report(ErrorCode::IllegalDuration);
            return None;
        };
        note.duration_code = code;
        note.duration_time = notran_core::duration::duration_units(code);

        if !matches!(cur.peek(), None | Some(b' ') | Some(b';')) {
            self.report(ErrorCode::IncomprehensibleSpec);
            return None;
        }

        Some(note)
    }

    fn process_note_event(&mut self, note: &NoteSpec) -> Result<()> {
        if !self.event_building {
            self.voice_ptr = 0;
            self.event_building = true;
            if !self.any_voice_active() {
                self.report(ErrorCode::NoVoicesActive);
                return Err(CompileError::NoVoicesActive {
                    line: self.line_number,
                });
            }
        }

        let Some(voice_idx) = self.next_voice_needing_note(self.voice_ptr) else {
            self.report(ErrorCode::NoVoicesActive);
            return Ok(());
        };

        if note.voice != 0 && voice_idx != (note.voice - 1) as usize {
            self.report(ErrorCode::VoiceMismatch);
        }

        if note.pitch == 0 {
            self.emit_byte(REST_MASK | note.duration_code);
        } else {
            let mut octave = note.octave;
            if octave == 0 {
                octave = self.voices[voice_idx].octave;
                if octave == 0 {
                    self.report(ErrorCode::PitchOutOfRange);
                    octave = 4;
                }
            }
            self.voices[voice_idx].octave = octave;

            let mut pitch = i16::from(octave) * 12 + i16::from(note.pitch) - 12;
            if !(1..=i16::from(MAX_PITCH)).contains(&pitch) {
                self.report(ErrorCode::PitchOutOfRange);
                pitch = i16::from(MAX_PITCH);
            }
            let pitch = pitch as u8;

            let track = self.voices[voice_idx];
            let delta = i16::from(pitch) - i16::from(track.pitch);
            if !track.use_absolute && track.pitch != 0 && (-7..=7).contains(&delta) {
                self.emit_byte(((delta as u8 & 0x0F) << 4) | note.duration_code);
            } else {
                self.emit_byte(OP_LONG_NOTE_ABS);
                self.emit_byte(pitch * 2);
                self.emit_byte((track.waveform << 4) | note.duration_code);
            }
            self.voices[voice_idx].pitch = pitch;
        }

        self.voices[voice_idx].duration = note.duration_time;
        self.voices[voice_idx].use_absolute = false;

        match self.next_voice_needing_note(voice_idx + 1) {
            None => self.complete_event(),
            Some(_) => self.voice_ptr = voice_idx + 1,
        }
        Ok(())
    }

    fn any_voice_active(&self) -> bool {
        self.voices.iter().any(|v| v.duration != VOICE_INACTIVE)
    }

    fn next_voice_needing_note(&self, start: usize) -> Option<usize> {
        (start..NUM_VOICES).find(|&i| self.voices[i].duration == 0)
    }

    fn complete_event(&mut self) {
        let minimum = self
            .voices
            .iter()
            .filter(|v| v.duration != VOICE_INACTIVE)
            .map(|v| v.duration)
            .min()
            .unwrap_or(VOICE_INACTIVE);
        for voice in &mut self.voices {
            if voice.duration != VOICE_INACTIVE {
                voice.duration -= minimum;
            }
        }
        self.event_building = false;
    }

    // ------------------------------------------------------------------
    // Emission and reporting
    // ------------------------------------------------------------------

    fn emit_byte(&mut self, byte: u8) {
        if self.code.len() >= MAX_CODE_SIZE {
            self.report(ErrorCode::CodeOverflow);
            return;
        }
        self.code.push(byte);
    }

    fn emit_word(&mut self, word: u16) {
        self.emit_byte((word & 0xFF) as u8);
        self.emit_byte((word >> 8) as u8);
    }

    fn parse_numeric_arg(&mut self, cur: &mut Cursor) -> Option<u16> {
        cur.skip_whitespace();
        match cur.scan_number() {
            Scanned::NoDigit => {
                self.report(ErrorCode::IncomprehensibleSpec);
                None
            }
            Scanned::Overflow => {
                self.report(ErrorCode::ArgOutOfRange);
                None
            }
            Scanned::Value(value) => Some(value),
        }
    }

    fn report(&mut self, code: ErrorCode) {
        let diagnostic = Diagnostic {
            line: self.line_number,
            code,
        };
        log::error!("{diagnostic}");
        self.diagnostics.push(diagnostic);
    }
}
