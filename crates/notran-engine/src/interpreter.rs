//! The fetch–decode–execute loop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use notran_core::opcode::{self, ControlOp, DURATION_MASK, OP_LONG_NOTE_ABS, PITCH_MASK};
use notran_core::{WavetableBank, NUM_VOICES, VOICE_INACTIVE};

use crate::sink::SampleSink;
use crate::voice::Voice;
use crate::{EngineError, Result};

/// Maximum call-stack depth.
const STACK_SIZE: usize = 256;

/// Samples rendered per sink write.
const RENDER_CHUNK: usize = 1024;

/// Tempo assumed when a program starts playing notes without setting one.
const FALLBACK_TEMPO: u8 = 32;

/// Why interpretation stopped. Every variant is a clean, successful end.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Termination {
    /// END opcode reached or the program ran off the end of the image.
    Finished,
    /// The configured jump budget ran out.
    JumpBudgetExhausted,
    /// The cancellation flag was cleared from outside.
    Cancelled,
}

/// The NOTRAN bytecode interpreter.
pub struct Interpreter {
    code: Vec<u8>,
    code_ptr: usize,
    voices: [Voice; NUM_VOICES],
    bank: WavetableBank,
    tempo: u8,
    duration: u8,
    call_stack: Vec<u16>,
    num_active_voices: usize,
    jump_budget: Option<u32>,
    running: Arc<AtomicBool>,
}

impl Interpreter {
    /// Create an interpreter over a program image and a wavetable bank.
    pub fn new(code: Vec<u8>, bank: WavetableBank) -> Result<Self> {
        if code.is_empty() {
            return Err(EngineError::EmptyProgram);
        }
        Ok(Interpreter {
            code,
            code_ptr: 0,
            voices: [Voice::default(); NUM_VOICES],
            bank,
            tempo: 0,
            duration: 0,
            call_stack: Vec::with_capacity(STACK_SIZE),
            num_active_voices: NUM_VOICES,
            jump_budget: None,
            running: Arc::new(AtomicBool::new(true)),
        })
    }

    /// Cap the number of jumps taken. Reaching the cap stops playback
    /// cleanly; it is a limiter for looping programs, not an error.
    pub fn with_jump_budget(mut self, budget: u32) -> Self {
        self.jump_budget = Some(budget);
        self
    }

    /// Flag observed by the render loop. Storing `false` (for example from
    /// a Ctrl-C handler) makes [`run`](Self::run) return
    /// [`Termination::Cancelled`] within one render chunk.
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    /// Interpret the program to completion, writing PCM to `sink`.
    pub fn run(&mut self, sink: &mut dyn SampleSink) -> Result<Termination> {
        if self.tempo == 0 {
            log::warn!("tempo not set, using default of {FALLBACK_TEMPO}");
            self.tempo = FALLBACK_TEMPO;
        }

        let mut chunk = [0u8; RENDER_CHUNK];
        while self.running.load(Ordering::Relaxed) && self.code_ptr < self.code.len() {
            let iteration_start = self.code_ptr;
            if let Some(termination) = self.drain_controls()? {
                return Ok(termination);
            }
            if self.code_ptr >= self.code.len() {
                break;
            }

            self.schedule_notes();

            self.duration = self.shortest_pending_duration();
            if self.duration == VOICE_INACTIVE || self.duration == 0 {
                // Nothing to render. If nothing was consumed either, the
                // byte under the cursor is a note no voice can take.
                let byte = self.code[self.code_ptr];
                if self.code_ptr == iteration_start
                    && (!opcode::is_control(byte) || opcode::is_long_note(byte))
                {
                    return Err(EngineError::UnexpectedNote {
                        offset: self.code_ptr,
                        opcode: byte,
                    });
                }
                continue;
            }

            self.render_event(sink, &mut chunk)?;
        }

        if self.running.load(Ordering::Relaxed) {
            Ok(Termination::Finished)
        } else {
            Ok(Termination::Cancelled)
        }
    }

    // ------------------------------------------------------------------
    // Phase A: control commands
    // ------------------------------------------------------------------

    fn drain_controls(&mut self) -> Result<Option<Termination>> {
        while self.code_ptr < self.code.len() {
            let byte = self.code[self.code_ptr];
            if !opcode::is_control(byte) || opcode::is_long_note(byte) {
                break;
            }
            let offset = self.code_ptr;
            self.code_ptr += 1;

            let Some(op) = ControlOp::from_byte(byte) else {
                return Err(EngineError::UndefinedOpcode { offset, opcode: byte });
            };

            match op {
                ControlOp::End => return Ok(Some(Termination::Finished)),
                ControlOp::Tempo => {
                    let tempo = self.read_byte();
                    if tempo == 0 {
                        return Err(EngineError::ZeroTempo { offset });
                    }
                    self.tempo = tempo;
                }
                ControlOp::Call => {
                    if self.call_stack.len() >= STACK_SIZE {
                        return Err(EngineError::CallStackOverflow { offset });
                    }
                    self.call_stack.push((self.code_ptr + 2) as u16);
                    let target = self.read_address();
                    self.transfer_to(target, offset)?;
                }
                ControlOp::Return => {
                    let Some(address) = self.call_stack.pop() else {
                        return Err(EngineError::CallStackUnderflow { offset });
                    };
                    self.code_ptr = address as usize;
                }
                ControlOp::Jump => {
                    match &mut self.jump_budget {
                        Some(0) => {
                            log::info!("jump budget exhausted at position {offset}");
                            return Ok(Some(Termination::JumpBudgetExhausted));
                        }
                        Some(remaining) => *remaining -= 1,
                        None => {}
                    }
                    let target = self.read_address();
                    self.transfer_to(target, offset)?;
                }
                ControlOp::SetVoices => {
                    let requested = self.read_byte();
                    if !(1..=NUM_VOICES as u8).contains(&requested) {
                        log::warn!("invalid voice count {requested} at position {offset}");
                    }
                    self.num_active_voices = usize::from(requested).clamp(1, NUM_VOICES);
                }
                ControlOp::Deactivate => {
                    let index = (self.read_byte() & 0x03) as usize;
                    self.voices[index].deactivate();
                }
                ControlOp::Activate => {
                    let index = (self.read_byte() & 0x03) as usize;
                    self.voices[index].activate();
                }
            }
        }
        Ok(None)
    }

    fn read_byte(&mut self) -> u8 {
        let byte = self.code.get(self.code_ptr).copied().unwrap_or(0);
        self.code_ptr += 1;
        byte
    }

    fn read_address(&mut self) -> u16 {
        let low = self.read_byte();
        let high = self.read_byte();
        u16::from(low) | (u16::from(high) << 8)
    }

    fn transfer_to(&mut self, target: u16, offset: usize) -> Result<()> {
        if usize::from(target) >= self.code.len() {
            return Err(EngineError::TargetOutOfRange { offset, target });
        }
        self.code_ptr = usize::from(target);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Phase B: note scheduling
    // ------------------------------------------------------------------

    /// Retire the elapsed event from every active voice and fetch the next
    /// note for each one that expired. A control command mid-event rewinds
    /// one byte and hands back to the control drain.
    fn schedule_notes(&mut self) {
        for index in 0..NUM_VOICES {
            if !self.voices[index].is_active() {
                continue;
            }

            if self.voices[index].duration > 0 && self.duration > 0 {
                if self.voices[index].duration > self.duration {
                    self.voices[index].duration -= self.duration;
                    continue;
                }
                self.voices[index].duration = 0;
            }
            if !self.voices[index].is_expired() {
                continue;
            }
            if self.code_ptr >= self.code.len() {
                break;
            }

            let byte = self.read_byte();
            if byte & DURATION_MASK == 0 {
                if opcode::is_long_note(byte) {
                    self.assign_long_note(index, byte);
                } else {
                    self.code_ptr -= 1;
                    return;
                }
            } else {
                self.voices[index].assign_short(byte);
            }
        }
    }

    fn assign_long_note(&mut self, index: usize, prefix: u8) {
        let offset = self.code_ptr - 1;
        let pitch_byte = self.read_byte();
        let pack = self.read_byte();

        let mut code = pack & DURATION_MASK;
        if code == 0 {
            log::warn!("long note with duration code 0 at position {offset}");
            code = 1;
        }

        let mut waveform = (pack >> 4) & 0x0F;
        if usize::from(waveform) >= self.bank.len() {
            log::warn!("invalid wavetable {waveform} at position {offset}");
            waveform = (self.bank.len() - 1) as u8;
        }

        let absolute = prefix & PITCH_MASK == OP_LONG_NOTE_ABS;
        self.voices[index].assign_long(absolute, pitch_byte, waveform, code);
    }

    fn shortest_pending_duration(&self) -> u8 {
        self.voices
            .iter()
            .filter(|voice| voice.is_active() && !voice.is_expired())
            .map(|voice| voice.duration)
            .min()
            .unwrap_or(VOICE_INACTIVE)
    }

    // ------------------------------------------------------------------
    // Phase C: rendering
    // ------------------------------------------------------------------

    fn render_event(&mut self, sink: &mut dyn SampleSink, chunk: &mut [u8]) -> Result<()> {
        let mut remaining = usize::from(self.tempo) * usize::from(self.duration);
        while remaining > 0 && self.running.load(Ordering::Relaxed) {
            let count = remaining.min(chunk.len());
            for slot in &mut chunk[..count] {
                *slot = self.mix_sample();
            }
            sink.write(&chunk[..count])?;
            remaining -= count;
        }
        Ok(())
    }

    /// Sum the first `num_active_voices` oscillators and saturate.
    fn mix_sample(&mut self) -> u8 {
        let mut sum: u16 = 0;
        for voice in self.voices.iter_mut().take(self.num_active_voices) {
            if voice.freq_increment == 0 {
                continue;
            }
            let Some(table) = self.bank.table(usize::from(voice.wavetable_page)) else {
                continue;
            };
            sum += u16::from(table[usize::from(voice.phase_int)]);
            voice.advance_phase();
        }
        if sum > 255 {
            255
        } else {
            sum as u8
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::CaptureSink;

    fn bank() -> WavetableBank {
        // Identity ramp: table[i] == i, convenient for phase checks.
        let ramp: Vec<u8> = (0..=255).collect();
        WavetableBank::from_bytes(ramp).unwrap()
    }

    fn run(code: Vec<u8>) -> (Result<Termination>, Vec<u8>) {
        let mut sink = CaptureSink::new();
        let result = Interpreter::new(code, bank()).and_then(|mut i| i.run(&mut sink));
        (result, sink.into_samples())
    }

    #[test]
    fn empty_program_is_rejected() {
        assert!(matches!(
            Interpreter::new(Vec::new(), bank()),
            Err(EngineError::EmptyProgram)
        ));
    }

    #[test]
    fn tempo_zero_is_fatal() {
        let (result, _) = run(vec![0x10, 0x00, 0x00]);
        assert!(matches!(result, Err(EngineError::ZeroTempo { offset: 0 })));
    }

    #[test]
    fn undefined_control_opcode_is_fatal() {
        let (result, _) = run(vec![0xA0, 0x00]);
        assert!(matches!(
            result,
            Err(EngineError::UndefinedOpcode { offset: 0, opcode: 0xA0 })
        ));
    }

    #[test]
    fn return_with_empty_stack_is_fatal() {
        let (result, _) = run(vec![0x30, 0x00]);
        assert!(matches!(
            result,
            Err(EngineError::CallStackUnderflow { offset: 0 })
        ));
    }

    #[test]
    fn jump_to_end_of_image_is_fatal() {
        // Target 3 == code length: invalid; target 0 would be valid.
        let (result, _) = run(vec![0x40, 0x03, 0x00]);
        assert!(matches!(
            result,
            Err(EngineError::TargetOutOfRange { offset: 0, target: 3 })
        ));
    }

    #[test]
    fn call_and_return_round_trip() {
        // call 5; end; (sub at 5:) tempo 40; return
        let code = vec![0x20, 0x05, 0x00, 0x00, 0x00, 0x10, 0x28, 0x30];
        let mut sink = CaptureSink::new();
        let mut interp = Interpreter::new(code, bank()).unwrap();
        let result = interp.run(&mut sink).unwrap();
        assert_eq!(result, Termination::Finished);
        assert_eq!(interp.tempo, 0x28);
    }

    #[test]
    fn jump_budget_stops_a_loop_cleanly() {
        // An infinite loop back to offset 0.
        let code = vec![0x40, 0x00, 0x00];
        let mut sink = CaptureSink::new();
        let mut interp = Interpreter::new(code, bank()).unwrap().with_jump_budget(10);
        let result = interp.run(&mut sink).unwrap();
        assert_eq!(result, Termination::JumpBudgetExhausted);
    }

    #[test]
    fn set_voices_clamps_to_the_voice_count() {
        let code = vec![0x50, 0x09, 0x00];
        let mut sink = CaptureSink::new();
        let mut interp = Interpreter::new(code, bank()).unwrap();
        interp.run(&mut sink).unwrap();
        assert_eq!(interp.num_active_voices, NUM_VOICES);
    }

    #[test]
    fn voice_operands_use_the_low_two_bits() {
        let code = vec![0x90, 0x06, 0x00]; // 6 & 3 == 2
        let mut sink = CaptureSink::new();
        let mut interp = Interpreter::new(code, bank()).unwrap();
        interp.run(&mut sink).unwrap();
        assert!(interp.voices[2].is_active());
        assert!(!interp.voices[0].is_active());
    }

    #[test]
    fn cancellation_flag_short_circuits() {
        let code = vec![0x90, 0x00, 0x60, 0x18, 0x04, 0x00];
        let mut sink = CaptureSink::new();
        let mut interp = Interpreter::new(code, bank()).unwrap();
        interp.cancel_flag().store(false, Ordering::Relaxed);
        let result = interp.run(&mut sink).unwrap();
        assert_eq!(result, Termination::Cancelled);
        assert!(sink.samples().is_empty());
    }

    #[test]
    fn note_with_no_receptive_voice_is_fatal() {
        // A long note with every voice inactive can never be consumed.
        let (result, _) = run(vec![0x60, 0x18, 0x04, 0x00]);
        assert!(matches!(
            result,
            Err(EngineError::UnexpectedNote { offset: 0, opcode: 0x60 })
        ));
    }

    #[test]
    fn silent_voices_render_no_event() {
        // A voice activated but never given a note contributes nothing and
        // the program ends immediately.
        let (result, samples) = run(vec![0x90, 0x00, 0x00]);
        assert_eq!(result.unwrap(), Termination::Finished);
        assert!(samples.is_empty());
    }
}
