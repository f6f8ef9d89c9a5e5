//! Output writers: CA65 assembler text and raw banks.

use std::io::{self, Write};

use notran_core::WAVETABLE_SIZE;

use crate::waveform::WaveformSpec;

const BYTES_PER_ROW: usize = 16;

/// Banner at the top of an assembler file.
pub fn write_file_header<W: Write>(out: &mut W, source_name: &str) -> io::Result<()> {
    writeln!(out, "; Waveform tables generated by notwav")?;
    writeln!(out, "; Generated from: {source_name}")?;
    writeln!(out)
}

/// One exported, segment-placed `.byte` table.
pub fn write_assembly<W: Write>(
    out: &mut W,
    spec: &WaveformSpec,
    table: &[u8; WAVETABLE_SIZE],
) -> io::Result<()> {
    writeln!(out, "; {}", spec.desc)?;
    writeln!(out, ";")?;
    writeln!(out, ".segment \"{}\"", spec.segment)?;
    writeln!(out, ".export {}", spec.name)?;
    writeln!(out, "{}:", spec.name)?;
    for row in table.chunks(BYTES_PER_ROW) {
        write!(out, "    .byte ")?;
        for (column, byte) in row.iter().enumerate() {
            if column > 0 {
                write!(out, ",")?;
            }
            write!(out, "${byte:02X}")?;
        }
        writeln!(out)?;
    }
    Ok(())
}

/// Raw form: the bare 256 bytes, appended to the bank in order.
pub fn write_bank_entry<W: Write>(out: &mut W, table: &[u8; WAVETABLE_SIZE]) -> io::Result<()> {
    out.write_all(table)
}
