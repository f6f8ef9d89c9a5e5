//! Object-file emitters.
//!
//! Three formats share the compiled image: raw binary, PAP hex records and
//! Intel HEX records. Both hex formats run the same checksum over byte
//! count, address halves and data; PAP emits it as a 16-bit sum, Intel HEX
//! as the 8-bit two's complement.

use std::fmt;
use std::io::{self, Write};
use std::str::FromStr;

/// Data bytes per PAP record.
const PAP_BYTES_PER_LINE: usize = 24;

/// Data bytes per Intel HEX record.
const INTEL_BYTES_PER_LINE: usize = 32;

/// Supported object-file formats.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ObjectFormat {
    /// Raw code bytes.
    #[default]
    Bin,
    /// PAP hex records.
    Pap,
    /// Intel HEX records.
    IntelHex,
}

impl FromStr for ObjectFormat {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "bin" => Ok(ObjectFormat::Bin),
            "pap" => Ok(ObjectFormat::Pap),
            "ihex" => Ok(ObjectFormat::IntelHex),
            other => Err(format!(
                "unknown output format '{other}' (expected: bin, pap, ihex)"
            )),
        }
    }
}

impl fmt::Display for ObjectFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ObjectFormat::Bin => "bin",
            ObjectFormat::Pap => "pap",
            ObjectFormat::IntelHex => "ihex",
        })
    }
}

/// Write a compiled image in the requested format.
pub fn write_object<W: Write>(
    out: &mut W,
    format: ObjectFormat,
    code: &[u8],
    base_address: u16,
) -> io::Result<()> {
    if code.is_empty() {
        return Ok(());
    }
    match format {
        ObjectFormat::Bin => out.write_all(code),
        ObjectFormat::Pap => write_pap(out, code, base_address),
        ObjectFormat::IntelHex => write_intel_hex(out, code, base_address),
    }
}

/// Shared running sum: byte count, both address halves, every data byte.
fn record_checksum(address: u16, data: &[u8]) -> u16 {
    let mut sum = data.len() as u16;
    sum = sum.wrapping_add(address >> 8).wrapping_add(address & 0xFF);
    for &byte in data {
        sum = sum.wrapping_add(u16::from(byte));
    }
    sum
}

fn write_hex_bytes<W: Write>(out: &mut W, data: &[u8]) -> io::Result<()> {
    for byte in data {
        write!(out, "{byte:02X}")?;
    }
    Ok(())
}

fn write_pap<W: Write>(out: &mut W, code: &[u8], base_address: u16) -> io::Result<()> {
    let mut record_count: u16 = 0;
    for (index, chunk) in code.chunks(PAP_BYTES_PER_LINE).enumerate() {
        let address = base_address.wrapping_add((index * PAP_BYTES_PER_LINE) as u16);
        write!(out, ";{:02X}{address:04X}", chunk.len())?;
        write_hex_bytes(out, chunk)?;
        writeln!(out, "{:04X}", record_checksum(address, chunk))?;
        record_count += 1;
    }
    let trailer_checksum = (record_count >> 8) + (record_count & 0xFF);
    writeln!(out, ";00{record_count:04X}{trailer_checksum:04X}")
}

fn write_intel_hex<W: Write>(out: &mut W, code: &[u8], base_address: u16) -> io::Result<()> {
    for (index, chunk) in code.chunks(INTEL_BYTES_PER_LINE).enumerate() {
        let address = base_address.wrapping_add((index * INTEL_BYTES_PER_LINE) as u16);
        write!(out, ":{:02X}{address:04X}00", chunk.len())?;
        write_hex_bytes(out, chunk)?;
        let checksum = (record_checksum(address, chunk) as u8).wrapping_neg();
        writeln!(out, "{checksum:02X}")?;
    }
    out.write_all(b":00000001FF\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(format: ObjectFormat, code: &[u8], base: u16) -> String {
        let mut out = Vec::new();
        write_object(&mut out, format, code, base).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn bin_is_the_raw_image() {
        let code = [0x50, 0x01, 0x90, 0x00, 0x00];
        let mut out = Vec::new();
        write_object(&mut out, ObjectFormat::Bin, &code, 0x1234).unwrap();
        assert_eq!(out, code);
    }

    #[test]
    fn empty_image_writes_nothing() {
        assert_eq!(render(ObjectFormat::Pap, &[], 0), "");
        assert_eq!(render(ObjectFormat::IntelHex, &[], 0), "");
    }

    #[test]
    fn pap_record_and_trailer() {
        let code = [0x50, 0x01, 0x90, 0x00, 0x00];
        // Checksum: 5 + 0 + 0 + 0x50 + 0x01 + 0x90 + 0 + 0 = 0x00E6.
        assert_eq!(
            render(ObjectFormat::Pap, &code, 0),
            ";050000500190000000E6\n;0000010001\n"
        );
    }

    #[test]
    fn pap_splits_long_images() {
        let code = vec![0xAA; 30];
        let text = render(ObjectFormat::Pap, &code, 0x200);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with(";180200"));
        assert!(lines[1].starts_with(";060218"));
        assert_eq!(lines[2], ";0000020002");
    }

    #[test]
    fn intel_hex_record_and_eof() {
        let code = [0x50, 0x01, 0x90, 0x00, 0x00];
        // Two's complement of 0xE6 is 0x1A.
        assert_eq!(
            render(ObjectFormat::IntelHex, &code, 0),
            ":0500000050019000001A\n:00000001FF\n"
        );
    }

    #[test]
    fn intel_hex_checksum_includes_address() {
        let code = [0xFF];
        let text = render(ObjectFormat::IntelHex, &code, 0x0103);
        // Sum = 0x01 + 0x01 + 0x03 + 0xFF = 0x104; low byte 0x04 -> 0xFC.
        assert_eq!(text, ":01010300FFFC\n:00000001FF\n");
    }

    #[test]
    fn format_names_round_trip() {
        for format in [ObjectFormat::Bin, ObjectFormat::Pap, ObjectFormat::IntelHex] {
            assert_eq!(format.to_string().parse::<ObjectFormat>().unwrap(), format);
        }
        assert!("elf".parse::<ObjectFormat>().is_err());
    }
}
