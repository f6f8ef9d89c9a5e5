//! Listing output.
//!
//! Each source line is echoed (already uppercased); lines that may generate
//! code are followed by the four-hex-digit start address and the emitted
//! bytes.

use std::io::{self, Write};

pub(crate) struct ListingWriter {
    out: Box<dyn Write>,
}

impl ListingWriter {
    pub fn new(out: Box<dyn Write>) -> Self {
        ListingWriter { out }
    }

    /// Record one processed source line and the bytes it produced,
    /// starting at absolute address `address`.
    pub fn record(&mut self, line: &str, address: u16, bytes: &[u8]) -> io::Result<()> {
        if line.starts_with('*') {
            return writeln!(self.out, "{line}");
        }
        if line.is_empty() {
            return writeln!(self.out);
        }
        writeln!(self.out, "{line}")?;
        write!(self.out, "{address:04X}  ")?;
        for byte in bytes {
            write!(self.out, "{byte:02X} ")?;
        }
        writeln!(self.out)
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }
}
