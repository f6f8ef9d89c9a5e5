//! YAML waveform specifications.
//!
//! The input is a YAML stream; each document describes one waveform:
//!
//! ```yaml
//! name: organ
//! desc: Drawbar-ish organ
//! segment: WAVE
//! peak: 0x3F
//! norm: true
//! list: [0x0000, 0xFF00, 0x8000, 0x4000]
//! ```
//!
//! `list` packs one `u16` per term, amplitude in the high byte and phase
//! (on a 256-step circle) in the low byte. The first entry is the DC term;
//! the rest are harmonics 1..N.

use serde::Deserialize;

use crate::{Result, WavegenError};

/// Most harmonics a specification may carry (after the DC term).
pub const MAX_HARMONICS: usize = 16;

fn default_segment() -> String {
    "WAVE".to_string()
}

fn default_peak() -> u8 {
    0x3F
}

fn default_norm() -> bool {
    true
}

/// One waveform description.
#[derive(Clone, Debug, Deserialize)]
pub struct WaveformSpec {
    /// Table name, used as the exported assembler symbol.
    pub name: String,

    /// Free-text description, echoed into the assembler output.
    #[serde(default)]
    pub desc: String,

    /// Assembler segment the table is placed in.
    #[serde(default = "default_segment")]
    pub segment: String,

    /// Peak value the normalized waveform is scaled to.
    #[serde(default = "default_peak")]
    pub peak: u8,

    /// Scale and offset the waveform to span [0, peak].
    #[serde(default = "default_norm")]
    pub norm: bool,

    /// Packed DC + harmonic terms: amplitude in the high byte, phase in
    /// the low byte.
    #[serde(rename = "list", default)]
    pub terms: Vec<u16>,
}

impl WaveformSpec {
    /// Number of harmonics after the DC term.
    pub fn harmonic_count(&self) -> usize {
        self.terms.len().saturating_sub(1)
    }

    /// Error unless the harmonic count is in 1..=[`MAX_HARMONICS`].
    pub fn validate(&self) -> Result<()> {
        let count = self.harmonic_count();
        if (1..=MAX_HARMONICS).contains(&count) {
            Ok(())
        } else {
            Err(WavegenError::HarmonicCount {
                name: self.name.clone(),
                count,
            })
        }
    }
}

/// Parse every document of a YAML stream. Empty documents are skipped.
pub fn parse_specs(input: &str) -> Result<Vec<WaveformSpec>> {
    let mut specs = Vec::new();
    for document in serde_yaml::Deserializer::from_str(input) {
        if let Some(spec) = Option::<WaveformSpec>::deserialize(document)? {
            specs.push(spec);
        }
    }
    Ok(specs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_the_optional_fields() {
        let specs = parse_specs("name: sine\nlist: [0, 65280]\n").unwrap();
        assert_eq!(specs.len(), 1);
        let spec = &specs[0];
        assert_eq!(spec.name, "sine");
        assert_eq!(spec.segment, "WAVE");
        assert_eq!(spec.peak, 0x3F);
        assert!(spec.norm);
        assert_eq!(spec.harmonic_count(), 1);
        spec.validate().unwrap();
    }

    #[test]
    fn multiple_documents_parse_in_order() {
        let input = "---\nname: one\nlist: [0, 65280]\n---\nname: two\nlist: [0, 32768]\n";
        let specs = parse_specs(input).unwrap();
        let names: Vec<&str> = specs.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["one", "two"]);
    }

    #[test]
    fn empty_documents_are_skipped() {
        let input = "---\n---\nname: only\nlist: [0, 65280]\n";
        let specs = parse_specs(input).unwrap();
        assert_eq!(specs.len(), 1);
    }

    #[test]
    fn harmonic_count_bounds() {
        let none = parse_specs("name: dc\nlist: [255]\n").unwrap();
        assert!(matches!(
            none[0].validate(),
            Err(WavegenError::HarmonicCount { count: 0, .. })
        ));

        let mut list = String::from("name: wide\nlist: [0");
        for _ in 0..17 {
            list.push_str(", 256");
        }
        list.push_str("]\n");
        let wide = parse_specs(&list).unwrap();
        assert!(matches!(
            wide[0].validate(),
            Err(WavegenError::HarmonicCount { count: 17, .. })
        ));
    }

    #[test]
    fn missing_name_is_an_error() {
        assert!(parse_specs("desc: nameless\nlist: [0, 1]\n").is_err());
    }
}
