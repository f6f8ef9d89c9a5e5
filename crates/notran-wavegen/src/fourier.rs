//! Fourier-series evaluation with 8-bit angle arithmetic.

use std::f64::consts::PI;

use notran_core::WAVETABLE_SIZE;

use crate::waveform::WaveformSpec;
use crate::Result;

fn amplitude(term: u16) -> f64 {
    f64::from((term >> 8) & 0xFF) / 255.0
}

fn phase(term: u16) -> u8 {
    (term & 0xFF) as u8
}

fn angle_to_radians(angle: u8) -> f64 {
    f64::from(angle) / 256.0 * 2.0 * PI
}

/// One point of the series. The index accumulator is an 8-bit counter
/// stepped by the point number after every term, so harmonic `h` sees the
/// angle `h * point` modulo 256 plus its phase offset.
fn evaluate_point(spec: &WaveformSpec, point: usize) -> f64 {
    let mut accumulator = 0.0;
    let mut index: u8 = 0;
    for &term in &spec.terms {
        let angle = phase(term).wrapping_add(index);
        accumulator += amplitude(term) * angle_to_radians(angle).cos();
        index = index.wrapping_add(point as u8);
    }
    accumulator
}

fn quantize(value: f64) -> u8 {
    if value < 0.0 {
        0
    } else if value > 255.0 {
        255
    } else {
        (value + 0.5) as u8
    }
}

/// Render a specification into one wavetable.
pub fn generate(spec: &WaveformSpec) -> Result<[u8; WAVETABLE_SIZE]> {
    spec.validate()?;

    let mut raw = [0.0f64; WAVETABLE_SIZE];
    for (point, slot) in raw.iter_mut().enumerate() {
        *slot = evaluate_point(spec, point);
    }

    let mut scale = 1.0;
    let mut offset = 0.0;
    if spec.norm {
        let min = raw.iter().copied().fold(f64::INFINITY, f64::min);
        let max = raw.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let span = max - min;
        if span > 0.0 {
            scale = f64::from(spec.peak) / span;
            offset = -min;
        }
    }

    let mut table = [0u8; WAVETABLE_SIZE];
    for (slot, &value) in table.iter_mut().zip(raw.iter()) {
        let shaped = if spec.norm { (value + offset) * scale } else { value };
        *slot = quantize(shaped);
    }
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::waveform::parse_specs;
    use approx::assert_relative_eq;

    fn spec(yaml: &str) -> WaveformSpec {
        parse_specs(yaml).unwrap().remove(0)
    }

    #[test]
    fn pure_cosine_spans_zero_to_peak() {
        // One full-amplitude fundamental, normalized to 0x3F.
        let table = generate(&spec("name: cosine\nlist: [0, 65280]\n")).unwrap();
        assert_eq!(*table.iter().max().unwrap(), 0x3F);
        assert_eq!(*table.iter().min().unwrap(), 0);
        // cos starts at its maximum and dips to the minimum half way round.
        assert_eq!(table[0], 0x3F);
        assert_eq!(table[128], 0);
    }

    #[test]
    fn fundamental_has_one_period_per_table() {
        let table = generate(&spec("name: cosine\nlist: [0, 65280]\n")).unwrap();
        // One cycle: both zero crossings sit at the mid level.
        assert_relative_eq!(f64::from(table[64]), f64::from(0x3F) / 2.0, epsilon = 1.0);
        assert_relative_eq!(f64::from(table[192]), f64::from(0x3F) / 2.0, epsilon = 1.0);
    }

    #[test]
    fn second_harmonic_doubles_the_frequency() {
        // Amplitude only on harmonic 2: peaks at 0, 128; troughs at 64, 192.
        let table = generate(&spec("name: h2\nlist: [0, 0, 65280]\n")).unwrap();
        assert_eq!(table[0], 0x3F);
        assert_eq!(table[128], 0x3F);
        assert_eq!(table[64], 0);
        assert_eq!(table[192], 0);
    }

    #[test]
    fn phase_offset_rotates_the_waveform() {
        // Phase 64/256 of a turn: cos becomes -sin, so the peak moves.
        let table = generate(&spec("name: shifted\nlist: [0, 65344]\n")).unwrap();
        // 65344 = 0xFF40: amplitude 255, phase 0x40.
        assert_eq!(table[192], 0x3F);
        assert_eq!(table[64], 0);
    }

    #[test]
    fn unnormalized_output_keeps_raw_values() {
        // norm: false leaves the series sum as-is; a pure positive DC of
        // amplitude 255 evaluates to cos(0) = 1.0 everywhere -> rounds to 1.
        let table =
            generate(&spec("name: dc\nnorm: false\nlist: [65280, 256]\n")).unwrap();
        assert!(table.iter().all(|&v| v <= 2));
    }

    #[test]
    fn harmonic_count_is_enforced() {
        assert!(generate(&spec("name: empty\nlist: [0]\n")).is_err());
    }
}
