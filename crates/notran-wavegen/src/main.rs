//! `notwav` — generate wavetables from YAML harmonic specifications.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{bail, Context};
use clap::Parser;

use notran_wavegen::{
    generate, parse_specs, write_assembly, write_bank_entry, write_file_header,
};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
enum OutputKind {
    /// CA65 assembler text.
    #[default]
    Asm,
    /// Raw bank of 256-byte tables, as consumed by the interpreter.
    Bin,
}

impl FromStr for OutputKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "asm" => Ok(OutputKind::Asm),
            "bin" => Ok(OutputKind::Bin),
            other => Err(format!("unknown output format '{other}' (expected: asm, bin)")),
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "notwav",
    version,
    about = "NOTRAN wavetable generator",
    long_about = "Synthesizes 256-sample wavetables from Fourier harmonic \
                  specifications in YAML, emitting CA65 assembler text or a \
                  raw wavetable bank."
)]
struct Args {
    /// YAML file of waveform specifications
    input: PathBuf,

    /// Output file (stdout if omitted)
    #[arg(short = 'o', long = "output")]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short = 'f', long = "format", default_value = "asm")]
    format: OutputKind,
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp(None)
        .format_target(false)
        .init();

    let args = Args::parse();

    let input = fs::read_to_string(&args.input)
        .with_context(|| format!("cannot open file '{}'", args.input.display()))?;
    let specs = parse_specs(&input)?;
    if specs.is_empty() {
        bail!("no valid specifications found in '{}'", args.input.display());
    }

    let mut out: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(BufWriter::new(File::create(path).with_context(
            || format!("cannot create output file '{}'", path.display()),
        )?)),
        None => Box::new(io::stdout().lock()),
    };

    if args.format == OutputKind::Asm {
        write_file_header(&mut out, &args.input.display().to_string())?;
    }

    let mut generated = 0usize;
    for spec in &specs {
        let table = match generate(spec) {
            Ok(table) => table,
            Err(error) => {
                log::warn!("{error}, skipping");
                continue;
            }
        };
        match args.format {
            OutputKind::Asm => {
                if generated > 0 {
                    writeln!(out)?;
                }
                write_assembly(&mut out, spec, &table)?;
            }
            OutputKind::Bin => write_bank_entry(&mut out, &table)?,
        }
        log::info!("Generated: {} ({} harmonics)", spec.name, spec.harmonic_count());
        generated += 1;
    }
    out.flush()?;

    if generated == 0 {
        bail!("no waveform could be generated");
    }
    Ok(())
}
