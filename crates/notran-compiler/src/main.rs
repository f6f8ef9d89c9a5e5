//! `notcmp` — compile NOTRAN notation to a byte-stream program.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::Parser;

use notran_compiler::{objfile, Compiler, ObjectFormat};

#[derive(Parser, Debug)]
#[command(
    name = "notcmp",
    version,
    about = "NOTRAN music notation compiler",
    long_about = "Compiles a NOTRAN score into a byte-stream program for the \
                  NOTRAN synthesis engine. The object file is only written \
                  when the source compiles without errors."
)]
struct Args {
    /// NOTRAN source file
    input: PathBuf,

    /// Object file to write
    #[arg(short = 'o', long = "output")]
    output: PathBuf,

    /// Object file format
    #[arg(short = 'f', long = "format", default_value_t = ObjectFormat::Bin)]
    format: ObjectFormat,

    /// Load address of the image, as a C-style integer literal
    #[arg(short = 'a', long = "address", default_value = "0", value_parser = parse_address)]
    address: u16,

    /// Listing file
    #[arg(short = 'l', long = "listing")]
    listing: Option<PathBuf>,
}

/// Parse a C-style integer literal: `0x` hex, leading-zero octal, decimal.
fn parse_address(text: &str) -> Result<u16, String> {
    let parsed = if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        u16::from_str_radix(hex, 16)
    } else if text.len() > 1 && text.starts_with('0') {
        u16::from_str_radix(&text[1..], 8)
    } else {
        text.parse()
    };
    parsed.map_err(|_| format!("invalid address '{text}'"))
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp(None)
        .format_target(false)
        .init();

    let args = Args::parse();

    let input = File::open(&args.input)
        .with_context(|| format!("cannot open input file '{}'", args.input.display()))?;

    let mut compiler = Compiler::new(args.address);
    if let Some(path) = &args.listing {
        let listing = File::create(path)
            .with_context(|| format!("cannot open listing file '{}'", path.display()))?;
        compiler = compiler.with_listing(Box::new(BufWriter::new(listing)));
    }

    let music = compiler.compile(BufReader::new(input))?;

    if !music.is_clean() {
        bail!(
            "compilation failed with {} error{}",
            music.diagnostics.len(),
            if music.diagnostics.len() == 1 { "" } else { "s" }
        );
    }

    let output = File::create(&args.output)
        .with_context(|| format!("cannot open output file '{}'", args.output.display()))?;
    let mut writer = BufWriter::new(output);
    objfile::write_object(&mut writer, args.format, &music.code, music.base_address)
        .context("cannot write object file")?;

    println!("Compilation successful:");
    println!("  Lines: {}", music.lines);
    println!("  Code size: {} bytes", music.code.len());
    println!("  Symbols: {}", music.symbols.len());
    println!("  Base address: 0x{:04X}", music.base_address);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_literals() {
        assert_eq!(parse_address("0").unwrap(), 0);
        assert_eq!(parse_address("4096").unwrap(), 4096);
        assert_eq!(parse_address("0x1000").unwrap(), 0x1000);
        assert_eq!(parse_address("0X1F").unwrap(), 0x1F);
        assert_eq!(parse_address("0777").unwrap(), 0o777);
        assert!(parse_address("banana").is_err());
        assert!(parse_address("0x10000").is_err());
    }
}
