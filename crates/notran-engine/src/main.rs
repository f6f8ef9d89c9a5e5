//! `notint` — play a compiled NOTRAN program.

use std::fs;
use std::path::PathBuf;
use std::sync::atomic::Ordering;

use anyhow::Context;
use clap::Parser;

use notran_core::WavetableBank;
use notran_engine::{
    Interpreter, SampleSink, StreamSink, Termination, WavSink, DEFAULT_SAMPLE_RATE,
};

#[derive(Parser, Debug)]
#[command(
    name = "notint",
    version,
    about = "NOTRAN bytecode interpreter and synthesizer",
    long_about = "Interprets a compiled NOTRAN program, synthesizing 8-bit \
                  mono PCM from a wavetable bank. Output goes to the default \
                  audio device, or to a WAV file with -o."
)]
struct Args {
    /// Compiled NOTRAN program (raw binary)
    bytecode: PathBuf,

    /// Wavetable bank (contiguous 256-byte tables)
    wavetables: PathBuf,

    /// Write a WAV file instead of playing live audio
    #[arg(short = 'o', long = "output")]
    output: Option<PathBuf>,

    /// Sample rate in Hz
    #[arg(short = 'r', long = "rate", default_value_t = DEFAULT_SAMPLE_RATE, value_parser = parse_rate)]
    rate: u32,

    /// Maximum number of jumps before stopping (default: unlimited)
    #[arg(short = 'j', long = "jumps")]
    jumps: Option<u32>,
}

fn parse_rate(text: &str) -> Result<u32, String> {
    let rate: u32 = text.parse().map_err(|_| format!("invalid rate '{text}'"))?;
    if !(1000..=96000).contains(&rate) {
        return Err("sample rate must be in 1000..=96000".into());
    }
    Ok(rate)
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp(None)
        .format_target(false)
        .init();

    let args = Args::parse();

    let bank = WavetableBank::load(&args.wavetables)
        .with_context(|| format!("cannot load wavetables '{}'", args.wavetables.display()))?;
    let code = fs::read(&args.bytecode)
        .with_context(|| format!("cannot load bytecode '{}'", args.bytecode.display()))?;
    log::info!("loaded NOTRAN bytecode ({} bytes)", code.len());

    let mut interpreter = Interpreter::new(code, bank)?;
    if let Some(jumps) = args.jumps {
        interpreter = interpreter.with_jump_budget(jumps);
    }

    let cancel = interpreter.cancel_flag();
    ctrlc::set_handler(move || cancel.store(false, Ordering::Relaxed))
        .context("cannot install interrupt handler")?;

    let mut sink: Box<dyn SampleSink> = match &args.output {
        Some(path) => Box::new(
            WavSink::create(path, args.rate)
                .with_context(|| format!("cannot create WAV file '{}'", path.display()))?,
        ),
        None => Box::new(StreamSink::open(args.rate).context(
            "cannot open audio device (tip: try WAV output with -o output.wav)",
        )?),
    };

    println!("Starting NOTRAN playback...");
    let termination = interpreter.run(sink.as_mut())?;
    sink.finalize()?;

    match termination {
        Termination::Finished => println!("Interpretation complete"),
        Termination::JumpBudgetExhausted => println!("Stopped at the jump limit"),
        Termination::Cancelled => println!("Interrupted"),
    }

    Ok(())
}
