use std::io::{self, BufWriter, Write};

use anyhow::{Context, Result};
use clap::Parser;
use log::info;

use midi2blocks::formatter::{BlockFormatter, EventPrinter};
use midi2blocks::render::{DEFAULT_BLOCK_SIZE, DEFAULT_SAMPLE_RATE};
use midi2blocks::{render, MidiSource, RenderConfig};

#[derive(Parser, Debug)]
#[command(version, about = "Split a MIDI file into per-block, sample-accurate event lists")]
struct Args {
    #[arg(short, long)]
    midi_file: String,

    #[arg(short, long, default_value_t = DEFAULT_SAMPLE_RATE)]
    sample_rate: u32,

    #[arg(short, long, default_value_t = DEFAULT_BLOCK_SIZE)]
    block_size: u32,

    #[arg(
        short,
        long,
        default_value_t = 0,
        help = "Milliseconds to keep rendering after the last event"
    )]
    tail: u64,

    #[arg(long, help = "Stop after this many samples")]
    max_samples: Option<u64>,

    #[arg(
        short,
        long,
        value_parser = clap::value_parser!(u8).range(1..=16),
        help = "Override the MIDI channel for all notes and CC changes"
    )]
    override_midi_channel: Option<u8>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    info!("MIDI FILE: {}", args.midi_file);

    let mut config = RenderConfig {
        sample_rate: args.sample_rate,
        block_size: args.block_size,
        max_samples: args.max_samples,
        ..Default::default()
    };
    config.tail_from_millis(args.tail)?;
    config.validate()?;

    let source = MidiSource::load(&args.midi_file, config.sample_rate, args.override_midi_channel)?;
    let timeline = source.into_timeline();
    info!(
        "{} events, last at sample {}",
        timeline.len(),
        timeline.last_timestamp().unwrap_or(0)
    );

    let stdout = io::stdout();
    let mut printer = EventPrinter::new(BufWriter::new(stdout.lock()), BlockFormatter::new());
    render(&timeline, &config, &mut printer)?;
    printer.into_inner().flush().context("flush stdout")?;

    Ok(())
}
