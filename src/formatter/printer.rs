use std::io::Write;

use anyhow::{Context, Result};

use crate::formatter::MidiFormatter;
use crate::render::{Block, BlockProcessor};

/// Writes one formatted line per delivered event.
pub struct EventPrinter<W: Write, F: MidiFormatter> {
    out: W,
    formatter: F,
}

impl<W: Write, F: MidiFormatter> EventPrinter<W, F> {
    pub fn new(out: W, formatter: F) -> Self {
        Self { out, formatter }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write, F: MidiFormatter> BlockProcessor for EventPrinter<W, F> {
    fn process_block(&mut self, block: &Block<'_>) -> Result<()> {
        for event in block.events {
            writeln!(self.out, "{}", self.formatter.format(block, event))
                .context("write event")?;
        }
        Ok(())
    }
}
