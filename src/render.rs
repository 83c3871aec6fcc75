use anyhow::{bail, Context, Result};
use log::{debug, info};

use crate::midi_event::MidiEvent;
use crate::timeline::MidiTimeline;

pub const DEFAULT_SAMPLE_RATE: u32 = 44_100;
pub const DEFAULT_BLOCK_SIZE: u32 = 512;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderConfig {
    pub sample_rate: u32,
    pub block_size: u32,
    pub tail_samples: u64, // rendered after the last event
    pub max_samples: Option<u64>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            block_size: DEFAULT_BLOCK_SIZE,
            tail_samples: 0,
            max_samples: None,
        }
    }
}

impl RenderConfig {
    pub fn validate(&self) -> Result<()> {
        if self.sample_rate == 0 {
            bail!("sample rate must be greater than 0");
        }
        if self.block_size == 0 {
            bail!("block size must be greater than 0");
        }
        Ok(())
    }

    pub fn tail_from_millis(&mut self, millis: u64) -> Result<()> {
        let Some(scaled) = millis.checked_mul(self.sample_rate as u64) else {
            bail!("tail of {} ms is too long", millis);
        };
        self.tail_samples = scaled / 1000;
        Ok(())
    }
}

#[derive(Debug)]
pub struct Block<'a> {
    pub index: u64,
    pub start: u64,
    pub length: u32,
    pub sample_rate: u32,
    pub events: &'a [&'a MidiEvent],
}

// plugin wrapper, event dump
pub trait BlockProcessor {
    fn process_block(&mut self, block: &Block<'_>) -> Result<()>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderStats {
    pub blocks: u64,
    pub samples: u64,
    pub events: u64,
}

pub fn render(
    timeline: &MidiTimeline,
    config: &RenderConfig,
    processor: &mut impl BlockProcessor,
) -> Result<RenderStats> {
    config.validate()?;

    let block_size = config.block_size as u64;
    let mut stats = RenderStats::default();
    let mut events: Vec<&MidiEvent> = Vec::with_capacity(64);
    let mut tail_remaining = config.tail_samples;
    let mut has_more = timeline.has_remaining();

    // Stop once the events are gone and the tail has been played out.
    while has_more || tail_remaining > 0 {
        let length = match config.max_samples {
            Some(max) if stats.samples >= max => {
                info!("stopping at sample limit {}", max);
                break;
            }
            Some(max) => block_size.min(max - stats.samples),
            None => block_size,
        };

        let was_pending = has_more;
        events.clear();
        has_more = timeline.fill_from_range(stats.samples, length, &mut events);
        if was_pending && !has_more {
            debug!("last event delivered in block {}", stats.blocks);
        } else if !was_pending {
            tail_remaining = tail_remaining.saturating_sub(length);
        }

        let block = Block {
            index: stats.blocks,
            start: stats.samples,
            length: length as u32,
            sample_rate: config.sample_rate,
            events: &events,
        };
        processor
            .process_block(&block)
            .with_context(|| format!("process block {}", block.index))?;

        stats.blocks += 1;
        stats.samples += length;
        stats.events += events.len() as u64;
    }

    info!(
        "rendered {} blocks, {} samples, {} events",
        stats.blocks, stats.samples, stats.events
    );
    Ok(stats)
}
