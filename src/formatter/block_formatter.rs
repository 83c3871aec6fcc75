use crate::formatter::MidiFormatter;
use crate::midi_event::{Message, MidiEvent};
use crate::render::Block;
use std::time::Duration;

pub struct BlockFormatter {}

impl BlockFormatter {
    pub fn new() -> Self {
        Self {}
    }
}

impl Default for BlockFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl MidiFormatter for BlockFormatter {
    fn format(&self, block: &Block<'_>, event: &MidiEvent) -> String {
        // [block 3 @ 00:01.500: N60.100@1]
        let body = match event.message() {
            Message::NoteOn(note, velocity) => format!("N{}.{}", note, velocity),
            Message::NoteOff(note, _) => format!("N{}.0", note),
            Message::ControlChange(num, val) => format!("CC{}.{}", num, val),
            Message::PolyPressure(note, pressure) => format!("AT{}.{}", note, pressure),
            Message::ChannelPressure(pressure) => format!("AT{}", pressure),
            Message::ProgramChange(program) => format!("PC{}", program),
            Message::PitchBend(value) => format!("PB{}", value),
            Message::SysEx(len) => format!("SYSEX{}", len),
            Message::Other(status) => format!("MSG{:02X}", status),
        };
        let channel = match event.channel() {
            Some(channel) => format!("@{}", channel),
            None => String::new(),
        };
        format!(
            "[block {index} @ {timestamp}: {body}{channel}]",
            index = block.index,
            timestamp = format_sample_time(event.timestamp, block.sample_rate),
        )
    }
}

fn format_sample_time(samples: u64, sample_rate: u32) -> String {
    let duration = Duration::from_secs_f64(samples as f64 / sample_rate.max(1) as f64);
    let minutes = duration.as_secs() / 60;
    let seconds = duration.as_secs() % 60;
    let fractional = duration.subsec_millis();
    format!("{:02}:{:02}.{:03}", minutes, seconds, fractional)
}
