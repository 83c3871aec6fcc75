use crate::midi_event::MidiEvent;
use crate::render::Block;

mod block_formatter;
mod printer;

pub use block_formatter::BlockFormatter;
pub use printer::EventPrinter;

pub trait MidiFormatter {
    fn format(&self, block: &Block<'_>, event: &MidiEvent) -> String;
}
