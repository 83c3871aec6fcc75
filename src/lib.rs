pub mod formatter;
pub mod midi_event;
pub mod midi_source;
pub mod render;
pub mod tempo;
pub mod timeline;

pub use midi_event::{Message, MidiEvent};
pub use midi_source::MidiSource;
pub use render::{render, Block, BlockProcessor, RenderConfig, RenderStats};
pub use timeline::{append_event, MidiTimeline};
