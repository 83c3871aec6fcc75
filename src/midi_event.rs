pub const NOTE_OFF: u8 = 0x80;
pub const NOTE_ON: u8 = 0x90;
pub const POLY_PRESSURE: u8 = 0xa0;
pub const CONTROL_CHANGE: u8 = 0xb0;
pub const PROGRAM_CHANGE: u8 = 0xc0;
pub const CHANNEL_PRESSURE: u8 = 0xd0;
pub const PITCH_BEND: u8 = 0xe0;
pub const SYSEX: u8 = 0xf0;
pub const SYSEX_ESCAPE: u8 = 0xf7;

/// A raw MIDI message stamped with its absolute position in samples.
///
/// `Default` is the empty event: status 0, no payload, timestamp 0. The
/// source fills the fields in directly.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MidiEvent {
    pub status: u8,
    pub data: [u8; 2],
    /// Payload of system exclusive messages, empty for channel messages.
    pub sysex: Vec<u8>,
    pub timestamp: u64, // in samples from render start
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Message {
    NoteOn(u8, u8),
    NoteOff(u8, u8),
    PolyPressure(u8, u8),
    ControlChange(u8, u8),
    ProgramChange(u8),
    ChannelPressure(u8),
    PitchBend(u16),
    SysEx(usize),
    Other(u8),
}

impl MidiEvent {
    /// `channel` is 1-based, the way channels are shown to users.
    pub fn note_on(channel: u8, note: u8, velocity: u8, timestamp: u64) -> Self {
        Self::channel_message(NOTE_ON, channel, [note, velocity], timestamp)
    }

    pub fn note_off(channel: u8, note: u8, velocity: u8, timestamp: u64) -> Self {
        Self::channel_message(NOTE_OFF, channel, [note, velocity], timestamp)
    }

    pub fn control_change(channel: u8, control: u8, value: u8, timestamp: u64) -> Self {
        Self::channel_message(CONTROL_CHANGE, channel, [control, value], timestamp)
    }

    pub fn program_change(channel: u8, program: u8, timestamp: u64) -> Self {
        Self::channel_message(PROGRAM_CHANGE, channel, [program, 0], timestamp)
    }

    /// `value` is the 14-bit bend amount, 8192 is centered.
    pub fn pitch_bend(channel: u8, value: u16, timestamp: u64) -> Self {
        let data = [(value & 0x7f) as u8, ((value >> 7) & 0x7f) as u8];
        Self::channel_message(PITCH_BEND, channel, data, timestamp)
    }

    /// `kind` is the high status nibble (`NOTE_ON`, `PITCH_BEND`, ...).
    pub fn channel_message(kind: u8, channel: u8, data: [u8; 2], timestamp: u64) -> Self {
        Self {
            status: (kind & 0xf0) | (channel.saturating_sub(1) & 0x0f),
            data,
            sysex: Vec::new(),
            timestamp,
        }
    }

    pub fn sysex(status: u8, payload: &[u8], timestamp: u64) -> Self {
        Self {
            status,
            data: [0, 0],
            sysex: payload.to_vec(),
            timestamp,
        }
    }

    pub fn is_channel_message(&self) -> bool {
        (0x80..0xf0).contains(&self.status)
    }

    /// 1-based channel, `None` for system messages.
    pub fn channel(&self) -> Option<u8> {
        self.is_channel_message().then(|| (self.status & 0x0f) + 1)
    }

    /// Moves a channel message onto another 1-based channel. System messages
    /// are returned untouched.
    pub fn with_channel(mut self, channel: u8) -> Self {
        if self.is_channel_message() {
            self.status = (self.status & 0xf0) | (channel.saturating_sub(1) & 0x0f);
        }
        self
    }

    pub fn message(&self) -> Message {
        let [d1, d2] = self.data;
        match self.status & 0xf0 {
            NOTE_ON => Message::NoteOn(d1, d2),
            NOTE_OFF => Message::NoteOff(d1, d2),
            POLY_PRESSURE => Message::PolyPressure(d1, d2),
            CONTROL_CHANGE => Message::ControlChange(d1, d2),
            PROGRAM_CHANGE => Message::ProgramChange(d1),
            CHANNEL_PRESSURE => Message::ChannelPressure(d1),
            PITCH_BEND => Message::PitchBend(((d2 as u16) << 7) | d1 as u16),
            _ if self.status == SYSEX || self.status == SYSEX_ESCAPE => {
                Message::SysEx(self.sysex.len())
            }
            _ => Message::Other(self.status),
        }
    }
}
