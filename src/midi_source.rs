use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use log::{debug, info};
use midly::{Format, MetaMessage, MidiMessage, Smf, Timing, TrackEvent, TrackEventKind};

use crate::midi_event::{MidiEvent, CHANNEL_PRESSURE, POLY_PRESSURE, SYSEX, SYSEX_ESCAPE};
use crate::tempo::SampleClock;
use crate::timeline::MidiTimeline;

/// Reads a Standard MIDI File and turns it into sample-stamped events.
pub struct MidiSource {
    events: Vec<MidiEvent>,
    pulses_per_qn: u16,
}

/// Something that happened at an absolute tick, before sample conversion.
#[derive(Debug)]
enum Scheduled {
    Tempo(u32),
    Midi(MidiEvent),
}

impl MidiSource {
    pub fn load(
        path: impl AsRef<Path>,
        sample_rate: u32,
        override_midi_channel: Option<u8>,
    ) -> Result<Self> {
        let path = path.as_ref();
        let bytes = fs::read(path).with_context(|| format!("read midi file {}", path.display()))?;
        let smf =
            Smf::parse(&bytes).with_context(|| format!("parse midi file {}", path.display()))?;
        Self::from_smf(&smf, sample_rate, override_midi_channel)
    }

    pub fn from_smf(
        smf: &Smf<'_>,
        sample_rate: u32,
        override_midi_channel: Option<u8>,
    ) -> Result<Self> {
        // read division to get pulses per quarter note
        let pulses_per_qn: u16 = match smf.header.timing {
            Timing::Metrical(qtr) => qtr.as_int(),
            Timing::Timecode(fps, subframes) => {
                bail!("SMPTE division is not supported: {:?} x {}", fps, subframes)
            }
        };
        if pulses_per_qn == 0 {
            bail!("midi file declares 0 pulses per quarter note");
        }
        // Format 2 tracks are independent patterns played back to back
        let sequential = smf.header.format == Format::Sequential;
        info!(
            "{:?}, {} tracks, {} pulses per quarter note",
            smf.header.format,
            smf.tracks.len(),
            pulses_per_qn
        );

        let mut scheduled: Vec<(u32, Scheduled)> = Vec::new();
        let mut track_start: u32 = 0;
        for (index, track) in smf.tracks.iter().enumerate() {
            let before = scheduled.len();
            let mut ticks: u32 = track_start;
            for track_event in track {
                ticks = ticks.saturating_add(track_event.delta.as_int());
                if let Some(item) = schedule(track_event, override_midi_channel) {
                    scheduled.push((ticks, item));
                }
            }
            if sequential {
                track_start = ticks;
            }
            debug!("track {}: {} events", index, scheduled.len() - before);
        }

        // Tracks are merged by tick. At equal ticks tempo changes go first,
        // otherwise the file order is kept.
        scheduled.sort_by_key(|(ticks, item)| (*ticks, !matches!(item, Scheduled::Tempo(_))));

        let mut clock = SampleClock::new(pulses_per_qn, sample_rate);
        let mut events = Vec::with_capacity(scheduled.len());
        for (ticks, item) in scheduled {
            match item {
                Scheduled::Tempo(micros_per_qn) => {
                    clock.set_tempo(ticks, micros_per_qn);
                    debug!("tempo change at tick {}: {:.2} BPM", ticks, clock.bpm());
                }
                Scheduled::Midi(mut event) => {
                    event.timestamp = clock.samples_at(ticks);
                    events.push(event);
                }
            }
        }

        Ok(Self {
            events,
            pulses_per_qn,
        })
    }

    pub fn events(&self) -> &[MidiEvent] {
        &self.events
    }

    pub fn pulses_per_qn(&self) -> u16 {
        self.pulses_per_qn
    }

    pub fn into_timeline(self) -> MidiTimeline {
        let mut timeline = MidiTimeline::new();
        for event in self.events {
            timeline.append(event);
        }
        timeline
    }
}

fn schedule(track_event: &TrackEvent<'_>, override_midi_channel: Option<u8>) -> Option<Scheduled> {
    match track_event.kind {
        TrackEventKind::Midi { channel, message } => {
            // midly channels are 0-based, MidiEvent constructors take 1-based ones
            let event = handle_midi_msg(u8::from(channel) + 1, message);
            Some(Scheduled::Midi(match override_midi_channel {
                Some(channel) => event.with_channel(channel),
                None => event,
            }))
        }

        TrackEventKind::SysEx(payload) => {
            Some(Scheduled::Midi(MidiEvent::sysex(SYSEX, payload, 0)))
        }
        TrackEventKind::Escape(payload) => {
            Some(Scheduled::Midi(MidiEvent::sysex(SYSEX_ESCAPE, payload, 0)))
        }

        TrackEventKind::Meta(MetaMessage::Tempo(new_tempo)) => {
            Some(Scheduled::Tempo(new_tempo.as_int()))
        }

        other => {
            debug!("skipping event: {:?} {:?}", track_event.delta, other);
            None
        }
    }
}

fn handle_midi_msg(channel: u8, message: MidiMessage) -> MidiEvent {
    match message {
        MidiMessage::NoteOn { key, vel } => {
            MidiEvent::note_on(channel, key.as_int(), vel.as_int(), 0)
        }
        MidiMessage::NoteOff { key, vel } => {
            MidiEvent::note_off(channel, key.as_int(), vel.as_int(), 0)
        }
        MidiMessage::Aftertouch { key, vel } => {
            MidiEvent::channel_message(POLY_PRESSURE, channel, [key.as_int(), vel.as_int()], 0)
        }
        MidiMessage::Controller { controller, value } => {
            MidiEvent::control_change(channel, controller.as_int(), value.as_int(), 0)
        }
        MidiMessage::ProgramChange { program } => {
            MidiEvent::program_change(channel, program.as_int(), 0)
        }
        MidiMessage::ChannelAftertouch { vel } => {
            MidiEvent::channel_message(CHANNEL_PRESSURE, channel, [vel.as_int(), 0], 0)
        }
        MidiMessage::PitchBend { bend } => MidiEvent::pitch_bend(channel, bend.0.as_int(), 0),
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use crate::midi_event::Message as Decoded;

    fn smf(format: u16, division: u16, tracks: &[&[u8]]) -> Vec<u8> {
        let mut bytes = b"MThd".to_vec();
        bytes.extend_from_slice(&6u32.to_be_bytes());
        bytes.extend_from_slice(&format.to_be_bytes());
        bytes.extend_from_slice(&(tracks.len() as u16).to_be_bytes());
        bytes.extend_from_slice(&division.to_be_bytes());
        for track in tracks {
            bytes.extend_from_slice(b"MTrk");
            bytes.extend_from_slice(&(track.len() as u32).to_be_bytes());
            bytes.extend_from_slice(track);
        }
        bytes
    }

    fn write_temp(bytes: &[u8]) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(bytes).unwrap();
        file.flush().unwrap();
        file
    }

    fn load(bytes: &[u8], override_midi_channel: Option<u8>) -> MidiSource {
        let file = write_temp(bytes);
        MidiSource::load(file.path(), 44_100, override_midi_channel).unwrap()
    }

    const TEMPO_120: [u8; 7] = [0x00, 0xff, 0x51, 0x03, 0x07, 0xa1, 0x20];
    const END_OF_TRACK: [u8; 4] = [0x00, 0xff, 0x2f, 0x00];

    fn single_note_track() -> Vec<u8> {
        let mut track = TEMPO_120.to_vec();
        track.extend_from_slice(&[0x00, 0x90, 0x3c, 0x64]);
        track.extend_from_slice(&[0x60, 0x80, 0x3c, 0x40]);
        track.extend_from_slice(&[0x00, 0xb0, 0x07, 0x50]);
        track.extend_from_slice(&END_OF_TRACK);
        track
    }

    #[test]
    fn loads_notes_and_control_changes() {
        let source = load(&smf(0, 96, &[&single_note_track()[..]]), None);
        assert_eq!(source.pulses_per_qn(), 96);

        let events = source.events();
        assert_eq!(events.len(), 3);
        assert_eq!(events[0].message(), Decoded::NoteOn(60, 100));
        assert_eq!(events[0].timestamp, 0);
        assert_eq!(events[1].message(), Decoded::NoteOff(60, 64));
        assert_eq!(events[1].timestamp, 22_050);
        assert_eq!(events[2].message(), Decoded::ControlChange(7, 80));
        assert_eq!(events[2].channel(), Some(1));
    }

    #[test]
    fn keeps_program_change_pitch_bend_and_sysex() {
        let mut track = vec![0x00, 0xc0, 0x05];
        track.extend_from_slice(&[0x00, 0xe1, 0x00, 0x40]);
        track.extend_from_slice(&[0x00, 0xf0, 0x05, 0x7e, 0x7f, 0x09, 0x01, 0xf7]);
        track.extend_from_slice(&[0x00, 0xd2, 0x33]);
        track.extend_from_slice(&[0x00, 0x90, 0x3c, 0x64]);
        track.extend_from_slice(&END_OF_TRACK);

        let timeline = load(&smf(0, 96, &[&track[..]]), None).into_timeline();
        let events = timeline.events();
        assert_eq!(events.len(), 5);

        assert_eq!(events[0].status, 0xc0);
        assert_eq!(events[0].message(), Decoded::ProgramChange(5));
        assert_eq!(events[1].status, 0xe1);
        assert_eq!(events[1].data, [0x00, 0x40]);
        assert_eq!(events[1].message(), Decoded::PitchBend(8192));
        assert_eq!(events[2].status, 0xf0);
        assert_eq!(events[2].sysex, vec![0x7e, 0x7f, 0x09, 0x01, 0xf7]);
        assert_eq!(events[2].channel(), None);
        assert_eq!(events[3].message(), Decoded::ChannelPressure(0x33));
        assert_eq!(events[3].channel(), Some(3));
        assert_eq!(events[4].message(), Decoded::NoteOn(60, 100));
    }

    #[test]
    fn override_channel_applies_to_every_event() {
        let source = load(&smf(0, 96, &[&single_note_track()[..]]), Some(10));
        assert!(source.events().iter().all(|e| e.channel() == Some(10)));
    }

    #[test]
    fn tracks_are_merged_in_time_order() {
        let mut tempo_track = TEMPO_120.to_vec();
        tempo_track.extend_from_slice(&END_OF_TRACK);

        let mut a = vec![0x30, 0x90, 0x40, 0x64];
        a.extend_from_slice(&END_OF_TRACK);
        let mut b = vec![0x10, 0x91, 0x30, 0x64];
        b.extend_from_slice(&[0x40, 0x81, 0x30, 0x00]);
        b.extend_from_slice(&END_OF_TRACK);

        let source = load(&smf(1, 96, &[&tempo_track[..], &a[..], &b[..]]), None);
        let stamps: Vec<u64> = source.events().iter().map(|e| e.timestamp).collect();
        assert_eq!(stamps, vec![3_675, 11_025, 18_375]);
        assert_eq!(source.events()[1].channel(), Some(1));

        let timeline = source.into_timeline();
        assert_eq!(timeline.len(), 3);
    }

    #[test]
    fn sequential_tracks_play_back_to_back() {
        let mut first = vec![0x60, 0x90, 0x3c, 0x64];
        first.extend_from_slice(&END_OF_TRACK);
        let mut second = vec![0x60, 0x90, 0x3e, 0x64];
        second.extend_from_slice(&END_OF_TRACK);

        let source = load(&smf(2, 96, &[&first[..], &second[..]]), None);
        let stamps: Vec<u64> = source.events().iter().map(|e| e.timestamp).collect();
        assert_eq!(stamps, vec![22_050, 44_100]);
        assert_eq!(source.events()[1].message(), Decoded::NoteOn(62, 100));
    }

    #[test]
    fn smpte_division_is_rejected() {
        let file = write_temp(&smf(0, 0xe728, &[&END_OF_TRACK[..]]));
        let err = MidiSource::load(file.path(), 44_100, None).err().unwrap();
        assert!(format!("{err:#}").contains("SMPTE"));
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = MidiSource::load(dir.path().join("nope.mid"), 44_100, None)
            .err()
            .unwrap();
        assert!(format!("{err:#}").contains("nope.mid"));
    }
}
