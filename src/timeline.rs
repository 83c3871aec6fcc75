use std::cell::Cell;

use crate::midi_event::MidiEvent;

// Cell cursor: extracted events borrow the timeline while it advances.
// Not Sync, parallel renders need one timeline each.
#[derive(Debug, Default)]
pub struct MidiTimeline {
    events: Vec<MidiEvent>,
    cursor: Cell<usize>,
}

impl MidiTimeline {
    pub fn new() -> Self {
        Self {
            events: Vec::new(),
            cursor: Cell::new(0),
        }
    }

    /// `None` is ignored. Timestamps must be non-decreasing, nothing is re-sorted.
    pub fn append(&mut self, event: impl Into<Option<MidiEvent>>) {
        if let Some(event) = event.into() {
            self.events.push(event);
        }
    }

    /// Push the events in `[start, start + length)` into `out` and move the
    /// cursor past them. Returns whether undelivered events remain.
    ///
    /// Windows must be contiguous from 0. Events below `start` are skipped.
    pub fn fill_from_range<'a>(
        &'a self,
        start: u64,
        length: u64,
        out: &mut Vec<&'a MidiEvent>,
    ) -> bool {
        if length == 0 {
            return self.has_remaining();
        }

        let stop = start.saturating_add(length);
        let mut cursor = self.cursor.get();
        while let Some(event) = self.events.get(cursor) {
            if event.timestamp >= stop {
                break;
            }
            if event.timestamp >= start {
                out.push(event);
            }
            cursor += 1;
        }
        self.cursor.set(cursor);

        self.has_remaining()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn cursor(&self) -> usize {
        self.cursor.get()
    }

    pub fn remaining(&self) -> usize {
        self.events.len() - self.cursor.get()
    }

    pub fn has_remaining(&self) -> bool {
        self.cursor.get() < self.events.len()
    }

    pub fn events(&self) -> &[MidiEvent] {
        &self.events
    }

    pub fn last_timestamp(&self) -> Option<u64> {
        self.events.last().map(|e| e.timestamp)
    }
}

// either side missing is a no-op
pub fn append_event(timeline: Option<&mut MidiTimeline>, event: Option<MidiEvent>) {
    if let Some(timeline) = timeline {
        timeline.append(event);
    }
}
