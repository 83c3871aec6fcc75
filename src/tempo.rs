// microseconds per second
const MICROS_PER_SEC: f64 = 1_000_000.0;

// 120 BPM, assumed until the file sets a tempo
pub const DEFAULT_TEMPO_MICROS_PER_QN: u32 = 500_000;

/// Converts absolute MIDI ticks to absolute sample offsets across tempo
/// changes. Ticks must be fed in non-decreasing order.
#[derive(Debug, Clone)]
pub struct SampleClock {
    pulses_per_qn: u16,
    sample_rate: u32,
    last_tempo_change_ticks: u32,
    elapsed_sec: f64,
    current_tempo_micros_per_qn: u32,
}

impl SampleClock {
    pub fn new(pulses_per_qn: u16, sample_rate: u32) -> Self {
        Self {
            pulses_per_qn,
            sample_rate,
            last_tempo_change_ticks: 0,
            elapsed_sec: 0.0,
            current_tempo_micros_per_qn: DEFAULT_TEMPO_MICROS_PER_QN,
        }
    }

    pub fn set_tempo(&mut self, at_ticks: u32, micros_per_qn: u32) {
        self.elapsed_sec = self.seconds_at(at_ticks);
        self.last_tempo_change_ticks = at_ticks;
        self.current_tempo_micros_per_qn = micros_per_qn;
    }

    pub fn bpm(&self) -> f64 {
        MICROS_PER_SEC / self.current_tempo_micros_per_qn as f64 * 60.0
    }

    pub fn seconds_at(&self, ticks: u32) -> f64 {
        let ticks_since_last_tempo_change = ticks.saturating_sub(self.last_tempo_change_ticks);
        self.elapsed_sec
            + ticks_to_seconds(
                ticks_since_last_tempo_change,
                self.pulses_per_qn,
                self.current_tempo_micros_per_qn,
            )
    }

    pub fn samples_at(&self, ticks: u32) -> u64 {
        (self.seconds_at(ticks) * self.sample_rate as f64).round() as u64
    }
}

pub fn ticks_to_seconds(ticks: u32, pulses_per_qn: u16, tempo: u32) -> f64 {
    // MIDI tempo is in microseconds per quarter note
    let tempo_in_secs = tempo as f64 / MICROS_PER_SEC;
    let beats = ticks as f64 / pulses_per_qn as f64;
    beats * tempo_in_secs
}
