//! Host transport tracking and `time:Position` encoding.

use crate::atom::ObjectWriter;
use crate::urid::Urids;

/// Scratch space for one encoded position object.
pub const POSITION_SCRATCH_SIZE: usize = 256;

/// Object id used for forged position objects.
const POSITION_OBJECT_ID: u32 = 1;

/// Bar/beat/tick information, present only when the engine reports it valid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bbt {
    /// 1-based.
    pub bar: i32,
    /// 1-based.
    pub beat: i32,
    pub tick: i32,
    pub ticks_per_beat: f64,
    pub beat_type: f32,
    pub beats_per_bar: f32,
    pub beats_per_minute: f64,
}

impl Bbt {
    /// Fractional 0-based beat within the bar.
    pub fn bar_beat(&self) -> f32 {
        let fraction = if self.ticks_per_beat > 0.0 {
            f64::from(self.tick) / self.ticks_per_beat
        } else {
            0.0
        };
        (f64::from(self.beat - 1) + fraction) as f32
    }
}

/// One transport query result.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TransportPosition {
    pub frame: u64,
    pub rolling: bool,
    pub bbt: Option<Bbt>,
}

impl TransportPosition {
    pub fn stopped_at(frame: u64) -> Self {
        Self {
            frame,
            rolling: false,
            bbt: None,
        }
    }

    pub fn speed(&self) -> f32 {
        if self.rolling {
            1.0
        } else {
            0.0
        }
    }
}

/// What the processor expects the transport to look like next cycle.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TransportSnapshot {
    pub frame: u64,
    pub bpm: f64,
    pub rolling: bool,
}

impl TransportSnapshot {
    /// Whether `now` departs from the prediction: play state flipped, a
    /// locate happened, or the tempo moved while bar/beat info is valid.
    pub fn changed(&self, now: &TransportPosition) -> bool {
        now.rolling != self.rolling
            || now.frame != self.frame
            || now
                .bbt
                .is_some_and(|bbt| bbt.beats_per_minute != self.bpm)
    }

    /// Prediction for the cycle after one of `nframes` at `now`.
    pub fn advance(&self, now: &TransportPosition, nframes: u32) -> Self {
        Self {
            frame: if now.rolling {
                now.frame + u64::from(nframes)
            } else {
                now.frame
            },
            // without bar/beat info the last known tempo stays the reference
            bpm: now.bbt.map_or(self.bpm, |bbt| bbt.beats_per_minute),
            rolling: now.rolling,
        }
    }
}

/// Forge a `time:Position` object body for `pos` into `scratch`.
///
/// Properties: frame and speed always; barBeat, bar, beatUnit, beatsPerBar
/// and beatsPerMinute only with valid bar/beat info. The event carrying it
/// is typed `atom:Blank`.
pub fn encode_position<'a>(
    urids: &Urids,
    pos: &TransportPosition,
    scratch: &'a mut [u8],
) -> Option<&'a [u8]> {
    let mut object = ObjectWriter::new(scratch, POSITION_OBJECT_ID, urids.time_position);
    object.long(urids.time_frame, urids.atom_long, pos.frame as i64);
    object.float(urids.time_speed, urids.atom_float, pos.speed());
    if let Some(bbt) = pos.bbt {
        object.float(urids.time_bar_beat, urids.atom_float, bbt.bar_beat());
        object.long(urids.time_bar, urids.atom_long, i64::from(bbt.bar - 1));
        object.int(urids.time_beat_unit, urids.atom_int, bbt.beat_type as i32);
        object.float(urids.time_beats_per_bar, urids.atom_float, bbt.beats_per_bar);
        object.float(
            urids.time_beats_per_minute,
            urids.atom_float,
            bbt.beats_per_minute as f32,
        );
    }
    object.finish()
}
