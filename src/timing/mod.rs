//! Beat ↔ absolute time conversion over a tempo map
//!
//! # Algorithm
//! 1. Binary-search the anchor table for the last anchor at or before the
//!    target (by beat or by time)
//! 2. Interpolate linearly inside that anchor's constant-tempo segment
//!
//! The final segment is open-ended: positions past the last anchor
//! extrapolate at the last tempo.

use crate::models::tempo::{Anchor, TempoMap};

/// Stateless converter borrowing one tempo map's anchors
#[derive(Debug, Clone, Copy)]
pub struct BeatTimeConverter<'a> {
    anchors: &'a [Anchor],
}

impl<'a> BeatTimeConverter<'a> {
    pub fn new(tempo_map: &'a TempoMap) -> Self {
        Self {
            anchors: tempo_map.anchors().as_slice(),
        }
    }

    /// Seconds elapsed from beat 0 to `beat`
    pub fn beat_to_time(&self, beat: f64) -> f64 {
        let anchor = self.anchor_by(|a| a.beat <= beat);
        if anchor.bpm <= 0.0 {
            log::warn!(
                "tempo segment at beat {} has bpm {}, treating it as zero length",
                anchor.beat,
                anchor.bpm
            );
            return anchor.time;
        }
        anchor.time + (beat - anchor.beat) * 60.0 / anchor.bpm
    }

    /// Beat position reached after `time` seconds
    pub fn time_to_beat(&self, time: f64) -> f64 {
        let anchor = self.anchor_by(|a| a.time <= time);
        if anchor.bpm <= 0.0 {
            log::warn!(
                "tempo segment at beat {} has bpm {}, treating it as zero length",
                anchor.beat,
                anchor.bpm
            );
            return anchor.beat;
        }
        anchor.beat + (time - anchor.time) * anchor.bpm / 60.0
    }

    /// Last anchor satisfying `is_before`; the first anchor when none does.
    fn anchor_by<F>(&self, is_before: F) -> &'a Anchor
    where
        F: FnMut(&Anchor) -> bool,
    {
        let index = self.anchors.partition_point(is_before).saturating_sub(1);
        &self.anchors[index]
    }
}

/// Convert a beat position to the nearest tick
pub fn beat_to_tick(beat: f64, resolution: u16) -> f64 {
    (beat * resolution as f64).round()
}

/// Convert ticks to beats
pub fn tick_to_beat(tick: u64, resolution: u16) -> f64 {
    tick as f64 / resolution as f64
}

/// Snap a beat position onto the tick grid
pub fn quantize_beat(beat: f64, resolution: u16) -> f64 {
    beat_to_tick(beat, resolution) / resolution as f64
}

/// Smallest representable time strictly after `time`
pub fn next_time_after(time: f64) -> f64 {
    if !time.is_finite() {
        return time;
    }
    if time == 0.0 {
        return f64::from_bits(1);
    }
    let bits = time.to_bits();
    if time > 0.0 {
        f64::from_bits(bits + 1)
    } else {
        f64::from_bits(bits - 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::ConversionReport;
    use crate::models::tempo::{TempoEvent, TempoOptions};

    fn tempo_map(events: &[(f64, f64)]) -> TempoMap {
        let raw: Vec<TempoEvent> = events.iter().map(|&(b, t)| TempoEvent::new(b, t)).collect();
        TempoMap::normalize(&raw, TempoOptions::default(), &mut ConversionReport::new()).unwrap()
    }

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {}, got {}",
            expected,
            actual
        );
    }

    #[test]
    fn test_beat_zero_is_time_zero() {
        let map = tempo_map(&[(0.0, 97.0), (3.0, 140.0)]);
        assert_eq!(BeatTimeConverter::new(&map).beat_to_time(0.0), 0.0);
    }

    #[test]
    fn test_tempo_change_segments() {
        let map = tempo_map(&[(0.0, 120.0), (4.0, 60.0)]);
        let converter = BeatTimeConverter::new(&map);
        assert_close(converter.beat_to_time(2.0), 1.0);
        assert_close(converter.beat_to_time(4.0), 2.0);
        assert_close(converter.beat_to_time(6.0), 4.0);
    }

    #[test]
    fn test_extrapolates_past_last_anchor() {
        let map = tempo_map(&[(0.0, 120.0), (4.0, 60.0)]);
        let converter = BeatTimeConverter::new(&map);
        assert_close(converter.beat_to_time(104.0), 102.0);
        assert_close(converter.time_to_beat(102.0), 104.0);
    }

    #[test]
    fn test_time_to_beat_inverts_beat_to_time() {
        let map = tempo_map(&[(0.0, 120.0), (1.5, 73.0), (4.0, 200.0), (9.25, 41.0)]);
        let converter = BeatTimeConverter::new(&map);
        let mut beat = 0.0;
        while beat < 20.0 {
            let time = converter.beat_to_time(beat);
            assert!((converter.time_to_beat(time) - beat).abs() < 1e-9);
            beat += 0.125;
        }
    }

    #[test]
    fn test_monotonic() {
        let map = tempo_map(&[(0.0, 300.0), (2.0, 20.0), (2.5, 180.0)]);
        let converter = BeatTimeConverter::new(&map);
        let mut previous = converter.beat_to_time(0.0);
        for step in 1..200 {
            let time = converter.beat_to_time(step as f64 * 0.05);
            assert!(time >= previous);
            previous = time;
        }
    }

    #[test]
    fn test_anchor_boundary_uses_later_segment() {
        let map = tempo_map(&[(0.0, 120.0), (4.0, 60.0)]);
        let converter = BeatTimeConverter::new(&map);
        assert_close(converter.time_to_beat(2.0), 4.0);
        assert_close(converter.time_to_beat(3.0), 5.0);
    }

    #[test]
    fn test_next_time_after() {
        assert!(next_time_after(0.0) > 0.0);
        assert!(next_time_after(1.0) > 1.0);
        assert!(next_time_after(5e15) > 5e15);
        assert_eq!(5e15 + 0.001, 5e15);
        assert!(next_time_after(-2.0) > -2.0);
        assert!(next_time_after(-2.0) < 0.0);
    }

    #[test]
    fn test_tick_helpers() {
        assert_eq!(beat_to_tick(1.5, 480), 720.0);
        assert_eq!(tick_to_beat(240, 480), 0.5);
        assert_close(quantize_beat(1.0001, 480), 1.0);
        assert_close(quantize_beat(1.0 + 1.0 / 480.0, 480), 1.0 + 1.0 / 480.0);
    }
}
