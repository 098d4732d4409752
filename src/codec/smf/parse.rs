use midly::{MetaMessage, MidiMessage, Smf, Timing, TrackEventKind};
use std::collections::{HashMap, VecDeque};

use crate::codec::{DecodeError, DecodedNote, DecodedScore};
use crate::config::SMF_DEFAULT_TEMPO_BPM;
use crate::diagnostics::ConversionReport;
use crate::models::{TempoEvent, TempoMap, TempoOptions};
use crate::timing::{tick_to_beat, BeatTimeConverter};

/// Note held in ticks until the tempo map is known
struct TickNote {
    start_tick: u64,
    end_tick: u64,
    pitch: u8,
    velocity: u8,
    channel: u8,
}

/// Parse SMF bytes into the time-domain model
///
/// Tempo meta events are collected from every track. Note-on with
/// velocity 0 counts as note-off; repeated attacks on the same key and
/// channel are released first-in first-out. Tracks without notes do not
/// get a track index.
pub fn read_smf(bytes: &[u8]) -> Result<DecodedScore, DecodeError> {
    let smf = Smf::parse(bytes).map_err(|e| DecodeError::Malformed(format!("{}", e)))?;

    let resolution = match smf.header.timing {
        Timing::Metrical(tpq) => tpq.as_int(),
        Timing::Timecode(fps, subframe) => {
            return Err(DecodeError::UnsupportedTiming(format!(
                "SMPTE timing ({:?}, {} subframes) is not supported",
                fps, subframe
            )))
        }
    };
    if resolution == 0 {
        return Err(DecodeError::Malformed("resolution of 0 ticks per quarter".to_string()));
    }

    let mut warnings = Vec::new();
    let mut tempo_ticks: Vec<(u64, u32)> = Vec::new();
    let mut note_tracks: Vec<Vec<TickNote>> = Vec::new();

    for (track_number, track) in smf.tracks.iter().enumerate() {
        let mut tick = 0u64;
        let mut held: HashMap<(u8, u8), VecDeque<(u64, u8)>> = HashMap::new();
        let mut notes = Vec::new();

        for event in track {
            tick += event.delta.as_int() as u64;
            match event.kind {
                TrackEventKind::Meta(MetaMessage::Tempo(micros)) => {
                    tempo_ticks.push((tick, micros.as_int()));
                }
                TrackEventKind::Midi { channel, message } => {
                    let channel = channel.as_int();
                    match message {
                        MidiMessage::NoteOn { key, vel } if vel.as_int() > 0 => {
                            held.entry((channel, key.as_int()))
                                .or_default()
                                .push_back((tick, vel.as_int()));
                        }
                        MidiMessage::NoteOn { key, .. } | MidiMessage::NoteOff { key, .. } => {
                            let pitch = key.as_int();
                            match held.get_mut(&(channel, pitch)).and_then(VecDeque::pop_front) {
                                Some((start_tick, velocity)) => notes.push(TickNote {
                                    start_tick,
                                    end_tick: tick,
                                    pitch,
                                    velocity,
                                    channel,
                                }),
                                None => log::debug!(
                                    "track {}: release of {} on channel {} without attack at tick {}",
                                    track_number,
                                    pitch,
                                    channel,
                                    tick
                                ),
                            }
                        }
                        _ => {}
                    }
                }
                _ => {}
            }
        }

        let dangling: usize = held.values().map(VecDeque::len).sum();
        if dangling > 0 {
            warnings.push(format!(
                "track {}: {} notes never released, dropping them",
                track_number, dangling
            ));
        }
        if !notes.is_empty() {
            note_tracks.push(notes);
        }
    }

    // sort_by_key is stable, so simultaneous tempo events keep file order
    tempo_ticks.sort_by_key(|&(tick, _)| tick);
    let mut tempo_events = Vec::with_capacity(tempo_ticks.len());
    for (tick, micros) in tempo_ticks {
        if micros == 0 {
            warnings.push(format!("tempo of 0 microseconds per quarter at tick {}, ignoring it", tick));
            continue;
        }
        tempo_events.push(TempoEvent::new(
            tick_to_beat(tick, resolution),
            60_000_000.0 / micros as f64,
        ));
    }

    // Canonical map for timing only; the caller reports on the raw events
    let options = TempoOptions {
        default_bpm: SMF_DEFAULT_TEMPO_BPM,
        fallback_bpm: Some(SMF_DEFAULT_TEMPO_BPM),
    };
    let tempo_map = TempoMap::normalize(&tempo_events, options, &mut ConversionReport::muted())
        .map_err(|e| DecodeError::Malformed(e.to_string()))?;
    let converter = BeatTimeConverter::new(&tempo_map);

    let mut notes = Vec::new();
    for (track_index, track) in note_tracks.into_iter().enumerate() {
        for note in track {
            notes.push(DecodedNote {
                pitch: note.pitch,
                velocity: note.velocity,
                channel: note.channel,
                track_index: track_index as u32,
                start_time_seconds: converter.beat_to_time(tick_to_beat(note.start_tick, resolution)),
                end_time_seconds: converter.beat_to_time(tick_to_beat(note.end_tick, resolution)),
            });
        }
    }

    Ok(DecodedScore {
        resolution,
        tempo_events,
        notes,
        warnings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use midly::{Format, Header, Track, TrackEvent};

    fn note_on<'a>(delta: u32, key: u8, vel: u8) -> TrackEvent<'a> {
        TrackEvent {
            delta: delta.into(),
            kind: TrackEventKind::Midi {
                channel: 0.into(),
                message: MidiMessage::NoteOn {
                    key: key.into(),
                    vel: vel.into(),
                },
            },
        }
    }

    fn tempo<'a>(delta: u32, micros: u32) -> TrackEvent<'a> {
        TrackEvent {
            delta: delta.into(),
            kind: TrackEventKind::Meta(MetaMessage::Tempo(micros.into())),
        }
    }

    fn end<'a>() -> TrackEvent<'a> {
        TrackEvent {
            delta: 0.into(),
            kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
        }
    }

    fn to_bytes(tracks: Vec<Track>) -> Vec<u8> {
        let smf = Smf {
            header: Header {
                format: Format::Parallel,
                timing: Timing::Metrical(480.into()),
            },
            tracks,
        };
        let mut out = Vec::new();
        smf.write(&mut out).unwrap();
        out
    }

    #[test]
    fn test_read_tempo_change_and_notes() {
        let bytes = to_bytes(vec![
            // 120 bpm, then 60 bpm at beat 4
            vec![tempo(0, 500_000), tempo(1920, 1_000_000), end()],
            // beats 4..6, velocity-0 note-on as release
            vec![note_on(1920, 60, 100), note_on(960, 60, 0), end()],
        ]);

        let score = read_smf(&bytes).unwrap();
        assert_eq!(score.resolution, 480);
        assert_eq!(
            score.tempo_events,
            vec![TempoEvent::new(0.0, 120.0), TempoEvent::new(4.0, 60.0)]
        );
        assert_eq!(score.notes.len(), 1);
        let note = score.notes[0];
        assert_eq!(note.track_index, 0);
        assert!((note.start_time_seconds - 2.0).abs() < 1e-9);
        assert!((note.end_time_seconds - 4.0).abs() < 1e-9);
        assert!(score.warnings.is_empty());
    }

    #[test]
    fn test_overlapping_notes_release_in_order() {
        let bytes = to_bytes(vec![vec![
            note_on(0, 64, 80),
            note_on(240, 64, 90),
            note_on(240, 64, 0),
            note_on(240, 64, 0),
            end(),
        ]]);

        let score = read_smf(&bytes).unwrap();
        assert_eq!(score.notes.len(), 2);
        assert_eq!(score.notes[0].velocity, 80);
        assert!((score.notes[0].end_time_seconds - 0.5).abs() < 1e-9);
        assert_eq!(score.notes[1].velocity, 90);
        assert!((score.notes[1].end_time_seconds - 0.75).abs() < 1e-9);
    }

    #[test]
    fn test_unreleased_notes_are_dropped_with_warning() {
        let bytes = to_bytes(vec![vec![note_on(0, 60, 100), end()]]);
        let score = read_smf(&bytes).unwrap();
        assert!(score.notes.is_empty());
        assert_eq!(score.warnings.len(), 1);
    }

    #[test]
    fn test_track_index_skips_empty_tracks() {
        let bytes = to_bytes(vec![
            vec![tempo(0, 500_000), end()],
            vec![end()],
            vec![note_on(0, 60, 100), note_on(480, 60, 0), end()],
        ]);
        let score = read_smf(&bytes).unwrap();
        assert_eq!(score.notes[0].track_index, 0);
    }

    #[test]
    fn test_garbage_is_malformed() {
        assert!(matches!(
            read_smf(b"definitely not midi"),
            Err(DecodeError::Malformed(_))
        ));
    }
}
