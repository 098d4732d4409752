use midly::{Format, Header, MetaMessage, MidiMessage, Smf, Timing, Track, TrackEvent, TrackEventKind};

use crate::codec::{EncodeError, TimedScore, TimedTrack};
use crate::config::{MAX_TPQ, SMF_DEFAULT_TEMPO_BPM};
use crate::diagnostics::ConversionReport;
use crate::models::{TempoMap, TempoOptions};
use crate::timing::{beat_to_tick, BeatTimeConverter};

/// Largest tick a delta time can hold (28 bits)
const MAX_TICK: f64 = 0x0FFF_FFFF as f64;

/// Largest tempo value a Tempo meta event can hold (24 bits)
const MAX_MICROS_PER_QUARTER: f64 = 0xFF_FFFF as f64;

/// Write a time-domain score to Standard MIDI File (SMF) Format 1
pub fn write_smf(score: &TimedScore, out: &mut Vec<u8>) -> Result<(), EncodeError> {
    if score.resolution == 0 || score.resolution > MAX_TPQ {
        return Err(EncodeError::Unrepresentable(format!(
            "resolution {} outside 1..={}",
            score.resolution, MAX_TPQ
        )));
    }
    score.check_times()?;

    // Event times are seconds; ticks come from mapping them back through the tempo map
    let options = TempoOptions {
        default_bpm: SMF_DEFAULT_TEMPO_BPM,
        fallback_bpm: Some(SMF_DEFAULT_TEMPO_BPM),
    };
    let tempo_map = TempoMap::normalize(&score.tempo_events, options, &mut ConversionReport::muted())
        .map_err(|e| EncodeError::Unrepresentable(e.to_string()))?;
    let converter = BeatTimeConverter::new(&tempo_map);

    let names: Vec<String> = score
        .tracks
        .iter()
        .map(|t| format!("Track {}", t.track_id))
        .collect();

    let mut tracks = Vec::with_capacity(score.tracks.len() + 1);

    // Track 0: tempo map
    tracks.push(build_conductor_track(&tempo_map, score.resolution)?);

    // Tracks 1+: one per note track
    for (track, name) in score.tracks.iter().zip(&names) {
        tracks.push(build_note_track(track, name, &converter, score.resolution)?);
    }

    let header = Header {
        format: Format::Parallel,
        timing: Timing::Metrical(score.resolution.into()),
    };

    let smf = Smf { header, tracks };

    smf.write(out)
        .map_err(|e| EncodeError::Write(format!("Failed to write MIDI: {}", e)))?;

    log::debug!(
        "wrote SMF with {} tracks, {} notes",
        score.tracks.len() + 1,
        score.note_count()
    );
    Ok(())
}

fn build_conductor_track<'a>(tempo_map: &TempoMap, resolution: u16) -> Result<Track<'a>, EncodeError> {
    let mut events = Vec::new();

    for tempo in tempo_map.events() {
        let micros_per_quarter = (60_000_000.0 / tempo.bpm).round();
        if !(1.0..=MAX_MICROS_PER_QUARTER).contains(&micros_per_quarter) {
            return Err(EncodeError::Unrepresentable(format!(
                "tempo {} bpm at beat {}",
                tempo.bpm, tempo.beat
            )));
        }
        events.push(TrackEvent {
            delta: tick_at(beat_to_tick(tempo.beat, resolution))?.into(),
            kind: TrackEventKind::Meta(MetaMessage::Tempo((micros_per_quarter as u32).into())),
        });
    }

    // Already in beat order; convert to delta times
    convert_to_delta_times(&mut events);

    // End of track
    events.push(TrackEvent {
        delta: 0.into(),
        kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
    });

    Ok(events)
}

fn build_note_track<'a>(
    track: &TimedTrack,
    name: &'a str,
    converter: &BeatTimeConverter<'_>,
    resolution: u16,
) -> Result<Track<'a>, EncodeError> {
    let mut events = Vec::new();

    // Track name
    events.push(TrackEvent {
        delta: 0.into(),
        kind: TrackEventKind::Meta(MetaMessage::TrackName(name.as_bytes())),
    });

    for note in &track.notes {
        if note.pitch > 127 || note.velocity > 127 || note.channel > 15 {
            return Err(EncodeError::Unrepresentable(format!(
                "track {}: pitch {}, velocity {}, channel {}",
                track.track_id, note.pitch, note.velocity, note.channel
            )));
        }

        let start_tick = tick_at(beat_to_tick(
            converter.time_to_beat(note.start_time_seconds),
            resolution,
        ))?;
        let end_tick = tick_at(beat_to_tick(
            converter.time_to_beat(note.end_time_seconds),
            resolution,
        ))?;
        // Notes shorter than a tick still get one
        let end_tick = end_tick.max(start_tick + 1);

        // Note On
        events.push(TrackEvent {
            delta: start_tick.into(),
            kind: TrackEventKind::Midi {
                channel: note.channel.into(),
                message: MidiMessage::NoteOn {
                    key: note.pitch.into(),
                    vel: note.velocity.into(),
                },
            },
        });

        // Note Off
        events.push(TrackEvent {
            delta: end_tick.into(),
            kind: TrackEventKind::Midi {
                channel: note.channel.into(),
                message: MidiMessage::NoteOff {
                    key: note.pitch.into(),
                    vel: 0.into(),
                },
            },
        });
    }

    // Sort by absolute tick time; releases go before attacks on the same tick
    events.sort_by_key(|e| (e.delta.as_int(), event_rank(&e.kind)));

    // Convert absolute times to delta times
    convert_to_delta_times(&mut events);

    // End of track
    events.push(TrackEvent {
        delta: 0.into(),
        kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
    });

    Ok(events)
}

fn tick_at(tick: f64) -> Result<u32, EncodeError> {
    if !(0.0..MAX_TICK).contains(&tick) {
        return Err(EncodeError::Unrepresentable(format!("tick {} out of range", tick)));
    }
    Ok(tick as u32)
}

fn event_rank(kind: &TrackEventKind) -> u8 {
    match kind {
        TrackEventKind::Meta(_) => 0,
        TrackEventKind::Midi {
            message: MidiMessage::NoteOff { .. },
            ..
        } => 1,
        _ => 2,
    }
}

/// Convert absolute tick times to delta times (time since previous event)
fn convert_to_delta_times(events: &mut [TrackEvent]) {
    let mut prev_tick = 0u32;
    for event in events.iter_mut() {
        let current_tick = event.delta.as_int();
        let delta = current_tick.saturating_sub(prev_tick);
        event.delta = delta.into();
        prev_tick = current_tick;
    }
}
