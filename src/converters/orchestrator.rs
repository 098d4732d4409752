//! Direction-specific conversion runs
//!
//! Each run builds its own tempo map, converter and note catalog, converts
//! every note, and returns the result together with the run's
//! [`ConversionReport`]. Nothing here touches the filesystem.

use serde_json::Value;

use super::errors::ConversionError;
use crate::codec::{codec_for, DecodeError, DecodedScore, TimedNote, TimedScore, TimedTrack};
use crate::config::{ConversionConfig, SMF_DEFAULT_TEMPO_BPM};
use crate::diagnostics::{ConversionReport, Diagnostic, DiagnosticKind};
use crate::models::{
    parse_note, BeatDocument, NoteCatalog, NoteEvent, NoteOptions, RawDocument, TempoEvent,
    TempoMap, TempoOptions,
};
use crate::timing::{next_time_after, quantize_beat, BeatTimeConverter};

/// Output of a successful run plus everything that was recovered along the way
#[derive(Debug, Clone)]
pub struct Converted<T> {
    pub output: T,
    pub report: ConversionReport,
}

#[derive(Debug, Clone)]
pub struct ConversionOrchestrator {
    config: ConversionConfig,
}

impl ConversionOrchestrator {
    /// Create an orchestrator; the config is validated once here.
    pub fn new(config: ConversionConfig) -> Result<Self, ConversionError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ConversionConfig {
        &self.config
    }

    /// Convert a beat-relative document into the time-domain model.
    ///
    /// Fatal: a document of the wrong shape, or a tempo map with no usable
    /// entries when no fallback tempo is configured. Invalid notes are
    /// skipped and counted.
    pub fn beats_to_time(&self, document: &Value) -> Result<Converted<TimedScore>, ConversionError> {
        let mut report = ConversionReport::new();
        let document = RawDocument::read(document, self.config.default_resolution)?;

        let raw_tempo: Vec<TempoEvent> = document
            .tempo_map
            .iter()
            .enumerate()
            .filter_map(|(index, value)| {
                TempoEvent::from_value(value, index, self.config.default_bpm, &mut report)
            })
            .collect();
        let tempo_map = TempoMap::normalize(&raw_tempo, self.tempo_options(), &mut report)?;
        let converter = BeatTimeConverter::new(&tempo_map);

        let note_options = NoteOptions {
            enforce_channel: self.config.enforce_channel,
        };
        let mut catalog = NoteCatalog::establish(document.notes);
        for (index, raw) in document.notes.iter().enumerate() {
            let admitted = parse_note(raw, note_options).and_then(|note| catalog.admit(note));
            if let Err(error) = admitted {
                report.notes_skipped += 1;
                report.push(Diagnostic::warning(
                    DiagnosticKind::NoteRejected,
                    format!("notes[{}]", index),
                    format!("skipping note: {}", error),
                ));
            }
        }

        log::debug!("{} notes admitted", catalog.note_count());

        let mut tracks = Vec::new();
        for track in catalog.into_tracks(&mut report) {
            let mut notes = Vec::with_capacity(track.notes().len());
            for note in track.notes() {
                let start_time_seconds = converter.beat_to_time(note.start_beat());
                let mut end_time_seconds = converter.beat_to_time(note.end_beat());
                if end_time_seconds <= start_time_seconds {
                    // At large magnitudes adding min_note_seconds can be a no-op
                    end_time_seconds = (start_time_seconds + self.config.min_note_seconds)
                        .max(next_time_after(start_time_seconds));
                    report.notes_clamped += 1;
                    report.push(Diagnostic::warning(
                        DiagnosticKind::NoteDurationClamped,
                        format!("track {}", track.id()),
                        format!(
                            "pitch {} at beat {} has no duration after time conversion, using {}s",
                            note.pitch(),
                            note.start_beat(),
                            self.config.min_note_seconds
                        ),
                    ));
                }
                notes.push(TimedNote {
                    pitch: note.pitch(),
                    velocity: note.velocity(),
                    channel: note.channel(),
                    start_time_seconds,
                    end_time_seconds,
                });
            }
            notes.sort_by(|a, b| a.start_time_seconds.total_cmp(&b.start_time_seconds));
            report.notes_converted += notes.len();
            tracks.push(TimedTrack {
                track_id: track.id(),
                notes,
            });
        }

        log::info!("{}", report.summary());
        Ok(Converted {
            output: TimedScore {
                resolution: document.resolution,
                tempo_events: tempo_map.events(),
                tracks,
            },
            report,
        })
    }

    /// Convert decoded time-domain data into a beat-relative document.
    ///
    /// Note positions are snapped to the tick grid; a note that collapses
    /// to zero length gets one tick.
    pub fn time_to_beats(&self, decoded: &DecodedScore) -> Result<Converted<BeatDocument>, ConversionError> {
        let mut report = ConversionReport::new();
        let resolution = decoded.resolution;
        if resolution == 0 {
            return Err(DecodeError::Malformed("resolution of 0 ticks per quarter".to_string()).into());
        }

        for warning in &decoded.warnings {
            report.push(Diagnostic::warning(DiagnosticKind::CodecWarning, "input", warning.clone()));
        }

        // Same schedule the decoder timed the notes with: a binary file
        // without tempo events plays at the SMF default, whatever default_bpm says
        let options = TempoOptions {
            default_bpm: SMF_DEFAULT_TEMPO_BPM,
            fallback_bpm: Some(SMF_DEFAULT_TEMPO_BPM),
        };
        let tempo_map = TempoMap::normalize(&decoded.tempo_events, options, &mut report)?;
        let converter = BeatTimeConverter::new(&tempo_map);

        let mut catalog = NoteCatalog::with_tracks(decoded.notes.iter().map(|n| n.track_index));
        let mut notes: Vec<NoteEvent> = Vec::with_capacity(decoded.notes.len());
        let one_tick = 1.0 / resolution as f64;

        for (index, decoded_note) in decoded.notes.iter().enumerate() {
            let context = format!("notes[{}]", index);
            let start_beat = quantize_beat(converter.time_to_beat(decoded_note.start_time_seconds), resolution);
            let end_beat = quantize_beat(converter.time_to_beat(decoded_note.end_time_seconds), resolution);
            let mut duration_beat = end_beat - start_beat;
            if duration_beat <= 0.0 {
                duration_beat = one_tick;
                report.notes_clamped += 1;
                report.push(Diagnostic::warning(
                    DiagnosticKind::NoteDurationWidened,
                    context.clone(),
                    format!(
                        "pitch {} at beat {} is shorter than a tick, widening to one tick",
                        decoded_note.pitch, start_beat
                    ),
                ));
            }

            let admitted = NoteEvent::new(
                decoded_note.pitch,
                start_beat,
                duration_beat,
                decoded_note.velocity,
                decoded_note.track_index,
                decoded_note.channel,
            )
            .and_then(|note| catalog.admit(note).map(|_| note));
            match admitted {
                Ok(note) => notes.push(note),
                Err(error) => {
                    report.notes_skipped += 1;
                    report.push(Diagnostic::warning(
                        DiagnosticKind::NoteRejected,
                        context,
                        format!("skipping note: {}", error),
                    ));
                }
            }
        }

        // Stable: simultaneous notes keep decode order
        notes.sort_by(|a, b| a.start_beat().total_cmp(&b.start_beat()));
        report.notes_converted = notes.len();

        log::info!("{}", report.summary());
        Ok(Converted {
            output: BeatDocument {
                resolution,
                tempo_map: tempo_map.events(),
                notes,
            },
            report,
        })
    }

    /// Parse a beat document and encode it with the configured codec.
    pub fn encode_document(&self, input: &[u8]) -> Result<Converted<Vec<u8>>, ConversionError> {
        let document: Value =
            serde_json::from_slice(input).map_err(|e| ConversionError::Input(e.to_string()))?;
        let Converted { output, report } = self.beats_to_time(&document)?;
        let codec = codec_for(self.config.codec);
        let bytes = codec.encode(&output)?;
        log::debug!("encoded {} bytes with {} codec", bytes.len(), codec.name());
        Ok(Converted {
            output: bytes,
            report,
        })
    }

    /// Decode bytes with the configured codec into a beat document.
    pub fn decode_document(&self, input: &[u8]) -> Result<Converted<BeatDocument>, ConversionError> {
        let codec = codec_for(self.config.codec);
        let decoded = codec.decode(input)?;
        log::debug!(
            "decoded {} notes, {} tempo events with {} codec",
            decoded.notes.len(),
            decoded.tempo_events.len(),
            codec.name()
        );
        self.time_to_beats(&decoded)
    }

    fn tempo_options(&self) -> TempoOptions {
        TempoOptions {
            default_bpm: self.config.default_bpm,
            fallback_bpm: self.config.empty_tempo_fallback_bpm,
        }
    }
}

impl Default for ConversionOrchestrator {
    fn default() -> Self {
        Self {
            config: ConversionConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::DecodedNote;
    use serde_json::json;

    fn orchestrator() -> ConversionOrchestrator {
        ConversionOrchestrator::default()
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
    fn test_tempo_change_moves_note_times() {
        let doc = json!({
            "tempo_map": [{ "beat": 0, "bpm": 120 }, { "beat": 4, "bpm": 60 }],
            "notes": [{ "pitch": 60, "start_beat": 4, "duration_beat": 2 }]
        });
        let result = orchestrator().beats_to_time(&doc).unwrap();
        let note = result.output.tracks[0].notes[0];
        assert_close(note.start_time_seconds, 2.0);
        assert_close(note.end_time_seconds, 4.0);
        assert_eq!(result.report.notes_converted, 1);
        assert_eq!(result.output.resolution, 480);
    }

    #[test]
    fn test_unknown_track_is_skipped() {
        // track 0 is never named explicitly, so the defaulted note has nowhere to go
        let doc = json!({
            "tempo_map": [{ "beat": 0, "bpm": 120 }],
            "notes": [
                { "pitch": 60, "start_beat": 0, "duration_beat": 1, "track": 1 },
                { "pitch": 62, "start_beat": 1, "duration_beat": 1 }
            ]
        });
        let result = orchestrator().beats_to_time(&doc).unwrap();
        assert_eq!(result.output.tracks.len(), 1);
        assert_eq!(result.output.tracks[0].track_id, 1);
        assert_eq!(result.report.notes_skipped, 1);
        assert_eq!(result.report.notes_converted, 1);
    }

    #[test]
    fn test_malformed_entries_do_not_abort() {
        let doc = json!({
            "tempo_map": [{ "beat": 0, "bpm": 0 }, "junk"],
            "notes": ["junk", { "pitch": 60, "start_beat": 0, "duration_beat": 1 }]
        });
        let result = orchestrator().beats_to_time(&doc).unwrap();
        assert_eq!(result.report.notes_skipped, 1);
        assert_eq!(result.report.tempo_events_coerced, 1);
        assert_eq!(result.report.tempo_events_skipped, 1);
        assert_eq!(result.output.tempo_events, vec![TempoEvent::new(0.0, 120.0)]);
    }

    #[test]
    fn test_empty_tempo_map_needs_fallback() {
        let doc = json!({ "tempo_map": [], "notes": [] });
        assert!(matches!(
            orchestrator().beats_to_time(&doc),
            Err(ConversionError::TempoMap(_))
        ));

        let config = ConversionConfig {
            empty_tempo_fallback_bpm: Some(100.0),
            ..ConversionConfig::default()
        };
        let lenient = ConversionOrchestrator::new(config).unwrap();
        let result = lenient.beats_to_time(&doc).unwrap();
        assert_eq!(result.output.tempo_events, vec![TempoEvent::new(0.0, 100.0)]);
    }

    #[test]
    fn test_time_to_beats_quantizes_and_sorts() {
        let decoded = DecodedScore {
            resolution: 4,
            tempo_events: vec![TempoEvent::new(0.0, 60.0)],
            notes: vec![
                DecodedNote {
                    pitch: 64,
                    velocity: 90,
                    channel: 1,
                    track_index: 1,
                    start_time_seconds: 2.01,
                    end_time_seconds: 3.0,
                },
                DecodedNote {
                    pitch: 60,
                    velocity: 80,
                    channel: 0,
                    track_index: 0,
                    start_time_seconds: 1.0,
                    end_time_seconds: 1.05,
                },
            ],
            warnings: vec!["track 3: 1 notes never released, dropping them".to_string()],
        };

        let result = orchestrator().time_to_beats(&decoded).unwrap();
        let notes = &result.output.notes;
        assert_eq!(notes.len(), 2);
        assert_eq!(notes[0].pitch(), 60);
        // 1.05s at 60 bpm snaps back to beat 1.0, widened to one tick
        assert_close(notes[0].duration_beat(), 0.25);
        assert_close(notes[1].start_beat(), 2.0);
        assert_close(notes[1].duration_beat(), 1.0);
        assert_eq!(result.report.notes_clamped, 1);
        assert_eq!(result.report.count(DiagnosticKind::CodecWarning), 1);
    }

    #[test]
    fn test_time_to_beats_rejects_negative_times() {
        let decoded = DecodedScore {
            resolution: 480,
            tempo_events: vec![],
            notes: vec![DecodedNote {
                pitch: 60,
                velocity: 90,
                channel: 0,
                track_index: 0,
                start_time_seconds: -1.0,
                end_time_seconds: 1.0,
            }],
            warnings: vec![],
        };
        let result = orchestrator().time_to_beats(&decoded).unwrap();
        assert!(result.output.notes.is_empty());
        assert_eq!(result.report.notes_skipped, 1);
        assert_eq!(result.output.tempo_map, vec![TempoEvent::new(0.0, 120.0)]);
    }

    #[test]
    fn test_collapsed_duration_is_clamped() {
        // 1e16 + 0.5 rounds back to 1e16, so start and end times coincide
        let doc = json!({
            "tempo_map": [{ "beat": 0, "bpm": 120 }],
            "notes": [
                { "pitch": 60, "start_beat": 1e16, "duration_beat": 0.5 },
                { "pitch": 62, "start_beat": 0, "duration_beat": 1 }
            ]
        });
        let result = orchestrator().beats_to_time(&doc).unwrap();
        assert_eq!(result.report.notes_converted, 2);
        assert_eq!(result.report.notes_clamped, 1);
        assert_eq!(result.report.count(DiagnosticKind::NoteDurationClamped), 1);

        let notes = &result.output.tracks[0].notes;
        let clamped = notes[1];
        assert_eq!(clamped.pitch, 60);
        assert_eq!(clamped.start_time_seconds, 5e15);
        assert!(clamped.end_time_seconds > clamped.start_time_seconds);
        // the ordinary note is untouched
        assert_close(notes[0].end_time_seconds, 0.5);
    }

    #[test]
    fn test_decode_timing_ignores_configured_default_bpm() {
        use midly::{Format, Header, MetaMessage, MidiMessage, Smf, Timing, TrackEvent, TrackEventKind};

        let note = |delta: u32, vel: u8| TrackEvent {
            delta: delta.into(),
            kind: TrackEventKind::Midi {
                channel: 0.into(),
                message: MidiMessage::NoteOn {
                    key: 60.into(),
                    vel: vel.into(),
                },
            },
        };
        // no tempo events anywhere: the file plays at 120 bpm
        let smf = Smf {
            header: Header {
                format: Format::SingleTrack,
                timing: Timing::Metrical(480.into()),
            },
            tracks: vec![vec![
                note(1920, 100),
                note(480, 0),
                TrackEvent {
                    delta: 0.into(),
                    kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
                },
            ]],
        };
        let mut bytes = Vec::new();
        smf.write(&mut bytes).unwrap();

        let config = ConversionConfig {
            default_bpm: 90.0,
            ..ConversionConfig::default()
        };
        let result = ConversionOrchestrator::new(config)
            .unwrap()
            .decode_document(&bytes)
            .unwrap();

        let document = result.output;
        assert_eq!(document.tempo_map, vec![TempoEvent::new(0.0, 120.0)]);
        assert_close(document.notes[0].start_beat(), 4.0);
        assert_close(document.notes[0].duration_beat(), 1.0);
    }

    #[test]
    fn test_invalid_json_is_input_error() {
        assert!(matches!(
            orchestrator().encode_document(b"{ not json"),
            Err(ConversionError::Input(_))
        ));
    }
}
