//! Time-domain JSON codec
//!
//! Serializes [`TimedScore`] as-is: notes in absolute seconds, grouped by
//! track. Useful for inspecting what the SMF encoder would receive.

use super::{Codec, DecodeError, DecodedNote, DecodedScore, EncodeError, TimedScore};

#[derive(Debug, Clone, Copy, Default)]
pub struct TimedJsonCodec;

impl Codec for TimedJsonCodec {
    fn name(&self) -> &'static str {
        "timed-json"
    }

    fn decode(&self, bytes: &[u8]) -> Result<DecodedScore, DecodeError> {
        let score: TimedScore = serde_json::from_slice(bytes)
            .map_err(|e| DecodeError::Malformed(format!("timed JSON: {}", e)))?;

        let notes = score
            .tracks
            .iter()
            .flat_map(|track| {
                track.notes.iter().map(move |note| DecodedNote {
                    pitch: note.pitch,
                    velocity: note.velocity,
                    channel: note.channel,
                    track_index: track.track_id,
                    start_time_seconds: note.start_time_seconds,
                    end_time_seconds: note.end_time_seconds,
                })
            })
            .collect();

        Ok(DecodedScore {
            resolution: score.resolution,
            tempo_events: score.tempo_events,
            notes,
            warnings: Vec::new(),
        })
    }

    fn encode(&self, score: &TimedScore) -> Result<Vec<u8>, EncodeError> {
        score.check_times()?;
        serde_json::to_vec_pretty(score).map_err(|e| EncodeError::Write(e.to_string()))
    }
}
