//! Validated note records
//!
//! A [`NoteEvent`] can only be obtained through [`parse_note`] or
//! [`NoteEvent::new`], both of which reject out-of-range values outright.
//! Nothing downstream ever sees a partially valid note.

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use super::fields::{self, Field};
use crate::config::{DEFAULT_CHANNEL, DEFAULT_TRACK, DEFAULT_VELOCITY, MAX_TRACK_ID};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum NoteValidationError {
    #[error("note is not an object")]
    NotAnObject,
    #[error("missing required field '{0}'")]
    MissingField(&'static str),
    #[error("field '{0}' is not a number")]
    NotNumeric(&'static str),
    #[error("pitch {0} outside 0..=127")]
    PitchOutOfRange(i64),
    #[error("velocity {0} outside 0..=127")]
    VelocityOutOfRange(i64),
    #[error("channel {0} outside 0..=15")]
    ChannelOutOfRange(i64),
    #[error("track {0} outside 0..=65534")]
    TrackOutOfRange(i64),
    #[error("start beat {0} is negative")]
    NegativeStart(f64),
    #[error("duration {0} beats is not positive")]
    NonPositiveDuration(f64),
    #[error("track {0} is not established")]
    UnknownTrack(u32),
}

/// Field checks that depend on the target codec
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoteOptions {
    /// Validate `channel`; when off the field is ignored and the default
    /// channel is used
    pub enforce_channel: bool,
}

impl Default for NoteOptions {
    fn default() -> Self {
        Self {
            enforce_channel: true,
        }
    }
}

/// One note in beat coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NoteEvent {
    pitch: u8,
    start_beat: f64,
    duration_beat: f64,
    velocity: u8,
    track: u32,
    channel: u8,
}

impl NoteEvent {
    /// Build a note from already typed values, applying the same range
    /// checks as [`parse_note`].
    pub fn new(
        pitch: u8,
        start_beat: f64,
        duration_beat: f64,
        velocity: u8,
        track: u32,
        channel: u8,
    ) -> Result<NoteEvent, NoteValidationError> {
        check_midi_byte(pitch as i64, NoteValidationError::PitchOutOfRange)?;
        check_midi_byte(velocity as i64, NoteValidationError::VelocityOutOfRange)?;
        if channel > 15 {
            return Err(NoteValidationError::ChannelOutOfRange(channel as i64));
        }
        if track > MAX_TRACK_ID {
            return Err(NoteValidationError::TrackOutOfRange(track as i64));
        }
        check_timing(start_beat, duration_beat)?;
        Ok(NoteEvent {
            pitch,
            start_beat,
            duration_beat,
            velocity,
            track,
            channel,
        })
    }

    pub fn pitch(&self) -> u8 {
        self.pitch
    }

    pub fn start_beat(&self) -> f64 {
        self.start_beat
    }

    pub fn duration_beat(&self) -> f64 {
        self.duration_beat
    }

    pub fn end_beat(&self) -> f64 {
        self.start_beat + self.duration_beat
    }

    pub fn velocity(&self) -> u8 {
        self.velocity
    }

    pub fn track(&self) -> u32 {
        self.track
    }

    pub fn channel(&self) -> u8 {
        self.channel
    }
}

/// Validate one raw `notes` entry.
pub fn parse_note(raw: &Value, options: NoteOptions) -> Result<NoteEvent, NoteValidationError> {
    let record = raw.as_object().ok_or(NoteValidationError::NotAnObject)?;

    let pitch = required(fields::integer(record, "pitch"), "pitch")?;
    let start_beat = required(fields::float(record, "start_beat"), "start_beat")?;
    let duration_beat = required(fields::float(record, "duration_beat"), "duration_beat")?;
    let velocity = required(
        fields::integer(record, "velocity").or_default(DEFAULT_VELOCITY as i64),
        "velocity",
    )?;
    let track = track_id(record)?;
    let channel = if options.enforce_channel {
        let channel = required(
            fields::integer(record, "channel").or_default(DEFAULT_CHANNEL as i64),
            "channel",
        )?;
        if !(0..=15).contains(&channel) {
            return Err(NoteValidationError::ChannelOutOfRange(channel));
        }
        channel as u8
    } else {
        DEFAULT_CHANNEL
    };

    let pitch = check_midi_byte(pitch, NoteValidationError::PitchOutOfRange)?;
    let velocity = check_midi_byte(velocity, NoteValidationError::VelocityOutOfRange)?;
    check_timing(start_beat, duration_beat)?;

    Ok(NoteEvent {
        pitch,
        start_beat,
        duration_beat,
        velocity,
        track,
        channel,
    })
}

/// Track id of a raw record, defaulted when absent
pub fn track_id(record: &serde_json::Map<String, Value>) -> Result<u32, NoteValidationError> {
    let track = required(
        fields::integer(record, "track").or_default(DEFAULT_TRACK as i64),
        "track",
    )?;
    if !(0..=MAX_TRACK_ID as i64).contains(&track) {
        return Err(NoteValidationError::TrackOutOfRange(track));
    }
    Ok(track as u32)
}

fn required<T>(field: Field<T>, name: &'static str) -> Result<T, NoteValidationError> {
    match field {
        Field::Value(value) => Ok(value),
        Field::Missing => Err(NoteValidationError::MissingField(name)),
        Field::Invalid => Err(NoteValidationError::NotNumeric(name)),
    }
}

fn check_midi_byte(
    value: i64,
    error: fn(i64) -> NoteValidationError,
) -> Result<u8, NoteValidationError> {
    if (0..=127).contains(&value) {
        Ok(value as u8)
    } else {
        Err(error(value))
    }
}

fn check_timing(start_beat: f64, duration_beat: f64) -> Result<(), NoteValidationError> {
    if !start_beat.is_finite() {
        return Err(NoteValidationError::NotNumeric("start_beat"));
    }
    if !duration_beat.is_finite() {
        return Err(NoteValidationError::NotNumeric("duration_beat"));
    }
    if start_beat < 0.0 {
        return Err(NoteValidationError::NegativeStart(start_beat));
    }
    if duration_beat <= 0.0 {
        return Err(NoteValidationError::NonPositiveDuration(duration_beat));
    }
    Ok(())
}
