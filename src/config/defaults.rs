//! Default values for conversion
//!
//! Tempo, velocity, resolution and the other fallbacks used when a document
//! leaves a field out.

/// Default tempo in beats per minute
pub const DEFAULT_TEMPO_BPM: f64 = 120.0;

/// Tempo of a MIDI file that carries no tempo events
pub const SMF_DEFAULT_TEMPO_BPM: f64 = 120.0;

/// Default MIDI velocity for notes without one
pub const DEFAULT_VELOCITY: u8 = 100;

/// Default track id for notes without one
pub const DEFAULT_TRACK: u32 = 0;

/// Default MIDI channel for notes without one
pub const DEFAULT_CHANNEL: u8 = 0;

/// Default ticks per quarter note (MIDI resolution)
pub const DEFAULT_TPQ: u16 = 480;

/// Largest resolution a metrical SMF header can carry (15 bits)
pub const MAX_TPQ: u16 = 0x7FFF;

/// Duration given to notes whose end time does not follow their start time
pub const MIN_NOTE_SECONDS: f64 = 0.001;

/// Highest track id; SMF stores the track count in 16 bits, one of which
/// goes to the conductor track
pub const MAX_TRACK_ID: u32 = u16::MAX as u32 - 1;
