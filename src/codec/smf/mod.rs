//! Standard MIDI File codec
//!
//! Writes format 1 files (a conductor track with the tempo map, then one
//! track per note track) and reads any metrical SMF.

mod parse;
mod write;

pub use parse::read_smf;
pub use write::write_smf;

use super::{Codec, DecodeError, DecodedScore, EncodeError, TimedScore};

#[derive(Debug, Clone, Copy, Default)]
pub struct SmfCodec;

impl Codec for SmfCodec {
    fn name(&self) -> &'static str {
        "smf"
    }

    fn decode(&self, bytes: &[u8]) -> Result<DecodedScore, DecodeError> {
        read_smf(bytes)
    }

    fn encode(&self, score: &TimedScore) -> Result<Vec<u8>, EncodeError> {
        let mut out = Vec::new();
        write_smf(score, &mut out)?;
        Ok(out)
    }
}
