//! Notes grouped into tracks
//!
//! Tracks are established up front from the track ids the input mentions.
//! Notes are then admitted one at a time; a note for a track that was never
//! established is rejected rather than silently creating the track.

use serde_json::Value;
use std::collections::BTreeMap;

use super::note::{self, NoteEvent, NoteValidationError};
use crate::config::DEFAULT_TRACK;
use crate::diagnostics::{ConversionReport, Diagnostic, DiagnosticKind};

/// A track and its notes, ordered by start beat then input order
#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    id: u32,
    notes: Vec<NoteEvent>,
}

impl Track {
    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn notes(&self) -> &[NoteEvent] {
        &self.notes
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct NoteCatalog {
    tracks: BTreeMap<u32, Track>,
}

impl NoteCatalog {
    /// Catalog with exactly the given tracks; track 0 when the list is empty.
    pub fn with_tracks<I>(ids: I) -> NoteCatalog
    where
        I: IntoIterator<Item = u32>,
    {
        let mut tracks: BTreeMap<u32, Track> = ids
            .into_iter()
            .map(|id| (id, Track { id, notes: Vec::new() }))
            .collect();
        if tracks.is_empty() {
            tracks.insert(
                DEFAULT_TRACK,
                Track {
                    id: DEFAULT_TRACK,
                    notes: Vec::new(),
                },
            );
        }
        NoteCatalog { tracks }
    }

    /// Establish one track per distinct explicit `track` id in the raw notes.
    /// Records without a usable `track` key do not establish anything.
    pub fn establish(raw_notes: &[Value]) -> NoteCatalog {
        let ids = raw_notes
            .iter()
            .filter_map(Value::as_object)
            .filter(|record| record.contains_key("track"))
            .filter_map(|record| note::track_id(record).ok());
        NoteCatalog::with_tracks(ids)
    }

    /// Add a validated note to its track.
    pub fn admit(&mut self, note: NoteEvent) -> Result<(), NoteValidationError> {
        match self.tracks.get_mut(&note.track()) {
            Some(track) => {
                track.notes.push(note);
                Ok(())
            }
            None => Err(NoteValidationError::UnknownTrack(note.track())),
        }
    }

    pub fn note_count(&self) -> usize {
        self.tracks.values().map(|t| t.notes.len()).sum()
    }

    /// Finish the catalog: drop empty tracks and order every track's notes.
    /// Tracks come out in ascending id order.
    pub fn into_tracks(self, report: &mut ConversionReport) -> Vec<Track> {
        let mut tracks = Vec::with_capacity(self.tracks.len());
        for (id, mut track) in self.tracks {
            if track.notes.is_empty() {
                report.push(Diagnostic::info(
                    DiagnosticKind::TrackDropped,
                    format!("track {}", id),
                    "track has no valid notes, dropping it",
                ));
                continue;
            }
            track
                .notes
                .sort_by(|a, b| a.start_beat().total_cmp(&b.start_beat()));
            tracks.push(track);
        }
        tracks
    }
}
