//! Tempo schedule and its anchor table
//!
//! A [`TempoMap`] is the canonical, validated form of a list of
//! `(beat, bpm)` tempo changes:
//! - sorted ascending by beat, strictly increasing
//! - first entry at beat 0
//! - every bpm positive and finite
//!
//! Building it also materializes the [`AnchorTable`]: for every entry the
//! absolute time (seconds) at which it takes effect.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use super::fields::{self, Field};
use crate::diagnostics::{ConversionReport, Diagnostic, DiagnosticKind};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TempoMapError {
    #[error("tempo map is empty and no fallback tempo is configured")]
    Empty,
}

/// Tempo change anchored at a beat position
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TempoEvent {
    pub beat: f64,
    pub bpm: f64,
}

impl TempoEvent {
    pub fn new(beat: f64, bpm: f64) -> Self {
        Self { beat, bpm }
    }

    /// Read one raw `tempo_map` entry.
    ///
    /// A missing `beat` means beat 0 and a missing `bpm` means `default_bpm`
    /// (both reported). Entries that are not objects or carry non-numeric
    /// fields are skipped and counted; `None` is returned for them.
    pub fn from_value(
        value: &Value,
        index: usize,
        default_bpm: f64,
        report: &mut ConversionReport,
    ) -> Option<TempoEvent> {
        let context = format!("tempo_map[{}]", index);
        let Some(record) = value.as_object() else {
            report.tempo_events_skipped += 1;
            report.push(Diagnostic::warning(
                DiagnosticKind::TempoEventSkipped,
                context,
                format!("tempo entry is not an object: {}", value),
            ));
            return None;
        };

        let beat = match fields::float(record, "beat") {
            Field::Value(beat) => beat,
            Field::Missing => {
                report.tempo_events_coerced += 1;
                report.push(Diagnostic::warning(
                    DiagnosticKind::TempoBeatDefaulted,
                    context.clone(),
                    "tempo entry has no beat, placing it at beat 0",
                ));
                0.0
            }
            Field::Invalid => {
                report.tempo_events_skipped += 1;
                report.push(Diagnostic::warning(
                    DiagnosticKind::TempoEventSkipped,
                    context,
                    format!("beat is not a number: {}", value),
                ));
                return None;
            }
        };

        let bpm = match fields::float(record, "bpm") {
            Field::Value(bpm) => bpm,
            Field::Missing => {
                report.tempo_events_coerced += 1;
                report.push(Diagnostic::warning(
                    DiagnosticKind::TempoBpmCoerced,
                    context,
                    format!("tempo entry has no bpm, using {} bpm", default_bpm),
                ));
                default_bpm
            }
            Field::Invalid => {
                report.tempo_events_skipped += 1;
                report.push(Diagnostic::warning(
                    DiagnosticKind::TempoEventSkipped,
                    context,
                    format!("bpm is not a number: {}", value),
                ));
                return None;
            }
        };

        Some(TempoEvent::new(beat, bpm))
    }
}

/// A tempo entry materialized with its absolute time
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Anchor {
    pub beat: f64,
    /// Seconds elapsed from beat 0 to this anchor
    pub time: f64,
    /// Tempo governing the segment that starts here
    pub bpm: f64,
}

/// Anchors of a canonical tempo map, strictly increasing in beat and time
#[derive(Debug, Clone, PartialEq)]
pub struct AnchorTable {
    anchors: Vec<Anchor>,
}

impl AnchorTable {
    pub fn as_slice(&self) -> &[Anchor] {
        &self.anchors
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Anchor> {
        self.anchors.iter()
    }
}

/// How [`TempoMap::normalize`] fills gaps in the input
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TempoOptions {
    /// Replacement for invalid bpm values and the synthesized beat-0 tempo
    pub default_bpm: f64,
    /// Tempo used when the input has no entries at all
    pub fallback_bpm: Option<f64>,
}

impl Default for TempoOptions {
    fn default() -> Self {
        Self {
            default_bpm: crate::config::DEFAULT_TEMPO_BPM,
            fallback_bpm: None,
        }
    }
}

/// Canonical tempo schedule
#[derive(Debug, Clone, PartialEq)]
pub struct TempoMap {
    anchors: AnchorTable,
}

impl TempoMap {
    /// Canonicalize raw tempo events.
    ///
    /// Events are stable-sorted by beat. Negative beats are skipped. When two
    /// events share a beat the first one wins; the later one is dropped
    /// entirely, so it affects neither lookups nor elapsed time. A beat-0
    /// anchor at `default_bpm` is inserted when the first admitted event
    /// starts later.
    pub fn normalize(
        raw: &[TempoEvent],
        options: TempoOptions,
        report: &mut ConversionReport,
    ) -> Result<TempoMap, TempoMapError> {
        let mut events: Vec<(usize, TempoEvent)> = Vec::with_capacity(raw.len() + 1);
        for (index, event) in raw.iter().enumerate() {
            if !event.beat.is_finite() {
                report.tempo_events_skipped += 1;
                report.push(Diagnostic::warning(
                    DiagnosticKind::TempoEventSkipped,
                    format!("tempo_map[{}]", index),
                    format!("beat {} is not finite", event.beat),
                ));
                continue;
            }
            events.push((index, *event));
        }

        if raw.is_empty() {
            let bpm = options.fallback_bpm.ok_or(TempoMapError::Empty)?;
            report.push(Diagnostic::info(
                DiagnosticKind::TempoFallbackUsed,
                "tempo_map",
                format!("tempo map is empty, using {} bpm", bpm),
            ));
            events.push((0, TempoEvent::new(0.0, bpm)));
        }

        // sort_by is stable: ties keep input order
        events.sort_by(|a, b| a.1.beat.total_cmp(&b.1.beat));

        let mut anchors: Vec<Anchor> = Vec::with_capacity(events.len() + 1);
        let starts_at_zero = events
            .iter()
            .find(|(_, event)| event.beat >= 0.0)
            .is_some_and(|(_, event)| event.beat == 0.0);
        if !starts_at_zero {
            report.push(Diagnostic::info(
                DiagnosticKind::TempoAnchorSynthesized,
                "tempo_map",
                format!("no tempo at beat 0, inserting {} bpm", options.default_bpm),
            ));
            anchors.push(Anchor {
                beat: 0.0,
                time: 0.0,
                bpm: options.default_bpm,
            });
        }

        for (index, event) in events {
            let context = format!("tempo_map[{}]", index);
            let last_beat = anchors.last().map_or(0.0, |a| a.beat);

            if event.beat < last_beat {
                report.tempo_events_skipped += 1;
                report.push(Diagnostic::warning(
                    DiagnosticKind::TempoEventSkipped,
                    context,
                    format!("beat {} precedes beat {}, skipping", event.beat, last_beat),
                ));
                continue;
            }

            if let Some(previous) = anchors.last() {
                if event.beat == previous.beat {
                    report.tempo_events_skipped += 1;
                    report.push(Diagnostic::warning(
                        DiagnosticKind::TempoDuplicateBeat,
                        context,
                        format!(
                            "beat {} already has a tempo of {} bpm, ignoring {} bpm",
                            event.beat, previous.bpm, event.bpm
                        ),
                    ));
                    continue;
                }
            }

            let bpm = if event.bpm.is_finite() && event.bpm > 0.0 {
                event.bpm
            } else {
                report.tempo_events_coerced += 1;
                report.push(Diagnostic::warning(
                    DiagnosticKind::TempoBpmCoerced,
                    context,
                    format!(
                        "bpm {} at beat {} is not positive, using {} bpm",
                        event.bpm, event.beat, options.default_bpm
                    ),
                ));
                options.default_bpm
            };

            let time = match anchors.last() {
                Some(previous) => previous.time + (event.beat - previous.beat) * 60.0 / previous.bpm,
                None => 0.0,
            };
            log::debug!("anchor beat {} at {:.6}s, {} bpm", event.beat, time, bpm);
            anchors.push(Anchor {
                beat: event.beat,
                time,
                bpm,
            });
        }

        Ok(TempoMap {
            anchors: AnchorTable { anchors },
        })
    }

    pub fn anchors(&self) -> &AnchorTable {
        &self.anchors
    }

    /// The canonical tempo events, one per anchor
    pub fn events(&self) -> Vec<TempoEvent> {
        self.anchors
            .iter()
            .map(|a| TempoEvent::new(a.beat, a.bpm))
            .collect()
    }
}
