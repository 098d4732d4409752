//! Diagnostics collected during a conversion run
//!
//! Every recoverable anomaly (coerced tempo, skipped note, clamped duration)
//! is recorded here as a structured [`Diagnostic`] and also emitted through
//! the `log` facade. The orchestrator hands the finished [`ConversionReport`]
//! back to the caller alongside the converted output.

use serde::{Deserialize, Serialize};

/// Severity level for diagnostics
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticSeverity {
    Warning,
    Info,
}

/// What kind of anomaly a diagnostic describes
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// Non-positive or non-finite bpm replaced by the default tempo
    TempoBpmCoerced,
    /// Tempo entry without a beat position, placed at beat 0
    TempoBeatDefaulted,
    /// Malformed or out-of-order tempo entry left out of the map
    TempoEventSkipped,
    /// Second tempo entry on an already anchored beat
    TempoDuplicateBeat,
    /// Beat-0 anchor inserted ahead of the first tempo change
    TempoAnchorSynthesized,
    /// Empty tempo schedule replaced by the caller's fallback tempo
    TempoFallbackUsed,
    /// Note record failed validation and was skipped
    NoteRejected,
    /// Note end time moved past its start time
    NoteDurationClamped,
    /// Zero-length note widened to one tick
    NoteDurationWidened,
    /// Track that ended up without notes
    TrackDropped,
    /// Recoverable problem reported by a binary codec
    CodecWarning,
}

/// A single diagnostic with the location it refers to
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Diagnostic {
    pub severity: DiagnosticSeverity,
    pub kind: DiagnosticKind,
    /// Where in the input the problem was found (e.g. "notes[3]")
    pub context: String,
    /// Human-readable message
    pub message: String,
}

impl Diagnostic {
    pub fn new(
        severity: DiagnosticSeverity,
        kind: DiagnosticKind,
        context: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            severity,
            kind,
            context: context.into(),
            message: message.into(),
        }
    }

    pub fn warning(kind: DiagnosticKind, context: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(DiagnosticSeverity::Warning, kind, context, message)
    }

    pub fn info(kind: DiagnosticKind, context: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(DiagnosticSeverity::Info, kind, context, message)
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.context, self.message)
    }
}

/// Aggregate counters and diagnostics for one conversion run
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct ConversionReport {
    pub notes_converted: usize,
    pub notes_skipped: usize,
    pub notes_clamped: usize,
    pub tempo_events_coerced: usize,
    pub tempo_events_skipped: usize,
    pub diagnostics: Vec<Diagnostic>,
    /// Collect without logging
    #[serde(skip)]
    muted: bool,
}

impl ConversionReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Report that collects diagnostics without forwarding them to the
    /// logger, for intermediate work whose findings are reported elsewhere.
    pub fn muted() -> Self {
        Self {
            muted: true,
            ..Self::default()
        }
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    /// Record a diagnostic and forward it to the logger unless muted.
    pub fn push(&mut self, diagnostic: Diagnostic) {
        if !self.muted {
            match diagnostic.severity {
                DiagnosticSeverity::Warning => log::warn!("{}", diagnostic),
                DiagnosticSeverity::Info => log::info!("{}", diagnostic),
            }
        }
        self.diagnostics.push(diagnostic);
    }

    /// Number of diagnostics of the given kind
    pub fn count(&self, kind: DiagnosticKind) -> usize {
        self.diagnostics.iter().filter(|d| d.kind == kind).count()
    }

    /// One-line summary suitable for a CLI status message
    pub fn summary(&self) -> String {
        format!(
            "{} notes converted, {} skipped, {} clamped; {} tempo events coerced, {} skipped",
            self.notes_converted,
            self.notes_skipped,
            self.notes_clamped,
            self.tempo_events_coerced,
            self.tempo_events_skipped,
        )
    }
}
