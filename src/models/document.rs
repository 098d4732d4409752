//! Beat-relative note document
//!
//! Input documents are read as raw JSON first so individual malformed notes
//! and tempo entries can be skipped without failing the run; only the
//! top-level shape is checked strictly here.
//!
//! ```json
//! {
//!   "resolution": 480,
//!   "tempo_map": [ { "beat": 0.0, "bpm": 120.0 } ],
//!   "notes": [ { "pitch": 60, "start_beat": 0.0, "duration_beat": 1.0 } ]
//! }
//! ```

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use super::fields::{self, Field};
use super::note::NoteEvent;
use super::tempo::TempoEvent;
use crate::config::{OutputFormat, MAX_TPQ};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("document is not a JSON object")]
    NotAnObject,
    #[error("document has no '{0}' key")]
    MissingKey(&'static str),
    #[error("'{key}' must be {expected}")]
    WrongType {
        key: &'static str,
        expected: &'static str,
    },
}

/// Top-level view of an input document
#[derive(Debug, Clone, Copy)]
pub struct RawDocument<'a> {
    pub resolution: u16,
    pub tempo_map: &'a [Value],
    pub notes: &'a [Value],
}

impl<'a> RawDocument<'a> {
    /// Check the document shape. `resolution` falls back to
    /// `default_resolution` when absent.
    pub fn read(value: &'a Value, default_resolution: u16) -> Result<RawDocument<'a>, SchemaError> {
        let record = value.as_object().ok_or(SchemaError::NotAnObject)?;

        let notes = record
            .get("notes")
            .ok_or(SchemaError::MissingKey("notes"))?
            .as_array()
            .ok_or(SchemaError::WrongType {
                key: "notes",
                expected: "an array",
            })?;
        let tempo_map = record
            .get("tempo_map")
            .ok_or(SchemaError::MissingKey("tempo_map"))?
            .as_array()
            .ok_or(SchemaError::WrongType {
                key: "tempo_map",
                expected: "an array",
            })?;

        let resolution = match fields::integer(record, "resolution") {
            Field::Missing => default_resolution,
            Field::Value(r) if (1..=MAX_TPQ as i64).contains(&r) => r as u16,
            _ => {
                return Err(SchemaError::WrongType {
                    key: "resolution",
                    expected: "an integer in 1..=32767",
                })
            }
        };

        Ok(RawDocument {
            resolution,
            tempo_map,
            notes,
        })
    }
}

/// Beat-relative document produced by a conversion
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BeatDocument {
    pub resolution: u16,
    pub tempo_map: Vec<TempoEvent>,
    pub notes: Vec<NoteEvent>,
}

impl BeatDocument {
    pub fn render(&self, format: OutputFormat) -> Result<String, serde_json::Error> {
        match format {
            OutputFormat::Compact => serde_json::to_string(self),
            OutputFormat::Pretty => {
                let mut out = Vec::new();
                let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
                let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
                self.serialize(&mut serializer)?;
                // serde_json only ever writes valid UTF-8
                Ok(String::from_utf8_lossy(&out).into_owned())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_read_valid_document() {
        let value = json!({
            "resolution": 960,
            "tempo_map": [{ "beat": 0, "bpm": 120 }],
            "notes": []
        });
        let doc = RawDocument::read(&value, 480).unwrap();
        assert_eq!(doc.resolution, 960);
        assert_eq!(doc.tempo_map.len(), 1);
        assert!(doc.notes.is_empty());
    }

    #[test]
    fn test_resolution_defaults() {
        let value = json!({ "tempo_map": [], "notes": [] });
        assert_eq!(RawDocument::read(&value, 480).unwrap().resolution, 480);
    }

    #[test]
    fn test_resolution_accepts_integral_float() {
        let value = json!({ "resolution": 96.0, "tempo_map": [], "notes": [] });
        assert_eq!(RawDocument::read(&value, 480).unwrap().resolution, 96);

        let value = json!({ "resolution": 96.5, "tempo_map": [], "notes": [] });
        assert!(RawDocument::read(&value, 480).is_err());
        let value = json!({ "resolution": null, "tempo_map": [], "notes": [] });
        assert!(RawDocument::read(&value, 480).is_err());
    }

    #[test]
    fn test_schema_errors() {
        assert_eq!(
            RawDocument::read(&json!([1, 2]), 480).unwrap_err(),
            SchemaError::NotAnObject
        );
        assert_eq!(
            RawDocument::read(&json!({ "tempo_map": [] }), 480).unwrap_err(),
            SchemaError::MissingKey("notes")
        );
        assert_eq!(
            RawDocument::read(&json!({ "notes": [] }), 480).unwrap_err(),
            SchemaError::MissingKey("tempo_map")
        );
        assert!(matches!(
            RawDocument::read(&json!({ "notes": {}, "tempo_map": [] }), 480),
            Err(SchemaError::WrongType { key: "notes", .. })
        ));
        assert!(matches!(
            RawDocument::read(&json!({ "notes": [], "tempo_map": [], "resolution": 0 }), 480),
            Err(SchemaError::WrongType { key: "resolution", .. })
        ));
    }

    #[test]
    fn test_render_formats() {
        let doc = BeatDocument {
            resolution: 480,
            tempo_map: vec![TempoEvent::new(0.0, 120.0)],
            notes: vec![NoteEvent::new(60, 0.0, 1.0, 100, 0, 0).unwrap()],
        };

        let compact = doc.render(OutputFormat::Compact).unwrap();
        assert!(!compact.contains('\n'));
        assert!(compact.starts_with(r#"{"resolution":480,"tempo_map":[{"beat":0.0,"bpm":120.0}]"#));

        let pretty = doc.render(OutputFormat::Pretty).unwrap();
        assert!(pretty.contains("\n    \"resolution\": 480"));

        let reparsed: Value = serde_json::from_str(&pretty).unwrap();
        assert_eq!(reparsed["notes"][0]["pitch"], 60);
        assert_eq!(reparsed["notes"][0]["duration_beat"], 1.0);
        assert_eq!(reparsed["notes"][0]["channel"], 0);
    }
}
