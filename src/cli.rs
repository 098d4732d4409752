//! Command-line front ends
//!
//! Both tools share the same shape: load the config, read the input file,
//! run the orchestrator, write the output file. Exit codes come from
//! [`ConversionError::exit_code`].

use clap::Parser;
use log::LevelFilter;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::{load_config, CodecKind, ConversionConfig, OutputFormat};
use crate::converters::{ConversionError, ConversionOrchestrator, Converted};
use crate::codec::EncodeError;
use crate::diagnostics::ConversionReport;

/// Convert a beat-relative JSON note document to a binary (MIDI) file.
///
/// Logging is controlled with RUST_LOG; see docs for the env_logger crate.
/// If RUST_LOG is not set, the log level defaults to Info.
#[derive(Parser, Debug)]
#[command(name = "beatdoc-to-binary", version, about, long_about = None, verbatim_doc_comment)]
pub struct ToBinaryOptions {
    /// Input JSON document
    pub input: PathBuf,

    /// Output file
    pub output: PathBuf,

    /// JSON configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Output codec (overrides the config file)
    #[arg(long, value_enum)]
    pub codec: Option<CodecKind>,
}

/// Convert a binary (MIDI) file to a beat-relative JSON note document.
///
/// Logging is controlled with RUST_LOG; see docs for the env_logger crate.
/// If RUST_LOG is not set, the log level defaults to Info.
#[derive(Parser, Debug)]
#[command(name = "binary-to-beatdoc", version, about, long_about = None, verbatim_doc_comment)]
pub struct ToDocumentOptions {
    /// Input binary file
    pub input: PathBuf,

    /// Output JSON document (default: input path with a .json extension, or
    /// <stem>.beats.json when the input is itself a .json file)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Output layout (overrides the config file)
    #[arg(short, long, value_enum)]
    pub format: Option<OutputFormat>,

    /// JSON configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Input codec (overrides the config file)
    #[arg(long, value_enum)]
    pub codec: Option<CodecKind>,
}

pub fn init_logging() {
    let mut log_builder = env_logger::builder();
    if env::var("RUST_LOG").is_err() {
        log_builder.filter_level(LevelFilter::Info);
    }
    // A second init (e.g. from tests) is harmless
    let _ = log_builder.try_init();
}

/// Run `beatdoc-to-binary`
pub fn run_to_binary(options: &ToBinaryOptions) -> Result<ConversionReport, ConversionError> {
    let mut config = read_config(options.config.as_deref())?;
    if let Some(codec) = options.codec {
        config.codec = codec;
    }
    let orchestrator = ConversionOrchestrator::new(config)?;

    let input = read_file(&options.input)?;
    let Converted { output, report } = orchestrator.encode_document(&input)?;
    write_file(&options.output, &output)?;

    log::info!("wrote {}", options.output.display());
    Ok(report)
}

/// Run `binary-to-beatdoc`; returns where the document was written.
pub fn run_to_document(
    options: &ToDocumentOptions,
) -> Result<(PathBuf, ConversionReport), ConversionError> {
    let mut config = read_config(options.config.as_deref())?;
    if let Some(codec) = options.codec {
        config.codec = codec;
    }
    if let Some(format) = options.format {
        config.output_format = format;
    }
    let orchestrator = ConversionOrchestrator::new(config)?;

    let input = read_file(&options.input)?;
    let Converted { output, report } = orchestrator.decode_document(&input)?;
    let text = output
        .render(orchestrator.config().output_format)
        .map_err(|e| EncodeError::Write(e.to_string()))?;

    let output_path = options
        .output
        .clone()
        .unwrap_or_else(|| default_document_path(&options.input));
    write_file(&output_path, text.as_bytes())?;

    log::info!(
        "saved {} notes (resolution {}, initial tempo {:.2} bpm) to {}",
        output.notes.len(),
        output.resolution,
        output.tempo_map.first().map_or(0.0, |t| t.bpm),
        output_path.display()
    );
    Ok((output_path, report))
}

/// Where a decoded document goes when no output is given; never the input itself
fn default_document_path(input: &Path) -> PathBuf {
    let path = input.with_extension("json");
    if path != input {
        return path;
    }
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    input.with_file_name(format!("{}.beats.json", stem))
}

fn read_config(path: Option<&Path>) -> Result<ConversionConfig, ConversionError> {
    match path {
        Some(path) => Ok(load_config(path)?),
        None => Ok(ConversionConfig::default()),
    }
}

fn read_file(path: &Path) -> Result<Vec<u8>, ConversionError> {
    fs::read(path).map_err(|e| ConversionError::io(path.display().to_string(), e))
}

fn write_file(path: &Path, bytes: &[u8]) -> Result<(), ConversionError> {
    fs::write(path, bytes).map_err(|e| ConversionError::io(path.display().to_string(), e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_to_document_args() {
        let options = ToDocumentOptions::try_parse_from([
            "binary-to-beatdoc",
            "song.mid",
            "--output",
            "out.json",
            "--format",
            "compact",
        ])
        .unwrap();
        assert_eq!(options.input, PathBuf::from("song.mid"));
        assert_eq!(options.output, Some(PathBuf::from("out.json")));
        assert_eq!(options.format, Some(OutputFormat::Compact));
    }

    #[test]
    fn test_parse_to_binary_args() {
        let options =
            ToBinaryOptions::try_parse_from(["beatdoc-to-binary", "in.json", "out.mid", "--codec", "timed-json"])
                .unwrap();
        assert_eq!(options.output, PathBuf::from("out.mid"));
        assert_eq!(options.codec, Some(CodecKind::TimedJson));

        assert!(ToBinaryOptions::try_parse_from(["beatdoc-to-binary", "in.json"]).is_err());
    }

    #[test]
    fn test_default_document_path() {
        assert_eq!(
            default_document_path(Path::new("songs/take1.mid")),
            PathBuf::from("songs/take1.json")
        );
        assert_eq!(
            default_document_path(Path::new("songs/take1")),
            PathBuf::from("songs/take1.json")
        );
        assert_eq!(
            default_document_path(Path::new("songs/take1.json")),
            PathBuf::from("songs/take1.beats.json")
        );
    }

    #[test]
    fn test_missing_input_is_io_error() {
        let options = ToBinaryOptions {
            input: PathBuf::from("/nonexistent/beatdoc/input.json"),
            output: PathBuf::from("/nonexistent/beatdoc/out.mid"),
            config: None,
            codec: None,
        };
        let error = run_to_binary(&options).unwrap_err();
        assert_eq!(error.exit_code(), 2);
    }
}
