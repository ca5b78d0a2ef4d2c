//! CLI: encode pages to records, decode records to pages, check schemas.
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, anyhow, bail};
use clap::{Args, Parser, Subcommand};
use serde_json::Value as Json;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use page_avro::config::SerdeConfig;
use page_avro::{DefaultPageFactory, Schema, Transcoder, json};

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// transcode JSON-encoded property pages to and from Avro-style generic records
#[derive(Parser, Debug)]
pub struct CommandLineInterface {
    /// more logging (-v info, -vv debug, -vvv trace); RUST_LOG takes precedence
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// encode page documents into records, printed as JSON
    Encode(EncodeOut),
    /// decode record documents back into pages, printed as JSON
    Decode(DecodeOut),
    /// parse and validate a schema, then print its normalized form
    Schema(SchemaOut),
}

#[derive(Args, Debug, Clone)]
struct InputSettings {
    /// treat input as newline-delimited JSON (NDJSON); output follows suit
    #[arg(long, default_value_t = false)]
    ndjson: bool,

    /// One or more inputs. May be literal paths or quoted glob patterns
    #[arg(long, short, num_args = 1.., required = true)]
    input: Vec<String>,
}

#[derive(Args, Debug, Clone)]
struct SchemaSettings {
    /// Avro schema file (.avsc)
    #[arg(long, short, required_unless_present = "config")]
    schema: Option<PathBuf>,

    /// serde configuration file; supplies schema, class name and the evolution flag
    #[arg(long, conflicts_with = "schema")]
    config: Option<PathBuf>,
}

#[derive(clap::Parser, Debug)]
struct EncodeOut {
    #[command(flatten)]
    input_settings: InputSettings,

    #[command(flatten)]
    schema_settings: SchemaSettings,

    /// output file (stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,
}

#[derive(clap::Parser, Debug)]
struct DecodeOut {
    #[command(flatten)]
    input_settings: InputSettings,

    /// schema the records are read under
    #[command(flatten)]
    schema_settings: SchemaSettings,

    /// schema the records were written with; implies schema evolution
    #[arg(long)]
    writer_schema: Option<PathBuf>,

    /// class name of the root pages
    #[arg(long)]
    class_name: Option<String>,

    /// output file (stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,
}

#[derive(clap::Parser, Debug)]
struct SchemaOut {
    #[command(flatten)]
    schema_settings: SchemaSettings,

    /// output .avsc file (stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl InputSettings {
    fn load_process(&self, mut apply: impl FnMut(&Path, Json) -> Result<()>) -> Result<()> {
        let source_paths = resolve_file_path_patterns(&self.input)
            .context("failed to resolve input file paths")?;
        for source_path in source_paths {
            let source = std::fs::read_to_string(&source_path)
                .with_context(|| format!("failed to read source file {}", source_path.display()))?;
            if self.ndjson {
                let lines = source.lines().enumerate().filter(|(_, line)| !line.trim().is_empty());
                for (number, line) in lines {
                    let json_value = serde_json::from_str::<Json>(line).with_context(|| {
                        format!("failed to parse JSON ({}:{})", source_path.display(), number + 1)
                    })?;
                    apply(&source_path, json_value)?;
                }
            } else {
                let json_value = serde_json::from_str::<Json>(&source)
                    .with_context(|| format!("failed to parse JSON source file ({})", source_path.display()))?;
                apply(&source_path, json_value)?;
            }
        }
        Ok(())
    }
}

impl SchemaSettings {
    fn load_config(&self) -> Result<Option<SerdeConfig>> {
        let Some(path) = self.config.as_ref() else { return Ok(None) };
        let config = SerdeConfig::from_file(path)
            .with_context(|| format!("failed to load configuration {}", path.display()))?;
        info!(subject = %config.subject(), "configuration loaded");
        Ok(Some(config))
    }

    /// Transcoder for the configured or given schema. Without a configuration
    /// the class name is left empty.
    fn transcoder(&self) -> Result<Transcoder> {
        if let Some(config) = self.load_config()? {
            return Ok(Transcoder::from_config(&config)?);
        }
        let path = self.schema.as_ref().ok_or_else(|| anyhow!("either --schema or --config is required"))?;
        Ok(Transcoder::new("", Arc::new(load_schema(path)?)))
    }
}

struct Output {
    out: Option<PathBuf>,
    ndjson: bool,
    buffer: String,
}

impl Output {
    fn new(out: Option<&PathBuf>, ndjson: bool) -> Self {
        Self { out: out.cloned(), ndjson, buffer: String::new() }
    }

    fn emit(&mut self, value: &Json) -> Result<()> {
        let src = if self.ndjson { serde_json::to_string(value)? } else { serde_json::to_string_pretty(value)? };
        self.buffer.push_str(&src);
        self.buffer.push('\n');
        Ok(())
    }

    fn finish(self) -> Result<()> {
        match self.out {
            Some(out) => {
                if let Some(parent) = out.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                std::fs::write(&out, &self.buffer).with_context(|| format!("failed to write {}", out.display()))
            }
            None => {
                print!("{}", self.buffer);
                Ok(())
            }
        }
    }
}

impl CommandLineInterface {
    pub fn load() -> Self {
        Self::parse()
    }

    pub fn init_logging(&self) {
        let level = match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        };
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
        tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
    }

    pub fn run(&self) -> Result<()> {
        match &self.cmd {
            Command::Encode(target) => {
                let transcoder = target.schema_settings.transcoder()?;
                let mut output = Output::new(target.out.as_ref(), target.input_settings.ndjson);
                target.input_settings.load_process(|source_path, value| {
                    let page = json::page_from_json(&value)
                        .with_context(|| format!("not a page document ({})", source_path.display()))?;
                    let record = transcoder
                        .to_record(&page)
                        .with_context(|| format!("failed to encode {}", source_path.display()))?;
                    debug!(path = %source_path.display(), fields = record.len(), "encoded");
                    output.emit(&json::record_to_json(&record))
                })?;
                output.finish()
            }
            Command::Decode(target) => {
                let mut transcoder = target.schema_settings.transcoder()?;
                let writer = match target.writer_schema.as_ref() {
                    Some(path) => {
                        transcoder = transcoder.with_schema_evolution(true);
                        load_schema(path)?
                    }
                    None => transcoder.schema().clone(),
                };
                if let Some(class_name) = target.class_name.as_ref() {
                    transcoder = transcoder.with_class_name(class_name);
                } else if transcoder.class_name().is_empty() {
                    let name = writer.name().unwrap_or_default().to_owned();
                    transcoder = transcoder.with_class_name(name);
                }
                let mut output = Output::new(target.out.as_ref(), target.input_settings.ndjson);
                target.input_settings.load_process(|source_path, value| {
                    let record = json::record_from_json(&value, &writer)
                        .with_context(|| format!("not a record of the writer schema ({})", source_path.display()))?;
                    let page = transcoder
                        .to_page(&record, &writer, &DefaultPageFactory)
                        .with_context(|| format!("failed to decode {}", source_path.display()))?;
                    debug!(path = %source_path.display(), properties = page.len(), "decoded");
                    output.emit(&json::page_to_json(&page))
                })?;
                output.finish()
            }
            Command::Schema(target) => {
                let schema = match target.schema_settings.load_config()? {
                    Some(config) => config.load_schema()?,
                    None => match target.schema_settings.schema.as_ref() {
                        Some(path) => load_schema(path)?,
                        None => bail!("either --schema or --config is required"),
                    },
                };
                let mut output = Output::new(target.out.as_ref(), false);
                output.emit(&schema.to_json())?;
                output.finish()
            }
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

fn load_schema(path: &Path) -> Result<Schema> {
    let src = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read schema file {}", path.display()))?;
    Schema::parse_str(&src).with_context(|| format!("invalid schema ({})", path.display()))
}

fn resolve_file_path_patterns<I>(patterns: I) -> Result<Vec<PathBuf>>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    fn has_glob_chars(s: &str) -> bool {
        s.bytes().any(|b| matches!(b, b'*' | b'?' | b'[' | b'{' ))
    }

    let mut out = Vec::<PathBuf>::new();

    for raw in patterns {
        let pattern = raw.as_ref();

        if has_glob_chars(pattern) {
            let mut matched_any = false;
            for entry in glob::glob(pattern)? {
                out.push(entry?);
                matched_any = true;
            }
            if !matched_any {
                bail!("glob pattern matched no files: {pattern}");
            }
        } else {
            out.push(PathBuf::from(pattern));
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_reads_under_the_schema_and_takes_an_optional_writer() {
        let cli = CommandLineInterface::try_parse_from([
            "page-avro", "decode", "--schema", "reader.avsc", "--writer-schema", "writer.avsc", "-i", "x.json",
        ])
        .unwrap();
        let Command::Decode(target) = cli.cmd else { panic!("expected decode") };
        assert_eq!(target.schema_settings.schema, Some(PathBuf::from("reader.avsc")));
        assert_eq!(target.writer_schema, Some(PathBuf::from("writer.avsc")));

        let cli = CommandLineInterface::try_parse_from(["page-avro", "decode", "-s", "reader.avsc", "-i", "x.json"])
            .unwrap();
        let Command::Decode(target) = cli.cmd else { panic!("expected decode") };
        assert_eq!(target.writer_schema, None);
    }

    #[test]
    fn a_schema_or_a_config_is_required_but_not_both() {
        assert!(CommandLineInterface::try_parse_from(["page-avro", "encode", "-i", "x.json"]).is_err());
        assert!(CommandLineInterface::try_parse_from([
            "page-avro", "encode", "--schema", "s.avsc", "--config", "c.json", "-i", "x.json",
        ])
        .is_err());
        let cli = CommandLineInterface::try_parse_from(["page-avro", "-vv", "encode", "--config", "c.json", "-i", "a.json", "b.json"])
            .unwrap();
        assert_eq!(cli.verbose, 2);
        let Command::Encode(target) = cli.cmd else { panic!("expected encode") };
        assert_eq!(target.input_settings.input, ["a.json", "b.json"]);
    }

    #[test]
    fn literal_paths_pass_through_pattern_resolution() {
        let paths = resolve_file_path_patterns(["records/one.json", "two.json"]).unwrap();
        assert_eq!(paths, [PathBuf::from("records/one.json"), PathBuf::from("two.json")]);
        assert!(resolve_file_path_patterns(["/nonexistent-dir-for-page-avro/*.json"]).is_err());
    }
}
