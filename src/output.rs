use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::error::ScrapeError;
use crate::fetcher::PageFetcher;
use crate::scrape_engine::ScrapeEngine;

const EXPORT_PREFIX: &str = "AnalVids-Dict";

/// `AnalVids-Dict-2024-05-01-13-45-09.json`
pub fn export_filename(now: DateTime<Local>) -> String {
    format!("{}-{}.json", EXPORT_PREFIX, now.format("%Y-%m-%d-%H-%M-%S"))
}

/// Desktop if there is one, then home, then the working directory.
pub fn default_output_dir() -> PathBuf {
    dirs::desktop_dir()
        .filter(|dir| dir.is_dir())
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Picks the file the JSON export goes to.
///
/// An existing file is overwritten, an existing directory gets a timestamped
/// file inside it. Anything else falls back to `fallback_dir` with a warning.
pub fn resolve_output_path(requested: Option<&Path>, fallback_dir: &Path, filename: &str) -> PathBuf {
    match requested {
        Some(path) if path.is_file() => path.to_path_buf(),
        Some(path) if path.is_dir() => path.join(filename),
        Some(path) => {
            let fallback = fallback_dir.join(filename);
            warn!(
                "Path {} does not exist, defaulting to: {}",
                path.display(),
                fallback.display()
            );
            fallback
        }
        None => fallback_dir.join(filename),
    }
}

/// JSON with 4-space indentation.
pub fn to_pretty_json<T: Serialize + ?Sized>(value: &T) -> Result<String, ScrapeError> {
    let mut buf = Vec::new();
    let formatter = PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value.serialize(&mut serializer)?;
    String::from_utf8(buf).map_err(|e| ScrapeError::Config(format!("non UTF-8 JSON output: {}", e)))
}

/// Records of one run keyed by the input that produced them, in input order.
#[derive(Debug, Default)]
pub struct Snapshot {
    entries: Map<String, Value>,
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, input: &str, record: Value) {
        self.entries.insert(input.to_string(), record);
    }

    /// Rewrites `path` with everything collected so far.
    pub fn save(&self, path: &Path) -> Result<(), ScrapeError> {
        let json = to_pretty_json(&self.entries)?;
        fs::write(path, json)?;
        info!("Saved {} record(s) to {}", self.entries.len(), path.display());
        Ok(())
    }
}

/// Where the JSON snapshot goes, plus the location used once that fails.
#[derive(Debug, Clone, PartialEq)]
pub struct JsonExport {
    path: PathBuf,
    fallback: PathBuf,
}

impl JsonExport {
    pub fn new(path: PathBuf, fallback: PathBuf) -> Self {
        Self { path, fallback }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes `snapshot`. A failed write is retried once at the fallback,
    /// which then stays the target for later saves.
    pub fn save(&mut self, snapshot: &Snapshot) -> Result<(), ScrapeError> {
        match snapshot.save(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if self.path != self.fallback => {
                warn!(
                    "Could not write {} ({}), defaulting to: {}",
                    self.path.display(),
                    err,
                    self.fallback.display()
                );
                self.path = self.fallback.clone();
                snapshot.save(&self.path)
            }
            Err(err) => Err(err),
        }
    }
}

/// Scrapes `inputs` in order, printing each record to `out` and, with an
/// export, rewriting the snapshot after every record. Stops at the first
/// error; records already saved stay on disk.
pub async fn run_inputs<F, W>(
    engine: &ScrapeEngine<F>,
    inputs: &[String],
    mut export: Option<JsonExport>,
    legacy: bool,
    out: &mut W,
) -> Result<usize, ScrapeError>
where
    F: PageFetcher,
    W: Write,
{
    let mut snapshot = Snapshot::new();

    for (index, input) in inputs.iter().enumerate() {
        info!("--- Processing input {} of {}: {} ---", index + 1, inputs.len(), input);

        let record = engine.scrape(input).await?;
        let value = if legacy {
            record.to_legacy_value()?
        } else {
            serde_json::to_value(&record)?
        };

        writeln!(out, "{}", to_pretty_json(&value)?)?;

        if let Some(export) = export.as_mut() {
            snapshot.insert(input, value);
            export.save(&snapshot)?;
        }
    }

    Ok(inputs.len())
}
