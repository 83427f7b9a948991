use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::Value;
use serde_json::ser::PrettyFormatter;
use tracing::debug;

use crate::config::PersistFormat;
use crate::{Error, Result};

/// Accumulates payloads into files under one output directory.
///
/// Nothing here is atomic or locked: a crash during a rewrite can truncate a
/// `JsonArray` file, and two processes sharing a directory will race.
#[derive(Debug, Clone)]
pub struct JsonExporter {
    dir: PathBuf,
    format: PersistFormat,
}

impl JsonExporter {
    pub fn new(dir: impl Into<PathBuf>, format: PersistFormat) -> Self {
        Self {
            dir: dir.into(),
            format,
        }
    }

    pub fn data_path(&self, stem: &str) -> PathBuf {
        let ext = match self.format {
            PersistFormat::JsonArray => "json",
            PersistFormat::JsonLines => "jsonl",
        };
        self.dir.join(format!("{stem}.{ext}"))
    }

    pub fn error_path(&self, stem: &str) -> PathBuf {
        self.dir.join(format!("{stem}.txt"))
    }

    /// Appends `payload` as one new top-level entry of the `stem` file.
    pub fn append<T: Serialize + ?Sized>(&self, stem: &str, payload: &T) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        let path = self.data_path(stem);
        let payload = serde_json::to_value(payload)?;
        debug!(path = %path.display(), "appending payload");

        match self.format {
            PersistFormat::JsonArray => append_to_array_file(&path, payload),
            PersistFormat::JsonLines => append_line(&path, &serde_json::to_string(&payload)?),
        }
    }

    /// Appends one line (typically a failed request url) to `<stem>.txt`.
    pub fn append_error(&self, stem: &str, line: &str) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        append_line(&self.error_path(stem), line)
    }
}

fn append_to_array_file(path: &Path, payload: Value) -> Result<()> {
    let entries = if path.exists() {
        let existing: Value = serde_json::from_str(&fs::read_to_string(path)?)?;
        let Value::Array(mut entries) = existing else {
            return Err(Error::NotAnArray {
                path: path.to_path_buf(),
            });
        };
        entries.push(payload);
        entries
    } else {
        vec![payload]
    };

    fs::write(path, to_pretty_json(&entries)?)?;
    Ok(())
}

fn append_line(path: &Path, line: &str) -> Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(file, "{line}")?;
    Ok(())
}

/// Four-space indent with raw UTF-8, the layout downstream tooling reads.
fn to_pretty_json<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    let formatter = PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value.serialize(&mut ser)?;
    Ok(buf)
}
