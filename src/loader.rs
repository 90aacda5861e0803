// resource-analyzer compares live cloud resources against IaC declarations
// Copyright (C) 2025  Peoples Grocers LLC
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published
// by the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.
//
// To purchase a license under different terms contact admin@peoplesgrocers.com
// To request changes, report bugs, or give user feedback contact
// marxism@peoplesgrocers.com
//

//! Reading input files and pulling the resource list out of them.
//!
//! Cloud inventories and IaC state dumps come in a handful of shapes. Some
//! tools emit a bare array of resources, others wrap it in an object under
//! `resources`, `items` or `data`. Everything downstream only sees the
//! normalized `Vec<Record>`.

use serde_json::Value;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use tracing::debug;

use crate::diagnostics::{Diagnostic, DiagnosticCode, DiagnosticCollector};
use crate::{Record, ValueTypeExt};

/// Container field names, in the order they are tried.
pub const RESOURCE_CONTAINER_KEYS: [&str; 3] = ["resources", "items", "data"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Compression {
    None,
    Gzip,
    Zstd,
    Brotli,
}

impl Compression {
    fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("gz") => Compression::Gzip,
            Some("zst") | Some("zstd") => Compression::Zstd,
            Some("br") => Compression::Brotli,
            _ => Compression::None,
        }
    }
}

#[cfg(feature = "compression")]
fn open_input(path: &Path, file: File) -> Result<Box<dyn Read>, Diagnostic> {
    let reader = BufReader::new(file);
    match Compression::from_path(path) {
        Compression::None => Ok(Box::new(reader)),
        Compression::Gzip => Ok(Box::new(flate2::read::MultiGzDecoder::new(reader))),
        Compression::Brotli => Ok(Box::new(brotli::Decompressor::new(reader, 4096))),
        Compression::Zstd => match zstd::stream::read::Decoder::with_buffer(reader) {
            Ok(decoder) => Ok(Box::new(decoder)),
            Err(e) => Err(Diagnostic::fatal(
                DiagnosticCode::ReadFailed,
                format!(
                    "I couldn't start decompressing {}: {}",
                    path.display(),
                    e
                ),
            )),
        },
    }
}

#[cfg(not(feature = "compression"))]
fn open_input(path: &Path, file: File) -> Result<Box<dyn Read>, Diagnostic> {
    match Compression::from_path(path) {
        Compression::None => Ok(Box::new(BufReader::new(file))),
        _ => Err(Diagnostic::fatal(
            DiagnosticCode::UnsupportedCompression,
            format!(
                "{} looks compressed, but this build has no compression support.",
                path.display()
            ),
        )
        .with_advice(
            "Decompress the file first, or rebuild with the `compression` feature enabled."
                .to_string(),
        )),
    }
}

/// Read and parse one JSON file. Files ending in `.gz`, `.zst` or `.br` are
/// decompressed on the way in.
pub fn load_json_file<P: AsRef<Path>>(path: P) -> Result<Value, Diagnostic> {
    let path = path.as_ref();
    let filename = path.display().to_string();

    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(Diagnostic::fatal(
                DiagnosticCode::PathNotFound,
                format!("I couldn't find the JSON file: {}", filename),
            )
            .with_advice(
                "Make sure the file path is correct and the file exists. \
                 Check for typos in the filename."
                    .to_string(),
            ));
        }
        Err(e) => {
            return Err(Diagnostic::fatal(
                DiagnosticCode::ReadFailed,
                format!("I couldn't open {}: {}", filename, e),
            ));
        }
    };

    let mut reader = open_input(path, file)?;
    let mut content = String::new();
    if let Err(e) = reader.read_to_string(&mut content) {
        return Err(Diagnostic::fatal(
            DiagnosticCode::ReadFailed,
            format!("I couldn't read {}: {}", filename, e),
        )
        .with_advice(
            "The file must be UTF-8 text (optionally gzip, zstd or brotli compressed)."
                .to_string(),
        ));
    }

    serde_json::from_str(&content).map_err(|e| {
        let mut diagnostic = Diagnostic::fatal(
            DiagnosticCode::InvalidJson,
            format!("I couldn't parse {} as JSON: {}", filename, e),
        )
        .with_advice("Make sure the file contains valid JSON.".to_string());
        if e.line() > 0 {
            diagnostic = diagnostic
                .with_location(filename.clone(), e.line())
                .with_column(e.column());
            if let Some(line) = content.lines().nth(e.line() - 1) {
                diagnostic = diagnostic.with_snippet(snippet_at(line, e.column()));
            }
        }
        diagnostic
    })
}

fn snippet_at(line: &str, column: usize) -> String {
    const MAX_WIDTH: usize = 80;
    let chars: Vec<char> = line.chars().collect();
    let start = column.saturating_sub(MAX_WIDTH / 2).min(chars.len());
    let end = (start + MAX_WIDTH).min(chars.len());
    let visible: String = chars[start..end].iter().collect();
    let caret = column.saturating_sub(start).max(1);
    format!("    {}\n    {}^", visible, " ".repeat(caret - 1))
}

/// Pull the list of resource objects out of a parsed payload.
///
/// Accepts a top-level array of objects, or an object holding such an array
/// under the first of [`RESOURCE_CONTAINER_KEYS`] that has one. Order is
/// preserved. `source_name` only shows up in error messages.
pub fn extract_resources(payload: Value, source_name: &str) -> Result<Vec<Record>, Diagnostic> {
    let mut warnings = DiagnosticCollector::new();
    extract_resources_with_warnings(payload, source_name, &mut warnings)
}

/// Same as [`extract_resources`], recording non-fatal findings in `warnings`.
pub fn extract_resources_with_warnings(
    payload: Value,
    source_name: &str,
    warnings: &mut DiagnosticCollector,
) -> Result<Vec<Record>, Diagnostic> {
    match payload {
        Value::Array(items) => validate_resource_list(items, source_name, "top-level list"),
        Value::Object(mut obj) => {
            let present: Vec<&str> = RESOURCE_CONTAINER_KEYS
                .iter()
                .copied()
                .filter(|key| obj.get(*key).map(Value::is_array).unwrap_or(false))
                .collect();

            if present.len() > 1 {
                warnings.add(Diagnostic::warning(
                    DiagnosticCode::AmbiguousContainer,
                    format!(
                        "{} has more than one resource list ({}). I used '{}'.",
                        source_name,
                        present.join(", "),
                        present[0]
                    ),
                ));
            }

            let chosen = present.first().copied();
            match chosen.and_then(|key| obj.remove(key).map(|value| (key, value))) {
                Some((key, Value::Array(items))) => {
                    validate_resource_list(items, source_name, &format!("object['{}']", key))
                }
                _ => Err(Diagnostic::fatal(
                    DiagnosticCode::MissingResourceList,
                    format!(
                        "Could not find a resource list in {}. \
                         Expected a top-level list or an object with one of: {}.",
                        source_name,
                        RESOURCE_CONTAINER_KEYS.join(", ")
                    ),
                )
                .with_advice(format!(
                    "The top-level object has these keys: {}",
                    describe_keys(&obj)
                ))),
            }
        }
        other => Err(Diagnostic::fatal(
            DiagnosticCode::UnsupportedShape,
            format!(
                "Unsupported JSON structure in {}. Expected list or object, got {}.",
                source_name,
                other.type_name()
            ),
        )),
    }
}

/// Load a file and normalize it in one step.
pub fn load_resources<P: AsRef<Path>>(
    path: P,
    label: &str,
    warnings: &mut DiagnosticCollector,
) -> Result<Vec<Record>, Diagnostic> {
    let path = path.as_ref();
    let payload = load_json_file(path)?;
    let source_name = format!("{} ({})", label, path.display());
    let resources = extract_resources_with_warnings(payload, &source_name, warnings)?;
    debug!(source = %source_name, count = resources.len(), "loaded resources");
    Ok(resources)
}

fn validate_resource_list(
    items: Vec<Value>,
    source_name: &str,
    context: &str,
) -> Result<Vec<Record>, Diagnostic> {
    let mut normalized = Vec::with_capacity(items.len());
    for (index, item) in items.into_iter().enumerate() {
        match item {
            Value::Object(record) => normalized.push(record),
            other => {
                return Err(Diagnostic::fatal(
                    DiagnosticCode::NonObjectResource,
                    format!(
                        "Invalid resource at index {} in {} ({}). Expected object, got {}.",
                        index,
                        source_name,
                        context,
                        other.type_name()
                    ),
                ));
            }
        }
    }
    Ok(normalized)
}

fn describe_keys(obj: &Record) -> String {
    if obj.is_empty() {
        return "(none)".to_string();
    }
    obj.keys().map(String::as_str).collect::<Vec<_>>().join(", ")
}
