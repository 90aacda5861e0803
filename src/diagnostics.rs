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

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticLevel {
    Fatal,
    Warning,
}

impl fmt::Display for DiagnosticLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiagnosticLevel::Fatal => write!(f, "error"),
            DiagnosticLevel::Warning => write!(f, "warning"),
        }
    }
}

/// Which stage of a run a diagnostic came from.
///
/// `LoadShape` and `MatchKey` are the two error kinds the comparison core can
/// raise. Everything else belongs to the I/O around it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticCategory {
    Load,
    LoadShape,
    MatchKey,
    Usage,
    Output,
    Upload,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiagnosticCode {
    PathNotFound,
    ReadFailed,
    InvalidJson,
    UnsupportedCompression,

    UnsupportedShape,
    MissingResourceList,
    NonObjectResource,
    AmbiguousContainer,

    MatchKeyNotFound,
    MatchKeyUndetected,
    UnhashableMatchKey,
    DuplicateMatchKey,
    UnkeyedLiveResources,
    UnkeyedDeclaredResources,

    InvalidFlags,
    InvalidFormat,

    SerializationFailed,
    OutputWriteFailed,

    InvalidEndpoint,
    BucketUnavailable,
    UploadFailed,
}

impl DiagnosticCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiagnosticCode::PathNotFound => "E001",
            DiagnosticCode::ReadFailed => "E002",
            DiagnosticCode::InvalidJson => "E003",
            DiagnosticCode::UnsupportedCompression => "E004",

            DiagnosticCode::UnsupportedShape => "E010",
            DiagnosticCode::MissingResourceList => "E011",
            DiagnosticCode::NonObjectResource => "E012",
            DiagnosticCode::AmbiguousContainer => "W013",

            DiagnosticCode::MatchKeyNotFound => "E020",
            DiagnosticCode::MatchKeyUndetected => "E021",
            DiagnosticCode::UnhashableMatchKey => "E022",
            DiagnosticCode::DuplicateMatchKey => "E023",
            DiagnosticCode::UnkeyedLiveResources => "W024",
            DiagnosticCode::UnkeyedDeclaredResources => "W025",

            DiagnosticCode::InvalidFlags => "E030",
            DiagnosticCode::InvalidFormat => "E031",

            DiagnosticCode::SerializationFailed => "E040",
            DiagnosticCode::OutputWriteFailed => "E041",

            DiagnosticCode::InvalidEndpoint => "E050",
            DiagnosticCode::BucketUnavailable => "E051",
            DiagnosticCode::UploadFailed => "E052",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            DiagnosticCode::PathNotFound => "Path not found",
            DiagnosticCode::ReadFailed => "Read failed",
            DiagnosticCode::InvalidJson => "Invalid JSON",
            DiagnosticCode::UnsupportedCompression => "Unsupported compression",

            DiagnosticCode::UnsupportedShape => "Unsupported JSON structure",
            DiagnosticCode::MissingResourceList => "Missing resource list",
            DiagnosticCode::NonObjectResource => "Resource is not an object",
            DiagnosticCode::AmbiguousContainer => "Ambiguous resource container",

            DiagnosticCode::MatchKeyNotFound => "Match key not found",
            DiagnosticCode::MatchKeyUndetected => "Match key not detected",
            DiagnosticCode::UnhashableMatchKey => "Unhashable match key value",
            DiagnosticCode::DuplicateMatchKey => "Duplicate match key value",
            DiagnosticCode::UnkeyedLiveResources => "Live resources without match key",
            DiagnosticCode::UnkeyedDeclaredResources => "Declared resources without match key",

            DiagnosticCode::InvalidFlags => "Invalid flags",
            DiagnosticCode::InvalidFormat => "Invalid output format",

            DiagnosticCode::SerializationFailed => "Serialization failed",
            DiagnosticCode::OutputWriteFailed => "Output write failed",

            DiagnosticCode::InvalidEndpoint => "Invalid endpoint",
            DiagnosticCode::BucketUnavailable => "Bucket unavailable",
            DiagnosticCode::UploadFailed => "Upload failed",
        }
    }

    pub fn category(&self) -> DiagnosticCategory {
        match self {
            DiagnosticCode::PathNotFound
            | DiagnosticCode::ReadFailed
            | DiagnosticCode::InvalidJson
            | DiagnosticCode::UnsupportedCompression => DiagnosticCategory::Load,

            DiagnosticCode::UnsupportedShape
            | DiagnosticCode::MissingResourceList
            | DiagnosticCode::NonObjectResource
            | DiagnosticCode::AmbiguousContainer => DiagnosticCategory::LoadShape,

            DiagnosticCode::MatchKeyNotFound
            | DiagnosticCode::MatchKeyUndetected
            | DiagnosticCode::UnhashableMatchKey
            | DiagnosticCode::DuplicateMatchKey
            | DiagnosticCode::UnkeyedLiveResources
            | DiagnosticCode::UnkeyedDeclaredResources => DiagnosticCategory::MatchKey,

            DiagnosticCode::InvalidFlags | DiagnosticCode::InvalidFormat => {
                DiagnosticCategory::Usage
            }

            DiagnosticCode::SerializationFailed | DiagnosticCode::OutputWriteFailed => {
                DiagnosticCategory::Output
            }

            DiagnosticCode::InvalidEndpoint
            | DiagnosticCode::BucketUnavailable
            | DiagnosticCode::UploadFailed => DiagnosticCategory::Upload,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub filename: Option<String>,
    pub line_number: Option<usize>,
    pub column: Option<usize>,
    pub level: DiagnosticLevel,
    pub code: DiagnosticCode,
    pub description: String,
    pub code_snippet: Option<String>,
    pub advice: Option<String>,
}

impl Diagnostic {
    pub fn new(level: DiagnosticLevel, code: DiagnosticCode, description: String) -> Self {
        Self {
            filename: None,
            line_number: None,
            column: None,
            level,
            code,
            description,
            code_snippet: None,
            advice: None,
        }
    }

    pub fn fatal(code: DiagnosticCode, description: String) -> Self {
        Self::new(DiagnosticLevel::Fatal, code, description)
    }

    pub fn warning(code: DiagnosticCode, description: String) -> Self {
        Self::new(DiagnosticLevel::Warning, code, description)
    }

    pub fn with_location(mut self, filename: String, line_number: usize) -> Self {
        self.filename = Some(filename);
        self.line_number = Some(line_number);
        self
    }

    pub fn with_column(mut self, column: usize) -> Self {
        self.column = Some(column);
        self
    }

    pub fn with_snippet(mut self, snippet: String) -> Self {
        self.code_snippet = Some(snippet);
        self
    }

    pub fn with_advice(mut self, advice: String) -> Self {
        self.advice = Some(advice);
        self
    }

    pub fn is_fatal(&self) -> bool {
        self.level == DiagnosticLevel::Fatal
    }

    pub fn category(&self) -> DiagnosticCategory {
        self.code.category()
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let (Some(filename), Some(line)) = (&self.filename, self.line_number) {
            if let Some(col) = self.column {
                write!(f, "{}:{}:{} - ", filename, line, col)?;
            } else {
                write!(f, "{}:{} - ", filename, line)?;
            }
        }

        writeln!(
            f,
            "{} {}: {}",
            self.level,
            self.code.as_str(),
            self.code.title()
        )?;
        writeln!(f)?;
        writeln!(f, "{}", self.description)?;

        if let Some(snippet) = &self.code_snippet {
            writeln!(f)?;
            writeln!(f, "{}", snippet)?;
        }

        if let Some(advice) = &self.advice {
            writeln!(f)?;
            writeln!(f, "{}", advice)?;
        }

        Ok(())
    }
}

impl std::error::Error for Diagnostic {}

#[derive(Debug, Default)]
pub struct DiagnosticCollector {
    diagnostics: Vec<Diagnostic>,
}

impl DiagnosticCollector {
    pub fn new() -> Self {
        Self {
            diagnostics: Vec::new(),
        }
    }

    pub fn add(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    pub fn has_fatal(&self) -> bool {
        self.diagnostics.iter().any(|d| d.is_fatal())
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_location_and_advice() {
        let diagnostic = Diagnostic::fatal(
            DiagnosticCode::InvalidJson,
            "I couldn't parse cloud.json as JSON: expected value".to_string(),
        )
        .with_location("cloud.json".to_string(), 3)
        .with_column(7)
        .with_advice("Make sure the file contains valid JSON.".to_string());

        let rendered = diagnostic.to_string();
        assert!(rendered.starts_with("cloud.json:3:7 - error E003: Invalid JSON\n"));
        assert!(rendered.contains("expected value"));
        assert!(rendered.ends_with("Make sure the file contains valid JSON.\n"));
    }

    #[test]
    fn test_codes_map_to_categories() {
        assert_eq!(
            DiagnosticCode::NonObjectResource.category(),
            DiagnosticCategory::LoadShape
        );
        assert_eq!(
            DiagnosticCode::DuplicateMatchKey.category(),
            DiagnosticCategory::MatchKey
        );
        assert_eq!(
            DiagnosticCode::UploadFailed.category(),
            DiagnosticCategory::Upload
        );
        assert_eq!(DiagnosticCode::PathNotFound.category(), DiagnosticCategory::Load);
    }

    #[test]
    fn test_warning_prefix() {
        assert_eq!(DiagnosticCode::AmbiguousContainer.as_str(), "W013");
        let warning = Diagnostic::warning(
            DiagnosticCode::AmbiguousContainer,
            "two containers".to_string(),
        );
        assert!(!warning.is_fatal());
        assert!(warning.to_string().starts_with("warning W013"));
    }

    #[test]
    fn test_collector_tracks_fatal() {
        let mut collector = DiagnosticCollector::new();
        collector.add(Diagnostic::warning(
            DiagnosticCode::UnkeyedLiveResources,
            "one live resource has no 'id'".to_string(),
        ));
        assert!(!collector.has_fatal());

        collector.add(Diagnostic::fatal(
            DiagnosticCode::MatchKeyUndetected,
            "no key".to_string(),
        ));
        assert!(collector.has_fatal());
        assert_eq!(collector.diagnostics().len(), 2);
    }
}
