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

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::diagnostics::{Diagnostic, DiagnosticCode};
use crate::diff::Difference;
use crate::record::Record;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResourceState {
    /// No IaC declaration pairs with this cloud resource.
    Missing,
    Match,
    Modified,
}

impl fmt::Display for ResourceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceState::Missing => write!(f, "Missing"),
            ResourceState::Match => write!(f, "Match"),
            ResourceState::Modified => write!(f, "Modified"),
        }
    }
}

/// The comparison outcome for one cloud resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportItem {
    #[serde(rename = "CloudResourceItem")]
    pub cloud_resource_item: Record,
    #[serde(rename = "IacResourceItem")]
    pub iac_resource_item: Option<Record>,
    #[serde(rename = "State")]
    pub state: ResourceState,
    #[serde(rename = "ChangeLog")]
    pub change_log: Vec<Difference>,
}

impl ReportItem {
    pub fn missing(cloud_resource_item: Record) -> Self {
        Self {
            cloud_resource_item,
            iac_resource_item: None,
            state: ResourceState::Missing,
            change_log: Vec::new(),
        }
    }

    pub fn compared(
        cloud_resource_item: Record,
        iac_resource_item: Record,
        change_log: Vec<Difference>,
    ) -> Self {
        let state = if change_log.is_empty() {
            ResourceState::Match
        } else {
            ResourceState::Modified
        };
        Self {
            cloud_resource_item,
            iac_resource_item: Some(iac_resource_item),
            state,
            change_log,
        }
    }
}

/// Everything one run produced. Serializes as the `wrapped` output shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceReport {
    #[serde(rename = "GeneratedAt")]
    pub generated_at: DateTime<Utc>,
    #[serde(rename = "MatchKeyUsed")]
    pub match_key_used: String,
    #[serde(rename = "TotalResources")]
    pub total_resources: usize,
    #[serde(rename = "Resources")]
    pub items: Vec<ReportItem>,
}

impl ResourceReport {
    pub fn new(match_key_used: String, items: Vec<ReportItem>) -> Self {
        Self::with_timestamp(Utc::now(), match_key_used, items)
    }

    pub fn with_timestamp(
        generated_at: DateTime<Utc>,
        match_key_used: String,
        items: Vec<ReportItem>,
    ) -> Self {
        Self {
            generated_at,
            match_key_used,
            total_resources: items.len(),
            items,
        }
    }

    pub fn summary(&self) -> Summary {
        let mut summary = Summary {
            total: self.items.len(),
            ..Summary::default()
        };
        for item in &self.items {
            match item.state {
                ResourceState::Missing => summary.missing += 1,
                ResourceState::Match => summary.matched += 1,
                ResourceState::Modified => summary.modified += 1,
            }
        }
        summary
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Summary {
    pub total: usize,
    pub matched: usize,
    pub modified: usize,
    pub missing: usize,
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} resources: {} match, {} modified, {} missing",
            self.total, self.matched, self.modified, self.missing
        )
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Metadata plus the resource list.
    #[default]
    Wrapped,
    /// Just the resource list.
    Array,
}

impl FromStr for OutputFormat {
    type Err = Diagnostic;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "wrapped" => Ok(OutputFormat::Wrapped),
            "array" => Ok(OutputFormat::Array),
            other => Err(Diagnostic::fatal(
                DiagnosticCode::InvalidFormat,
                format!("I don't know the output format '{}'.", other),
            )
            .with_advice("Use --format wrapped or --format array.".to_string())),
        }
    }
}

/// Render `report` as JSON text in the requested shape.
///
/// Compact output has no whitespace at all. Pretty output indents by two
/// spaces.
pub fn render_report(
    report: &ResourceReport,
    format: OutputFormat,
    pretty: bool,
) -> Result<String, Diagnostic> {
    let rendered = match (format, pretty) {
        (OutputFormat::Wrapped, false) => serde_json::to_string(report),
        (OutputFormat::Wrapped, true) => serde_json::to_string_pretty(report),
        (OutputFormat::Array, false) => serde_json::to_string(&report.items),
        (OutputFormat::Array, true) => serde_json::to_string_pretty(&report.items),
    };

    rendered.map_err(|e| {
        Diagnostic::fatal(
            DiagnosticCode::SerializationFailed,
            format!("I couldn't serialize the report to JSON: {}", e),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::{json, Value};

    fn record(value: Value) -> Record {
        match value {
            Value::Object(map) => map,
            _ => panic!("fixture must be an object"),
        }
    }

    fn sample_report() -> ResourceReport {
        let generated_at = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();
        ResourceReport::with_timestamp(
            generated_at,
            "name".to_string(),
            vec![
                ReportItem::compared(
                    record(json!({"name": "svc", "spec": {"replicas": 3}})),
                    record(json!({"name": "svc", "spec": {"replicas": 1}})),
                    vec![Difference {
                        key_name: "spec.replicas".to_string(),
                        cloud_value: json!(3),
                        iac_value: json!(1),
                    }],
                ),
                ReportItem::missing(record(json!({"name": "orphan"}))),
            ],
        )
    }

    #[test]
    fn test_wrapped_shape() {
        let rendered = render_report(&sample_report(), OutputFormat::Wrapped, false).unwrap();
        let value: Value = serde_json::from_str(&rendered).unwrap();

        let mut keys: Vec<&str> = value
            .as_object()
            .unwrap()
            .keys()
            .map(String::as_str)
            .collect();
        keys.sort();
        assert_eq!(
            keys,
            vec!["GeneratedAt", "MatchKeyUsed", "Resources", "TotalResources"]
        );
        let generated_at = value["GeneratedAt"].as_str().unwrap();
        assert!(generated_at.starts_with("2025-03-01T12:00:00"));
        assert_eq!(
            generated_at.parse::<DateTime<Utc>>().unwrap(),
            sample_report().generated_at
        );
        assert_eq!(value["MatchKeyUsed"], json!("name"));
        assert_eq!(value["TotalResources"], json!(2));
        assert_eq!(
            value["Resources"][0],
            json!({
                "CloudResourceItem": {"name": "svc", "spec": {"replicas": 3}},
                "IacResourceItem": {"name": "svc", "spec": {"replicas": 1}},
                "State": "Modified",
                "ChangeLog": [{"KeyName": "spec.replicas", "CloudValue": 3, "IacValue": 1}],
            })
        );
        assert_eq!(value["Resources"][1]["IacResourceItem"], Value::Null);
        assert_eq!(value["Resources"][1]["State"], json!("Missing"));
        assert_eq!(value["Resources"][1]["ChangeLog"], json!([]));
    }

    #[test]
    fn test_array_shape() {
        let rendered = render_report(&sample_report(), OutputFormat::Array, false).unwrap();
        let value: Value = serde_json::from_str(&rendered).unwrap();
        let items = value.as_array().unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0]["State"], json!("Modified"));
    }

    #[test]
    fn test_compact_versus_pretty() {
        let report = sample_report();
        let compact = render_report(&report, OutputFormat::Wrapped, false).unwrap();
        let pretty = render_report(&report, OutputFormat::Wrapped, true).unwrap();

        assert!(!compact.contains('\n'));
        assert!(!compact.contains(": "));
        assert!(pretty.contains("\n  \"GeneratedAt\": "));
        assert_eq!(
            serde_json::from_str::<Value>(&compact).unwrap(),
            serde_json::from_str::<Value>(&pretty).unwrap()
        );
    }

    #[test]
    fn test_state_follows_change_log() {
        let item = ReportItem::compared(record(json!({"id": 1})), record(json!({"id": 1})), vec![]);
        assert_eq!(item.state, ResourceState::Match);
    }

    #[test]
    fn test_summary() {
        let summary = sample_report().summary();
        assert_eq!(
            summary,
            Summary {
                total: 2,
                matched: 0,
                modified: 1,
                missing: 1
            }
        );
        assert_eq!(
            summary.to_string(),
            "2 resources: 0 match, 1 modified, 1 missing"
        );
    }

    #[test]
    fn test_output_format_parsing() {
        assert_eq!("wrapped".parse::<OutputFormat>().unwrap(), OutputFormat::Wrapped);
        assert_eq!("array".parse::<OutputFormat>().unwrap(), OutputFormat::Array);
        let err = "yaml".parse::<OutputFormat>().unwrap_err();
        assert_eq!(err.code, DiagnosticCode::InvalidFormat);
    }
}
