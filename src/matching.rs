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

//! Pairing cloud resources with their IaC declarations.
//!
//! Two steps. First pick the field both datasets identify resources by
//! (`resolve_match_key`). Then index the IaC side by that field's value
//! (`LookupIndex::build`) so every cloud resource is paired with a single
//! hash lookup.
//!
//! Auto-detection only asks that a candidate field shows up in *some* record
//! on each side. Inventories mix resource types and not all of them carry
//! the same identifier. Records without the key simply never match and come
//! out as `Missing`, which is what a reader of the report wants to see.
//!
//! The index is strict about ambiguity. Two IaC resources with the same key
//! value is an error, never "first wins", because either choice would make
//! the report depend on file order.

use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use tracing::debug;

use crate::diagnostics::{Diagnostic, DiagnosticCode};
use crate::record::{JsonNumber, Record, ValueTypeExt};

/// Fields tried, in order, when no match key is requested.
pub const IDENTIFIER_PREFERENCE: [&str; 4] = ["id", "resourceId", "arn", "name"];

/// Pick the field used to pair cloud and IaC resources.
///
/// A requested key is accepted when at least one record on each side has
/// it. Without one, the first of [`IDENTIFIER_PREFERENCE`] that passes the
/// same test wins. An empty requested key counts as no request.
pub fn resolve_match_key(
    cloud_resources: &[Record],
    iac_resources: &[Record],
    requested_key: Option<&str>,
) -> Result<String, Diagnostic> {
    if let Some(requested) = requested_key.filter(|key| !key.is_empty()) {
        let in_cloud = key_exists_in_dataset(cloud_resources, requested);
        let in_iac = key_exists_in_dataset(iac_resources, requested);
        if in_cloud && in_iac {
            debug!(match_key = requested, "using requested match key");
            return Ok(requested.to_string());
        }

        let missing_from = match (in_cloud, in_iac) {
            (false, false) => "either dataset",
            (false, true) => "the cloud resources",
            _ => "the IaC resources",
        };
        return Err(Diagnostic::fatal(
            DiagnosticCode::MatchKeyNotFound,
            format!(
                "Match key '{}' was not found in both datasets (missing from {}).",
                requested, missing_from
            ),
        )
        .with_advice(
            "Provide a key that exists in both cloud and IaC resources.".to_string(),
        ));
    }

    for key in IDENTIFIER_PREFERENCE {
        if key_exists_in_dataset(cloud_resources, key) && key_exists_in_dataset(iac_resources, key)
        {
            debug!(match_key = key, "auto-detected match key");
            return Ok(key.to_string());
        }
    }

    Err(Diagnostic::fatal(
        DiagnosticCode::MatchKeyUndetected,
        format!(
            "Could not auto-detect a match key. Checked: {}.",
            IDENTIFIER_PREFERENCE.join(", ")
        ),
    )
    .with_advice("Please provide --match-key.".to_string()))
}

fn key_exists_in_dataset(resources: &[Record], key: &str) -> bool {
    resources.iter().any(|record| record.contains_key(key))
}

/// How many records have no value at all for `key`.
pub fn count_without_key(resources: &[Record], key: &str) -> usize {
    resources
        .iter()
        .filter(|record| !record.contains_key(key))
        .count()
}

/// How many records can never be paired on `key`: the field is absent, or
/// holds an object or array.
pub fn count_unmatchable(resources: &[Record], key: &str) -> usize {
    resources
        .iter()
        .filter(|record| KeyValue::of_record(record, key).is_none())
        .count()
}

/// A match key value that can be hashed.
///
/// Objects and arrays can't be keys. Numbers and booleans share one numeric
/// equality class: `true`, `1` and `1.0` are the same key, as are `0`, `-0`
/// and `-0.0`. Strings never equal numbers, so `"1"` is a different key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum KeyValue<'a> {
    Null,
    /// Canonical digits of an integer, an integral float or a boolean.
    Integer(String),
    Float(u64),
    String(&'a str),
}

impl<'a> KeyValue<'a> {
    /// `None` for objects and arrays.
    pub fn from_value(value: &'a Value) -> Option<Self> {
        match value {
            Value::Null => Some(KeyValue::Null),
            Value::Bool(b) => Some(KeyValue::Integer(if *b { "1" } else { "0" }.to_string())),
            Value::String(s) => Some(KeyValue::String(s)),
            Value::Number(n) => Some(match JsonNumber::of(n) {
                JsonNumber::Integer(digits) => KeyValue::Integer(digits),
                JsonNumber::Float(f) => match JsonNumber::Float(f).integral() {
                    Some(digits) => KeyValue::Integer(digits),
                    None => KeyValue::Float(f.to_bits()),
                },
            }),
            Value::Array(_) | Value::Object(_) => None,
        }
    }

    /// The key value of `record` under `match_key`, if it has a usable one.
    pub fn of_record(record: &'a Record, match_key: &str) -> Option<Self> {
        record.get(match_key).and_then(KeyValue::from_value)
    }
}

impl fmt::Display for KeyValue<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyValue::Null => write!(f, "null"),
            KeyValue::Integer(digits) => write!(f, "{}", digits),
            KeyValue::Float(bits) => write!(f, "{:?}", f64::from_bits(*bits)),
            KeyValue::String(s) => write!(f, "{:?}", s),
        }
    }
}

/// IaC resources keyed by their match key value.
#[derive(Debug)]
pub struct LookupIndex<'a> {
    match_key: String,
    entries: HashMap<KeyValue<'a>, (usize, &'a Record)>,
    unkeyed: usize,
}

impl<'a> LookupIndex<'a> {
    /// Index `iac_resources` by `match_key`.
    ///
    /// Records without the key are skipped. A key value that is an object or
    /// array, or a value shared by two records, is a fatal error.
    pub fn build(iac_resources: &'a [Record], match_key: &str) -> Result<Self, Diagnostic> {
        let mut entries = HashMap::with_capacity(iac_resources.len());
        let mut unkeyed = 0;

        for (index, record) in iac_resources.iter().enumerate() {
            let Some(raw) = record.get(match_key) else {
                unkeyed += 1;
                continue;
            };

            let Some(key_value) = KeyValue::from_value(raw) else {
                return Err(Diagnostic::fatal(
                    DiagnosticCode::UnhashableMatchKey,
                    format!(
                        "IaC resource at index {} has non-hashable match key value for '{}': {} ({}).",
                        index,
                        match_key,
                        raw,
                        raw.type_name()
                    ),
                )
                .with_advice(
                    "Match key values must be strings, numbers, booleans or null. \
                     Pick a different --match-key."
                        .to_string(),
                ));
            };

            if let Some((first_index, _)) = entries.get(&key_value) {
                return Err(Diagnostic::fatal(
                    DiagnosticCode::DuplicateMatchKey,
                    format!(
                        "Duplicate IaC match key value for '{}': {} (resources at index {} and {}). \
                         Matching must be unambiguous.",
                        match_key, raw, first_index, index
                    ),
                )
                .with_advice(
                    "Remove the duplicate declaration, or match on a field that is unique \
                     across IaC resources."
                        .to_string(),
                ));
            }

            entries.insert(key_value, (index, record));
        }

        debug!(
            match_key,
            indexed = entries.len(),
            skipped = unkeyed,
            "built IaC lookup index"
        );

        Ok(Self {
            match_key: match_key.to_string(),
            entries,
            unkeyed,
        })
    }

    pub fn get(&self, key: &KeyValue<'_>) -> Option<&'a Record> {
        self.entries.get(key).map(|(_, record)| *record)
    }

    /// The IaC resource paired with `record`, if any.
    pub fn find(&self, record: &Record) -> Option<&'a Record> {
        KeyValue::of_record(record, &self.match_key).and_then(|key| self.get(&key))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// IaC records skipped because they had no match key.
    pub fn unkeyed(&self) -> usize {
        self.unkeyed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::DiagnosticCategory;
    use serde_json::json;

    fn records(value: Value) -> Vec<Record> {
        match value {
            Value::Array(items) => items
                .into_iter()
                .map(|item| match item {
                    Value::Object(map) => map,
                    other => panic!("fixture element is not an object: {}", other),
                })
                .collect(),
            _ => panic!("fixture must be an array"),
        }
    }

    #[test]
    fn test_auto_detect_prefers_configured_order() {
        let cloud = records(json!([{"name": "a", "id": "1"}]));
        let iac = records(json!([{"name": "a", "id": "1"}]));
        assert_eq!(resolve_match_key(&cloud, &iac, None).unwrap(), "id");
    }

    #[test]
    fn test_auto_detect_needs_presence_on_both_sides() {
        let cloud = records(json!([{"id": "1", "arn": "arn:1"}]));
        let iac = records(json!([{"arn": "arn:1"}]));
        assert_eq!(resolve_match_key(&cloud, &iac, None).unwrap(), "arn");
    }

    #[test]
    fn test_auto_detect_accepts_partial_presence() {
        let cloud = records(json!([{"kind": "bucket"}, {"resourceId": "r-1"}]));
        let iac = records(json!([{"resourceId": "r-1"}, {"kind": "queue"}]));
        assert_eq!(resolve_match_key(&cloud, &iac, None).unwrap(), "resourceId");
    }

    #[test]
    fn test_auto_detect_exhausted() {
        let cloud = records(json!([{"uid": "1"}]));
        let iac = records(json!([{"uid": "1"}]));
        let err = resolve_match_key(&cloud, &iac, None).unwrap_err();
        assert_eq!(err.code, DiagnosticCode::MatchKeyUndetected);
        assert_eq!(err.category(), DiagnosticCategory::MatchKey);
        assert!(err.description.contains("id, resourceId, arn, name"));
    }

    #[test]
    fn test_requested_key_accepted() {
        let cloud = records(json!([{"uid": "1"}, {"other": true}]));
        let iac = records(json!([{"uid": "1"}]));
        assert_eq!(
            resolve_match_key(&cloud, &iac, Some("uid")).unwrap(),
            "uid"
        );
    }

    #[test]
    fn test_requested_key_is_a_presence_test() {
        let cloud = records(json!([{"uid": null}]));
        let iac = records(json!([{"uid": {"nested": 1}}]));
        assert_eq!(
            resolve_match_key(&cloud, &iac, Some("uid")).unwrap(),
            "uid"
        );
    }

    #[test]
    fn test_requested_key_missing_on_one_side() {
        let cloud = records(json!([{"uid": "1", "id": "1"}]));
        let iac = records(json!([{"id": "1"}]));
        let err = resolve_match_key(&cloud, &iac, Some("uid")).unwrap_err();
        assert_eq!(err.code, DiagnosticCode::MatchKeyNotFound);
        assert!(err.description.contains("'uid'"));
        assert!(err.description.contains("IaC"));
    }

    #[test]
    fn test_empty_requested_key_falls_back_to_detection() {
        let cloud = records(json!([{"name": "a"}]));
        let iac = records(json!([{"name": "a"}]));
        assert_eq!(resolve_match_key(&cloud, &iac, Some("")).unwrap(), "name");
    }

    #[test]
    fn test_index_skips_records_without_key() {
        let iac = records(json!([{"id": "r-1"}, {"name": "no-id"}, {"id": "r-2"}]));
        let index = LookupIndex::build(&iac, "id").unwrap();
        assert_eq!(index.len(), 2);
        assert_eq!(index.unkeyed(), 1);
        assert_eq!(
            index.get(&KeyValue::String("r-2")),
            Some(&iac[2])
        );
    }

    #[test]
    fn test_index_rejects_duplicates() {
        let iac = records(json!([{"id": "r-1", "v": 1}, {"id": "r-1", "v": 2}]));
        let err = LookupIndex::build(&iac, "id").unwrap_err();
        assert_eq!(err.code, DiagnosticCode::DuplicateMatchKey);
        assert_eq!(err.category(), DiagnosticCategory::MatchKey);
        assert!(err.description.contains("\"r-1\""));
        assert!(err.description.contains("index 0 and 1"));
    }

    #[test]
    fn test_index_rejects_unhashable_value() {
        let iac = records(json!([{"id": "ok"}, {"id": ["a", "b"]}]));
        let err = LookupIndex::build(&iac, "id").unwrap_err();
        assert_eq!(err.code, DiagnosticCode::UnhashableMatchKey);
        assert!(err.description.contains("index 1"));
        assert!(err.description.contains("'id'"));
    }

    #[test]
    fn test_numeric_keys_share_one_equality_class() {
        let iac = records(json!([{"id": 1}, {"id": 2.5}, {"id": "1"}, {"id": null}]));
        let index = LookupIndex::build(&iac, "id").unwrap();
        assert_eq!(index.len(), 4);

        let cloud = records(json!([{"id": 1.0}, {"id": true}, {"id": "1"}, {"id": 2.5}, {"id": false}]));
        assert_eq!(index.find(&cloud[0]), Some(&iac[0]));
        assert_eq!(index.find(&cloud[1]), Some(&iac[0]));
        assert_eq!(index.find(&cloud[2]), Some(&iac[2]));
        assert_eq!(index.find(&cloud[3]), Some(&iac[1]));
        assert_eq!(index.find(&cloud[4]), None);
    }

    #[test]
    fn test_bool_and_integer_collide() {
        let iac = records(json!([{"id": 1}, {"id": true}]));
        let err = LookupIndex::build(&iac, "id").unwrap_err();
        assert_eq!(err.code, DiagnosticCode::DuplicateMatchKey);
        assert!(err.description.contains("'id': true"));
        assert!(err.description.contains("index 0 and 1"));
    }

    #[test]
    fn test_signed_zero_is_one_key() {
        let iac = records(json!([{"id": 0.0}, {"id": -0.0}]));
        let err = LookupIndex::build(&iac, "id").unwrap_err();
        assert_eq!(err.code, DiagnosticCode::DuplicateMatchKey);

        let parsed: Value = serde_json::from_str(r#"[{"id": 0}, {"id": -0}]"#).unwrap();
        let iac = records(parsed);
        assert!(LookupIndex::build(&iac, "id").is_err());
    }

    #[test]
    fn test_large_integer_matches_equal_float() {
        let parsed: Value = serde_json::from_str(
            r#"[{"id": 18446744073709551616}, {"id": 18446744073709551617}]"#,
        )
        .unwrap();
        let iac = records(parsed);
        let index = LookupIndex::build(&iac, "id").unwrap();

        let parsed: Value = serde_json::from_str(r#"[{"id": 1.8446744073709552e19}]"#).unwrap();
        let cloud = records(parsed);
        assert_eq!(index.find(&cloud[0]), Some(&iac[0]));
    }

    #[test]
    fn test_key_value_classification() {
        assert_eq!(KeyValue::from_value(&json!(7)), Some(KeyValue::Integer("7".into())));
        assert_eq!(KeyValue::from_value(&json!(-7)), Some(KeyValue::Integer("-7".into())));
        assert_eq!(KeyValue::from_value(&json!(7.0)), Some(KeyValue::Integer("7".into())));
        assert_eq!(KeyValue::from_value(&json!(true)), Some(KeyValue::Integer("1".into())));
        assert_eq!(
            KeyValue::from_value(&json!(2.5)),
            Some(KeyValue::Float(2.5f64.to_bits()))
        );
        assert_eq!(KeyValue::from_value(&json!({})), None);
        assert_eq!(KeyValue::from_value(&json!([])), None);
        assert_eq!(KeyValue::String("r-1").to_string(), "\"r-1\"");
        assert_eq!(KeyValue::Float(2.5f64.to_bits()).to_string(), "2.5");
    }

    #[test]
    fn test_find_ignores_unhashable_lookup() {
        let iac = records(json!([{"id": "r-1"}]));
        let index = LookupIndex::build(&iac, "id").unwrap();
        let cloud = records(json!([{"id": {"nested": "r-1"}}, {"name": "x"}]));
        assert_eq!(index.find(&cloud[0]), None);
        assert_eq!(index.find(&cloud[1]), None);
    }

    #[test]
    fn test_count_without_key() {
        let cloud = records(json!([{"id": 1}, {"name": "x"}, {"id": null}]));
        assert_eq!(count_without_key(&cloud, "id"), 1);
    }

    #[test]
    fn test_count_unmatchable_includes_container_values() {
        let cloud = records(json!([
            {"id": 1},
            {"name": "x"},
            {"id": null},
            {"id": {"nested": 1}},
            {"id": [1]},
        ]));
        assert_eq!(count_unmatchable(&cloud, "id"), 3);
        assert_eq!(count_without_key(&cloud, "id"), 1);
    }
}
