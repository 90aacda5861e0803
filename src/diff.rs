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

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeSet;

use crate::record::JsonNumber;

/// One field-level divergence between a cloud resource and its declaration.
///
/// A side that doesn't have the field at all is `null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Difference {
    #[serde(rename = "KeyName")]
    pub key_name: String,
    #[serde(rename = "CloudValue")]
    pub cloud_value: Value,
    #[serde(rename = "IacValue")]
    pub iac_value: Value,
}

impl Difference {
    fn new(key_name: String, cloud_value: Value, iac_value: Value) -> Self {
        Self {
            key_name,
            cloud_value,
            iac_value,
        }
    }
}

/// Every difference between `cloud` and `iac`, depth first.
///
/// Object keys are visited in ascending order regardless of input order.
/// Arrays are compared index by index, never by content. Anything else is
/// compared with [`strictly_equal`], and a mismatch there is reported as a
/// single entry even when one side is a container.
pub fn diff(cloud: &Value, iac: &Value, base_path: &str) -> Vec<Difference> {
    let mut result = Vec::<Difference>::new();
    diff_recursive(cloud, iac, base_path, &mut result);
    result
}

/// [`diff`] for two records, without wrapping them in a `Value` first.
pub fn diff_records(cloud: &Map<String, Value>, iac: &Map<String, Value>) -> Vec<Difference> {
    let mut result = Vec::<Difference>::new();
    diff_objects(cloud, iac, "", &mut result);
    result
}

fn diff_recursive(cloud: &Value, iac: &Value, path: &str, result: &mut Vec<Difference>) {
    match (cloud, iac) {
        (Value::Object(cloud_obj), Value::Object(iac_obj)) => {
            diff_objects(cloud_obj, iac_obj, path, result);
        }
        (Value::Array(cloud_arr), Value::Array(iac_arr)) => {
            diff_arrays(cloud_arr, iac_arr, path, result);
        }
        _ => {
            if !strictly_equal(cloud, iac) {
                let key_name = if path.is_empty() { "$" } else { path };
                result.push(Difference::new(
                    key_name.to_string(),
                    cloud.clone(),
                    iac.clone(),
                ));
            }
        }
    }
}

fn diff_objects(
    cloud: &Map<String, Value>,
    iac: &Map<String, Value>,
    base_path: &str,
    result: &mut Vec<Difference>,
) {
    let all_keys: BTreeSet<&String> = cloud.keys().chain(iac.keys()).collect();

    for key in all_keys {
        let path = format_path(base_path, key);
        match (cloud.get(key), iac.get(key)) {
            (Some(cloud_value), Some(iac_value)) => {
                diff_recursive(cloud_value, iac_value, &path, result);
            }
            (cloud_value, iac_value) => {
                result.push(Difference::new(
                    path,
                    cloud_value.cloned().unwrap_or(Value::Null),
                    iac_value.cloned().unwrap_or(Value::Null),
                ));
            }
        }
    }
}

fn diff_arrays(cloud: &[Value], iac: &[Value], base_path: &str, result: &mut Vec<Difference>) {
    for index in 0..cloud.len().max(iac.len()) {
        let path = format_index(base_path, index);
        match (cloud.get(index), iac.get(index)) {
            (Some(cloud_value), Some(iac_value)) => {
                diff_recursive(cloud_value, iac_value, &path, result);
            }
            (cloud_value, iac_value) => {
                result.push(Difference::new(
                    path,
                    cloud_value.cloned().unwrap_or(Value::Null),
                    iac_value.cloned().unwrap_or(Value::Null),
                ));
            }
        }
    }
}

/// Equal only when the JSON types match and the values match.
///
/// Numbers also have to agree on integer versus float as written in the
/// input, so `1` and `1.0` are different values here even though they print
/// the same in many tools. `-0` is the integer zero.
pub fn strictly_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::String(x), Value::String(y)) => x == y,
        (Value::Number(x), Value::Number(y)) => {
            match (JsonNumber::of(x), JsonNumber::of(y)) {
                (JsonNumber::Integer(x), JsonNumber::Integer(y)) => x == y,
                (JsonNumber::Float(x), JsonNumber::Float(y)) => x == y,
                _ => false,
            }
        }
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(a, b)| strictly_equal(a, b))
        }
        (Value::Object(x), Value::Object(y)) => {
            x.len() == y.len()
                && x
                    .iter()
                    .all(|(key, a)| y.get(key).map(|b| strictly_equal(a, b)).unwrap_or(false))
        }
        _ => false,
    }
}

fn format_path(base: &str, segment: &str) -> String {
    if base.is_empty() {
        segment.to_string()
    } else {
        format!("{}.{}", base, segment)
    }
}

fn format_index(base: &str, index: usize) -> String {
    format!("{}[{}]", base, index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use arbitrary::{Arbitrary, Unstructured};
    use serde_json::json;

    fn entry(key_name: &str, cloud_value: Value, iac_value: Value) -> Difference {
        Difference::new(key_name.to_string(), cloud_value, iac_value)
    }

    #[test]
    fn test_nested_object_change() {
        let cloud = json!({"name": "svc", "spec": {"replicas": 3}});
        let iac = json!({"name": "svc", "spec": {"replicas": 1}});
        assert_eq!(
            diff(&cloud, &iac, ""),
            vec![entry("spec.replicas", json!(3), json!(1))]
        );
    }

    #[test]
    fn test_key_missing_in_cloud() {
        let cloud = json!({"name": "bucket-a", "tags": {}});
        let iac = json!({"name": "bucket-a", "tags": {"owner": "platform"}});
        assert_eq!(
            diff(&cloud, &iac, ""),
            vec![entry("tags.owner", Value::Null, json!("platform"))]
        );
    }

    #[test]
    fn test_key_missing_in_iac_keeps_whole_subtree() {
        let cloud = json!({"a": {"b": [1, 2]}});
        let iac = json!({});
        assert_eq!(
            diff(&cloud, &iac, ""),
            vec![entry("a", json!({"b": [1, 2]}), Value::Null)]
        );
    }

    #[test]
    fn test_explicit_null_versus_absent_is_a_difference() {
        let cloud = json!({"deletedAt": null});
        let iac = json!({});
        assert_eq!(
            diff(&cloud, &iac, ""),
            vec![entry("deletedAt", Value::Null, Value::Null)]
        );
    }

    #[test]
    fn test_list_item_path() {
        let cloud = json!({"spec": {"containers": [{"name": "api", "image": "api:2.0"}]}});
        let iac = json!({"spec": {"containers": [{"name": "api", "image": "api:1.0"}]}});
        assert_eq!(
            diff(&cloud, &iac, ""),
            vec![entry(
                "spec.containers[0].image",
                json!("api:2.0"),
                json!("api:1.0")
            )]
        );
    }

    #[test]
    fn test_array_length_mismatch() {
        let cloud = json!({"ports": [80]});
        let iac = json!({"ports": [80, 443, 8080]});
        assert_eq!(
            diff(&cloud, &iac, ""),
            vec![
                entry("ports[1]", Value::Null, json!(443)),
                entry("ports[2]", Value::Null, json!(8080)),
            ]
        );
    }

    #[test]
    fn test_arrays_are_positional() {
        let cloud = json!(["a", "b"]);
        let iac = json!(["b", "a"]);
        assert_eq!(
            diff(&cloud, &iac, ""),
            vec![
                entry("[0]", json!("a"), json!("b")),
                entry("[1]", json!("b"), json!("a")),
            ]
        );
    }

    #[test]
    fn test_keys_sorted_regardless_of_input_order() {
        let cloud: Value = serde_json::from_str(r#"{"zeta": 1, "alpha": 1, "mid": 1}"#).unwrap();
        let iac: Value = serde_json::from_str(r#"{"mid": 2, "zeta": 2, "alpha": 2}"#).unwrap();
        let paths: Vec<String> = diff(&cloud, &iac, "")
            .into_iter()
            .map(|d| d.key_name)
            .collect();
        assert_eq!(paths, vec!["alpha", "mid", "zeta"]);
    }

    #[test]
    fn test_type_mismatch_is_one_leaf() {
        let cloud = json!({"subnets": ["a", "b"]});
        let iac = json!({"subnets": "a,b"});
        assert_eq!(
            diff(&cloud, &iac, ""),
            vec![entry("subnets", json!(["a", "b"]), json!("a,b"))]
        );
    }

    #[test]
    fn test_strict_number_and_bool_comparison() {
        let cloud = json!({"count": 1, "enabled": true, "ratio": 0.5});
        let iac = json!({"count": 1.0, "enabled": 1, "ratio": 0.5});
        assert_eq!(
            diff(&cloud, &iac, ""),
            vec![
                entry("count", json!(1), json!(1.0)),
                entry("enabled", json!(true), json!(1)),
            ]
        );
    }

    #[test]
    fn test_scalar_root_uses_dollar_path() {
        assert_eq!(
            diff(&json!("a"), &json!("b"), ""),
            vec![entry("$", json!("a"), json!("b"))]
        );
    }

    #[test]
    fn test_base_path_prefixes_entries() {
        let result = diff(&json!({"x": 1}), &json!({"x": 2}), "root");
        assert_eq!(result, vec![entry("root.x", json!(1), json!(2))]);
    }

    #[test]
    fn test_difference_serializes_with_contract_names() {
        let serialized = serde_json::to_value(entry("a.b", json!(1), Value::Null)).unwrap();
        assert_eq!(
            serialized,
            json!({"KeyName": "a.b", "CloudValue": 1, "IacValue": null})
        );
    }

    fn parse(text: &str) -> Value {
        serde_json::from_str(text).unwrap()
    }

    #[test]
    fn test_negative_zero_integer_equals_zero() {
        let cloud = parse(r#"{"n": 0}"#);
        let iac = parse(r#"{"n": -0}"#);
        assert!(diff(&cloud, &iac, "").is_empty());
    }

    #[test]
    fn test_float_zeros_are_equal() {
        assert!(diff(&parse("0.0"), &parse("-0.0"), "").is_empty());
        assert_eq!(diff(&parse("0"), &parse("0.0"), "").len(), 1);
    }

    #[test]
    fn test_integer_beyond_u64_is_not_a_float() {
        let cloud = parse(r#"{"n": 18446744073709551616}"#);
        let iac = parse(r#"{"n": 1.8446744073709552e19}"#);
        let result = diff(&cloud, &iac, "");
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].key_name, "n");
        assert_eq!(result[0].cloud_value.to_string(), "18446744073709551616");

        let same = parse("123456789012345678901234567890");
        assert!(diff(&same, &parse("123456789012345678901234567890"), "").is_empty());
        assert_eq!(diff(&same, &parse("123456789012345678901234567891"), "").len(), 1);
    }

    #[test]
    fn test_strictly_equal() {
        assert!(strictly_equal(&json!(5), &json!(5)));
        assert!(strictly_equal(&json!(-5), &json!(-5)));
        assert!(!strictly_equal(&json!(5), &json!(5.0)));
        assert!(!strictly_equal(&json!(0), &json!(false)));
        assert!(!strictly_equal(&json!(null), &json!(false)));
        assert!(strictly_equal(&json!({"a": [1, {"b": 2.5}]}), &json!({"a": [1, {"b": 2.5}]})));
        assert!(!strictly_equal(&json!({"a": [1]}), &json!({"a": [1.0]})));
        assert!(!strictly_equal(&json!({"a": 1}), &json!({"b": 1})));
    }

    #[derive(Arbitrary, Debug)]
    enum ArbValue {
        Null,
        Bool(bool),
        Int(i64),
        Float(f64),
        String(String),
        Array(Vec<ArbValue>),
        Object(Vec<(String, ArbValue)>),
    }

    impl ArbValue {
        fn to_json(&self, depth: usize) -> Value {
            match self {
                ArbValue::Null => Value::Null,
                ArbValue::Bool(b) => Value::Bool(*b),
                ArbValue::Int(i) => json!(i),
                ArbValue::Float(f) => serde_json::Number::from_f64(*f)
                    .map(Value::Number)
                    .unwrap_or(Value::Null),
                ArbValue::String(s) => Value::String(s.clone()),
                ArbValue::Array(_) | ArbValue::Object(_) if depth > 4 => Value::Null,
                ArbValue::Array(items) => {
                    Value::Array(items.iter().map(|v| v.to_json(depth + 1)).collect())
                }
                ArbValue::Object(fields) => Value::Object(
                    fields
                        .iter()
                        .map(|(k, v)| (k.clone(), v.to_json(depth + 1)))
                        .collect(),
                ),
            }
        }
    }

    fn generated_values() -> Vec<Value> {
        (0u8..48)
            .filter_map(|seed| {
                let bytes: Vec<u8> = (0..512u32)
                    .map(|i| (i.wrapping_mul(31) as u8).wrapping_add(seed.wrapping_mul(17)) ^ seed)
                    .collect();
                let mut u = Unstructured::new(&bytes);
                ArbValue::arbitrary(&mut u).ok().map(|v| v.to_json(0))
            })
            .collect()
    }

    #[test]
    fn test_diff_with_self_is_empty() {
        let fixed = json!({
            "id": "r-1",
            "spec": {"replicas": 2, "containers": [{"name": "api", "image": "api:1.0"}]},
            "tags": {},
            "ratio": 0.25,
            "flags": [true, null, -3],
        });
        assert!(diff(&fixed, &fixed, "").is_empty());

        for value in generated_values() {
            assert!(diff(&value, &value, "").is_empty(), "self diff of {}", value);
        }
    }

    #[test]
    fn test_diff_is_symmetric_in_content() {
        let values = generated_values();
        let mut pairs: Vec<(Value, Value)> = values
            .iter()
            .zip(values.iter().skip(1))
            .map(|(a, b)| (a.clone(), b.clone()))
            .collect();
        pairs.push((
            json!({"a": [1, 2, {"b": "x"}], "c": true}),
            json!({"a": [1, {"b": "y"}], "d": null}),
        ));

        for (a, b) in pairs {
            let forward = diff(&a, &b, "");
            let backward = diff(&b, &a, "");
            let swapped: Vec<Difference> = backward
                .into_iter()
                .map(|d| Difference::new(d.key_name, d.iac_value, d.cloud_value))
                .collect();
            assert_eq!(forward, swapped);
        }
    }
}
