#![no_main]

use arbitrary::{Arbitrary, Unstructured};
use libfuzzer_sys::fuzz_target;
use resource_analyzer::{diff, strictly_equal};
use serde_json::{json, Value};

#[derive(Arbitrary, Debug)]
struct FuzzPair {
    cloud: FuzzValue,
    iac: FuzzValue,
}

#[derive(Arbitrary, Debug)]
enum FuzzValue {
    Null,
    Bool(bool),
    Integer(i64),
    Unsigned(u64),
    Number(f64),
    String(String),
    Array(Vec<FuzzValue>),
    Object(Vec<(String, FuzzValue)>),
}

impl FuzzValue {
    fn to_json(&self) -> Value {
        match self {
            FuzzValue::Null => Value::Null,
            FuzzValue::Bool(b) => Value::Bool(*b),
            FuzzValue::Integer(n) => json!(n),
            FuzzValue::Unsigned(n) => json!(n),
            FuzzValue::Number(n) => json!(n),
            FuzzValue::String(s) => Value::String(s.clone()),
            FuzzValue::Array(arr) => Value::Array(arr.iter().map(|v| v.to_json()).collect()),
            FuzzValue::Object(obj) => {
                let map: serde_json::Map<String, Value> = obj
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect();
                Value::Object(map)
            }
        }
    }
}

fuzz_target!(|data: &[u8]| {
    let mut u = Unstructured::new(data);
    if let Ok(pair) = FuzzPair::arbitrary(&mut u) {
        let cloud = pair.cloud.to_json();
        let iac = pair.iac.to_json();

        // A value never differs from itself
        assert!(diff(&cloud, &cloud, "").is_empty());
        assert!(diff(&iac, &iac, "").is_empty());

        let forward = diff(&cloud, &iac, "");
        let backward = diff(&iac, &cloud, "");

        // Swapping sides swaps the reported values and nothing else
        assert_eq!(forward.len(), backward.len());
        for (f, b) in forward.iter().zip(backward.iter()) {
            assert_eq!(f.key_name, b.key_name);
            assert_eq!(f.cloud_value, b.iac_value);
            assert_eq!(f.iac_value, b.cloud_value);
            assert!(!strictly_equal(&f.cloud_value, &f.iac_value));
        }

        assert_eq!(forward.is_empty(), strictly_equal(&cloud, &iac));
    }
});
