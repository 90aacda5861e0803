#![no_main]

use libfuzzer_sys::fuzz_target;
use resource_analyzer::{analyze_resources, extract_resources, ResourceState};
use serde_json::Value;

const BASE_CLOUD: &str = r#"{"resources":[
{"id":"a","spec":{"replicas":3,"tags":["x","y"]}},
{"id":"b","size":1},
{"id":"c"}
]}"#;

const BASE_IAC: &str = r#"[
{"id":"a","spec":{"replicas":2,"tags":["x"]}},
{"id":"b","size":1.0}
]"#;

fn mutate(base: &str, data: &[u8]) -> Vec<u8> {
    let mut result = base.as_bytes().to_vec();
    let max_size = 4096;

    for (i, &byte) in data.iter().take(16).enumerate() {
        if result.len() > max_size {
            break;
        }

        match byte % 6 {
            0 => {
                // Truncate at random position
                let pos = (byte as usize) % result.len().max(1);
                result.truncate(pos);
            }
            1 => {
                // Swap an identifier so a match turns into a miss
                if let Some(pos) = result.iter().position(|&b| b == b'a') {
                    result[pos] = b'z';
                }
            }
            2 => {
                // Corrupt JSON bracket
                if let Some(pos) = result.iter().position(|&b| b == b'[' || b == b'{') {
                    result[pos] = b'?';
                }
            }
            3 => {
                // Insert random byte
                let pos = (byte as usize) % (result.len() + 1);
                result.insert(pos, byte);
            }
            4 => {
                // Remove a character
                if !result.is_empty() {
                    let pos = (byte as usize) % result.len();
                    result.remove(pos);
                }
            }
            _ => {
                // Turn an integer into a float
                let insertion = format!(".{}", i);
                if let Some(pos) = result.iter().position(|b| b.is_ascii_digit()) {
                    result.splice(pos + 1..pos + 1, insertion.bytes());
                }
            }
        }
    }

    result
}

fn parse(bytes: &[u8], name: &str) -> Option<Vec<serde_json::Map<String, Value>>> {
    let payload: Value = serde_json::from_slice(bytes).ok()?;
    extract_resources(payload, name).ok()
}

fuzz_target!(|data: &[u8]| {
    let (left, right) = data.split_at(data.len() / 2);
    let Some(cloud) = parse(&mutate(BASE_CLOUD, left), "cloud") else {
        return;
    };
    let Some(iac) = parse(&mutate(BASE_IAC, right), "iac") else {
        return;
    };

    // Duplicate or unhashable keys are allowed to fail, nothing else is
    if let Ok(items) = analyze_resources(&cloud, &iac, "id") {
        assert_eq!(items.len(), cloud.len());
        for (item, original) in items.iter().zip(cloud.iter()) {
            assert_eq!(&item.cloud_resource_item, original);
            match item.state {
                ResourceState::Missing => {
                    assert!(item.iac_resource_item.is_none());
                    assert!(item.change_log.is_empty());
                }
                ResourceState::Match => assert!(item.change_log.is_empty()),
                ResourceState::Modified => assert!(!item.change_log.is_empty()),
            }
        }
    }
});
