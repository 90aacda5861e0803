#![no_main]

use libfuzzer_sys::fuzz_target;
use resource_analyzer::{extract_resources, load_json_file};
use std::io::Write;
use tempfile::NamedTempFile;

fuzz_target!(|data: &[u8]| {
    if let Ok(mut temp_file) = NamedTempFile::new() {
        if temp_file.write_all(data).is_ok() {
            // Loading must fail with a diagnostic, never panic
            match load_json_file(temp_file.path()) {
                Ok(payload) => {
                    if let Ok(resources) = extract_resources(payload, "fuzz") {
                        let _ = resources.len();
                    }
                }
                Err(diagnostic) => {
                    assert!(!diagnostic.description.is_empty());
                }
            }
        }
    }
});
