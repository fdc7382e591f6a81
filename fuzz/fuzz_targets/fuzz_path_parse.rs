#![no_main]

use formwork_path::FieldPath;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|text: &str| {
    let path = FieldPath::parse(text);
    // Canonical form must parse back to the same path.
    let canonical = path.to_string();
    assert_eq!(FieldPath::parse(&canonical), path);
});
