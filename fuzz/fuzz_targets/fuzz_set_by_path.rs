#![no_main]

use arbitrary::Arbitrary;
use formwork_path::{FieldPath, Segment, Value, get_by_path, set_by_path};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
enum Step {
    Key(u8),
    RawKey(String),
    Index(u16),
    FarIndex(usize),
}

#[derive(Debug, Arbitrary)]
struct Write {
    path: Vec<Step>,
    value: i32,
}

fn to_path(steps: &[Step]) -> FieldPath {
    steps
        .iter()
        .map(|step| match step {
            Step::Key(k) => Segment::key(format!("k{}", k % 8)),
            Step::RawKey(k) => Segment::key(k.as_str()),
            Step::Index(i) => Segment::index(usize::from(*i)),
            Step::FarIndex(i) => Segment::index(*i),
        })
        .collect()
}

fuzz_target!(|writes: Vec<Write>| {
    let mut root = Value::Null;
    for write in writes.iter().take(32) {
        let path = to_path(&write.path[..write.path.len().min(8)]);
        let before = root.to_json();
        let next = set_by_path(&root, &path, |_| Value::from(write.value));

        assert_eq!(root.to_json(), before, "input must not change");
        assert_eq!(get_by_path(&next, &path), Some(&Value::from(write.value)));
        root = next;
    }
});
