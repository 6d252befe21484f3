use std::collections::HashSet;
use std::sync::Arc;

use minimr::mr::io::{Blobstore, MemoryBlobstore};
use minimr::mr::shuffle::{output_name, SEQUENTIAL_OUTPUT};

/// The eight fixed input files every end-to-end test runs over.
pub const INPUTS: &[(&str, &str)] = &[
    ("file0", "aaa bbb bbb ccc ccc ccc"),
    ("file1", "aaa aab abb bbb"),
    ("file2", "aac aca caa aac aca caa"),
    ("file3", "bcc bcc bcc bcc bcc bcc bcc bcc bcc"),
    ("file4", "bbb ccc bbb ccc aca aac"),
    ("file5", "abc"),
    ("file6", "aaa ccc bbb cca abc aca acb cba ccb bac bcc"),
    ("file7", "bbc aab abb cba aca"),
];

pub fn seeded_store() -> (Arc<MemoryBlobstore>, Vec<String>) {
    let store = Arc::new(MemoryBlobstore::new());
    for (name, content) in INPUTS {
        store.insert(*name, *content);
    }
    let files = INPUTS.iter().map(|(name, _)| name.to_string()).collect();
    (store, files)
}

/// Assert the distributed outputs form a duplicate-free union equal to the
/// sequential oracle's lines. Returns the union for further assertions.
pub fn compare_result(store: &MemoryBlobstore, n_reduce: u32) -> HashSet<String> {
    let oracle = store
        .read(SEQUENTIAL_OUTPUT)
        .expect("sequential oracle output missing");
    let mut sequential = HashSet::new();
    for line in oracle.lines() {
        assert!(
            sequential.insert(line.to_owned()),
            "duplicate line in oracle output: {line}"
        );
    }

    let mut distributed = HashSet::new();
    for reduce_id in 0..n_reduce {
        let name = output_name(reduce_id);
        let output = store
            .read(&name)
            .unwrap_or_else(|_| panic!("reduce output {name} missing"));
        for line in output.lines() {
            assert!(
                distributed.insert(line.to_owned()),
                "line appears in more than one reduce output: {line}"
            );
        }
    }

    assert_eq!(distributed, sequential);
    distributed
}
