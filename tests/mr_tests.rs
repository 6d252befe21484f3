mod common;

use std::sync::Arc;

use minimr::mr::app::{Indexer, WordCount};
use minimr::mr::coordinator::CoordinatorConfig;
use minimr::mr::runner::run_distributed;
use minimr::mr::sequential::run_sequential;
use minimr::mr::shuffle::intermediate_name;

use common::{compare_result, seeded_store, INPUTS};

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn word_count_matches_sequential_oracle() {
    let (store, files) = seeded_store();
    let n_reduce = 5;

    let app = Arc::new(WordCount::new());
    run_sequential(app.as_ref(), &files, store.as_ref()).unwrap();

    let config = CoordinatorConfig {
        port: 50061,
        n_reduce,
        task_wait_ms: 1000,
        ..Default::default()
    };
    run_distributed(app, files, 3, store.clone(), config)
        .await
        .unwrap();

    // Every intermediate partition exists, empty ones included.
    for map_id in 0..INPUTS.len() as u32 {
        for reduce_id in 0..n_reduce {
            assert!(
                store.exists(&intermediate_name(map_id, reduce_id)),
                "missing intermediate mr-{map_id}-{reduce_id}"
            );
        }
    }

    let lines = compare_result(&store, n_reduce);
    for expected in [
        "aaa 3", "aab 2", "aac 3", "abb 2", "abc 2", "aca 5", "acb 1", "bac 1", "bbb 6",
        "bbc 1", "bcc 10", "caa 2", "cba 2", "cca 1", "ccb 1", "ccc 6",
    ] {
        assert!(lines.contains(expected), "missing output line: {expected}");
    }
    assert_eq!(lines.len(), 16);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn indexer_matches_sequential_oracle() {
    let (store, files) = seeded_store();
    let n_reduce = 5;

    let app = Arc::new(Indexer::new());
    run_sequential(app.as_ref(), &files, store.as_ref()).unwrap();

    let config = CoordinatorConfig {
        port: 50062,
        n_reduce,
        task_wait_ms: 1000,
        ..Default::default()
    };
    run_distributed(app, files, 3, store.clone(), config)
        .await
        .unwrap();

    let lines = compare_result(&store, n_reduce);
    assert!(lines.contains("aaa 3 file0,file1,file6"));
    assert!(lines.contains("abc 2 file5,file6"));
    assert!(lines.contains("bcc 2 file3,file6"));
}
