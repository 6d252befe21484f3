//! In-process reference runner. Its output defines correctness for the
//! distributed path; it is not part of that path.

use anyhow::Result;
use tracing::info;

use crate::mr::app::{reduce_groups, MapReduceApp};
use crate::mr::io::Blobstore;
use crate::mr::shuffle::SEQUENTIAL_OUTPUT;

/// Map every input file, sort all pairs globally, run one reduce pass, and
/// write the result to `mr-out-sequential`.
pub fn run_sequential(
    app: &dyn MapReduceApp,
    files: &[String],
    store: &dyn Blobstore,
) -> Result<()> {
    let mut pairs = Vec::new();
    for fname in files {
        info!(%fname, "executing sequential map task");
        let content = store.read(fname)?;
        pairs.extend(app.map(fname, &content)?);
    }

    info!(output = SEQUENTIAL_OUTPUT, "executing sequential reduce task");
    let output = reduce_groups(app, pairs)?;
    store.write(SEQUENTIAL_OUTPUT, &output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mr::app::WordCount;
    use crate::mr::io::MemoryBlobstore;

    #[test]
    fn writes_sorted_global_counts() {
        let store = MemoryBlobstore::new();
        store.insert("in0", "bbb aaa");
        store.insert("in1", "aaa");

        let app = WordCount::new();
        run_sequential(&app, &["in0".into(), "in1".into()], &store).unwrap();

        assert_eq!(store.read(SEQUENTIAL_OUTPUT).unwrap(), "aaa 2\nbbb 1\n");
    }
}
