//! User-pluggable map/reduce programs and the glue that folds sorted pairs
//! through a reduce function.

use std::collections::BTreeSet;

use anyhow::Result;
use regex::Regex;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct KvPair {
    pub key: String,
    pub value: String,
}

impl KvPair {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// A MapReduce program. Both methods must be pure with respect to the
/// engine: results may depend only on the arguments, and a task that is run
/// twice must produce the same output. Emitted keys and values must not
/// contain spaces or newlines.
pub trait MapReduceApp: Send + Sync {
    fn map(&self, fname: &str, content: &str) -> Result<Vec<KvPair>>;
    fn reduce(&self, key: &str, values: Vec<String>) -> Result<String>;
}

/// Sort pairs by key, group consecutive equal keys, and fold each group
/// through the user reduce. Returns the output buffer, one line per distinct
/// key, sorted ascending by key. The sort is stable, so value order within a
/// key follows the caller's collection order.
pub fn reduce_groups(app: &dyn MapReduceApp, mut pairs: Vec<KvPair>) -> Result<String> {
    pairs.sort_by(|lhs, rhs| lhs.key.cmp(&rhs.key));

    let mut out = String::new();
    let mut i = 0;
    while i < pairs.len() {
        let mut j = i;
        while j < pairs.len() && pairs[j].key == pairs[i].key {
            j += 1;
        }
        let values = pairs[i..j].iter().map(|kv| kv.value.clone()).collect();
        let result = app.reduce(&pairs[i].key, values)?;
        out.push_str(&format!("{} {}\n", pairs[i].key, result));
        i = j;
    }
    Ok(out)
}

/// Counts occurrences of each lowercased alphabetic word.
#[derive(Debug)]
pub struct WordCount {
    word: Regex,
}

impl WordCount {
    pub fn new() -> Self {
        Self {
            word: Regex::new("[A-Za-z]+").expect("valid regex"),
        }
    }
}

impl Default for WordCount {
    fn default() -> Self {
        Self::new()
    }
}

impl MapReduceApp for WordCount {
    fn map(&self, _fname: &str, content: &str) -> Result<Vec<KvPair>> {
        Ok(self
            .word
            .find_iter(content)
            .map(|word| KvPair::new(word.as_str().to_ascii_lowercase(), "1"))
            .collect())
    }

    fn reduce(&self, _key: &str, values: Vec<String>) -> Result<String> {
        Ok(values.len().to_string())
    }
}

/// Maps each distinct lowercased word to the list of files containing it.
#[derive(Debug)]
pub struct Indexer {
    word: Regex,
}

impl Indexer {
    pub fn new() -> Self {
        Self {
            word: Regex::new("[A-Za-z]+").expect("valid regex"),
        }
    }
}

impl Default for Indexer {
    fn default() -> Self {
        Self::new()
    }
}

impl MapReduceApp for Indexer {
    fn map(&self, fname: &str, content: &str) -> Result<Vec<KvPair>> {
        // BTreeSet both dedups per file and keeps the emission order
        // deterministic, so intermediates are byte-identical across runs.
        let words: BTreeSet<String> = self
            .word
            .find_iter(content)
            .map(|word| word.as_str().to_ascii_lowercase())
            .collect();
        Ok(words
            .into_iter()
            .map(|word| KvPair::new(word, fname))
            .collect())
    }

    fn reduce(&self, _key: &str, mut values: Vec<String>) -> Result<String> {
        values.sort();
        Ok(format!("{} {}", values.len(), values.join(",")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn word_count_lowercases_and_splits_on_non_alpha() {
        let app = WordCount::new();
        let pairs = app.map("f", "Aaa, bbb-CCC aaa!").unwrap();
        let words: Vec<&str> = pairs.iter().map(|kv| kv.key.as_str()).collect();
        assert_eq!(words, ["aaa", "bbb", "ccc", "aaa"]);
        assert!(pairs.iter().all(|kv| kv.value == "1"));

        let count = app
            .reduce("aaa", vec!["1".into(), "1".into(), "1".into()])
            .unwrap();
        assert_eq!(count, "3");
    }

    #[test]
    fn indexer_emits_distinct_words_and_sorts_files() {
        let app = Indexer::new();
        let pairs = app.map("file1", "aaa bbb aaa").unwrap();
        assert_eq!(
            pairs,
            vec![KvPair::new("aaa", "file1"), KvPair::new("bbb", "file1")]
        );

        let line = app
            .reduce("aaa", vec!["file2".into(), "file0".into(), "file1".into()])
            .unwrap();
        assert_eq!(line, "3 file0,file1,file2");
    }

    #[test]
    fn reduce_groups_sorts_and_groups_by_key() {
        let app = WordCount::new();
        let pairs = vec![
            KvPair::new("bbb", "1"),
            KvPair::new("aaa", "1"),
            KvPair::new("bbb", "1"),
        ];
        let out = reduce_groups(&app, pairs).unwrap();
        assert_eq!(out, "aaa 1\nbbb 2\n");
    }

    #[test]
    fn reduce_groups_on_empty_input_is_empty() {
        let app = WordCount::new();
        assert_eq!(reduce_groups(&app, Vec::new()).unwrap(), "");
    }
}
