//! The shuffle contract: stable key partitioning, intermediate blob naming,
//! and the one-pair-per-line text format. These rules are what let any
//! reduce worker locate and parse its inputs without talking to anyone.

use anyhow::{bail, Result};

use crate::mr::app::KvPair;

/// Output blob written by the sequential reference runner.
pub const SEQUENTIAL_OUTPUT: &str = "mr-out-sequential";

/// 64-bit FNV-1a. The partitioner needs a hash that is identical across
/// worker processes and runs, which rules out the std `RandomState` hasher
/// and its per-process seeding.
fn fnv1a(key: &str) -> u64 {
    const OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;

    let mut hash = OFFSET_BASIS;
    for byte in key.bytes() {
        hash ^= u64::from(byte);
        hash = hash.wrapping_mul(PRIME);
    }
    hash
}

/// Reduce bucket for a key. Every worker and the sequential runner agree on
/// this assignment.
pub fn partition_for_key(key: &str, n_reduce: u32) -> u32 {
    (fnv1a(key) % u64::from(n_reduce)) as u32
}

/// Intermediate blob written by map task `map_id` for bucket `reduce_id`.
pub fn intermediate_name(map_id: u32, reduce_id: u32) -> String {
    format!("mr-{map_id}-{reduce_id}")
}

/// Final output blob of reduce task `reduce_id`.
pub fn output_name(reduce_id: u32) -> String {
    format!("mr-out-{reduce_id}")
}

/// Parse `"<key> <value>"` lines back into pairs. Keys and values contain
/// neither spaces nor newlines, a contract imposed on user map output.
pub fn parse_pairs(content: &str) -> Result<Vec<KvPair>> {
    let mut pairs = Vec::new();
    for line in content.lines() {
        if line.is_empty() {
            continue;
        }
        let mut fields = line.split_ascii_whitespace();
        match (fields.next(), fields.next(), fields.next()) {
            (Some(key), Some(value), None) => pairs.push(KvPair::new(key, value)),
            _ => bail!("malformed intermediate line: {line:?}"),
        }
    }
    Ok(pairs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partition_is_pinned() {
        // Known FNV-1a assignments; a change here breaks the shuffle contract
        // between mixed-version workers.
        assert_eq!(fnv1a("abc"), 16654208175385433931);
        assert_eq!(partition_for_key("abc", 5), 1);
        assert_eq!(partition_for_key("aaa", 5), 4);
        assert_eq!(partition_for_key("xyz", 5), 2);
    }

    #[test]
    fn partition_is_in_range() {
        for key in ["", "a", "some longer key", "bcc"] {
            assert!(partition_for_key(key, 7) < 7);
        }
    }

    #[test]
    fn blob_names() {
        assert_eq!(intermediate_name(3, 4), "mr-3-4");
        assert_eq!(output_name(0), "mr-out-0");
    }

    #[test]
    fn parse_round_trip_and_errors() {
        let pairs = parse_pairs("aaa 1\nbbb 2\n\n").unwrap();
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[0], KvPair::new("aaa", "1"));
        assert_eq!(pairs[1], KvPair::new("bbb", "2"));

        assert!(parse_pairs("only-key\n").is_err());
        assert!(parse_pairs("too many fields\n").is_err());
        assert!(parse_pairs("").unwrap().is_empty());
    }
}
