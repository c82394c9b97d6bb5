// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::aof::AofError;
use tempfile::TempDir;
use yare::parameterized;

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Store journaling into a temp directory
fn journaled_store(threshold: usize) -> (TempDir, std::path::PathBuf, Store, Arc<Aof>) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("test.aof");
    let aof = Arc::new(Aof::open_with_threshold(&path, threshold).unwrap());
    let mut store = Store::new();
    store.enable_aof(Arc::clone(&aof));
    (dir, path, store, aof)
}

// === String operations ===

#[test]
fn set_then_get() {
    let store = Store::new();
    store.set("k", "v").unwrap();
    assert_eq!(store.get("k"), Some("v".to_string()));
}

#[test]
fn get_absent_key() {
    let store = Store::new();
    assert_eq!(store.get("missing"), None);
}

#[test]
fn set_overwrites() {
    let store = Store::new();
    store.set("k", "old").unwrap();
    store.set("k", "new").unwrap();
    assert_eq!(store.get("k"), Some("new".to_string()));
}

#[test]
fn get_on_wrong_type_reads_as_absent() {
    let store = Store::new();
    store.sadd("s", &strings(&["m"])).unwrap();
    assert_eq!(store.get("s"), None);
}

#[test]
fn delete_existing_key() {
    let store = Store::new();
    store.set("k", "v").unwrap();
    assert!(store.delete("k").unwrap());
    assert_eq!(store.get("k"), None);
}

#[test]
fn delete_absent_key_is_false_not_error() {
    let store = Store::new();
    assert!(!store.delete("missing").unwrap());
}

#[test]
fn delete_works_on_any_tag() {
    let store = Store::new();
    store.push("st", "x").unwrap();
    assert!(store.delete("st").unwrap());
    assert!(store.is_empty());
}

// === Set operations ===

#[test]
fn sadd_then_smembers() {
    let store = Store::new();
    store.sadd("s", &strings(&["a", "b"])).unwrap();

    let mut members = store.smembers("s").unwrap();
    members.sort();
    assert_eq!(members, strings(&["a", "b"]));
}

#[test]
fn sadd_deduplicates() {
    let store = Store::new();
    store.sadd("s", &strings(&["m"])).unwrap();
    store.sadd("s", &strings(&["m"])).unwrap();
    assert_eq!(store.smembers("s").unwrap(), strings(&["m"]));
}

#[test]
fn smembers_absent_key_is_empty() {
    let store = Store::new();
    assert!(store.smembers("missing").unwrap().is_empty());
}

#[test]
fn spop_removes_only_listed_members_that_exist() {
    let store = Store::new();
    store.sadd("s", &strings(&["a", "b", "c"])).unwrap();

    let removed = store.spop("s", &strings(&["a", "nope", "c"])).unwrap();
    assert_eq!(removed, 2);
    assert_eq!(store.smembers("s").unwrap(), strings(&["b"]));
}

#[test]
fn spop_absent_key_removes_nothing() {
    let store = Store::new();
    assert_eq!(store.spop("missing", &strings(&["a"])).unwrap(), 0);
}

#[test]
fn spop_journals_only_removed_members() {
    let (_dir, path, store, _aof) = journaled_store(1000);
    store.sadd("s", &strings(&["a", "b"])).unwrap();
    store.spop("s", &strings(&["a", "nope"])).unwrap();

    let records = Aof::read(&path).unwrap();
    let spops: Vec<_> = records.iter().filter(|r| r.op == "SPOP").collect();
    assert_eq!(spops.len(), 1);
    assert_eq!(spops[0].value, "a");
}

// === List operations ===

#[test]
fn rpush_appends_in_argument_order() {
    let store = Store::new();
    store.rpush("l", &strings(&["a", "b", "c"])).unwrap();
    assert_eq!(store.lrange("l", 0, -1).unwrap(), strings(&["a", "b", "c"]));
}

#[test]
fn lpush_prepends_one_by_one() {
    let store = Store::new();
    store.lpush("l", &strings(&["a", "b", "c"])).unwrap();
    assert_eq!(store.lrange("l", 0, -1).unwrap(), strings(&["c", "b", "a"]));
}

#[test]
fn lpush_in_front_of_existing_items() {
    let store = Store::new();
    store.rpush("l", &strings(&["x"])).unwrap();
    store.lpush("l", &strings(&["a", "b"])).unwrap();
    assert_eq!(store.lrange("l", 0, -1).unwrap(), strings(&["b", "a", "x"]));
}

#[test]
fn lpush_records_replay_to_the_same_order() {
    let (_dir, path, store, _aof) = journaled_store(1000);
    store.lpush("l", &strings(&["a", "b", "c"])).unwrap();

    let replayed = Store::new();
    replayed.load_from_aof(&path).unwrap();
    assert_eq!(
        replayed.lrange("l", 0, -1).unwrap(),
        store.lrange("l", 0, -1).unwrap()
    );
}

#[parameterized(
    full_range = { 0, -1, &["a", "b", "c"] },
    tail_only = { -1, -1, &["c"] },
    negative_start = { -2, -1, &["b", "c"] },
    clamped_stop = { 0, 99, &["a", "b", "c"] },
    clamped_start = { -99, 1, &["a", "b"] },
    inverted = { 2, 1, &[] },
    single = { 1, 1, &["b"] },
)]
fn lrange_boundaries(start: i64, stop: i64, expected: &[&str]) {
    let store = Store::new();
    store.rpush("l", &strings(&["a", "b", "c"])).unwrap();
    assert_eq!(store.lrange("l", start, stop).unwrap(), strings(expected));
}

#[test]
fn lrange_absent_key_is_empty() {
    let store = Store::new();
    assert!(store.lrange("missing", 0, -1).unwrap().is_empty());
}

// === Queue operations ===

#[test]
fn queue_is_fifo() {
    let store = Store::new();
    store.enqueue("q", "a").unwrap();
    store.enqueue("q", "b").unwrap();

    assert_eq!(store.dequeue("q").unwrap(), "a");
    assert_eq!(store.dequeue("q").unwrap(), "b");
}

#[test]
fn dequeue_empty_queue_fails() {
    let store = Store::new();
    store.enqueue("q", "a").unwrap();
    store.dequeue("q").unwrap();

    let err = store.dequeue("q").unwrap_err();
    assert!(matches!(err, StoreError::Empty { .. }));
}

#[test]
fn dequeue_absent_key_fails_as_empty() {
    let store = Store::new();
    let err = store.dequeue("missing").unwrap_err();
    assert!(matches!(err, StoreError::Empty { .. }));
}

// === Stack operations ===

#[test]
fn stack_is_lifo() {
    let store = Store::new();
    store.push("st", "a").unwrap();
    store.push("st", "b").unwrap();

    assert_eq!(store.pop("st").unwrap(), "b");
    assert_eq!(store.pop("st").unwrap(), "a");
}

#[test]
fn pop_empty_stack_fails() {
    let store = Store::new();
    store.push("st", "a").unwrap();
    store.pop("st").unwrap();

    let err = store.pop("st").unwrap_err();
    assert!(matches!(err, StoreError::Empty { .. }));
}

// === Hashmap operations ===

#[test]
fn hset_then_hget() {
    let store = Store::new();
    store.hset("h", "f", "v").unwrap();
    assert_eq!(store.hget("h", "f").unwrap(), "v");
}

#[test]
fn hset_overwrites_field() {
    let store = Store::new();
    store.hset("h", "f", "old").unwrap();
    store.hset("h", "f", "new").unwrap();
    assert_eq!(store.hget("h", "f").unwrap(), "new");
}

#[test]
fn hget_missing_field_fails() {
    let store = Store::new();
    store.hset("h", "f", "v").unwrap();

    let err = store.hget("h", "nope").unwrap_err();
    assert!(matches!(err, StoreError::FieldNotFound { .. }));
}

#[test]
fn hget_absent_key_fails_as_field_not_found() {
    let store = Store::new();
    let err = store.hget("missing", "f").unwrap_err();
    assert!(matches!(err, StoreError::FieldNotFound { .. }));
}

#[test]
fn hgetall_copies_the_map() {
    let store = Store::new();
    store.hset("h", "f1", "v1").unwrap();
    store.hset("h", "f2", "v2").unwrap();

    let mut fields = store.hgetall("h").unwrap();
    fields.insert("rogue".to_string(), "x".to_string());

    // The store is unaffected by mutating the returned copy.
    assert_eq!(store.hgetall("h").unwrap().len(), 2);
}

// === Type invariants ===

#[test]
fn typed_op_against_mismatched_tag_fails_and_leaves_state() {
    let store = Store::new();
    store.set("a", "1").unwrap();

    let err = store.sadd("a", &strings(&["x"])).unwrap_err();
    assert!(matches!(err, StoreError::WrongType { .. }));
    assert_eq!(store.get("a"), Some("1".to_string()));
}

#[test]
fn wrong_type_persists_until_delete() {
    let store = Store::new();
    store.enqueue("q", "a").unwrap();

    assert!(matches!(
        store.push("q", "x").unwrap_err(),
        StoreError::WrongType { .. }
    ));
    assert!(matches!(
        store.rpush("q", &strings(&["x"])).unwrap_err(),
        StoreError::WrongType { .. }
    ));

    store.delete("q").unwrap();
    store.push("q", "x").unwrap();
    assert_eq!(store.pop("q").unwrap(), "x");
}

#[test]
fn read_ops_report_wrong_type() {
    let store = Store::new();
    store.set("a", "1").unwrap();

    assert!(matches!(
        store.smembers("a").unwrap_err(),
        StoreError::WrongType { .. }
    ));
    assert!(matches!(
        store.lrange("a", 0, -1).unwrap_err(),
        StoreError::WrongType { .. }
    ));
    assert!(matches!(
        store.hgetall("a").unwrap_err(),
        StoreError::WrongType { .. }
    ));
}

// === Enumerations ===

#[test]
fn enumerations_are_defensive_copies() {
    let store = Store::new();
    store.set("k", "v").unwrap();

    let mut all = store.get_all();
    all.insert("rogue".to_string(), Value::String("x".to_string()));

    assert_eq!(store.len(), 1);
    assert_eq!(store.get_all_keys(), vec!["k".to_string()]);
    assert_eq!(store.get_all_values(), vec![Value::String("v".to_string())]);
}

// === Journal write-through ===

#[test]
fn mutations_append_matching_records() {
    let (_dir, path, store, _aof) = journaled_store(1000);

    store.set("a", "1").unwrap();
    store.sadd("s", &strings(&["m1", "m2"])).unwrap();
    store.rpush("l", &strings(&["x"])).unwrap();
    store.enqueue("q", "j").unwrap();
    store.dequeue("q").unwrap();
    store.push("st", "t").unwrap();
    store.pop("st").unwrap();
    store.hset("h", "f", "v").unwrap();
    store.delete("a").unwrap();

    let ops_seen: Vec<String> = Aof::read(&path)
        .unwrap()
        .into_iter()
        .map(|r| r.op)
        .collect();
    assert_eq!(
        ops_seen,
        [
            "SET", "SADD", "SADD", "RPUSH", "ENQUEUE", "DEQUEUE", "PUSH", "POP", "HSET",
            "DELETE"
        ]
    );
}

#[test]
fn reads_do_not_touch_the_journal() {
    let (_dir, path, store, _aof) = journaled_store(1000);
    store.set("a", "1").unwrap();

    store.get("a");
    store.smembers("nope").unwrap();
    store.get_all();

    assert_eq!(Aof::read(&path).unwrap().len(), 1);
}

#[test]
fn failed_op_appends_nothing() {
    let (_dir, path, store, _aof) = journaled_store(1000);
    store.set("a", "1").unwrap();

    let _ = store.sadd("a", &strings(&["x"])).unwrap_err();

    assert_eq!(Aof::read(&path).unwrap().len(), 1);
}

// === Replay ===

#[test]
fn replay_set_set_delete() {
    let (_dir, path, store, _aof) = journaled_store(1000);
    store.set("a", "1").unwrap();
    store.set("b", "2").unwrap();
    store.delete("a").unwrap();

    let replayed = Store::new();
    replayed.load_from_aof(&path).unwrap();

    assert_eq!(replayed.len(), 1);
    assert_eq!(replayed.get("b"), Some("2".to_string()));
}

#[test]
fn replay_rebuilds_hashmap() {
    let (_dir, path, store, _aof) = journaled_store(1000);
    store.hset("h", "f1", "v1").unwrap();
    store.hset("h", "f2", "v2").unwrap();

    let replayed = Store::new();
    replayed.load_from_aof(&path).unwrap();

    let fields = replayed.hgetall("h").unwrap();
    assert_eq!(fields.len(), 2);
    assert_eq!(fields["f1"], "v1");
    assert_eq!(fields["f2"], "v2");
}

#[test]
fn replay_reproduces_mixed_state() {
    let (_dir, path, store, _aof) = journaled_store(1000);

    store.set("name", "minikv").unwrap();
    store.sadd("tags", &strings(&["kv", "aof", "kv"])).unwrap();
    store.rpush("l", &strings(&["a", "b"])).unwrap();
    store.lpush("l", &strings(&["front"])).unwrap();
    store.enqueue("q", "one").unwrap();
    store.enqueue("q", "two").unwrap();
    store.dequeue("q").unwrap();
    store.push("st", "x").unwrap();
    store.push("st", "y").unwrap();
    store.pop("st").unwrap();
    store.hset("h", "f", "v").unwrap();
    store.spop("tags", &strings(&["aof"])).unwrap();

    let replayed = Store::new();
    replayed.load_from_aof(&path).unwrap();

    assert_eq!(replayed.get_all(), store.get_all());
}

#[test]
fn replay_swallows_stale_records() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("test.aof");

    // DEQUEUE on an absent queue, SADD against a string, then a good SET.
    std::fs::write(
        &path,
        concat!(
            r#"{"op":"DEQUEUE","key":"q","valueType":"queue","value":""}"#,
            "\n",
            r#"{"op":"SET","key":"a","valueType":"string","value":"1"}"#,
            "\n",
            r#"{"op":"SADD","key":"a","valueType":"set","value":"m"}"#,
            "\n",
            r#"{"op":"SET","key":"b","valueType":"string","value":"2"}"#,
            "\n",
        ),
    )
    .unwrap();

    let store = Store::new();
    store.load_from_aof(&path).unwrap();

    assert_eq!(store.get("a"), Some("1".to_string()));
    assert_eq!(store.get("b"), Some("2".to_string()));
    assert_eq!(store.len(), 2);
}

#[test]
fn replay_ignores_unknown_ops() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("test.aof");
    std::fs::write(
        &path,
        concat!(
            r#"{"op":"EXPIRE","key":"a","valueType":"","value":"60"}"#,
            "\n",
            r#"{"op":"SET","key":"a","valueType":"string","value":"1"}"#,
            "\n",
        ),
    )
    .unwrap();

    let store = Store::new();
    store.load_from_aof(&path).unwrap();
    assert_eq!(store.get("a"), Some("1".to_string()));
}

#[test]
fn replay_aborts_on_malformed_line() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("test.aof");
    std::fs::write(&path, "SET a string 1\ngarbage\n").unwrap();

    let store = Store::new();
    let err = store.load_from_aof(&path).unwrap_err();
    assert!(matches!(err, StoreError::Aof(AofError::Parse { line: 2, .. })));
}

#[test]
fn replay_set_overwrites_any_tag() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("test.aof");
    std::fs::write(
        &path,
        concat!(
            r#"{"op":"SADD","key":"k","valueType":"set","value":"m"}"#,
            "\n",
            r#"{"op":"SET","key":"k","valueType":"string","value":"s"}"#,
            "\n",
        ),
    )
    .unwrap();

    let store = Store::new();
    store.load_from_aof(&path).unwrap();
    assert_eq!(store.get("k"), Some("s".to_string()));
}

#[test]
fn replay_absent_journal_is_a_fresh_start() {
    let dir = TempDir::new().unwrap();
    let store = Store::new();
    store.load_from_aof(&dir.path().join("nope.aof")).unwrap();
    assert!(store.is_empty());
}

// === Concurrency ===

#[test]
fn concurrent_sets_on_distinct_keys() {
    let (_dir, path, store, _aof) = journaled_store(100_000);
    let store = Arc::new(store);

    std::thread::scope(|scope| {
        for t in 0..8 {
            let store = Arc::clone(&store);
            scope.spawn(move || {
                for i in 0..125 {
                    let key = format!("key-{t}-{i}");
                    store.set(&key, "v").unwrap();
                }
            });
        }
    });

    assert_eq!(store.get_all_keys().len(), 1000);

    let records = Aof::read(&path).unwrap();
    assert_eq!(records.len(), 1000);
    assert!(records.iter().all(|r| r.op == "SET"));

    let replayed = Store::new();
    replayed.load_from_aof(&path).unwrap();
    assert_eq!(replayed.get_all(), store.get_all());
}
