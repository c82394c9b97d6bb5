// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Typed key space with write-through journaling
//!
//! One reader-writer lock guards the whole map: reads take it shared,
//! mutations exclusive. A mutation updates memory first, then appends the
//! matching record to the journal while still holding the exclusive lock,
//! so journal order equals the linearization of successful mutations. If
//! the append fails the in-memory change has already taken effect and the
//! error reports the divergence.

use crate::aof::{ops, Aof, HashField, Record, SnapshotSource};
use crate::error::StoreError;
use crate::value::{DataType, Value};
use std::collections::{HashMap, HashSet, VecDeque};
use std::path::Path;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info, warn};

type KeySpace = HashMap<String, Value>;

/// Concurrent, typed in-memory key-value store
#[derive(Default)]
pub struct Store {
    data: RwLock<KeySpace>,
    aof: Option<Arc<Aof>>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a journal. Every subsequent successful mutation appends a
    /// record before returning. Without one the store runs in memory only.
    pub fn enable_aof(&mut self, aof: Arc<Aof>) {
        self.aof = Some(aof);
    }

    // === String operations ===

    /// Create or overwrite `key` as a string value.
    pub fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut data = self.write_guard();
        data.insert(key.to_string(), Value::String(value.to_string()));
        self.log_append(ops::SET, key, DataType::String.as_str(), value)
    }

    /// String read. A key holding a non-string value reads as absent.
    pub fn get(&self, key: &str) -> Option<String> {
        let data = self.read_guard();
        match data.get(key) {
            Some(Value::String(s)) => Some(s.clone()),
            _ => None,
        }
    }

    /// Remove `key` regardless of tag. Returns whether it existed.
    pub fn delete(&self, key: &str) -> Result<bool, StoreError> {
        let mut data = self.write_guard();
        if data.remove(key).is_none() {
            return Ok(false);
        }
        self.log_append(ops::DELETE, key, "", "")?;
        Ok(true)
    }

    // === Set operations ===

    /// Insert members into the set at `key`, creating it if absent.
    pub fn sadd(&self, key: &str, members: &[String]) -> Result<(), StoreError> {
        let mut data = self.write_guard();
        let set = match data
            .entry(key.to_string())
            .or_insert_with(|| Value::Set(HashSet::new()))
        {
            Value::Set(set) => set,
            other => return Err(wrong_type(key, other.data_type(), DataType::Set)),
        };

        for member in members {
            set.insert(member.clone());
        }
        for member in members {
            self.log_append(ops::SADD, key, DataType::Set.as_str(), member)?;
        }
        Ok(())
    }

    /// Members of the set at `key`; order unspecified. Absent key reads as
    /// an empty set.
    pub fn smembers(&self, key: &str) -> Result<Vec<String>, StoreError> {
        let data = self.read_guard();
        match data.get(key) {
            Some(Value::Set(set)) => Ok(set.iter().cloned().collect()),
            Some(other) => Err(wrong_type(key, other.data_type(), DataType::Set)),
            None => Ok(Vec::new()),
        }
    }

    /// Remove the listed members that exist. Returns how many were
    /// removed; only those are journaled.
    pub fn spop(&self, key: &str, members: &[String]) -> Result<usize, StoreError> {
        let mut data = self.write_guard();
        let set = match data.get_mut(key) {
            Some(Value::Set(set)) => set,
            Some(other) => return Err(wrong_type(key, other.data_type(), DataType::Set)),
            None => return Ok(0),
        };

        let mut removed = Vec::new();
        for member in members {
            if set.remove(member) {
                removed.push(member.as_str());
            }
        }
        for member in &removed {
            self.log_append(ops::SPOP, key, DataType::Set.as_str(), member)?;
        }
        Ok(removed.len())
    }

    // === List operations ===

    /// Prepend values one by one: the last argument ends up at index 0.
    pub fn lpush(&self, key: &str, values: &[String]) -> Result<(), StoreError> {
        let mut data = self.write_guard();
        let list = match data
            .entry(key.to_string())
            .or_insert_with(|| Value::List(Vec::new()))
        {
            Value::List(list) => list,
            other => return Err(wrong_type(key, other.data_type(), DataType::List)),
        };

        for value in values {
            list.insert(0, value.clone());
        }
        for value in values {
            self.log_append(ops::LPUSH, key, DataType::List.as_str(), value)?;
        }
        Ok(())
    }

    /// Append values in argument order.
    pub fn rpush(&self, key: &str, values: &[String]) -> Result<(), StoreError> {
        let mut data = self.write_guard();
        let list = match data
            .entry(key.to_string())
            .or_insert_with(|| Value::List(Vec::new()))
        {
            Value::List(list) => list,
            other => return Err(wrong_type(key, other.data_type(), DataType::List)),
        };

        for value in values {
            list.push(value.clone());
        }
        for value in values {
            self.log_append(ops::RPUSH, key, DataType::List.as_str(), value)?;
        }
        Ok(())
    }

    /// Inclusive range over the list at `key`. Negative indices count from
    /// the tail (`-1` is the last element). Absent key reads as an empty
    /// list.
    pub fn lrange(&self, key: &str, start: i64, stop: i64) -> Result<Vec<String>, StoreError> {
        let data = self.read_guard();
        match data.get(key) {
            Some(Value::List(list)) => Ok(range_of(list, start, stop)),
            Some(other) => Err(wrong_type(key, other.data_type(), DataType::List)),
            None => Ok(Vec::new()),
        }
    }

    // === Queue operations ===

    /// Append to the queue at `key`, creating it if absent.
    pub fn enqueue(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut data = self.write_guard();
        let queue = match data
            .entry(key.to_string())
            .or_insert_with(|| Value::Queue(VecDeque::new()))
        {
            Value::Queue(queue) => queue,
            other => return Err(wrong_type(key, other.data_type(), DataType::Queue)),
        };

        queue.push_back(value.to_string());
        self.log_append(ops::ENQUEUE, key, DataType::Queue.as_str(), value)
    }

    /// Remove and return the queue head. An absent key and an empty queue
    /// both fail as empty.
    pub fn dequeue(&self, key: &str) -> Result<String, StoreError> {
        let mut data = self.write_guard();
        let queue = match data.get_mut(key) {
            Some(Value::Queue(queue)) => queue,
            Some(other) => return Err(wrong_type(key, other.data_type(), DataType::Queue)),
            None => return Err(empty(key, DataType::Queue)),
        };

        let value = queue.pop_front().ok_or_else(|| empty(key, DataType::Queue))?;
        self.log_append(ops::DEQUEUE, key, DataType::Queue.as_str(), "")?;
        Ok(value)
    }

    // === Stack operations ===

    /// Push onto the stack at `key`, creating it if absent.
    pub fn push(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut data = self.write_guard();
        let stack = match data
            .entry(key.to_string())
            .or_insert_with(|| Value::Stack(Vec::new()))
        {
            Value::Stack(stack) => stack,
            other => return Err(wrong_type(key, other.data_type(), DataType::Stack)),
        };

        stack.push(value.to_string());
        self.log_append(ops::PUSH, key, DataType::Stack.as_str(), value)
    }

    /// Remove and return the top of the stack. An absent key and an empty
    /// stack both fail as empty.
    pub fn pop(&self, key: &str) -> Result<String, StoreError> {
        let mut data = self.write_guard();
        let stack = match data.get_mut(key) {
            Some(Value::Stack(stack)) => stack,
            Some(other) => return Err(wrong_type(key, other.data_type(), DataType::Stack)),
            None => return Err(empty(key, DataType::Stack)),
        };

        let value = stack.pop().ok_or_else(|| empty(key, DataType::Stack))?;
        self.log_append(ops::POP, key, DataType::Stack.as_str(), "")?;
        Ok(value)
    }

    // === Hashmap operations ===

    /// Set or overwrite a field in the hashmap at `key`, creating the
    /// hashmap if absent.
    pub fn hset(&self, key: &str, field: &str, value: &str) -> Result<(), StoreError> {
        let mut data = self.write_guard();
        let map = match data
            .entry(key.to_string())
            .or_insert_with(|| Value::Hashmap(HashMap::new()))
        {
            Value::Hashmap(map) => map,
            other => return Err(wrong_type(key, other.data_type(), DataType::Hashmap)),
        };

        map.insert(field.to_string(), value.to_string());
        let payload = HashField::new(field, value)
            .to_payload()
            .map_err(crate::aof::AofError::from)?;
        self.log_append(ops::HSET, key, DataType::Hashmap.as_str(), &payload)
    }

    /// Read one field of the hashmap at `key`.
    pub fn hget(&self, key: &str, field: &str) -> Result<String, StoreError> {
        let data = self.read_guard();
        let map = match data.get(key) {
            Some(Value::Hashmap(map)) => map,
            Some(other) => return Err(wrong_type(key, other.data_type(), DataType::Hashmap)),
            None => return Err(field_not_found(key, field)),
        };
        map.get(field)
            .cloned()
            .ok_or_else(|| field_not_found(key, field))
    }

    /// Copy of the whole hashmap at `key`. Absent key reads as empty.
    pub fn hgetall(&self, key: &str) -> Result<HashMap<String, String>, StoreError> {
        let data = self.read_guard();
        match data.get(key) {
            Some(Value::Hashmap(map)) => Ok(map.clone()),
            Some(other) => Err(wrong_type(key, other.data_type(), DataType::Hashmap)),
            None => Ok(HashMap::new()),
        }
    }

    // === Enumerations ===

    /// Snapshot of every key and its value (defensive copies).
    pub fn get_all(&self) -> HashMap<String, Value> {
        self.read_guard().clone()
    }

    pub fn get_all_keys(&self) -> Vec<String> {
        self.read_guard().keys().cloned().collect()
    }

    pub fn get_all_values(&self) -> Vec<Value> {
        self.read_guard().values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.read_guard().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read_guard().is_empty()
    }

    // === Replay ===

    /// Rebuild in-memory state from the journal at `path`.
    ///
    /// Records apply in file order with journaling disabled. Records that
    /// no longer fit the shape of the data (wrong tag, absent key, empty
    /// container) are skipped with a warning so a stale prefix cannot
    /// abort recovery; only I/O and parse failures do.
    pub fn load_from_aof(&self, path: &Path) -> Result<(), StoreError> {
        let records = Aof::read(path)?;

        let mut data = self.write_guard();
        for record in &records {
            if let Err(e) = apply_record(&mut data, record) {
                warn!(op = %record.op, key = %record.key, error = %e, "skipping journal record");
            }
        }

        info!(records = records.len(), keys = data.len(), "journal replayed");
        Ok(())
    }

    // === Internals ===

    fn read_guard(&self) -> RwLockReadGuard<'_, KeySpace> {
        self.data.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_guard(&self) -> RwLockWriteGuard<'_, KeySpace> {
        self.data.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Journal one record if a journal is attached. Called with the write
    /// guard held, which keeps journal order aligned with mutation order.
    fn log_append(
        &self,
        op: &str,
        key: &str,
        value_type: &str,
        value: &str,
    ) -> Result<(), StoreError> {
        if let Some(aof) = &self.aof {
            aof.append(&Record::new(op, key, value_type, value))?;
        }
        Ok(())
    }
}

impl SnapshotSource for Store {
    fn with_state(
        &self,
        f: &mut dyn FnMut(&KeySpace) -> Result<(), crate::aof::AofError>,
    ) -> Result<(), crate::aof::AofError> {
        let data = self.read_guard();
        f(&data)
    }
}

/// Apply one journal record to the raw key space. Never journals.
fn apply_record(data: &mut KeySpace, record: &Record) -> Result<(), StoreError> {
    let key = record.key.as_str();
    let value = record.value.as_str();

    match record.op.as_str() {
        ops::SET => {
            data.insert(key.to_string(), Value::String(value.to_string()));
        }
        ops::DELETE => {
            data.remove(key);
        }
        ops::SADD => match data
            .entry(key.to_string())
            .or_insert_with(|| Value::Set(HashSet::new()))
        {
            Value::Set(set) => {
                set.insert(value.to_string());
            }
            other => return Err(wrong_type(key, other.data_type(), DataType::Set)),
        },
        ops::SPOP => match data.get_mut(key) {
            Some(Value::Set(set)) => {
                set.remove(value);
            }
            Some(other) => return Err(wrong_type(key, other.data_type(), DataType::Set)),
            None => return Err(StoreError::NotFound(key.to_string())),
        },
        ops::LPUSH => match data
            .entry(key.to_string())
            .or_insert_with(|| Value::List(Vec::new()))
        {
            Value::List(list) => list.insert(0, value.to_string()),
            other => return Err(wrong_type(key, other.data_type(), DataType::List)),
        },
        ops::RPUSH => match data
            .entry(key.to_string())
            .or_insert_with(|| Value::List(Vec::new()))
        {
            Value::List(list) => list.push(value.to_string()),
            other => return Err(wrong_type(key, other.data_type(), DataType::List)),
        },
        ops::ENQUEUE => match data
            .entry(key.to_string())
            .or_insert_with(|| Value::Queue(VecDeque::new()))
        {
            Value::Queue(queue) => queue.push_back(value.to_string()),
            other => return Err(wrong_type(key, other.data_type(), DataType::Queue)),
        },
        ops::DEQUEUE => match data.get_mut(key) {
            Some(Value::Queue(queue)) => {
                queue
                    .pop_front()
                    .ok_or_else(|| empty(key, DataType::Queue))?;
            }
            Some(other) => return Err(wrong_type(key, other.data_type(), DataType::Queue)),
            None => return Err(StoreError::NotFound(key.to_string())),
        },
        ops::PUSH => match data
            .entry(key.to_string())
            .or_insert_with(|| Value::Stack(Vec::new()))
        {
            Value::Stack(stack) => stack.push(value.to_string()),
            other => return Err(wrong_type(key, other.data_type(), DataType::Stack)),
        },
        ops::POP => match data.get_mut(key) {
            Some(Value::Stack(stack)) => {
                stack.pop().ok_or_else(|| empty(key, DataType::Stack))?;
            }
            Some(other) => return Err(wrong_type(key, other.data_type(), DataType::Stack)),
            None => return Err(StoreError::NotFound(key.to_string())),
        },
        ops::HSET => {
            let pair = HashField::from_payload(value).map_err(crate::aof::AofError::from)?;
            match data
                .entry(key.to_string())
                .or_insert_with(|| Value::Hashmap(HashMap::new()))
            {
                Value::Hashmap(map) => {
                    map.insert(pair.f, pair.v);
                }
                other => return Err(wrong_type(key, other.data_type(), DataType::Hashmap)),
            }
        }
        unknown => {
            debug!(op = %unknown, key = %key, "ignoring unknown journal op");
        }
    }

    Ok(())
}

/// Inclusive slice with tail-relative negative indices, clamped to the
/// bounds of `items`.
fn range_of(items: &[String], start: i64, stop: i64) -> Vec<String> {
    let len = items.len() as i64;
    let mut start = if start < 0 { len + start } else { start };
    let mut stop = if stop < 0 { len + stop } else { stop };

    if start < 0 {
        start = 0;
    }
    if stop > len - 1 {
        stop = len - 1;
    }
    if start > stop {
        return Vec::new();
    }

    items[start as usize..=stop as usize].to_vec()
}

fn wrong_type(key: &str, holds: DataType, needs: DataType) -> StoreError {
    StoreError::WrongType {
        key: key.to_string(),
        holds,
        needs,
    }
}

fn empty(key: &str, kind: DataType) -> StoreError {
    StoreError::Empty {
        key: key.to_string(),
        kind,
    }
}

fn field_not_found(key: &str, field: &str) -> StoreError {
    StoreError::FieldNotFound {
        key: key.to_string(),
        field: field.to_string(),
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
