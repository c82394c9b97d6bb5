// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Journal record and header model
//!
//! Records are self-describing: operation name, key, value tag, and an
//! operation-dependent payload. One record per line.

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Operation names as they appear in the journal
pub mod ops {
    pub const SET: &str = "SET";
    pub const DELETE: &str = "DELETE";
    pub const SADD: &str = "SADD";
    pub const SPOP: &str = "SPOP";
    pub const LPUSH: &str = "LPUSH";
    pub const RPUSH: &str = "RPUSH";
    pub const ENQUEUE: &str = "ENQUEUE";
    pub const DEQUEUE: &str = "DEQUEUE";
    pub const PUSH: &str = "PUSH";
    pub const POP: &str = "POP";
    pub const HSET: &str = "HSET";
}

/// A journal line that decodes as neither a JSON nor a legacy record
#[derive(Debug, Error)]
#[error("{reason}")]
pub struct MalformedRecord {
    pub reason: String,
}

impl MalformedRecord {
    fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// A single mutation record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub op: String,
    pub key: String,
    /// One of the six tag names, or empty for `DELETE`
    #[serde(rename = "valueType", default)]
    pub value_type: String,
    #[serde(default)]
    pub value: String,
}

impl Record {
    pub fn new(op: &str, key: &str, value_type: &str, value: &str) -> Self {
        Self {
            op: op.to_string(),
            key: key.to_string(),
            value_type: value_type.to_string(),
            value: value.to_string(),
        }
    }

    /// Serialize to one JSON line (no trailing newline)
    pub fn to_line(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Parse a journal line.
    ///
    /// The JSON encoding is attempted first; on failure the legacy
    /// whitespace encoding is tried (max 4 fields, only the last may
    /// contain spaces).
    pub fn from_line(line: &str) -> Result<Self, MalformedRecord> {
        let trimmed = line.trim();

        if trimmed.starts_with('{') {
            if let Ok(record) = serde_json::from_str::<Record>(trimmed) {
                if record.op.is_empty() || record.key.is_empty() {
                    return Err(MalformedRecord::new(format!(
                        "JSON record missing op or key: {trimmed}"
                    )));
                }
                return Ok(record);
            }
        }

        Self::from_legacy_line(line)
    }

    fn from_legacy_line(line: &str) -> Result<Self, MalformedRecord> {
        let parts: Vec<&str> = line.splitn(4, ' ').collect();
        if parts.len() < 2 {
            return Err(MalformedRecord::new(format!(
                "legacy record needs at least op and key: {line}"
            )));
        }

        let value_type = parts.get(2).copied().unwrap_or("");
        let value = parts.get(3).copied().unwrap_or("");

        if parts[0] == ops::SET && (value_type.is_empty() || value.is_empty()) {
            return Err(MalformedRecord::new(format!(
                "legacy SET record missing value type or value: {line}"
            )));
        }

        Ok(Self::new(parts[0], parts[1], value_type, value))
    }
}

/// Header record carried on the first line of every journal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    pub format: String,
    pub version: String,
    pub encoding: String,
}

impl Header {
    pub const FORMAT: &'static str = "aof";
    pub const ENCODING: &'static str = "json-lines";

    /// A fresh header stamped with the current UTC time
    pub fn new() -> Self {
        Self {
            format: Self::FORMAT.to_string(),
            version: Utc::now().to_rfc3339_opts(SecondsFormat::Nanos, true),
            encoding: Self::ENCODING.to_string(),
        }
    }

    pub fn to_line(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Parse a header from the first line of a journal. Returns `None`
    /// when the line is an operation record or anything else.
    #[must_use]
    pub fn detect(line: &str) -> Option<Self> {
        let trimmed = line.trim();
        if !trimmed.starts_with('{') {
            return None;
        }
        let header: Header = serde_json::from_str(trimmed).ok()?;
        (header.format == Self::FORMAT).then_some(header)
    }
}

impl Default for Header {
    fn default() -> Self {
        Self::new()
    }
}

/// Structured `HSET` payload: a single field/value pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HashField {
    pub f: String,
    pub v: String,
}

impl HashField {
    pub fn new(field: &str, value: &str) -> Self {
        Self {
            f: field.to_string(),
            v: value.to_string(),
        }
    }

    pub fn to_payload(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_payload(payload: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(payload)
    }
}

#[cfg(test)]
#[path = "record_tests.rs"]
mod tests;
