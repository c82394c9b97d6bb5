// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Append-only file (AOF) persistence
//!
//! Durably persists the ordered stream of mutation records and rebuilds it
//! on demand.
//!
//! ## Responsibilities
//! - Append records with write-through durability (flush + fsync before
//!   returning)
//! - Bulk read for startup replay
//! - Periodic compaction: rewrite the journal as the minimal creation
//!   sequence for the current state
//!
//! ## File format
//! UTF-8 text, one JSON record per LF-terminated line. The first line is a
//! header record:
//!
//! ```text
//! {"format":"aof","version":"<RFC3339Nano UTC>","encoding":"json-lines"}
//! {"op":"SET","key":"a","valueType":"string","value":"1"}
//! {"op":"RPUSH","key":"l","valueType":"list","value":"x"}
//! ```
//!
//! A legacy whitespace encoding (`OP KEY VALUETYPE VALUE`, value may contain
//! spaces) is still decoded; new records are always emitted as JSON.

mod log;
mod record;

pub use log::{Aof, AofError, SnapshotSource, DEFAULT_SNAPSHOT_THRESHOLD};
pub use record::{ops, HashField, Header, MalformedRecord, Record};
