// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! minikv-core: in-memory multi-datatype key-value store with append-only
//! durability
//!
//! Keys map to one of six typed values (string, set, list, queue, stack,
//! hashmap). Every successful mutation is appended to a durable journal
//! before the call returns; on startup the journal is replayed to rebuild
//! state, and a periodic snapshot rewrites it to a minimal creation
//! sequence.

pub mod aof;
pub mod config;
pub mod error;
pub mod store;
pub mod value;

pub use aof::{Aof, AofError, SnapshotSource};
pub use config::Config;
pub use error::StoreError;
pub use store::Store;
pub use value::{DataType, Value};
