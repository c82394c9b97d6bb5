// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for store operations

use crate::aof::AofError;
use crate::value::DataType;
use thiserror::Error;

/// Errors surfaced by typed store operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("wrong type for key {key}: holds {holds}, operation needs {needs}")]
    WrongType {
        key: String,
        holds: DataType,
        needs: DataType,
    },
    #[error("key not found: {0}")]
    NotFound(String),
    #[error("field not found: {field} in hashmap {key}")]
    FieldNotFound { key: String, field: String },
    #[error("empty {kind}: {key}")]
    Empty { key: String, kind: DataType },
    #[error("journal error: {0}")]
    Aof(#[from] AofError),
}
