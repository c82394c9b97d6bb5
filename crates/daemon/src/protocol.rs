// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wire protocol: length-prefixed JSON requests and responses
//!
//! Each message is a 4-byte big-endian length followed by one JSON
//! document. One request yields one response; clients may pipeline
//! requests over a single connection.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::timeout;

/// How long a single read or write may take
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Upper bound on a single framed message
pub const MAX_MESSAGE_SIZE: u32 = 16 * 1024 * 1024;

/// Protocol errors
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("message too large: {0} bytes")]
    TooLarge(u32),
    #[error("connection closed")]
    ConnectionClosed,
    #[error("timed out")]
    Timeout,
}

/// Client requests, one per store operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Request {
    Ping,
    Set { key: String, value: String },
    Get { key: String },
    Delete { key: String },
    SAdd { key: String, members: Vec<String> },
    SMembers { key: String },
    SPop { key: String, members: Vec<String> },
    LPush { key: String, values: Vec<String> },
    RPush { key: String, values: Vec<String> },
    LRange { key: String, start: i64, stop: i64 },
    Enqueue { key: String, value: String },
    Dequeue { key: String },
    Push { key: String, value: String },
    Pop { key: String },
    HSet { key: String, field: String, value: String },
    HGet { key: String, field: String },
    HGetAll { key: String },
    Keys,
    Values,
    GetAll,
    Snapshot,
}

/// Server responses
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    Pong,
    Ok,
    Value { value: String },
    NotFound,
    Deleted { deleted: bool },
    Removed { count: usize },
    Items { items: Vec<String> },
    Fields { fields: HashMap<String, String> },
    Values { values: Vec<serde_json::Value> },
    Entries { entries: HashMap<String, serde_json::Value> },
    Error { message: String },
}

/// Encode a message as raw JSON (no length prefix)
pub fn encode<T: Serialize>(message: &T) -> Result<Vec<u8>, ProtocolError> {
    Ok(serde_json::to_vec(message)?)
}

/// Decode a message from raw JSON
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, ProtocolError> {
    Ok(serde_json::from_slice(bytes)?)
}

/// Write one length-prefixed message
pub async fn write_message<W: AsyncWrite + Unpin>(
    writer: &mut W,
    data: &[u8],
) -> Result<(), ProtocolError> {
    let len = u32::try_from(data.len()).map_err(|_| ProtocolError::TooLarge(u32::MAX))?;
    if len > MAX_MESSAGE_SIZE {
        return Err(ProtocolError::TooLarge(len));
    }

    writer.write_all(&len.to_be_bytes()).await?;
    writer.write_all(data).await?;
    writer.flush().await?;
    Ok(())
}

/// Read one length-prefixed message
pub async fn read_message<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Vec<u8>, ProtocolError> {
    let mut len_buf = [0u8; 4];
    match reader.read_exact(&mut len_buf).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
            return Err(ProtocolError::ConnectionClosed)
        }
        Err(e) => return Err(e.into()),
    }

    let len = u32::from_be_bytes(len_buf);
    if len > MAX_MESSAGE_SIZE {
        return Err(ProtocolError::TooLarge(len));
    }

    let mut buf = vec![0u8; len as usize];
    match reader.read_exact(&mut buf).await {
        Ok(_) => Ok(buf),
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
            Err(ProtocolError::ConnectionClosed)
        }
        Err(e) => Err(e.into()),
    }
}

/// Read a request with a timeout
pub async fn read_request<R: AsyncRead + Unpin>(
    reader: &mut R,
    duration: Duration,
) -> Result<Request, ProtocolError> {
    match timeout(duration, read_message(reader)).await {
        Ok(result) => decode(&result?),
        Err(_) => Err(ProtocolError::Timeout),
    }
}

/// Write a response with a timeout
pub async fn write_response<W: AsyncWrite + Unpin>(
    writer: &mut W,
    response: &Response,
    duration: Duration,
) -> Result<(), ProtocolError> {
    let encoded = encode(response)?;
    match timeout(duration, write_message(writer, &encoded)).await {
        Ok(result) => result,
        Err(_) => Err(ProtocolError::Timeout),
    }
}

#[cfg(test)]
#[path = "protocol_tests.rs"]
mod tests;
