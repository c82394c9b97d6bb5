// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Connection handling and request dispatch

use crate::protocol::{self, ProtocolError, Request, Response, DEFAULT_TIMEOUT};
use minikv_core::{Aof, Store, StoreError, Value};
use serde_json::json;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, error};

/// Shared handles the server dispatches against
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<Store>,
    pub aof: Option<Arc<Aof>>,
}

/// Server errors
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),
    #[error("request timeout")]
    Timeout,
}

/// Serve one client connection until it closes.
pub async fn handle_connection<S>(state: &AppState, stream: S) -> Result<(), ServerError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let (mut reader, mut writer) = tokio::io::split(stream);

    loop {
        let request = match protocol::read_request(&mut reader, DEFAULT_TIMEOUT).await {
            Ok(request) => request,
            Err(ProtocolError::ConnectionClosed) => {
                debug!("client disconnected");
                return Ok(());
            }
            Err(ProtocolError::Timeout) => return Err(ServerError::Timeout),
            Err(e) => {
                error!(error = %e, "failed to read request");
                return Err(ServerError::Protocol(e));
            }
        };

        debug!(?request, "received request");
        let response = handle_request(state, &request);

        protocol::write_response(&mut writer, &response, DEFAULT_TIMEOUT)
            .await
            .map_err(ServerError::Protocol)?;
    }
}

/// Dispatch one request against the store.
pub fn handle_request(state: &AppState, request: &Request) -> Response {
    let store = state.store.as_ref();

    match request {
        Request::Ping => Response::Pong,

        Request::Set { key, value } => ok_or_error(store.set(key, value)),
        Request::Get { key } => match store.get(key) {
            Some(value) => Response::Value { value },
            None => Response::NotFound,
        },
        Request::Delete { key } => match store.delete(key) {
            Ok(deleted) => Response::Deleted { deleted },
            Err(e) => error_response(&e),
        },

        Request::SAdd { key, members } => ok_or_error(store.sadd(key, members)),
        Request::SMembers { key } => match store.smembers(key) {
            Ok(items) => Response::Items { items },
            Err(e) => error_response(&e),
        },
        Request::SPop { key, members } => match store.spop(key, members) {
            Ok(count) => Response::Removed { count },
            Err(e) => error_response(&e),
        },

        Request::LPush { key, values } => ok_or_error(store.lpush(key, values)),
        Request::RPush { key, values } => ok_or_error(store.rpush(key, values)),
        Request::LRange { key, start, stop } => match store.lrange(key, *start, *stop) {
            Ok(items) => Response::Items { items },
            Err(e) => error_response(&e),
        },

        Request::Enqueue { key, value } => ok_or_error(store.enqueue(key, value)),
        Request::Dequeue { key } => match store.dequeue(key) {
            Ok(value) => Response::Value { value },
            Err(e) => error_response(&e),
        },

        Request::Push { key, value } => ok_or_error(store.push(key, value)),
        Request::Pop { key } => match store.pop(key) {
            Ok(value) => Response::Value { value },
            Err(e) => error_response(&e),
        },

        Request::HSet { key, field, value } => ok_or_error(store.hset(key, field, value)),
        Request::HGet { key, field } => match store.hget(key, field) {
            Ok(value) => Response::Value { value },
            Err(StoreError::FieldNotFound { .. }) => Response::NotFound,
            Err(e) => error_response(&e),
        },
        Request::HGetAll { key } => match store.hgetall(key) {
            Ok(fields) => Response::Fields { fields },
            Err(e) => error_response(&e),
        },

        Request::Keys => Response::Items {
            items: store.get_all_keys(),
        },
        Request::Values => Response::Values {
            values: store.get_all_values().iter().map(render_value).collect(),
        },
        Request::GetAll => Response::Entries {
            entries: store
                .get_all()
                .iter()
                .map(|(key, value)| (key.clone(), render_value(value)))
                .collect(),
        },

        Request::Snapshot => match &state.aof {
            Some(aof) => match aof.snapshot(store) {
                Ok(()) => Response::Ok,
                Err(e) => Response::Error {
                    message: e.to_string(),
                },
            },
            None => Response::Error {
                message: "journaling disabled".to_string(),
            },
        },
    }
}

fn ok_or_error(result: Result<(), StoreError>) -> Response {
    match result {
        Ok(()) => Response::Ok,
        Err(e) => error_response(&e),
    }
}

fn error_response(error: &StoreError) -> Response {
    Response::Error {
        message: error.to_string(),
    }
}

/// Client-facing rendering of a value: strings stay strings, containers
/// become arrays, hashmaps become objects. Set members are sorted so the
/// output is stable.
fn render_value(value: &Value) -> serde_json::Value {
    match value {
        Value::String(s) => json!(s),
        Value::Set(members) => {
            let mut members: Vec<&String> = members.iter().collect();
            members.sort();
            json!(members)
        }
        Value::List(items) | Value::Stack(items) => json!(items),
        Value::Queue(items) => json!(items),
        Value::Hashmap(fields) => json!(fields),
    }
}

#[cfg(test)]
#[path = "server_tests.rs"]
mod tests;
