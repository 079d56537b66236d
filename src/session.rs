//! One client connection: a tolerant JSON framer feeding request dispatch,
//! interleaved with pushed notifications, all writing through a single
//! socket half owned by this task.
//!
//! Reads and notification delivery share one `tokio::select!` loop rather
//! than a dedicated reader task plus a dedicated writer task: since this
//! task is the sole owner of the socket's write half, every write it issues
//! is already serialized against every other write, with no `Mutex` needed
//! around the socket itself.

use crate::engine::CacheEngine;
use crate::protocol::{CacheEvent, Operation, Request, Response};
use crate::shutdown::Shutdown;
use crate::subscription::SubscriptionRegistry;
use serde_json::Value;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Bytes read from the socket per `read()` call before re-checking for a
/// complete request in the buffer.
const READ_CHUNK: usize = 8 * 1024;

/// Drives one client connection to completion: parses requests off the wire,
/// dispatches them against `engine` and `registry`, and forwards any events
/// the registry pushes to this client until the peer disconnects, sends
/// malformed input, or `shutdown` fires.
pub async fn run(
    stream: TcpStream,
    engine: CacheEngine,
    registry: Arc<SubscriptionRegistry>,
    shutdown: Shutdown,
) {
    let client_id = Uuid::new_v4();
    let (mut read_half, mut write_half) = stream.into_split();
    let (notify_tx, mut notify_rx) = mpsc::unbounded_channel::<CacheEvent>();
    registry.add_client(client_id, notify_tx);

    let mut buf: Vec<u8> = Vec::new();
    let mut read_chunk = vec![0u8; READ_CHUNK];

    'connection: loop {
        while let Some(outcome) = next_request(&buf) {
            let consumed = match outcome {
                Ok((request, consumed)) => {
                    let response = dispatch(&request, &engine, &registry, client_id);
                    if write_response(&mut write_half, &response).await.is_err() {
                        break 'connection;
                    }
                    consumed
                }
                Err(()) => {
                    tracing::warn!(%client_id, "closing connection: malformed JSON request");
                    break 'connection;
                }
            };
            buf.drain(..consumed);
        }

        tokio::select! {
            _ = shutdown.cancelled() => break 'connection,
            result = read_half.read(&mut read_chunk) => {
                match result {
                    Ok(0) => break 'connection,
                    Ok(n) => buf.extend_from_slice(&read_chunk[..n]),
                    Err(e) => {
                        tracing::debug!(%client_id, error = %e, "read error, closing connection");
                        break 'connection;
                    }
                }
            }
            Some(event) = notify_rx.recv() => {
                let response = Response::notification(event);
                if write_response(&mut write_half, &response).await.is_err() {
                    break 'connection;
                }
            }
        }
    }

    registry.remove_client(client_id);
}

/// Tries to pull one complete [`Request`] off the front of `buf`.
///
/// Returns `None` when `buf` holds no complete value yet (more bytes needed),
/// `Some(Ok((request, consumed)))` on success, or `Some(Err(()))` when `buf`
/// contains bytes that can never parse as JSON — a codec fault that should
/// close the connection. This accepts both one-object-per-line framing and
/// unframed concatenated JSON, since `serde_json`'s streaming deserializer
/// treats whitespace (including the newline) between values as a separator.
fn next_request(buf: &[u8]) -> Option<Result<(Request, usize), ()>> {
    if buf.iter().all(u8::is_ascii_whitespace) {
        return None;
    }
    let mut stream = serde_json::Deserializer::from_slice(buf).into_iter::<Request>();
    match stream.next() {
        Some(Ok(request)) => Some(Ok((request, stream.byte_offset()))),
        Some(Err(e)) if e.is_eof() => None,
        Some(Err(_)) => Some(Err(())),
        None => None,
    }
}

async fn write_response(
    write_half: &mut tokio::net::tcp::OwnedWriteHalf,
    response: &Response,
) -> std::io::Result<()> {
    let mut line = serde_json::to_vec(response).expect("Response always serializes");
    line.push(b'\n');
    write_half.write_all(&line).await
}

fn dispatch(
    request: &Request,
    engine: &CacheEngine,
    registry: &SubscriptionRegistry,
    client_id: Uuid,
) -> Response {
    let Some(operation) = Operation::parse(&request.operation) else {
        return Response::fail(Some("Invalid operation".to_string()));
    };

    match operation {
        Operation::Create => {
            let key = request.key.clone().unwrap_or_default();
            let value = request.value.clone().unwrap_or(Value::Null);
            if engine.create(&key, value, request.expiration_seconds) {
                Response::ok()
            } else {
                Response::fail(None)
            }
        }
        Operation::Read => {
            let key = request.key.clone().unwrap_or_default();
            Response::ok_with_value(engine.read(&key).unwrap_or(Value::Null))
        }
        Operation::Update => {
            let key = request.key.clone().unwrap_or_default();
            let value = request.value.clone().unwrap_or(Value::Null);
            if engine.update(&key, value, request.expiration_seconds) {
                Response::ok()
            } else {
                Response::fail(None)
            }
        }
        Operation::Delete => {
            let key = request.key.clone().unwrap_or_default();
            if engine.delete(&key) {
                Response::ok()
            } else {
                Response::fail(None)
            }
        }
        Operation::Subscribe => {
            registry.subscribe(client_id, request.subscribed_event_types.clone());
            Response::ok()
        }
        Operation::Unsubscribe => {
            registry.unsubscribe(client_id, request.subscribed_event_types.clone());
            Response::ok()
        }
    }
}
