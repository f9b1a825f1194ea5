//! Coordinator/worker protocol
//!
//! This module defines the protocol for communication between the coordinator
//! and worker services. Messages are serialized with MessagePack (rmp-serde)
//! for a compact binary encoding with full serde feature support.
//!
//! # Message Flow
//!
//! ```text
//! Coordinator                     Worker
//!     |                              |
//!     |------ BROADCAST ------------>|   (once: threshold + object set)
//!     |                              |
//!     |------ ASSIGN(picture) ------>|
//!     |<----- RESULT ----------------|
//!     |------ ASSIGN or TERMINATE -->|
//!     |                              |
//! ```
//!
//! The broadcast must be fully received and retained by each worker before
//! any picture is assigned. A worker holds at most one assigned picture at a
//! time. An ERROR message from a worker aborts the whole run.
//!
//! # Message Framing
//!
//! Each message is prefixed with a 4-byte length field (little-endian u32):
//!
//! ```text
//! [4 bytes: message length][N bytes: MessagePack-serialized message]
//! ```

use crate::problem::{MatchResult, ObjectPattern, Picture};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Protocol version
///
/// Increment this when making breaking changes to the protocol.
/// Coordinator and workers must have matching protocol versions.
pub const PROTOCOL_VERSION: u32 = 1;

/// Upper bound on a single framed message.
///
/// Pictures and object sets are integer matrices; anything beyond this is a
/// corrupt length field, not a legitimate payload.
const MAX_MESSAGE_BYTES: usize = 1024 * 1024 * 1024;

/// Protocol message
///
/// All messages exchanged between the coordinator and worker services.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Message {
    /// One-time broadcast (Coordinator → all Workers)
    ///
    /// Carries the threshold and the complete object set. Sent to every
    /// worker before any picture is assigned; workers retain the payload for
    /// the lifetime of the session.
    Broadcast(BroadcastMessage),

    /// Picture assignment (Coordinator → one Worker)
    Assign(AssignMessage),

    /// Search result (Worker → Coordinator)
    ///
    /// Exactly one per assigned picture.
    Result(ResultMessage),

    /// Terminate signal (Coordinator → one Worker)
    ///
    /// The worker's session ends; no further pictures follow.
    Terminate,

    /// Error report (Worker → Coordinator)
    ///
    /// The coordinator aborts the run on receipt.
    Error(ErrorMessage),
}

/// One-time broadcast payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BroadcastMessage {
    /// Protocol version (must match)
    pub protocol_version: u32,

    /// Similarity threshold, invariant for the run
    pub threshold: f64,

    /// Complete object set, identical on every worker
    pub objects: Vec<ObjectPattern>,
}

/// Picture assignment payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignMessage {
    pub picture: Picture,
}

/// Search result payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultMessage {
    /// Worker identifier (hostname)
    pub node_id: String,

    /// Outcome for the assigned picture
    pub result: MatchResult,

    /// Wall-clock time of the engine call, in nanoseconds
    ///
    /// Feeds the coordinator's latency statistics; has no scheduling effect.
    pub search_ns: u64,
}

/// Error payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorMessage {
    /// Worker identifier (hostname)
    pub node_id: String,

    /// Error description
    pub error: String,
}

/// Serialize a message to bytes
///
/// Prepends a 4-byte length field for framing.
pub fn serialize_message(msg: &Message) -> Result<Vec<u8>> {
    let msg_bytes = rmp_serde::to_vec(msg).context("Failed to serialize message")?;

    let msg_len = msg_bytes.len() as u32;
    let mut framed = Vec::with_capacity(4 + msg_bytes.len());
    framed.extend_from_slice(&msg_len.to_le_bytes());
    framed.extend_from_slice(&msg_bytes);

    Ok(framed)
}

/// Deserialize a message from bytes
///
/// Expects a 4-byte length prefix followed by a MessagePack-serialized
/// message.
///
/// # Returns
///
/// Returns (message, bytes_consumed) where bytes_consumed includes the
/// length prefix.
pub fn deserialize_message(buf: &[u8]) -> Result<(Message, usize)> {
    if buf.len() < 4 {
        anyhow::bail!(
            "Buffer too small for message length (need 4 bytes, got {})",
            buf.len()
        );
    }

    let msg_len = u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]) as usize;

    if buf.len() < 4 + msg_len {
        anyhow::bail!(
            "Incomplete message (need {} bytes, got {})",
            4 + msg_len,
            buf.len()
        );
    }

    let msg = rmp_serde::from_slice(&buf[4..4 + msg_len])
        .context("Failed to deserialize message")?;

    Ok((msg, 4 + msg_len))
}

/// Read a complete message from an async stream
///
/// Reads the length prefix, then reads the complete message body. Works on
/// whole streams and on split read halves alike.
pub async fn read_message<R>(stream: &mut R) -> Result<Message>
where
    R: AsyncRead + Unpin,
{
    let mut len_buf = [0u8; 4];
    stream
        .read_exact(&mut len_buf)
        .await
        .context("Failed to read message length")?;

    let msg_len = u32::from_le_bytes(len_buf) as usize;

    if msg_len > MAX_MESSAGE_BYTES {
        anyhow::bail!(
            "Message too large: {} bytes (max {})",
            msg_len,
            MAX_MESSAGE_BYTES
        );
    }

    let mut msg_buf = vec![0u8; msg_len];
    stream
        .read_exact(&mut msg_buf)
        .await
        .context("Failed to read message body")?;

    let msg = rmp_serde::from_slice(&msg_buf).context("Failed to deserialize message")?;

    Ok(msg)
}

/// Write a message to an async stream
///
/// Serializes the message with its length prefix, writes it, and flushes so
/// the peer sees it immediately.
pub async fn write_message<W>(stream: &mut W, msg: &Message) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let framed = serialize_message(msg)?;

    stream
        .write_all(&framed)
        .await
        .context("Failed to write message")?;

    stream.flush().await.context("Failed to flush stream")?;

    Ok(())
}
