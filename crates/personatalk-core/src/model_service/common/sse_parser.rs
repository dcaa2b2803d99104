//! Decoder for OpenAI-style `data:` event streams.
//!
//! The body arrives in arbitrary byte chunks. Bytes are buffered until a
//! newline, then each complete line is handled on its own:
//!
//! - `data: [DONE]` ends the stream
//! - `data: {json}` becomes a [`StreamChunk`]
//! - anything else (comments, `event:` lines, blank keep-alives) is ignored
//!
//! A frame that is not UTF-8 or not a JSON object is logged, counted in
//! [`DecodeStats`] and skipped; it never ends the stream. The same goes for a
//! line longer than [`MAX_LINE_BYTES`]. A read error ends the stream after
//! one `Err` item.

use bytes::{Bytes, BytesMut};
use futures::{Stream, StreamExt};
use personatalk_types::{DecodeError, ServiceError, StreamChunk};
use serde_json::Value;
use std::fmt::Display;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::model_service::ChunkStream;

const DATA_PREFIX: &str = "data: ";
const DONE_MARKER: &str = "[DONE]";
/// Longest line kept in memory; longer lines are dropped as bad frames.
pub const MAX_LINE_BYTES: usize = 1024 * 1024;

/// What a single line decoded to.
#[derive(Debug, Clone, PartialEq)]
pub enum SseFrame {
    Data(Value),
    Done,
    Ignored,
}

/// Decode one line (with or without its line terminator).
pub fn decode_line(line: &[u8]) -> Result<SseFrame, DecodeError> {
    let text = std::str::from_utf8(line).map_err(|e| DecodeError::Utf8(e.to_string()))?;
    let text = text.trim();

    let Some(payload) = text.strip_prefix(DATA_PREFIX) else {
        return Ok(SseFrame::Ignored);
    };
    let payload = payload.trim();
    if payload == DONE_MARKER {
        return Ok(SseFrame::Done);
    }

    let value: Value = serde_json::from_str(payload).map_err(|e| DecodeError::Json(e.to_string()))?;
    if !value.is_object() {
        return Err(DecodeError::Json(format!("expected a JSON object, got: {}", payload)));
    }
    Ok(SseFrame::Data(value))
}

/// Splits a byte stream into lines on `\n`.
#[derive(Debug)]
pub struct LineBuffer {
    buffer: BytesMut,
    max_line: usize,
    /// Inside an over-long line; bytes are dropped up to the next `\n`.
    discarding: bool,
}

impl Default for LineBuffer {
    fn default() -> Self {
        Self::with_max_line(MAX_LINE_BYTES)
    }
}

impl LineBuffer {
    pub fn with_max_line(max_line: usize) -> Self {
        Self { buffer: BytesMut::new(), max_line, discarding: false }
    }

    /// Append received bytes. Returns `true` when an unterminated line grew
    /// past the limit and was dropped.
    pub fn extend(&mut self, mut bytes: &[u8]) -> bool {
        if self.discarding {
            let Some(pos) = bytes.iter().position(|&b| b == b'\n') else {
                return false;
            };
            self.discarding = false;
            bytes = &bytes[pos + 1..];
        }
        self.buffer.extend_from_slice(bytes);

        let tail_start = self.buffer.iter().rposition(|&b| b == b'\n').map_or(0, |pos| pos + 1);
        if self.buffer.len() - tail_start > self.max_line {
            self.buffer.truncate(tail_start);
            self.discarding = true;
            return true;
        }
        false
    }

    /// Next complete line including its `\n`.
    pub fn next_line(&mut self) -> Option<BytesMut> {
        let pos = self.buffer.iter().position(|&b| b == b'\n')?;
        Some(self.buffer.split_to(pos + 1))
    }

    /// Whatever is left once the body has ended.
    pub fn take_remainder(&mut self) -> Option<BytesMut> {
        if self.buffer.is_empty() {
            None
        } else {
            Some(self.buffer.split())
        }
    }
}

/// Frame counters shared between a service and the streams it opens.
#[derive(Debug, Clone, Default)]
pub struct DecodeStats {
    inner: Arc<StatsInner>,
}

#[derive(Debug, Default)]
struct StatsInner {
    chunks: AtomicU64,
    skipped: AtomicU64,
}

impl DecodeStats {
    pub fn chunks(&self) -> u64 {
        self.inner.chunks.load(Ordering::Relaxed)
    }

    /// Frames dropped because they failed to decode.
    pub fn skipped(&self) -> u64 {
        self.inner.skipped.load(Ordering::Relaxed)
    }

    fn record_chunk(&self) {
        self.inner.chunks.fetch_add(1, Ordering::Relaxed);
    }

    fn record_skip(&self) {
        self.inner.skipped.fetch_add(1, Ordering::Relaxed);
    }
}

enum LineOutcome {
    Chunk(StreamChunk),
    Done,
    Skip,
}

fn handle_line(line: &[u8], model: &str, stats: &DecodeStats) -> LineOutcome {
    if line.len() > MAX_LINE_BYTES {
        stats.record_skip();
        tracing::warn!("[SSE] Skipping frame of {} bytes (limit {})", line.len(), MAX_LINE_BYTES);
        return LineOutcome::Skip;
    }
    match decode_line(line) {
        Ok(SseFrame::Data(value)) => {
            stats.record_chunk();
            LineOutcome::Chunk(StreamChunk::from_provider(&value, model))
        },
        Ok(SseFrame::Done) => LineOutcome::Done,
        Ok(SseFrame::Ignored) => LineOutcome::Skip,
        Err(e) => {
            stats.record_skip();
            tracing::warn!("[SSE] Skipping undecodable frame: {}", e);
            LineOutcome::Skip
        },
    }
}

/// Turn a raw response body into a stream of chunks.
///
/// `idle_timeout` bounds the wait for each read; a stalled provider ends the
/// stream with an error instead of hanging the consumer. Dropping the
/// returned stream drops the body and closes the connection.
pub fn decode_chunk_stream<S, E>(
    byte_stream: S,
    model: String,
    idle_timeout: Option<Duration>,
    stats: DecodeStats,
) -> ChunkStream
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: Display + Send + 'static,
{
    let stream = async_stream::stream! {
        let mut byte_stream = Box::pin(byte_stream);
        let mut lines = LineBuffer::default();

        'read: loop {
            let next = match idle_timeout {
                Some(limit) => match tokio::time::timeout(limit, byte_stream.next()).await {
                    Ok(item) => item,
                    Err(_) => {
                        tracing::warn!("[SSE] No data for {:?}, closing stream", limit);
                        yield Err(ServiceError::Stream {
                            message: format!("no data received for {}s", limit.as_secs()),
                        });
                        break 'read;
                    },
                },
                None => byte_stream.next().await,
            };

            match next {
                Some(Ok(bytes)) => {
                    if lines.extend(&bytes) {
                        stats.record_skip();
                        tracing::warn!("[SSE] Dropping line longer than {} bytes", MAX_LINE_BYTES);
                    }
                    while let Some(line) = lines.next_line() {
                        match handle_line(&line, &model, &stats) {
                            LineOutcome::Chunk(chunk) => yield Ok(chunk),
                            LineOutcome::Done => break 'read,
                            LineOutcome::Skip => {},
                        }
                    }
                },
                Some(Err(e)) => {
                    tracing::error!("[SSE] Stream read failed: {}", e);
                    yield Err(ServiceError::Stream { message: e.to_string() });
                    break 'read;
                },
                None => {
                    if let Some(rest) = lines.take_remainder() {
                        if let LineOutcome::Chunk(chunk) = handle_line(&rest, &model, &stats) {
                            yield Ok(chunk);
                        }
                    }
                    break 'read;
                },
            }
        }
    };

    Box::pin(stream)
}
