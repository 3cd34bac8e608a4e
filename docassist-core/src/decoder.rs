//! Incremental decoder for chat-completion event streams.
//!
//! Bytes arrive in arbitrary chunks. They are decoded to text without
//! splitting multi-byte characters, cut into lines across chunk boundaries,
//! and each `data: ` line is parsed for `choices[0].delta.content`.
//!
//! The layers are usable on their own: [`Utf8Decoder`], [`LineBuffer`] and
//! [`parse_line`] are pure, [`SessionDecoder`] combines them synchronously,
//! and [`DeltaStream`] drives a session over an async byte stream.

use std::collections::VecDeque;
use std::error::Error as StdError;
use std::ops::ControlFlow;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Instant;

use futures::{Stream, StreamExt};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::{CoreResult, DocAssistError};
use crate::stream::{Completion, StreamEvent};
use crate::telemetry::{self, StreamTrace};

/// Prefix of lines that carry a payload.
pub const DATA_PREFIX: &str = "data: ";
/// Payload that ends the session.
pub const DONE_SENTINEL: &str = "[DONE]";

/// Incremental UTF-8 decoder.
///
/// An incomplete trailing sequence is held back until the next chunk.
/// Invalid sequences decode to U+FFFD.
#[derive(Debug, Default)]
pub struct Utf8Decoder {
    pending: Vec<u8>,
}

impl Utf8Decoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn decode(&mut self, chunk: &[u8]) -> String {
        let mut bytes = std::mem::take(&mut self.pending);
        bytes.extend_from_slice(chunk);

        let mut out = String::with_capacity(bytes.len());
        let mut rest: &[u8] = &bytes;
        loop {
            match std::str::from_utf8(rest) {
                Ok(s) => {
                    out.push_str(s);
                    break;
                }
                Err(e) => {
                    let valid = e.valid_up_to();
                    out.push_str(&String::from_utf8_lossy(&rest[..valid]));
                    match e.error_len() {
                        Some(bad) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            rest = &rest[valid + bad..];
                        }
                        // Truncated sequence at the end: wait for more bytes.
                        None => {
                            self.pending = rest[valid..].to_vec();
                            break;
                        }
                    }
                }
            }
        }
        out
    }

    /// Flush at end of input. A dangling partial sequence becomes U+FFFD.
    pub fn finish(&mut self) -> Option<char> {
        if self.pending.is_empty() {
            None
        } else {
            self.pending.clear();
            Some(char::REPLACEMENT_CHARACTER)
        }
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }
}

/// Accumulates decoded text and hands out complete lines.
///
/// Holds exactly the text after the last `\n` seen so far.
#[derive(Debug, Default)]
pub struct LineBuffer {
    buf: String,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `text` and return every line it completed, without the line
    /// terminator (`\n` or `\r\n`).
    pub fn push(&mut self, text: &str) -> Vec<String> {
        self.buf.push_str(text);
        let Some(last_nl) = self.buf.rfind('\n') else {
            return Vec::new();
        };
        let tail = self.buf.split_off(last_nl + 1);
        let complete = std::mem::replace(&mut self.buf, tail);
        complete
            .split_terminator('\n')
            .map(|l| l.strip_suffix('\r').unwrap_or(l).to_string())
            .collect()
    }

    /// Take the unterminated remainder, if any.
    pub fn take_tail(&mut self) -> Option<String> {
        let tail = std::mem::take(&mut self.buf);
        let tail = tail.strip_suffix('\r').map(str::to_string).unwrap_or(tail);
        (!tail.is_empty()).then_some(tail)
    }

    pub fn pending(&self) -> &str {
        &self.buf
    }
}

/// Classification of one candidate line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// Blank line, comment, heartbeat or any non-data field.
    Ignored,
    /// The `[DONE]` sentinel.
    Done,
    /// Non-empty content delta.
    Delta(String),
    /// Valid JSON without a usable content field.
    Empty,
    /// Payload that is not the expected JSON shape.
    Malformed,
}

// ---- Wire structs (minimal) ----
#[derive(Deserialize)]
struct ChunkEnvelope {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
}

#[derive(Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: Option<ChunkDelta>,
}

#[derive(Deserialize)]
struct ChunkDelta {
    #[serde(default)]
    content: Option<String>,
}

impl ChunkEnvelope {
    fn into_content(self) -> Option<String> {
        self.choices
            .into_iter()
            .next()
            .and_then(|c| c.delta)
            .and_then(|d| d.content)
    }
}

pub fn parse_line(line: &str) -> Frame {
    if line.trim().is_empty() {
        return Frame::Ignored;
    }
    let Some(payload) = line.strip_prefix(DATA_PREFIX) else {
        return Frame::Ignored;
    };
    if payload.trim() == DONE_SENTINEL {
        return Frame::Done;
    }
    match serde_json::from_str::<ChunkEnvelope>(payload) {
        Ok(env) => match env.into_content() {
            Some(text) if !text.is_empty() => Frame::Delta(text),
            _ => Frame::Empty,
        },
        Err(_) => Frame::Malformed,
    }
}

/// Synchronous decode session: bytes in, deltas out.
///
/// After the sentinel every further input is ignored.
#[derive(Debug, Default)]
pub struct SessionDecoder {
    utf8: Utf8Decoder,
    lines: LineBuffer,
    sentinel_seen: bool,
    closed: bool,
    malformed: u32,
}

impl SessionDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode one chunk and return the deltas it completed, in order.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<String> {
        let mut deltas = Vec::new();
        if self.closed {
            return deltas;
        }
        let text = self.utf8.decode(chunk);
        for line in self.lines.push(&text) {
            if self.process_line(&line, &mut deltas).is_break() {
                break;
            }
        }
        deltas
    }

    /// End of input: handle the last unterminated line, then close.
    pub fn finish(&mut self) -> Vec<String> {
        let mut deltas = Vec::new();
        if self.closed {
            return deltas;
        }
        if let Some(c) = self.utf8.finish() {
            let mut tmp = [0u8; 4];
            // Cannot complete a line: the replacement char is not '\n'.
            let _ = self.lines.push(c.encode_utf8(&mut tmp));
        }
        if let Some(line) = self.lines.take_tail() {
            let _ = self.process_line(&line, &mut deltas);
        }
        self.closed = true;
        deltas
    }

    pub fn sentinel_seen(&self) -> bool {
        self.sentinel_seen
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn malformed_frames(&self) -> u32 {
        self.malformed
    }

    fn process_line(&mut self, line: &str, out: &mut Vec<String>) -> ControlFlow<()> {
        match parse_line(line) {
            Frame::Ignored => {}
            Frame::Done => {
                self.sentinel_seen = true;
                self.closed = true;
                // Remaining buffered text is never looked at.
                self.lines = LineBuffer::new();
                return ControlFlow::Break(());
            }
            Frame::Delta(text) => out.push(text),
            Frame::Empty => debug!("data frame without content"),
            Frame::Malformed => {
                self.malformed += 1;
                debug!(frame = %preview(line), "skipping malformed data frame");
            }
        }
        ControlFlow::Continue(())
    }
}

fn preview(s: &str) -> &str {
    const MAX: usize = 120;
    if s.len() <= MAX {
        return s;
    }
    let mut end = MAX;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// Event stream over a raw body.
///
/// Yields `Delta`s in arrival order followed by exactly one terminal event,
/// then `None`. The body is dropped as soon as the terminal event is queued,
/// which releases the connection; dropping the `DeltaStream` early cancels.
pub struct DeltaStream<S> {
    inner: Option<S>,
    decoder: SessionDecoder,
    pending: VecDeque<StreamEvent>,
    span: tracing::Span,
    trace: Option<StreamTrace>,
    started: Instant,
    deltas: u32,
    chars: u64,
}

impl<S> DeltaStream<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner: Some(inner),
            decoder: SessionDecoder::new(),
            pending: VecDeque::new(),
            span: tracing::Span::none(),
            trace: None,
            started: Instant::now(),
            deltas: 0,
            chars: 0,
        }
    }

    /// Enter `span` whenever the stream is polled.
    pub fn with_span(mut self, span: tracing::Span) -> Self {
        self.span = span;
        self
    }

    /// Fill and emit `trace` to the telemetry sink when the session ends.
    pub fn with_trace(mut self, trace: StreamTrace) -> Self {
        self.trace = Some(trace);
        self
    }

    fn push_deltas(&mut self, deltas: Vec<String>) {
        for d in deltas {
            self.deltas += 1;
            self.chars += d.chars().count() as u64;
            self.pending.push_back(StreamEvent::Delta(d));
        }
    }

    fn terminate(&mut self, event: StreamEvent) {
        self.inner = None;
        let latency_ms = self.started.elapsed().as_millis() as u64;
        match &event {
            StreamEvent::Done(how) => {
                debug!(outcome = how.as_str(), deltas = self.deltas, latency_ms, "stream closed")
            }
            StreamEvent::Error(err) => {
                warn!(error = %err, deltas = self.deltas, latency_ms, "stream aborted")
            }
            StreamEvent::Delta(_) => {}
        }
        if let Some(mut trace) = self.trace.take() {
            trace.deltas = self.deltas;
            trace.chars = self.chars;
            trace.malformed_frames = self.decoder.malformed_frames();
            trace.latency_ms = Some(latency_ms);
            match &event {
                StreamEvent::Done(how) => trace.outcome = Some(how.as_str().to_string()),
                StreamEvent::Error(err) => {
                    trace.outcome = Some("error".to_string());
                    trace.error_kind = Some(err.kind().to_string());
                    trace.error_message = Some(err.to_string());
                }
                StreamEvent::Delta(_) => {}
            }
            telemetry::emit(trace);
        }
        self.pending.push_back(event);
    }
}

impl<S, B, E> Stream for DeltaStream<S>
where
    S: Stream<Item = Result<B, E>> + Unpin,
    B: AsRef<[u8]>,
    E: StdError,
{
    type Item = StreamEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = &mut *self;
        let span = this.span.clone();
        let _enter = span.enter();
        loop {
            if let Some(ev) = this.pending.pop_front() {
                return Poll::Ready(Some(ev));
            }
            let Some(inner) = this.inner.as_mut() else {
                return Poll::Ready(None);
            };
            match inner.poll_next_unpin(cx) {
                Poll::Ready(Some(Ok(chunk))) => {
                    let deltas = this.decoder.feed(chunk.as_ref());
                    this.push_deltas(deltas);
                    if this.decoder.sentinel_seen() {
                        this.terminate(StreamEvent::Done(Completion::Sentinel));
                    }
                }
                Poll::Ready(Some(Err(e))) => {
                    this.terminate(StreamEvent::Error(DocAssistError::Transport {
                        message: error_chain(&e),
                    }));
                }
                Poll::Ready(None) => {
                    let deltas = this.decoder.finish();
                    this.push_deltas(deltas);
                    let how = if this.decoder.sentinel_seen() {
                        Completion::Sentinel
                    } else {
                        Completion::EndOfStream
                    };
                    this.terminate(StreamEvent::Done(how));
                }
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

/// `outer: cause: root cause`. Sources already spelled out by their parent are skipped.
fn error_chain(err: &dyn StdError) -> String {
    let mut msg = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !msg.contains(&text) {
            msg.push_str(": ");
            msg.push_str(&text);
        }
        source = cause.source();
    }
    msg
}

/// Drive `events` to the end, calling `on_delta` once per delta in order.
///
/// The return value is the single terminal signal: `Ok` for a clean close,
/// `Err` when the session aborted. A stream that ends without any terminal
/// event counts as [`Completion::EndOfStream`].
pub async fn drain_into<S, F>(mut events: S, mut on_delta: F) -> CoreResult<Completion>
where
    S: Stream<Item = StreamEvent> + Unpin,
    F: FnMut(&str),
{
    while let Some(ev) = events.next().await {
        match ev {
            StreamEvent::Delta(text) => on_delta(&text),
            StreamEvent::Done(how) => return Ok(how),
            StreamEvent::Error(err) => return Err(err),
        }
    }
    Ok(Completion::EndOfStream)
}
