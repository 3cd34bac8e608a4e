//! Streaming primitives exposed by docassist.
//!
//! Contract:
//! - A session emits 0..n `Delta` events, each non-empty, in upstream order.
//! - The stream **must** terminate with exactly one terminal event: `Done` or `Error`.
//! - After a terminal event, no further events are emitted.
//!
//! `StreamEvent` is not `Clone`/`PartialEq` because `Error` carries `DocAssistError`.

use crate::error::DocAssistError;

/// How a session ended cleanly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// The upstream sent the `[DONE]` sentinel.
    Sentinel,
    /// The body closed without a sentinel. Some servers do this on a clean close.
    EndOfStream,
}

impl Completion {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sentinel => "sentinel",
            Self::EndOfStream => "eof",
        }
    }
}

/// What the caller receives incrementally.
#[non_exhaustive]
#[derive(Debug)]
pub enum StreamEvent {
    /// Partial assistant text. Never empty.
    Delta(String),
    /// Clean completion.
    Done(Completion),
    /// Transport failure; the stream ends after this.
    Error(DocAssistError),
}

impl StreamEvent {
    /// Returns true if this event terminates the stream (`Done` or `Error`).
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done(_) | Self::Error(_))
    }

    /// Convenience accessor for `Delta` contents.
    pub fn as_text_delta(&self) -> Option<&str> {
        match self {
            Self::Delta(s) => Some(s.as_str()),
            _ => None,
        }
    }
}

/// Boxed stream of streaming events. Providers return this.
pub type BoxStreamEv = futures::stream::BoxStream<'static, StreamEvent>;
