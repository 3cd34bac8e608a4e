use async_trait::async_trait;
use futures::StreamExt;

use crate::error::CoreResult;
use crate::model::ChatRequest;
use crate::stream::{BoxStreamEv, Completion, StreamEvent};

/// Anything that can turn a request into an ordered stream of events.
///
/// Errors that happen before the first byte (connection refused, non-2xx)
/// are returned from `open_stream`; failures after that arrive as the
/// stream's terminal `StreamEvent::Error`.
#[async_trait]
pub trait StreamingProvider: Send + Sync {
    fn name(&self) -> &str;
    async fn open_stream(&self, req: ChatRequest) -> CoreResult<BoxStreamEv>;
}

/// A provider that answers without any network access.
/// Used by the CLI when no key is configured, and in tests.
pub struct NullProvider;

#[async_trait]
impl StreamingProvider for NullProvider {
    fn name(&self) -> &str {
        "null"
    }

    async fn open_stream(&self, req: ChatRequest) -> CoreResult<BoxStreamEv> {
        let chars: usize = req.messages.iter().map(|m| m.content.chars().count()).sum();
        let events = vec![
            StreamEvent::Delta("[null provider response]".into()),
            StreamEvent::Delta(format!(" ({chars} chars received)")),
            StreamEvent::Done(Completion::EndOfStream),
        ];
        Ok(futures::stream::iter(events).boxed())
    }
}
