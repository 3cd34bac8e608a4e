use std::sync::Arc;

use tracing_futures::Instrument;

use crate::config::ClientSettings;
use crate::decoder::drain_into;
use crate::error::CoreResult;
use crate::model::CompletionParams;
use crate::provider::StreamingProvider;
use crate::request::build_request;
use crate::stream::Completion;
use crate::tasks::Task;

/// Runs document tasks against a streaming provider.
///
/// Every call builds its own request and owns its own decode session, so
/// concurrent calls on one `Assistant` share nothing but the provider.
#[derive(Clone)]
pub struct Assistant {
    provider: Arc<dyn StreamingProvider>,
    settings: ClientSettings,
    params: CompletionParams,
}

impl Assistant {
    pub fn new(provider: Arc<dyn StreamingProvider>, settings: ClientSettings) -> Self {
        Self {
            provider,
            settings,
            params: CompletionParams::default(),
        }
    }

    pub fn with_params(mut self, params: CompletionParams) -> Self {
        self.params = params;
        self
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Run `task` over `content`, calling `on_delta` for each text fragment.
    pub async fn run<F>(&self, task: Task, content: &str, on_delta: F) -> CoreResult<Completion>
    where
        F: FnMut(&str),
    {
        let span = tracing::info_span!("task", task = task.name());
        self.send(content, task.instruction(), on_delta)
            .instrument(span)
            .await
    }

    /// Send `content` with an arbitrary instruction.
    ///
    /// Returns once the stream has ended; the result is the terminal signal.
    pub async fn send<F>(&self, content: &str, instruction: &str, on_delta: F) -> CoreResult<Completion>
    where
        F: FnMut(&str),
    {
        let req = build_request(content, instruction, &self.settings, &self.params);
        let events = self.provider.open_stream(req).await?;
        drain_into(events, on_delta).await
    }

    /// Run `task` and collect the whole answer.
    pub async fn run_to_string(&self, task: Task, content: &str) -> CoreResult<String> {
        let mut out = String::new();
        self.run(task, content, |d| out.push_str(d)).await?;
        Ok(out)
    }
}
