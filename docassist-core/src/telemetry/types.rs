use serde::{Deserialize, Serialize};

/// Summary of one finished streaming session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct StreamTrace {
    /// Provider identifier, e.g. "openai", "null".
    pub provider: Option<String>,
    /// Model identifier sent in the request.
    pub model: Option<String>,

    /// Number of non-empty deltas delivered.
    pub deltas: u32,
    /// Total characters delivered across all deltas.
    pub chars: u64,
    /// Data frames that were skipped because their JSON did not parse.
    pub malformed_frames: u32,

    /// "sentinel", "eof" or "error".
    pub outcome: Option<String>,
    pub error_kind: Option<String>,
    pub error_message: Option<String>,

    /// Time from stream open to terminal event.
    pub latency_ms: Option<u64>,
}

impl StreamTrace {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn provider(mut self, provider: &str) -> Self {
        self.provider = Some(provider.to_string());
        self
    }
    pub fn model(mut self, model: &str) -> Self {
        self.model = Some(model.to_string());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn stream_trace_serializes() {
        let mut trace = StreamTrace::new().provider("openai").model("gpt-3.5-turbo");
        trace.deltas = 3;
        trace.outcome = Some("sentinel".into());

        let as_json = serde_json::to_value(&trace).unwrap();
        assert_eq!(as_json["provider"], json!("openai"));
        assert_eq!(as_json["model"], json!("gpt-3.5-turbo"));
        assert_eq!(as_json["deltas"], json!(3));
        assert_eq!(as_json["outcome"], json!("sentinel"));
        assert_eq!(as_json["error_kind"], json!(null));
    }
}
