use async_trait::async_trait;
use futures::StreamExt;
use secrecy::ExposeSecret;
use tracing_futures::Instrument;

use crate::config::{ClientSettings, HttpCfg};
use crate::decoder::DeltaStream;
use crate::error::CoreResult;
use crate::http_client::HttpClient;
use crate::model::ChatRequest;
use crate::provider::StreamingProvider;
use crate::stream::BoxStreamEv;
use crate::telemetry::StreamTrace;

/// Streaming client for OpenAI-compatible `/v1/chat/completions` endpoints.
///
/// Cheap to clone; clones share the connection pool.
#[derive(Debug, Clone)]
pub struct ChatClient {
    http: HttpClient,
    settings: ClientSettings,
    name: String, // usually "openai"
}

impl ChatClient {
    pub fn new(http: HttpClient, settings: ClientSettings) -> Self {
        Self {
            http,
            settings,
            name: "openai".into(),
        }
    }

    pub fn from_settings(settings: ClientSettings, http_cfg: &HttpCfg) -> CoreResult<Self> {
        Ok(Self::new(HttpClient::new(http_cfg)?, settings))
    }

    #[cfg(test)]
    pub fn new_for_tests(server_base: &str) -> Self {
        ChatClient::new(
            HttpClient::new_default().unwrap(),
            ClientSettings::new("test-key", Some(server_base), None),
        )
    }

    pub fn settings(&self) -> &ClientSettings {
        &self.settings
    }

    fn headers(&self) -> Vec<(String, String)> {
        vec![
            (
                "Authorization".to_string(),
                format!("Bearer {}", self.settings.api_key.expose_secret()),
            ),
            ("Content-Type".to_string(), "application/json".to_string()),
        ]
    }
}

#[async_trait]
impl StreamingProvider for ChatClient {
    fn name(&self) -> &str {
        &self.name
    }

    async fn open_stream(&self, mut req: ChatRequest) -> CoreResult<BoxStreamEv> {
        req.stream = true;
        let span = tracing::info_span!(
            "chat_stream",
            llm.provider = %self.name,
            llm.model = %req.model,
        );

        let owned_headers = self.headers();
        let hdrs: Vec<(&str, &str)> = owned_headers
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        let resp = self
            .http
            .post_stream(&self.name, &self.settings.endpoint, &req, &hdrs)
            .instrument(span.clone())
            .await?;

        if let Some(rid) = &resp.provider_request_id {
            span.in_scope(|| tracing::debug!(provider_request_id = %rid, "stream opened"));
        }

        let trace = StreamTrace::new().provider(&self.name).model(&req.model);
        Ok(DeltaStream::new(resp.body)
            .with_span(span)
            .with_trace(trace)
            .boxed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::Method::POST;
    use httpmock::MockServer;
    use std::io::{Read, Write};
    use std::net::{TcpListener, TcpStream};
    use std::thread;
    use std::time::Duration;

    use crate::decoder::drain_into;
    use crate::error::DocAssistError;
    use crate::model::{ChatMessage, CompletionParams};
    use crate::request::build_request;
    use crate::stream::Completion;

    const SSE_OK: &str = "data: {\"choices\":[{\"delta\":{\"content\":\"Hi\"}}]}\n\n\
                          data: {\"choices\":[{\"delta\":{\"content\":\"!\"}}]}\n\n\
                          data: [DONE]\n\n";

    fn simple_req() -> ChatRequest {
        ChatRequest {
            model: "gpt-3.5-turbo".into(),
            messages: vec![ChatMessage::system("\"\""), ChatMessage::user("\"Hi.\"")],
            stream: true,
            params: CompletionParams::default(),
        }
    }

    #[tokio::test]
    async fn streams_deltas_and_sends_headers() {
        let server = MockServer::start();
        let client = ChatClient::new_for_tests(&server.base_url());

        let m = server.mock(|when, then| {
            when.method(POST)
                .path("/v1/chat/completions")
                .header("authorization", "Bearer test-key")
                .header("content-type", "application/json")
                .body_contains("\"stream\":true")
                .body_contains("\"model\":\"gpt-3.5-turbo\"");
            then.status(200)
                .header("content-type", "text/event-stream")
                .body(SSE_OK);
        });

        let events = client.open_stream(simple_req()).await.expect("stream ok");
        let mut got = Vec::new();
        let end = drain_into(events, |d| got.push(d.to_string())).await;
        assert_eq!(got, vec!["Hi", "!"]);
        assert_eq!(end.unwrap(), Completion::Sentinel);
        m.assert();
    }

    #[tokio::test]
    async fn normalized_content_reaches_body() {
        let server = MockServer::start();
        let client = ChatClient::new_for_tests(&server.base_url());

        let m = server.mock(|when, then| {
            when.method(POST)
                .path("/v1/chat/completions")
                .body_contains(r#"{"role":"system","content":"\"\""}"#)
                .body_contains(r#"{"role":"user","content":"\"Hello world  quoted .\""}"#);
            then.status(200).body("data: [DONE]\n");
        });

        let req = build_request(
            "Hello\nworld\t\"quoted\"",
            "",
            client.settings(),
            &CompletionParams::default(),
        );
        let events = client.open_stream(req).await.expect("stream ok");
        let end = drain_into(events, |_| {}).await.unwrap();
        assert_eq!(end, Completion::Sentinel);
        m.assert();
    }

    #[tokio::test]
    async fn stream_forced_on() {
        let server = MockServer::start();
        let client = ChatClient::new_for_tests(&server.base_url());
        let m = server.mock(|when, then| {
            when.method(POST).path("/v1/chat/completions").body_contains("\"stream\":true");
            then.status(200).body("");
        });
        let mut req = simple_req();
        req.stream = false;
        let events = client.open_stream(req).await.expect("stream ok");
        let end = drain_into(events, |_| {}).await.unwrap();
        assert_eq!(end, Completion::EndOfStream);
        m.assert();
    }

    #[tokio::test]
    async fn malformed_frames_do_not_abort() {
        let server = MockServer::start();
        let client = ChatClient::new_for_tests(&server.base_url());
        let body = "data: {\"choices\":[{\"delta\":{\"content\":\"a\"}}]}\n\
                    data: {not valid json\n\
                    : keep-alive\n\
                    data: {\"choices\":[{\"delta\":{}}]}\n\
                    data: {\"choices\":[{\"delta\":{\"content\":\"b\"}}]}\n";
        let _m = server.mock(|when, then| {
            when.method(POST).path("/v1/chat/completions");
            then.status(200).body(body);
        });
        let events = client.open_stream(simple_req()).await.unwrap();
        let mut text = String::new();
        let end = drain_into(events, |d| text.push_str(d)).await.unwrap();
        assert_eq!(text, "ab");
        assert_eq!(end, Completion::EndOfStream);
    }

    #[tokio::test]
    async fn status_401_is_provider_error() {
        let server = MockServer::start();
        let client = ChatClient::new_for_tests(&server.base_url());
        let _m = server.mock(|when, then| {
            when.method(POST).path("/v1/chat/completions");
            then.status(401).body("{\"error\":\"invalid key\"}");
        });
        let err = client.open_stream(simple_req()).await.err().expect("should fail");
        match err {
            DocAssistError::ProviderError {
                provider,
                code,
                message,
            } => {
                assert_eq!(provider, "openai");
                assert_eq!(code, "401");
                assert!(message.contains("invalid key"));
            }
            other => panic!("expected ProviderError, got: {:?}", other),
        }
    }

    #[tokio::test]
    async fn status_429_is_rate_limited() {
        let server = MockServer::start();
        let client = ChatClient::new_for_tests(&server.base_url());
        let _m = server.mock(|when, then| {
            when.method(POST).path("/v1/chat/completions");
            then.status(429).header("Retry-After", "2").body("limit");
        });
        let err = client.open_stream(simple_req()).await.err().expect("should fail");
        match err {
            DocAssistError::RateLimited { retry_after, .. } => assert_eq!(retry_after, Some(2)),
            other => panic!("expected RateLimited, got: {:?}", other),
        }
    }

    #[tokio::test]
    async fn session_span_carries_provider_and_model() {
        use crate::telemetry::test_span::install_capture;
        use crate::telemetry::{KEY_MODEL, KEY_PROVIDER};

        let (store, _guard) = install_capture();
        let server = MockServer::start();
        let client = ChatClient::new_for_tests(&server.base_url());
        let _m = server.mock(|when, then| {
            when.method(POST).path("/v1/chat/completions");
            then.status(200).body(SSE_OK);
        });
        let events = client.open_stream(simple_req()).await.unwrap();
        drain_into(events, |_| {}).await.unwrap();

        let fields = store.fields_of("chat_stream").expect("span captured");
        assert_eq!(fields.get(KEY_PROVIDER).map(String::as_str), Some("openai"));
        assert_eq!(fields.get(KEY_MODEL).map(String::as_str), Some("gpt-3.5-turbo"));
    }

    /// Serve one connection, writing each frame after its delay, then close.
    fn trickle_server(frames: Vec<(Duration, String)>) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        thread::spawn(move || {
            let (mut sock, _) = listener.accept().unwrap();
            read_request(&mut sock);
            let head = "HTTP/1.1 200 OK\r\n\
                        content-type: text/event-stream\r\n\
                        connection: close\r\n\r\n";
            if sock.write_all(head.as_bytes()).is_err() {
                return;
            }
            for (delay, frame) in frames {
                thread::sleep(delay);
                if sock.write_all(frame.as_bytes()).and_then(|_| sock.flush()).is_err() {
                    return;
                }
            }
        });
        format!("http://{addr}")
    }

    fn read_request(sock: &mut TcpStream) {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let n = sock.read(&mut chunk).unwrap_or(0);
            if n == 0 {
                return;
            }
            buf.extend_from_slice(&chunk[..n]);
            let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") else {
                continue;
            };
            let head = String::from_utf8_lossy(&buf[..end]).to_ascii_lowercase();
            let len = head
                .lines()
                .find_map(|l| l.strip_prefix("content-length:"))
                .and_then(|v| v.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if buf.len() >= end + 4 + len {
                return;
            }
        }
    }

    fn client_with(base: &str, http: HttpCfg) -> ChatClient {
        let settings = ClientSettings::new("test-key", Some(base), None);
        ChatClient::from_settings(settings, &http).unwrap()
    }

    #[tokio::test]
    async fn slow_steady_stream_outlives_read_timeout() {
        let mut frames: Vec<(Duration, String)> = (0..8)
            .map(|i| {
                let frame = format!("data: {{\"choices\":[{{\"delta\":{{\"content\":\"t{i} \"}}}}]}}\n\n");
                (Duration::from_millis(150), frame)
            })
            .collect();
        frames.push((Duration::from_millis(150), "data: [DONE]\n\n".to_string()));
        let base = trickle_server(frames);

        // Each gap is well under the idle bound; the whole body takes longer than it.
        let http = HttpCfg {
            read_timeout_ms: 500,
            ..HttpCfg::default()
        };
        let client = client_with(&base, http);
        let events = client.open_stream(simple_req()).await.expect("stream ok");
        let mut got = Vec::new();
        let end = drain_into(events, |d| got.push(d.to_string())).await;
        assert_eq!(got.len(), 8);
        assert_eq!(got[7], "t7 ");
        assert_eq!(end.unwrap(), Completion::Sentinel);
    }

    #[tokio::test]
    async fn stalled_stream_ends_with_timeout_cause() {
        let frames = vec![
            (
                Duration::ZERO,
                "data: {\"choices\":[{\"delta\":{\"content\":\"a\"}}]}\n\n".to_string(),
            ),
            (Duration::from_millis(1_500), "data: [DONE]\n\n".to_string()),
        ];
        let base = trickle_server(frames);
        let http = HttpCfg {
            read_timeout_ms: 200,
            ..HttpCfg::default()
        };
        let client = client_with(&base, http);
        let events = client.open_stream(simple_req()).await.expect("stream ok");
        let mut got = Vec::new();
        let end = drain_into(events, |d| got.push(d.to_string())).await;
        assert_eq!(got, vec!["a"]);
        match end {
            Err(DocAssistError::Transport { message }) => {
                assert!(message.contains("timed out"), "message: {message}")
            }
            other => panic!("expected transport error, got: {:?}", other),
        }
    }

    #[tokio::test]
    async fn network_error_maps_to_unavailable() {
        let client = ChatClient::new_for_tests("http://127.0.0.1:9");
        let err = client.open_stream(simple_req()).await.err().expect("should fail");
        assert!(matches!(err, DocAssistError::ProviderUnavailable { .. }));
    }
}
