//! Request construction: turns document text plus a task instruction into a
//! streaming chat-completion envelope.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::ClientSettings;
use crate::model::{ChatMessage, ChatRequest, CompletionParams};

// A CRLF pair is one line break and becomes one space.
static BREAKING_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"\r\n|\n|\r|\t|""#).expect("static pattern compiles"));

/// Replace line breaks, tabs and double quotes with a single space each.
///
/// Lossy and one-way; the original formatting cannot be recovered.
pub fn sanitize(s: &str) -> String {
    BREAKING_CHARS.replace_all(s, " ").into_owned()
}

/// Sanitize document content and make sure it ends with a period.
pub fn normalize_content(content: &str) -> String {
    let mut out = sanitize(content);
    if !out.ends_with('.') {
        out.push('.');
    }
    out
}

fn quoted(s: &str) -> String {
    format!("\"{s}\"")
}

/// Build the two-message envelope (system instruction, user content).
///
/// An empty instruction still produces a system message.
pub fn build_request(
    content: &str,
    instruction: &str,
    settings: &ClientSettings,
    params: &CompletionParams,
) -> ChatRequest {
    let content = normalize_content(content);
    let instruction = sanitize(instruction);
    ChatRequest {
        model: settings.model.clone(),
        messages: vec![
            ChatMessage::system(quoted(&instruction)),
            ChatMessage::user(quoted(&content)),
        ],
        stream: true,
        params: params.clone(),
    }
}
