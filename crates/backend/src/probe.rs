//! Canonical minimal probe requests
//!
//! A probe is the smallest generation request a backend will accept, used
//! solely to assess reachability and credential validity. The body shape
//! follows the protocol family; the prompt and token cap are fixed so a
//! probe costs next to nothing.

use serde_json::{Value, json};

use crate::config::ProtocolKind;

/// Fixed probe prompt.
const PROBE_PROMPT: &str = "Say OK";

/// Token cap for probe responses.
const PROBE_MAX_TOKENS: u32 = 10;

/// Build the minimal canonical request for the given protocol family.
///
/// Gemini puts the model in the URL, so its body carries no `model` field;
/// the other families embed it.
pub fn probe_request(protocol: ProtocolKind, model: &str) -> Value {
    match protocol {
        ProtocolKind::Gemini => json!({
            "contents": [{"role": "user", "parts": [{"text": PROBE_PROMPT}]}],
            "generationConfig": {"maxOutputTokens": PROBE_MAX_TOKENS}
        }),
        ProtocolKind::OpenAiResponses => json!({
            "model": model,
            "input": [{
                "type": "message",
                "role": "user",
                "content": [{"type": "input_text", "text": PROBE_PROMPT}]
            }],
            "max_output_tokens": PROBE_MAX_TOKENS
        }),
        ProtocolKind::OpenAiChat => json!({
            "model": model,
            "messages": [{"role": "user", "content": PROBE_PROMPT}],
            "max_tokens": PROBE_MAX_TOKENS
        }),
        ProtocolKind::Claude => json!({
            "model": model,
            "messages": [{"role": "user", "content": PROBE_PROMPT}],
            "max_tokens": PROBE_MAX_TOKENS
        }),
    }
}
