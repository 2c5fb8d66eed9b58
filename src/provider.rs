//! Provider adapters for the supported API dialects.
//!
//! A provider knows how to authenticate, how to shape the streaming
//! completion request, and how to pull content deltas and terminal
//! markers out of decoded frames. Everything else in the benchmark
//! is dialect-agnostic.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// API dialect spoken by a target endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    #[default]
    OpenAI,
    Claude,
    Azure,
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Provider::OpenAI => write!(f, "openai"),
            Provider::Claude => write!(f, "claude"),
            Provider::Azure => write!(f, "azure"),
        }
    }
}

impl std::str::FromStr for Provider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "openai" => Ok(Provider::OpenAI),
            "claude" => Ok(Provider::Claude),
            "azure" => Ok(Provider::Azure),
            _ => Err(format!(
                "Unknown API type: {} (supported: openai, claude, azure)",
                s
            )),
        }
    }
}

impl Provider {
    /// Authentication and dialect headers for one request.
    /// Content-Type is set by the JSON body builder.
    pub fn headers(&self, api_key: &str) -> Vec<(&'static str, String)> {
        match self {
            Provider::OpenAI => vec![("Authorization", format!("Bearer {}", api_key))],
            Provider::Claude => vec![
                ("x-api-key", api_key.to_string()),
                ("anthropic-version", "2023-06-01".to_string()),
            ],
            Provider::Azure => vec![("api-key", api_key.to_string())],
        }
    }

    /// Build the streaming chat request body
    pub fn build_payload(&self, model: &str, prompt: &str) -> Value {
        match self {
            Provider::OpenAI => json!({
                "model": model,
                "messages": [{"role": "user", "content": prompt}],
                "stream": true
            }),
            Provider::Claude => json!({
                "model": model,
                "max_tokens": 1024,
                "messages": [{"role": "user", "content": prompt}],
                "stream": true
            }),
            // Azure encodes the deployment in the URL, not the body
            Provider::Azure => json!({
                "messages": [{"role": "user", "content": prompt}],
                "stream": true
            }),
        }
    }

    /// Extract the incremental content delta from one decoded frame.
    ///
    /// Returns `None` for frames that carry no text (role-only deltas,
    /// ping events, usage metadata). Empty strings are not deltas.
    pub fn extract_delta(&self, frame: &Value) -> Option<String> {
        let text = match self {
            Provider::OpenAI | Provider::Azure => frame
                .get("choices")?
                .get(0)?
                .get("delta")?
                .get("content")?
                .as_str()?,
            Provider::Claude => {
                if frame.get("type").and_then(|v| v.as_str()) != Some("content_block_delta") {
                    return None;
                }
                frame.get("delta")?.get("text")?.as_str()?
            }
        };

        if text.is_empty() {
            None
        } else {
            Some(text.to_string())
        }
    }

    /// Whether a decoded frame is this dialect's terminal event.
    ///
    /// OpenAI-style streams terminate with the literal `[DONE]` sentinel,
    /// which the frame decoder recognizes before JSON parsing; only the
    /// Anthropic dialect signals termination inside a JSON frame.
    pub fn is_terminal(&self, frame: &Value) -> bool {
        match self {
            Provider::OpenAI | Provider::Azure => false,
            Provider::Claude => {
                frame.get("type").and_then(|v| v.as_str()) == Some("message_stop")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openai_payload() {
        let body = Provider::OpenAI.build_payload("gpt-4o-mini", "hello");
        assert_eq!(body["model"], "gpt-4o-mini");
        assert_eq!(body["stream"], true);
        assert_eq!(body["messages"][0]["content"], "hello");
    }

    #[test]
    fn test_claude_payload_has_max_tokens() {
        let body = Provider::Claude.build_payload("claude-3-5-haiku", "hi");
        assert_eq!(body["max_tokens"], 1024);
        assert_eq!(body["stream"], true);
    }

    #[test]
    fn test_azure_payload_omits_model() {
        let body = Provider::Azure.build_payload("ignored", "hi");
        assert!(body.get("model").is_none());
        assert_eq!(body["stream"], true);
    }

    #[test]
    fn test_headers() {
        let h = Provider::OpenAI.headers("sk-test");
        assert_eq!(h, vec![("Authorization", "Bearer sk-test".to_string())]);

        let h = Provider::Claude.headers("sk-ant");
        assert!(h.contains(&("x-api-key", "sk-ant".to_string())));
        assert!(h.contains(&("anthropic-version", "2023-06-01".to_string())));

        let h = Provider::Azure.headers("az-key");
        assert_eq!(h, vec![("api-key", "az-key".to_string())]);
    }

    #[test]
    fn test_extract_openai_delta() {
        let frame = json!({
            "choices": [{"delta": {"content": "Hel"}}]
        });
        assert_eq!(
            Provider::OpenAI.extract_delta(&frame),
            Some("Hel".to_string())
        );
    }

    #[test]
    fn test_extract_openai_role_only_delta() {
        let frame = json!({
            "choices": [{"delta": {"role": "assistant"}}]
        });
        assert_eq!(Provider::OpenAI.extract_delta(&frame), None);
    }

    #[test]
    fn test_extract_openai_empty_delta_is_not_content() {
        let frame = json!({
            "choices": [{"delta": {"content": ""}}]
        });
        assert_eq!(Provider::OpenAI.extract_delta(&frame), None);
    }

    #[test]
    fn test_extract_claude_delta() {
        let frame = json!({
            "type": "content_block_delta",
            "delta": {"type": "text_delta", "text": "Hi"}
        });
        assert_eq!(
            Provider::Claude.extract_delta(&frame),
            Some("Hi".to_string())
        );
    }

    #[test]
    fn test_claude_ping_is_not_content() {
        let frame = json!({"type": "ping"});
        assert_eq!(Provider::Claude.extract_delta(&frame), None);
    }

    #[test]
    fn test_claude_message_stop_is_terminal() {
        let frame = json!({"type": "message_stop"});
        assert!(Provider::Claude.is_terminal(&frame));
        assert!(!Provider::OpenAI.is_terminal(&frame));
    }

    #[test]
    fn test_from_str() {
        assert_eq!("OpenAI".parse::<Provider>().unwrap(), Provider::OpenAI);
        assert_eq!("claude".parse::<Provider>().unwrap(), Provider::Claude);
        assert_eq!("AZURE".parse::<Provider>().unwrap(), Provider::Azure);
        assert!("gemini".parse::<Provider>().is_err());
    }
}
