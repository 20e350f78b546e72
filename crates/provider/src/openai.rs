//! OpenAI-compatible `/chat/completions` endpoint

use crate::*;
use reqwest::Client;
use serde_json::json;
use tracing::{debug, trace};

const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-4o";

/// Provider for any server speaking the chat-completions protocol
pub struct ChatCompletionsProvider {
    client: Client,
    api_key: String,
    api_base: String,
    default_model: String,
}

impl ChatCompletionsProvider {
    pub fn new(
        api_key: impl Into<String>,
        api_base: Option<String>,
        default_model: Option<String>,
    ) -> Self {
        let api_base = api_base
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string())
            .trim_end_matches('/')
            .to_string();

        Self {
            client: Client::new(),
            api_key: api_key.into(),
            api_base,
            default_model: default_model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
        }
    }

    fn build_request(&self, params: &ChatParams) -> Value {
        let model = if params.model.is_empty() {
            self.default_model.clone()
        } else {
            params.model.clone()
        };

        let messages: Vec<Value> = params
            .messages
            .iter()
            .map(|m| json!({ "role": &m.role, "content": &m.content }))
            .collect();

        json!({
            "model": model,
            "messages": messages,
            "max_tokens": params.max_tokens,
            "temperature": params.temperature,
        })
    }

    fn parse_response(&self, body: Value) -> Result<ChatResponse> {
        let choice = body["choices"]
            .get(0)
            .ok_or(ProviderError::InvalidResponse)?;
        let message = &choice["message"];
        let content = message["content"].as_str().map(|s| s.to_string());
        let finish_reason = choice["finish_reason"]
            .as_str()
            .unwrap_or("stop")
            .to_string();

        // arguments arrive as a JSON-encoded string; keep the raw value if it doesn't decode
        let tool_calls = message["tool_calls"]
            .as_array()
            .map(|calls| {
                calls
                    .iter()
                    .map(|call| {
                        let function = &call["function"];
                        let arguments = function["arguments"]
                            .as_str()
                            .and_then(|s| serde_json::from_str(s).ok())
                            .unwrap_or_else(|| function["arguments"].clone());
                        ToolCall {
                            id: call["id"].as_str().unwrap_or_default().to_string(),
                            name: function["name"].as_str().unwrap_or_default().to_string(),
                            arguments,
                        }
                    })
                    .collect()
            })
            .unwrap_or_default();

        let usage = body
            .get("usage")
            .and_then(|u| serde_json::from_value::<Usage>(u.clone()).ok())
            .unwrap_or_default();

        Ok(ChatResponse {
            content,
            tool_calls,
            finish_reason,
            usage,
        })
    }
}

#[async_trait]
impl Provider for ChatCompletionsProvider {
    async fn chat(&self, params: ChatParams) -> Result<ChatResponse> {
        if self.api_key.is_empty() {
            return Err(ProviderError::NoApiKey);
        }

        let url = format!("{}/chat/completions", self.api_base);
        trace!("POST {} ({} messages)", url, params.messages.len());

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&self.build_request(&params))
            .send()
            .await?;

        let status = response.status();
        if status.as_u16() == 429 {
            return Err(ProviderError::RateLimited);
        }

        let body: Value = response.json().await?;
        if !status.is_success() {
            let error = body["error"]["message"]
                .as_str()
                .unwrap_or("unknown error")
                .to_string();
            return Err(ProviderError::Api(format!("{}: {}", status, error)));
        }

        let parsed = self.parse_response(body)?;
        debug!(
            "Model replied: finish_reason={}, {} tokens",
            parsed.finish_reason, parsed.usage.total_tokens
        );
        Ok(parsed)
    }

    fn default_model(&self) -> String {
        self.default_model.clone()
    }

    fn is_configured(&self) -> bool {
        !self.api_key.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_new_defaults() {
        let provider = ChatCompletionsProvider::new("sk-test", None, None);
        assert_eq!(provider.api_base, DEFAULT_API_BASE);
        assert_eq!(provider.default_model(), DEFAULT_MODEL);
        assert!(provider.is_configured());
    }

    #[test]
    fn test_new_trims_trailing_slash() {
        let provider = ChatCompletionsProvider::new(
            "k",
            Some("http://localhost:11434/v1/".to_string()),
            Some("llama3".to_string()),
        );
        assert_eq!(provider.api_base, "http://localhost:11434/v1");
        assert_eq!(provider.default_model(), "llama3");
    }

    #[test]
    fn test_not_configured_without_key() {
        let provider = ChatCompletionsProvider::new("", None, None);
        assert!(!provider.is_configured());
    }

    #[tokio::test]
    async fn test_chat_without_key_fails_fast() {
        let provider = ChatCompletionsProvider::new("", None, None);
        let result = provider.chat(ChatParams::default()).await;
        assert!(matches!(result, Err(ProviderError::NoApiKey)));
    }

    #[test]
    fn test_build_request_uses_default_model_when_empty() {
        let provider = ChatCompletionsProvider::new("k", None, Some("m1".to_string()));
        let params = ChatParams {
            messages: vec![Message::system("s"), Message::user("u")],
            max_tokens: 512,
            ..Default::default()
        };

        let request = provider.build_request(&params);
        assert_eq!(request["model"], "m1");
        assert_eq!(request["max_tokens"], 512);
        let messages = request["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0]["role"], "system");
        assert_eq!(messages[1]["content"], "u");
    }

    #[test]
    fn test_build_request_keeps_explicit_model() {
        let provider = ChatCompletionsProvider::new("k", None, Some("m1".to_string()));
        let params = ChatParams {
            model: "m2".to_string(),
            ..Default::default()
        };
        assert_eq!(provider.build_request(&params)["model"], "m2");
    }

    #[test]
    fn test_parse_response_text() {
        let provider = ChatCompletionsProvider::new("k", None, None);
        let body = json!({
            "choices": [{
                "message": { "role": "assistant", "content": "{\"success\": true}" },
                "finish_reason": "stop"
            }],
            "usage": { "prompt_tokens": 3, "completion_tokens": 4, "total_tokens": 7 }
        });

        let response = provider.parse_response(body).unwrap();
        assert_eq!(response.text_content(), "{\"success\": true}");
        assert_eq!(response.usage.total_tokens, 7);
        assert!(!response.has_tool_calls());
    }

    #[test]
    fn test_parse_response_tool_calls() {
        let provider = ChatCompletionsProvider::new("k", None, None);
        let body = json!({
            "choices": [{
                "message": {
                    "content": null,
                    "tool_calls": [{
                        "id": "call_1",
                        "type": "function",
                        "function": { "name": "create_file", "arguments": "{\"file_path\": \"a.txt\"}" }
                    }]
                },
                "finish_reason": "tool_calls"
            }]
        });

        let response = provider.parse_response(body).unwrap();
        assert!(response.content.is_none());
        assert_eq!(response.tool_calls[0].name, "create_file");
        assert_eq!(response.tool_calls[0].arguments, json!({"file_path": "a.txt"}));
        assert_eq!(response.usage.total_tokens, 0);
    }

    #[test]
    fn test_parse_response_without_choices() {
        let provider = ChatCompletionsProvider::new("k", None, None);
        let result = provider.parse_response(json!({ "choices": [] }));
        assert!(matches!(result, Err(ProviderError::InvalidResponse)));
    }
}
