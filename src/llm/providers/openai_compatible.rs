use async_trait::async_trait;
use futures_util::StreamExt;

use crate::config::api_key_env_var;
use crate::errors::{QaError, QaResult};
use crate::llm::provider::LlmProvider;
use crate::llm::sse_parser;
use crate::llm::types::{CallConfig, ChatMessage, LlmResponse, StreamChunkKind};

pub struct OpenAiCompatibleProvider {
    id: String,
    api_base: String,
    api_key: String,
    client: reqwest::Client,
}

impl OpenAiCompatibleProvider {
    pub fn new(id: String, api_base: String, api_key: String) -> Self {
        Self {
            id,
            api_base,
            api_key,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl LlmProvider for OpenAiCompatibleProvider {
    fn name(&self) -> &str {
        &self.id
    }

    async fn chat(&self, messages: Vec<ChatMessage>, cfg: &CallConfig) -> QaResult<LlmResponse> {
        if self.api_key.trim().is_empty() {
            return Err(QaError::Config(format!(
                "missing API key for provider '{}' (set {})",
                self.id,
                api_key_env_var(&self.id)
            )));
        }

        let body = serde_json::json!({
            "model": cfg.model,
            "messages": &messages,
            "stream": cfg.stream,
            "temperature": cfg.temperature,
            "max_tokens": cfg.max_tokens,
        });

        tracing::debug!(
            provider = %self.id,
            model = %cfg.model,
            stream = cfg.stream,
            prompt_len = messages.iter().map(|m| m.content.len()).sum::<usize>(),
            "sending LLM request"
        );

        let response = self
            .client
            .post(&self.api_base)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let err_body = response.text().await.unwrap_or_default();
            return Err(QaError::LlmProvider(format!("{}: {}", status, err_body)));
        }

        if cfg.stream {
            self.handle_stream(response).await
        } else {
            self.handle_json(response).await
        }
    }
}

impl OpenAiCompatibleProvider {
    /// Accumulate an SSE stream into one response.
    async fn handle_stream(&self, response: reqwest::Response) -> QaResult<LlmResponse> {
        let mut byte_stream = response.bytes_stream();
        // Buffer raw bytes so a UTF-8 sequence split across chunks stays intact.
        let mut line_buf: Vec<u8> = Vec::new();
        let mut out = LlmResponse::default();

        'stream: while let Some(result) = byte_stream.next().await {
            let bytes = result?;
            line_buf.extend_from_slice(&bytes);

            while let Some(pos) = line_buf.iter().position(|b| *b == b'\n') {
                let raw: Vec<u8> = line_buf.drain(..=pos).collect();
                let line = String::from_utf8_lossy(&raw).trim().to_string();
                if line.is_empty() {
                    continue;
                }

                match sse_parser::parse_sse_line(&line) {
                    Ok(Some(chunk)) => match chunk.kind {
                        StreamChunkKind::Reasoning => out.reasoning.push_str(&chunk.content),
                        StreamChunkKind::Content => out.content.push_str(&chunk.content),
                        StreamChunkKind::Done => break 'stream,
                    },
                    Ok(None) => {}
                    Err(e) => {
                        tracing::debug!("SSE parse skipped: {e}");
                    }
                }
            }
        }

        tracing::info!(
            provider = %self.id,
            content_len = out.content.len(),
            reasoning_len = out.reasoning.len(),
            "LLM stream complete"
        );
        Ok(out)
    }

    /// Handle a non-streaming JSON response.
    async fn handle_json(&self, response: reqwest::Response) -> QaResult<LlmResponse> {
        let json: serde_json::Value = response.json().await?;

        let message = &json["choices"][0]["message"];
        let Some(content) = message["content"].as_str() else {
            return Err(QaError::LlmProvider(format!(
                "response from '{}' has no choices[0].message.content",
                self.id
            )));
        };
        let reasoning = message["reasoning_content"].as_str().unwrap_or("");

        tracing::info!(
            provider = %self.id,
            content_len = content.len(),
            "LLM JSON response received"
        );

        Ok(LlmResponse {
            content: content.to_string(),
            reasoning: reasoning.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use httpmock::prelude::*;
    use serde_json::json;

    use super::*;

    fn cfg(stream: bool) -> CallConfig {
        CallConfig {
            model: "gpt-test".into(),
            stream,
            temperature: 0.2,
            max_tokens: 256,
        }
    }

    #[tokio::test]
    async fn json_response_returns_message_content() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/v1/chat/completions")
                    .header("authorization", "Bearer sk-test");
                then.status(200).json_body(json!({
                    "choices": [{"message": {"role": "assistant", "content": "{\"actionType\":\"noop\"}"}}]
                }));
            })
            .await;

        let provider = OpenAiCompatibleProvider::new(
            "openai".into(),
            server.url("/v1/chat/completions"),
            "sk-test".into(),
        );
        let response = provider
            .chat(vec![ChatMessage::user("plan")], &cfg(false))
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(response.content, "{\"actionType\":\"noop\"}");
    }

    #[tokio::test]
    async fn stream_response_accumulates_content_chunks() {
        let server = MockServer::start_async().await;
        let body = concat!(
            "data: {\"choices\":[{\"delta\":{\"content\":\"{\\\"actionType\\\":\"}}]}\n\n",
            ": keep-alive\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"\\\"click\\\"}\"}}]}\n\n",
            "data: [DONE]\n\n",
        );
        server
            .mock_async(|when, then| {
                when.method(POST).path("/chat");
                then.status(200)
                    .header("content-type", "text/event-stream")
                    .body(body);
            })
            .await;

        let provider =
            OpenAiCompatibleProvider::new("local".into(), server.url("/chat"), "k".into());
        let response = provider
            .chat(vec![ChatMessage::user("plan")], &cfg(true))
            .await
            .unwrap();
        assert_eq!(response.content, "{\"actionType\":\"click\"}");
    }

    #[tokio::test]
    async fn http_error_is_provider_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/chat");
                then.status(503).body("overloaded");
            })
            .await;

        let provider =
            OpenAiCompatibleProvider::new("local".into(), server.url("/chat"), "k".into());
        let err = provider
            .chat(vec![ChatMessage::user("plan")], &cfg(false))
            .await
            .unwrap_err();
        assert!(matches!(err, QaError::LlmProvider(ref msg) if msg.contains("overloaded")));
        assert!(!err.is_config());
    }

    #[tokio::test]
    async fn missing_key_is_config_error_without_network() {
        let provider = OpenAiCompatibleProvider::new(
            "openai".into(),
            "http://127.0.0.1:9/unreachable".into(),
            String::new(),
        );
        let err = provider
            .chat(vec![ChatMessage::user("plan")], &cfg(false))
            .await
            .unwrap_err();
        assert!(err.is_config());
        assert!(err.to_string().contains("QA_PILOT_OPENAI_API_KEY"));
    }
}
