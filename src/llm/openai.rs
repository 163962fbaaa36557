use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use super::provider::{ChatProvider, EmbeddingProvider, LlmError};
use super::types::{ChatCompletion, ChatRequest, ResponseFormat};
use crate::core::config::LlmSettings;

/// Client for OpenAI-compatible chat and embedding endpoints.
#[derive(Clone)]
pub struct OpenAiClient {
    base_url: String,
    api_key: String,
    model: String,
    embedding_model: String,
    client: Client,
}

impl OpenAiClient {
    pub fn new(settings: &LlmSettings) -> Result<Self, LlmError> {
        let api_key = settings
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .ok_or(LlmError::MissingApiKey)?
            .to_string();

        let client = Client::builder()
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .build()
            .map_err(|err| LlmError::Transport {
                endpoint: settings.base_url.clone(),
                message: err.to_string(),
            })?;

        Ok(Self {
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            api_key,
            model: settings.model.clone(),
            embedding_model: settings.embedding_model.clone(),
            client,
        })
    }

    fn chat_body(&self, request: &ChatRequest) -> Value {
        let mut body = json!({
            "model": self.model,
            "messages": request.messages,
            "stream": false,
        });

        if let Some(obj) = body.as_object_mut() {
            if let Some(t) = request.temperature {
                obj.insert("temperature".to_string(), json!(t));
            }
            match &request.response_format {
                Some(ResponseFormat::JsonSchema {
                    name,
                    schema,
                    strict,
                }) => {
                    obj.insert(
                        "response_format".to_string(),
                        json!({
                            "type": "json_schema",
                            "json_schema": {
                                "name": name,
                                "schema": schema,
                                "strict": strict,
                            }
                        }),
                    );
                }
                None => {}
            }
        }

        body
    }

    async fn post_json(&self, endpoint: &str, body: &Value) -> Result<Value, LlmError> {
        let url = format!("{}{}", self.base_url, endpoint);
        let res = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|err| LlmError::Transport {
                endpoint: endpoint.to_string(),
                message: err.to_string(),
            })?;

        let status = res.status();
        if !status.is_success() {
            let text = res.text().await.unwrap_or_default();
            return Err(LlmError::Status {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
                body: text,
            });
        }

        res.json::<Value>().await.map_err(|err| LlmError::Decode {
            endpoint: endpoint.to_string(),
            message: err.to_string(),
        })
    }
}

#[async_trait]
impl ChatProvider for OpenAiClient {
    fn name(&self) -> &str {
        "openai"
    }

    async fn chat(&self, request: ChatRequest) -> Result<ChatCompletion, LlmError> {
        let body = self.chat_body(&request);
        let payload = self.post_json("/chat/completions", &body).await?;
        parse_chat_completion(&payload)
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiClient {
    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, LlmError> {
        if inputs.is_empty() {
            return Ok(Vec::new());
        }

        let body = json!({
            "model": self.embedding_model,
            "input": inputs,
        });
        let payload = self.post_json("/embeddings", &body).await?;
        let embeddings = parse_embeddings(&payload)?;

        if embeddings.len() != inputs.len() {
            return Err(LlmError::Decode {
                endpoint: "/embeddings".to_string(),
                message: format!(
                    "expected {} embeddings, got {}",
                    inputs.len(),
                    embeddings.len()
                ),
            });
        }
        Ok(embeddings)
    }
}

fn parse_chat_completion(payload: &Value) -> Result<ChatCompletion, LlmError> {
    let choice = payload
        .get("choices")
        .and_then(|choices| choices.get(0))
        .ok_or_else(|| LlmError::Decode {
            endpoint: "/chat/completions".to_string(),
            message: "response has no choices".to_string(),
        })?;

    let message = &choice["message"];
    Ok(ChatCompletion {
        content: message["content"].as_str().map(str::to_string),
        refusal: message["refusal"].as_str().map(str::to_string),
        finish_reason: choice["finish_reason"].as_str().map(str::to_string),
    })
}

fn parse_embeddings(payload: &Value) -> Result<Vec<Vec<f32>>, LlmError> {
    let data = payload["data"].as_array().ok_or_else(|| LlmError::Decode {
        endpoint: "/embeddings".to_string(),
        message: "response has no data array".to_string(),
    })?;

    // The API may return items out of order; "index" is authoritative.
    let mut indexed: Vec<(u64, Vec<f32>)> = data
        .iter()
        .enumerate()
        .filter_map(|(position, item)| {
            let values = item["embedding"].as_array()?;
            let vector = values
                .iter()
                .filter_map(|v| v.as_f64().map(|f| f as f32))
                .collect();
            let index = item["index"].as_u64().unwrap_or(position as u64);
            Some((index, vector))
        })
        .collect();
    indexed.sort_by_key(|(index, _)| *index);

    Ok(indexed.into_iter().map(|(_, vector)| vector).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::types::ChatMessage;

    fn client() -> OpenAiClient {
        let settings = LlmSettings {
            api_key: Some("sk-test".to_string()),
            base_url: "https://api.example.com/v1/".to_string(),
            ..LlmSettings::default()
        };
        OpenAiClient::new(&settings).unwrap()
    }

    #[test]
    fn new_requires_api_key() {
        let settings = LlmSettings::default();
        assert!(matches!(
            OpenAiClient::new(&settings),
            Err(LlmError::MissingApiKey)
        ));
    }

    #[test]
    fn chat_body_carries_temperature_and_schema() {
        let client = client();
        assert_eq!(client.base_url, "https://api.example.com/v1");

        let request = ChatRequest::new(vec![ChatMessage::user("diagnose")])
            .with_temperature(0.0)
            .with_response_format(ResponseFormat::JsonSchema {
                name: "DiagnosticResult".to_string(),
                schema: json!({ "type": "object" }),
                strict: false,
            });

        let body = client.chat_body(&request);

        assert_eq!(body["model"], json!("gpt-4o-mini"));
        assert_eq!(body["temperature"], json!(0.0));
        assert_eq!(body["response_format"]["type"], json!("json_schema"));
        assert_eq!(
            body["response_format"]["json_schema"]["name"],
            json!("DiagnosticResult")
        );
        assert_eq!(body["messages"][0]["role"], json!("user"));
        assert!(body.get("stream").is_some());
    }

    #[test]
    fn parse_chat_completion_reads_first_choice() {
        let payload = json!({
            "choices": [
                {
                    "message": { "role": "assistant", "content": "{}", "refusal": null },
                    "finish_reason": "stop"
                }
            ]
        });

        let completion = parse_chat_completion(&payload).unwrap();
        assert_eq!(completion.content.as_deref(), Some("{}"));
        assert!(completion.refusal.is_none());
        assert_eq!(completion.finish_reason.as_deref(), Some("stop"));

        assert!(parse_chat_completion(&json!({ "choices": [] })).is_err());
    }

    #[test]
    fn parse_embeddings_orders_by_index() {
        let payload = json!({
            "data": [
                { "index": 1, "embedding": [0.0, 1.0] },
                { "index": 0, "embedding": [1.0, 0.0] }
            ]
        });

        let embeddings = parse_embeddings(&payload).unwrap();
        assert_eq!(embeddings, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
    }
}
