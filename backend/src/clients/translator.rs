//! Machine translation of editorial content.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{check_status, http_client, ClientError, ClientResult};
use crate::models::Language;

#[async_trait]
pub trait Translator: Send + Sync {
    async fn translate(&self, text: &str, source: Language, target: Language)
        -> ClientResult<String>;
}

const ANTHROPIC_API_BASE: &str = "https://api.anthropic.com";
const ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: String,
    messages: Vec<Message<'a>>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    content_type: String,
    #[serde(default)]
    text: String,
}

/// Translator backed by the Anthropic messages API.
pub struct AnthropicTranslator {
    client: reqwest::Client,
    api_key: String,
    model: String,
    endpoint: String,
}

impl AnthropicTranslator {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self::with_endpoint(api_key, model, ANTHROPIC_API_BASE)
    }

    pub fn with_endpoint(
        api_key: impl Into<String>,
        model: impl Into<String>,
        endpoint: impl Into<String>,
    ) -> Self {
        Self {
            client: http_client(120),
            api_key: api_key.into(),
            model: model.into(),
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
        }
    }

    fn system_prompt(source: Language, target: Language) -> String {
        format!(
            "You translate travel and tour descriptions from {} to {}. \
             Keep the tone, formatting, line breaks, markdown and proper names. \
             Reply with the translation only.",
            source.english_name(),
            target.english_name()
        )
    }

    fn extract_text(response: MessagesResponse) -> String {
        response
            .content
            .into_iter()
            .filter(|c| c.content_type == "text")
            .map(|c| c.text)
            .collect::<Vec<_>>()
            .join("")
    }
}

#[async_trait]
impl Translator for AnthropicTranslator {
    async fn translate(
        &self,
        text: &str,
        source: Language,
        target: Language,
    ) -> ClientResult<String> {
        if source == target || text.trim().is_empty() {
            return Ok(text.to_string());
        }
        if self.api_key.is_empty() {
            return Err(ClientError::Configuration(
                "Anthropic API key is not configured".to_string(),
            ));
        }

        let request = MessagesRequest {
            model: &self.model,
            max_tokens: 4096,
            system: Self::system_prompt(source, target),
            messages: vec![Message {
                role: "user",
                content: text,
            }],
            temperature: 0.2,
        };

        let response = self
            .client
            .post(format!("{}/v1/messages", self.endpoint))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&request)
            .send()
            .await?;
        let response = check_status("Anthropic", response).await?;
        let body = response.json::<MessagesResponse>().await?;

        let translated = Self::extract_text(body);
        if translated.trim().is_empty() {
            return Err(ClientError::Decode(
                "Translation response contained no text".to_string(),
            ));
        }
        Ok(translated.trim().to_string())
    }
}

/// Deterministic translator: prefixes the text with the target code, e.g.
/// `[es] Hello`.
#[derive(Debug, Default, Clone)]
pub struct MockTranslator;

#[async_trait]
impl Translator for MockTranslator {
    async fn translate(
        &self,
        text: &str,
        source: Language,
        target: Language,
    ) -> ClientResult<String> {
        if source == target || text.is_empty() {
            return Ok(text.to_string());
        }
        Ok(format!("[{}] {}", target.code(), text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_text_joins_text_blocks() {
        let body: MessagesResponse = serde_json::from_str(
            r#"{"content":[{"type":"text","text":"Hola "},{"type":"tool_use"},{"type":"text","text":"mundo"}]}"#,
        )
        .unwrap();
        assert_eq!(AnthropicTranslator::extract_text(body), "Hola mundo");
    }

    #[test]
    fn test_system_prompt_names_languages() {
        let prompt = AnthropicTranslator::system_prompt(Language::En, Language::De);
        assert!(prompt.contains("English"));
        assert!(prompt.contains("German"));
    }

    #[tokio::test]
    async fn test_same_language_short_circuits() {
        let translator = AnthropicTranslator::new("", "claude-3-5-haiku-latest");
        let text = translator
            .translate("Hello", Language::En, Language::En)
            .await
            .unwrap();
        assert_eq!(text, "Hello");
        assert!(translator
            .translate("Hello", Language::En, Language::Fr)
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_mock_translator_prefixes_target() {
        let text = MockTranslator
            .translate("Old town", Language::En, Language::It)
            .await
            .unwrap();
        assert_eq!(text, "[it] Old town");
    }
}
