//! OpenAI-compatible reply generator.
//!
//! Implements the `ReplyGenerator` port with a single non-streaming
//! chat-completions call against any OpenAI-compatible endpoint. The session
//! id is forwarded as the API `user` field; conversational memory beyond
//! that is out of scope here.

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

use relayguard_core::generator::ReplyGenerator;
use relayguard_types::error::GeneratorError;

const DEFAULT_API_BASE: &str = "https://api.openai.com";
const DEFAULT_MODEL: &str = "gpt-4o-mini";

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

pub struct OpenAiGenerator {
    http: reqwest::Client,
    api_key: SecretString,
    api_base: String,
    model: String,
    system_prompt: String,
}

impl OpenAiGenerator {
    pub fn new(api_key: SecretString, system_prompt: impl Into<String>) -> Self {
        Self::with_api_base(api_key, system_prompt, DEFAULT_API_BASE, DEFAULT_MODEL)
    }

    pub fn with_api_base(
        api_key: SecretString,
        system_prompt: impl Into<String>,
        api_base: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();
        Self {
            http,
            api_key,
            api_base: api_base.into(),
            model: model.into(),
            system_prompt: system_prompt.into(),
        }
    }
}

impl ReplyGenerator for OpenAiGenerator {
    async fn generate(
        &self,
        text: &str,
        session_id: &str,
        display_name: &str,
    ) -> Result<String, GeneratorError> {
        let system = format!(
            "{}\nThe customer's name is {display_name}.",
            self.system_prompt
        );

        let payload = json!({
            "model": self.model,
            "user": session_id,
            "messages": [
                {"role": "system", "content": system},
                {"role": "user", "content": text},
            ],
        });

        let response = self
            .http
            .post(format!("{}/v1/chat/completions", self.api_base))
            .bearer_auth(self.api_key.expose_secret())
            .json(&payload)
            .send()
            .await
            .map_err(|e| GeneratorError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GeneratorError::Api(format!("{status}: {body}")));
        }

        let completion: CompletionResponse = response
            .json()
            .await
            .map_err(|e| GeneratorError::Transport(e.to_string()))?;

        completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or(GeneratorError::EmptyCompletion)
    }
}

impl std::fmt::Debug for OpenAiGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiGenerator")
            .field("api_base", &self.api_base)
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_completion_response_parsing() {
        let json = r#"{
            "id": "chatcmpl-1",
            "choices": [{"index": 0, "message": {"role": "assistant", "content": "Добрый день!"}, "finish_reason": "stop"}],
            "usage": {"prompt_tokens": 10, "completion_tokens": 4}
        }"#;
        let completion: CompletionResponse = serde_json::from_str(json).unwrap();
        assert_eq!(
            completion.choices[0].message.content.as_deref(),
            Some("Добрый день!")
        );
    }

    #[test]
    fn test_empty_choices_parse() {
        let completion: CompletionResponse = serde_json::from_str(r#"{"choices": []}"#).unwrap();
        assert!(completion.choices.is_empty());
    }

    #[test]
    fn test_key_not_leaked_by_debug() {
        let generator = OpenAiGenerator::new(SecretString::from("sk-secret"), "You are Elena.");
        let debug = format!("{generator:?}");
        assert!(!debug.contains("sk-secret"));
        assert!(debug.contains("gpt-4o-mini"));
    }
}
