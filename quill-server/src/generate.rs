//! Answer generation over retrieved context.
//!
//! This sits outside the retrieval core: the retriever hands over ranked
//! passages, and a generator phrases the final answer. Like the embedding
//! provider, the generator is a capability interface chosen once at
//! startup; the core never branches on vendor identity.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

const MISTRAL_CHAT_URL: &str = "https://api.mistral.ai/v1/chat/completions";

/// The answer contract: respond only from the supplied passages.
const PROMPT_TEMPLATE: &str = "You are a helpful AI assistant that answers questions *only* based \
on the provided PDF content. If the question cannot be answered using the context below, reply \
exactly with: \"This query is not related to the provided PDF content.\"\n\
Context:{context}\n\
Question: {question}\n\
Answer:";

#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    /// A required credential was absent at startup.
    #[error("{var} not found in environment variables")]
    MissingApiKey { var: &'static str },

    #[error("generation request failed: {source}")]
    Http {
        #[from]
        source: reqwest::Error,
    },

    #[error("generation response was malformed: {detail}")]
    MalformedResponse { detail: String },
}

/// Turns a question plus retrieved passages into a final answer.
#[async_trait]
pub trait AnswerGenerator: Send + Sync {
    async fn answer(&self, question: &str, context: &[String]) -> Result<String, GenerateError>;

    /// Short identifier for logs.
    fn generator_name(&self) -> &str;
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: String,
}

/// Answer generator backed by the Mistral chat completions API.
#[derive(Debug, Clone)]
pub struct MistralGenerator {
    client: reqwest::Client,
    api_key: String,
    model: String,
}

impl MistralGenerator {
    /// Read `MISTRAL_API_KEY` from the environment. Called once at startup
    /// so a missing key is a configuration error, not a mid-query surprise.
    pub fn from_env(model: impl Into<String>, timeout: Duration) -> Result<Self, GenerateError> {
        let api_key = std::env::var("MISTRAL_API_KEY")
            .map_err(|_| GenerateError::MissingApiKey {
                var: "MISTRAL_API_KEY",
            })?;
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_key,
            model: model.into(),
        })
    }
}

#[async_trait]
impl AnswerGenerator for MistralGenerator {
    async fn answer(&self, question: &str, context: &[String]) -> Result<String, GenerateError> {
        let prompt = fill_prompt(question, context);
        tracing::debug!("requesting completion for question ({} context passages)", context.len());

        let response: ChatResponse = self
            .client
            .post(MISTRAL_CHAT_URL)
            .bearer_auth(&self.api_key)
            .json(&json!({
                "model": self.model,
                "messages": [{"role": "user", "content": prompt}],
                "temperature": 0.2,
            }))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let answer = response
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| GenerateError::MalformedResponse {
                detail: "no choices in completion".to_string(),
            })?;
        Ok(answer)
    }

    fn generator_name(&self) -> &str {
        "mistral"
    }
}

/// Join the passages in retrieval order and fill the template.
fn fill_prompt(question: &str, context: &[String]) -> String {
    let context_block = if context.is_empty() {
        "No relevant content found.".to_string()
    } else {
        context.join("\n")
    };
    PROMPT_TEMPLATE
        .replace("{context}", &context_block)
        .replace("{question}", question)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_contains_question_and_context_in_order() {
        let prompt = fill_prompt(
            "What is attention?",
            &["first passage".to_string(), "second passage".to_string()],
        );
        assert!(prompt.contains("Question: What is attention?"));
        let first = prompt.find("first passage").unwrap();
        let second = prompt.find("second passage").unwrap();
        assert!(first < second);
    }

    #[test]
    fn empty_context_gets_placeholder() {
        let prompt = fill_prompt("anything", &[]);
        assert!(prompt.contains("No relevant content found."));
    }

    #[test]
    fn missing_api_key_is_a_config_error() {
        // Only run when the variable is genuinely absent, to stay
        // independent of the developer's environment.
        if std::env::var("MISTRAL_API_KEY").is_err() {
            let err =
                MistralGenerator::from_env("mistral-small-latest", Duration::from_secs(5))
                    .unwrap_err();
            assert!(matches!(err, GenerateError::MissingApiKey { .. }));
        }
    }

    #[test]
    fn chat_response_parses() {
        let body = r#"{"choices": [{"message": {"role": "assistant", "content": "self-attention"}}]}"#;
        let parsed: ChatResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.choices[0].message.content, "self-attention");
    }
}
