//! Answer generation
//!
//! The generation adapter turns a question plus retrieved context into
//! prose. It is the one externally-bound, potentially slow step of a
//! query, so it runs strictly after retrieval, under a timeout, and its
//! failure surfaces as `GenerationUnavailable` for the caller to recover
//! from rather than as a hard query failure.

use crate::error::{DocragError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// System prompt pinning the model to the retrieved context.
const SYSTEM_PROMPT: &str = "You are a helpful assistant that answers questions based on the provided context.\n\
Use ONLY the information from the context to answer the question.\n\
If the context doesn't contain enough information to answer the question, say so clearly.\n\
Be concise but thorough.";

/// Build the user prompt embedding the context block between fences.
pub fn build_prompt(question: &str, context: &str) -> String {
    format!(
        "Context information from documents:\n\
         ---\n\
         {context}\n\
         ---\n\
         \n\
         Question: {question}\n\
         \n\
         Answer based on the context above:"
    )
}

/// Trait for generation backends
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    /// Produce an answer for `question` grounded in `context`.
    async fn generate(&self, question: &str, context: &str) -> Result<String>;

    /// Backend name for logs and diagnostics
    fn name(&self) -> &str;
}

/// Ollama generation backend
///
/// Talks to a local Ollama daemon over HTTP. Anything that keeps an
/// answer from coming back (connection refused, timeout, non-success
/// status) maps to `GenerationUnavailable` so the retrieval pipeline
/// can fall back to presenting the context directly.
pub struct OllamaGenerator {
    endpoint: String,
    model: String,
    temperature: f32,
    top_p: f32,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    system: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Serialize)]
struct GenerateOptions {
    temperature: f32,
    top_p: f32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

impl OllamaGenerator {
    pub fn new(
        endpoint: &str,
        model: &str,
        timeout_secs: u64,
        temperature: f32,
        top_p: f32,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| {
                DocragError::GenerationUnavailable(format!("Failed to build HTTP client: {}", e))
            })?;

        Ok(Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            model: model.to_string(),
            temperature,
            top_p,
            client,
        })
    }
}

#[async_trait]
impl GenerationProvider for OllamaGenerator {
    async fn generate(&self, question: &str, context: &str) -> Result<String> {
        let prompt = build_prompt(question, context);

        let request = GenerateRequest {
            model: &self.model,
            prompt: &prompt,
            system: SYSTEM_PROMPT,
            stream: false,
            options: GenerateOptions {
                temperature: self.temperature,
                top_p: self.top_p,
            },
        };

        let response = self
            .client
            .post(format!("{}/api/generate", self.endpoint))
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() {
                    DocragError::GenerationUnavailable(format!(
                        "Cannot connect to Ollama at {}. Start it with `ollama serve`.",
                        self.endpoint
                    ))
                } else if e.is_timeout() {
                    DocragError::GenerationUnavailable(format!(
                        "Ollama did not answer in time: {}",
                        e
                    ))
                } else {
                    DocragError::GenerationUnavailable(format!("Ollama request failed: {}", e))
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(DocragError::GenerationUnavailable(format!(
                "Ollama error ({}): {}",
                status, body
            )));
        }

        let generated: GenerateResponse = response.json().await.map_err(|e| {
            DocragError::GenerationUnavailable(format!("Invalid Ollama response: {}", e))
        })?;

        Ok(generated.response.trim().to_string())
    }

    fn name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_fences_context_and_ends_with_instruction() {
        let prompt = build_prompt("What is chunking?", "chunk one text");

        assert!(prompt.contains("---\nchunk one text\n---"));
        assert!(prompt.contains("Question: What is chunking?"));
        assert!(prompt.ends_with("Answer based on the context above:"));
    }

    #[test]
    fn request_payload_has_the_expected_shape() {
        let request = GenerateRequest {
            model: "llama3.2",
            prompt: "p",
            system: SYSTEM_PROMPT,
            stream: false,
            options: GenerateOptions {
                temperature: 0.7,
                top_p: 0.9,
            },
        };

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["model"], "llama3.2");
        assert_eq!(value["stream"], false);
        assert!((value["options"]["temperature"].as_f64().unwrap() - 0.7).abs() < 1e-6);
        assert!((value["options"]["top_p"].as_f64().unwrap() - 0.9).abs() < 1e-6);
        assert!(value["system"].as_str().unwrap().contains("ONLY"));
    }

    #[test]
    fn trailing_slash_on_endpoint_is_trimmed() {
        let generator =
            OllamaGenerator::new("http://localhost:11434/", "llama3.2", 60, 0.7, 0.9).unwrap();
        assert_eq!(generator.endpoint, "http://localhost:11434");
        assert_eq!(generator.name(), "llama3.2");
    }

    #[test]
    fn missing_response_field_defaults_to_empty() {
        let parsed: GenerateResponse = serde_json::from_str("{}").unwrap();
        assert_eq!(parsed.response, "");
    }
}
