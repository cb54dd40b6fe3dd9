//! Generator service abstraction
//!
//! Provides a unified interface for text-generation providers:
//! - OpenAI-compatible chat completions endpoints
//! - Mock generator for development and testing
//!
//! Generators declare a bounded input budget so callers can detect context
//! overflow before issuing a call. The engine never retries failed calls;
//! retry policy belongs to the provider or the calling layer.

use crate::config::GeneratorConfig;
use crate::errors::{EngineError, Result};
use crate::metrics::record_generator_call;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Trait for text generation
#[async_trait]
pub trait Generator: Send + Sync {
    /// Generate a completion for a single prompt
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Generate completions for multiple prompts, preserving input order.
    ///
    /// The default implementation dispatches the calls concurrently; a failed
    /// call fails the whole batch.
    async fn generate_batch(&self, prompts: &[String]) -> Result<Vec<String>> {
        futures::future::try_join_all(prompts.iter().map(|p| self.generate(p))).await
    }

    /// Input budget in characters for a single prompt
    fn max_input_chars(&self) -> usize;

    /// Get the model name
    fn model_name(&self) -> &str;
}

/// OpenAI-compatible chat completions client
pub struct OpenAiGenerator {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    max_input_chars: usize,
    max_tokens: usize,
    temperature: f32,
    timeout: Duration,
}

#[derive(Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: usize,
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Deserialize)]
struct ChatMessageResponse {
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

impl OpenAiGenerator {
    /// Create a new client from generator configuration
    pub fn new(config: &GeneratorConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| EngineError::Configuration {
                message: "generator.api_key is required for the openai provider".to_string(),
            })?;

        let timeout = Duration::from_secs(config.timeout_secs);
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            api_key,
            base_url: config
                .api_base
                .clone()
                .unwrap_or_else(|| "https://api.openai.com/v1".to_string()),
            model: config.model.clone(),
            max_input_chars: config.max_input_chars,
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            timeout,
        })
    }

    async fn make_request(&self, prompt: &str) -> Result<String> {
        let url = format!("{}/chat/completions", self.base_url);

        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        };

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    EngineError::GeneratorTimeout {
                        timeout_ms: self.timeout.as_millis() as u64,
                    }
                } else {
                    EngineError::GeneratorUnavailable {
                        message: format!("Request failed: {}", e),
                    }
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(EngineError::GeneratorUnavailable {
                message: format!("API error {}: {}", status, body),
            });
        }

        let chat_response: ChatResponse =
            response
                .json()
                .await
                .map_err(|e| EngineError::GeneratorUnavailable {
                    message: format!("Failed to parse response: {}", e),
                })?;

        chat_response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| EngineError::GeneratorUnavailable {
                message: "Empty response from generator".to_string(),
            })
    }
}

#[async_trait]
impl Generator for OpenAiGenerator {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let start = Instant::now();
        let result = self.make_request(prompt).await;
        record_generator_call(&self.model, start.elapsed().as_secs_f64(), result.is_ok());

        if let Err(e) = &result {
            tracing::warn!(
                model = %self.model,
                prompt_chars = prompt.len(),
                error = %e,
                "Generator call failed"
            );
        }

        result
    }

    fn max_input_chars(&self) -> usize {
        self.max_input_chars
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// A canned response rule for the mock generator
#[derive(Debug, Clone)]
struct MockRule {
    /// Substring matched against the prompt
    pattern: String,
    /// Canned response text
    response: String,
    /// Simulated latency before responding
    delay: Option<Duration>,
    /// Respond with a transient failure instead
    fail: bool,
}

/// Mock generator returning pre-defined responses based on prompt patterns.
///
/// Useful for testing combination strategies end-to-end without real API
/// calls. Responses are matched by substring; per-rule latency makes
/// completion order controllable, and the call history records every prompt
/// for verification.
#[derive(Clone)]
pub struct MockGenerator {
    rules: Arc<Mutex<Vec<MockRule>>>,
    default_response: String,
    call_history: Arc<Mutex<Vec<String>>>,
    max_input_chars: usize,
}

impl MockGenerator {
    /// Create a mock with no rules; every prompt gets the default response
    pub fn new() -> Self {
        Self {
            rules: Arc::new(Mutex::new(Vec::new())),
            default_response: "mock answer".to_string(),
            call_history: Arc::new(Mutex::new(Vec::new())),
            max_input_chars: crate::DEFAULT_INPUT_BUDGET,
        }
    }

    /// Add a pattern-based response
    pub fn with_response(self, pattern: impl Into<String>, response: impl Into<String>) -> Self {
        self.push_rule(MockRule {
            pattern: pattern.into(),
            response: response.into(),
            delay: None,
            fail: false,
        });
        self
    }

    /// Add a pattern-based response delivered after a simulated latency
    pub fn with_delayed_response(
        self,
        pattern: impl Into<String>,
        response: impl Into<String>,
        delay: Duration,
    ) -> Self {
        self.push_rule(MockRule {
            pattern: pattern.into(),
            response: response.into(),
            delay: Some(delay),
            fail: false,
        });
        self
    }

    /// Make prompts matching the pattern fail with a transient error
    pub fn with_failure(self, pattern: impl Into<String>) -> Self {
        self.push_rule(MockRule {
            pattern: pattern.into(),
            response: String::new(),
            delay: None,
            fail: true,
        });
        self
    }

    /// Set the response for prompts matching no rule
    pub fn with_default_response(mut self, response: impl Into<String>) -> Self {
        self.default_response = response.into();
        self
    }

    /// Override the declared input budget
    pub fn with_input_budget(mut self, max_input_chars: usize) -> Self {
        self.max_input_chars = max_input_chars;
        self
    }

    /// Get the call history (every prompt received, in call order)
    pub fn call_history(&self) -> Vec<String> {
        self.call_history
            .lock()
            .map(|h| h.clone())
            .unwrap_or_default()
    }

    /// Get the number of calls made
    pub fn call_count(&self) -> usize {
        self.call_history.lock().map(|h| h.len()).unwrap_or(0)
    }

    fn push_rule(&self, rule: MockRule) {
        if let Ok(mut rules) = self.rules.lock() {
            rules.push(rule);
        }
    }

    fn find_rule(&self, prompt: &str) -> Option<MockRule> {
        let rules = self.rules.lock().ok()?;
        rules.iter().find(|r| prompt.contains(&r.pattern)).cloned()
    }
}

impl Default for MockGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Generator for MockGenerator {
    async fn generate(&self, prompt: &str) -> Result<String> {
        if let Ok(mut history) = self.call_history.lock() {
            history.push(prompt.to_string());
        }

        match self.find_rule(prompt) {
            Some(rule) => {
                if let Some(delay) = rule.delay {
                    tokio::time::sleep(delay).await;
                }
                if rule.fail {
                    return Err(EngineError::GeneratorUnavailable {
                        message: format!("mock failure for pattern '{}'", rule.pattern),
                    });
                }
                Ok(rule.response)
            }
            None => Ok(self.default_response.clone()),
        }
    }

    fn max_input_chars(&self) -> usize {
        self.max_input_chars
    }

    fn model_name(&self) -> &str {
        "mock-generator"
    }
}

/// Create a generator based on configuration
pub fn create_generator(config: &GeneratorConfig) -> Result<Arc<dyn Generator>> {
    match config.provider.as_str() {
        "openai" => Ok(Arc::new(OpenAiGenerator::new(config)?)),
        "mock" => Ok(Arc::new(MockGenerator::new())),
        other => {
            tracing::warn!(provider = other, "Unknown generation provider, using mock");
            Ok(Arc::new(MockGenerator::new()))
        }
    }
}
