//! Ollama (local LLM) question source.
//!
//! Local models have no structured-output schema, so the payload is coaxed
//! out with `format: "json"` and parsed leniently: some models answer with
//! the bare array, others wrap it in an object.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use nomenq_core::error::SourceError;
use nomenq_core::model::Question;
use nomenq_core::traits::{GenerateRequest, QuestionSource};

use crate::prompt::{
    advice_prompt, build_instructions, feedback_fallback, feedback_prompt, into_question,
    parse_questions, RawQuestion, ADVICE_EMPTY, ADVICE_FALLBACK, ADVICE_TEMPERATURE,
    FEEDBACK_CORRECT, FEEDBACK_TEMPERATURE, GENERATION_TEMPERATURE,
};

const DEFAULT_BASE_URL: &str = "http://localhost:11434";
const DEFAULT_MODEL: &str = "llama3.1";
const DEFAULT_TIMEOUT_SECS: u64 = 300; // Local models are slower

/// Ollama local LLM question source.
pub struct OllamaSource {
    base_url: String,
    model: String,
    client: reqwest::Client,
}

impl OllamaSource {
    pub fn new(base_url: &str) -> Self {
        let base = if base_url.is_empty() {
            DEFAULT_BASE_URL
        } else {
            base_url
        };

        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .expect("failed to build HTTP client");

        Self {
            base_url: base.to_string(),
            model: DEFAULT_MODEL.to_string(),
            client,
        }
    }

    pub fn with_model(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
    }

    async fn chat(
        &self,
        system: Option<String>,
        user: String,
        json_format: bool,
        temperature: f64,
    ) -> anyhow::Result<String> {
        let mut messages = Vec::new();
        if let Some(system) = system {
            messages.push(OllamaMessage {
                role: "system".to_string(),
                content: system,
            });
        }
        messages.push(OllamaMessage {
            role: "user".to_string(),
            content: user,
        });

        let body = OllamaRequest {
            model: self.model.clone(),
            messages,
            stream: false,
            format: json_format.then(|| "json".to_string()),
            options: OllamaOptions { temperature },
        };

        let response = self
            .client
            .post(format!("{}/api/chat", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    SourceError::Timeout(DEFAULT_TIMEOUT_SECS)
                } else {
                    SourceError::NetworkError(e.to_string())
                }
            })?;

        let status = response.status().as_u16();
        if status == 404 {
            return Err(SourceError::ModelNotFound(self.model.clone()).into());
        }
        if status >= 400 {
            let message = response.text().await.unwrap_or_default();
            return Err(SourceError::ApiError { status, message }.into());
        }

        let api_response: OllamaResponse =
            response.json().await.map_err(|e| SourceError::ApiError {
                status: 0,
                message: format!("failed to parse response: {e}"),
            })?;
        Ok(api_response.message.content)
    }
}

#[derive(Serialize)]
struct OllamaRequest {
    model: String,
    messages: Vec<OllamaMessage>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<String>,
    options: OllamaOptions,
}

#[derive(Serialize)]
struct OllamaMessage {
    role: String,
    content: String,
}

#[derive(Serialize)]
struct OllamaOptions {
    temperature: f64,
}

#[derive(Deserialize)]
struct OllamaResponse {
    message: OllamaResponseMessage,
}

#[derive(Deserialize)]
struct OllamaResponseMessage {
    #[serde(default)]
    content: String,
}

/// Accept both `[...]` and `{"questions": [...]}` payload shapes.
fn parse_relaxed(payload: &str) -> Result<Vec<Question>, SourceError> {
    match parse_questions(payload) {
        Ok(questions) => Ok(questions),
        Err(array_err) => {
            #[derive(Deserialize)]
            struct Wrapped {
                questions: Vec<RawQuestion>,
            }
            let wrapped: Wrapped =
                serde_json::from_str(payload).map_err(|_| array_err)?;
            Ok(wrapped.questions.into_iter().map(into_question).collect())
        }
    }
}

#[async_trait]
impl QuestionSource for OllamaSource {
    fn name(&self) -> &str {
        "ollama"
    }

    #[instrument(skip(self, request), fields(level = %request.level, count = request.count))]
    async fn generate(&self, request: &GenerateRequest) -> anyhow::Result<Vec<Question>> {
        let content = self
            .chat(
                Some(build_instructions(request)),
                "Responde únicamente con el JSON.".to_string(),
                true,
                GENERATION_TEMPERATURE,
            )
            .await?;
        if content.trim().is_empty() {
            return Err(SourceError::EmptyResponse.into());
        }
        Ok(parse_relaxed(&content)?)
    }

    async fn study_advice(&self, mistakes: &[Question]) -> anyhow::Result<String> {
        if mistakes.is_empty() {
            return Ok(ADVICE_EMPTY.to_string());
        }
        let text = self
            .chat(None, advice_prompt(mistakes), false, ADVICE_TEMPERATURE)
            .await?;
        if text.trim().is_empty() {
            return Ok(ADVICE_FALLBACK.to_string());
        }
        Ok(text)
    }

    async fn answer_feedback(
        &self,
        question: &Question,
        user_answer: &str,
        is_correct: bool,
    ) -> anyhow::Result<String> {
        if is_correct {
            return Ok(FEEDBACK_CORRECT.to_string());
        }
        let text = self
            .chat(
                None,
                feedback_prompt(question, user_answer),
                false,
                FEEDBACK_TEMPERATURE,
            )
            .await?;
        if text.trim().is_empty() {
            return Ok(feedback_fallback(question));
        }
        Ok(text)
    }
}
