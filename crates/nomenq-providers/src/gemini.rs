//! Google Gemini question source — the backend the engine was built
//! against. Question batches use structured JSON output; advice and
//! feedback are plain-text calls.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use nomenq_core::error::SourceError;
use nomenq_core::model::Question;
use nomenq_core::traits::{GenerateRequest, QuestionSource};

use crate::prompt::{
    advice_prompt, build_instructions, feedback_fallback, feedback_prompt, parse_questions,
    response_schema, ADVICE_EMPTY, ADVICE_FALLBACK, ADVICE_TEMPERATURE, FEEDBACK_CORRECT,
    FEEDBACK_TEMPERATURE, GENERATION_TEMPERATURE,
};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const DEFAULT_MODEL: &str = "gemini-2.5-flash";
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Gemini API question source.
pub struct GeminiSource {
    api_key: String,
    base_url: String,
    model: String,
    client: reqwest::Client,
}

impl GeminiSource {
    pub fn new(api_key: &str, base_url: Option<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .expect("failed to build HTTP client");

        Self {
            api_key: api_key.to_string(),
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            model: DEFAULT_MODEL.to_string(),
            client,
        }
    }

    pub fn with_model(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
    }

    async fn generate_content(&self, body: &GeminiRequest) -> anyhow::Result<GeminiResponse> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        );
        let response = self
            .client
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .json(body)
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
        if status == 429 {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(5)
                * 1000;
            return Err(SourceError::RateLimited {
                retry_after_ms: retry_after,
            }
            .into());
        }
        if status == 401 || status == 403 {
            let body = response.text().await.unwrap_or_default();
            return Err(SourceError::AuthenticationFailed(body).into());
        }
        if status == 404 {
            return Err(SourceError::ModelNotFound(self.model.clone()).into());
        }
        if status >= 400 {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<GeminiErrorBody>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(SourceError::ApiError { status, message }.into());
        }

        let api_response: GeminiResponse =
            response.json().await.map_err(|e| SourceError::ApiError {
                status: 0,
                message: format!("failed to parse response: {e}"),
            })?;
        Ok(api_response)
    }

    /// Plain-text call for the advice/feedback prompts.
    async fn generate_text(&self, prompt: &str, temperature: f64) -> anyhow::Result<Option<String>> {
        let body = GeminiRequest {
            contents: vec![Content::text(prompt)],
            system_instruction: None,
            generation_config: GenerationConfig {
                response_mime_type: None,
                response_schema: None,
                temperature,
                top_k: None,
            },
        };
        let response = self.generate_content(&body).await?;
        Ok(first_text(response).filter(|text| !text.trim().is_empty()))
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content {
    parts: Vec<Part>,
}

impl Content {
    fn text(text: &str) -> Self {
        Self {
            parts: vec![Part {
                text: text.to_string(),
            }],
        }
    }
}

#[derive(Serialize)]
struct Part {
    text: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_schema: Option<serde_json::Value>,
    temperature: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_k: Option<u32>,
}

#[derive(Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}

#[derive(Deserialize)]
struct GeminiErrorBody {
    error: GeminiErrorMessage,
}

#[derive(Deserialize)]
struct GeminiErrorMessage {
    message: String,
}

fn first_text(response: GeminiResponse) -> Option<String> {
    response
        .candidates
        .into_iter()
        .next()?
        .content
        .parts
        .into_iter()
        .next()
        .map(|part| part.text)
}

#[async_trait]
impl QuestionSource for GeminiSource {
    fn name(&self) -> &str {
        "gemini"
    }

    #[instrument(skip(self, request), fields(level = %request.level, count = request.count))]
    async fn generate(&self, request: &GenerateRequest) -> anyhow::Result<Vec<Question>> {
        let body = GeminiRequest {
            contents: vec![Content::text("Generar JSON.")],
            system_instruction: Some(Content::text(&build_instructions(request))),
            generation_config: GenerationConfig {
                response_mime_type: Some("application/json".to_string()),
                response_schema: Some(response_schema()),
                temperature: GENERATION_TEMPERATURE,
                top_k: Some(40),
            },
        };

        let response = self.generate_content(&body).await?;
        let text = first_text(response).ok_or(SourceError::EmptyResponse)?;
        Ok(parse_questions(&text)?)
    }

    async fn study_advice(&self, mistakes: &[Question]) -> anyhow::Result<String> {
        if mistakes.is_empty() {
            return Ok(ADVICE_EMPTY.to_string());
        }
        let text = self
            .generate_text(&advice_prompt(mistakes), ADVICE_TEMPERATURE)
            .await?;
        Ok(text.unwrap_or_else(|| ADVICE_FALLBACK.to_string()))
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
            .generate_text(&feedback_prompt(question, user_answer), FEEDBACK_TEMPERATURE)
            .await?;
        Ok(text.unwrap_or_else(|| feedback_fallback(question)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nomenq_core::model::Level;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const GENERATE_PATH: &str = "/v1beta/models/gemini-2.5-flash:generateContent";

    fn request(count: usize) -> GenerateRequest {
        GenerateRequest {
            level: Level::Easy,
            count,
            avoid_prompts: vec![],
            focus_hint: None,
        }
    }

    fn questions_payload() -> String {
        serde_json::json!([
            {"id": 1, "type": "FORMULA_TO_NAME", "prompt": "Nombra Fe2O3",
             "targetNotation": "Cualquiera", "correctAnswer": "óxido de hierro (III)",
             "acceptedAnswers": ["trióxido de dihierro", "óxido férrico"]},
            {"id": 2, "type": "NAME_TO_FORMULA", "prompt": "Formula el hidruro de sodio",
             "targetNotation": "Fórmula", "correctAnswer": "NaH", "acceptedAnswers": []}
        ])
        .to_string()
    }

    fn candidates_body(text: &str) -> serde_json::Value {
        serde_json::json!({
            "candidates": [{"content": {"parts": [{"text": text}]}}]
        })
    }

    #[tokio::test]
    async fn successful_generation() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(GENERATE_PATH))
            .and(header("x-goog-api-key", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(candidates_body(&questions_payload())))
            .mount(&server)
            .await;

        let source = GeminiSource::new("test-key", Some(server.uri()));
        let questions = source.generate(&request(2)).await.unwrap();

        assert_eq!(questions.len(), 2);
        assert_eq!(questions[0].prompt, "Nombra Fe2O3");
        assert_eq!(questions[0].accepted_answers.len(), 2);
        assert_ne!(questions[0].id, questions[1].id);
    }

    #[tokio::test]
    async fn authentication_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(GENERATE_PATH))
            .respond_with(ResponseTemplate::new(403).set_body_string("forbidden"))
            .mount(&server)
            .await;

        let source = GeminiSource::new("bad-key", Some(server.uri()));
        let err = source.generate(&request(1)).await.unwrap_err();
        assert!(err.to_string().contains("authentication"));
    }

    #[tokio::test]
    async fn rate_limiting_is_typed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(GENERATE_PATH))
            .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "5"))
            .mount(&server)
            .await;

        let source = GeminiSource::new("test-key", Some(server.uri()));
        let err = source.generate(&request(1)).await.unwrap_err();
        match err.downcast_ref::<SourceError>() {
            Some(SourceError::RateLimited { retry_after_ms }) => {
                assert_eq!(*retry_after_ms, 5000)
            }
            other => panic!("expected RateLimited, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn empty_candidates_are_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(GENERATE_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"candidates": []})))
            .mount(&server)
            .await;

        let source = GeminiSource::new("test-key", Some(server.uri()));
        let err = source.generate(&request(1)).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<SourceError>(),
            Some(SourceError::EmptyResponse)
        ));
    }

    #[tokio::test]
    async fn unparsable_payload_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(GENERATE_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(candidates_body("sin preguntas hoy")))
            .mount(&server)
            .await;

        let source = GeminiSource::new("test-key", Some(server.uri()));
        let err = source.generate(&request(1)).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<SourceError>(),
            Some(SourceError::InvalidPayload(_))
        ));
    }

    #[tokio::test]
    async fn advice_without_mistakes_skips_the_api() {
        // No server mounted: a request would fail with a network error.
        let source = GeminiSource::new("test-key", Some("http://127.0.0.1:9".to_string()));
        let advice = source.study_advice(&[]).await.unwrap();
        assert_eq!(advice, ADVICE_EMPTY);
    }

    #[tokio::test]
    async fn empty_advice_text_falls_back() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(GENERATE_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(candidates_body("  ")))
            .mount(&server)
            .await;

        let source = GeminiSource::new("test-key", Some(server.uri()));
        let questions = crate::prompt::parse_questions(&questions_payload()).unwrap();
        let advice = source.study_advice(&questions).await.unwrap();
        assert_eq!(advice, ADVICE_FALLBACK);
    }

    #[tokio::test]
    async fn correct_answer_feedback_skips_the_api() {
        let source = GeminiSource::new("test-key", Some("http://127.0.0.1:9".to_string()));
        let questions = crate::prompt::parse_questions(&questions_payload()).unwrap();
        let feedback = source
            .answer_feedback(&questions[0], "óxido férrico", true)
            .await
            .unwrap();
        assert_eq!(feedback, FEEDBACK_CORRECT);
    }
}
