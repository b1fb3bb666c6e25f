//! The contract between the engine and the external question generator.
//!
//! Implementations live in the `nomenq-providers` crate; the manager only
//! ever sees this trait.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::model::{Level, Question};

/// A backend capable of generating quiz questions on demand.
///
/// Implementations must not retry internally on failure; the engine absorbs
/// failures by serving fewer questions or leaving a buffer unfilled.
#[async_trait]
pub trait QuestionSource: Send + Sync {
    /// Human-readable source name (e.g. "gemini").
    fn name(&self) -> &str;

    /// Generate a batch of freshly invented questions.
    async fn generate(&self, request: &GenerateRequest) -> anyhow::Result<Vec<Question>>;

    /// A short study tip based on the questions the student missed.
    async fn study_advice(&self, mistakes: &[Question]) -> anyhow::Result<String>;

    /// A one-line reaction to a single submitted answer.
    async fn answer_feedback(
        &self,
        question: &Question,
        user_answer: &str,
        is_correct: bool,
    ) -> anyhow::Result<String>;
}

/// Request for a batch of questions at one concrete level.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateRequest {
    /// Difficulty bucket to generate for. Never mixed: the manager resolves
    /// mixed selections into per-level requests before reaching the source.
    pub level: Level,
    /// How many questions to produce.
    pub count: usize,
    /// Recently issued prompts the generator should steer away from.
    #[serde(default)]
    pub avoid_prompts: Vec<String>,
    /// Optional topic to bias the batch towards (e.g. a compound the
    /// student keeps getting wrong).
    #[serde(default)]
    pub focus_hint: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generate_request_serde_defaults() {
        let request: GenerateRequest =
            serde_json::from_str(r#"{"level": "easy", "count": 5}"#).unwrap();
        assert_eq!(request.level, Level::Easy);
        assert_eq!(request.count, 5);
        assert!(request.avoid_prompts.is_empty());
        assert!(request.focus_hint.is_none());
    }
}
