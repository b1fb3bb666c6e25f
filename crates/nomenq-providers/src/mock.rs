//! Mock question source for testing.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use uuid::Uuid;

use nomenq_core::error::SourceError;
use nomenq_core::model::{Notation, Question, QuestionKind};
use nomenq_core::traits::{GenerateRequest, QuestionSource};

/// A deterministic in-memory source for exercising the engine without real
/// API calls.
///
/// Records every request it receives, numbers its questions so prompts are
/// unique across batches, and can be scripted to fail.
pub struct MockSource {
    requests: Mutex<Vec<GenerateRequest>>,
    fail_generation: AtomicBool,
    serial: AtomicUsize,
}

impl MockSource {
    pub fn new() -> Self {
        Self {
            requests: Mutex::new(Vec::new()),
            fail_generation: AtomicBool::new(false),
            serial: AtomicUsize::new(0),
        }
    }

    /// A mock whose `generate` always fails.
    pub fn failing() -> Self {
        let source = Self::new();
        source.fail_generation.store(true, Ordering::Relaxed);
        source
    }

    pub fn set_failing(&self, failing: bool) {
        self.fail_generation.store(failing, Ordering::Relaxed);
    }

    /// Number of generate calls received.
    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// All generate requests received, in order.
    pub fn requests(&self) -> Vec<GenerateRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn next_question(&self, request: &GenerateRequest) -> Question {
        let n = self.serial.fetch_add(1, Ordering::Relaxed);
        let kind = if n % 2 == 0 {
            QuestionKind::FormulaToName
        } else {
            QuestionKind::NameToFormula
        };
        Question {
            id: Uuid::new_v4(),
            kind,
            prompt: format!("Nombra el compuesto nº{n} ({})", request.level),
            target_notation: Notation::Any,
            correct_answer: format!("respuesta {n}"),
            accepted_answers: vec![],
            explanation: None,
        }
    }
}

impl Default for MockSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl QuestionSource for MockSource {
    fn name(&self) -> &str {
        "mock"
    }

    async fn generate(&self, request: &GenerateRequest) -> anyhow::Result<Vec<Question>> {
        self.requests.lock().unwrap().push(request.clone());
        if self.fail_generation.load(Ordering::Relaxed) {
            return Err(SourceError::NetworkError("mock source offline".into()).into());
        }
        Ok((0..request.count)
            .map(|_| self.next_question(request))
            .collect())
    }

    async fn study_advice(&self, mistakes: &[Question]) -> anyhow::Result<String> {
        if mistakes.is_empty() {
            return Ok("¡Sigue así!".to_string());
        }
        Ok("Repasa los óxidos y las valencias.".to_string())
    }

    async fn answer_feedback(
        &self,
        question: &Question,
        _user_answer: &str,
        is_correct: bool,
    ) -> anyhow::Result<String> {
        if is_correct {
            return Ok("¡Correcto! Muy bien.".to_string());
        }
        Ok(format!("La solución es {}.", question.correct_answer))
    }
}
