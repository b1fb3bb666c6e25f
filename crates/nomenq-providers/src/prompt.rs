//! Prompt construction and wire-payload parsing shared by the HTTP sources.
//!
//! The generation service speaks Spanish and returns questions as a JSON
//! array; both backends build the same instruction block and funnel their
//! payloads through the same parser.

use serde::Deserialize;
use uuid::Uuid;

use nomenq_core::error::SourceError;
use nomenq_core::model::{Level, Notation, Question, QuestionKind};
use nomenq_core::traits::GenerateRequest;

pub(crate) const GENERATION_TEMPERATURE: f64 = 0.8;
pub(crate) const ADVICE_TEMPERATURE: f64 = 0.7;
pub(crate) const FEEDBACK_TEMPERATURE: f64 = 0.5;

pub(crate) const ADVICE_EMPTY: &str = "¡Sigue así!";
pub(crate) const ADVICE_FALLBACK: &str = "Repasa las valencias y formulación.";
pub(crate) const FEEDBACK_CORRECT: &str = "¡Correcto! Muy bien.";

/// Per-level rule block injected into the system instructions.
pub(crate) fn difficulty_rules(level: Level) -> &'static str {
    match level {
        Level::Easy => {
            "NIVEL: BINARIOS (Alta Variedad).\n\
             - TIPOS: Óxidos, Hidruros, Sales Binarias.\n\
             - PROMPTS: Mezcla Sistemática, Stock y Tradicional."
        }
        Level::Medium => {
            "NIVEL: TERNARIOS.\n\
             - TIPOS: Hidróxidos, Oxoácidos (Simples/Polihidratados), Oxisales Neutras."
        }
        Level::Hard => {
            "NIVEL: AVANZADO.\n\
             - TIPOS: Sales Ácidas, Sales Dobles, Iones."
        }
    }
}

/// System instructions for one generation batch. The avoid-list is already
/// capped by the manager; it is forwarded verbatim.
pub(crate) fn build_instructions(request: &GenerateRequest) -> String {
    let mut instructions = format!(
        "Genera {} preguntas de química inorgánica en JSON.\n{}\n\n\
         REGLAS DE RESPUESTA (IMPORTANTE):\n\
         1. Si la pregunta es FORMULA_TO_NAME (dada la fórmula, pedir nombre):\n\
            - 'acceptedAnswers' DEBE incluir TODAS las nomenclaturas válidas (Stock, Sistemática, Tradicional).\n\
            - NO restringir la respuesta a una sola nomenclatura.\n\
            - 'targetNotation' puede ser 'Cualquiera'.\n\
         2. Si la pregunta es NAME_TO_FORMULA (dado el nombre, pedir fórmula):\n\
            - La respuesta es la fórmula correcta.\n",
        request.count,
        difficulty_rules(request.level),
    );

    if !request.avoid_prompts.is_empty() {
        instructions.push_str(&format!(
            "\nCONTEXTO:\nEVITAR ESTRICTAMENTE generar estos compuestos: {}.\n",
            request.avoid_prompts.join(", ")
        ));
    }
    if let Some(focus) = &request.focus_hint {
        instructions.push_str(&format!("FOCO: Incluir 3 similares a: {focus}.\n"));
    }

    instructions.push_str(
        "\nREGLAS GENERALES:\n\
         1. LANTÁNIDOS/ACTÍNIDOS PROHIBIDOS.\n\
         2. VARIAR elementos.",
    );
    instructions
}

/// Prompt asking for a study tip over the first few missed questions.
pub(crate) fn advice_prompt(mistakes: &[Question]) -> String {
    let examples: Vec<&str> = mistakes.iter().take(5).map(|q| q.prompt.as_str()).collect();
    format!(
        "El alumno falló en: {}. Dame un consejo de estudio breve (máx 15 palabras).",
        examples.join(", ")
    )
}

/// Prompt asking for a one-line reaction to a wrong answer.
pub(crate) fn feedback_prompt(question: &Question, user_answer: &str) -> String {
    format!(
        "Pregunta: {}. Correcto: {}. Usuario: \"{}\". Explica el error en 1 frase muy breve.",
        question.prompt, question.correct_answer, user_answer
    )
}

pub(crate) fn feedback_fallback(question: &Question) -> String {
    format!("La solución es {}.", question.correct_answer)
}

/// Structured-output schema for backends that support one (Gemini).
pub(crate) fn response_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "ARRAY",
        "items": {
            "type": "OBJECT",
            "properties": {
                "id": { "type": "INTEGER" },
                "type": { "type": "STRING", "enum": ["FORMULA_TO_NAME", "NAME_TO_FORMULA"] },
                "prompt": { "type": "STRING" },
                "targetNotation": {
                    "type": "STRING",
                    "enum": ["Sistemática", "Tradicional", "Stock", "Fórmula", "Ninguna", "Cualquiera"]
                },
                "correctAnswer": { "type": "STRING" },
                "acceptedAnswers": {
                    "type": "ARRAY",
                    "items": { "type": "STRING" },
                    "description": "Valid IUPAC names"
                }
            },
            "required": ["id", "type", "prompt", "targetNotation", "correctAnswer", "acceptedAnswers"]
        }
    })
}

/// A question as the model emits it. Model ids are sequence numbers with no
/// uniqueness guarantee and are discarded.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawQuestion {
    #[serde(default)]
    #[allow(dead_code)]
    id: Option<i64>,
    #[serde(rename = "type")]
    kind: QuestionKind,
    prompt: String,
    target_notation: Notation,
    correct_answer: String,
    #[serde(default)]
    accepted_answers: Vec<String>,
}

pub(crate) fn into_question(raw: RawQuestion) -> Question {
    Question {
        id: Uuid::new_v4(),
        kind: raw.kind,
        prompt: raw.prompt,
        target_notation: raw.target_notation,
        correct_answer: raw.correct_answer,
        accepted_answers: raw.accepted_answers,
        explanation: None,
    }
}

/// Parse a JSON array payload into questions.
pub(crate) fn parse_questions(payload: &str) -> Result<Vec<Question>, SourceError> {
    let raw: Vec<RawQuestion> =
        serde_json::from_str(payload).map_err(|e| SourceError::InvalidPayload(e.to_string()))?;
    Ok(raw.into_iter().map(into_question).collect())
}
