//! Core data model types for nomenq.
//!
//! These are the fundamental types the whole system uses to represent
//! questions and difficulty selection.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// A single quiz item. Immutable once generated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    /// Unique identifier, assigned locally when the question is parsed.
    pub id: Uuid,
    /// What the student is asked to produce.
    pub kind: QuestionKind,
    /// The text shown to the student.
    pub prompt: String,
    /// Which nomenclature the answer should use.
    pub target_notation: Notation,
    /// The canonical correct answer.
    pub correct_answer: String,
    /// Other answers accepted as correct (e.g. alternative nomenclatures).
    #[serde(default)]
    pub accepted_answers: Vec<String>,
    /// Optional explanation shown after answering.
    #[serde(default)]
    pub explanation: Option<String>,
}

/// The two question directions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuestionKind {
    /// Given a formula, ask for a name.
    FormulaToName,
    /// Given a name, ask for the formula.
    NameToFormula,
}

impl fmt::Display for QuestionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuestionKind::FormulaToName => write!(f, "FORMULA_TO_NAME"),
            QuestionKind::NameToFormula => write!(f, "NAME_TO_FORMULA"),
        }
    }
}

/// Target nomenclature hint attached to a question.
///
/// Wire values are the Spanish labels the generation service emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Notation {
    #[serde(rename = "Sistemática")]
    Systematic,
    #[serde(rename = "Tradicional")]
    Traditional,
    #[serde(rename = "Stock")]
    Stock,
    #[serde(rename = "Fórmula")]
    Formula,
    #[serde(rename = "Ninguna")]
    None,
    #[serde(rename = "Cualquiera")]
    Any,
}

impl fmt::Display for Notation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notation::Systematic => write!(f, "Sistemática"),
            Notation::Traditional => write!(f, "Tradicional"),
            Notation::Stock => write!(f, "Stock"),
            Notation::Formula => write!(f, "Fórmula"),
            Notation::None => write!(f, "Ninguna"),
            Notation::Any => write!(f, "Cualquiera"),
        }
    }
}

impl FromStr for Notation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Sistemática" => Ok(Notation::Systematic),
            "Tradicional" => Ok(Notation::Traditional),
            "Stock" => Ok(Notation::Stock),
            "Fórmula" => Ok(Notation::Formula),
            "Ninguna" => Ok(Notation::None),
            "Cualquiera" => Ok(Notation::Any),
            other => Err(format!("unknown notation: {other}")),
        }
    }
}

/// A concrete difficulty level — the only valid storage bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Easy,
    Medium,
    Hard,
}

impl Level {
    /// All levels, in the fixed order the refill scheduler visits them.
    pub const ALL: [Level; 3] = [Level::Easy, Level::Medium, Level::Hard];
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Level::Easy => write!(f, "easy"),
            Level::Medium => write!(f, "medium"),
            Level::Hard => write!(f, "hard"),
        }
    }
}

impl FromStr for Level {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "easy" => Ok(Level::Easy),
            "medium" => Ok(Level::Medium),
            "hard" => Ok(Level::Hard),
            other => Err(format!("unknown level: {other}")),
        }
    }
}

/// Request-time difficulty selection.
///
/// `Mixed` is a composition directive resolved by the manager into the three
/// concrete levels; it never names a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
    Mixed,
}

impl Difficulty {
    /// The concrete level behind this selection, if any.
    pub fn level(self) -> Option<Level> {
        match self {
            Difficulty::Easy => Some(Level::Easy),
            Difficulty::Medium => Some(Level::Medium),
            Difficulty::Hard => Some(Level::Hard),
            Difficulty::Mixed => None,
        }
    }
}

impl From<Level> for Difficulty {
    fn from(level: Level) -> Self {
        match level {
            Level::Easy => Difficulty::Easy,
            Level::Medium => Difficulty::Medium,
            Level::Hard => Difficulty::Hard,
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Difficulty::Easy => write!(f, "easy"),
            Difficulty::Medium => write!(f, "medium"),
            Difficulty::Hard => write!(f, "hard"),
            Difficulty::Mixed => write!(f, "mixed"),
        }
    }
}

impl FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mixed" => Ok(Difficulty::Mixed),
            other => other
                .parse::<Level>()
                .map(Difficulty::from)
                .map_err(|_| format!("unknown difficulty: {s}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_display_and_parse() {
        assert_eq!(Level::Easy.to_string(), "easy");
        assert_eq!("Hard".parse::<Level>().unwrap(), Level::Hard);
        assert!("extreme".parse::<Level>().is_err());
    }

    #[test]
    fn difficulty_bridges_to_level() {
        assert_eq!(Difficulty::Medium.level(), Some(Level::Medium));
        assert_eq!(Difficulty::Mixed.level(), None);
        assert_eq!(Difficulty::from(Level::Hard), Difficulty::Hard);
        assert_eq!("mixed".parse::<Difficulty>().unwrap(), Difficulty::Mixed);
        assert_eq!("easy".parse::<Difficulty>().unwrap(), Difficulty::Easy);
    }

    #[test]
    fn notation_wire_values() {
        assert_eq!(
            serde_json::to_string(&Notation::Systematic).unwrap(),
            "\"Sistemática\""
        );
        assert_eq!(
            serde_json::from_str::<Notation>("\"Cualquiera\"").unwrap(),
            Notation::Any
        );
        assert_eq!("Fórmula".parse::<Notation>().unwrap(), Notation::Formula);
    }

    #[test]
    fn question_serde_roundtrip() {
        let question = Question {
            id: Uuid::new_v4(),
            kind: QuestionKind::FormulaToName,
            prompt: "Nombra el compuesto Fe2O3".into(),
            target_notation: Notation::Any,
            correct_answer: "óxido de hierro (III)".into(),
            accepted_answers: vec!["trióxido de dihierro".into(), "óxido férrico".into()],
            explanation: None,
        };
        let json = serde_json::to_string(&question).unwrap();
        let back: Question = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id, question.id);
        assert_eq!(back.kind, QuestionKind::FormulaToName);
        assert_eq!(back.accepted_answers.len(), 2);
        assert!(json.contains("FORMULA_TO_NAME"));
    }
}
