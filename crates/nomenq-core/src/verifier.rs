//! Answer verification.
//!
//! Compares a student's answer against the canonical answer and its
//! accepted variants. Notation noise (case, whitespace, ion prefixes,
//! ionic charge suffixes) is normalized away before comparison; a second,
//! accent-folded pass accepts answers whose only defect is a missing or
//! misplaced diacritic, flagging them so the host can point it out.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use crate::model::Question;

/// One leading "ion"/"anion"/"cation" token, with or without the accent.
static ION_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:ion|anion|anión|cation|catión)\s+").expect("valid ion prefix pattern")
});

/// Ionic charge notation: optional caret, digits, trailing sign (e.g. "^2-", "3+").
static CHARGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\^?\d+[+-]").expect("valid charge pattern"));

/// Outcome of checking one answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AnswerCheck {
    /// Whether the answer is accepted.
    pub is_correct: bool,
    /// Accepted only after accent folding — right answer, wrong diacritics.
    pub accent_error: bool,
}

impl AnswerCheck {
    const INCORRECT: AnswerCheck = AnswerCheck {
        is_correct: false,
        accent_error: false,
    };
}

/// Check a student's answer against the canonical answer and every accepted
/// variant.
///
/// An empty answer is always incorrect; no comparison is attempted.
pub fn check_answer(user: &str, correct: &str, accepted: &[String]) -> AnswerCheck {
    if user.is_empty() {
        return AnswerCheck::INCORRECT;
    }

    let norm_user = normalize(user);
    let norm_correct = normalize(correct);

    if norm_user == norm_correct || accepted.iter().any(|a| normalize(a) == norm_user) {
        return AnswerCheck {
            is_correct: true,
            accent_error: false,
        };
    }

    let loose_user = fold_accents(&norm_user);
    if loose_user == fold_accents(&norm_correct)
        || accepted
            .iter()
            .any(|a| fold_accents(&normalize(a)) == loose_user)
    {
        return AnswerCheck {
            is_correct: true,
            accent_error: true,
        };
    }

    AnswerCheck::INCORRECT
}

impl Question {
    /// Check an answer against this question.
    pub fn check(&self, user_answer: &str) -> AnswerCheck {
        check_answer(user_answer, &self.correct_answer, &self.accepted_answers)
    }
}

/// Normalization applied identically to user input, the canonical answer,
/// and every accepted variant.
fn normalize(s: &str) -> String {
    let lowered = s.trim().to_lowercase();
    let without_prefix = ION_PREFIX.replace(&lowered, "");
    let without_charge = CHARGE.replace_all(&without_prefix, "");
    without_charge.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Strip diacritical marks (NFD, then drop combining marks).
fn fold_accents(s: &str) -> String {
    s.nfd().filter(|c| !is_combining_mark(*c)).collect()
}
