//! Exam grading.
//!
//! Pure functions over a finished answer sheet: per-question verification,
//! the 0–100 score, and the pass/distinction thresholds.

use std::collections::HashMap;

use serde::Serialize;
use uuid::Uuid;

use crate::model::Question;
use crate::verifier::check_answer;

/// Minimum score (out of 100) to pass.
pub const PASS_SCORE: u32 = 50;

/// Fraction of correct answers required for a distinction.
pub const DISTINCTION_RATIO: f64 = 0.9;

/// One graded answer.
#[derive(Debug, Clone, Serialize)]
pub struct GradedQuestion {
    pub question: Question,
    pub user_answer: String,
    pub is_correct: bool,
    /// Correct only after accent folding.
    pub accent_error: bool,
}

/// A fully graded exam.
#[derive(Debug, Clone, Serialize)]
pub struct ExamReport {
    pub graded: Vec<GradedQuestion>,
    pub correct: usize,
    /// Rounded percentage of correct answers, 0 for an empty exam.
    pub score: u32,
    pub passed: bool,
    /// At least `DISTINCTION_RATIO` of the exam answered correctly
    /// (threshold rounds up).
    pub distinction: bool,
}

impl ExamReport {
    /// The questions answered incorrectly, in exam order. Feed these to
    /// `QuestionSource::study_advice`.
    pub fn mistakes(&self) -> Vec<&Question> {
        self.graded
            .iter()
            .filter(|g| !g.is_correct)
            .map(|g| &g.question)
            .collect()
    }
}

/// Grade an answer sheet. Questions without an entry in `answers` are
/// graded as unanswered (empty, always incorrect).
pub fn grade_exam(questions: &[Question], answers: &HashMap<Uuid, String>) -> ExamReport {
    let graded: Vec<GradedQuestion> = questions
        .iter()
        .map(|question| {
            let user_answer = answers.get(&question.id).cloned().unwrap_or_default();
            let check = check_answer(
                &user_answer,
                &question.correct_answer,
                &question.accepted_answers,
            );
            GradedQuestion {
                question: question.clone(),
                user_answer,
                is_correct: check.is_correct,
                accent_error: check.accent_error,
            }
        })
        .collect();

    let total = graded.len();
    let correct = graded.iter().filter(|g| g.is_correct).count();
    let score = if total == 0 {
        0
    } else {
        ((correct as f64 / total as f64) * 100.0).round() as u32
    };
    let threshold = (total as f64 * DISTINCTION_RATIO).ceil() as usize;
    let distinction = total > 0 && correct >= threshold;

    ExamReport {
        graded,
        correct,
        score,
        passed: score >= PASS_SCORE,
        distinction,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Notation, QuestionKind};

    fn question(correct_answer: &str) -> Question {
        Question {
            id: Uuid::new_v4(),
            kind: QuestionKind::NameToFormula,
            prompt: format!("Formula de {correct_answer}"),
            target_notation: Notation::Formula,
            correct_answer: correct_answer.to_string(),
            accepted_answers: vec![],
            explanation: None,
        }
    }

    fn answer_all(questions: &[Question]) -> HashMap<Uuid, String> {
        questions
            .iter()
            .map(|q| (q.id, q.correct_answer.clone()))
            .collect()
    }

    #[test]
    fn perfect_exam() {
        let questions: Vec<_> = (0..10).map(|i| question(&format!("a{i}"))).collect();
        let report = grade_exam(&questions, &answer_all(&questions));

        assert_eq!(report.correct, 10);
        assert_eq!(report.score, 100);
        assert!(report.passed);
        assert!(report.distinction);
        assert!(report.mistakes().is_empty());
    }

    #[test]
    fn unanswered_questions_count_as_wrong() {
        let questions: Vec<_> = (0..4).map(|i| question(&format!("a{i}"))).collect();
        let mut answers = answer_all(&questions);
        answers.remove(&questions[0].id);
        answers.insert(questions[1].id, "wrong".into());

        let report = grade_exam(&questions, &answers);
        assert_eq!(report.correct, 2);
        assert_eq!(report.score, 50);
        assert!(report.passed);
        assert!(!report.distinction);
        assert_eq!(report.mistakes().len(), 2);
        assert_eq!(report.mistakes()[0].id, questions[0].id);
    }

    #[test]
    fn distinction_threshold_rounds_up() {
        // 10 questions: ceil(9.0) = 9 correct needed.
        let questions: Vec<_> = (0..10).map(|i| question(&format!("a{i}"))).collect();
        let mut answers = answer_all(&questions);
        answers.insert(questions[9].id, "wrong".into());

        let report = grade_exam(&questions, &answers);
        assert_eq!(report.correct, 9);
        assert!(report.distinction);

        answers.insert(questions[8].id, "wrong".into());
        let report = grade_exam(&questions, &answers);
        assert_eq!(report.correct, 8);
        assert!(!report.distinction);
    }

    #[test]
    fn accent_errors_still_score_as_correct() {
        let q = question("óxido de calcio");
        let answers = HashMap::from([(q.id, "oxido de calcio".to_string())]);

        let report = grade_exam(&[q], &answers);
        assert_eq!(report.correct, 1);
        assert!(report.graded[0].accent_error);
        assert_eq!(report.score, 100);
    }

    #[test]
    fn empty_exam_scores_zero() {
        let report = grade_exam(&[], &HashMap::new());
        assert_eq!(report.score, 0);
        assert!(!report.passed);
        assert!(!report.distinction);
    }
}
