// src/models/attempt.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::{config::MAX_QUESTION_COUNT, models::question::Difficulty};

/// One answered question inside an attempt. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerRecord {
    pub question_text: String,
    pub selected_option_text: String,
    pub is_correct: bool,
}

/// A completed run through a question set.
/// Persisted once into `quiz_attempts` + `quiz_answers`, never edited afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizAttempt {
    /// Database id; `None` until the attempt has been stored.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub user_id: i64,
    pub topic: String,
    pub difficulty: Difficulty,
    pub score: u32,
    pub total_questions: u32,
    /// Answers in question order.
    pub answers: Vec<AnswerRecord>,
    pub created_at: DateTime<Utc>,
}

impl QuizAttempt {
    /// Score as a percentage of the question count.
    pub fn percent(&self) -> f64 {
        if self.total_questions == 0 {
            return 0.0;
        }
        100.0 * self.score as f64 / self.total_questions as f64
    }
}

/// DTO for a client that ran the quiz itself and submits the finished attempt.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = validate_attempt_totals))]
pub struct SaveAttemptRequest {
    #[validate(length(min = 1, max = 200))]
    pub topic: String,
    pub difficulty: Difficulty,
    pub score: u32,
    #[validate(range(min = 1, max = MAX_QUESTION_COUNT))]
    pub total_questions: u32,
    pub answers: Vec<SubmittedAnswer>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmittedAnswer {
    pub question: String,
    pub selected_option: String,
    pub is_correct: bool,
}

/// Score must match the correct answers, and every question must be answered.
fn validate_attempt_totals(req: &SaveAttemptRequest) -> Result<(), ValidationError> {
    if req.answers.len() != req.total_questions as usize {
        return Err(ValidationError::new("answers_must_match_total_questions"));
    }
    let correct = req.answers.iter().filter(|a| a.is_correct).count();
    if req.score as usize != correct {
        return Err(ValidationError::new("score_must_match_correct_answers"));
    }
    Ok(())
}

impl SaveAttemptRequest {
    pub fn into_attempt(self, user_id: i64) -> QuizAttempt {
        QuizAttempt {
            id: None,
            user_id,
            topic: self.topic,
            difficulty: self.difficulty,
            score: self.score,
            total_questions: self.total_questions,
            answers: self
                .answers
                .into_iter()
                .map(|a| AnswerRecord {
                    question_text: a.question,
                    selected_option_text: a.selected_option,
                    is_correct: a.is_correct,
                })
                .collect(),
            created_at: Utc::now(),
        }
    }
}
