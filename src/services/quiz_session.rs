// src/services/quiz_session.rs

//! Quiz attempt lifecycle.
//!
//! A [`QuizSession`] walks one user through a generated question set:
//!
//! ```text
//! AwaitingAnswer(i) --submit_answer--> ShowingResult(i) --advance--> AwaitingAnswer(i + 1)
//!                                                        \--advance (last)--> Completed
//! ```
//!
//! Answers are only accepted for the first unanswered question, so the answer
//! log is always in question order. `retreat` is view-only: it shows an earlier
//! question together with its recorded result and never reopens it.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::models::{
    attempt::{AnswerRecord, QuizAttempt},
    question::{Difficulty, PublicQuestion, Question},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "index", rename_all = "snake_case")]
pub enum SessionState {
    AwaitingAnswer(usize),
    ShowingResult(usize),
    Completed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::AwaitingAnswer(i) => write!(f, "awaiting an answer to question {}", i + 1),
            SessionState::ShowingResult(i) => write!(f, "showing the result of question {}", i + 1),
            SessionState::Completed => f.write_str("completed"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("a quiz needs at least one question")]
    EmptyQuestionSet,

    #[error("question {index} has no option at its correct index")]
    MalformedQuestion { index: usize },

    #[error("option {option} does not exist, the question has {available} options")]
    OptionOutOfRange { option: usize, available: usize },

    #[error("cannot {action} while {state}")]
    InvalidTransition {
        action: &'static str,
        state: SessionState,
    },
}

/// Outcome of answering one question.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnswerVerdict {
    pub question_index: usize,
    pub selected_option_index: usize,
    pub correct_option_index: usize,
    pub is_correct: bool,
    pub explanation: String,
}

/// What `advance` moved the session to.
#[derive(Debug, Clone, PartialEq)]
pub enum Advance {
    Next(SessionState),
    /// The session finished; the attempt must be handed to persistence exactly once.
    Completed(QuizAttempt),
}

/// Snapshot of a session suitable for sending to the client.
#[derive(Debug, Serialize)]
pub struct SessionView {
    #[serde(flatten)]
    pub state: SessionState,
    pub topic: String,
    pub difficulty: Difficulty,
    pub total_questions: usize,
    pub answered: usize,
    pub score: u32,
    pub question: Option<PublicQuestion>,
    pub result: Option<AnswerVerdict>,
}

#[derive(Debug, Clone)]
pub struct QuizSession {
    user_id: i64,
    topic: String,
    difficulty: Difficulty,
    questions: Vec<Question>,
    state: SessionState,
    score: u32,
    answers: Vec<AnswerRecord>,
    /// Selected option index per answer, parallel to `answers`.
    selections: Vec<usize>,
    started_at: DateTime<Utc>,
}

impl QuizSession {
    /// Starts a session in `AwaitingAnswer(0)`.
    pub fn new(
        user_id: i64,
        topic: impl Into<String>,
        difficulty: Difficulty,
        questions: Vec<Question>,
    ) -> Result<Self, TransitionError> {
        if questions.is_empty() {
            return Err(TransitionError::EmptyQuestionSet);
        }
        if let Some(index) = questions.iter().position(|q| !q.is_well_formed()) {
            return Err(TransitionError::MalformedQuestion { index });
        }

        Ok(Self {
            user_id,
            topic: topic.into(),
            difficulty,
            state: SessionState::AwaitingAnswer(0),
            score: 0,
            answers: Vec::with_capacity(questions.len()),
            selections: Vec::with_capacity(questions.len()),
            questions,
            started_at: Utc::now(),
        })
    }

    pub fn user_id(&self) -> i64 {
        self.user_id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn answers(&self) -> &[AnswerRecord] {
        &self.answers
    }

    pub fn total_questions(&self) -> usize {
        self.questions.len()
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn is_completed(&self) -> bool {
        self.state == SessionState::Completed
    }

    /// Records the answer to the current question.
    pub fn submit_answer(&mut self, option_index: usize) -> Result<AnswerVerdict, TransitionError> {
        let index = match self.state {
            SessionState::AwaitingAnswer(i) => i,
            state => {
                return Err(TransitionError::InvalidTransition {
                    action: "submit an answer",
                    state,
                });
            }
        };
        debug_assert_eq!(index, self.answers.len());

        let question = &self.questions[index];
        let selected = question
            .options
            .get(option_index)
            .ok_or(TransitionError::OptionOutOfRange {
                option: option_index,
                available: question.options.len(),
            })?;

        let is_correct = option_index == question.correct_option_index;
        if is_correct {
            self.score += 1;
        }
        self.answers.push(AnswerRecord {
            question_text: question.text.clone(),
            selected_option_text: selected.clone(),
            is_correct,
        });
        self.selections.push(option_index);
        self.state = SessionState::ShowingResult(index);

        Ok(self.verdict(index))
    }

    /// Moves past the result screen. On the last question this completes the session.
    pub fn advance(&mut self) -> Result<Advance, TransitionError> {
        let index = match self.state {
            SessionState::ShowingResult(i) => i,
            state => {
                return Err(TransitionError::InvalidTransition {
                    action: "advance",
                    state,
                });
            }
        };

        let next = index + 1;
        if next == self.questions.len() {
            self.state = SessionState::Completed;
            return Ok(Advance::Completed(self.to_attempt()));
        }

        self.state = if next < self.answers.len() {
            SessionState::ShowingResult(next)
        } else {
            SessionState::AwaitingAnswer(next)
        };
        Ok(Advance::Next(self.state))
    }

    /// Shows the previous question with its recorded result. Nothing is undone.
    pub fn retreat(&mut self) -> Result<SessionState, TransitionError> {
        let index = match self.state {
            SessionState::AwaitingAnswer(i) | SessionState::ShowingResult(i) if i > 0 => i,
            state => {
                return Err(TransitionError::InvalidTransition {
                    action: "go back",
                    state,
                });
            }
        };

        self.state = SessionState::ShowingResult(index - 1);
        Ok(self.state)
    }

    pub fn view(&self) -> SessionView {
        let (question, result) = match self.state {
            SessionState::AwaitingAnswer(i) => (Some(PublicQuestion::from(&self.questions[i])), None),
            SessionState::ShowingResult(i) => (
                Some(PublicQuestion::from(&self.questions[i])),
                Some(self.verdict(i)),
            ),
            SessionState::Completed => (None, None),
        };

        SessionView {
            state: self.state,
            topic: self.topic.clone(),
            difficulty: self.difficulty,
            total_questions: self.questions.len(),
            answered: self.answers.len(),
            score: self.score,
            question,
            result,
        }
    }

    fn verdict(&self, index: usize) -> AnswerVerdict {
        let question = &self.questions[index];
        AnswerVerdict {
            question_index: index,
            selected_option_index: self.selections[index],
            correct_option_index: question.correct_option_index,
            is_correct: self.answers[index].is_correct,
            explanation: question.explanation.clone(),
        }
    }

    fn to_attempt(&self) -> QuizAttempt {
        QuizAttempt {
            id: None,
            user_id: self.user_id,
            topic: self.topic.clone(),
            difficulty: self.difficulty,
            score: self.score,
            total_questions: self.questions.len() as u32,
            answers: self.answers.clone(),
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question(options: &[&str], correct: usize) -> Question {
        Question {
            text: format!("Question with answer {}", correct),
            options: options.iter().map(|o| o.to_string()).collect(),
            correct_option_index: correct,
            explanation: "because".to_string(),
        }
    }

    fn session(questions: Vec<Question>) -> QuizSession {
        QuizSession::new(1, "Rust", Difficulty::Medium, questions).unwrap()
    }

    fn expect_completed(advance: Advance) -> QuizAttempt {
        match advance {
            Advance::Completed(attempt) => attempt,
            other => panic!("expected completion, got {:?}", other),
        }
    }

    #[test]
    fn starts_awaiting_first_answer() {
        let s = session(vec![question(&["A", "B", "C", "D"], 0)]);
        assert_eq!(s.state(), SessionState::AwaitingAnswer(0));
        assert_eq!(s.score(), 0);
    }

    #[test]
    fn rejects_empty_and_malformed_question_sets() {
        assert_eq!(
            QuizSession::new(1, "t", Difficulty::Easy, vec![]).unwrap_err(),
            TransitionError::EmptyQuestionSet
        );
        let bad = vec![question(&["A", "B"], 0), question(&["A", "B"], 5)];
        assert_eq!(
            QuizSession::new(1, "t", Difficulty::Easy, bad).unwrap_err(),
            TransitionError::MalformedQuestion { index: 1 }
        );
    }

    #[test]
    fn n_cycles_complete_n_questions() {
        for n in 1..=5 {
            let mut s = session((0..n).map(|_| question(&["A", "B", "C", "D"], 2)).collect());
            let mut completed = None;
            for i in 0..n {
                assert_eq!(s.state(), SessionState::AwaitingAnswer(i));
                s.submit_answer(i % 4).unwrap();
                match s.advance().unwrap() {
                    Advance::Next(_) => assert!(i + 1 < n),
                    Advance::Completed(attempt) => completed = Some(attempt),
                }
            }
            let attempt = completed.expect("session should complete");
            assert_eq!(s.state(), SessionState::Completed);
            assert_eq!(attempt.total_questions as usize, n);
            assert_eq!(attempt.answers.len(), n);
            let correct = attempt.answers.iter().filter(|a| a.is_correct).count();
            assert_eq!(attempt.score as usize, correct);
            assert!(attempt.score as usize <= n);
        }
    }

    #[test]
    fn two_correct_answers_score_two() {
        let mut s = session(vec![
            question(&["A", "B", "C", "D"], 1),
            question(&["A", "B"], 0),
        ]);

        assert!(s.submit_answer(1).unwrap().is_correct);
        s.advance().unwrap();
        assert!(s.submit_answer(0).unwrap().is_correct);
        let attempt = expect_completed(s.advance().unwrap());

        assert_eq!(attempt.score, 2);
        assert_eq!(attempt.answers.len(), 2);
        assert!(attempt.answers.iter().all(|a| a.is_correct));
        assert_eq!(attempt.answers[0].selected_option_text, "B");
        assert_eq!(attempt.answers[1].selected_option_text, "A");
    }

    #[test]
    fn single_wrong_answer_scores_zero() {
        let mut s = session(vec![question(&["A", "B", "C", "D"], 3)]);
        let verdict = s.submit_answer(0).unwrap();
        assert!(!verdict.is_correct);
        assert_eq!(verdict.correct_option_index, 3);

        let attempt = expect_completed(s.advance().unwrap());
        assert_eq!(attempt.score, 0);
        assert_eq!(attempt.total_questions, 1);
        assert_eq!(attempt.user_id, 1);
        assert_eq!(attempt.topic, "Rust");
    }

    #[test]
    fn answering_twice_is_rejected_without_second_record() {
        let mut s = session(vec![question(&["A", "B", "C", "D"], 0), question(&["A", "B"], 0)]);
        s.submit_answer(0).unwrap();

        let err = s.submit_answer(0).unwrap_err();
        assert!(matches!(err, TransitionError::InvalidTransition { .. }));
        assert_eq!(s.answers().len(), 1);
        assert_eq!(s.score(), 1);
        assert_eq!(s.state(), SessionState::ShowingResult(0));
    }

    #[test]
    fn out_of_range_option_leaves_state_unchanged() {
        let mut s = session(vec![question(&["A", "B"], 0)]);
        assert_eq!(
            s.submit_answer(2).unwrap_err(),
            TransitionError::OptionOutOfRange { option: 2, available: 2 }
        );
        assert_eq!(s.state(), SessionState::AwaitingAnswer(0));
        assert!(s.answers().is_empty());
    }

    #[test]
    fn advance_requires_an_answer() {
        let mut s = session(vec![question(&["A", "B"], 0)]);
        assert!(s.advance().is_err());
        assert_eq!(s.state(), SessionState::AwaitingAnswer(0));
    }

    #[test]
    fn completed_is_terminal() {
        let mut s = session(vec![question(&["A", "B"], 0)]);
        s.submit_answer(0).unwrap();
        expect_completed(s.advance().unwrap());

        assert!(s.submit_answer(0).is_err());
        assert!(s.advance().is_err());
        assert!(s.retreat().is_err());
        assert_eq!(s.state(), SessionState::Completed);
        assert_eq!(s.answers().len(), 1);
    }

    #[test]
    fn retreat_is_view_only() {
        let mut s = session(vec![
            question(&["A", "B"], 0),
            question(&["A", "B"], 1),
            question(&["A", "B"], 0),
        ]);
        assert!(s.retreat().is_err());

        s.submit_answer(1).unwrap();
        s.advance().unwrap();
        assert_eq!(s.retreat().unwrap(), SessionState::ShowingResult(0));

        // the earlier question cannot be re-answered
        assert!(s.submit_answer(0).is_err());
        assert_eq!(s.answers().len(), 1);
        assert_eq!(s.score(), 0);

        let view = s.view();
        let result = view.result.expect("result is shown");
        assert_eq!(result.selected_option_index, 1);
        assert!(!result.is_correct);

        // walking forward returns to the first unanswered question
        assert_eq!(s.advance().unwrap(), Advance::Next(SessionState::AwaitingAnswer(1)));
        s.submit_answer(1).unwrap();
        s.advance().unwrap();
        s.retreat().unwrap();
        s.retreat().unwrap();
        assert_eq!(s.state(), SessionState::ShowingResult(0));
        assert_eq!(s.advance().unwrap(), Advance::Next(SessionState::ShowingResult(1)));
        assert_eq!(s.advance().unwrap(), Advance::Next(SessionState::AwaitingAnswer(2)));
        s.submit_answer(0).unwrap();
        let attempt = expect_completed(s.advance().unwrap());
        assert_eq!(attempt.score, 2);
        assert_eq!(attempt.answers.len(), 3);
    }

    #[test]
    fn view_hides_answer_until_submitted() {
        let mut s = session(vec![question(&["A", "B", "C", "D"], 2)]);
        let view = s.view();
        assert!(view.question.is_some());
        assert!(view.result.is_none());

        s.submit_answer(2).unwrap();
        let view = s.view();
        assert_eq!(view.result.unwrap().correct_option_index, 2);
        assert_eq!(view.score, 1);
    }
}
