// src/services/attempt_store.rs

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder};
use tokio::sync::Mutex;

use crate::{
    error::AppError,
    models::attempt::{AnswerRecord, QuizAttempt},
    services::stats::UserHistory,
};

/// Append-only history of completed attempts.
#[async_trait]
pub trait AttemptStore: Send + Sync {
    /// Stores the attempt and all of its answers atomically. Returns the new attempt id.
    async fn save_attempt(&self, attempt: &QuizAttempt) -> Result<i64, AppError>;

    /// A user's attempts, most recent first, answers in question order.
    async fn list_attempts(&self, user_id: i64) -> Result<Vec<QuizAttempt>, AppError>;

    /// Every registered user with their attempts (answers omitted), for the leaderboard.
    async fn list_user_histories(&self) -> Result<Vec<UserHistory>, AppError>;
}

/// Hands a finished attempt to the store.
///
/// A failed write is logged and swallowed; the caller still reports completion.
pub async fn save_completed(store: &dyn AttemptStore, attempt: &QuizAttempt) -> Option<i64> {
    match store.save_attempt(attempt).await {
        Ok(id) => {
            tracing::info!(
                "Saved quiz attempt {} for user {} ({}/{})",
                id,
                attempt.user_id,
                attempt.score,
                attempt.total_questions
            );
            Some(id)
        }
        Err(e) => {
            tracing::error!("Failed to save quiz attempt for user {}: {:?}", attempt.user_id, e);
            None
        }
    }
}

fn check_invariants(attempt: &QuizAttempt) -> Result<(), AppError> {
    if attempt.total_questions == 0 {
        return Err(AppError::BadRequest("An attempt needs at least one question".to_string()));
    }
    if attempt.score > attempt.total_questions {
        return Err(AppError::BadRequest("Score exceeds question count".to_string()));
    }
    if attempt.answers.len() != attempt.total_questions as usize {
        return Err(AppError::BadRequest("Every question must be answered".to_string()));
    }
    Ok(())
}

#[derive(sqlx::FromRow)]
struct AttemptRow {
    id: i64,
    user_id: i64,
    topic: String,
    difficulty: String,
    score: i32,
    total_questions: i32,
    created_at: DateTime<Utc>,
}

impl AttemptRow {
    fn into_attempt(self, answers: Vec<AnswerRecord>) -> Result<QuizAttempt, AppError> {
        let difficulty = self
            .difficulty
            .parse()
            .map_err(AppError::InternalServerError)?;
        let to_u32 = |v: i32| {
            u32::try_from(v).map_err(|e| AppError::InternalServerError(e.to_string()))
        };

        Ok(QuizAttempt {
            id: Some(self.id),
            user_id: self.user_id,
            topic: self.topic,
            difficulty,
            score: to_u32(self.score)?,
            total_questions: to_u32(self.total_questions)?,
            answers,
            created_at: self.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct AnswerRow {
    quiz_attempt_id: i64,
    question_text: String,
    selected_option: String,
    is_correct: bool,
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: i64,
    username: String,
}

/// Postgres-backed store over `quiz_attempts` and `quiz_answers`.
#[derive(Clone)]
pub struct PgAttemptStore {
    pool: PgPool,
}

impl PgAttemptStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AttemptStore for PgAttemptStore {
    async fn save_attempt(&self, attempt: &QuizAttempt) -> Result<i64, AppError> {
        check_invariants(attempt)?;

        let mut tx = self.pool.begin().await?;

        let (attempt_id,): (i64,) = sqlx::query_as(
            r#"
            INSERT INTO quiz_attempts (user_id, topic, difficulty, score, total_questions, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            "#,
        )
        .bind(attempt.user_id)
        .bind(&attempt.topic)
        .bind(attempt.difficulty.as_str())
        .bind(attempt.score as i32)
        .bind(attempt.total_questions as i32)
        .bind(attempt.created_at)
        .fetch_one(&mut *tx)
        .await?;

        let mut query_builder = QueryBuilder::<Postgres>::new(
            "INSERT INTO quiz_answers (quiz_attempt_id, position, question_text, selected_option, is_correct) ",
        );
        query_builder.push_values(attempt.answers.iter().enumerate(), |mut row, (position, answer)| {
            row.push_bind(attempt_id)
                .push_bind(position as i32)
                .push_bind(answer.question_text.clone())
                .push_bind(answer.selected_option_text.clone())
                .push_bind(answer.is_correct);
        });
        query_builder.build().execute(&mut *tx).await?;

        // Dropping `tx` on any error above rolls the attempt row back.
        tx.commit().await?;

        Ok(attempt_id)
    }

    async fn list_attempts(&self, user_id: i64) -> Result<Vec<QuizAttempt>, AppError> {
        let rows: Vec<AttemptRow> = sqlx::query_as(
            r#"
            SELECT id, user_id, topic, difficulty, score, total_questions, created_at
            FROM quiz_attempts
            WHERE user_id = $1
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
        let answer_rows: Vec<AnswerRow> = sqlx::query_as(
            r#"
            SELECT quiz_attempt_id, question_text, selected_option, is_correct
            FROM quiz_answers
            WHERE quiz_attempt_id = ANY($1)
            ORDER BY quiz_attempt_id, position
            "#,
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let mut answers: HashMap<i64, Vec<AnswerRecord>> = HashMap::new();
        for row in answer_rows {
            answers.entry(row.quiz_attempt_id).or_default().push(AnswerRecord {
                question_text: row.question_text,
                selected_option_text: row.selected_option,
                is_correct: row.is_correct,
            });
        }

        rows.into_iter()
            .map(|row| {
                let recorded = answers.remove(&row.id).unwrap_or_default();
                row.into_attempt(recorded)
            })
            .collect()
    }

    async fn list_user_histories(&self) -> Result<Vec<UserHistory>, AppError> {
        let users: Vec<UserRow> = sqlx::query_as("SELECT id, username FROM users ORDER BY id")
            .fetch_all(&self.pool)
            .await?;

        let rows: Vec<AttemptRow> = sqlx::query_as(
            r#"
            SELECT id, user_id, topic, difficulty, score, total_questions, created_at
            FROM quiz_attempts
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut by_user: HashMap<i64, Vec<QuizAttempt>> = HashMap::new();
        for row in rows {
            let attempt = row.into_attempt(Vec::new())?;
            by_user.entry(attempt.user_id).or_default().push(attempt);
        }

        Ok(users
            .into_iter()
            .map(|u| UserHistory {
                attempts: by_user.remove(&u.id).unwrap_or_default(),
                user_id: u.id,
                username: u.username,
            })
            .collect())
    }
}

#[derive(Default)]
struct MemoryInner {
    users: Vec<(i64, String)>,
    attempts: Vec<QuizAttempt>,
}

/// Store kept entirely in memory. Used by tests and local runs without a database.
#[derive(Default)]
pub struct MemoryAttemptStore {
    inner: Mutex<MemoryInner>,
}

impl MemoryAttemptStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a user so they appear on the leaderboard.
    pub async fn add_user(&self, id: i64, username: impl Into<String>) {
        self.inner.lock().await.users.push((id, username.into()));
    }

    pub async fn saved_count(&self) -> usize {
        self.inner.lock().await.attempts.len()
    }
}

#[async_trait]
impl AttemptStore for MemoryAttemptStore {
    async fn save_attempt(&self, attempt: &QuizAttempt) -> Result<i64, AppError> {
        check_invariants(attempt)?;

        let mut inner = self.inner.lock().await;
        let id = inner.attempts.len() as i64 + 1;
        inner.attempts.push(QuizAttempt {
            id: Some(id),
            ..attempt.clone()
        });
        Ok(id)
    }

    async fn list_attempts(&self, user_id: i64) -> Result<Vec<QuizAttempt>, AppError> {
        let inner = self.inner.lock().await;
        let mut attempts: Vec<QuizAttempt> = inner
            .attempts
            .iter()
            .filter(|a| a.user_id == user_id)
            .cloned()
            .collect();
        // newest first; later inserts win ties
        attempts.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(attempts)
    }

    async fn list_user_histories(&self) -> Result<Vec<UserHistory>, AppError> {
        let users = self.inner.lock().await.users.clone();
        let mut histories = Vec::with_capacity(users.len());
        for (user_id, username) in users {
            let mut attempts = self.list_attempts(user_id).await?;
            for attempt in &mut attempts {
                attempt.answers.clear();
            }
            histories.push(UserHistory {
                user_id,
                username,
                attempts,
            });
        }
        Ok(histories)
    }
}
