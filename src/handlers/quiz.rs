// src/handlers/quiz.rs

use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use crate::{
    config::{DEFAULT_QUESTION_COUNT, MAX_QUESTION_COUNT, MIN_QUESTION_COUNT},
    error::AppError,
    models::{
        attempt::{QuizAttempt, SaveAttemptRequest},
        question::Difficulty,
    },
    services::{
        attempt_store::{AttemptStore, save_completed},
        generator::QuestionGenerator,
        quiz_session::{Advance, QuizSession, SessionView, TransitionError},
        session_store::SessionStore,
    },
    utils::{jwt::Claims, topic::normalize_topic},
};

/// DTO for starting a generated quiz.
#[derive(Debug, Deserialize, Validate)]
pub struct StartQuizRequest {
    #[validate(length(min = 1, max = 200))]
    pub topic: String,
    #[serde(default)]
    pub difficulty: Difficulty,
    #[validate(range(min = MIN_QUESTION_COUNT, max = MAX_QUESTION_COUNT))]
    pub count: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct AnswerRequest {
    pub option_index: usize,
}

#[derive(Debug, Serialize)]
struct StartQuizResponse {
    session_id: Uuid,
    #[serde(flatten)]
    session: SessionView,
}

/// Returned by the final `advance`.
#[derive(Debug, Serialize)]
struct CompletionResponse {
    #[serde(flatten)]
    session: SessionView,
    attempt: QuizAttempt,
    /// False when the history write failed; the result is still valid.
    saved: bool,
}

fn session_not_found() -> AppError {
    AppError::NotFound("Quiz session not found".to_string())
}

/// Generates questions for a topic and opens a quiz session on them.
///
/// A generator failure leaves nothing behind; the client may simply retry.
pub async fn start_session(
    State(generator): State<Arc<dyn QuestionGenerator>>,
    State(sessions): State<Arc<SessionStore>>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<StartQuizRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }
    let user_id = claims.user_id()?;

    let topic = normalize_topic(&payload.topic);
    if topic.is_empty() {
        return Err(AppError::BadRequest("Topic must not be empty".to_string()));
    }
    let count = payload.count.unwrap_or(DEFAULT_QUESTION_COUNT);

    let mut questions = generator
        .generate_questions(&topic, payload.difficulty, count)
        .await?;
    questions.truncate(count as usize);

    let session = QuizSession::new(user_id, topic, payload.difficulty, questions).map_err(|e| {
        tracing::error!("Generator produced an unusable question set: {}", e);
        AppError::Generation(e.to_string())
    })?;
    let view = session.view();
    let session_id = sessions.insert(session).await;

    tracing::info!(
        "User {} started quiz session {} ({} questions)",
        user_id,
        session_id,
        view.total_questions
    );

    Ok((
        StatusCode::CREATED,
        Json(StartQuizResponse {
            session_id,
            session: view,
        }),
    ))
}

/// Current view of a session.
pub async fn get_session(
    State(sessions): State<Arc<SessionStore>>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;

    let view = sessions
        .with_session(id, user_id, |s| s.view())
        .await
        .ok_or_else(session_not_found)?;

    Ok(Json(view))
}

/// Answers the current question and reveals the result.
pub async fn submit_answer(
    State(sessions): State<Arc<SessionStore>>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(req): Json<AnswerRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;

    let view = sessions
        .with_session(id, user_id, |s| -> Result<SessionView, TransitionError> {
            s.submit_answer(req.option_index)?;
            Ok(s.view())
        })
        .await
        .ok_or_else(session_not_found)??;

    Ok(Json(view))
}

/// Moves to the next question, or completes the quiz and records the attempt.
pub async fn advance(
    State(sessions): State<Arc<SessionStore>>,
    State(attempts): State<Arc<dyn AttemptStore>>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;

    let (outcome, view) = sessions
        .with_session(id, user_id, |s| s.advance().map(|a| (a, s.view())))
        .await
        .ok_or_else(session_not_found)??;

    match outcome {
        Advance::Next(_) => Ok(Json(view).into_response()),
        Advance::Completed(mut attempt) => {
            sessions.remove(id).await;

            // The session lock is released; a failed write must not block the result.
            let saved = save_completed(attempts.as_ref(), &attempt).await;
            attempt.id = saved;

            Ok(Json(CompletionResponse {
                session: view,
                attempt,
                saved: saved.is_some(),
            })
            .into_response())
        }
    }
}

/// Shows the previous question with its recorded result.
pub async fn retreat(
    State(sessions): State<Arc<SessionStore>>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;

    let view = sessions
        .with_session(id, user_id, |s| s.retreat().map(|_| s.view()))
        .await
        .ok_or_else(session_not_found)??;

    Ok(Json(view))
}

/// Stores an attempt the client ran on its own.
pub async fn save_attempt(
    State(attempts): State<Arc<dyn AttemptStore>>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<SaveAttemptRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }
    let user_id = claims.user_id()?;

    let mut attempt = payload.into_attempt(user_id);
    attempt.topic = normalize_topic(&attempt.topic);
    if attempt.topic.is_empty() {
        return Err(AppError::BadRequest("Topic must not be empty".to_string()));
    }

    let id = attempts.save_attempt(&attempt).await.map_err(|e| {
        tracing::error!("Failed to save quiz attempt: {:?}", e);
        e
    })?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "id": id,
            "message": "Quiz attempt saved successfully"
        })),
    ))
}

/// The caller's attempts with answers, newest first.
pub async fn history(
    State(attempts): State<Arc<dyn AttemptStore>>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;
    let list = attempts.list_attempts(user_id).await?;
    Ok(Json(list))
}
