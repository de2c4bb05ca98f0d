// src/handlers/flashcards.rs

use std::sync::Arc;

use axum::{Json, extract::State, response::IntoResponse};
use serde::Deserialize;
use serde_json::json;
use validator::Validate;

use crate::{
    config::FLASHCARD_COUNT,
    error::AppError,
    services::generator::{QuestionGenerator, resolve_flashcard_topic},
    utils::topic::normalize_topic,
};

/// DTO for a flashcard request. A missing topic or `random` picks one at random.
#[derive(Debug, Deserialize, Validate)]
pub struct FlashcardRequest {
    #[validate(length(max = 200))]
    pub topic: Option<String>,
}

pub async fn generate_flashcards(
    State(generator): State<Arc<dyn QuestionGenerator>>,
    Json(payload): Json<FlashcardRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let requested = payload.topic.as_deref().map(normalize_topic);
    let topic = resolve_flashcard_topic(requested.as_deref());

    let flashcards = generator.generate_flashcards(&topic, FLASHCARD_COUNT).await?;

    Ok(Json(json!({
        "flashcards": flashcards,
        "topic": topic,
    })))
}
