// src/handlers/stats.rs

use std::sync::Arc;

use axum::{Extension, Json, extract::State, response::IntoResponse};

use crate::{
    error::AppError,
    services::{attempt_store::AttemptStore, stats},
    utils::jwt::Claims,
};

/// Summary metrics over the caller's own history.
pub async fn my_stats(
    State(attempts): State<Arc<dyn AttemptStore>>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;
    let history = attempts.list_attempts(user_id).await?;
    Ok(Json(stats::user_stats(&history)))
}

/// All users ranked by average score, then by number of quizzes.
pub async fn leaderboard(
    State(attempts): State<Arc<dyn AttemptStore>>,
) -> Result<impl IntoResponse, AppError> {
    let histories = attempts.list_user_histories().await.map_err(|e| {
        tracing::error!("Failed to fetch leaderboard: {:?}", e);
        e
    })?;
    Ok(Json(stats::leaderboard(&histories)))
}
