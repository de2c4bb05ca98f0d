// src/models/stats.rs

use serde::Serialize;

/// Per-user summary derived from the attempt history. Never stored.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserStats {
    pub total_quizzes: usize,
    pub average_score_percent: f64,
    pub best_topic: Option<String>,
    pub current_streak_days: u32,
}

/// One ranked line of the global leaderboard.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeaderboardRow {
    /// 1-based position after sorting.
    pub rank: usize,
    pub user_id: i64,
    pub username: String,
    pub total_quizzes: usize,
    pub total_score: u64,
    pub average_score_percent: f64,
    pub best_topic: Option<String>,
}
