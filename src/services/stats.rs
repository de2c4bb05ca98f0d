// src/services/stats.rs

//! Read-time aggregation over attempt histories. Everything here is a pure function.

use std::cmp::Ordering;

use chrono::{Duration, NaiveDate};

use crate::models::{
    attempt::QuizAttempt,
    stats::{LeaderboardRow, UserStats},
};

/// All attempts of one user, used as leaderboard input.
#[derive(Debug, Clone)]
pub struct UserHistory {
    pub user_id: i64,
    pub username: String,
    pub attempts: Vec<QuizAttempt>,
}

/// Mean of per-attempt percentages; 0 for an empty history.
pub fn average_score_percent(attempts: &[QuizAttempt]) -> f64 {
    if attempts.is_empty() {
        return 0.0;
    }
    attempts.iter().map(QuizAttempt::percent).sum::<f64>() / attempts.len() as f64
}

/// Topic with the highest mean percentage. Ties go to the topic seen first.
pub fn best_topic(attempts: &[QuizAttempt]) -> Option<String> {
    // (topic, percent sum, count) in first-seen order
    let mut topics: Vec<(&str, f64, usize)> = Vec::new();
    for attempt in attempts {
        match topics.iter_mut().find(|(t, _, _)| *t == attempt.topic) {
            Some(entry) => {
                entry.1 += attempt.percent();
                entry.2 += 1;
            }
            None => topics.push((attempt.topic.as_str(), attempt.percent(), 1)),
        }
    }

    let mut best: Option<(&str, f64)> = None;
    for (topic, sum, count) in topics {
        let mean = sum / count as f64;
        if best.is_none_or(|(_, top)| mean > top) {
            best = Some((topic, mean));
        }
    }
    best.map(|(topic, _)| topic.to_string())
}

/// Consecutive calendar days with activity, counted back from the most recent active day.
pub fn current_streak_days(attempts: &[QuizAttempt]) -> u32 {
    let mut days: Vec<NaiveDate> = attempts.iter().map(|a| a.created_at.date_naive()).collect();
    days.sort_unstable_by(|a, b| b.cmp(a));
    days.dedup();

    let Some(mut current) = days.first().copied() else {
        return 0;
    };

    let mut streak = 1;
    for day in days.into_iter().skip(1) {
        if current - day != Duration::days(1) {
            break;
        }
        streak += 1;
        current = day;
    }
    streak
}

pub fn user_stats(attempts: &[QuizAttempt]) -> UserStats {
    UserStats {
        total_quizzes: attempts.len(),
        average_score_percent: average_score_percent(attempts),
        best_topic: best_topic(attempts),
        current_streak_days: current_streak_days(attempts),
    }
}

/// Ranks users by average percentage, then by quiz count. The sort is stable,
/// so users equal on both keys keep their input order.
pub fn leaderboard(histories: &[UserHistory]) -> Vec<LeaderboardRow> {
    let mut rows: Vec<LeaderboardRow> = histories
        .iter()
        .map(|h| LeaderboardRow {
            rank: 0,
            user_id: h.user_id,
            username: h.username.clone(),
            total_quizzes: h.attempts.len(),
            total_score: h.attempts.iter().map(|a| u64::from(a.score)).sum(),
            average_score_percent: average_score_percent(&h.attempts),
            best_topic: best_topic(&h.attempts),
        })
        .collect();

    rows.sort_by(|a, b| {
        b.average_score_percent
            .partial_cmp(&a.average_score_percent)
            .unwrap_or(Ordering::Equal)
            .then_with(|| b.total_quizzes.cmp(&a.total_quizzes))
    });

    for (position, row) in rows.iter_mut().enumerate() {
        row.rank = position + 1;
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::question::Difficulty;
    use chrono::{DateTime, Utc};

    fn attempt(topic: &str, score: u32, total: u32, created_at: DateTime<Utc>) -> QuizAttempt {
        QuizAttempt {
            id: None,
            user_id: 1,
            topic: topic.to_string(),
            difficulty: Difficulty::Medium,
            score,
            total_questions: total,
            answers: Vec::new(),
            created_at,
        }
    }

    fn days_ago(n: i64) -> DateTime<Utc> {
        Utc::now() - Duration::days(n)
    }

    #[test]
    fn average_of_empty_history_is_zero() {
        assert_eq!(average_score_percent(&[]), 0.0);
    }

    #[test]
    fn average_of_half_is_fifty() {
        assert_eq!(average_score_percent(&[attempt("Rust", 5, 10, Utc::now())]), 50.0);
    }

    #[test]
    fn average_is_mean_of_percentages() {
        let history = [
            attempt("Rust", 1, 4, Utc::now()),
            attempt("Rust", 10, 10, Utc::now()),
        ];
        assert_eq!(average_score_percent(&history), 62.5);
    }

    #[test]
    fn best_topic_picks_highest_mean() {
        let history = [
            attempt("SQL", 10, 10, Utc::now()),
            attempt("Rust", 2, 10, Utc::now()),
            attempt("SQL", 6, 10, Utc::now()),
            attempt("Rust", 4, 10, Utc::now()),
        ];
        assert_eq!(best_topic(&history).as_deref(), Some("SQL"));
    }

    #[test]
    fn best_topic_tie_goes_to_first_seen() {
        let history = [
            attempt("Python", 8, 10, Utc::now()),
            attempt("Rust", 4, 5, Utc::now()),
        ];
        assert_eq!(best_topic(&history).as_deref(), Some("Python"));
    }

    #[test]
    fn best_topic_of_all_zero_scores_is_still_a_topic() {
        let history = [attempt("Go", 0, 5, Utc::now())];
        assert_eq!(best_topic(&history).as_deref(), Some("Go"));
        assert_eq!(best_topic(&[]), None);
    }

    #[test]
    fn streak_stops_at_first_gap() {
        let history = [
            attempt("a", 1, 1, days_ago(0)),
            attempt("a", 1, 1, days_ago(1)),
            attempt("a", 1, 1, days_ago(3)),
        ];
        assert_eq!(current_streak_days(&history), 2);
    }

    #[test]
    fn streak_of_single_day_is_one() {
        let history = [attempt("a", 1, 1, days_ago(0)), attempt("b", 0, 1, days_ago(0))];
        assert_eq!(current_streak_days(&history), 1);
        assert_eq!(current_streak_days(&[]), 0);
    }

    #[test]
    fn streak_ignores_input_order() {
        let history = [
            attempt("a", 1, 1, days_ago(12)),
            attempt("a", 1, 1, days_ago(10)),
            attempt("a", 1, 1, days_ago(11)),
            attempt("a", 1, 1, days_ago(10)),
        ];
        assert_eq!(current_streak_days(&history), 3);
    }

    #[test]
    fn user_stats_combines_all_metrics() {
        let history = [
            attempt("Rust", 3, 4, days_ago(0)),
            attempt("SQL", 1, 4, days_ago(1)),
        ];
        let stats = user_stats(&history);
        assert_eq!(stats.total_quizzes, 2);
        assert_eq!(stats.average_score_percent, 50.0);
        assert_eq!(stats.best_topic.as_deref(), Some("Rust"));
        assert_eq!(stats.current_streak_days, 2);
    }

    fn history(user_id: i64, name: &str, percents: &[(u32, u32)]) -> UserHistory {
        UserHistory {
            user_id,
            username: name.to_string(),
            attempts: percents
                .iter()
                .map(|&(score, total)| attempt("Rust", score, total, Utc::now()))
                .collect(),
        }
    }

    #[test]
    fn leaderboard_breaks_average_ties_by_quiz_count() {
        let b = history(2, "b", &[(8, 10); 3]);
        let a = history(1, "a", &[(8, 10); 5]);
        let rows = leaderboard(&[b, a]);

        assert_eq!(rows[0].username, "a");
        assert_eq!(rows[0].rank, 1);
        assert_eq!(rows[0].total_score, 40);
        assert_eq!(rows[1].username, "b");
        assert_eq!(rows[1].rank, 2);
    }

    #[test]
    fn leaderboard_sorts_by_average_and_keeps_idle_users() {
        let idle = history(3, "idle", &[]);
        let low = history(1, "low", &[(1, 10)]);
        let high = history(2, "high", &[(9, 10)]);
        let rows = leaderboard(&[idle, low, high]);

        let names: Vec<&str> = rows.iter().map(|r| r.username.as_str()).collect();
        assert_eq!(names, ["high", "low", "idle"]);
        assert_eq!(rows[2].average_score_percent, 0.0);
        assert_eq!(rows[2].best_topic, None);
        assert_eq!(rows.iter().map(|r| r.rank).collect::<Vec<_>>(), [1, 2, 3]);
    }

    #[test]
    fn leaderboard_full_ties_keep_input_order() {
        let rows = leaderboard(&[history(1, "x", &[(1, 2)]), history(2, "y", &[(1, 2)])]);
        assert_eq!(rows[0].username, "x");
        assert_eq!(rows[1].username, "y");
    }
}
