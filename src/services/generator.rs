// src/services/generator.rs

//! Question and flashcard generation through the Gemini `generateContent` API.
//!
//! The model is prompted for bare JSON. Whatever comes back is treated as
//! untrusted: markdown fences are stripped, the payload must be a non-empty
//! JSON array, and every item must be well formed. Anything else is a
//! [`GenerationError`]; nothing is coerced into shape.

use std::{sync::LazyLock, time::Duration};

use async_trait::async_trait;
use rand::seq::SliceRandom;
use regex::Regex;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use thiserror::Error;
use url::Url;

use crate::{
    config::{Config, QUESTION_OPTION_COUNT},
    models::question::{Difficulty, Flashcard, Question},
};

/// Topics used when a flashcard request asks for a random one.
pub const RANDOM_TOPICS: &[&str] = &[
    "JavaScript",
    "Python",
    "React",
    "Node.js",
    "SQL",
    "Data Structures",
    "Algorithms",
];

static CODE_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"```(?:json)?\s?").expect("code fence pattern is valid"));

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("generator is not configured: {0}")]
    NotConfigured(String),

    #[error("request to generator failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("generator responded with status {status}: {body}")]
    Upstream { status: u16, body: String },

    #[error("generator response carried no text")]
    MissingText,

    #[error("generator returned invalid JSON: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("generator returned {0} instead of a JSON array")]
    NotAnArray(&'static str),

    #[error("generator returned an empty list")]
    Empty,

    #[error("item {index} is invalid: {reason}")]
    InvalidItem { index: usize, reason: String },
}

/// Produces quiz content for a topic.
#[async_trait]
pub trait QuestionGenerator: Send + Sync {
    async fn generate_questions(
        &self,
        topic: &str,
        difficulty: Difficulty,
        count: u32,
    ) -> Result<Vec<Question>, GenerationError>;

    async fn generate_flashcards(
        &self,
        topic: &str,
        count: u32,
    ) -> Result<Vec<Flashcard>, GenerationError>;
}

/// Client for Google's Generative Language API.
#[derive(Clone)]
pub struct GeminiGenerator {
    client: Client,
    endpoint: Url,
    api_key: String,
}

impl GeminiGenerator {
    pub fn from_config(config: &Config) -> Result<Self, GenerationError> {
        let mut base = config.gemini_base_url.clone();
        if !base.ends_with('/') {
            base.push('/');
        }
        let endpoint = Url::parse(&base)
            .and_then(|base| base.join(&format!("models/{}:generateContent", config.gemini_model)))
            .map_err(|e| GenerationError::NotConfigured(format!("bad GEMINI_BASE_URL: {}", e)))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.generator_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            endpoint,
            api_key: config.gemini_api_key.clone(),
        })
    }

    /// Sends one prompt and returns the model's text output.
    async fn generate_text(&self, prompt: &str) -> Result<String, GenerationError> {
        if self.api_key.is_empty() {
            return Err(GenerationError::NotConfigured("GEMINI_API_KEY is empty".to_string()));
        }

        let res = self
            .client
            .post(self.endpoint.clone())
            .header("x-goog-api-key", &self.api_key)
            .json(&json!({
                "contents": [{ "parts": [{ "text": prompt }] }]
            }))
            .send()
            .await?;

        if !res.status().is_success() {
            let status = res.status().as_u16();
            let body = res.text().await.unwrap_or_default();
            return Err(GenerationError::Upstream { status, body });
        }

        let body: Value = res.json().await?;
        extract_text(&body)
    }
}

#[async_trait]
impl QuestionGenerator for GeminiGenerator {
    async fn generate_questions(
        &self,
        topic: &str,
        difficulty: Difficulty,
        count: u32,
    ) -> Result<Vec<Question>, GenerationError> {
        tracing::info!("Generating {} {} questions about {:?}", count, difficulty, topic);
        let text = self.generate_text(&quiz_prompt(topic, difficulty, count)).await?;
        parse_questions(&text, count as usize)
    }

    async fn generate_flashcards(
        &self,
        topic: &str,
        count: u32,
    ) -> Result<Vec<Flashcard>, GenerationError> {
        tracing::info!("Generating {} flashcards about {:?}", count, topic);
        let text = self.generate_text(&flashcard_prompt(topic, count)).await?;
        parse_flashcards(&text)
    }
}

/// Pulls `candidates[0].content.parts[0].text` out of a Gemini response.
fn extract_text(body: &Value) -> Result<String, GenerationError> {
    body.get("candidates")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("content"))
        .and_then(|c| c.get("parts"))
        .and_then(|p| p.get(0))
        .and_then(|p| p.get("text"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or(GenerationError::MissingText)
}

pub fn quiz_prompt(topic: &str, difficulty: Difficulty, count: u32) -> String {
    format!(
        "Generate {count} {difficulty}-difficulty multiple-choice questions about the following topic: {topic}. \
Focus on concepts related to this topic, such as its purpose, usage, and best practices. \
Do not ask questions about specific code implementation. \
Provide the questions in JSON format with this structure:

[
  {{
    \"question\": \"Your question here\",
    \"options\": [\"Option 1\", \"Option 2\", \"Option 3\", \"Option 4\"],
    \"correctOptionIndex\": 0,
    \"explanation\": \"Brief explanation of the correct answer\"
  }},
  ...
]

Please respond only with the JSON data and nothing else."
    )
}

pub fn flashcard_prompt(topic: &str, count: u32) -> String {
    format!(
        "Generate {count} flashcards about the following topic: {topic}. \
Each flashcard should have a question on one side and a concise answer on the other. \
Provide the flashcards in JSON format with this structure:

[
  {{
    \"question\": \"Question here\",
    \"answer\": \"Concise answer here\"
  }},
  ...
]

Please respond only with the JSON data and nothing else."
    )
}

/// Replaces a missing or `random` flashcard topic with one from [`RANDOM_TOPICS`].
pub fn resolve_flashcard_topic(topic: Option<&str>) -> String {
    match topic.map(str::trim) {
        Some(t) if !t.is_empty() && !t.eq_ignore_ascii_case("random") => t.to_string(),
        _ => RANDOM_TOPICS
            .choose(&mut rand::thread_rng())
            .copied()
            .unwrap_or("Algorithms")
            .to_string(),
    }
}

pub fn strip_code_fences(raw: &str) -> String {
    CODE_FENCE.replace_all(raw, "").trim().to_string()
}

/// Parses the model output into a non-empty list of items.
fn parse_items<T: DeserializeOwned>(raw: &str) -> Result<Vec<T>, GenerationError> {
    let value: Value = serde_json::from_str(&strip_code_fences(raw))?;
    let items = match value {
        Value::Array(items) => items,
        Value::Object(_) => return Err(GenerationError::NotAnArray("an object")),
        _ => return Err(GenerationError::NotAnArray("a scalar")),
    };
    if items.is_empty() {
        return Err(GenerationError::Empty);
    }

    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
            serde_json::from_value(item).map_err(|e| GenerationError::InvalidItem {
                index,
                reason: e.to_string(),
            })
        })
        .collect()
}

/// Parses and validates generated questions, keeping at most `limit` of them.
pub fn parse_questions(raw: &str, limit: usize) -> Result<Vec<Question>, GenerationError> {
    let mut questions: Vec<Question> = parse_items(raw)?;
    if questions.len() > limit {
        tracing::warn!("Generator returned {} questions, keeping {}", questions.len(), limit);
        questions.truncate(limit);
    }

    for (index, q) in questions.iter().enumerate() {
        if q.text.trim().is_empty() {
            return Err(GenerationError::InvalidItem {
                index,
                reason: "question text is empty".to_string(),
            });
        }
        if q.options.len() != QUESTION_OPTION_COUNT {
            return Err(GenerationError::InvalidItem {
                index,
                reason: format!(
                    "expected {} options, got {}",
                    QUESTION_OPTION_COUNT,
                    q.options.len()
                ),
            });
        }
        if !q.is_well_formed() {
            return Err(GenerationError::InvalidItem {
                index,
                reason: format!("correctOptionIndex {} is out of range", q.correct_option_index),
            });
        }
    }

    Ok(questions)
}

pub fn parse_flashcards(raw: &str) -> Result<Vec<Flashcard>, GenerationError> {
    let cards: Vec<Flashcard> = parse_items(raw)?;

    if let Some(index) = cards
        .iter()
        .position(|c| c.question.trim().is_empty() || c.answer.trim().is_empty())
    {
        return Err(GenerationError::InvalidItem {
            index,
            reason: "flashcard side is empty".to_string(),
        });
    }

    Ok(cards)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ONE_QUESTION: &str = r#"[{"question":"What is ownership?","options":["a","b","c","d"],"correctOptionIndex":1,"explanation":"b is right"}]"#;

    #[test]
    fn parses_plain_json() {
        let qs = parse_questions(ONE_QUESTION, 10).unwrap();
        assert_eq!(qs.len(), 1);
        assert_eq!(qs[0].correct_option_index, 1);
        assert_eq!(qs[0].explanation, "b is right");
    }

    #[test]
    fn strips_markdown_fences() {
        let fenced = format!("```json\n{}\n```", ONE_QUESTION);
        assert_eq!(parse_questions(&fenced, 10).unwrap().len(), 1);

        let bare_fence = format!("```\n{}```", ONE_QUESTION);
        assert_eq!(parse_questions(&bare_fence, 10).unwrap().len(), 1);
    }

    #[test]
    fn extra_questions_are_dropped() {
        let item = ONE_QUESTION.trim_start_matches('[').trim_end_matches(']');
        let raw = format!("[{}]", vec![item; 25].join(","));

        let qs = parse_questions(&raw, 3).unwrap();
        assert_eq!(qs.len(), 3);
        assert_eq!(parse_questions(&raw, 30).unwrap().len(), 25);
    }

    #[test]
    fn rejects_non_json() {
        assert!(matches!(
            parse_questions("Sure! Here are your questions:", 10),
            Err(GenerationError::Malformed(_))
        ));
    }

    #[test]
    fn rejects_empty_and_non_array_payloads() {
        assert!(matches!(parse_questions("[]", 10), Err(GenerationError::Empty)));
        assert!(matches!(
            parse_questions(r#"{"questions":[]}"#, 10),
            Err(GenerationError::NotAnArray(_))
        ));
    }

    #[test]
    fn rejects_wrong_option_count() {
        let raw = r#"[{"question":"Q","options":["a","b"],"correctOptionIndex":0}]"#;
        assert!(matches!(
            parse_questions(raw, 10),
            Err(GenerationError::InvalidItem { index: 0, .. })
        ));
    }

    #[test]
    fn rejects_out_of_range_answer() {
        let raw = format!(
            "[{}, {}]",
            &ONE_QUESTION[1..ONE_QUESTION.len() - 1],
            r#"{"question":"Q","options":["a","b","c","d"],"correctOptionIndex":4}"#
        );
        assert!(matches!(
            parse_questions(&raw, 10),
            Err(GenerationError::InvalidItem { index: 1, .. })
        ));
    }

    #[test]
    fn rejects_items_missing_fields() {
        let raw = r#"[{"question":"Q","options":["a","b","c","d"]}]"#;
        assert!(matches!(
            parse_questions(raw, 10),
            Err(GenerationError::InvalidItem { index: 0, .. })
        ));
    }

    #[test]
    fn parses_flashcards_and_rejects_blank_sides() {
        let cards = parse_flashcards(r#"[{"question":"Q","answer":"A"}]"#).unwrap();
        assert_eq!(cards[0].answer, "A");
        assert!(parse_flashcards(r#"[{"question":"Q","answer":" "}]"#).is_err());
    }

    #[test]
    fn random_topic_is_resolved() {
        assert_eq!(resolve_flashcard_topic(Some("Rust")), "Rust");
        for input in [None, Some(""), Some("random"), Some("RANDOM")] {
            let topic = resolve_flashcard_topic(input);
            assert!(RANDOM_TOPICS.contains(&topic.as_str()));
        }
    }

    #[test]
    fn extracts_candidate_text() {
        let body = json!({"candidates":[{"content":{"parts":[{"text":"[1]"}]}}]});
        assert_eq!(extract_text(&body).unwrap(), "[1]");
        assert!(matches!(extract_text(&json!({})), Err(GenerationError::MissingText)));
    }

    #[test]
    fn prompt_names_topic_difficulty_and_count() {
        let prompt = quiz_prompt("Lifetimes", Difficulty::Hard, 7);
        assert!(prompt.starts_with("Generate 7 hard-difficulty"));
        assert!(prompt.contains("Lifetimes"));
        assert!(prompt.contains("\"correctOptionIndex\": 0"));
    }

    #[test]
    fn endpoint_is_built_from_config() {
        let config = Config {
            database_url: String::new(),
            jwt_secret: String::new(),
            jwt_expiration: 60,
            rust_log: "error".into(),
            port: 0,
            cors_origins: vec![],
            gemini_api_key: "k".into(),
            gemini_model: "gemini-1.5-flash".into(),
            gemini_base_url: "https://generativelanguage.googleapis.com/v1beta".into(),
            generator_timeout_secs: 5,
            session_ttl_secs: 60,
        };
        let generator = GeminiGenerator::from_config(&config).unwrap();
        assert_eq!(
            generator.endpoint.as_str(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-1.5-flash:generateContent"
        );
    }
}
