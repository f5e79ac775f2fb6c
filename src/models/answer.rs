//! Answers to question checkpoints
//!
//! A user holds at most one answer per question; answering again overwrites it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    pub id: i64,
    /// Checkpoint id of the question
    pub question_id: i64,
    pub user_id: i64,
    pub username: String,
    pub body: AnswerBody,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AnswerBody {
    Text(String),
    /// Picked option indices and how many of them are correct
    MultipleChoice { choices: Vec<i64>, correct: i64 },
}

impl AnswerBody {
    pub fn text(&self) -> Option<&str> {
        match self {
            AnswerBody::Text(text) => Some(text),
            AnswerBody::MultipleChoice { .. } => None,
        }
    }

    pub fn choices(&self) -> Option<&[i64]> {
        match self {
            AnswerBody::MultipleChoice { choices, .. } => Some(choices),
            AnswerBody::Text(_) => None,
        }
    }

    pub fn correct(&self) -> Option<i64> {
        match self {
            AnswerBody::MultipleChoice { correct, .. } => Some(*correct),
            AnswerBody::Text(_) => None,
        }
    }
}
