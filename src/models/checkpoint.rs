//! Checkpoints: the ordered content of a tour
//!
//! Every checkpoint shares its position and display flags; what it shows is
//! carried by [`CheckpointKind`].

use async_graphql::{Enum, InputObject};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub id: i64,
    pub tour_id: i64,
    /// 0-based position inside the tour
    pub index: i64,
    pub text: Option<String>,
    pub show_text: bool,
    pub show_picture: bool,
    pub show_details: bool,
    pub kind: CheckpointKind,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CheckpointKind {
    /// Plain text
    Text,
    Picture { picture_id: i64 },
    Object { object_id: String },
    /// Free-text question
    Question {
        question: String,
        linked_objects: Vec<String>,
    },
    MultipleChoice {
        question: String,
        linked_objects: Vec<String>,
        possible_answers: Vec<String>,
        /// Indices into `possible_answers`
        correct_answers: Vec<i64>,
        max_choices: Option<i64>,
    },
}

/// Discriminator stored in the `kind` column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Enum)]
#[serde(rename_all = "snake_case")]
pub enum CheckpointType {
    Text,
    Picture,
    Object,
    Question,
    MultipleChoice,
}

impl fmt::Display for CheckpointType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckpointType::Text => write!(f, "text"),
            CheckpointType::Picture => write!(f, "picture"),
            CheckpointType::Object => write!(f, "object"),
            CheckpointType::Question => write!(f, "question"),
            CheckpointType::MultipleChoice => write!(f, "multiple_choice"),
        }
    }
}

impl FromStr for CheckpointType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(CheckpointType::Text),
            "picture" => Ok(CheckpointType::Picture),
            "object" => Ok(CheckpointType::Object),
            "question" => Ok(CheckpointType::Question),
            "multiple_choice" => Ok(CheckpointType::MultipleChoice),
            _ => Err(anyhow::anyhow!("Invalid checkpoint type: {}", s)),
        }
    }
}

impl CheckpointKind {
    pub fn checkpoint_type(&self) -> CheckpointType {
        match self {
            CheckpointKind::Text => CheckpointType::Text,
            CheckpointKind::Picture { .. } => CheckpointType::Picture,
            CheckpointKind::Object { .. } => CheckpointType::Object,
            CheckpointKind::Question { .. } => CheckpointType::Question,
            CheckpointKind::MultipleChoice { .. } => CheckpointType::MultipleChoice,
        }
    }

    /// The question text for both question variants
    pub fn question(&self) -> Option<&str> {
        match self {
            CheckpointKind::Question { question, .. }
            | CheckpointKind::MultipleChoice { question, .. } => Some(question),
            _ => None,
        }
    }

    pub fn linked_objects(&self) -> &[String] {
        match self {
            CheckpointKind::Question { linked_objects, .. }
            | CheckpointKind::MultipleChoice { linked_objects, .. } => linked_objects,
            _ => &[],
        }
    }

    /// Check internal consistency of the variant payload
    pub fn validate(&self) -> Result<(), String> {
        match self {
            CheckpointKind::Question { question, .. } if question.trim().is_empty() => {
                Err("question must not be empty".to_string())
            }
            CheckpointKind::MultipleChoice {
                question,
                possible_answers,
                correct_answers,
                max_choices,
                ..
            } => {
                if question.trim().is_empty() {
                    return Err("question must not be empty".to_string());
                }
                if possible_answers.is_empty() {
                    return Err("a multiple choice question needs possible answers".to_string());
                }
                let count = possible_answers.len() as i64;
                if let Some(bad) = correct_answers.iter().find(|&&i| i < 0 || i >= count) {
                    return Err(format!("correct answer {} is not a possible answer", bad));
                }
                if matches!(max_choices, Some(m) if *m < 1) {
                    return Err("max_choices must be at least 1".to_string());
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }
}

/// Everything needed to append a checkpoint; the index is assigned on insert
#[derive(Debug, Clone)]
pub struct NewCheckpoint {
    pub text: Option<String>,
    pub show_text: bool,
    pub show_picture: bool,
    pub show_details: bool,
    pub kind: CheckpointKind,
}

/// Display settings shared by all checkpoint creation mutations
#[derive(Debug, Clone, Default, Serialize, Deserialize, InputObject)]
pub struct CheckpointDisplayInput {
    pub text: Option<String>,
    #[graphql(default)]
    pub show_text: bool,
    #[graphql(default)]
    pub show_picture: bool,
    #[graphql(default)]
    pub show_details: bool,
}

impl CheckpointDisplayInput {
    pub fn with_kind(self, kind: CheckpointKind) -> NewCheckpoint {
        NewCheckpoint {
            text: self.text,
            show_text: self.show_text,
            show_picture: self.show_picture,
            show_details: self.show_details,
            kind,
        }
    }
}

/// Partial edit of a checkpoint. Variant-specific fields are only accepted
/// for checkpoints of that variant.
#[derive(Debug, Clone, Default, Serialize, Deserialize, InputObject)]
pub struct CheckpointPatch {
    pub text: Option<String>,
    pub show_text: Option<bool>,
    pub show_picture: Option<bool>,
    pub show_details: Option<bool>,
    pub picture_id: Option<i64>,
    pub object_id: Option<String>,
    pub question: Option<String>,
    pub linked_objects: Option<Vec<String>>,
    pub possible_answers: Option<Vec<String>>,
    pub correct_answers: Option<Vec<i64>>,
    pub max_choices: Option<i64>,
}

impl Checkpoint {
    /// Apply a patch in place, rejecting fields that do not belong to this
    /// checkpoint's variant. On error the checkpoint is left untouched.
    pub fn apply(&mut self, patch: CheckpointPatch) -> Result<(), String> {
        let checkpoint_type = self.kind.checkpoint_type();
        let mut kind = self.kind.clone();

        let misplaced = |field: &str| {
            Err(format!(
                "field `{}` does not apply to a {} checkpoint",
                field, checkpoint_type
            ))
        };

        match &mut kind {
            CheckpointKind::Text => {}
            CheckpointKind::Picture { picture_id } => {
                if let Some(id) = patch.picture_id {
                    *picture_id = id;
                }
            }
            CheckpointKind::Object { object_id } => {
                if let Some(id) = patch.object_id.clone() {
                    *object_id = id;
                }
            }
            CheckpointKind::Question {
                question,
                linked_objects,
            } => {
                if let Some(q) = patch.question.clone() {
                    *question = q;
                }
                if let Some(links) = patch.linked_objects.clone() {
                    *linked_objects = links;
                }
            }
            CheckpointKind::MultipleChoice {
                question,
                linked_objects,
                possible_answers,
                correct_answers,
                max_choices,
            } => {
                if let Some(q) = patch.question.clone() {
                    *question = q;
                }
                if let Some(links) = patch.linked_objects.clone() {
                    *linked_objects = links;
                }
                if let Some(answers) = patch.possible_answers.clone() {
                    *possible_answers = answers;
                }
                if let Some(correct) = patch.correct_answers.clone() {
                    *correct_answers = correct;
                }
                if patch.max_choices.is_some() {
                    *max_choices = patch.max_choices;
                }
            }
        }

        let is_picture = checkpoint_type == CheckpointType::Picture;
        let is_object = checkpoint_type == CheckpointType::Object;
        let is_question = matches!(
            checkpoint_type,
            CheckpointType::Question | CheckpointType::MultipleChoice
        );
        let is_mc = checkpoint_type == CheckpointType::MultipleChoice;

        if patch.picture_id.is_some() && !is_picture {
            return misplaced("picture_id");
        }
        if patch.object_id.is_some() && !is_object {
            return misplaced("object_id");
        }
        if patch.question.is_some() && !is_question {
            return misplaced("question");
        }
        if patch.linked_objects.is_some() && !is_question {
            return misplaced("linked_objects");
        }
        if patch.possible_answers.is_some() && !is_mc {
            return misplaced("possible_answers");
        }
        if patch.correct_answers.is_some() && !is_mc {
            return misplaced("correct_answers");
        }
        if patch.max_choices.is_some() && !is_mc {
            return misplaced("max_choices");
        }

        kind.validate()?;

        self.kind = kind;
        if patch.text.is_some() {
            self.text = patch.text;
        }
        if let Some(v) = patch.show_text {
            self.show_text = v;
        }
        if let Some(v) = patch.show_picture {
            self.show_picture = v;
        }
        if let Some(v) = patch.show_details {
            self.show_details = v;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checkpoint(kind: CheckpointKind) -> Checkpoint {
        Checkpoint {
            id: 1,
            tour_id: 1,
            index: 0,
            text: Some("Welcome".to_string()),
            show_text: true,
            show_picture: false,
            show_details: false,
            kind,
            created_at: Utc::now(),
        }
    }

    fn mc() -> CheckpointKind {
        CheckpointKind::MultipleChoice {
            question: "Which century?".to_string(),
            linked_objects: vec![],
            possible_answers: vec!["16th".into(), "17th".into(), "18th".into()],
            correct_answers: vec![1],
            max_choices: Some(1),
        }
    }

    #[test]
    fn test_checkpoint_type_roundtrip() {
        for t in [
            CheckpointType::Text,
            CheckpointType::Picture,
            CheckpointType::Object,
            CheckpointType::Question,
            CheckpointType::MultipleChoice,
        ] {
            assert_eq!(CheckpointType::from_str(&t.to_string()).unwrap(), t);
        }
        assert!(CheckpointType::from_str("essay").is_err());
    }

    #[test]
    fn test_validate_multiple_choice() {
        assert!(mc().validate().is_ok());

        let out_of_range = CheckpointKind::MultipleChoice {
            question: "Q".into(),
            linked_objects: vec![],
            possible_answers: vec!["a".into(), "b".into()],
            correct_answers: vec![2],
            max_choices: None,
        };
        assert!(out_of_range.validate().is_err());

        let empty_question = CheckpointKind::Question {
            question: "  ".into(),
            linked_objects: vec![],
        };
        assert!(empty_question.validate().is_err());
    }

    #[test]
    fn test_apply_shared_fields() {
        let mut cp = checkpoint(CheckpointKind::Text);
        cp.apply(CheckpointPatch {
            text: Some("Hello".into()),
            show_details: Some(true),
            ..Default::default()
        })
        .unwrap();

        assert_eq!(cp.text.as_deref(), Some("Hello"));
        assert!(cp.show_text);
        assert!(cp.show_details);
    }

    #[test]
    fn test_apply_variant_fields() {
        let mut cp = checkpoint(mc());
        cp.apply(CheckpointPatch {
            possible_answers: Some(vec!["yes".into(), "no".into()]),
            correct_answers: Some(vec![0]),
            ..Default::default()
        })
        .unwrap();

        match &cp.kind {
            CheckpointKind::MultipleChoice {
                possible_answers,
                correct_answers,
                question,
                ..
            } => {
                assert_eq!(possible_answers.len(), 2);
                assert_eq!(correct_answers, &vec![0]);
                assert_eq!(question, "Which century?");
            }
            other => panic!("unexpected kind {:?}", other),
        }
    }

    #[test]
    fn test_apply_rejects_misplaced_field_without_changes() {
        let mut cp = checkpoint(CheckpointKind::Text);
        let before = cp.clone();

        let err = cp
            .apply(CheckpointPatch {
                text: Some("changed".into()),
                question: Some("Why?".into()),
                ..Default::default()
            })
            .unwrap_err();

        assert!(err.contains("question"));
        assert_eq!(cp, before);
    }

    #[test]
    fn test_apply_rejects_inconsistent_multiple_choice() {
        let mut cp = checkpoint(mc());
        let result = cp.apply(CheckpointPatch {
            possible_answers: Some(vec!["only".into()]),
            ..Default::default()
        });
        assert!(result.is_err());
        assert_eq!(cp.kind, mc());
    }
}
