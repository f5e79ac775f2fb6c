//! GraphQL object types that do not map one-to-one onto a model

use super::payload::{admin, services, user};
use crate::models::{Answer, Checkpoint, CheckpointKind, CheckpointType, Tour};
use async_graphql::{ComplexObject, Context, Object};
use chrono::{DateTime, Utc};

#[ComplexObject]
impl Tour {
    /// Usernames of everyone who joined, the owner included. Null unless
    /// the caller owns the tour or is an admin.
    async fn members(&self, ctx: &Context<'_>) -> async_graphql::Result<Option<Vec<String>>> {
        if admin(ctx).is_none() && user(ctx) != Some(self.owner.as_str()) {
            return Ok(None);
        }
        Ok(Some(services(ctx)?.tours.members(self.id).await?))
    }
}

/// A checkpoint flattened for clients: variant fields are null where they
/// do not apply
pub struct CheckpointObject(pub Checkpoint);

impl From<Checkpoint> for CheckpointObject {
    fn from(checkpoint: Checkpoint) -> Self {
        Self(checkpoint)
    }
}

#[Object(name = "Checkpoint")]
impl CheckpointObject {
    async fn id(&self) -> i64 {
        self.0.id
    }

    async fn tour_id(&self) -> i64 {
        self.0.tour_id
    }

    /// 0-based position inside the tour
    async fn index(&self) -> i64 {
        self.0.index
    }

    async fn kind(&self) -> CheckpointType {
        self.0.kind.checkpoint_type()
    }

    async fn text(&self) -> Option<&str> {
        self.0.text.as_deref()
    }

    async fn show_text(&self) -> bool {
        self.0.show_text
    }

    async fn show_picture(&self) -> bool {
        self.0.show_picture
    }

    async fn show_details(&self) -> bool {
        self.0.show_details
    }

    async fn picture_id(&self) -> Option<i64> {
        match &self.0.kind {
            CheckpointKind::Picture { picture_id } => Some(*picture_id),
            _ => None,
        }
    }

    async fn object_id(&self) -> Option<&str> {
        match &self.0.kind {
            CheckpointKind::Object { object_id } => Some(object_id),
            _ => None,
        }
    }

    async fn question(&self) -> Option<&str> {
        self.0.kind.question()
    }

    async fn linked_objects(&self) -> Vec<String> {
        self.0.kind.linked_objects().to_vec()
    }

    async fn possible_answers(&self) -> Option<&[String]> {
        match &self.0.kind {
            CheckpointKind::MultipleChoice {
                possible_answers, ..
            } => Some(possible_answers),
            _ => None,
        }
    }

    async fn correct_answers(&self) -> Option<&[i64]> {
        match &self.0.kind {
            CheckpointKind::MultipleChoice {
                correct_answers, ..
            } => Some(correct_answers),
            _ => None,
        }
    }

    async fn max_choices(&self) -> Option<i64> {
        match &self.0.kind {
            CheckpointKind::MultipleChoice { max_choices, .. } => *max_choices,
            _ => None,
        }
    }

    async fn created_at(&self) -> DateTime<Utc> {
        self.0.created_at
    }
}

pub struct AnswerObject(pub Answer);

impl From<Answer> for AnswerObject {
    fn from(answer: Answer) -> Self {
        Self(answer)
    }
}

#[Object(name = "Answer")]
impl AnswerObject {
    async fn id(&self) -> i64 {
        self.0.id
    }

    async fn question_id(&self) -> i64 {
        self.0.question_id
    }

    async fn username(&self) -> &str {
        &self.0.username
    }

    /// Free-text answer
    async fn text(&self) -> Option<&str> {
        self.0.body.text()
    }

    /// Picked option indices of a multiple-choice answer
    async fn choices(&self) -> Option<&[i64]> {
        self.0.body.choices()
    }

    /// How many picked options are correct
    async fn correct(&self) -> Option<i64> {
        self.0.body.correct()
    }

    async fn updated_at(&self) -> DateTime<Utc> {
        self.0.updated_at
    }
}
