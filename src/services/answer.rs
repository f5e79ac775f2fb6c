//! Answer service
//!
//! Members answer question checkpoints; tour owners read the answers.
//! Multiple-choice answers are scored on submission.

use crate::db::repositories::{
    AnswerRepository, CheckpointRepository, TourRepository, UserRepository,
};
use crate::models::{Answer, AnswerBody, Checkpoint, CheckpointKind, CheckpointType, Tour};
use crate::services::access;
use crate::services::error::{ServiceError, ServiceResult};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::debug;

/// Number of picked options that are correct. Repeated picks count once.
pub fn score(choices: &[i64], correct: &[i64]) -> i64 {
    let picked: BTreeSet<i64> = choices.iter().copied().collect();
    let correct: BTreeSet<i64> = correct.iter().copied().collect();
    picked.intersection(&correct).count() as i64
}

pub struct AnswerService {
    users: Arc<dyn UserRepository>,
    tours: Arc<dyn TourRepository>,
    checkpoints: Arc<dyn CheckpointRepository>,
    answers: Arc<dyn AnswerRepository>,
}

impl AnswerService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        tours: Arc<dyn TourRepository>,
        checkpoints: Arc<dyn CheckpointRepository>,
        answers: Arc<dyn AnswerRepository>,
    ) -> Self {
        Self {
            users,
            tours,
            checkpoints,
            answers,
        }
    }

    /// Answer a free-text question, replacing any earlier answer
    pub async fn answer_text(
        &self,
        username: &str,
        question_id: i64,
        text: &str,
    ) -> ServiceResult<Answer> {
        let user = access::caller(self.users.as_ref(), username).await?;
        let question = self.question(question_id).await?;
        if !matches!(question.kind, CheckpointKind::Question { .. }) {
            return Err(wrong_kind(&question, CheckpointType::Question));
        }

        let body = AnswerBody::Text(text.to_string());
        Ok(self.answers.upsert(question_id, user.id, &body).await?)
    }

    /// Answer a multiple-choice question, replacing any earlier answer.
    /// Choices are option indices; duplicates are dropped.
    pub async fn answer_multiple_choice(
        &self,
        username: &str,
        question_id: i64,
        choices: &[i64],
    ) -> ServiceResult<Answer> {
        let user = access::caller(self.users.as_ref(), username).await?;
        let question = self.question(question_id).await?;
        let CheckpointKind::MultipleChoice {
            possible_answers,
            correct_answers,
            ..
        } = &question.kind
        else {
            return Err(wrong_kind(&question, CheckpointType::MultipleChoice));
        };

        let options = possible_answers.len() as i64;
        if let Some(bad) = choices.iter().find(|&&c| c < 0 || c >= options) {
            return Err(ServiceError::validation(format!(
                "choice {} is not one of the {} options",
                bad, options
            )));
        }

        let choices: Vec<i64> = choices.iter().copied().collect::<BTreeSet<_>>().into_iter().collect();
        let correct = score(&choices, correct_answers);
        debug!(question_id, username, correct, "multiple choice answer scored");

        let body = AnswerBody::MultipleChoice { choices, correct };
        Ok(self.answers.upsert(question_id, user.id, &body).await?)
    }

    /// All answers to a question, for the owner of its tour
    pub async fn answers_to_question(
        &self,
        username: &str,
        question_id: i64,
    ) -> ServiceResult<(Checkpoint, Vec<Answer>)> {
        let owner = access::caller(self.users.as_ref(), username).await?;
        let question = self.question(question_id).await?;
        access::owned_tour(self.tours.as_ref(), &owner, question.tour_id).await?;

        let answers = self.answers.list_by_question(question_id).await?;
        Ok((question, answers))
    }

    /// One member's answers in a tour, for the tour owner
    pub async fn answers_by_user(
        &self,
        username: &str,
        tour_id: i64,
        member: &str,
    ) -> ServiceResult<(Tour, Vec<Answer>)> {
        let owner = access::caller(self.users.as_ref(), username).await?;
        let tour = access::owned_tour(self.tours.as_ref(), &owner, tour_id).await?;
        let member = self
            .users
            .get_by_username(member)
            .await?
            .ok_or_else(|| ServiceError::not_found(format!("user '{}'", member)))?;

        let answers = self.answers.list_by_user_in_tour(tour_id, member.id).await?;
        Ok((tour, answers))
    }

    /// The caller's own answers in a tour
    pub async fn my_answers(&self, username: &str, tour_id: i64) -> ServiceResult<(Tour, Vec<Answer>)> {
        let user = access::caller(self.users.as_ref(), username).await?;
        let tour = access::tour(self.tours.as_ref(), tour_id).await?;
        let answers = self.answers.list_by_user_in_tour(tour_id, user.id).await?;
        Ok((tour, answers))
    }

    /// The checkpoint an answer refers to
    pub async fn question(&self, question_id: i64) -> ServiceResult<Checkpoint> {
        self.checkpoints
            .get(question_id)
            .await?
            .ok_or_else(|| ServiceError::not_found(format!("question {}", question_id)))
    }
}

fn wrong_kind(checkpoint: &Checkpoint, expected: CheckpointType) -> ServiceError {
    ServiceError::validation(format!(
        "checkpoint {} is a {} checkpoint, not a {}",
        checkpoint.id,
        checkpoint.kind.checkpoint_type(),
        expected
    ))
}
