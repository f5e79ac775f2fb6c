//! Plain-text answer exports served by `/file/report`

use crate::db::repositories::CheckpointRepository;
use crate::models::{Answer, AnswerBody, Checkpoint, CheckpointKind};
use crate::services::answer::AnswerService;
use crate::services::error::ServiceResult;
use std::collections::HashMap;
use std::fmt::Write;
use std::sync::Arc;

pub struct ReportService {
    answers: Arc<AnswerService>,
    checkpoints: Arc<dyn CheckpointRepository>,
}

impl ReportService {
    pub fn new(answers: Arc<AnswerService>, checkpoints: Arc<dyn CheckpointRepository>) -> Self {
        Self {
            answers,
            checkpoints,
        }
    }

    /// Every answer to one question. Tour owner only.
    pub async fn question_report(&self, username: &str, question_id: i64) -> ServiceResult<String> {
        let (question, answers) = self.answers.answers_to_question(username, question_id).await?;

        let mut out = String::new();
        let _ = writeln!(out, "Exported answers for question: {}", question.id);
        let _ = writeln!(out, "Question: {}", question.kind.question().unwrap_or_default());
        for answer in &answers {
            let _ = writeln!(out, "User: {}", answer.username);
            write_answer(&mut out, &question, answer);
        }
        Ok(out)
    }

    /// One member's answers in a tour. Tour owner only.
    pub async fn user_report(
        &self,
        username: &str,
        tour_id: i64,
        member: &str,
    ) -> ServiceResult<String> {
        let (tour, answers) = self.answers.answers_by_user(username, tour_id, member).await?;
        self.render_user(member, &tour.name, tour_id, &answers).await
    }

    /// The caller's own answers in a tour
    pub async fn my_report(&self, username: &str, tour_id: i64) -> ServiceResult<String> {
        let (tour, answers) = self.answers.my_answers(username, tour_id).await?;
        self.render_user(username, &tour.name, tour_id, &answers).await
    }

    async fn render_user(
        &self,
        username: &str,
        tour_name: &str,
        tour_id: i64,
        answers: &[Answer],
    ) -> ServiceResult<String> {
        let questions: HashMap<i64, Checkpoint> = self
            .checkpoints
            .list_by_tour(tour_id)
            .await?
            .into_iter()
            .map(|c| (c.id, c))
            .collect();

        let mut out = String::new();
        let _ = writeln!(out, "Exported answers of user: {}", username);
        let _ = writeln!(out, "Tour: {}", tour_name);
        for answer in answers {
            let Some(question) = questions.get(&answer.question_id) else {
                continue;
            };
            let _ = writeln!(out, "Question: {}", question.kind.question().unwrap_or_default());
            write_answer(&mut out, question, answer);
        }
        Ok(out)
    }
}

/// `Answer:` line, plus the score for multiple choice
fn write_answer(out: &mut String, question: &Checkpoint, answer: &Answer) {
    match &answer.body {
        AnswerBody::Text(text) => {
            let _ = writeln!(out, "Answer: {}", text);
        }
        AnswerBody::MultipleChoice { choices, correct } => {
            let options: &[String] = match &question.kind {
                CheckpointKind::MultipleChoice {
                    possible_answers, ..
                } => possible_answers,
                _ => &[],
            };
            let picked: Vec<&str> = choices
                .iter()
                .filter_map(|&i| usize::try_from(i).ok().and_then(|i| options.get(i)))
                .map(String::as_str)
                .collect();
            let _ = writeln!(out, "Answer: {}", picked.join(", "));
            let _ = writeln!(out, "Correct: {}", correct);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::test_support::{insert_tour, insert_user, migrated_pool};
    use crate::db::repositories::{
        SqlxAnswerRepository, SqlxCheckpointRepository, SqlxTourRepository, SqlxUserRepository,
    };
    use crate::models::NewCheckpoint;
    use crate::services::error::ServiceError;

    struct Fixture {
        answers: Arc<AnswerService>,
        reports: ReportService,
        tour_id: i64,
        text_q: i64,
        mc_q: i64,
    }

    fn question(kind: CheckpointKind) -> NewCheckpoint {
        NewCheckpoint {
            text: None,
            show_text: false,
            show_picture: false,
            show_details: false,
            kind,
        }
    }

    async fn setup_test_service() -> Fixture {
        let pool = migrated_pool().await;
        let owner = insert_user(&pool, "anna").await;
        insert_user(&pool, "ben").await;
        let tour_id = insert_tour(&pool, owner, "masters").await;

        let checkpoints = SqlxCheckpointRepository::boxed(pool.clone());
        let text_q = checkpoints
            .append(
                tour_id,
                &question(CheckpointKind::Question {
                    question: "What do you see?".to_string(),
                    linked_objects: vec![],
                }),
            )
            .await
            .unwrap()
            .unwrap()
            .id;
        let mc_q = checkpoints
            .append(
                tour_id,
                &question(CheckpointKind::MultipleChoice {
                    question: "Which century?".to_string(),
                    linked_objects: vec![],
                    possible_answers: vec!["16th".into(), "17th".into(), "18th".into()],
                    correct_answers: vec![1],
                    max_choices: None,
                }),
            )
            .await
            .unwrap()
            .unwrap()
            .id;

        let answers = Arc::new(AnswerService::new(
            SqlxUserRepository::boxed(pool.clone()),
            SqlxTourRepository::boxed(pool.clone()),
            checkpoints.clone(),
            SqlxAnswerRepository::boxed(pool.clone()),
        ));
        Fixture {
            reports: ReportService::new(answers.clone(), checkpoints),
            answers,
            tour_id,
            text_q,
            mc_q,
        }
    }

    #[tokio::test]
    async fn test_question_report() {
        let f = setup_test_service().await;
        f.answers.answer_text("ben", f.text_q, "a ship").await.unwrap();

        let report = f.reports.question_report("anna", f.text_q).await.unwrap();
        assert_eq!(
            report,
            format!(
                "Exported answers for question: {}\nQuestion: What do you see?\nUser: ben\nAnswer: a ship\n",
                f.text_q
            )
        );

        let denied = f.reports.question_report("ben", f.text_q).await;
        assert!(matches!(denied, Err(ServiceError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_user_report_in_checkpoint_order() {
        let f = setup_test_service().await;
        f.answers.answer_multiple_choice("ben", f.mc_q, &[0, 1]).await.unwrap();
        f.answers.answer_text("ben", f.text_q, "a ship").await.unwrap();

        let report = f.reports.user_report("anna", f.tour_id, "ben").await.unwrap();
        assert_eq!(
            report,
            "Exported answers of user: ben\n\
             Tour: Tour\n\
             Question: What do you see?\n\
             Answer: a ship\n\
             Question: Which century?\n\
             Answer: 16th, 17th\n\
             Correct: 1\n"
        );

        let mine = f.reports.my_report("ben", f.tour_id).await.unwrap();
        assert_eq!(mine, report);
    }

    #[tokio::test]
    async fn test_report_missing_question() {
        let f = setup_test_service().await;
        let result = f.reports.question_report("anna", 999).await;
        assert!(matches!(result, Err(ServiceError::NotFound(_))));
    }
}
