//! `/app` schema: the visitor and producer mobile client

use super::payload::{
    respond, resolve, resolve_list, services, user, AccessTokenPayload, AnswerPayload,
    BadgeProgressPayload, CheckpointPayload, FeedbackPayload, OkPayload, TokenPayload,
    TourFeedbackPayload, TourPayload, UserPayload,
};
use super::types::{AnswerObject, CheckpointObject};
use crate::models::{
    Badge, BadgeProgress, CheckpointDisplayInput, CheckpointKind, CheckpointPatch,
    CreateTourInput, MuseumObject, MuseumObjectFilter, ProfilePicture, Tour, TourFeedback, User,
};
use crate::services::Actor;
use async_graphql::{Context, Object, Result};

#[derive(Default)]
pub struct AppQuery;

#[Object]
impl AppQuery {
    /// The authenticated user
    async fn me(&self, ctx: &Context<'_>) -> Result<Option<User>> {
        let Some(username) = user(ctx) else {
            return Ok(None);
        };
        resolve(services(ctx)?.accounts.user(username).await)
    }

    async fn favourite_tours(&self, ctx: &Context<'_>) -> Result<Vec<Tour>> {
        let Some(username) = user(ctx) else {
            return Ok(Vec::new());
        };
        resolve_list(services(ctx)?.social.favourite_tours(username).await)
    }

    async fn favourite_objects(&self, ctx: &Context<'_>) -> Result<Vec<MuseumObject>> {
        let Some(username) = user(ctx) else {
            return Ok(Vec::new());
        };
        resolve_list(services(ctx)?.social.favourite_objects(username).await)
    }

    /// A tour the caller has joined
    async fn tour(&self, ctx: &Context<'_>, tour_id: i64) -> Result<Option<Tour>> {
        let Some(username) = user(ctx) else {
            return Ok(None);
        };
        resolve(services(ctx)?.tours.tour_for_member(username, tour_id).await)
    }

    /// Tours the caller has joined
    async fn my_tours(&self, ctx: &Context<'_>) -> Result<Vec<Tour>> {
        let Some(username) = user(ctx) else {
            return Ok(Vec::new());
        };
        resolve_list(services(ctx)?.tours.joined_tours(username).await)
    }

    async fn owned_tours(&self, ctx: &Context<'_>) -> Result<Vec<Tour>> {
        let Some(username) = user(ctx) else {
            return Ok(Vec::new());
        };
        resolve_list(services(ctx)?.tours.owned_tours(username).await)
    }

    async fn featured_tours(&self, ctx: &Context<'_>) -> Result<Vec<Tour>> {
        if user(ctx).is_none() {
            return Ok(Vec::new());
        }
        resolve_list(services(ctx)?.tours.featured().await)
    }

    /// Checkpoints of a joined tour in position order
    async fn checkpoints(&self, ctx: &Context<'_>, tour_id: i64) -> Result<Vec<CheckpointObject>> {
        let Some(username) = user(ctx) else {
            return Ok(Vec::new());
        };
        let list = resolve_list(
            services(ctx)?
                .checkpoints
                .list_for_member(username, tour_id)
                .await,
        )?;
        Ok(list.into_iter().map(CheckpointObject).collect())
    }

    async fn tour_feedback(&self, ctx: &Context<'_>, tour_id: i64) -> Result<Vec<TourFeedback>> {
        let Some(username) = user(ctx) else {
            return Ok(Vec::new());
        };
        resolve_list(services(ctx)?.tours.feedback_for_owner(username, tour_id).await)
    }

    /// All answers to a question of a tour the caller owns
    async fn answers_to_question(
        &self,
        ctx: &Context<'_>,
        question_id: i64,
    ) -> Result<Vec<AnswerObject>> {
        let Some(username) = user(ctx) else {
            return Ok(Vec::new());
        };
        let result = services(ctx)?
            .answers
            .answers_to_question(username, question_id)
            .await
            .map(|(_, answers)| answers);
        Ok(resolve_list(result)?.into_iter().map(AnswerObject).collect())
    }

    /// One member's answers in a tour the caller owns
    async fn answers_by_user(
        &self,
        ctx: &Context<'_>,
        tour_id: i64,
        username: String,
    ) -> Result<Vec<AnswerObject>> {
        let Some(owner) = user(ctx) else {
            return Ok(Vec::new());
        };
        let result = services(ctx)?
            .answers
            .answers_by_user(owner, tour_id, &username)
            .await
            .map(|(_, answers)| answers);
        Ok(resolve_list(result)?.into_iter().map(AnswerObject).collect())
    }

    async fn my_answers(&self, ctx: &Context<'_>, tour_id: i64) -> Result<Vec<AnswerObject>> {
        let Some(username) = user(ctx) else {
            return Ok(Vec::new());
        };
        let result = services(ctx)?
            .answers
            .my_answers(username, tour_id)
            .await
            .map(|(_, answers)| answers);
        Ok(resolve_list(result)?.into_iter().map(AnswerObject).collect())
    }

    async fn museum_object(&self, ctx: &Context<'_>, object_id: String) -> Result<Option<MuseumObject>> {
        if user(ctx).is_none() {
            return Ok(None);
        }
        Ok(resolve(services(ctx)?.catalog.get(&object_id).await)?.flatten())
    }

    /// Objects matching every given field (case-insensitive substring)
    async fn museum_objects(
        &self,
        ctx: &Context<'_>,
        #[graphql(default)] filter: MuseumObjectFilter,
    ) -> Result<Vec<MuseumObject>> {
        if user(ctx).is_none() {
            return Ok(Vec::new());
        }
        resolve_list(services(ctx)?.catalog.search(&filter).await)
    }

    async fn badges(&self, ctx: &Context<'_>) -> Result<Vec<Badge>> {
        if user(ctx).is_none() {
            return Ok(Vec::new());
        }
        resolve_list(services(ctx)?.media.badges().await)
    }

    /// Every badge with the caller's progress towards it
    async fn badge_progress(&self, ctx: &Context<'_>) -> Result<Vec<BadgeProgress>> {
        let Some(username) = user(ctx) else {
            return Ok(Vec::new());
        };
        resolve_list(services(ctx)?.media.badge_progress(username).await)
    }

    async fn profile_pictures(&self, ctx: &Context<'_>) -> Result<Vec<ProfilePicture>> {
        if user(ctx).is_none() {
            return Ok(Vec::new());
        }
        resolve_list(services(ctx)?.media.profile_pictures().await)
    }
}

#[derive(Default)]
pub struct AppMutation;

/// Bail out with `ok: null` unless an app user is authenticated
macro_rules! require_user {
    ($ctx:expr) => {
        match user($ctx) {
            Some(username) => username,
            None => return Ok(Default::default()),
        }
    };
}

#[Object]
impl AppMutation {
    // ------------------------------------------------------------------
    // Account
    // ------------------------------------------------------------------

    async fn create_user(
        &self,
        ctx: &Context<'_>,
        username: String,
        password: String,
    ) -> Result<UserPayload> {
        respond(services(ctx)?.accounts.create_user(&username, &password).await)
    }

    /// Log in and receive an access and a refresh token
    async fn auth(&self, ctx: &Context<'_>, username: String, password: String) -> Result<TokenPayload> {
        respond(services(ctx)?.accounts.login_user(&username, &password).await)
    }

    /// Exchange a refresh token for a new access token
    async fn refresh(&self, ctx: &Context<'_>, refresh_token: String) -> Result<AccessTokenPayload> {
        respond(services(ctx)?.accounts.refresh(&refresh_token))
    }

    async fn change_password(&self, ctx: &Context<'_>, password: String) -> Result<OkPayload> {
        let username = require_user!(ctx);
        respond(
            services(ctx)?
                .accounts
                .change_user_password(username, &password)
                .await,
        )
    }

    /// Redeem a producer code
    async fn promote_user(&self, ctx: &Context<'_>, code: String) -> Result<UserPayload> {
        let username = require_user!(ctx);
        respond(services(ctx)?.accounts.promote_user(username, &code).await)
    }

    async fn delete_account(&self, ctx: &Context<'_>) -> Result<OkPayload> {
        let username = require_user!(ctx);
        respond(services(ctx)?.accounts.delete_user(username).await.map(|_| ()))
    }

    async fn choose_profile_picture(&self, ctx: &Context<'_>, picture_id: i64) -> Result<UserPayload> {
        let username = require_user!(ctx);
        respond(
            services(ctx)?
                .media
                .choose_profile_picture(username, picture_id)
                .await,
        )
    }

    async fn update_badge_progress(
        &self,
        ctx: &Context<'_>,
        badge_id: String,
        progress: i64,
    ) -> Result<BadgeProgressPayload> {
        let username = require_user!(ctx);
        respond(
            services(ctx)?
                .media
                .update_badge_progress(username, &badge_id, progress)
                .await,
        )
    }

    // ------------------------------------------------------------------
    // Favourites and feedback
    // ------------------------------------------------------------------

    async fn add_favourite_tour(&self, ctx: &Context<'_>, tour_id: i64) -> Result<OkPayload> {
        let username = require_user!(ctx);
        respond(services(ctx)?.social.add_favourite_tour(username, tour_id).await)
    }

    async fn remove_favourite_tour(&self, ctx: &Context<'_>, tour_id: i64) -> Result<OkPayload> {
        let username = require_user!(ctx);
        respond(services(ctx)?.social.remove_favourite_tour(username, tour_id).await)
    }

    async fn add_favourite_object(&self, ctx: &Context<'_>, object_id: String) -> Result<OkPayload> {
        let username = require_user!(ctx);
        respond(
            services(ctx)?
                .social
                .add_favourite_object(username, &object_id)
                .await,
        )
    }

    async fn remove_favourite_object(
        &self,
        ctx: &Context<'_>,
        object_id: String,
    ) -> Result<OkPayload> {
        let username = require_user!(ctx);
        respond(
            services(ctx)?
                .social
                .remove_favourite_object(username, &object_id)
                .await,
        )
    }

    /// Feedback about the app
    async fn send_feedback(
        &self,
        ctx: &Context<'_>,
        rating: i32,
        review: String,
    ) -> Result<FeedbackPayload> {
        require_user!(ctx);
        respond(services(ctx)?.social.send_feedback(rating, &review).await)
    }

    // ------------------------------------------------------------------
    // Tours
    // ------------------------------------------------------------------

    async fn create_tour(&self, ctx: &Context<'_>, input: CreateTourInput) -> Result<TourPayload> {
        let username = require_user!(ctx);
        respond(services(ctx)?.tours.create_tour(username, input).await)
    }

    async fn delete_tour(&self, ctx: &Context<'_>, tour_id: i64) -> Result<OkPayload> {
        let username = require_user!(ctx);
        respond(services(ctx)?.tours.delete_tour(username, tour_id).await.map(|_| ()))
    }

    /// Join a tour with its session id
    async fn add_member(&self, ctx: &Context<'_>, tour_id: i64, session_id: i64) -> Result<TourPayload> {
        let username = require_user!(ctx);
        respond(services(ctx)?.tours.join(username, tour_id, session_id).await)
    }

    async fn remove_user(&self, ctx: &Context<'_>, tour_id: i64, username: String) -> Result<OkPayload> {
        let owner = require_user!(ctx);
        respond(
            services(ctx)?
                .tours
                .remove_member(owner, tour_id, &username)
                .await,
        )
    }

    async fn update_session_id(
        &self,
        ctx: &Context<'_>,
        tour_id: i64,
        session_id: i64,
    ) -> Result<TourPayload> {
        let username = require_user!(ctx);
        respond(
            services(ctx)?
                .tours
                .update_session_id(username, tour_id, session_id)
                .await,
        )
    }

    /// Ask for the tour to be featured
    async fn submit_review(&self, ctx: &Context<'_>, tour_id: i64) -> Result<TourPayload> {
        let username = require_user!(ctx);
        respond(services(ctx)?.tours.submit_review(username, tour_id).await)
    }

    async fn submit_tour_feedback(
        &self,
        ctx: &Context<'_>,
        tour_id: i64,
        rating: i32,
        review: String,
    ) -> Result<TourFeedbackPayload> {
        let username = require_user!(ctx);
        respond(
            services(ctx)?
                .tours
                .submit_feedback(username, tour_id, rating, &review)
                .await,
        )
    }

    // ------------------------------------------------------------------
    // Checkpoints
    // ------------------------------------------------------------------

    /// Append a text checkpoint
    async fn create_checkpoint(
        &self,
        ctx: &Context<'_>,
        tour_id: i64,
        #[graphql(default)] display: CheckpointDisplayInput,
    ) -> Result<CheckpointPayload> {
        let username = require_user!(ctx);
        self.append(ctx, username, tour_id, display, CheckpointKind::Text).await
    }

    async fn create_picture_checkpoint(
        &self,
        ctx: &Context<'_>,
        tour_id: i64,
        picture_id: i64,
        #[graphql(default)] display: CheckpointDisplayInput,
    ) -> Result<CheckpointPayload> {
        let username = require_user!(ctx);
        let kind = CheckpointKind::Picture { picture_id };
        self.append(ctx, username, tour_id, display, kind).await
    }

    async fn create_object_checkpoint(
        &self,
        ctx: &Context<'_>,
        tour_id: i64,
        object_id: String,
        #[graphql(default)] display: CheckpointDisplayInput,
    ) -> Result<CheckpointPayload> {
        let username = require_user!(ctx);
        let kind = CheckpointKind::Object { object_id };
        self.append(ctx, username, tour_id, display, kind).await
    }

    /// Append a free-text question
    async fn create_question(
        &self,
        ctx: &Context<'_>,
        tour_id: i64,
        question: String,
        #[graphql(default)] linked_objects: Vec<String>,
        #[graphql(default)] display: CheckpointDisplayInput,
    ) -> Result<CheckpointPayload> {
        let username = require_user!(ctx);
        let kind = CheckpointKind::Question {
            question,
            linked_objects,
        };
        self.append(ctx, username, tour_id, display, kind).await
    }

    /// Append a multiple-choice question. `correct_answers` index into
    /// `possible_answers`.
    async fn create_mc_question(
        &self,
        ctx: &Context<'_>,
        tour_id: i64,
        question: String,
        possible_answers: Vec<String>,
        correct_answers: Vec<i64>,
        max_choices: Option<i64>,
        #[graphql(default)] linked_objects: Vec<String>,
        #[graphql(default)] display: CheckpointDisplayInput,
    ) -> Result<CheckpointPayload> {
        let username = require_user!(ctx);
        let kind = CheckpointKind::MultipleChoice {
            question,
            linked_objects,
            possible_answers,
            correct_answers,
            max_choices,
        };
        self.append(ctx, username, tour_id, display, kind).await
    }

    async fn edit_checkpoint(
        &self,
        ctx: &Context<'_>,
        checkpoint_id: i64,
        patch: CheckpointPatch,
    ) -> Result<CheckpointPayload> {
        let username = require_user!(ctx);
        let result = services(ctx)?
            .checkpoints
            .edit(Actor::User(username), checkpoint_id, patch)
            .await;
        respond(result.map(CheckpointObject))
    }

    /// Move a checkpoint; `-1` moves it to the end
    async fn move_checkpoint(
        &self,
        ctx: &Context<'_>,
        checkpoint_id: i64,
        index: i64,
    ) -> Result<CheckpointPayload> {
        let username = require_user!(ctx);
        let result = services(ctx)?
            .checkpoints
            .move_checkpoint(username, checkpoint_id, index)
            .await;
        respond(result.map(CheckpointObject))
    }

    async fn delete_checkpoint(&self, ctx: &Context<'_>, checkpoint_id: i64) -> Result<OkPayload> {
        let username = require_user!(ctx);
        let result = services(ctx)?.checkpoints.delete(username, checkpoint_id).await;
        respond(result.map(|_| ()))
    }

    // ------------------------------------------------------------------
    // Answers
    // ------------------------------------------------------------------

    async fn create_answer(
        &self,
        ctx: &Context<'_>,
        question_id: i64,
        answer: String,
    ) -> Result<AnswerPayload> {
        let username = require_user!(ctx);
        let result = services(ctx)?
            .answers
            .answer_text(username, question_id, &answer)
            .await;
        respond(result.map(AnswerObject))
    }

    async fn create_mc_answer(
        &self,
        ctx: &Context<'_>,
        question_id: i64,
        answers: Vec<i64>,
    ) -> Result<AnswerPayload> {
        let username = require_user!(ctx);
        let result = services(ctx)?
            .answers
            .answer_multiple_choice(username, question_id, &answers)
            .await;
        respond(result.map(AnswerObject))
    }
}

impl AppMutation {
    async fn append(
        &self,
        ctx: &Context<'_>,
        username: &str,
        tour_id: i64,
        display: CheckpointDisplayInput,
        kind: CheckpointKind,
    ) -> Result<CheckpointPayload> {
        let result = services(ctx)?
            .checkpoints
            .create(username, tour_id, display, kind)
            .await;
        respond(result.map(CheckpointObject))
    }
}
