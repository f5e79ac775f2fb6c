//! `/web` schema: the curator administration client

use super::payload::{
    admin, respond, resolve, resolve_list, services, AccessTokenPayload, AdminPayload,
    CheckpointPayload, CodePayload, MuseumObjectPayload, OkPayload, ProfilePicturePayload,
    TokenPayload, TourPayload, UserPayload,
};
use super::types::CheckpointObject;
use crate::models::{
    AppFeedback, CheckpointPatch, Code, CreateMuseumObjectInput, MuseumObject, MuseumObjectFilter,
    Tour, TourFeedback, UpdateMuseumObjectInput, User,
};
use crate::services::Actor;
use async_graphql::{Context, Object, Result};

/// Bail out with `ok: null` unless an admin is authenticated
macro_rules! require_admin {
    ($ctx:expr) => {
        if admin($ctx).is_none() {
            return Ok(Default::default());
        }
    };
}

#[derive(Default)]
pub struct WebQuery;

#[Object]
impl WebQuery {
    /// Tours waiting for review
    async fn pending(&self, ctx: &Context<'_>) -> Result<Vec<Tour>> {
        require_admin!(ctx);
        resolve_list(services(ctx)?.tours.pending().await)
    }

    async fn featured(&self, ctx: &Context<'_>) -> Result<Vec<Tour>> {
        require_admin!(ctx);
        resolve_list(services(ctx)?.tours.featured().await)
    }

    /// All app feedback, newest first
    async fn feedback(&self, ctx: &Context<'_>) -> Result<Vec<AppFeedback>> {
        require_admin!(ctx);
        resolve_list(services(ctx)?.social.feedback(false).await)
    }

    async fn unread_feedback(&self, ctx: &Context<'_>) -> Result<Vec<AppFeedback>> {
        require_admin!(ctx);
        resolve_list(services(ctx)?.social.feedback(true).await)
    }

    /// Unredeemed producer codes
    async fn codes(&self, ctx: &Context<'_>) -> Result<Vec<Code>> {
        require_admin!(ctx);
        resolve_list(services(ctx)?.accounts.list_codes().await)
    }

    async fn tour_feedback(&self, ctx: &Context<'_>, tour_id: i64) -> Result<Vec<TourFeedback>> {
        require_admin!(ctx);
        resolve_list(services(ctx)?.tours.feedback(tour_id).await)
    }

    async fn tour(&self, ctx: &Context<'_>, tour_id: i64) -> Result<Option<Tour>> {
        require_admin!(ctx);
        Ok(resolve(services(ctx)?.tours.tour(tour_id).await)?.flatten())
    }

    async fn checkpoint(&self, ctx: &Context<'_>, checkpoint_id: i64) -> Result<Option<CheckpointObject>> {
        require_admin!(ctx);
        let checkpoint = resolve(services(ctx)?.checkpoints.get(checkpoint_id).await)?.flatten();
        Ok(checkpoint.map(CheckpointObject))
    }

    async fn checkpoints_by_tour(
        &self,
        ctx: &Context<'_>,
        tour_id: i64,
    ) -> Result<Vec<CheckpointObject>> {
        require_admin!(ctx);
        let list = resolve_list(services(ctx)?.checkpoints.list(tour_id).await)?;
        Ok(list.into_iter().map(CheckpointObject).collect())
    }

    async fn all_objects(&self, ctx: &Context<'_>) -> Result<Vec<MuseumObject>> {
        require_admin!(ctx);
        resolve_list(services(ctx)?.catalog.list().await)
    }

    async fn museum_objects(
        &self,
        ctx: &Context<'_>,
        #[graphql(default)] filter: MuseumObjectFilter,
    ) -> Result<Vec<MuseumObject>> {
        require_admin!(ctx);
        resolve_list(services(ctx)?.catalog.search(&filter).await)
    }

    async fn users(&self, ctx: &Context<'_>) -> Result<Vec<User>> {
        require_admin!(ctx);
        resolve_list(services(ctx)?.accounts.list_users().await)
    }
}

#[derive(Default)]
pub struct WebMutation;

#[Object]
impl WebMutation {
    // ------------------------------------------------------------------
    // Admin accounts
    // ------------------------------------------------------------------

    /// Create an admin. Without a token this only works for the very first one.
    async fn create_admin(
        &self,
        ctx: &Context<'_>,
        username: String,
        password: String,
    ) -> Result<AdminPayload> {
        let caller_is_admin = admin(ctx).is_some();
        respond(
            services(ctx)?
                .accounts
                .create_admin(&username, &password, caller_is_admin)
                .await,
        )
    }

    async fn auth(&self, ctx: &Context<'_>, username: String, password: String) -> Result<TokenPayload> {
        respond(services(ctx)?.accounts.login_admin(&username, &password).await)
    }

    async fn refresh(&self, ctx: &Context<'_>, refresh_token: String) -> Result<AccessTokenPayload> {
        respond(services(ctx)?.accounts.refresh(&refresh_token))
    }

    async fn change_password(&self, ctx: &Context<'_>, password: String) -> Result<OkPayload> {
        let Some(username) = admin(ctx) else {
            return Ok(Default::default());
        };
        respond(
            services(ctx)?
                .accounts
                .change_admin_password(username, &password)
                .await,
        )
    }

    // ------------------------------------------------------------------
    // Catalog
    // ------------------------------------------------------------------

    async fn create_museum_object(
        &self,
        ctx: &Context<'_>,
        input: CreateMuseumObjectInput,
    ) -> Result<MuseumObjectPayload> {
        require_admin!(ctx);
        respond(services(ctx)?.catalog.create(input).await)
    }

    async fn update_museum_object(
        &self,
        ctx: &Context<'_>,
        object_id: String,
        patch: UpdateMuseumObjectInput,
    ) -> Result<MuseumObjectPayload> {
        require_admin!(ctx);
        respond(services(ctx)?.catalog.update(&object_id, patch).await)
    }

    /// Delete an object along with its checkpoints, links, favourites and pictures
    async fn delete_museum_object(&self, ctx: &Context<'_>, object_id: String) -> Result<OkPayload> {
        require_admin!(ctx);
        respond(services(ctx)?.catalog.delete(&object_id).await.map(|_| ()))
    }

    // ------------------------------------------------------------------
    // Users
    // ------------------------------------------------------------------

    /// Draw a new single-use producer code
    async fn create_code(&self, ctx: &Context<'_>) -> Result<CodePayload> {
        require_admin!(ctx);
        respond(services(ctx)?.accounts.create_code().await)
    }

    async fn demote_user(&self, ctx: &Context<'_>, username: String) -> Result<UserPayload> {
        require_admin!(ctx);
        respond(services(ctx)?.accounts.demote_user(&username).await)
    }

    async fn delete_user(&self, ctx: &Context<'_>, username: String) -> Result<OkPayload> {
        require_admin!(ctx);
        respond(services(ctx)?.accounts.delete_user(&username).await.map(|_| ()))
    }

    // ------------------------------------------------------------------
    // Tours
    // ------------------------------------------------------------------

    async fn accept_review(&self, ctx: &Context<'_>, tour_id: i64) -> Result<TourPayload> {
        require_admin!(ctx);
        respond(services(ctx)?.tours.accept_review(tour_id).await)
    }

    async fn deny_review(&self, ctx: &Context<'_>, tour_id: i64) -> Result<TourPayload> {
        require_admin!(ctx);
        respond(services(ctx)?.tours.deny_review(tour_id).await)
    }

    async fn delete_tour(&self, ctx: &Context<'_>, tour_id: i64) -> Result<OkPayload> {
        require_admin!(ctx);
        respond(services(ctx)?.tours.admin_delete_tour(tour_id).await.map(|_| ()))
    }

    async fn edit_checkpoint(
        &self,
        ctx: &Context<'_>,
        checkpoint_id: i64,
        patch: CheckpointPatch,
    ) -> Result<CheckpointPayload> {
        require_admin!(ctx);
        let result = services(ctx)?
            .checkpoints
            .edit(Actor::Admin, checkpoint_id, patch)
            .await;
        respond(result.map(CheckpointObject))
    }

    // ------------------------------------------------------------------
    // Feedback and media
    // ------------------------------------------------------------------

    async fn read_feedback(&self, ctx: &Context<'_>, feedback_id: i64) -> Result<OkPayload> {
        require_admin!(ctx);
        respond(services(ctx)?.social.read_feedback(feedback_id).await)
    }

    async fn set_profile_picture_locked(
        &self,
        ctx: &Context<'_>,
        id: i64,
        locked: bool,
    ) -> Result<ProfilePicturePayload> {
        require_admin!(ctx);
        respond(services(ctx)?.media.set_profile_picture_locked(id, locked).await)
    }

    /// Delete a badge together with everyone's progress towards it
    async fn delete_badge(&self, ctx: &Context<'_>, id: String) -> Result<OkPayload> {
        require_admin!(ctx);
        respond(services(ctx)?.media.delete_badge(&id).await.map(|_| ()))
    }
}
