//! Checkpoint service
//!
//! Authoring of a tour's checkpoints. Only the tour owner appends, moves and
//! deletes; admins may additionally edit any checkpoint. Position bookkeeping
//! itself lives in the repository.

use crate::db::repositories::{
    CheckpointRepository, MediaRepository, MuseumObjectRepository, TourRepository, UserRepository,
};
use crate::models::{Checkpoint, CheckpointDisplayInput, CheckpointKind, CheckpointPatch};
use crate::services::access;
use crate::services::error::{ServiceError, ServiceResult};
use std::sync::Arc;
use tracing::{debug, info};

/// Who is editing a checkpoint
#[derive(Debug, Clone, Copy)]
pub enum Actor<'a> {
    /// An app user, identified by username. Must own the tour.
    User(&'a str),
    /// A web admin
    Admin,
}

pub struct CheckpointService {
    users: Arc<dyn UserRepository>,
    tours: Arc<dyn TourRepository>,
    checkpoints: Arc<dyn CheckpointRepository>,
    media: Arc<dyn MediaRepository>,
    objects: Arc<dyn MuseumObjectRepository>,
}

impl CheckpointService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        tours: Arc<dyn TourRepository>,
        checkpoints: Arc<dyn CheckpointRepository>,
        media: Arc<dyn MediaRepository>,
        objects: Arc<dyn MuseumObjectRepository>,
    ) -> Self {
        Self {
            users,
            tours,
            checkpoints,
            media,
            objects,
        }
    }

    /// Append a checkpoint at the end of a tour the caller owns
    pub async fn create(
        &self,
        username: &str,
        tour_id: i64,
        display: CheckpointDisplayInput,
        kind: CheckpointKind,
    ) -> ServiceResult<Checkpoint> {
        let owner = access::caller(self.users.as_ref(), username).await?;
        access::owned_tour(self.tours.as_ref(), &owner, tour_id).await?;
        kind.validate().map_err(ServiceError::Validation)?;
        self.check_references(&kind).await?;

        let checkpoint = self
            .checkpoints
            .append(tour_id, &display.with_kind(kind))
            .await?
            .ok_or_else(|| ServiceError::not_found(format!("tour {}", tour_id)))?;
        info!(
            tour_id,
            checkpoint_id = checkpoint.id,
            index = checkpoint.index,
            kind = %checkpoint.kind.checkpoint_type(),
            "checkpoint appended"
        );
        Ok(checkpoint)
    }

    /// Patch a checkpoint's content. Its position is not touched.
    pub async fn edit(
        &self,
        actor: Actor<'_>,
        checkpoint_id: i64,
        patch: CheckpointPatch,
    ) -> ServiceResult<Checkpoint> {
        let mut checkpoint = self.require(checkpoint_id).await?;
        if let Actor::User(username) = actor {
            let owner = access::caller(self.users.as_ref(), username).await?;
            access::owned_tour(self.tours.as_ref(), &owner, checkpoint.tour_id).await?;
        }

        checkpoint.apply(patch).map_err(ServiceError::Validation)?;
        self.check_references(&checkpoint.kind).await?;
        Ok(self.checkpoints.update(&checkpoint).await?)
    }

    /// Move a checkpoint to `index`. `-1` or anything past the end moves it
    /// last; other negative values move it first.
    pub async fn move_checkpoint(
        &self,
        username: &str,
        checkpoint_id: i64,
        index: i64,
    ) -> ServiceResult<Checkpoint> {
        let checkpoint = self.require(checkpoint_id).await?;
        let owner = access::caller(self.users.as_ref(), username).await?;
        access::owned_tour(self.tours.as_ref(), &owner, checkpoint.tour_id).await?;

        let moved = self
            .checkpoints
            .move_to(checkpoint_id, index)
            .await?
            .ok_or_else(|| ServiceError::not_found(format!("checkpoint {}", checkpoint_id)))?;
        debug!(checkpoint_id, from = checkpoint.index, to = moved.index, "checkpoint moved");
        Ok(moved)
    }

    /// Delete a checkpoint and close the gap it leaves. Deleting a missing
    /// checkpoint succeeds and returns false.
    pub async fn delete(&self, username: &str, checkpoint_id: i64) -> ServiceResult<bool> {
        let Some(checkpoint) = self.checkpoints.get(checkpoint_id).await? else {
            return Ok(false);
        };
        let owner = access::caller(self.users.as_ref(), username).await?;
        access::owned_tour(self.tours.as_ref(), &owner, checkpoint.tour_id).await?;

        let removed = self.checkpoints.remove(checkpoint_id).await?;
        if removed.is_some() {
            info!(checkpoint_id, tour_id = checkpoint.tour_id, "checkpoint deleted");
        }
        Ok(removed.is_some())
    }

    /// Checkpoints of a tour the caller has joined, in position order
    pub async fn list_for_member(
        &self,
        username: &str,
        tour_id: i64,
    ) -> ServiceResult<Vec<Checkpoint>> {
        let user = access::caller(self.users.as_ref(), username).await?;
        access::member_tour(self.tours.as_ref(), &user, tour_id).await?;
        Ok(self.checkpoints.list_by_tour(tour_id).await?)
    }

    pub async fn list(&self, tour_id: i64) -> ServiceResult<Vec<Checkpoint>> {
        Ok(self.checkpoints.list_by_tour(tour_id).await?)
    }

    pub async fn get(&self, checkpoint_id: i64) -> ServiceResult<Option<Checkpoint>> {
        Ok(self.checkpoints.get(checkpoint_id).await?)
    }

    async fn require(&self, checkpoint_id: i64) -> ServiceResult<Checkpoint> {
        self.checkpoints
            .get(checkpoint_id)
            .await?
            .ok_or_else(|| ServiceError::not_found(format!("checkpoint {}", checkpoint_id)))
    }

    /// Pictures and museum objects a checkpoint points at must exist
    async fn check_references(&self, kind: &CheckpointKind) -> ServiceResult<()> {
        if let CheckpointKind::Picture { picture_id } = kind {
            if self.media.get_picture(*picture_id).await?.is_none() {
                return Err(ServiceError::not_found(format!("picture {}", picture_id)));
            }
        }

        let single = match kind {
            CheckpointKind::Object { object_id } => Some(object_id),
            _ => None,
        };
        for object_id in single.into_iter().chain(kind.linked_objects()) {
            if self.objects.get(object_id).await?.is_none() {
                return Err(ServiceError::not_found(format!("museum object '{}'", object_id)));
            }
        }
        Ok(())
    }
}
