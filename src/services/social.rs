//! Social service
//!
//! Favourites and app feedback.

use crate::db::repositories::{
    FavouriteRepository, FeedbackRepository, MuseumObjectRepository, TourRepository,
    UserRepository,
};
use crate::models::{AppFeedback, MuseumObject, Tour};
use crate::services::access;
use crate::services::error::{ServiceError, ServiceResult};
use std::sync::Arc;
use tracing::debug;

pub struct SocialService {
    users: Arc<dyn UserRepository>,
    tours: Arc<dyn TourRepository>,
    objects: Arc<dyn MuseumObjectRepository>,
    favourites: Arc<dyn FavouriteRepository>,
    feedback: Arc<dyn FeedbackRepository>,
}

impl SocialService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        tours: Arc<dyn TourRepository>,
        objects: Arc<dyn MuseumObjectRepository>,
        favourites: Arc<dyn FavouriteRepository>,
        feedback: Arc<dyn FeedbackRepository>,
    ) -> Self {
        Self {
            users,
            tours,
            objects,
            favourites,
            feedback,
        }
    }

    // ========================================================================
    // Favourites
    // ========================================================================

    /// Favourite a tour. Adding it twice is a no-op.
    pub async fn add_favourite_tour(&self, username: &str, tour_id: i64) -> ServiceResult<()> {
        let user = access::caller(self.users.as_ref(), username).await?;
        access::tour(self.tours.as_ref(), tour_id).await?;
        if !self.favourites.add_tour(user.id, tour_id).await? {
            debug!(username, tour_id, "tour already a favourite");
        }
        Ok(())
    }

    pub async fn remove_favourite_tour(&self, username: &str, tour_id: i64) -> ServiceResult<()> {
        let user = access::caller(self.users.as_ref(), username).await?;
        Ok(self.favourites.remove_tour(user.id, tour_id).await?)
    }

    pub async fn favourite_tours(&self, username: &str) -> ServiceResult<Vec<Tour>> {
        let user = access::caller(self.users.as_ref(), username).await?;
        Ok(self.favourites.list_tours(user.id).await?)
    }

    /// Favourite a museum object. Adding it twice is a no-op.
    pub async fn add_favourite_object(&self, username: &str, object_id: &str) -> ServiceResult<()> {
        let user = access::caller(self.users.as_ref(), username).await?;
        if self.objects.get(object_id).await?.is_none() {
            return Err(ServiceError::not_found(format!("museum object '{}'", object_id)));
        }
        if !self.favourites.add_object(user.id, object_id).await? {
            debug!(username, object_id, "object already a favourite");
        }
        Ok(())
    }

    pub async fn remove_favourite_object(
        &self,
        username: &str,
        object_id: &str,
    ) -> ServiceResult<()> {
        let user = access::caller(self.users.as_ref(), username).await?;
        Ok(self.favourites.remove_object(user.id, object_id).await?)
    }

    pub async fn favourite_objects(&self, username: &str) -> ServiceResult<Vec<MuseumObject>> {
        let user = access::caller(self.users.as_ref(), username).await?;
        Ok(self.favourites.list_objects(user.id).await?)
    }

    // ========================================================================
    // App feedback
    // ========================================================================

    pub async fn send_feedback(&self, rating: i32, review: &str) -> ServiceResult<AppFeedback> {
        Ok(self.feedback.create_app_feedback(rating, review).await?)
    }

    pub async fn feedback(&self, unread_only: bool) -> ServiceResult<Vec<AppFeedback>> {
        Ok(self.feedback.list_app_feedback(unread_only).await?)
    }

    /// Mark app feedback as read
    pub async fn read_feedback(&self, feedback_id: i64) -> ServiceResult<()> {
        if !self.feedback.mark_read(feedback_id).await? {
            return Err(ServiceError::not_found(format!("feedback {}", feedback_id)));
        }
        Ok(())
    }
}
