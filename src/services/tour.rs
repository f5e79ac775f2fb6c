//! Tour service
//!
//! Tour lifecycle (create, join, membership, review workflow, delete) and the
//! feedback members leave on a tour.

use crate::db::repositories::{
    CascadeRepository, FeedbackRepository, TourRepository, UserRepository,
};
use crate::models::{is_valid_rating, CreateTourInput, Tour, TourFeedback, TourStatus};
use crate::models::{MAX_RATING, MIN_RATING};
use crate::services::access;
use crate::services::error::{ServiceError, ServiceResult};
use std::sync::Arc;
use tracing::{debug, info};

pub struct TourService {
    users: Arc<dyn UserRepository>,
    tours: Arc<dyn TourRepository>,
    feedback: Arc<dyn FeedbackRepository>,
    cascade: Arc<dyn CascadeRepository>,
}

impl TourService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        tours: Arc<dyn TourRepository>,
        feedback: Arc<dyn FeedbackRepository>,
        cascade: Arc<dyn CascadeRepository>,
    ) -> Self {
        Self {
            users,
            tours,
            feedback,
            cascade,
        }
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Create a tour owned by a producer. The owner joins it right away.
    pub async fn create_tour(&self, username: &str, input: CreateTourInput) -> ServiceResult<Tour> {
        let owner = access::caller(self.users.as_ref(), username).await?;
        if !owner.producer {
            debug!(username, "tour creation by non-producer");
            return Err(ServiceError::forbidden("only producers may create tours"));
        }
        if input.name.trim().is_empty() {
            return Err(ServiceError::validation("name must not be empty"));
        }
        if input.search_id.trim().is_empty() {
            return Err(ServiceError::validation("search id must not be empty"));
        }
        if self.tours.get_by_search_id(&input.search_id).await?.is_some() {
            return Err(ServiceError::Conflict(format!(
                "Search id '{}' is already taken",
                input.search_id
            )));
        }

        let tour = self.tours.create(&owner, &input).await?;
        info!(tour_id = tour.id, owner = %owner.username, "tour created");
        Ok(tour)
    }

    /// Delete a tour the caller owns. A missing tour is not an error.
    pub async fn delete_tour(&self, username: &str, tour_id: i64) -> ServiceResult<bool> {
        let user = access::caller(self.users.as_ref(), username).await?;
        match access::owned_tour(self.tours.as_ref(), &user, tour_id).await {
            Ok(_) => {}
            Err(ServiceError::NotFound(_)) => return Ok(false),
            Err(e) => return Err(e),
        }
        self.remove(tour_id).await
    }

    /// Delete any tour
    pub async fn admin_delete_tour(&self, tour_id: i64) -> ServiceResult<bool> {
        self.remove(tour_id).await
    }

    async fn remove(&self, tour_id: i64) -> ServiceResult<bool> {
        let deleted = self.cascade.delete_tour(tour_id).await?;
        if deleted {
            info!(tour_id, "tour deleted");
        }
        Ok(deleted)
    }

    // ========================================================================
    // Membership
    // ========================================================================

    /// Join a tour by presenting its session id
    pub async fn join(&self, username: &str, tour_id: i64, session_id: i64) -> ServiceResult<Tour> {
        let user = access::caller(self.users.as_ref(), username).await?;
        let tour = access::tour(self.tours.as_ref(), tour_id).await?;
        if tour.session_id != session_id {
            debug!(tour_id, username, "wrong session id");
            return Err(ServiceError::forbidden("session id does not match"));
        }
        if !self.tours.add_member(tour_id, user.id).await? {
            return Err(ServiceError::Conflict(format!(
                "'{}' is already a member of tour {}",
                username, tour_id
            )));
        }
        Ok(tour)
    }

    /// Remove a member from a tour the caller owns
    pub async fn remove_member(
        &self,
        username: &str,
        tour_id: i64,
        member: &str,
    ) -> ServiceResult<()> {
        let owner = access::caller(self.users.as_ref(), username).await?;
        access::owned_tour(self.tours.as_ref(), &owner, tour_id).await?;
        if member == owner.username {
            return Err(ServiceError::validation("the owner cannot leave their own tour"));
        }

        let member = self
            .users
            .get_by_username(member)
            .await?
            .ok_or_else(|| ServiceError::not_found(format!("user '{}'", member)))?;
        if !self.tours.remove_member(tour_id, member.id).await? {
            return Err(ServiceError::not_found(format!(
                "'{}' in tour {}",
                member.username, tour_id
            )));
        }
        Ok(())
    }

    pub async fn update_session_id(
        &self,
        username: &str,
        tour_id: i64,
        session_id: i64,
    ) -> ServiceResult<Tour> {
        let owner = access::caller(self.users.as_ref(), username).await?;
        access::owned_tour(self.tours.as_ref(), &owner, tour_id).await?;
        self.tours.update_session_id(tour_id, session_id).await?;
        access::tour(self.tours.as_ref(), tour_id).await
    }

    pub async fn members(&self, tour_id: i64) -> ServiceResult<Vec<String>> {
        Ok(self.tours.members(tour_id).await?)
    }

    // ========================================================================
    // Review workflow
    // ========================================================================

    /// Ask the admins to feature a tour
    pub async fn submit_review(&self, username: &str, tour_id: i64) -> ServiceResult<Tour> {
        let owner = access::caller(self.users.as_ref(), username).await?;
        access::owned_tour(self.tours.as_ref(), &owner, tour_id).await?;
        self.set_status(tour_id, TourStatus::Pending).await
    }

    pub async fn accept_review(&self, tour_id: i64) -> ServiceResult<Tour> {
        self.set_status(tour_id, TourStatus::Featured).await
    }

    pub async fn deny_review(&self, tour_id: i64) -> ServiceResult<Tour> {
        self.set_status(tour_id, TourStatus::Private).await
    }

    async fn set_status(&self, tour_id: i64, status: TourStatus) -> ServiceResult<Tour> {
        access::tour(self.tours.as_ref(), tour_id).await?;
        self.tours.update_status(tour_id, status).await?;
        info!(tour_id, %status, "tour status changed");
        access::tour(self.tours.as_ref(), tour_id).await
    }

    // ========================================================================
    // Lookup
    // ========================================================================

    /// A tour as seen by one of its members
    pub async fn tour_for_member(&self, username: &str, tour_id: i64) -> ServiceResult<Tour> {
        let user = access::caller(self.users.as_ref(), username).await?;
        access::member_tour(self.tours.as_ref(), &user, tour_id).await
    }

    pub async fn tour(&self, tour_id: i64) -> ServiceResult<Option<Tour>> {
        Ok(self.tours.get(tour_id).await?)
    }

    /// Tours the caller has joined, their own included
    pub async fn joined_tours(&self, username: &str) -> ServiceResult<Vec<Tour>> {
        let user = access::caller(self.users.as_ref(), username).await?;
        Ok(self.tours.list_joined(user.id).await?)
    }

    pub async fn owned_tours(&self, username: &str) -> ServiceResult<Vec<Tour>> {
        let user = access::caller(self.users.as_ref(), username).await?;
        Ok(self.tours.list_owned(user.id).await?)
    }

    pub async fn featured(&self) -> ServiceResult<Vec<Tour>> {
        Ok(self.tours.list_by_status(TourStatus::Featured).await?)
    }

    pub async fn pending(&self) -> ServiceResult<Vec<Tour>> {
        Ok(self.tours.list_by_status(TourStatus::Pending).await?)
    }

    // ========================================================================
    // Tour feedback
    // ========================================================================

    pub async fn submit_feedback(
        &self,
        username: &str,
        tour_id: i64,
        rating: i32,
        review: &str,
    ) -> ServiceResult<TourFeedback> {
        if !is_valid_rating(rating) {
            return Err(ServiceError::validation(format!(
                "rating must be between {} and {}",
                MIN_RATING, MAX_RATING
            )));
        }
        let user = access::caller(self.users.as_ref(), username).await?;
        access::member_tour(self.tours.as_ref(), &user, tour_id).await?;
        Ok(self.feedback.create_tour_feedback(tour_id, rating, review).await?)
    }

    /// Feedback on a tour the caller owns
    pub async fn feedback_for_owner(
        &self,
        username: &str,
        tour_id: i64,
    ) -> ServiceResult<Vec<TourFeedback>> {
        let owner = access::caller(self.users.as_ref(), username).await?;
        access::owned_tour(self.tours.as_ref(), &owner, tour_id).await?;
        Ok(self.feedback.list_tour_feedback(tour_id).await?)
    }

    pub async fn feedback(&self, tour_id: i64) -> ServiceResult<Vec<TourFeedback>> {
        Ok(self.feedback.list_tour_feedback(tour_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::test_support::{insert_user, migrated_pool};
    use crate::db::repositories::{
        SqlxCascadeRepository, SqlxFeedbackRepository, SqlxTourRepository, SqlxUserRepository,
    };
    use crate::db::DynDatabasePool;
    use crate::models::User;

    async fn setup_test_service() -> (DynDatabasePool, TourService) {
        let pool = migrated_pool().await;
        let service = TourService::new(
            SqlxUserRepository::boxed(pool.clone()),
            SqlxTourRepository::boxed(pool.clone()),
            SqlxFeedbackRepository::boxed(pool.clone()),
            SqlxCascadeRepository::boxed(pool.clone()),
        );
        (pool, service)
    }

    fn input(search_id: &str) -> CreateTourInput {
        CreateTourInput {
            name: "Old Masters".to_string(),
            session_id: 4711,
            search_id: search_id.to_string(),
            description: None,
            difficulty: Some(2),
        }
    }

    #[tokio::test]
    async fn test_create_tour_requires_producer() {
        let (pool, service) = setup_test_service().await;
        SqlxUserRepository::new(pool.clone())
            .create(&User::new("visitor".to_string(), "hash".to_string()))
            .await
            .unwrap();

        let result = service.create_tour("visitor", input("masters")).await;
        assert!(matches!(result, Err(ServiceError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_create_tour_owner_is_member_and_search_id_unique() {
        let (pool, service) = setup_test_service().await;
        insert_user(&pool, "anna").await;

        let tour = service.create_tour("anna", input("masters")).await.unwrap();
        assert_eq!(tour.owner, "anna");
        assert_eq!(tour.status, TourStatus::Private);
        assert_eq!(service.members(tour.id).await.unwrap(), vec!["anna"]);
        assert_eq!(service.joined_tours("anna").await.unwrap().len(), 1);

        let again = service.create_tour("anna", input("masters")).await;
        assert!(matches!(again, Err(ServiceError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_join_checks_session_and_membership() {
        let (pool, service) = setup_test_service().await;
        insert_user(&pool, "anna").await;
        insert_user(&pool, "ben").await;
        let tour = service.create_tour("anna", input("masters")).await.unwrap();

        let wrong = service.join("ben", tour.id, 1).await;
        assert!(matches!(wrong, Err(ServiceError::Forbidden(_))));

        service.join("ben", tour.id, 4711).await.unwrap();
        assert!(service.tour_for_member("ben", tour.id).await.is_ok());

        let twice = service.join("ben", tour.id, 4711).await;
        assert!(matches!(twice, Err(ServiceError::Conflict(_))));

        let missing = service.join("ben", 999, 4711).await;
        assert!(matches!(missing, Err(ServiceError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_remove_member() {
        let (pool, service) = setup_test_service().await;
        insert_user(&pool, "anna").await;
        insert_user(&pool, "ben").await;
        let tour = service.create_tour("anna", input("masters")).await.unwrap();
        service.join("ben", tour.id, 4711).await.unwrap();

        let by_member = service.remove_member("ben", tour.id, "anna").await;
        assert!(matches!(by_member, Err(ServiceError::Forbidden(_))));

        let owner_self = service.remove_member("anna", tour.id, "anna").await;
        assert!(matches!(owner_self, Err(ServiceError::Validation(_))));

        service.remove_member("anna", tour.id, "ben").await.unwrap();
        let result = service.tour_for_member("ben", tour.id).await;
        assert!(matches!(result, Err(ServiceError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_review_workflow() {
        let (pool, service) = setup_test_service().await;
        insert_user(&pool, "anna").await;
        insert_user(&pool, "ben").await;
        let tour = service.create_tour("anna", input("masters")).await.unwrap();

        let by_other = service.submit_review("ben", tour.id).await;
        assert!(matches!(by_other, Err(ServiceError::Forbidden(_))));
        assert_eq!(service.tour(tour.id).await.unwrap().unwrap().status, TourStatus::Private);

        let pending = service.submit_review("anna", tour.id).await.unwrap();
        assert_eq!(pending.status, TourStatus::Pending);
        assert_eq!(service.pending().await.unwrap().len(), 1);

        let featured = service.accept_review(tour.id).await.unwrap();
        assert_eq!(featured.status, TourStatus::Featured);
        assert_eq!(service.featured().await.unwrap().len(), 1);
        assert!(service.pending().await.unwrap().is_empty());

        let private = service.deny_review(tour.id).await.unwrap();
        assert_eq!(private.status, TourStatus::Private);
    }

    #[tokio::test]
    async fn test_delete_tour_owner_only_and_idempotent() {
        let (pool, service) = setup_test_service().await;
        insert_user(&pool, "anna").await;
        insert_user(&pool, "ben").await;
        let tour = service.create_tour("anna", input("masters")).await.unwrap();

        let by_other = service.delete_tour("ben", tour.id).await;
        assert!(matches!(by_other, Err(ServiceError::Forbidden(_))));

        assert!(service.delete_tour("anna", tour.id).await.unwrap());
        assert!(!service.delete_tour("anna", tour.id).await.unwrap());
        assert!(!service.admin_delete_tour(tour.id).await.unwrap());
        assert!(service.owned_tours("anna").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_tour_feedback_members_only() {
        let (pool, service) = setup_test_service().await;
        insert_user(&pool, "anna").await;
        insert_user(&pool, "ben").await;
        let tour = service.create_tour("anna", input("masters")).await.unwrap();

        let outsider = service.submit_feedback("ben", tour.id, 4, "nice").await;
        assert!(matches!(outsider, Err(ServiceError::Forbidden(_))));

        service.join("ben", tour.id, 4711).await.unwrap();
        let bad_rating = service.submit_feedback("ben", tour.id, 6, "wow").await;
        assert!(matches!(bad_rating, Err(ServiceError::Validation(_))));

        service.submit_feedback("ben", tour.id, 5, "great").await.unwrap();
        assert_eq!(service.feedback_for_owner("anna", tour.id).await.unwrap().len(), 1);
        assert!(matches!(
            service.feedback_for_owner("ben", tour.id).await,
            Err(ServiceError::Forbidden(_))
        ));
    }
}
