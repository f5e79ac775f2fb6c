//! Ownership and membership checks shared by the tour-scoped services

use crate::db::repositories::{TourRepository, UserRepository};
use crate::models::{Tour, User};
use crate::services::error::{ServiceError, ServiceResult};
use tracing::debug;

/// Resolve the username carried by a verified token. A token that outlived
/// its account is treated as bad credentials.
pub(crate) async fn caller(users: &dyn UserRepository, username: &str) -> ServiceResult<User> {
    users
        .get_by_username(username)
        .await?
        .ok_or_else(|| ServiceError::Authentication(format!("unknown user '{}'", username)))
}

pub(crate) async fn tour(tours: &dyn TourRepository, tour_id: i64) -> ServiceResult<Tour> {
    tours
        .get(tour_id)
        .await?
        .ok_or_else(|| ServiceError::not_found(format!("tour {}", tour_id)))
}

/// Load a tour the user owns
pub(crate) async fn owned_tour(
    tours: &dyn TourRepository,
    user: &User,
    tour_id: i64,
) -> ServiceResult<Tour> {
    let tour = tour(tours, tour_id).await?;
    if !tour.is_owned_by(user.id) {
        debug!(tour_id, username = %user.username, "not the tour owner");
        return Err(ServiceError::forbidden("only the tour owner may do this"));
    }
    Ok(tour)
}

/// Load a tour the user has joined
pub(crate) async fn member_tour(
    tours: &dyn TourRepository,
    user: &User,
    tour_id: i64,
) -> ServiceResult<Tour> {
    let tour = tour(tours, tour_id).await?;
    if !tours.is_member(tour_id, user.id).await? {
        debug!(tour_id, username = %user.username, "not a tour member");
        return Err(ServiceError::forbidden("only tour members may do this"));
    }
    Ok(tour)
}
