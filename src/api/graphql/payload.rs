//! Mutation payloads and the mapping from service results onto them
//!
//! Every mutation answers `{ ok, <field> }`:
//! - `ok: null` when the caller is not authenticated for the endpoint
//! - `ok: false` when the service refused the request
//! - `ok: true` with the field set on success
//!
//! Internal failures surface as GraphQL errors instead.

use super::types::{AnswerObject, CheckpointObject};
use crate::models::{
    Admin, AppFeedback, BadgeProgress, Code, MuseumObject, ProfilePicture, Tour, TourFeedback,
    User,
};
use crate::services::{Claims, ServiceError, ServiceResult, Services, TokenPair};
use async_graphql::{Context, SimpleObject};
use tracing::{debug, error};

/// A payload that can report success, refusal or "not authenticated"
pub trait Payload: Default {
    type Value;

    fn success(value: Self::Value) -> Self;

    fn refused() -> Self;
}

macro_rules! payload {
    ($name:ident) => {
        #[derive(Debug, Default, SimpleObject)]
        pub struct $name {
            pub ok: Option<bool>,
        }

        impl Payload for $name {
            type Value = ();

            fn success(_: ()) -> Self {
                Self { ok: Some(true) }
            }

            fn refused() -> Self {
                Self { ok: Some(false) }
            }
        }
    };
    ($name:ident, $field:ident: $ty:ty) => {
        #[derive(Default, SimpleObject)]
        pub struct $name {
            pub ok: Option<bool>,
            pub $field: Option<$ty>,
        }

        impl Payload for $name {
            type Value = $ty;

            fn success(value: $ty) -> Self {
                Self {
                    ok: Some(true),
                    $field: Some(value),
                }
            }

            fn refused() -> Self {
                Self {
                    ok: Some(false),
                    $field: None,
                }
            }
        }
    };
}

payload!(OkPayload);
payload!(UserPayload, user: User);
payload!(AdminPayload, admin: Admin);
payload!(TokenPayload, tokens: TokenPair);
payload!(AccessTokenPayload, access_token: String);
payload!(CodePayload, code: Code);
payload!(TourPayload, tour: Tour);
payload!(CheckpointPayload, checkpoint: CheckpointObject);
payload!(AnswerPayload, answer: AnswerObject);
payload!(MuseumObjectPayload, museum_object: MuseumObject);
payload!(FeedbackPayload, feedback: AppFeedback);
payload!(TourFeedbackPayload, feedback: TourFeedback);
payload!(BadgeProgressPayload, progress: BadgeProgress);
payload!(ProfilePicturePayload, profile_picture: ProfilePicture);

/// Turn a service result into a mutation payload
pub fn respond<P: Payload>(result: ServiceResult<P::Value>) -> async_graphql::Result<P> {
    match result {
        Ok(value) => Ok(P::success(value)),
        Err(ServiceError::Internal(e)) => {
            error!(error = %e, "mutation failed");
            Err(async_graphql::Error::new("Internal server error"))
        }
        Err(e) => {
            debug!(code = e.code(), error = %e, "mutation refused");
            Ok(P::refused())
        }
    }
}

/// Turn a service result into a nullable query value
pub fn resolve<T>(result: ServiceResult<T>) -> async_graphql::Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(ServiceError::Internal(e)) => {
            error!(error = %e, "query failed");
            Err(async_graphql::Error::new("Internal server error"))
        }
        Err(e) => {
            debug!(code = e.code(), error = %e, "query refused");
            Ok(None)
        }
    }
}

/// Like [`resolve`], with refusals as an empty list
pub fn resolve_list<T>(result: ServiceResult<Vec<T>>) -> async_graphql::Result<Vec<T>> {
    resolve(result).map(Option::unwrap_or_default)
}

pub fn services<'a>(ctx: &Context<'a>) -> async_graphql::Result<&'a Services> {
    ctx.data::<Services>()
}

/// Username of an authenticated app user
pub fn user<'a>(ctx: &Context<'a>) -> Option<&'a str> {
    ctx.data_opt::<Claims>()
        .filter(|claims| !claims.admin)
        .map(|claims| claims.sub.as_str())
}

/// Username of an authenticated admin
pub fn admin<'a>(ctx: &Context<'a>) -> Option<&'a str> {
    ctx.data_opt::<Claims>()
        .filter(|claims| claims.admin)
        .map(|claims| claims.sub.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_respond_maps_errors() {
        let ok: TourFeedbackPayload = respond(Err(ServiceError::forbidden("no"))).unwrap();
        assert_eq!(ok.ok, Some(false));
        assert!(ok.feedback.is_none());

        let limited: TokenPayload = respond(Err(ServiceError::RateLimited)).unwrap();
        assert_eq!(limited.ok, Some(false));

        let internal: async_graphql::Result<OkPayload> =
            respond(Err(ServiceError::Internal(anyhow::anyhow!("db down"))));
        assert!(internal.is_err());

        let done: AccessTokenPayload = respond(Ok("jwt".to_string())).unwrap();
        assert_eq!(done.ok, Some(true));
        assert_eq!(done.access_token.as_deref(), Some("jwt"));

        assert_eq!(OkPayload::default().ok, None);
    }

    #[test]
    fn test_resolve_list_refusal_is_empty() {
        let list: Vec<i64> = resolve_list(Err(ServiceError::not_found("tour 1"))).unwrap();
        assert!(list.is_empty());
        assert_eq!(resolve(Ok(3)).unwrap(), Some(3));
    }
}
