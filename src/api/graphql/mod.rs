//! GraphQL endpoints
//!
//! Two schemas share the service layer: `/app` for the mobile client and
//! `/web` for the administration client. `GET` on either path serves
//! GraphiQL. The caller's verified claims travel as request data.

pub mod app;
pub mod payload;
pub mod types;
pub mod web;

use async_graphql::{http::GraphiQLSource, EmptySubscription, Schema};
use async_graphql_axum::{GraphQLRequest, GraphQLResponse};
use axum::{extract::State, http::Uri, response::Html, response::IntoResponse};

use crate::api::middleware::{AppState, MaybeClaims};
use crate::services::Services;

pub type AppSchema = Schema<app::AppQuery, app::AppMutation, EmptySubscription>;
pub type WebSchema = Schema<web::WebQuery, web::WebMutation, EmptySubscription>;

pub fn app_schema(services: Services) -> AppSchema {
    Schema::build(app::AppQuery, app::AppMutation, EmptySubscription)
        .data(services)
        .finish()
}

pub fn web_schema(services: Services) -> WebSchema {
    Schema::build(web::WebQuery, web::WebMutation, EmptySubscription)
        .data(services)
        .finish()
}

/// POST /app
pub async fn app_handler(
    State(state): State<AppState>,
    MaybeClaims(claims): MaybeClaims,
    request: GraphQLRequest,
) -> GraphQLResponse {
    let mut request = request.into_inner();
    if let Some(claims) = claims {
        request = request.data(claims);
    }
    state.app_schema.execute(request).await.into()
}

/// POST /web
pub async fn web_handler(
    State(state): State<AppState>,
    MaybeClaims(claims): MaybeClaims,
    request: GraphQLRequest,
) -> GraphQLResponse {
    let mut request = request.into_inner();
    if let Some(claims) = claims {
        request = request.data(claims);
    }
    state.web_schema.execute(request).await.into()
}

/// GraphiQL page for the endpoint it is served from
pub async fn graphiql(uri: Uri) -> impl IntoResponse {
    Html(GraphiQLSource::build().endpoint(uri.path()).finish())
}
