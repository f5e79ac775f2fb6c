//! File endpoints
//!
//! - `GET /file/download`: image bytes by kind and id
//! - `POST /file/upload`: admin upload of pictures, profile pictures and badges
//! - `GET /file/report`: plain-text answer exports

use axum::{
    extract::{DefaultBodyLimit, Multipart, Query, State},
    http::header,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::api::middleware::{ApiError, AppState, AuthenticatedAdmin, AuthenticatedUser};
use crate::models::{CreateBadgeInput, MediaKind};

/// Multipart framing on top of the file itself
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Build the file router
pub fn router(state: &AppState) -> Router<AppState> {
    let body_limit = usize::try_from(state.upload_config.max_file_size)
        .unwrap_or(usize::MAX)
        .saturating_add(MULTIPART_OVERHEAD);

    Router::new()
        .route("/download", get(download))
        .route("/upload", post(upload).layer(DefaultBodyLimit::max(body_limit)))
        .route("/report", get(report))
}

fn media_kind(value: &str) -> Result<MediaKind, ApiError> {
    MediaKind::from_str(value).map_err(|_| {
        ApiError::with_details(
            "VALIDATION_ERROR",
            format!("Unknown file type: {}", value),
            serde_json::json!({ "allowed": ["Picture", "ProfilePicture", "Badge"] }),
        )
    })
}

// ============================================================================
// Download
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct DownloadQuery {
    #[serde(rename = "type")]
    pub kind: String,
    pub id: String,
}

/// GET /file/download?type=Picture|ProfilePicture|Badge&id=
async fn download(
    State(state): State<AppState>,
    Query(query): Query<DownloadQuery>,
) -> Result<Response, ApiError> {
    let kind = media_kind(&query.kind)?;
    let file = state.services.media.download(kind, &query.id).await?;
    Ok(([(header::CONTENT_TYPE, file.content_type)], file.data).into_response())
}

// ============================================================================
// Upload
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct UploadQuery {
    #[serde(rename = "type")]
    pub kind: String,
    pub description: Option<String>,
    pub locked: Option<bool>,
    pub id: Option<String>,
    pub name: Option<String>,
    pub cost: Option<i64>,
}

/// Response for a successful upload
#[derive(Debug, Serialize, Deserialize)]
pub struct UploadResponse {
    pub id: String,
}

/// POST /file/upload?type=...
///
/// Requires an admin token. Accepts multipart/form-data with the image in a
/// field named "file".
async fn upload(
    State(state): State<AppState>,
    _admin: AuthenticatedAdmin,
    Query(query): Query<UploadQuery>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let kind = media_kind(&query.kind)?;
    let (data, content_type) = read_file(&mut multipart).await?;
    let media = &state.services.media;

    let id = match kind {
        MediaKind::Picture => media
            .upload_picture(query.description.as_deref(), &data, &content_type)
            .await?
            .id
            .to_string(),
        MediaKind::ProfilePicture => media
            .upload_profile_picture(query.locked.unwrap_or(false), &data, &content_type)
            .await?
            .id
            .to_string(),
        MediaKind::Badge => {
            let (Some(id), Some(name), Some(cost)) = (query.id, query.name, query.cost) else {
                return Err(ApiError::validation_error("Badges need id, name and cost"));
            };
            let input = CreateBadgeInput {
                id,
                name,
                description: query.description,
                cost,
            };
            media.upload_badge(input, &data, &content_type).await?.id
        }
    };

    Ok(Json(UploadResponse { id }))
}

/// Bytes and content type of the "file" field
async fn read_file(multipart: &mut Multipart) -> Result<(Vec<u8>, String), ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::validation_error(format!("Failed to read multipart: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let content_type = field
            .content_type()
            .map(|s| s.to_string())
            .unwrap_or_else(|| "application/octet-stream".to_string());

        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::validation_error(format!("Failed to read file: {}", e)))?;

        return Ok((data.to_vec(), content_type));
    }

    Err(ApiError::validation_error("No file provided"))
}

// ============================================================================
// Reports
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ReportQuery {
    #[serde(rename = "type")]
    pub kind: String,
    /// Question id for `type=question`
    pub id: Option<i64>,
    pub tour: Option<i64>,
    pub username: Option<String>,
}

/// GET /file/report?type=question|user|me
async fn report(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<ReportQuery>,
) -> Result<Response, ApiError> {
    let reports = &state.services.reports;
    let caller = claims.sub.as_str();

    let text = match (query.kind.as_str(), query.id, query.tour, query.username) {
        ("question", Some(id), _, _) => reports.question_report(caller, id).await?,
        ("user", _, Some(tour), Some(username)) => {
            reports.user_report(caller, tour, &username).await?
        }
        ("me", _, Some(tour), _) => reports.my_report(caller, tour).await?,
        ("question" | "user" | "me", ..) => {
            return Err(ApiError::validation_error("Missing report parameters"))
        }
        (other, ..) => {
            return Err(ApiError::validation_error(format!("Unknown report type: {}", other)))
        }
    };

    Ok((
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8"),
            (header::CONTENT_DISPOSITION, "attachment; filename=\"report.txt\""),
        ],
        text,
    )
        .into_response())
}
