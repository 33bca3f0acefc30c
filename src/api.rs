use std::convert::Infallible;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{
        IntoResponse, Response,
        sse::{Event, KeepAlive, Sse},
    },
};
use futures::Stream;
use serde::Serialize;
use utoipa::{OpenApi, ToSchema};

use crate::{
    error::Error,
    events::ProgressEvent,
    progress::record::{self, ItemType, ProgressRecord, ProgressUpdate},
    server::AppState,
};

#[derive(OpenApi)]
#[openapi(
    paths(
        update_lesson_progress,
        update_assessment_progress,
        list_user_progress,
        get_progress,
    ),
    components(schemas(ProgressRecord, ProgressUpdate, ProgressUpdateResponse, ProgressEvent))
)]
pub struct ApiDoc;

/// Wrapper so handlers can use `?` on anything anyhow accepts. Typed domain
/// errors keep their HTTP status; everything else is a 500.
pub struct ApiError(anyhow::Error);

impl<E: Into<anyhow::Error>> From<E> for ApiError {
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.0.downcast_ref::<Error>() {
            Some(Error::NotFound { .. }) => StatusCode::NOT_FOUND,
            Some(Error::UnknownItemType(_)) | Some(Error::UnknownStatus(_)) => {
                StatusCode::BAD_REQUEST
            }
            None => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, self.0.to_string()).into_response()
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProgressUpdateResponse {
    /// False when the monotonicity gate dropped the update as regressing or
    /// redundant; the stored state is unchanged in that case.
    pub applied: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record: Option<ProgressRecord>,
}

impl From<Option<ProgressRecord>> for ProgressUpdateResponse {
    fn from(record: Option<ProgressRecord>) -> Self {
        Self {
            applied: record.is_some(),
            record,
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/users/{user_id}/lessons/{lesson_id}/progress",
    request_body = ProgressUpdate,
    responses((status = 200, body = ProgressUpdateResponse))
)]
pub async fn update_lesson_progress(
    State(state): State<AppState>,
    Path((user_id, lesson_id)): Path<(String, i64)>,
    Json(update): Json<ProgressUpdate>,
) -> Result<Json<ProgressUpdateResponse>, ApiError> {
    let record = state
        .service
        .update_lesson_progress(lesson_id, &user_id, update)
        .await?;
    Ok(Json(record.into()))
}

#[utoipa::path(
    post,
    path = "/api/users/{user_id}/assessments/{assessment_id}/progress",
    request_body = ProgressUpdate,
    responses((status = 200, body = ProgressUpdateResponse))
)]
pub async fn update_assessment_progress(
    State(state): State<AppState>,
    Path((user_id, assessment_id)): Path<(String, i64)>,
    Json(update): Json<ProgressUpdate>,
) -> Result<Json<ProgressUpdateResponse>, ApiError> {
    let record = state
        .service
        .update_assessment_progress(assessment_id, &user_id, update)
        .await?;
    Ok(Json(record.into()))
}

#[utoipa::path(
    get,
    path = "/api/users/{user_id}/progress",
    responses((status = 200, body = [ProgressRecord]))
)]
pub async fn list_user_progress(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<ProgressRecord>>, ApiError> {
    let records = record::list_user_progress(&state.database, &user_id).await?;
    Ok(Json(records))
}

#[utoipa::path(
    get,
    path = "/api/users/{user_id}/progress/{item_type}/{item_id}",
    responses(
        (status = 200, body = ProgressRecord),
        (status = 404, description = "no progress recorded for this item")
    )
)]
pub async fn get_progress(
    State(state): State<AppState>,
    Path((user_id, item_type, item_id)): Path<(String, String, i64)>,
) -> Result<Json<ProgressRecord>, ApiError> {
    let item_type: ItemType = item_type.parse()?;
    let record = record::get_progress(&state.database, &user_id, item_type, item_id)
        .await?
        .ok_or(Error::NotFound {
            kind: "progress",
            id: item_id,
        })?;
    Ok(Json(record))
}

/// SSE stream of progress events for realtime dashboards.
pub async fn progress_events(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    use tokio::sync::broadcast::error::RecvError;

    let mut receiver = state.notifier.subscribe();
    let stream = async_stream::stream! {
        loop {
            match receiver.recv().await {
                Ok(event) => yield Ok(Event::default().json_data(&event).unwrap_or_default()),
                // a lagged subscriber picks back up at the tail of the stream
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => break,
            }
        }
    };
    Sse::new(stream).keep_alive(KeepAlive::default())
}

pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
