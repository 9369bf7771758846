/**
 * Message HTTP Handlers
 *
 * - `GET    /api/messages?surface=&cursor=&limit=` - one page of history
 * - `POST   /api/messages`                         - create
 * - `PATCH  /api/messages/{id}`                    - edit content
 * - `DELETE /api/messages/{id}?surface=`           - soft delete
 *
 * All of them authenticate through `MaybeIdentity` and return
 * `BackendError` as a JSON error body.
 */

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use std::sync::Arc;

use super::gateway::{CreateMessage, MutationGateway, UpdateMessage};
use super::history::HistoryService;
use crate::backend::error::BackendError;
use crate::backend::middleware::auth::MaybeIdentity;
use crate::shared::{Message, MessageId, Page, PageRequest, SurfaceId};

#[derive(Debug, Deserialize)]
pub struct SurfaceQuery {
    pub surface: SurfaceId,
}

/// GET /api/messages
pub async fn get_messages(
    State(history): State<Arc<HistoryService>>,
    MaybeIdentity(identity): MaybeIdentity,
    Query(request): Query<PageRequest>,
) -> Result<Json<Page>, BackendError> {
    let page = history.fetch_page(identity, request).await?;
    Ok(Json(page))
}

/// POST /api/messages
pub async fn create_message(
    State(gateway): State<Arc<MutationGateway>>,
    MaybeIdentity(identity): MaybeIdentity,
    Json(request): Json<CreateMessage>,
) -> Result<(StatusCode, Json<Message>), BackendError> {
    let message = gateway.create(identity, request).await?;
    Ok((StatusCode::CREATED, Json(message)))
}

/// PATCH /api/messages/{id}
pub async fn update_message(
    State(gateway): State<Arc<MutationGateway>>,
    MaybeIdentity(identity): MaybeIdentity,
    Path(id): Path<MessageId>,
    Json(request): Json<UpdateMessage>,
) -> Result<Json<Message>, BackendError> {
    let message = gateway.update(identity, id, request).await?;
    Ok(Json(message))
}

/// DELETE /api/messages/{id}
pub async fn delete_message(
    State(gateway): State<Arc<MutationGateway>>,
    MaybeIdentity(identity): MaybeIdentity,
    Path(id): Path<MessageId>,
    Query(query): Query<SurfaceQuery>,
) -> Result<Json<Message>, BackendError> {
    let message = gateway.delete(identity, id, query.surface).await?;
    Ok(Json(message))
}
