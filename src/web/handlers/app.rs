//! Service status handlers.

use axum::{extract::State, Json};
use std::sync::Arc;

use crate::db::UserRepository;
use crate::file::FileEntryRepository;
use crate::web::dto::{StatsResponse, StatusResponse};
use crate::web::error::ApiError;
use crate::web::handlers::AppState;

/// GET /status - Liveness of the database and the job queue.
pub async fn get_status(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    let (db, queue) = tokio::join!(state.db.ping(), state.queue.ping());
    Json(StatusResponse { db, queue })
}

/// GET /stats - Number of users and file entries.
pub async fn get_stats(
    State(state): State<Arc<AppState>>,
) -> Result<Json<StatsResponse>, ApiError> {
    let pool = state.db.pool();
    let users = UserRepository::new(pool).count().await?;
    let files = FileEntryRepository::new(pool).count().await?;

    Ok(Json(StatsResponse { users, files }))
}
