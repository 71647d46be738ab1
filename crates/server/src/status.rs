//! Read-only snapshot of upcoming slots for the status page.

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::{Local, NaiveDateTime, Utc};
use serde::Serialize;

use shiftbot_core::domain::slot::FillState;
use shiftbot_db::repositories::{SlotRepository, SqlSlotRepository};
use shiftbot_db::DbPool;

#[derive(Clone)]
pub struct StatusState {
    db_pool: DbPool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SlotSnapshot {
    pub slot_at: String,
    pub duration_minutes: u32,
    pub capacity: u32,
    pub current_count: u32,
    pub state: &'static str,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct StatusResponse {
    pub slots: Vec<SlotSnapshot>,
    pub generated_at: String,
}

pub fn router(db_pool: DbPool) -> Router {
    Router::new().route("/status", get(status)).with_state(StatusState { db_pool })
}

pub async fn status(State(state): State<StatusState>) -> (StatusCode, Json<StatusResponse>) {
    match snapshot(&state.db_pool, Local::now().naive_local()).await {
        Ok(payload) => (StatusCode::OK, Json(payload)),
        Err(error) => {
            tracing::error!(event_name = "system.status.error", error = %error, "status snapshot failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(StatusResponse { slots: Vec::new(), generated_at: Utc::now().to_rfc3339() }),
            )
        }
    }
}

async fn snapshot(
    pool: &DbPool,
    from: NaiveDateTime,
) -> Result<StatusResponse, shiftbot_db::repositories::RepositoryError> {
    let upcoming = SqlSlotRepository::new(pool.clone()).list_upcoming(from).await?;

    let slots = upcoming
        .iter()
        .map(|slot| SlotSnapshot {
            slot_at: slot.slot_at.format("%Y-%m-%d %H:%M").to_string(),
            duration_minutes: slot.duration_minutes,
            capacity: slot.capacity,
            current_count: slot.current_count,
            state: match slot.fill_state() {
                FillState::Open => "open",
                FillState::Full => "full",
            },
        })
        .collect();

    Ok(StatusResponse { slots, generated_at: Utc::now().to_rfc3339() })
}
