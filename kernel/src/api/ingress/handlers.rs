//! Handlers that turn device reports into hub broadcasts.

use axum::extract::{Json, State};
use serde_json::json;
use tracing::{debug, info};

use crate::api::error::ApiError;
use crate::api::ingress::types::{AttendanceRequest, BroadcastResponse, DeviceStatusRequest};
use crate::state::AppState;

/// POST /api/devices/status
pub async fn device_status(
    State(state): State<AppState>,
    Json(req): Json<DeviceStatusRequest>,
) -> Result<Json<BroadcastResponse>, ApiError> {
    let status = req.status.trim();
    if status.is_empty() {
        return Err(ApiError::ValidationError("status is required".to_string()));
    }

    info!(status, "Device status reported");
    let report = state.hub.notify_device_status(status).await;
    Ok(Json(BroadcastResponse {
        success: true,
        delivered: report.delivered,
    }))
}

/// POST /api/attendance
///
/// Looks the user up and broadcasts an `attendance_event`; unknown ids are
/// still broadcast without a profile.
pub async fn attendance(
    State(state): State<AppState>,
    Json(req): Json<AttendanceRequest>,
) -> Result<Json<BroadcastResponse>, ApiError> {
    let user_id = req.user_id.to_string();
    if user_id.is_empty() {
        return Err(ApiError::ValidationError("user_id is required".to_string()));
    }

    let user = state.directory.find(&user_id).await?;
    if user.is_none() {
        debug!(user_id = %user_id, "Attendance for unknown user");
    }
    let profile = user.map(|u| json!({ "id": u.id, "name": u.name }));

    let report = state.hub.notify_attendance(&user_id, profile).await;
    Ok(Json(BroadcastResponse {
        success: true,
        delivered: report.delivered,
    }))
}
