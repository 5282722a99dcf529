//! Request handlers for the medication API.
//!
//! Storage access opens a connection per request from the injected
//! `AppState`; the advice collaborator is only consulted on creation
//! and its failures never surface to the client.

use std::str::FromStr;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{Local, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::advice::advice_or_fallback;
use crate::alerts::{self, Alert};
use crate::api::error::ApiError;
use crate::config;
use crate::db::repository as repo;
use crate::models::medication::{parse_time_of_day, serialize_datetime, DATE_FORMAT};
use crate::models::{DoseStatus, Medication, NewMedication};
use crate::schedule::{self, ScheduledDose};
use crate::state::AppState;

/// `POST /api/medicamentos` — create a medication.
///
/// Advice is resolved first (best-effort, bounded timeout) so the
/// insert is a single all-or-nothing write.
pub async fn create_medication(
    State(state): State<Arc<AppState>>,
    Json(req): Json<NewMedication>,
) -> Result<(StatusCode, Json<Medication>), ApiError> {
    let input = req.validate().map_err(ApiError::BadRequest)?;

    let advice = advice_or_fallback(state.advice.clone(), &input.name, &input.dosage).await;

    let conn = state.open_db()?;
    let id = repo::insert_medication(&conn, &input, &advice)?;
    tracing::info!(id, name = %input.name, "Medication created");

    Ok((
        StatusCode::CREATED,
        Json(Medication {
            id,
            name: input.name,
            dosage: input.dosage,
            total_days: input.total_days,
            start: input.start,
            advice,
            interval_hours: input.interval_hours,
            window_start: input.window_start,
            window_end: input.window_end,
            alarm_enabled: input.alarm_enabled,
        }),
    ))
}

/// `GET /api/medicamentos` and `GET /api/historico` — the history view
/// is the same data as the list.
pub async fn list_medications(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Medication>>, ApiError> {
    let conn = state.open_db()?;
    Ok(Json(repo::list_medications(&conn)?))
}

#[derive(Serialize)]
pub struct DeleteResponse {
    pub sucesso: bool,
}

/// `DELETE /api/medicamentos/:id` — cascade-delete the medication and
/// its dose records. Unknown ids are a tolerated no-op.
pub async fn delete_medication(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let mut conn = state.open_db()?;
    repo::delete_medication(&mut conn, id)?;
    tracing::info!(id, "Medication deleted");
    Ok(Json(DeleteResponse { sucesso: true }))
}

#[derive(Deserialize)]
pub struct RecordDoseRequest {
    pub id_med: i64,
    pub data: String,
    pub horario: String,
    pub status: String,
}

#[derive(Serialize)]
pub struct RecordDoseResponse {
    pub sucesso: bool,
    pub status: &'static str,
    #[serde(rename = "dataHoraTomada", serialize_with = "serialize_datetime")]
    pub acknowledged_at: NaiveDateTime,
}

/// `POST /api/registro` — upsert a dose acknowledgement for one
/// (medication, day, slot) key.
pub async fn record_dose(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RecordDoseRequest>,
) -> Result<Json<RecordDoseResponse>, ApiError> {
    let date = NaiveDate::parse_from_str(req.data.trim(), DATE_FORMAT)
        .map_err(|_| ApiError::BadRequest(format!("campo 'data' inválido: {}", req.data)))?;
    let slot = parse_time_of_day(req.horario.trim()).ok_or_else(|| {
        ApiError::BadRequest(format!("campo 'horario' inválido: {} (esperado HH:MM)", req.horario))
    })?;
    let status = DoseStatus::from_str(req.status.trim())
        .ok()
        .filter(|s| *s != DoseStatus::Pending)
        .ok_or_else(|| {
            ApiError::BadRequest(format!(
                "campo 'status' inválido: {} (esperado tomado ou pulado)",
                req.status
            ))
        })?;

    let mut conn = state.open_db()?;
    let acknowledged_at = repo::record_dose(&mut conn, req.id_med, date, slot, status)?;
    tracing::info!(id_med = req.id_med, data = %req.data, status = status.as_str(), "Dose recorded");

    Ok(Json(RecordDoseResponse {
        sucesso: true,
        status: status.as_str(),
        acknowledged_at,
    }))
}

/// `GET /api/alertas` — evaluate the alert window against the server
/// clock and today's acknowledgement state.
pub async fn list_alerts(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Alert>>, ApiError> {
    let now = Local::now().naive_local();
    let conn = state.open_db()?;
    let medications = repo::list_medications(&conn)?;
    let today = repo::dose_statuses_for_date(&conn, now.date())?;
    Ok(Json(alerts::active_alerts(now, &medications, &today)))
}

/// `GET /api/proximos-horarios/:id` — up to 20 upcoming doses,
/// computed fresh from the medication definition.
pub async fn upcoming_schedule(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<ScheduledDose>>, ApiError> {
    let conn = state.open_db()?;
    let med = repo::fetch_medication(&conn, id)?
        .ok_or_else(|| ApiError::NotFound(format!("medicamento {id} não encontrado")))?;

    let now = Local::now().naive_local();
    let doses = schedule::upcoming_doses(&med, now, schedule::UPCOMING_DOSE_LIMIT)
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    Ok(Json(doses))
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

/// `GET /api/health` — liveness probe.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: config::APP_VERSION,
    })
}
