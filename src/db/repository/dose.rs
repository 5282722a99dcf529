use std::collections::HashMap;
use std::str::FromStr;

use chrono::{Local, NaiveDate, NaiveDateTime, NaiveTime};
use rusqlite::{params, Connection};

use crate::db::repository::medication_exists;
use crate::db::DatabaseError;
use crate::models::medication::{DATETIME_FORMAT, DATE_FORMAT, TIME_FORMAT};
use crate::models::DoseStatus;

/// Record a dose acknowledgement for one (medication, day, slot) key.
///
/// Explicit keyed write: update the existing row, insert when absent.
/// A second write to the same key leaves exactly one row carrying the
/// latest status and acknowledgement instant. Returns the instant
/// written.
pub fn record_dose(
    conn: &mut Connection,
    med_id: i64,
    date: NaiveDate,
    slot: NaiveTime,
    status: DoseStatus,
) -> Result<NaiveDateTime, DatabaseError> {
    let acknowledged_at = Local::now().naive_local();
    let date_text = date.format(DATE_FORMAT).to_string();
    let slot_text = slot.format(TIME_FORMAT).to_string();
    let ack_text = acknowledged_at.format(DATETIME_FORMAT).to_string();

    let tx = conn.transaction()?;
    // Checked inside the transaction so a concurrent cascade delete
    // cannot slip between the check and the write.
    if !medication_exists(&tx, med_id)? {
        return Err(DatabaseError::NotFound {
            entity_type: "medicamento".to_string(),
            id: med_id.to_string(),
        });
    }
    let updated = tx.execute(
        "UPDATE registros SET status = ?1, dataHoraTomada = ?2
         WHERE id_med = ?3 AND data = ?4 AND horario = ?5",
        params![status.as_str(), ack_text, med_id, date_text, slot_text],
    )?;
    if updated == 0 {
        tx.execute(
            "INSERT INTO registros (id_med, data, horario, status, dataHoraTomada)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![med_id, date_text, slot_text, status.as_str(), ack_text],
        )?;
    }
    tx.commit()?;

    Ok(acknowledged_at)
}

/// Date-granularity status for the alert evaluator: `Taken` if any slot
/// that day was taken, otherwise the most recently acknowledged status,
/// `Pending` when no rows exist.
pub fn status_for_date(
    conn: &Connection,
    med_id: i64,
    date: NaiveDate,
) -> Result<DoseStatus, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT status FROM registros
         WHERE id_med = ?1 AND data = ?2
         ORDER BY dataHoraTomada",
    )?;
    let rows = stmt.query_map(params![med_id, date.format(DATE_FORMAT).to_string()], |row| {
        row.get::<_, String>(0)
    })?;

    let mut result = DoseStatus::Pending;
    for raw in rows {
        let status = DoseStatus::from_str(&raw?)?;
        if result != DoseStatus::Taken {
            result = status;
        }
    }
    Ok(result)
}

/// Bulk form of `status_for_date`: one query feeding the evaluator the
/// day's state for every medication at once. Medications without rows
/// are absent from the map (pending).
pub fn dose_statuses_for_date(
    conn: &Connection,
    date: NaiveDate,
) -> Result<HashMap<i64, DoseStatus>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id_med, status FROM registros
         WHERE data = ?1
         ORDER BY dataHoraTomada",
    )?;
    let rows = stmt.query_map(params![date.format(DATE_FORMAT).to_string()], |row| {
        Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
    })?;

    let mut map: HashMap<i64, DoseStatus> = HashMap::new();
    for row in rows {
        let (med_id, raw) = row?;
        let status = DoseStatus::from_str(&raw)?;
        let entry = map.entry(med_id).or_insert(status);
        if *entry != DoseStatus::Taken {
            *entry = status;
        }
    }
    Ok(map)
}
