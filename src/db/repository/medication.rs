use rusqlite::{params, Connection, OptionalExtension};

use crate::db::DatabaseError;
use crate::models::medication::{parse_start_timestamp, MedicationInput, DATETIME_FORMAT};
use crate::models::Medication;

/// Insert a new medication and return the assigned id.
///
/// Advice text is resolved by the caller before insertion so the write
/// is all-or-nothing regardless of the advice collaborator's outcome.
pub fn insert_medication(
    conn: &Connection,
    input: &MedicationInput,
    advice: &str,
) -> Result<i64, DatabaseError> {
    conn.execute(
        "INSERT INTO medicamentos (nome, dosagem, dias, dataInicio, conselho_ia,
         intervaloHoras, horarioInicio, horarioFim, alertaSonoro)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            input.name,
            input.dosage,
            input.total_days,
            input.start.format(DATETIME_FORMAT).to_string(),
            advice,
            input.interval_hours,
            input.window_start,
            input.window_end,
            input.alarm_enabled as i64,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// All medications in insertion order.
pub fn list_medications(conn: &Connection) -> Result<Vec<Medication>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, nome, dosagem, dias, dataInicio, conselho_ia,
         intervaloHoras, horarioInicio, horarioFim, alertaSonoro
         FROM medicamentos ORDER BY id",
    )?;

    let rows = stmt.query_map([], medication_row_from_rusqlite)?;

    let mut meds = Vec::new();
    for row in rows {
        meds.push(medication_from_row(row?)?);
    }
    Ok(meds)
}

pub fn fetch_medication(conn: &Connection, id: i64) -> Result<Option<Medication>, DatabaseError> {
    let row = conn
        .query_row(
            "SELECT id, nome, dosagem, dias, dataInicio, conselho_ia,
             intervaloHoras, horarioInicio, horarioFim, alertaSonoro
             FROM medicamentos WHERE id = ?1",
            params![id],
            medication_row_from_rusqlite,
        )
        .optional()?;

    match row {
        Some(row) => Ok(Some(medication_from_row(row)?)),
        None => Ok(None),
    }
}

pub fn medication_exists(conn: &Connection, id: i64) -> Result<bool, DatabaseError> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM medicamentos WHERE id = ?1",
        params![id],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

/// Delete a medication and all of its dose records in one transaction.
/// Deleting an unknown id is a tolerated no-op.
pub fn delete_medication(conn: &mut Connection, id: i64) -> Result<(), DatabaseError> {
    let tx = conn.transaction()?;
    tx.execute("DELETE FROM registros WHERE id_med = ?1", params![id])?;
    tx.execute("DELETE FROM medicamentos WHERE id = ?1", params![id])?;
    tx.commit()?;
    Ok(())
}

// Internal row type for Medication mapping
struct MedicationRow {
    id: i64,
    name: String,
    dosage: String,
    total_days: i64,
    start: String,
    advice: Option<String>,
    interval_hours: i64,
    window_start: Option<String>,
    window_end: Option<String>,
    alarm_enabled: i64,
}

fn medication_row_from_rusqlite(row: &rusqlite::Row<'_>) -> Result<MedicationRow, rusqlite::Error> {
    Ok(MedicationRow {
        id: row.get(0)?,
        name: row.get(1)?,
        dosage: row.get(2)?,
        total_days: row.get(3)?,
        start: row.get(4)?,
        advice: row.get(5)?,
        interval_hours: row.get(6)?,
        window_start: row.get(7)?,
        window_end: row.get(8)?,
        alarm_enabled: row.get(9)?,
    })
}

fn medication_from_row(row: MedicationRow) -> Result<Medication, DatabaseError> {
    let start = parse_start_timestamp(&row.start).ok_or_else(|| {
        DatabaseError::Corrupt(format!("dataInicio for medication {}: {}", row.id, row.start))
    })?;
    Ok(Medication {
        id: row.id,
        name: row.name,
        dosage: row.dosage,
        total_days: row.total_days,
        start,
        advice: row.advice.unwrap_or_default(),
        interval_hours: row.interval_hours,
        window_start: row.window_start,
        window_end: row.window_end,
        alarm_enabled: row.alarm_enabled != 0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::sqlite::open_memory_database;

    fn input(name: &str) -> MedicationInput {
        MedicationInput {
            name: name.to_string(),
            dosage: "50mg".to_string(),
            total_days: 10,
            start: parse_start_timestamp("2026-03-01T08:00:00").unwrap(),
            interval_hours: 12,
            window_start: Some("08:00".to_string()),
            window_end: Some("09:00".to_string()),
            alarm_enabled: true,
        }
    }

    #[test]
    fn insert_assigns_sequential_ids() {
        let conn = open_memory_database().unwrap();
        let a = insert_medication(&conn, &input("Losartana"), "advice a").unwrap();
        let b = insert_medication(&conn, &input("Metformina"), "advice b").unwrap();
        assert!(b > a);
    }

    #[test]
    fn list_returns_insertion_order() {
        let conn = open_memory_database().unwrap();
        insert_medication(&conn, &input("Losartana"), "a").unwrap();
        insert_medication(&conn, &input("Metformina"), "b").unwrap();
        let meds = list_medications(&conn).unwrap();
        assert_eq!(meds.len(), 2);
        assert_eq!(meds[0].name, "Losartana");
        assert_eq!(meds[1].name, "Metformina");
    }

    #[test]
    fn fetch_round_trips_all_fields() {
        let conn = open_memory_database().unwrap();
        let id = insert_medication(&conn, &input("Losartana"), "Tome pela manhã.").unwrap();
        let med = fetch_medication(&conn, id).unwrap().unwrap();
        assert_eq!(med.name, "Losartana");
        assert_eq!(med.dosage, "50mg");
        assert_eq!(med.total_days, 10);
        assert_eq!(med.start.format(DATETIME_FORMAT).to_string(), "2026-03-01T08:00:00");
        assert_eq!(med.advice, "Tome pela manhã.");
        assert_eq!(med.interval_hours, 12);
        assert_eq!(med.window_start.as_deref(), Some("08:00"));
        assert!(med.alarm_enabled);
    }

    #[test]
    fn fetch_unknown_returns_none() {
        let conn = open_memory_database().unwrap();
        assert!(fetch_medication(&conn, 99).unwrap().is_none());
    }

    #[test]
    fn delete_cascades_to_dose_records() {
        let mut conn = open_memory_database().unwrap();
        let id = insert_medication(&conn, &input("Losartana"), "a").unwrap();
        conn.execute(
            "INSERT INTO registros (id_med, data, horario, status, dataHoraTomada)
             VALUES (?1, '2026-03-01', '08:00', 'tomado', '2026-03-01T08:05:00')",
            params![id],
        )
        .unwrap();

        delete_medication(&mut conn, id).unwrap();

        assert!(fetch_medication(&conn, id).unwrap().is_none());
        let orphans: i64 = conn
            .query_row("SELECT COUNT(*) FROM registros WHERE id_med = ?1", params![id], |r| {
                r.get(0)
            })
            .unwrap();
        assert_eq!(orphans, 0);
    }

    #[test]
    fn delete_unknown_is_noop() {
        let mut conn = open_memory_database().unwrap();
        assert!(delete_medication(&mut conn, 123).is_ok());
    }
}
