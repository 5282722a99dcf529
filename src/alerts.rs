//! Alert window evaluation.
//!
//! Pull-based: clients poll and the evaluator decides, from the current
//! minute and the day's acknowledgement state, which medications should
//! sound right now. Pulses fire at fixed 15-minute offsets from the
//! window start (minute 0, 15, 30, 45, 60 — five per day) regardless of
//! how wide the configured window is. A dose marked taken silences the
//! medication for the rest of that calendar day, even when it has
//! multiple daily slots; that per-day granularity is deliberate.

use std::collections::HashMap;

use chrono::{NaiveDateTime, NaiveTime, Timelike};
use serde::Serialize;

use crate::models::medication::parse_time_of_day;
use crate::models::{DoseStatus, Medication};

/// Minutes between reminder pulses within a window.
pub const PULSE_SPACING_MINUTES: i64 = 15;
/// Pulses per day. Fixed protocol constant, never derived from the
/// window's actual width.
pub const TOTAL_PULSES: i64 = 5;

/// An ephemeral "fire now" signal for one medication.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Alert {
    #[serde(rename = "id_med")]
    pub medication_id: i64,
    #[serde(rename = "nome")]
    pub name: String,
    #[serde(rename = "dosagem")]
    pub dosage: String,
    #[serde(rename = "horarioInicio")]
    pub window_start: String,
    #[serde(rename = "horarioFim")]
    pub window_end: String,
    #[serde(rename = "toque")]
    pub pulse: i64,
    #[serde(rename = "totalToques")]
    pub total_pulses: i64,
}

/// Evaluate which medications should sound at `now`.
///
/// Pure function of its inputs: repeated calls within the same minute
/// return the same set. `today` is the date-granularity acknowledgement
/// map for `now`'s calendar day; medications absent from it are pending.
pub fn active_alerts(
    now: NaiveDateTime,
    medications: &[Medication],
    today: &HashMap<i64, DoseStatus>,
) -> Vec<Alert> {
    medications
        .iter()
        .filter_map(|med| evaluate(now, med, today.get(&med.id).copied()))
        .collect()
}

fn evaluate(now: NaiveDateTime, med: &Medication, status: Option<DoseStatus>) -> Option<Alert> {
    if !med.alarm_enabled {
        return None;
    }
    // Malformed stored bounds make the medication ineligible, not an error.
    let window_start = parse_time_of_day(med.window_start.as_deref()?)?;
    let window_end = parse_time_of_day(med.window_end.as_deref()?)?;

    // Any taken slot silences the whole day; skipped does not.
    if status == Some(DoseStatus::Taken) {
        return None;
    }

    let minute = minutes_of_day(now.time());
    if minute < minutes_of_day(window_start) || minute > minutes_of_day(window_end) {
        return None;
    }

    let elapsed = minute - minutes_of_day(window_start);
    if elapsed % PULSE_SPACING_MINUTES != 0
        || elapsed > PULSE_SPACING_MINUTES * (TOTAL_PULSES - 1)
    {
        return None;
    }

    Some(Alert {
        medication_id: med.id,
        name: med.name.clone(),
        dosage: med.dosage.clone(),
        window_start: med.window_start.clone().unwrap_or_default(),
        window_end: med.window_end.clone().unwrap_or_default(),
        pulse: elapsed / PULSE_SPACING_MINUTES + 1,
        total_pulses: TOTAL_PULSES,
    })
}

fn minutes_of_day(t: NaiveTime) -> i64 {
    i64::from(t.hour()) * 60 + i64::from(t.minute())
}
