//! Dose timetable derivation.
//!
//! The schedule is never persisted: it is recomputed from the
//! medication definition on every request. For each regimen day the
//! generator emits `floor(24 / interval_hours)` doses spaced
//! `interval_hours` apart, day-major then slot-minor, so index 0 is
//! always the earliest dose. Intervals that do not divide 24 evenly
//! drop the trailing partial-day slots.

use chrono::{Duration, NaiveDateTime};
use serde::Serialize;
use thiserror::Error;

use crate::models::medication::{serialize_date, serialize_datetime, serialize_time};
use crate::models::Medication;

/// Upper bound on entries returned to clients asking for upcoming doses.
pub const UPCOMING_DOSE_LIMIT: usize = 20;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("Dosing interval must be at least one hour, got {0}")]
    InvalidInterval(i64),
}

/// A single computed dose occurrence. Ephemeral, never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScheduledDose {
    #[serde(rename = "data", serialize_with = "serialize_date")]
    pub date: chrono::NaiveDate,
    #[serde(rename = "horario", serialize_with = "serialize_time")]
    pub time: chrono::NaiveTime,
    #[serde(serialize_with = "serialize_datetime")]
    pub timestamp: NaiveDateTime,
}

impl ScheduledDose {
    fn at(timestamp: NaiveDateTime) -> Self {
        Self {
            date: timestamp.date(),
            time: timestamp.time(),
            timestamp,
        }
    }
}

/// Lazily generate the full dose timetable for a medication, in
/// strictly chronological order. Length is
/// `total_days * floor(24 / interval_hours)`; zero days yields an
/// empty schedule.
pub fn dose_schedule(
    med: &Medication,
) -> Result<impl Iterator<Item = ScheduledDose>, ScheduleError> {
    if med.interval_hours < 1 {
        return Err(ScheduleError::InvalidInterval(med.interval_hours));
    }

    let doses_per_day = 24 / med.interval_hours;
    let start = med.start;
    let interval = med.interval_hours;

    // Intervals above 24h floor to zero slots per day; skip the day
    // loop entirely instead of walking every empty day.
    let day_count = if doses_per_day == 0 { 0 } else { med.total_days.max(0) };

    Ok((0..day_count).flat_map(move |day| {
        (0..doses_per_day).map(move |slot| {
            ScheduledDose::at(start + Duration::days(day) + Duration::hours(interval * slot))
        })
    }))
}

/// Doses at or after `now`, capped at `limit` entries. Presentation
/// helper for the upcoming-doses endpoint.
pub fn upcoming_doses(
    med: &Medication,
    now: NaiveDateTime,
    limit: usize,
) -> Result<Vec<ScheduledDose>, ScheduleError> {
    Ok(dose_schedule(med)?
        .filter(|dose| dose.timestamp >= now)
        .take(limit)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::medication::parse_start_timestamp;

    fn medication(total_days: i64, interval_hours: i64) -> Medication {
        Medication {
            id: 1,
            name: "Losartana".to_string(),
            dosage: "50mg".to_string(),
            total_days,
            start: parse_start_timestamp("2026-03-01T08:00:00").unwrap(),
            advice: String::new(),
            interval_hours,
            window_start: None,
            window_end: None,
            alarm_enabled: true,
        }
    }

    #[test]
    fn length_is_days_times_doses_per_day() {
        let med = medication(30, 8);
        let doses: Vec<_> = dose_schedule(&med).unwrap().collect();
        assert_eq!(doses.len(), 30 * 3);
    }

    #[test]
    fn twelve_hour_interval_over_two_days() {
        let med = medication(2, 12);
        let doses: Vec<_> = dose_schedule(&med).unwrap().collect();
        assert_eq!(doses.len(), 4);
        let offsets: Vec<i64> = doses
            .iter()
            .map(|d| (d.timestamp - med.start).num_hours())
            .collect();
        assert_eq!(offsets, vec![0, 12, 24, 36]);
    }

    #[test]
    fn first_entry_is_the_start_timestamp() {
        let med = medication(5, 6);
        let first = dose_schedule(&med).unwrap().next().unwrap();
        assert_eq!(first.timestamp, med.start);
    }

    #[test]
    fn strictly_increasing_order() {
        let med = medication(7, 6);
        let doses: Vec<_> = dose_schedule(&med).unwrap().collect();
        for pair in doses.windows(2) {
            assert!(pair[0].timestamp < pair[1].timestamp);
        }
    }

    #[test]
    fn uneven_interval_drops_partial_day_slots() {
        // floor(24 / 7) = 3 doses per day: 08:00, 15:00, 22:00
        let med = medication(1, 7);
        let doses: Vec<_> = dose_schedule(&med).unwrap().collect();
        assert_eq!(doses.len(), 3);
        assert_eq!(doses[2].time.format("%H:%M").to_string(), "22:00");
    }

    #[test]
    fn zero_days_yields_empty_schedule() {
        let med = medication(0, 12);
        assert_eq!(dose_schedule(&med).unwrap().count(), 0);
    }

    #[test]
    fn zero_interval_is_an_error_not_an_unbounded_sequence() {
        let med = medication(2, 0);
        assert_eq!(dose_schedule(&med).err().unwrap(), ScheduleError::InvalidInterval(0));
    }

    #[test]
    fn interval_above_a_day_is_empty_without_iterating_days() {
        // Zero slots per day must not walk the full day range
        let med = medication(i64::MAX, 25);
        assert_eq!(dose_schedule(&med).unwrap().count(), 0);
        let now = parse_start_timestamp("2026-03-05T09:00:00").unwrap();
        assert!(upcoming_doses(&med, now, UPCOMING_DOSE_LIMIT).unwrap().is_empty());
    }

    #[test]
    fn upcoming_filters_past_doses_and_caps() {
        let med = medication(365, 12);
        let now = parse_start_timestamp("2026-03-05T09:00:00").unwrap();
        let doses = upcoming_doses(&med, now, UPCOMING_DOSE_LIMIT).unwrap();
        assert_eq!(doses.len(), UPCOMING_DOSE_LIMIT);
        assert!(doses.iter().all(|d| d.timestamp >= now));
        // 2026-03-05 08:00 is past; next slot is 20:00 that day
        assert_eq!(doses[0].timestamp, parse_start_timestamp("2026-03-05T20:00:00").unwrap());
    }

    #[test]
    fn upcoming_includes_a_dose_exactly_at_now() {
        let med = medication(2, 12);
        let now = med.start;
        let doses = upcoming_doses(&med, now, UPCOMING_DOSE_LIMIT).unwrap();
        assert_eq!(doses[0].timestamp, med.start);
    }

    #[test]
    fn scheduled_dose_serializes_wire_names() {
        let med = medication(1, 24);
        let dose = dose_schedule(&med).unwrap().next().unwrap();
        let json = serde_json::to_value(&dose).unwrap();
        assert_eq!(json["data"], "2026-03-01");
        assert_eq!(json["horario"], "08:00");
        assert_eq!(json["timestamp"], "2026-03-01T08:00:00");
    }
}
