use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize, Serializer};

/// Storage and wire format for date-times (seconds resolution, no zone).
pub const DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";
/// Storage and wire format for calendar dates.
pub const DATE_FORMAT: &str = "%Y-%m-%d";
/// Storage and wire format for time-of-day slots and window bounds.
pub const TIME_FORMAT: &str = "%H:%M";

pub fn serialize_datetime<S: Serializer>(dt: &NaiveDateTime, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&dt.format(DATETIME_FORMAT).to_string())
}

pub fn serialize_date<S: Serializer>(d: &NaiveDate, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&d.format(DATE_FORMAT).to_string())
}

pub fn serialize_time<S: Serializer>(t: &NaiveTime, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&t.format(TIME_FORMAT).to_string())
}

/// Parse a start timestamp as sent by clients: full date-time with or
/// without seconds, or a bare date (midnight).
pub fn parse_start_timestamp(raw: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw, DATETIME_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M"))
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(raw, DATE_FORMAT)
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// Parse an `HH:MM` window bound or dose slot.
pub fn parse_time_of_day(raw: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(raw, TIME_FORMAT).ok()
}

/// A persisted medication definition. Immutable after creation; there
/// is no edit operation, only create and cascade-delete.
#[derive(Debug, Clone, Serialize)]
pub struct Medication {
    pub id: i64,
    #[serde(rename = "nome")]
    pub name: String,
    #[serde(rename = "dosagem")]
    pub dosage: String,
    #[serde(rename = "dias")]
    pub total_days: i64,
    #[serde(rename = "dataInicio", serialize_with = "serialize_datetime")]
    pub start: NaiveDateTime,
    #[serde(rename = "conselho_ia")]
    pub advice: String,
    #[serde(rename = "intervaloHoras")]
    pub interval_hours: i64,
    #[serde(rename = "horarioInicio")]
    pub window_start: Option<String>,
    #[serde(rename = "horarioFim")]
    pub window_end: Option<String>,
    #[serde(rename = "alertaSonoro")]
    pub alarm_enabled: bool,
}

fn default_interval_hours() -> i64 {
    24
}

fn default_alarm_enabled() -> bool {
    true
}

/// Creation request body as sent by clients. Field values are raw and
/// must pass through `validate` before touching storage.
#[derive(Debug, Deserialize)]
pub struct NewMedication {
    #[serde(rename = "nome")]
    pub name: String,
    #[serde(rename = "dosagem")]
    pub dosage: String,
    #[serde(rename = "dias", default)]
    pub total_days: i64,
    #[serde(rename = "dataInicio")]
    pub start: String,
    #[serde(rename = "intervaloHoras", default = "default_interval_hours")]
    pub interval_hours: i64,
    #[serde(rename = "horarioInicio", default)]
    pub window_start: Option<String>,
    #[serde(rename = "horarioFim", default)]
    pub window_end: Option<String>,
    #[serde(rename = "alertaSonoro", default = "default_alarm_enabled")]
    pub alarm_enabled: bool,
}

/// A validated, normalized creation request ready for insertion.
#[derive(Debug, Clone)]
pub struct MedicationInput {
    pub name: String,
    pub dosage: String,
    pub total_days: i64,
    pub start: NaiveDateTime,
    pub interval_hours: i64,
    pub window_start: Option<String>,
    pub window_end: Option<String>,
    pub alarm_enabled: bool,
}

impl NewMedication {
    /// Validate and normalize the request. Returns a descriptive
    /// message on the first failed check.
    pub fn validate(self) -> Result<MedicationInput, String> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err("campo 'nome' é obrigatório".to_string());
        }
        let dosage = self.dosage.trim().to_string();
        if dosage.is_empty() {
            return Err("campo 'dosagem' é obrigatório".to_string());
        }
        if self.total_days < 0 {
            return Err("campo 'dias' não pode ser negativo".to_string());
        }
        let start = parse_start_timestamp(self.start.trim())
            .ok_or_else(|| format!("campo 'dataInicio' inválido: {}", self.start))?;
        if self.interval_hours < 1 {
            return Err("campo 'intervaloHoras' deve ser maior que zero".to_string());
        }
        let window_start = normalize_window(self.window_start, "horarioInicio")?;
        let window_end = normalize_window(self.window_end, "horarioFim")?;

        Ok(MedicationInput {
            name,
            dosage,
            total_days: self.total_days,
            start,
            interval_hours: self.interval_hours,
            window_start,
            window_end,
            alarm_enabled: self.alarm_enabled,
        })
    }
}

fn normalize_window(raw: Option<String>, field: &str) -> Result<Option<String>, String> {
    match raw {
        None => Ok(None),
        Some(s) => {
            let s = s.trim().to_string();
            if s.is_empty() {
                return Ok(None);
            }
            parse_time_of_day(&s)
                .map(|_| Some(s.clone()))
                .ok_or_else(|| format!("campo '{field}' inválido: {s} (esperado HH:MM)"))
        }
    }
}
