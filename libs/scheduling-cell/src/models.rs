// libs/scheduling-cell/src/models.rs
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use shared_database::BackendError;

use crate::services::interval::to_minutes;

// ==============================================================================
// TIME OF DAY
// ==============================================================================

/// Minutes since midnight, exchanged with the backend as zero-padded `HH:MM`.
///
/// Values past `23:59` do not wrap, so an appointment running over midnight
/// still ends after it starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct TimeOfDay(u32);

impl TimeOfDay {
    pub const fn from_minutes(minutes: u32) -> Self {
        Self(minutes)
    }

    pub const fn from_hm(hour: u32, minute: u32) -> Self {
        Self(hour * 60 + minute)
    }

    /// Legacy-tolerant parse: malformed components count as zero.
    pub fn lenient(raw: &str) -> Self {
        Self(to_minutes(raw))
    }

    pub const fn minutes(self) -> u32 {
        self.0
    }

    pub const fn hour(self) -> u32 {
        self.0 / 60
    }

    pub const fn minute(self) -> u32 {
        self.0 % 60
    }

    pub fn add_minutes(self, duration: u32) -> Self {
        Self(self.0.saturating_add(duration))
    }

    /// Minutes from `self` to `later`, zero if `later` is not after `self`.
    pub fn minutes_until(self, later: TimeOfDay) -> u32 {
        later.0.saturating_sub(self.0)
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour(), self.minute())
    }
}

impl FromStr for TimeOfDay {
    type Err = SchedulingError;

    /// Strict parse of `HH:MM` or `HH:MM:SS` in 24-hour form.
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let invalid = || SchedulingError::InvalidTime(raw.to_string());
        let parts: Vec<&str> = raw.trim().split(':').collect();
        if parts.len() < 2 || parts.len() > 3 {
            return Err(invalid());
        }

        let component = |part: &str, limit: u32| -> Result<u32, SchedulingError> {
            if part.is_empty() || part.len() > 2 || !part.chars().all(|c| c.is_ascii_digit()) {
                return Err(invalid());
            }
            let value: u32 = part.parse().map_err(|_| invalid())?;
            if value >= limit {
                return Err(invalid());
            }
            Ok(value)
        };

        let hour = component(parts[0], 24)?;
        let minute = component(parts[1], 60)?;
        if let Some(&seconds) = parts.get(2) {
            component(seconds, 60)?;
        }

        Ok(Self::from_hm(hour, minute))
    }
}

impl Serialize for TimeOfDay {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TimeOfDay {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(TimeOfDay::lenient(&raw))
    }
}

/// Parses a backend date, tolerating a trailing time part (`2025-01-10T00:00:00Z`).
pub fn parse_date(raw: &str) -> Result<NaiveDate, SchedulingError> {
    let trimmed = raw.trim();
    let day_part = trimmed.get(..10).unwrap_or(trimmed);
    NaiveDate::parse_from_str(day_part, "%Y-%m-%d")
        .map_err(|_| SchedulingError::InvalidInput(format!("invalid date '{}', expected YYYY-MM-DD", raw)))
}

// ==============================================================================
// OFFICE CONFIGURATION
// ==============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct SchedulerConfig {
    #[serde(alias = "startHour")]
    pub start_hour: u32,
    #[serde(alias = "endHour")]
    pub end_hour: u32,
    #[serde(alias = "slotInterval")]
    pub slot_interval: u32,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            start_hour: 8,
            end_hour: 17,
            slot_interval: 10,
        }
    }
}

/// A bookable chair or treatment room; one column of the grid.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Operatory {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub provider: String,
}

// ==============================================================================
// CORE APPOINTMENT MODELS
// ==============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub enum AppointmentStatus {
    #[default]
    #[serde(rename = "Scheduled", alias = "scheduled")]
    Scheduled,

    #[serde(rename = "Confirmed", alias = "confirmed")]
    Confirmed,

    #[serde(rename = "Unconfirmed", alias = "unconfirmed")]
    Unconfirmed,

    #[serde(rename = "Left Message", alias = "LeftMessage", alias = "left_message")]
    LeftMessage,

    #[serde(rename = "In Reception", alias = "InReception", alias = "in_reception")]
    InReception,

    #[serde(rename = "Available", alias = "available")]
    Available,

    #[serde(rename = "In Operatory", alias = "InOperatory", alias = "in_operatory")]
    InOperatory,

    #[serde(rename = "Checked Out", alias = "CheckedOut", alias = "checked_out")]
    CheckedOut,

    #[serde(rename = "Missed", alias = "missed")]
    Missed,

    #[serde(rename = "Cancelled", alias = "cancelled", alias = "Canceled", alias = "canceled")]
    Cancelled,
}

impl AppointmentStatus {
    pub const ALL: [AppointmentStatus; 10] = [
        AppointmentStatus::Scheduled,
        AppointmentStatus::Confirmed,
        AppointmentStatus::Unconfirmed,
        AppointmentStatus::LeftMessage,
        AppointmentStatus::InReception,
        AppointmentStatus::Available,
        AppointmentStatus::InOperatory,
        AppointmentStatus::CheckedOut,
        AppointmentStatus::Missed,
        AppointmentStatus::Cancelled,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            AppointmentStatus::Scheduled => "Scheduled",
            AppointmentStatus::Confirmed => "Confirmed",
            AppointmentStatus::Unconfirmed => "Unconfirmed",
            AppointmentStatus::LeftMessage => "Left Message",
            AppointmentStatus::InReception => "In Reception",
            AppointmentStatus::Available => "Available",
            AppointmentStatus::InOperatory => "In Operatory",
            AppointmentStatus::CheckedOut => "Checked Out",
            AppointmentStatus::Missed => "Missed",
            AppointmentStatus::Cancelled => "Cancelled",
        }
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A booked appointment as confirmed by the backend.
///
/// `end_time == start_time + duration` always holds: records missing one of
/// the two get it derived on ingest, and a supplied `end_time` wins over a
/// conflicting `duration`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(from = "AppointmentRecord")]
pub struct Appointment {
    pub id: String,
    pub patient_id: String,
    pub patient_name: String,
    pub date: NaiveDate,
    pub start_time: TimeOfDay,
    pub end_time: TimeOfDay,
    pub duration: u32,
    pub operatory: String,
    pub provider: String,
    pub procedure_type: String,
    pub status: AppointmentStatus,
    pub notes: String,
}

/// Wire form of an appointment, tolerant of both key conventions.
#[derive(Debug, Deserialize)]
struct AppointmentRecord {
    #[serde(deserialize_with = "string_or_number")]
    id: String,
    #[serde(default, alias = "patientId", deserialize_with = "opt_string_or_number")]
    patient_id: Option<String>,
    #[serde(default, alias = "patientName")]
    patient_name: Option<String>,
    #[serde(deserialize_with = "backend_date")]
    date: NaiveDate,
    #[serde(alias = "startTime")]
    start_time: TimeOfDay,
    #[serde(default, alias = "endTime")]
    end_time: Option<TimeOfDay>,
    #[serde(default, deserialize_with = "opt_u32_lenient")]
    duration: Option<u32>,
    #[serde(deserialize_with = "string_or_number")]
    operatory: String,
    #[serde(default)]
    provider: Option<String>,
    #[serde(default, alias = "procedureType")]
    procedure_type: Option<String>,
    #[serde(default)]
    status: AppointmentStatus,
    #[serde(default)]
    notes: Option<String>,
}

impl From<AppointmentRecord> for Appointment {
    fn from(record: AppointmentRecord) -> Self {
        let start_time = record.start_time;
        let end_time = match (record.end_time, record.duration) {
            (Some(end), _) => end.max(start_time),
            (None, Some(duration)) => start_time.add_minutes(duration),
            (None, None) => start_time,
        };

        Self {
            id: record.id,
            patient_id: record.patient_id.unwrap_or_default(),
            patient_name: record.patient_name.unwrap_or_default(),
            date: record.date,
            start_time,
            end_time,
            duration: start_time.minutes_until(end_time),
            operatory: record.operatory,
            provider: record.provider.unwrap_or_default(),
            procedure_type: record.procedure_type.unwrap_or_default(),
            status: record.status,
            notes: record.notes.unwrap_or_default(),
        }
    }
}

// ==============================================================================
// REQUEST MODELS
// ==============================================================================

/// Canonical create request sent to `POST /appointments`.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CreateAppointmentRequest {
    pub patient_id: String,
    pub date: NaiveDate,
    pub start_time: TimeOfDay,
    pub duration: u32,
    pub procedure_type: String,
    pub status: AppointmentStatus,
    pub operatory: String,
    pub provider: String,
    pub notes: String,
    /// New-patient details, present only when `patient_id` is [`NEW_PATIENT_ID`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patient: Option<Value>,
}

/// Canonical update request sent to `PUT /appointments/{id}`.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct UpdateAppointmentRequest {
    pub patient_id: String,
    pub date: NaiveDate,
    pub start_time: TimeOfDay,
    pub duration: u32,
    pub procedure_type: String,
    pub status: AppointmentStatus,
    pub operatory: String,
    pub provider: String,
    pub notes: String,
}

impl From<&Appointment> for UpdateAppointmentRequest {
    fn from(appointment: &Appointment) -> Self {
        Self {
            patient_id: appointment.patient_id.clone(),
            date: appointment.date,
            start_time: appointment.start_time,
            duration: appointment.duration,
            procedure_type: appointment.procedure_type.clone(),
            status: appointment.status,
            operatory: appointment.operatory.clone(),
            provider: appointment.provider.clone(),
            notes: appointment.notes.clone(),
        }
    }
}

/// Partial update; absent fields keep the previously known value.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct AppointmentPatch {
    #[serde(default, alias = "patientId", deserialize_with = "opt_string_or_number")]
    pub patient_id: Option<String>,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default, alias = "startTime")]
    pub start_time: Option<TimeOfDay>,
    #[serde(default, alias = "endTime")]
    pub end_time: Option<TimeOfDay>,
    #[serde(default, deserialize_with = "opt_u32_lenient")]
    pub duration: Option<u32>,
    #[serde(default, alias = "procedureType")]
    pub procedure_type: Option<String>,
    #[serde(default)]
    pub status: Option<AppointmentStatus>,
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub operatory: Option<String>,
    #[serde(default)]
    pub provider: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl AppointmentPatch {
    pub fn status(status: AppointmentStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }
}

/// The grid cell the user picked before opening the booking form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotSelection {
    pub date: NaiveDate,
    pub start_time: TimeOfDay,
    pub operatory: String,
    pub provider: Option<String>,
}

/// Sentinel patient id for the new-patient booking flow; the backend assigns the real one.
pub const NEW_PATIENT_ID: &str = "NEW";

// ==============================================================================
// ERROR TYPES
// ==============================================================================

pub const REMOTE_FAILURE_MESSAGE: &str = "The scheduling service could not complete the request";

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SchedulingError {
    #[error("Invalid scheduler configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid time of day: {0}")]
    InvalidTime(String),

    #[error("Invalid appointment input: {0}")]
    InvalidInput(String),

    #[error("Missing required field(s): {}", fields.join(", "))]
    MissingRequiredField { fields: Vec<String> },

    #[error("Appointment {0} not found")]
    NotFound(String),

    #[error("{0}")]
    RemoteFailure(String),
}

impl From<BackendError> for SchedulingError {
    fn from(err: BackendError) -> Self {
        let message = err
            .backend_message()
            .map(str::to_string)
            .unwrap_or_else(|| REMOTE_FAILURE_MESSAGE.to_string());
        SchedulingError::RemoteFailure(message)
    }
}

// ==============================================================================
// WIRE HELPERS
// ==============================================================================

fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::String(text) => Ok(text),
        Value::Number(number) => Ok(number.to_string()),
        other => Err(de::Error::custom(format!("expected string or number, got {}", other))),
    }
}

pub(crate) fn opt_string_or_number<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(text)) => Ok(Some(text)),
        Some(Value::Number(number)) => Ok(Some(number.to_string())),
        Some(other) => Err(de::Error::custom(format!("expected string or number, got {}", other))),
    }
}

/// Durations arrive as numbers or numeric strings depending on the form that produced them.
pub(crate) fn opt_u32_lenient<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u32>, D::Error> {
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(number)) => number
            .as_u64()
            .and_then(|n| u32::try_from(n).ok())
            .map(Some)
            .ok_or_else(|| de::Error::custom(format!("expected a non-negative integer, got {}", number))),
        Some(Value::String(text)) if text.trim().is_empty() => Ok(None),
        Some(Value::String(text)) => text
            .trim()
            .parse::<u32>()
            .map(Some)
            .map_err(|_| de::Error::custom(format!("expected a non-negative integer, got '{}'", text))),
        Some(other) => Err(de::Error::custom(format!("expected a non-negative integer, got {}", other))),
    }
}

fn backend_date<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDate, D::Error> {
    let raw = String::deserialize(deserializer)?;
    parse_date(&raw).map_err(de::Error::custom)
}
