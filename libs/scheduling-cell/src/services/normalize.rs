// libs/scheduling-cell/src/services/normalize.rs
//
// Booking forms have sent create requests in three shapes over time. They are
// recognised once here and folded into one canonical request.
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::models::{
    opt_string_or_number, opt_u32_lenient, parse_date, AppointmentStatus, CreateAppointmentRequest,
    SchedulingError, SlotSelection, TimeOfDay, NEW_PATIENT_ID,
};

pub const FALLBACK_START_TIME: TimeOfDay = TimeOfDay::from_hm(9, 0);
pub const FALLBACK_DURATION_MINUTES: u32 = 30;

/// Appointment fields of the new-patient flow: `{"patient": {..}, "appointment": {..}}`.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct NestedAppointmentFields {
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default, alias = "startTime")]
    pub start_time: Option<String>,
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

/// Flat existing-patient request keyed by `patient_id` (or `patientId`).
/// Forms mix conventions, so every multi-word key also accepts camelCase.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct SnakeCaseFields {
    #[serde(default, alias = "patientId", deserialize_with = "opt_string_or_number")]
    pub patient_id: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default, alias = "startTime", alias = "time")]
    pub start_time: Option<String>,
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

/// Oldest flat form with camelCase keys.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LegacyCamelCaseFields {
    #[serde(default, alias = "patient_id", deserialize_with = "opt_string_or_number")]
    pub patient_id: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default, alias = "time")]
    pub start_time: Option<String>,
    #[serde(default, deserialize_with = "opt_u32_lenient")]
    pub duration: Option<u32>,
    #[serde(default)]
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

#[derive(Debug, Clone, PartialEq)]
pub enum CreateAppointmentInput {
    NestedPatient {
        patient: Value,
        appointment: NestedAppointmentFields,
    },
    SnakeCase(SnakeCaseFields),
    LegacyCamelCase(LegacyCamelCaseFields),
}

const SNAKE_CASE_MARKERS: [&str; 4] = ["patient_id", "start_time", "procedure_type", "end_time"];

impl CreateAppointmentInput {
    /// Recognises the shape of a raw create payload.
    ///
    /// `patient` + `appointment` objects mean the new-patient flow; any
    /// snake_case multi-word key means the flat snake_case form; everything
    /// else is read as the legacy camelCase form.
    pub fn from_value(value: Value) -> Result<Self, SchedulingError> {
        let Value::Object(mut map) = value else {
            return Err(SchedulingError::InvalidInput("appointment data must be a JSON object".to_string()));
        };

        let nested = map.get("patient").is_some_and(Value::is_object)
            && map.get("appointment").is_some_and(Value::is_object);

        if nested {
            let patient = map.remove("patient").unwrap_or(Value::Null);
            let appointment = map.remove("appointment").unwrap_or(Value::Null);
            let appointment = serde_json::from_value(appointment).map_err(invalid_input)?;
            return Ok(Self::NestedPatient { patient, appointment });
        }

        let value = Value::Object(map);
        let is_snake_case = value
            .as_object()
            .is_some_and(|map| SNAKE_CASE_MARKERS.iter().any(|key| map.contains_key(*key)));

        if is_snake_case {
            Ok(Self::SnakeCase(serde_json::from_value(value).map_err(invalid_input)?))
        } else {
            Ok(Self::LegacyCamelCase(serde_json::from_value(value).map_err(invalid_input)?))
        }
    }

    pub fn shape_name(&self) -> &'static str {
        match self {
            Self::NestedPatient { .. } => "nested-patient",
            Self::SnakeCase(_) => "snake-case",
            Self::LegacyCamelCase(_) => "legacy-camel-case",
        }
    }

    fn into_draft(self) -> Draft {
        match self {
            Self::NestedPatient { patient, appointment } => Draft {
                patient_id: Some(NEW_PATIENT_ID.to_string()),
                date: appointment.date,
                start_time: appointment.start_time,
                duration: appointment.duration,
                procedure_type: appointment.procedure_type,
                status: appointment.status,
                operatory: appointment.operatory,
                provider: appointment.provider,
                notes: appointment.notes,
                patient: Some(patient),
            },
            Self::SnakeCase(fields) => Draft {
                patient_id: fields.patient_id,
                date: fields.date,
                start_time: fields.start_time,
                duration: fields.duration,
                procedure_type: fields.procedure_type,
                status: fields.status,
                operatory: fields.operatory,
                provider: fields.provider,
                notes: fields.notes,
                patient: None,
            },
            Self::LegacyCamelCase(fields) => Draft {
                patient_id: fields.patient_id,
                date: fields.date,
                start_time: fields.start_time,
                duration: fields.duration,
                procedure_type: fields.procedure_type,
                status: fields.status,
                operatory: fields.operatory,
                provider: fields.provider,
                notes: fields.notes,
                patient: None,
            },
        }
    }
}

/// Shape-independent view of the input before defaults are applied.
struct Draft {
    patient_id: Option<String>,
    date: Option<String>,
    start_time: Option<String>,
    duration: Option<u32>,
    procedure_type: Option<String>,
    status: Option<AppointmentStatus>,
    operatory: Option<String>,
    provider: Option<String>,
    notes: Option<String>,
    patient: Option<Value>,
}

/// Builds the canonical create request.
///
/// Each field resolves from the explicit input first, then the selected grid
/// slot, then a fixed fallback (`Scheduled`, `09:00`, 30 minutes, the active
/// date). Every required field that stays unresolved is reported together.
pub fn normalize_create_request(
    input: CreateAppointmentInput,
    selection: Option<&SlotSelection>,
    active_date: NaiveDate,
) -> Result<CreateAppointmentRequest, SchedulingError> {
    debug!("Normalizing {} create request", input.shape_name());
    let draft = input.into_draft();

    let date = match non_blank(draft.date) {
        Some(raw) => parse_date(&raw)?,
        None => selection.map(|slot| slot.date).unwrap_or(active_date),
    };

    let start_time = match non_blank(draft.start_time) {
        Some(raw) => raw.parse::<TimeOfDay>()?,
        None => selection.map(|slot| slot.start_time).unwrap_or(FALLBACK_START_TIME),
    };

    let duration = draft
        .duration
        .filter(|minutes| *minutes > 0)
        .unwrap_or(FALLBACK_DURATION_MINUTES);

    let operatory = non_blank(draft.operatory).or_else(|| selection.and_then(|slot| non_blank(Some(slot.operatory.clone()))));
    let provider = non_blank(draft.provider).or_else(|| selection.and_then(|slot| non_blank(slot.provider.clone())));
    let procedure_type = non_blank(draft.procedure_type);
    let patient_id = non_blank(draft.patient_id);

    let mut missing = Vec::new();
    if patient_id.is_none() {
        missing.push("patient_id".to_string());
    }
    if operatory.is_none() {
        missing.push("operatory".to_string());
    }
    if provider.is_none() {
        missing.push("provider".to_string());
    }
    if procedure_type.is_none() {
        missing.push("procedure_type".to_string());
    }

    match (patient_id, operatory, provider, procedure_type) {
        (Some(patient_id), Some(operatory), Some(provider), Some(procedure_type)) => Ok(CreateAppointmentRequest {
            patient_id,
            date,
            start_time,
            duration,
            procedure_type,
            status: draft.status.unwrap_or_default(),
            operatory,
            provider,
            notes: draft.notes.unwrap_or_default(),
            patient: draft.patient,
        }),
        _ => Err(SchedulingError::MissingRequiredField { fields: missing }),
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
}

fn invalid_input(err: serde_json::Error) -> SchedulingError {
    SchedulingError::InvalidInput(err.to_string())
}
