// libs/scheduling-cell/src/services/backend.rs
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, error, warn};

use shared_config::AppConfig;
use shared_database::BackendClient;

use crate::models::{
    Appointment, AppointmentStatus, CreateAppointmentRequest, Operatory, SchedulingError,
    UpdateAppointmentRequest,
};

/// The REST persistence collaborator as seen by the scheduling core.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SchedulerBackend: Send + Sync {
    async fn fetch_appointments(
        &self,
        date_from: NaiveDate,
        date_to: NaiveDate,
    ) -> Result<Vec<Appointment>, SchedulingError>;

    async fn fetch_operatories(&self) -> Result<Vec<Operatory>, SchedulingError>;

    /// Raw payload; callers run it through the config validator before use.
    async fn fetch_scheduler_config(&self) -> Result<Value, SchedulingError>;

    async fn create_appointment(&self, request: &CreateAppointmentRequest) -> Result<Appointment, SchedulingError>;

    async fn update_appointment(
        &self,
        id: &str,
        request: &UpdateAppointmentRequest,
    ) -> Result<Appointment, SchedulingError>;

    async fn update_appointment_status(
        &self,
        id: &str,
        status: AppointmentStatus,
    ) -> Result<Appointment, SchedulingError>;

    async fn delete_appointment(&self, id: &str) -> Result<(), SchedulingError>;
}

pub struct RestSchedulerBackend {
    client: Arc<BackendClient>,
    office_id: Option<String>,
}

impl RestSchedulerBackend {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: Arc::new(BackendClient::new(config)),
            office_id: config.office_id.clone(),
        }
    }

    pub fn with_client(client: Arc<BackendClient>, office_id: Option<String>) -> Self {
        Self { client, office_id }
    }

    fn with_office(&self, path: &str) -> String {
        match &self.office_id {
            Some(office_id) => {
                let separator = if path.contains('?') { '&' } else { '?' };
                format!("{}{}office_id={}", path, separator, urlencoding::encode(office_id))
            }
            None => path.to_string(),
        }
    }

    fn appointment_path(id: &str) -> String {
        format!("/appointments/{}", urlencoding::encode(id))
    }
}

#[async_trait]
impl SchedulerBackend for RestSchedulerBackend {
    async fn fetch_appointments(
        &self,
        date_from: NaiveDate,
        date_to: NaiveDate,
    ) -> Result<Vec<Appointment>, SchedulingError> {
        debug!("Fetching appointments from {} to {}", date_from, date_to);

        let path = self.with_office(&format!(
            "/appointments?date_from={}&date_to={}",
            date_from.format("%Y-%m-%d"),
            date_to.format("%Y-%m-%d")
        ));

        let result: Vec<Value> = self.client.request(Method::GET, &path, None).await?;
        Ok(decode_appointments(result))
    }

    async fn fetch_operatories(&self) -> Result<Vec<Operatory>, SchedulingError> {
        debug!("Fetching operatories");

        let path = self.with_office("/operatories");
        let result: Vec<Value> = self.client.request(Method::GET, &path, None).await?;

        result
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<Operatory>, _>>()
            .map_err(|e| decode_failure("operatories", e))
    }

    async fn fetch_scheduler_config(&self) -> Result<Value, SchedulingError> {
        debug!("Fetching scheduler config");

        let path = self.with_office("/scheduler-config");
        Ok(self.client.request(Method::GET, &path, None).await?)
    }

    async fn create_appointment(&self, request: &CreateAppointmentRequest) -> Result<Appointment, SchedulingError> {
        let body = serde_json::to_value(request).map_err(|e| SchedulingError::InvalidInput(e.to_string()))?;
        let result: Value = self.client.request(Method::POST, "/appointments", Some(body)).await?;
        single_appointment(result)
    }

    async fn update_appointment(
        &self,
        id: &str,
        request: &UpdateAppointmentRequest,
    ) -> Result<Appointment, SchedulingError> {
        let body = serde_json::to_value(request).map_err(|e| SchedulingError::InvalidInput(e.to_string()))?;
        let result: Value = self
            .client
            .request(Method::PUT, &Self::appointment_path(id), Some(body))
            .await?;
        single_appointment(result)
    }

    async fn update_appointment_status(
        &self,
        id: &str,
        status: AppointmentStatus,
    ) -> Result<Appointment, SchedulingError> {
        let path = format!("{}/status", Self::appointment_path(id));
        let result: Value = self
            .client
            .request(Method::PATCH, &path, Some(json!({ "status": status })))
            .await?;
        single_appointment(result)
    }

    async fn delete_appointment(&self, id: &str) -> Result<(), SchedulingError> {
        self.client
            .request_empty(Method::DELETE, &Self::appointment_path(id), None)
            .await?;
        Ok(())
    }
}

/// Rows that do not decode are skipped with a warning so one bad record
/// cannot blank the whole day.
fn decode_appointments(rows: Vec<Value>) -> Vec<Appointment> {
    let total = rows.len();
    let appointments: Vec<Appointment> = rows
        .into_iter()
        .filter_map(|row| {
            let id = row.get("id").cloned().unwrap_or(Value::Null);
            match serde_json::from_value::<Appointment>(row) {
                Ok(appointment) => Some(appointment),
                Err(e) => {
                    warn!("Skipping undecodable appointment {}: {}", id, e);
                    None
                }
            }
        })
        .collect();

    if appointments.len() < total {
        warn!("Kept {} of {} appointment rows from backend", appointments.len(), total);
    }
    appointments
}

/// Write endpoints answer with the appointment itself, `{"appointment": {..}}`,
/// or a one-element array depending on backend version.
fn single_appointment(result: Value) -> Result<Appointment, SchedulingError> {
    let record = match result {
        Value::Array(mut rows) if !rows.is_empty() => rows.swap_remove(0),
        Value::Object(mut map) if map.get("appointment").is_some_and(Value::is_object) => {
            map.remove("appointment").unwrap_or(Value::Null)
        }
        other => other,
    };

    serde_json::from_value(record).map_err(|e| decode_failure("appointment", e))
}

fn decode_failure(what: &str, err: serde_json::Error) -> SchedulingError {
    error!("Failed to parse {} from backend: {}", what, err);
    SchedulingError::RemoteFailure(format!("Unexpected {} payload from the scheduling service", what))
}
