// libs/scheduling-cell/src/services/lifecycle.rs
use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, info, warn};

use crate::models::{
    Appointment, AppointmentPatch, AppointmentStatus, SchedulingError, SlotSelection, UpdateAppointmentRequest,
};
use crate::services::backend::SchedulerBackend;
use crate::services::cache::AppointmentCache;
use crate::services::normalize::{normalize_create_request, CreateAppointmentInput};

/// Create/update/status/delete against the backend, reconciling the local
/// cache only after the backend confirms. Nothing here retries.
pub struct AppointmentLifecycleService {
    backend: Arc<dyn SchedulerBackend>,
}

impl AppointmentLifecycleService {
    pub fn new(backend: Arc<dyn SchedulerBackend>) -> Self {
        Self { backend }
    }

    pub async fn create(
        &self,
        cache: &mut AppointmentCache,
        input: CreateAppointmentInput,
        selection: Option<&SlotSelection>,
        active_date: NaiveDate,
    ) -> Result<Appointment, SchedulingError> {
        let request = normalize_create_request(input, selection, active_date)?;
        debug!(
            "Creating appointment for patient {} in {} on {} at {}",
            request.patient_id, request.operatory, request.date, request.start_time
        );

        let created = self.backend.create_appointment(&request).await.map_err(|e| {
            warn!("Create appointment failed: {}", e);
            e
        })?;

        info!("Appointment {} created in {} on {}", created.id, created.operatory, created.date);
        cache.upsert(created.clone());
        Ok(created)
    }

    pub async fn update(
        &self,
        cache: &mut AppointmentCache,
        id: &str,
        patch: AppointmentPatch,
    ) -> Result<Appointment, SchedulingError> {
        let current = cache
            .get(id)
            .ok_or_else(|| SchedulingError::NotFound(id.to_string()))?;

        let request = merge_patch(current, patch)?;
        debug!("Updating appointment {}", id);

        let updated = self.backend.update_appointment(id, &request).await.map_err(|e| {
            warn!("Update of appointment {} failed: {}", id, e);
            e
        })?;

        info!("Appointment {} updated", updated.id);
        cache.upsert(updated.clone());
        Ok(updated)
    }

    /// Any status may follow any other; the front office corrects mistakes by
    /// setting the status again.
    pub async fn set_status(
        &self,
        cache: &mut AppointmentCache,
        id: &str,
        status: AppointmentStatus,
    ) -> Result<Appointment, SchedulingError> {
        let previous = cache
            .get(id)
            .map(|apt| apt.status)
            .ok_or_else(|| SchedulingError::NotFound(id.to_string()))?;

        debug!("Setting appointment {} status {} -> {}", id, previous, status);

        let updated = self.backend.update_appointment_status(id, status).await.map_err(|e| {
            warn!("Status change of appointment {} failed: {}", id, e);
            e
        })?;

        info!("Appointment {} is now {}", updated.id, updated.status);
        cache.upsert(updated.clone());
        Ok(updated)
    }

    pub async fn delete(&self, cache: &mut AppointmentCache, id: &str) -> Result<(), SchedulingError> {
        if cache.get(id).is_none() {
            return Err(SchedulingError::NotFound(id.to_string()));
        }

        self.backend.delete_appointment(id).await.map_err(|e| {
            warn!("Delete of appointment {} failed: {}", id, e);
            e
        })?;

        cache.remove(id);
        info!("Appointment {} deleted", id);
        Ok(())
    }
}

/// Overlays `patch` on `current`. `duration` wins over `end_time` when both are given.
fn merge_patch(current: &Appointment, patch: AppointmentPatch) -> Result<UpdateAppointmentRequest, SchedulingError> {
    let mut request = UpdateAppointmentRequest::from(current);

    if let Some(patient_id) = patch.patient_id {
        request.patient_id = patient_id;
    }
    if let Some(date) = patch.date {
        request.date = date;
    }
    if let Some(start_time) = patch.start_time {
        request.start_time = start_time;
    }
    match (patch.duration, patch.end_time) {
        (Some(duration), _) => request.duration = duration,
        (None, Some(end_time)) => request.duration = request.start_time.minutes_until(end_time),
        (None, None) => {}
    }
    if let Some(procedure_type) = patch.procedure_type {
        request.procedure_type = procedure_type;
    }
    if let Some(status) = patch.status {
        request.status = status;
    }
    if let Some(operatory) = patch.operatory {
        request.operatory = operatory;
    }
    if let Some(provider) = patch.provider {
        request.provider = provider;
    }
    if let Some(notes) = patch.notes {
        request.notes = notes;
    }

    let missing: Vec<String> = [
        ("operatory", &request.operatory),
        ("provider", &request.provider),
        ("procedure_type", &request.procedure_type),
    ]
    .iter()
    .filter(|(_, value)| value.trim().is_empty())
    .map(|(name, _)| name.to_string())
    .collect();

    if !missing.is_empty() {
        return Err(SchedulingError::MissingRequiredField { fields: missing });
    }
    if request.duration == 0 {
        return Err(SchedulingError::InvalidInput("duration must be positive".to_string()));
    }

    Ok(request)
}
