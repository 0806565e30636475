// libs/scheduling-cell/src/scheduler.rs
use std::sync::Arc;

use chrono::NaiveDate;
use serde_json::Value;
use tracing::debug;

use shared_config::AppConfig;

use crate::models::{
    Appointment, AppointmentPatch, AppointmentStatus, Operatory, SchedulerConfig, SchedulingError, SlotSelection,
    TimeOfDay,
};
use crate::services::backend::{RestSchedulerBackend, SchedulerBackend};
use crate::services::cache::{AppointmentCache, FetchTicket};
use crate::services::config_validator::SchedulerConfigValidator;
use crate::services::lifecycle::AppointmentLifecycleService;
use crate::services::normalize::CreateAppointmentInput;
use crate::services::occupancy::{IndexKey, OccupancyIndex, OccupancyMemo};
use crate::services::time_grid::generate_slots;

/// State behind one front-office schedule view.
///
/// Every mutation goes through `&mut self`, so a write always resolves before
/// the next occupancy query sees the appointment set.
pub struct Scheduler {
    backend: Arc<dyn SchedulerBackend>,
    lifecycle: AppointmentLifecycleService,
    config: SchedulerConfig,
    operatories: Vec<Operatory>,
    operatories_revision: u64,
    cache: AppointmentCache,
    active_date: NaiveDate,
    slot_width: u32,
    selected_slot: Option<SlotSelection>,
    memo: OccupancyMemo,
}

impl Scheduler {
    pub fn new(backend: Arc<dyn SchedulerBackend>, active_date: NaiveDate) -> Self {
        Self {
            lifecycle: AppointmentLifecycleService::new(Arc::clone(&backend)),
            backend,
            config: SchedulerConfig::default(),
            operatories: Vec::new(),
            operatories_revision: 0,
            cache: AppointmentCache::new(),
            active_date,
            slot_width: shared_config::DEFAULT_SLOT_WIDTH_MINUTES,
            selected_slot: None,
            memo: OccupancyMemo::new(),
        }
    }

    /// Scheduler talking to the REST backend described by `config`.
    pub fn from_config(config: &AppConfig, active_date: NaiveDate) -> Self {
        let backend: Arc<dyn SchedulerBackend> = Arc::new(RestSchedulerBackend::new(config));
        Self::new(backend, active_date).with_slot_width(config.slot_width_minutes)
    }

    /// A zero width is ignored.
    pub fn with_slot_width(mut self, slot_width: u32) -> Self {
        if slot_width > 0 {
            self.slot_width = slot_width;
        }
        self
    }

    // ==========================================================================
    // CONFIG
    // ==========================================================================

    pub fn config(&self) -> SchedulerConfig {
        self.config
    }

    /// Adopts `candidate` if it validates, otherwise keeps the current config.
    pub fn adopt_config(&mut self, candidate: &Value) -> SchedulerConfig {
        self.config = SchedulerConfigValidator::validate_or_keep(candidate, self.config);
        self.config
    }

    /// Fetches the office's config. A payload that fails validation is ignored;
    /// only transport/backend failures are returned as errors.
    pub async fn load_config(&mut self) -> Result<SchedulerConfig, SchedulingError> {
        let candidate = self.backend.fetch_scheduler_config().await?;
        Ok(self.adopt_config(&candidate))
    }

    // ==========================================================================
    // OPERATORIES
    // ==========================================================================

    pub async fn load_operatories(&mut self) -> Result<&[Operatory], SchedulingError> {
        let operatories = self.backend.fetch_operatories().await?;
        self.set_operatories(operatories);
        Ok(&self.operatories)
    }

    pub fn set_operatories(&mut self, operatories: Vec<Operatory>) {
        debug!("Active operatory set now has {} entries", operatories.len());
        self.operatories = operatories;
        self.operatories_revision += 1;
    }

    pub fn operatories(&self) -> &[Operatory] {
        &self.operatories
    }

    // ==========================================================================
    // ACTIVE DATE & APPOINTMENT FETCHES
    // ==========================================================================

    pub fn active_date(&self) -> NaiveDate {
        self.active_date
    }

    /// Switches the viewed day. Does not fetch; the selected slot is cleared.
    pub fn set_active_date(&mut self, date: NaiveDate) {
        if date != self.active_date {
            debug!("Active date {} -> {}", self.active_date, date);
            self.active_date = date;
            self.selected_slot = None;
        }
    }

    /// Issues a ticket for fetching the active date's appointments.
    pub fn begin_appointment_fetch(&mut self) -> FetchTicket {
        self.cache.begin_fetch(self.active_date, self.active_date)
    }

    /// Applies a fetch result if its ticket is the latest one and still covers
    /// the active date. Returns whether it was applied.
    pub fn complete_appointment_fetch(&mut self, ticket: FetchTicket, appointments: Vec<Appointment>) -> bool {
        if !ticket.covers(self.active_date) {
            debug!(
                "Dropping appointments for {}..={}, active date is {}",
                ticket.date_from(),
                ticket.date_to(),
                self.active_date
            );
            return false;
        }
        self.cache.complete_fetch(ticket, appointments)
    }

    pub async fn refresh_appointments(&mut self, date_from: NaiveDate, date_to: NaiveDate) -> Result<bool, SchedulingError> {
        self.cache.refresh(self.backend.as_ref(), date_from, date_to).await
    }

    pub async fn refresh_active_date(&mut self) -> Result<bool, SchedulingError> {
        let ticket = self.begin_appointment_fetch();
        let appointments = self
            .backend
            .fetch_appointments(ticket.date_from(), ticket.date_to())
            .await?;
        Ok(self.complete_appointment_fetch(ticket, appointments))
    }

    pub fn invalidate_appointments(&mut self) {
        self.cache.invalidate();
    }

    pub fn appointments(&self) -> &[Appointment] {
        self.cache.appointments()
    }

    pub fn appointment(&self, id: &str) -> Option<&Appointment> {
        self.cache.get(id)
    }

    // ==========================================================================
    // GRID & OCCUPANCY
    // ==========================================================================

    pub fn slots(&self) -> Vec<TimeOfDay> {
        generate_slots(&self.config)
    }

    pub fn slot_width(&self) -> u32 {
        self.slot_width
    }

    /// Current index, rebuilt first if the appointments, operatories or date moved on.
    pub fn occupancy(&mut self) -> &OccupancyIndex {
        let key = IndexKey {
            appointments_revision: self.cache.revision(),
            operatories_revision: self.operatories_revision,
            active_date: self.active_date,
            slot_width: self.slot_width,
        };
        let (cache, operatories) = (&self.cache, &self.operatories);
        self.memo.get_or_rebuild(key, || {
            OccupancyIndex::build(cache.appointments(), key.active_date, operatories, key.slot_width)
        })
    }

    pub fn is_slot_occupied(&mut self, slot_start: TimeOfDay, operatory_id: &str) -> bool {
        self.occupancy().is_slot_occupied(slot_start, operatory_id)
    }

    pub fn occupying_appointment(&mut self, slot_start: TimeOfDay, operatory_id: &str) -> Option<&Appointment> {
        self.occupancy().occupying_appointment(slot_start, operatory_id)
    }

    pub fn index_rebuilds(&self) -> u64 {
        self.memo.rebuild_count()
    }

    /// Remembers a clicked slot on the active date; its provider comes from the operatory.
    pub fn select_slot(&mut self, start_time: TimeOfDay, operatory_id: &str) -> &SlotSelection {
        let provider = self
            .operatories
            .iter()
            .find(|op| op.id == operatory_id)
            .map(|op| op.provider.clone())
            .filter(|provider| !provider.trim().is_empty());

        self.selected_slot.insert(SlotSelection {
            date: self.active_date,
            start_time,
            operatory: operatory_id.to_string(),
            provider,
        })
    }

    pub fn selected_slot(&self) -> Option<&SlotSelection> {
        self.selected_slot.as_ref()
    }

    pub fn clear_selection(&mut self) {
        self.selected_slot = None;
    }

    // ==========================================================================
    // LIFECYCLE
    // ==========================================================================

    pub async fn create_appointment(&mut self, input: CreateAppointmentInput) -> Result<Appointment, SchedulingError> {
        let created = self
            .lifecycle
            .create(&mut self.cache, input, self.selected_slot.as_ref(), self.active_date)
            .await?;
        self.selected_slot = None;
        Ok(created)
    }

    /// Same as [`Scheduler::create_appointment`] for a raw form payload in any accepted shape.
    pub async fn create_appointment_from_value(&mut self, payload: Value) -> Result<Appointment, SchedulingError> {
        let input = CreateAppointmentInput::from_value(payload)?;
        debug!("Create request arrived as {}", input.shape_name());
        self.create_appointment(input).await
    }

    pub async fn update_appointment(&mut self, id: &str, patch: AppointmentPatch) -> Result<Appointment, SchedulingError> {
        self.lifecycle.update(&mut self.cache, id, patch).await
    }

    pub async fn set_appointment_status(
        &mut self,
        id: &str,
        status: AppointmentStatus,
    ) -> Result<Appointment, SchedulingError> {
        self.lifecycle.set_status(&mut self.cache, id, status).await
    }

    pub async fn delete_appointment(&mut self, id: &str) -> Result<(), SchedulingError> {
        self.lifecycle.delete(&mut self.cache, id).await
    }
}
