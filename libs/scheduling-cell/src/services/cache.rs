// libs/scheduling-cell/src/services/cache.rs
use chrono::NaiveDate;
use tracing::{debug, warn};

use crate::models::{Appointment, SchedulingError};
use crate::services::backend::SchedulerBackend;

/// Tag for one appointment fetch; only the most recently issued ticket may land.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTicket {
    generation: u64,
    date_from: NaiveDate,
    date_to: NaiveDate,
}

impl FetchTicket {
    pub fn date_from(&self) -> NaiveDate {
        self.date_from
    }

    pub fn date_to(&self) -> NaiveDate {
        self.date_to
    }

    pub fn covers(&self, date: NaiveDate) -> bool {
        self.date_from <= date && date <= self.date_to
    }
}

/// Local copy of the backend's appointments for the loaded date range.
///
/// `revision` increases on every change so dependants (the occupancy index)
/// can tell when they are stale.
#[derive(Debug, Default)]
pub struct AppointmentCache {
    appointments: Vec<Appointment>,
    range: Option<(NaiveDate, NaiveDate)>,
    revision: u64,
    latest_generation: u64,
}

impl AppointmentCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin_fetch(&mut self, date_from: NaiveDate, date_to: NaiveDate) -> FetchTicket {
        self.latest_generation += 1;
        debug!(
            "Issued appointment fetch #{} for {}..={}",
            self.latest_generation, date_from, date_to
        );
        FetchTicket {
            generation: self.latest_generation,
            date_from,
            date_to,
        }
    }

    pub fn is_current(&self, ticket: &FetchTicket) -> bool {
        ticket.generation == self.latest_generation
    }

    /// Applies a fetch result unless a newer fetch (or an invalidation) superseded it.
    pub fn complete_fetch(&mut self, ticket: FetchTicket, appointments: Vec<Appointment>) -> bool {
        if !self.is_current(&ticket) {
            warn!(
                "Discarding stale appointment fetch #{} for {}..={} (latest is #{})",
                ticket.generation, ticket.date_from, ticket.date_to, self.latest_generation
            );
            return false;
        }

        debug!(
            "Loaded {} appointment(s) for {}..={}",
            appointments.len(),
            ticket.date_from,
            ticket.date_to
        );
        self.appointments = appointments;
        self.range = Some((ticket.date_from, ticket.date_to));
        self.touch();
        true
    }

    /// Fetches `date_from..=date_to` and applies it. `Ok(false)` means the result was stale.
    pub async fn refresh(
        &mut self,
        backend: &dyn SchedulerBackend,
        date_from: NaiveDate,
        date_to: NaiveDate,
    ) -> Result<bool, SchedulingError> {
        let ticket = self.begin_fetch(date_from, date_to);
        let appointments = backend.fetch_appointments(date_from, date_to).await?;
        Ok(self.complete_fetch(ticket, appointments))
    }

    /// Drops everything; in-flight fetches issued before this call are discarded on arrival.
    pub fn invalidate(&mut self) {
        self.appointments.clear();
        self.range = None;
        self.latest_generation += 1;
        self.touch();
    }

    pub fn covers(&self, date: NaiveDate) -> bool {
        matches!(self.range, Some((from, to)) if from <= date && date <= to)
    }

    /// Inserts or replaces by id. Once a range is loaded, an appointment
    /// outside it is dropped from the cache instead, since the view would
    /// never show it. With nothing loaded every confirmed appointment is kept.
    pub fn upsert(&mut self, appointment: Appointment) {
        let in_range = self.range.is_none() || self.covers(appointment.date);
        let position = self.appointments.iter().position(|apt| apt.id == appointment.id);

        match (position, in_range) {
            (Some(pos), true) => self.appointments[pos] = appointment,
            (Some(pos), false) => {
                self.appointments.remove(pos);
            }
            (None, true) => self.appointments.push(appointment),
            (None, false) => {
                debug!("Appointment {} on {} is outside the loaded range", appointment.id, appointment.date);
                return;
            }
        }
        self.touch();
    }

    pub fn remove(&mut self, id: &str) -> Option<Appointment> {
        let position = self.appointments.iter().position(|apt| apt.id == id)?;
        let removed = self.appointments.remove(position);
        self.touch();
        Some(removed)
    }

    pub fn get(&self, id: &str) -> Option<&Appointment> {
        self.appointments.iter().find(|apt| apt.id == id)
    }

    pub fn appointments(&self) -> &[Appointment] {
        &self.appointments
    }

    pub fn range(&self) -> Option<(NaiveDate, NaiveDate)> {
        self.range
    }

    pub fn is_loaded(&self) -> bool {
        self.range.is_some()
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    fn touch(&mut self) {
        self.revision += 1;
    }
}
