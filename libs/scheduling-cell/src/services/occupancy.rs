// libs/scheduling-cell/src/services/occupancy.rs
use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;
use tracing::debug;

use crate::models::{Appointment, Operatory, TimeOfDay};
use crate::services::interval::{overlaps, slot_end};

/// Per-operatory view of one day's appointments.
///
/// Built from scratch from the cached appointment set; never patched in place.
#[derive(Debug, Clone)]
pub struct OccupancyIndex {
    active_date: NaiveDate,
    slot_width: u32,
    by_operatory: HashMap<String, Vec<Appointment>>,
}

impl OccupancyIndex {
    /// Keeps appointments on `active_date` whose operatory is in `operatories`,
    /// preserving their order in `appointments`. Appointments booked into a
    /// retired operatory are skipped, not removed from the source.
    pub fn build(
        appointments: &[Appointment],
        active_date: NaiveDate,
        operatories: &[Operatory],
        slot_width: u32,
    ) -> Self {
        let active: HashSet<&str> = operatories.iter().map(|op| op.id.as_str()).collect();

        let mut by_operatory: HashMap<String, Vec<Appointment>> = operatories
            .iter()
            .map(|op| (op.id.clone(), Vec::new()))
            .collect();

        let mut orphaned = 0usize;
        for appointment in appointments.iter().filter(|apt| apt.date == active_date) {
            if !active.contains(appointment.operatory.as_str()) {
                orphaned += 1;
                continue;
            }
            if let Some(bucket) = by_operatory.get_mut(&appointment.operatory) {
                bucket.push(appointment.clone());
            }
        }

        if orphaned > 0 {
            debug!("{} appointment(s) on {} reference inactive operatories and were left out", orphaned, active_date);
        }

        Self {
            active_date,
            slot_width,
            by_operatory,
        }
    }

    pub fn active_date(&self) -> NaiveDate {
        self.active_date
    }

    pub fn slot_width(&self) -> u32 {
        self.slot_width
    }

    pub fn by_operatory(&self) -> &HashMap<String, Vec<Appointment>> {
        &self.by_operatory
    }

    pub fn appointments_for(&self, operatory_id: &str) -> &[Appointment] {
        self.by_operatory
            .get(operatory_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn appointment_count(&self) -> usize {
        self.by_operatory.values().map(Vec::len).sum()
    }

    pub fn is_slot_occupied(&self, slot_start: TimeOfDay, operatory_id: &str) -> bool {
        self.occupying_appointment(slot_start, operatory_id).is_some()
    }

    /// First appointment, in source order, overlapping `[slot_start, slot_start + slot_width)`.
    pub fn occupying_appointment(&self, slot_start: TimeOfDay, operatory_id: &str) -> Option<&Appointment> {
        let end = slot_end(slot_start, self.slot_width);
        self.appointments_for(operatory_id)
            .iter()
            .find(|apt| overlaps(slot_start, end, apt.start_time, apt.end_time))
    }
}

/// Inputs an [`OccupancyIndex`] depends on. Any change means a full rebuild.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexKey {
    pub appointments_revision: u64,
    pub operatories_revision: u64,
    pub active_date: NaiveDate,
    pub slot_width: u32,
}

/// Memoized index: rebuilt only when its [`IndexKey`] changes.
#[derive(Debug, Default)]
pub struct OccupancyMemo {
    cached: Option<(IndexKey, OccupancyIndex)>,
    rebuilds: u64,
}

impl OccupancyMemo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_rebuild<F>(&mut self, key: IndexKey, build: F) -> &OccupancyIndex
    where
        F: FnOnce() -> OccupancyIndex,
    {
        let fresh = matches!(&self.cached, Some((cached_key, _)) if *cached_key == key);
        if !fresh {
            debug!("Rebuilding occupancy index for {}", key.active_date);
            self.cached = None;
            self.rebuilds += 1;
        }

        let (_, index) = self.cached.get_or_insert_with(|| (key, build()));
        index
    }

    pub fn invalidate(&mut self) {
        self.cached = None;
    }

    pub fn is_cached(&self) -> bool {
        self.cached.is_some()
    }

    pub fn rebuild_count(&self) -> u64 {
        self.rebuilds
    }
}
