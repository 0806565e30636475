// libs/scheduling-cell/src/services/time_grid.rs
use crate::models::{SchedulerConfig, TimeOfDay};

/// Slot start times for one day of the grid.
///
/// Each hour in `start_hour..end_hour` restarts at minute 0 and steps by
/// `slot_interval` while the minute stays below 60.
pub fn generate_slots(config: &SchedulerConfig) -> Vec<TimeOfDay> {
    if config.slot_interval == 0 {
        return Vec::new();
    }

    let step = config.slot_interval as usize;
    (config.start_hour..config.end_hour)
        .flat_map(|hour| (0..60).step_by(step).map(move |minute| TimeOfDay::from_hm(hour, minute)))
        .collect()
}

pub fn slot_labels(config: &SchedulerConfig) -> Vec<String> {
    generate_slots(config).iter().map(ToString::to_string).collect()
}
