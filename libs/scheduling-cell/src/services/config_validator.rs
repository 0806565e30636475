// libs/scheduling-cell/src/services/config_validator.rs
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::models::{SchedulerConfig, SchedulingError};

/// Gatekeeper between the backend's scheduler config payload and the time grid.
pub struct SchedulerConfigValidator;

impl SchedulerConfigValidator {
    /// Accepts only integer hours in `[0, 24)` with `end_hour > start_hour`
    /// and a positive integer `slot_interval`. Keys may be camelCase or snake_case.
    pub fn validate(candidate: &Value) -> Result<SchedulerConfig, SchedulingError> {
        let fields = candidate
            .as_object()
            .ok_or_else(|| SchedulingError::InvalidConfig(format!("expected an object, got {}", candidate)))?;

        let start_hour = integer_field(fields, "startHour", "start_hour")?;
        let end_hour = integer_field(fields, "endHour", "end_hour")?;
        let slot_interval = integer_field(fields, "slotInterval", "slot_interval")?;

        if !(0..24).contains(&start_hour) {
            return Err(SchedulingError::InvalidConfig(format!("startHour {} outside [0, 24)", start_hour)));
        }
        if !(0..24).contains(&end_hour) {
            return Err(SchedulingError::InvalidConfig(format!("endHour {} outside [0, 24)", end_hour)));
        }
        if end_hour <= start_hour {
            return Err(SchedulingError::InvalidConfig(format!(
                "endHour {} must be after startHour {}",
                end_hour, start_hour
            )));
        }
        if slot_interval <= 0 {
            return Err(SchedulingError::InvalidConfig(format!("slotInterval {} must be positive", slot_interval)));
        }
        let slot_interval = u32::try_from(slot_interval)
            .map_err(|_| SchedulingError::InvalidConfig(format!("slotInterval {} is too large", slot_interval)))?;

        Ok(SchedulerConfig {
            start_hour: start_hour as u32,
            end_hour: end_hour as u32,
            slot_interval,
        })
    }

    /// Validates `candidate`, keeping `current` (and logging why) when it is rejected.
    pub fn validate_or_keep(candidate: &Value, current: SchedulerConfig) -> SchedulerConfig {
        match Self::validate(candidate) {
            Ok(config) => {
                debug!("Adopted scheduler config {:?}", config);
                config
            }
            Err(e) => {
                warn!("Ignoring scheduler config from backend ({}), keeping {:?}", e, current);
                current
            }
        }
    }
}

fn integer_field(fields: &Map<String, Value>, camel: &str, snake: &str) -> Result<i64, SchedulingError> {
    let value = fields
        .get(camel)
        .or_else(|| fields.get(snake))
        .ok_or_else(|| SchedulingError::InvalidConfig(format!("{} is missing", camel)))?;

    value
        .as_i64()
        .ok_or_else(|| SchedulingError::InvalidConfig(format!("{} must be an integer, got {}", camel, value)))
}
