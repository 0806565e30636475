// libs/scheduling-cell/src/services/interval.rs
use crate::models::TimeOfDay;

/// Minutes since midnight for an `HH:MM` string.
///
/// Missing or malformed components count as `0` (`"9"` is 09:00, `"xx:30"` is
/// 00:30). Anything after the minute component, such as seconds, is ignored.
pub fn to_minutes(time: &str) -> u32 {
    let mut parts = time.trim().split(':');
    let hours = parse_component(parts.next());
    let minutes = parse_component(parts.next());
    hours.saturating_mul(60).saturating_add(minutes)
}

fn parse_component(part: Option<&str>) -> u32 {
    part.and_then(|p| p.trim().parse::<u32>().ok()).unwrap_or(0)
}

/// Half-open overlap test: `[start1, end1)` against `[start2, end2)`.
///
/// Intervals that only touch (`end1 == start2`) do not overlap.
pub fn overlaps(start1: TimeOfDay, end1: TimeOfDay, start2: TimeOfDay, end2: TimeOfDay) -> bool {
    start1 < end2 && end1 > start2
}

/// [`overlaps`] over raw `HH:MM` strings, parsed with [`to_minutes`].
pub fn ranges_overlap(start1: &str, end1: &str, start2: &str, end2: &str) -> bool {
    overlaps(
        TimeOfDay::lenient(start1),
        TimeOfDay::lenient(end1),
        TimeOfDay::lenient(start2),
        TimeOfDay::lenient(end2),
    )
}

pub fn add_minutes(start: TimeOfDay, duration: u32) -> TimeOfDay {
    start.add_minutes(duration)
}

/// End of the fixed-width occupancy slot starting at `slot_start`.
pub fn slot_end(slot_start: TimeOfDay, slot_width: u32) -> TimeOfDay {
    add_minutes(slot_start, slot_width)
}
