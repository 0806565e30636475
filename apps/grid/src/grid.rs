use std::fmt::Write;

use scheduling_cell::{OccupancyIndex, Operatory, TimeOfDay};

const FREE: &str = ".";
const CONTINUED: &str = "|";

/// Text rendering of one day: a row per slot, a column per operatory.
///
/// The slot holding an appointment's start shows the patient and procedure;
/// later slots it covers show `|`.
pub fn render_grid(slots: &[TimeOfDay], operatories: &[Operatory], index: &OccupancyIndex, width: usize) -> String {
    let width = width.max(4);
    let mut out = String::new();

    let _ = write!(out, "{:<6}", index.active_date().format("%m-%d"));
    for operatory in operatories {
        let _ = write!(out, " {}", cell(&operatory.name, width));
    }
    out.push('\n');

    for slot in slots {
        let _ = write!(out, "{:<6}", slot.to_string());
        for operatory in operatories {
            let text = match index.occupying_appointment(*slot, &operatory.id) {
                Some(apt) if starts_in_slot(apt.start_time, *slot, index.slot_width()) => {
                    format!("{} {}", apt.patient_name, apt.procedure_type)
                }
                Some(_) => CONTINUED.to_string(),
                None => FREE.to_string(),
            };
            let _ = write!(out, " {}", cell(&text, width));
        }
        out.push('\n');
    }

    out
}

fn starts_in_slot(start: TimeOfDay, slot: TimeOfDay, slot_width: u32) -> bool {
    slot <= start && start < slot.add_minutes(slot_width)
}

fn cell(text: &str, width: usize) -> String {
    let trimmed = text.trim();
    let clipped: String = trimmed.chars().take(width).collect();
    format!("{:<width$}", clipped, width = width)
}
