use assert_matches::assert_matches;
use chrono::NaiveDate;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use scheduling_cell::{AppointmentPatch, AppointmentStatus, Scheduler, SchedulingError, TimeOfDay};
use shared_utils::test_utils::{MockBackendResponses, TestConfig};

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 1, d).unwrap()
}

fn time(raw: &str) -> TimeOfDay {
    raw.parse().unwrap()
}

async fn mount_operatories(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/operatories"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockBackendResponses::operatory_response("OP1", "Dr. X"),
            MockBackendResponses::operatory_response("OP2", "Dr. Y")
        ])))
        .mount(server)
        .await;
}

async fn mount_appointments(server: &MockServer, date: &str, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/appointments"))
        .and(query_param("date_from", date))
        .and(query_param("date_to", date))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

/// Scheduler on 2025-01-10 with operatories loaded and one 09:00-09:40 booking in OP1.
async fn loaded_scheduler(server: &MockServer) -> Scheduler {
    mount_operatories(server).await;
    mount_appointments(
        server,
        "2025-01-10",
        json!([{
            "id": "a1", "patient_id": "p1", "patient_name": "Ada", "date": "2025-01-10",
            "start_time": "09:00", "end_time": "09:40", "operatory": "OP1",
            "provider": "Dr. X", "procedure_type": "Exam", "status": "Scheduled"
        }]),
    )
    .await;

    let config = TestConfig::with_base_url(&server.uri()).to_app_config();
    let mut scheduler = Scheduler::from_config(&config, day(10));
    scheduler.load_operatories().await.unwrap();
    assert!(scheduler.refresh_active_date().await.unwrap());
    scheduler
}

#[tokio::test]
async fn test_booking_boundary_is_exclusive() {
    let server = MockServer::start().await;
    let mut scheduler = loaded_scheduler(&server).await;

    assert!(scheduler.is_slot_occupied(time("09:00"), "OP1"));
    assert!(scheduler.is_slot_occupied(time("09:30"), "OP1"));
    assert!(!scheduler.is_slot_occupied(time("09:40"), "OP1"));
    assert!(!scheduler.is_slot_occupied(time("09:00"), "OP2"));

    let hit = scheduler.occupying_appointment(time("09:10"), "OP1").map(|apt| apt.id.clone());
    assert_eq!(hit.as_deref(), Some("a1"));
}

#[tokio::test]
async fn test_grid_follows_backend_config() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/scheduler-config"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(MockBackendResponses::scheduler_config_response(8, 9, 30)),
        )
        .mount(&server)
        .await;

    let config = TestConfig::with_base_url(&server.uri()).to_app_config();
    let mut scheduler = Scheduler::from_config(&config, day(10));
    scheduler.load_config().await.unwrap();

    let labels: Vec<String> = scheduler.slots().iter().map(ToString::to_string).collect();
    assert_eq!(labels, vec!["08:00", "08:30"]);
}

#[tokio::test]
async fn test_invalid_backend_config_falls_back_to_default() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/scheduler-config"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "startHour": "8", "endHour": 17, "slotInterval": 10
        })))
        .mount(&server)
        .await;

    let config = TestConfig::with_base_url(&server.uri()).to_app_config();
    let mut scheduler = Scheduler::from_config(&config, day(10));
    let adopted = scheduler.load_config().await.unwrap();

    assert_eq!(adopted, scheduling_cell::SchedulerConfig::default());
    assert_eq!(scheduler.slots().first().map(ToString::to_string).as_deref(), Some("08:00"));
}

/// Occupied/free answer for every rendered slot in every operatory.
fn occupancy_snapshot(scheduler: &mut Scheduler) -> Vec<(String, String, bool)> {
    let slots = scheduler.slots();
    let operatory_ids: Vec<String> = scheduler.operatories().iter().map(|op| op.id.clone()).collect();

    let mut snapshot = Vec::new();
    for operatory_id in &operatory_ids {
        for slot in &slots {
            let occupied = scheduler.is_slot_occupied(*slot, operatory_id);
            snapshot.push((operatory_id.clone(), slot.to_string(), occupied));
        }
    }
    snapshot
}

#[tokio::test]
async fn test_rebuilds_are_idempotent_and_tracked() {
    let server = MockServer::start().await;
    let mut scheduler = loaded_scheduler(&server).await;

    let first = occupancy_snapshot(&mut scheduler);
    let rebuilds = scheduler.index_rebuilds();
    assert!(first.iter().any(|(_, _, occupied)| *occupied));
    assert!(first.iter().any(|(_, _, occupied)| !*occupied));

    let second = occupancy_snapshot(&mut scheduler);
    assert_eq!(first, second);
    assert_eq!(scheduler.index_rebuilds(), rebuilds);

    assert!(scheduler.refresh_active_date().await.unwrap());
    let third = occupancy_snapshot(&mut scheduler);
    assert_eq!(first, third);
    assert_eq!(scheduler.index_rebuilds(), rebuilds + 1);
}

#[tokio::test]
async fn test_nested_create_without_procedure_is_rejected_locally() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/appointments"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;
    let mut scheduler = loaded_scheduler(&server).await;

    let result = scheduler
        .create_appointment_from_value(json!({
            "patient": {"first_name": "Grace", "last_name": "Hopper"},
            "appointment": {"operatory": "OP1", "provider": "Dr. X"}
        }))
        .await;

    assert_matches!(
        result,
        Err(SchedulingError::MissingRequiredField { ref fields }) if fields == &vec!["procedure_type".to_string()]
    );
}

#[tokio::test]
async fn test_create_posts_canonical_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/appointments"))
        .and(header("authorization", "Bearer test-api-token"))
        .and(body_partial_json(json!({
            "patient_id": "NEW",
            "date": "2025-01-10",
            "start_time": "10:00",
            "duration": 30,
            "operatory": "OP2",
            "provider": "Dr. Y",
            "procedure_type": "Cleaning",
            "status": "Scheduled",
            "patient": {"first_name": "Grace"}
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "appointment": MockBackendResponses::appointment_response("a2", "2025-01-10", "10:00", 30, "OP2")
        })))
        .expect(1)
        .mount(&server)
        .await;
    let mut scheduler = loaded_scheduler(&server).await;

    scheduler.select_slot(time("10:00"), "OP2");
    let created = scheduler
        .create_appointment_from_value(json!({
            "patient": {"first_name": "Grace"},
            "appointment": {"procedure_type": "Cleaning"}
        }))
        .await
        .unwrap();

    assert_eq!(created.id, "a2");
    assert_eq!(created.end_time, time("10:30"));
    assert!(scheduler.is_slot_occupied(time("10:20"), "OP2"));
}

#[tokio::test]
async fn test_backend_rejection_surfaces_its_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/appointments"))
        .respond_with(
            ResponseTemplate::new(409)
                .set_body_json(MockBackendResponses::error_response("Slot already booked", "conflict")),
        )
        .mount(&server)
        .await;
    let mut scheduler = loaded_scheduler(&server).await;
    let before = scheduler.appointments().len();

    let result = scheduler
        .create_appointment_from_value(json!({
            "patientId": "p1", "operatory": "OP1", "provider": "Dr. X",
            "procedureType": "Exam", "time": "09:00"
        }))
        .await;

    assert_eq!(result, Err(SchedulingError::RemoteFailure("Slot already booked".to_string())));
    assert_eq!(scheduler.appointments().len(), before);
}

#[tokio::test]
async fn test_update_puts_merged_appointment() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/appointments/a1"))
        .and(body_partial_json(json!({
            "patient_id": "p1",
            "start_time": "11:00",
            "duration": 40,
            "operatory": "OP1",
            "procedure_type": "Exam"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(
            MockBackendResponses::appointment_response("a1", "2025-01-10", "11:00", 40, "OP1"),
        ))
        .expect(1)
        .mount(&server)
        .await;
    let mut scheduler = loaded_scheduler(&server).await;

    let patch = AppointmentPatch {
        start_time: Some(time("11:00")),
        ..AppointmentPatch::default()
    };
    scheduler.update_appointment("a1", patch).await.unwrap();

    assert!(!scheduler.is_slot_occupied(time("09:00"), "OP1"));
    assert!(scheduler.is_slot_occupied(time("11:30"), "OP1"));
}

#[tokio::test]
async fn test_status_change_uses_status_endpoint() {
    let server = MockServer::start().await;
    let mut confirmed = MockBackendResponses::appointment_response("a1", "2025-01-10", "09:00", 40, "OP1");
    confirmed["status"] = json!("Confirmed");
    Mock::given(method("PATCH"))
        .and(path("/appointments/a1/status"))
        .and(body_partial_json(json!({"status": "Confirmed"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(confirmed))
        .expect(1)
        .mount(&server)
        .await;
    let mut scheduler = loaded_scheduler(&server).await;

    let updated = scheduler
        .set_appointment_status("a1", AppointmentStatus::Confirmed)
        .await
        .unwrap();
    assert_eq!(updated.status, AppointmentStatus::Confirmed);
    assert_eq!(
        scheduler.appointment("a1").map(|apt| apt.status),
        Some(AppointmentStatus::Confirmed)
    );
}

#[tokio::test]
async fn test_failed_delete_keeps_appointment() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/appointments/a1"))
        .respond_with(ResponseTemplate::new(500).set_body_string(""))
        .expect(1)
        .mount(&server)
        .await;
    let mut scheduler = loaded_scheduler(&server).await;

    let result = scheduler.delete_appointment("a1").await;
    assert_matches!(result, Err(SchedulingError::RemoteFailure(ref message)) if message == scheduling_cell::REMOTE_FAILURE_MESSAGE);
    assert!(scheduler.is_slot_occupied(time("09:00"), "OP1"));
}

#[tokio::test]
async fn test_delete_frees_the_slot() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/appointments/a1"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    let mut scheduler = loaded_scheduler(&server).await;

    scheduler.delete_appointment("a1").await.unwrap();
    assert!(!scheduler.is_slot_occupied(time("09:00"), "OP1"));
    assert_eq!(
        scheduler.delete_appointment("a1").await,
        Err(SchedulingError::NotFound("a1".to_string()))
    );
}

#[tokio::test]
async fn test_fetch_for_abandoned_date_is_discarded() {
    let server = MockServer::start().await;
    let mut scheduler = loaded_scheduler(&server).await;
    mount_appointments(
        &server,
        "2025-01-11",
        json!([MockBackendResponses::appointment_response("b1", "2025-01-11", "08:00", 30, "OP2")]),
    )
    .await;

    let stale = scheduler.begin_appointment_fetch();
    scheduler.set_active_date(day(11));
    let current = scheduler.begin_appointment_fetch();

    assert!(!scheduler.complete_appointment_fetch(stale, vec![]));
    assert!(scheduler.refresh_active_date().await.unwrap());
    assert!(!scheduler.complete_appointment_fetch(current, vec![]));

    assert!(scheduler.is_slot_occupied(time("08:10"), "OP2"));
    assert_eq!(scheduler.appointments().len(), 1);
}

#[tokio::test]
async fn test_bad_row_does_not_blank_the_day() {
    let server = MockServer::start().await;
    mount_operatories(&server).await;
    mount_appointments(
        &server,
        "2025-01-10",
        json!([
            MockBackendResponses::appointment_response("good", "2025-01-10", "09:00", 30, "OP1"),
            {
                "id": "bad", "date": "2025-01-10", "start_time": "10:00",
                "duration": 30, "operatory": "OP2", "status": "Beamed Up"
            }
        ]),
    )
    .await;

    let config = TestConfig::with_base_url(&server.uri()).to_app_config();
    let mut scheduler = Scheduler::from_config(&config, day(10));
    scheduler.load_operatories().await.unwrap();

    assert!(scheduler.refresh_active_date().await.unwrap());
    assert_eq!(scheduler.appointments().len(), 1);
    assert!(scheduler.is_slot_occupied(time("09:10"), "OP1"));
    assert!(!scheduler.is_slot_occupied(time("10:00"), "OP2"));
}
