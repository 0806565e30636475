use serde_json::{json, Value};

use shared_config::{AppConfig, DEFAULT_SLOT_WIDTH_MINUTES};

pub struct TestConfig {
    pub api_base_url: String,
    pub api_token: String,
    pub office_id: Option<String>,
    pub slot_width_minutes: u32,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8787".to_string(),
            api_token: "test-api-token".to_string(),
            office_id: None,
            slot_width_minutes: DEFAULT_SLOT_WIDTH_MINUTES,
        }
    }
}

impl TestConfig {
    /// Config pointing at a mock server, e.g. `wiremock::MockServer::uri()`.
    pub fn with_base_url(base_url: &str) -> Self {
        Self {
            api_base_url: base_url.trim_end_matches('/').to_string(),
            ..Self::default()
        }
    }

    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            api_base_url: self.api_base_url.clone(),
            api_token: self.api_token.clone(),
            office_id: self.office_id.clone(),
            slot_width_minutes: self.slot_width_minutes,
        }
    }
}

pub struct MockBackendResponses;

impl MockBackendResponses {
    pub fn appointment_response(id: &str, date: &str, start_time: &str, duration: u32, operatory: &str) -> Value {
        json!({
            "id": id,
            "patient_id": "patient-1",
            "patient_name": "Test Patient",
            "date": date,
            "start_time": start_time,
            "duration": duration,
            "operatory": operatory,
            "provider": "Dr. Test",
            "procedure_type": "Exam",
            "status": "Scheduled",
            "notes": null
        })
    }

    pub fn operatory_response(id: &str, provider: &str) -> Value {
        json!({
            "id": id,
            "name": format!("Operatory {}", id),
            "provider": provider
        })
    }

    pub fn scheduler_config_response(start_hour: i64, end_hour: i64, slot_interval: i64) -> Value {
        json!({
            "startHour": start_hour,
            "endHour": end_hour,
            "slotInterval": slot_interval
        })
    }

    pub fn error_response(message: &str, code: &str) -> Value {
        json!({
            "error": {
                "message": message,
                "code": code
            }
        })
    }
}
