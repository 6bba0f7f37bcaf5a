//! Test fixtures for panel cache testing.
//!
//! Provides seeded patient, task, appointment and location records.

use serde_json::{Value, json};

/// A patient fixture.
#[derive(Debug, Clone)]
pub struct PatientFixture {
    pub id: String,
    pub given: Option<String>,
    pub family: String,
}

impl PatientFixture {
    pub fn new(id: &str, family: &str) -> Self {
        Self {
            id: id.to_string(),
            given: None,
            family: family.to_string(),
        }
    }

    pub fn with_given(mut self, given: &str) -> Self {
        self.given = Some(given.to_string());
        self
    }

    pub fn to_json(&self) -> Value {
        let mut value = json!({
            "resourceType": "Patient",
            "id": self.id,
            "familyName": self.family,
        });
        if let Some(given) = &self.given {
            value["givenName"] = json!(given);
        }
        value
    }
}

/// A task fixture.
#[derive(Debug, Clone)]
pub struct TaskFixture {
    pub id: String,
    pub patient_id: String,
    pub title: String,
    pub status: String,
    pub owner: Option<String>,
    pub priority: Option<u32>,
}

impl TaskFixture {
    pub fn new(id: &str, patient_id: &str, title: &str) -> Self {
        Self {
            id: id.to_string(),
            patient_id: patient_id.to_string(),
            title: title.to_string(),
            status: "ready".to_string(),
            owner: None,
            priority: None,
        }
    }

    pub fn with_status(mut self, status: &str) -> Self {
        self.status = status.to_string();
        self
    }

    pub fn with_owner(mut self, owner: &str) -> Self {
        self.owner = Some(owner.to_string());
        self
    }

    pub fn with_priority(mut self, priority: u32) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn to_json(&self) -> Value {
        let mut value = json!({
            "resourceType": "Task",
            "id": self.id,
            "patientId": self.patient_id,
            "title": self.title,
            "status": self.status,
        });
        if let Some(owner) = &self.owner {
            value["owner"] = json!(owner);
        }
        if let Some(priority) = self.priority {
            value["rank"] = json!(priority);
        }
        value
    }
}

/// Collection of test fixtures.
#[derive(Debug, Clone, Default)]
pub struct TestFixtures {
    pub patients: Vec<PatientFixture>,
    pub tasks: Vec<TaskFixture>,
    pub extra: Vec<Value>,
}

impl TestFixtures {
    /// Two patients with three tasks, one of them for an unknown patient.
    pub fn minimal() -> Self {
        Self {
            patients: vec![
                PatientFixture::new("p-1", "Lovelace").with_given("Ada"),
                PatientFixture::new("p-2", "Turing").with_given("Alan"),
            ],
            tasks: vec![
                TaskFixture::new("t-1", "p-1", "Call back").with_priority(2),
                TaskFixture::new("t-2", "p-2", "Refill prescription")
                    .with_owner("amy")
                    .with_priority(1),
                TaskFixture::new("t-3", "p-9", "Schedule follow-up").with_status("in-progress"),
            ],
            extra: vec![
                json!({"resourceType": "Location", "id": "l-1", "name": "Ward 3"}),
                json!({
                    "resourceType": "Appointment",
                    "id": "a-1",
                    "patientId": "p-1",
                    "locationId": "l-1",
                    "status": "booked"
                }),
            ],
        }
    }

    /// `patients` patients with `tasks_per_patient` tasks each.
    ///
    /// Tasks are interleaved across patients so task pages mix patients.
    pub fn bulk(patients: usize, tasks_per_patient: usize) -> Self {
        let patient_fixtures = (0..patients)
            .map(|i| PatientFixture::new(&format!("p-{i:03}"), &format!("Family{i:03}")).with_given("Pat"))
            .collect();
        let tasks = (0..tasks_per_patient)
            .flat_map(|n| {
                (0..patients).map(move |i| {
                    TaskFixture::new(
                        &format!("t-{i:03}-{n:02}"),
                        &format!("p-{i:03}"),
                        &format!("Task {n} for patient {i}"),
                    )
                })
            })
            .collect();
        Self {
            patients: patient_fixtures,
            tasks,
            extra: Vec::new(),
        }
    }

    /// All records as API seed values.
    pub fn all_resources(&self) -> Vec<Value> {
        self.patients
            .iter()
            .map(PatientFixture::to_json)
            .chain(self.tasks.iter().map(TaskFixture::to_json))
            .chain(self.extra.iter().cloned())
            .collect()
    }
}
