//! Patient/task worklist views.
//!
//! Views are derived from one [`CacheSnapshot`] and never stored. Patients
//! carry their tasks; tasks carry a copy of their patient (without tasks) and
//! flattened name fields so search and sort can treat a task row as flat.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::cache::{CacheSnapshot, ResourceCache};
use crate::search::{SearchRow, collect_text};
use crate::types::{Patient, ResourceKind, ResourceRecord, Task};

/// A patient with its tasks.
#[derive(Debug, Clone, PartialEq)]
pub struct WorklistPatient {
    /// The patient record.
    pub patient: Patient,
    /// Cache revision of the patient record.
    pub revision: u64,
    /// Given and family name, or the id.
    pub display_name: String,
    /// Tasks whose `patient_id` is this patient, in cache order.
    pub tasks: Vec<WorklistTask>,
}

impl WorklistPatient {
    fn bare(patient: &Patient, revision: u64) -> Self {
        Self {
            display_name: patient.display_name(),
            patient: patient.clone(),
            revision,
            tasks: Vec::new(),
        }
    }

    /// The patient id.
    pub fn id(&self) -> &str {
        &self.patient.id
    }
}

/// A task with its patient attached.
#[derive(Debug, Clone, PartialEq)]
pub struct WorklistTask {
    /// The task record.
    pub task: Task,
    /// Cache revision of the task record.
    pub revision: u64,
    /// The owning patient, when loaded. Its `tasks` list is empty.
    pub patient: Option<WorklistPatient>,
    /// The patient's display name, when loaded.
    pub patient_display_name: Option<String>,
    /// The patient's given name, when known.
    pub patient_given_name: Option<String>,
    /// The patient's family name, when known.
    pub patient_family_name: Option<String>,
}

impl WorklistTask {
    fn new(task: &Task, revision: u64, patient: Option<WorklistPatient>) -> Self {
        Self {
            task: task.clone(),
            revision,
            patient_display_name: patient.as_ref().map(|p| p.display_name.clone()),
            patient_given_name: patient.as_ref().and_then(|p| p.patient.given_name.clone()),
            patient_family_name: patient.as_ref().and_then(|p| p.patient.family_name.clone()),
            patient,
        }
    }

    /// The task id.
    pub fn id(&self) -> &str {
        &self.task.id
    }
}

/// Patients and tasks joined from one cache snapshot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorklistView {
    /// Patients in cache order.
    pub patients: Vec<WorklistPatient>,
    /// Tasks in cache order.
    pub tasks: Vec<WorklistTask>,
    /// Cache version the view was built from.
    pub version: u64,
}

impl WorklistView {
    /// Joins the patient and task tables of `snapshot`.
    pub fn from_snapshot(snapshot: &CacheSnapshot) -> Self {
        let bare: HashMap<&str, WorklistPatient> = patients_of(snapshot.records(ResourceKind::Patient))
            .map(|(patient, revision)| (patient.id.as_str(), WorklistPatient::bare(patient, revision)))
            .collect();

        let tasks: Vec<WorklistTask> = tasks_of(snapshot.records(ResourceKind::Task))
            .map(|(task, revision)| {
                let patient = task
                    .patient_id
                    .as_deref()
                    .and_then(|id| bare.get(id))
                    .cloned();
                WorklistTask::new(task, revision, patient)
            })
            .collect();

        let mut grouped: HashMap<&str, Vec<WorklistTask>> = HashMap::new();
        for task in &tasks {
            if let Some(patient_id) = task.task.patient_id.as_deref() {
                grouped.entry(patient_id).or_default().push(task.clone());
            }
        }

        let patients = patients_of(snapshot.records(ResourceKind::Patient))
            .map(|(patient, revision)| WorklistPatient {
                tasks: grouped.remove(patient.id.as_str()).unwrap_or_default(),
                ..WorklistPatient::bare(patient, revision)
            })
            .collect();

        Self {
            patients,
            tasks,
            version: snapshot.version(),
        }
    }
}

/// Builds the worklist from the current cache contents.
pub fn build_worklist_view(cache: &ResourceCache) -> WorklistView {
    WorklistView::from_snapshot(&cache.snapshot())
}

fn patients_of(records: &[Arc<ResourceRecord>]) -> impl Iterator<Item = (&Patient, u64)> {
    records
        .iter()
        .filter_map(|r| r.data().as_patient().map(|p| (p, r.revision())))
}

fn tasks_of(records: &[Arc<ResourceRecord>]) -> impl Iterator<Item = (&Task, u64)> {
    records
        .iter()
        .filter_map(|r| r.data().as_task().map(|t| (t, r.revision())))
}

fn patient_value(patient: &WorklistPatient) -> Map<String, Value> {
    let mut object = match serde_json::to_value(&patient.patient) {
        Ok(Value::Object(object)) => object,
        _ => Map::new(),
    };
    object.insert("displayName".to_string(), Value::String(patient.display_name.clone()));
    object
}

fn task_value(task: &WorklistTask) -> Map<String, Value> {
    let mut object = match serde_json::to_value(&task.task) {
        Ok(Value::Object(object)) => object,
        _ => Map::new(),
    };
    let names = [
        ("patientDisplayName", &task.patient_display_name),
        ("patientGivenName", &task.patient_given_name),
        ("patientFamilyName", &task.patient_family_name),
    ];
    for (key, value) in names {
        if let Some(value) = value {
            object.insert(key.to_string(), Value::String(value.clone()));
        }
    }
    object
}

impl SearchRow for WorklistPatient {
    fn to_value(&self) -> Value {
        let mut object = patient_value(self);
        let tasks = self.tasks.iter().map(|t| Value::Object(task_value(t))).collect();
        object.insert("tasks".to_string(), Value::Array(tasks));
        Value::Object(object)
    }

    fn search_text(&self) -> String {
        collect_text(&Value::Object(patient_value(self)))
    }
}

impl SearchRow for WorklistTask {
    fn to_value(&self) -> Value {
        let mut object = task_value(self);
        if let Some(patient) = &self.patient {
            object.insert("patient".to_string(), Value::Object(patient_value(patient)));
        }
        Value::Object(object)
    }

    fn search_text(&self) -> String {
        collect_text(&Value::Object(task_value(self)))
    }
}
