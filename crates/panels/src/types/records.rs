//! Typed clinical records.
//!
//! Each record has a typed core schema plus an `extensions` map that captures
//! every other key in the payload (per-organization custom fields). Wire names
//! are camelCase, matching the remote API.
//!
//! Core fields decode leniently: a value of an unexpected type (a numeric
//! `priority`, a date-only `start`) leaves the typed field empty and is kept
//! verbatim in `extensions`, so it survives re-encoding.

// Record fields mirror the wire schema
#![allow(missing_docs)]

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::RecordError;

use super::ResourceKind;

/// Custom fields carried alongside the typed core of a record.
pub type Extensions = BTreeMap<String, Value>;

/// Decodes a core field, falling back to its default when the wire value has
/// another shape. [`Resource::decode`] moves the raw value into `extensions`.
fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).unwrap_or_default())
}

/// A patient record.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Patient {
    pub id: String,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub given_name: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub family_name: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    /// Medical record number.
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub mrn: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
    #[serde(flatten)]
    pub extensions: Extensions,
}

impl Patient {
    /// Given and family name joined by a space, or the id when both are
    /// missing.
    pub fn display_name(&self) -> String {
        let parts: Vec<&str> = [self.given_name.as_deref(), self.family_name.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect();

        if parts.is_empty() {
            self.id.clone()
        } else {
            parts.join(" ")
        }
    }
}

/// A note appended to a task.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskNote {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl TaskNote {
    /// Creates a note stamped with the current time.
    pub fn new(author: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            author: Some(author.into()),
            text: text.into(),
            created_at: Some(Utc::now()),
        }
    }
}

/// A care-coordination task.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    /// Owning patient.
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub patient_id: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
    /// User currently responsible for the task.
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<TaskNote>,
    #[serde(flatten)]
    pub extensions: Extensions,
}

/// A scheduled appointment.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    pub id: String,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub patient_id: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub location_id: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub start: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub end: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(flatten)]
    pub extensions: Extensions,
}

/// A care location.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub id: String,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(flatten)]
    pub extensions: Extensions,
}

/// A decoded record of any kind.
#[derive(Debug, Clone, PartialEq)]
pub enum Resource {
    Patient(Patient),
    Task(Task),
    Appointment(Appointment),
    Location(Location),
}

impl Resource {
    /// Decodes a raw API payload as a record of `kind`.
    ///
    /// A `resourceType` key, when present, must name `kind`; it is not kept in
    /// the extensions.
    pub fn decode(kind: ResourceKind, value: Value) -> Result<Self, RecordError> {
        let Value::Object(mut object) = value else {
            return Err(RecordError::NotAnObject { kind });
        };

        if let Some(Value::String(declared)) = object.remove("resourceType") {
            if let Ok(actual) = declared.parse::<ResourceKind>() {
                if actual != kind {
                    return Err(RecordError::KindMismatch {
                        expected: kind,
                        actual,
                    });
                }
            }
        }

        if !matches!(object.get("id"), Some(Value::String(id)) if !id.is_empty()) {
            return Err(RecordError::MissingId { kind });
        }

        let raw = object.clone();
        let value = Value::Object(object);
        let decode_err = |err: serde_json::Error| RecordError::Decode {
            kind,
            message: err.to_string(),
        };

        let mut resource = match kind {
            ResourceKind::Patient => Resource::Patient(serde_json::from_value(value).map_err(decode_err)?),
            ResourceKind::Task => Resource::Task(serde_json::from_value(value).map_err(decode_err)?),
            ResourceKind::Appointment => {
                Resource::Appointment(serde_json::from_value(value).map_err(decode_err)?)
            }
            ResourceKind::Location => Resource::Location(serde_json::from_value(value).map_err(decode_err)?),
        };

        // Keep raw values the typed core could not hold.
        let encoded = resource.to_value();
        let extensions = resource.extensions_mut();
        for (key, value) in raw {
            if !value.is_null() && encoded.get(&key).is_none() {
                extensions.insert(key, value);
            }
        }
        Ok(resource)
    }

    /// Encodes the record as JSON, including its `resourceType`.
    pub fn to_value(&self) -> Value {
        let encoded = match self {
            Resource::Patient(patient) => serde_json::to_value(patient),
            Resource::Task(task) => serde_json::to_value(task),
            Resource::Appointment(appointment) => serde_json::to_value(appointment),
            Resource::Location(location) => serde_json::to_value(location),
        };

        let mut value = encoded.unwrap_or_default();
        if let Value::Object(object) = &mut value {
            object.insert(
                "resourceType".to_string(),
                Value::String(self.kind().as_str().to_string()),
            );
        }
        value
    }

    /// Returns the record's kind.
    pub fn kind(&self) -> ResourceKind {
        match self {
            Resource::Patient(_) => ResourceKind::Patient,
            Resource::Task(_) => ResourceKind::Task,
            Resource::Appointment(_) => ResourceKind::Appointment,
            Resource::Location(_) => ResourceKind::Location,
        }
    }

    /// Returns the record's id.
    pub fn id(&self) -> &str {
        match self {
            Resource::Patient(patient) => &patient.id,
            Resource::Task(task) => &task.id,
            Resource::Appointment(appointment) => &appointment.id,
            Resource::Location(location) => &location.id,
        }
    }

    /// Replaces the record's id.
    pub fn set_id(&mut self, id: impl Into<String>) {
        let id = id.into();
        match self {
            Resource::Patient(patient) => patient.id = id,
            Resource::Task(task) => task.id = id,
            Resource::Appointment(appointment) => appointment.id = id,
            Resource::Location(location) => location.id = id,
        }
    }

    /// Returns the id stored in a foreign-key field.
    ///
    /// Typed fields are checked first, then string-valued extensions.
    pub fn reference(&self, field: &str) -> Option<&str> {
        let typed = match (self, field) {
            (Resource::Task(task), "patientId") => task.patient_id.as_deref(),
            (Resource::Appointment(appointment), "patientId") => appointment.patient_id.as_deref(),
            (Resource::Appointment(appointment), "locationId") => appointment.location_id.as_deref(),
            _ => None,
        };

        typed.or_else(|| self.extensions().get(field).and_then(Value::as_str))
    }

    /// Returns the record's custom fields.
    pub fn extensions(&self) -> &Extensions {
        match self {
            Resource::Patient(patient) => &patient.extensions,
            Resource::Task(task) => &task.extensions,
            Resource::Appointment(appointment) => &appointment.extensions,
            Resource::Location(location) => &location.extensions,
        }
    }

    fn extensions_mut(&mut self) -> &mut Extensions {
        match self {
            Resource::Patient(patient) => &mut patient.extensions,
            Resource::Task(task) => &mut task.extensions,
            Resource::Appointment(appointment) => &mut appointment.extensions,
            Resource::Location(location) => &mut location.extensions,
        }
    }

    /// Returns the patient, if this is a patient record.
    pub fn as_patient(&self) -> Option<&Patient> {
        match self {
            Resource::Patient(patient) => Some(patient),
            _ => None,
        }
    }

    /// Returns the task, if this is a task record.
    pub fn as_task(&self) -> Option<&Task> {
        match self {
            Resource::Task(task) => Some(task),
            _ => None,
        }
    }
}

impl From<Patient> for Resource {
    fn from(patient: Patient) -> Self {
        Resource::Patient(patient)
    }
}

impl From<Task> for Resource {
    fn from(task: Task) -> Self {
        Resource::Task(task)
    }
}

impl From<Appointment> for Resource {
    fn from(appointment: Appointment) -> Self {
        Resource::Appointment(appointment)
    }
}

impl From<Location> for Resource {
    fn from(location: Location) -> Self {
        Resource::Location(location)
    }
}
