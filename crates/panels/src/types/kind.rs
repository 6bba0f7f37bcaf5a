//! Resource kind discriminator.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The type discriminator for a cached record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ResourceKind {
    /// A patient record.
    Patient,
    /// A care-coordination task, owned by a patient.
    Task,
    /// A scheduled appointment for a patient at a location.
    Appointment,
    /// A care location.
    Location,
}

/// How records of one kind pull in records of another kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkedFetch {
    /// Records of `kind` whose `field` holds one of the loaded ids
    /// (patients pull in their tasks).
    Referencing {
        /// Kind of the linked records.
        kind: ResourceKind,
        /// Foreign-key field on the linked records.
        field: &'static str,
    },
    /// Records of `kind` that the loaded records point at through `field`
    /// (tasks pull in their patient).
    Referenced {
        /// Kind of the linked records.
        kind: ResourceKind,
        /// Foreign-key field on the loaded records.
        field: &'static str,
    },
}

impl LinkedFetch {
    /// The kind of record this link fetches.
    pub fn kind(&self) -> ResourceKind {
        match self {
            LinkedFetch::Referencing { kind, .. } | LinkedFetch::Referenced { kind, .. } => *kind,
        }
    }
}

impl ResourceKind {
    /// All kinds, in declaration order.
    pub const ALL: [ResourceKind; 4] = [
        ResourceKind::Patient,
        ResourceKind::Task,
        ResourceKind::Appointment,
        ResourceKind::Location,
    ];

    /// The `resourceType` name used on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Patient => "Patient",
            ResourceKind::Task => "Task",
            ResourceKind::Appointment => "Appointment",
            ResourceKind::Location => "Location",
        }
    }

    /// Linked kinds fetched after a page of this kind is loaded, so the
    /// worklist join is complete for the records just loaded.
    pub fn linked(&self) -> &'static [LinkedFetch] {
        const PATIENT: &[LinkedFetch] = &[LinkedFetch::Referencing {
            kind: ResourceKind::Task,
            field: "patientId",
        }];
        const TASK: &[LinkedFetch] = &[LinkedFetch::Referenced {
            kind: ResourceKind::Patient,
            field: "patientId",
        }];
        const APPOINTMENT: &[LinkedFetch] = &[
            LinkedFetch::Referenced {
                kind: ResourceKind::Patient,
                field: "patientId",
            },
            LinkedFetch::Referenced {
                kind: ResourceKind::Location,
                field: "locationId",
            },
        ];

        match self {
            ResourceKind::Patient => PATIENT,
            ResourceKind::Task => TASK,
            ResourceKind::Appointment => APPOINTMENT,
            ResourceKind::Location => &[],
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "patient" => Ok(ResourceKind::Patient),
            "task" => Ok(ResourceKind::Task),
            "appointment" => Ok(ResourceKind::Appointment),
            "location" => Ok(ResourceKind::Location),
            other => Err(format!("unknown resource kind: {other}")),
        }
    }
}
