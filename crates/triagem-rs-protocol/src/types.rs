//! Patient and call records shared by every screen.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Patient identifier as exposed to screens (backend ids are stringified).
pub type PatientId = String;
/// Unique identifier for a recent call.
pub type CallId = Uuid;

/// Manchester Protocol urgency level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriorityLevel {
    Red,
    Orange,
    Yellow,
    Green,
    Blue,
}

impl PriorityLevel {
    /// All levels, most urgent first.
    pub const ALL: [PriorityLevel; 5] = [
        PriorityLevel::Red,
        PriorityLevel::Orange,
        PriorityLevel::Yellow,
        PriorityLevel::Green,
        PriorityLevel::Blue,
    ];

    /// Return the level as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            PriorityLevel::Red => "red",
            PriorityLevel::Orange => "orange",
            PriorityLevel::Yellow => "yellow",
            PriorityLevel::Green => "green",
            PriorityLevel::Blue => "blue",
        }
    }
}

impl fmt::Display for PriorityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PriorityLevel {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        PriorityLevel::ALL
            .into_iter()
            .find(|level| level.as_str() == value)
            .ok_or_else(|| format!("unknown priority level: {value}"))
    }
}

/// Kind of care the patient was triaged into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttendanceType {
    Clinical,
    Psychiatric,
    Samu,
}

impl AttendanceType {
    pub const ALL: [AttendanceType; 3] = [
        AttendanceType::Clinical,
        AttendanceType::Psychiatric,
        AttendanceType::Samu,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AttendanceType::Clinical => "clinical",
            AttendanceType::Psychiatric => "psychiatric",
            AttendanceType::Samu => "samu",
        }
    }

    /// Display label used on screens.
    pub fn label(&self) -> &'static str {
        match self {
            AttendanceType::Clinical => "Clínico",
            AttendanceType::Psychiatric => "Psiquiátrico",
            AttendanceType::Samu => "SAMU",
        }
    }
}

impl fmt::Display for AttendanceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AttendanceType {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        AttendanceType::ALL
            .into_iter()
            .find(|kind| kind.as_str() == value)
            .ok_or_else(|| format!("unknown attendance type: {value}"))
    }
}

/// Position of a patient in the emergency-room flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PatientStatus {
    WaitingTriage,
    InTriage,
    WaitingDoctor,
    InConsultation,
    Completed,
}

impl PatientStatus {
    /// Ordinal along the flow; statuses only ever move to a higher rank.
    pub fn rank(&self) -> u8 {
        match self {
            PatientStatus::WaitingTriage => 0,
            PatientStatus::InTriage => 1,
            PatientStatus::WaitingDoctor => 2,
            PatientStatus::InConsultation => 3,
            PatientStatus::Completed => 4,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PatientStatus::WaitingTriage => "waiting-triage",
            PatientStatus::InTriage => "in-triage",
            PatientStatus::WaitingDoctor => "waiting-doctor",
            PatientStatus::InConsultation => "in-consultation",
            PatientStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for PatientStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a cached record reflects the server or a local optimistic edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SyncState {
    /// Last written by a refresh from the gateway.
    #[default]
    Confirmed,
    /// Changed locally without a gateway round-trip.
    LocalOnly,
}

/// Cached patient record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Patient {
    pub id: PatientId,
    pub ticket_number: String,
    pub full_name: String,
    pub date_of_birth: String,
    pub cpf: String,
    /// Local timestamp of when this record entered the cache.
    pub registered_at: DateTime<Utc>,
    pub status: PatientStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<PriorityLevel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attendance_type: Option<AttendanceType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub triage_notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_room: Option<String>,
    #[serde(default)]
    pub sync: SyncState,
}

/// Destination of a public-address call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallType {
    Triage,
    Doctor,
}

/// A ticket or patient that was just summoned.
///
/// Serialized with camelCase keys and RFC 3339 timestamps so every context
/// sharing the durable call list reads the same shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriageCall {
    pub call_id: CallId,
    pub ticket_number: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patient_name: Option<String>,
    #[serde(rename = "type")]
    pub call_type: CallType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<PriorityLevel>,
    pub timestamp: DateTime<Utc>,
}

impl TriageCall {
    /// Build a call stamped now with a fresh id.
    pub fn new(ticket_number: impl Into<String>, call_type: CallType) -> Self {
        Self {
            call_id: Uuid::new_v4(),
            ticket_number: ticket_number.into(),
            patient_name: None,
            call_type,
            room: None,
            priority: None,
            timestamp: Utc::now(),
        }
    }
}
