//! Notifications emitted by the patient store to subscribed screens.

use crate::types::{PatientId, PatientStatus, TriageCall};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Reason a local optimistic edit disagreed with the server view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DivergenceKind {
    /// A local-only status was replaced by the server's status.
    StatusOverwritten {
        local: PatientStatus,
        server: PatientStatus,
    },
    /// A locally completed patient is still queued on the server.
    CompletedLocallyStillQueued { server: PatientStatus },
}

/// Record of a local edit the server has not confirmed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Divergence {
    pub patient_id: PatientId,
    pub kind: DivergenceKind,
    pub detected_at: DateTime<Utc>,
}

/// Events emitted after the store changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type", content = "payload")]
pub enum StoreEvent {
    /// The patient list was replaced by a refresh.
    PatientsRefreshed { generation: u64, count: usize },
    /// A single patient changed locally.
    PatientUpdated {
        patient_id: PatientId,
        status: PatientStatus,
    },
    /// A patient was removed locally.
    PatientRemoved { patient_id: PatientId },
    /// The recent-calls list changed, locally or from another context.
    CallsChanged { calls: Vec<TriageCall> },
    /// A refresh disagreed with a local-only edit.
    Divergence(Divergence),
}

/// Sink for store events.
pub trait EventSink: Send + Sync {
    /// Emit an event to subscribers.
    fn emit(&self, event: StoreEvent);
}
