//! Patient cache store shared by every screen of one context.
//!
//! The store mirrors the backend's two queues, applies optimistic local edits,
//! and keeps the recent-calls list in step with other contexts through the
//! [`CallBroadcast`]. Refreshes are ordered by the generation taken when they
//! start, so a slow response never replaces a fresher one.

use crate::broadcast::CallBroadcast;
use crate::error::TriageError;
use crate::event_bus::EventBus;
use crate::reconcile::{detect_divergences, merge_queues};
use chrono::Utc;
use log::{debug, info, warn};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use triagem_rs_config::CallsConfig;
use triagem_rs_gateway::{ClassifyRequest, Gateway, NewPatientRequest};
use triagem_rs_protocol::mapping::{AttendanceTypeBackend, PriorityBackend};
use triagem_rs_protocol::{
    AttendanceType, CallType, Divergence, EventSink, Patient, PatientId, PatientStatus,
    PriorityLevel, StoreEvent, SyncState, TriageCall, is_allowed_priority,
};

/// Buffer size for the store's event channel.
const EVENT_BUFFER: usize = 256;
/// Ticket shown for a triage call when the patient has none.
const TRIAGE_TICKET_FALLBACK: &str = "SENHA";
/// Ticket shown for a doctor call when the patient has none.
const DOCTOR_TICKET_FALLBACK: &str = "N/A";

/// Result of a single refresh attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// The response replaced the cache.
    Applied { generation: u64, count: usize },
    /// A refresh that started later was already applied.
    Stale { generation: u64 },
    /// The gateway failed; the previous cache was kept.
    Failed,
}

impl RefreshOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, RefreshOutcome::Applied { .. })
    }
}

#[derive(Default)]
struct StoreState {
    patients: Vec<Patient>,
    calls: Vec<TriageCall>,
    /// Locally completed ids and the last generation started before completion.
    completed_locally: HashMap<PatientId, u64>,
    divergences: Vec<Divergence>,
    applied_generation: u64,
}

struct Inner {
    gateway: Arc<dyn Gateway>,
    broadcast: CallBroadcast,
    calls_config: CallsConfig,
    state: RwLock<StoreState>,
    next_generation: AtomicU64,
    events: EventBus,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl Inner {
    fn replace_calls(&self, calls: Vec<TriageCall>) {
        debug!("recent calls replaced from another context (count={})", calls.len());
        self.state.write().calls = calls.clone();
        self.events.emit(StoreEvent::CallsChanged { calls });
    }

    fn abort_tasks(&self) {
        for task in self.tasks.lock().drain(..) {
            task.abort();
        }
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        self.abort_tasks();
    }
}

/// Client-side cache of patients and recent calls.
#[derive(Clone)]
pub struct PatientStore {
    inner: Arc<Inner>,
}

impl PatientStore {
    /// Create a store, seeding recent calls from durable storage.
    pub fn new(
        gateway: Arc<dyn Gateway>,
        broadcast: CallBroadcast,
        calls_config: CallsConfig,
    ) -> Self {
        let calls = broadcast.load();
        info!(
            "patient store initialized (calls_key={}, persisted_calls={})",
            broadcast.key(),
            calls.len()
        );
        Self {
            inner: Arc::new(Inner {
                gateway,
                broadcast,
                calls_config,
                state: RwLock::new(StoreState {
                    calls,
                    ..StoreState::default()
                }),
                next_generation: AtomicU64::new(0),
                events: EventBus::new(EVENT_BUFFER),
                tasks: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Subscribe to store change events.
    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.inner.events.subscribe()
    }

    /// Start relaying recent-call changes from other contexts into this store.
    ///
    /// The listener holds a weak reference and ends once the store is gone.
    pub fn start_call_listener(&self) {
        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        let handle = self.inner.broadcast.spawn_listener(move |calls| {
            let Some(inner) = weak.upgrade() else {
                return false;
            };
            inner.replace_calls(calls);
            true
        });
        self.inner.tasks.lock().push(handle);
    }

    /// Stop background listeners and clear cached state.
    pub fn dispose(&self) {
        self.inner.abort_tasks();
        *self.inner.state.write() = StoreState::default();
        info!("patient store disposed");
    }

    /// Re-fetch both queues and replace the patient list.
    ///
    /// Gateway failures are logged and leave the cache untouched.
    pub async fn refresh(&self) -> RefreshOutcome {
        let generation = self.inner.next_generation.fetch_add(1, Ordering::SeqCst) + 1;
        let gateway = &self.inner.gateway;
        let (triage, doctor) =
            match tokio::try_join!(gateway.waiting_for_triage(), gateway.waiting_for_doctor()) {
                Ok(queues) => queues,
                Err(err) => {
                    warn!("refresh failed, keeping cached patients (generation={generation}): {err}");
                    return RefreshOutcome::Failed;
                }
            };

        let now = Utc::now();
        let (count, divergences) = {
            let mut state = self.inner.state.write();
            if generation < state.applied_generation {
                debug!(
                    "discarding stale refresh (generation={}, applied={})",
                    generation, state.applied_generation
                );
                return RefreshOutcome::Stale { generation };
            }
            let next = merge_queues(&state.patients, triage, doctor, now);
            let StoreState {
                patients,
                completed_locally,
                ..
            } = &mut *state;
            let divergences =
                detect_divergences(patients, &next, completed_locally, generation, now);
            *patients = next;
            state.divergences.extend(divergences.iter().cloned());
            let overflow = state
                .divergences
                .len()
                .saturating_sub(self.inner.calls_config.divergence_cap);
            state.divergences.drain(..overflow);
            state.applied_generation = generation;
            (state.patients.len(), divergences)
        };

        for divergence in divergences {
            warn!(
                "server view overrides local edit (patient_id={}, kind={:?})",
                divergence.patient_id, divergence.kind
            );
            self.inner.events.emit(StoreEvent::Divergence(divergence));
        }
        debug!("refresh applied (generation={}, patients={})", generation, count);
        self.inner
            .events
            .emit(StoreEvent::PatientsRefreshed { generation, count });
        RefreshOutcome::Applied { generation, count }
    }

    /// Register a new patient and refresh the cache.
    pub async fn register_patient(
        &self,
        full_name: &str,
        date_of_birth: &str,
        cpf: &str,
    ) -> Result<Patient, TriageError> {
        let full_name = full_name.trim();
        let cpf = cpf.trim();
        if full_name.is_empty() {
            return Err(TriageError::InvalidInput("full name is required".to_string()));
        }
        if cpf.is_empty() {
            return Err(TriageError::InvalidInput("CPF is required".to_string()));
        }

        let created = self
            .inner
            .gateway
            .create_patient(&NewPatientRequest {
                nome: full_name.to_string(),
                cpf: cpf.to_string(),
                data_nascimento: date_of_birth.to_string(),
            })
            .await?;
        info!(
            "patient registered (patient_id={}, ticket={})",
            created.id,
            created.ticket_number.as_deref().unwrap_or_default()
        );
        self.refresh().await;

        Ok(Patient {
            id: created.id.to_string(),
            ticket_number: created.ticket_number.unwrap_or_default(),
            full_name: created.nome.unwrap_or_else(|| full_name.to_string()),
            date_of_birth: created
                .data_nascimento
                .unwrap_or_else(|| date_of_birth.to_string()),
            cpf: created.cpf.unwrap_or_else(|| cpf.to_string()),
            registered_at: Utc::now(),
            status: PatientStatus::WaitingTriage,
            priority: None,
            attendance_type: None,
            triage_notes: None,
            assigned_room: None,
            sync: SyncState::Confirmed,
        })
    }

    /// Classify a patient and refresh the cache.
    pub async fn assign_priority(
        &self,
        patient_id: &str,
        priority: PriorityLevel,
        attendance_type: AttendanceType,
        notes: &str,
    ) -> Result<(), TriageError> {
        if !is_allowed_priority(attendance_type, priority) {
            return Err(TriageError::InvalidClassification {
                priority,
                attendance: attendance_type,
            });
        }
        let request = ClassifyRequest {
            risco: PriorityBackend::encode(priority).to_string(),
            tipo: AttendanceTypeBackend::encode(attendance_type).to_string(),
            triage_notes: notes.to_string(),
        };
        self.inner
            .gateway
            .classify_patient(patient_id, &request)
            .await?;
        info!(
            "patient classified (patient_id={}, priority={}, attendance={})",
            patient_id, priority, attendance_type
        );
        self.refresh().await;
        Ok(())
    }

    /// Summon a patient to triage; local only.
    ///
    /// Fails only for an uncached patient. Publishing the call list is best
    /// effort, so a storage failure is logged and the call still stands.
    pub fn call_for_triage(&self, patient_id: &str) -> Result<TriageCall, TriageError> {
        let config = &self.inner.calls_config;
        let (call, calls) = {
            let mut state = self.inner.state.write();
            let patient = state
                .patients
                .iter_mut()
                .find(|patient| patient.id == patient_id)
                .ok_or_else(|| TriageError::UnknownPatient(patient_id.to_string()))?;
            patient.status = PatientStatus::InTriage;
            patient.sync = SyncState::LocalOnly;

            let mut call = TriageCall::new(
                ticket_or(&patient.ticket_number, TRIAGE_TICKET_FALLBACK),
                CallType::Triage,
            );
            call.patient_name = Some(patient.full_name.clone());
            call.room = Some(config.triage_room_label.clone());
            call.priority = patient.priority;

            state.calls.insert(0, call.clone());
            state.calls.truncate(config.triage_cap);
            (call, state.calls.clone())
        };

        info!(
            "patient called to triage (patient_id={}, ticket={})",
            patient_id, call.ticket_number
        );
        self.inner.events.emit(StoreEvent::PatientUpdated {
            patient_id: patient_id.to_string(),
            status: PatientStatus::InTriage,
        });
        self.publish_calls(calls);
        Ok(call)
    }

    /// Summon a patient to a consultation room using the default room id.
    pub async fn call_for_doctor(
        &self,
        patient_id: &str,
        room: &str,
    ) -> Result<Option<TriageCall>, TriageError> {
        let room_id = self.inner.calls_config.default_room_id;
        self.call_for_doctor_in(patient_id, room_id, room).await
    }

    /// Summon a patient to a specific consultation room.
    ///
    /// Returns the recorded call, or `None` when the patient is not cached.
    pub async fn call_for_doctor_in(
        &self,
        patient_id: &str,
        room_id: u32,
        room: &str,
    ) -> Result<Option<TriageCall>, TriageError> {
        self.inner
            .gateway
            .call_patient(patient_id, room_id)
            .await?;
        info!(
            "patient called to doctor (patient_id={}, room_id={}, room={})",
            patient_id, room_id, room
        );

        let recorded = {
            let mut state = self.inner.state.write();
            let call = state
                .patients
                .iter()
                .find(|patient| patient.id == patient_id)
                .map(|patient| {
                    let mut call = TriageCall::new(
                        ticket_or(&patient.ticket_number, DOCTOR_TICKET_FALLBACK),
                        CallType::Doctor,
                    );
                    call.patient_name = Some(patient.full_name.clone());
                    call.room = Some(room.to_string());
                    call.priority = patient.priority;
                    call
                });
            call.map(|call| {
                state.calls.insert(0, call.clone());
                state.calls.truncate(self.inner.calls_config.doctor_cap);
                (call, state.calls.clone())
            })
        };

        let call = match recorded {
            Some((call, calls)) => {
                self.publish_calls(calls);
                Some(call)
            }
            None => {
                debug!("called patient not cached, no call recorded (patient_id={patient_id})");
                None
            }
        };
        self.refresh().await;
        Ok(call)
    }

    /// Drop a patient from the local cache after the consultation ends.
    ///
    /// The backend has no endpoint for this yet, so the next refresh brings
    /// the patient back while the server still lists them.
    pub fn complete_consultation(&self, patient_id: &str) -> bool {
        let removed = {
            let mut state = self.inner.state.write();
            let before = state.patients.len();
            state.patients.retain(|patient| patient.id != patient_id);
            let removed = state.patients.len() != before;
            if removed {
                let started = self.inner.next_generation.load(Ordering::SeqCst);
                state
                    .completed_locally
                    .insert(patient_id.to_string(), started);
            }
            removed
        };
        warn!(
            "consultation completed locally only, backend has no endpoint (patient_id={}, removed={})",
            patient_id, removed
        );
        if removed {
            self.inner.events.emit(StoreEvent::PatientRemoved {
                patient_id: patient_id.to_string(),
            });
        }
        removed
    }

    pub fn patients(&self) -> Vec<Patient> {
        self.inner.state.read().patients.clone()
    }

    pub fn patient(&self, patient_id: &str) -> Option<Patient> {
        self.inner
            .state
            .read()
            .patients
            .iter()
            .find(|patient| patient.id == patient_id)
            .cloned()
    }

    pub fn waiting_for_triage(&self) -> Vec<Patient> {
        self.with_status(PatientStatus::WaitingTriage)
    }

    pub fn waiting_for_doctor(&self) -> Vec<Patient> {
        self.with_status(PatientStatus::WaitingDoctor)
    }

    /// Recent calls, newest first.
    pub fn recent_calls(&self) -> Vec<TriageCall> {
        self.inner.state.read().calls.clone()
    }

    /// Local edits the server has overridden, oldest first, capped at
    /// `calls.divergence_cap`.
    pub fn divergences(&self) -> Vec<Divergence> {
        self.inner.state.read().divergences.clone()
    }

    fn with_status(&self, status: PatientStatus) -> Vec<Patient> {
        self.inner
            .state
            .read()
            .patients
            .iter()
            .filter(|patient| patient.status == status)
            .cloned()
            .collect()
    }

    fn publish_calls(&self, calls: Vec<TriageCall>) {
        if let Err(err) = self.inner.broadcast.publish(&calls) {
            warn!(
                "recent calls kept locally, publish failed (key={}): {err}",
                self.inner.broadcast.key()
            );
        }
        self.inner.events.emit(StoreEvent::CallsChanged { calls });
    }
}

fn ticket_or(ticket: &str, fallback: &str) -> String {
    if ticket.trim().is_empty() {
        fallback.to_string()
    } else {
        ticket.to_string()
    }
}
