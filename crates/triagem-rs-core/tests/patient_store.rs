//! Patient store behavior against the stub gateway.

use pretty_assertions::assert_eq;
use std::sync::Arc;
use triagem_rs_config::CallsConfig;
use triagem_rs_core::{CallBroadcast, PatientStore, RefreshOutcome, TriageError};
use triagem_rs_gateway::{BackendId, BackendPatient, ClassifyRequest};
use triagem_rs_protocol::{
    AttendanceType, CallType, Divergence, DivergenceKind, PatientStatus, PriorityLevel,
    StoreEvent, SyncState,
};
use triagem_rs_storage::{FileDurableStore, MemoryDurableStore};
use triagem_rs_test_utils::{GatewayRequest, StubGateway, doctor_record, triage_record};

fn store_with(stub: &StubGateway, storage: &MemoryDurableStore) -> PatientStore {
    let broadcast = CallBroadcast::new(Arc::new(storage.clone()), "recentCalls");
    PatientStore::new(Arc::new(stub.clone()), broadcast, CallsConfig::default())
}

fn ids(divergences: &[Divergence]) -> Vec<&str> {
    divergences
        .iter()
        .map(|divergence| divergence.patient_id.as_str())
        .collect()
}

fn seeded_store() -> (StubGateway, PatientStore) {
    let stub = StubGateway::new();
    stub.set_triage_queue(vec![
        triage_record(1, "Ana Silva", "T001"),
        triage_record(2, "Bruno Costa", "T002"),
    ]);
    stub.set_doctor_queue(vec![doctor_record(
        3,
        "Carla Dias",
        "T003",
        "LARANJA",
        "CLINICO",
    )]);
    let store = store_with(&stub, &MemoryDurableStore::new());
    (stub, store)
}

#[tokio::test]
async fn refresh_assigns_status_by_queue() {
    let (_, store) = seeded_store();
    let outcome = store.refresh().await;
    assert_eq!(
        outcome,
        RefreshOutcome::Applied {
            generation: 1,
            count: 3
        }
    );

    let triage_ids: Vec<String> = store
        .waiting_for_triage()
        .into_iter()
        .map(|patient| patient.id)
        .collect();
    let doctor = store.waiting_for_doctor();
    assert_eq!(triage_ids, vec!["1".to_string(), "2".to_string()]);
    assert_eq!(doctor.len(), 1);
    assert_eq!(doctor[0].id, "3");
    assert_eq!(doctor[0].priority, Some(PriorityLevel::Orange));
    assert_eq!(doctor[0].attendance_type, Some(AttendanceType::Clinical));
    assert!(doctor.iter().all(|patient| !triage_ids.contains(&patient.id)));
}

#[tokio::test]
async fn failed_refresh_keeps_cache() {
    let (stub, store) = seeded_store();
    assert!(store.refresh().await.is_applied());
    let before = store.patients();

    stub.set_failure(Some(500));
    assert_eq!(store.refresh().await, RefreshOutcome::Failed);
    assert_eq!(store.patients(), before);
}

#[tokio::test]
async fn stale_refresh_is_discarded() {
    let stub = StubGateway::new();
    let store = store_with(&stub, &MemoryDurableStore::new());
    stub.set_triage_queue(vec![triage_record(1, "Ana Silva", "T001")]);
    let gate = stub.gate_next_triage_fetch();

    let slow = tokio::spawn({
        let store = store.clone();
        async move { store.refresh().await }
    });
    gate.entered.notified().await;

    stub.set_triage_queue(vec![
        triage_record(1, "Ana Silva", "T001"),
        triage_record(2, "Bruno Costa", "T002"),
    ]);
    assert_eq!(
        store.refresh().await,
        RefreshOutcome::Applied {
            generation: 2,
            count: 2
        }
    );

    gate.release.notify_one();
    let outcome = slow.await.expect("slow refresh task");
    assert_eq!(outcome, RefreshOutcome::Stale { generation: 1 });
    assert_eq!(store.patients().len(), 2);
}

#[tokio::test]
async fn call_for_triage_is_local_and_capped() {
    let stub = StubGateway::new();
    let records: Vec<BackendPatient> = (1..=12)
        .map(|id| triage_record(id, &format!("Paciente {id}"), &format!("T{id:03}")))
        .collect();
    stub.set_triage_queue(records);
    let store = store_with(&stub, &MemoryDurableStore::new());
    store.refresh().await;

    for id in 1..=12 {
        store.call_for_triage(&id.to_string()).expect("call");
    }
    let patient = store.patient("12").expect("patient");
    assert_eq!(patient.status, PatientStatus::InTriage);
    assert_eq!(patient.sync, SyncState::LocalOnly);

    let calls = store.recent_calls();
    assert_eq!(calls.len(), 10);
    assert_eq!(calls[0].ticket_number, "T012");
    assert_eq!(calls[0].call_type, CallType::Triage);
    assert_eq!(calls[0].room.as_deref(), Some("Triagem"));
    assert!(stub.mutations().is_empty());
}

#[tokio::test]
async fn call_for_triage_uses_ticket_fallback_and_rejects_unknown() {
    let stub = StubGateway::new();
    let mut record = triage_record(5, "Eva Lima", "");
    record.ticket_number = None;
    stub.set_triage_queue(vec![record]);
    let store = store_with(&stub, &MemoryDurableStore::new());
    store.refresh().await;

    let call = store.call_for_triage("5").expect("call");
    assert_eq!(call.ticket_number, "SENHA");

    let err = store.call_for_triage("99").expect_err("unknown");
    assert!(matches!(err, TriageError::UnknownPatient(id) if id == "99"));
    assert_eq!(store.recent_calls().len(), 1);
}

#[tokio::test]
async fn call_for_doctor_records_call_and_caps_list() {
    let (stub, store) = seeded_store();
    store.refresh().await;
    for id in ["1", "2"] {
        store.call_for_triage(id).expect("triage call");
    }
    for _ in 0..3 {
        store.call_for_doctor("3", "Room 3").await.expect("doctor call");
    }

    let calls = store.recent_calls();
    assert_eq!(calls.len(), 4);
    assert_eq!(calls[0].call_type, CallType::Doctor);
    assert_eq!(calls[0].room.as_deref(), Some("Room 3"));
    assert_eq!(calls[0].priority, Some(PriorityLevel::Orange));
    assert_eq!(calls[0].patient_name.as_deref(), Some("Carla Dias"));
    assert_eq!(
        stub.mutations()[0],
        GatewayRequest::CallPatient {
            patient_id: "3".to_string(),
            room_id: 1
        }
    );
}

#[tokio::test]
async fn failed_doctor_call_records_nothing() {
    let (stub, store) = seeded_store();
    store.refresh().await;
    stub.set_failure(Some(404));
    let err = store
        .call_for_doctor_in("3", 2, "Consultório 2")
        .await
        .expect_err("gateway failure");
    assert!(matches!(err, TriageError::Gateway(_)));
    assert!(store.recent_calls().is_empty());
}

#[tokio::test]
async fn doctor_call_for_uncached_patient_records_nothing() {
    let (stub, store) = seeded_store();
    let call = store
        .call_for_doctor_in("42", 2, "Consultório 2")
        .await
        .expect("call");
    assert_eq!(call, None);
    assert!(store.recent_calls().is_empty());
    assert_eq!(stub.mutations().len(), 1);
}

#[tokio::test]
async fn register_patient_returns_server_identity() {
    let stub = StubGateway::new();
    stub.set_created_patient(BackendPatient {
        id: BackendId::Number(7),
        nome: None,
        cpf: None,
        data_nascimento: None,
        ticket_number: Some("T007".to_string()),
        risco: None,
        tipo: None,
        triage_notes: None,
    });
    let store = store_with(&stub, &MemoryDurableStore::new());

    let patient = store
        .register_patient("Ana Silva", "1990-01-01", "111.111.111-11")
        .await
        .expect("register");
    assert_eq!(patient.id, "7");
    assert_eq!(patient.status, PatientStatus::WaitingTriage);
    assert_eq!(patient.ticket_number, "T007");
    assert_eq!(patient.full_name, "Ana Silva");
    assert!(stub.requests().contains(&GatewayRequest::WaitingForTriage));
}

#[tokio::test]
async fn register_patient_rejects_blank_fields() {
    let stub = StubGateway::new();
    let store = store_with(&stub, &MemoryDurableStore::new());
    let err = store
        .register_patient("  ", "1990-01-01", "111")
        .await
        .expect_err("blank name");
    assert!(matches!(err, TriageError::InvalidInput(_)));
    assert!(stub.requests().is_empty());
}

#[tokio::test]
async fn assign_priority_encodes_backend_codes() {
    let (stub, store) = seeded_store();
    store
        .assign_priority("1", PriorityLevel::Red, AttendanceType::Clinical, "dispneia")
        .await
        .expect("classify");
    assert_eq!(
        stub.mutations(),
        vec![GatewayRequest::ClassifyPatient {
            patient_id: "1".to_string(),
            request: ClassifyRequest {
                risco: "VERMELHO".to_string(),
                tipo: "CLINICO".to_string(),
                triage_notes: "dispneia".to_string(),
            },
        }]
    );
    assert_eq!(store.patients().len(), 3);
}

#[tokio::test]
async fn assign_priority_rejects_disallowed_combination() {
    let (stub, store) = seeded_store();
    let err = store
        .assign_priority("1", PriorityLevel::Blue, AttendanceType::Samu, "")
        .await
        .expect_err("invalid");
    assert!(matches!(
        err,
        TriageError::InvalidClassification {
            priority: PriorityLevel::Blue,
            attendance: AttendanceType::Samu
        }
    ));
    assert!(stub.requests().is_empty());
}

#[tokio::test]
async fn refresh_records_divergence_for_overwritten_local_edit() {
    let (_, store) = seeded_store();
    store.refresh().await;
    let mut events = store.subscribe();
    store.call_for_triage("1").expect("call");

    store.refresh().await;
    assert_eq!(
        store.patient("1").map(|patient| patient.status),
        Some(PatientStatus::WaitingTriage)
    );
    let divergences = store.divergences();
    assert_eq!(divergences.len(), 1);
    assert_eq!(
        divergences[0].kind,
        DivergenceKind::StatusOverwritten {
            local: PatientStatus::InTriage,
            server: PatientStatus::WaitingTriage,
        }
    );

    let mut saw_divergence = false;
    while let Ok(event) = events.try_recv() {
        saw_divergence |= matches!(event, StoreEvent::Divergence(_));
    }
    assert!(saw_divergence);
}

#[tokio::test]
async fn triage_then_classification_is_not_a_divergence() {
    let (stub, store) = seeded_store();
    store.refresh().await;
    store.call_for_triage("1").expect("call");

    stub.set_triage_queue(vec![triage_record(2, "Bruno Costa", "T002")]);
    stub.set_doctor_queue(vec![
        doctor_record(3, "Carla Dias", "T003", "LARANJA", "CLINICO"),
        doctor_record(1, "Ana Silva", "T001", "VERMELHO", "CLINICO"),
    ]);
    store
        .assign_priority("1", PriorityLevel::Red, AttendanceType::Clinical, "dor torácica")
        .await
        .expect("classify");

    assert_eq!(
        store.patient("1").map(|patient| patient.status),
        Some(PatientStatus::WaitingDoctor)
    );
    assert_eq!(store.divergences(), Vec::new());
}

#[tokio::test]
async fn divergence_history_keeps_newest_entries() {
    let stub = StubGateway::new();
    stub.set_triage_queue(vec![
        triage_record(1, "Ana Silva", "T001"),
        triage_record(2, "Bruno Costa", "T002"),
    ]);
    let config = CallsConfig {
        divergence_cap: 2,
        ..CallsConfig::default()
    };
    let broadcast = CallBroadcast::new(Arc::new(MemoryDurableStore::new()), "recentCalls");
    let store = PatientStore::new(Arc::new(stub.clone()), broadcast, config);
    store.refresh().await;

    store.call_for_triage("1").expect("call 1");
    store.call_for_triage("2").expect("call 2");
    store.refresh().await;
    assert_eq!(ids(&store.divergences()), vec!["1", "2"]);

    store.call_for_triage("1").expect("call 1 again");
    store.refresh().await;
    assert_eq!(ids(&store.divergences()), vec!["2", "1"]);
}

#[tokio::test]
async fn completion_dropped_by_server_is_forgotten() {
    let (stub, store) = seeded_store();
    store.refresh().await;
    assert!(store.complete_consultation("3"));

    stub.set_doctor_queue(Vec::new());
    store.refresh().await;
    assert!(store.divergences().is_empty());

    stub.set_doctor_queue(vec![doctor_record(
        3,
        "Carla Dias",
        "T003",
        "LARANJA",
        "CLINICO",
    )]);
    store.refresh().await;
    assert!(store.divergences().is_empty());
}

#[tokio::test]
async fn call_stands_when_publishing_fails() {
    let temp = tempfile::tempdir().expect("tempdir");
    let storage = FileDurableStore::new(temp.path()).expect("storage");
    let stub = StubGateway::new();
    stub.set_triage_queue(vec![triage_record(1, "Ana Silva", "T001")]);
    let broadcast = CallBroadcast::new(Arc::new(storage), "../recentCalls");
    let store = PatientStore::new(Arc::new(stub.clone()), broadcast, CallsConfig::default());
    store.refresh().await;
    let mut events = store.subscribe();

    let call = store.call_for_triage("1").expect("call");
    assert_eq!(store.recent_calls(), vec![call.clone()]);
    assert_eq!(
        store.patient("1").map(|patient| patient.status),
        Some(PatientStatus::InTriage)
    );

    let mut changed = None;
    while let Ok(event) = events.try_recv() {
        if let StoreEvent::CallsChanged { calls } = event {
            changed = Some(calls);
        }
    }
    assert_eq!(changed, Some(vec![call]));
}

#[tokio::test]
async fn complete_consultation_is_local_only() {
    let (stub, store) = seeded_store();
    store.refresh().await;

    assert!(store.complete_consultation("3"));
    assert!(!store.complete_consultation("3"));
    assert!(store.waiting_for_doctor().is_empty());
    assert!(stub.mutations().is_empty());

    store.refresh().await;
    assert_eq!(store.waiting_for_doctor().len(), 1);
    assert_eq!(
        store.divergences()[0].kind,
        DivergenceKind::CompletedLocallyStillQueued {
            server: PatientStatus::WaitingDoctor
        }
    );
}

#[tokio::test]
async fn persisted_calls_seed_new_store_and_dispose_clears() {
    let stub = StubGateway::new();
    stub.set_triage_queue(vec![triage_record(1, "Ana Silva", "T001")]);
    let storage = MemoryDurableStore::new();
    let first = store_with(&stub, &storage);
    first.refresh().await;
    first.call_for_triage("1").expect("call");

    let second = store_with(&stub, &storage.handle());
    assert_eq!(second.recent_calls(), first.recent_calls());

    second.dispose();
    assert!(second.recent_calls().is_empty());
    assert!(second.patients().is_empty());
}
