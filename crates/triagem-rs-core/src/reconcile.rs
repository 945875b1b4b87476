//! Mapping backend queue records into cached patients and spotting
//! disagreements with local optimistic edits.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use triagem_rs_gateway::BackendPatient;
use triagem_rs_protocol::mapping::{AttendanceTypeBackend, PriorityBackend};
use triagem_rs_protocol::{
    Divergence, DivergenceKind, Patient, PatientId, PatientStatus, SyncState,
};

/// Which backend queue a record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Queue {
    Triage,
    Doctor,
}

/// Convert a queue record into a confirmed cached patient.
///
/// Only doctor-queue records carry classification fields.
pub(crate) fn patient_from_queue(
    record: BackendPatient,
    queue: Queue,
    registered_at: DateTime<Utc>,
) -> Patient {
    let (status, priority, attendance_type, triage_notes) = match queue {
        Queue::Triage => (PatientStatus::WaitingTriage, None, None, None),
        Queue::Doctor => (
            PatientStatus::WaitingDoctor,
            Some(PriorityBackend::decode(
                record.risco.as_deref().unwrap_or_default(),
            )),
            Some(AttendanceTypeBackend::decode(
                record.tipo.as_deref().unwrap_or_default(),
            )),
            record.triage_notes,
        ),
    };
    Patient {
        id: record.id.to_string(),
        ticket_number: record.ticket_number.unwrap_or_default(),
        full_name: record.nome.unwrap_or_default(),
        date_of_birth: record.data_nascimento.unwrap_or_default(),
        cpf: record.cpf.unwrap_or_default(),
        registered_at,
        status,
        priority,
        attendance_type,
        triage_notes,
        assigned_room: None,
        sync: SyncState::Confirmed,
    }
}

/// Build the next patient list from both queues, triage queue first.
///
/// Registration timestamps survive refreshes for patients already cached.
pub(crate) fn merge_queues(
    previous: &[Patient],
    triage: Vec<BackendPatient>,
    doctor: Vec<BackendPatient>,
    now: DateTime<Utc>,
) -> Vec<Patient> {
    let seen: HashMap<&str, DateTime<Utc>> = previous
        .iter()
        .map(|patient| (patient.id.as_str(), patient.registered_at))
        .collect();
    triage
        .into_iter()
        .map(|record| (record, Queue::Triage))
        .chain(doctor.into_iter().map(|record| (record, Queue::Doctor)))
        .map(|(record, queue)| {
            let registered_at = seen
                .get(record.id.to_string().as_str())
                .copied()
                .unwrap_or(now);
            patient_from_queue(record, queue, registered_at)
        })
        .collect()
}

/// Compare the server view with local-only edits it is about to replace.
///
/// A local status only diverges when the server puts the patient back to an
/// earlier step; moving further along the flow confirms the edit.
/// `completed_locally` maps each id to the last generation started before it
/// was completed. Entries are settled by the first refresh started after that
/// and removed whether or not the server still lists the patient.
pub(crate) fn detect_divergences(
    previous: &[Patient],
    next: &[Patient],
    completed_locally: &mut HashMap<PatientId, u64>,
    generation: u64,
    now: DateTime<Utc>,
) -> Vec<Divergence> {
    let local_only: HashMap<&str, PatientStatus> = previous
        .iter()
        .filter(|patient| patient.sync == SyncState::LocalOnly)
        .map(|patient| (patient.id.as_str(), patient.status))
        .collect();

    let mut divergences = Vec::new();
    for patient in next {
        if let Some(local) = local_only.get(patient.id.as_str())
            && patient.status.rank() < local.rank()
        {
            divergences.push(Divergence {
                patient_id: patient.id.clone(),
                kind: DivergenceKind::StatusOverwritten {
                    local: *local,
                    server: patient.status,
                },
                detected_at: now,
            });
        }
        let settled = completed_locally
            .get(&patient.id)
            .is_some_and(|completed_at| *completed_at < generation);
        if settled {
            divergences.push(Divergence {
                patient_id: patient.id.clone(),
                kind: DivergenceKind::CompletedLocallyStillQueued {
                    server: patient.status,
                },
                detected_at: now,
            });
        }
    }
    completed_locally.retain(|_, completed_at| *completed_at >= generation);
    divergences
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use triagem_rs_gateway::BackendId;
    use triagem_rs_protocol::{AttendanceType, PriorityLevel};

    fn record(id: i64, name: &str) -> BackendPatient {
        BackendPatient {
            id: BackendId::Number(id),
            nome: Some(name.to_string()),
            cpf: None,
            data_nascimento: None,
            ticket_number: Some(format!("T{id:03}")),
            risco: None,
            tipo: None,
            triage_notes: None,
        }
    }

    #[test]
    fn queue_decides_status() {
        let now = Utc::now();
        let mut doctor = record(2, "Bruno");
        doctor.risco = Some("DESCONHECIDO".to_string());
        doctor.tipo = Some("SAMU".to_string());
        let patients = merge_queues(&[], vec![record(1, "Ana")], vec![doctor], now);

        assert_eq!(patients[0].status, PatientStatus::WaitingTriage);
        assert_eq!(patients[0].priority, None);
        assert_eq!(patients[1].status, PatientStatus::WaitingDoctor);
        assert_eq!(patients[1].priority, Some(PriorityLevel::Green));
        assert_eq!(patients[1].attendance_type, Some(AttendanceType::Samu));
        assert_eq!(patients[1].ticket_number, "T002");
    }

    #[test]
    fn registration_time_is_kept_across_refreshes() {
        let first = Utc::now() - chrono::Duration::minutes(5);
        let previous = merge_queues(&[], vec![record(1, "Ana")], vec![], first);
        let next = merge_queues(&previous, vec![record(1, "Ana")], vec![], Utc::now());
        assert_eq!(next[0].registered_at, first);
    }

    #[test]
    fn overwritten_local_status_is_reported() {
        let now = Utc::now();
        let mut previous = merge_queues(&[], vec![record(1, "Ana")], vec![], now);
        previous[0].status = PatientStatus::InTriage;
        previous[0].sync = SyncState::LocalOnly;
        let next = merge_queues(&previous, vec![record(1, "Ana")], vec![], now);

        let divergences = detect_divergences(&previous, &next, &mut HashMap::new(), 1, now);
        assert_eq!(divergences.len(), 1);
        assert_eq!(
            divergences[0].kind,
            DivergenceKind::StatusOverwritten {
                local: PatientStatus::InTriage,
                server: PatientStatus::WaitingTriage,
            }
        );
    }

    #[test]
    fn forward_progress_confirms_local_status() {
        let now = Utc::now();
        let mut previous = merge_queues(&[], vec![record(1, "Ana")], vec![], now);
        previous[0].status = PatientStatus::InTriage;
        previous[0].sync = SyncState::LocalOnly;
        let next = merge_queues(&previous, vec![], vec![record(1, "Ana")], now);

        let divergences = detect_divergences(&previous, &next, &mut HashMap::new(), 1, now);
        assert!(divergences.is_empty());
    }

    #[test]
    fn locally_completed_patient_reported_once() {
        let now = Utc::now();
        let next = merge_queues(&[], vec![], vec![record(4, "Caio")], now);
        let mut completed = HashMap::from([("4".to_string(), 1)]);

        let first = detect_divergences(&[], &next, &mut completed, 2, now);
        assert_eq!(first.len(), 1);
        assert!(completed.is_empty());
        let second = detect_divergences(&[], &next, &mut completed, 3, now);
        assert!(second.is_empty());
    }

    #[test]
    fn completion_settled_only_by_later_refresh() {
        let now = Utc::now();
        let still_listed = merge_queues(&[], vec![], vec![record(4, "Caio")], now);
        let mut completed = HashMap::from([("4".to_string(), 3), ("5".to_string(), 1)]);

        let early = detect_divergences(&[], &still_listed, &mut completed, 3, now);
        assert!(early.is_empty());
        assert_eq!(completed, HashMap::from([("4".to_string(), 3)]));

        let dropped = detect_divergences(&[], &[], &mut completed, 4, now);
        assert!(dropped.is_empty());
        assert!(completed.is_empty());
    }
}
