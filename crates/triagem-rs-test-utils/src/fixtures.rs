use triagem_rs_gateway::{BackendId, BackendPatient};

/// Record as listed by the waiting-for-triage queue.
pub fn triage_record(id: i64, name: &str, ticket: &str) -> BackendPatient {
    BackendPatient {
        id: BackendId::Number(id),
        nome: Some(name.to_string()),
        cpf: Some(format!("{id:03}.000.000-00")),
        data_nascimento: Some("1990-01-01".to_string()),
        ticket_number: Some(ticket.to_string()),
        risco: None,
        tipo: None,
        triage_notes: None,
    }
}

/// Classified record as listed by the waiting-for-doctor queue.
pub fn doctor_record(id: i64, name: &str, ticket: &str, risco: &str, tipo: &str) -> BackendPatient {
    BackendPatient {
        risco: Some(risco.to_string()),
        tipo: Some(tipo.to_string()),
        triage_notes: Some("classificado".to_string()),
        ..triage_record(id, name, ticket)
    }
}
