//! Backend request and response bodies.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Backend identifier; the service sends numbers but strings are accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BackendId {
    Number(i64),
    Text(String),
}

impl fmt::Display for BackendId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendId::Number(value) => write!(f, "{value}"),
            BackendId::Text(value) => f.write_str(value),
        }
    }
}

/// Patient record as returned by the queue and creation endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendPatient {
    pub id: BackendId,
    #[serde(default)]
    pub nome: Option<String>,
    #[serde(default)]
    pub cpf: Option<String>,
    #[serde(default, rename = "dataNascimento", alias = "dateOfBirth")]
    pub data_nascimento: Option<String>,
    #[serde(default, rename = "ticketNumber", alias = "senha")]
    pub ticket_number: Option<String>,
    /// Risk code (`VERMELHO`, `LARANJA`, ...).
    #[serde(default)]
    pub risco: Option<String>,
    /// Attendance type code (`CLINICO`, `PSIQUIATRICO`, `SAMU`).
    #[serde(default)]
    pub tipo: Option<String>,
    #[serde(default, rename = "triageNotes")]
    pub triage_notes: Option<String>,
}

/// Body of `POST /pacientes`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPatientRequest {
    pub nome: String,
    pub cpf: String,
    #[serde(rename = "dataNascimento")]
    pub data_nascimento: String,
}

/// Body of `PUT /pacientes/{id}/classificar`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifyRequest {
    pub risco: String,
    pub tipo: String,
    #[serde(rename = "triageNotes")]
    pub triage_notes: String,
}

/// Consultation room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    pub id: i64,
    pub numero: u8,
}

/// Body of `POST /consultorios`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewRoomRequest {
    pub numero: u8,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn backend_patient_accepts_numeric_and_string_ids() {
        let numeric: BackendPatient =
            serde_json::from_value(json!({ "id": 7, "nome": "Ana" })).expect("numeric");
        assert_eq!(numeric.id.to_string(), "7");
        let text: BackendPatient =
            serde_json::from_value(json!({ "id": "abc", "nome": "Ana" })).expect("text");
        assert_eq!(text.id.to_string(), "abc");
    }

    #[test]
    fn backend_patient_tolerates_missing_optional_fields() {
        let patient: BackendPatient = serde_json::from_value(json!({
            "id": 3,
            "nome": "Bruno",
            "risco": "AMARELO",
            "tipo": "CLINICO",
            "extra": true
        }))
        .expect("decode");
        assert_eq!(patient.risco.as_deref(), Some("AMARELO"));
        assert_eq!(patient.ticket_number, None);
        assert_eq!(patient.triage_notes, None);
    }

    #[test]
    fn requests_use_backend_field_names() {
        let body = serde_json::to_value(NewPatientRequest {
            nome: "Ana Silva".to_string(),
            cpf: "111.111.111-11".to_string(),
            data_nascimento: "1990-01-01".to_string(),
        })
        .expect("encode");
        assert_eq!(
            body,
            json!({ "nome": "Ana Silva", "cpf": "111.111.111-11", "dataNascimento": "1990-01-01" })
        );
        let body = serde_json::to_value(ClassifyRequest {
            risco: "LARANJA".to_string(),
            tipo: "CLINICO".to_string(),
            triage_notes: "dor torácica".to_string(),
        })
        .expect("encode");
        assert_eq!(body["triageNotes"], json!("dor torácica"));
    }
}
