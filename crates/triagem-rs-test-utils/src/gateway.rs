use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::Notify;
use triagem_rs_gateway::{
    BackendId, BackendPatient, ClassifyRequest, Gateway, GatewayError, NewPatientRequest,
    NewRoomRequest, Room,
};

/// Request observed by [`StubGateway`].
#[derive(Debug, Clone, PartialEq)]
pub enum GatewayRequest {
    WaitingForTriage,
    WaitingForDoctor,
    CreatePatient(NewPatientRequest),
    ClassifyPatient {
        patient_id: String,
        request: ClassifyRequest,
    },
    CallPatient {
        patient_id: String,
        room_id: u32,
    },
    ListRooms,
    RoomExists(u8),
    CreateRoom(NewRoomRequest),
}

/// Holds a triage-queue fetch after its response has been captured.
///
/// `entered` fires once the response is fixed; the fetch resolves after
/// `release` is notified.
#[derive(Clone, Default)]
pub struct FetchGate {
    pub entered: Arc<Notify>,
    pub release: Arc<Notify>,
}

#[derive(Default)]
struct StubState {
    triage: Vec<BackendPatient>,
    doctor: Vec<BackendPatient>,
    created: Option<BackendPatient>,
    rooms: Vec<Room>,
    failure: Option<u16>,
    requests: Vec<GatewayRequest>,
    triage_gates: VecDeque<FetchGate>,
}

/// In-memory gateway with scripted queues and recorded requests.
#[derive(Clone, Default)]
pub struct StubGateway {
    state: Arc<Mutex<StubState>>,
}

impl StubGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_triage_queue(&self, records: Vec<BackendPatient>) {
        self.state.lock().triage = records;
    }

    pub fn set_doctor_queue(&self, records: Vec<BackendPatient>) {
        self.state.lock().doctor = records;
    }

    /// Response for the next `create_patient`; defaults to echoing the request.
    pub fn set_created_patient(&self, record: BackendPatient) {
        self.state.lock().created = Some(record);
    }

    pub fn set_rooms(&self, rooms: Vec<Room>) {
        self.state.lock().rooms = rooms;
    }

    /// Make every request fail with the given HTTP status, or succeed again.
    pub fn set_failure(&self, status: Option<u16>) {
        self.state.lock().failure = status;
    }

    /// Gate the next triage-queue fetch.
    pub fn gate_next_triage_fetch(&self) -> FetchGate {
        let gate = FetchGate::default();
        self.state.lock().triage_gates.push_back(gate.clone());
        gate
    }

    pub fn requests(&self) -> Vec<GatewayRequest> {
        self.state.lock().requests.clone()
    }

    /// Requests other than queue fetches.
    pub fn mutations(&self) -> Vec<GatewayRequest> {
        self.requests()
            .into_iter()
            .filter(|request| {
                !matches!(
                    request,
                    GatewayRequest::WaitingForTriage | GatewayRequest::WaitingForDoctor
                )
            })
            .collect()
    }

    fn record(&self, request: GatewayRequest) -> Result<(), GatewayError> {
        let mut state = self.state.lock();
        state.requests.push(request);
        match state.failure {
            Some(status) => Err(GatewayError::Status {
                status,
                message: "stub failure".to_string(),
            }),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl Gateway for StubGateway {
    async fn waiting_for_triage(&self) -> Result<Vec<BackendPatient>, GatewayError> {
        self.record(GatewayRequest::WaitingForTriage)?;
        let (records, gate) = {
            let mut state = self.state.lock();
            (state.triage.clone(), state.triage_gates.pop_front())
        };
        if let Some(gate) = gate {
            gate.entered.notify_one();
            gate.release.notified().await;
        }
        Ok(records)
    }

    async fn waiting_for_doctor(&self) -> Result<Vec<BackendPatient>, GatewayError> {
        self.record(GatewayRequest::WaitingForDoctor)?;
        Ok(self.state.lock().doctor.clone())
    }

    async fn create_patient(
        &self,
        request: &NewPatientRequest,
    ) -> Result<BackendPatient, GatewayError> {
        self.record(GatewayRequest::CreatePatient(request.clone()))?;
        let created = self.state.lock().created.take();
        Ok(created.unwrap_or_else(|| BackendPatient {
            id: BackendId::Number(1),
            nome: Some(request.nome.clone()),
            cpf: Some(request.cpf.clone()),
            data_nascimento: Some(request.data_nascimento.clone()),
            ticket_number: None,
            risco: None,
            tipo: None,
            triage_notes: None,
        }))
    }

    async fn classify_patient(
        &self,
        patient_id: &str,
        request: &ClassifyRequest,
    ) -> Result<(), GatewayError> {
        self.record(GatewayRequest::ClassifyPatient {
            patient_id: patient_id.to_string(),
            request: request.clone(),
        })
    }

    async fn call_patient(&self, patient_id: &str, room_id: u32) -> Result<(), GatewayError> {
        self.record(GatewayRequest::CallPatient {
            patient_id: patient_id.to_string(),
            room_id,
        })
    }

    async fn list_rooms(&self) -> Result<Vec<Room>, GatewayError> {
        self.record(GatewayRequest::ListRooms)?;
        Ok(self.state.lock().rooms.clone())
    }

    async fn room_exists(&self, numero: u8) -> Result<bool, GatewayError> {
        self.record(GatewayRequest::RoomExists(numero))?;
        Ok(self
            .state
            .lock()
            .rooms
            .iter()
            .any(|room| room.numero == numero))
    }

    async fn create_room(&self, request: &NewRoomRequest) -> Result<(), GatewayError> {
        self.record(GatewayRequest::CreateRoom(*request))?;
        let mut state = self.state.lock();
        let id = state.rooms.len() as i64 + 1;
        state.rooms.push(Room {
            id,
            numero: request.numero,
        });
        Ok(())
    }
}
