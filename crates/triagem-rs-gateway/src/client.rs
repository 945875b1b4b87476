//! Gateway trait and its reqwest implementation.

use crate::error::GatewayError;
use crate::wire::{BackendPatient, ClassifyRequest, NewPatientRequest, NewRoomRequest, Room};
use async_trait::async_trait;
use log::{debug, info};
use reqwest::{Client, Method, Response, StatusCode, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;
use triagem_rs_config::GatewayConfig;

/// Operations the screens need from the backend.
#[async_trait]
pub trait Gateway: Send + Sync {
    /// `GET /pacientes/aguardando-triagem`.
    async fn waiting_for_triage(&self) -> Result<Vec<BackendPatient>, GatewayError>;

    /// `GET /pacientes/aguardando-medico`.
    async fn waiting_for_doctor(&self) -> Result<Vec<BackendPatient>, GatewayError>;

    /// `POST /pacientes`.
    async fn create_patient(
        &self,
        request: &NewPatientRequest,
    ) -> Result<BackendPatient, GatewayError>;

    /// `PUT /pacientes/{id}/classificar`.
    async fn classify_patient(
        &self,
        patient_id: &str,
        request: &ClassifyRequest,
    ) -> Result<(), GatewayError>;

    /// `PUT /pacientes/{id}/chamar?consultorioId={room_id}`.
    async fn call_patient(&self, patient_id: &str, room_id: u32) -> Result<(), GatewayError>;

    /// `GET /consultorios`.
    async fn list_rooms(&self) -> Result<Vec<Room>, GatewayError>;

    /// `GET /consultorios/{numero}`; a 404 means the room does not exist.
    async fn room_exists(&self, numero: u8) -> Result<bool, GatewayError>;

    /// `POST /consultorios`.
    async fn create_room(&self, request: &NewRoomRequest) -> Result<(), GatewayError>;
}

/// HTTP gateway backed by a shared reqwest client.
#[derive(Debug, Clone)]
pub struct HttpGateway {
    client: Client,
    base_url: Url,
}

impl HttpGateway {
    /// Build a gateway for the configured base URL and timeout.
    pub fn from_config(config: &GatewayConfig) -> Result<Self, GatewayError> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.request_timeout() {
            builder = builder.timeout(timeout);
        }
        let client = builder.build()?;
        Self::with_client(client, &config.base_url)
    }

    /// Build a gateway over an existing client.
    pub fn with_client(client: Client, base_url: &str) -> Result<Self, GatewayError> {
        let base_url = Url::parse(base_url.trim())
            .map_err(|err| GatewayError::InvalidBaseUrl(format!("{base_url}: {err}")))?;
        if base_url.cannot_be_a_base() {
            return Err(GatewayError::InvalidBaseUrl(base_url.to_string()));
        }
        info!("gateway configured (base_url={})", base_url);
        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Append path segments to the base URL, percent-encoding each one.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, GatewayError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| GatewayError::InvalidBaseUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn send<B: Serialize + Sync>(
        &self,
        method: Method,
        url: Url,
        body: Option<&B>,
    ) -> Result<Response, GatewayError> {
        debug!("gateway request (method={}, url={})", method, url);
        let mut request = self.client.request(method, url);
        if let Some(body) = body {
            request = request.json(body);
        }
        let response = request.send().await?;
        ensure_success(response).await
    }

    async fn get_json<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T, GatewayError> {
        let url = self.endpoint(segments)?;
        let response = self.send::<()>(Method::GET, url, None).await?;
        decode(response).await
    }
}

#[async_trait]
impl Gateway for HttpGateway {
    async fn waiting_for_triage(&self) -> Result<Vec<BackendPatient>, GatewayError> {
        self.get_json(&["pacientes", "aguardando-triagem"]).await
    }

    async fn waiting_for_doctor(&self) -> Result<Vec<BackendPatient>, GatewayError> {
        self.get_json(&["pacientes", "aguardando-medico"]).await
    }

    async fn create_patient(
        &self,
        request: &NewPatientRequest,
    ) -> Result<BackendPatient, GatewayError> {
        let url = self.endpoint(&["pacientes"])?;
        let response = self.send(Method::POST, url, Some(request)).await?;
        decode(response).await
    }

    async fn classify_patient(
        &self,
        patient_id: &str,
        request: &ClassifyRequest,
    ) -> Result<(), GatewayError> {
        let url = self.endpoint(&["pacientes", patient_id, "classificar"])?;
        self.send(Method::PUT, url, Some(request)).await?;
        Ok(())
    }

    async fn call_patient(&self, patient_id: &str, room_id: u32) -> Result<(), GatewayError> {
        let mut url = self.endpoint(&["pacientes", patient_id, "chamar"])?;
        url.query_pairs_mut()
            .append_pair("consultorioId", &room_id.to_string());
        self.send::<()>(Method::PUT, url, None).await?;
        Ok(())
    }

    async fn list_rooms(&self) -> Result<Vec<Room>, GatewayError> {
        self.get_json(&["consultorios"]).await
    }

    async fn room_exists(&self, numero: u8) -> Result<bool, GatewayError> {
        let url = self.endpoint(&["consultorios", &numero.to_string()])?;
        match self.send::<()>(Method::GET, url, None).await {
            Ok(_) => Ok(true),
            Err(GatewayError::Status { status: 404, .. }) => Ok(false),
            Err(err) => Err(err),
        }
    }

    async fn create_room(&self, request: &NewRoomRequest) -> Result<(), GatewayError> {
        let url = self.endpoint(&["consultorios"])?;
        self.send(Method::POST, url, Some(request)).await?;
        Ok(())
    }
}

/// Turn non-success statuses into `GatewayError::Status`.
///
/// The message is the JSON `message` field when present, otherwise the raw
/// body, otherwise the canonical reason phrase.
async fn ensure_success(response: Response) -> Result<Response, GatewayError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(GatewayError::Status {
        status: status.as_u16(),
        message: error_message(status, &body),
    })
}

fn error_message(status: StatusCode, body: &str) -> String {
    let from_json = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| {
            value
                .get("message")
                .and_then(serde_json::Value::as_str)
                .map(str::to_string)
        });
    if let Some(message) = from_json {
        return message;
    }
    if !body.trim().is_empty() {
        return body.trim().to_string();
    }
    status
        .canonical_reason()
        .unwrap_or("request failed")
        .to_string()
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, GatewayError> {
    let bytes = response.bytes().await?;
    Ok(serde_json::from_slice(&bytes)?)
}
