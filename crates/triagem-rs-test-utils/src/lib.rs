//! Test helpers shared across Triagem crates.

pub mod fixtures;
pub mod gateway;

pub use fixtures::{doctor_record, triage_record};
pub use gateway::{FetchGate, GatewayRequest, StubGateway};
