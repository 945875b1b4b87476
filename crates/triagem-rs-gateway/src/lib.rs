//! REST client for the emergency-room backend.
//!
//! The backend owns patient state; this crate only speaks its wire format.
//! Screens reach it through the [`Gateway`] trait so stores can be tested
//! against in-memory doubles.

mod client;
mod error;
mod wire;

pub use client::{Gateway, HttpGateway};
pub use error::GatewayError;
pub use wire::{BackendId, BackendPatient, ClassifyRequest, NewPatientRequest, NewRoomRequest, Room};
