//! Consultation room directory.

use crate::error::TriageError;
use log::info;
use std::sync::Arc;
use triagem_rs_gateway::{Gateway, NewRoomRequest, Room};

pub struct RoomDirectory {
    gateway: Arc<dyn Gateway>,
}

impl RoomDirectory {
    pub fn new(gateway: Arc<dyn Gateway>) -> Self {
        Self { gateway }
    }

    pub async fn list(&self) -> Result<Vec<Room>, TriageError> {
        Ok(self.gateway.list_rooms().await?)
    }

    /// Register a room given as a single digit.
    pub async fn add(&self, numero: &str) -> Result<u8, TriageError> {
        let numero = parse_room_number(numero)?;
        if self.gateway.room_exists(numero).await? {
            return Err(TriageError::RoomExists(numero));
        }
        self.gateway.create_room(&NewRoomRequest { numero }).await?;
        info!("room registered (numero={numero})");
        Ok(numero)
    }
}

fn parse_room_number(value: &str) -> Result<u8, TriageError> {
    let value = value.trim();
    let mut chars = value.chars();
    match (chars.next().and_then(|ch| ch.to_digit(10)), chars.next()) {
        (Some(digit), None) => Ok(digit as u8),
        _ => Err(TriageError::InvalidRoom(format!(
            "room number must be a single digit, got {value:?}"
        ))),
    }
}
