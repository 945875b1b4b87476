//! Lookup tables between local enumerations and the gateway's codes.
//!
//! Decoding is lenient: unknown risk codes fall back to green and unknown
//! attendance codes fall back to clinical, so a new backend value never
//! breaks a refresh.

use crate::types::{AttendanceType, PriorityLevel};

/// Backend risk codes.
pub struct PriorityBackend;

impl PriorityBackend {
    pub const RED: &'static str = "VERMELHO";
    pub const ORANGE: &'static str = "LARANJA";
    pub const YELLOW: &'static str = "AMARELO";
    pub const GREEN: &'static str = "VERDE";
    pub const BLUE: &'static str = "AZUL";

    /// Encode a local level as a backend risk code.
    pub fn encode(priority: PriorityLevel) -> &'static str {
        match priority {
            PriorityLevel::Red => Self::RED,
            PriorityLevel::Orange => Self::ORANGE,
            PriorityLevel::Yellow => Self::YELLOW,
            PriorityLevel::Green => Self::GREEN,
            PriorityLevel::Blue => Self::BLUE,
        }
    }

    /// Decode a backend risk code, defaulting to green.
    pub fn decode(code: &str) -> PriorityLevel {
        match code {
            Self::RED => PriorityLevel::Red,
            Self::ORANGE => PriorityLevel::Orange,
            Self::YELLOW => PriorityLevel::Yellow,
            Self::GREEN => PriorityLevel::Green,
            Self::BLUE => PriorityLevel::Blue,
            _ => PriorityLevel::Green,
        }
    }
}

/// Backend attendance type codes.
pub struct AttendanceTypeBackend;

impl AttendanceTypeBackend {
    pub const CLINICAL: &'static str = "CLINICO";
    pub const PSYCHIATRIC: &'static str = "PSIQUIATRICO";
    pub const SAMU: &'static str = "SAMU";

    pub fn encode(kind: AttendanceType) -> &'static str {
        match kind {
            AttendanceType::Clinical => Self::CLINICAL,
            AttendanceType::Psychiatric => Self::PSYCHIATRIC,
            AttendanceType::Samu => Self::SAMU,
        }
    }

    /// Decode a backend type code, defaulting to clinical.
    pub fn decode(code: &str) -> AttendanceType {
        match code {
            Self::PSYCHIATRIC => AttendanceType::Psychiatric,
            Self::SAMU => AttendanceType::Samu,
            _ => AttendanceType::Clinical,
        }
    }
}

/// Display metadata for a priority level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriorityConfig {
    pub label: &'static str,
    pub wait_time: &'static str,
    pub order: u8,
}

/// Reference table indexed in `PriorityLevel::ALL` order.
pub const PRIORITY_CONFIG: [(PriorityLevel, PriorityConfig); 5] = [
    (
        PriorityLevel::Red,
        PriorityConfig {
            label: "Emergência",
            wait_time: "0 min",
            order: 1,
        },
    ),
    (
        PriorityLevel::Orange,
        PriorityConfig {
            label: "Muito Urgente",
            wait_time: "10 min",
            order: 2,
        },
    ),
    (
        PriorityLevel::Yellow,
        PriorityConfig {
            label: "Urgente",
            wait_time: "60 min",
            order: 3,
        },
    ),
    (
        PriorityLevel::Green,
        PriorityConfig {
            label: "Pouco Urgente",
            wait_time: "120 min",
            order: 4,
        },
    ),
    (
        PriorityLevel::Blue,
        PriorityConfig {
            label: "Não Urgente",
            wait_time: "240 min",
            order: 5,
        },
    ),
];

impl PriorityLevel {
    /// Reference metadata for this level.
    pub fn config(&self) -> PriorityConfig {
        let index = PriorityLevel::ALL
            .iter()
            .position(|level| level == self)
            .unwrap_or(0);
        PRIORITY_CONFIG[index].1
    }
}

/// Priorities a nurse may assign for a given attendance type.
pub fn available_priorities(attendance: AttendanceType) -> &'static [PriorityLevel] {
    match attendance {
        AttendanceType::Clinical => &[PriorityLevel::Red, PriorityLevel::Orange],
        AttendanceType::Psychiatric => &PriorityLevel::ALL,
        AttendanceType::Samu => &[PriorityLevel::Orange],
    }
}

pub fn is_allowed_priority(attendance: AttendanceType, priority: PriorityLevel) -> bool {
    available_priorities(attendance).contains(&priority)
}
