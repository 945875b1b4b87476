//! Public call-display panel: current call, history, and announcements.

use log::info;
use std::sync::Arc;
use triagem_rs_protocol::{CallId, CallType, TriageCall};

/// Number of earlier calls shown under the current one.
const PREVIOUS_CALLS: usize = 3;

/// Speaks or otherwise presents an announcement.
pub trait Announcer: Send + Sync {
    fn announce(&self, text: &str);
}

/// Announcer that writes to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogAnnouncer;

impl Announcer for LogAnnouncer {
    fn announce(&self, text: &str) {
        info!("announcement: {text}");
    }
}

/// Text read out for a call.
pub fn announcement_text(call: &TriageCall) -> String {
    match call.call_type {
        CallType::Triage => format!("Senha {}, comparecer à triagem", call.ticket_number),
        CallType::Doctor => {
            let mut text = format!("Senha {}", call.ticket_number);
            if let Some(name) = call.patient_name.as_deref().filter(|name| !name.is_empty()) {
                text.push_str(", ");
                text.push_str(name);
            }
            text.push_str(", comparecer ao ");
            text.push_str(call.room.as_deref().unwrap_or("consultório"));
            text
        }
    }
}

/// Announces the current call once per call id.
pub struct CallAnnouncer {
    announcer: Arc<dyn Announcer>,
    last_announced: Option<CallId>,
}

impl CallAnnouncer {
    pub fn new(announcer: Arc<dyn Announcer>) -> Self {
        Self {
            announcer,
            last_announced: None,
        }
    }

    /// Inspect the latest call list; returns whether an announcement was made.
    pub fn observe(&mut self, calls: &[TriageCall]) -> bool {
        let Some(current) = calls.first() else {
            return false;
        };
        if self.last_announced == Some(current.call_id) {
            return false;
        }
        self.last_announced = Some(current.call_id);
        self.announcer.announce(&announcement_text(current));
        true
    }
}

/// What the panel shows for a call list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PanelView {
    pub current: Option<TriageCall>,
    pub previous: Vec<TriageCall>,
}

impl PanelView {
    pub fn from_calls(calls: &[TriageCall]) -> Self {
        Self {
            current: calls.first().cloned(),
            previous: calls.iter().skip(1).take(PREVIOUS_CALLS).cloned().collect(),
        }
    }
}
