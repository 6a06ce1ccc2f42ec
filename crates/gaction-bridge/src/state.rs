//! Bridge-owned conversation state carried alongside the backend memory.
//!
//! The backend only ever sees the sentinel keys in the memory payload of a
//! dialog call. Everything else about them lives in [`BridgeState`], and the
//! two are combined or separated only by [`BridgeState::outgoing_memory`] and
//! [`BridgeState::absorb_backend_memory`].

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::directive::Directive;

pub const MEMORY_INTENT: &str = "GOOGLE_INTENT";
pub const MEMORY_MEDIA_STATUS: &str = "MEDIA_STATUS";
pub const MEMORY_SCREEN_CAPACITY: &str = "SCREEN_CAPACITY";
pub const MEMORY_CLOSE_CONVERSATION: &str = "CLOSE_CONVERSATION";
pub const MEMORY_CHANGE_SURFACE_MESSAGES: &str = "MEMORY_CHANGE_SURFACE_MESSAGES";

const SENTINEL_KEYS: [&str; 5] = [
    MEMORY_INTENT,
    MEMORY_MEDIA_STATUS,
    MEMORY_SCREEN_CAPACITY,
    MEMORY_CLOSE_CONVERSATION,
    MEMORY_CHANGE_SURFACE_MESSAGES,
];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeState {
    /// Intent reported by the platform on the latest turn.
    pub last_intent: Option<String>,
    /// `MEDIA_STATUS` argument of the latest turn, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_status: Option<Value>,
    pub screen_capacity: bool,
    pub close_conversation: bool,
    /// Directives waiting for a successful surface switch.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pending_surface_switch: Option<Vec<Directive>>,
}

impl BridgeState {
    /// Record what the platform reported for this turn.
    pub fn observe(&mut self, intent: &str, has_screen: bool, media_status: Option<Value>) {
        self.last_intent = Some(intent.to_string());
        self.screen_capacity = has_screen;
        self.close_conversation = intent == crate::session::intents::CANCEL;
        self.media_status = media_status;
    }

    /// Memory sent to the backend: the stored backend memory plus the
    /// platform-observed sentinel keys.
    pub fn outgoing_memory(&self, memory: &Map<String, Value>) -> Map<String, Value> {
        let mut outgoing = memory.clone();
        match &self.last_intent {
            Some(intent) => outgoing.insert(MEMORY_INTENT.to_string(), Value::String(intent.clone())),
            None => outgoing.remove(MEMORY_INTENT),
        };
        match &self.media_status {
            Some(status) => outgoing.insert(MEMORY_MEDIA_STATUS.to_string(), status.clone()),
            None => outgoing.remove(MEMORY_MEDIA_STATUS),
        };
        outgoing.insert(
            MEMORY_SCREEN_CAPACITY.to_string(),
            Value::Bool(self.screen_capacity),
        );
        outgoing.insert(
            MEMORY_CLOSE_CONVERSATION.to_string(),
            Value::Bool(self.close_conversation),
        );
        outgoing
    }

    /// Take the backend-computed sentinel values out of a returned memory
    /// and hand back the remaining opaque memory.
    ///
    /// The close flag follows the backend. Any pending surface switch from an
    /// earlier turn is dropped: the new reply supersedes it.
    pub fn absorb_backend_memory(&mut self, mut memory: Map<String, Value>) -> Map<String, Value> {
        self.close_conversation = memory.get(MEMORY_CLOSE_CONVERSATION) == Some(&Value::Bool(true));
        self.pending_surface_switch = None;
        for key in SENTINEL_KEYS {
            memory.remove(key);
        }
        memory
    }

    /// Read and clear the pending surface-switch directives.
    pub fn take_pending_surface_switch(&mut self) -> Option<Vec<Directive>> {
        self.pending_surface_switch.take()
    }
}
